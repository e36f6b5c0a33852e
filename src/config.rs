// src/config.rs

use std::{env, fmt::Display, ops::RangeInclusive, path::PathBuf, str::FromStr, sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    db::{
        lead_repo::LeadRepository,
        session_store::{FileSessionStore, MemorySessionStore, SessionStore},
    },
    services::{
        catalog_service::CatalogService,
        chat_flow::SessionTtl,
        chat_service::ChatService,
        lead_service::LeadService,
        notifier::{LeadNotifier, TelegramNotifier},
        rate_limiter::RateLimiter,
    },
};

// =============================================================================
//  SETTINGS
// =============================================================================

const TTL_HOURS: RangeInclusive<i64> = 1..=24 * 365;
const WINDOW_SECS: RangeInclusive<u64> = 1..=24 * 60 * 60;

#[derive(Debug, Clone)]
pub struct Settings {
    pub port: u16,
    pub database_url: Option<String>,
    pub telegram_bot_token: Option<String>,
    pub telegram_chat_id: Option<String>,
    pub smtp_host: Option<String>,
    pub admin_token: Option<String>,
    /// JSON catalog to serve instead of the embedded one.
    pub catalog_path: Option<PathBuf>,
    /// Chat sessions are kept in memory unless a directory is given.
    pub chat_store_dir: Option<PathBuf>,
    /// Lifetime of a submitted session.
    pub chat_session_ttl_hours: i64,
    /// Lifetime of an unfinished session since its last message.
    pub chat_idle_ttl_hours: i64,
    pub rate_limit_window_secs: u64,
    pub lead_rate_limit_max: usize,
    pub request_rate_limit_max: usize,
    pub session_rate_limit_max: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            port: 3000,
            database_url: None,
            telegram_bot_token: None,
            telegram_chat_id: None,
            smtp_host: None,
            admin_token: None,
            catalog_path: None,
            chat_store_dir: None,
            chat_session_ttl_hours: 24,
            chat_idle_ttl_hours: 72,
            rate_limit_window_secs: 600,
            lead_rate_limit_max: 5,
            request_rate_limit_max: 3,
            session_rate_limit_max: 20,
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds settings from any key lookup. Blank values count as unset;
    /// numbers that do not parse fall back to the default with a warning.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let text = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Settings::default();

        Self {
            port: parse_or(&text, "PORT", defaults.port),
            database_url: text("DATABASE_URL"),
            telegram_bot_token: text("TELEGRAM_BOT_TOKEN"),
            telegram_chat_id: text("TELEGRAM_CHAT_ID"),
            smtp_host: text("SMTP_HOST"),
            admin_token: text("ADMIN_TOKEN"),
            catalog_path: text("CATALOG_PATH").map(PathBuf::from),
            chat_store_dir: text("CHAT_STORE_DIR").map(PathBuf::from),
            chat_session_ttl_hours: parse_in_range(&text, "CHAT_SESSION_TTL_HOURS", defaults.chat_session_ttl_hours, TTL_HOURS),
            chat_idle_ttl_hours: parse_in_range(&text, "CHAT_IDLE_TTL_HOURS", defaults.chat_idle_ttl_hours, TTL_HOURS),
            rate_limit_window_secs: parse_in_range(&text, "RATE_LIMIT_WINDOW_SECS", defaults.rate_limit_window_secs, WINDOW_SECS),
            lead_rate_limit_max: parse_or(&text, "LEAD_RATE_LIMIT_MAX", defaults.lead_rate_limit_max),
            request_rate_limit_max: parse_or(&text, "REQUEST_RATE_LIMIT_MAX", defaults.request_rate_limit_max),
            session_rate_limit_max: parse_or(&text, "SESSION_RATE_LIMIT_MAX", defaults.session_rate_limit_max),
        }
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_secs)
    }

    pub fn chat_ttl(&self) -> SessionTtl {
        SessionTtl {
            submitted: chrono::Duration::hours(self.chat_session_ttl_hours),
            idle: chrono::Duration::hours(self.chat_idle_ttl_hours),
        }
    }
}

fn parse_in_range<T>(
    text: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
    range: RangeInclusive<T>,
) -> T
where
    T: FromStr + PartialOrd + Display + Copy,
{
    let value = parse_or(text, key, default);
    if range.contains(&value) {
        return value;
    }
    tracing::warn!(
        "{} must be between {} and {}, got {}, using the default",
        key,
        range.start(),
        range.end(),
        value
    );
    default
}

fn parse_or<T: FromStr>(text: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    match text(key) {
        None => default,
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!("{} has invalid value '{}', using the default", key, raw);
            default
        }),
    }
}

// =============================================================================
//  APP STATE
// =============================================================================

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub db_pool: Option<PgPool>,
    pub lead_repo: Option<LeadRepository>,
    pub catalog_service: CatalogService,
    pub lead_service: LeadService,
    pub chat_service: ChatService,
}

impl AppState {
    pub async fn new() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let settings = Settings::from_env();

        let db_pool = match &settings.database_url {
            Some(database_url) => {
                let pool = PgPoolOptions::new()
                    .max_connections(5)
                    .acquire_timeout(Duration::from_secs(3))
                    .connect(database_url)
                    .await
                    .context("failed to connect to DATABASE_URL")?;
                tracing::info!("✅ Database connection established");
                Some(pool)
            }
            None => {
                tracing::warn!("DATABASE_URL is not set, leads will not be stored");
                None
            }
        };

        let catalog_service = match &settings.catalog_path {
            Some(path) => CatalogService::from_path(path)
                .with_context(|| format!("failed to load catalog from {}", path.display()))?,
            None => CatalogService::embedded().context("embedded catalog is invalid")?,
        };

        let session_store: Arc<dyn SessionStore> = match &settings.chat_store_dir {
            Some(dir) => Arc::new(
                FileSessionStore::new(dir)
                    .await
                    .with_context(|| format!("failed to open chat store at {}", dir.display()))?,
            ),
            None => Arc::new(MemorySessionStore::new()),
        };

        let notifier = TelegramNotifier::new(
            settings.telegram_bot_token.clone(),
            settings.telegram_chat_id.clone(),
        );
        if !notifier.is_configured() {
            tracing::warn!("Telegram is not configured, chat leads will be rejected");
        }

        Ok(Self::from_parts(
            settings,
            db_pool,
            catalog_service,
            Arc::new(notifier),
            session_store,
        ))
    }

    /// Wires the services together; also used by tests with fakes.
    pub fn from_parts(
        settings: Settings,
        db_pool: Option<PgPool>,
        catalog_service: CatalogService,
        notifier: Arc<dyn LeadNotifier>,
        session_store: Arc<dyn SessionStore>,
    ) -> Self {
        let lead_repo = db_pool.clone().map(LeadRepository::new);

        let window = settings.rate_limit_window();
        let lead_service = LeadService::new(
            lead_repo.clone(),
            notifier,
            RateLimiter::new(window, settings.lead_rate_limit_max),
            RateLimiter::new(window, settings.request_rate_limit_max),
            settings.smtp_host.is_some(),
        );

        let chat_service = ChatService::new(
            session_store,
            Arc::new(lead_service.clone()),
            settings.chat_ttl(),
            RateLimiter::new(window, settings.session_rate_limit_max),
        );

        Self {
            settings: Arc::new(settings),
            db_pool,
            lead_repo,
            catalog_service,
            lead_service,
            chat_service,
        }
    }
}
