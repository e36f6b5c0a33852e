// src/services/lead_service.rs

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info, warn};
use validator::Validate;

use crate::{
    common::error::AppError,
    db::lead_repo::LeadRepository,
    models::lead::{
        Contact, HistoryItem, Integrations, LeadPayload, LeadSource, MessageRole, NewLead,
        RequestFormPayload,
    },
    services::{
        chat_flow::HISTORY_TAIL,
        notifier::{LeadNotifier, NotifyError},
        rate_limiter::RateLimiter,
    },
};

const CHAT_LEAD_NAME: &str = "Заявка из чата Алсу";
const EMPTY: &str = "—";

/// Where chat leads go. The chat service only sees this seam, so tests can
/// record submissions without HTTP or Telegram.
#[async_trait]
pub trait LeadSubmitter: Send + Sync {
    async fn submit_chat_lead(&self, client_ip: &str, payload: LeadPayload) -> Result<(), AppError>;
}

#[derive(Clone)]
pub struct LeadService {
    repo: Option<LeadRepository>,
    notifier: Arc<dyn LeadNotifier>,
    lead_limiter: RateLimiter,
    request_limiter: RateLimiter,
    smtp_ready: bool,
}

impl LeadService {
    pub fn new(
        repo: Option<LeadRepository>,
        notifier: Arc<dyn LeadNotifier>,
        lead_limiter: RateLimiter,
        request_limiter: RateLimiter,
        smtp_ready: bool,
    ) -> Self {
        Self {
            repo,
            notifier,
            lead_limiter,
            request_limiter,
            smtp_ready,
        }
    }

    pub fn integrations(&self) -> Integrations {
        Integrations {
            smtp_ready: self.smtp_ready,
            telegram_ready: self.notifier.is_configured(),
        }
    }

    pub fn limiters(&self) -> [&RateLimiter; 2] {
        [&self.lead_limiter, &self.request_limiter]
    }

    /// Request form from a product page. Delivery is best effort: the visitor
    /// gets `ok` once the form is valid, and the readiness of each channel.
    pub async fn submit_request_form(
        &self,
        client_ip: &str,
        form: RequestFormPayload,
    ) -> Result<Integrations, AppError> {
        if !form.has_consent() {
            return Err(AppError::ConsentRequired);
        }

        let form = form.trimmed();
        form.validate()?;

        if !self.request_limiter.check(client_ip) {
            warn!(client_ip, "request form rate limit exceeded");
            return Err(AppError::TooManyRequests);
        }

        info!(
            product_id = form.product_id.as_deref().unwrap_or(EMPTY),
            "request form received"
        );

        if let Some(repo) = &self.repo {
            repo.create(&NewLead {
                name: form.name.clone(),
                contact: form.email.clone(),
                message: request_lead_message(&form),
                source: LeadSource::Form,
            })
            .await?;
        }

        if self.notifier.is_configured() {
            if let Err(e) = self.notifier.send(&format_request_message(&form)).await {
                error!("request form notification failed: {}", e);
            }
        } else {
            warn!("Telegram is not configured, request form kept in log only");
        }

        Ok(self.integrations())
    }
}

#[async_trait]
impl LeadSubmitter for LeadService {
    async fn submit_chat_lead(&self, client_ip: &str, payload: LeadPayload) -> Result<(), AppError> {
        let raw_contact = payload.contact.trim();
        if raw_contact.is_empty() {
            return Err(AppError::ContactRequired);
        }
        let contact = Contact::parse(raw_contact).ok_or(AppError::InvalidContact)?;

        if !self.lead_limiter.check(client_ip) {
            warn!(client_ip, "lead rate limit exceeded");
            return Err(AppError::TooManyRequests);
        }

        let contact = contact.to_string();
        let history = payload.valid_history();

        if let Some(repo) = &self.repo {
            let lead = repo
                .create(&NewLead {
                    name: CHAT_LEAD_NAME.to_string(),
                    contact: contact.clone(),
                    message: chat_lead_message(&payload),
                    source: LeadSource::Chat,
                })
                .await?;
            info!(lead_id = %lead.id, "chat lead stored");
        }

        if !self.notifier.is_configured() {
            error!("Telegram env is not configured");
            return Err(NotifyError::NotConfigured.into());
        }

        self.notifier
            .send(&format_chat_lead_message(&payload, &contact, &history))
            .await?;

        info!("chat lead delivered");
        Ok(())
    }
}

// =============================================================================
//  FORMATTING
// =============================================================================

pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

fn or_dash(value: Option<&str>) -> &str {
    value.map(str::trim).filter(|v| !v.is_empty()).unwrap_or(EMPTY)
}

/// Plain-text summary stored with the lead.
pub fn chat_lead_message(payload: &LeadPayload) -> String {
    [
        format!("Установка: {}", or_dash(payload.location.as_deref())),
        format!("Назначение: {}", or_dash(payload.purpose.as_deref())),
        format!("Размер: {}", or_dash(payload.size.as_deref())),
        format!("Сроки: {}", or_dash(payload.timeline.as_deref())),
    ]
    .join(" | ")
}

fn request_lead_message(form: &RequestFormPayload) -> String {
    let mut parts = Vec::new();
    if let Some(product) = &form.product_name {
        parts.push(format!("Товар: {product}"));
    }
    if let Some(id) = &form.product_id {
        parts.push(format!("ID: {id}"));
    }
    if let Some(comment) = &form.comment {
        parts.push(format!("Комментарий: {comment}"));
    }
    if parts.is_empty() {
        return EMPTY.to_string();
    }
    parts.join(" | ")
}

/// The last `HISTORY_TAIL` entries, or an empty string without history.
pub fn format_history(history: &[HistoryItem]) -> String {
    if history.is_empty() {
        return String::new();
    }

    let start = history.len().saturating_sub(HISTORY_TAIL);
    let rows: Vec<String> = history[start..]
        .iter()
        .map(|item| {
            let author = match item.role {
                MessageRole::User => "Клиент",
                MessageRole::Bot => "Алсу",
            };
            format!("• <b>{author}:</b> {}", escape_html(&item.text))
        })
        .collect();

    format!("\n\n<b>💬 Контекст (последние реплики):</b>\n{}", rows.join("\n"))
}

pub fn format_chat_lead_message(payload: &LeadPayload, contact: &str, history: &[HistoryItem]) -> String {
    let mut lines = vec![
        "<b>🟢 Новая заявка с сайта Sapphire LED</b>".to_string(),
        String::new(),
        format!("<b>📍 Установка:</b> {}", escape_html(or_dash(payload.location.as_deref()))),
        format!("<b>🎯 Назначение:</b> {}", escape_html(or_dash(payload.purpose.as_deref()))),
        format!("<b>📐 Размер:</b> {}", escape_html(or_dash(payload.size.as_deref()))),
        format!("<b>⏱ Сроки:</b> {}", escape_html(or_dash(payload.timeline.as_deref()))),
        String::new(),
        "<b>📞 Контакт:</b>".to_string(),
        escape_html(contact),
    ];

    if payload.page_url.is_some() || payload.page_title.is_some() {
        lines.push(String::new());
        lines.push(format!(
            "<b>Страница:</b> {} ({})",
            escape_html(or_dash(payload.page_title.as_deref())),
            escape_html(or_dash(payload.page_url.as_deref()))
        ));
    }

    lines.push(format_history(history));

    lines
        .into_iter()
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_request_message(form: &RequestFormPayload) -> String {
    let mut lines = vec![
        "<b>📝 Запрос с карточки товара</b>".to_string(),
        format!("<b>Имя:</b> {}", escape_html(&form.name)),
        format!("<b>E-mail:</b> {}", escape_html(&form.email)),
    ];
    if let Some(product) = &form.product_name {
        let id = form.product_id.as_deref().unwrap_or(EMPTY);
        lines.push(format!("<b>Товар:</b> {} ({})", escape_html(product), escape_html(id)));
    }
    if let Some(comment) = &form.comment {
        lines.push(format!("<b>Комментарий:</b> {}", escape_html(comment)));
    }
    lines.join("\n")
}
