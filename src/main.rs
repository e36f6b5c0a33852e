//src/main.rs

use std::time::Instant;

use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use sapphire_led::config::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    let app_state = AppState::new().await?;

    if let Some(pool) = &app_state.db_pool {
        sqlx::migrate!().run(pool).await?;
        tracing::info!("✅ Database migrations applied");
    }

    spawn_housekeeping(&app_state);

    let app = sapphire_led::app(app_state.clone());

    let addr = format!("0.0.0.0:{}", app_state.settings.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("🚀 Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Once per window: forgets idle clients so the limiter maps stay small and
/// drops expired chat sessions from the store.
fn spawn_housekeeping(app_state: &AppState) {
    let lead_service = app_state.lead_service.clone();
    let chat_service = app_state.chat_service.clone();
    let period = app_state.settings.rate_limit_window();

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            let now = Instant::now();
            for limiter in lead_service.limiters() {
                limiter.purge_expired(now);
            }
            chat_service.limiter().purge_expired(now);

            if let Err(e) = chat_service.purge_expired().await {
                tracing::error!("chat session purge failed: {}", e);
            }
        }
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
