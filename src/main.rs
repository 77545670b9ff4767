use std::sync::Arc;

use ringline::config::RoutingConfig;
use ringline::notify::{NotifyConfig, VoicemailNotifier};
use ringline::routes::{AppState, router};
use ringline::store::{LibSqlStore, SessionStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider before any TLS usage (lettre).
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = Arc::new(RoutingConfig::from_env());

    let db_path =
        std::env::var("RINGLINE_DB_PATH").unwrap_or_else(|_| "./data/ringline.db".to_string());
    let store: Arc<dyn SessionStore> =
        Arc::new(LibSqlStore::new_local(std::path::Path::new(&db_path)).await?);

    let notifier = NotifyConfig::from_env().map(|cfg| {
        tracing::info!(smtp = %cfg.smtp_host, to = %cfg.to_address, "Voicemail notifier enabled");
        Arc::new(VoicemailNotifier::new(cfg))
    });
    if notifier.is_none() {
        tracing::info!("Voicemail notifier disabled (RINGLINE_SMTP_HOST / RINGLINE_NOTIFY_TO not set)");
    }

    tracing::info!(
        forward_list = %config.forward_list_path.display(),
        block_list = ?config.block_list_path,
        voice_path = %config.voice_path,
        db = %db_path,
        "ringline v{} starting",
        env!("CARGO_PKG_VERSION")
    );

    let bind = std::env::var("RINGLINE_BIND").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    let app = router(AppState { config, store, notifier });

    let listener = tokio::net::TcpListener::bind(&bind).await?;
    tracing::info!(addr = %bind, "Webhook server listening");
    axum::serve(listener, app).await?;

    Ok(())
}
