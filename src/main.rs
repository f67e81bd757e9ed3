//! Storefront API - catalog, checkout and order tracking

use anyhow::Result;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use storefront::config::NotifierKind;
use storefront::services::{LogNotifier, MockPaymentGateway, NatsNotifier, Notifier};
use storefront::{api, store, AppConfig};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;
    let db = store::connect(&config.database_url, config.max_connections).await?;
    store::migrate(&db).await?;
    if config.seed_catalog {
        store::seed_catalog(&db).await?;
    }

    let notifier: Arc<dyn Notifier> = match &config.notifier {
        NotifierKind::Log => Arc::new(LogNotifier::new(&config.frontend_url)),
        NotifierKind::Nats { url, subject_prefix } => Arc::new(NatsNotifier::connect(url, subject_prefix.as_str()).await?),
    };
    tracing::info!(provider = notifier.provider(), "Notifications configured");

    let state = api::AppState::new(db, &config, notifier, Arc::new(MockPaymentGateway::new()));
    let app = api::router(state, &config.allowed_origins);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("🚀 Storefront API listening on {}", addr);
    axum::serve(tokio::net::TcpListener::bind(&addr).await?, app).await?;
    Ok(())
}
