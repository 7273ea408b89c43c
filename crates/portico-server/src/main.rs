//! Portico Server — Application entry point.

mod activity;
mod api;
mod cookies;
mod http;
mod mailer;
mod settings;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::api::Portico;
use crate::mailer::SmtpMailer;
use crate::settings::Settings;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("portico=info".parse().unwrap()),
        )
        .json()
        .init();

    tracing::info!("Starting Portico server...");

    if let Err(e) = run().await {
        tracing::error!(error = %e, "Portico server failed");
        std::process::exit(1);
    }

    tracing::info!("Portico server stopped.");
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::from_env()?;

    let db = portico_db::connect(&settings.db).await?;
    portico_db::run_migrations(&db).await?;

    let mailer = SmtpMailer::new(&settings.smtp)?;

    let bind_addr = settings.bind_addr.clone();
    let state = Arc::new(Portico::new(settings, db, mailer));
    let router = api::build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "Portico server listening");
    axum::serve(listener, router).await?;

    Ok(())
}
