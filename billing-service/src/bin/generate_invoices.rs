//! Scheduled entry point for the recurring invoice generator.
//!
//! Runs the same generation logic as the HTTP trigger, once, for
//! today. Exits non-zero on any error so the cron wrapper can alert.

use billing_service::config::Config;
use billing_service::services::invoice_generator::{self, RunTrigger};
use billing_service::services::Database;
use secrecy::ExposeSecret;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,billing_service=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let db = Database::new(
        config.database.url.expose_secret(),
        config.database.max_connections,
        config.database.min_connections,
    )
    .await?;
    db.run_migrations().await?;

    let today = chrono::Utc::now().date_naive();
    println!("Generating recurring invoices for {}", today);

    let summary = invoice_generator::generate_recurring_invoices(&db, today, RunTrigger::Cron).await?;

    for invoice in &summary.invoices {
        println!(
            "  {} {} ({}) {}",
            invoice.invoice_number, invoice.client_name, invoice.service_name, invoice.amount
        );
    }
    println!("Generated {} invoices", summary.invoices.len());

    Ok(())
}
