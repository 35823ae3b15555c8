//! Recurring invoice generation handler.

use axum::{extract::State, Json};
use service_core::error::AppError;

use crate::dtos::GenerateInvoicesResponse;
use crate::services::invoice_generator::{self, RunTrigger};
use crate::AppState;

/// Trigger a recurring invoice run for today.
pub async fn generate_recurring_invoices(
    State(state): State<AppState>,
) -> Result<Json<GenerateInvoicesResponse>, AppError> {
    let today = chrono::Utc::now().date_naive();

    tracing::info!(today = %today, "Recurring invoice run requested");

    let result =
        invoice_generator::generate_recurring_invoices(&state.db, today, RunTrigger::Http).await;
    super::record_request("generate_recurring_invoices", &result);
    let summary = result?;

    Ok(Json(GenerateInvoicesResponse {
        success: true,
        message: format!("Generated {} invoices", summary.invoices.len()),
        invoices: summary.invoices,
    }))
}
