//! Payment handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;
use validator::Validate;

use crate::dtos::{
    CreatePaymentRequest, CreditResponse, PaymentResponse, UnpaidInvoiceResponse,
};
use crate::services::payment_allocator;
use crate::AppState;

/// Register a payment and allocate it across the requested invoices.
pub async fn create_payment(
    State(state): State<AppState>,
    Json(payload): Json<CreatePaymentRequest>,
) -> Result<(StatusCode, Json<PaymentResponse>), AppError> {
    tracing::info!(
        client_id = %payload.client_id,
        amount = %payload.amount,
        allocations = payload.invoice_allocations.len(),
        "Registering payment"
    );

    let result = match payload.validate() {
        Ok(()) => payment_allocator::register_payment(&state.db, payload.into()).await,
        Err(err) => Err(err.into()),
    };
    super::record_request("create_payment", &result);
    let outcome = result?;

    Ok((StatusCode::CREATED, Json(PaymentResponse::from(outcome))))
}

/// List a client's invoices with an outstanding balance, ordered by due
/// date.
pub async fn unpaid_invoices(
    State(state): State<AppState>,
    Path(client_id): Path<Uuid>,
) -> Result<Json<Vec<UnpaidInvoiceResponse>>, AppError> {
    let result = state.db.list_unpaid_invoices(client_id).await;
    super::record_request("unpaid_invoices", &result);
    let invoices = result?;

    Ok(Json(
        invoices.into_iter().map(UnpaidInvoiceResponse::from).collect(),
    ))
}

/// Get a client's current credit balance.
pub async fn client_credit(
    State(state): State<AppState>,
    Path(client_id): Path<Uuid>,
) -> Result<Json<CreditResponse>, AppError> {
    let result = match state.db.get_client(client_id).await {
        Ok(Some(client)) => Ok(client),
        Ok(None) => Err(AppError::NotFound(anyhow::anyhow!(
            "Client {} not found",
            client_id
        ))),
        Err(err) => Err(err),
    };
    super::record_request("client_credit", &result);
    let client = result?;

    Ok(Json(CreditResponse {
        client_id: client.client_id,
        credit_balance: client.credit_balance,
    }))
}
