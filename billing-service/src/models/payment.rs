//! Payment and allocation models.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A money-received event. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Payment {
    pub payment_id: Uuid,
    pub client_id: Uuid,
    pub amount: Decimal,
    pub payment_date: NaiveDate,
    pub payment_method: String,
    pub transaction_ref: Option<String>,
    pub notes: Option<String>,
    pub created_utc: DateTime<Utc>,
}

/// Links a payment to an invoice with the amount credited against it.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PaymentAllocation {
    pub allocation_id: Uuid,
    pub payment_id: Uuid,
    pub invoice_id: Uuid,
    pub amount: Decimal,
    pub created_utc: DateTime<Utc>,
}

/// Caller-requested allocation of part of a payment to one invoice.
#[derive(Debug, Clone)]
pub struct AllocationInput {
    pub invoice_id: Uuid,
    pub amount: Decimal,
}

/// Input for registering a payment.
#[derive(Debug, Clone)]
pub struct CreatePayment {
    pub client_id: Uuid,
    pub amount: Decimal,
    pub payment_date: NaiveDate,
    pub payment_method: String,
    pub transaction_ref: Option<String>,
    pub notes: Option<String>,
    pub allocations: Vec<AllocationInput>,
}
