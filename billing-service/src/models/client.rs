//! Client model.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Billing party. The credit balance only ever moves inside a payment
/// transaction and never goes negative (enforced by a DB check).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Client {
    pub client_id: Uuid,
    pub name: String,
    pub status: String,
    pub credit_balance: Decimal,
    pub created_utc: DateTime<Utc>,
}
