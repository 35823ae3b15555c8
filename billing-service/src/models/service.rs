//! Service plan and client service models.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Client service status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceStatus {
    Active,
    Suspended,
    Cancelled,
}

impl ServiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceStatus::Active => "active",
            ServiceStatus::Suspended => "suspended",
            ServiceStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "suspended" => ServiceStatus::Suspended,
            "cancelled" => ServiceStatus::Cancelled,
            _ => ServiceStatus::Active,
        }
    }
}

/// Priced offering. Immutable reference data for invoicing.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ServicePlan {
    pub plan_id: Uuid,
    pub name: String,
    pub price: Decimal,
    pub billing_cycle: String,
    pub created_utc: DateTime<Utc>,
}

/// A client's subscription to a plan. `billing_day` and `days_to_pay`
/// override the system defaults when set; `last_invoice_date` is
/// written only by the invoice generator.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ClientService {
    pub service_id: Uuid,
    pub client_id: Uuid,
    pub plan_id: Uuid,
    pub username: String,
    pub status: String,
    pub recurring_enabled: bool,
    pub billing_day: Option<i32>,
    pub days_to_pay: Option<i32>,
    pub last_invoice_date: Option<NaiveDate>,
    pub created_utc: DateTime<Utc>,
}

/// A service joined with its plan and client, as selected by the
/// recurring invoice generator.
#[derive(Debug, Clone, FromRow)]
pub struct BillingCandidate {
    pub service_id: Uuid,
    pub client_id: Uuid,
    pub client_name: String,
    pub plan_name: String,
    pub price: Decimal,
    pub billing_day: Option<i32>,
    pub days_to_pay: Option<i32>,
    pub last_invoice_date: Option<NaiveDate>,
}
