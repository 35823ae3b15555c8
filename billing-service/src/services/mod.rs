//! Services module for billing-service.

pub mod billing_settings;
pub mod credentials;
pub mod database;
pub mod invoice_generator;
pub mod metrics;
pub mod payment_allocator;

pub use billing_settings::BillingDefaults;
pub use database::Database;
pub use metrics::{get_metrics, init_metrics};
