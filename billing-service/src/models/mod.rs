//! Domain models for billing-service.

mod client;
mod invoice;
mod payment;
mod service;

pub use client::Client;
pub use invoice::{Invoice, InvoiceItem, InvoiceStatus, UnpaidInvoice};
pub use payment::{AllocationInput, CreatePayment, Payment, PaymentAllocation};
pub use service::{BillingCandidate, ClientService, ServicePlan, ServiceStatus};
