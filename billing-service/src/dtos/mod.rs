//! Request/response shapes for the HTTP surface. Wire JSON is
//! camelCase; internal models stay snake_case.

use crate::models::{AllocationInput, CreatePayment, Payment, UnpaidInvoice};
use crate::services::invoice_generator::GeneratedInvoice;
use crate::services::payment_allocator::PaymentOutcome;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationRequest {
    pub invoice_id: Uuid,
    pub amount: Decimal,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentRequest {
    pub client_id: Uuid,
    // Positivity is enforced by the allocator before any write.
    pub amount: Decimal,
    pub payment_date: NaiveDate,
    #[validate(length(min = 1, message = "paymentMethod is required"))]
    pub payment_method: String,
    pub transaction_id: Option<String>,
    pub notes: Option<String>,
    #[serde(default)]
    pub invoice_allocations: Vec<AllocationRequest>,
}

impl From<CreatePaymentRequest> for CreatePayment {
    fn from(req: CreatePaymentRequest) -> Self {
        CreatePayment {
            client_id: req.client_id,
            amount: req.amount,
            payment_date: req.payment_date,
            payment_method: req.payment_method,
            transaction_ref: req.transaction_id,
            notes: req.notes,
            allocations: req
                .invoice_allocations
                .into_iter()
                .map(|a| AllocationInput {
                    invoice_id: a.invoice_id,
                    amount: a.amount,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentBody {
    pub payment_id: Uuid,
    pub client_id: Uuid,
    pub amount: Decimal,
    pub payment_date: NaiveDate,
    pub payment_method: String,
    pub transaction_ref: Option<String>,
    pub notes: Option<String>,
    pub created_utc: DateTime<Utc>,
}

impl From<Payment> for PaymentBody {
    fn from(payment: Payment) -> Self {
        PaymentBody {
            payment_id: payment.payment_id,
            client_id: payment.client_id,
            amount: payment.amount,
            payment_date: payment.payment_date,
            payment_method: payment.payment_method,
            transaction_ref: payment.transaction_ref,
            notes: payment.notes,
            created_utc: payment.created_utc,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResponse {
    pub payment: PaymentBody,
    pub total_allocated: Decimal,
    pub credit_added: Decimal,
    pub current_credit: Decimal,
}

impl From<PaymentOutcome> for PaymentResponse {
    fn from(outcome: PaymentOutcome) -> Self {
        PaymentResponse {
            payment: outcome.payment.into(),
            total_allocated: outcome.total_allocated,
            credit_added: outcome.credit_added,
            current_credit: outcome.current_credit,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnpaidInvoiceResponse {
    pub invoice_id: Uuid,
    pub invoice_number: String,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub total: Decimal,
    pub amount_paid: Decimal,
    pub amount_due: Decimal,
    pub status: String,
}

impl From<UnpaidInvoice> for UnpaidInvoiceResponse {
    fn from(inv: UnpaidInvoice) -> Self {
        UnpaidInvoiceResponse {
            invoice_id: inv.invoice_id,
            invoice_number: inv.invoice_number,
            issue_date: inv.issue_date,
            due_date: inv.due_date,
            total: inv.total,
            amount_paid: inv.amount_paid,
            amount_due: inv.amount_due,
            status: inv.status,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditResponse {
    pub client_id: Uuid,
    pub credit_balance: Decimal,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateInvoicesResponse {
    pub success: bool,
    pub message: String,
    pub invoices: Vec<GeneratedInvoice>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_response_is_camel_case_all_the_way_down() {
        let outcome = PaymentOutcome {
            payment: Payment {
                payment_id: Uuid::new_v4(),
                client_id: Uuid::new_v4(),
                amount: Decimal::new(100_00, 2),
                payment_date: NaiveDate::from_ymd_opt(2026, 8, 29).unwrap(),
                payment_method: "cash".to_string(),
                transaction_ref: Some("txn-1".to_string()),
                notes: None,
                created_utc: Utc::now(),
            },
            total_allocated: Decimal::new(80_00, 2),
            credit_added: Decimal::new(20_00, 2),
            current_credit: Decimal::new(20_00, 2),
        };

        let body = serde_json::to_value(PaymentResponse::from(outcome)).unwrap();

        assert!(body.get("totalAllocated").is_some());
        assert!(body.get("creditAdded").is_some());
        assert!(body.get("currentCredit").is_some());

        let payment = body.get("payment").unwrap();
        assert!(payment.get("paymentId").is_some());
        assert!(payment.get("clientId").is_some());
        assert!(payment.get("paymentMethod").is_some());
        assert!(payment.get("transactionRef").is_some());
        assert!(payment.get("createdUtc").is_some());
        assert!(payment.get("payment_id").is_none());
        assert!(payment.get("transaction_ref").is_none());
    }
}
