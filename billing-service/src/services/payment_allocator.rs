//! Payment registration and allocation.
//!
//! A payment and its allocations are written in one transaction. Each
//! allocation is clamped to the invoice's outstanding balance; whatever
//! remains of the payment afterwards is banked as client credit. The
//! planning arithmetic is pure so the invariants are testable without a
//! database.

use crate::models::{Client, CreatePayment, Invoice, InvoiceStatus, Payment};
use crate::services::database::Database;
use crate::services::metrics::PAYMENTS_TOTAL;
use rust_decimal::Decimal;
use service_core::error::AppError;
use std::collections::HashMap;
use tracing::{info, instrument};
use uuid::Uuid;

/// Result of registering a payment.
#[derive(Debug, Clone)]
pub struct PaymentOutcome {
    pub payment: Payment,
    pub total_allocated: Decimal,
    pub credit_added: Decimal,
    pub current_credit: Decimal,
}

/// One requested allocation paired with the invoice's outstanding
/// balance at planning time.
#[derive(Debug, Clone, Copy)]
pub struct AllocationCandidate {
    pub invoice_id: Uuid,
    pub requested: Decimal,
    pub amount_due: Decimal,
}

/// Allocation amounts decided for a payment, parallel to the requested
/// list (zero entries are skipped at write time).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationPlan {
    pub amounts: Vec<Decimal>,
    pub total_allocated: Decimal,
}

/// Clamp a requested allocation to the invoice's outstanding balance.
pub fn clamp_allocation(requested: Decimal, amount_due: Decimal) -> Decimal {
    requested.min(amount_due)
}

/// Decide how much of the payment goes to each invoice, in caller
/// order. Non-positive requests allocate nothing. An invoice repeated
/// later in the list is clamped against its balance net of the amounts
/// already planned for it, so a request can never pay an invoice past
/// its total. The clamped total may never exceed the payment amount;
/// callers over-committing a payment across invoices get a validation
/// error instead of negative credit.
pub fn plan_allocations(
    payment_amount: Decimal,
    candidates: &[AllocationCandidate],
) -> Result<AllocationPlan, AppError> {
    let mut amounts = Vec::with_capacity(candidates.len());
    let mut total_allocated = Decimal::ZERO;
    let mut planned_per_invoice: HashMap<Uuid, Decimal> = HashMap::new();

    for candidate in candidates {
        if candidate.requested <= Decimal::ZERO {
            amounts.push(Decimal::ZERO);
            continue;
        }

        let already_planned = planned_per_invoice
            .get(&candidate.invoice_id)
            .copied()
            .unwrap_or(Decimal::ZERO);
        let remaining_due = (candidate.amount_due - already_planned).max(Decimal::ZERO);
        let allocated = clamp_allocation(candidate.requested, remaining_due);
        if total_allocated + allocated > payment_amount {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Requested allocations ({}) exceed the payment amount ({})",
                total_allocated + allocated,
                payment_amount
            )));
        }

        total_allocated += allocated;
        *planned_per_invoice
            .entry(candidate.invoice_id)
            .or_insert(Decimal::ZERO) += allocated;
        amounts.push(allocated);
    }

    Ok(AllocationPlan {
        amounts,
        total_allocated,
    })
}

/// Record a payment, distribute it across the requested invoices and
/// credit the remainder to the client. No partial state survives a
/// failure: validation errors reject before any write, and referential
/// or database errors roll the transaction back.
#[instrument(skip(db, input), fields(client_id = %input.client_id, amount = %input.amount))]
pub async fn register_payment(
    db: &Database,
    input: CreatePayment,
) -> Result<PaymentOutcome, AppError> {
    if input.amount <= Decimal::ZERO {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Payment amount must be greater than zero"
        )));
    }
    if input.payment_method.trim().is_empty() {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Payment method is required"
        )));
    }

    let mut tx = db.pool().begin().await?;

    // Lock the client row: the credit balance update below must be a
    // read-modify-write against the same transaction.
    let client: Client = sqlx::query_as(
        r#"
        SELECT client_id, name, status, credit_balance, created_utc
        FROM clients
        WHERE client_id = $1
        FOR UPDATE
        "#,
    )
    .bind(input.client_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Client {} not found", input.client_id)))?;

    let payment: Payment = sqlx::query_as(
        r#"
        INSERT INTO payments (
            payment_id, client_id, amount, payment_date, payment_method,
            transaction_ref, notes
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING payment_id, client_id, amount, payment_date, payment_method,
            transaction_ref, notes, created_utc
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(input.client_id)
    .bind(input.amount)
    .bind(input.payment_date)
    .bind(&input.payment_method)
    .bind(&input.transaction_ref)
    .bind(&input.notes)
    .fetch_one(&mut *tx)
    .await?;

    // Lock the target invoices and collect their outstanding balances,
    // in the order the caller gave them.
    let mut candidates = Vec::with_capacity(input.allocations.len());
    for allocation in &input.allocations {
        if allocation.amount <= Decimal::ZERO {
            candidates.push(AllocationCandidate {
                invoice_id: allocation.invoice_id,
                requested: allocation.amount,
                amount_due: Decimal::ZERO,
            });
            continue;
        }

        let invoice: Invoice = sqlx::query_as(
            r#"
            SELECT invoice_id, invoice_number, client_id, issue_date, due_date,
                subtotal, tax, total, amount_paid, status, created_utc
            FROM invoices
            WHERE invoice_id = $1 AND client_id = $2
            FOR UPDATE
            "#,
        )
        .bind(allocation.invoice_id)
        .bind(input.client_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| {
            AppError::BadRequest(anyhow::anyhow!(
                "Invoice {} not found for this client",
                allocation.invoice_id
            ))
        })?;

        if invoice.status == InvoiceStatus::Cancelled.as_str() {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Invoice {} is cancelled",
                invoice.invoice_number
            )));
        }

        candidates.push(AllocationCandidate {
            invoice_id: allocation.invoice_id,
            requested: allocation.amount,
            amount_due: invoice.total - invoice.amount_paid,
        });
    }

    let plan = plan_allocations(payment.amount, &candidates)?;

    for (allocation, amount) in input.allocations.iter().zip(&plan.amounts) {
        if *amount <= Decimal::ZERO {
            continue;
        }

        sqlx::query(
            r#"
            INSERT INTO payment_allocations (allocation_id, payment_id, invoice_id, amount)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(payment.payment_id)
        .bind(allocation.invoice_id)
        .bind(*amount)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE invoices
            SET amount_paid = amount_paid + $2,
                status = CASE WHEN amount_paid + $2 >= total THEN 'paid' ELSE status END
            WHERE invoice_id = $1
            "#,
        )
        .bind(allocation.invoice_id)
        .bind(*amount)
        .execute(&mut *tx)
        .await?;
    }

    let credit_added = payment.amount - plan.total_allocated;
    let current_credit = if credit_added > Decimal::ZERO {
        sqlx::query_scalar(
            r#"
            UPDATE clients
            SET credit_balance = credit_balance + $2
            WHERE client_id = $1
            RETURNING credit_balance
            "#,
        )
        .bind(input.client_id)
        .bind(credit_added)
        .fetch_one(&mut *tx)
        .await?
    } else {
        client.credit_balance
    };

    tx.commit().await?;

    PAYMENTS_TOTAL
        .with_label_values(&[payment.payment_method.as_str()])
        .inc();

    info!(
        payment_id = %payment.payment_id,
        total_allocated = %plan.total_allocated,
        credit_added = %credit_added,
        "Payment registered"
    );

    Ok(PaymentOutcome {
        payment,
        total_allocated: plan.total_allocated,
        credit_added,
        current_credit,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(cents: i64) -> Decimal {
        Decimal::new(cents, 2)
    }

    fn candidate(requested: i64, amount_due: i64) -> AllocationCandidate {
        candidate_for(Uuid::new_v4(), requested, amount_due)
    }

    fn candidate_for(invoice_id: Uuid, requested: i64, amount_due: i64) -> AllocationCandidate {
        AllocationCandidate {
            invoice_id,
            requested: dec(requested),
            amount_due: dec(amount_due),
        }
    }

    #[test]
    fn allocation_is_clamped_to_the_outstanding_balance() {
        assert_eq!(clamp_allocation(dec(80_00), dec(50_00)), dec(50_00));
        assert_eq!(clamp_allocation(dec(30_00), dec(50_00)), dec(30_00));
        assert_eq!(clamp_allocation(dec(50_00), dec(50_00)), dec(50_00));
    }

    #[test]
    fn over_requesting_one_invoice_leaves_the_rest_for_credit() {
        // 120.00 payment, one invoice with 100.00 due, allocation asks 100.00.
        let plan = plan_allocations(dec(120_00), &[candidate(100_00, 100_00)]).unwrap();
        assert_eq!(plan.amounts, vec![dec(100_00)]);
        assert_eq!(plan.total_allocated, dec(100_00));
        // credit_added = amount - total_allocated = 20.00
        assert_eq!(dec(120_00) - plan.total_allocated, dec(20_00));
    }

    #[test]
    fn clamped_excess_is_not_recorded_against_the_invoice() {
        // Requesting 80.00 against 50.00 due allocates exactly 50.00.
        let plan = plan_allocations(dec(100_00), &[candidate(80_00, 50_00)]).unwrap();
        assert_eq!(plan.amounts, vec![dec(50_00)]);
        assert_eq!(plan.total_allocated, dec(50_00));
    }

    #[test]
    fn non_positive_requests_are_skipped_silently() {
        let plan = plan_allocations(
            dec(100_00),
            &[candidate(0, 40_00), candidate(-10_00, 40_00), candidate(25_00, 40_00)],
        )
        .unwrap();
        assert_eq!(plan.amounts, vec![dec(0), dec(0), dec(25_00)]);
        assert_eq!(plan.total_allocated, dec(25_00));
    }

    #[test]
    fn fully_allocated_payment_leaves_no_credit() {
        let plan =
            plan_allocations(dec(90_00), &[candidate(60_00, 60_00), candidate(30_00, 30_00)])
                .unwrap();
        assert_eq!(plan.total_allocated, dec(90_00));
        assert_eq!(dec(90_00) - plan.total_allocated, Decimal::ZERO);
    }

    #[test]
    fn allocations_exceeding_the_payment_amount_are_rejected() {
        let err = plan_allocations(
            dec(50_00),
            &[candidate(40_00, 40_00), candidate(40_00, 40_00)],
        )
        .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn repeated_invoice_is_clamped_against_its_remaining_balance() {
        // The same invoice listed twice: 50.00 due, both entries ask
        // 50.00. Only the first gets anything; the second sees a
        // balance already consumed within this payment.
        let invoice = Uuid::new_v4();
        let plan = plan_allocations(
            dec(100_00),
            &[
                candidate_for(invoice, 50_00, 50_00),
                candidate_for(invoice, 50_00, 50_00),
            ],
        )
        .unwrap();
        assert_eq!(plan.amounts, vec![dec(50_00), Decimal::ZERO]);
        assert_eq!(plan.total_allocated, dec(50_00));
    }

    #[test]
    fn repeated_invoice_collects_only_up_to_its_total() {
        // Two partial entries for one invoice owing 50.00: the second
        // takes the 20.00 remainder, not its full 30.00 request.
        let invoice = Uuid::new_v4();
        let plan = plan_allocations(
            dec(100_00),
            &[
                candidate_for(invoice, 30_00, 50_00),
                candidate_for(invoice, 30_00, 50_00),
            ],
        )
        .unwrap();
        assert_eq!(plan.amounts, vec![dec(30_00), dec(20_00)]);
        assert_eq!(plan.total_allocated, dec(50_00));
    }

    #[test]
    fn settled_invoice_accepts_nothing_more() {
        let plan = plan_allocations(dec(50_00), &[candidate(20_00, 0)]).unwrap();
        assert_eq!(plan.amounts, vec![Decimal::ZERO]);
        assert_eq!(plan.total_allocated, Decimal::ZERO);
    }
}
