//! Recurring invoice generation.
//!
//! One shared entry point, [`generate_recurring_invoices`], called from
//! both the HTTP handler and the cron binary so the two triggers can
//! never drift apart. A run is a single transaction: candidate service
//! rows are locked up front and any failure rolls the whole batch back.

use crate::models::{BillingCandidate, ServiceStatus};
use crate::services::billing_settings::BillingDefaults;
use crate::services::database::Database;
use crate::services::metrics::INVOICES_GENERATED_TOTAL;
use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;
use service_core::error::AppError;
use tracing::{info, instrument};
use uuid::Uuid;

/// What triggered a generator run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunTrigger {
    Http,
    Cron,
}

impl RunTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunTrigger::Http => "http",
            RunTrigger::Cron => "cron",
        }
    }
}

/// Summary entry for one created invoice.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedInvoice {
    pub invoice_number: String,
    pub client_name: String,
    pub service_name: String,
    pub amount: Decimal,
}

/// Outcome of one generator run.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub invoices: Vec<GeneratedInvoice>,
}

/// Broad candidate test: a service is due when its effective billing
/// day matches today, when it has never been billed, or when its last
/// invoice is from another month (catch-up for missed cycles).
pub fn is_due(
    last_invoice_date: Option<NaiveDate>,
    effective_billing_day: u32,
    today: NaiveDate,
) -> bool {
    match last_invoice_date {
        None => true,
        Some(last) => {
            effective_billing_day == today.day()
                || last.month() != today.month()
                || last.year() != today.year()
        }
    }
}

/// Authoritative dedup guard: a service already invoiced in the current
/// calendar month is skipped regardless of which candidate rule
/// matched. Without this, a daily run would re-bill a service every day
/// of its billing-day month.
pub fn billed_this_month(last_invoice_date: Option<NaiveDate>, today: NaiveDate) -> bool {
    match last_invoice_date {
        Some(last) => last.year() == today.year() && last.month() == today.month(),
        None => false,
    }
}

/// Due date is the issue date plus the effective payment window.
pub fn due_date_for(issue_date: NaiveDate, days_to_pay: i64) -> NaiveDate {
    issue_date + chrono::Duration::days(days_to_pay)
}

/// Generate invoices for every active, recurring-enabled service due
/// for billing on `today`, and advance each billed service's
/// `last_invoice_date`. All-or-nothing: one failing service aborts the
/// entire run.
#[instrument(skip(db), fields(trigger = trigger.as_str(), today = %today))]
pub async fn generate_recurring_invoices(
    db: &Database,
    today: NaiveDate,
    trigger: RunTrigger,
) -> Result<RunSummary, AppError> {
    let defaults = BillingDefaults::load(db.pool()).await?;

    let mut tx = db.pool().begin().await?;

    // Lock the candidate rows for the duration of the run so two
    // overlapping runs cannot both pass the monthly dedup check for the
    // same service.
    let candidates: Vec<BillingCandidate> = sqlx::query_as(
        r#"
        SELECT cs.service_id, cs.client_id, c.name AS client_name,
            p.name AS plan_name, p.price, cs.billing_day, cs.days_to_pay,
            cs.last_invoice_date
        FROM client_services cs
        JOIN clients c ON c.client_id = cs.client_id
        JOIN service_plans p ON p.plan_id = cs.plan_id
        WHERE cs.status = $1
          AND cs.recurring_enabled
        ORDER BY cs.created_utc
        FOR UPDATE OF cs
        "#,
    )
    .bind(ServiceStatus::Active.as_str())
    .fetch_all(&mut *tx)
    .await?;

    let mut summary = RunSummary::default();

    for candidate in candidates {
        let billing_day = defaults.effective_billing_day(candidate.billing_day);
        if !is_due(candidate.last_invoice_date, billing_day, today) {
            continue;
        }
        if billed_this_month(candidate.last_invoice_date, today) {
            continue;
        }

        let due_date = due_date_for(today, defaults.effective_days_to_pay(candidate.days_to_pay));

        let subtotal = candidate.price;
        // Tax lookup not implemented yet; extension point for a
        // per-jurisdiction rate.
        let tax = Decimal::ZERO;
        let total = subtotal + tax;

        let invoice_number: String = sqlx::query_scalar("SELECT next_invoice_number()")
            .fetch_one(&mut *tx)
            .await?;

        let invoice_id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO invoices (
                invoice_id, invoice_number, client_id, issue_date, due_date,
                subtotal, tax, total, status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'pending')
            "#,
        )
        .bind(invoice_id)
        .bind(&invoice_number)
        .bind(candidate.client_id)
        .bind(today)
        .bind(due_date)
        .bind(subtotal)
        .bind(tax)
        .bind(total)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO invoice_items (item_id, invoice_id, description, quantity, unit_price, total)
            VALUES ($1, $2, $3, 1, $4, $4)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(invoice_id)
        .bind(&candidate.plan_name)
        .bind(subtotal)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE client_services SET last_invoice_date = $2 WHERE service_id = $1")
            .bind(candidate.service_id)
            .bind(today)
            .execute(&mut *tx)
            .await?;

        info!(
            invoice_number = %invoice_number,
            client = %candidate.client_name,
            service = %candidate.plan_name,
            amount = %total,
            "Invoice generated"
        );

        summary.invoices.push(GeneratedInvoice {
            invoice_number,
            client_name: candidate.client_name,
            service_name: candidate.plan_name,
            amount: total,
        });
    }

    tx.commit().await?;

    INVOICES_GENERATED_TOTAL
        .with_label_values(&[trigger.as_str()])
        .inc_by(summary.invoices.len() as f64);

    info!(
        count = summary.invoices.len(),
        "Recurring invoice run completed"
    );

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn never_billed_service_is_always_due() {
        assert!(is_due(None, 1, date(2026, 8, 29)));
        assert!(is_due(None, 28, date(2026, 8, 29)));
    }

    #[test]
    fn service_is_due_on_matching_billing_day() {
        let last = Some(date(2026, 8, 5));
        assert!(is_due(last, 29, date(2026, 8, 29)));
    }

    #[test]
    fn service_is_due_when_last_invoice_is_from_another_month() {
        assert!(is_due(Some(date(2026, 7, 29)), 1, date(2026, 8, 29)));
        // Same month number, prior year.
        assert!(is_due(Some(date(2025, 8, 29)), 1, date(2026, 8, 29)));
    }

    #[test]
    fn service_not_due_when_billed_this_month_and_day_differs() {
        assert!(!is_due(Some(date(2026, 8, 5)), 1, date(2026, 8, 29)));
    }

    #[test]
    fn billed_this_month_matches_only_the_current_calendar_month() {
        let today = date(2026, 8, 29);
        assert!(billed_this_month(Some(date(2026, 8, 1)), today));
        assert!(billed_this_month(Some(date(2026, 8, 29)), today));
        assert!(!billed_this_month(Some(date(2026, 7, 31)), today));
        assert!(!billed_this_month(Some(date(2025, 8, 29)), today));
        assert!(!billed_this_month(None, today));
    }

    #[test]
    fn due_date_adds_the_payment_window_exactly() {
        assert_eq!(due_date_for(date(2026, 8, 29), 15), date(2026, 9, 13));
        assert_eq!(due_date_for(date(2026, 1, 20), 30), date(2026, 2, 19));
        assert_eq!(due_date_for(date(2026, 12, 31), 15), date(2027, 1, 15));
    }
}
