//! Billing defaults resolution.
//!
//! System settings are stored as untyped key/value text. This module is
//! the single place they get parsed into a typed value; per-service
//! overrides are applied through the `effective_*` accessors.

use service_core::error::AppError;
use sqlx::PgPool;
use tracing::instrument;

/// Fallback billing day when the setting is absent or malformed.
pub const DEFAULT_BILLING_DAY: u32 = 1;
/// Fallback payment window when the setting is absent or malformed.
pub const DEFAULT_DAYS_TO_PAY: i64 = 15;

/// System-wide billing defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BillingDefaults {
    pub billing_day: u32,
    pub days_to_pay: i64,
}

/// Parse a setting value, falling back when absent or non-numeric.
pub fn parse_setting(raw: Option<&str>, fallback: i64) -> i64 {
    raw.and_then(|v| v.trim().parse::<i64>().ok())
        .unwrap_or(fallback)
}

impl BillingDefaults {
    /// Load `default_billing_day` and `default_days_to_pay` from the
    /// settings store.
    #[instrument(skip(pool))]
    pub async fn load(pool: &PgPool) -> Result<Self, AppError> {
        let rows: Vec<(String, String)> = sqlx::query_as(
            r#"
            SELECT key, value
            FROM system_settings
            WHERE key IN ('default_billing_day', 'default_days_to_pay')
            "#,
        )
        .fetch_all(pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to load billing settings: {}", e))
        })?;

        let value_of = |key: &str| {
            rows.iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
        };

        let billing_day = parse_setting(value_of("default_billing_day"), DEFAULT_BILLING_DAY as i64);

        Ok(Self {
            billing_day: u32::try_from(billing_day).unwrap_or(DEFAULT_BILLING_DAY),
            days_to_pay: parse_setting(value_of("default_days_to_pay"), DEFAULT_DAYS_TO_PAY),
        })
    }

    /// The day-of-month a service bills on: its override if set, else
    /// the system default.
    pub fn effective_billing_day(&self, override_day: Option<i32>) -> u32 {
        override_day.map(|d| d as u32).unwrap_or(self.billing_day)
    }

    /// The payment window for a service: its override if set, else the
    /// system default.
    pub fn effective_days_to_pay(&self, override_days: Option<i32>) -> i64 {
        override_days.map(i64::from).unwrap_or(self.days_to_pay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> BillingDefaults {
        BillingDefaults {
            billing_day: 1,
            days_to_pay: 15,
        }
    }

    #[test]
    fn parse_setting_reads_numeric_values() {
        assert_eq!(parse_setting(Some("5"), 1), 5);
        assert_eq!(parse_setting(Some(" 28 "), 1), 28);
    }

    #[test]
    fn parse_setting_falls_back_when_absent() {
        assert_eq!(parse_setting(None, 1), 1);
        assert_eq!(parse_setting(None, 15), 15);
    }

    #[test]
    fn parse_setting_falls_back_when_non_numeric() {
        assert_eq!(parse_setting(Some("first"), 1), 1);
        assert_eq!(parse_setting(Some(""), 15), 15);
        assert_eq!(parse_setting(Some("12.5"), 15), 15);
    }

    #[test]
    fn effective_billing_day_prefers_override() {
        assert_eq!(defaults().effective_billing_day(Some(14)), 14);
        assert_eq!(defaults().effective_billing_day(None), 1);
    }

    #[test]
    fn effective_days_to_pay_prefers_override() {
        assert_eq!(defaults().effective_days_to_pay(Some(30)), 30);
        assert_eq!(defaults().effective_days_to_pay(None), 15);
    }
}
