//! Subscription and payment record types.

use chrono::{DateTime, Months, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::{GateError, Result},
    plan::PlanTier,
};

/// Unique identifier for a user account.
///
/// Wraps the caller-provided ID with validation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    /// Creates a new user ID after validation.
    ///
    /// # Errors
    ///
    /// Returns error if the ID is empty, exceeds 64 characters, or contains
    /// invalid characters. Only alphanumeric characters, hyphens, and
    /// underscores are allowed.
    pub fn new<S: Into<String>>(id: S) -> Result<Self> {
        let id = id.into();
        if id.is_empty() {
            return Err(GateError::InvalidUserId("user id cannot be empty".into()));
        }
        if id.len() > 64 {
            return Err(GateError::InvalidUserId("user id must be 64 characters or less".into()));
        }
        if !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
            return Err(GateError::InvalidUserId(
                "user id can only contain alphanumeric characters, hyphens, and underscores"
                    .into(),
            ));
        }
        Ok(Self(id))
    }

    /// Returns the inner string reference.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Stored subscription status.
///
/// The stored status alone is never authoritative: a `Cancelled` record is
/// still in force until its end date, and an `Active` one is not trusted
/// past it. [`crate::subscription::validity`] recomputes from dates on every
/// read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// Paid (or free-tier) subscription in good standing.
    Active,
    /// Cancelled without refund; paid features persist until the end date.
    Cancelled,
    /// Past its end date.
    Expired,
    /// In a trial period.
    Trialing,
}

/// Billing period for a paid subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingPeriod {
    /// One calendar month.
    Monthly,
    /// One calendar year.
    Yearly,
}

impl BillingPeriod {
    /// Computes the period end from a start instant.
    ///
    /// Uses calendar arithmetic with end-of-month clamping: Jan 31 + 1 month
    /// is Feb 28 (29 in a leap year), not an overflow into March.
    #[must_use]
    pub fn period_end_from(self, start: DateTime<Utc>) -> DateTime<Utc> {
        let months = match self {
            Self::Monthly => Months::new(1),
            Self::Yearly => Months::new(12),
        };
        start.checked_add_months(months).unwrap_or(start)
    }
}

/// One user's subscription record, as persisted.
///
/// Created at signup as a free record with no end date. Mutated only by
/// [`LifecycleManager`](crate::subscription::LifecycleManager) transitions
/// and by the ledger's atomic counter increments. Never deleted while the
/// account exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionRecord {
    /// Owning user.
    pub user_id: UserId,
    /// Subscribed tier. The tier in force for gating is the *effective*
    /// tier, computed by validity evaluation.
    pub tier: PlanTier,
    /// Stored status.
    pub status: SubscriptionStatus,
    /// When the current subscription term started.
    pub start_date: DateTime<Utc>,
    /// Term end. Absent means no expiry (free tier).
    pub end_date: Option<DateTime<Utc>>,
    /// When the user cancelled, if they did.
    pub cancelled_at: Option<DateTime<Utc>>,
    /// Invitations created in the current calendar month. Reset only by an
    /// external monthly-rollover process.
    pub invitations_created_this_month: u32,
    /// Invitations created over the account's lifetime. Monotonic
    /// non-decreasing.
    pub invitations_created_lifetime: u32,
    /// Media storage consumed, in megabytes.
    pub storage_used_mb: f64,
}

impl SubscriptionRecord {
    /// The record every account starts with: free tier, active, no expiry.
    #[must_use]
    pub fn new_free(user_id: UserId, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            tier: PlanTier::Free,
            status: SubscriptionStatus::Active,
            start_date: now,
            end_date: None,
            cancelled_at: None,
            invitations_created_this_month: 0,
            invitations_created_lifetime: 0,
            storage_used_mb: 0.0,
        }
    }
}

/// Kind of entry in the payment history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentKind {
    /// A successful charge for a subscription term.
    Charge,
    /// A completed refund.
    Refund,
    /// A refund the gateway failed to process; awaiting manual
    /// reconciliation.
    RefundPending,
}

/// One entry in a user's payment history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRecord {
    /// Gateway transaction identifier.
    pub transaction_id: Uuid,
    /// Paying user.
    pub user_id: UserId,
    /// Amount in `currency` units.
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency: String,
    /// Tier the payment was for.
    pub tier: PlanTier,
    /// Billing period the payment covered.
    pub period: BillingPeriod,
    /// When the entry was recorded.
    pub recorded_at: DateTime<Utc>,
    /// Entry kind.
    pub kind: PaymentKind,
    /// Free-form note, e.g. the gateway error for a pending refund.
    pub note: Option<String>,
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    // ========================================================================
    // UserId Tests
    // ========================================================================

    #[test]
    fn test_user_id_valid() {
        let id = UserId::new("user-123").unwrap();
        assert_eq!(id.as_str(), "user-123");
    }

    #[test]
    fn test_user_id_empty_rejected() {
        let result = UserId::new("");
        assert!(matches!(result.unwrap_err(), GateError::InvalidUserId(_)));
    }

    #[test]
    fn test_user_id_too_long_rejected() {
        let result = UserId::new("a".repeat(65));
        assert!(result.is_err());
    }

    #[test]
    fn test_user_id_rejects_special_chars() {
        assert!(UserId::new("user@example.com").is_err());
        assert!(UserId::new("user 1").is_err());
    }

    #[test]
    fn test_user_id_exactly_64_chars_accepted() {
        assert!(UserId::new("u".repeat(64)).is_ok());
    }

    // ========================================================================
    // BillingPeriod Tests
    // ========================================================================

    #[test]
    fn test_monthly_period_end() {
        let start = Utc.with_ymd_and_hms(2025, 3, 15, 12, 0, 0).unwrap();
        let end = BillingPeriod::Monthly.period_end_from(start);
        assert_eq!(end, Utc.with_ymd_and_hms(2025, 4, 15, 12, 0, 0).unwrap());
    }

    #[test]
    fn test_monthly_period_end_of_month_clamped() {
        let start = Utc.with_ymd_and_hms(2025, 1, 31, 9, 0, 0).unwrap();
        let end = BillingPeriod::Monthly.period_end_from(start);
        assert_eq!(end, Utc.with_ymd_and_hms(2025, 2, 28, 9, 0, 0).unwrap());
    }

    #[test]
    fn test_monthly_period_end_leap_year() {
        let start = Utc.with_ymd_and_hms(2024, 1, 31, 9, 0, 0).unwrap();
        let end = BillingPeriod::Monthly.period_end_from(start);
        assert_eq!(end, Utc.with_ymd_and_hms(2024, 2, 29, 9, 0, 0).unwrap());
    }

    #[test]
    fn test_yearly_period_end() {
        let start = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        let end = BillingPeriod::Yearly.period_end_from(start);
        assert_eq!(end, Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_yearly_period_end_leap_day_clamped() {
        let start = Utc.with_ymd_and_hms(2024, 2, 29, 0, 0, 0).unwrap();
        let end = BillingPeriod::Yearly.period_end_from(start);
        assert_eq!(end, Utc.with_ymd_and_hms(2025, 2, 28, 0, 0, 0).unwrap());
    }

    // ========================================================================
    // SubscriptionRecord Tests
    // ========================================================================

    #[test]
    fn test_new_free_record() {
        let now = Utc::now();
        let record = SubscriptionRecord::new_free(UserId::new("user-1").unwrap(), now);
        assert_eq!(record.tier, PlanTier::Free);
        assert_eq!(record.status, SubscriptionStatus::Active);
        assert!(record.end_date.is_none());
        assert!(record.cancelled_at.is_none());
        assert_eq!(record.invitations_created_lifetime, 0);
    }

    #[test]
    fn test_record_serialization_round_trip() {
        let record =
            SubscriptionRecord::new_free(UserId::new("user-2").unwrap(), Utc::now());
        let json = serde_json::to_string(&record).unwrap();
        let parsed: SubscriptionRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.user_id, record.user_id);
        assert_eq!(parsed.tier, PlanTier::Free);
    }

    #[test]
    fn test_record_with_unknown_tier_string_degrades_to_free() {
        let json = serde_json::json!({
            "user_id": "user-3",
            "tier": "enterprise",
            "status": "active",
            "start_date": Utc::now(),
            "end_date": null,
            "cancelled_at": null,
            "invitations_created_this_month": 0,
            "invitations_created_lifetime": 0,
            "storage_used_mb": 0.0
        });
        let record: SubscriptionRecord = serde_json::from_value(json).unwrap();
        assert_eq!(record.tier, PlanTier::Free);
    }
}
