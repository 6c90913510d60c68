//! Persistent-store abstraction for subscription records and usage counters.
//!
//! Implement [`SubscriptionStore`] to persist state to your database. The
//! contract that matters most is [`increment_if_under_limit`]: it must be a
//! single atomic check-and-increment at the store (a transaction, a
//! compare-and-swap, or a database-native conditional update). Two
//! concurrent requests racing for one remaining quota slot must see exactly
//! one `true`. An implementation that reads, compares, and writes in
//! separate steps re-opens the time-of-check-to-time-of-use race this crate
//! is built to close.
//!
//! [`MemoryStore`] is provided for testing and satisfies the contract by
//! holding one lock across the check and the write.
//!
//! [`increment_if_under_limit`]: SubscriptionStore::increment_if_under_limit

pub mod memory;

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

pub use memory::MemoryStore;

use crate::{
    error::{GateError, Result},
    subscription::record::{PaymentRecord, SubscriptionRecord, UserId},
};

/// A usage counter on the subscription record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageCounter {
    /// Lifetime invitation count. Monotonic non-decreasing.
    InvitationsLifetime,
    /// Current-month invitation count. Reset only by the external
    /// monthly-rollover process.
    InvitationsMonthly,
    /// Storage consumed in megabytes.
    StorageMb,
}

impl UsageCounter {
    /// Counter name for logs and store queries.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvitationsLifetime => "invitations_created_lifetime",
            Self::InvitationsMonthly => "invitations_created_this_month",
            Self::StorageMb => "storage_used_mb",
        }
    }
}

/// Live invitation-row counts, as opposed to the stored counters.
///
/// Used only by ledger reconciliation to detect counter drift; gating never
/// reads these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvitationCount {
    /// Rows ever created.
    pub lifetime: u32,
    /// Rows created in the current calendar month.
    pub monthly: u32,
}

/// Store operations the engine consumes.
///
/// All methods are fallible with [`GateError`]; a store that cannot be
/// reached should surface [`GateError::StoreUnavailable`] so gating can
/// fail closed without mistaking the outage for a missing record.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Fetches a user's subscription record.
    ///
    /// `Ok(None)` means the record genuinely does not exist (a new account),
    /// which callers handle by provisioning a default free record — never by
    /// denying permanently.
    async fn get_subscription(&self, user: &UserId) -> Result<Option<SubscriptionRecord>>;

    /// Creates or replaces a user's subscription record, returning the
    /// stored value.
    async fn upsert_subscription(&self, record: &SubscriptionRecord) -> Result<SubscriptionRecord>;

    /// Atomically adds `delta` to a counter iff the result stays within
    /// `limit`.
    ///
    /// Returns whether the conditional write was applied. With
    /// `limit = None` the increment is unconditional (used for unlimited
    /// tiers and for companion counters once admission has been won).
    /// Counters never go below zero; a negative `delta` (storage release)
    /// clamps at zero.
    ///
    /// This is the correctness-critical primitive: check and increment must
    /// be one atomic operation at the store.
    async fn increment_if_under_limit(
        &self,
        user: &UserId,
        counter: UsageCounter,
        delta: f64,
        limit: Option<f64>,
    ) -> Result<bool>;

    /// Counts actual invitation rows for reconciliation against the stored
    /// counters.
    async fn count_invitations(&self, user: &UserId) -> Result<InvitationCount>;

    /// Most recent successful charge for the user, if any.
    async fn latest_successful_payment(&self, user: &UserId) -> Result<Option<PaymentRecord>>;

    /// Appends a payment-history entry.
    async fn insert_payment_history(&self, record: &PaymentRecord) -> Result<()>;
}

/// Runs a store or gateway future under a deadline.
///
/// A missed deadline surfaces as [`GateError::Timeout`] naming the
/// operation, so callers can distinguish "slow store" from "no record".
pub(crate) async fn bounded<T>(
    op: &'static str,
    deadline: Duration,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    match tokio::time::timeout(deadline, fut).await {
        Ok(result) => result,
        Err(_) => Err(GateError::Timeout(op)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_names() {
        assert_eq!(UsageCounter::InvitationsLifetime.as_str(), "invitations_created_lifetime");
        assert_eq!(UsageCounter::StorageMb.as_str(), "storage_used_mb");
    }

    #[tokio::test]
    async fn test_bounded_passes_through_success() {
        let result = bounded("op", Duration::from_secs(1), async { Ok(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_bounded_times_out() {
        let result: Result<()> = bounded("slow_op", Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert!(matches!(result.unwrap_err(), GateError::Timeout("slow_op")));
    }
}
