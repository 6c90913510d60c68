//! Usage ledger: the single read API for usage counters and the atomic
//! admission path for actions that consume quota.
//!
//! The advisory checks in [`quota`](crate::quota) answer "would this be
//! allowed right now"; the ledger answers "this happened" — and it does so
//! by delegating the check to the store's conditional increment, so two
//! concurrent requests racing for one remaining slot resolve to exactly one
//! admission. Callers must never pre-check with the advisory functions and
//! then increment separately.

use std::{sync::Arc, time::Duration};

use serde::Serialize;
use tracing::{instrument, warn};

use crate::{
    error::Result,
    plan::{Limit, PlanCatalog, PlanTier, features::{Feature, entitlement_denial}},
    quota::{self, GateDecision, QuotaDecision, Remaining},
    store::{SubscriptionStore, UsageCounter, bounded},
    subscription::record::UserId,
};

/// Point-in-time view of a user's usage counters.
///
/// This is the one shape usage is read in; gates and display code both
/// consume it rather than reaching into the subscription record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct UsageSnapshot {
    /// Invitations ever created.
    pub invitations_lifetime: u32,
    /// Invitations created in the current calendar month.
    pub invitations_monthly: u32,
    /// Storage consumed in megabytes.
    pub storage_used_mb: f64,
}

/// Result of reconciling stored counters against actual invitation rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UsageDrift {
    /// Lifetime count per the stored counter.
    pub counter_lifetime: u32,
    /// Lifetime count per the invitation rows.
    pub row_lifetime: u32,
    /// Monthly count per the stored counter.
    pub counter_monthly: u32,
    /// Monthly count per the invitation rows.
    pub row_monthly: u32,
}

impl UsageDrift {
    /// Whether the counters agree with the rows.
    #[must_use]
    pub fn in_sync(&self) -> bool {
        self.counter_lifetime == self.row_lifetime && self.counter_monthly == self.row_monthly
    }
}

/// Ledger over a [`SubscriptionStore`].
///
/// All store calls run under the configured deadline.
#[derive(Debug)]
pub struct UsageLedger<S> {
    store: Arc<S>,
    store_timeout: Duration,
}

impl<S: SubscriptionStore> UsageLedger<S> {
    /// Creates a ledger over the given store.
    pub fn new(store: Arc<S>, store_timeout: Duration) -> Self {
        Self { store, store_timeout }
    }

    /// Reads the current usage counters.
    ///
    /// A user with no subscription record has zero usage.
    ///
    /// # Errors
    ///
    /// Returns error if the store is unreachable or the call times out.
    pub async fn usage(&self, user: &UserId) -> Result<UsageSnapshot> {
        let record =
            bounded("get_subscription", self.store_timeout, self.store.get_subscription(user))
                .await?;
        Ok(record.map_or_else(UsageSnapshot::default, |r| UsageSnapshot {
            invitations_lifetime: r.invitations_created_lifetime,
            invitations_monthly: r.invitations_created_this_month,
            storage_used_mb: r.storage_used_mb,
        }))
    }

    /// Records an invitation creation, admitting it only if quota holds.
    ///
    /// The governing counter for the tier is incremented with the plan limit
    /// as the store-level guard; the companion counter is incremented
    /// unconditionally once admission is won. A refused guard produces a
    /// denied decision with the same reason the advisory check gives —
    /// invitation counters never decrease, so the re-read deterministically
    /// confirms the denial.
    ///
    /// The companion update is a second store call. A failure between the
    /// two leaves the guard counter one ahead of its companion; gating stays
    /// correct (each tier gates on its guard counter alone) and the gap
    /// shows up in [`reconcile_invitations`](Self::reconcile_invitations).
    ///
    /// # Errors
    ///
    /// Returns error on store failure or timeout; quota exhaustion is a
    /// denied decision, not an error.
    #[instrument(skip(self), fields(user = %user, tier = %tier))]
    pub async fn try_record_invitation(
        &self,
        user: &UserId,
        tier: PlanTier,
    ) -> Result<QuotaDecision> {
        let config = PlanCatalog::config(tier);

        let admitted = match tier {
            PlanTier::Premium => {
                self.increment(user, UsageCounter::InvitationsLifetime, 1.0, None).await?;
                self.increment(user, UsageCounter::InvitationsMonthly, 1.0, None).await?;
                return Ok(QuotaDecision::allow(Remaining::Unlimited));
            }
            PlanTier::Pro => {
                let limit = match config.invitations_per_month {
                    Limit::Limited(n) => Some(f64::from(n)),
                    Limit::Unlimited => None,
                };
                let won = self
                    .increment(user, UsageCounter::InvitationsMonthly, 1.0, limit)
                    .await?;
                if won {
                    self.increment(user, UsageCounter::InvitationsLifetime, 1.0, None).await?;
                }
                won
            }
            PlanTier::Free => {
                let limit = config.invitations_lifetime.map(f64::from);
                let won = self
                    .increment(user, UsageCounter::InvitationsLifetime, 1.0, limit)
                    .await?;
                if won {
                    self.increment(user, UsageCounter::InvitationsMonthly, 1.0, None).await?;
                }
                won
            }
        };

        let snapshot = self.usage(user).await?;
        if admitted {
            let remaining = match tier {
                PlanTier::Pro => config
                    .invitations_per_month
                    .remaining(snapshot.invitations_monthly)
                    .map_or(Remaining::Unlimited, Remaining::Exact),
                _ => Remaining::Exact(
                    config
                        .invitations_lifetime
                        .unwrap_or(0)
                        .saturating_sub(snapshot.invitations_lifetime),
                ),
            };
            Ok(QuotaDecision::allow(remaining))
        } else {
            Ok(quota::check_invitation_quota(tier, &snapshot))
        }
    }

    /// Records an image upload, admitting it only if the entitlement holds
    /// and the storage allowance fits the file.
    ///
    /// # Errors
    ///
    /// Returns error on store failure or timeout.
    #[instrument(skip(self), fields(user = %user, tier = %tier, file_size_mb))]
    pub async fn try_record_upload(
        &self,
        user: &UserId,
        tier: PlanTier,
        file_size_mb: f64,
    ) -> Result<GateDecision> {
        if let Some(reason) = entitlement_denial(Feature::ImageUpload, tier) {
            return Ok(GateDecision::deny(reason));
        }
        let limit_mb = f64::from(PlanCatalog::config(tier).storage_mb);
        let won = self
            .increment(user, UsageCounter::StorageMb, file_size_mb, Some(limit_mb))
            .await?;
        if won {
            return Ok(GateDecision::allow());
        }
        let used = self.usage(user).await?.storage_used_mb;
        let remaining_mb = (limit_mb - used).max(0.0);
        Ok(GateDecision::deny(format!(
            "insufficient storage: remaining {remaining_mb:.2}MB, required {file_size_mb:.2}MB"
        )))
    }

    /// Releases storage previously consumed by a deleted file. The counter
    /// clamps at zero.
    ///
    /// # Errors
    ///
    /// Returns error on store failure or timeout.
    pub async fn release_storage(&self, user: &UserId, file_size_mb: f64) -> Result<()> {
        self.increment(user, UsageCounter::StorageMb, -file_size_mb.abs(), None).await?;
        Ok(())
    }

    /// Compares stored counters against actual invitation rows, logging a
    /// warning on drift. Gating never consults the rows; this exists so
    /// operators notice when the counters have diverged.
    ///
    /// # Errors
    ///
    /// Returns error on store failure or timeout.
    pub async fn reconcile_invitations(&self, user: &UserId) -> Result<UsageDrift> {
        let rows =
            bounded("count_invitations", self.store_timeout, self.store.count_invitations(user))
                .await?;
        let snapshot = self.usage(user).await?;
        let drift = UsageDrift {
            counter_lifetime: snapshot.invitations_lifetime,
            row_lifetime: rows.lifetime,
            counter_monthly: snapshot.invitations_monthly,
            row_monthly: rows.monthly,
        };
        if !drift.in_sync() {
            warn!(
                user = %user,
                counter_lifetime = drift.counter_lifetime,
                row_lifetime = drift.row_lifetime,
                counter_monthly = drift.counter_monthly,
                row_monthly = drift.row_monthly,
                "usage counters have drifted from invitation rows"
            );
        }
        Ok(drift)
    }

    async fn increment(
        &self,
        user: &UserId,
        counter: UsageCounter,
        delta: f64,
        limit: Option<f64>,
    ) -> Result<bool> {
        bounded(
            counter.as_str(),
            self.store_timeout,
            self.store.increment_if_under_limit(user, counter, delta, limit),
        )
        .await
    }
}
