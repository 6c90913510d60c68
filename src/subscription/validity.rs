//! Validity evaluation: is a stored subscription currently in force, and
//! what tier does the user effectively get.
//!
//! These are pure functions over an in-memory record snapshot. They perform
//! no I/O and are recomputed from stored dates on every read; a stale
//! `status` field is never trusted past `end_date`.

use chrono::{DateTime, Utc};
use tracing::warn;

use super::record::{SubscriptionRecord, SubscriptionStatus};
use crate::plan::{PlanCatalog, PlanConfig, PlanTier, features};

/// Whether the stored subscription is currently in force.
///
/// Holds iff status is `Active` or `Trialing`, or status is `Cancelled` with
/// an end date still in the future (the grace period). A trial term expires
/// by date exactly like a paid one; `Trialing` is not an indefinite unlock.
/// Total over any syntactically valid record: a paid tier with no end date
/// is treated as still valid rather than crashing.
#[must_use]
pub fn is_valid(record: &SubscriptionRecord, now: DateTime<Utc>) -> bool {
    match record.status {
        SubscriptionStatus::Active | SubscriptionStatus::Trialing => match record.end_date {
            Some(end) => end > now,
            // Paid tiers are expected to carry an end date; its absence is a
            // data-integrity signal but not grounds to demote the user.
            None => true,
        },
        SubscriptionStatus::Cancelled => {
            record.end_date.is_some_and(|end| end > now)
        }
        SubscriptionStatus::Expired => false,
    }
}

/// The tier actually used for gating decisions.
///
/// The stored tier iff the record is valid now, otherwise
/// [`PlanTier::Free`].
#[must_use]
pub fn effective_tier(record: &SubscriptionRecord, now: DateTime<Utc>) -> PlanTier {
    if is_valid(record, now) { record.tier } else { PlanTier::Free }
}

/// The resolved entitlement view: one well-typed value carrying everything
/// downstream gates need.
///
/// This is the only sanctioned shape for "the effective subscription";
/// call sites must not rebuild it by copying a record and overriding fields.
#[derive(Debug, Clone)]
pub struct EffectiveEntitlement {
    /// Tier the user is subscribed to, valid or not.
    pub subscribed_tier: PlanTier,
    /// Tier in force for every gating decision.
    pub tier: PlanTier,
    /// Whether the stored subscription was in force at resolution time.
    pub valid: bool,
    /// When this view was resolved.
    pub resolved_at: DateTime<Utc>,
}

impl EffectiveEntitlement {
    /// Plan configuration for the effective tier.
    #[must_use]
    pub fn config(&self) -> &'static PlanConfig {
        PlanCatalog::config(self.tier)
    }

    /// Whether a feature (by wire string) is unlocked. Unknown strings are
    /// denied.
    #[must_use]
    pub fn can_access_feature(&self, feature: &str) -> bool {
        features::can_access_feature(feature, self.tier)
    }

    /// Whether a template of the given tier may be used.
    #[must_use]
    pub fn can_access_template(&self, template_tier: PlanTier) -> bool {
        features::can_access_template(self.tier, template_tier)
    }
}

/// Resolves a record into its [`EffectiveEntitlement`].
///
/// Logs a data-integrity warning for a paid tier stored without an end date;
/// the user keeps their tier (see [`is_valid`]) but upstream should hear
/// about the inconsistent record.
#[must_use]
pub fn resolve(record: &SubscriptionRecord, now: DateTime<Utc>) -> EffectiveEntitlement {
    if record.tier != PlanTier::Free
        && record.end_date.is_none()
        && record.status != SubscriptionStatus::Trialing
    {
        warn!(
            user_id = %record.user_id,
            tier = %record.tier,
            "paid subscription record has no end date"
        );
    }
    let valid = is_valid(record, now);
    EffectiveEntitlement {
        subscribed_tier: record.tier,
        tier: if valid { record.tier } else { PlanTier::Free },
        valid,
        resolved_at: now,
    }
}
