//! Quota gates: admission checks combining the effective tier, plan limits,
//! and live usage counts.
//!
//! Everything here is a pure, synchronous function over an in-memory usage
//! snapshot. The results are *advisory*: they are for showing a user their
//! remaining quota and for building denial reasons. Actual admission — the
//! thing that must hold under concurrent requests — goes through
//! [`UsageLedger`](crate::ledger::UsageLedger), which performs the same
//! check as a single atomic conditional increment at the store. A separate
//! read-then-write of these functions' results is exactly the race this
//! crate exists to close.
//!
//! Quota exhaustion is a normal denied decision, never an error.

use serde::Serialize;

use crate::{
    ledger::UsageSnapshot,
    plan::{
        Limit, PlanCatalog, PlanTier,
        features::{Feature, entitlement_denial},
    },
};

/// Remaining invitation quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Remaining {
    /// Exactly this many left.
    Exact(u32),
    /// No cap.
    Unlimited,
}

/// Outcome of an invitation-quota check.
#[derive(Debug, Clone, Serialize)]
pub struct QuotaDecision {
    /// Whether the action is admitted.
    pub allowed: bool,
    /// Quota left after (for allowed) or at (for denied) this decision.
    pub remaining: Remaining,
    /// Denial reason; `None` when allowed.
    pub reason: Option<String>,
}

impl QuotaDecision {
    pub(crate) fn allow(remaining: Remaining) -> Self {
        Self { allowed: true, remaining, reason: None }
    }

    pub(crate) fn deny(reason: String, remaining: Remaining) -> Self {
        Self { allowed: false, remaining, reason: Some(reason) }
    }
}

/// Outcome of a storage or guest gate.
#[derive(Debug, Clone, Serialize)]
pub struct GateDecision {
    /// Whether the action is admitted.
    pub allowed: bool,
    /// Denial reason; `None` when allowed.
    pub reason: Option<String>,
}

impl GateDecision {
    pub(crate) fn allow() -> Self {
        Self { allowed: true, reason: None }
    }

    pub(crate) fn deny(reason: String) -> Self {
        Self { allowed: false, reason: Some(reason) }
    }
}

/// Checks invitation-creation quota for a tier against current counters.
///
/// - Premium: always allowed, remaining unlimited, irrespective of counters.
/// - Pro: monthly limit from the plan catalog; denial names the limit.
/// - Free: lifetime limit from the plan catalog; denial names the limit.
///
/// # Examples
///
/// ```
/// use invitegate::{ledger::UsageSnapshot, plan::PlanTier, quota};
///
/// let usage = UsageSnapshot { invitations_lifetime: 1, invitations_monthly: 0, storage_used_mb: 0.0 };
/// let decision = quota::check_invitation_quota(PlanTier::Free, &usage);
/// assert!(!decision.allowed);
/// assert!(decision.reason.unwrap().contains('1'));
/// ```
#[must_use]
pub fn check_invitation_quota(tier: PlanTier, usage: &UsageSnapshot) -> QuotaDecision {
    let config = PlanCatalog::config(tier);
    match tier {
        PlanTier::Premium => QuotaDecision::allow(Remaining::Unlimited),
        PlanTier::Pro => {
            let limit = match config.invitations_per_month {
                Limit::Limited(n) => n,
                Limit::Unlimited => return QuotaDecision::allow(Remaining::Unlimited),
            };
            let remaining = limit.saturating_sub(usage.invitations_monthly);
            if remaining > 0 {
                QuotaDecision::allow(Remaining::Exact(remaining))
            } else {
                QuotaDecision::deny(
                    format!("monthly invitation limit of {limit} reached"),
                    Remaining::Exact(0),
                )
            }
        }
        PlanTier::Free => {
            let limit = config.invitations_lifetime.unwrap_or(0);
            let remaining = limit.saturating_sub(usage.invitations_lifetime);
            if remaining > 0 {
                QuotaDecision::allow(Remaining::Exact(remaining))
            } else {
                QuotaDecision::deny(
                    format!("lifetime invitation limit of {limit} reached"),
                    Remaining::Exact(0),
                )
            }
        }
    }
}

/// Checks whether an image of `file_size_mb` may be uploaded.
///
/// The `image_upload` entitlement is checked first; its denial reason is
/// returned verbatim. Then the plan's storage allowance: denied when the
/// file exceeds what is left, with both figures reported to two decimals.
#[must_use]
pub fn check_image_upload(tier: PlanTier, storage_used_mb: f64, file_size_mb: f64) -> GateDecision {
    if let Some(reason) = entitlement_denial(Feature::ImageUpload, tier) {
        return GateDecision::deny(reason);
    }
    let limit_mb = f64::from(PlanCatalog::config(tier).storage_mb);
    let remaining_mb = (limit_mb - storage_used_mb).max(0.0);
    if file_size_mb > remaining_mb {
        GateDecision::deny(format!(
            "insufficient storage: remaining {remaining_mb:.2}MB, required {file_size_mb:.2}MB"
        ))
    } else {
        GateDecision::allow()
    }
}

/// Checks whether another guest may be added to an invitation.
///
/// Unlimited plans always admit; limited ones admit while the current count
/// is below the cap, with the denial naming the numeric cap.
#[must_use]
pub fn check_guest_addition(max_guests: Limit, current_guest_count: u32) -> GateDecision {
    match max_guests {
        Limit::Unlimited => GateDecision::allow(),
        Limit::Limited(cap) if current_guest_count < cap => GateDecision::allow(),
        Limit::Limited(cap) => {
            GateDecision::deny(format!("guest limit of {cap} reached for this invitation"))
        }
    }
}
