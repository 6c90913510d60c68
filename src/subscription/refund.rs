//! Refund window calculation.
//!
//! A cancellation within [`REFUND_PERIOD_DAYS`] of the subscription start
//! triggers an automatic refund and immediate downgrade; after that window
//! closes, cancellation only schedules the grace-period expiry.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Days after subscription start during which cancellation refunds.
pub const REFUND_PERIOD_DAYS: i64 = 3;

/// Result of a refund-window check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RefundWindow {
    /// Whether cancelling now triggers a refund.
    pub can_refund: bool,
    /// Whole days left in the window.
    pub days_left: i64,
}

/// Computes the refund window for a subscription started at `start`.
///
/// Uses floored whole days: a subscription started earlier today has zero
/// elapsed days and three full days left; one started exactly three days ago
/// is outside the window.
///
/// # Examples
///
/// ```
/// use chrono::{Duration, Utc};
/// use invitegate::subscription::refund_window;
///
/// let now = Utc::now();
/// let window = refund_window(now, now);
/// assert!(window.can_refund);
/// assert_eq!(window.days_left, 3);
///
/// let window = refund_window(now - Duration::days(3), now);
/// assert!(!window.can_refund);
/// assert_eq!(window.days_left, 0);
/// ```
#[must_use]
pub fn refund_window(start: DateTime<Utc>, now: DateTime<Utc>) -> RefundWindow {
    // num_days truncates toward zero, which is floor for now >= start.
    // A start in the future (clock skew between writers) counts as day zero.
    let elapsed_days = (now - start).num_days().max(0);
    RefundWindow {
        can_refund: elapsed_days < REFUND_PERIOD_DAYS,
        days_left: (REFUND_PERIOD_DAYS - elapsed_days).max(0),
    }
}
