//! Subscription-change notifications.
//!
//! Cached entitlement views elsewhere in the process need to refresh after
//! a lifecycle transition. Each user gets their own broadcast channel,
//! created on first subscribe and dropped with the registry; there is no
//! process-wide ambient channel, so one user's sessions never wake up for
//! another user's changes.

use std::{collections::HashMap, sync::Mutex};

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tracing::debug;

use crate::{plan::PlanTier, subscription::record::UserId};

/// Per-user channel capacity. Sessions that fall this far behind see a
/// lagged receiver and should re-resolve their entitlement.
const CHANNEL_CAPACITY: usize = 16;

/// A lifecycle transition worth refreshing cached entitlements for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionChange {
    /// Affected user.
    pub user_id: UserId,
    /// What happened.
    pub kind: ChangeKind,
    /// When the transition was applied.
    pub at: DateTime<Utc>,
}

/// Kind of subscription change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// Upgraded to a paid tier.
    Upgraded {
        /// Tier now subscribed.
        tier: PlanTier,
    },
    /// Cancelled without refund; paid features persist until the end date.
    CancelledWithGrace,
    /// Refund-path cancellation: downgraded to free immediately.
    Downgraded,
    /// Cancelled-in-grace subscription restored to active.
    Reactivated,
}

/// Registry of per-user subscription-change channels.
#[derive(Debug, Default)]
pub struct SubscriptionEvents {
    channels: Mutex<HashMap<UserId, broadcast::Sender<SubscriptionChange>>>,
}

impl SubscriptionEvents {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes to changes for one user.
    ///
    /// The channel is created on first use and shared by later subscribers
    /// for the same user.
    pub fn subscribe(&self, user: &UserId) -> broadcast::Receiver<SubscriptionChange> {
        let mut channels = match self.channels.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        channels
            .entry(user.clone())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// Publishes a change to the user's subscribers, returning how many
    /// received it. No subscribers, no channel, no work.
    ///
    /// A channel whose receivers have all dropped is pruned here, so the
    /// registry stays bounded by the set of users with live sessions.
    pub fn publish(&self, change: SubscriptionChange) -> usize {
        let mut channels = match self.channels.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let Some(sender) = channels.get(&change.user_id) else {
            return 0;
        };
        if sender.receiver_count() == 0 {
            channels.remove(&change.user_id);
            return 0;
        }
        let delivered = sender.send(change).map_or(0, |n| n);
        debug!(delivered, "published subscription change");
        delivered
    }

    #[cfg(test)]
    fn channel_count(&self) -> usize {
        match self.channels.lock() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }
}
