//! In-memory store implementation for tests and local development.

use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
};

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Utc};

use super::{InvitationCount, SubscriptionStore, UsageCounter};
use crate::{
    error::{GateError, Result},
    subscription::record::{PaymentKind, PaymentRecord, SubscriptionRecord, UserId},
};

#[derive(Debug, Default)]
struct Inner {
    records: HashMap<UserId, SubscriptionRecord>,
    payments: HashMap<UserId, Vec<PaymentRecord>>,
    invitation_rows: HashMap<UserId, Vec<DateTime<Utc>>>,
}

/// In-memory [`SubscriptionStore`].
///
/// Conditional increments hold the single interior lock across the check
/// and the write, so the atomicity contract genuinely holds: with one quota
/// slot left, concurrent callers see exactly one successful admission.
///
/// # Examples
///
/// ```
/// use chrono::Utc;
/// use invitegate::store::{MemoryStore, SubscriptionStore};
/// use invitegate::subscription::{SubscriptionRecord, UserId};
///
/// # async fn example() -> invitegate::error::Result<()> {
/// let store = MemoryStore::new();
/// let user = UserId::new("user-1")?;
/// store.upsert_subscription(&SubscriptionRecord::new_free(user.clone(), Utc::now())).await?;
/// assert!(store.get_subscription(&user).await?.is_some());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| GateError::StoreUnavailable("memory store lock poisoned".into()))
    }

    /// Inserts an invitation row, as the application would when a creation
    /// is committed. Only `count_invitations` observes these.
    ///
    /// # Errors
    ///
    /// Returns error if the store lock is poisoned.
    pub fn insert_invitation_row(&self, user: &UserId, created_at: DateTime<Utc>) -> Result<()> {
        self.lock()?.invitation_rows.entry(user.clone()).or_default().push(created_at);
        Ok(())
    }
}

#[async_trait]
impl SubscriptionStore for MemoryStore {
    async fn get_subscription(&self, user: &UserId) -> Result<Option<SubscriptionRecord>> {
        Ok(self.lock()?.records.get(user).cloned())
    }

    async fn upsert_subscription(&self, record: &SubscriptionRecord) -> Result<SubscriptionRecord> {
        self.lock()?.records.insert(record.user_id.clone(), record.clone());
        Ok(record.clone())
    }

    async fn increment_if_under_limit(
        &self,
        user: &UserId,
        counter: UsageCounter,
        delta: f64,
        limit: Option<f64>,
    ) -> Result<bool> {
        let mut inner = self.lock()?;
        let Some(record) = inner.records.get_mut(user) else {
            return Err(GateError::StoreUnavailable(format!(
                "no subscription record for {user}; provision before incrementing"
            )));
        };

        // Check and write under the same lock: this is the atomic
        // conditional update a real store does in one statement.
        match counter {
            UsageCounter::InvitationsLifetime | UsageCounter::InvitationsMonthly => {
                let current = match counter {
                    UsageCounter::InvitationsLifetime => record.invitations_created_lifetime,
                    _ => record.invitations_created_this_month,
                };
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let delta = delta.max(0.0) as u32;
                let next = current.saturating_add(delta);
                if let Some(limit) = limit
                    && f64::from(next) > limit
                {
                    return Ok(false);
                }
                match counter {
                    UsageCounter::InvitationsLifetime => {
                        record.invitations_created_lifetime = next;
                    }
                    _ => record.invitations_created_this_month = next,
                }
                Ok(true)
            }
            UsageCounter::StorageMb => {
                let next = (record.storage_used_mb + delta).max(0.0);
                if let Some(limit) = limit
                    && next > limit
                {
                    return Ok(false);
                }
                record.storage_used_mb = next;
                Ok(true)
            }
        }
    }

    async fn count_invitations(&self, user: &UserId) -> Result<InvitationCount> {
        let inner = self.lock()?;
        let rows = inner.invitation_rows.get(user).map(Vec::as_slice).unwrap_or_default();
        let now = Utc::now();
        #[allow(clippy::cast_possible_truncation)]
        let lifetime = rows.len() as u32;
        #[allow(clippy::cast_possible_truncation)]
        let monthly = rows
            .iter()
            .filter(|at| at.year() == now.year() && at.month() == now.month())
            .count() as u32;
        Ok(InvitationCount { lifetime, monthly })
    }

    async fn latest_successful_payment(&self, user: &UserId) -> Result<Option<PaymentRecord>> {
        let inner = self.lock()?;
        Ok(inner
            .payments
            .get(user)
            .and_then(|history| {
                history
                    .iter()
                    .filter(|p| p.kind == PaymentKind::Charge)
                    .max_by_key(|p| p.recorded_at)
            })
            .cloned())
    }

    async fn insert_payment_history(&self, record: &PaymentRecord) -> Result<()> {
        self.lock()?.payments.entry(record.user_id.clone()).or_default().push(record.clone());
        Ok(())
    }
}
