//! The entitlement engine: one façade over resolution, gating, admission,
//! and lifecycle.
//!
//! Application code holds one [`EntitlementEngine`] and asks it questions.
//! Read-style checks (`can_*`, `check_*`) are advisory and fail closed on
//! infrastructure trouble; the `try_*` operations are the admission paths
//! that actually consume quota, atomically at the store.

use std::sync::Arc;

use chrono::Utc;
use tracing::{instrument, warn};

use crate::{
    config::EngineConfig,
    error::Result,
    ledger::{UsageLedger, UsageSnapshot},
    notify::SubscriptionEvents,
    payment::PaymentGateway,
    plan::PlanTier,
    quota::{self, GateDecision, QuotaDecision},
    store::{SubscriptionStore, bounded},
    subscription::{
        LifecycleManager,
        record::{SubscriptionRecord, UserId},
        validity::{EffectiveEntitlement, resolve},
    },
};

/// Entitlement and usage-quota engine over a store and a payment gateway.
#[derive(Debug)]
pub struct EntitlementEngine<S, P> {
    store: Arc<S>,
    ledger: UsageLedger<S>,
    lifecycle: LifecycleManager<S, P>,
    events: Arc<SubscriptionEvents>,
    config: EngineConfig,
}

impl<S: SubscriptionStore, P: PaymentGateway> EntitlementEngine<S, P> {
    /// Creates an engine over the given store and gateway.
    ///
    /// # Errors
    ///
    /// Returns error if the configuration fails validation.
    pub fn new(store: Arc<S>, gateway: Arc<P>, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let events = Arc::new(SubscriptionEvents::new());
        let ledger = UsageLedger::new(Arc::clone(&store), config.store_timeout());
        let lifecycle = LifecycleManager::new(
            Arc::clone(&store),
            gateway,
            Arc::clone(&events),
            config.clone(),
        );
        Ok(Self { store, ledger, lifecycle, events, config })
    }

    /// Resolves the user's effective entitlement.
    ///
    /// A user with no record yet is provisioned a free one; a missing record
    /// is a new account, never grounds for denial.
    ///
    /// # Errors
    ///
    /// Returns error if the store is unreachable or the call times out.
    #[instrument(skip(self), fields(user = %user))]
    pub async fn entitlement(&self, user: &UserId) -> Result<EffectiveEntitlement> {
        let record = self.fetch_or_provision(user).await?;
        Ok(resolve(&record, Utc::now()))
    }

    /// Whether the user's effective tier unlocks a feature, by wire string.
    ///
    /// Fails closed: unknown feature strings and store trouble both deny.
    pub async fn can_access_feature(&self, user: &UserId, feature: &str) -> bool {
        match self.entitlement(user).await {
            Ok(entitlement) => entitlement.can_access_feature(feature),
            Err(err) => {
                warn!(user = %user, feature, error = %err, "entitlement unavailable, denying");
                false
            }
        }
    }

    /// Whether the user's effective tier may use a template of the given
    /// tier. Fails closed on store trouble.
    pub async fn can_access_template(&self, user: &UserId, template_tier: PlanTier) -> bool {
        match self.entitlement(user).await {
            Ok(entitlement) => entitlement.can_access_template(template_tier),
            Err(err) => {
                warn!(user = %user, %template_tier, error = %err, "entitlement unavailable, denying");
                false
            }
        }
    }

    /// Advisory invitation-quota check: remaining quota and the denial
    /// reason a creation attempt would get right now.
    ///
    /// For the actual creation use [`try_create_invitation`](Self::try_create_invitation);
    /// acting on this check and incrementing separately re-opens the
    /// admission race.
    ///
    /// # Errors
    ///
    /// Returns error if the store is unreachable or the call times out.
    pub async fn check_invitation_quota(&self, user: &UserId) -> Result<QuotaDecision> {
        let entitlement = self.entitlement(user).await?;
        let usage = self.ledger.usage(user).await?;
        Ok(quota::check_invitation_quota(entitlement.tier, &usage))
    }

    /// Admits and records an invitation creation in one atomic step.
    ///
    /// # Errors
    ///
    /// Returns error on store failure; exhausted quota is a denied decision.
    pub async fn try_create_invitation(&self, user: &UserId) -> Result<QuotaDecision> {
        let entitlement = self.entitlement(user).await?;
        self.ledger.try_record_invitation(user, entitlement.tier).await
    }

    /// Advisory image-upload check against the entitlement and the storage
    /// allowance.
    ///
    /// # Errors
    ///
    /// Returns error if the store is unreachable or the call times out.
    pub async fn check_image_upload(&self, user: &UserId, file_size_mb: f64) -> Result<GateDecision> {
        let entitlement = self.entitlement(user).await?;
        let usage = self.ledger.usage(user).await?;
        Ok(quota::check_image_upload(entitlement.tier, usage.storage_used_mb, file_size_mb))
    }

    /// Admits and records an image upload in one atomic step.
    ///
    /// # Errors
    ///
    /// Returns error on store failure; a denied upload is a decision value.
    pub async fn try_record_upload(&self, user: &UserId, file_size_mb: f64) -> Result<GateDecision> {
        let entitlement = self.entitlement(user).await?;
        self.ledger.try_record_upload(user, entitlement.tier, file_size_mb).await
    }

    /// Releases storage consumed by a deleted file.
    ///
    /// # Errors
    ///
    /// Returns error on store failure.
    pub async fn release_storage(&self, user: &UserId, file_size_mb: f64) -> Result<()> {
        self.ledger.release_storage(user, file_size_mb).await
    }

    /// Whether another guest fits on an invitation under the user's plan.
    ///
    /// # Errors
    ///
    /// Returns error if the store is unreachable or the call times out.
    pub async fn can_add_guest(
        &self,
        user: &UserId,
        current_guest_count: u32,
    ) -> Result<GateDecision> {
        let entitlement = self.entitlement(user).await?;
        Ok(quota::check_guest_addition(
            entitlement.config().max_guests_per_invitation,
            current_guest_count,
        ))
    }

    /// Current usage counters.
    ///
    /// # Errors
    ///
    /// Returns error if the store is unreachable or the call times out.
    pub async fn usage(&self, user: &UserId) -> Result<UsageSnapshot> {
        self.ledger.usage(user).await
    }

    /// Lifecycle transitions: upgrade, cancel, reactivate, refund window.
    #[must_use]
    pub fn lifecycle(&self) -> &LifecycleManager<S, P> {
        &self.lifecycle
    }

    /// The usage ledger, for reconciliation probes.
    #[must_use]
    pub fn ledger(&self) -> &UsageLedger<S> {
        &self.ledger
    }

    /// Subscription-change events, for session subscriptions.
    #[must_use]
    pub fn events(&self) -> &SubscriptionEvents {
        &self.events
    }

    async fn fetch_or_provision(&self, user: &UserId) -> Result<SubscriptionRecord> {
        let fetched =
            bounded("get_subscription", self.config.store_timeout(), self.store.get_subscription(user))
                .await?;
        if let Some(record) = fetched {
            return Ok(record);
        }
        let fresh = SubscriptionRecord::new_free(user.clone(), Utc::now());
        bounded(
            "upsert_subscription",
            self.config.store_timeout(),
            self.store.upsert_subscription(&fresh),
        )
        .await
    }
}
