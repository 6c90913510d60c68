//! Subscription lifecycle transitions: upgrade, cancel, reactivate.
//!
//! Transitions are the only writers of the tier, status, and date fields on
//! a subscription record; usage counters are written only by the ledger and
//! are preserved verbatim across every transition here.
//!
//! Cancellation returns a two-part outcome: the stored record after the
//! transition, and what happened to the refund. A failed refund is never
//! silently absorbed — depending on policy it either blocks the whole
//! cancellation or is recorded as a pending-refund marker in the payment
//! history and reported in the outcome.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    record::{
        BillingPeriod, PaymentKind, PaymentRecord, SubscriptionRecord, SubscriptionStatus, UserId,
    },
    refund::{RefundWindow, refund_window},
};
use crate::{
    config::{EngineConfig, RefundFailurePolicy},
    error::{GateError, Result},
    notify::{ChangeKind, SubscriptionChange, SubscriptionEvents},
    payment::{PaymentGateway, RefundRequest},
    plan::PlanTier,
    store::{SubscriptionStore, bounded},
};

/// What happened to the refund during a cancellation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefundOutcome {
    /// Caller did not request a refund.
    NotRequested,
    /// The gateway processed the refund.
    Refunded {
        /// Refunded transaction.
        transaction_id: Uuid,
        /// Amount returned to the user.
        amount: Decimal,
        /// Whether the refund entry landed in the payment history. The money
        /// has moved either way; `false` means the receipt write failed and
        /// the history needs manual reconciliation.
        receipt_recorded: bool,
    },
    /// Refund was requested but the user has no successful charge on file.
    NoPaymentOnFile,
    /// The gateway failed; a pending-refund marker was recorded for manual
    /// reconciliation and the local downgrade proceeded.
    Failed {
        /// Gateway error description.
        detail: String,
    },
}

/// Result of a cancellation: the record as stored after the transition,
/// plus the refund outcome. Callers must surface both parts.
#[derive(Debug, Clone)]
pub struct CancellationOutcome {
    /// Subscription record after the transition.
    pub record: SubscriptionRecord,
    /// What happened to the refund.
    pub refund: RefundOutcome,
}

/// Drives subscription state transitions against the store and the payment
/// gateway, publishing a change event after each applied transition.
#[derive(Debug)]
pub struct LifecycleManager<S, P> {
    store: Arc<S>,
    gateway: Arc<P>,
    events: Arc<SubscriptionEvents>,
    config: EngineConfig,
}

impl<S: SubscriptionStore, P: PaymentGateway> LifecycleManager<S, P> {
    /// Creates a manager over the given collaborators.
    pub fn new(
        store: Arc<S>,
        gateway: Arc<P>,
        events: Arc<SubscriptionEvents>,
        config: EngineConfig,
    ) -> Self {
        Self { store, gateway, events, config }
    }

    /// Upgrades the user to a paid tier.
    ///
    /// Valid from any current state, including expired and cancelled. The
    /// term starts now and ends one billing period later using calendar
    /// month arithmetic. Usage counters carry over unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::InvalidTransition`] for an upgrade to the free
    /// tier (cancellation is the way down), or a store error.
    #[instrument(skip(self), fields(user = %user, tier = %tier))]
    pub async fn upgrade(
        &self,
        user: &UserId,
        tier: PlanTier,
        period: BillingPeriod,
    ) -> Result<SubscriptionRecord> {
        if tier == PlanTier::Free {
            return Err(GateError::InvalidTransition(
                "cannot upgrade to the free tier; cancel instead".into(),
            ));
        }
        let now = Utc::now();
        let mut record = self
            .fetch(user)
            .await?
            .unwrap_or_else(|| SubscriptionRecord::new_free(user.clone(), now));

        record.tier = tier;
        record.status = SubscriptionStatus::Active;
        record.start_date = now;
        record.end_date = Some(period.period_end_from(now));
        record.cancelled_at = None;

        let stored = self.persist(&record).await?;
        info!(end_date = ?stored.end_date, "subscription upgraded");
        self.events.publish(SubscriptionChange {
            user_id: user.clone(),
            kind: ChangeKind::Upgraded { tier },
            at: now,
        });
        Ok(stored)
    }

    /// Cancels the user's paid subscription.
    ///
    /// Without a refund, the record is marked cancelled and keeps its end
    /// date: paid features persist through the grace period and lapse when
    /// validity evaluation sees the date pass.
    ///
    /// With a refund, the latest successful charge is refunded through the
    /// gateway and the record is downgraded to free immediately. The local
    /// downgrade proceeds even when there is no charge on file, and — under
    /// the default policy — even when the gateway fails; the outcome reports
    /// which of those happened. Callers decide whether to request a refund,
    /// normally by consulting [`refund_window`](Self::refund_window) first.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::InvalidTransition`] when there is nothing to
    /// cancel (no record, or a free-tier record). Under
    /// [`RefundFailurePolicy::Block`], a gateway failure surfaces as
    /// [`GateError::PaymentGateway`] with the record left untouched.
    #[instrument(skip(self), fields(user = %user, should_refund))]
    pub async fn cancel(&self, user: &UserId, should_refund: bool) -> Result<CancellationOutcome> {
        let mut record = self.fetch_required(user).await?;
        if record.tier == PlanTier::Free {
            return Err(GateError::InvalidTransition(
                "free subscription has nothing to cancel".into(),
            ));
        }
        let now = Utc::now();

        if !should_refund {
            record.status = SubscriptionStatus::Cancelled;
            record.cancelled_at = Some(now);
            let stored = self.persist(&record).await?;
            info!(end_date = ?stored.end_date, "subscription cancelled, grace until end date");
            self.events.publish(SubscriptionChange {
                user_id: user.clone(),
                kind: ChangeKind::CancelledWithGrace,
                at: now,
            });
            return Ok(CancellationOutcome { record: stored, refund: RefundOutcome::NotRequested });
        }

        // Refund first: under the blocking policy a gateway failure must
        // leave the subscription untouched so the user can retry.
        let refund = self.attempt_refund(user).await?;

        record.tier = PlanTier::Free;
        record.status = SubscriptionStatus::Active;
        record.start_date = now;
        record.end_date = None;
        record.cancelled_at = Some(now);
        let stored = self.persist(&record).await?;
        info!(refund = ?refund, "subscription cancelled with refund, downgraded to free");
        self.events.publish(SubscriptionChange {
            user_id: user.clone(),
            kind: ChangeKind::Downgraded,
            at: now,
        });
        Ok(CancellationOutcome { record: stored, refund })
    }

    /// Restores a cancelled-in-grace subscription to active.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::InvalidTransition`] unless the record is
    /// cancelled with an end date still in the future. A lapsed grace period
    /// requires a fresh upgrade, not a reactivation.
    #[instrument(skip(self), fields(user = %user))]
    pub async fn reactivate(&self, user: &UserId) -> Result<SubscriptionRecord> {
        let mut record = self.fetch_required(user).await?;
        if record.status != SubscriptionStatus::Cancelled {
            return Err(GateError::InvalidTransition(
                "only a cancelled subscription can be reactivated".into(),
            ));
        }
        let now = Utc::now();
        match record.end_date {
            Some(end) if end > now => {}
            _ => {
                return Err(GateError::InvalidTransition(
                    "subscription period already ended; upgrade again instead".into(),
                ));
            }
        }

        record.status = SubscriptionStatus::Active;
        record.cancelled_at = None;
        let stored = self.persist(&record).await?;
        info!("subscription reactivated");
        self.events.publish(SubscriptionChange {
            user_id: user.clone(),
            kind: ChangeKind::Reactivated,
            at: now,
        });
        Ok(stored)
    }

    /// Refund window for the user's current subscription term.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::InvalidTransition`] when the user has no record.
    pub async fn refund_window(&self, user: &UserId) -> Result<RefundWindow> {
        let record = self.fetch_required(user).await?;
        Ok(refund_window(record.start_date, Utc::now()))
    }

    async fn attempt_refund(&self, user: &UserId) -> Result<RefundOutcome> {
        let payment = bounded(
            "latest_successful_payment",
            self.config.store_timeout(),
            self.store.latest_successful_payment(user),
        )
        .await?;
        let Some(payment) = payment else {
            warn!(user = %user, "refund requested but no successful charge on file");
            return Ok(RefundOutcome::NoPaymentOnFile);
        };

        let request = RefundRequest {
            transaction_id: payment.transaction_id,
            amount: payment.amount,
            currency: payment.currency.clone(),
            reason: "cancellation within refund window".to_owned(),
        };
        let now = Utc::now();
        match bounded("refund", self.config.payment_timeout(), self.gateway.refund(&request)).await
        {
            Ok(receipt) => {
                // The money has moved; from here on the cancellation must
                // complete. Erroring out would leave the charge looking
                // refundable, and a retried cancel would refund it twice.
                let recorded = self
                    .store
                    .insert_payment_history(&PaymentRecord {
                        transaction_id: payment.transaction_id,
                        user_id: user.clone(),
                        amount: payment.amount,
                        currency: payment.currency,
                        tier: payment.tier,
                        period: payment.period,
                        recorded_at: receipt.refunded_at,
                        kind: PaymentKind::Refund,
                        note: None,
                    })
                    .await;
                let receipt_recorded = match recorded {
                    Ok(()) => true,
                    Err(err) => {
                        warn!(
                            user = %user,
                            transaction_id = %payment.transaction_id,
                            error = %err,
                            "refund processed but receipt write failed; history needs reconciliation"
                        );
                        false
                    }
                };
                Ok(RefundOutcome::Refunded {
                    transaction_id: payment.transaction_id,
                    amount: payment.amount,
                    receipt_recorded,
                })
            }
            Err(err) => {
                let detail = err.to_string();
                if self.config.refund_failure_policy == RefundFailurePolicy::Block {
                    return Err(GateError::PaymentGateway(detail));
                }
                warn!(
                    user = %user,
                    transaction_id = %payment.transaction_id,
                    error = %detail,
                    "refund failed; recording pending-refund marker and proceeding"
                );
                self.store
                    .insert_payment_history(&PaymentRecord {
                        transaction_id: payment.transaction_id,
                        user_id: user.clone(),
                        amount: payment.amount,
                        currency: payment.currency,
                        tier: payment.tier,
                        period: payment.period,
                        recorded_at: now,
                        kind: PaymentKind::RefundPending,
                        note: Some(detail.clone()),
                    })
                    .await?;
                Ok(RefundOutcome::Failed { detail })
            }
        }
    }

    async fn fetch(&self, user: &UserId) -> Result<Option<SubscriptionRecord>> {
        bounded("get_subscription", self.config.store_timeout(), self.store.get_subscription(user))
            .await
    }

    async fn fetch_required(&self, user: &UserId) -> Result<SubscriptionRecord> {
        self.fetch(user).await?.ok_or_else(|| {
            GateError::InvalidTransition(format!("no subscription record for {user}"))
        })
    }

    async fn persist(&self, record: &SubscriptionRecord) -> Result<SubscriptionRecord> {
        bounded(
            "upsert_subscription",
            self.config.store_timeout(),
            self.store.upsert_subscription(record),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::{Duration, Utc};

    use super::*;
    use crate::{
        payment::RefundReceipt,
        store::{InvitationCount, MemoryStore, UsageCounter},
    };

    struct FakeGateway {
        fail: bool,
    }

    #[async_trait]
    impl PaymentGateway for FakeGateway {
        async fn refund(&self, request: &RefundRequest) -> Result<RefundReceipt> {
            if self.fail {
                return Err(GateError::PaymentGateway("card network declined".into()));
            }
            Ok(RefundReceipt { transaction_id: request.transaction_id, refunded_at: Utc::now() })
        }
    }

    struct Fixture {
        store: Arc<MemoryStore>,
        manager: LifecycleManager<MemoryStore, FakeGateway>,
        user: UserId,
    }

    fn fixture(id: &str, gateway_fails: bool, policy: RefundFailurePolicy) -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let config = EngineConfig { refund_failure_policy: policy, ..EngineConfig::default() };
        let manager = LifecycleManager::new(
            Arc::clone(&store),
            Arc::new(FakeGateway { fail: gateway_fails }),
            Arc::new(SubscriptionEvents::new()),
            config,
        );
        Fixture { store, manager, user: UserId::new(id).unwrap() }
    }

    async fn seed_pro_with_charge(fx: &Fixture) -> Uuid {
        fx.manager.upgrade(&fx.user, PlanTier::Pro, BillingPeriod::Monthly).await.unwrap();
        let charge = PaymentRecord {
            transaction_id: Uuid::new_v4(),
            user_id: fx.user.clone(),
            amount: Decimal::new(999, 2),
            currency: "USD".to_owned(),
            tier: PlanTier::Pro,
            period: BillingPeriod::Monthly,
            recorded_at: Utc::now(),
            kind: PaymentKind::Charge,
            note: None,
        };
        fx.store.insert_payment_history(&charge).await.unwrap();
        charge.transaction_id
    }

    // ========================================================================
    // Upgrade Tests
    // ========================================================================

    #[tokio::test]
    async fn test_upgrade_provisions_missing_record() {
        let fx = fixture("up-1", false, RefundFailurePolicy::default());
        let record =
            fx.manager.upgrade(&fx.user, PlanTier::Premium, BillingPeriod::Yearly).await.unwrap();
        assert_eq!(record.tier, PlanTier::Premium);
        assert_eq!(record.status, SubscriptionStatus::Active);
        assert_eq!(record.end_date, Some(BillingPeriod::Yearly.period_end_from(record.start_date)));
    }

    #[tokio::test]
    async fn test_upgrade_preserves_usage_counters() {
        let fx = fixture("up-2", false, RefundFailurePolicy::default());
        let mut record = SubscriptionRecord::new_free(fx.user.clone(), Utc::now());
        record.invitations_created_lifetime = 4;
        record.storage_used_mb = 12.5;
        fx.store.upsert_subscription(&record).await.unwrap();

        let upgraded =
            fx.manager.upgrade(&fx.user, PlanTier::Pro, BillingPeriod::Monthly).await.unwrap();
        assert_eq!(upgraded.invitations_created_lifetime, 4);
        assert_eq!(upgraded.storage_used_mb, 12.5);
    }

    #[tokio::test]
    async fn test_upgrade_clears_cancellation() {
        let fx = fixture("up-3", false, RefundFailurePolicy::default());
        fx.manager.upgrade(&fx.user, PlanTier::Pro, BillingPeriod::Monthly).await.unwrap();
        fx.manager.cancel(&fx.user, false).await.unwrap();

        let record =
            fx.manager.upgrade(&fx.user, PlanTier::Premium, BillingPeriod::Monthly).await.unwrap();
        assert_eq!(record.status, SubscriptionStatus::Active);
        assert!(record.cancelled_at.is_none());
    }

    #[tokio::test]
    async fn test_upgrade_to_free_rejected() {
        let fx = fixture("up-4", false, RefundFailurePolicy::default());
        let result = fx.manager.upgrade(&fx.user, PlanTier::Free, BillingPeriod::Monthly).await;
        assert!(matches!(result.unwrap_err(), GateError::InvalidTransition(_)));
    }

    // ========================================================================
    // Cancellation Tests
    // ========================================================================

    #[tokio::test]
    async fn test_cancel_without_refund_keeps_tier_through_grace() {
        let fx = fixture("cx-1", false, RefundFailurePolicy::default());
        fx.manager.upgrade(&fx.user, PlanTier::Pro, BillingPeriod::Monthly).await.unwrap();

        let outcome = fx.manager.cancel(&fx.user, false).await.unwrap();
        assert_eq!(outcome.refund, RefundOutcome::NotRequested);
        assert_eq!(outcome.record.status, SubscriptionStatus::Cancelled);
        assert_eq!(outcome.record.tier, PlanTier::Pro);
        assert!(outcome.record.end_date.is_some());
        assert!(outcome.record.cancelled_at.is_some());
    }

    #[tokio::test]
    async fn test_cancel_with_refund_downgrades_immediately() {
        let fx = fixture("cx-2", false, RefundFailurePolicy::default());
        let charged = seed_pro_with_charge(&fx).await;

        let outcome = fx.manager.cancel(&fx.user, true).await.unwrap();
        assert!(matches!(
            outcome.refund,
            RefundOutcome::Refunded { transaction_id, amount, receipt_recorded: true }
                if transaction_id == charged && amount == Decimal::new(999, 2)
        ));
        assert_eq!(outcome.record.tier, PlanTier::Free);
        assert_eq!(outcome.record.status, SubscriptionStatus::Active);
        assert!(outcome.record.end_date.is_none());
    }

    #[tokio::test]
    async fn test_cancel_with_refund_no_payment_on_file() {
        let fx = fixture("cx-3", false, RefundFailurePolicy::default());
        fx.manager.upgrade(&fx.user, PlanTier::Pro, BillingPeriod::Monthly).await.unwrap();

        let outcome = fx.manager.cancel(&fx.user, true).await.unwrap();
        assert_eq!(outcome.refund, RefundOutcome::NoPaymentOnFile);
        assert_eq!(outcome.record.tier, PlanTier::Free);
    }

    #[tokio::test]
    async fn test_cancel_refund_failure_proceeds_and_flags() {
        let fx = fixture("cx-4", true, RefundFailurePolicy::ProceedAndFlag);
        let charged = seed_pro_with_charge(&fx).await;

        let outcome = fx.manager.cancel(&fx.user, true).await.unwrap();
        assert!(matches!(outcome.refund, RefundOutcome::Failed { .. }));
        assert_eq!(outcome.record.tier, PlanTier::Free);

        // The original charge stays the latest successful payment; the
        // pending marker carries the gateway error for reconciliation.
        let latest = fx.store.latest_successful_payment(&fx.user).await.unwrap().unwrap();
        assert_eq!(latest.transaction_id, charged);
        assert_eq!(latest.kind, PaymentKind::Charge);
    }

    #[tokio::test]
    async fn test_cancel_refund_failure_blocks_under_policy() {
        let fx = fixture("cx-5", true, RefundFailurePolicy::Block);
        seed_pro_with_charge(&fx).await;

        let result = fx.manager.cancel(&fx.user, true).await;
        assert!(matches!(result.unwrap_err(), GateError::PaymentGateway(_)));

        // Untouched: still an active pro subscription.
        let record = fx.store.get_subscription(&fx.user).await.unwrap().unwrap();
        assert_eq!(record.tier, PlanTier::Pro);
        assert_eq!(record.status, SubscriptionStatus::Active);
    }

    #[tokio::test]
    async fn test_cancel_preserves_usage_counters() {
        let fx = fixture("cx-6", false, RefundFailurePolicy::default());
        fx.manager.upgrade(&fx.user, PlanTier::Pro, BillingPeriod::Monthly).await.unwrap();
        let mut record = fx.store.get_subscription(&fx.user).await.unwrap().unwrap();
        record.invitations_created_lifetime = 7;
        fx.store.upsert_subscription(&record).await.unwrap();

        let outcome = fx.manager.cancel(&fx.user, true).await.unwrap();
        assert_eq!(outcome.record.invitations_created_lifetime, 7);
    }

    #[tokio::test]
    async fn test_cancel_free_tier_rejected() {
        let fx = fixture("cx-7", false, RefundFailurePolicy::default());
        fx.store
            .upsert_subscription(&SubscriptionRecord::new_free(fx.user.clone(), Utc::now()))
            .await
            .unwrap();
        let result = fx.manager.cancel(&fx.user, false).await;
        assert!(matches!(result.unwrap_err(), GateError::InvalidTransition(_)));
    }

    #[tokio::test]
    async fn test_cancel_missing_record_rejected() {
        let fx = fixture("cx-8", false, RefundFailurePolicy::default());
        assert!(fx.manager.cancel(&fx.user, false).await.is_err());
    }

    struct FlakyHistoryStore {
        inner: MemoryStore,
        fail_next_insert: AtomicBool,
    }

    #[async_trait]
    impl SubscriptionStore for FlakyHistoryStore {
        async fn get_subscription(&self, user: &UserId) -> Result<Option<SubscriptionRecord>> {
            self.inner.get_subscription(user).await
        }

        async fn upsert_subscription(
            &self,
            record: &SubscriptionRecord,
        ) -> Result<SubscriptionRecord> {
            self.inner.upsert_subscription(record).await
        }

        async fn increment_if_under_limit(
            &self,
            user: &UserId,
            counter: UsageCounter,
            delta: f64,
            limit: Option<f64>,
        ) -> Result<bool> {
            self.inner.increment_if_under_limit(user, counter, delta, limit).await
        }

        async fn count_invitations(&self, user: &UserId) -> Result<InvitationCount> {
            self.inner.count_invitations(user).await
        }

        async fn latest_successful_payment(&self, user: &UserId) -> Result<Option<PaymentRecord>> {
            self.inner.latest_successful_payment(user).await
        }

        async fn insert_payment_history(&self, record: &PaymentRecord) -> Result<()> {
            if self.fail_next_insert.swap(false, Ordering::SeqCst) {
                return Err(GateError::StoreUnavailable("history write failed".into()));
            }
            self.inner.insert_payment_history(record).await
        }
    }

    struct CountingGateway {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl PaymentGateway for CountingGateway {
        async fn refund(&self, request: &RefundRequest) -> Result<RefundReceipt> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(RefundReceipt { transaction_id: request.transaction_id, refunded_at: Utc::now() })
        }
    }

    #[tokio::test]
    async fn test_refund_receipt_write_failure_still_downgrades_once() {
        let store = Arc::new(FlakyHistoryStore {
            inner: MemoryStore::new(),
            fail_next_insert: AtomicBool::new(false),
        });
        let gateway = Arc::new(CountingGateway { calls: AtomicUsize::new(0) });
        let manager = LifecycleManager::new(
            Arc::clone(&store),
            Arc::clone(&gateway),
            Arc::new(SubscriptionEvents::new()),
            EngineConfig::default(),
        );
        let u = UserId::new("cx-9").unwrap();
        manager.upgrade(&u, PlanTier::Pro, BillingPeriod::Monthly).await.unwrap();
        let charge = PaymentRecord {
            transaction_id: Uuid::new_v4(),
            user_id: u.clone(),
            amount: Decimal::new(999, 2),
            currency: "USD".to_owned(),
            tier: PlanTier::Pro,
            period: BillingPeriod::Monthly,
            recorded_at: Utc::now(),
            kind: PaymentKind::Charge,
            note: None,
        };
        store.insert_payment_history(&charge).await.unwrap();
        store.fail_next_insert.store(true, Ordering::SeqCst);

        // The money moved, the receipt write failed: cancellation must still
        // complete and report the missing receipt.
        let outcome = manager.cancel(&u, true).await.unwrap();
        assert!(matches!(
            outcome.refund,
            RefundOutcome::Refunded { receipt_recorded: false, .. }
        ));
        assert_eq!(outcome.record.tier, PlanTier::Free);
        assert_eq!(gateway.calls.load(Ordering::SeqCst), 1);

        // A retry finds a free-tier record, so the same charge can never be
        // refunded a second time.
        assert!(matches!(
            manager.cancel(&u, true).await.unwrap_err(),
            GateError::InvalidTransition(_)
        ));
        assert_eq!(gateway.calls.load(Ordering::SeqCst), 1);
    }

    // ========================================================================
    // Reactivation Tests
    // ========================================================================

    #[tokio::test]
    async fn test_reactivate_within_grace() {
        let fx = fixture("re-1", false, RefundFailurePolicy::default());
        fx.manager.upgrade(&fx.user, PlanTier::Pro, BillingPeriod::Monthly).await.unwrap();
        fx.manager.cancel(&fx.user, false).await.unwrap();

        let record = fx.manager.reactivate(&fx.user).await.unwrap();
        assert_eq!(record.status, SubscriptionStatus::Active);
        assert_eq!(record.tier, PlanTier::Pro);
        assert!(record.cancelled_at.is_none());
    }

    #[tokio::test]
    async fn test_reactivate_past_end_date_rejected() {
        let fx = fixture("re-2", false, RefundFailurePolicy::default());
        let now = Utc::now();
        let record = SubscriptionRecord {
            user_id: fx.user.clone(),
            tier: PlanTier::Pro,
            status: SubscriptionStatus::Cancelled,
            start_date: now - Duration::days(40),
            end_date: Some(now - Duration::days(2)),
            cancelled_at: Some(now - Duration::days(10)),
            invitations_created_this_month: 0,
            invitations_created_lifetime: 0,
            storage_used_mb: 0.0,
        };
        fx.store.upsert_subscription(&record).await.unwrap();

        let result = fx.manager.reactivate(&fx.user).await;
        assert!(matches!(result.unwrap_err(), GateError::InvalidTransition(_)));
    }

    #[tokio::test]
    async fn test_reactivate_active_subscription_rejected() {
        let fx = fixture("re-3", false, RefundFailurePolicy::default());
        fx.manager.upgrade(&fx.user, PlanTier::Pro, BillingPeriod::Monthly).await.unwrap();
        assert!(fx.manager.reactivate(&fx.user).await.is_err());
    }

    // ========================================================================
    // Refund Window Tests
    // ========================================================================

    #[tokio::test]
    async fn test_refund_window_fresh_upgrade() {
        let fx = fixture("rw-1", false, RefundFailurePolicy::default());
        fx.manager.upgrade(&fx.user, PlanTier::Pro, BillingPeriod::Monthly).await.unwrap();
        let window = fx.manager.refund_window(&fx.user).await.unwrap();
        assert!(window.can_refund);
        assert_eq!(window.days_left, 3);
    }

    #[tokio::test]
    async fn test_refund_window_old_subscription() {
        let fx = fixture("rw-2", false, RefundFailurePolicy::default());
        let now = Utc::now();
        let mut record = SubscriptionRecord::new_free(fx.user.clone(), now - Duration::days(30));
        record.tier = PlanTier::Pro;
        record.end_date = Some(now + Duration::days(1));
        fx.store.upsert_subscription(&record).await.unwrap();

        let window = fx.manager.refund_window(&fx.user).await.unwrap();
        assert!(!window.can_refund);
    }
}
