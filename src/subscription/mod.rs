//! Subscription records, validity evaluation, and lifecycle transitions.

pub mod lifecycle;
pub mod record;
pub mod refund;
pub mod validity;

pub use lifecycle::{CancellationOutcome, LifecycleManager, RefundOutcome};
pub use record::{BillingPeriod, PaymentKind, PaymentRecord, SubscriptionRecord, SubscriptionStatus, UserId};
pub use refund::{REFUND_PERIOD_DAYS, RefundWindow, refund_window};
pub use validity::{EffectiveEntitlement, effective_tier, is_valid, resolve};
