//! Error types for the entitlement engine.
//!
//! All errors implement the standard [`std::error::Error`] trait via
//! [`thiserror::Error`].
//!
//! # Error Categories
//!
//! - **Validation errors** ([`GateError::InvalidUserId`]): rejected input,
//!   surfaced immediately, never retried
//! - **Store errors** ([`GateError::StoreUnavailable`], [`GateError::Timeout`]):
//!   transient infrastructure failures; gating reads fail closed on these
//! - **Payment errors** ([`GateError::PaymentGateway`]): refund calls against
//!   the external gateway; never silently absorbed
//! - **Lifecycle errors** ([`GateError::InvalidTransition`]): a state change
//!   the subscription state machine does not permit
//!
//! Quota exhaustion is deliberately **not** an error. A denied admission is a
//! normal [`QuotaDecision`](crate::quota::QuotaDecision) value.

use thiserror::Error;

/// Result type alias for entitlement operations.
pub type Result<T> = std::result::Result<T, GateError>;

/// Errors that can occur in the entitlement engine.
///
/// All variants include contextual information about what went wrong.
/// The error messages are designed to be user-facing and actionable.
#[must_use = "errors should be handled, propagated, or explicitly panicked"]
#[derive(Debug, Error)]
pub enum GateError {
    /// Invalid user ID.
    ///
    /// User IDs must be non-empty, at most 64 characters, and contain only
    /// alphanumeric characters, hyphens, and underscores.
    #[error("Invalid user ID: {0}")]
    InvalidUserId(String),

    /// A stored subscription record is malformed beyond what the evaluators
    /// can degrade gracefully.
    ///
    /// Evaluators tolerate most shapes (unknown tier strings parse to free, a
    /// paid tier without an end date is treated as still valid). This variant
    /// is reserved for records that cannot be interpreted at all.
    #[error("Malformed subscription record: {0}")]
    MalformedRecord(String),

    /// The persistent store could not be reached or rejected the operation.
    ///
    /// Transient. Gating reads treat this as "not entitled" (fail closed);
    /// it is never an occasion to overwrite a user's stored tier.
    #[error("Subscription store unavailable: {0}")]
    StoreUnavailable(String),

    /// A store or payment call exceeded its configured deadline.
    #[error("Operation timed out: {0}")]
    Timeout(&'static str),

    /// The payment gateway refused or failed a refund call.
    ///
    /// Depending on [`RefundFailurePolicy`](crate::config::RefundFailurePolicy)
    /// this either blocks the cancellation or is recorded as a pending-refund
    /// marker for manual reconciliation.
    #[error("Payment gateway error: {0}")]
    PaymentGateway(String),

    /// A subscription state transition that the lifecycle state machine does
    /// not permit, e.g. reactivating after the paid period already ended.
    #[error("Invalid subscription transition: {0}")]
    InvalidTransition(String),

    /// Invalid engine configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),
}
