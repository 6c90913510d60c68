//! Engine configuration.

use std::time::Duration;

use serde::Deserialize;

use crate::error::{GateError, Result};

/// What to do when the gateway fails a refund during cancellation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefundFailurePolicy {
    /// Proceed with the local downgrade and record a pending-refund marker
    /// in the payment history for manual reconciliation.
    #[default]
    ProceedAndFlag,
    /// Leave the subscription untouched and surface the gateway error; the
    /// user can retry the cancellation.
    Block,
}

/// Tunable engine parameters.
///
/// Deserializable from configuration, with defaults suitable for a hosted
/// store and gateway.
///
/// # Examples
///
/// ```toml
/// [entitlements]
/// store_timeout_secs = 10
/// payment_timeout_secs = 30
/// refund_failure_policy = "proceed_and_flag"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Deadline for each store call, in seconds.
    #[serde(default = "default_store_timeout_secs")]
    pub store_timeout_secs: u64,

    /// Deadline for the refund gateway call, in seconds.
    #[serde(default = "default_payment_timeout_secs")]
    pub payment_timeout_secs: u64,

    /// Behavior when a refund fails during cancellation.
    #[serde(default)]
    pub refund_failure_policy: RefundFailurePolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            store_timeout_secs: default_store_timeout_secs(),
            payment_timeout_secs: default_payment_timeout_secs(),
            refund_failure_policy: RefundFailurePolicy::default(),
        }
    }
}

impl EngineConfig {
    /// Validates configuration values are within acceptable bounds.
    ///
    /// # Errors
    ///
    /// Returns error if a timeout is zero or above 300 seconds.
    pub fn validate(&self) -> Result<()> {
        if self.store_timeout_secs == 0 || self.store_timeout_secs > 300 {
            return Err(GateError::Config(
                "store_timeout_secs must be between 1 and 300".to_owned(),
            ));
        }
        if self.payment_timeout_secs == 0 || self.payment_timeout_secs > 300 {
            return Err(GateError::Config(
                "payment_timeout_secs must be between 1 and 300".to_owned(),
            ));
        }
        Ok(())
    }

    /// Store deadline as a [`Duration`].
    #[must_use]
    pub fn store_timeout(&self) -> Duration {
        Duration::from_secs(self.store_timeout_secs)
    }

    /// Payment deadline as a [`Duration`].
    #[must_use]
    pub fn payment_timeout(&self) -> Duration {
        Duration::from_secs(self.payment_timeout_secs)
    }
}

fn default_store_timeout_secs() -> u64 {
    10
}

fn default_payment_timeout_secs() -> u64 {
    30
}
