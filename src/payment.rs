//! Payment gateway interface.
//!
//! The engine only consumes the refund side of the gateway: a single opaque
//! network call whose failure must surface to the caller. Purchasing flows
//! live outside this crate.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;

/// A refund to issue against a past charge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundRequest {
    /// Transaction being refunded.
    pub transaction_id: Uuid,
    /// Amount to refund.
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency: String,
    /// Reason forwarded to the gateway.
    pub reason: String,
}

/// Gateway acknowledgement of a completed refund.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundReceipt {
    /// Transaction that was refunded.
    pub transaction_id: Uuid,
    /// When the gateway processed the refund.
    pub refunded_at: DateTime<Utc>,
}

/// The payment collaborator's refund interface.
///
/// Implementations wrap whatever gateway the deployment uses. A failed call
/// must return an error; the lifecycle layer decides whether that blocks
/// the cancellation or becomes a pending-refund marker — it is never
/// silently absorbed here.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Issues a refund.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::PaymentGateway`](crate::error::GateError::PaymentGateway)
    /// when the gateway refuses or the call fails.
    async fn refund(&self, request: &RefundRequest) -> Result<RefundReceipt>;
}
