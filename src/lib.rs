//! Entitlement and usage-quota engine for an invitation-creation service.
//!
//! The engine decides, per user, what a subscription plan unlocks and how
//! much of it is left: feature and template access, invitation quotas,
//! media-storage allowance, guest caps, and the lifecycle transitions
//! (upgrade, cancel, reactivate) that move a user between plans.
//!
//! # Architecture
//!
//! ```text
//!                      ┌──────────────────────┐
//!                      │  EntitlementEngine   │   façade
//!                      └──────────┬───────────┘
//!          ┌─────────────┬───────┴──────┬──────────────┐
//!          ▼             ▼              ▼              ▼
//!   ┌───────────┐ ┌────────────┐ ┌───────────┐ ┌──────────────┐
//!   │ validity/ │ │   quota    │ │  ledger   │ │  lifecycle   │
//!   │ features  │ │ (advisory) │ │ (atomic)  │ │ (transitions)│
//!   └─────┬─────┘ └─────┬──────┘ └─────┬─────┘ └──────┬───────┘
//!         ▼             ▼              ▼              ▼
//!   ┌───────────┐ ┌────────────┐ ┌─────────────────────────────┐
//!   │  plan     │ │  usage     │ │  SubscriptionStore /        │
//!   │  catalog  │ │  snapshot  │ │  PaymentGateway             │
//!   └───────────┘ └────────────┘ └─────────────────────────────┘
//! ```
//!
//! Three properties the layering enforces:
//!
//! - **Never trust stored status.** Validity is recomputed from dates on
//!   every read; a cancelled subscription stays in force until its end date,
//!   an active one is demoted the moment the date passes.
//! - **Fail closed.** Unknown feature strings, unknown tier strings, and
//!   unreachable stores all resolve to the most restrictive answer.
//! - **Atomic admission.** Actions that consume quota go through the ledger,
//!   which delegates the check to a store-level conditional increment. Two
//!   requests racing for the last slot resolve to exactly one admission.
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//!
//! use invitegate::{
//!     EngineConfig, EntitlementEngine,
//!     error::Result,
//!     payment::{PaymentGateway, RefundReceipt, RefundRequest},
//!     store::MemoryStore,
//!     subscription::UserId,
//! };
//!
//! struct NoRefunds;
//!
//! #[async_trait::async_trait]
//! impl PaymentGateway for NoRefunds {
//!     async fn refund(&self, request: &RefundRequest) -> Result<RefundReceipt> {
//!         Ok(RefundReceipt {
//!             transaction_id: request.transaction_id,
//!             refunded_at: chrono::Utc::now(),
//!         })
//!     }
//! }
//!
//! # async fn example() -> Result<()> {
//! let engine = EntitlementEngine::new(
//!     Arc::new(MemoryStore::new()),
//!     Arc::new(NoRefunds),
//!     EngineConfig::default(),
//! )?;
//!
//! let user = UserId::new("user-1")?;
//!
//! // New accounts resolve to the free tier.
//! let entitlement = engine.entitlement(&user).await?;
//! assert!(!entitlement.can_access_feature("image_upload"));
//!
//! // Admission consumes quota atomically; the free tier gets one
//! // invitation, ever.
//! assert!(engine.try_create_invitation(&user).await?.allowed);
//! assert!(!engine.try_create_invitation(&user).await?.allowed);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod config;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod notify;
pub mod payment;
pub mod plan;
pub mod quota;
pub mod store;
pub mod subscription;

pub use config::{EngineConfig, RefundFailurePolicy};
pub use engine::EntitlementEngine;
pub use error::{GateError, Result};
pub use plan::PlanTier;
pub use subscription::{EffectiveEntitlement, SubscriptionRecord, UserId};
