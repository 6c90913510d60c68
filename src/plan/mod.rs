//! Plan tiers, limits, and the compiled-in plan catalog.
//!
//! The catalog is the static table mapping a [`PlanTier`] to its
//! [`PlanConfig`]: quota limits and feature flags. It is the one place plan
//! numbers live; evaluators and gates read from here rather than carrying
//! their own constants.

pub mod features;

use serde::{Deserialize, Serialize};

/// Subscription plan tier.
///
/// Ordered: `Free < Pro < Premium`. Template access checks rely on this
/// ordering.
///
/// Unknown tier strings read back from storage deserialize to [`Free`](Self::Free)
/// rather than failing, so a corrupted record degrades instead of crashing.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum PlanTier {
    /// Free tier. The default for new signups and the fallback for any
    /// record that fails validity evaluation.
    #[default]
    Free,
    /// Pro tier.
    Pro,
    /// Premium tier.
    Premium,
}

impl PlanTier {
    /// Parses a tier from its wire string.
    ///
    /// Anything other than `"pro"` or `"premium"` resolves to
    /// [`Free`](Self::Free). Storage may hold tier strings written by older
    /// releases; an unrecognized one must degrade, not crash.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "pro" => Self::Pro,
            "premium" => Self::Premium,
            _ => Self::Free,
        }
    }

    /// Returns the wire string for this tier.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Pro => "pro",
            Self::Premium => "premium",
        }
    }
}

impl From<String> for PlanTier {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl std::fmt::Display for PlanTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An integer-or-unlimited quota limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Limit {
    /// Capped at the given count.
    Limited(u32),
    /// No cap.
    Unlimited,
}

impl Limit {
    /// Whether one more unit fits given the current count.
    #[must_use]
    pub fn admits(self, current: u32) -> bool {
        match self {
            Self::Limited(cap) => current < cap,
            Self::Unlimited => true,
        }
    }

    /// Units left before the cap, if there is one.
    #[must_use]
    pub fn remaining(self, used: u32) -> Option<u32> {
        match self {
            Self::Limited(cap) => Some(cap.saturating_sub(used)),
            Self::Unlimited => None,
        }
    }
}

/// Immutable configuration for one plan tier.
///
/// One instance per tier, compiled in. Obtained via [`PlanCatalog::config`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanConfig {
    /// The tier this configuration belongs to.
    pub tier: PlanTier,
    /// Invitations allowed per calendar month. `Limited(0)` for free, which
    /// uses the lifetime limit instead.
    pub invitations_per_month: Limit,
    /// Lifetime invitation cap. Only meaningful for the free tier.
    pub invitations_lifetime: Option<u32>,
    /// Total media storage in megabytes.
    pub storage_mb: u32,
    /// Guests allowed on a single invitation.
    pub max_guests_per_invitation: Limit,
    /// Highest template tier this plan may use.
    pub template_access: PlanTier,
    /// Whether image upload is included.
    pub image_upload: bool,
    /// Whether Excel guest-list export is included.
    pub excel_export: bool,
    /// Whether QR-linked media is included (premium only).
    pub qr_media: bool,
    /// Whether AI design assistance is included (premium only).
    pub ai_design: bool,
}

/// Static plan catalog.
///
/// # Examples
///
/// ```
/// use invitegate::plan::{Limit, PlanCatalog, PlanTier};
///
/// let pro = PlanCatalog::config(PlanTier::Pro);
/// assert_eq!(pro.invitations_per_month, Limit::Limited(3));
/// assert!(pro.image_upload);
/// assert!(!pro.qr_media);
/// ```
#[derive(Debug)]
pub struct PlanCatalog;

const FREE_CONFIG: PlanConfig = PlanConfig {
    tier: PlanTier::Free,
    invitations_per_month: Limit::Limited(0),
    invitations_lifetime: Some(1),
    storage_mb: 100,
    max_guests_per_invitation: Limit::Limited(20),
    template_access: PlanTier::Free,
    image_upload: false,
    excel_export: false,
    qr_media: false,
    ai_design: false,
};

const PRO_CONFIG: PlanConfig = PlanConfig {
    tier: PlanTier::Pro,
    invitations_per_month: Limit::Limited(3),
    invitations_lifetime: None,
    storage_mb: 512,
    max_guests_per_invitation: Limit::Limited(100),
    template_access: PlanTier::Pro,
    image_upload: true,
    excel_export: true,
    qr_media: false,
    ai_design: false,
};

const PREMIUM_CONFIG: PlanConfig = PlanConfig {
    tier: PlanTier::Premium,
    invitations_per_month: Limit::Unlimited,
    invitations_lifetime: None,
    storage_mb: 1024,
    max_guests_per_invitation: Limit::Unlimited,
    template_access: PlanTier::Premium,
    image_upload: true,
    excel_export: true,
    qr_media: true,
    ai_design: true,
};

impl PlanCatalog {
    /// Returns the configuration for a tier.
    ///
    /// Total: never panics and never returns an absent value. Callers that
    /// parse tiers from storage already land on [`PlanTier::Free`] for
    /// unknown strings, so every reachable tier has a config.
    #[must_use]
    pub fn config(tier: PlanTier) -> &'static PlanConfig {
        match tier {
            PlanTier::Free => &FREE_CONFIG,
            PlanTier::Pro => &PRO_CONFIG,
            PlanTier::Premium => &PREMIUM_CONFIG,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========================================================================
    // PlanTier Tests
    // ========================================================================

    #[test]
    fn test_tier_ordering() {
        assert!(PlanTier::Free < PlanTier::Pro);
        assert!(PlanTier::Pro < PlanTier::Premium);
    }

    #[test]
    fn test_tier_default_is_free() {
        assert_eq!(PlanTier::default(), PlanTier::Free);
    }

    #[test]
    fn test_tier_serialization() {
        assert_eq!(serde_json::to_string(&PlanTier::Premium).unwrap(), "\"premium\"");
        assert_eq!(serde_json::to_string(&PlanTier::Free).unwrap(), "\"free\"");
    }

    #[test]
    fn test_unknown_tier_deserializes_to_free() {
        let tier: PlanTier = serde_json::from_str("\"platinum\"").unwrap();
        assert_eq!(tier, PlanTier::Free);
    }

    #[test]
    fn test_known_tier_deserializes() {
        let tier: PlanTier = serde_json::from_str("\"pro\"").unwrap();
        assert_eq!(tier, PlanTier::Pro);
    }

    // ========================================================================
    // Limit Tests
    // ========================================================================

    #[test]
    fn test_limit_admits_below_cap() {
        assert!(Limit::Limited(3).admits(2));
    }

    #[test]
    fn test_limit_rejects_at_cap() {
        assert!(!Limit::Limited(3).admits(3));
        assert!(!Limit::Limited(0).admits(0));
    }

    #[test]
    fn test_limit_unlimited_always_admits() {
        assert!(Limit::Unlimited.admits(u32::MAX));
    }

    #[test]
    fn test_limit_remaining_saturates() {
        assert_eq!(Limit::Limited(3).remaining(5), Some(0));
        assert_eq!(Limit::Limited(3).remaining(1), Some(2));
        assert_eq!(Limit::Unlimited.remaining(1), None);
    }

    // ========================================================================
    // PlanCatalog Tests
    // ========================================================================

    #[test]
    fn test_catalog_free_uses_lifetime_limit() {
        let config = PlanCatalog::config(PlanTier::Free);
        assert_eq!(config.invitations_per_month, Limit::Limited(0));
        assert_eq!(config.invitations_lifetime, Some(1));
    }

    #[test]
    fn test_catalog_pro_monthly_limit() {
        let config = PlanCatalog::config(PlanTier::Pro);
        assert_eq!(config.invitations_per_month, Limit::Limited(3));
        assert_eq!(config.invitations_lifetime, None);
    }

    #[test]
    fn test_catalog_premium_unlimited() {
        let config = PlanCatalog::config(PlanTier::Premium);
        assert_eq!(config.invitations_per_month, Limit::Unlimited);
        assert_eq!(config.max_guests_per_invitation, Limit::Unlimited);
        assert_eq!(config.storage_mb, 1024);
    }

    #[test]
    fn test_catalog_premium_only_flags() {
        assert!(PlanCatalog::config(PlanTier::Premium).qr_media);
        assert!(PlanCatalog::config(PlanTier::Premium).ai_design);
        assert!(!PlanCatalog::config(PlanTier::Pro).qr_media);
        assert!(!PlanCatalog::config(PlanTier::Pro).ai_design);
        assert!(!PlanCatalog::config(PlanTier::Free).qr_media);
    }

    #[test]
    fn test_catalog_template_access_matches_tier() {
        for tier in [PlanTier::Free, PlanTier::Pro, PlanTier::Premium] {
            assert_eq!(PlanCatalog::config(tier).template_access, tier);
        }
    }
}
