//! Feature entitlements: the tier-to-capability policy table.
//!
//! Entitlement answers "is this capability unlocked for this tier" and
//! nothing else. It never consults usage counters; remaining-quota questions
//! belong to [`crate::quota`].
//!
//! The feature vocabulary here is the exact set of wire strings callers use
//! in policy lookups. An unknown string is denied (fail closed).

use serde::{Deserialize, Serialize};

use super::PlanTier;

/// A gated capability.
///
/// The wire strings (`Feature::as_str`) are the exact identifiers callers
/// pass to [`can_access_feature`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    /// QR-linked media on invitations.
    QrMedia,
    /// AI design assistance.
    AiDesign,
    /// No cap on invitation creation.
    UnlimitedInvitations,
    /// Access to premium template designs.
    PremiumTemplates,
    /// Image upload to invitation media storage.
    ImageUpload,
    /// Guest-list sharing via WhatsApp.
    WhatsappSharing,
    /// Guest-list export to Excel.
    ExcelExport,
}

impl Feature {
    /// Parses a feature from its wire string.
    ///
    /// Returns `None` for unknown strings; callers treat that as denied.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "qr_media" => Some(Self::QrMedia),
            "ai_design" => Some(Self::AiDesign),
            "unlimited_invitations" => Some(Self::UnlimitedInvitations),
            "premium_templates" => Some(Self::PremiumTemplates),
            "image_upload" => Some(Self::ImageUpload),
            "whatsapp_sharing" => Some(Self::WhatsappSharing),
            "excel_export" => Some(Self::ExcelExport),
            _ => None,
        }
    }

    /// Returns the wire string for this feature.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::QrMedia => "qr_media",
            Self::AiDesign => "ai_design",
            Self::UnlimitedInvitations => "unlimited_invitations",
            Self::PremiumTemplates => "premium_templates",
            Self::ImageUpload => "image_upload",
            Self::WhatsappSharing => "whatsapp_sharing",
            Self::ExcelExport => "excel_export",
        }
    }

    /// Lowest tier at which this feature is unlocked.
    #[must_use]
    pub fn minimum_tier(self) -> PlanTier {
        match self {
            Self::QrMedia | Self::AiDesign | Self::UnlimitedInvitations => PlanTier::Premium,
            Self::PremiumTemplates
            | Self::ImageUpload
            | Self::WhatsappSharing
            | Self::ExcelExport => PlanTier::Pro,
        }
    }

    /// Whether this feature is unlocked at the given tier.
    #[must_use]
    pub fn unlocked_at(self, tier: PlanTier) -> bool {
        tier >= self.minimum_tier()
    }
}

impl std::fmt::Display for Feature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Checks whether a feature (by wire string) is unlocked for a tier.
///
/// Unknown feature names are denied. This is a capability check only; it
/// says nothing about remaining quota.
///
/// # Examples
///
/// ```
/// use invitegate::plan::{PlanTier, features::can_access_feature};
///
/// assert!(can_access_feature("qr_media", PlanTier::Premium));
/// assert!(!can_access_feature("qr_media", PlanTier::Pro));
/// assert!(!can_access_feature("time_travel", PlanTier::Premium));
/// ```
#[must_use]
pub fn can_access_feature(feature: &str, tier: PlanTier) -> bool {
    Feature::parse(feature).is_some_and(|f| f.unlocked_at(tier))
}

/// Denial reason for a feature not unlocked at a tier, or `None` if allowed.
///
/// Quota gates that layer on top of an entitlement (e.g. image upload before
/// the storage check) pass this reason through verbatim.
#[must_use]
pub fn entitlement_denial(feature: Feature, tier: PlanTier) -> Option<String> {
    if feature.unlocked_at(tier) {
        None
    } else {
        Some(format!(
            "{feature} is not included in the {tier} plan; requires {} or higher",
            feature.minimum_tier()
        ))
    }
}

/// Checks whether a tier may use a template of the given tier.
///
/// Free-tier users may access only free templates; pro adds pro templates;
/// premium accesses all three.
///
/// # Examples
///
/// ```
/// use invitegate::plan::{PlanTier, features::can_access_template};
///
/// assert!(!can_access_template(PlanTier::Free, PlanTier::Premium));
/// assert!(can_access_template(PlanTier::Premium, PlanTier::Premium));
/// assert!(can_access_template(PlanTier::Pro, PlanTier::Free));
/// ```
#[must_use]
pub fn can_access_template(user_tier: PlanTier, template_tier: PlanTier) -> bool {
    user_tier >= template_tier
}
