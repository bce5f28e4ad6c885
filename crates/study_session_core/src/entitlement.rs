//! crates/study_session_core/src/entitlement.rs
//!
//! The entitlement gate: a pure mapping from a subscription tier and a requested
//! capability to an allow/deny decision. Which capabilities are premium-only is
//! data held by `EntitlementPolicy`, not branching repeated at each call site.

use std::collections::HashSet;
use std::fmt;

use crate::domain::Tier;

/// Daily request allowance for the free tier.
pub const FREE_DAILY_REQUEST_LIMIT: u32 = 5;

/// A feature that may be restricted to premium tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    HardDifficulty,
    UnlimitedAsk,
    PresentationGeneration,
    VectorSearch,
    AcademicInsights,
    AudioDialog,
}

impl Capability {
    pub const ALL: [Capability; 6] = [
        Capability::HardDifficulty,
        Capability::UnlimitedAsk,
        Capability::PresentationGeneration,
        Capability::VectorSearch,
        Capability::AcademicInsights,
        Capability::AudioDialog,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Capability::HardDifficulty => "hard_difficulty",
            Capability::UnlimitedAsk => "unlimited_ask",
            Capability::PresentationGeneration => "presentation_generation",
            Capability::VectorSearch => "vector_search",
            Capability::AcademicInsights => "academic_insights",
            Capability::AudioDialog => "audio_dialog",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The set of capabilities that only premium tiers may use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntitlementPolicy {
    premium_only: HashSet<Capability>,
}

impl Default for EntitlementPolicy {
    fn default() -> Self {
        Self::premium_only(Capability::ALL)
    }
}

impl EntitlementPolicy {
    pub fn premium_only(capabilities: impl IntoIterator<Item = Capability>) -> Self {
        Self {
            premium_only: capabilities.into_iter().collect(),
        }
    }

    pub fn can_use(&self, tier: Tier, capability: Capability) -> bool {
        tier.is_premium() || !self.premium_only.contains(&capability)
    }
}

/// Checks a capability against the default policy.
pub fn can_use(tier: Tier, capability: Capability) -> bool {
    EntitlementPolicy::default().can_use(tier, capability)
}

/// Returns the number of AI requests a tier may make per day, or `None` if unlimited.
pub fn daily_request_limit(tier: Tier) -> Option<u32> {
    if tier.is_premium() {
        None
    } else {
        Some(FREE_DAILY_REQUEST_LIMIT)
    }
}
