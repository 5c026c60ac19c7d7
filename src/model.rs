//! Data models for circle re-engagement.
//!
//! Members come in from the member store as read-only records. Everything
//! else in this module is derived: classifications and reports are computed
//! fresh for every request and never stored.
//!
//! JSON field names are camelCase so the report keeps the shape the hub
//! frontend already consumes (`byTier`, `daysInactive`, `suggestedAction`).

use serde::{Deserialize, Serialize};

/// A circle member as supplied by the member store.
///
/// Only `id`, `name` and `last_active` matter for tiering. The remaining
/// profile fields are passed through untouched so the consumer can render
/// them next to the recommendation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    /// Opaque member identifier.
    pub id: String,

    /// Display name.
    pub name: String,

    /// Most recent activity as an RFC 3339 timestamp.
    ///
    /// Kept as the raw string from the store; the classifier parses it so a
    /// malformed record can be reported and skipped instead of failing the
    /// whole roster at deserialization time.
    #[serde(default)]
    pub last_active: Option<String>,

    /// Presence badge shown in the member directory.
    #[serde(default)]
    pub status: MemberStatus,

    /// Warmth score shown in the directory (0-100).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warmth_score: Option<u32>,

    /// Number of meetups the member has attended.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meetups_attended: Option<u32>,
}

/// Directory presence badge. Informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberStatus {
    #[default]
    Active,
    Quiet,
    Inactive,
}

/// Inactivity tier of a member.
///
/// Tiers are ordered from least to most inactive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Recently active; never part of a report.
    Active,
    /// A light pulse reminder is enough.
    Gentle,
    /// Pair the member with a coffee buddy.
    Buddy,
    /// Share what happened in the circle this week.
    Community,
    /// A facilitator should reach out personally.
    Facilitator,
}

impl Tier {
    /// The four tiers that appear in a re-engagement report, in ladder order.
    pub const NON_ACTIVE: [Tier; 4] = [
        Tier::Gentle,
        Tier::Buddy,
        Tier::Community,
        Tier::Facilitator,
    ];

    /// Urgency attached to this tier.
    pub fn urgency(&self) -> Urgency {
        match self {
            Tier::Active => Urgency::None,
            Tier::Gentle => Urgency::Low,
            Tier::Buddy | Tier::Community => Urgency::Medium,
            Tier::Facilitator => Urgency::High,
        }
    }

    /// Recommended next step for a member in this tier.
    pub fn suggested_action(&self) -> &'static str {
        match self {
            Tier::Active => "No action needed",
            Tier::Gentle => "Send pulse reminder",
            Tier::Buddy => "Match with buddy for coffee",
            Tier::Community => "Send weekly summary",
            Tier::Facilitator => "Personal check-in needed",
        }
    }

    /// Human-readable label, also forwarded to the nudge generator.
    pub fn label(&self) -> &'static str {
        match self {
            Tier::Active => "active",
            Tier::Gentle => "gentle reminder",
            Tier::Buddy => "buddy invitation",
            Tier::Community => "community update",
            Tier::Facilitator => "facilitator alert",
        }
    }
}

/// How urgently a member should be approached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    None,
    Low,
    Medium,
    High,
}

impl Urgency {
    /// Lowercase wire name, as used by the nudge generator.
    pub fn as_str(&self) -> &'static str {
        match self {
            Urgency::None => "none",
            Urgency::Low => "low",
            Urgency::Medium => "medium",
            Urgency::High => "high",
        }
    }
}

/// Result of classifying one member's inactivity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InactivityClassification {
    /// Whole days since last activity, truncated. Never negative.
    pub days_inactive: u32,

    /// Tier derived from `days_inactive`.
    pub tier: Tier,

    /// Urgency derived from `tier`.
    pub urgency: Urgency,

    /// Suggested next step derived from `tier`.
    pub suggested_action: String,
}

impl InactivityClassification {
    /// Build the classification for a tier; urgency and action follow from it.
    pub fn new(days_inactive: u32, tier: Tier) -> Self {
        Self {
            days_inactive,
            tier,
            urgency: tier.urgency(),
            suggested_action: tier.suggested_action().to_string(),
        }
    }

    /// Whether this classification belongs in a re-engagement report.
    pub fn needs_attention(&self) -> bool {
        self.tier != Tier::Active
    }
}

/// A member together with its classification, as listed in a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InactiveMember {
    #[serde(flatten)]
    pub member: Member,

    #[serde(flatten)]
    pub classification: InactivityClassification,
}

/// Number of members per non-active tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierCounts {
    pub gentle: usize,
    pub buddy: usize,
    pub community: usize,
    pub facilitator: usize,
}

impl TierCounts {
    /// Count for a tier. Active members are never counted.
    pub fn get(&self, tier: Tier) -> usize {
        match tier {
            Tier::Active => 0,
            Tier::Gentle => self.gentle,
            Tier::Buddy => self.buddy,
            Tier::Community => self.community,
            Tier::Facilitator => self.facilitator,
        }
    }

    /// Sum over all tiers.
    pub fn sum(&self) -> usize {
        self.gentle + self.buddy + self.community + self.facilitator
    }
}

/// Inactive members partitioned by tier, most inactive first within each group.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TierGroups {
    pub gentle: Vec<InactiveMember>,
    pub buddy: Vec<InactiveMember>,
    pub community: Vec<InactiveMember>,
    pub facilitator: Vec<InactiveMember>,
}

impl TierGroups {
    /// Members of one tier. `Active` is never grouped and yields an empty slice.
    pub fn get(&self, tier: Tier) -> &[InactiveMember] {
        match tier {
            Tier::Active => &[],
            Tier::Gentle => &self.gentle,
            Tier::Buddy => &self.buddy,
            Tier::Community => &self.community,
            Tier::Facilitator => &self.facilitator,
        }
    }

    pub(crate) fn get_mut(&mut self, tier: Tier) -> Option<&mut Vec<InactiveMember>> {
        match tier {
            Tier::Active => None,
            Tier::Gentle => Some(&mut self.gentle),
            Tier::Buddy => Some(&mut self.buddy),
            Tier::Community => Some(&mut self.community),
            Tier::Facilitator => Some(&mut self.facilitator),
        }
    }

    /// Per-tier counts; always equal to the group lengths.
    pub fn counts(&self) -> TierCounts {
        TierCounts {
            gentle: self.gentle.len(),
            buddy: self.buddy.len(),
            community: self.community.len(),
            facilitator: self.facilitator.len(),
        }
    }
}

/// Response for GET /reengagement/inactive.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReengagementReport {
    /// Number of members needing attention.
    pub total: usize,

    /// Count per non-active tier.
    pub by_tier: TierCounts,

    /// All members needing attention, most inactive first.
    pub members: Vec<InactiveMember>,

    /// The same members grouped by tier.
    pub grouped: TierGroups,
}
