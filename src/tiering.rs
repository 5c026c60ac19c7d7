//! Inactivity tier classification.
//!
//! A member's tier is a pure function of whole days since their last
//! activity. Nothing is stored between calls: the tier is recomputed from
//! the timestamp every time, so it can never drift from reality.
//!
//! # Default ladder
//!
//! | days inactive | tier        | urgency | suggested action            |
//! |---------------|-------------|---------|-----------------------------|
//! | 0-3           | active      | none    | (not reported)              |
//! | 4-6           | gentle      | low     | Send pulse reminder         |
//! | 7-10          | buddy       | medium  | Match with buddy for coffee |
//! | 11-14         | community   | medium  | Send weekly summary         |
//! | 15+           | facilitator | high    | Personal check-in needed    |

use chrono::{DateTime, Utc};

use crate::error::{ConfigError, InputError};
use crate::model::{InactivityClassification, Member, Tier};

const MILLIS_PER_DAY: i64 = 86_400_000;

/// Ordered threshold table mapping days of inactivity to tiers.
///
/// Each field is the first day of its band; a band ends the day before the
/// next one starts, and the facilitator band is open-ended. Days below
/// `gentle_from` are active. Declaring only lower bounds makes gaps and
/// overlaps impossible as long as the thresholds strictly increase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierPolicy {
    pub gentle_from: u32,
    pub buddy_from: u32,
    pub community_from: u32,
    pub facilitator_from: u32,
}

impl Default for TierPolicy {
    fn default() -> Self {
        Self {
            gentle_from: 4,
            buddy_from: 7,
            community_from: 11,
            facilitator_from: 15,
        }
    }
}

/// One row of the tier table. `last_day` is `None` for the open-ended band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierBand {
    pub tier: Tier,
    pub first_day: u32,
    pub last_day: Option<u32>,
}

impl TierBand {
    pub fn contains(&self, days: u32) -> bool {
        days >= self.first_day && self.last_day.is_none_or(|last| days <= last)
    }
}

impl TierPolicy {
    /// Check that the thresholds form a valid ladder.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let thresholds = [
            self.gentle_from,
            self.buddy_from,
            self.community_from,
            self.facilitator_from,
        ];

        if self.gentle_from == 0 {
            return Err(ConfigError::InvalidPolicy(
                "gentle threshold must be at least 1 day".to_string(),
            ));
        }

        if thresholds.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(ConfigError::InvalidPolicy(format!(
                "thresholds must strictly increase, got {:?}",
                thresholds
            )));
        }

        Ok(())
    }

    /// The full table, active band first.
    pub fn bands(&self) -> [TierBand; 5] {
        [
            TierBand {
                tier: Tier::Active,
                first_day: 0,
                last_day: Some(self.gentle_from.saturating_sub(1)),
            },
            TierBand {
                tier: Tier::Gentle,
                first_day: self.gentle_from,
                last_day: Some(self.buddy_from.saturating_sub(1)),
            },
            TierBand {
                tier: Tier::Buddy,
                first_day: self.buddy_from,
                last_day: Some(self.community_from.saturating_sub(1)),
            },
            TierBand {
                tier: Tier::Community,
                first_day: self.community_from,
                last_day: Some(self.facilitator_from.saturating_sub(1)),
            },
            TierBand {
                tier: Tier::Facilitator,
                first_day: self.facilitator_from,
                last_day: None,
            },
        ]
    }

    /// Tier for a number of inactive days. Total over every `u32`.
    pub fn tier_for(&self, days: u32) -> Tier {
        self.bands()
            .iter()
            .rev()
            .find(|band| days >= band.first_day)
            .map_or(Tier::Active, |band| band.tier)
    }

    /// Classify a parsed last-active timestamp against `now`.
    pub fn classify_at(
        &self,
        last_active_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> InactivityClassification {
        let days = days_inactive(last_active_at, now);
        InactivityClassification::new(days, self.tier_for(days))
    }

    /// Classify a member record, parsing its last-active timestamp.
    pub fn classify_member(
        &self,
        member: &Member,
        now: DateTime<Utc>,
    ) -> Result<InactivityClassification, InputError> {
        let raw = member
            .last_active
            .as_deref()
            .ok_or_else(|| InputError::MissingLastActive {
                member_id: member.id.clone(),
            })?;

        let last_active_at =
            parse_timestamp(raw).map_err(|source| InputError::InvalidLastActive {
                member_id: member.id.clone(),
                value: raw.to_string(),
                source,
            })?;

        Ok(self.classify_at(last_active_at, now))
    }
}

/// Whole days between `last_active_at` and `now`, truncated.
///
/// A last-active time in the future counts as zero days rather than going
/// negative.
pub fn days_inactive(last_active_at: DateTime<Utc>, now: DateTime<Utc>) -> u32 {
    let elapsed_ms = (now - last_active_at).num_milliseconds();
    if elapsed_ms <= 0 {
        return 0;
    }
    u32::try_from(elapsed_ms / MILLIS_PER_DAY).unwrap_or(u32::MAX)
}

/// Classify a parsed timestamp with the default ladder.
pub fn classify_at(last_active_at: DateTime<Utc>, now: DateTime<Utc>) -> InactivityClassification {
    TierPolicy::default().classify_at(last_active_at, now)
}

/// Classify a raw RFC 3339 timestamp with the default ladder.
pub fn classify(
    last_active: &str,
    now: DateTime<Utc>,
) -> Result<InactivityClassification, InputError> {
    let last_active_at =
        parse_timestamp(last_active).map_err(|source| InputError::InvalidTimestamp {
            value: last_active.to_string(),
            source,
        })?;
    Ok(classify_at(last_active_at, now))
}

/// Classify a member with the default ladder.
pub fn classify_member(
    member: &Member,
    now: DateTime<Utc>,
) -> Result<InactivityClassification, InputError> {
    TierPolicy::default().classify_member(member, now)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(raw.trim()).map(|dt| dt.with_timezone(&Utc))
}
