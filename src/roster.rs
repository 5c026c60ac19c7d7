//! Member roster providers.
//!
//! The aggregator never reaches for global state; whoever serves a request
//! asks a [`RosterProvider`] for a snapshot and passes it in. The providers
//! here are immutable and in-memory. A real member store plugs in by
//! implementing the trait.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Duration, Utc};

use crate::model::{Member, MemberStatus};

/// Supplies read-only snapshots of the circle roster.
pub trait RosterProvider: Send + Sync {
    /// The current roster. Callers treat it as immutable for one request.
    fn snapshot(&self) -> Vec<Member>;
}

/// A fixed roster held in memory.
#[derive(Debug, Clone)]
pub struct StaticRoster {
    members: Arc<[Member]>,
}

impl StaticRoster {
    pub fn new(members: Vec<Member>) -> Self {
        Self {
            members: members.into(),
        }
    }

    /// Load a roster from a JSON file containing an array of members.
    pub fn from_json_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading roster file {}", path.display()))?;
        let members: Vec<Member> = serde_json::from_str(&raw)
            .with_context(|| format!("parsing roster file {}", path.display()))?;
        Ok(Self::new(members))
    }

    /// The demo circle, with activity stamps relative to `now`.
    pub fn demo(now: DateTime<Utc>) -> Self {
        let seed: [(&str, &str, i64, MemberStatus, u32, u32); 9] = [
            ("user_001", "Anna", 0, MemberStatus::Active, 92, 3),
            ("user_002", "Thomas", 1, MemberStatus::Active, 88, 6),
            ("user_003", "Fatima", 2, MemberStatus::Active, 81, 4),
            ("user_004", "Joris", 5, MemberStatus::Quiet, 64, 2),
            ("user_005", "Lotte", 6, MemberStatus::Quiet, 58, 1),
            ("user_006", "Mehmet", 9, MemberStatus::Quiet, 47, 2),
            ("user_007", "Sanne", 12, MemberStatus::Inactive, 35, 1),
            ("user_008", "Daan", 18, MemberStatus::Inactive, 21, 0),
            ("user_009", "Noor", 26, MemberStatus::Inactive, 12, 1),
        ];

        let members = seed
            .into_iter()
            .map(|(id, name, days, status, warmth, meetups)| Member {
                id: id.to_string(),
                name: name.to_string(),
                last_active: Some(
                    (now - Duration::days(days) - Duration::hours(2)).to_rfc3339(),
                ),
                status,
                warmth_score: Some(warmth),
                meetups_attended: Some(meetups),
            })
            .collect();

        Self::new(members)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl RosterProvider for StaticRoster {
    fn snapshot(&self) -> Vec<Member> {
        self.members.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::aggregate;
    use crate::model::Tier;

    #[test]
    fn test_demo_roster_covers_every_tier() {
        let now = Utc::now();
        let roster = StaticRoster::demo(now);

        let report = aggregate(&roster.snapshot(), now);

        assert_eq!(roster.len(), 9);
        assert_eq!(report.total, 6);
        for tier in Tier::NON_ACTIVE {
            assert!(report.by_tier.get(tier) > 0, "no member in {:?}", tier);
        }
        assert_eq!(report.members[0].member.name, "Noor");
    }

    #[test]
    fn test_snapshot_is_independent_copy() {
        let roster = StaticRoster::new(vec![]);
        let mut snapshot = roster.snapshot();
        snapshot.push(Member {
            id: "x".to_string(),
            name: "X".to_string(),
            last_active: None,
            status: MemberStatus::Active,
            warmth_score: None,
            meetups_attended: None,
        });

        assert!(roster.is_empty());
    }

    #[test]
    fn test_from_json_file() {
        let path = std::env::temp_dir().join(format!("roster-{}.json", std::process::id()));
        std::fs::write(
            &path,
            r#"[
                {"id": "m1", "name": "Iris", "lastActive": "2024-10-01T09:00:00Z",
                 "warmthScore": 40},
                {"id": "m2", "name": "Bram"}
            ]"#,
        )
        .unwrap();

        let roster = StaticRoster::from_json_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        let members = roster.snapshot();
        assert_eq!(members.len(), 2);
        assert_eq!(members[0].warmth_score, Some(40));
        assert_eq!(members[1].last_active, None);
    }

    #[test]
    fn test_from_json_file_missing() {
        let err = StaticRoster::from_json_file("/nonexistent/roster.json").unwrap_err();
        assert!(err.to_string().contains("reading roster file"));
    }
}
