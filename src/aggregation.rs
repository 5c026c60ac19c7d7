//! Aggregation of a member roster into a re-engagement report.
//!
//! The aggregator is a pure transform over a roster snapshot handed in by the
//! caller. It never mutates the roster, never caches, and never fetches.

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::model::{InactiveMember, Member, ReengagementReport, Tier, TierGroups};
use crate::tiering::TierPolicy;

/// Build a re-engagement report using the default tier ladder.
pub fn aggregate(roster: &[Member], now: DateTime<Utc>) -> ReengagementReport {
    aggregate_with(&TierPolicy::default(), roster, now)
}

/// Build a re-engagement report for `roster` as of `now`.
///
/// 1. Classify every member independently
/// 2. Drop members that are still active
/// 3. Sort by days inactive, most inactive first (stable, so roster order
///    breaks ties)
/// 4. Partition into the four non-active tiers, keeping that order
///
/// Members whose last-active timestamp is missing or malformed are skipped
/// and logged; they never fail the whole report.
pub fn aggregate_with(
    policy: &TierPolicy,
    roster: &[Member],
    now: DateTime<Utc>,
) -> ReengagementReport {
    let mut skipped = 0usize;

    let mut members: Vec<InactiveMember> = roster
        .iter()
        .filter_map(|member| match policy.classify_member(member, now) {
            Ok(classification) => Some(InactiveMember {
                member: member.clone(),
                classification,
            }),
            Err(e) => {
                warn!(
                    member_id = %member.id,
                    error = %e,
                    "Skipping member with unusable activity timestamp"
                );
                skipped += 1;
                None
            }
        })
        .filter(|entry| entry.classification.needs_attention())
        .collect();

    // sort_by is stable: equal day counts keep roster order
    members.sort_by(|a, b| {
        b.classification
            .days_inactive
            .cmp(&a.classification.days_inactive)
    });

    let grouped = group_by_tier(&members);
    let by_tier = grouped.counts();

    if skipped > 0 {
        warn!(
            skipped,
            roster_size = roster.len(),
            "Some members could not be classified"
        );
    }

    debug!(
        roster_size = roster.len(),
        inactive = members.len(),
        gentle = by_tier.gentle,
        buddy = by_tier.buddy,
        community = by_tier.community,
        facilitator = by_tier.facilitator,
        "Re-engagement report built"
    );

    ReengagementReport {
        total: members.len(),
        by_tier,
        members,
        grouped,
    }
}

/// Partition already-sorted members by tier, preserving order within groups.
fn group_by_tier(members: &[InactiveMember]) -> TierGroups {
    let mut grouped = TierGroups::default();

    for entry in members {
        if let Some(group) = grouped.get_mut(entry.classification.tier) {
            group.push(entry.clone());
        }
    }

    grouped
}

/// Members of the report that belong to any of `tiers`, most inactive first.
pub fn select_tiers<'a>(
    report: &'a ReengagementReport,
    tiers: &[Tier],
) -> impl Iterator<Item = &'a InactiveMember> + 'a {
    let tiers = tiers.to_vec();
    report
        .members
        .iter()
        .filter(move |entry| tiers.contains(&entry.classification.tier))
}
