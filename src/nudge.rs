//! Client for the nudge-generation agent.
//!
//! The agent server writes the actual re-engagement message. This module
//! validates the request, forwards it, and normalises the answer. It also
//! fans nudges out to several members at once with bounded parallelism.
//!
//! # API Reference
//!
//! `POST {AGENT_SERVER_URL}/reengagement/generate-nudge`
//!
//! ```json
//! { "member_name": "Joris", "days_inactive": 5,
//!   "last_activity": "deelname aan pulse", "upcoming_event": null }
//! ```
//!
//! answers with `{ subject, message, tone, urgency_level, tier? }`.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::error::NudgeError;
use crate::model::{InactiveMember, Tier};
use crate::tiering::TierPolicy;

/// Path of the nudge endpoint on the agent server.
const GENERATE_NUDGE_PATH: &str = "/reengagement/generate-nudge";

/// Last activity assumed when the caller does not name one.
const DEFAULT_LAST_ACTIVITY: &str = "deelname aan pulse";

/// Error body for a nudge request without a usable name or day count.
pub const REQUIRED_FIELDS_MESSAGE: &str = "memberName and daysInactive are required";

/// Fallback subject when the agent omits one.
const DEFAULT_SUBJECT: &str = "We missen je in de cirkel";

/// Request body for POST /reengagement/nudge.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NudgeRequest {
    /// `null` or absent is accepted here and rejected by [`validate`](Self::validate).
    #[serde(default)]
    pub member_name: Option<String>,

    /// Signed so negative values reach validation instead of failing to parse.
    #[serde(default)]
    pub days_inactive: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_activity: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upcoming_event: Option<String>,
}

impl NudgeRequest {
    /// Build a request for a member flagged in a report.
    pub fn for_member(entry: &InactiveMember) -> Self {
        Self {
            member_name: Some(entry.member.name.clone()),
            days_inactive: Some(i64::from(entry.classification.days_inactive)),
            last_activity: None,
            upcoming_event: None,
        }
    }

    /// Trimmed member name, empty when absent.
    pub fn name(&self) -> &str {
        self.member_name.as_deref().unwrap_or_default().trim()
    }

    /// Day count, with absent or negative values as zero.
    pub fn days(&self) -> u32 {
        self.days_inactive
            .map_or(0, |d| u32::try_from(d.max(0)).unwrap_or(u32::MAX))
    }

    /// Both the member name and a positive day count are required.
    pub fn validate(&self) -> Result<(), NudgeError> {
        if self.name().is_empty() || self.days() == 0 {
            return Err(NudgeError::Validation(REQUIRED_FIELDS_MESSAGE.to_string()));
        }
        Ok(())
    }
}

/// Body sent to the agent server.
#[derive(Debug, Serialize)]
struct AgentNudgeRequest<'a> {
    member_name: &'a str,
    days_inactive: u32,
    last_activity: &'a str,
    upcoming_event: Option<&'a str>,
}

/// Body returned by the agent server.
#[derive(Debug, Deserialize)]
struct AgentNudgeResponse {
    #[serde(default)]
    subject: Option<String>,
    message: String,
    #[serde(default)]
    tone: Option<String>,
    #[serde(default)]
    urgency_level: Option<String>,
    #[serde(default)]
    tier: Option<String>,
}

/// A generated nudge, ready to be sent to a member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Nudge {
    pub subject: String,
    pub message: String,
    pub tone: String,
    pub urgency: String,
    pub tier: String,
}

/// Client for the nudge-generation agent server.
#[derive(Clone)]
pub struct NudgeClient {
    client: reqwest::Client,
    base_url: String,
    policy: TierPolicy,
}

impl NudgeClient {
    /// Create a client for the agent server at `base_url`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, NudgeError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            policy: TierPolicy::default(),
        })
    }

    /// Use `policy` to fill in the tier when the agent does not report one.
    pub fn with_policy(mut self, policy: TierPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Ask the agent server for a nudge.
    ///
    /// Members still inside the active band are refused: there is nothing
    /// to nudge them about. Missing optional fields in the agent's answer are
    /// filled from the locally computed tier, so a terse agent still yields a
    /// complete nudge.
    pub async fn generate(&self, request: &NudgeRequest) -> Result<Nudge, NudgeError> {
        request.validate()?;

        let days = request.days();
        let tier = self.policy.tier_for(days);
        if tier == Tier::Active {
            return Err(NudgeError::Validation(format!(
                "member is still active after {} day(s); nudges start at day {}",
                days, self.policy.gentle_from
            )));
        }

        let body = AgentNudgeRequest {
            member_name: request.name(),
            days_inactive: days,
            last_activity: request
                .last_activity
                .as_deref()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(DEFAULT_LAST_ACTIVITY),
            upcoming_event: request.upcoming_event.as_deref(),
        };

        let url = format!("{}{}", self.base_url, GENERATE_NUDGE_PATH);
        let response = self.client.post(&url).json(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(NudgeError::Upstream {
                status: status.as_u16(),
            });
        }

        let text = response.text().await?;
        let agent: AgentNudgeResponse =
            serde_json::from_str(&text).map_err(|e| NudgeError::Decode(e.to_string()))?;

        debug!(
            days_inactive = days,
            tier = tier.label(),
            "Nudge generated"
        );

        Ok(Nudge {
            subject: agent
                .subject
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEFAULT_SUBJECT.to_string()),
            message: agent.message,
            tone: agent.tone.unwrap_or_else(|| "warm".to_string()),
            urgency: agent
                .urgency_level
                .unwrap_or_else(|| tier.urgency().as_str().to_string()),
            tier: agent.tier.unwrap_or_else(|| tier.label().to_string()),
        })
    }
}

/// What happened when nudging one member.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DispatchOutcome {
    /// The agent produced a nudge.
    Sent { nudge: Nudge },
    /// The agent could not produce a nudge for this member.
    Failed { error: String },
    /// Facilitator tier: a person reaches out, no automated message.
    NeedsPersonalCheckIn,
}

/// Outcome of nudging one member.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchResult {
    pub member_id: String,
    pub member_name: String,
    pub tier: Tier,
    pub days_inactive: u32,
    #[serde(flatten)]
    pub outcome: DispatchOutcome,
}

/// Aggregate outcome of a dispatch run.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchSummary {
    pub sent: usize,
    pub failed: usize,
    pub needs_personal_check_in: usize,
    /// Per-member results, in completion order.
    pub results: Vec<DispatchResult>,
}

impl DispatchSummary {
    fn record(&mut self, result: DispatchResult) {
        match result.outcome {
            DispatchOutcome::Sent { .. } => self.sent += 1,
            DispatchOutcome::Failed { .. } => self.failed += 1,
            DispatchOutcome::NeedsPersonalCheckIn => self.needs_personal_check_in += 1,
        }
        self.results.push(result);
    }
}

/// Sends nudges to many members concurrently.
///
/// Each member is independent, so requests run in parallel up to the
/// configured limit and results arrive in whatever order they finish.
#[derive(Clone)]
pub struct NudgeDispatcher {
    client: NudgeClient,
    permits: Arc<Semaphore>,
}

impl NudgeDispatcher {
    /// `max_in_flight` is clamped to at least one.
    pub fn new(client: NudgeClient, max_in_flight: usize) -> Self {
        Self {
            client,
            permits: Arc::new(Semaphore::new(max_in_flight.max(1))),
        }
    }

    pub fn client(&self) -> &NudgeClient {
        &self.client
    }

    /// Nudge every member in `targets`.
    ///
    /// Facilitator-tier members are not sent anything; they are flagged for
    /// a personal check-in. A failure for one member never stops the others.
    pub async fn dispatch(&self, targets: Vec<InactiveMember>) -> DispatchSummary {
        let mut summary = DispatchSummary::default();
        let mut tasks = JoinSet::new();

        for entry in targets {
            let tier = entry.classification.tier;
            let days_inactive = entry.classification.days_inactive;

            if tier == Tier::Facilitator {
                summary.record(DispatchResult {
                    member_id: entry.member.id,
                    member_name: entry.member.name,
                    tier,
                    days_inactive,
                    outcome: DispatchOutcome::NeedsPersonalCheckIn,
                });
                continue;
            }

            let client = self.client.clone();
            let permits = Arc::clone(&self.permits);
            tasks.spawn(async move {
                let request = NudgeRequest::for_member(&entry);
                let outcome = match permits.acquire_owned().await {
                    Ok(_permit) => match client.generate(&request).await {
                        Ok(nudge) => DispatchOutcome::Sent { nudge },
                        Err(e) => DispatchOutcome::Failed {
                            error: e.to_string(),
                        },
                    },
                    Err(e) => DispatchOutcome::Failed {
                        error: e.to_string(),
                    },
                };

                DispatchResult {
                    member_id: entry.member.id,
                    member_name: entry.member.name,
                    tier,
                    days_inactive,
                    outcome,
                }
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(result) => {
                    if let DispatchOutcome::Failed { error } = &result.outcome {
                        warn!(member_id = %result.member_id, error = %error, "Nudge failed");
                    }
                    summary.record(result);
                }
                Err(e) => warn!(error = %e, "Nudge task aborted"),
            }
        }

        info!(
            sent = summary.sent,
            failed = summary.failed,
            needs_personal_check_in = summary.needs_personal_check_in,
            "Nudge dispatch finished"
        );

        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{InactivityClassification, Member, MemberStatus};

    fn entry(id: &str, days: u32, tier: Tier) -> InactiveMember {
        InactiveMember {
            member: Member {
                id: id.to_string(),
                name: format!("Member {}", id),
                last_active: None,
                status: MemberStatus::Inactive,
                warmth_score: None,
                meetups_attended: None,
            },
            classification: InactivityClassification::new(days, tier),
        }
    }

    #[test]
    fn test_validate_requires_name_and_days() {
        let ok = NudgeRequest {
            member_name: Some("Joris".to_string()),
            days_inactive: Some(5),
            ..Default::default()
        };
        assert!(ok.validate().is_ok());

        let no_name = NudgeRequest {
            member_name: Some("  ".to_string()),
            ..ok.clone()
        };
        assert!(matches!(
            no_name.validate(),
            Err(NudgeError::Validation(_))
        ));

        let zero_days = NudgeRequest {
            days_inactive: Some(0),
            ..ok.clone()
        };
        assert!(zero_days.validate().is_err());

        let negative_days = NudgeRequest {
            days_inactive: Some(-3),
            ..ok
        };
        assert!(negative_days.validate().is_err());
    }

    #[test]
    fn test_null_fields_deserialize_and_fail_validation() {
        let null_days: NudgeRequest =
            serde_json::from_str(r#"{"memberName":"Joris","daysInactive":null}"#).unwrap();
        let null_name: NudgeRequest =
            serde_json::from_str(r#"{"memberName":null,"daysInactive":5}"#).unwrap();

        for request in [null_days, null_name] {
            let err = request.validate().unwrap_err();
            assert_eq!(err.to_string(), REQUIRED_FIELDS_MESSAGE);
        }
    }

    #[test]
    fn test_request_deserializes_camel_case() {
        let request: NudgeRequest = serde_json::from_str(
            r#"{"memberName":"Lotte","daysInactive":6,"upcomingEvent":"Stille wandeling"}"#,
        )
        .unwrap();

        assert_eq!(request.name(), "Lotte");
        assert_eq!(request.days(), 6);
        assert_eq!(request.last_activity, None);
        assert_eq!(request.upcoming_event.as_deref(), Some("Stille wandeling"));
    }

    #[test]
    fn test_request_for_member() {
        let request = NudgeRequest::for_member(&entry("m1", 9, Tier::Buddy));

        assert_eq!(request.name(), "Member m1");
        assert_eq!(request.days(), 9);
    }

    #[tokio::test]
    async fn test_generate_refuses_members_still_active() {
        // Port 9 is discard; the active-band check must fail before any connection attempt
        let client = NudgeClient::new("http://127.0.0.1:9", Duration::from_millis(50)).unwrap();
        let request = NudgeRequest {
            member_name: Some("Fatima".to_string()),
            days_inactive: Some(3),
            ..Default::default()
        };

        let err = client.generate(&request).await.unwrap_err();

        match err {
            NudgeError::Validation(message) => assert!(message.contains("still active")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_client_trims_trailing_slash() {
        let client = NudgeClient::new("http://localhost:8001/", Duration::from_secs(1)).unwrap();
        assert_eq!(client.base_url(), "http://localhost:8001");
    }

    #[tokio::test]
    async fn test_generate_rejects_invalid_request_without_network() {
        // Port 9 is discard; validation must fail before any connection attempt
        let client = NudgeClient::new("http://127.0.0.1:9", Duration::from_millis(50)).unwrap();

        let err = client.generate(&NudgeRequest::default()).await.unwrap_err();

        assert!(matches!(err, NudgeError::Validation(_)));
    }

    #[tokio::test]
    async fn test_dispatch_flags_facilitators_without_calling_agent() {
        let client = NudgeClient::new("http://127.0.0.1:9", Duration::from_millis(50)).unwrap();
        let dispatcher = NudgeDispatcher::new(client, 2);

        let summary = dispatcher
            .dispatch(vec![
                entry("a", 15, Tier::Facilitator),
                entry("b", 30, Tier::Facilitator),
            ])
            .await;

        assert_eq!(summary.needs_personal_check_in, 2);
        assert_eq!(summary.sent, 0);
        assert_eq!(summary.failed, 0);
        assert_eq!(summary.results.len(), 2);
    }

    #[test]
    fn test_dispatch_result_serializes_flat() {
        let result = DispatchResult {
            member_id: "m1".to_string(),
            member_name: "Daan".to_string(),
            tier: Tier::Facilitator,
            days_inactive: 18,
            outcome: DispatchOutcome::NeedsPersonalCheckIn,
        };

        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["memberId"], "m1");
        assert_eq!(json["tier"], "facilitator");
        assert_eq!(json["outcome"], "needs_personal_check_in");
    }
}
