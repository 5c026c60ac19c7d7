//! HTTP API handlers.
//!
//! - **GET /reengagement/inactive**: Re-engagement report for the current roster.
//! - **POST /reengagement/nudge**: Generate a nudge for one member.
//! - **POST /reengagement/dispatch**: Nudge every flagged member in the chosen tiers.
//! - **GET /circle/members**: The roster snapshot.
//! - **GET /health**: Health check.
//!
//! Every request takes a fresh roster snapshot from the injected provider;
//! no handler keeps state between calls.

use std::sync::Arc;

use axum::{
    Json,
    body::Bytes,
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::aggregation::{aggregate_with, select_tiers};
use crate::error::NudgeError;
use crate::model::{Member, ReengagementReport, Tier};
use crate::nudge::{NudgeDispatcher, NudgeRequest, REQUIRED_FIELDS_MESSAGE};
use crate::roster::RosterProvider;
use crate::tiering::TierPolicy;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub roster: Arc<dyn RosterProvider>,
    pub policy: TierPolicy,
    /// `None` when no agent server is configured.
    pub nudges: Option<NudgeDispatcher>,
}

/// GET /reengagement/inactive - Members needing attention, grouped by tier.
///
/// # Response
///
/// ```json
/// {
///     "total": 3,
///     "byTier": { "gentle": 1, "buddy": 1, "community": 0, "facilitator": 1 },
///     "members": [
///         { "id": "user_008", "name": "Daan", "lastActive": "...",
///           "daysInactive": 18, "tier": "facilitator", "urgency": "high",
///           "suggestedAction": "Personal check-in needed" }
///     ],
///     "grouped": { "gentle": [], "buddy": [], "community": [], "facilitator": [] }
/// }
/// ```
#[instrument(skip(state))]
pub async fn get_inactive(State(state): State<AppState>) -> Json<ReengagementReport> {
    let roster = state.roster.snapshot();
    let report = aggregate_with(&state.policy, &roster, Utc::now());

    info!(
        roster_size = roster.len(),
        total = report.total,
        facilitator = report.by_tier.facilitator,
        "Inactive members queried"
    );

    Json(report)
}

/// POST /reengagement/nudge - Generate a nudge for one member.
///
/// # Request Body
///
/// ```json
/// {
///     "memberName": "Joris",
///     "daysInactive": 5,
///     "lastActivity": "deelname aan pulse",
///     "upcomingEvent": "Stille wandeling, za 10:00"
/// }
/// ```
///
/// `lastActivity` and `upcomingEvent` are optional.
///
/// # Response
///
/// `200` with `{ "success": true, "nudge": { subject, message, tone, urgency, tier } }`,
/// `400` when name or day count is missing, null, negative or not a number,
/// or when the member is still inside the active band. `503` without an agent
/// server, `500` when the agent fails.
#[instrument(skip(state, payload), fields(days_inactive))]
pub async fn post_nudge(
    State(state): State<AppState>,
    payload: Result<Json<NudgeRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            warn!(error = %rejection.body_text(), "Rejected nudge request body");
            return bad_request(REQUIRED_FIELDS_MESSAGE);
        }
    };
    tracing::Span::current().record("days_inactive", request.days());

    if let Err(e) = request.validate() {
        warn!(error = %e, "Rejected nudge request");
        return bad_request(&e.to_string());
    }

    let Some(dispatcher) = state.nudges.as_ref() else {
        warn!("Nudge requested but no agent server is configured");
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": "Nudge generation is not configured" })),
        )
            .into_response();
    };

    match dispatcher.client().generate(&request).await {
        Ok(nudge) => {
            info!(tier = %nudge.tier, urgency = %nudge.urgency, "Nudge generated");
            Json(json!({ "success": true, "nudge": nudge })).into_response()
        }
        Err(NudgeError::Validation(message)) => {
            warn!(error = %message, "Rejected nudge request");
            bad_request(&message)
        }
        Err(e) => {
            warn!(error = %e, "Failed to generate nudge");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Failed to generate nudge" })),
            )
                .into_response()
        }
    }
}

/// Request body for POST /reengagement/dispatch.
#[derive(Debug, Default, Deserialize)]
pub struct DispatchRequest {
    /// Tiers to nudge. Defaults to every non-active tier.
    #[serde(default)]
    pub tiers: Option<Vec<Tier>>,
}

/// POST /reengagement/dispatch - Nudge every flagged member in the chosen tiers.
///
/// Facilitator-tier members are reported as `needs_personal_check_in`
/// instead of receiving an automated message.
///
/// # Request Body
///
/// ```json
/// { "tiers": ["gentle", "buddy"] }
/// ```
///
/// The body is optional: an empty body nudges every non-active tier. A body
/// that is not JSON, or names an unknown tier, is answered with `400` before
/// any nudge is requested.
#[instrument(skip(state, headers, body))]
pub async fn post_dispatch(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let Some(dispatcher) = state.nudges.as_ref() else {
        warn!("Dispatch requested but no agent server is configured");
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    };

    let request = match parse_dispatch_request(&headers, &body) {
        Ok(request) => request,
        Err(message) => {
            warn!(error = %message, "Rejected dispatch request");
            return bad_request(&message);
        }
    };
    let tiers: Vec<Tier> = request
        .tiers
        .unwrap_or_else(|| Tier::NON_ACTIVE.to_vec())
        .into_iter()
        .filter(|t| *t != Tier::Active)
        .collect();

    let roster = state.roster.snapshot();
    let report = aggregate_with(&state.policy, &roster, Utc::now());
    let targets = select_tiers(&report, &tiers).cloned().collect::<Vec<_>>();

    info!(targets = targets.len(), tiers = ?tiers, "Dispatching nudges");

    Json(dispatcher.dispatch(targets).await).into_response()
}

fn parse_dispatch_request(headers: &HeaderMap, body: &[u8]) -> Result<DispatchRequest, String> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(DispatchRequest::default());
    }

    let is_json = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|mime| {
            let mime = mime.trim();
            mime.eq_ignore_ascii_case("application/json") || mime.ends_with("+json")
        })
        .unwrap_or(false);
    if !is_json {
        return Err("Expected request with `Content-Type: application/json`".to_string());
    }

    serde_json::from_slice(body).map_err(|e| format!("invalid dispatch request: {e}"))
}

fn bad_request(message: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
}

/// GET /circle/members - The current roster snapshot.
#[instrument(skip(state))]
pub async fn get_members(State(state): State<AppState>) -> Json<Vec<Member>> {
    let members = state.roster.snapshot();
    info!(count = members.len(), "Circle members queried");
    Json(members)
}

/// GET /health - Simple health check endpoint.
pub async fn health_check() -> impl IntoResponse {
    StatusCode::OK
}
