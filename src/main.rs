//! Circle re-engagement service for 365 Hub.
//!
//! # API Endpoints
//!
//! - `GET /reengagement/inactive` - Members needing attention, grouped by tier
//! - `POST /reengagement/nudge` - Generate a nudge for one member
//! - `POST /reengagement/dispatch` - Nudge every flagged member in chosen tiers
//! - `GET /circle/members` - The circle roster
//! - `GET /health` - Health check

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{Router, routing::get, routing::post};
use chrono::Utc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use hub_reengagement::api::{
    AppState, get_inactive, get_members, health_check, post_dispatch, post_nudge,
};
use hub_reengagement::config::Config;
use hub_reengagement::nudge::{NudgeClient, NudgeDispatcher};
use hub_reengagement::roster::{RosterProvider, StaticRoster};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing with environment filter
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("hub_reengagement=info".parse()?))
        .init();

    // Load configuration from environment
    let config = Config::from_env()?;

    info!(
        port = config.port,
        gentle_from = config.tier_policy.gentle_from,
        buddy_from = config.tier_policy.buddy_from,
        community_from = config.tier_policy.community_from,
        facilitator_from = config.tier_policy.facilitator_from,
        "Starting re-engagement service"
    );

    // Load roster
    let roster = match &config.roster_path {
        Some(path) => {
            let roster = StaticRoster::from_json_file(path)?;
            info!(path = %path.display(), members = roster.len(), "Roster loaded");
            roster
        }
        None => {
            warn!("HUB_ROSTER_PATH not set, serving the demo circle");
            StaticRoster::demo(Utc::now())
        }
    };
    let roster: Arc<dyn RosterProvider> = Arc::new(roster);

    // Connect nudge generation, if an agent server is configured
    let nudges = match &config.agent_server_url {
        Some(url) => {
            let client =
                NudgeClient::new(url, config.nudge_timeout)?.with_policy(config.tier_policy);
            info!(
                agent_server = %url,
                concurrency = config.nudge_concurrency,
                "Nudge generation enabled"
            );
            Some(NudgeDispatcher::new(client, config.nudge_concurrency))
        }
        None => {
            warn!("AGENT_SERVER_URL not set, nudge endpoints will answer 503");
            None
        }
    };

    // Create application state
    let state = AppState {
        roster,
        policy: config.tier_policy,
        nudges,
    };

    // Build router
    let app = Router::new()
        .route("/reengagement/inactive", get(get_inactive))
        .route("/reengagement/nudge", post(post_nudge))
        .route("/reengagement/dispatch", post(post_dispatch))
        .route("/circle/members", get(get_members))
        .route("/health", get(health_check))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await?;

    info!(%addr, "Re-engagement service is listening");

    axum::serve(listener, app).await?;

    Ok(())
}
