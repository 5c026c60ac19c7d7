//! Circle re-engagement for 365 Hub.
//!
//! # Overview
//!
//! Members who drift away from their circle are sorted into inactivity tiers
//! by the number of whole days since their last activity. Each tier carries
//! an urgency and a suggested next step, from a light pulse reminder up to a
//! personal check-in by a facilitator.
//!
//! Tiers are never stored: they are recomputed from the roster on every
//! request, so a report always reflects the roster it was built from.
//!
//! # Modules
//!
//! - [`model`]: Members, tiers, classifications and reports
//! - [`tiering`]: The tier ladder and per-member classification
//! - [`aggregation`]: Building a re-engagement report from a roster
//! - [`roster`]: Roster providers
//! - [`nudge`]: Client for the nudge-generation agent and bulk dispatch
//! - [`api`]: HTTP API handlers
//! - [`config`]: Environment configuration
//! - [`error`]: Error types

pub mod aggregation;
pub mod api;
pub mod config;
pub mod error;
pub mod model;
pub mod nudge;
pub mod roster;
pub mod tiering;
