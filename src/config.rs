//! Service configuration from environment variables.
//!
//! | variable                        | default  |
//! |---------------------------------|----------|
//! | `HUB_PORT`                      | 3000     |
//! | `AGENT_SERVER_URL`              | (none)   |
//! | `HUB_ROSTER_PATH`               | (demo)   |
//! | `HUB_NUDGE_TIMEOUT_SECS`        | 30       |
//! | `HUB_NUDGE_CONCURRENCY`         | 4        |
//! | `HUB_TIER_GENTLE_DAYS`          | 4        |
//! | `HUB_TIER_BUDDY_DAYS`           | 7        |
//! | `HUB_TIER_COMMUNITY_DAYS`       | 11       |
//! | `HUB_TIER_FACILITATOR_DAYS`     | 15       |

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;
use crate::tiering::TierPolicy;

/// Default port if not specified via environment variable.
pub const DEFAULT_PORT: u16 = 3000;

/// Default timeout for a single nudge request.
const DEFAULT_NUDGE_TIMEOUT_SECS: u64 = 30;

/// Default number of nudge requests in flight at once.
const DEFAULT_NUDGE_CONCURRENCY: usize = 4;

/// Runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,

    /// Base URL of the nudge-generation agent. Nudging is disabled without it.
    pub agent_server_url: Option<String>,

    /// JSON roster file. The demo circle is served when unset.
    pub roster_path: Option<PathBuf>,

    pub nudge_timeout: Duration,

    pub nudge_concurrency: usize,

    pub tier_policy: TierPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            agent_server_url: None,
            roster_path: None,
            nudge_timeout: Duration::from_secs(DEFAULT_NUDGE_TIMEOUT_SECS),
            nudge_concurrency: DEFAULT_NUDGE_CONCURRENCY,
            tier_policy: TierPolicy::default(),
        }
    }
}

impl Config {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(std::env::vars().collect())
    }

    /// Read configuration from an explicit variable map.
    pub fn from_vars(vars: HashMap<String, String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let get = |name: &str| {
            vars.get(name)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        // An unparseable port falls back to the default rather than aborting
        let port = get("HUB_PORT")
            .and_then(|p| p.parse().ok())
            .unwrap_or(defaults.port);

        let tier_policy = TierPolicy {
            gentle_from: number(&vars, "HUB_TIER_GENTLE_DAYS", defaults.tier_policy.gentle_from)?,
            buddy_from: number(&vars, "HUB_TIER_BUDDY_DAYS", defaults.tier_policy.buddy_from)?,
            community_from: number(
                &vars,
                "HUB_TIER_COMMUNITY_DAYS",
                defaults.tier_policy.community_from,
            )?,
            facilitator_from: number(
                &vars,
                "HUB_TIER_FACILITATOR_DAYS",
                defaults.tier_policy.facilitator_from,
            )?,
        };
        tier_policy.validate()?;

        let timeout_secs: u64 =
            number(&vars, "HUB_NUDGE_TIMEOUT_SECS", DEFAULT_NUDGE_TIMEOUT_SECS)?;

        Ok(Self {
            port,
            agent_server_url: get("AGENT_SERVER_URL"),
            roster_path: get("HUB_ROSTER_PATH").map(PathBuf::from),
            nudge_timeout: Duration::from_secs(timeout_secs),
            nudge_concurrency: number(
                &vars,
                "HUB_NUDGE_CONCURRENCY",
                defaults.nudge_concurrency,
            )?,
            tier_policy,
        })
    }
}

fn number<T: std::str::FromStr>(
    vars: &HashMap<String, String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match vars.get(name).map(|v| v.trim()).filter(|v| !v.is_empty()) {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidNumber {
            name,
            value: raw.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_vars(HashMap::new()).unwrap();

        assert_eq!(config.port, 3000);
        assert!(config.agent_server_url.is_none());
        assert!(config.roster_path.is_none());
        assert_eq!(config.nudge_timeout, Duration::from_secs(30));
        assert_eq!(config.nudge_concurrency, 4);
        assert_eq!(config.tier_policy, TierPolicy::default());
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_vars(vars(&[
            ("HUB_PORT", "8080"),
            ("AGENT_SERVER_URL", "http://agents:8001"),
            ("HUB_ROSTER_PATH", "/data/roster.json"),
            ("HUB_NUDGE_CONCURRENCY", "8"),
            ("HUB_TIER_FACILITATOR_DAYS", "21"),
        ]))
        .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.agent_server_url.as_deref(), Some("http://agents:8001"));
        assert_eq!(config.roster_path, Some(PathBuf::from("/data/roster.json")));
        assert_eq!(config.nudge_concurrency, 8);
        assert_eq!(config.tier_policy.facilitator_from, 21);
        assert_eq!(config.tier_policy.gentle_from, 4);
    }

    #[test]
    fn test_bad_port_falls_back() {
        let config = Config::from_vars(vars(&[("HUB_PORT", "not-a-port")])).unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
    }

    #[test]
    fn test_bad_number_is_an_error() {
        let err = Config::from_vars(vars(&[("HUB_TIER_BUDDY_DAYS", "seven")])).unwrap_err();
        assert!(err.to_string().contains("HUB_TIER_BUDDY_DAYS"));
    }

    #[test]
    fn test_non_increasing_policy_is_an_error() {
        let err = Config::from_vars(vars(&[("HUB_TIER_COMMUNITY_DAYS", "5")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPolicy(_)));
    }

    #[test]
    fn test_blank_values_use_defaults() {
        let config = Config::from_vars(vars(&[
            ("AGENT_SERVER_URL", "  "),
            ("HUB_NUDGE_CONCURRENCY", ""),
        ]))
        .unwrap();

        assert!(config.agent_server_url.is_none());
        assert_eq!(config.nudge_concurrency, 4);
    }
}
