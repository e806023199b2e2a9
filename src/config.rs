//! Explicit configuration passed at Transport construction (spec §6.3).
//! Replaces the module-level globals the design notes (spec §9) call out as
//! a pattern to drop; `tracing`'s ambient subscriber is the one accepted
//! exception.

use std::time::Duration;

use derive_builder::Builder;

/// Upstream market-data WebSocket endpoint.
pub const DEFAULT_ENDPOINT: &str = "wss://data.example-marketfeed.com/socket";

/// Realistic browser-like default, sent on the opening HTTP handshake.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// Tunables for a [`crate::client::Client`]. Every field has a default
/// (spec §6.3); construct with [`ConfigBuilder`] to override a subset while
/// keeping the rest at their defaults.
#[derive(Debug, Clone, Builder)]
#[builder(default, build_fn(error = "derive_builder::UninitializedFieldError"))]
pub struct Config {
    pub endpoint: String,
    pub ping_interval: Duration,
    pub ping_timeout: Duration,
    pub close_timeout: Duration,
    pub historical_timeout: Duration,
    pub validator_attempts: u32,
    pub validator_base_delay: Duration,
    pub user_agent: String,
    pub volume_study_id: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            ping_interval: Duration::from_secs(20),
            ping_timeout: Duration::from_secs(10),
            close_timeout: Duration::from_secs(10),
            historical_timeout: Duration::from_secs(30),
            validator_attempts: 3,
            validator_base_delay: Duration::from_secs(1),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            volume_study_id: crate::protocol::DEFAULT_VOLUME_STUDY_ID.to_string(),
        }
    }
}
