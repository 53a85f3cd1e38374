//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor.
//! It holds the connection registry and the relay configuration. The relay
//! keeps no durable state: restarting it loses all live presence.

use crate::registry::ConnectionRegistry;

/// Parse an environment variable, falling back to a default on absence or
/// parse failure.
pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

/// Deployment knobs for the relay.
#[derive(Clone, Copy, Debug)]
pub struct RelayConfig {
    /// When true, fan-out is restricted to connections whose last-observed
    /// board matches the sender's. When false, every peer receives every
    /// frame and board scoping is the receivers' concern.
    pub partition_by_board: bool,
}

impl RelayConfig {
    #[must_use]
    pub fn from_env() -> Self {
        Self { partition_by_board: env_parse("RELAY_PARTITION_BY_BOARD", false) }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self { partition_by_board: false }
    }
}

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum — all inner fields are Arc-wrapped or Copy.
#[derive(Clone)]
pub struct AppState {
    pub registry: ConnectionRegistry,
    pub config: RelayConfig,
}

impl AppState {
    #[must_use]
    pub fn new(config: RelayConfig) -> Self {
        Self { registry: ConnectionRegistry::new(), config }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================
