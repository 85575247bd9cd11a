use std::{env, time::Duration};
use thiserror::Error;

use crate::domain::identity::Identity;
use crate::domain::roster::MAX_ROSTER_LEN;
use crate::interface_adapters::utils::rng::random_identity;

// Runtime/node constants (not gameplay tuning).

pub const TICK_INTERVAL: Duration = Duration::from_millis(1000 / 30);
pub const EVENT_CHANNEL_CAPACITY: usize = 1024;
pub const OUTBOUND_CHANNEL_CAPACITY: usize = 1024;
pub const COMMAND_CHANNEL_CAPACITY: usize = 64;

pub const DEFAULT_SEED_RPC_URL: &str = "http://mainnet-seed-0001.nkn.org:30003";
pub const DEFAULT_MAX_PLAYERS: usize = 16;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must not be empty")]
    Empty { name: &'static str },
    #[error("{name}={value} is not a valid number")]
    InvalidNumber { name: &'static str, value: String },
    #[error("ARENA_RECONNECT_MIN_MS ({min}) exceeds ARENA_RECONNECT_MAX_MS ({max})")]
    BackoffBounds { min: u64, max: u64 },
    #[error("ARENA_RECONNECT_MIN_MS must be at least 1")]
    ZeroBackoff,
}

#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Local public key; the registered name is one of its candidates.
    pub identity: Identity,
    /// Server base key. `None` means this node is the server.
    pub server_name: Option<Identity>,
    /// Relay to use instead of resolving one.
    pub relay_addr: Option<String>,
    pub seed_rpc_url: String,
    pub rpc_timeout: Duration,
    pub ping_timeout: Duration,
    pub reconnect_min: Duration,
    pub reconnect_max: Duration,
    pub max_players: usize,
    pub chat_recipient: Option<Identity>,
    pub tick_interval: Duration,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            identity: random_identity(),
            server_name: None,
            relay_addr: None,
            seed_rpc_url: DEFAULT_SEED_RPC_URL.to_string(),
            rpc_timeout: Duration::from_millis(3000),
            ping_timeout: Duration::from_millis(1000),
            reconnect_min: Duration::from_millis(1000),
            reconnect_max: Duration::from_millis(64000),
            max_players: DEFAULT_MAX_PLAYERS,
            chat_recipient: None,
            tick_interval: TICK_INTERVAL,
        }
    }
}

impl NodeConfig {
    /// Reads `ARENA_*` variables, falling back to defaults for unset ones.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let identity = match text(&lookup, "ARENA_IDENTITY")? {
            Some(value) => Identity::new(value),
            None => defaults.identity,
        };
        let reconnect_min = number(&lookup, "ARENA_RECONNECT_MIN_MS")?.unwrap_or(1000);
        let reconnect_max = number(&lookup, "ARENA_RECONNECT_MAX_MS")?.unwrap_or(64000);
        if reconnect_min == 0 {
            return Err(ConfigError::ZeroBackoff);
        }
        if reconnect_min > reconnect_max {
            return Err(ConfigError::BackoffBounds {
                min: reconnect_min,
                max: reconnect_max,
            });
        }

        let max_players = match number(&lookup, "ARENA_MAX_PLAYERS")? {
            Some(n) => (n as usize).clamp(1, MAX_ROSTER_LEN),
            None => defaults.max_players,
        };

        Ok(Self {
            identity,
            server_name: text(&lookup, "ARENA_SERVER_NAME")?.map(Identity::new),
            relay_addr: text(&lookup, "ARENA_RELAY_ADDR")?,
            seed_rpc_url: text(&lookup, "ARENA_SEED_RPC_URL")?.unwrap_or(defaults.seed_rpc_url),
            rpc_timeout: number(&lookup, "ARENA_RPC_TIMEOUT_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.rpc_timeout),
            ping_timeout: number(&lookup, "ARENA_PING_TIMEOUT_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.ping_timeout),
            reconnect_min: Duration::from_millis(reconnect_min),
            reconnect_max: Duration::from_millis(reconnect_max),
            max_players,
            chat_recipient: text(&lookup, "ARENA_CHAT_RECIPIENT")?.map(Identity::new),
            tick_interval: defaults.tick_interval,
        })
    }

    pub fn is_server(&self) -> bool {
        self.server_name.is_none()
    }
}

// Unset is fine; set-but-blank is a mistake worth surfacing.
fn text(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<String>, ConfigError> {
    match lookup(name) {
        None => Ok(None),
        Some(value) if value.trim().is_empty() => Err(ConfigError::Empty { name }),
        Some(value) => Ok(Some(value.trim().to_string())),
    }
}

fn number(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<u64>, ConfigError> {
    match text(lookup, name)? {
        None => Ok(None),
        Some(value) => value
            .parse::<u64>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidNumber { name, value }),
    }
}
