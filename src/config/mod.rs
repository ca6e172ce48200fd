//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

/// One move and one rotate per frame on a 144 Hz display, with headroom
const DEFAULT_INPUT_RATE_LIMIT: u32 = 360;

/// Well above human click rates
const DEFAULT_SHOOT_RATE_LIMIT: u32 = 20;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Allowed client origins for CORS (empty = any origin)
    pub client_origins: Vec<String>,

    /// Arena simulation settings
    pub arena: ArenaConfig,

    /// Max move/rotate messages per second per connection
    pub input_rate_limit: u32,
    /// Max shoot messages per second per connection
    pub shoot_rate_limit: u32,
}

/// Tunables for the arena simulation
#[derive(Clone, Debug)]
pub struct ArenaConfig {
    /// Round length in seconds
    pub round_secs: u32,
    /// Delay between round end and the next round start.
    ///
    /// Counted in slow ticks, so it is seconds only while `slow_tick` is one
    /// second. The first tick after expiry is spent in Ended; with a value of
    /// 1 the next round starts on that tick and Cooldown is never entered.
    pub cooldown_secs: u32,
    /// Projectile tick interval
    pub fast_tick: Duration,
    /// Round clock interval; `round_secs` and `cooldown_secs` count these
    pub slow_tick: Duration,
    /// Seed for the spawn RNG; random when unset
    pub seed: Option<u64>,
    /// Zero every score when a new round starts
    pub reset_scores_each_round: bool,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            round_secs: 60,
            cooldown_secs: 5,
            fast_tick: Duration::from_millis(30),
            slow_tick: Duration::from_millis(1000),
            seed: None,
            reset_scores_each_round: false,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup (env, test maps)
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Hosted platforms provide PORT, fall back to SERVER_ADDR or default
        let server_addr = match lookup("PORT") {
            Some(port) => format!("0.0.0.0:{}", port),
            None => lookup("SERVER_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string()),
        };

        let client_origins = lookup("CLIENT_ORIGIN")
            .map(|raw| {
                raw.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let defaults = ArenaConfig::default();
        let arena = ArenaConfig {
            round_secs: non_zero(parse_or(&lookup, "ROUND_SECS", defaults.round_secs)?, "ROUND_SECS")?,
            cooldown_secs: parse_or(&lookup, "COOLDOWN_SECS", defaults.cooldown_secs)?,
            fast_tick: Duration::from_millis(non_zero(
                parse_or(&lookup, "FAST_TICK_MS", 30u64)?,
                "FAST_TICK_MS",
            )?),
            slow_tick: Duration::from_millis(non_zero(
                parse_or(&lookup, "SLOW_TICK_MS", 1000u64)?,
                "SLOW_TICK_MS",
            )?),
            seed: match lookup("ARENA_SEED") {
                Some(raw) => Some(raw.parse().map_err(|_| ConfigError::Invalid("ARENA_SEED"))?),
                None => None,
            },
            reset_scores_each_round: parse_or(
                &lookup,
                "RESET_SCORES_EACH_ROUND",
                defaults.reset_scores_each_round,
            )?,
        };

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            client_origins,
            arena,
            input_rate_limit: non_zero(
                parse_or(&lookup, "INPUT_RATE_LIMIT", DEFAULT_INPUT_RATE_LIMIT)?,
                "INPUT_RATE_LIMIT",
            )?,
            shoot_rate_limit: non_zero(
                parse_or(&lookup, "SHOOT_RATE_LIMIT", DEFAULT_SHOOT_RATE_LIMIT)?,
                "SHOOT_RATE_LIMIT",
            )?,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(key)),
        None => Ok(default),
    }
}

fn non_zero<T: Default + PartialEq>(value: T, key: &'static str) -> Result<T, ConfigError> {
    if value == T::default() {
        Err(ConfigError::Invalid(key))
    } else {
        Ok(value)
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),

    #[error("Invalid server address format")]
    InvalidAddress,
}
