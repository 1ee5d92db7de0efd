use std::str::FromStr;

use strum::IntoEnumIterator;
use tokio::time::Duration;
use tracing::{info, warn};

/// Timing and sizing knobs for one client session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Guest probe period, and host content redistribution period
    pub probe_interval: Duration,
    /// Room heartbeat period once the room is active
    pub heartbeat_interval: Duration,
    /// Silence after which the peer counts as disconnected
    pub presence_timeout: Duration,
    pub presence_check_interval: Duration,
    pub round_duration: Duration,
    pub countdown_tick: Duration,
    /// How long a resolved round stays on screen before advancing
    pub resolve_delay: Duration,
    /// Prompts requested from the content generator
    pub batch_size: usize,
    /// Per-room buffer of the in-memory bus
    pub channel_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            probe_interval: Duration::from_millis(800),
            heartbeat_interval: Duration::from_millis(1000),
            presence_timeout: Duration::from_millis(4000),
            presence_check_interval: Duration::from_millis(2000),
            round_duration: Duration::from_secs(60),
            countdown_tick: Duration::from_secs(1),
            resolve_delay: Duration::from_millis(1500),
            batch_size: 10,
            channel_capacity: 100,
        }
    }
}

/// Environment overrides understood by [`SessionConfig::from_env`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::EnumIter)]
pub enum ConfigKey {
    ProbeIntervalMs,
    HeartbeatIntervalMs,
    PresenceTimeoutMs,
    PresenceCheckMs,
    RoundSecs,
    ResolveDelayMs,
    BatchSize,
    ChannelCapacity,
}

impl ConfigKey {
    pub fn var_name(self) -> &'static str {
        match self {
            ConfigKey::ProbeIntervalMs => "DUET_PROBE_INTERVAL_MS",
            ConfigKey::HeartbeatIntervalMs => "DUET_HEARTBEAT_INTERVAL_MS",
            ConfigKey::PresenceTimeoutMs => "DUET_PRESENCE_TIMEOUT_MS",
            ConfigKey::PresenceCheckMs => "DUET_PRESENCE_CHECK_MS",
            ConfigKey::RoundSecs => "DUET_ROUND_SECS",
            ConfigKey::ResolveDelayMs => "DUET_RESOLVE_DELAY_MS",
            ConfigKey::BatchSize => "DUET_BATCH_SIZE",
            ConfigKey::ChannelCapacity => "DUET_CHANNEL_CAPACITY",
        }
    }
}

impl SessionConfig {
    /// Defaults overridden by any `DUET_*` variables that are set
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env` but reading from an arbitrary source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        for key in ConfigKey::iter() {
            let Some(raw) = lookup(key.var_name()) else {
                continue;
            };

            let applied = match key {
                ConfigKey::ProbeIntervalMs => parse_millis(&raw).map(|d| config.probe_interval = d),
                ConfigKey::HeartbeatIntervalMs => {
                    parse_millis(&raw).map(|d| config.heartbeat_interval = d)
                }
                ConfigKey::PresenceTimeoutMs => {
                    parse_millis(&raw).map(|d| config.presence_timeout = d)
                }
                ConfigKey::PresenceCheckMs => {
                    parse_millis(&raw).map(|d| config.presence_check_interval = d)
                }
                ConfigKey::RoundSecs => parse_positive::<u64>(&raw)
                    .map(|secs| config.round_duration = Duration::from_secs(secs)),
                ConfigKey::ResolveDelayMs => parse_positive::<u64>(&raw)
                    .or_else(|| (raw.trim() == "0").then_some(0))
                    .map(|ms| config.resolve_delay = Duration::from_millis(ms)),
                ConfigKey::BatchSize => parse_positive(&raw).map(|n| config.batch_size = n),
                ConfigKey::ChannelCapacity => {
                    parse_positive(&raw).map(|n| config.channel_capacity = n)
                }
            };

            match applied {
                Some(()) => info!(key = key.var_name(), value = %raw, "Config override applied"),
                None => warn!(
                    key = key.var_name(),
                    value = %raw,
                    "Ignoring invalid config override"
                ),
            }
        }

        config
    }

    pub fn with_probe_interval(mut self, interval: Duration) -> Self {
        self.probe_interval = interval;
        self
    }

    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    pub fn with_presence_timeout(mut self, timeout: Duration) -> Self {
        self.presence_timeout = timeout;
        self
    }

    pub fn with_presence_check_interval(mut self, interval: Duration) -> Self {
        self.presence_check_interval = interval;
        self
    }

    pub fn with_round_duration(mut self, duration: Duration) -> Self {
        self.round_duration = duration;
        self
    }

    pub fn with_resolve_delay(mut self, delay: Duration) -> Self {
        self.resolve_delay = delay;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }
}

fn parse_positive<T: FromStr + Default + PartialOrd>(raw: &str) -> Option<T> {
    raw.trim()
        .parse::<T>()
        .ok()
        .filter(|value| *value > T::default())
}

fn parse_millis(raw: &str) -> Option<Duration> {
    parse_positive::<u64>(raw).map(Duration::from_millis)
}
