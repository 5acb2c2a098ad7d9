use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::thresholds::{DetectorCooldowns, SafetyThresholds};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

fn env_u64(key: &str, default: u64) -> u64 {
    env_opt(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_i32(key: &str, default: i32) -> i32 {
    env_opt(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_f64(key: &str, default: f64) -> f64 {
    env_opt(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub engine: EngineConfig,
    pub thresholds: SafetyThresholds,
    pub cache: CacheConfig,
    pub rules: RulesConfig,
    pub events: EventsConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    pub fn from_env() -> Self {
        Self {
            engine: EngineConfig::from_env(),
            thresholds: thresholds_from_env(),
            cache: CacheConfig::from_env(),
            rules: RulesConfig::from_env(),
            events: EventsConfig::from_env(),
        }
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded:");
        tracing::info!(
            "  engine:     tick={}s, session_timeout={}s, local_offset={}min",
            self.engine.tick_interval_secs,
            self.engine.session_timeout_secs,
            self.engine.local_offset_min
        );
        tracing::info!(
            "  thresholds: vs_change={}fpm, vs_extreme={}fpm, proximity={}nm, alt_diff={}ft",
            self.thresholds.vs_change_fpm,
            self.thresholds.vs_extreme_fpm,
            self.thresholds.proximity_nm,
            self.thresholds.altitude_diff_ft
        );
        tracing::info!(
            "  cache:      ttl={}s, shared_timeout={}ms",
            self.cache.ttl_secs,
            self.cache.shared_timeout_ms
        );
        tracing::info!("  rules:      dir={}", self.rules.rules_dir.display());
        tracing::info!(
            "  events:     history={}, dedup_window={}s",
            self.events.history_path.display(),
            self.events.dedup_window_secs
        );
    }
}

// ── Engine ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Seconds between ticks.
    pub tick_interval_secs: u64,
    /// Idle seconds before an aircraft track is evicted.
    pub session_timeout_secs: u64,
    /// Fixed offset of deployment-local time from UTC, in minutes.
    /// Drives rule suppression-window checks.
    pub local_offset_min: i32,
}

impl EngineConfig {
    fn from_env() -> Self {
        Self {
            tick_interval_secs: env_u64("SKYWARDEN_TICK_INTERVAL_SECS", 2),
            session_timeout_secs: env_u64("SKYWARDEN_SESSION_TIMEOUT_SECS", 300),
            local_offset_min: env_i32("SKYWARDEN_LOCAL_OFFSET_MIN", 0),
        }
    }
}

// ── Safety thresholds ─────────────────────────────────────────

fn thresholds_from_env() -> SafetyThresholds {
    let defaults = SafetyThresholds::default();
    SafetyThresholds {
        vs_change_fpm: env_i32("SKYWARDEN_VS_CHANGE_FPM", defaults.vs_change_fpm),
        vs_extreme_fpm: env_i32("SKYWARDEN_VS_EXTREME_FPM", defaults.vs_extreme_fpm),
        proximity_nm: env_f64("SKYWARDEN_PROXIMITY_NM", defaults.proximity_nm),
        altitude_diff_ft: env_i32("SKYWARDEN_ALTITUDE_DIFF_FT", defaults.altitude_diff_ft),
        reversal_window_secs: env_u64(
            "SKYWARDEN_REVERSAL_WINDOW_SECS",
            defaults.reversal_window_secs,
        ),
        cooldowns: DetectorCooldowns {
            extreme_vs_secs: env_u64(
                "SKYWARDEN_COOLDOWN_EXTREME_VS_SECS",
                defaults.cooldowns.extreme_vs_secs,
            ),
            tcas_ra_secs: env_u64(
                "SKYWARDEN_COOLDOWN_TCAS_RA_SECS",
                defaults.cooldowns.tcas_ra_secs,
            ),
            proximity_secs: env_u64(
                "SKYWARDEN_COOLDOWN_PROXIMITY_SECS",
                defaults.cooldowns.proximity_secs,
            ),
        },
    }
}

// ── Rule cache ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Local cache freshness bound; guards against a missed invalidation.
    pub ttl_secs: u64,
    /// Timeout for a shared-store read during reload.
    pub shared_timeout_ms: u64,
}

impl CacheConfig {
    fn from_env() -> Self {
        Self {
            ttl_secs: env_u64("SKYWARDEN_CACHE_TTL_SECS", 30),
            shared_timeout_ms: env_u64("SKYWARDEN_CACHE_SHARED_TIMEOUT_MS", 250),
        }
    }
}

// ── Rule source ───────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RulesConfig {
    /// Directory holding rule YAML documents.
    pub rules_dir: PathBuf,
}

impl RulesConfig {
    fn from_env() -> Self {
        Self {
            rules_dir: PathBuf::from(env_or("SKYWARDEN_RULES_DIR", "data/rules")),
        }
    }
}

// ── Event sink ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventsConfig {
    /// Append-only event history file (JSON lines).
    pub history_path: PathBuf,
    /// Exact-duplicate suppression window at the sink.
    pub dedup_window_secs: u64,
    /// Capacity of the in-process broadcast channel.
    pub broadcast_capacity: usize,
}

impl EventsConfig {
    fn from_env() -> Self {
        Self {
            history_path: PathBuf::from(env_or(
                "SKYWARDEN_EVENT_HISTORY",
                "data/events/history.jsonl",
            )),
            dedup_window_secs: env_u64("SKYWARDEN_EVENT_DEDUP_SECS", 2),
            broadcast_capacity: env_u64("SKYWARDEN_BROADCAST_CAPACITY", 1024) as usize,
        }
    }
}
