use std::env;

use serde::{Deserialize, Serialize};

use crate::error::{LaeError, Result};

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

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_parse<T: std::str::FromStr>(profile: &str, key: &str, default: T) -> T {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_bool(profile: &str, key: &str, default: bool) -> bool {
    match profiled_env_opt(profile, key).as_deref().map(str::to_ascii_lowercase) {
        Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => true,
        Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => false,
        _ => default,
    }
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    #[serde(default)]
    pub profile: String,
    #[serde(default)]
    pub pool: PoolConfig,
    #[serde(default)]
    pub engine: EngineConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `LAE_PROFILE`. When set (e.g. `BENCH`), every key
    /// is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("LAE_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            pool: PoolConfig::from_env_profiled(p),
            engine: EngineConfig::from_env_profiled(p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Check every section, returning the first problem found.
    pub fn validate(&self) -> Result<()> {
        self.pool.validate()
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!(
            "  pool:    workers={}, fatigue=[{}, {}), seed={}",
            self.pool.resolved_worker_threads(),
            self.pool.fatigue_min,
            self.pool.fatigue_max,
            self.pool
                .seed
                .map(|s| s.to_string())
                .unwrap_or_else(|| "(random)".to_string())
        );
        tracing::info!("  engine:  strict={}", self.engine.strict);
    }
}

// ── Pool ──────────────────────────────────────────────────────

/// Worker pool sizing and fatigue factor range.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Number of worker threads. 0 = available parallelism.
    #[serde(default = "default_worker_threads")]
    pub worker_threads: usize,
    /// Inclusive lower bound of the per-worker fatigue factor.
    #[serde(default = "default_fatigue_min")]
    pub fatigue_min: f64,
    /// Exclusive upper bound of the per-worker fatigue factor.
    #[serde(default = "default_fatigue_max")]
    pub fatigue_max: f64,
    /// Fixed RNG seed for reproducible fatigue factors.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_worker_threads() -> usize { 0 }
fn default_fatigue_min() -> f64 { 0.5 }
fn default_fatigue_max() -> f64 { 1.5 }

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            worker_threads: default_worker_threads(),
            fatigue_min: default_fatigue_min(),
            fatigue_max: default_fatigue_max(),
            seed: None,
        }
    }
}

impl PoolConfig {
    /// Default config with an explicit worker count.
    pub fn with_threads(worker_threads: usize) -> Self {
        Self {
            worker_threads,
            ..Self::default()
        }
    }

    fn from_env_profiled(p: &str) -> Self {
        Self {
            worker_threads: profiled_env_parse(p, "LAE_WORKER_THREADS", default_worker_threads()),
            fatigue_min: profiled_env_parse(p, "LAE_FATIGUE_MIN", default_fatigue_min()),
            fatigue_max: profiled_env_parse(p, "LAE_FATIGUE_MAX", default_fatigue_max()),
            seed: profiled_env_opt(p, "LAE_SEED").and_then(|v| v.parse().ok()),
        }
    }

    /// Resolve worker thread count (0 means use available parallelism).
    pub fn resolved_worker_threads(&self) -> usize {
        if self.worker_threads == 0 {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        } else {
            self.worker_threads
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.fatigue_min.is_finite() || !self.fatigue_max.is_finite() {
            return Err(LaeError::Config("fatigue bounds must be finite".into()));
        }
        if self.fatigue_min <= 0.0 {
            return Err(LaeError::Config(format!(
                "fatigue_min must be positive, got {}",
                self.fatigue_min
            )));
        }
        if self.fatigue_min >= self.fatigue_max {
            return Err(LaeError::Config(format!(
                "fatigue range [{}, {}) is empty",
                self.fatigue_min, self.fatigue_max
            )));
        }
        Ok(())
    }
}

// ── Engine ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Abort a node computation when any of its row tasks fails. When off,
    /// failures are only logged and the node is resolved with whatever the
    /// scratch matrix holds.
    #[serde(default = "default_strict")]
    pub strict: bool,
}

fn default_strict() -> bool { true }

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            strict: default_strict(),
        }
    }
}

impl EngineConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            strict: profiled_env_bool(p, "LAE_STRICT", default_strict()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_config_defaults() {
        let config = PoolConfig::default();
        assert_eq!(config.worker_threads, 0);
        assert_eq!(config.fatigue_min, 0.5);
        assert_eq!(config.fatigue_max, 1.5);
        assert!(config.seed.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn resolved_worker_threads() {
        let mut config = PoolConfig::default();
        // 0 means auto-detect
        assert!(config.resolved_worker_threads() > 0);

        config.worker_threads = 8;
        assert_eq!(config.resolved_worker_threads(), 8);
    }

    #[test]
    fn validate_rejects_bad_ranges() {
        let mut config = PoolConfig::default();
        config.fatigue_min = 1.5;
        assert!(matches!(config.validate(), Err(LaeError::Config(_))));

        config.fatigue_min = 0.0;
        assert!(config.validate().is_err());

        config.fatigue_min = 0.5;
        config.fatigue_max = f64::INFINITY;
        assert!(config.validate().is_err());
    }

    #[test]
    fn serde_fills_missing_fields() {
        let config: Config = serde_json::from_str(r#"{"pool": {"worker_threads": 3}}"#).unwrap();
        assert_eq!(config.pool.worker_threads, 3);
        assert_eq!(config.pool.fatigue_max, 1.5);
        assert!(config.engine.strict);
    }

    #[test]
    fn profiled_keys_take_precedence() {
        // Profile names are unique to this test so parallel tests never collide.
        env::set_var("CFGTESTA_LAE_WORKER_THREADS", "6");
        env::set_var("CFGTESTA_LAE_STRICT", "off");
        env::set_var("CFGTESTA_LAE_SEED", "42");

        let config = Config::for_profile("cfgtesta");
        assert_eq!(config.profile, "CFGTESTA");
        assert_eq!(config.pool.worker_threads, 6);
        assert_eq!(config.pool.seed, Some(42));
        assert!(!config.engine.strict);

        env::remove_var("CFGTESTA_LAE_WORKER_THREADS");
        env::remove_var("CFGTESTA_LAE_STRICT");
        env::remove_var("CFGTESTA_LAE_SEED");
    }

    #[test]
    fn profile_label_defaults() {
        let config = Config::default();
        assert_eq!(config.profile_label(), "default");
    }
}
