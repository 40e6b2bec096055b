//! Pool and database configuration with environment variable overrides.
//!
//! Defaults are compiled in; `STRATA_*` environment variables override them
//! with strict parsing rules — integers must be valid and within range, and
//! invalid values are silently ignored (fall back to the default).

use std::path::PathBuf;

use tracing::warn;

/// Connection pool bounds and timeouts.
#[derive(Clone, Debug)]
pub struct PoolConfig {
    /// Connections opened up front by `start` (default: 2).
    pub min_connections: u32,
    /// Maximum concurrently checked-out connections, and the idle queue
    /// capacity (default: 8).
    pub max_connections: u32,
    /// Busy-wait ceiling applied at connection open, in milliseconds
    /// (default: 30000). The only timeout in the system.
    pub busy_timeout_ms: u32,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            min_connections: 2,
            max_connections: 8,
            busy_timeout_ms: 30_000,
        }
    }
}

impl PoolConfig {
    /// Clamp inconsistent bounds: a minimum above the maximum is lowered.
    pub fn normalize(&mut self) {
        if self.min_connections > self.max_connections {
            warn!(
                min = self.min_connections,
                max = self.max_connections,
                "pool minimum exceeds maximum, clamping"
            );
            self.min_connections = self.max_connections;
        }
    }
}

/// Location of the writable database file plus pool bounds.
#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    /// Writable database file path.
    pub path: PathBuf,
    /// Pool bounds.
    pub pool: PoolConfig,
}

impl DatabaseConfig {
    /// Config for the database at `path` with default pool bounds.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            pool: PoolConfig::default(),
        }
    }
}

/// Apply `STRATA_*` environment variable overrides to `config`.
///
/// Honored variables: `STRATA_DB_PATH`, `STRATA_POOL_MIN`, `STRATA_POOL_MAX`,
/// `STRATA_BUSY_TIMEOUT_MS`. Invalid or out-of-range values are ignored.
pub fn apply_env_overrides(config: &mut DatabaseConfig) {
    if let Ok(v) = std::env::var("STRATA_DB_PATH")
        && !v.is_empty()
    {
        config.path = PathBuf::from(v);
    }
    if let Some(v) = parse_u32(std::env::var("STRATA_POOL_MIN").ok(), 0, 64) {
        config.pool.min_connections = v;
    }
    if let Some(v) = parse_u32(std::env::var("STRATA_POOL_MAX").ok(), 1, 64) {
        config.pool.max_connections = v;
    }
    if let Some(v) = parse_u32(std::env::var("STRATA_BUSY_TIMEOUT_MS").ok(), 0, 600_000) {
        config.pool.busy_timeout_ms = v;
    }
    config.pool.normalize();
}

/// Range-checked integer parse; anything invalid becomes `None`.
fn parse_u32(raw: Option<String>, min: u32, max: u32) -> Option<u32> {
    let value: u32 = raw?.trim().parse().ok()?;
    (min..=max).contains(&value).then_some(value)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = PoolConfig::default();
        assert_eq!(config.min_connections, 2);
        assert_eq!(config.max_connections, 8);
        assert_eq!(config.busy_timeout_ms, 30_000);
    }

    #[test]
    fn parse_accepts_in_range() {
        assert_eq!(parse_u32(Some("4".into()), 1, 64), Some(4));
        assert_eq!(parse_u32(Some(" 8 ".into()), 1, 64), Some(8));
    }

    #[test]
    fn parse_rejects_out_of_range_and_garbage() {
        assert_eq!(parse_u32(Some("0".into()), 1, 64), None);
        assert_eq!(parse_u32(Some("65".into()), 1, 64), None);
        assert_eq!(parse_u32(Some("eight".into()), 1, 64), None);
        assert_eq!(parse_u32(Some("-2".into()), 1, 64), None);
        assert_eq!(parse_u32(None, 1, 64), None);
    }

    #[test]
    fn normalize_clamps_min_above_max() {
        let mut config = PoolConfig {
            min_connections: 10,
            max_connections: 4,
            busy_timeout_ms: 1000,
        };
        config.normalize();
        assert_eq!(config.min_connections, 4);
    }
}
