//! Engine tuning parameters.

use serde::{Deserialize, Serialize};

/// Configuration for the engagement engine.
///
/// All intervals are in milliseconds. The defaults match the production
/// tracking behaviour; tests override individual fields to compress time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Intersection ratio required to open a module's first visit.
    pub visibility_threshold: f64,

    /// Intersection ratio required to re-open a module that already has
    /// closed-visit history. Deliberately a separate bar so scroll-bounce
    /// near the boundary does not multiply visits.
    pub reentry_threshold: f64,

    /// Open time (non-idle) required before a visit counts as observed.
    /// Default: 2000 (2 seconds).
    pub min_view_time_ms: i64,

    /// Minimum gap between closing a module's visit and opening the next.
    /// Entry attempts inside the gap are discarded. Default: 10000.
    pub min_away_time_ms: i64,

    /// Input silence after which the session is considered idle.
    /// Default: 120000 (2 minutes).
    pub idle_timeout_ms: i64,

    /// Interval between heartbeat activity reports for open visits.
    /// Default: 10000.
    pub heartbeat_interval_ms: i64,

    /// Interval between backup visibility scans. Covers platforms where
    /// the primary intersection signal under-fires. Default: 2000.
    pub backup_scan_interval_ms: i64,

    /// Interval between scroll depth samples for open visits.
    /// Default: 1000.
    pub scroll_sample_interval_ms: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            visibility_threshold: 0.45,
            reentry_threshold: 0.40,
            min_view_time_ms: 2_000,
            min_away_time_ms: 10_000,
            idle_timeout_ms: 120_000,
            heartbeat_interval_ms: 10_000,
            backup_scan_interval_ms: 2_000,
            scroll_sample_interval_ms: 1_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_tracking_policy() {
        let config = EngineConfig::default();
        assert!((config.visibility_threshold - 0.45).abs() < f64::EPSILON);
        assert!((config.reentry_threshold - 0.40).abs() < f64::EPSILON);
        assert_eq!(config.min_view_time_ms, 2_000);
        assert_eq!(config.min_away_time_ms, 10_000);
        assert_eq!(config.idle_timeout_ms, 120_000);
        assert_eq!(config.heartbeat_interval_ms, 10_000);
    }

    #[test]
    fn partial_toml_like_json_fills_defaults() {
        let config: EngineConfig = serde_json::from_str(r#"{"min_view_time_ms": 500}"#).unwrap();
        assert_eq!(config.min_view_time_ms, 500);
        assert_eq!(config.idle_timeout_ms, 120_000);
    }
}
