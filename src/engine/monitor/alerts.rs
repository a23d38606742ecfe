use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::shared::config::AlertThresholds;

use super::aggregate::CurrentMetrics;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    HighMemoryUsage,
    SlowQueries,
    HighErrorRate,
    LowCacheHitRatio,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alert {
    pub alert_type: AlertType,
    pub severity: Severity,
    pub message: String,
}

/// One alert per breached threshold. The cache ratio is only judged once
/// at least one lookup has been seen.
pub fn evaluate(metrics: &CurrentMetrics, thresholds: &AlertThresholds) -> Vec<Alert> {
    let mut alerts = Vec::new();

    if metrics.memory_usage_mb > thresholds.memory_mb {
        alerts.push(Alert {
            alert_type: AlertType::HighMemoryUsage,
            severity: Severity::Warning,
            message: format!(
                "memory usage {:.1} MB exceeds {:.1} MB",
                metrics.memory_usage_mb, thresholds.memory_mb
            ),
        });
    }

    if metrics.avg_query_time_ms > thresholds.query_time_ms {
        alerts.push(Alert {
            alert_type: AlertType::SlowQueries,
            severity: Severity::Warning,
            message: format!(
                "average query time {:.1} ms exceeds {:.1} ms",
                metrics.avg_query_time_ms, thresholds.query_time_ms
            ),
        });
    }

    if metrics.error_rate > thresholds.error_rate {
        alerts.push(Alert {
            alert_type: AlertType::HighErrorRate,
            severity: Severity::Critical,
            message: format!(
                "error rate {:.2}% exceeds {:.2}%",
                metrics.error_rate * 100.0,
                thresholds.error_rate * 100.0
            ),
        });
    }

    let lookups = metrics.cache_hits + metrics.cache_misses;
    if lookups > 0 && metrics.cache_hit_ratio < thresholds.cache_hit_ratio {
        alerts.push(Alert {
            alert_type: AlertType::LowCacheHitRatio,
            severity: Severity::Info,
            message: format!(
                "cache hit ratio {:.2}% is below {:.2}%",
                metrics.cache_hit_ratio * 100.0,
                thresholds.cache_hit_ratio * 100.0
            ),
        });
    }

    alerts
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    Healthy,
    Degraded,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthStatus {
    pub status: HealthState,
    pub alerts: Vec<Alert>,
    pub uptime: Duration,
    pub checked_at: DateTime<Utc>,
}

impl HealthStatus {
    /// Info alerts alone leave the status healthy.
    pub fn from_alerts(alerts: Vec<Alert>, uptime: Duration, checked_at: DateTime<Utc>) -> Self {
        let status = match alerts.iter().map(|a| a.severity).max() {
            Some(Severity::Critical) => HealthState::Critical,
            Some(Severity::Warning) => HealthState::Degraded,
            Some(Severity::Info) | None => HealthState::Healthy,
        };
        Self {
            status,
            alerts,
            uptime,
            checked_at,
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == HealthState::Healthy
    }
}
