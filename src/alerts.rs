use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Duration, Utc};
use futures_util::FutureExt;
use tracing::{debug, error};

use crate::api::health::HealthState;
use crate::api::latency::LatencyStats;
use crate::backend::AlertSource;
use crate::config::{ALERT_LIMIT, ALERT_WINDOW_HOURS};
use crate::types::MarketAlert;

/// The recent-alerts feed behind `GET /api/alerts`.
///
/// Never fails. Every error path, a panic in the backend call included,
/// ends in an empty list, so "no alerts" and "backend down" look the same.
pub struct AlertFeed {
    source: Option<Arc<dyn AlertSource>>,
    health: Arc<HealthState>,
    latency: Arc<LatencyStats>,
}

impl AlertFeed {
    pub fn new(
        source: Option<Arc<dyn AlertSource>>,
        health: Arc<HealthState>,
        latency: Arc<LatencyStats>,
    ) -> Self {
        health.set_backend_configured(source.is_some());
        Self {
            source,
            health,
            latency,
        }
    }

    pub fn health(&self) -> &HealthState {
        &self.health
    }

    pub fn latency(&self) -> &LatencyStats {
        &self.latency
    }

    /// Alerts from the trailing window ending at `now`, newest first.
    pub async fn latest(&self, now: DateTime<Utc>) -> Vec<MarketAlert> {
        let Some(source) = self.source.as_deref() else {
            debug!("no alert backend configured, serving empty feed");
            return Vec::new();
        };

        let since = window_start(now);
        self.health.inc_queries_total();
        let started = Instant::now();

        let outcome = AssertUnwindSafe(source.recent_alerts(since, ALERT_LIMIT))
            .catch_unwind()
            .await;

        self.latency.record(started.elapsed());

        match outcome {
            Ok(Ok(mut alerts)) => {
                alerts.truncate(ALERT_LIMIT);
                self.health.set_last_success_at_ms(now.timestamp_millis());
                debug!(source = source.source_name(), count = alerts.len(), "alerts fetched");
                alerts
            }
            Ok(Err(e)) => {
                self.health.inc_query_failures();
                error!(source = source.source_name(), "Error fetching alerts: {e}");
                Vec::new()
            }
            Err(panic) => {
                self.health.inc_query_failures();
                error!(
                    source = source.source_name(),
                    "Alert query panicked: {}",
                    panic_message(panic.as_ref())
                );
                Vec::new()
            }
        }
    }
}

/// Inclusive lower bound of the feed window.
pub fn window_start(now: DateTime<Utc>) -> DateTime<Utc> {
    now - Duration::hours(ALERT_WINDOW_HOURS)
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}
