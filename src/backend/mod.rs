//! Alert backends.
//!
//! The feed only needs one capability from a backend: "rows of the alerts
//! collection with `created_at >= since`, newest first, at most `limit`".
//! [`AlertSource`] is that capability; the hosted REST backend and the local
//! SQLite store both provide it, and tests substitute their own.

pub mod rest;
pub mod sqlite;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use tracing::{info, warn};

use crate::config::{BackendKind, Config};
use crate::error::{AppError, Result};
use crate::types::MarketAlert;

pub use rest::RestClient;
pub use sqlite::SqliteAlertStore;

#[async_trait]
pub trait AlertSource: Send + Sync {
    /// Alerts with `created_at >= since`, ordered by `created_at` descending,
    /// at most `limit` of them.
    async fn recent_alerts(&self, since: DateTime<Utc>, limit: usize) -> Result<Vec<MarketAlert>>;

    /// Short label used in logs and `/health`.
    fn source_name(&self) -> &str;
}

/// Build the configured alert source. `Ok(None)` means the backend is not
/// configured; callers treat that as "no alerts", not as a failure.
pub async fn from_config(cfg: &Config) -> Result<Option<Arc<dyn AlertSource>>> {
    match cfg.backend_kind {
        BackendKind::Rest => match RestClient::from_config(cfg)? {
            Some(client) => {
                info!("Alert source: hosted backend at {}", client.base_url());
                let source: Arc<dyn AlertSource> = Arc::new(client);
                Ok(Some(source))
            }
            None => {
                warn!("SUPABASE_URL / SUPABASE_ANON_KEY not set; /api/alerts will serve an empty feed");
                Ok(None)
            }
        },
        BackendKind::Sqlite => {
            let store = SqliteAlertStore::connect(&cfg.db_path).await?;
            info!("Alert source: SQLite at {}", cfg.db_path);
            let source: Arc<dyn AlertSource> = Arc::new(store);
            Ok(Some(source))
        }
    }
}

/// UTC timestamp in the fixed-width form the backends store and compare:
/// `YYYY-MM-DDTHH:MM:SS.mmmZ`.
pub fn iso_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Re-render any RFC 3339 timestamp in the fixed-width UTC form.
pub fn normalize_timestamp(raw: &str) -> Result<String> {
    let parsed = DateTime::parse_from_rfc3339(raw)
        .map_err(|e| AppError::InvalidData(format!("invalid timestamp '{raw}': {e}")))?;
    Ok(iso_timestamp(parsed.with_timezone(&Utc)))
}
