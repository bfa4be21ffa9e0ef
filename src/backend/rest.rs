use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use crate::backend::{iso_timestamp, AlertSource};
use crate::config::{Config, ALERTS_TABLE, REST_PATH};
use crate::error::{AppError, Result};
use crate::types::MarketAlert;

/// Client for the hosted backend's REST dialect (`/rest/v1/<table>` with
/// `column=op.value` filters). Cheap to clone; shares one connection pool.
#[derive(Clone)]
pub struct RestClient {
    http: reqwest::Client,
    base_url: String,
}

impl RestClient {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        let key = HeaderValue::from_str(api_key)
            .map_err(|_| AppError::Config("backend API key is not a valid header value".to_string()))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {api_key}"))
            .map_err(|_| AppError::Config("backend API key is not a valid header value".to_string()))?;

        let mut headers = HeaderMap::new();
        headers.insert("apikey", key);
        headers.insert(AUTHORIZATION, bearer);

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// `Ok(None)` when either credential is missing.
    pub fn from_config(cfg: &Config) -> Result<Option<Self>> {
        let Some((url, key)) = cfg.backend_credentials() else {
            return Ok(None);
        };
        Self::new(url, key, Duration::from_secs(cfg.backend_timeout_secs)).map(Some)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{}/{}", self.base_url, REST_PATH, table)
    }

    /// `GET <table>?select=*&<column>=gte.<since>&order=<column>.desc&limit=<n>`
    fn select_since_request(
        &self,
        table: &str,
        column: &str,
        since: &str,
        limit: usize,
    ) -> Result<reqwest::Request> {
        let request = self
            .http
            .get(self.table_url(table))
            .query(&[
                ("select", "*".to_string()),
                (column, format!("gte.{since}")),
                ("order", format!("{column}.desc")),
                ("limit", limit.to_string()),
            ])
            .build()?;
        Ok(request)
    }

    /// Rows of `table` with `column >= since`, newest first, at most `limit`.
    /// A `null` body is read as no rows. Rows that do not decode as `T` are
    /// logged and skipped so one malformed row cannot blank the result.
    pub async fn select_since<T: DeserializeOwned>(
        &self,
        table: &str,
        column: &str,
        since: &str,
        limit: usize,
    ) -> Result<Vec<T>> {
        let request = self.select_since_request(table, column, since, limit)?;
        debug!(url = %request.url(), "backend select");
        let resp = self.http.execute(request).await?;
        let rows: Option<Vec<serde_json::Value>> = read_json(resp).await?;
        Ok(rows
            .unwrap_or_default()
            .into_iter()
            .filter_map(|row| {
                let id = row.get("id").map(|v| v.to_string()).unwrap_or_default();
                serde_json::from_value(row)
                    .map_err(|e| warn!(table, id = %id, "skipping undecodable row: {e}"))
                    .ok()
            })
            .collect())
    }

    /// Insert one row and return what the backend stored.
    pub async fn insert<T: Serialize + ?Sized>(
        &self,
        table: &str,
        row: &T,
    ) -> Result<Vec<serde_json::Value>> {
        let resp = self
            .http
            .post(self.table_url(table))
            .header("Prefer", "return=representation")
            .json(row)
            .send()
            .await?;
        let stored: Option<Vec<serde_json::Value>> = read_json(resp).await?;
        Ok(stored.unwrap_or_default())
    }
}

/// Non-2xx answers become `AppError::Backend` carrying the backend's message.
async fn read_json<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
    let status = resp.status();
    let body = resp.text().await?;
    if !status.is_success() {
        return Err(AppError::Backend {
            status: status.as_u16(),
            body,
        });
    }
    if body.trim().is_empty() {
        return Ok(serde_json::from_str("null")?);
    }
    Ok(serde_json::from_str(&body)?)
}

#[async_trait]
impl AlertSource for RestClient {
    async fn recent_alerts(&self, since: DateTime<Utc>, limit: usize) -> Result<Vec<MarketAlert>> {
        self.select_since(ALERTS_TABLE, "created_at", &iso_timestamp(since), limit)
            .await
    }

    fn source_name(&self) -> &str {
        "rest"
    }
}
