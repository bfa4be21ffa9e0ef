use serde::Deserialize;

use polymarket_times::types::{AlertsResponse, MarketAlert, Urgency};

// ---------------------------------------------------------------------------
// API response types (mirror /health)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Default)]
pub struct HealthResponse {
    pub backend_configured: Option<bool>,
    pub queries_total: Option<u64>,
    pub query_failures: Option<u64>,
    pub last_success_at_ms: Option<i64>,
}

// ---------------------------------------------------------------------------
// App state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionStatus {
    Connected,
    Error(String),
    Connecting,
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub status: ConnectionStatus,
    pub alerts: Vec<MarketAlert>,
    pub health: HealthResponse,
    pub last_refresh: std::time::Instant,
    pub base_url: String,
}

impl AppState {
    pub fn new(base_url: String) -> Self {
        Self {
            status: ConnectionStatus::Connecting,
            alerts: Vec::new(),
            health: HealthResponse::default(),
            last_refresh: std::time::Instant::now(),
            base_url,
        }
    }

    pub fn selected_alert(&self, index: Option<usize>) -> Option<&MarketAlert> {
        index.and_then(|i| self.alerts.get(i))
    }

    pub async fn refresh(&mut self, client: &reqwest::Client) {
        let alerts_url = format!("{}/api/alerts", self.base_url);
        let health_url = format!("{}/health", self.base_url);

        let (alerts_res, health_res) = tokio::join!(
            client.get(&alerts_url).send(),
            client.get(&health_url).send(),
        );

        let resp = match alerts_res {
            Ok(r) => r,
            Err(e) => {
                self.status = ConnectionStatus::Error(format!("{e}"));
                return;
            }
        };

        match resp.json::<AlertsResponse>().await {
            Ok(body) => {
                self.apply_alerts(body);
                if let Ok(h) = health_res {
                    if let Ok(health) = h.json::<HealthResponse>().await {
                        self.health = health;
                    }
                }
            }
            Err(e) => {
                self.status = ConnectionStatus::Error(format!("parse error: {e}"));
            }
        }
    }

    fn apply_alerts(&mut self, body: AlertsResponse) {
        self.alerts = body.alerts;
        self.status = ConnectionStatus::Connected;
        self.last_refresh = std::time::Instant::now();
    }
}

// ---------------------------------------------------------------------------
// Formatting helpers
// ---------------------------------------------------------------------------

/// `2026-10-18T09:41:07.000Z` → `09:41`. Unparseable input is shown as-is.
pub fn format_time(iso: &str) -> String {
    chrono::DateTime::parse_from_rfc3339(iso)
        .map(|t| t.with_timezone(&chrono::Utc).format("%H:%M").to_string())
        .unwrap_or_else(|_| truncate(iso, 5))
}

/// Price delta in cents with sign, e.g. `+8.0¢` / `-12.5¢`.
pub fn format_move(price_change: f64) -> String {
    format!("{:+.1}¢", price_change * 100.0)
}

/// Price as cents, e.g. `0.43` → `43¢`.
pub fn format_price(p: f64) -> String {
    format!("{:.0}¢", p * 100.0)
}

/// Age of the server's last successful backend query, e.g. `last ok 42s ago`.
pub fn format_last_ok(last_success_at_ms: Option<i64>, now_ms: i64) -> String {
    match last_success_at_ms {
        Some(at) if at > 0 => {
            let secs = (now_ms - at).max(0) / 1_000;
            if secs < 120 {
                format!("last ok {secs}s ago")
            } else {
                format!("last ok {}m ago", secs / 60)
            }
        }
        _ => "no successful query yet".to_string(),
    }
}

pub fn urgency_label(u: Urgency) -> &'static str {
    match u {
        Urgency::High => "HIGH",
        Urgency::Medium => "MED",
        Urgency::Low => "LOW",
    }
}

pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{kept}…")
    }
}
