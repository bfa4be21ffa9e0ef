use crate::error::{AppError, Result};

/// Collection holding detected market-condition changes.
pub const ALERTS_TABLE: &str = "market_alerts";

/// Collection the newsletter signup writes to.
pub const SUBSCRIBERS_TABLE: &str = "subscribers";

/// Trailing window the alerts feed covers, in hours.
pub const ALERT_WINDOW_HOURS: i64 = 2;

/// Maximum alerts returned by the feed.
pub const ALERT_LIMIT: usize = 10;

/// How long the serving layer may reuse an alerts response (seconds).
pub const REVALIDATE_SECS: u64 = 60;

/// Path segment the hosted backend exposes its tables under.
pub const REST_PATH: &str = "rest/v1";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// Hosted backend over its REST dialect (SUPABASE_URL / SUPABASE_ANON_KEY).
    Rest,
    /// Local SQLite file, for development and offline runs.
    Sqlite,
}

impl std::str::FromStr for BackendKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rest" | "supabase" => Ok(BackendKind::Rest),
            "sqlite" => Ok(BackendKind::Sqlite),
            other => Err(AppError::Config(format!(
                "ALERTS_BACKEND must be 'rest' or 'sqlite', got '{other}'"
            ))),
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::Rest => write!(f, "rest"),
            BackendKind::Sqlite => write!(f, "sqlite"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Hosted backend base URL (SUPABASE_URL). None = backend not configured.
    pub backend_url: Option<String>,
    /// Hosted backend API key (SUPABASE_ANON_KEY, falls back to SUPABASE_KEY).
    pub backend_key: Option<String>,
    pub backend_kind: BackendKind,
    /// Request timeout for the hosted backend (BACKEND_TIMEOUT_SECS).
    pub backend_timeout_secs: u64,
    pub db_path: String,
    pub log_level: String,
    pub api_port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            backend_url: non_empty_var("SUPABASE_URL"),
            backend_key: non_empty_var("SUPABASE_ANON_KEY")
                .or_else(|| non_empty_var("SUPABASE_KEY")),
            backend_kind: std::env::var("ALERTS_BACKEND")
                .unwrap_or_else(|_| "rest".to_string())
                .parse()?,
            backend_timeout_secs: std::env::var("BACKEND_TIMEOUT_SECS")
                .unwrap_or_else(|_| "10".to_string())
                .parse::<u64>()
                .map_err(|_| {
                    AppError::Config("BACKEND_TIMEOUT_SECS must be a whole number".to_string())
                })?,
            db_path: std::env::var("DB_PATH").unwrap_or_else(|_| "alerts.db".to_string()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            api_port: std::env::var("API_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse::<u16>()
                .map_err(|_| AppError::Config("API_PORT must be a valid port number".to_string()))?,
        })
    }

    /// Both halves of the hosted backend credentials, if present.
    pub fn backend_credentials(&self) -> Option<(&str, &str)> {
        match (&self.backend_url, &self.backend_key) {
            (Some(url), Some(key)) => Some((url.as_str(), key.as_str())),
            _ => None,
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(url: Option<&str>, key: Option<&str>) -> Config {
        Config {
            backend_url: url.map(str::to_string),
            backend_key: key.map(str::to_string),
            backend_kind: BackendKind::Rest,
            backend_timeout_secs: 10,
            db_path: "alerts.db".to_string(),
            log_level: "info".to_string(),
            api_port: 3000,
        }
    }

    #[test]
    fn credentials_need_both_url_and_key() {
        assert!(config(None, None).backend_credentials().is_none());
        assert!(config(Some("https://x.supabase.co"), None).backend_credentials().is_none());
        assert!(config(None, Some("anon")).backend_credentials().is_none());
        assert_eq!(
            config(Some("https://x.supabase.co"), Some("anon")).backend_credentials(),
            Some(("https://x.supabase.co", "anon"))
        );
    }

    #[test]
    fn backend_kind_parses_known_names() {
        assert_eq!("rest".parse::<BackendKind>().unwrap(), BackendKind::Rest);
        assert_eq!("Supabase".parse::<BackendKind>().unwrap(), BackendKind::Rest);
        assert_eq!(" sqlite ".parse::<BackendKind>().unwrap(), BackendKind::Sqlite);
        assert!("postgres".parse::<BackendKind>().is_err());
    }
}
