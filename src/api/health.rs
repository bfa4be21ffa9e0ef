//! Shared health state for the /health endpoint.
//! Updated by the alerts feed, read by the API.

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};

use serde::Serialize;

/// Feed diagnostics. Counters only; nothing here changes what the feed returns.
#[derive(Default)]
pub struct HealthState {
    /// True when an alert backend handle was available at startup.
    pub backend_configured: AtomicBool,
    /// Backend queries attempted.
    pub queries_total: AtomicU64,
    /// Backend queries that errored or panicked.
    pub query_failures: AtomicU64,
    /// Millisecond UTC timestamp of the last successful query (0 = none).
    pub last_success_at_ms: AtomicI64,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub backend_configured: bool,
    pub queries_total: u64,
    pub query_failures: u64,
    pub last_success_at_ms: Option<i64>,
}

impl HealthState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_backend_configured(&self, v: bool) {
        self.backend_configured.store(v, Ordering::Relaxed);
    }

    pub fn inc_queries_total(&self) {
        self.queries_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_query_failures(&self) {
        self.query_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn set_last_success_at_ms(&self, ms: i64) {
        self.last_success_at_ms.store(ms, Ordering::Relaxed);
    }

    pub fn backend_configured(&self) -> bool {
        self.backend_configured.load(Ordering::Relaxed)
    }

    pub fn queries_total(&self) -> u64 {
        self.queries_total.load(Ordering::Relaxed)
    }

    pub fn query_failures(&self) -> u64 {
        self.query_failures.load(Ordering::Relaxed)
    }

    pub fn last_success_at_ms(&self) -> i64 {
        self.last_success_at_ms.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> HealthResponse {
        let last = self.last_success_at_ms();
        HealthResponse {
            backend_configured: self.backend_configured(),
            queries_total: self.queries_total(),
            query_failures: self.query_failures(),
            last_success_at_ms: (last > 0).then_some(last),
        }
    }
}
