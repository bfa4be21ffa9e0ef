//! Reproduce a newsletter signup against the hosted backend and report
//! exactly which insert the `subscribers` collection accepts.
//!
//! Usage: probe_subscribe <email>

use chrono::Utc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use polymarket_times::backend::RestClient;
use polymarket_times::config::Config;
use polymarket_times::subscribers::{signup_with_fallback, SignupOutcome, SubscriberSignup};

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    let Some(email) = std::env::args().nth(1) else {
        eprintln!("usage: probe_subscribe <email>");
        std::process::exit(2);
    };

    let client = match RestClient::from_config(&cfg) {
        Ok(Some(c)) => c,
        Ok(None) => {
            error!("SUPABASE_URL and SUPABASE_ANON_KEY must be set");
            std::process::exit(1);
        }
        Err(e) => {
            error!("Backend client error: {e}");
            std::process::exit(1);
        }
    };

    let signup = match SubscriberSignup::new(&email, "probe", Utc::now()) {
        Ok(s) => s,
        Err(e) => {
            error!("{e}");
            std::process::exit(2);
        }
    };

    info!("Probing {} with {:?}", client.base_url(), signup);

    match signup_with_fallback(&client, &signup).await {
        Ok(SignupOutcome::Full(stored)) => {
            info!("Full insert accepted: {}", serde_json::Value::from(stored));
        }
        Ok(SignupOutcome::Minimal { full_error, stored }) => {
            info!("Full insert rejected: {full_error}");
            info!("Email-only insert accepted: {}", serde_json::Value::from(stored));
        }
        Err(failure) => {
            error!("Signup failed: {failure}");
            std::process::exit(1);
        }
    }
}
