//! Newsletter signup against the hosted `subscribers` collection.
//!
//! A signup first tries the full row. Some deployments only have the
//! `email` column, so a rejected full row is retried as `{ email }` alone.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::backend::{iso_timestamp, RestClient};
use crate::config::SUBSCRIBERS_TABLE;
use crate::error::{AppError, Result};

#[derive(Debug, Clone, Serialize)]
pub struct SubscriberSignup {
    pub email: String,
    pub source: String,
    pub subscribed_at: String,
}

#[derive(Debug, Serialize)]
struct MinimalSignup<'a> {
    email: &'a str,
}

impl SubscriberSignup {
    pub fn new(email: &str, source: &str, at: DateTime<Utc>) -> Result<Self> {
        let email = email.trim().to_ascii_lowercase();
        if !looks_like_email(&email) {
            return Err(AppError::InvalidData(format!("not an email address: '{email}'")));
        }
        Ok(Self {
            email,
            source: source.to_string(),
            subscribed_at: iso_timestamp(at),
        })
    }

    fn minimal(&self) -> MinimalSignup<'_> {
        MinimalSignup { email: &self.email }
    }
}

/// Which insert the backend accepted.
#[derive(Debug)]
pub enum SignupOutcome {
    Full(Vec<serde_json::Value>),
    /// Full row rejected (error kept for diagnosis), minimal row stored.
    Minimal {
        full_error: AppError,
        stored: Vec<serde_json::Value>,
    },
}

/// Both attempts failed.
#[derive(Debug)]
pub struct SignupFailure {
    pub full_error: AppError,
    pub minimal_error: AppError,
}

impl std::fmt::Display for SignupFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "full insert failed ({}); email-only insert failed ({})",
            self.full_error, self.minimal_error
        )
    }
}

pub async fn signup_with_fallback(
    client: &RestClient,
    signup: &SubscriberSignup,
) -> std::result::Result<SignupOutcome, SignupFailure> {
    let full_error = match client.insert(SUBSCRIBERS_TABLE, signup).await {
        Ok(stored) => {
            info!(email = %signup.email, "subscriber stored");
            return Ok(SignupOutcome::Full(stored));
        }
        Err(e) => e,
    };

    warn!(email = %signup.email, "full subscriber insert rejected: {full_error}; retrying email-only");

    match client.insert(SUBSCRIBERS_TABLE, &signup.minimal()).await {
        Ok(stored) => {
            info!(email = %signup.email, "subscriber stored (email only)");
            Ok(SignupOutcome::Minimal { full_error, stored })
        }
        Err(minimal_error) => Err(SignupFailure {
            full_error,
            minimal_error,
        }),
    }
}

fn looks_like_email(s: &str) -> bool {
    match s.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !s.contains(char::is_whitespace)
        }
        None => false,
    }
}
