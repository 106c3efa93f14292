use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use log::warn;
use rocket::{http::Status, tokio::sync::Mutex};

use crate::error::{Error, Result};

#[derive(Debug)]
struct Attempts {
    failures: u32,
    last_failure: DateTime<Utc>,
    locked_until: Option<DateTime<Utc>>,
}

impl Attempts {
    /// Nothing left to remember once the lockout is over and the last
    /// failure is older than the lockout window.
    fn is_stale(&self, now: DateTime<Utc>, window: Duration) -> bool {
        self.locked_until.map_or(true, |until| until <= now) && self.last_failure + window <= now
    }
}

/// Refuses sign-in for an email after too many consecutive failures.
///
/// State is kept in process memory and keyed on the normalised email.
/// Failures older than the lockout window are forgotten.
#[derive(Debug)]
pub struct LoginThrottle {
    max_attempts: u32,
    lockout: Duration,
    attempts: Mutex<HashMap<String, Attempts>>,
}

impl LoginThrottle {
    pub fn new(max_attempts: u32, lockout: Duration) -> Self {
        Self {
            max_attempts,
            lockout,
            attempts: Mutex::new(HashMap::new()),
        }
    }

    /// Fail if `email` is currently locked out.
    pub async fn check(&self, email: &str, now: DateTime<Utc>) -> Result<()> {
        let mut attempts = self.attempts.lock().await;
        let locked_until = attempts.get(email).and_then(|a| a.locked_until);
        match locked_until {
            Some(until) if until > now => {
                let wait = (until - now).num_seconds().max(1);
                Err(Error::Status(
                    Status::TooManyRequests,
                    format!("Too many failed sign-in attempts. Try again in {wait} seconds."),
                ))
            }
            Some(_) => {
                attempts.remove(email);
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// Count a failed attempt, locking the email once the limit is reached.
    pub async fn record_failure(&self, email: &str, now: DateTime<Utc>) {
        let mut attempts = self.attempts.lock().await;
        attempts.retain(|_, entry| !entry.is_stale(now, self.lockout));

        let entry = attempts.entry(email.to_string()).or_insert(Attempts {
            failures: 0,
            last_failure: now,
            locked_until: None,
        });
        entry.failures += 1;
        entry.last_failure = now;
        if entry.failures >= self.max_attempts {
            warn!("Locking sign-in for {email} after {} failures", entry.failures);
            entry.failures = 0;
            entry.locked_until = Some(now + self.lockout);
        }
    }

    pub async fn record_success(&self, email: &str) {
        self.attempts.lock().await.remove(email);
    }
}
