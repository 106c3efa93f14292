use std::collections::BTreeSet;

use data_encoding::HEXLOWER;
use log::{info, warn};
use rocket::http::{Cookie, CookieJar, SameSite};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};
use crate::model::{db::Poll, mongodb::Id, store::Backend};

/// Private cookie listing the private polls unlocked in this browser session.
pub const POLL_ACCESS_COOKIE: &str = "poll_access";

/// One-way pre-hash applied to a candidate poll password before it is
/// handed to the backend for comparison.
///
/// This is plain unsalted SHA-256, so it only hides the plaintext in transit
/// to the backend. The backend stores a salted argon2 hash of this value.
pub fn hash_poll_password(candidate: &str) -> String {
    HEXLOWER.encode(&Sha256::digest(candidate.as_bytes()))
}

/// Private polls the current session may see.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AccessGrants(BTreeSet<Id>);

impl AccessGrants {
    /// Parse a comma separated list of IDs, skipping anything malformed.
    pub fn from_cookie_value(value: &str) -> Self {
        Self(value.split(',').filter_map(|id| id.parse().ok()).collect())
    }

    /// Read the grants of the current session. No cookie means no grants.
    pub fn from_cookies(cookies: &CookieJar<'_>) -> Self {
        cookies
            .get_private(POLL_ACCESS_COOKIE)
            .map(|cookie| Self::from_cookie_value(cookie.value()))
            .unwrap_or_default()
    }

    /// A session cookie (no expiry) carrying these grants.
    pub fn to_cookie(&self) -> Cookie<'static> {
        let value = self
            .0
            .iter()
            .map(Id::to_string)
            .collect::<Vec<_>>()
            .join(",");
        Cookie::build(POLL_ACCESS_COOKIE, value)
            .http_only(true)
            .same_site(SameSite::Strict)
            .finish()
    }

    pub fn contains(&self, poll_id: Id) -> bool {
        self.0.contains(&poll_id)
    }

    pub fn grant(&mut self, poll_id: Id) {
        self.0.insert(poll_id);
    }

    /// May `viewer` see the ballot and results of `poll`?
    /// Public polls are open to everyone, and creators always see their own polls.
    pub fn permits(&self, poll: &Poll, viewer: Id) -> bool {
        !poll.is_private || poll.created_by == viewer || self.contains(poll.id)
    }
}

/// Try to unlock a private poll with a candidate password.
///
/// On success the poll is added to `grants`. Every failure, including a
/// backend error, is reported as [`Error::AccessDenied`].
pub async fn unlock(
    backend: &dyn Backend,
    poll: &Poll,
    candidate: &str,
    grants: &mut AccessGrants,
) -> Result<()> {
    if !poll.is_private {
        return Ok(());
    }
    if candidate.is_empty() {
        return Err(Error::AccessDenied);
    }

    let prehashed = hash_poll_password(candidate);
    match backend.check_poll_password(poll.id, &prehashed).await {
        Ok(true) => {
            info!("Unlocked private poll {}", poll.id);
            grants.grant(poll.id);
            Ok(())
        }
        Ok(false) => Err(Error::AccessDenied),
        Err(err) => {
            warn!("Password check for poll {} failed: {err}", poll.id);
            Err(Error::AccessDenied)
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::model::{db::PollCore, memory::MemoryBackend};

    #[test]
    fn prehash_is_hex_sha256() {
        assert_eq!(
            "5e884898da28047151d0e56f8dc6292773603d0d6aabbdd62a11ef721d1542d8",
            hash_poll_password("password")
        );
    }

    #[test]
    fn cookie_value_parsing() {
        let a = Id::new();
        let b = Id::new();
        let mut grants = AccessGrants::default();
        grants.grant(a);
        grants.grant(b);

        let cookie = grants.to_cookie();
        assert_eq!(grants, AccessGrants::from_cookie_value(cookie.value()));
        assert_eq!(None, cookie.max_age());

        let parsed = AccessGrants::from_cookie_value(&format!("{a},garbage,,"));
        assert!(parsed.contains(a));
        assert!(!parsed.contains(b));
    }

    #[test]
    fn creators_and_public_polls_are_permitted() {
        let now = Utc::now();
        let owner = Id::new();
        let stranger = Id::new();
        let poll = Poll {
            id: Id::new(),
            poll: PollCore::private_example(owner, now, "pw"),
        };
        let public = Poll::example(now);

        let mut grants = AccessGrants::default();
        assert!(grants.permits(&poll, owner));
        assert!(!grants.permits(&poll, stranger));
        assert!(grants.permits(&public, stranger));

        grants.grant(poll.id);
        assert!(grants.permits(&poll, stranger));
    }

    #[rocket::async_test]
    async fn unlock_with_right_and_wrong_password() {
        let backend = MemoryBackend::new();
        let now = Utc::now();
        let poll = backend
            .insert_poll(PollCore::private_example(Id::new(), now, "open sesame"))
            .await
            .unwrap();

        let mut grants = AccessGrants::default();
        let denied = unlock(&backend, &poll, "open says me", &mut grants).await;
        assert!(matches!(denied, Err(Error::AccessDenied)));
        assert!(!grants.contains(poll.id));

        let denied = unlock(&backend, &poll, "", &mut grants).await;
        assert!(matches!(denied, Err(Error::AccessDenied)));

        unlock(&backend, &poll, "open sesame", &mut grants)
            .await
            .unwrap();
        assert!(grants.contains(poll.id));
    }

    #[rocket::async_test]
    async fn unknown_poll_is_indistinguishable_from_wrong_password() {
        let backend = MemoryBackend::new();
        let poll = Poll {
            id: Id::new(),
            poll: PollCore::private_example(Id::new(), Utc::now(), "pw"),
        };
        let mut grants = AccessGrants::default();
        let denied = unlock(&backend, &poll, "pw", &mut grants).await;
        assert_eq!(
            Error::AccessDenied.to_string(),
            denied.unwrap_err().to_string()
        );
    }
}
