use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::mongodb::Id;

/// Core poll data, as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollCore {
    pub title: String,
    pub description: Option<String>,
    pub is_multiple_choice: bool,
    pub is_private: bool,
    /// Argon2 hash of the SHA-256 pre-hash of the poll password.
    /// Only present for private polls.
    pub password_hash: Option<String>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub end_date: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    pub created_by: Id,
}

impl PollCore {
    /// Check a pre-hashed candidate password against the stored hash.
    /// Polls without a stored hash never match.
    pub fn verify_password(&self, prehashed: &str) -> Result<bool> {
        match self.password_hash {
            Some(ref hash) => Ok(argon2::verify_encoded(hash, prehashed.as_bytes())?),
            None => Ok(false),
        }
    }

    /// Is voting still open at `now`?
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.end_date > now
    }
}

/// A poll without an ID.
pub type NewPoll = PollCore;

/// A poll from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Poll {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub poll: PollCore,
}

impl Deref for Poll {
    type Target = PollCore;

    fn deref(&self) -> &Self::Target {
        &self.poll
    }
}

impl DerefMut for Poll {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.poll
    }
}

/// A single answer of a poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollOptionCore {
    pub poll_id: Id,
    pub text: String,
    /// Zero-based position in the poll's option list.
    pub position: u32,
}

/// An option without an ID.
pub type NewPollOption = PollOptionCore;

/// An option from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollOption {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub option: PollOptionCore,
}

impl Deref for PollOption {
    type Target = PollOptionCore;

    fn deref(&self) -> &Self::Target {
        &self.option
    }
}

/// Example data for tests.
#[cfg(test)]
pub mod examples {
    use chrono::Duration;

    use super::*;
    use crate::model::common::access::hash_poll_password;

    impl PollCore {
        pub fn example(created_by: Id, now: DateTime<Utc>) -> Self {
            Self {
                title: "Team Lunch Location".to_string(),
                description: Some("Where should we go for our monthly team lunch?".to_string()),
                is_multiple_choice: false,
                is_private: false,
                password_hash: None,
                end_date: now + Duration::days(7),
                created_at: now - Duration::days(1),
                created_by,
            }
        }

        pub fn private_example(created_by: Id, now: DateTime<Utc>, password: &str) -> Self {
            let salt = b"saltsaltsaltsalt";
            let prehashed = hash_poll_password(password);
            let password_hash =
                argon2::hash_encoded(prehashed.as_bytes(), salt, &argon2::Config::default())
                    .unwrap();
            Self {
                title: "Secret Project Name".to_string(),
                is_private: true,
                password_hash: Some(password_hash),
                ..Self::example(created_by, now)
            }
        }
    }

    impl Poll {
        pub fn example(now: DateTime<Utc>) -> Self {
            Self {
                id: Id::new(),
                poll: PollCore::example(Id::new(), now),
            }
        }
    }

    impl PollOption {
        pub fn example(poll_id: Id, position: u32, text: &str) -> Self {
            Self {
                id: Id::new(),
                option: PollOptionCore {
                    poll_id,
                    text: text.to_string(),
                    position,
                },
            }
        }
    }
}
