use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::{api::profile::ProfileUpdate, mongodb::Id};

/// Public profile of an account. Shares its ID with the account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(rename = "_id")]
    pub id: Id,
    pub username: Option<String>,
    pub full_name: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// An empty profile for the account `id`.
    pub fn new(id: Id, now: DateTime<Utc>) -> Self {
        Self {
            id,
            username: None,
            full_name: None,
            bio: None,
            avatar_url: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply an update. Absent fields are left alone, blank ones are cleared.
    pub fn apply(&mut self, update: ProfileUpdate, now: DateTime<Utc>) {
        fn merge(field: &mut Option<String>, value: Option<String>) {
            if let Some(value) = value {
                let value = value.trim();
                *field = (!value.is_empty()).then(|| value.to_string());
            }
        }

        merge(&mut self.username, update.username);
        merge(&mut self.full_name, update.full_name);
        merge(&mut self.bio, update.bio);
        merge(&mut self.avatar_url, update.avatar_url);
        self.updated_at = now;
    }
}
