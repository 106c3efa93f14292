use std::ops::Deref;

use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

/// A single vote row: one chosen option of one voter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteCore {
    pub poll_id: Id,
    pub option_id: Id,
    pub voter_id: Id,
    /// The poll ID for single-choice polls, the option ID for multiple-choice polls.
    /// `(voter_id, ballot_slot)` is unique.
    pub ballot_slot: Id,
    /// Shared by every row written by the same submission.
    pub submission_id: Id,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

/// A vote without an ID.
pub type NewVote = VoteCore;

/// A vote from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub vote: VoteCore,
}

impl Deref for Vote {
    type Target = VoteCore;

    fn deref(&self) -> &Self::Target {
        &self.vote
    }
}

#[cfg(test)]
pub mod examples {
    use super::*;

    impl Vote {
        /// A single-choice vote for `option_id`.
        pub fn example(poll_id: Id, option_id: Id) -> Self {
            Self {
                id: Id::new(),
                vote: VoteCore {
                    poll_id,
                    option_id,
                    voter_id: Id::new(),
                    ballot_slot: poll_id,
                    submission_id: Id::new(),
                    created_at: Utc::now(),
                },
            }
        }
    }
}
