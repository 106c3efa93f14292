use serde::{Deserialize, Serialize};

use crate::model::{api::id::ApiId, mongodb::Id};

/// The options a voter picked on one poll.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BallotRequest {
    pub option_ids: Vec<ApiId>,
}

impl BallotRequest {
    pub fn selection(&self) -> Vec<Id> {
        self.option_ids.iter().copied().map(Id::from).collect()
    }
}

/// Whether the session user has already voted on a poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotedView {
    pub has_voted: bool,
}
