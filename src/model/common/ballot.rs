use std::collections::HashSet;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::{
    db::{NewVote, Poll, PollOption, VoteCore},
    mongodb::Id,
};

/// Reasons a ballot is refused before it reaches the backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BallotError {
    #[error("This poll has ended.")]
    PollEnded,
    #[error("Please select an option.")]
    NoSelection,
    #[error("This poll only allows a single choice.")]
    TooManySelections,
    #[error("The same option was selected more than once.")]
    DuplicateSelection,
    #[error("Option '{0}' does not belong to this poll.")]
    UnknownOption(Id),
    #[error("This poll is private. Enter its password first.")]
    Locked,
}

/// A voter's selection for one poll, checked against the poll's rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ballot {
    poll_id: Id,
    voter_id: Id,
    option_ids: Vec<Id>,
    exclusive: bool,
}

impl Ballot {
    /// Check a selection.
    ///
    /// `options` are the poll's options, `permitted` says whether the voter
    /// may see the poll at all (see `AccessGrants::permits`).
    pub fn check(
        poll: &Poll,
        options: &[PollOption],
        voter_id: Id,
        selection: Vec<Id>,
        permitted: bool,
        now: DateTime<Utc>,
    ) -> Result<Self, BallotError> {
        if !permitted {
            return Err(BallotError::Locked);
        }
        if !poll.is_active(now) {
            return Err(BallotError::PollEnded);
        }
        if selection.is_empty() {
            return Err(BallotError::NoSelection);
        }
        if !poll.is_multiple_choice && selection.len() > 1 {
            return Err(BallotError::TooManySelections);
        }

        let known: HashSet<Id> = options
            .iter()
            .filter(|option| option.poll_id == poll.id)
            .map(|option| option.id)
            .collect();
        let mut seen = HashSet::new();
        for option_id in &selection {
            if !known.contains(option_id) {
                return Err(BallotError::UnknownOption(*option_id));
            }
            if !seen.insert(*option_id) {
                return Err(BallotError::DuplicateSelection);
            }
        }

        Ok(Self {
            poll_id: poll.id,
            voter_id,
            option_ids: selection,
            exclusive: !poll.is_multiple_choice,
        })
    }

    pub fn poll_id(&self) -> Id {
        self.poll_id
    }

    pub fn voter_id(&self) -> Id {
        self.voter_id
    }

    /// One row per chosen option, all tagged with `submission_id`.
    pub fn into_votes(self, submission_id: Id, now: DateTime<Utc>) -> Vec<NewVote> {
        self.option_ids
            .into_iter()
            .map(|option_id| VoteCore {
                poll_id: self.poll_id,
                option_id,
                voter_id: self.voter_id,
                ballot_slot: if self.exclusive {
                    self.poll_id
                } else {
                    option_id
                },
                submission_id,
                created_at: now,
            })
            .collect()
    }
}
