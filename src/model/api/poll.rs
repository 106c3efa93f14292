use argon2::Config;
use chrono::{DateTime, Utc};
use rand::Rng;
use rocket::FromForm;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::Result;
use crate::model::{
    api::id::ApiId,
    common::{
        access::{hash_poll_password, AccessGrants},
        filter::{parse_component, FilterError, PollFilter},
        poll::{DashboardSplit, PollStatus, TalliedPoll},
    },
    db::NewPoll,
    mongodb::Id,
};

/// Minimum number of non-empty options a poll is created with.
pub const MIN_OPTIONS: usize = 2;

/// Why a poll specification was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PollSpecError {
    #[error("Please enter a poll title")]
    MissingTitle,
    #[error("End date must be in the future")]
    EndDateNotInFuture,
    #[error("Please add at least 2 options")]
    TooFewOptions,
    #[error("Private polls require a password")]
    MissingPassword,
}

/// A poll specification, as submitted by its creator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollSpec {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_multiple_choice: bool,
    #[serde(default)]
    pub is_private: bool,
    #[serde(default)]
    pub password: Option<String>,
    pub end_date: DateTime<Utc>,
    pub options: Vec<String>,
}

impl PollSpec {
    /// Validate this spec and split it into the poll record and its option
    /// texts, in order.
    ///
    /// Text fields are trimmed and blank options are dropped before counting.
    pub fn into_new_poll(self, creator: Id, now: DateTime<Utc>) -> Result<(NewPoll, Vec<String>)> {
        let title = self.title.trim().to_string();
        if title.is_empty() {
            return Err(PollSpecError::MissingTitle.into());
        }
        if self.end_date <= now {
            return Err(PollSpecError::EndDateNotInFuture.into());
        }
        let options: Vec<String> = self
            .options
            .iter()
            .map(|text| text.trim())
            .filter(|text| !text.is_empty())
            .map(str::to_string)
            .collect();
        if options.len() < MIN_OPTIONS {
            return Err(PollSpecError::TooFewOptions.into());
        }

        let password_hash = if self.is_private {
            let password = self.password.as_deref().unwrap_or_default();
            if password.trim().is_empty() {
                return Err(PollSpecError::MissingPassword.into());
            }
            let mut salt = [0_u8; 16];
            rand::thread_rng().fill(&mut salt);
            let prehashed = hash_poll_password(password);
            Some(argon2::hash_encoded(
                prehashed.as_bytes(),
                &salt,
                &Config::default(),
            )?)
        } else {
            None
        };

        let description = self
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());

        let poll = NewPoll {
            title,
            description,
            is_multiple_choice: self.is_multiple_choice,
            is_private: self.is_private,
            password_hash,
            end_date: self.end_date,
            created_at: now,
            created_by: creator,
        };
        Ok((poll, options))
    }
}

/// An option with its results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionView {
    pub id: ApiId,
    pub text: String,
    pub votes: u64,
    pub percentage: u8,
}

/// A poll as shown to one viewer.
///
/// A locked poll (private, and not unlocked by this viewer) is listed
/// without its options or results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollView {
    pub id: ApiId,
    pub title: String,
    pub description: Option<String>,
    pub is_multiple_choice: bool,
    pub is_private: bool,
    pub end_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub created_by: ApiId,
    pub status: PollStatus,
    pub locked: bool,
    pub options: Vec<OptionView>,
    pub total_votes: Option<u64>,
}

impl PollView {
    pub fn new(tallied: TalliedPoll, permitted: bool, now: DateTime<Utc>) -> Self {
        let status = tallied.status(now);
        let (options, total_votes) = if permitted {
            let percentages = tallied.percentages();
            let total = tallied.total_votes();
            let options = tallied
                .options
                .into_iter()
                .zip(percentages)
                .map(|(tallied, percentage)| OptionView {
                    id: tallied.option.id.into(),
                    text: tallied.option.option.text,
                    votes: tallied.votes,
                    percentage,
                })
                .collect();
            (options, Some(total))
        } else {
            (Vec::new(), None)
        };

        let poll = tallied.poll;
        Self {
            id: poll.id.into(),
            title: poll.poll.title,
            description: poll.poll.description,
            is_multiple_choice: poll.poll.is_multiple_choice,
            is_private: poll.poll.is_private,
            end_date: poll.poll.end_date,
            created_at: poll.poll.created_at,
            created_by: poll.poll.created_by.into(),
            status,
            locked: !permitted,
            options,
            total_votes,
        }
    }

    /// View a poll as `viewer`, holding `grants`.
    pub fn for_viewer(
        tallied: TalliedPoll,
        viewer: Id,
        grants: &AccessGrants,
        now: DateTime<Utc>,
    ) -> Self {
        let permitted = grants.permits(&tallied.poll, viewer);
        Self::new(tallied, permitted, now)
    }
}

/// The dashboard lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardView {
    pub active: Vec<PollView>,
    pub completed: Vec<PollView>,
    pub mine: Vec<PollView>,
}

impl DashboardView {
    pub fn new(split: DashboardSplit, viewer: Id, grants: &AccessGrants, now: DateTime<Utc>) -> Self {
        let view = |polls: Vec<TalliedPoll>| {
            polls
                .into_iter()
                .map(|poll| PollView::for_viewer(poll, viewer, grants, now))
                .collect()
        };
        Self {
            active: view(split.active),
            completed: view(split.completed),
            mine: view(split.mine),
        }
    }
}

/// Query string of the poll list.
///
/// Date components are taken as text so that a malformed value is refused
/// rather than ignored.
#[derive(Debug, Default, Clone, FromForm)]
pub struct PollQuery {
    pub search: Option<String>,
    pub year: Option<String>,
    pub month: Option<String>,
    pub day: Option<String>,
    /// Inclusive lower bound on the end date, `YYYY-MM-DD`.
    pub from: Option<String>,
    /// Inclusive upper bound on the end date, `YYYY-MM-DD`.
    pub to: Option<String>,
}

impl TryFrom<PollQuery> for PollFilter {
    type Error = FilterError;

    fn try_from(query: PollQuery) -> std::result::Result<Self, Self::Error> {
        PollFilter::new(
            query.search,
            parse_component("year", query.year.as_deref())?,
            parse_component("month", query.month.as_deref())?,
            parse_component("day", query.day.as_deref())?,
            query.from.as_deref(),
            query.to.as_deref(),
        )
    }
}

/// A candidate password for a private poll.
#[derive(Clone, Serialize, Deserialize)]
pub struct UnlockRequest {
    pub password: String,
}


#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::error::Error;
    use crate::model::{
        common::poll::aggregate,
        db::{Poll, PollOption, Vote},
    };

    fn refused(spec: PollSpec) -> PollSpecError {
        match spec.into_new_poll(Id::new(), Utc::now()) {
            Err(Error::InvalidPoll(e)) => e,
            Err(e) => panic!("unexpected error {e:?}"),
            Ok(_) => panic!("poll was accepted"),
        }
    }

    #[test]
    fn valid_spec_is_trimmed() {
        let creator = Id::new();
        let now = Utc::now();
        let spec = PollSpec {
            title: "  Team Lunch Location ".to_string(),
            description: Some("   ".to_string()),
            options: vec![" Italian".into(), "".into(), "Sushi ".into(), "  ".into()],
            ..PollSpec::example()
        };
        let (poll, options) = spec.into_new_poll(creator, now).unwrap();
        assert_eq!("Team Lunch Location", poll.title);
        assert_eq!(None, poll.description);
        assert_eq!(creator, poll.created_by);
        assert_eq!(now, poll.created_at);
        assert_eq!(None, poll.password_hash);
        assert_eq!(vec!["Italian", "Sushi"], options);
    }

    #[test]
    fn missing_title() {
        let spec = PollSpec {
            title: "   ".to_string(),
            ..PollSpec::example()
        };
        assert_eq!(PollSpecError::MissingTitle, refused(spec));
    }

    #[test]
    fn past_end_date() {
        let spec = PollSpec {
            end_date: Utc::now() - Duration::minutes(1),
            ..PollSpec::example()
        };
        assert_eq!(PollSpecError::EndDateNotInFuture, refused(spec));
    }

    #[test]
    fn blank_options_do_not_count() {
        let spec = PollSpec {
            options: vec!["Italian".into(), " ".into(), "".into()],
            ..PollSpec::example()
        };
        assert_eq!(PollSpecError::TooFewOptions, refused(spec));
    }

    #[test]
    fn private_poll_needs_password() {
        for password in [None, Some("".to_string()), Some("  ".to_string())] {
            let spec = PollSpec {
                password,
                ..PollSpec::private_example()
            };
            assert_eq!(PollSpecError::MissingPassword, refused(spec));
        }
    }

    #[test]
    fn private_password_is_stored_hashed() {
        let (poll, _) = PollSpec::private_example()
            .into_new_poll(Id::new(), Utc::now())
            .unwrap();
        let hash = poll.password_hash.clone().unwrap();
        assert!(!hash.contains("hunter22"));
        assert!(poll.verify_password(&hash_poll_password("hunter22")).unwrap());
        assert!(!poll.verify_password(&hash_poll_password("hunter23")).unwrap());
    }

    #[test]
    fn locked_view_hides_results() {
        let now = Utc::now();
        let poll = Poll::example(now);
        let options = vec![
            PollOption::example(poll.id, 0, "Yes"),
            PollOption::example(poll.id, 1, "No"),
        ];
        let votes = vec![Vote::example(poll.id, options[1].id)];
        let tallied = aggregate(vec![poll], options, &votes).remove(0);

        let open = PollView::new(tallied.clone(), true, now);
        assert!(!open.locked);
        assert_eq!(Some(1), open.total_votes);
        assert_eq!(vec![0, 100], open.options.iter().map(|o| o.percentage).collect::<Vec<_>>());

        let locked = PollView::new(tallied, false, now);
        assert!(locked.locked);
        assert!(locked.options.is_empty());
        assert_eq!(None, locked.total_votes);
        assert_eq!(PollStatus::Active, locked.status);
    }
}
