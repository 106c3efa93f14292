//! An in-process backend, used for local development and tests.
//!
//! It keeps the same uniqueness rules as the MongoDB indexes, and writes
//! each batch all-or-nothing.

use std::collections::HashSet;
#[cfg(test)]
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use rocket::tokio::sync::Mutex;

use crate::error::{Error, Result};
use crate::model::{
    db::{NewPoll, NewPollOption, NewUser, NewVote, Poll, PollOption, Profile, User, Vote},
    mongodb::Id,
    store::Backend,
};

#[derive(Default)]
struct Tables {
    polls: Vec<Poll>,
    options: Vec<PollOption>,
    votes: Vec<Vote>,
    users: Vec<User>,
    profiles: Vec<Profile>,
}

/// Injected write failures.
#[cfg(test)]
#[derive(Default)]
struct Faults {
    option_writes: AtomicBool,
    profile_writes: AtomicBool,
    /// Zero means vote batches are written in full.
    vote_rows_before_failure: AtomicUsize,
}

#[derive(Default)]
pub struct MemoryBackend {
    tables: Mutex<Tables>,
    #[cfg(test)]
    faults: Faults,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent options write fail.
    #[cfg(test)]
    pub fn fail_option_writes(&self, fail: bool) {
        self.faults.option_writes.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent profile write fail.
    #[cfg(test)]
    pub fn fail_profile_writes(&self, fail: bool) {
        self.faults.profile_writes.store(fail, Ordering::SeqCst);
    }

    /// Write only the first `rows` of each later vote batch, then fail.
    #[cfg(test)]
    pub fn fail_votes_after(&self, rows: usize) {
        self.faults
            .vote_rows_before_failure
            .store(rows, Ordering::SeqCst);
    }

    #[cfg(test)]
    fn check_option_writes(&self) -> Result<()> {
        check_fault(&self.faults.option_writes, "Option")
    }

    #[cfg(not(test))]
    fn check_option_writes(&self) -> Result<()> {
        Ok(())
    }

    #[cfg(test)]
    fn check_profile_writes(&self) -> Result<()> {
        check_fault(&self.faults.profile_writes, "Profile")
    }

    #[cfg(not(test))]
    fn check_profile_writes(&self) -> Result<()> {
        Ok(())
    }

    #[cfg(test)]
    fn vote_rows_before_failure(&self) -> Option<usize> {
        match self.faults.vote_rows_before_failure.load(Ordering::SeqCst) {
            0 => None,
            rows => Some(rows),
        }
    }

    #[cfg(not(test))]
    fn vote_rows_before_failure(&self) -> Option<usize> {
        None
    }
}

#[cfg(test)]
fn check_fault(flag: &AtomicBool, what: &str) -> Result<()> {
    if flag.load(Ordering::SeqCst) {
        return Err(unavailable(what));
    }
    Ok(())
}

fn unavailable(what: &str) -> Error {
    Error::Status(
        rocket::http::Status::ServiceUnavailable,
        format!("{what} writes disabled"),
    )
}

#[rocket::async_trait]
impl Backend for MemoryBackend {
    async fn insert_poll(&self, poll: NewPoll) -> Result<Poll> {
        let poll = Poll {
            id: Id::new(),
            poll,
        };
        self.tables.lock().await.polls.push(poll.clone());
        Ok(poll)
    }

    async fn delete_poll(&self, poll_id: Id) -> Result<()> {
        self.tables.lock().await.polls.retain(|poll| poll.id != poll_id);
        Ok(())
    }

    async fn select_polls(&self) -> Result<Vec<Poll>> {
        let mut polls = self.tables.lock().await.polls.clone();
        polls.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(polls)
    }

    async fn select_poll(&self, poll_id: Id) -> Result<Option<Poll>> {
        let tables = self.tables.lock().await;
        Ok(tables.polls.iter().find(|poll| poll.id == poll_id).cloned())
    }

    async fn insert_options(&self, options: Vec<NewPollOption>) -> Result<Vec<PollOption>> {
        self.check_option_writes()?;

        let options: Vec<_> = options
            .into_iter()
            .map(|option| PollOption {
                id: Id::new(),
                option,
            })
            .collect();
        self.tables.lock().await.options.extend(options.iter().cloned());
        Ok(options)
    }

    async fn select_options(&self, poll_ids: &[Id]) -> Result<Vec<PollOption>> {
        let tables = self.tables.lock().await;
        let mut options: Vec<_> = tables
            .options
            .iter()
            .filter(|option| poll_ids.contains(&option.poll_id))
            .cloned()
            .collect();
        options.sort_by_key(|option| option.position);
        Ok(options)
    }

    async fn insert_votes(&self, votes: Vec<NewVote>) -> Result<()> {
        let mut tables = self.tables.lock().await;

        let mut taken: HashSet<(Id, Id)> = tables
            .votes
            .iter()
            .map(|vote| (vote.voter_id, vote.ballot_slot))
            .collect();
        for vote in &votes {
            if !taken.insert((vote.voter_id, vote.ballot_slot)) {
                return Err(Error::UniqueViolation(format!(
                    "vote of {} in slot {}",
                    vote.voter_id, vote.ballot_slot
                )));
            }
        }

        let rows: Vec<_> = votes
            .into_iter()
            .map(|vote| Vote { id: Id::new(), vote })
            .collect();
        match self.vote_rows_before_failure() {
            Some(limit) if limit < rows.len() => {
                tables.votes.extend(rows.into_iter().take(limit));
                Err(unavailable("Vote"))
            }
            _ => {
                tables.votes.extend(rows);
                Ok(())
            }
        }
    }

    async fn delete_submission(&self, submission_id: Id) -> Result<()> {
        self.tables
            .lock()
            .await
            .votes
            .retain(|vote| vote.submission_id != submission_id);
        Ok(())
    }

    async fn select_votes(&self, poll_ids: &[Id]) -> Result<Vec<Vote>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .votes
            .iter()
            .filter(|vote| poll_ids.contains(&vote.poll_id))
            .cloned()
            .collect())
    }

    async fn has_voted(&self, poll_id: Id, voter_id: Id) -> Result<bool> {
        let tables = self.tables.lock().await;
        Ok(tables
            .votes
            .iter()
            .any(|vote| vote.poll_id == poll_id && vote.voter_id == voter_id))
    }

    async fn check_poll_password(&self, poll_id: Id, prehashed: &str) -> Result<bool> {
        match self.select_poll(poll_id).await? {
            Some(poll) => poll.verify_password(prehashed),
            None => Ok(false),
        }
    }

    async fn insert_user(&self, user: NewUser) -> Result<User> {
        let mut tables = self.tables.lock().await;
        if tables.users.iter().any(|existing| existing.email == user.email) {
            return Err(Error::UniqueViolation(format!("email {}", user.email)));
        }
        let user = User {
            id: Id::new(),
            user,
        };
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn select_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let tables = self.tables.lock().await;
        Ok(tables.users.iter().find(|user| user.email == email).cloned())
    }

    async fn select_profile(&self, profile_id: Id) -> Result<Option<Profile>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .profiles
            .iter()
            .find(|profile| profile.id == profile_id)
            .cloned())
    }

    async fn save_profile(&self, profile: Profile) -> Result<()> {
        self.check_profile_writes()?;

        let mut tables = self.tables.lock().await;
        match tables.profiles.iter_mut().find(|p| p.id == profile.id) {
            Some(existing) => *existing = profile,
            None => tables.profiles.push(profile),
        }
        Ok(())
    }
}
