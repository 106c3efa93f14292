//! The storage boundary: a narrow table-query / remote-procedure interface,
//! plus the multi-step operations built on top of it.

use std::ops::Deref;
use std::sync::Arc;

use rocket::{
    request::{self, FromRequest, Request},
    State,
};

use crate::error::Result;
use crate::model::{
    db::{NewPoll, NewPollOption, NewUser, NewVote, Poll, PollOption, Profile, User, Vote},
    memory::MemoryBackend,
    mongodb::Id,
};

mod polls;
mod votes;

/// Table and procedure operations offered by a storage backend.
///
/// Writes that would break a uniqueness rule (one vote per ballot slot per
/// voter, one account per email) fail with
/// [`Error::UniqueViolation`](crate::error::Error::UniqueViolation).
#[rocket::async_trait]
pub trait Backend: Send + Sync {
    async fn insert_poll(&self, poll: NewPoll) -> Result<Poll>;

    async fn delete_poll(&self, poll_id: Id) -> Result<()>;

    /// Every poll, newest first.
    async fn select_polls(&self) -> Result<Vec<Poll>>;

    async fn select_poll(&self, poll_id: Id) -> Result<Option<Poll>>;

    async fn insert_options(&self, options: Vec<NewPollOption>) -> Result<Vec<PollOption>>;

    async fn select_options(&self, poll_ids: &[Id]) -> Result<Vec<PollOption>>;

    async fn insert_votes(&self, votes: Vec<NewVote>) -> Result<()>;

    /// Remove every vote written by the given submission.
    async fn delete_submission(&self, submission_id: Id) -> Result<()>;

    async fn select_votes(&self, poll_ids: &[Id]) -> Result<Vec<Vote>>;

    async fn has_voted(&self, poll_id: Id, voter_id: Id) -> Result<bool>;

    /// Compare a pre-hashed password against the poll's stored hash.
    /// Unknown and public polls never match.
    async fn check_poll_password(&self, poll_id: Id, prehashed: &str) -> Result<bool>;

    async fn insert_user(&self, user: NewUser) -> Result<User>;

    async fn select_user_by_email(&self, email: &str) -> Result<Option<User>>;

    async fn select_profile(&self, profile_id: Id) -> Result<Option<Profile>>;

    /// Insert or overwrite the profile with the same ID.
    async fn save_profile(&self, profile: Profile) -> Result<()>;
}

/// A shared handle on the configured backend. This is managed state, and
/// can also be taken directly as a request guard.
#[derive(Clone)]
pub struct Store(Arc<dyn Backend>);

impl Store {
    pub fn new(backend: impl Backend + 'static) -> Self {
        Self(Arc::new(backend))
    }

    /// A store over a fresh in-process backend.
    pub fn in_memory() -> Self {
        Self::new(MemoryBackend::new())
    }
}

impl Deref for Store {
    type Target = dyn Backend;

    fn deref(&self) -> &Self::Target {
        &*self.0
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Store {
    type Error = ();

    /// Get the store from the managed state.
    ///
    /// Panics iff the [`Store`] is not managed by [`rocket::Rocket`].
    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let store = req.guard::<&State<Store>>().await.unwrap();
        request::Outcome::Success(store.inner().clone())
    }
}
