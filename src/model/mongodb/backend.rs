use mongodb::{
    bson::{doc, Bson, Document},
    options::{FindOptions, ReplaceOptions},
    Database,
};
use rocket::futures::TryStreamExt;

use crate::error::Result;
use crate::model::{
    db::{NewPoll, NewPollOption, NewUser, NewVote, Poll, PollOption, Profile, User, Vote},
    store::Backend,
};

use super::{errors::classify_write_error, Coll, Id};

/// A backend over a MongoDB database.
///
/// IDs are generated here rather than by the server, so inserted records can
/// be returned without another round trip.
#[derive(Clone)]
pub struct MongoBackend {
    polls: Coll<Poll>,
    options: Coll<PollOption>,
    votes: Coll<Vote>,
    users: Coll<User>,
    profiles: Coll<Profile>,
}

impl MongoBackend {
    pub fn new(db: &Database) -> Self {
        Self {
            polls: Coll::from_db(db),
            options: Coll::from_db(db),
            votes: Coll::from_db(db),
            users: Coll::from_db(db),
            profiles: Coll::from_db(db),
        }
    }
}

/// Match documents whose `field` is any of the given IDs.
fn any_of(field: &str, ids: &[Id]) -> Document {
    let ids: Vec<Bson> = ids.iter().copied().map(Bson::from).collect();
    let mut filter = Document::new();
    filter.insert(field, doc! { "$in": ids });
    filter
}

#[rocket::async_trait]
impl Backend for MongoBackend {
    async fn insert_poll(&self, poll: NewPoll) -> Result<Poll> {
        let poll = Poll {
            id: Id::new(),
            poll,
        };
        self.polls.insert_one(&poll, None).await?;
        Ok(poll)
    }

    async fn delete_poll(&self, poll_id: Id) -> Result<()> {
        self.polls.delete_one(poll_id.as_doc(), None).await?;
        Ok(())
    }

    async fn select_polls(&self) -> Result<Vec<Poll>> {
        let newest_first = FindOptions::builder()
            .sort(doc! { "created_at": -1 })
            .build();
        let polls = self.polls.find(None, newest_first).await?.try_collect().await?;
        Ok(polls)
    }

    async fn select_poll(&self, poll_id: Id) -> Result<Option<Poll>> {
        Ok(self.polls.find_one(poll_id.as_doc(), None).await?)
    }

    async fn insert_options(&self, options: Vec<NewPollOption>) -> Result<Vec<PollOption>> {
        let options: Vec<_> = options
            .into_iter()
            .map(|option| PollOption {
                id: Id::new(),
                option,
            })
            .collect();
        if !options.is_empty() {
            self.options
                .insert_many(&options, None)
                .await
                .map_err(|e| classify_write_error(e, "poll option"))?;
        }
        Ok(options)
    }

    async fn select_options(&self, poll_ids: &[Id]) -> Result<Vec<PollOption>> {
        let by_position = FindOptions::builder().sort(doc! { "position": 1 }).build();
        let options = self
            .options
            .find(any_of("poll_id", poll_ids), by_position)
            .await?
            .try_collect()
            .await?;
        Ok(options)
    }

    async fn insert_votes(&self, votes: Vec<NewVote>) -> Result<()> {
        let votes: Vec<_> = votes
            .into_iter()
            .map(|vote| Vote { id: Id::new(), vote })
            .collect();
        if votes.is_empty() {
            return Ok(());
        }
        self.votes
            .insert_many(&votes, None)
            .await
            .map_err(|e| classify_write_error(e, "vote"))?;
        Ok(())
    }

    async fn delete_submission(&self, submission_id: Id) -> Result<()> {
        self.votes
            .delete_many(doc! { "submission_id": submission_id }, None)
            .await?;
        Ok(())
    }

    async fn select_votes(&self, poll_ids: &[Id]) -> Result<Vec<Vote>> {
        let votes = self
            .votes
            .find(any_of("poll_id", poll_ids), None)
            .await?
            .try_collect()
            .await?;
        Ok(votes)
    }

    async fn has_voted(&self, poll_id: Id, voter_id: Id) -> Result<bool> {
        let filter = doc! {
            "poll_id": poll_id,
            "voter_id": voter_id,
        };
        Ok(self.votes.find_one(filter, None).await?.is_some())
    }

    async fn check_poll_password(&self, poll_id: Id, prehashed: &str) -> Result<bool> {
        match self.select_poll(poll_id).await? {
            Some(poll) => poll.verify_password(prehashed),
            None => Ok(false),
        }
    }

    async fn insert_user(&self, user: NewUser) -> Result<User> {
        let user = User {
            id: Id::new(),
            user,
        };
        self.users
            .insert_one(&user, None)
            .await
            .map_err(|e| classify_write_error(e, &format!("email {}", user.email)))?;
        Ok(user)
    }

    async fn select_user_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self.users.find_one(doc! { "email": email }, None).await?)
    }

    async fn select_profile(&self, profile_id: Id) -> Result<Option<Profile>> {
        Ok(self.profiles.find_one(profile_id.as_doc(), None).await?)
    }

    async fn save_profile(&self, profile: Profile) -> Result<()> {
        let upsert = ReplaceOptions::builder().upsert(true).build();
        self.profiles
            .replace_one(profile.id.as_doc(), &profile, upsert)
            .await?;
        Ok(())
    }
}
