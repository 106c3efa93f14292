use std::ops::Deref;

use log::debug;
use mongodb::{
    bson::doc, error::Error as DbError, options::IndexOptions, Collection, Database, IndexModel,
};

use crate::model::db::{Poll, PollOption, Profile, User, Vote};

/// A type that can be directly inserted/read to/from the database.
pub trait MongoCollection {
    /// The name of the collection.
    const NAME: &'static str;
}

/// A database collection of the given type.
pub struct Coll<T>(Collection<T>);

impl<T> Coll<T>
where
    T: MongoCollection,
{
    /// Get a handle on this collection in the given database.
    pub fn from_db(db: &Database) -> Self {
        Self(db.collection(T::NAME))
    }
}

// `Derive(Clone)` would only derive if `T: Clone`, but we don't need that bound.
impl<T> Clone for Coll<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> Deref for Coll<T> {
    type Target = Collection<T>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl MongoCollection for Poll {
    const NAME: &'static str = "polls";
}

impl MongoCollection for PollOption {
    const NAME: &'static str = "poll_options";
}

impl MongoCollection for Vote {
    const NAME: &'static str = "votes";
}

impl MongoCollection for User {
    const NAME: &'static str = "users";
}

impl MongoCollection for Profile {
    const NAME: &'static str = "profiles";
}

/// Ensure that all the required indexes exist on the given database.
///
/// This operation is idempotent.
pub async fn ensure_indexes_exist(db: &Database) -> Result<(), DbError> {
    debug!("Ensuring collection indexes exist");

    let unique = IndexOptions::builder().unique(true).build();

    // One vote per voter per ballot slot.
    let vote_index = IndexModel::builder()
        .keys(doc! {"voter_id": 1, "ballot_slot": 1})
        .options(unique.clone())
        .build();
    Coll::<Vote>::from_db(db)
        .create_index(vote_index, None)
        .await?;

    // Vote lookups by poll.
    let vote_poll_index = IndexModel::builder()
        .keys(doc! {"poll_id": 1, "voter_id": 1})
        .build();
    Coll::<Vote>::from_db(db)
        .create_index(vote_poll_index, None)
        .await?;

    // Option lookups by poll.
    let option_index = IndexModel::builder()
        .keys(doc! {"poll_id": 1, "position": 1})
        .build();
    Coll::<PollOption>::from_db(db)
        .create_index(option_index, None)
        .await?;

    // User collection.
    let user_index = IndexModel::builder()
        .keys(doc! {"email": 1})
        .options(unique)
        .build();
    Coll::<User>::from_db(db)
        .create_index(user_index, None)
        .await?;

    Ok(())
}
