//! DB-compatible (e.g. de/serialisable) types.
//!
//! The types in this module are serialised in an DB-friendly way, e.g.:
//!
//! - IDs and datetimes are serialised in MongoDB's own format.

pub mod poll;
pub use poll::{NewPoll, NewPollOption, Poll, PollCore, PollOption, PollOptionCore};

pub mod profile;
pub use profile::Profile;

pub mod user;
pub use user::{NewUser, User, UserCore};

pub mod vote;
pub use vote::{NewVote, Vote, VoteCore};
