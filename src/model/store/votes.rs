use chrono::{DateTime, Utc};
use log::{error, info};

use crate::error::{Error, Result};
use crate::model::{common::ballot::Ballot, mongodb::Id};

use super::Store;

impl Store {
    /// Record a checked ballot.
    ///
    /// A voter who already has votes on the poll, or whose rows collide with
    /// the backend's uniqueness rule, gets [`Error::AlreadyVoted`]. If any row
    /// of the submission fails, every row it wrote is removed again.
    pub async fn submit_ballot(&self, ballot: Ballot, now: DateTime<Utc>) -> Result<()> {
        let poll_id = ballot.poll_id();
        let voter_id = ballot.voter_id();

        if self.has_voted(poll_id, voter_id).await? {
            return Err(Error::AlreadyVoted);
        }

        let submission_id = Id::new();
        let votes = ballot.into_votes(submission_id, now);
        match self.insert_votes(votes).await {
            Ok(()) => {
                info!("Recorded ballot {submission_id} on poll {poll_id}");
                Ok(())
            }
            Err(err) => {
                if let Err(cleanup) = self.delete_submission(submission_id).await {
                    error!("Could not remove partial ballot {submission_id}: {cleanup}");
                }
                match err {
                    Error::UniqueViolation(_) => Err(Error::AlreadyVoted),
                    other => Err(other),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        db::{Poll, PollCore, PollOption},
        memory::MemoryBackend,
        store::Store,
    };

    async fn setup(store: &Store, multiple: bool) -> (Poll, Vec<PollOption>) {
        let mut poll = PollCore::example(Id::new(), Utc::now());
        poll.is_multiple_choice = multiple;
        let tallied = store
            .create_poll(poll, vec!["A".into(), "B".into(), "C".into()])
            .await
            .unwrap();
        let options = tallied.options.into_iter().map(|o| o.option).collect();
        (tallied.poll, options)
    }

    #[rocket::async_test]
    async fn second_single_choice_submission_is_already_voted() {
        let store = Store::in_memory();
        let (poll, options) = setup(&store, false).await;
        let voter = Id::new();
        let now = Utc::now();

        let ballot = Ballot::check(&poll, &options, voter, vec![options[0].id], true, now).unwrap();
        store.submit_ballot(ballot, now).await.unwrap();

        let again = Ballot::check(&poll, &options, voter, vec![options[1].id], true, now).unwrap();
        let err = store.submit_ballot(again, now).await.unwrap_err();
        assert!(matches!(err, Error::AlreadyVoted));

        let votes = store.select_votes(&[poll.id]).await.unwrap();
        assert_eq!(1, votes.len());
        assert_eq!(options[0].id, votes[0].option_id);
    }

    #[rocket::async_test]
    async fn multiple_choice_writes_one_row_per_option() {
        let store = Store::in_memory();
        let (poll, options) = setup(&store, true).await;
        let voter = Id::new();
        let now = Utc::now();

        let ballot = Ballot::check(
            &poll,
            &options,
            voter,
            vec![options[0].id, options[2].id],
            true,
            now,
        )
        .unwrap();
        store.submit_ballot(ballot, now).await.unwrap();
        assert!(store.has_voted(poll.id, voter).await.unwrap());

        let tallied = store.tallied_poll(poll.id).await.unwrap();
        let counts: Vec<_> = tallied.options.iter().map(|o| o.votes).collect();
        assert_eq!(vec![1, 0, 1], counts);

        let again = Ballot::check(&poll, &options, voter, vec![options[1].id], true, now).unwrap();
        assert!(matches!(
            store.submit_ballot(again, now).await,
            Err(Error::AlreadyVoted)
        ));
    }

    #[rocket::async_test]
    async fn failed_ballot_write_removes_its_rows() {
        let backend = MemoryBackend::new();
        backend.fail_votes_after(1);
        let store = Store::new(backend);
        let (poll, options) = setup(&store, true).await;
        let voter = Id::new();
        let now = Utc::now();

        let ballot = Ballot::check(
            &poll,
            &options,
            voter,
            vec![options[0].id, options[1].id],
            true,
            now,
        )
        .unwrap();
        let err = store.submit_ballot(ballot, now).await.unwrap_err();
        assert_eq!(rocket::http::Status::ServiceUnavailable, err.status());

        assert!(store.select_votes(&[poll.id]).await.unwrap().is_empty());
        assert!(!store.has_voted(poll.id, voter).await.unwrap());
    }

    #[rocket::async_test]
    async fn colliding_rows_are_not_partially_written() {
        let store = Store::in_memory();
        let (poll, options) = setup(&store, true).await;
        let voter = Id::new();
        let now = Utc::now();

        // Bypass the has-voted check to simulate a concurrent submission that
        // already wrote option C.
        let racing = Ballot::check(&poll, &options, voter, vec![options[2].id], true, now)
            .unwrap()
            .into_votes(Id::new(), now);
        store.insert_votes(racing).await.unwrap();

        let ballot = Ballot::check(
            &poll,
            &options,
            voter,
            vec![options[0].id, options[2].id],
            true,
            now,
        )
        .unwrap();
        let submission_id = Id::new();
        let rows = ballot.into_votes(submission_id, now);
        let err = store.insert_votes(rows).await.unwrap_err();
        assert!(matches!(err, Error::UniqueViolation(_)));

        let votes = store.select_votes(&[poll.id]).await.unwrap();
        assert_eq!(1, votes.len());
    }
}
