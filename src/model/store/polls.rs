use log::{error, info, warn};

use crate::error::{Error, Result};
use crate::model::{
    common::poll::{aggregate, TalliedPoll},
    db::{NewPoll, NewPollOption},
    mongodb::Id,
};

use super::Store;

impl Store {
    /// Write a poll and then its options.
    ///
    /// The two writes are not atomic, so if the options cannot be written the
    /// poll record is deleted again rather than left behind without options.
    pub async fn create_poll(&self, poll: NewPoll, option_texts: Vec<String>) -> Result<TalliedPoll> {
        let poll = self.insert_poll(poll).await?;

        let new_options = option_texts
            .into_iter()
            .enumerate()
            .map(|(position, text)| NewPollOption {
                poll_id: poll.id,
                text,
                position: position as u32,
            })
            .collect();

        match self.insert_options(new_options).await {
            Ok(options) => {
                info!("Created poll {} with {} options", poll.id, options.len());
                Ok(aggregate(vec![poll], options, &[]).remove(0))
            }
            Err(err) => {
                warn!("Writing options of poll {} failed, removing the poll", poll.id);
                if let Err(cleanup) = self.delete_poll(poll.id).await {
                    error!("Could not remove orphaned poll {}: {cleanup}", poll.id);
                }
                Err(err)
            }
        }
    }

    /// Every poll joined with its options and vote counts, newest first.
    pub async fn tallied_polls(&self) -> Result<Vec<TalliedPoll>> {
        let polls = self.select_polls().await?;
        let poll_ids: Vec<Id> = polls.iter().map(|poll| poll.id).collect();
        let options = self.select_options(&poll_ids).await?;
        let votes = self.select_votes(&poll_ids).await?;
        Ok(aggregate(polls, options, &votes))
    }

    /// A single poll joined with its options and vote counts.
    pub async fn tallied_poll(&self, poll_id: Id) -> Result<TalliedPoll> {
        let poll = self
            .select_poll(poll_id)
            .await?
            .ok_or_else(|| Error::not_found(format!("Poll with ID '{poll_id}'")))?;
        let options = self.select_options(&[poll_id]).await?;
        let votes = self.select_votes(&[poll_id]).await?;
        Ok(aggregate(vec![poll], options, &votes).remove(0))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::model::{db::PollCore, memory::MemoryBackend, store::Store};

    #[rocket::async_test]
    async fn create_then_read_back() {
        let store = Store::in_memory();
        let now = Utc::now();
        let created = store
            .create_poll(
                PollCore::example(Id::new(), now),
                vec!["Italian".into(), "Sushi".into(), "Mexican".into()],
            )
            .await
            .unwrap();
        assert_eq!(3, created.options.len());

        let fetched = store.tallied_poll(created.poll.id).await.unwrap();
        assert_eq!(created, fetched);
        let texts: Vec<_> = fetched.options.iter().map(|o| o.option.text.clone()).collect();
        assert_eq!(vec!["Italian", "Sushi", "Mexican"], texts);

        assert_eq!(1, store.tallied_polls().await.unwrap().len());
    }

    #[rocket::async_test]
    async fn failed_options_write_removes_the_poll() {
        let backend = MemoryBackend::new();
        backend.fail_option_writes(true);
        let store = Store::new(backend);

        let result = store
            .create_poll(
                PollCore::example(Id::new(), Utc::now()),
                vec!["Yes".into(), "No".into()],
            )
            .await;
        assert!(result.is_err());
        assert!(store.select_polls().await.unwrap().is_empty());
    }

    #[rocket::async_test]
    async fn unknown_poll_is_not_found() {
        let store = Store::in_memory();
        let err = store.tallied_poll(Id::new()).await.unwrap_err();
        assert_eq!(rocket::http::Status::NotFound, err.status());
    }
}
