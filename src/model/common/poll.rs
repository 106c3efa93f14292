use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    db::{Poll, PollOption, Vote},
    mongodb::Id,
};

/// Whether a poll still accepts votes. Never stored: always derived from
/// the end date and the current time.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PollStatus {
    Active,
    Completed,
}

impl PollStatus {
    /// Active iff the end date is strictly after `now`.
    pub fn at(end_date: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        if end_date > now {
            Self::Active
        } else {
            Self::Completed
        }
    }
}

/// An option together with its number of votes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TalliedOption {
    pub option: PollOption,
    pub votes: u64,
}

/// A poll joined with its options and their vote counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TalliedPoll {
    pub poll: Poll,
    pub options: Vec<TalliedOption>,
}

impl TalliedPoll {
    pub fn total_votes(&self) -> u64 {
        self.options.iter().map(|option| option.votes).sum()
    }

    pub fn status(&self, now: DateTime<Utc>) -> PollStatus {
        PollStatus::at(self.poll.end_date, now)
    }

    /// Share of the total for each option, in option order.
    pub fn percentages(&self) -> Vec<u8> {
        let total = self.total_votes();
        self.options
            .iter()
            .map(|option| percentage(option.votes, total))
            .collect()
    }
}

/// `count` as a percentage of `total`, rounded to the nearest integer.
/// Zero when there are no votes at all.
pub fn percentage(count: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    let share = (count as f64 / total as f64 * 100.0).round();
    share.clamp(0.0, 100.0) as u8
}

/// Join flat polls, options and votes into tallied polls.
///
/// Every option's count is the number of votes referencing its ID. Options
/// keep their stored position order; votes for unknown options are ignored.
/// Poll order is preserved.
pub fn aggregate(polls: Vec<Poll>, options: Vec<PollOption>, votes: &[Vote]) -> Vec<TalliedPoll> {
    let mut counts: HashMap<Id, u64> = HashMap::new();
    for vote in votes {
        *counts.entry(vote.option_id).or_default() += 1;
    }

    let mut by_poll: HashMap<Id, Vec<PollOption>> = HashMap::new();
    for option in options {
        by_poll.entry(option.poll_id).or_default().push(option);
    }

    polls
        .into_iter()
        .map(|poll| {
            let mut options = by_poll.remove(&poll.id).unwrap_or_default();
            options.sort_by_key(|option| option.position);
            let options = options
                .into_iter()
                .map(|option| TalliedOption {
                    votes: counts.get(&option.id).copied().unwrap_or(0),
                    option,
                })
                .collect();
            TalliedPoll { poll, options }
        })
        .collect()
}

/// The three lists shown on the dashboard.
#[derive(Debug, Default)]
pub struct DashboardSplit {
    pub active: Vec<TalliedPoll>,
    pub completed: Vec<TalliedPoll>,
    /// Polls created by the viewer, whatever their status.
    pub mine: Vec<TalliedPoll>,
}

impl DashboardSplit {
    pub fn new(polls: Vec<TalliedPoll>, viewer: Id, now: DateTime<Utc>) -> Self {
        let mut split = Self::default();
        for poll in polls {
            if poll.poll.created_by == viewer {
                split.mine.push(poll.clone());
            }
            match poll.status(now) {
                PollStatus::Active => split.active.push(poll),
                PollStatus::Completed => split.completed.push(poll),
            }
        }
        split
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn options_for(poll: &Poll, texts: &[&str]) -> Vec<PollOption> {
        texts
            .iter()
            .enumerate()
            .map(|(i, text)| PollOption::example(poll.id, i as u32, text))
            .collect()
    }

    fn votes_for(poll: &Poll, option: &PollOption, n: usize) -> Vec<Vote> {
        (0..n).map(|_| Vote::example(poll.id, option.id)).collect()
    }

    #[test]
    fn counts_match_votes_per_option() {
        let now = Utc::now();
        let poll = Poll::example(now);
        let options = options_for(&poll, &["A", "B", "C"]);
        let mut votes = votes_for(&poll, &options[1], 3);
        votes.extend(votes_for(&poll, &options[2], 1));

        let tallied = aggregate(vec![poll.clone()], options.clone(), &votes);
        assert_eq!(1, tallied.len());
        let counts: Vec<_> = tallied[0].options.iter().map(|o| o.votes).collect();
        assert_eq!(vec![0, 3, 1], counts);
        assert_eq!(4, tallied[0].total_votes());
        assert_eq!(vec![0, 75, 25], tallied[0].percentages());
    }

    #[test]
    fn poll_without_votes_counts_zero() {
        let now = Utc::now();
        let poll = Poll::example(now);
        let options = options_for(&poll, &["Yes", "No"]);

        let tallied = aggregate(vec![poll], options, &[]);
        assert!(tallied[0].options.iter().all(|o| o.votes == 0));
        assert_eq!(vec![0, 0], tallied[0].percentages());
    }

    #[test]
    fn options_are_grouped_by_poll_and_ordered() {
        let now = Utc::now();
        let first = Poll::example(now);
        let second = Poll::example(now);
        let mut options = options_for(&first, &["a1", "a2"]);
        options.extend(options_for(&second, &["b1", "b2", "b3"]));
        options.reverse();
        let votes = votes_for(&second, &options[0], 2);

        let tallied = aggregate(vec![first.clone(), second.clone()], options, &votes);
        assert_eq!(first.id, tallied[0].poll.id);
        assert_eq!(second.id, tallied[1].poll.id);

        let texts: Vec<_> = tallied[1]
            .options
            .iter()
            .map(|o| o.option.text.as_str())
            .collect();
        assert_eq!(vec!["b1", "b2", "b3"], texts);
        assert_eq!(2, tallied[1].options[2].votes);
        assert_eq!(0, tallied[0].total_votes());
    }

    #[test]
    fn percentages_round_to_nearest() {
        assert_eq!(33, percentage(1, 3));
        assert_eq!(67, percentage(2, 3));
        assert_eq!(50, percentage(1, 2));
        assert_eq!(13, percentage(1, 8)); // 12.5 rounds up
        assert_eq!(100, percentage(5, 5));
        assert_eq!(0, percentage(0, 0));
    }

    #[test]
    fn status_flips_at_end_date() {
        let end = Utc::now();
        assert_eq!(
            PollStatus::Active,
            PollStatus::at(end, end - Duration::nanoseconds(1))
        );
        assert_eq!(PollStatus::Completed, PollStatus::at(end, end));
        assert_eq!(
            PollStatus::Completed,
            PollStatus::at(end, end + Duration::seconds(1))
        );
    }

    #[test]
    fn dashboard_split() {
        let now = Utc::now();
        let viewer = Id::new();

        let mut mine_active = Poll::example(now);
        mine_active.poll.created_by = viewer;
        let mut theirs_completed = Poll::example(now);
        theirs_completed.poll.end_date = now - Duration::hours(1);
        let theirs_active = Poll::example(now);

        let tallied = aggregate(
            vec![
                mine_active.clone(),
                theirs_completed.clone(),
                theirs_active.clone(),
            ],
            vec![],
            &[],
        );
        let split = DashboardSplit::new(tallied, viewer, now);

        let ids = |polls: &[TalliedPoll]| polls.iter().map(|p| p.poll.id).collect::<Vec<_>>();
        assert_eq!(vec![mine_active.id, theirs_active.id], ids(&split.active));
        assert_eq!(vec![theirs_completed.id], ids(&split.completed));
        assert_eq!(vec![mine_active.id], ids(&split.mine));
    }
}
