use crate::db::models::{NewPoll, Poll, PollOption, PollOptionRow, PollRow, User, Vote};
use crate::db::store::{PollStore, UserStore};
use crate::error::PollError;
use crate::views::{DashboardStats, PollResults};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePollData {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub options: Vec<String>,
}

/// Counts votes per option id.
pub fn tally_votes(votes: &[Vote]) -> HashMap<Uuid, i64> {
    let mut counts = HashMap::new();
    for vote in votes {
        *counts.entry(vote.option_id).or_insert(0) += 1;
    }
    counts
}

/// Poll reads and writes built from store calls.
#[derive(Clone)]
pub struct PollService {
    store: Arc<dyn PollStore>,
    users: Arc<dyn UserStore>,
}

impl PollService {
    pub fn new(store: Arc<dyn PollStore>, users: Arc<dyn UserStore>) -> Self {
        PollService { store, users }
    }

    pub async fn create_poll(&self, data: &CreatePollData, author_id: Uuid) -> Result<Poll, PollError> {
        let new_poll = NewPoll {
            title: data.title.clone(),
            description: data.description.clone(),
            author_id,
        };
        let (row, options) = self.store.create_poll(&new_poll, &data.options).await?;
        let author = self.users.get_profiles(&[author_id]).await?.into_iter().next();

        Ok(build_poll(row, options, author, &HashMap::new()))
    }

    /// Active polls, newest first. Vote counts are not loaded here.
    pub async fn get_polls(&self) -> Result<Vec<Poll>, PollError> {
        let rows = self.store.list_active_polls().await?;
        self.assemble(rows, false).await
    }

    /// One active poll with vote counts.
    pub async fn get_poll_by_id(&self, poll_id: Uuid) -> Result<Option<Poll>, PollError> {
        match self.load_poll(poll_id).await? {
            Some(poll) if poll.is_active => Ok(Some(poll)),
            _ => Ok(None),
        }
    }

    /// Any poll, active or not, with vote counts.
    pub(crate) async fn load_poll(&self, poll_id: Uuid) -> Result<Option<Poll>, PollError> {
        let Some(row) = self.store.get_poll(poll_id).await? else {
            return Ok(None);
        };
        Ok(self.assemble(vec![row], true).await?.pop())
    }

    /// Every poll by `user_id`. Vote counts are not loaded here.
    pub async fn get_user_polls(&self, user_id: Uuid) -> Result<Vec<Poll>, PollError> {
        let rows = self.store.list_polls_by_author(user_id).await?;
        self.assemble(rows, false).await
    }

    /// Records the user's choice, replacing any earlier vote on the same poll.
    pub async fn vote(&self, poll_id: Uuid, option_id: Uuid, user_id: Uuid) -> Result<Vote, PollError> {
        match self.store.find_vote(poll_id, user_id).await? {
            Some(existing) => {
                self.store.update_vote_option(existing.id, option_id).await?;
                Ok(Vote { option_id, ..existing })
            }
            None => Ok(self.store.insert_vote(poll_id, option_id, user_id).await?),
        }
    }

    pub async fn get_poll_results(&self, poll_id: Uuid) -> Result<Option<PollResults>, PollError> {
        Ok(self
            .get_poll_by_id(poll_id)
            .await?
            .map(|poll| PollResults::from_poll(&poll)))
    }

    pub async fn get_dashboard_stats(&self, user_id: Uuid) -> Result<DashboardStats, PollError> {
        let polls = self.get_user_polls(user_id).await?;
        let ids: Vec<Uuid> = polls.iter().map(|p| p.id).collect();
        let total_votes = if ids.is_empty() {
            0
        } else {
            self.store.get_votes(&ids).await?.len() as i64
        };

        Ok(DashboardStats::from_polls(&polls, total_votes, Utc::now()))
    }

    async fn assemble(&self, rows: Vec<PollRow>, with_votes: bool) -> Result<Vec<Poll>, PollError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let poll_ids: Vec<Uuid> = rows.iter().map(|p| p.id).collect();

        let mut options_by_poll: HashMap<Uuid, Vec<PollOptionRow>> = HashMap::new();
        for option in self.store.get_options(&poll_ids).await? {
            options_by_poll.entry(option.poll_id).or_default().push(option);
        }

        let mut author_ids: Vec<Uuid> = rows.iter().map(|p| p.author_id).collect();
        author_ids.sort();
        author_ids.dedup();
        let authors: HashMap<Uuid, User> = self
            .users
            .get_profiles(&author_ids)
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();

        let counts = if with_votes {
            tally_votes(&self.store.get_votes(&poll_ids).await?)
        } else {
            HashMap::new()
        };

        Ok(rows
            .into_iter()
            .map(|row| {
                let options = options_by_poll.remove(&row.id).unwrap_or_default();
                let author = authors.get(&row.author_id).cloned();
                build_poll(row, options, author, &counts)
            })
            .collect())
    }
}

fn build_poll(
    row: PollRow,
    mut options: Vec<PollOptionRow>,
    author: Option<User>,
    counts: &HashMap<Uuid, i64>,
) -> Poll {
    options.sort_by_key(|o| o.position);

    let options: Vec<PollOption> = options
        .into_iter()
        .map(|o| PollOption {
            votes: counts.get(&o.id).copied().unwrap_or(0),
            id: o.id,
            text: o.text,
            poll_id: o.poll_id,
        })
        .collect();
    let total_votes = options.iter().map(|o| o.votes).sum();

    Poll {
        id: row.id,
        title: row.title,
        description: row.description,
        options,
        total_votes,
        is_active: row.is_active,
        created_at: row.created_at,
        updated_at: row.updated_at,
        author_id: row.author_id,
        author,
    }
}
