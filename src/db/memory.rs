use crate::db::models::{NewPoll, NewUser, PollChanges, PollOptionRow, PollRow, User, UserRecord, Vote};
use crate::db::store::{PollStore, UserStore};
use crate::error::{StoreError, StoreResult};
use crate::reconcile::OptionChanges;
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Default)]
struct Tables {
    users: Vec<UserRecord>,
    polls: Vec<PollRow>,
    options: Vec<PollOptionRow>,
    votes: Vec<Vote>,
}

impl Tables {
    fn poll_mut(&mut self, poll_id: Uuid) -> Option<&mut PollRow> {
        self.polls.iter_mut().find(|p| p.id == poll_id)
    }

    fn next_position(&self, poll_id: Uuid) -> i32 {
        self.options
            .iter()
            .filter(|o| o.poll_id == poll_id)
            .map(|o| o.position + 1)
            .max()
            .unwrap_or(0)
    }

    fn push_options(&mut self, poll_id: Uuid, texts: &[String]) -> Vec<PollOptionRow> {
        let first = self.next_position(poll_id);
        let rows: Vec<PollOptionRow> = texts
            .iter()
            .enumerate()
            .map(|(i, text)| PollOptionRow {
                id: Uuid::new_v4(),
                poll_id,
                text: text.clone(),
                position: first + i as i32,
            })
            .collect();
        self.options.extend(rows.iter().cloned());
        rows
    }

    /// Mirrors `ON DELETE CASCADE` from `poll_options` to `votes`.
    fn delete_options(&mut self, poll_id: Uuid, option_ids: &[Uuid]) {
        self.options
            .retain(|o| !(o.poll_id == poll_id && option_ids.contains(&o.id)));
        self.votes.retain(|v| !option_ids.contains(&v.option_id));
    }
}

fn newest_first(mut rows: Vec<PollRow>) -> Vec<PollRow> {
    // Reversed before the stable sort so equal timestamps keep newest-inserted first.
    rows.reverse();
    rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    rows
}

/// Process-local store with the same constraints as the PostgreSQL schema:
/// unique emails, one vote per (poll, user), foreign keys and cascades.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PollStore for InMemoryStore {
    async fn create_poll(
        &self,
        poll: &NewPoll,
        options: &[String],
    ) -> StoreResult<(PollRow, Vec<PollOptionRow>)> {
        let mut tables = self.tables.write().await;

        if !tables.users.iter().any(|u| u.id == poll.author_id) {
            return Err(StoreError::Query(format!(
                "author {} does not exist",
                poll.author_id
            )));
        }

        let now = Utc::now();
        let row = PollRow {
            id: Uuid::new_v4(),
            title: poll.title.clone(),
            description: poll.description.clone(),
            author_id: poll.author_id,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        tables.polls.push(row.clone());
        let option_rows = tables.push_options(row.id, options);

        Ok((row, option_rows))
    }

    async fn get_poll(&self, poll_id: Uuid) -> StoreResult<Option<PollRow>> {
        let tables = self.tables.read().await;
        Ok(tables.polls.iter().find(|p| p.id == poll_id).cloned())
    }

    async fn list_active_polls(&self) -> StoreResult<Vec<PollRow>> {
        let tables = self.tables.read().await;
        let rows = tables.polls.iter().filter(|p| p.is_active).cloned().collect();
        Ok(newest_first(rows))
    }

    async fn list_polls_by_author(&self, author_id: Uuid) -> StoreResult<Vec<PollRow>> {
        let tables = self.tables.read().await;
        let rows = tables
            .polls
            .iter()
            .filter(|p| p.author_id == author_id)
            .cloned()
            .collect();
        Ok(newest_first(rows))
    }

    async fn get_options(&self, poll_ids: &[Uuid]) -> StoreResult<Vec<PollOptionRow>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<PollOptionRow> = tables
            .options
            .iter()
            .filter(|o| poll_ids.contains(&o.poll_id))
            .cloned()
            .collect();
        rows.sort_by_key(|o| (o.poll_id, o.position));
        Ok(rows)
    }

    async fn update_poll(
        &self,
        poll_id: Uuid,
        changes: &PollChanges,
        options: &OptionChanges,
    ) -> StoreResult<()> {
        let mut tables = self.tables.write().await;

        let poll = tables
            .poll_mut(poll_id)
            .ok_or_else(|| StoreError::Query(format!("poll {poll_id} does not exist")))?;
        poll.title = changes.title.clone();
        poll.description = changes.description.clone();
        poll.is_active = changes.is_active;
        poll.updated_at = Utc::now();

        for update in &options.updates {
            if let Some(option) = tables
                .options
                .iter_mut()
                .find(|o| o.id == update.id && o.poll_id == poll_id)
            {
                option.text = update.text.clone();
            }
        }

        tables.push_options(poll_id, &options.inserts);
        tables.delete_options(poll_id, &options.deletes);

        Ok(())
    }

    async fn set_poll_active(&self, poll_id: Uuid, is_active: bool) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if let Some(poll) = tables.poll_mut(poll_id) {
            poll.is_active = is_active;
            poll.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn delete_poll(&self, poll_id: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.polls.len();
        tables.polls.retain(|p| p.id != poll_id);
        tables.options.retain(|o| o.poll_id != poll_id);
        tables.votes.retain(|v| v.poll_id != poll_id);
        Ok(tables.polls.len() < before)
    }

    async fn get_votes(&self, poll_ids: &[Uuid]) -> StoreResult<Vec<Vote>> {
        let tables = self.tables.read().await;
        Ok(tables
            .votes
            .iter()
            .filter(|v| poll_ids.contains(&v.poll_id))
            .cloned()
            .collect())
    }

    async fn find_vote(&self, poll_id: Uuid, user_id: Uuid) -> StoreResult<Option<Vote>> {
        let tables = self.tables.read().await;
        Ok(tables
            .votes
            .iter()
            .find(|v| v.poll_id == poll_id && v.user_id == user_id)
            .cloned())
    }

    async fn insert_vote(&self, poll_id: Uuid, option_id: Uuid, user_id: Uuid) -> StoreResult<Vote> {
        let mut tables = self.tables.write().await;

        if !tables.polls.iter().any(|p| p.id == poll_id) {
            return Err(StoreError::Query(format!("poll {poll_id} does not exist")));
        }
        if !tables.options.iter().any(|o| o.id == option_id) {
            return Err(StoreError::Query(format!("option {option_id} does not exist")));
        }
        if tables
            .votes
            .iter()
            .any(|v| v.poll_id == poll_id && v.user_id == user_id)
        {
            return Err(StoreError::UniqueViolation(format!(
                "user {user_id} already has a vote on poll {poll_id}"
            )));
        }

        let vote = Vote {
            id: Uuid::new_v4(),
            poll_id,
            option_id,
            user_id,
            created_at: Utc::now(),
        };
        tables.votes.push(vote.clone());
        Ok(vote)
    }

    async fn update_vote_option(&self, vote_id: Uuid, option_id: Uuid) -> StoreResult<()> {
        let mut tables = self.tables.write().await;

        if !tables.options.iter().any(|o| o.id == option_id) {
            return Err(StoreError::Query(format!("option {option_id} does not exist")));
        }
        if let Some(vote) = tables.votes.iter_mut().find(|v| v.id == vote_id) {
            vote.option_id = option_id;
        }
        Ok(())
    }
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn create_user(&self, user: &NewUser) -> StoreResult<UserRecord> {
        let mut tables = self.tables.write().await;

        if tables.users.iter().any(|u| u.email == user.email) {
            return Err(StoreError::UniqueViolation(format!(
                "email {} is already registered",
                user.email
            )));
        }

        let now = Utc::now();
        let record = UserRecord {
            id: Uuid::new_v4(),
            email: user.email.clone(),
            password_hash: user.password_hash.clone(),
            name: user.name.clone(),
            created_at: now,
            updated_at: now,
        };
        tables.users.push(record.clone());
        Ok(record)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<UserRecord>> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.email == email).cloned())
    }

    async fn get_user(&self, user_id: Uuid) -> StoreResult<Option<UserRecord>> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.id == user_id).cloned())
    }

    async fn get_profiles(&self, user_ids: &[Uuid]) -> StoreResult<Vec<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .iter()
            .filter(|u| user_ids.contains(&u.id))
            .map(UserRecord::to_user)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::OptionUpdate;

    async fn store_with_poll() -> (InMemoryStore, UserRecord, PollRow, Vec<PollOptionRow>) {
        let store = InMemoryStore::new();
        let author = store
            .create_user(&NewUser {
                name: "Ada".into(),
                email: "ada@example.com".into(),
                password_hash: "hash".into(),
            })
            .await
            .unwrap();
        let (poll, options) = store
            .create_poll(
                &NewPoll {
                    title: "Lunch".into(),
                    description: "Where do we eat today?".into(),
                    author_id: author.id,
                },
                &["Pizza".to_string(), "Sushi".to_string()],
            )
            .await
            .unwrap();
        (store, author, poll, options)
    }

    #[tokio::test]
    async fn duplicate_email_is_a_unique_violation() {
        let (store, _, _, _) = store_with_poll().await;
        let result = store
            .create_user(&NewUser {
                name: "Other".into(),
                email: "ada@example.com".into(),
                password_hash: "hash".into(),
            })
            .await;
        assert!(matches!(result, Err(StoreError::UniqueViolation(_))));
    }

    #[tokio::test]
    async fn second_vote_insert_for_same_user_is_rejected() {
        let (store, author, poll, options) = store_with_poll().await;
        store.insert_vote(poll.id, options[0].id, author.id).await.unwrap();

        let result = store.insert_vote(poll.id, options[1].id, author.id).await;
        assert!(matches!(result, Err(StoreError::UniqueViolation(_))));
    }

    #[tokio::test]
    async fn deleting_an_option_cascades_to_its_votes() {
        let (store, author, poll, options) = store_with_poll().await;
        store.insert_vote(poll.id, options[0].id, author.id).await.unwrap();

        let changes = PollChanges {
            title: poll.title.clone(),
            description: poll.description.clone(),
            is_active: true,
        };
        let plan = OptionChanges {
            updates: vec![OptionUpdate {
                id: options[1].id,
                text: "Ramen".into(),
            }],
            inserts: vec!["Tacos".into()],
            deletes: vec![options[0].id],
        };
        store.update_poll(poll.id, &changes, &plan).await.unwrap();

        let texts: Vec<String> = store
            .get_options(&[poll.id])
            .await
            .unwrap()
            .into_iter()
            .map(|o| o.text)
            .collect();
        assert_eq!(texts, vec!["Ramen", "Tacos"]);
        assert!(store.get_votes(&[poll.id]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn deleting_a_poll_removes_options_and_votes() {
        let (store, author, poll, options) = store_with_poll().await;
        store.insert_vote(poll.id, options[1].id, author.id).await.unwrap();

        assert!(store.delete_poll(poll.id).await.unwrap());
        assert!(!store.delete_poll(poll.id).await.unwrap());
        assert!(store.get_options(&[poll.id]).await.unwrap().is_empty());
        assert!(store.get_votes(&[poll.id]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_of_missing_poll_fails() {
        let store = InMemoryStore::new();
        let changes = PollChanges {
            title: "t".into(),
            description: "d".into(),
            is_active: true,
        };
        let result = store
            .update_poll(Uuid::new_v4(), &changes, &OptionChanges::default())
            .await;
        assert!(matches!(result, Err(StoreError::Query(_))));
    }
}
