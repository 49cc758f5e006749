use crate::db::connection::DbPool;
use crate::db::models::{NewPoll, NewUser, PollChanges, PollOptionRow, PollRow, User, UserRecord, Vote};
use crate::db::repositories::{poll_repository, user_repository, vote_repository};
use crate::error::{StoreError, StoreResult};
use crate::reconcile::OptionChanges;
use async_trait::async_trait;
use uuid::Uuid;

/// Data access for polls, their options and votes.
#[async_trait]
pub trait PollStore: Send + Sync {
    /// Inserts the poll and its options atomically.
    async fn create_poll(
        &self,
        poll: &NewPoll,
        options: &[String],
    ) -> StoreResult<(PollRow, Vec<PollOptionRow>)>;
    async fn get_poll(&self, poll_id: Uuid) -> StoreResult<Option<PollRow>>;
    /// Active polls, newest first.
    async fn list_active_polls(&self) -> StoreResult<Vec<PollRow>>;
    /// Every poll by `author_id`, newest first.
    async fn list_polls_by_author(&self, author_id: Uuid) -> StoreResult<Vec<PollRow>>;
    /// Options of the given polls, in creation order within each poll.
    async fn get_options(&self, poll_ids: &[Uuid]) -> StoreResult<Vec<PollOptionRow>>;
    /// Rewrites the poll fields and applies the option batches atomically.
    async fn update_poll(
        &self,
        poll_id: Uuid,
        changes: &PollChanges,
        options: &OptionChanges,
    ) -> StoreResult<()>;
    async fn set_poll_active(&self, poll_id: Uuid, is_active: bool) -> StoreResult<()>;
    /// Deletes the poll with its options and votes. Returns false if it did not exist.
    async fn delete_poll(&self, poll_id: Uuid) -> StoreResult<bool>;
    async fn get_votes(&self, poll_ids: &[Uuid]) -> StoreResult<Vec<Vote>>;
    async fn find_vote(&self, poll_id: Uuid, user_id: Uuid) -> StoreResult<Option<Vote>>;
    async fn insert_vote(&self, poll_id: Uuid, option_id: Uuid, user_id: Uuid) -> StoreResult<Vote>;
    async fn update_vote_option(&self, vote_id: Uuid, option_id: Uuid) -> StoreResult<()>;
}

/// Credentials and profiles.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Creates the credential row and the profile together.
    async fn create_user(&self, user: &NewUser) -> StoreResult<UserRecord>;
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<UserRecord>>;
    async fn get_user(&self, user_id: Uuid) -> StoreResult<Option<UserRecord>>;
    async fn get_profiles(&self, user_ids: &[Uuid]) -> StoreResult<Vec<User>>;
}

#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        PgStore { pool }
    }
}

#[async_trait]
impl PollStore for PgStore {
    async fn create_poll(
        &self,
        poll: &NewPoll,
        options: &[String],
    ) -> StoreResult<(PollRow, Vec<PollOptionRow>)> {
        let mut tx = self.pool.begin().await?;

        let row = poll_repository::insert_poll(&mut *tx, Uuid::new_v4(), poll).await?;
        let option_rows = poll_repository::insert_poll_options(&mut *tx, row.id, options, 0).await?;

        tx.commit().await?;
        Ok((row, option_rows))
    }

    async fn get_poll(&self, poll_id: Uuid) -> StoreResult<Option<PollRow>> {
        Ok(poll_repository::get_poll(&self.pool, poll_id).await?)
    }

    async fn list_active_polls(&self) -> StoreResult<Vec<PollRow>> {
        Ok(poll_repository::list_active_polls(&self.pool).await?)
    }

    async fn list_polls_by_author(&self, author_id: Uuid) -> StoreResult<Vec<PollRow>> {
        Ok(poll_repository::list_polls_by_author(&self.pool, author_id).await?)
    }

    async fn get_options(&self, poll_ids: &[Uuid]) -> StoreResult<Vec<PollOptionRow>> {
        Ok(poll_repository::get_options_for_polls(&self.pool, poll_ids).await?)
    }

    async fn update_poll(
        &self,
        poll_id: Uuid,
        changes: &PollChanges,
        options: &OptionChanges,
    ) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        let updated = poll_repository::update_poll_fields(&mut *tx, poll_id, changes).await?;
        if updated == 0 {
            tx.rollback().await?;
            return Err(StoreError::Query(format!("poll {poll_id} does not exist")));
        }

        for update in &options.updates {
            poll_repository::update_option_text(&mut *tx, poll_id, update.id, &update.text).await?;
        }

        if !options.inserts.is_empty() {
            let first_position = poll_repository::next_option_position(&mut *tx, poll_id).await?;
            poll_repository::insert_poll_options(&mut *tx, poll_id, &options.inserts, first_position)
                .await?;
        }

        if !options.deletes.is_empty() {
            poll_repository::delete_poll_options(&mut *tx, poll_id, &options.deletes).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn set_poll_active(&self, poll_id: Uuid, is_active: bool) -> StoreResult<()> {
        Ok(poll_repository::set_poll_active(&self.pool, poll_id, is_active).await?)
    }

    async fn delete_poll(&self, poll_id: Uuid) -> StoreResult<bool> {
        Ok(poll_repository::delete_poll(&self.pool, poll_id).await?)
    }

    async fn get_votes(&self, poll_ids: &[Uuid]) -> StoreResult<Vec<Vote>> {
        Ok(vote_repository::get_votes_for_polls(&self.pool, poll_ids).await?)
    }

    async fn find_vote(&self, poll_id: Uuid, user_id: Uuid) -> StoreResult<Option<Vote>> {
        Ok(vote_repository::find_vote(&self.pool, poll_id, user_id).await?)
    }

    async fn insert_vote(&self, poll_id: Uuid, option_id: Uuid, user_id: Uuid) -> StoreResult<Vote> {
        Ok(vote_repository::insert_vote(&self.pool, poll_id, option_id, user_id).await?)
    }

    async fn update_vote_option(&self, vote_id: Uuid, option_id: Uuid) -> StoreResult<()> {
        Ok(vote_repository::update_vote_option(&self.pool, vote_id, option_id).await?)
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn create_user(&self, user: &NewUser) -> StoreResult<UserRecord> {
        let user_id = Uuid::new_v4();
        let mut tx = self.pool.begin().await?;

        user_repository::insert_user(&mut *tx, user_id, user).await?;
        user_repository::insert_profile(&mut *tx, user_id, &user.name).await?;
        let record = user_repository::get_user(&mut *tx, user_id)
            .await?
            .ok_or_else(|| StoreError::Query(format!("user {user_id} missing after insert")))?;

        tx.commit().await?;
        Ok(record)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<UserRecord>> {
        Ok(user_repository::find_user_by_email(&self.pool, email).await?)
    }

    async fn get_user(&self, user_id: Uuid) -> StoreResult<Option<UserRecord>> {
        Ok(user_repository::get_user(&self.pool, user_id).await?)
    }

    async fn get_profiles(&self, user_ids: &[Uuid]) -> StoreResult<Vec<User>> {
        Ok(user_repository::get_profiles(&self.pool, user_ids).await?)
    }
}
