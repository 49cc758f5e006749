use crate::db::models::Vote;
use sqlx::Error;
use sqlx::postgres::PgExecutor;
use uuid::Uuid;

pub async fn find_vote<'e>(
    executor: impl PgExecutor<'e>,
    poll_id: Uuid,
    user_id: Uuid,
) -> Result<Option<Vote>, Error> {
    sqlx::query_as::<_, Vote>(
        "SELECT id, poll_id, option_id, user_id, created_at FROM votes WHERE poll_id = $1 AND user_id = $2",
    )
    .bind(poll_id)
    .bind(user_id)
    .fetch_optional(executor)
    .await
}

pub async fn insert_vote<'e>(
    executor: impl PgExecutor<'e>,
    poll_id: Uuid,
    option_id: Uuid,
    user_id: Uuid,
) -> Result<Vote, Error> {
    sqlx::query_as::<_, Vote>(
        r#"
        INSERT INTO votes (id, poll_id, option_id, user_id) VALUES ($1, $2, $3, $4)
        RETURNING id, poll_id, option_id, user_id, created_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(poll_id)
    .bind(option_id)
    .bind(user_id)
    .fetch_one(executor)
    .await
}

pub async fn update_vote_option<'e>(
    executor: impl PgExecutor<'e>,
    vote_id: Uuid,
    option_id: Uuid,
) -> Result<(), Error> {
    sqlx::query("UPDATE votes SET option_id = $1 WHERE id = $2")
        .bind(option_id)
        .bind(vote_id)
        .execute(executor)
        .await?;

    Ok(())
}

pub async fn get_votes_for_polls<'e>(
    executor: impl PgExecutor<'e>,
    poll_ids: &[Uuid],
) -> Result<Vec<Vote>, Error> {
    sqlx::query_as::<_, Vote>(
        "SELECT id, poll_id, option_id, user_id, created_at FROM votes WHERE poll_id = ANY($1)",
    )
    .bind(poll_ids)
    .fetch_all(executor)
    .await
}
