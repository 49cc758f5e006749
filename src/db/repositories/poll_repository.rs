use crate::db::models::{NewPoll, PollChanges, PollOptionRow, PollRow};
use sqlx::Error;
use sqlx::postgres::PgExecutor;
use uuid::Uuid;

const POLL_COLUMNS: &str = "id, title, description, author_id, is_active, created_at, updated_at";

pub async fn insert_poll<'e>(
    executor: impl PgExecutor<'e>,
    poll_id: Uuid,
    poll: &NewPoll,
) -> Result<PollRow, Error> {
    sqlx::query_as::<_, PollRow>(&format!(
        "INSERT INTO polls (id, title, description, author_id) VALUES ($1, $2, $3, $4) RETURNING {POLL_COLUMNS}"
    ))
    .bind(poll_id)
    .bind(&poll.title)
    .bind(&poll.description)
    .bind(poll.author_id)
    .fetch_one(executor)
    .await
}

/// Inserts all `texts` in one statement, numbering positions from `first_position`.
pub async fn insert_poll_options<'e>(
    executor: impl PgExecutor<'e>,
    poll_id: Uuid,
    texts: &[String],
    first_position: i32,
) -> Result<Vec<PollOptionRow>, Error> {
    let ids: Vec<Uuid> = texts.iter().map(|_| Uuid::new_v4()).collect();
    let positions: Vec<i32> = (0..texts.len() as i32).map(|i| first_position + i).collect();

    let mut rows = sqlx::query_as::<_, PollOptionRow>(
        r#"
        INSERT INTO poll_options (id, poll_id, text, position)
        SELECT t.id, $1::uuid, t.text, t.position
        FROM UNNEST($2::uuid[], $3::text[], $4::int4[]) AS t(id, text, position)
        RETURNING id, poll_id, text, position
        "#,
    )
    .bind(poll_id)
    .bind(&ids)
    .bind(texts)
    .bind(&positions)
    .fetch_all(executor)
    .await?;

    rows.sort_by_key(|r| r.position);
    Ok(rows)
}

pub async fn next_option_position<'e>(
    executor: impl PgExecutor<'e>,
    poll_id: Uuid,
) -> Result<i32, Error> {
    sqlx::query_scalar::<_, i32>(
        "SELECT COALESCE(MAX(position) + 1, 0) FROM poll_options WHERE poll_id = $1",
    )
    .bind(poll_id)
    .fetch_one(executor)
    .await
}

pub async fn get_poll<'e>(
    executor: impl PgExecutor<'e>,
    poll_id: Uuid,
) -> Result<Option<PollRow>, Error> {
    sqlx::query_as::<_, PollRow>(&format!("SELECT {POLL_COLUMNS} FROM polls WHERE id = $1"))
        .bind(poll_id)
        .fetch_optional(executor)
        .await
}

pub async fn list_active_polls<'e>(executor: impl PgExecutor<'e>) -> Result<Vec<PollRow>, Error> {
    sqlx::query_as::<_, PollRow>(&format!(
        "SELECT {POLL_COLUMNS} FROM polls WHERE is_active = TRUE ORDER BY created_at DESC"
    ))
    .fetch_all(executor)
    .await
}

pub async fn list_polls_by_author<'e>(
    executor: impl PgExecutor<'e>,
    author_id: Uuid,
) -> Result<Vec<PollRow>, Error> {
    sqlx::query_as::<_, PollRow>(&format!(
        "SELECT {POLL_COLUMNS} FROM polls WHERE author_id = $1 ORDER BY created_at DESC"
    ))
    .bind(author_id)
    .fetch_all(executor)
    .await
}

pub async fn update_poll_fields<'e>(
    executor: impl PgExecutor<'e>,
    poll_id: Uuid,
    changes: &PollChanges,
) -> Result<u64, Error> {
    let result = sqlx::query(
        "UPDATE polls SET title = $1, description = $2, is_active = $3, updated_at = NOW() WHERE id = $4",
    )
    .bind(&changes.title)
    .bind(&changes.description)
    .bind(changes.is_active)
    .bind(poll_id)
    .execute(executor)
    .await?;

    Ok(result.rows_affected())
}

pub async fn set_poll_active<'e>(
    executor: impl PgExecutor<'e>,
    poll_id: Uuid,
    is_active: bool,
) -> Result<(), Error> {
    sqlx::query("UPDATE polls SET is_active = $1, updated_at = NOW() WHERE id = $2")
        .bind(is_active)
        .bind(poll_id)
        .execute(executor)
        .await?;

    Ok(())
}

pub async fn delete_poll<'e>(executor: impl PgExecutor<'e>, poll_id: Uuid) -> Result<bool, Error> {
    let result = sqlx::query("DELETE FROM polls WHERE id = $1")
        .bind(poll_id)
        .execute(executor)
        .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn get_options_for_polls<'e>(
    executor: impl PgExecutor<'e>,
    poll_ids: &[Uuid],
) -> Result<Vec<PollOptionRow>, Error> {
    sqlx::query_as::<_, PollOptionRow>(
        "SELECT id, poll_id, text, position FROM poll_options WHERE poll_id = ANY($1) ORDER BY poll_id, position",
    )
    .bind(poll_ids)
    .fetch_all(executor)
    .await
}

pub async fn update_option_text<'e>(
    executor: impl PgExecutor<'e>,
    poll_id: Uuid,
    option_id: Uuid,
    text: &str,
) -> Result<(), Error> {
    sqlx::query("UPDATE poll_options SET text = $1 WHERE id = $2 AND poll_id = $3")
        .bind(text)
        .bind(option_id)
        .bind(poll_id)
        .execute(executor)
        .await?;

    Ok(())
}

pub async fn delete_poll_options<'e>(
    executor: impl PgExecutor<'e>,
    poll_id: Uuid,
    option_ids: &[Uuid],
) -> Result<(), Error> {
    sqlx::query("DELETE FROM poll_options WHERE poll_id = $1 AND id = ANY($2)")
        .bind(poll_id)
        .bind(option_ids)
        .execute(executor)
        .await?;

    Ok(())
}
