use crate::db::models::{NewUser, User, UserRecord};
use sqlx::Error;
use sqlx::postgres::PgExecutor;
use uuid::Uuid;

const USER_RECORD_QUERY: &str = r#"
    SELECT u.id, u.email, u.password_hash,
           COALESCE(p.name, '') AS name,
           u.created_at,
           COALESCE(p.updated_at, u.created_at) AS updated_at
    FROM users u
    LEFT JOIN profiles p ON p.id = u.id
"#;

pub async fn find_user_by_email<'e>(
    executor: impl PgExecutor<'e>,
    email: &str,
) -> Result<Option<UserRecord>, Error> {
    sqlx::query_as::<_, UserRecord>(&format!("{USER_RECORD_QUERY} WHERE u.email = $1"))
        .bind(email)
        .fetch_optional(executor)
        .await
}

pub async fn get_user<'e>(
    executor: impl PgExecutor<'e>,
    user_id: Uuid,
) -> Result<Option<UserRecord>, Error> {
    sqlx::query_as::<_, UserRecord>(&format!("{USER_RECORD_QUERY} WHERE u.id = $1"))
        .bind(user_id)
        .fetch_optional(executor)
        .await
}

pub async fn insert_user<'e>(
    executor: impl PgExecutor<'e>,
    user_id: Uuid,
    user: &NewUser,
) -> Result<(), Error> {
    sqlx::query("INSERT INTO users (id, email, password_hash) VALUES ($1, $2, $3)")
        .bind(user_id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .execute(executor)
        .await?;

    Ok(())
}

pub async fn insert_profile<'e>(
    executor: impl PgExecutor<'e>,
    user_id: Uuid,
    name: &str,
) -> Result<(), Error> {
    sqlx::query("INSERT INTO profiles (id, name) VALUES ($1, $2)")
        .bind(user_id)
        .bind(name)
        .execute(executor)
        .await?;

    Ok(())
}

/// Public profiles (name and email) for poll authors.
pub async fn get_profiles<'e>(
    executor: impl PgExecutor<'e>,
    user_ids: &[Uuid],
) -> Result<Vec<User>, Error> {
    sqlx::query_as::<_, User>(
        r#"
        SELECT p.id, p.name, u.email, p.created_at, p.updated_at
        FROM profiles p
        JOIN users u ON u.id = p.id
        WHERE p.id = ANY($1)
        "#,
    )
    .bind(user_ids)
    .fetch_all(executor)
    .await
}
