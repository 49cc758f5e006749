use crate::config::Config;
use crate::db::models::NewUser;
use crate::error::AuthError;
use crate::startup::AppState;
use axum::{
    extract::{Extension, Json},
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_sessions::Session;
use tracing::{info, warn};
use uuid::Uuid;

pub const SESSION_USER_KEY: &str = "user_id";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterData {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm_password: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginData {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub exp: usize,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn issue_token(config: &Config, user_id: Uuid, email: &str) -> Result<String, AuthError> {
    let claims = Claims {
        sub: user_id,
        email: email.to_string(),
        exp: (Utc::now() + Duration::hours(config.token_ttl_hours)).timestamp() as usize,
    };

    Ok(encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )?)
}

fn verify_token(config: &Config, token: &str) -> Option<Uuid> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims.sub)
    .ok()
}

/// The signed-in user: the session first, then an `Authorization: Bearer` token.
pub async fn caller_id(app_state: &AppState, session: &Session, headers: &HeaderMap) -> Option<Uuid> {
    if let Ok(Some(user_id)) = session.get::<Uuid>(SESSION_USER_KEY).await {
        return Some(user_id);
    }

    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))?;

    verify_token(&app_state.config, token)
}

async fn hash_password(password: String, cost: u32) -> Result<String, AuthError> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|_| AuthError::Hashing)?
        .map_err(|_| AuthError::Hashing)
}

async fn verify_password(password: String, hash: String) -> Result<bool, AuthError> {
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|_| AuthError::Hashing)?
        .map_err(|_| AuthError::Hashing)
}

pub async fn register(
    Extension(app_state): Extension<AppState>,
    session: Session,
    Json(payload): Json<RegisterData>,
) -> Result<impl IntoResponse, AuthError> {
    let name = payload.name.trim();
    let email = normalize_email(&payload.email);

    if name.is_empty() || email.is_empty() || payload.password.is_empty() {
        return Err(AuthError::Validation(
            "Name, email, and password are required".to_string(),
        ));
    }
    if payload.password != payload.confirm_password {
        return Err(AuthError::Validation("Passwords do not match".to_string()));
    }

    if app_state.users.find_user_by_email(&email).await?.is_some() {
        return Err(AuthError::UserAlreadyExists);
    }

    let password_hash = hash_password(payload.password, app_state.config.bcrypt_cost).await?;
    let record = app_state
        .users
        .create_user(&NewUser {
            name: name.to_string(),
            email,
            password_hash,
        })
        .await?;

    session.cycle_id().await?;
    session.insert(SESSION_USER_KEY, record.id).await?;
    let token = issue_token(&app_state.config, record.id, &record.email)?;

    info!(user_id = %record.id, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "data": record.to_user(),
            "token": token,
        })),
    ))
}

pub async fn login(
    Extension(app_state): Extension<AppState>,
    session: Session,
    Json(payload): Json<LoginData>,
) -> Result<impl IntoResponse, AuthError> {
    let email = normalize_email(&payload.email);
    if email.is_empty() || payload.password.is_empty() {
        return Err(AuthError::Validation(
            "Email and password are required".to_string(),
        ));
    }

    let record = app_state
        .users
        .find_user_by_email(&email)
        .await?
        .ok_or(AuthError::InvalidCredentials)?;

    if !verify_password(payload.password, record.password_hash.clone()).await? {
        warn!(user_id = %record.id, "failed login attempt");
        return Err(AuthError::InvalidCredentials);
    }

    session.cycle_id().await?;
    session.insert(SESSION_USER_KEY, record.id).await?;
    let token = issue_token(&app_state.config, record.id, &record.email)?;

    info!(user_id = %record.id, "user logged in");
    Ok(Json(json!({
        "success": true,
        "data": record.to_user(),
        "token": token,
    })))
}

pub async fn logout(session: Session) -> Result<impl IntoResponse, AuthError> {
    session.flush().await?;
    Ok(Json(json!({ "success": true })))
}

pub async fn me(
    Extension(app_state): Extension<AppState>,
    session: Session,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AuthError> {
    let user_id = caller_id(&app_state, &session, &headers)
        .await
        .ok_or(AuthError::Unauthenticated)?;

    let record = app_state
        .users
        .get_user(user_id)
        .await?
        .ok_or(AuthError::Unauthenticated)?;

    Ok(Json(json!({
        "success": true,
        "data": record.to_user(),
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_token_verifies_with_same_secret_only() {
        let config = Config::default();
        let user_id = Uuid::new_v4();

        let token = issue_token(&config, user_id, "ada@example.com").unwrap();
        assert_eq!(verify_token(&config, &token), Some(user_id));

        let other = Config {
            jwt_secret: "another-secret".into(),
            ..Config::default()
        };
        assert_eq!(verify_token(&other, &token), None);
    }

    #[test]
    fn expired_token_is_rejected() {
        let config = Config {
            token_ttl_hours: -2,
            ..Config::default()
        };
        let token = issue_token(&config, Uuid::new_v4(), "ada@example.com").unwrap();
        assert_eq!(verify_token(&config, &token), None);
    }

    #[test]
    fn emails_are_trimmed_and_lowercased() {
        assert_eq!(normalize_email("  Ada@Example.COM "), "ada@example.com");
    }
}
