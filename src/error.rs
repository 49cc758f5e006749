use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{0}")]
    UniqueViolation(String),
    #[error("{0}")]
    Query(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum PollError {
    #[error("{0}")]
    Unauthenticated(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Validation(String),
    #[error("Poll not found")]
    PollNotFound,
    #[error("{0}")]
    DatabaseError(String),
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("You must be logged in")]
    Unauthenticated,
    #[error("User already exists")]
    UserAlreadyExists,
    #[error("Session error")]
    Session,
    #[error("Token creation error")]
    TokenCreation,
    #[error("Password hashing failed")]
    Hashing,
    #[error("{0}")]
    DatabaseError(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Error, Debug)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database: {0}")]
    Database(#[from] sqlx::Error),
    #[error("session store: {0}")]
    SessionStore(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn error_body(status: StatusCode, message: String) -> Response {
    let body = Json(json!({
        "success": false,
        "error": message,
    }));

    (status, body).into_response()
}

impl IntoResponse for PollError {
    fn into_response(self) -> Response {
        let status = match &self {
            PollError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            PollError::Unauthorized(_) => StatusCode::FORBIDDEN,
            PollError::Validation(_) => StatusCode::BAD_REQUEST,
            PollError::PollNotFound => StatusCode::NOT_FOUND,
            PollError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        error_body(status, self.to_string())
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = match &self {
            AuthError::Validation(_) => StatusCode::BAD_REQUEST,
            AuthError::InvalidCredentials | AuthError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AuthError::UserAlreadyExists => StatusCode::CONFLICT,
            AuthError::Session
            | AuthError::TokenCreation
            | AuthError::Hashing
            | AuthError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        error_body(status, self.to_string())
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(error: sqlx::Error) -> Self {
        match &error {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                StoreError::UniqueViolation(db_err.message().to_string())
            }
            _ => StoreError::Query(error.to_string()),
        }
    }
}

impl From<StoreError> for PollError {
    fn from(error: StoreError) -> Self {
        PollError::DatabaseError(error.to_string())
    }
}

impl From<StoreError> for AuthError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::UniqueViolation(_) => AuthError::UserAlreadyExists,
            StoreError::Query(msg) => AuthError::DatabaseError(msg),
        }
    }
}

impl From<tower_sessions::session::Error> for AuthError {
    fn from(_: tower_sessions::session::Error) -> Self {
        AuthError::Session
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(_: jsonwebtoken::errors::Error) -> Self {
        AuthError::TokenCreation
    }
}
