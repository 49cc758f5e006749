use crate::actions::{ActionResponse, UpdatePollData};
use crate::auth::caller_id;
use crate::error::PollError;
use crate::service::CreatePollData;
use crate::startup::AppState;
use axum::{
    extract::{Extension, Json, Path},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::error;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CastVoteRequest {
    #[serde(default)]
    pub option_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct VoteResponse {
    pub success: bool,
    pub message: String,
}

const DASHBOARD_LOGIN_REQUIRED: &str = "You must be logged in to view your dashboard";

async fn require_user(
    app_state: &AppState,
    session: &Session,
    headers: &HeaderMap,
) -> Result<Uuid, PollError> {
    caller_id(app_state, session, headers)
        .await
        .ok_or_else(|| PollError::Unauthenticated(DASHBOARD_LOGIN_REQUIRED.to_string()))
}

/// Active polls, newest first
pub async fn list_polls(
    Extension(app_state): Extension<AppState>,
) -> Result<impl IntoResponse, PollError> {
    let polls = app_state
        .polls
        .get_polls()
        .await
        .inspect_err(|e| error!("Get polls error: {e}"))?;

    Ok(Json(ActionResponse::with_data(polls)))
}

pub async fn create_poll(
    Extension(app_state): Extension<AppState>,
    session: Session,
    headers: HeaderMap,
    Json(payload): Json<CreatePollData>,
) -> Result<impl IntoResponse, PollError> {
    let caller = caller_id(&app_state, &session, &headers).await;
    let response = app_state.actions.create_poll(caller, payload).await?;

    Ok((StatusCode::CREATED, Json(response)))
}

/// One active poll with its vote counts
pub async fn get_poll(
    Extension(app_state): Extension<AppState>,
    Path(poll_id): Path<Uuid>,
) -> Result<impl IntoResponse, PollError> {
    let poll = app_state
        .polls
        .get_poll_by_id(poll_id)
        .await
        .inspect_err(|e| error!("Get poll error: {e}"))?
        .ok_or(PollError::PollNotFound)?;

    Ok(Json(ActionResponse::with_data(poll)))
}

pub async fn vote_on_poll(
    Extension(app_state): Extension<AppState>,
    session: Session,
    headers: HeaderMap,
    Path(poll_id): Path<Uuid>,
    Json(payload): Json<CastVoteRequest>,
) -> Result<impl IntoResponse, PollError> {
    let option_id = payload
        .option_id
        .ok_or_else(|| PollError::Validation("Option ID is required".to_string()))?;

    let caller = caller_id(&app_state, &session, &headers).await;
    app_state
        .actions
        .vote_on_poll(caller, poll_id, option_id)
        .await?;

    Ok(Json(VoteResponse {
        success: true,
        message: "Vote submitted successfully".to_string(),
    }))
}

/// The path id wins over any id in the body.
pub async fn update_poll(
    Extension(app_state): Extension<AppState>,
    session: Session,
    headers: HeaderMap,
    Path(poll_id): Path<Uuid>,
    Json(mut payload): Json<UpdatePollData>,
) -> Result<impl IntoResponse, PollError> {
    payload.id = poll_id;
    let caller = caller_id(&app_state, &session, &headers).await;
    let response = app_state.actions.update_poll(caller, payload).await?;

    Ok(Json(response))
}

pub async fn delete_poll(
    Extension(app_state): Extension<AppState>,
    session: Session,
    headers: HeaderMap,
    Path(poll_id): Path<Uuid>,
) -> Result<impl IntoResponse, PollError> {
    let caller = caller_id(&app_state, &session, &headers).await;
    let response = app_state.actions.delete_poll(caller, poll_id).await?;

    Ok(Json(response))
}

pub async fn toggle_poll(
    Extension(app_state): Extension<AppState>,
    session: Session,
    headers: HeaderMap,
    Path(poll_id): Path<Uuid>,
) -> Result<impl IntoResponse, PollError> {
    let caller = caller_id(&app_state, &session, &headers).await;
    let response = app_state.actions.toggle_poll_status(caller, poll_id).await?;

    Ok(Json(response))
}

pub async fn poll_results(
    Extension(app_state): Extension<AppState>,
    Path(poll_id): Path<Uuid>,
) -> Result<impl IntoResponse, PollError> {
    let results = app_state
        .polls
        .get_poll_results(poll_id)
        .await?
        .ok_or(PollError::PollNotFound)?;

    Ok(Json(ActionResponse::with_data(results)))
}

/// The caller's polls, inactive ones included
pub async fn dashboard_polls(
    Extension(app_state): Extension<AppState>,
    session: Session,
    headers: HeaderMap,
) -> Result<impl IntoResponse, PollError> {
    let user_id = require_user(&app_state, &session, &headers).await?;
    let polls = app_state.polls.get_user_polls(user_id).await?;

    Ok(Json(ActionResponse::with_data(polls)))
}

pub async fn dashboard_stats(
    Extension(app_state): Extension<AppState>,
    session: Session,
    headers: HeaderMap,
) -> Result<impl IntoResponse, PollError> {
    let user_id = require_user(&app_state, &session, &headers).await?;
    let stats = app_state.polls.get_dashboard_stats(user_id).await?;

    Ok(Json(ActionResponse::with_data(stats)))
}
