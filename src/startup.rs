use crate::actions::PollActions;
use crate::auth::{login, logout, me, register};
use crate::config::Config;
use crate::db::connection::{DbPool, pool_stats};
use crate::db::store::{PollStore, UserStore};
use crate::polls::{
    create_poll, dashboard_polls, dashboard_stats, delete_poll, get_poll, list_polls,
    poll_results, toggle_poll, update_poll, vote_on_poll,
};
use crate::service::PollService;
use crate::sse::{EventSender, create_event_broadcaster, live_events_sse, poll_updates_sse};
use axum::{
    Router,
    extract::Extension,
    http::{
        Method, StatusCode,
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    },
    response::IntoResponse,
    routing::{get, post},
};
use std::sync::Arc;
use tokio::time::{Duration, interval};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tower_sessions::{
    Expiry, SessionManagerLayer, SessionStore,
    cookie::{SameSite, time::Duration as CookieDuration},
};
use tracing::{debug, error};

pub const SESSION_COOKIE_NAME: &str = "polls.sid";

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub polls: PollService,
    pub actions: PollActions,
    pub users: Arc<dyn UserStore>,
    pub events: EventSender,
}

impl AppState {
    /// Wires the service, action layer and event channel around one store.
    pub fn new<S>(store: Arc<S>, config: Config) -> Self
    where
        S: PollStore + UserStore + 'static,
    {
        let events = create_event_broadcaster();
        let polls = PollService::new(store.clone(), store.clone());
        let actions = PollActions::new(polls.clone(), store.clone(), events.clone());

        AppState {
            config: Arc::new(config),
            polls,
            actions,
            users: store,
            events,
        }
    }
}

/// Checks out a pooled connection once a minute so a dead database shows up in the logs.
pub fn spawn_health_check(db: DbPool) {
    tokio::spawn(async move {
        let mut interval = interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            match db.acquire().await {
                Ok(conn) => {
                    drop(conn);
                    debug!("database health check ok ({})", pool_stats(&db));
                }
                Err(e) => {
                    error!("Database connection health check failed: {}", e);
                }
            }
        }
    });
}

pub fn build_router<Store>(app_state: AppState, session_store: Store) -> Router
where
    Store: SessionStore + Clone,
{
    let cookie_secure = app_state.config.cookie_secure;
    let inactivity = app_state.config.session_inactivity_secs;

    Router::new()
        .route("/api/polls", get(list_polls).post(create_poll))
        .route(
            "/api/polls/:id",
            get(get_poll)
                .post(vote_on_poll)
                .put(update_poll)
                .delete(delete_poll),
        )
        .route("/api/polls/:id/toggle", post(toggle_poll))
        .route("/api/polls/:id/results", get(poll_results))
        .route("/api/polls/:id/events", get(poll_updates_sse))
        .route("/api/dashboard/polls", get(dashboard_polls))
        .route("/api/dashboard/stats", get(dashboard_stats))
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/me", get(me))
        .route("/api/events", get(live_events_sse))
        .layer(Extension(app_state))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(AllowOrigin::mirror_request())
                .allow_credentials(true)
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers([CONTENT_TYPE, ACCEPT, AUTHORIZATION]),
        )
        .layer(
            SessionManagerLayer::new(session_store)
                .with_name(SESSION_COOKIE_NAME)
                .with_same_site(SameSite::Lax)
                .with_secure(cookie_secure)
                .with_expiry(Expiry::OnInactivity(CookieDuration::seconds(inactivity))),
        )
        .fallback(handler_404)
}

async fn handler_404() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "nothing to see here")
}
