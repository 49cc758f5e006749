use crate::db::models::Poll;
use crate::error::PollError;
use crate::service::PollService;
use crate::sse::models::LiveEvent;
use crate::startup::AppState;
use axum::{
    extract::{Extension, Path},
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::Stream;
use serde_json::json;
use std::{convert::Infallible, time::Duration};
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, warn};
use uuid::Uuid;

#[derive(Debug)]
enum LagResync {
    Current(Poll),
    Deleted,
}

async fn resync_after_lag(service: &PollService, poll_id: Uuid) -> Result<LagResync, PollError> {
    Ok(match service.load_poll(poll_id).await? {
        Some(poll) => LagResync::Current(poll),
        None => LagResync::Deleted,
    })
}

pub async fn poll_updates_sse(
    Extension(app_state): Extension<AppState>,
    Path(poll_id): Path<Uuid>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut rx = app_state.events.subscribe();
    let service = app_state.polls.clone();

    let stream = async_stream::stream! {
        match service.get_poll_by_id(poll_id).await {
            Ok(Some(poll)) => {
                yield Ok(Event::default()
                    .event("init")
                    .data(json!({"poll": poll}).to_string()));
            }
            Ok(None) => {
                yield Ok(Event::default()
                    .event("error")
                    .data(json!({"error": "Poll not found"}).to_string()));
            }
            Err(e) => {
                error!("Failed to load poll {poll_id} for live updates: {e}");
                yield Ok(Event::default()
                    .event("error")
                    .data(json!({"error": "Database error"}).to_string()));
            }
        }

        loop {
            let event = match rx.recv().await {
                Ok(event) if event.poll_id() == poll_id => event,
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    // Missed events may include the deletion.
                    warn!(skipped, %poll_id, "poll subscriber lagged");
                    match resync_after_lag(&service, poll_id).await {
                        Ok(LagResync::Current(poll)) => {
                            yield Ok(Event::default()
                                .event("resync")
                                .data(json!({"poll": poll, "skipped": skipped}).to_string()));
                            continue;
                        }
                        Ok(LagResync::Deleted) => {
                            yield Ok(Event::default()
                                .event("poll_deleted")
                                .data(json!({"pollId": poll_id}).to_string()));
                            break;
                        }
                        Err(e) => {
                            error!("Failed to reload poll {poll_id} after lag: {e}");
                            continue;
                        }
                    }
                }
                Err(RecvError::Closed) => break,
            };

            match event {
                LiveEvent::VoteCast { .. } | LiveEvent::PollUpdated { .. } => {
                    match service.load_poll(poll_id).await {
                        Ok(Some(poll)) => {
                            yield Ok(Event::default()
                                .event("poll_updated")
                                .data(json!({"poll": poll}).to_string()));
                        }
                        Ok(None) => {}
                        Err(e) => error!("Failed to reload poll {poll_id}: {e}"),
                    }
                }
                LiveEvent::PollStatusChanged { is_active, .. } => {
                    yield Ok(Event::default()
                        .event("poll_status_changed")
                        .data(json!({"pollId": poll_id, "isActive": is_active}).to_string()));
                }
                LiveEvent::PollDeleted { .. } => {
                    yield Ok(Event::default()
                        .event("poll_deleted")
                        .data(json!({"pollId": poll_id}).to_string()));
                    break;
                }
                LiveEvent::PollCreated { .. } => {}
            }
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(30))
            .text("keep-alive"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InMemoryStore;
    use crate::db::models::NewUser;
    use crate::db::store::{PollStore, UserStore};
    use crate::service::CreatePollData;
    use std::sync::Arc;

    #[tokio::test]
    async fn lagged_subscriber_learns_about_deletion() {
        let store = Arc::new(InMemoryStore::new());
        let service = PollService::new(store.clone(), store.clone());
        let author = store
            .create_user(&NewUser {
                name: "Ada".into(),
                email: "ada@example.com".into(),
                password_hash: "hash".into(),
            })
            .await
            .unwrap();
        let poll = service
            .create_poll(
                &CreatePollData {
                    title: "Lunch".into(),
                    description: "Where do we eat today?".into(),
                    options: vec!["Pizza".into(), "Sushi".into()],
                },
                author.id,
            )
            .await
            .unwrap();

        let resync = resync_after_lag(&service, poll.id).await.unwrap();
        assert!(matches!(resync, LagResync::Current(ref p) if p.id == poll.id));

        store.delete_poll(poll.id).await.unwrap();
        let resync = resync_after_lag(&service, poll.id).await.unwrap();
        assert!(matches!(resync, LagResync::Deleted));
    }
}
