//! Authenticated entry points for changing polls.
//!
//! Every action checks the caller, validates its input, checks ownership where
//! a poll already exists, performs the change and then publishes a
//! [`LiveEvent`] so cached pages showing the poll can be refreshed. Failures
//! past validation are logged here before being handed back to the caller.

use crate::db::models::{Poll, PollChanges, PollRow};
use crate::db::store::PollStore;
use crate::error::PollError;
use crate::reconcile::{EditPollOption, plan_option_changes};
use crate::service::{CreatePollData, PollService};
use crate::sse::{EventSender, LiveEvent, publish};
use crate::validation;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePollData {
    #[serde(default)]
    pub id: Uuid,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub options: Vec<EditPollOption>,
    /// Absent keeps the stored status.
    #[serde(default)]
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ActionResponse<T> {
    pub fn with_data(data: T) -> Self {
        ActionResponse {
            success: true,
            data: Some(data),
        }
    }
}

impl ActionResponse<()> {
    pub fn ok() -> Self {
        ActionResponse {
            success: true,
            data: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollStatus {
    pub is_active: bool,
}

fn require_caller(caller: Option<Uuid>, message: &str) -> Result<Uuid, PollError> {
    caller.ok_or_else(|| PollError::Unauthenticated(message.to_string()))
}

#[derive(Clone)]
pub struct PollActions {
    service: PollService,
    store: Arc<dyn PollStore>,
    events: EventSender,
}

impl PollActions {
    pub fn new(service: PollService, store: Arc<dyn PollStore>, events: EventSender) -> Self {
        PollActions {
            service,
            store,
            events,
        }
    }

    /// Loads the poll and rejects callers other than its author.
    async fn owned_poll(&self, poll_id: Uuid, caller: Uuid, denied: &str) -> Result<PollRow, PollError> {
        let poll = self
            .store
            .get_poll(poll_id)
            .await?
            .ok_or(PollError::PollNotFound)?;

        if poll.author_id != caller {
            return Err(PollError::Unauthorized(denied.to_string()));
        }
        Ok(poll)
    }

    pub async fn create_poll(
        &self,
        caller: Option<Uuid>,
        data: CreatePollData,
    ) -> Result<ActionResponse<Poll>, PollError> {
        let user_id = require_caller(caller, "You must be logged in to create a poll")?;
        let data = validation::validate_new_poll(&data)?;

        let poll = self
            .service
            .create_poll(&data, user_id)
            .await
            .inspect_err(|e| error!("Error creating poll: {e}"))?;

        info!(poll_id = %poll.id, author_id = %user_id, "poll created");
        publish(
            &self.events,
            LiveEvent::PollCreated {
                poll_id: poll.id,
                title: poll.title.clone(),
                author_id: user_id,
            },
        );

        Ok(ActionResponse::with_data(poll))
    }

    /// Rewrites the poll fields and reconciles its options in one store
    /// transaction. Returns the poll as stored afterwards.
    pub async fn update_poll(
        &self,
        caller: Option<Uuid>,
        data: UpdatePollData,
    ) -> Result<ActionResponse<Poll>, PollError> {
        let user_id = require_caller(caller, "You must be logged in to update a poll")?;
        validation::validate_poll_update(&data)?;

        let poll = async {
            let stored = self
                .owned_poll(data.id, user_id, "You can only update your own polls")
                .await?;

            let plan = plan_option_changes(&data.options);
            let stored_ids: Vec<Uuid> = self
                .store
                .get_options(&[data.id])
                .await?
                .into_iter()
                .map(|o| o.id)
                .collect();
            validation::validate_against_stored(&plan, &stored_ids)?;

            let changes = PollChanges {
                title: data.title.trim().to_string(),
                description: data.description.trim().to_string(),
                is_active: data.is_active.unwrap_or(stored.is_active),
            };
            self.store.update_poll(data.id, &changes, &plan).await?;

            self.service
                .load_poll(data.id)
                .await?
                .ok_or(PollError::PollNotFound)
        }
        .await
        .inspect_err(|e| error!("Error updating poll: {e}"))?;

        publish(&self.events, LiveEvent::PollUpdated { poll_id: poll.id });
        Ok(ActionResponse::with_data(poll))
    }

    /// Any authenticated user may vote. A repeat vote replaces the earlier one.
    pub async fn vote_on_poll(
        &self,
        caller: Option<Uuid>,
        poll_id: Uuid,
        option_id: Uuid,
    ) -> Result<ActionResponse<()>, PollError> {
        let user_id = require_caller(caller, "You must be logged in to vote")?;

        self.service
            .vote(poll_id, option_id, user_id)
            .await
            .inspect_err(|e| error!("Error voting on poll: {e}"))?;

        publish(&self.events, LiveEvent::VoteCast { poll_id, option_id });
        Ok(ActionResponse::ok())
    }

    pub async fn delete_poll(
        &self,
        caller: Option<Uuid>,
        poll_id: Uuid,
    ) -> Result<ActionResponse<()>, PollError> {
        let user_id = require_caller(caller, "You must be logged in to delete a poll")?;

        async {
            self.owned_poll(poll_id, user_id, "You can only delete your own polls")
                .await?;
            self.store.delete_poll(poll_id).await?;
            Ok::<_, PollError>(())
        }
        .await
        .inspect_err(|e| error!("Error deleting poll: {e}"))?;

        info!(%poll_id, "poll deleted");
        publish(&self.events, LiveEvent::PollDeleted { poll_id });
        Ok(ActionResponse::ok())
    }

    pub async fn toggle_poll_status(
        &self,
        caller: Option<Uuid>,
        poll_id: Uuid,
    ) -> Result<ActionResponse<PollStatus>, PollError> {
        let user_id = require_caller(caller, "You must be logged in to modify a poll")?;

        let is_active = async {
            let was_active = self
                .owned_poll(poll_id, user_id, "You can only modify your own polls")
                .await?
                .is_active;
            self.store.set_poll_active(poll_id, !was_active).await?;
            Ok::<_, PollError>(!was_active)
        }
        .await
        .inspect_err(|e| error!("Error toggling poll status: {e}"))?;

        publish(
            &self.events,
            LiveEvent::PollStatusChanged { poll_id, is_active },
        );
        Ok(ActionResponse::with_data(PollStatus { is_active }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InMemoryStore;
    use crate::db::models::NewUser;
    use crate::db::store::UserStore;
    use crate::sse::create_event_broadcaster;

    struct Fixture {
        store: Arc<InMemoryStore>,
        actions: PollActions,
        events: EventSender,
        author: Uuid,
        other: Uuid,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(InMemoryStore::new());
        let events = create_event_broadcaster();
        let service = PollService::new(store.clone(), store.clone());
        let actions = PollActions::new(service, store.clone(), events.clone());

        let mut ids = Vec::new();
        for (name, email) in [("Ada", "ada@example.com"), ("Bob", "bob@example.com")] {
            let user = store
                .create_user(&NewUser {
                    name: name.into(),
                    email: email.into(),
                    password_hash: "hash".into(),
                })
                .await
                .unwrap();
            ids.push(user.id);
        }

        Fixture {
            store,
            actions,
            events,
            author: ids[0],
            other: ids[1],
        }
    }

    fn poll_input(options: &[&str]) -> CreatePollData {
        CreatePollData {
            title: "Team offsite".into(),
            description: "Pick a place for the offsite".into(),
            options: options.iter().map(|o| o.to_string()).collect(),
        }
    }

    async fn create(f: &Fixture, options: &[&str]) -> Poll {
        f.actions
            .create_poll(Some(f.author), poll_input(options))
            .await
            .unwrap()
            .data
            .unwrap()
    }

    fn edit_of(poll: &Poll) -> UpdatePollData {
        UpdatePollData {
            id: poll.id,
            title: poll.title.clone(),
            description: poll.description.clone(),
            options: poll
                .options
                .iter()
                .map(|o| EditPollOption {
                    id: Some(o.id),
                    text: o.text.clone(),
                    poll_id: Some(poll.id),
                    is_new: false,
                    is_deleted: false,
                })
                .collect(),
            is_active: None,
        }
    }

    #[tokio::test]
    async fn anonymous_caller_cannot_create() {
        let f = fixture().await;

        let err = f
            .actions
            .create_poll(None, poll_input(&["A", "B"]))
            .await
            .unwrap_err();

        assert!(matches!(err, PollError::Unauthenticated(_)));
        assert!(f.store.list_active_polls().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn create_rejects_single_valid_option() {
        let f = fixture().await;

        let err = f
            .actions
            .create_poll(Some(f.author), poll_input(&["A", "   "]))
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "You must have at least 2 valid options");
    }

    #[tokio::test]
    async fn update_edits_inserts_and_keeps_order() {
        let f = fixture().await;
        let poll = create(&f, &["A", "B"]).await;

        let mut edit = edit_of(&poll);
        edit.options[0].text = "A*".into();
        edit.options[1].text = "B*".into();
        edit.options.push(EditPollOption {
            text: "C".into(),
            is_new: true,
            ..Default::default()
        });

        let updated = f
            .actions
            .update_poll(Some(f.author), edit)
            .await
            .unwrap()
            .data
            .unwrap();

        let texts: Vec<&str> = updated.options.iter().map(|o| o.text.as_str()).collect();
        assert_eq!(texts, vec!["A*", "B*", "C"]);
        assert_eq!(updated.options[0].id, poll.options[0].id);
    }

    #[tokio::test]
    async fn update_by_someone_else_is_forbidden() {
        let f = fixture().await;
        let poll = create(&f, &["A", "B"]).await;

        let mut edit = edit_of(&poll);
        edit.title = "Hijacked".into();
        let err = f.actions.update_poll(Some(f.other), edit).await.unwrap_err();

        assert!(matches!(err, PollError::Unauthorized(_)));
        let stored = f.store.get_poll(poll.id).await.unwrap().unwrap();
        assert_eq!(stored.title, "Team offsite");
    }

    #[tokio::test]
    async fn update_of_missing_poll_is_not_found() {
        let f = fixture().await;
        let poll = create(&f, &["A", "B"]).await;

        let mut edit = edit_of(&poll);
        edit.id = Uuid::new_v4();
        let err = f.actions.update_poll(Some(f.author), edit).await.unwrap_err();

        assert!(matches!(err, PollError::PollNotFound));
    }

    #[tokio::test]
    async fn additions_do_not_replace_deleted_options() {
        let f = fixture().await;
        let poll = create(&f, &["A", "B"]).await;

        let mut edit = edit_of(&poll);
        edit.options[1].is_deleted = true;
        edit.options.push(EditPollOption {
            text: "C".into(),
            is_new: true,
            ..Default::default()
        });
        let err = f.actions.update_poll(Some(f.author), edit).await.unwrap_err();

        assert!(matches!(err, PollError::Validation(_)));
        assert_eq!(f.store.get_options(&[poll.id]).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn option_id_from_elsewhere_is_rejected() {
        let f = fixture().await;
        let poll = create(&f, &["A", "B"]).await;
        let other_poll = create(&f, &["X", "Y"]).await;

        let mut edit = edit_of(&poll);
        edit.options[1].is_deleted = true;
        edit.options.push(EditPollOption {
            id: Some(Uuid::new_v4()),
            text: "ghost".into(),
            ..Default::default()
        });
        let err = f.actions.update_poll(Some(f.author), edit).await.unwrap_err();
        assert_eq!(err.to_string(), "One or more options do not belong to this poll");

        let mut edit = edit_of(&poll);
        edit.options[0].id = Some(other_poll.options[0].id);
        let err = f.actions.update_poll(Some(f.author), edit).await.unwrap_err();
        assert!(matches!(err, PollError::Validation(_)));

        let texts: Vec<String> = f
            .store
            .get_options(&[poll.id, other_poll.id])
            .await
            .unwrap()
            .into_iter()
            .map(|o| o.text)
            .collect();
        assert_eq!(texts.len(), 4);
        assert!(!texts.contains(&"ghost".to_string()));
    }

    #[tokio::test]
    async fn options_left_out_of_the_edit_count_towards_the_limit() {
        let f = fixture().await;
        let labels: Vec<String> = (0..10).map(|i| format!("Option {i}")).collect();
        let refs: Vec<&str> = labels.iter().map(String::as_str).collect();
        let poll = create(&f, &refs).await;

        let mut edit = edit_of(&poll);
        edit.options.truncate(2);
        edit.options.push(EditPollOption {
            text: "Eleventh".into(),
            is_new: true,
            ..Default::default()
        });
        let err = f.actions.update_poll(Some(f.author), edit).await.unwrap_err();

        assert!(err.to_string().contains("at most 10"));
    }

    #[tokio::test]
    async fn edit_without_status_keeps_a_closed_poll_closed() {
        let f = fixture().await;
        let poll = create(&f, &["A", "B"]).await;
        f.actions
            .toggle_poll_status(Some(f.author), poll.id)
            .await
            .unwrap();

        let mut edit = edit_of(&poll);
        edit.title = "Team offsite 2".into();
        let updated = f
            .actions
            .update_poll(Some(f.author), edit)
            .await
            .unwrap()
            .data
            .unwrap();
        assert!(!updated.is_active);
        assert_eq!(updated.title, "Team offsite 2");

        let mut edit = edit_of(&poll);
        edit.is_active = Some(true);
        let reopened = f
            .actions
            .update_poll(Some(f.author), edit)
            .await
            .unwrap()
            .data
            .unwrap();
        assert!(reopened.is_active);
    }

    #[tokio::test]
    async fn deleting_an_option_drops_its_votes() {
        let f = fixture().await;
        let poll = create(&f, &["A", "B", "C"]).await;
        f.actions
            .vote_on_poll(Some(f.other), poll.id, poll.options[2].id)
            .await
            .unwrap();

        let mut edit = edit_of(&poll);
        edit.options[2].is_deleted = true;
        let updated = f
            .actions
            .update_poll(Some(f.author), edit)
            .await
            .unwrap()
            .data
            .unwrap();

        assert_eq!(updated.options.len(), 2);
        assert_eq!(updated.total_votes, 0);
        assert!(f.store.get_votes(&[poll.id]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_removes_poll_options_and_votes() {
        let f = fixture().await;
        let poll = create(&f, &["A", "B"]).await;
        f.actions
            .vote_on_poll(Some(f.other), poll.id, poll.options[0].id)
            .await
            .unwrap();

        let denied = f.actions.delete_poll(Some(f.other), poll.id).await.unwrap_err();
        assert!(matches!(denied, PollError::Unauthorized(_)));

        f.actions.delete_poll(Some(f.author), poll.id).await.unwrap();

        assert!(f.store.get_poll(poll.id).await.unwrap().is_none());
        assert!(f.store.get_options(&[poll.id]).await.unwrap().is_empty());
        assert!(f.store.get_votes(&[poll.id]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn toggle_flips_active_flag_twice() {
        let f = fixture().await;
        let poll = create(&f, &["A", "B"]).await;

        let first = f
            .actions
            .toggle_poll_status(Some(f.author), poll.id)
            .await
            .unwrap();
        assert_eq!(first.data, Some(PollStatus { is_active: false }));
        assert!(!f.store.get_poll(poll.id).await.unwrap().unwrap().is_active);

        let second = f
            .actions
            .toggle_poll_status(Some(f.author), poll.id)
            .await
            .unwrap();
        assert_eq!(second.data, Some(PollStatus { is_active: true }));
    }

    #[tokio::test]
    async fn vote_requires_login() {
        let f = fixture().await;
        let poll = create(&f, &["A", "B"]).await;

        let err = f
            .actions
            .vote_on_poll(None, poll.id, poll.options[0].id)
            .await
            .unwrap_err();

        assert!(matches!(err, PollError::Unauthenticated(_)));
    }

    #[tokio::test]
    async fn actions_publish_events_in_order() {
        let f = fixture().await;
        let mut rx = f.events.subscribe();

        let poll = create(&f, &["A", "B"]).await;
        f.actions
            .vote_on_poll(Some(f.other), poll.id, poll.options[1].id)
            .await
            .unwrap();
        f.actions
            .toggle_poll_status(Some(f.author), poll.id)
            .await
            .unwrap();
        f.actions.delete_poll(Some(f.author), poll.id).await.unwrap();

        let names: Vec<&str> = (0..4).map(|_| rx.try_recv().unwrap().name()).collect();
        assert_eq!(
            names,
            vec!["poll_created", "vote_cast", "poll_status_changed", "poll_deleted"]
        );
    }

    #[tokio::test]
    async fn failed_action_publishes_nothing() {
        let f = fixture().await;
        let poll = create(&f, &["A", "B"]).await;
        let mut rx = f.events.subscribe();

        let _ = f.actions.delete_poll(Some(f.other), poll.id).await;

        assert!(rx.try_recv().is_err());
    }
}
