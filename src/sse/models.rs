use serde::Serialize;
use serde_json::{Value, json};
use uuid::Uuid;

/// A change that makes rendered poll pages stale.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LiveEvent {
    #[serde(rename_all = "camelCase")]
    PollCreated {
        poll_id: Uuid,
        title: String,
        author_id: Uuid,
    },
    #[serde(rename_all = "camelCase")]
    PollUpdated { poll_id: Uuid },
    #[serde(rename_all = "camelCase")]
    PollDeleted { poll_id: Uuid },
    #[serde(rename_all = "camelCase")]
    PollStatusChanged { poll_id: Uuid, is_active: bool },
    #[serde(rename_all = "camelCase")]
    VoteCast { poll_id: Uuid, option_id: Uuid },
}

impl LiveEvent {
    pub fn name(&self) -> &'static str {
        match self {
            LiveEvent::PollCreated { .. } => "poll_created",
            LiveEvent::PollUpdated { .. } => "poll_updated",
            LiveEvent::PollDeleted { .. } => "poll_deleted",
            LiveEvent::PollStatusChanged { .. } => "poll_status_changed",
            LiveEvent::VoteCast { .. } => "vote_cast",
        }
    }

    pub fn poll_id(&self) -> Uuid {
        match self {
            LiveEvent::PollCreated { poll_id, .. }
            | LiveEvent::PollUpdated { poll_id }
            | LiveEvent::PollDeleted { poll_id }
            | LiveEvent::PollStatusChanged { poll_id, .. }
            | LiveEvent::VoteCast { poll_id, .. } => *poll_id,
        }
    }

    /// Pages that display data touched by this event.
    pub fn invalidated_paths(&self) -> Vec<String> {
        let detail = format!("/polls/{}", self.poll_id());
        match self {
            LiveEvent::PollCreated { .. } | LiveEvent::PollDeleted { .. } => {
                vec!["/polls".to_string(), "/dashboard".to_string()]
            }
            LiveEvent::VoteCast { .. } => vec![detail, "/polls".to_string()],
            LiveEvent::PollUpdated { .. } | LiveEvent::PollStatusChanged { .. } => {
                vec!["/polls".to_string(), "/dashboard".to_string(), detail]
            }
        }
    }

    /// SSE payload: the event fields plus the invalidated paths.
    pub fn to_payload(&self) -> Value {
        let mut payload = serde_json::to_value(self).unwrap_or_else(|_| json!({}));
        if let Value::Object(map) = &mut payload {
            map.insert("pollId".to_string(), json!(self.poll_id()));
            map.insert("paths".to_string(), json!(self.invalidated_paths()));
        }
        payload
    }
}

pub type EventSender = tokio::sync::broadcast::Sender<LiveEvent>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vote_invalidates_detail_then_list() {
        let poll_id = Uuid::new_v4();
        let event = LiveEvent::VoteCast {
            poll_id,
            option_id: Uuid::new_v4(),
        };
        assert_eq!(
            event.invalidated_paths(),
            vec![format!("/polls/{poll_id}"), "/polls".to_string()]
        );
    }

    #[test]
    fn create_and_delete_invalidate_list_and_dashboard() {
        let created = LiveEvent::PollCreated {
            poll_id: Uuid::new_v4(),
            title: "t".into(),
            author_id: Uuid::new_v4(),
        };
        let deleted = LiveEvent::PollDeleted {
            poll_id: Uuid::new_v4(),
        };
        for event in [created, deleted] {
            assert_eq!(event.invalidated_paths(), vec!["/polls", "/dashboard"]);
        }
    }

    #[test]
    fn payload_carries_type_poll_id_and_paths() {
        let poll_id = Uuid::new_v4();
        let payload = LiveEvent::PollStatusChanged {
            poll_id,
            is_active: false,
        }
        .to_payload();

        assert_eq!(payload["type"], "poll_status_changed");
        assert_eq!(payload["isActive"], false);
        assert_eq!(payload["pollId"], json!(poll_id));
        assert_eq!(payload["paths"].as_array().map(Vec::len), Some(3));
    }
}
