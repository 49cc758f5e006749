use crate::sse::models::{EventSender, LiveEvent};
use tokio::sync::broadcast;
use tracing::debug;

pub fn create_event_broadcaster() -> EventSender {
    let (tx, _rx) = broadcast::channel(100);
    tx
}

/// Sends `event` to every open stream. Having no subscribers is not an error.
pub fn publish(sender: &EventSender, event: LiveEvent) {
    debug!(
        event = event.name(),
        poll_id = %event.poll_id(),
        paths = ?event.invalidated_paths(),
        "invalidating pages"
    );
    let _ = sender.send(event);
}
