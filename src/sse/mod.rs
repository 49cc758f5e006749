pub mod models;
pub use models::*;

mod sse_broadcaster;
pub use sse_broadcaster::*;

mod live_events_sse;
mod poll_updates_sse;

pub use live_events_sse::live_events_sse;
pub use poll_updates_sse::poll_updates_sse;
