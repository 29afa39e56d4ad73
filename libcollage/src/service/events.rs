//! Screen event bus
//!
//! Broadcasts what happened on a [`CollageScreen`](super::CollageScreen) to
//! any number of listeners (the CLI, logs, tests). Emitting never blocks;
//! with no subscribers the event is simply dropped, and a lagging subscriber
//! loses the oldest events first.
//!
//! ```
//! use libcollage::service::events::{EventBus, ScreenEvent};
//!
//! # async fn example() {
//! let bus = EventBus::new(16);
//! let mut receiver = bus.subscribe();
//!
//! bus.emit(ScreenEvent::SelectionCleared);
//! assert_eq!(receiver.recv().await.unwrap(), ScreenEvent::SelectionCleared);
//! # }
//! ```

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use super::merge::SessionEnd;
use crate::error::SaveErrorKind;

pub type EventReceiver = broadcast::Receiver<ScreenEvent>;

#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ScreenEvent>,
}

impl EventBus {
    /// `capacity` is the per-subscriber buffer before lagging drops events
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> EventReceiver {
        self.sender.subscribe()
    }

    pub fn emit(&self, event: ScreenEvent) {
        // Err only means nobody is listening
        let _ = self.sender.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScreenEvent {
    /// A picker session was opened
    SessionStarted {
        /// How many more photos the selection could take
        capacity: usize,
    },

    /// A picker session ended and its settlement refresh ran
    SessionSettled {
        end: SessionEnd,
        /// Photos added to the selection during the session
        appended: usize,
    },

    /// The collage was written to the library
    Saved { id: String },

    /// Saving failed; `error` is the text shown to the user
    SaveFailed { kind: SaveErrorKind, error: String },

    SelectionCleared,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_multiple_subscribers_receive_event() {
        let bus = EventBus::new(10);
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();

        bus.emit(ScreenEvent::Saved {
            id: "ABC123".to_string(),
        });

        let expected = ScreenEvent::Saved {
            id: "ABC123".to_string(),
        };
        assert_eq!(first.recv().await.unwrap(), expected);
        assert_eq!(second.recv().await.unwrap(), expected);
    }

    #[test]
    fn test_emit_without_subscribers() {
        let bus = EventBus::new(10);

        bus.emit(ScreenEvent::SelectionCleared);

        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_events_arrive_in_order() {
        let bus = EventBus::new(10);
        let mut receiver = bus.subscribe();

        bus.emit(ScreenEvent::SessionStarted { capacity: 6 });
        bus.emit(ScreenEvent::SessionSettled {
            end: SessionEnd::CapacityReached,
            appended: 6,
        });

        assert!(matches!(
            receiver.recv().await.unwrap(),
            ScreenEvent::SessionStarted { capacity: 6 }
        ));
        assert!(matches!(
            receiver.recv().await.unwrap(),
            ScreenEvent::SessionSettled { appended: 6, .. }
        ));
    }

    #[test]
    fn test_event_serialization() {
        let event = ScreenEvent::SaveFailed {
            kind: SaveErrorKind::CouldNotSave,
            error: "Could not save photo".to_string(),
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"save_failed\""));
        assert!(json.contains("\"kind\":\"could_not_save\""));
        assert!(json.contains("Could not save photo"));

        let back: ScreenEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_session_end_serializes_snake_case() {
        let event = ScreenEvent::SessionSettled {
            end: SessionEnd::CapacityReached,
            appended: 2,
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("capacity_reached"));
    }
}
