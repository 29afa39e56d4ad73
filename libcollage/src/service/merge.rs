//! Selection merge flow
//!
//! Bridges one picker session into the selection store. Each incoming pick
//! is checked against the store's *current* length at the moment it arrives;
//! earlier picks of the same session change that length, so the limit can
//! never be checked once up front. The first pick that no longer fits ends
//! the session and the picker stream is dropped, not merely skipped.
//!
//! Once the session has ended for any reason, the flow waits for the settle
//! delay and then re-renders the screen from the store. This gives the
//! picker's own dismissal time to finish before the title and buttons jump.
//!
//! ```text
//! Idle -> Streaming -> Ended(Exhausted | Dismissed | CapacityReached) -> Settled
//! ```

use std::time::Duration;

use futures::stream::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info};

use super::picker::{PickerEvent, PickerSession};
use super::view_model::ScreenOutputs;
use crate::store::SelectionStore;
use crate::types::MAX_PHOTOS;

/// Why a session stopped consuming picks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionEnd {
    /// The picker stream ended on its own
    Exhausted,
    /// The user closed the picker
    Dismissed,
    /// The selection is full
    CapacityReached,
}

/// Result of a settled session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settled {
    pub end: SessionEnd,
    /// Photos appended to the store by this session
    pub appended: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Streaming,
    Ended(SessionEnd),
    Settled(Settled),
}

/// Observes the state of one running session
#[derive(Clone)]
pub struct SessionHandle {
    state: watch::Receiver<SessionState>,
}

impl SessionHandle {
    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Wait for the session to settle
    ///
    /// Returns `None` if the session was cancelled before settling.
    pub async fn settled(mut self) -> Option<Settled> {
        loop {
            if let SessionState::Settled(settled) = *self.state.borrow_and_update() {
                return Some(settled);
            }
            if self.state.changed().await.is_err() {
                return None;
            }
        }
    }
}

/// One picker session merging into the store
pub struct SelectionMergeFlow {
    store: SelectionStore,
    outputs: ScreenOutputs,
    settle_delay: Duration,
    state: watch::Sender<SessionState>,
}

impl SelectionMergeFlow {
    pub fn new(store: SelectionStore, outputs: ScreenOutputs, settle_delay: Duration) -> Self {
        let (state, _) = watch::channel(SessionState::Idle);
        Self {
            store,
            outputs,
            settle_delay,
            state,
        }
    }

    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            state: self.state.subscribe(),
        }
    }

    /// Drive the session to settlement
    ///
    /// While picks are flowing, every non-zero picker count is shown as the
    /// screen title. Cancelling the returned future leaves the store with
    /// whatever had been appended so far and skips the settlement refresh.
    pub async fn run(self, session: PickerSession) -> Settled {
        let PickerSession {
            events,
            selected_count,
        } = session;

        self.state.send_replace(SessionState::Streaming);

        let merging = self.merge(events);
        let counting = report_selected_count(selected_count, self.outputs.clone());
        tokio::pin!(merging, counting);

        let (end, appended) = tokio::select! {
            biased;
            merged = &mut merging => merged,
            _ = &mut counting => merging.await,
        };

        self.state.send_replace(SessionState::Ended(end));
        debug!(?end, appended, "Picker session ended");

        tokio::time::sleep(self.settle_delay).await;
        self.outputs.render(&self.store.current_snapshot());

        let settled = Settled { end, appended };
        self.state.send_replace(SessionState::Settled(settled));
        info!(?end, appended, total = self.store.len(), "Picker session settled");
        settled
    }

    /// Append accepted picks until the session ends
    async fn merge<S>(&self, mut events: S) -> (SessionEnd, usize)
    where
        S: Stream<Item = PickerEvent> + Unpin,
    {
        let mut appended = 0;
        loop {
            if !self.has_capacity() {
                return (SessionEnd::CapacityReached, appended);
            }

            let photo = match events.next().await {
                Some(PickerEvent::Picked(photo)) => photo,
                Some(PickerEvent::Dismissed) => return (SessionEnd::Dismissed, appended),
                None => return (SessionEnd::Exhausted, appended),
            };

            // The store may have filled up while waiting for this pick
            if !self.store.try_append(photo) {
                return (SessionEnd::CapacityReached, appended);
            }
            appended += 1;
        }
    }

    fn has_capacity(&self) -> bool {
        self.store.len() < MAX_PHOTOS
    }
}

/// Mirror the picker's running count into the title while it is non-zero
async fn report_selected_count(mut selected_count: watch::Receiver<usize>, outputs: ScreenOutputs) {
    loop {
        let count = *selected_count.borrow_and_update();
        if count > 0 {
            outputs.set_title(format!("Selected {} photos", count));
        }
        if selected_count.changed().await.is_err() {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::picker::{ChannelPicker, PhotoPicker};
    use crate::types::Photo;

    fn photo() -> Photo {
        Photo::solid(1, 1, [0, 0, 0, 255])
    }

    fn flow(store: &SelectionStore) -> SelectionMergeFlow {
        SelectionMergeFlow::new(store.clone(), ScreenOutputs::new(), Duration::ZERO)
    }

    #[tokio::test]
    async fn test_exhausted_session_appends_everything() {
        let store = SelectionStore::new();
        let picker = ChannelPicker::new();
        let session = picker.open(MAX_PHOTOS);
        let handle = picker.handle().unwrap();
        handle.pick(photo());
        handle.pick(photo());
        handle.finish();

        let settled = flow(&store).run(session).await;

        assert_eq!(settled.end, SessionEnd::Exhausted);
        assert_eq!(settled.appended, 2);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_dismissal_stops_consuming() {
        let store = SelectionStore::new();
        let picker = ChannelPicker::new();
        let session = picker.open(MAX_PHOTOS);
        let handle = picker.handle().unwrap();
        handle.pick(photo());
        handle.dismiss();
        handle.pick(photo());

        let settled = flow(&store).run(session).await;

        assert_eq!(settled.end, SessionEnd::Dismissed);
        assert_eq!(store.len(), 1);
        assert!(handle.is_closed());
    }

    #[tokio::test]
    async fn test_full_store_ends_session_without_reading() {
        let store = SelectionStore::new();
        for _ in 0..MAX_PHOTOS {
            store.append(photo());
        }
        let picker = ChannelPicker::new();
        let session = picker.open(0);
        let handle = picker.handle().unwrap();
        handle.pick(photo());

        let settled = flow(&store).run(session).await;

        assert_eq!(settled.end, SessionEnd::CapacityReached);
        assert_eq!(settled.appended, 0);
        assert_eq!(store.len(), MAX_PHOTOS);
    }

    #[tokio::test]
    async fn test_handle_reports_states() {
        let store = SelectionStore::new();
        let picker = ChannelPicker::new();
        let session = picker.open(MAX_PHOTOS);
        let merge = flow(&store);
        let handle = merge.handle();
        assert_eq!(handle.state(), SessionState::Idle);

        picker.handle().unwrap().finish();
        let settled = merge.run(session).await;

        assert_eq!(handle.state(), SessionState::Settled(settled));
        assert_eq!(handle.settled().await, Some(settled));
    }

    #[tokio::test]
    async fn test_settled_is_none_when_cancelled() {
        let store = SelectionStore::new();
        let picker = ChannelPicker::new();
        let session = picker.open(MAX_PHOTOS);
        let merge = flow(&store);
        let handle = merge.handle();

        let task = tokio::spawn(merge.run(session));
        task.abort();

        assert_eq!(handle.settled().await, None);
    }

    #[tokio::test]
    async fn test_picker_count_becomes_title() {
        let store = SelectionStore::new();
        let outputs = ScreenOutputs::new();
        let picker = ChannelPicker::new();
        let session = picker.open(MAX_PHOTOS);
        let handle = picker.handle().unwrap();
        let mut titles = outputs.subscribe_state();

        let merge = SelectionMergeFlow::new(store.clone(), outputs.clone(), Duration::from_secs(60));
        let task = tokio::spawn(merge.run(session));

        handle.pick(photo());
        handle.pick(photo());
        loop {
            titles.changed().await.unwrap();
            if titles.borrow_and_update().title == "Selected 2 photos" {
                break;
            }
        }

        task.abort();
    }
}
