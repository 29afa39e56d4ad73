//! Selection store
//!
//! The single source of truth for the selected-photo sequence. The store is a
//! plain value cell on top of a `tokio::sync::watch` channel: mutations swap in
//! a new immutable [`Selection`], readers either take the current snapshot
//! synchronously or observe a stream that replays the current value first.
//!
//! The store never rejects an [`append`](SelectionStore::append). Keeping the
//! sequence within [`MAX_PHOTOS`](crate::types::MAX_PHOTOS) is the job of the
//! caller (see [`merge`](crate::service::merge)), which uses
//! [`try_append`](SelectionStore::try_append) to check and append in one step.
//!
//! Change listeners registered with [`on_change`](SelectionStore::on_change)
//! run synchronously inside every mutation, so state derived through them is
//! already up to date when `append` or `reset` returns.
//!
//! # Example
//!
//! ```
//! use futures::StreamExt;
//! use libcollage::store::SelectionStore;
//! use libcollage::types::Photo;
//!
//! # async fn example() {
//! let store = SelectionStore::new();
//! let mut snapshots = store.observe();
//!
//! store.append(Photo::solid(10, 10, [255, 0, 0, 255]));
//!
//! // The first item is whatever the store holds when polled
//! let first = snapshots.next().await.unwrap();
//! assert_eq!(first.len(), 1);
//! # }
//! ```

use std::sync::{Arc, Mutex};

use futures::stream::{self, BoxStream, StreamExt};
use tokio::sync::watch;
use tracing::debug;

use crate::types::{Photo, Selection};

/// Stream of store snapshots
pub type SnapshotStream = BoxStream<'static, Selection>;

type Listener = Box<dyn Fn(&Selection) + Send + Sync>;

/// Owned handle to the selected-photo sequence
///
/// Clones share the same underlying sequence.
#[derive(Clone)]
pub struct SelectionStore {
    sender: Arc<watch::Sender<Selection>>,
    listeners: Arc<Mutex<Vec<Listener>>>,
}

impl SelectionStore {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(Selection::empty());
        Self {
            sender: Arc::new(sender),
            listeners: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Call `listener` with the new snapshot on every mutation
    ///
    /// Listeners run while the mutation is in progress, in mutation order.
    /// They must not call back into the store.
    pub fn on_change(&self, listener: impl Fn(&Selection) + Send + Sync + 'static) {
        self.listeners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(Box::new(listener));
    }

    fn notify(&self, selection: &Selection) {
        let listeners = self
            .listeners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        for listener in listeners.iter() {
            listener(selection);
        }
    }

    /// Current snapshot, available synchronously
    pub fn current_snapshot(&self) -> Selection {
        self.sender.borrow().clone()
    }

    /// Number of photos currently selected
    pub fn len(&self) -> usize {
        self.sender.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Live stream of snapshots
    ///
    /// Each call returns an independent stream that first yields the current
    /// snapshot and then every later one. Snapshots replaced before the
    /// stream is polled are skipped; the stream always catches up to the
    /// latest value. It ends only when every store handle has been dropped.
    pub fn observe(&self) -> SnapshotStream {
        let receiver = self.sender.subscribe();
        stream::unfold((receiver, true), |(mut receiver, first)| async move {
            if !first && receiver.changed().await.is_err() {
                return None;
            }
            let snapshot = receiver.borrow_and_update().clone();
            Some((snapshot, (receiver, false)))
        })
        .boxed()
    }

    /// Empty the selection
    ///
    /// Resetting an already empty store publishes nothing.
    pub fn reset(&self) {
        let changed = self.sender.send_if_modified(|selection| {
            if selection.is_empty() {
                return false;
            }
            *selection = selection.cleared();
            self.notify(selection);
            true
        });
        if changed {
            debug!("Selection cleared");
        }
    }

    /// Replace the selection with `current + [photo]`
    pub fn append(&self, photo: Photo) {
        self.sender.send_modify(|selection| {
            *selection = selection.appended(photo);
            self.notify(selection);
            debug!(count = selection.len(), "Photo appended to selection");
        });
    }

    /// Append `photo` only if the selection is below [`MAX_PHOTOS`](crate::types::MAX_PHOTOS)
    ///
    /// The length check and the append happen under the same lock, so
    /// concurrent callers can never push the selection past the limit.
    /// Returns false, publishing nothing, when the selection is full.
    pub fn try_append(&self, photo: Photo) -> bool {
        self.sender.send_if_modified(|selection| {
            if selection.is_full() {
                return false;
            }
            *selection = selection.appended(photo);
            self.notify(selection);
            debug!(count = selection.len(), "Photo appended to selection");
            true
        })
    }
}

impl Default for SelectionStore {
    fn default() -> Self {
        Self::new()
    }
}
