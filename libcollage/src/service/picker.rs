//! Photo picker boundary
//!
//! A picker is the external selection surface opened by the "add" action.
//! Opening it yields a [`PickerSession`]: a stream of [`PickerEvent`]s and a
//! separate count-changed signal. The event stream ends when the picker goes
//! away.
//!
//! [`ChannelPicker`] is a picker driven programmatically through a
//! [`PickerHandle`]. Tests use it to script sessions, and the CLI uses it to
//! feed photos loaded from disk.

use std::sync::{Arc, Mutex};

use futures::stream::{self, BoxStream, StreamExt};
use tokio::sync::{mpsc, watch};
use tracing::debug;

use crate::types::Photo;

#[derive(Debug, Clone)]
pub enum PickerEvent {
    /// The user chose a photo
    Picked(Photo),
    /// The user closed the picker
    Dismissed,
}

/// Output of one opened picker
pub struct PickerSession {
    pub events: BoxStream<'static, PickerEvent>,
    /// Number of photos the user has chosen so far in this picker
    pub selected_count: watch::Receiver<usize>,
}

pub trait PhotoPicker: Send + Sync {
    /// Open the selection surface
    ///
    /// `capacity_hint` is how many more photos the selection can take. It is
    /// advisory; the merge flow enforces the limit regardless.
    fn open(&self, capacity_hint: usize) -> PickerSession;
}

enum Message {
    Event(PickerEvent),
    End,
}

/// Drives a [`ChannelPicker`] session
#[derive(Clone)]
pub struct PickerHandle {
    sender: mpsc::UnboundedSender<Message>,
    count: Arc<watch::Sender<usize>>,
}

impl PickerHandle {
    /// Choose `photo`. Returns false once the session is no longer consumed.
    pub fn pick(&self, photo: Photo) -> bool {
        let delivered = self
            .sender
            .send(Message::Event(PickerEvent::Picked(photo)))
            .is_ok();
        if delivered {
            self.count.send_modify(|count| *count += 1);
        }
        delivered
    }

    /// Close the picker as the user would
    pub fn dismiss(&self) -> bool {
        self.sender
            .send(Message::Event(PickerEvent::Dismissed))
            .is_ok()
    }

    /// End the event stream without a dismissal
    pub fn finish(&self) -> bool {
        self.sender.send(Message::End).is_ok()
    }

    /// True once the session's consumer has stopped reading
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// Picker whose sessions are scripted through [`PickerHandle`]s
#[derive(Default)]
pub struct ChannelPicker {
    current: Mutex<Option<(PickerHandle, usize)>>,
}

impl ChannelPicker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle of the most recently opened session
    pub fn handle(&self) -> Option<PickerHandle> {
        self.lock().as_ref().map(|(handle, _)| handle.clone())
    }

    /// Capacity hint passed to the most recent `open`
    pub fn last_capacity_hint(&self) -> Option<usize> {
        self.lock().as_ref().map(|(_, hint)| *hint)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<(PickerHandle, usize)>> {
        self.current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl PhotoPicker for ChannelPicker {
    fn open(&self, capacity_hint: usize) -> PickerSession {
        let (sender, receiver) = mpsc::unbounded_channel();
        let (count, selected_count) = watch::channel(0);
        let handle = PickerHandle {
            sender,
            count: Arc::new(count),
        };
        debug!(capacity_hint, "Picker opened");
        *self.lock() = Some((handle, capacity_hint));

        let events = stream::unfold(receiver, |mut receiver| async move {
            match receiver.recv().await? {
                Message::Event(event) => Some((event, receiver)),
                Message::End => None,
            }
        })
        .boxed();

        PickerSession {
            events,
            selected_count,
        }
    }
}
