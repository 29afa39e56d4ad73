//! Confirmation prompt
//!
//! Presents a modal message with a single "Close" action and resolves once
//! the user acknowledges it. The returned [`Confirmation`] owns the modal:
//! dropping it before the user acts dismisses the modal immediately, so a
//! torn-down screen never leaves an orphaned prompt behind.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use libcollage::service::prompt::{Prompter, RecordingPresenter};
//!
//! let presenter = Arc::new(RecordingPresenter::new());
//! let prompter = Prompter::new(presenter.clone());
//!
//! let confirmation = prompter.prompt("Saved with id: ABC123", None);
//! assert_eq!(presenter.visible().len(), 1);
//!
//! drop(confirmation);
//! assert!(presenter.visible().is_empty());
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use tokio::sync::oneshot;
use tracing::debug;

use crate::error::PromptError;

/// Label of the single action every prompt carries
pub const CLOSE_ACTION: &str = "Close";

/// Identifies one presented modal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModalId(u64);

/// Content of a modal prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub title: String,
    pub message: Option<String>,
    pub action: String,
}

/// Handle the presenter fires when the user taps the modal's action
#[derive(Debug)]
pub struct Acknowledge {
    sender: oneshot::Sender<()>,
}

impl Acknowledge {
    /// Resolve the prompt. Returns false if nobody is waiting any more.
    pub fn acknowledge(self) -> bool {
        self.sender.send(()).is_ok()
    }
}

/// UI boundary that actually shows modals
pub trait ModalPresenter: Send + Sync {
    /// Show `alert`; call `acknowledge` when the user taps its action
    fn present(&self, id: ModalId, alert: Alert, acknowledge: Acknowledge);

    /// Remove the modal without user interaction
    fn dismiss(&self, id: ModalId);
}

/// Creates confirmation prompts on a presenter
#[derive(Clone)]
pub struct Prompter {
    presenter: Arc<dyn ModalPresenter>,
    next_id: Arc<AtomicU64>,
}

impl Prompter {
    pub fn new(presenter: Arc<dyn ModalPresenter>) -> Self {
        Self {
            presenter,
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Present a modal and return its one-shot result
    ///
    /// The modal is shown right away; awaiting the confirmation only waits
    /// for the user.
    pub fn prompt(&self, title: &str, message: Option<&str>) -> Confirmation {
        let id = ModalId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (sender, receiver) = oneshot::channel();
        let alert = Alert {
            title: title.to_string(),
            message: message.map(str::to_string),
            action: CLOSE_ACTION.to_string(),
        };

        debug!(modal = id.0, title = %alert.title, "Presenting prompt");
        self.presenter.present(id, alert, Acknowledge { sender });

        Confirmation {
            id,
            receiver,
            presenter: Arc::clone(&self.presenter),
            settled: false,
        }
    }
}

/// One-shot result of a prompt
///
/// Resolves to `Ok(())` when the user acknowledges, or
/// `Err(PromptError::Abandoned)` if the presenter dropped the modal's action
/// handle. Dropping an unresolved confirmation dismisses the modal.
#[must_use = "dropping a confirmation dismisses its prompt"]
pub struct Confirmation {
    id: ModalId,
    receiver: oneshot::Receiver<()>,
    presenter: Arc<dyn ModalPresenter>,
    settled: bool,
}

impl Confirmation {
    pub fn id(&self) -> ModalId {
        self.id
    }
}

impl Future for Confirmation {
    type Output = Result<(), PromptError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if self.settled {
            return Poll::Ready(Err(PromptError::Abandoned));
        }
        match Pin::new(&mut self.receiver).poll(cx) {
            Poll::Ready(result) => {
                self.settled = true;
                Poll::Ready(result.map_err(|_| PromptError::Abandoned))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for Confirmation {
    fn drop(&mut self) {
        if !self.settled {
            debug!(modal = self.id.0, "Prompt cancelled, dismissing");
            self.presenter.dismiss(self.id);
        }
    }
}

/// State of a modal tracked by [`RecordingPresenter`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModalState {
    Visible,
    Acknowledged,
    Dismissed,
}

struct RecordedModal {
    id: ModalId,
    alert: Alert,
    state: ModalState,
    acknowledge: Option<Acknowledge>,
}

/// Presenter that records modals instead of drawing them
///
/// Used by tests and headless drivers. With auto-acknowledge enabled every
/// modal is acknowledged as soon as it is presented.
#[derive(Default)]
pub struct RecordingPresenter {
    modals: Mutex<Vec<RecordedModal>>,
    auto_acknowledge: bool,
}

impl RecordingPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn auto_acknowledging() -> Self {
        Self {
            modals: Mutex::new(Vec::new()),
            auto_acknowledge: true,
        }
    }

    fn with_modals<T>(&self, f: impl FnOnce(&mut Vec<RecordedModal>) -> T) -> T {
        let mut modals = self.modals.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut modals)
    }

    /// Every alert ever presented, in order
    pub fn presented(&self) -> Vec<Alert> {
        self.with_modals(|modals| modals.iter().map(|m| m.alert.clone()).collect())
    }

    /// Alerts currently on screen
    pub fn visible(&self) -> Vec<Alert> {
        self.with_modals(|modals| {
            modals
                .iter()
                .filter(|m| m.state == ModalState::Visible)
                .map(|m| m.alert.clone())
                .collect()
        })
    }

    pub fn state_of(&self, id: ModalId) -> Option<ModalState> {
        self.with_modals(|modals| modals.iter().find(|m| m.id == id).map(|m| m.state))
    }

    /// Simulate the user tapping the action of modal `id`
    pub fn acknowledge(&self, id: ModalId) -> bool {
        let handle = self.with_modals(|modals| {
            let modal = modals
                .iter_mut()
                .find(|m| m.id == id && m.state == ModalState::Visible)?;
            modal.state = ModalState::Acknowledged;
            modal.acknowledge.take()
        });
        handle.map(Acknowledge::acknowledge).unwrap_or(false)
    }

    /// Acknowledge the most recently presented visible modal
    pub fn acknowledge_latest(&self) -> bool {
        let latest = self.with_modals(|modals| {
            modals
                .iter()
                .rev()
                .find(|m| m.state == ModalState::Visible)
                .map(|m| m.id)
        });
        latest.map(|id| self.acknowledge(id)).unwrap_or(false)
    }
}

impl ModalPresenter for RecordingPresenter {
    fn present(&self, id: ModalId, alert: Alert, acknowledge: Acknowledge) {
        if self.auto_acknowledge {
            self.with_modals(|modals| {
                modals.push(RecordedModal {
                    id,
                    alert,
                    state: ModalState::Acknowledged,
                    acknowledge: None,
                })
            });
            acknowledge.acknowledge();
            return;
        }

        self.with_modals(|modals| {
            modals.push(RecordedModal {
                id,
                alert,
                state: ModalState::Visible,
                acknowledge: Some(acknowledge),
            })
        });
    }

    fn dismiss(&self, id: ModalId) {
        self.with_modals(|modals| {
            if let Some(modal) = modals
                .iter_mut()
                .find(|m| m.id == id && m.state == ModalState::Visible)
            {
                modal.state = ModalState::Dismissed;
                modal.acknowledge = None;
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;

    fn setup() -> (Arc<RecordingPresenter>, Prompter) {
        let presenter = Arc::new(RecordingPresenter::new());
        let prompter = Prompter::new(presenter.clone());
        (presenter, prompter)
    }

    #[tokio::test]
    async fn test_prompt_resolves_on_acknowledge() {
        let (presenter, prompter) = setup();

        let confirmation = prompter.prompt("Error", Some("Could not save photo"));
        let id = confirmation.id();
        assert!(presenter.acknowledge(id));

        assert_eq!(confirmation.await, Ok(()));
        assert_eq!(presenter.state_of(id), Some(ModalState::Acknowledged));
    }

    #[test]
    fn test_prompt_presents_alert_with_close_action() {
        let (presenter, prompter) = setup();

        let _confirmation = prompter.prompt("Saved with id: X", None);

        let visible = presenter.visible();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].title, "Saved with id: X");
        assert_eq!(visible[0].message, None);
        assert_eq!(visible[0].action, CLOSE_ACTION);
    }

    #[test]
    fn test_pending_until_acknowledged() {
        let (_presenter, prompter) = setup();

        let mut confirmation = prompter.prompt("Title", None);

        assert!((&mut confirmation).now_or_never().is_none());
    }

    #[test]
    fn test_drop_before_acknowledge_dismisses_modal() {
        let (presenter, prompter) = setup();

        let confirmation = prompter.prompt("Title", Some("detail"));
        let id = confirmation.id();
        drop(confirmation);

        assert_eq!(presenter.state_of(id), Some(ModalState::Dismissed));
        assert!(presenter.visible().is_empty());
        // The user can no longer act on a dismissed modal
        assert!(!presenter.acknowledge(id));
    }

    #[tokio::test]
    async fn test_drop_after_resolution_does_not_dismiss() {
        let (presenter, prompter) = setup();

        let confirmation = prompter.prompt("Title", None);
        let id = confirmation.id();
        presenter.acknowledge(id);
        confirmation.await.unwrap();

        assert_eq!(presenter.state_of(id), Some(ModalState::Acknowledged));
    }

    #[tokio::test]
    async fn test_abandoned_when_presenter_drops_handle() {
        struct ForgetfulPresenter;

        impl ModalPresenter for ForgetfulPresenter {
            fn present(&self, _id: ModalId, _alert: Alert, _acknowledge: Acknowledge) {}
            fn dismiss(&self, _id: ModalId) {}
        }

        let prompter = Prompter::new(Arc::new(ForgetfulPresenter));

        let result = prompter.prompt("Title", None).await;

        assert_eq!(result, Err(PromptError::Abandoned));
    }

    #[tokio::test]
    async fn test_auto_acknowledging_presenter() {
        let presenter = Arc::new(RecordingPresenter::auto_acknowledging());
        let prompter = Prompter::new(presenter.clone());

        prompter.prompt("Saved", None).await.unwrap();

        assert_eq!(presenter.presented().len(), 1);
        assert!(presenter.visible().is_empty());
    }

    #[test]
    fn test_acknowledge_latest_picks_newest_visible() {
        let (presenter, prompter) = setup();

        let first = prompter.prompt("First", None);
        let second = prompter.prompt("Second", None);

        assert!(presenter.acknowledge_latest());
        assert_eq!(presenter.state_of(second.id()), Some(ModalState::Acknowledged));
        assert_eq!(presenter.state_of(first.id()), Some(ModalState::Visible));
    }
}
