//! Service layer for the collage screen
//!
//! This module wires the reactive pipeline together behind one facade,
//! [`CollageScreen`], so that any front end (the CLI, a GUI shell, tests)
//! drives the same code.
//!
//! # Architecture
//!
//! - `SelectionStore`: single source of truth for the selected photos
//! - `ViewModel`: derives button flags, title and preview from every snapshot
//! - `SelectionMergeFlow`: bounded bridge from one picker session into the store
//! - `PhotoWriter`: one-shot persistence of the composite
//! - `Prompter`: cancellable confirmation modal
//! - `EventBus`: what happened, for anyone listening
//!
//! Every task the screen starts is owned by its [`TaskScope`]; tearing the
//! screen down cancels them all and dismisses any prompt still on screen.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use libcollage::library::mock::MockLibrary;
//! use libcollage::service::picker::{ChannelPicker, PickerHandle};
//! use libcollage::service::prompt::RecordingPresenter;
//! use libcollage::service::{CollageScreen, Collaborators};
//! use libcollage::{Config, Photo};
//!
//! # async fn example() {
//! let picker = Arc::new(ChannelPicker::new());
//! let screen = CollageScreen::from_config(
//!     &Config::default(),
//!     Collaborators::new(
//!         Arc::new(MockLibrary::storing("ABC123")),
//!         Arc::new(RecordingPresenter::auto_acknowledging()),
//!         picker.clone(),
//!     ),
//! );
//!
//! let session = screen.add().unwrap();
//! let handle: PickerHandle = picker.handle().unwrap();
//! handle.pick(Photo::solid(10, 10, [255, 0, 0, 255]));
//! handle.pick(Photo::solid(10, 10, [0, 0, 255, 255]));
//! handle.dismiss();
//! session.settled().await;
//!
//! screen.preview_ready().await;
//! assert!(screen.save());
//! screen.teardown().await;
//! # }
//! ```

pub mod events;
pub mod merge;
pub mod picker;
pub mod prompt;
pub mod scope;
pub mod view_model;
pub mod writer;

// Re-export commonly used types
pub use events::ScreenEvent;
pub use merge::{SessionEnd, SessionHandle, Settled};
pub use view_model::{Preview, ScreenOutputs, UiState};

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use self::events::EventBus;
use self::merge::SelectionMergeFlow;
use self::picker::PhotoPicker;
use self::prompt::{ModalPresenter, Prompter};
use self::scope::TaskScope;
use self::view_model::ViewModel;
use self::writer::PhotoWriter;
use crate::compositor::{Compositor, GridCompositor};
use crate::library::PhotoLibrary;
use crate::store::SelectionStore;
use crate::types::MAX_PHOTOS;
use crate::Config;

/// Title of the prompt shown when a save fails
pub const ERROR_TITLE: &str = "Error";

/// External surfaces a screen talks to
#[derive(Clone)]
pub struct Collaborators {
    pub library: Arc<dyn PhotoLibrary>,
    pub presenter: Arc<dyn ModalPresenter>,
    pub picker: Arc<dyn PhotoPicker>,
    pub compositor: Arc<dyn Compositor>,
}

impl Collaborators {
    /// Collaborators using the default [`GridCompositor`]
    pub fn new(
        library: Arc<dyn PhotoLibrary>,
        presenter: Arc<dyn ModalPresenter>,
        picker: Arc<dyn PhotoPicker>,
    ) -> Self {
        Self {
            library,
            presenter,
            picker,
            compositor: Arc::new(GridCompositor::new()),
        }
    }

    pub fn with_compositor(mut self, compositor: Arc<dyn Compositor>) -> Self {
        self.compositor = compositor;
        self
    }
}

/// One collage screen
///
/// `CollageScreen` owns the store and every task observing it. Each user
/// action is a plain method; their effects become visible through
/// [`outputs`](Self::outputs) and [`subscribe`](Self::subscribe).
///
/// Must be created inside a tokio runtime. Dropping the screen cancels its
/// tasks; [`teardown`](Self::teardown) additionally waits until they are gone.
pub struct CollageScreen {
    store: SelectionStore,
    outputs: ScreenOutputs,
    picker: Arc<dyn PhotoPicker>,
    writer: PhotoWriter,
    prompter: Prompter,
    event_bus: EventBus,
    scope: TaskScope,
    settle_delay: Duration,
}

impl CollageScreen {
    /// Create a screen and start its view model
    pub fn from_config(config: &Config, collaborators: Collaborators) -> Self {
        let Collaborators {
            library,
            presenter,
            picker,
            compositor,
        } = collaborators;

        let store = SelectionStore::new();
        let outputs = ScreenOutputs::new();
        let scope = TaskScope::new();

        let view_model = ViewModel::new(
            store.clone(),
            outputs.clone(),
            compositor,
            config.preview.size(),
        );
        scope.spawn(view_model.run());

        debug!(
            preview = %config.preview.size(),
            settle_delay_ms = config.session.settle_delay_ms,
            library = library.name(),
            "Collage screen created"
        );

        Self {
            store,
            outputs,
            picker,
            writer: PhotoWriter::new(library),
            prompter: Prompter::new(presenter),
            event_bus: EventBus::new(100),
            scope,
            settle_delay: config.session.settle_delay(),
        }
    }

    pub fn store(&self) -> &SelectionStore {
        &self.store
    }

    pub fn outputs(&self) -> &ScreenOutputs {
        &self.outputs
    }

    /// Subscribe to screen events
    pub fn subscribe(&self) -> events::EventReceiver {
        self.event_bus.subscribe()
    }

    /// The "add" action: open the picker and merge its picks
    ///
    /// Returns `None` without opening anything when the selection is already
    /// full or the screen has been torn down.
    pub fn add(&self) -> Option<SessionHandle> {
        if self.scope.is_closed() {
            debug!("Screen torn down, ignoring add");
            return None;
        }
        let capacity = MAX_PHOTOS.saturating_sub(self.store.len());
        if capacity == 0 {
            debug!("Selection full, ignoring add");
            return None;
        }

        let session = self.picker.open(capacity);
        let flow = SelectionMergeFlow::new(
            self.store.clone(),
            self.outputs.clone(),
            self.settle_delay,
        );
        let handle = flow.handle();

        self.event_bus.emit(ScreenEvent::SessionStarted { capacity });
        let event_bus = self.event_bus.clone();
        let spawned = self.scope.spawn(async move {
            let settled = flow.run(session).await;
            event_bus.emit(ScreenEvent::SessionSettled {
                end: settled.end,
                appended: settled.appended,
            });
        });

        spawned.then_some(handle)
    }

    /// The "clear" action
    pub fn clear(&self) {
        self.store.reset();
        self.event_bus.emit(ScreenEvent::SelectionCleared);
    }

    /// The "save" action: persist the current preview and report the result
    ///
    /// Returns false, doing nothing, when the current selection cannot be
    /// saved or the preview does not show it yet. Otherwise the save runs in
    /// the background: its outcome is shown in a prompt, and the selection is
    /// cleared whether the save succeeded or not.
    pub fn save(&self) -> bool {
        let snapshot = self.store.current_snapshot();
        if !UiState::derive(&snapshot).save_enabled {
            debug!(count = snapshot.len(), "Save disabled, ignoring");
            return false;
        }
        let preview = match self.outputs.preview() {
            Some(preview) if preview.revision == snapshot.revision() => preview,
            Some(preview) => {
                debug!(
                    preview = preview.revision,
                    selection = snapshot.revision(),
                    "Preview is out of date, nothing to save"
                );
                return false;
            }
            None => {
                debug!("No preview rendered yet, nothing to save");
                return false;
            }
        };

        info!(revision = preview.revision, size = %preview.image.size(), "Saving collage");

        let saving = self.writer.save(preview.image);
        let prompter = self.prompter.clone();
        let store = self.store.clone();
        let event_bus = self.event_bus.clone();

        self.scope.spawn(async move {
            let confirmation = match saving.await {
                Ok(id) => {
                    let confirmation = prompter.prompt(&format!("Saved with id: {}", id), None);
                    event_bus.emit(ScreenEvent::Saved { id });
                    confirmation
                }
                Err(e) => {
                    let description = e.to_string();
                    let confirmation = prompter.prompt(ERROR_TITLE, Some(&description));
                    event_bus.emit(ScreenEvent::SaveFailed {
                        kind: e.kind(),
                        error: description,
                    });
                    confirmation
                }
            };

            store.reset();

            match confirmation.await {
                Ok(()) => debug!("Save prompt acknowledged"),
                Err(e) => debug!(error = %e, "Save prompt closed"),
            }
        })
    }

    /// Wait until the preview shows the current selection
    ///
    /// Returns `None` if the screen stopped rendering first.
    pub async fn preview_ready(&self) -> Option<Preview> {
        let mut previews = self.outputs.subscribe_preview();
        loop {
            let target = self.store.current_snapshot().revision();
            if let Some(preview) = previews.borrow_and_update().as_ref() {
                if preview.revision >= target {
                    return Some(preview.clone());
                }
            }
            if self.scope.is_closed() || previews.changed().await.is_err() {
                return None;
            }
        }
    }

    /// Cancel everything this screen started and wait for it to stop
    ///
    /// Prompts still on screen are dismissed; the store keeps its contents.
    pub async fn teardown(&self) {
        self.scope.shutdown().await;
        info!("Collage screen torn down");
    }
}
