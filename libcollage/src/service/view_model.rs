//! Derived view model
//!
//! Keeps the screen's visible state in step with the selection store. The
//! derived [`UiState`] (button flags and title) is published from inside every
//! store mutation, so it never lags the store. The composite preview is
//! rendered afterwards on the blocking pool. A render still running when a
//! newer snapshot arrives is abandoned, so the preview always ends up showing
//! the latest selection.

use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::compositor::Compositor;
use crate::store::SelectionStore;
use crate::types::{Photo, Selection, Size, MAX_PHOTOS};

/// Title shown while nothing is selected
pub const DEFAULT_TITLE: &str = "Collage";

/// Button enablement and title derived from one snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiState {
    pub save_enabled: bool,
    pub clear_enabled: bool,
    pub add_enabled: bool,
    pub title: String,
    /// Store revision the flags were derived from
    pub revision: u64,
}

impl UiState {
    /// Pure derivation from a snapshot
    pub fn derive(selection: &Selection) -> Self {
        let count = selection.len();
        Self {
            save_enabled: count > 0 && count % 2 == 0,
            clear_enabled: count > 0,
            add_enabled: count < MAX_PHOTOS,
            title: if count > 0 {
                format!("{} photos", count)
            } else {
                DEFAULT_TITLE.to_string()
            },
            revision: selection.revision(),
        }
    }
}

/// Composite image together with the store revision it was rendered from
#[derive(Debug, Clone)]
pub struct Preview {
    pub image: Photo,
    pub revision: u64,
}

/// The screen surfaces this crate is responsible for
///
/// Each surface is a `watch` channel, so a reader always sees one complete
/// `UiState` and never a mix of fields from different snapshots.
#[derive(Clone)]
pub struct ScreenOutputs {
    state: Arc<watch::Sender<UiState>>,
    preview: Arc<watch::Sender<Option<Preview>>>,
}

impl ScreenOutputs {
    pub fn new() -> Self {
        let (state, _) = watch::channel(UiState::derive(&Selection::empty()));
        let (preview, _) = watch::channel(None);
        Self {
            state: Arc::new(state),
            preview: Arc::new(preview),
        }
    }

    pub fn state(&self) -> UiState {
        self.state.borrow().clone()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<UiState> {
        self.state.subscribe()
    }

    pub fn preview(&self) -> Option<Preview> {
        self.preview.borrow().clone()
    }

    pub fn subscribe_preview(&self) -> watch::Receiver<Option<Preview>> {
        self.preview.subscribe()
    }

    /// Publish the state derived from `selection`
    ///
    /// Refused when the state showing was derived from a newer revision.
    /// Rendering the same revision again is allowed and resets the title.
    pub fn render(&self, selection: &Selection) -> bool {
        self.state.send_if_modified(|state| {
            if state.revision > selection.revision() {
                return false;
            }
            *state = UiState::derive(selection);
            true
        })
    }

    /// Overwrite only the title
    pub fn set_title(&self, title: String) {
        self.state.send_modify(|state| state.title = title);
    }

    /// Show `preview` unless a newer one is already showing
    pub fn publish_preview(&self, preview: Preview) -> bool {
        self.preview.send_if_modified(|current| {
            if current
                .as_ref()
                .is_some_and(|shown| shown.revision > preview.revision)
            {
                return false;
            }
            *current = Some(preview);
            true
        })
    }
}

impl Default for ScreenOutputs {
    fn default() -> Self {
        Self::new()
    }
}

/// Subscribes to the store for the lifetime of a screen
///
/// Creating a view model hooks [`ScreenOutputs::render`] into the store's
/// change listeners; [`run`](Self::run) only drives the preview.
pub struct ViewModel {
    store: SelectionStore,
    outputs: ScreenOutputs,
    compositor: Arc<dyn Compositor>,
    size: Size,
}

impl ViewModel {
    pub fn new(
        store: SelectionStore,
        outputs: ScreenOutputs,
        compositor: Arc<dyn Compositor>,
        size: Size,
    ) -> Self {
        let state = outputs.clone();
        store.on_change(move |selection| {
            state.render(selection);
        });
        outputs.render(&store.current_snapshot());

        Self {
            store,
            outputs,
            compositor,
            size,
        }
    }

    fn start_render(&self, selection: Selection) -> (u64, JoinHandle<Photo>) {
        let compositor = Arc::clone(&self.compositor);
        let size = self.size;
        let revision = selection.revision();
        let handle =
            tokio::task::spawn_blocking(move || compositor.compose(selection.photos(), size));
        (revision, handle)
    }

    /// Run until the store goes away or the task is cancelled
    pub async fn run(self) {
        let mut snapshots = self.store.observe();
        let mut rendering: Option<(u64, JoinHandle<Photo>)> = None;

        loop {
            tokio::select! {
                biased;

                next = snapshots.next() => {
                    let Some(selection) = next else { break };
                    debug!(count = selection.len(), revision = selection.revision(), "Selection changed");

                    if let Some((stale, _)) = rendering.take() {
                        trace!(revision = stale, "Discarding superseded render");
                    }
                    rendering = Some(self.start_render(selection));
                }

                rendered = async {
                    match rendering.as_mut() {
                        Some((_, handle)) => handle.await,
                        None => std::future::pending().await,
                    }
                } => {
                    let revision = rendering.take().map(|(revision, _)| revision).unwrap_or_default();
                    match rendered {
                        Ok(image) => {
                            self.outputs.publish_preview(Preview { image, revision });
                        }
                        Err(e) => warn!(revision, error = %e, "Rendering collage failed"),
                    }
                }
            }
        }

        debug!("View model stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_empty() {
        let state = UiState::derive(&Selection::empty());

        assert!(!state.save_enabled);
        assert!(!state.clear_enabled);
        assert!(state.add_enabled);
        assert_eq!(state.title, "Collage");
    }

    #[test]
    fn test_derive_for_every_reachable_length() {
        let mut selection = Selection::empty();
        for count in 1..=MAX_PHOTOS {
            selection = selection.appended(Photo::solid(1, 1, [0, 0, 0, 255]));
            let state = UiState::derive(&selection);

            assert_eq!(state.save_enabled, count % 2 == 0, "save at {}", count);
            assert!(state.clear_enabled);
            assert_eq!(state.add_enabled, count < MAX_PHOTOS, "add at {}", count);
            assert_eq!(state.title, format!("{} photos", count));
        }
    }

    #[test]
    fn test_set_title_keeps_flags() {
        let outputs = ScreenOutputs::new();
        outputs.set_title("Selected 2 photos".to_string());

        let state = outputs.state();
        assert_eq!(state.title, "Selected 2 photos");
        assert!(state.add_enabled);
    }

    #[test]
    fn test_older_state_never_replaces_newer() {
        let outputs = ScreenOutputs::new();
        let older = Selection::empty().appended(Photo::solid(1, 1, [0, 0, 0, 255]));
        let newer = older.appended(Photo::solid(1, 1, [0, 0, 0, 255]));

        assert!(outputs.render(&newer));
        assert!(!outputs.render(&older));
        assert_eq!(outputs.state().revision, newer.revision());
        assert!(outputs.state().save_enabled);

        outputs.set_title("Selected 2 photos".to_string());
        assert!(outputs.render(&newer));
        assert_eq!(outputs.state().title, "2 photos");
    }

    #[test]
    fn test_state_follows_store_without_running() {
        let store = SelectionStore::new();
        let outputs = ScreenOutputs::new();
        store.append(Photo::solid(1, 1, [0, 0, 0, 255]));

        // Never run: the state must still track the store
        let _view_model = ViewModel::new(
            store.clone(),
            outputs.clone(),
            Arc::new(crate::compositor::GridCompositor::new()),
            Size::new(4, 4),
        );
        assert_eq!(outputs.state().title, "1 photos");

        store.append(Photo::solid(1, 1, [0, 0, 0, 255]));
        let state = outputs.state();
        assert!(state.save_enabled);
        assert_eq!(state.revision, store.current_snapshot().revision());

        store.reset();
        let state = outputs.state();
        assert!(!state.save_enabled);
        assert!(!state.clear_enabled);
        assert_eq!(state.title, DEFAULT_TITLE);
    }

    #[test]
    fn test_older_preview_never_replaces_newer() {
        let outputs = ScreenOutputs::new();
        let image = Photo::solid(1, 1, [0, 0, 0, 255]);

        assert!(outputs.publish_preview(Preview {
            image: image.clone(),
            revision: 5,
        }));
        assert!(!outputs.publish_preview(Preview {
            image,
            revision: 3,
        }));

        assert_eq!(outputs.preview().unwrap().revision, 5);
    }
}
