//! Collage - reactive photo collage pipeline
//!
//! This library keeps a small selection of photos, derives what the collage
//! screen shows from it, merges photos coming from a picker under a hard
//! limit, and persists the finished composite.

pub mod compositor;
pub mod config;
pub mod error;
pub mod library;
pub mod logging;
pub mod service;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use error::{CollageError, Result, SaveErrorKind};
pub use service::{CollageScreen, Collaborators};
pub use store::SelectionStore;
pub use types::{Photo, Selection, Size, MAX_PHOTOS};
