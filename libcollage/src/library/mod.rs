//! Photo library backends
//!
//! A photo library is the platform storage boundary: one asynchronous call
//! that stores an image and hands back an opaque identifier. Backends report
//! two distinct failure shapes:
//!
//! - `Ok(None)`: the call completed but produced no identifier
//! - `Err(LibraryError)`: the call itself failed
//!
//! Turning these into a user-facing result is the job of
//! [`PhotoWriter`](crate::service::writer::PhotoWriter).
//!
//! # Examples
//!
//! ```no_run
//! use libcollage::library::{directory::DirectoryLibrary, PhotoLibrary};
//! use libcollage::types::Photo;
//!
//! # async fn example() -> Result<(), libcollage::error::LibraryError> {
//! let library = DirectoryLibrary::new("/tmp/collages");
//! let photo = Photo::solid(100, 100, [0, 128, 255, 255]);
//!
//! if let Some(id) = library.store_image(&photo).await? {
//!     println!("Stored as {}", id);
//! }
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;

use crate::error::LibraryError;
use crate::types::Photo;

pub mod directory;

// Mock library is available for all builds (not just tests) to support integration tests
pub mod mock;

/// Asynchronous image storage
#[async_trait]
pub trait PhotoLibrary: Send + Sync {
    /// Store `photo` and return its identifier
    ///
    /// # Returns
    ///
    /// - `Ok(Some(id))` - the photo was stored
    /// - `Ok(None)` - the library accepted the request but created no asset
    ///
    /// # Errors
    ///
    /// Returns a `LibraryError` if the underlying storage call fails.
    async fn store_image(&self, photo: &Photo) -> Result<Option<String>, LibraryError>;

    /// Short lowercase name used in logs (e.g. "directory", "mock")
    fn name(&self) -> &str;
}
