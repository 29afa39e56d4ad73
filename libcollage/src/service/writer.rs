//! Persistence gateway
//!
//! Wraps one photo library call into a one-shot result: exactly one
//! identifier or one [`SaveError`] per `save` call. Nothing is retried here.

use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use tracing::{info, warn};

use crate::error::SaveError;
use crate::library::PhotoLibrary;
use crate::types::Photo;

/// One-shot save result
pub type SaveFuture = BoxFuture<'static, Result<String, SaveError>>;

/// Persistence gateway
#[derive(Clone)]
pub struct PhotoWriter {
    library: Arc<dyn PhotoLibrary>,
}

impl PhotoWriter {
    pub fn new(library: Arc<dyn PhotoLibrary>) -> Self {
        Self { library }
    }

    /// Save `photo` to the library
    ///
    /// The returned future is lazy: nothing is stored until it is polled,
    /// and every call starts an independent storage operation. Dropping the
    /// future before completion abandons the operation.
    ///
    /// # Errors
    ///
    /// - `SaveError::CouldNotSave` if the library returned no identifier
    /// - `SaveError::Underlying` if the library call failed
    pub fn save(&self, photo: Photo) -> SaveFuture {
        let library = Arc::clone(&self.library);
        async move {
            match library.store_image(&photo).await {
                Ok(Some(id)) => {
                    info!(library = library.name(), id = %id, "Collage saved");
                    Ok(id)
                }
                Ok(None) => {
                    warn!(library = library.name(), "Library returned no identifier");
                    Err(SaveError::CouldNotSave)
                }
                Err(e) => {
                    warn!(library = library.name(), error = %e, "Saving collage failed");
                    Err(SaveError::Underlying(e))
                }
            }
        }
        .boxed()
    }
}
