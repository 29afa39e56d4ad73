//! Mock photo library for testing
//!
//! Simulates the three observable outcomes of a storage call (stored, no
//! identifier, failure) with an optional latency, and records every call so
//! tests can verify how often the library was hit.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::sleep;

use super::PhotoLibrary;
use crate::error::LibraryError;
use crate::types::Photo;

/// What the mock returns from `store_image`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOutcome {
    /// Succeed with this identifier
    Stored(String),
    /// Complete without producing an identifier
    NoIdentifier,
    /// Fail with `LibraryError::Unavailable(message)`
    Fail(String),
}

/// Mock library for testing
///
/// Clones share call counters and stored photos.
#[derive(Clone)]
pub struct MockLibrary {
    outcome: MockOutcome,
    delay: Duration,
    calls: Arc<AtomicUsize>,
    stored: Arc<Mutex<Vec<Photo>>>,
}

impl MockLibrary {
    pub fn new(outcome: MockOutcome) -> Self {
        Self {
            outcome,
            delay: Duration::ZERO,
            calls: Arc::new(AtomicUsize::new(0)),
            stored: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Library that always stores and returns `id`
    pub fn storing(id: &str) -> Self {
        Self::new(MockOutcome::Stored(id.to_string()))
    }

    /// Library whose calls complete without an identifier
    pub fn without_identifier() -> Self {
        Self::new(MockOutcome::NoIdentifier)
    }

    /// Library whose calls fail with `message`
    pub fn failing(message: &str) -> Self {
        Self::new(MockOutcome::Fail(message.to_string()))
    }

    /// Add simulated latency before each call completes
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Number of times `store_image` was called
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Photos that were successfully stored
    pub fn stored(&self) -> Vec<Photo> {
        self.stored
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl PhotoLibrary for MockLibrary {
    async fn store_image(&self, photo: &Photo) -> Result<Option<String>, LibraryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }

        match &self.outcome {
            MockOutcome::Stored(id) => {
                self.stored
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner())
                    .push(photo.clone());
                Ok(Some(id.clone()))
            }
            MockOutcome::NoIdentifier => Ok(None),
            MockOutcome::Fail(message) => Err(LibraryError::Unavailable(message.clone())),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}
