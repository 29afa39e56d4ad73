//! Core types for Collage

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Maximum number of photos a selection may hold
pub const MAX_PHOTOS: usize = 6;

/// Opaque, cheaply clonable image handle
///
/// Pixel data is shared between clones, so passing photos through streams
/// and snapshots never copies the image itself.
#[derive(Clone)]
pub struct Photo {
    pixels: Arc<RgbaImage>,
}

impl Photo {
    pub fn new(pixels: RgbaImage) -> Self {
        Self {
            pixels: Arc::new(pixels),
        }
    }

    /// Create a photo filled with a single colour
    pub fn solid(width: u32, height: u32, color: [u8; 4]) -> Self {
        Self::new(RgbaImage::from_pixel(width, height, Rgba(color)))
    }

    /// Decode a photo from an image file on disk
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let decoded = image::open(path.as_ref())?;
        Ok(Self::new(decoded.to_rgba8()))
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn size(&self) -> Size {
        Size::new(self.width(), self.height())
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Returns true if both handles refer to the same pixel buffer
    pub fn ptr_eq(&self, other: &Photo) -> bool {
        Arc::ptr_eq(&self.pixels, &other.pixels)
    }
}

impl fmt::Debug for Photo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Photo")
            .field("width", &self.width())
            .field("height", &self.height())
            .finish()
    }
}

/// Pixel dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Immutable snapshot of the selected-photo sequence
///
/// Every store mutation produces a new `Selection` with a higher revision.
/// The photo list itself is shared, so cloning a snapshot is cheap.
#[derive(Debug, Clone)]
pub struct Selection {
    photos: Arc<[Photo]>,
    revision: u64,
}

impl Selection {
    pub fn empty() -> Self {
        Self {
            photos: Arc::from(Vec::new()),
            revision: 0,
        }
    }

    pub fn photos(&self) -> &[Photo] {
        &self.photos
    }

    pub fn len(&self) -> usize {
        self.photos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.photos.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.photos.len() >= MAX_PHOTOS
    }

    /// Monotonic counter bumped by every mutation of the owning store
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub(crate) fn appended(&self, photo: Photo) -> Self {
        let mut photos = self.photos.to_vec();
        photos.push(photo);
        Self {
            photos: Arc::from(photos),
            revision: self.revision + 1,
        }
    }

    pub(crate) fn cleared(&self) -> Self {
        Self {
            photos: Arc::from(Vec::new()),
            revision: self.revision + 1,
        }
    }
}

impl Default for Selection {
    fn default() -> Self {
        Self::empty()
    }
}
