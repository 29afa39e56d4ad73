//! Image compositing
//!
//! The compositor is a pure function from a photo sequence and a target size
//! to a single image. It is a trait so screens can swap in their own layout;
//! [`GridCompositor`] is the default.

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};

use crate::types::{Photo, Size};

/// Pure `compose(photos, size) -> image` boundary
///
/// Implementations must not have side effects and must accept an empty
/// sequence, returning a placeholder of the requested size.
pub trait Compositor: Send + Sync + 'static {
    fn compose(&self, photos: &[Photo], size: Size) -> Photo;
}

impl<F> Compositor for F
where
    F: Fn(&[Photo], Size) -> Photo + Send + Sync + 'static,
{
    fn compose(&self, photos: &[Photo], size: Size) -> Photo {
        self(photos, size)
    }
}

/// Lays photos out on a grid of one or two rows
///
/// Fewer than three photos share a single row; otherwise two rows are used
/// and the column count is the rounded half. Each photo is scaled to cover
/// its cell and centre-cropped.
#[derive(Debug, Clone)]
pub struct GridCompositor {
    background: Rgba<u8>,
    filter: FilterType,
}

impl GridCompositor {
    pub fn new() -> Self {
        Self {
            background: Rgba([255, 255, 255, 255]),
            filter: FilterType::Triangle,
        }
    }

    pub fn with_background(mut self, color: [u8; 4]) -> Self {
        self.background = Rgba(color);
        self
    }

    /// Rows and columns used for `count` photos
    pub fn grid(count: usize) -> (u32, u32) {
        if count == 0 {
            return (0, 0);
        }
        let rows: u32 = if count < 3 { 1 } else { 2 };
        let columns = (count as f64 / rows as f64).round() as u32;
        (rows, columns.max(1))
    }

    fn fill_cell(&self, photo: &Photo, width: u32, height: u32) -> RgbaImage {
        let source = photo.pixels();
        if source.width() == 0 || source.height() == 0 {
            return RgbaImage::from_pixel(width, height, self.background);
        }

        let scale = f64::max(
            width as f64 / source.width() as f64,
            height as f64 / source.height() as f64,
        );
        let scaled_width = ((source.width() as f64 * scale).ceil() as u32).max(width);
        let scaled_height = ((source.height() as f64 * scale).ceil() as u32).max(height);

        let scaled = imageops::resize(source, scaled_width, scaled_height, self.filter);
        let x = (scaled_width - width) / 2;
        let y = (scaled_height - height) / 2;
        imageops::crop_imm(&scaled, x, y, width, height).to_image()
    }
}

impl Default for GridCompositor {
    fn default() -> Self {
        Self::new()
    }
}

impl Compositor for GridCompositor {
    fn compose(&self, photos: &[Photo], size: Size) -> Photo {
        let mut canvas = RgbaImage::from_pixel(size.width, size.height, self.background);
        if photos.is_empty() || size.is_empty() {
            return Photo::new(canvas);
        }

        let (rows, columns) = Self::grid(photos.len());
        for (index, photo) in photos.iter().enumerate() {
            let index = index as u32;
            let (row, column) = (index / columns, index % columns);
            if row >= rows {
                break;
            }

            let x0 = column * size.width / columns;
            let x1 = (column + 1) * size.width / columns;
            let y0 = row * size.height / rows;
            let y1 = (row + 1) * size.height / rows;
            if x1 <= x0 || y1 <= y0 {
                continue;
            }

            let tile = self.fill_cell(photo, x1 - x0, y1 - y0);
            imageops::replace(&mut canvas, &tile, x0 as i64, y0 as i64);
        }

        Photo::new(canvas)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: [u8; 4] = [255, 0, 0, 255];
    const BLUE: [u8; 4] = [0, 0, 255, 255];

    #[test]
    fn test_grid_layout() {
        assert_eq!(GridCompositor::grid(0), (0, 0));
        assert_eq!(GridCompositor::grid(1), (1, 1));
        assert_eq!(GridCompositor::grid(2), (1, 2));
        assert_eq!(GridCompositor::grid(3), (2, 2));
        assert_eq!(GridCompositor::grid(4), (2, 2));
        assert_eq!(GridCompositor::grid(5), (2, 3));
        assert_eq!(GridCompositor::grid(6), (2, 3));
    }

    #[test]
    fn test_empty_sequence_yields_placeholder() {
        let compositor = GridCompositor::new();
        let image = compositor.compose(&[], Size::new(60, 40));

        assert_eq!(image.size(), Size::new(60, 40));
        assert!(image.pixels().pixels().all(|p| *p == Rgba([255, 255, 255, 255])));
    }

    #[test]
    fn test_two_photos_split_horizontally() {
        let compositor = GridCompositor::new();
        let photos = vec![Photo::solid(10, 10, RED), Photo::solid(30, 5, BLUE)];

        let image = compositor.compose(&photos, Size::new(100, 50));

        assert_eq!(image.size(), Size::new(100, 50));
        assert_eq!(*image.pixels().get_pixel(10, 25), Rgba(RED));
        assert_eq!(*image.pixels().get_pixel(90, 25), Rgba(BLUE));
    }

    #[test]
    fn test_three_photos_leave_last_cell_blank() {
        let compositor = GridCompositor::new().with_background([0, 0, 0, 255]);
        let photos = vec![
            Photo::solid(8, 8, RED),
            Photo::solid(8, 8, RED),
            Photo::solid(8, 8, BLUE),
        ];

        let image = compositor.compose(&photos, Size::new(40, 40));

        assert_eq!(*image.pixels().get_pixel(5, 25), Rgba(BLUE));
        assert_eq!(*image.pixels().get_pixel(35, 35), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn test_closure_is_a_compositor() {
        let compositor = |photos: &[Photo], size: Size| {
            Photo::solid(size.width, size.height, [photos.len() as u8, 0, 0, 255])
        };

        let image = Compositor::compose(&compositor, &[Photo::solid(1, 1, RED)], Size::new(2, 2));
        assert_eq!(image.pixels().get_pixel(0, 0)[0], 1);
    }
}
