//! Shared types for the pixkit compositing crate.

use serde::{Deserialize, Serialize};

/// Re-export `GrayImage` so downstream crates can hold channel planes
/// without depending on `image` directly.
pub use image::GrayImage;

/// Re-export `RgbImage` for rendered color grids.
pub use image::RgbImage;

/// Re-export `RgbaImage` for decoded sources and atlases.
pub use image::RgbaImage;

/// Re-export `DynamicImage` for resize and codec entry points.
pub use image::DynamicImage;

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Longest edge any rendered canvas may have.
    pub const MAX_EDGE: u32 = 16_384;

    /// Largest pixel count any rendered canvas may have.
    pub const MAX_PIXELS: u64 = 1 << 26;

    /// Create a new size.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Dimensions of any image view.
    #[must_use]
    pub fn of<I: image::GenericImageView>(image: &I) -> Self {
        let (width, height) = image.dimensions();
        Self { width, height }
    }

    /// Returns `true` if either axis is zero.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Scale both axes by integer factors into a canvas size.
    ///
    /// # Errors
    ///
    /// Returns [`ComposeError::InvalidConfig`] if either product
    /// does not fit in a `u32` or the result fails
    /// [`ensure_canvas`](Self::ensure_canvas).
    pub fn checked_scale(self, x: u32, y: u32) -> Result<Self, ComposeError> {
        let width = self.width.checked_mul(x);
        let height = self.height.checked_mul(y);
        match (width, height) {
            (Some(width), Some(height)) => Self { width, height }.ensure_canvas(),
            _ => Err(ComposeError::InvalidConfig(format!(
                "{self} scaled by {x}x{y} overflows"
            ))),
        }
    }

    /// Check that an image of this size may be allocated.
    ///
    /// # Errors
    ///
    /// Returns [`ComposeError::InvalidConfig`] if an edge exceeds
    /// [`MAX_EDGE`](Self::MAX_EDGE) or the area exceeds
    /// [`MAX_PIXELS`](Self::MAX_PIXELS).
    pub fn ensure_canvas(self) -> Result<Self, ComposeError> {
        let pixels = u64::from(self.width) * u64::from(self.height);
        if self.width > Self::MAX_EDGE || self.height > Self::MAX_EDGE || pixels > Self::MAX_PIXELS
        {
            return Err(ComposeError::InvalidConfig(format!(
                "canvas {self} exceeds the {max}x{max} / {px} pixel limit",
                max = Self::MAX_EDGE,
                px = Self::MAX_PIXELS
            )));
        }
        Ok(self)
    }
}

impl std::fmt::Display for Dimensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Errors that can occur while compositing.
#[derive(Debug, thiserror::Error)]
pub enum ComposeError {
    /// Failed to decode an input image.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[source] image::ImageError),

    /// Failed to encode an output image.
    #[error("failed to encode image: {0}")]
    ImageEncode(#[source] image::ImageError),

    /// The input image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// A size, count, or layout parameter is invalid.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A grid index is outside the current dimensions.
    #[error("cell ({row}, {col}) is outside a {rows}x{cols} grid")]
    OutOfBounds {
        /// Requested row.
        row: u32,
        /// Requested column.
        col: u32,
        /// Current row count.
        rows: u32,
        /// Current column count.
        cols: u32,
    },

    /// A color string could not be parsed.
    #[error("invalid color '{0}': expected #rrggbb or #rgb")]
    InvalidColor(String),
}
