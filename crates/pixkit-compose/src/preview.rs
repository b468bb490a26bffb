//! Checkerboard-backed previews.
//!
//! Transparent regions of an atlas or channel pack are only visible
//! against a checkerboard, so previews are composited over one.

use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgba, RgbaImage};

use crate::types::{ComposeError, Dimensions};

/// Dark checker square.
pub const CHECKER_DARK: Rgba<u8> = Rgba([200, 200, 200, 255]);
/// Light checker square.
pub const CHECKER_LIGHT: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// A preview box: outer size plus checker square size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreviewBox {
    /// Outer size in pixels.
    pub size: Dimensions,
    /// Checker square edge in pixels.
    pub cell: u32,
}

impl PreviewBox {
    /// Input/output thumbnails of the single-image tools.
    pub const SMALL: Self = Self {
        size: Dimensions::new(180, 180),
        cell: 12,
    };
    /// Atlas preview.
    pub const LARGE: Self = Self {
        size: Dimensions::new(360, 360),
        cell: 16,
    };

    /// Render `image` into this box. See [`fit_preview`].
    ///
    /// # Errors
    ///
    /// See [`fit_preview`].
    pub fn render(self, image: &DynamicImage) -> Result<RgbaImage, ComposeError> {
        fit_preview(image, self.size.width, self.size.height, self.cell)
    }
}

/// A `width` × `height` checkerboard of `cell`-sized squares.
///
/// Squares where `x / cell + y / cell` is even are [`CHECKER_DARK`].
///
/// # Errors
///
/// Returns [`ComposeError::InvalidConfig`] if `cell` is zero or the
/// board exceeds the canvas limits.
pub fn checkerboard(width: u32, height: u32, cell: u32) -> Result<RgbaImage, ComposeError> {
    if cell == 0 {
        return Err(ComposeError::InvalidConfig(
            "checker cell size must be non-zero".to_owned(),
        ));
    }
    Dimensions::new(width, height).ensure_canvas()?;
    Ok(RgbaImage::from_fn(width, height, |x, y| {
        if (x / cell + y / cell) % 2 == 0 {
            CHECKER_DARK
        } else {
            CHECKER_LIGHT
        }
    }))
}

/// Fit `image` inside `width` × `height` keeping its aspect ratio and
/// alpha-composite it centered over a checkerboard.
///
/// Small sources are scaled up as well as large ones down.
///
/// # Errors
///
/// Returns [`ComposeError::InvalidConfig`] if the box or checker cell is
/// zero-sized, or the box exceeds the canvas limits.
#[tracing::instrument(skip(image), fields(source = %Dimensions::of(image)))]
pub fn fit_preview(
    image: &DynamicImage,
    width: u32,
    height: u32,
    cell: u32,
) -> Result<RgbaImage, ComposeError> {
    if width == 0 || height == 0 {
        return Err(ComposeError::InvalidConfig(format!(
            "preview box must be non-zero, got {width}x{height}"
        )));
    }
    let mut canvas = checkerboard(width, height, cell)?;
    if Dimensions::of(image).is_empty() {
        return Ok(canvas);
    }

    let thumb = image.resize(width, height, FilterType::Lanczos3).to_rgba8();
    let x = (width - thumb.width()) / 2;
    let y = (height - thumb.height()) / 2;
    imageops::overlay(&mut canvas, &thumb, i64::from(x), i64::from(y));
    Ok(canvas)
}
