//! RGBA channel decomposition into a 2×2 packed texture.
//!
//! Each channel becomes a grayscale plane; the four planes are laid out
//! R | G over B | A on a canvas twice the source size.

use image::imageops;
use image::{DynamicImage, GrayImage, Luma};

use crate::resize::ResizeStrategy;
use crate::types::{ComposeError, Dimensions};

/// The four single-channel planes of an image.
#[derive(Debug, Clone)]
pub struct ChannelPlanes {
    /// Red plane.
    pub red: GrayImage,
    /// Green plane.
    pub green: GrayImage,
    /// Blue plane.
    pub blue: GrayImage,
    /// Alpha plane; fully opaque (255) when the source has no alpha.
    pub alpha: GrayImage,
}

/// Split `image` into R, G, B, and A planes.
///
/// Sources without an alpha channel get a synthesized opaque plane.
#[must_use]
pub fn split(image: &DynamicImage) -> ChannelPlanes {
    let rgba = image.to_rgba8();
    let (w, h) = rgba.dimensions();
    let plane = |c: usize| GrayImage::from_fn(w, h, |x, y| Luma([rgba.get_pixel(x, y).0[c]]));
    ChannelPlanes {
        red: plane(0),
        green: plane(1),
        blue: plane(2),
        alpha: plane(3),
    }
}

/// Split `image` and pack the planes into a `2w` × `2h` grayscale canvas.
///
/// # Errors
///
/// Returns [`ComposeError::InvalidConfig`] if the source is empty or the
/// doubled size exceeds the canvas limits.
#[tracing::instrument(skip(image), fields(size = %Dimensions::of(image)))]
pub fn split_and_pack(image: &DynamicImage) -> Result<GrayImage, ComposeError> {
    let cell = Dimensions::of(image);
    if cell.is_empty() {
        return Err(ComposeError::InvalidConfig("source image is empty".to_owned()));
    }
    let size = cell.checked_scale(2, 2)?;
    let planes = split(image);

    let (w, h) = (i64::from(cell.width), i64::from(cell.height));
    let mut canvas = GrayImage::new(size.width, size.height);
    imageops::replace(&mut canvas, &planes.red, 0, 0);
    imageops::replace(&mut canvas, &planes.green, w, 0);
    imageops::replace(&mut canvas, &planes.blue, 0, h);
    imageops::replace(&mut canvas, &planes.alpha, w, h);
    Ok(canvas)
}

/// Split, pack, and resize with `strategy` (cell = source size, 2×2 grid).
///
/// # Errors
///
/// See [`split_and_pack`].
pub fn split_pack_resize(
    image: &DynamicImage,
    strategy: ResizeStrategy,
) -> Result<DynamicImage, ComposeError> {
    let packed = DynamicImage::ImageLuma8(split_and_pack(image)?);
    strategy.apply(&packed, Dimensions::of(image), 2, 2)
}
