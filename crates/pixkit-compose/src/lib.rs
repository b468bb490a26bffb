//! pixkit-compose: Pure pixel compositing for small texture atlases (sans-IO).
//!
//! Pipelines:
//!
//! - color grid -> native bitmap -> nearest-neighbor export
//! - images -> row-major tiling -> fill -> resize strategy
//! - one image -> repeated or single-slot atlas -> resize strategy
//! - RGBA image -> four channel planes -> 2x2 gray pack -> resize strategy
//! - gradient stops -> sampled colors or a strip
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! images and byte slices. Filesystem and subprocess work lives in
//! `pixkit-fetch` and the `pixkit` binary.

pub mod atlas;
pub mod channels;
pub mod codec;
pub mod color;
pub mod gradient;
pub mod grid;
pub mod preview;
pub mod resize;
pub mod types;

pub use atlas::{AtlasLayout, SingleMode, TiledAtlas};
pub use codec::OutputFormat;
pub use color::Color;
pub use gradient::{Gradient, Stop};
pub use grid::{ColorGrid, ExportResolution};
pub use resize::ResizeStrategy;
pub use types::{ComposeError, Dimensions};

/// Decode, tile, and encode an atlas in one step.
///
/// # Errors
///
/// Returns the first decode, layout, or encode error.
pub fn compose_encoded(
    sources: &[&[u8]],
    layout: &AtlasLayout,
    format: OutputFormat,
) -> Result<Vec<u8>, ComposeError> {
    let images = sources
        .iter()
        .map(|bytes| codec::decode(bytes))
        .collect::<Result<Vec<_>, _>>()?;
    let out = atlas::compose(&images, layout)?;
    codec::encode(&out, format)
}

/// Decode, split, pack, resize, and encode a channel texture.
///
/// # Errors
///
/// Returns the first decode, layout, or encode error.
pub fn split_encoded(
    source: &[u8],
    strategy: ResizeStrategy,
    format: OutputFormat,
) -> Result<Vec<u8>, ComposeError> {
    let image = codec::decode_dynamic(source)?;
    let out = channels::split_pack_resize(&image, strategy)?;
    codec::encode(&out, format)
}
