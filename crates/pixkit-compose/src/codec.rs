//! In-memory image decoding and encoding.
//!
//! Works on byte slices only; reading and writing files is the caller's
//! job.

use std::io::Cursor;
use std::path::Path;

use image::{ColorType, DynamicImage, ImageFormat, RgbaImage};

use crate::types::ComposeError;

/// Decode raw image bytes (PNG, JPEG, BMP, TGA, GIF) to RGBA8.
///
/// # Errors
///
/// Returns [`ComposeError::EmptyInput`] if `bytes` is empty.
/// Returns [`ComposeError::ImageDecode`] if the format is unrecognized or
/// the data is corrupt.
#[must_use = "returns the decoded image"]
pub fn decode(bytes: &[u8]) -> Result<RgbaImage, ComposeError> {
    decode_dynamic(bytes).map(|img| img.to_rgba8())
}

/// Decode raw image bytes keeping the source color type.
///
/// # Errors
///
/// See [`decode`].
pub fn decode_dynamic(bytes: &[u8]) -> Result<DynamicImage, ComposeError> {
    if bytes.is_empty() {
        return Err(ComposeError::EmptyInput);
    }
    image::load_from_memory(bytes).map_err(ComposeError::ImageDecode)
}

/// Encodable output formats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Lossless, keeps alpha.
    #[default]
    Png,
    /// Lossy; alpha is dropped.
    Jpeg,
    /// Uncompressed, keeps alpha.
    Bmp,
}

impl OutputFormat {
    /// Infer the format from a file extension (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns [`ComposeError::InvalidConfig`] for a missing or
    /// unsupported extension.
    pub fn from_path(path: &Path) -> Result<Self, ComposeError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("png") => Ok(Self::Png),
            Some("jpg" | "jpeg") => Ok(Self::Jpeg),
            Some("bmp") => Ok(Self::Bmp),
            _ => Err(ComposeError::InvalidConfig(format!(
                "cannot infer output format from '{}': use .png, .jpg or .bmp",
                path.display()
            ))),
        }
    }

    /// The matching `image` crate format.
    #[must_use]
    pub const fn image_format(self) -> ImageFormat {
        match self {
            Self::Png => ImageFormat::Png,
            Self::Jpeg => ImageFormat::Jpeg,
            Self::Bmp => ImageFormat::Bmp,
        }
    }
}

/// Encode `image` in `format`.
///
/// JPEG output is flattened to RGB8 (grayscale stays L8) since the
/// encoder has no alpha support.
///
/// # Errors
///
/// Returns [`ComposeError::ImageEncode`] if the encoder fails.
pub fn encode(image: &DynamicImage, format: OutputFormat) -> Result<Vec<u8>, ComposeError> {
    let converted;
    let image = match (format, image.color()) {
        (OutputFormat::Jpeg, ColorType::L8 | ColorType::Rgb8) => image,
        (OutputFormat::Jpeg, _) => {
            converted = DynamicImage::ImageRgb8(image.to_rgb8());
            &converted
        }
        _ => image,
    };
    let mut buf = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buf), format.image_format())
        .map_err(ComposeError::ImageEncode)?;
    tracing::debug!(?format, bytes = buf.len(), "encoded image");
    Ok(buf)
}
