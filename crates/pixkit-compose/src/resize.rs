//! Output resize strategies shared by the atlas and channel tools.
//!
//! A strategy maps a cell size and a rows × cols layout to the final
//! output size. Any size change is resampled with Lanczos3; an output
//! that already has the target size is passed through untouched.

use std::fmt;

use image::DynamicImage;
use image::imageops::FilterType;
use serde::{Deserialize, Serialize};

use crate::types::{ComposeError, Dimensions};

/// How to size the composited output relative to a single cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResizeStrategy {
    /// Shrink the whole sheet to one cell's size.
    KeepNative,
    /// Leave the sheet at `cell * grid`.
    #[default]
    Concatenated,
    /// Half the concatenated size on each axis.
    DownsampleX2,
    /// A quarter of the concatenated size on each axis.
    DownsampleX4,
    /// One cell's size.
    SingleCell,
    /// Double the concatenated size on each axis.
    ConcatenatedX2,
}

impl ResizeStrategy {
    /// All strategies, in menu order.
    pub const ALL: [Self; 6] = [
        Self::KeepNative,
        Self::Concatenated,
        Self::DownsampleX2,
        Self::DownsampleX4,
        Self::SingleCell,
        Self::ConcatenatedX2,
    ];

    /// Output size for a `rows` × `cols` sheet of `cell`-sized tiles.
    ///
    /// # Errors
    ///
    /// Returns [`ComposeError::InvalidConfig`] if the size overflows.
    pub fn output_dimensions(
        self,
        cell: Dimensions,
        rows: u32,
        cols: u32,
    ) -> Result<Dimensions, ComposeError> {
        let sheet = cell.checked_scale(cols, rows)?;
        Ok(match self {
            Self::KeepNative | Self::SingleCell => cell,
            Self::Concatenated => sheet,
            Self::DownsampleX2 => shrink(sheet, 2),
            Self::DownsampleX4 => shrink(sheet, 4),
            Self::ConcatenatedX2 => sheet.checked_scale(2, 2)?,
        })
    }

    /// Resize `sheet` to this strategy's output size.
    ///
    /// # Errors
    ///
    /// Returns [`ComposeError::InvalidConfig`] if the size overflows.
    pub fn apply(
        self,
        sheet: &DynamicImage,
        cell: Dimensions,
        rows: u32,
        cols: u32,
    ) -> Result<DynamicImage, ComposeError> {
        let target = self.output_dimensions(cell, rows, cols)?;
        Ok(resample(sheet, target))
    }
}

impl fmt::Display for ResizeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KeepNative => f.write_str("KeepNative"),
            Self::Concatenated => f.write_str("Concatenated"),
            Self::DownsampleX2 => f.write_str("DownsampleX2"),
            Self::DownsampleX4 => f.write_str("DownsampleX4"),
            Self::SingleCell => f.write_str("SingleCell"),
            Self::ConcatenatedX2 => f.write_str("ConcatenatedX2"),
        }
    }
}

fn shrink(d: Dimensions, factor: u32) -> Dimensions {
    Dimensions::new((d.width / factor).max(1), (d.height / factor).max(1))
}

/// Resize to exactly `target`, ignoring aspect ratio.
///
/// Same-size input is cloned without resampling.
#[must_use]
pub fn resample(image: &DynamicImage, target: Dimensions) -> DynamicImage {
    if Dimensions::of(image) == target {
        return image.clone();
    }
    tracing::debug!(
        from = %Dimensions::of(image),
        to = %target,
        "resampling with lanczos3"
    );
    image.resize_exact(target.width, target.height, FilterType::Lanczos3)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const CELL: Dimensions = Dimensions::new(64, 32);

    #[test]
    fn default_is_concatenated() {
        assert_eq!(ResizeStrategy::default(), ResizeStrategy::Concatenated);
    }

    #[test]
    fn output_dimensions_table() {
        let cases = [
            (ResizeStrategy::KeepNative, (64, 32)),
            (ResizeStrategy::Concatenated, (192, 64)),
            (ResizeStrategy::DownsampleX2, (96, 32)),
            (ResizeStrategy::DownsampleX4, (48, 16)),
            (ResizeStrategy::SingleCell, (64, 32)),
            (ResizeStrategy::ConcatenatedX2, (384, 128)),
        ];
        for (strategy, (w, h)) in cases {
            let d = strategy.output_dimensions(CELL, 2, 3).unwrap();
            assert_eq!(d, Dimensions::new(w, h), "{strategy}");
        }
    }

    #[test]
    fn downsample_never_reaches_zero() {
        let d = ResizeStrategy::DownsampleX4
            .output_dimensions(Dimensions::new(1, 2), 1, 1)
            .unwrap();
        assert_eq!(d, Dimensions::new(1, 1));
    }

    #[test]
    fn same_size_passes_through_exactly() {
        let img = DynamicImage::ImageRgba8(image::RgbaImage::from_fn(8, 8, |x, y| {
            image::Rgba([(x * 30) as u8, (y * 30) as u8, 7, 255])
        }));
        let out = resample(&img, Dimensions::new(8, 8));
        assert_eq!(out.to_rgba8(), img.to_rgba8());
    }

    #[test]
    fn apply_resizes_to_strategy_size() {
        let img = DynamicImage::ImageRgba8(image::RgbaImage::new(128, 64));
        let out = ResizeStrategy::DownsampleX2
            .apply(&img, CELL, 2, 2)
            .unwrap();
        assert_eq!(Dimensions::of(&out), Dimensions::new(64, 32));
    }
}
