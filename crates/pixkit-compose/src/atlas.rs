//! Sprite-sheet tiling.
//!
//! Source images are pasted row-major into fixed-size cells of a blank
//! canvas. The first image's size is canonical: images of a different
//! size are cropped to the cell (or leave a transparent margin) and
//! reported as a data-quality warning rather than an error.

use image::imageops;
use image::{DynamicImage, Rgba, RgbaImage};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;
use serde::{Deserialize, Serialize};

use crate::resize::ResizeStrategy;
use crate::types::{ComposeError, Dimensions};

/// Grid shape, padding color, and output sizing for an atlas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AtlasLayout {
    /// Number of cell rows.
    pub rows: u32,
    /// Number of cell columns.
    pub cols: u32,
    /// RGBA color for cells with no source image.
    pub fill: [u8; 4],
    /// Fixed cell size. When `None` the first image's size is used.
    pub cell_size: Option<Dimensions>,
    /// Output sizing applied after tiling.
    pub strategy: ResizeStrategy,
}

impl AtlasLayout {
    /// Default row count.
    pub const DEFAULT_ROWS: u32 = 2;
    /// Default column count.
    pub const DEFAULT_COLS: u32 = 2;
    /// Default padding color (light gray, opaque).
    pub const DEFAULT_FILL: [u8; 4] = [200, 200, 200, 255];
    /// Largest row or column count.
    pub const MAX_SIDE: u32 = 64;

    /// Cell size used when there are no images and no fixed size.
    pub const EMPTY_CELL: Dimensions = Dimensions::new(128, 128);

    /// Total number of cells.
    #[must_use]
    pub const fn cell_count(&self) -> usize {
        (self.rows as usize).saturating_mul(self.cols as usize)
    }

    /// Check that the grid is between 1x1 and
    /// [`MAX_SIDE`](Self::MAX_SIDE) on each side and that a fixed cell
    /// size is non-zero and allocatable.
    ///
    /// # Errors
    ///
    /// Returns [`ComposeError::InvalidConfig`] describing the first
    /// violated constraint.
    pub fn validate(&self) -> Result<(), ComposeError> {
        if self.rows == 0 || self.cols == 0 {
            return Err(ComposeError::InvalidConfig(format!(
                "atlas grid must be at least 1x1, got {}x{}",
                self.rows, self.cols
            )));
        }
        if self.rows > Self::MAX_SIDE || self.cols > Self::MAX_SIDE {
            return Err(ComposeError::InvalidConfig(format!(
                "atlas grid must be at most {max}x{max}, got {}x{}",
                self.rows,
                self.cols,
                max = Self::MAX_SIDE
            )));
        }
        if let Some(cell) = self.cell_size
            && cell.is_empty()
        {
            return Err(ComposeError::InvalidConfig(format!(
                "atlas cell size must be non-zero, got {cell}"
            )));
        }
        if let Some(cell) = self.cell_size {
            cell.ensure_canvas()?;
        }
        Ok(())
    }
}

impl Default for AtlasLayout {
    fn default() -> Self {
        Self {
            rows: Self::DEFAULT_ROWS,
            cols: Self::DEFAULT_COLS,
            fill: Self::DEFAULT_FILL,
            cell_size: None,
            strategy: ResizeStrategy::default(),
        }
    }
}

/// A source image whose size differs from the canonical cell size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeMismatch {
    /// Position in the input list.
    pub index: usize,
    /// The image's own size.
    pub dimensions: Dimensions,
}

/// A tiled sheet before output resizing.
#[derive(Debug, Clone)]
pub struct TiledAtlas {
    /// The full `cell * grid` canvas.
    pub image: RgbaImage,
    /// Canonical cell size.
    pub cell: Dimensions,
    /// Number of rows in the sheet.
    pub rows: u32,
    /// Number of columns in the sheet.
    pub cols: u32,
    /// Cells holding a source image.
    pub placed: usize,
    /// Cells padded with the fill color.
    pub padded: usize,
    /// Sources that did not match the canonical size.
    pub mismatched: Vec<SizeMismatch>,
}

impl TiledAtlas {
    /// Resize the sheet according to `strategy`.
    ///
    /// # Errors
    ///
    /// Returns [`ComposeError::InvalidConfig`] if the output size overflows.
    pub fn resize_output(&self, strategy: ResizeStrategy) -> Result<DynamicImage, ComposeError> {
        let sheet = DynamicImage::ImageRgba8(self.image.clone());
        strategy.apply(&sheet, self.cell, self.rows, self.cols)
    }
}

/// How a single source fills an atlas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SingleMode {
    /// Paste the source into every cell.
    #[default]
    RepeatAll,
    /// Paste the source into the first cell and pad the rest.
    FirstThenFill,
}

/// Tile `images` row-major into a `layout.rows` × `layout.cols` sheet.
///
/// Images beyond the cell count are ignored; missing cells are padded
/// with `layout.fill`.
///
/// # Errors
///
/// Returns [`ComposeError::InvalidConfig`] if the layout is invalid or
/// the canvas size overflows.
#[tracing::instrument(skip(images), fields(count = images.len()))]
pub fn tile(images: &[RgbaImage], layout: &AtlasLayout) -> Result<TiledAtlas, ComposeError> {
    layout.validate()?;

    let cell = layout
        .cell_size
        .or_else(|| images.first().map(Dimensions::of))
        .unwrap_or(AtlasLayout::EMPTY_CELL);
    if cell.is_empty() {
        return Err(ComposeError::InvalidConfig(
            "first image has zero size".to_owned(),
        ));
    }

    let size = cell.checked_scale(layout.cols, layout.rows)?;
    let mut canvas = RgbaImage::new(size.width, size.height);

    let used = images.len().min(layout.cell_count());
    let mut mismatched = Vec::new();
    for (index, img) in images.iter().take(used).enumerate() {
        let dims = Dimensions::of(img);
        if dims != cell {
            tracing::warn!(index, image = %dims, cell = %cell, "tile size does not match cell");
            mismatched.push(SizeMismatch {
                index,
                dimensions: dims,
            });
        }
        let (x, y) = slot_origin(index, layout.cols, cell);
        paste_cropped(&mut canvas, img, x, y, cell);
    }

    for index in used..layout.cell_count() {
        let (x, y) = slot_origin(index, layout.cols, cell);
        fill_cell(&mut canvas, x, y, cell, Rgba(layout.fill));
    }

    tracing::debug!(
        placed = used,
        padded = layout.cell_count() - used,
        sheet = %size,
        "atlas tiled"
    );

    Ok(TiledAtlas {
        image: canvas,
        cell,
        rows: layout.rows,
        cols: layout.cols,
        placed: used,
        padded: layout.cell_count() - used,
        mismatched,
    })
}

/// Tile and then apply `layout.strategy`.
///
/// # Errors
///
/// See [`tile`].
pub fn compose(images: &[RgbaImage], layout: &AtlasLayout) -> Result<DynamicImage, ComposeError> {
    tile(images, layout)?.resize_output(layout.strategy)
}

/// Build an atlas from one source image.
///
/// The canvas starts as `layout.fill`; the source is pasted into every
/// cell or only the first, depending on `mode`. The cell size is always
/// the source's own size.
///
/// # Errors
///
/// Returns [`ComposeError::InvalidConfig`] if the layout is invalid, the
/// source is empty, or the canvas size overflows.
pub fn single_atlas(
    source: &RgbaImage,
    layout: &AtlasLayout,
    mode: SingleMode,
) -> Result<TiledAtlas, ComposeError> {
    layout.validate()?;
    let cell = Dimensions::of(source);
    if cell.is_empty() {
        return Err(ComposeError::InvalidConfig("source image is empty".to_owned()));
    }
    let size = cell.checked_scale(layout.cols, layout.rows)?;
    let mut canvas = RgbaImage::from_pixel(size.width, size.height, Rgba(layout.fill));

    let placed = match mode {
        SingleMode::RepeatAll => layout.cell_count(),
        SingleMode::FirstThenFill => 1,
    };
    for index in 0..placed {
        let (x, y) = slot_origin(index, layout.cols, cell);
        imageops::replace(&mut canvas, source, i64::from(x), i64::from(y));
    }

    Ok(TiledAtlas {
        image: canvas,
        cell,
        rows: layout.rows,
        cols: layout.cols,
        placed,
        padded: layout.cell_count() - placed,
        mismatched: Vec::new(),
    })
}

/// Build a single-source atlas and apply `layout.strategy`.
///
/// [`ResizeStrategy::SingleCell`] returns the source unchanged instead
/// of shrinking the sheet.
///
/// # Errors
///
/// See [`single_atlas`].
pub fn single_compose(
    source: &RgbaImage,
    layout: &AtlasLayout,
    mode: SingleMode,
) -> Result<DynamicImage, ComposeError> {
    if layout.strategy == ResizeStrategy::SingleCell {
        layout.validate()?;
        if Dimensions::of(source).is_empty() {
            return Err(ComposeError::InvalidConfig("source image is empty".to_owned()));
        }
        return Ok(DynamicImage::ImageRgba8(source.clone()));
    }
    single_atlas(source, layout, mode)?.resize_output(layout.strategy)
}

/// Group source sizes, in order of first appearance.
///
/// More than one group means the set has inconsistent resolutions.
#[must_use]
pub fn resolution_report(images: &[RgbaImage]) -> Vec<(Dimensions, Vec<usize>)> {
    let mut groups: Vec<(Dimensions, Vec<usize>)> = Vec::new();
    for (i, img) in images.iter().enumerate() {
        let dims = Dimensions::of(img);
        match groups.iter_mut().find(|(d, _)| *d == dims) {
            Some((_, members)) => members.push(i),
            None => groups.push((dims, vec![i])),
        }
    }
    groups
}

#[allow(clippy::cast_possible_truncation)]
fn slot_origin(index: usize, cols: u32, cell: Dimensions) -> (u32, u32) {
    let col = (index % cols as usize) as u32;
    let row = (index / cols as usize) as u32;
    (col * cell.width, row * cell.height)
}

fn paste_cropped(canvas: &mut RgbaImage, img: &RgbaImage, x: u32, y: u32, cell: Dimensions) {
    let (x, y) = (i64::from(x), i64::from(y));
    if Dimensions::of(img) == cell {
        imageops::replace(canvas, img, x, y);
        return;
    }
    let w = img.width().min(cell.width);
    let h = img.height().min(cell.height);
    let cropped = imageops::crop_imm(img, 0, 0, w, h).to_image();
    imageops::replace(canvas, &cropped, x, y);
}

#[allow(clippy::cast_possible_wrap)]
fn fill_cell(canvas: &mut RgbaImage, x: u32, y: u32, cell: Dimensions, color: Rgba<u8>) {
    let rect = Rect::at(x as i32, y as i32).of_size(cell.width, cell.height);
    draw_filled_rect_mut(canvas, rect, color);
}
