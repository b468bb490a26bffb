//! Editable color matrix and its rasterization.
//!
//! A [`ColorGrid`] is a rows × cols matrix of optional colors. Cells
//! start unfilled and render as the grid's default color, so a render
//! never contains an ambiguous "absent" pixel.
//!
//! Changing dimensions resets every cell. Content is not carried over
//! to the new size.

use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::color::Color;
use crate::types::{ComposeError, Dimensions};

/// A rows × cols matrix of optional cell colors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorGrid {
    rows: u32,
    cols: u32,
    cells: Vec<Option<Color>>,
    default_color: Color,
    history: Vec<Color>,
}

impl ColorGrid {
    /// Largest row or column count.
    pub const MAX_SIDE: u32 = 256;

    /// Create a grid with every cell unfilled and a white default.
    ///
    /// # Errors
    ///
    /// Returns [`ComposeError::InvalidConfig`] if `rows` or `cols` is zero
    /// or above [`MAX_SIDE`](Self::MAX_SIDE).
    pub fn new(rows: u32, cols: u32) -> Result<Self, ComposeError> {
        let len = cell_count(rows, cols)?;
        Ok(Self {
            rows,
            cols,
            cells: vec![None; len],
            default_color: Color::WHITE,
            history: Vec::new(),
        })
    }

    /// Build a grid from a row-major color list.
    ///
    /// Colors beyond `rows * cols` are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ComposeError::InvalidConfig`] if the dimensions are zero
    /// or fewer than `rows * cols` colors are supplied.
    pub fn from_colors(rows: u32, cols: u32, colors: &[Color]) -> Result<Self, ComposeError> {
        let mut grid = Self::new(rows, cols)?;
        let needed = grid.cells.len();
        if colors.len() < needed {
            return Err(ComposeError::InvalidConfig(format!(
                "not enough colors: {rows}x{cols} grid needs {needed}, got {}",
                colors.len()
            )));
        }
        for (cell, &color) in grid.cells.iter_mut().zip(colors) {
            *cell = Some(color);
        }
        for &color in &colors[..needed] {
            grid.remember(color);
        }
        Ok(grid)
    }

    /// Number of rows.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Number of columns.
    #[must_use]
    pub const fn cols(&self) -> u32 {
        self.cols
    }

    /// Color used for unfilled cells at render time.
    #[must_use]
    pub const fn default_color(&self) -> Color {
        self.default_color
    }

    /// Change the color used for unfilled cells.
    pub const fn set_default_color(&mut self, color: Color) {
        self.default_color = color;
    }

    /// Every distinct color written so far, most recent first.
    #[must_use]
    pub fn history(&self) -> &[Color] {
        &self.history
    }

    /// Reinitialize to `rows` × `cols` with every cell unfilled.
    ///
    /// The default color and history are kept.
    ///
    /// # Errors
    ///
    /// Returns [`ComposeError::InvalidConfig`] if either count is zero or
    /// above [`MAX_SIDE`](Self::MAX_SIDE);
    /// the grid is left unchanged.
    pub fn set_dimensions(&mut self, rows: u32, cols: u32) -> Result<(), ComposeError> {
        let len = cell_count(rows, cols)?;
        self.rows = rows;
        self.cols = cols;
        self.cells = vec![None; len];
        tracing::debug!(rows, cols, "grid reinitialized");
        Ok(())
    }

    /// The stored color at `(row, col)`, `None` if unfilled.
    ///
    /// # Errors
    ///
    /// Returns [`ComposeError::OutOfBounds`] for an invalid index.
    pub fn cell(&self, row: u32, col: u32) -> Result<Option<Color>, ComposeError> {
        let idx = self.index(row, col)?;
        Ok(self.cells[idx])
    }

    /// The color a cell renders as: its own color or the default.
    ///
    /// # Errors
    ///
    /// Returns [`ComposeError::OutOfBounds`] for an invalid index.
    pub fn resolved(&self, row: u32, col: u32) -> Result<Color, ComposeError> {
        Ok(self.cell(row, col)?.unwrap_or(self.default_color))
    }

    /// Store `color` at `(row, col)` and mark the cell filled.
    ///
    /// # Errors
    ///
    /// Returns [`ComposeError::OutOfBounds`] for an invalid index; the
    /// grid is left unchanged.
    pub fn set_cell(&mut self, row: u32, col: u32, color: Color) -> Result<(), ComposeError> {
        let idx = self.index(row, col)?;
        self.cells[idx] = Some(color);
        self.remember(color);
        Ok(())
    }

    /// Mark `(row, col)` unfilled again.
    ///
    /// # Errors
    ///
    /// Returns [`ComposeError::OutOfBounds`] for an invalid index.
    pub fn clear_cell(&mut self, row: u32, col: u32) -> Result<(), ComposeError> {
        let idx = self.index(row, col)?;
        self.cells[idx] = None;
        Ok(())
    }

    /// Set every cell in `row`.
    ///
    /// # Errors
    ///
    /// Returns [`ComposeError::OutOfBounds`] if `row >= rows`.
    pub fn fill_row(&mut self, row: u32, color: Color) -> Result<(), ComposeError> {
        let start = self.index(row, 0)?;
        let cols = self.cols as usize;
        self.cells[start..start + cols].fill(Some(color));
        self.remember(color);
        Ok(())
    }

    /// Set every cell in `col`.
    ///
    /// # Errors
    ///
    /// Returns [`ComposeError::OutOfBounds`] if `col >= cols`.
    pub fn fill_column(&mut self, col: u32, color: Color) -> Result<(), ComposeError> {
        let start = self.index(0, col)?;
        let stride = self.cols as usize;
        for cell in self.cells.iter_mut().skip(start).step_by(stride) {
            *cell = Some(color);
        }
        self.remember(color);
        Ok(())
    }

    /// Set every cell, filled or not.
    pub fn fill_all(&mut self, color: Color) {
        self.cells.fill(Some(color));
        self.remember(color);
    }

    /// Paint every still-unfilled cell, leaving filled cells untouched.
    ///
    /// Returns the number of cells painted.
    pub fn fill_unfilled(&mut self, color: Color) -> usize {
        let mut painted = 0;
        for cell in self.cells.iter_mut().filter(|c| c.is_none()) {
            *cell = Some(color);
            painted += 1;
        }
        if painted > 0 {
            self.remember(color);
        }
        painted
    }

    /// Coordinates of unfilled cells in row-major order.
    #[must_use]
    pub fn unfilled_cells(&self) -> Vec<(u32, u32)> {
        let cols = self.cols as usize;
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, c)| c.is_none())
            .map(|(i, _)| {
                #[allow(clippy::cast_possible_truncation)]
                let pos = ((i / cols) as u32, (i % cols) as u32);
                pos
            })
            .collect()
    }

    /// Row-major resolved colors, one row per inner `Vec`.
    #[must_use]
    pub fn to_matrix(&self) -> Vec<Vec<Color>> {
        self.cells
            .chunks(self.cols as usize)
            .map(|row| {
                row.iter()
                    .map(|c| c.unwrap_or(self.default_color))
                    .collect()
            })
            .collect()
    }

    /// Rasterize at one pixel per cell.
    #[must_use]
    pub fn render_native(&self) -> RgbImage {
        RgbImage::from_fn(self.cols, self.rows, |x, y| {
            let idx = y as usize * self.cols as usize + x as usize;
            self.cells[idx].unwrap_or(self.default_color).to_rgb()
        })
    }

    /// Rasterize to `width` × `height` with nearest-neighbor sampling.
    ///
    /// Each output pixel takes the color of the cell under its center,
    /// so every cell becomes a solid block and no colors blend.
    ///
    /// # Errors
    ///
    /// Returns [`ComposeError::InvalidConfig`] if either target axis is zero
    /// or the target exceeds the canvas limits.
    #[tracing::instrument(skip(self), fields(rows = self.rows, cols = self.cols))]
    pub fn render(&self, width: u32, height: u32) -> Result<RgbImage, ComposeError> {
        if width == 0 || height == 0 {
            return Err(ComposeError::InvalidConfig(format!(
                "render target must be non-zero, got {width}x{height}"
            )));
        }
        Dimensions::new(width, height).ensure_canvas()?;
        let native = self.render_native();
        let col_of = nearest_lookup(self.cols, width);
        let row_of = nearest_lookup(self.rows, height);
        Ok(RgbImage::from_fn(width, height, |x, y| {
            *native.get_pixel(col_of[x as usize], row_of[y as usize])
        }))
    }

    /// Rasterize with each cell drawn as a `cell_size` square.
    ///
    /// # Errors
    ///
    /// Returns [`ComposeError::InvalidConfig`] if `cell_size` is zero or
    /// the output size overflows.
    pub fn render_cells(&self, cell_size: u32) -> Result<RgbImage, ComposeError> {
        let size = Dimensions::new(self.cols, self.rows).checked_scale(cell_size, cell_size)?;
        self.render(size.width, size.height)
    }

    fn index(&self, row: u32, col: u32) -> Result<usize, ComposeError> {
        if row >= self.rows || col >= self.cols {
            return Err(ComposeError::OutOfBounds {
                row,
                col,
                rows: self.rows,
                cols: self.cols,
            });
        }
        Ok(row as usize * self.cols as usize + col as usize)
    }

    fn remember(&mut self, color: Color) {
        if !self.history.contains(&color) {
            self.history.insert(0, color);
        }
    }
}

fn cell_count(rows: u32, cols: u32) -> Result<usize, ComposeError> {
    if rows == 0 || cols == 0 {
        return Err(ComposeError::InvalidConfig(format!(
            "grid dimensions must be at least 1x1, got {rows}x{cols}"
        )));
    }
    if rows > ColorGrid::MAX_SIDE || cols > ColorGrid::MAX_SIDE {
        return Err(ComposeError::InvalidConfig(format!(
            "grid dimensions must be at most {max}x{max}, got {rows}x{cols}",
            max = ColorGrid::MAX_SIDE
        )));
    }
    (rows as usize)
        .checked_mul(cols as usize)
        .ok_or_else(|| ComposeError::InvalidConfig(format!("{rows}x{cols} grid is too large")))
}

/// Map each of `out` output positions to one of `src` source positions
/// by sampling at the output pixel center.
fn nearest_lookup(src: u32, out: u32) -> Vec<u32> {
    let (src, out) = (u64::from(src), u64::from(out));
    (0..out)
        .map(|i| {
            let s = ((2 * i + 1) * src) / (2 * out);
            #[allow(clippy::cast_possible_truncation)]
            let s = s.min(src - 1) as u32;
            s
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Export resolution
// ---------------------------------------------------------------------------

/// Target size for a grid export.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExportResolution {
    /// 256 × 256.
    #[default]
    Square256,
    /// 512 × 512.
    Square512,
    /// 1024 × 1024.
    Square1024,
    /// 256 wide, 512 tall.
    Tall256x512,
    /// 512 wide, 256 tall.
    Wide512x256,
    /// Any other size.
    Custom {
        /// Width in pixels.
        width: u32,
        /// Height in pixels.
        height: u32,
    },
}

impl ExportResolution {
    /// Pixel size of this preset.
    #[must_use]
    pub const fn dimensions(self) -> Dimensions {
        match self {
            Self::Square256 => Dimensions::new(256, 256),
            Self::Square512 => Dimensions::new(512, 512),
            Self::Square1024 => Dimensions::new(1024, 1024),
            Self::Tall256x512 => Dimensions::new(256, 512),
            Self::Wide512x256 => Dimensions::new(512, 256),
            Self::Custom { width, height } => Dimensions::new(width, height),
        }
    }
}

impl ExportResolution {
    /// Smallest custom edge.
    pub const MIN_EDGE: u32 = 8;
    /// Largest custom edge.
    pub const MAX_EDGE: u32 = 4096;
}

impl std::str::FromStr for ExportResolution {
    type Err = ComposeError;

    /// Parse `"WxH"`, mapping the preset sizes onto their variants.
    /// Each edge must lie in `MIN_EDGE..=MAX_EDGE`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .split_once(['x', 'X'])
            .ok_or_else(|| ComposeError::InvalidConfig(format!("size must be 'WxH', got '{s}'")))?;
        let parse = |v: &str| {
            let edge = v
                .trim()
                .parse::<u32>()
                .map_err(|e| ComposeError::InvalidConfig(format!("invalid size '{s}': {e}")))?;
            if (Self::MIN_EDGE..=Self::MAX_EDGE).contains(&edge) {
                Ok(edge)
            } else {
                Err(ComposeError::InvalidConfig(format!(
                    "size '{s}' must be between {} and {} per side",
                    Self::MIN_EDGE,
                    Self::MAX_EDGE
                )))
            }
        };
        Ok(match (parse(w)?, parse(h)?) {
            (256, 256) => Self::Square256,
            (512, 512) => Self::Square512,
            (1024, 1024) => Self::Square1024,
            (256, 512) => Self::Tall256x512,
            (512, 256) => Self::Wide512x256,
            (width, height) => Self::Custom { width, height },
        })
    }
}

// ---------------------------------------------------------------------------
// Serialization
// ---------------------------------------------------------------------------

/// On-disk grid form: `{ "rows", "cols", "matrix": [[color|null]] }`.
#[derive(Serialize, Deserialize)]
struct GridFile {
    rows: u32,
    cols: u32,
    matrix: Vec<Vec<Option<Color>>>,
    #[serde(default = "default_white")]
    default_color: Color,
}

const fn default_white() -> Color {
    Color::WHITE
}

impl Serialize for ColorGrid {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let file = GridFile {
            rows: self.rows,
            cols: self.cols,
            matrix: self
                .cells
                .chunks(self.cols as usize)
                .map(<[Option<Color>]>::to_vec)
                .collect(),
            default_color: self.default_color,
        };
        file.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ColorGrid {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let file = GridFile::deserialize(deserializer)?;
        let mut grid = Self::new(file.rows, file.cols).map_err(serde::de::Error::custom)?;
        if file.matrix.len() != file.rows as usize
            || file.matrix.iter().any(|r| r.len() != file.cols as usize)
        {
            return Err(serde::de::Error::custom(format!(
                "matrix shape does not match {}x{}",
                file.rows, file.cols
            )));
        }
        grid.default_color = file.default_color;
        grid.cells = file.matrix.into_iter().flatten().collect();
        let filled: Vec<Color> = grid.cells.iter().flatten().copied().collect();
        for color in filled {
            grid.remember(color);
        }
        Ok(grid)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const RED: Color = Color::new(255, 0, 0);
    const GREEN: Color = Color::new(0, 255, 0);
    const BLUE: Color = Color::new(0, 0, 255);
    const GRAY: Color = Color::new(128, 128, 128);

    #[test]
    fn new_grid_is_all_unfilled() {
        for (rows, cols) in [(1, 1), (3, 4), (7, 2)] {
            let grid = ColorGrid::new(rows, cols).unwrap();
            assert_eq!(grid.unfilled_cells().len(), (rows * cols) as usize);
            assert_eq!(grid.to_matrix().len(), rows as usize);
            assert!(grid.to_matrix().iter().all(|r| r.len() == cols as usize));
        }
    }

    #[test]
    fn zero_dimensions_rejected() {
        assert!(matches!(
            ColorGrid::new(0, 3),
            Err(ComposeError::InvalidConfig(_))
        ));
        let mut grid = ColorGrid::new(2, 2).unwrap();
        grid.set_cell(0, 0, RED).unwrap();
        assert!(grid.set_dimensions(2, 0).is_err());
        // Failed resize leaves content alone.
        assert_eq!(grid.cell(0, 0).unwrap(), Some(RED));
    }

    #[test]
    fn set_dimensions_resets_content() {
        let mut grid = ColorGrid::new(2, 2).unwrap();
        grid.fill_all(RED);
        grid.set_dimensions(3, 1).unwrap();
        assert_eq!(grid.rows(), 3);
        assert_eq!(grid.cols(), 1);
        assert_eq!(grid.unfilled_cells().len(), 3);
        assert_eq!(grid.history(), &[RED]);
    }

    #[test]
    fn set_cell_out_of_bounds_is_rejected() {
        let mut grid = ColorGrid::new(2, 3).unwrap();
        let err = grid.set_cell(2, 0, RED).unwrap_err();
        assert!(matches!(
            err,
            ComposeError::OutOfBounds {
                row: 2,
                col: 0,
                rows: 2,
                cols: 3
            }
        ));
        assert!(grid.set_cell(0, 3, RED).is_err());
        assert_eq!(grid.unfilled_cells().len(), 6);
        assert!(grid.history().is_empty());
    }

    #[test]
    fn resolved_falls_back_to_default() {
        let mut grid = ColorGrid::new(1, 2).unwrap();
        grid.set_cell(0, 1, RED).unwrap();
        assert_eq!(grid.resolved(0, 0).unwrap(), Color::WHITE);
        grid.set_default_color(GRAY);
        assert_eq!(grid.resolved(0, 0).unwrap(), GRAY);
        assert_eq!(grid.resolved(0, 1).unwrap(), RED);
    }

    #[test]
    fn clear_cell_marks_unfilled() {
        let mut grid = ColorGrid::new(1, 1).unwrap();
        grid.set_cell(0, 0, RED).unwrap();
        grid.clear_cell(0, 0).unwrap();
        assert_eq!(grid.cell(0, 0).unwrap(), None);
    }

    #[test]
    fn fill_row_touches_exactly_one_row() {
        let mut grid = ColorGrid::new(3, 4).unwrap();
        grid.fill_row(1, RED).unwrap();
        for r in 0..3 {
            for c in 0..4 {
                let expected = if r == 1 { Some(RED) } else { None };
                assert_eq!(grid.cell(r, c).unwrap(), expected, "cell ({r}, {c})");
            }
        }
        assert!(grid.fill_row(3, RED).is_err());
    }

    #[test]
    fn fill_column_touches_exactly_one_column() {
        let mut grid = ColorGrid::new(3, 4).unwrap();
        grid.fill_column(2, BLUE).unwrap();
        let filled = 12 - grid.unfilled_cells().len();
        assert_eq!(filled, 3);
        for r in 0..3 {
            assert_eq!(grid.cell(r, 2).unwrap(), Some(BLUE));
        }
        assert!(grid.fill_column(4, BLUE).is_err());
    }

    #[test]
    fn fill_unfilled_keeps_existing_colors() {
        let mut grid = ColorGrid::new(2, 2).unwrap();
        grid.set_cell(0, 0, RED).unwrap();
        let painted = grid.fill_unfilled(GREEN);
        assert_eq!(painted, 3);
        assert_eq!(grid.cell(0, 0).unwrap(), Some(RED));
        assert_eq!(grid.cell(1, 1).unwrap(), Some(GREEN));
        assert!(grid.unfilled_cells().is_empty());
        assert_eq!(grid.fill_unfilled(BLUE), 0);
        assert!(!grid.history().contains(&BLUE));
    }

    #[test]
    fn unfilled_cells_are_row_major() {
        let mut grid = ColorGrid::new(2, 2).unwrap();
        grid.set_cell(0, 1, RED).unwrap();
        assert_eq!(grid.unfilled_cells(), vec![(0, 0), (1, 0), (1, 1)]);
    }

    #[test]
    fn history_is_distinct_most_recent_first() {
        let mut grid = ColorGrid::new(2, 2).unwrap();
        grid.set_cell(0, 0, RED).unwrap();
        grid.set_cell(0, 1, GREEN).unwrap();
        grid.set_cell(1, 0, RED).unwrap();
        grid.fill_row(1, BLUE).unwrap();
        assert_eq!(grid.history(), &[BLUE, GREEN, RED]);
    }

    #[test]
    fn render_native_uses_one_pixel_per_cell() {
        let mut grid = ColorGrid::new(2, 3).unwrap();
        grid.set_cell(1, 2, RED).unwrap();
        let img = grid.render_native();
        assert_eq!(img.dimensions(), (3, 2));
        assert_eq!(*img.get_pixel(2, 1), RED.to_rgb());
        assert_eq!(*img.get_pixel(0, 0), Color::WHITE.to_rgb());
    }

    #[test]
    fn render_two_by_two_to_four_by_four_has_crisp_quadrants() {
        let colors = [RED, GREEN, BLUE, GRAY];
        let grid = ColorGrid::from_colors(2, 2, &colors).unwrap();
        let img = grid.render(4, 4).unwrap();
        for y in 0..4 {
            for x in 0..4 {
                let expected = match (x < 2, y < 2) {
                    (true, true) => RED,
                    (false, true) => GREEN,
                    (true, false) => BLUE,
                    (false, false) => GRAY,
                };
                assert_eq!(*img.get_pixel(x, y), expected.to_rgb(), "pixel ({x}, {y})");
            }
        }
    }

    #[test]
    fn render_non_integer_scale_never_blends() {
        let colors = [RED, GREEN, BLUE];
        let grid = ColorGrid::from_colors(1, 3, &colors).unwrap();
        let img = grid.render(10, 1).unwrap();
        let allowed = [RED.to_rgb(), GREEN.to_rgb(), BLUE.to_rgb()];
        assert!(img.pixels().all(|p| allowed.contains(p)));
        assert_eq!(*img.get_pixel(0, 0), RED.to_rgb());
        assert_eq!(*img.get_pixel(9, 0), BLUE.to_rgb());
    }

    #[test]
    fn render_rejects_zero_target() {
        let grid = ColorGrid::new(2, 2).unwrap();
        assert!(matches!(
            grid.render(0, 4),
            Err(ComposeError::InvalidConfig(_))
        ));
    }

    #[test]
    fn render_cells_scales_by_cell_size() {
        let grid = ColorGrid::from_colors(2, 3, &[RED; 6]).unwrap();
        let img = grid.render_cells(100).unwrap();
        assert_eq!(img.dimensions(), (300, 200));
    }

    #[test]
    fn from_colors_needs_enough_colors() {
        let result = ColorGrid::from_colors(2, 2, &[RED, GREEN, BLUE]);
        assert!(matches!(result, Err(ComposeError::InvalidConfig(_))));
    }

    #[test]
    fn export_resolution_parses_presets_and_custom() {
        assert_eq!(
            "512x256".parse::<ExportResolution>().unwrap(),
            ExportResolution::Wide512x256
        );
        assert_eq!(
            "300X200".parse::<ExportResolution>().unwrap().dimensions(),
            Dimensions::new(300, 200)
        );
        assert!("300".parse::<ExportResolution>().is_err());
        assert!("4x4".parse::<ExportResolution>().is_err());
        assert!("4097x256".parse::<ExportResolution>().is_err());
        assert!("4096x8".parse::<ExportResolution>().is_ok());
    }

    #[test]
    fn oversized_grid_is_rejected_without_mutation() {
        assert!(matches!(
            ColorGrid::new(ColorGrid::MAX_SIDE + 1, 1),
            Err(ComposeError::InvalidConfig(_))
        ));
        let mut grid = ColorGrid::new(2, 2).unwrap();
        assert!(grid.set_dimensions(1, u32::MAX).is_err());
        assert_eq!((grid.rows(), grid.cols()), (2, 2));
        assert!(serde_json::from_str::<ColorGrid>(
            r#"{"rows": 100000, "cols": 100000, "matrix": []}"#
        )
        .is_err());
    }

    #[test]
    fn oversized_render_is_a_config_error() {
        let grid = ColorGrid::new(2, 2).unwrap();
        assert!(matches!(
            grid.render(u32::MAX, u32::MAX),
            Err(ComposeError::InvalidConfig(_))
        ));
        assert!(matches!(
            grid.render_cells(u32::MAX),
            Err(ComposeError::InvalidConfig(_))
        ));
        assert!(matches!(
            grid.render_cells(10_000),
            Err(ComposeError::InvalidConfig(_))
        ));
    }

    #[test]
    fn json_uses_matrix_layout_with_nulls() {
        let mut grid = ColorGrid::new(1, 2).unwrap();
        grid.set_cell(0, 0, RED).unwrap();
        let json = serde_json::to_value(&grid).unwrap();
        assert_eq!(json["rows"], 1);
        assert_eq!(json["cols"], 2);
        assert_eq!(json["matrix"][0][0], "#ff0000");
        assert!(json["matrix"][0][1].is_null());

        let back: ColorGrid = serde_json::from_value(json).unwrap();
        assert_eq!(back.cell(0, 0).unwrap(), Some(RED));
        assert_eq!(back.cell(0, 1).unwrap(), None);
    }

    #[test]
    fn json_rejects_mismatched_shape() {
        let json = r##"{"rows": 2, "cols": 2, "matrix": [["#ffffff", null]]}"##;
        assert!(serde_json::from_str::<ColorGrid>(json).is_err());
    }
}
