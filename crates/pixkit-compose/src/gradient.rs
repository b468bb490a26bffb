//! Multi-stop linear color gradients.

use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::color::Color;
use crate::types::{ComposeError, Dimensions};

/// A control point of a [`Gradient`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Stop {
    /// Position along the gradient, `0.0..=1.0`.
    pub position: f32,
    /// Color at this position.
    pub color: Color,
}

impl Stop {
    /// Create a stop, clamping `position` into `0.0..=1.0`.
    #[must_use]
    pub fn new(position: f32, color: Color) -> Self {
        Self {
            position: position.clamp(0.0, 1.0),
            color,
        }
    }
}

/// A gradient over two or more stops, kept sorted by position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Stop>", into = "Vec<Stop>")]
pub struct Gradient {
    stops: Vec<Stop>,
}

impl Default for Gradient {
    /// Red at 0, blue at 1.
    fn default() -> Self {
        Self {
            stops: vec![
                Stop::new(0.0, Color::new(255, 0, 0)),
                Stop::new(1.0, Color::new(0, 0, 255)),
            ],
        }
    }
}

impl Gradient {
    /// Minimum number of stops.
    pub const MIN_STOPS: usize = 2;
    /// Default strip size for [`render_strip`](Self::render_strip).
    pub const STRIP_WIDTH: u32 = 256;
    /// Default strip height.
    pub const STRIP_HEIGHT: u32 = 24;

    /// Build from arbitrary stops.
    ///
    /// # Errors
    ///
    /// Returns [`ComposeError::InvalidConfig`] with fewer than two stops.
    pub fn new(stops: Vec<Stop>) -> Result<Self, ComposeError> {
        if stops.len() < Self::MIN_STOPS {
            return Err(ComposeError::InvalidConfig(format!(
                "gradient needs at least {} stops, got {}",
                Self::MIN_STOPS,
                stops.len()
            )));
        }
        let mut g = Self {
            stops: stops
                .into_iter()
                .map(|s| Stop::new(s.position, s.color))
                .collect(),
        };
        g.sort();
        Ok(g)
    }

    /// Stops in position order.
    #[must_use]
    pub fn stops(&self) -> &[Stop] {
        &self.stops
    }

    /// Insert a stop; returns its index after sorting.
    pub fn add_stop(&mut self, position: f32, color: Color) -> usize {
        let stop = Stop::new(position, color);
        self.stops.push(stop);
        self.sort();
        self.stops
            .iter()
            .rposition(|s| *s == stop)
            .unwrap_or(self.stops.len() - 1)
    }

    /// Remove the stop at `index`.
    ///
    /// Returns `false` (and keeps the stop) if the index is invalid or
    /// removal would leave fewer than two stops.
    pub fn remove_stop(&mut self, index: usize) -> bool {
        if index >= self.stops.len() || self.stops.len() <= Self::MIN_STOPS {
            return false;
        }
        self.stops.remove(index);
        true
    }

    /// Move the stop at `index` to `position`; returns its new index.
    ///
    /// Returns `None` for an invalid index.
    pub fn move_stop(&mut self, index: usize, position: f32) -> Option<usize> {
        let stop = self.stops.get_mut(index)?;
        stop.position = position.clamp(0.0, 1.0);
        let moved = *stop;
        self.sort();
        self.stops.iter().position(|s| *s == moved)
    }

    /// Color at `t` (clamped to `0.0..=1.0`).
    ///
    /// Channels are linearly interpolated between the surrounding stops
    /// and truncated toward zero. Coincident stops resolve to the later
    /// one. Past the last stop the last color holds.
    #[must_use]
    pub fn color_at(&self, t: f32) -> Color {
        let t = t.clamp(0.0, 1.0);
        for pair in self.stops.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if t <= b.position {
                let span = b.position - a.position;
                if span <= f32::EPSILON {
                    return b.color;
                }
                let ratio = ((t - a.position) / span).clamp(0.0, 1.0);
                return lerp(a.color, b.color, ratio);
            }
        }
        self.stops
            .last()
            .map_or(Color::BLACK, |s| s.color)
    }

    /// Render a horizontal strip sampling `t = x / (width - 1)`.
    ///
    /// # Errors
    ///
    /// Returns [`ComposeError::InvalidConfig`] if either axis is zero or
    /// the strip exceeds the canvas limits.
    pub fn render_strip(&self, width: u32, height: u32) -> Result<RgbImage, ComposeError> {
        if width == 0 || height == 0 {
            return Err(ComposeError::InvalidConfig(format!(
                "strip size must be non-zero, got {width}x{height}"
            )));
        }
        Dimensions::new(width, height).ensure_canvas()?;
        let denom = (width - 1).max(1);
        #[allow(clippy::cast_precision_loss)]
        let column: Vec<_> = (0..width)
            .map(|x| self.color_at(x as f32 / denom as f32).to_rgb())
            .collect();
        Ok(RgbImage::from_fn(width, height, |x, _| column[x as usize]))
    }

    fn sort(&mut self) {
        self.stops.sort_by(|a, b| a.position.total_cmp(&b.position));
    }
}

impl TryFrom<Vec<Stop>> for Gradient {
    type Error = ComposeError;

    fn try_from(stops: Vec<Stop>) -> Result<Self, Self::Error> {
        Self::new(stops)
    }
}

impl From<Gradient> for Vec<Stop> {
    fn from(g: Gradient) -> Self {
        g.stops
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn lerp(a: Color, b: Color, ratio: f32) -> Color {
    let ch = |x: u8, y: u8| {
        let x = f32::from(x);
        let y = f32::from(y);
        (y - x).mul_add(ratio, x).trunc().clamp(0.0, 255.0) as u8
    };
    Color::new(ch(a.r, b.r), ch(a.g, b.g), ch(a.b, b.b))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const RED: Color = Color::new(255, 0, 0);
    const BLUE: Color = Color::new(0, 0, 255);
    const WHITE: Color = Color::WHITE;

    #[test]
    fn default_runs_red_to_blue() {
        let g = Gradient::default();
        assert_eq!(g.color_at(0.0), RED);
        assert_eq!(g.color_at(1.0), BLUE);
        assert_eq!(g.color_at(0.5), Color::new(127, 0, 127));
    }

    #[test]
    fn stop_positions_return_stop_colors() {
        let mut g = Gradient::default();
        g.add_stop(0.25, WHITE);
        assert_eq!(g.color_at(0.25), WHITE);
    }

    #[test]
    fn out_of_range_t_is_clamped() {
        let g = Gradient::default();
        assert_eq!(g.color_at(-3.0), RED);
        assert_eq!(g.color_at(7.0), BLUE);
    }

    #[test]
    fn before_first_stop_holds_first_color() {
        let g = Gradient::new(vec![Stop::new(0.5, RED), Stop::new(1.0, BLUE)]).unwrap();
        assert_eq!(g.color_at(0.1), RED);
    }

    #[test]
    fn coincident_stops_take_later_color() {
        let g = Gradient::new(vec![
            Stop::new(0.0, RED),
            Stop::new(0.0, WHITE),
            Stop::new(1.0, BLUE),
        ])
        .unwrap();
        assert_eq!(g.color_at(0.0), WHITE);
    }

    #[test]
    fn shared_position_ends_the_earlier_segment() {
        let g = Gradient::new(vec![
            Stop::new(0.0, RED),
            Stop::new(0.5, WHITE),
            Stop::new(0.5, BLUE),
            Stop::new(1.0, BLUE),
        ])
        .unwrap();
        assert_eq!(g.color_at(0.5), WHITE);
        assert_eq!(g.color_at(0.75), BLUE);
    }

    #[test]
    fn new_needs_two_stops() {
        assert!(Gradient::new(vec![Stop::new(0.0, RED)]).is_err());
    }

    #[test]
    fn new_sorts_and_clamps() {
        let g = Gradient::new(vec![Stop::new(2.0, BLUE), Stop::new(-1.0, RED)]).unwrap();
        assert_eq!(g.stops()[0], Stop::new(0.0, RED));
        assert!((g.stops()[1].position - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn add_stop_returns_sorted_index() {
        let mut g = Gradient::default();
        assert_eq!(g.add_stop(0.5, WHITE), 1);
        assert_eq!(g.stops().len(), 3);
    }

    #[test]
    fn remove_stop_keeps_minimum() {
        let mut g = Gradient::default();
        assert!(!g.remove_stop(0));
        g.add_stop(0.5, WHITE);
        assert!(g.remove_stop(1));
        assert!(!g.remove_stop(5));
        assert_eq!(g.stops().len(), 2);
    }

    #[test]
    fn move_stop_resorts() {
        let mut g = Gradient::default();
        g.add_stop(0.2, WHITE);
        let idx = g.move_stop(1, 0.9).unwrap();
        assert_eq!(idx, 1);
        let idx = g.move_stop(1, 1.5).unwrap();
        assert!((g.stops()[idx].position - 1.0).abs() < f32::EPSILON);
        assert!(g.move_stop(9, 0.1).is_none());
    }

    #[test]
    fn strip_spans_both_ends() {
        let strip = Gradient::default().render_strip(256, 24).unwrap();
        assert_eq!(strip.dimensions(), (256, 24));
        assert_eq!(*strip.get_pixel(0, 0), RED.to_rgb());
        assert_eq!(*strip.get_pixel(255, 23), BLUE.to_rgb());
        assert_eq!(strip.get_pixel(100, 0), strip.get_pixel(100, 20));
    }

    #[test]
    fn oversized_strip_is_rejected() {
        assert!(matches!(
            Gradient::default().render_strip(u32::MAX, 24),
            Err(ComposeError::InvalidConfig(_))
        ));
    }

    #[test]
    fn json_round_trip_validates() {
        let g = Gradient::default();
        let json = serde_json::to_string(&g).unwrap();
        let back: Gradient = serde_json::from_str(&json).unwrap();
        assert_eq!(back, g);
        assert!(serde_json::from_str::<Gradient>("[]").is_err());
    }
}
