//! GIF preview: decoded frames plus a clock-free playback model.
//!
//! The [`Player`] never reads a clock. Callers advance it with
//! [`Player::tick`] and draw [`Player::current_frame`].

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::time::Duration;

use image::codecs::gif::GifDecoder;
use image::{AnimationDecoder, RgbaImage};

use crate::error::FetchError;

/// Delay used for frames that declare none.
pub const DEFAULT_FRAME_DELAY: Duration = Duration::from_millis(100);

/// One decoded frame.
#[derive(Debug, Clone)]
pub struct GifFrame {
    /// Full-canvas RGBA pixels.
    pub image: RgbaImage,
    /// How long the frame stays on screen.
    pub delay: Duration,
}

/// A decoded GIF ready for playback.
#[derive(Debug, Clone)]
pub struct GifPreview {
    path: Option<PathBuf>,
    frames: Vec<GifFrame>,
    total: Duration,
}

impl GifPreview {
    /// Preview box the player scales into.
    pub const DISPLAY_BOX: (u32, u32) = (300, 200);

    /// Decode GIF bytes.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Preview`] if the data is not a GIF or has
    /// no frames.
    pub fn decode(bytes: &[u8]) -> Result<Self, FetchError> {
        let decoder = GifDecoder::new(Cursor::new(bytes)).map_err(FetchError::Preview)?;
        let frames: Vec<GifFrame> = decoder
            .into_frames()
            .collect_frames()
            .map_err(FetchError::Preview)?
            .into_iter()
            .map(|frame| {
                let (num, den) = frame.delay().numer_denom_ms();
                let ms = if den == 0 { 0 } else { num / den };
                let delay = if ms == 0 {
                    DEFAULT_FRAME_DELAY
                } else {
                    Duration::from_millis(u64::from(ms))
                };
                GifFrame {
                    image: frame.into_buffer(),
                    delay,
                }
            })
            .collect();
        if frames.is_empty() {
            return Err(FetchError::Preview(image::ImageError::Decoding(
                image::error::DecodingError::new(
                    image::error::ImageFormatHint::Exact(image::ImageFormat::Gif),
                    "gif has no frames",
                ),
            )));
        }
        let total = frames.iter().map(|f| f.delay).sum();
        Ok(Self {
            path: None,
            frames,
            total,
        })
    }

    /// Read and decode a GIF file.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Io`] if the file cannot be read, or see
    /// [`decode`](Self::decode).
    pub fn open(path: &Path) -> Result<Self, FetchError> {
        let bytes = std::fs::read(path)?;
        let mut preview = Self::decode(&bytes)?;
        preview.path = Some(path.to_path_buf());
        tracing::debug!(
            path = %path.display(),
            frames = preview.frames.len(),
            "gif loaded"
        );
        Ok(preview)
    }

    /// Source file, if opened from disk.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// All frames in order.
    #[must_use]
    pub fn frames(&self) -> &[GifFrame] {
        &self.frames
    }

    /// Length of one loop.
    #[must_use]
    pub const fn total_duration(&self) -> Duration {
        self.total
    }

    /// Canvas size.
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        self.frames
            .first()
            .map_or((0, 0), |f| f.image.dimensions())
    }

    /// Canvas size scaled to fit [`DISPLAY_BOX`](Self::DISPLAY_BOX),
    /// keeping the aspect ratio.
    #[must_use]
    pub fn display_size(&self) -> (u32, u32) {
        let (w, h) = self.dimensions();
        let (bw, bh) = Self::DISPLAY_BOX;
        if w == 0 || h == 0 {
            return (0, 0);
        }
        let (w64, h64) = (u64::from(w), u64::from(h));
        let (bw64, bh64) = (u64::from(bw), u64::from(bh));
        // Compare w/h against bw/bh without floats.
        if w64 * bh64 >= h64 * bw64 {
            (bw, u32::try_from((h64 * bw64 / w64).max(1)).unwrap_or(bh))
        } else {
            (u32::try_from((w64 * bh64 / h64).max(1)).unwrap_or(bw), bh)
        }
    }

    /// Index of the frame shown `elapsed` into playback, looping.
    #[must_use]
    pub fn frame_index_at(&self, elapsed: Duration) -> usize {
        if self.total.is_zero() {
            return 0;
        }
        let mut t = Duration::from_nanos(
            u64::try_from(elapsed.as_nanos() % self.total.as_nanos()).unwrap_or(0),
        );
        for (i, frame) in self.frames.iter().enumerate() {
            if t < frame.delay {
                return i;
            }
            t -= frame.delay;
        }
        self.frames.len() - 1
    }
}

/// Playback state of a [`Player`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Playback {
    /// Rewound to the first frame.
    #[default]
    Stopped,
    /// Advancing on [`Player::tick`].
    Playing,
    /// Holding the current frame.
    Paused,
}

/// Play/pause/stop control over one loaded preview.
#[derive(Debug, Default)]
pub struct Player {
    preview: Option<GifPreview>,
    state: Playback,
    position: Duration,
}

impl Player {
    /// An empty player.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the loaded preview and start playing it.
    pub fn load(&mut self, preview: GifPreview) {
        self.preview = Some(preview);
        self.position = Duration::ZERO;
        self.state = Playback::Playing;
    }

    /// The loaded preview.
    #[must_use]
    pub const fn preview(&self) -> Option<&GifPreview> {
        self.preview.as_ref()
    }

    /// Current playback state.
    #[must_use]
    pub const fn state(&self) -> Playback {
        self.state
    }

    /// Start or resume. No-op with nothing loaded.
    pub fn play(&mut self) {
        if self.preview.is_some() {
            self.state = Playback::Playing;
        }
    }

    /// Hold the current frame.
    pub fn pause(&mut self) {
        if self.state == Playback::Playing {
            self.state = Playback::Paused;
        }
    }

    /// Pause when playing, otherwise play.
    pub fn toggle(&mut self) {
        if self.state == Playback::Playing {
            self.pause();
        } else {
            self.play();
        }
    }

    /// Rewind to the first frame and stop.
    pub fn stop(&mut self) {
        self.position = Duration::ZERO;
        self.state = Playback::Stopped;
    }

    /// Rewind and play from the start.
    pub fn restart(&mut self) {
        self.stop();
        self.play();
    }

    /// Advance the playhead by `dt` if playing.
    pub fn tick(&mut self, dt: Duration) {
        if self.state != Playback::Playing {
            return;
        }
        let Some(preview) = &self.preview else {
            return;
        };
        let total = preview.total_duration();
        self.position += dt;
        if !total.is_zero() && self.position >= total {
            self.position = Duration::from_nanos(
                u64::try_from(self.position.as_nanos() % total.as_nanos()).unwrap_or(0),
            );
        }
    }

    /// Index of the frame at the playhead.
    #[must_use]
    pub fn frame_index(&self) -> Option<usize> {
        self.preview
            .as_ref()
            .map(|p| p.frame_index_at(self.position))
    }

    /// The frame at the playhead.
    #[must_use]
    pub fn current_frame(&self) -> Option<&GifFrame> {
        let preview = self.preview.as_ref()?;
        preview.frames.get(preview.frame_index_at(self.position))
    }

    /// Stop playback and unload the preview.
    ///
    /// Only the player is affected; a running download keeps going.
    pub fn close(&mut self) {
        self.stop();
        self.preview = None;
    }
}
