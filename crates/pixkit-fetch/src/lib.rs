//! pixkit-fetch: Media download shell around an external extractor.
//!
//! Flow: URL + platform -> probe (formats, subtitles) -> download job on
//! a worker thread -> progress events -> one terminal event -> optional
//! GIF preview.
//!
//! The extractor is reached through the [`MediaExtractor`] trait;
//! [`YtDlp`] drives the `yt-dlp` executable as a subprocess.

pub mod downloader;
pub mod error;
pub mod extractor;
pub mod gif;
pub mod job;
pub mod metadata;
pub mod worker;

pub use downloader::Downloader;
pub use error::FetchError;
pub use extractor::{FetchConfig, FetchOutcome, MediaExtractor, Progress, YtDlp};
pub use gif::{GifPreview, Playback, Player};
pub use job::{DownloadJob, JobReport, JobState, Platform};
pub use metadata::{FormatOption, MediaInfo, SubtitleOption};
pub use worker::{CancelToken, JobEvent};
