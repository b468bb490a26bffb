//! Download jobs and the job lifecycle state machine.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::FetchError;
use crate::metadata::MediaInfo;

/// Source platform of a URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Platform {
    /// YouTube: format and subtitle selection.
    YouTube,
    /// Twitter / X: optional GIF conversion.
    #[default]
    Twitter,
}

impl Platform {
    /// Whether probes expose format and subtitle choices.
    #[must_use]
    pub const fn supports_selection(self) -> bool {
        matches!(self, Self::YouTube)
    }

    /// Whether downloads may be converted to GIF.
    #[must_use]
    pub const fn supports_gif(self) -> bool {
        matches!(self, Self::Twitter)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::YouTube => f.write_str("YouTube"),
            Self::Twitter => f.write_str("Twitter"),
        }
    }
}

impl std::str::FromStr for Platform {
    type Err = FetchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "youtube" | "yt" => Ok(Self::YouTube),
            "twitter" | "x" => Ok(Self::Twitter),
            other => Err(FetchError::InvalidJob(format!(
                "unknown platform '{other}': expected youtube or twitter"
            ))),
        }
    }
}

/// Everything needed to run one download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadJob {
    /// Media page URL.
    pub url: String,
    /// Directory the extractor writes into.
    pub target_dir: PathBuf,
    /// Source platform.
    pub platform: Platform,
    /// Format id from a probe (YouTube only).
    #[serde(default)]
    pub format_id: Option<String>,
    /// Subtitle language from a probe (YouTube only).
    #[serde(default)]
    pub subtitle_lang: Option<String>,
    /// Recode the result to GIF (Twitter only).
    #[serde(default)]
    pub convert_to_gif: bool,
}

impl DownloadJob {
    /// A plain download with no selections.
    #[must_use]
    pub fn new(url: impl Into<String>, target_dir: impl Into<PathBuf>, platform: Platform) -> Self {
        Self {
            url: url.into(),
            target_dir: target_dir.into(),
            platform,
            format_id: None,
            subtitle_lang: None,
            convert_to_gif: false,
        }
    }

    /// Whether the job carries choices that only a probe can supply.
    #[must_use]
    pub const fn needs_probe(&self) -> bool {
        self.format_id.is_some() || self.subtitle_lang.is_some()
    }

    /// Check the job before handing it to a worker.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidJob`] describing the first problem.
    pub fn validate(&self) -> Result<(), FetchError> {
        validate_url(&self.url)?;
        if self.target_dir.as_os_str().is_empty() {
            return Err(FetchError::InvalidJob(
                "target directory is empty".to_owned(),
            ));
        }
        if self.convert_to_gif && !self.platform.supports_gif() {
            return Err(FetchError::InvalidJob(format!(
                "gif conversion is not offered for {}",
                self.platform
            )));
        }
        if self.needs_probe() && !self.platform.supports_selection() {
            return Err(FetchError::InvalidJob(format!(
                "format and subtitle selection is not offered for {}",
                self.platform
            )));
        }
        if self.format_id.as_deref().is_some_and(str::is_empty)
            || self.subtitle_lang.as_deref().is_some_and(str::is_empty)
        {
            return Err(FetchError::InvalidJob(
                "format and subtitle selections must not be blank".to_owned(),
            ));
        }
        Ok(())
    }
}

/// Check that `url` is a non-empty http(s) URL.
///
/// # Errors
///
/// Returns [`FetchError::InvalidJob`] otherwise.
pub fn validate_url(url: &str) -> Result<(), FetchError> {
    let url = url.trim();
    if url.is_empty() {
        return Err(FetchError::InvalidJob("url is empty".to_owned()));
    }
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"));
    match rest {
        Some(host) if !host.is_empty() => Ok(()),
        _ => Err(FetchError::InvalidJob(format!(
            "'{url}' is not an http(s) url"
        ))),
    }
}

/// Result of a successful download.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct JobReport {
    /// Final file paths reported by the extractor.
    pub files: Vec<PathBuf>,
    /// The GIF produced by a converting download, if any.
    pub gif: Option<PathBuf>,
}

/// Lifecycle of the current job.
///
/// ```text
/// Idle -> Probing -> Ready -> Downloading -> Completed | Failed
///   \______________________/^
/// ```
///
/// A failed probe falls back to `Idle`. Terminal states only leave via
/// [`reset`](Self::reset).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum JobState {
    /// Nothing running.
    #[default]
    Idle,
    /// A probe is running.
    Probing,
    /// Probe finished; choices are available.
    Ready(MediaInfo),
    /// A download is running.
    Downloading,
    /// The download finished.
    Completed(JobReport),
    /// The download failed with this message.
    Failed(String),
}

impl JobState {
    /// Short state name for messages.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Probing => "probing",
            Self::Ready(_) => "ready",
            Self::Downloading => "downloading",
            Self::Completed(_) => "completed",
            Self::Failed(_) => "failed",
        }
    }

    /// Returns `true` while a worker should be running.
    #[must_use]
    pub const fn is_busy(&self) -> bool {
        matches!(self, Self::Probing | Self::Downloading)
    }

    /// Returns `true` for `Completed` and `Failed`.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed(_) | Self::Failed(_))
    }

    /// `Idle | Ready -> Probing`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidTransition`] from any other state.
    pub fn begin_probe(&mut self) -> Result<(), FetchError> {
        match self {
            Self::Idle | Self::Ready(_) => {
                *self = Self::Probing;
                Ok(())
            }
            _ => Err(self.refuse("probe")),
        }
    }

    /// `Probing -> Ready(info)`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidTransition`] unless probing.
    pub fn probe_succeeded(&mut self, info: MediaInfo) -> Result<(), FetchError> {
        if *self != Self::Probing {
            return Err(self.refuse("finish a probe"));
        }
        *self = Self::Ready(info);
        Ok(())
    }

    /// `Probing -> Idle`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidTransition`] unless probing.
    pub fn probe_failed(&mut self) -> Result<(), FetchError> {
        if *self != Self::Probing {
            return Err(self.refuse("fail a probe"));
        }
        *self = Self::Idle;
        Ok(())
    }

    /// `Ready -> Downloading`, or `Idle -> Downloading` for a job that
    /// needs no probe.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidTransition`] from any other state.
    pub fn begin_download(&mut self, job: &DownloadJob) -> Result<(), FetchError> {
        match self {
            Self::Ready(_) => {}
            Self::Idle if !job.needs_probe() => {}
            _ => return Err(self.refuse("start a download")),
        }
        *self = Self::Downloading;
        Ok(())
    }

    /// `Downloading -> Completed | Failed`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidTransition`] unless downloading.
    pub fn finish(&mut self, result: Result<JobReport, String>) -> Result<(), FetchError> {
        if *self != Self::Downloading {
            return Err(self.refuse("finish a download"));
        }
        *self = match result {
            Ok(report) => Self::Completed(report),
            Err(message) => Self::Failed(message),
        };
        Ok(())
    }

    /// Back to `Idle` from any non-busy state.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidTransition`] while probing or
    /// downloading.
    pub fn reset(&mut self) -> Result<(), FetchError> {
        if self.is_busy() {
            return Err(self.refuse("reset"));
        }
        *self = Self::Idle;
        Ok(())
    }

    fn refuse(&self, action: &'static str) -> FetchError {
        FetchError::InvalidTransition {
            from: self.name(),
            action,
        }
    }
}
