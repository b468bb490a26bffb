//! Error type for the download shell.

use std::path::PathBuf;

/// Errors that can occur while probing or downloading media.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// A job or URL failed validation.
    #[error("invalid job: {0}")]
    InvalidJob(String),

    /// The requested action is not allowed in the current state.
    #[error("cannot {action} while {from}")]
    InvalidTransition {
        /// Name of the current state.
        from: &'static str,
        /// The attempted action.
        action: &'static str,
    },

    /// A worker is already running.
    #[error("a job is already in flight")]
    JobInFlight,

    /// The extractor program could not be started.
    #[error("failed to start '{program}': {source}")]
    Spawn {
        /// Program path as configured.
        program: PathBuf,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// Fetching media information failed.
    #[error("probe failed: {0}")]
    Probe(String),

    /// The download itself failed.
    #[error("download failed: {0}")]
    Download(String),

    /// The extractor's metadata could not be parsed.
    #[error("malformed media metadata: {0}")]
    Metadata(#[source] serde_json::Error),

    /// A GIF could not be decoded for preview.
    #[error("failed to decode gif: {0}")]
    Preview(#[source] image::ImageError),

    /// The job was cancelled before finishing.
    #[error("job cancelled")]
    Cancelled,

    /// Filesystem or pipe error.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
