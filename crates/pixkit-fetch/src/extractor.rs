//! The media extractor seam and its `yt-dlp` subprocess driver.
//!
//! [`YtDlp`] never links the extractor; it runs the executable, reads
//! its JSON dump for probes, and follows a line protocol of marker
//! prefixes on its output during downloads.

use std::fmt;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::FetchError;
use crate::job::{DownloadJob, Platform};
use crate::metadata::MediaInfo;
use crate::worker::CancelToken;

/// A progress update from a running download.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Progress {
    /// Bytes are arriving; `percent` when the total is known.
    Downloading {
        /// `0.0..=100.0`.
        percent: Option<f32>,
    },
    /// Transfer done; post-processing may follow.
    Finished,
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Downloading {
                percent: Some(p),
            } => write!(f, "Downloading... {p:.1}%"),
            Self::Downloading { percent: None } => f.write_str("Downloading..."),
            Self::Finished => f.write_str("Download complete, processing..."),
        }
    }
}

/// Files a finished download produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchOutcome {
    /// Final paths after post-processing, in report order.
    pub files: Vec<PathBuf>,
}

/// Something that can probe and fetch media.
///
/// Implementations run on a worker thread, so they must be `Send + Sync`.
pub trait MediaExtractor: Send + Sync {
    /// Fetch title, formats, and subtitles for `url`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Probe`] or [`FetchError::Metadata`] on
    /// failure.
    fn probe(&self, url: &str, platform: Platform) -> Result<MediaInfo, FetchError>;

    /// Download `job`, reporting progress until done or cancelled.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Cancelled`] if `cancel` fires, otherwise
    /// [`FetchError::Download`] or a spawn/IO error.
    fn fetch(
        &self,
        job: &DownloadJob,
        on_progress: &mut dyn FnMut(Progress),
        cancel: &CancelToken,
    ) -> Result<FetchOutcome, FetchError>;
}

/// Settings for the `yt-dlp` driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Executable to run.
    pub program: PathBuf,
    /// Arguments placed before all others, e.g. `["-m", "yt_dlp"]` when
    /// `program` is a Python interpreter.
    pub launcher_args: Vec<String>,
    /// How often a running download checks for cancellation.
    pub poll_interval_ms: u64,
}

impl FetchConfig {
    /// Default executable name, resolved on `PATH`.
    pub const DEFAULT_PROGRAM: &'static str = "yt-dlp";
    /// Default cancellation poll interval.
    pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from(Self::DEFAULT_PROGRAM),
            launcher_args: Vec::new(),
            poll_interval_ms: Self::DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

const PROGRESS_MARKER: &str = "pixkit-progress";
const FILE_MARKER: &str = "pixkit-file";

/// Drives the `yt-dlp` executable.
#[derive(Debug, Clone, Default)]
pub struct YtDlp {
    config: FetchConfig,
}

impl YtDlp {
    /// Create a driver with `config`.
    #[must_use]
    pub const fn new(config: FetchConfig) -> Self {
        Self { config }
    }

    /// Returns `true` if the configured program runs with `--version`.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.command()
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .is_ok_and(|s| s.success())
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.config.program);
        cmd.args(&self.config.launcher_args);
        cmd
    }

    fn spawn(&self, cmd: &mut Command) -> Result<Child, FetchError> {
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| FetchError::Spawn {
                program: self.config.program.clone(),
                source,
            })
    }

    /// Arguments for a download, excluding the launcher prefix.
    #[must_use]
    pub fn download_args(job: &DownloadJob) -> Vec<String> {
        let template = job.target_dir.join("%(title)s.%(ext)s");
        let mut args = vec![
            "--newline".to_owned(),
            "--progress".to_owned(),
            "--no-simulate".to_owned(),
            "--progress-template".to_owned(),
            format!(
                "download:{PROGRESS_MARKER} %(progress.status)s \
                 %(progress.downloaded_bytes)s %(progress.total_bytes)s"
            ),
            "--print".to_owned(),
            format!("after_move:{FILE_MARKER} %(filepath)s"),
            "-o".to_owned(),
            template.to_string_lossy().into_owned(),
        ];
        if let Some(format) = &job.format_id {
            args.extend(["-f".to_owned(), format.clone()]);
        }
        if let Some(lang) = &job.subtitle_lang {
            args.extend([
                "--write-subs".to_owned(),
                "--sub-langs".to_owned(),
                lang.clone(),
            ]);
        }
        if job.convert_to_gif {
            args.extend(["--recode-video".to_owned(), "gif".to_owned()]);
        }
        args.extend(["--".to_owned(), job.url.trim().to_owned()]);
        args
    }
}

impl MediaExtractor for YtDlp {
    #[tracing::instrument(skip(self))]
    fn probe(&self, url: &str, platform: Platform) -> Result<MediaInfo, FetchError> {
        let mut cmd = self.command();
        cmd.args(["-J", "--skip-download", "--quiet", "--no-warnings", "--"])
            .arg(url.trim());
        let child = self.spawn(&mut cmd)?;
        let output = child.wait_with_output()?;
        if !output.status.success() {
            return Err(FetchError::Probe(failure_message(
                &output.stderr,
                output.status.code(),
            )));
        }
        let info = MediaInfo::from_json(&output.stdout, platform)?;
        tracing::info!(
            title = %info.title,
            formats = info.formats.len(),
            subtitles = info.subtitles.len() - 1,
            "probe finished"
        );
        Ok(info)
    }

    #[tracing::instrument(skip_all, fields(url = %job.url, platform = %job.platform))]
    fn fetch(
        &self,
        job: &DownloadJob,
        on_progress: &mut dyn FnMut(Progress),
        cancel: &CancelToken,
    ) -> Result<FetchOutcome, FetchError> {
        std::fs::create_dir_all(&job.target_dir)?;
        let mut cmd = self.command();
        cmd.args(Self::download_args(job));
        let mut child = self.spawn(&mut cmd)?;

        let (tx, rx) = mpsc::channel();
        let readers = [
            child.stdout.take().map(|s| forward_lines(s, Stream::Out, tx.clone())),
            child.stderr.take().map(|s| forward_lines(s, Stream::Err, tx.clone())),
        ];
        drop(tx);

        let poll = Duration::from_millis(self.config.poll_interval_ms.max(1));
        let mut files = Vec::new();
        let mut last_error: Option<String> = None;
        loop {
            if cancel.is_cancelled() {
                tracing::info!("cancelling download");
                // The child may already have exited.
                let _ = child.kill();
                let _ = child.wait();
                return Err(FetchError::Cancelled);
            }
            match rx.recv_timeout(poll) {
                // Quiet mode sends the progress lines to stderr.
                Ok((stream, line)) => {
                    if let Some(progress) = parse_progress_line(&line) {
                        on_progress(progress);
                    } else if let Some(path) = parse_file_line(&line) {
                        tracing::debug!(path = %path.display(), "file written");
                        files.push(path);
                    } else if matches!(stream, Stream::Err) && !line.trim().is_empty() {
                        last_error = Some(line.trim().to_owned());
                    }
                }
                Err(mpsc::RecvTimeoutError::Timeout) => {}
                Err(mpsc::RecvTimeoutError::Disconnected) => break,
            }
        }
        for reader in readers.into_iter().flatten() {
            let _ = reader.join();
        }

        let status = child.wait()?;
        if !status.success() {
            return Err(FetchError::Download(exit_message(last_error, status.code())));
        }
        tracing::info!(files = files.len(), "download finished");
        Ok(FetchOutcome { files })
    }
}

#[derive(Debug, Clone, Copy)]
enum Stream {
    Out,
    Err,
}

fn forward_lines<R: Read + Send + 'static>(
    source: R,
    stream: Stream,
    tx: mpsc::Sender<(Stream, String)>,
) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || {
        for line in BufReader::new(source).lines() {
            let Ok(line) = line else { break };
            if tx.send((stream, line)).is_err() {
                break;
            }
        }
    })
}

/// Parse a `--progress-template` line.
///
/// The payload is `status downloaded total`; either byte count may be
/// `NA`.
#[must_use]
pub fn parse_progress_line(line: &str) -> Option<Progress> {
    let rest = line.trim().strip_prefix(PROGRESS_MARKER)?;
    let mut parts = rest.split_whitespace();
    match parts.next()? {
        "downloading" => {
            let done = parts.next().and_then(|s| s.parse::<f64>().ok());
            let total = parts.next().and_then(|s| s.parse::<f64>().ok());
            #[allow(clippy::cast_possible_truncation)]
            let percent = match (done, total) {
                (Some(done), Some(total)) if total > 0.0 => {
                    Some((done / total * 100.0).clamp(0.0, 100.0) as f32)
                }
                _ => None,
            };
            Some(Progress::Downloading { percent })
        }
        "finished" => Some(Progress::Finished),
        _ => None,
    }
}

/// Parse an `after_move` print line into the final file path.
#[must_use]
pub fn parse_file_line(line: &str) -> Option<PathBuf> {
    let path = line.strip_prefix(FILE_MARKER)?.strip_prefix(' ')?;
    let path = path.trim_end_matches(['\r', '\n']);
    (!path.is_empty()).then(|| PathBuf::from(path))
}

fn failure_message(stderr: &[u8], code: Option<i32>) -> String {
    let text = String::from_utf8_lossy(stderr);
    let last = text
        .lines()
        .rev()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .map(str::to_owned);
    exit_message(last, code)
}

/// The last stderr line, or a status description when there is none.
fn exit_message(last: Option<String>, code: Option<i32>) -> String {
    match (last, code) {
        (Some(line), _) => line,
        (None, Some(code)) => format!("extractor exited with status {code}"),
        (None, None) => "extractor was terminated by a signal".to_owned(),
    }
}

/// GIF files directly inside `dir`, sorted by name.
///
/// # Errors
///
/// Returns [`FetchError::Io`] if the directory cannot be read.
pub fn find_gifs(dir: &Path) -> Result<Vec<PathBuf>, FetchError> {
    let mut gifs = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_gif = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("gif"));
        if is_gif && path.is_file() {
            gifs.push(path);
        }
    }
    gifs.sort();
    Ok(gifs)
}
