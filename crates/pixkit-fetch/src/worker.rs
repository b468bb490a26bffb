//! Background workers for probes and downloads.
//!
//! Each job runs on its own thread and reports back over a one-way
//! channel. Every worker sends exactly one terminal event; the
//! [`WorkerHandle`] synthesizes one if the thread dies without it.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, TryRecvError};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::error::FetchError;
use crate::extractor::{MediaExtractor, Progress, find_gifs};
use crate::job::{DownloadJob, JobReport, Platform};
use crate::metadata::MediaInfo;

/// Shared cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// A fresh, un-cancelled token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Returns `true` once [`cancel`](Self::cancel) was called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Messages from a worker.
#[derive(Debug)]
pub enum JobEvent {
    /// Download progress.
    Progress(Progress),
    /// A converting download produced this GIF.
    GifCreated(PathBuf),
    /// Terminal event of a probe.
    Probed(Result<MediaInfo, FetchError>),
    /// Terminal event of a download.
    Finished(Result<JobReport, FetchError>),
}

impl JobEvent {
    /// Returns `true` for [`Probed`](Self::Probed) and
    /// [`Finished`](Self::Finished).
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Probed(_) | Self::Finished(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Probe,
    Download,
}

/// The caller's end of a running worker.
#[derive(Debug)]
pub struct WorkerHandle {
    rx: Receiver<JobEvent>,
    cancel: CancelToken,
    thread: Option<JoinHandle<()>>,
    kind: Kind,
    done: bool,
}

impl WorkerHandle {
    /// Ask the worker to stop. Only downloads observe this.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Returns `true` once the terminal event has been received.
    #[must_use]
    pub const fn is_done(&self) -> bool {
        self.done
    }

    /// Next event without blocking.
    pub fn try_next(&mut self) -> Option<JobEvent> {
        if self.done {
            return None;
        }
        match self.rx.try_recv() {
            Ok(event) => Some(self.observe(event)),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(self.orphaned()),
        }
    }

    /// Next event, waiting up to `timeout`.
    pub fn next_timeout(&mut self, timeout: Duration) -> Option<JobEvent> {
        if self.done {
            return None;
        }
        match self.rx.recv_timeout(timeout) {
            Ok(event) => Some(self.observe(event)),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => Some(self.orphaned()),
        }
    }

    fn observe(&mut self, event: JobEvent) -> JobEvent {
        if event.is_terminal() {
            self.finish();
        }
        event
    }

    fn orphaned(&mut self) -> JobEvent {
        self.finish();
        tracing::error!(kind = ?self.kind, "worker thread ended without a terminal event");
        let reason = "worker exited without a result".to_owned();
        match self.kind {
            Kind::Probe => JobEvent::Probed(Err(FetchError::Probe(reason))),
            Kind::Download => JobEvent::Finished(Err(FetchError::Download(reason))),
        }
    }

    fn finish(&mut self) {
        self.done = true;
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

fn spawn_worker<F>(name: &str, kind: Kind, body: F) -> Result<WorkerHandle, FetchError>
where
    F: FnOnce(&mpsc::Sender<JobEvent>, &CancelToken) + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    let cancel = CancelToken::new();
    let token = cancel.clone();
    let thread = std::thread::Builder::new()
        .name(name.to_owned())
        .spawn(move || body(&tx, &token))?;
    Ok(WorkerHandle {
        rx,
        cancel,
        thread: Some(thread),
        kind,
        done: false,
    })
}

/// Probe `url` on a worker thread.
///
/// # Errors
///
/// Returns [`FetchError::Io`] if the thread cannot be spawned.
pub fn spawn_probe(
    extractor: Arc<dyn MediaExtractor>,
    url: String,
    platform: Platform,
) -> Result<WorkerHandle, FetchError> {
    spawn_worker("pixkit-probe", Kind::Probe, move |tx, _| {
        let result = extractor.probe(&url, platform);
        if let Err(err) = &result {
            tracing::warn!(%url, error = %err, "probe failed");
        }
        let _ = tx.send(JobEvent::Probed(result));
    })
}

/// Download `job` on a worker thread.
///
/// Progress events are forwarded as they arrive. A GIF-converting job
/// also emits [`JobEvent::GifCreated`] before its terminal event.
///
/// # Errors
///
/// Returns [`FetchError::Io`] if the thread cannot be spawned.
pub fn spawn_download(
    extractor: Arc<dyn MediaExtractor>,
    job: DownloadJob,
) -> Result<WorkerHandle, FetchError> {
    spawn_worker("pixkit-download", Kind::Download, move |tx, cancel| {
        tracing::info!(url = %job.url, platform = %job.platform, "download started");
        let mut forward = |p: Progress| {
            let _ = tx.send(JobEvent::Progress(p));
        };
        let result = extractor
            .fetch(&job, &mut forward, cancel)
            .and_then(|outcome| {
                let gif = if job.convert_to_gif {
                    locate_gif(&outcome.files, &job)?
                } else {
                    None
                };
                Ok(JobReport {
                    files: outcome.files,
                    gif,
                })
            });
        match &result {
            Ok(report) => {
                if let Some(gif) = &report.gif {
                    let _ = tx.send(JobEvent::GifCreated(gif.clone()));
                }
                tracing::info!(files = report.files.len(), "download complete");
            }
            Err(err) => tracing::warn!(error = %err, "download failed"),
        }
        let _ = tx.send(JobEvent::Finished(result));
    })
}

/// The reported GIF, or the first GIF found in the target directory.
fn locate_gif(files: &[PathBuf], job: &DownloadJob) -> Result<Option<PathBuf>, FetchError> {
    let reported = files.iter().find(|p| {
        p.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("gif"))
    });
    if let Some(gif) = reported {
        return Ok(Some(gif.clone()));
    }
    tracing::debug!(dir = %job.target_dir.display(), "no gif reported, scanning directory");
    Ok(find_gifs(&job.target_dir)?.into_iter().next())
}
