//! Caller-thread controller tying the job state machine to workers.

use std::sync::Arc;
use std::time::Duration;

use crate::error::FetchError;
use crate::extractor::MediaExtractor;
use crate::job::{DownloadJob, JobState, Platform, validate_url};
use crate::worker::{self, JobEvent, WorkerHandle};

/// Owns the [`JobState`] and at most one running worker.
///
/// All methods run on the caller's thread; workers only talk back
/// through events drained by [`poll`](Self::poll) or
/// [`wait`](Self::wait).
pub struct Downloader {
    extractor: Arc<dyn MediaExtractor>,
    state: JobState,
    worker: Option<WorkerHandle>,
    last_error: Option<String>,
}

impl Downloader {
    /// A controller using `extractor` for every job.
    #[must_use]
    pub fn new(extractor: Arc<dyn MediaExtractor>) -> Self {
        Self {
            extractor,
            state: JobState::Idle,
            worker: None,
            last_error: None,
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> &JobState {
        &self.state
    }

    /// Message of the most recent failed probe or download.
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Returns `true` while a worker is running.
    #[must_use]
    pub const fn is_busy(&self) -> bool {
        self.worker.is_some()
    }

    /// Probe `url` in the background.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::JobInFlight`] if a worker is running,
    /// [`FetchError::InvalidJob`] for a bad URL, or
    /// [`FetchError::InvalidTransition`] from a terminal state.
    pub fn start_probe(&mut self, url: &str, platform: Platform) -> Result<(), FetchError> {
        self.ensure_idle_worker()?;
        validate_url(url)?;
        self.state.begin_probe()?;
        match worker::spawn_probe(Arc::clone(&self.extractor), url.trim().to_owned(), platform) {
            Ok(handle) => {
                self.worker = Some(handle);
                Ok(())
            }
            Err(err) => {
                self.state.probe_failed()?;
                Err(err)
            }
        }
    }

    /// Download `job` in the background.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::JobInFlight`] if a worker is running,
    /// [`FetchError::InvalidJob`] if the job fails validation, or
    /// [`FetchError::InvalidTransition`] if the state does not allow it.
    pub fn start_download(&mut self, job: DownloadJob) -> Result<(), FetchError> {
        self.ensure_idle_worker()?;
        job.validate()?;
        self.state.begin_download(&job)?;
        match worker::spawn_download(Arc::clone(&self.extractor), job) {
            Ok(handle) => {
                self.worker = Some(handle);
                Ok(())
            }
            Err(err) => {
                self.state.finish(Err(err.to_string()))?;
                Err(err)
            }
        }
    }

    /// Ask the running worker to stop.
    pub fn cancel(&self) {
        if let Some(worker) = &self.worker {
            worker.cancel();
        }
    }

    /// Return to `Idle` for a fresh job.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::JobInFlight`] while a worker runs.
    pub fn reset(&mut self) -> Result<(), FetchError> {
        self.ensure_idle_worker()?;
        self.state.reset()?;
        self.last_error = None;
        Ok(())
    }

    /// Drain queued events without blocking and apply them.
    pub fn poll(&mut self) -> Vec<JobEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.worker.as_mut().and_then(WorkerHandle::try_next) {
            self.apply(&event);
            events.push(event);
        }
        events
    }

    /// Block until the running worker finishes, passing each event to
    /// `on_event` after it is applied. Returns immediately when idle.
    pub fn wait(&mut self, mut on_event: impl FnMut(&JobEvent)) {
        const SLICE: Duration = Duration::from_millis(50);
        while self.worker.is_some() {
            if let Some(event) = self.worker.as_mut().and_then(|w| w.next_timeout(SLICE)) {
                self.apply(&event);
                on_event(&event);
            }
        }
    }

    fn ensure_idle_worker(&self) -> Result<(), FetchError> {
        if self.worker.is_some() {
            return Err(FetchError::JobInFlight);
        }
        Ok(())
    }

    fn apply(&mut self, event: &JobEvent) {
        let applied = match event {
            JobEvent::Progress(_) | JobEvent::GifCreated(_) => Ok(()),
            JobEvent::Probed(Ok(info)) => self.state.probe_succeeded(info.clone()),
            JobEvent::Probed(Err(err)) => {
                self.last_error = Some(err.to_string());
                self.state.probe_failed()
            }
            JobEvent::Finished(Ok(report)) => self.state.finish(Ok(report.clone())),
            JobEvent::Finished(Err(err)) => {
                let message = err.to_string();
                self.last_error = Some(message.clone());
                self.state.finish(Err(message))
            }
        };
        if let Err(err) = applied {
            tracing::error!(error = %err, "worker event did not match job state");
        }
        if event.is_terminal() {
            self.worker = None;
        }
    }
}

impl std::fmt::Debug for Downloader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Downloader")
            .field("state", &self.state)
            .field("busy", &self.worker.is_some())
            .field("last_error", &self.last_error)
            .finish_non_exhaustive()
    }
}
