//! Integration tests: drive the `Downloader` controller end to end with
//! scripted extractors, plus the `yt-dlp` driver against a stand-in
//! shell script.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use pixkit_fetch::{
    CancelToken, DownloadJob, Downloader, FetchError, FetchOutcome, JobEvent, JobState,
    MediaExtractor, MediaInfo, Platform, Progress,
};

/// Probes succeed; downloads block until cancelled when `hang` is set.
struct Fake {
    hang: bool,
}

impl MediaExtractor for Fake {
    fn probe(&self, url: &str, _platform: Platform) -> Result<MediaInfo, FetchError> {
        if url.contains("bad") {
            return Err(FetchError::Probe("ERROR: Unsupported URL".to_owned()));
        }
        Ok(MediaInfo {
            title: "Fake".to_owned(),
            ..MediaInfo::default()
        })
    }

    fn fetch(
        &self,
        job: &DownloadJob,
        on_progress: &mut dyn FnMut(Progress),
        cancel: &CancelToken,
    ) -> Result<FetchOutcome, FetchError> {
        on_progress(Progress::Downloading { percent: None });
        while self.hang {
            if cancel.is_cancelled() {
                return Err(FetchError::Cancelled);
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        on_progress(Progress::Finished);
        Ok(FetchOutcome {
            files: vec![job.target_dir.join("Fake.mp4")],
        })
    }
}

fn downloader(hang: bool) -> Downloader {
    Downloader::new(Arc::new(Fake { hang }))
}

fn collect(d: &mut Downloader) -> Vec<JobEvent> {
    let mut events = Vec::new();
    d.wait(|_| {});
    events.extend(d.poll());
    events
}

#[test]
fn probe_then_download_completes() {
    let mut d = downloader(false);
    d.start_probe("https://youtu.be/abc", Platform::YouTube).unwrap();
    assert_eq!(*d.state(), JobState::Probing);
    d.wait(|_| {});
    match d.state() {
        JobState::Ready(info) => assert_eq!(info.title, "Fake"),
        other => panic!("unexpected state {other:?}"),
    }

    let mut job = DownloadJob::new("https://youtu.be/abc", "/tmp/pixkit", Platform::YouTube);
    job.format_id = Some("18".to_owned());
    d.start_download(job).unwrap();

    let mut progress = 0;
    let mut terminals = 0;
    d.wait(|e| match e {
        JobEvent::Progress(_) => progress += 1,
        e if e.is_terminal() => terminals += 1,
        _ => {}
    });
    assert_eq!(progress, 2);
    assert_eq!(terminals, 1);
    match d.state() {
        JobState::Completed(report) => {
            assert_eq!(report.files, vec![PathBuf::from("/tmp/pixkit/Fake.mp4")]);
        }
        other => panic!("unexpected state {other:?}"),
    }
    assert!(collect(&mut d).is_empty());
}

#[test]
fn failed_probe_returns_to_idle_with_error() {
    let mut d = downloader(false);
    d.start_probe("https://bad.example/x", Platform::YouTube).unwrap();
    d.wait(|_| {});
    assert_eq!(*d.state(), JobState::Idle);
    assert_eq!(d.last_error(), Some("probe failed: ERROR: Unsupported URL"));
}

#[test]
fn second_job_while_running_is_rejected() {
    let mut d = downloader(true);
    let job = DownloadJob::new("https://x.com/a/status/1", "/tmp/pixkit", Platform::Twitter);
    d.start_download(job.clone()).unwrap();
    assert!(matches!(d.start_download(job), Err(FetchError::JobInFlight)));
    assert!(matches!(
        d.start_probe("https://x.com/a", Platform::Twitter),
        Err(FetchError::JobInFlight)
    ));
    assert!(matches!(d.reset(), Err(FetchError::JobInFlight)));
    d.cancel();
    d.wait(|_| {});
}

#[test]
fn cancel_ends_with_one_failed_terminal() {
    let mut d = downloader(true);
    let job = DownloadJob::new("https://x.com/a/status/1", "/tmp/pixkit", Platform::Twitter);
    d.start_download(job).unwrap();
    std::thread::sleep(Duration::from_millis(20));
    d.cancel();

    let mut terminals = Vec::new();
    d.wait(|e| {
        if e.is_terminal() {
            terminals.push(format!("{e:?}"));
        }
    });
    assert_eq!(terminals.len(), 1);
    assert_eq!(*d.state(), JobState::Failed("job cancelled".to_owned()));
    assert_eq!(d.last_error(), Some("job cancelled"));

    d.reset().unwrap();
    assert_eq!(*d.state(), JobState::Idle);
    assert!(d.last_error().is_none());
}

#[test]
fn invalid_job_never_leaves_idle() {
    let mut d = downloader(false);
    let mut job = DownloadJob::new("https://youtu.be/abc", "/tmp/pixkit", Platform::YouTube);
    job.convert_to_gif = true;
    assert!(matches!(d.start_download(job), Err(FetchError::InvalidJob(_))));
    assert!(matches!(
        d.start_probe("not a url", Platform::YouTube),
        Err(FetchError::InvalidJob(_))
    ));
    assert_eq!(*d.state(), JobState::Idle);
    assert!(!d.is_busy());
}

#[test]
fn poll_is_empty_when_idle() {
    let mut d = downloader(false);
    assert!(d.poll().is_empty());
    d.wait(|_| panic!("no events expected"));
}

#[cfg(unix)]
mod ytdlp_script {
    use super::*;
    use pixkit_fetch::{FetchConfig, YtDlp};

    const SCRIPT: &str = r#"
case " $* " in
  *" -J "*)
    case "$*" in
      *bad*) echo "ERROR: Unsupported URL" >&2; exit 1 ;;
    esac
    printf '%s' '{"title":"Fake","formats":[{"format_id":"18","format_note":"360p","ext":"mp4","height":360,"vcodec":"avc1","acodec":"mp4a"},{"format_id":"140","ext":"m4a","vcodec":"none","acodec":"mp4a"}],"subtitles":{"en":[]}}'
    exit 0 ;;
esac
case "$*" in
  *hang*) exec sleep 30 ;;
  *broken*)
    i=0
    while [ $i -lt 200 ]; do echo "[debug] chatter line $i" >&2; i=$((i + 1)); done
    echo "pixkit-progress downloading 10 100"
    echo "ERROR: Requested format is not available" >&2
    echo "" >&2
    exit 1 ;;
esac
out=""
prev=""
for a in "$@"; do
  if [ "$prev" = "-o" ]; then out="$a"; fi
  prev="$a"
done
dir=$(dirname "$out")
echo "[youtube] abc: Downloading webpage"
echo "pixkit-progress downloading 50 100"
echo "pixkit-progress downloading 100 NA" >&2
echo "pixkit-progress finished 100 100"
: > "$dir/Fake Clip.mp4"
echo "pixkit-file $dir/Fake Clip.mp4"
"#;

    fn driver(dir: &tempfile::TempDir) -> YtDlp {
        let script = dir.path().join("fake-yt-dlp.sh");
        std::fs::write(&script, SCRIPT).unwrap();
        YtDlp::new(FetchConfig {
            program: PathBuf::from("sh"),
            launcher_args: vec![script.to_string_lossy().into_owned()],
            poll_interval_ms: 10,
        })
    }

    #[test]
    fn probe_parses_script_output() {
        let dir = tempfile::tempdir().unwrap();
        let info = driver(&dir)
            .probe("https://youtu.be/abc", Platform::YouTube)
            .unwrap();
        assert_eq!(info.title, "Fake");
        assert_eq!(info.formats.len(), 1);
        assert_eq!(info.formats[0].label, "18 - 360p - mp4 - 360p");
        assert!(info.has_subtitle("en"));
    }

    #[test]
    fn probe_failure_carries_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let err = driver(&dir)
            .probe("https://bad.example/x", Platform::YouTube)
            .unwrap_err();
        assert_eq!(err.to_string(), "probe failed: ERROR: Unsupported URL");
    }

    #[test]
    fn fetch_reports_progress_and_files() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let job = DownloadJob::new("https://youtu.be/abc", &out, Platform::YouTube);
        let mut seen = Vec::new();
        let outcome = driver(&dir)
            .fetch(&job, &mut |p| seen.push(p), &CancelToken::new())
            .unwrap();
        assert_eq!(outcome.files, vec![out.join("Fake Clip.mp4")]);
        assert!(out.join("Fake Clip.mp4").exists());
        assert_eq!(seen.len(), 3);
        assert!(seen.contains(&Progress::Downloading { percent: Some(50.0) }));
        assert!(seen.contains(&Progress::Finished));
    }

    #[test]
    fn fetch_failure_reports_last_stderr_line() {
        let dir = tempfile::tempdir().unwrap();
        let job = DownloadJob::new("https://x.com/broken", dir.path(), Platform::Twitter);
        let mut seen = Vec::new();
        let err = driver(&dir)
            .fetch(&job, &mut |p| seen.push(p), &CancelToken::new())
            .unwrap_err();
        assert!(
            matches!(&err, FetchError::Download(msg) if msg == "ERROR: Requested format is not available"),
            "{err:?}"
        );
        assert_eq!(
            err.to_string(),
            "download failed: ERROR: Requested format is not available"
        );
        assert_eq!(seen, vec![Progress::Downloading { percent: Some(10.0) }]);
    }

    #[test]
    fn failed_download_can_be_reset() {
        let dir = tempfile::tempdir().unwrap();
        let mut d = Downloader::new(Arc::new(driver(&dir)));
        let job = DownloadJob::new("https://x.com/broken", dir.path(), Platform::Twitter);
        d.start_download(job).unwrap();
        d.wait(|_| {});
        assert_eq!(
            *d.state(),
            JobState::Failed("download failed: ERROR: Requested format is not available".to_owned())
        );
        assert_eq!(
            d.last_error(),
            Some("download failed: ERROR: Requested format is not available")
        );

        d.reset().unwrap();
        assert_eq!(*d.state(), JobState::Idle);
        assert!(d.last_error().is_none());
        assert!(!d.is_busy());
    }

    #[test]
    fn fetch_cancel_kills_the_child() {
        let dir = tempfile::tempdir().unwrap();
        let job = DownloadJob::new("https://x.com/hang", dir.path(), Platform::Twitter);
        let cancel = CancelToken::new();
        let trigger = cancel.clone();
        let timer = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(100));
            trigger.cancel();
        });
        let started = std::time::Instant::now();
        let result = driver(&dir).fetch(&job, &mut |_| {}, &cancel);
        timer.join().unwrap();
        assert!(matches!(result, Err(FetchError::Cancelled)));
        assert!(started.elapsed() < Duration::from_secs(10));
    }
}
