//! Large-object upload channel with progress telemetry.
//!
//! Streams an image file to the storage endpoint while a reporter thread
//! tracks throughput. The byte counter incremented by [`CountingReader`] is
//! the single source of truth for progress: it counts what the transport has
//! actually read from us, independent of any buffering below.

use std::io::{BufReader, Read};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};
use once_cell::sync::Lazy;
use osvm_core::{Error, Result};
use reqwest::blocking::{Body, Client};

const READ_BUFFER: usize = 16 * 1024 * 1024;
const REPORT_TICK: Duration = Duration::from_secs(1);

// Uploads run for minutes; the only timeout is the bounded poll around them.
static UPLOAD_CLIENT: Lazy<Client> = Lazy::new(|| {
    Client::builder()
        .timeout(None)
        .build()
        .expect("HTTP client construction with static settings should not fail")
});

/// Read proxy that counts every byte handed to the transport.
pub struct CountingReader<R> {
    inner: BufReader<R>,
    sent: Arc<AtomicU64>,
}

impl<R: Read> CountingReader<R> {
    pub fn new(source: R, sent: Arc<AtomicU64>) -> Self {
        Self {
            inner: BufReader::with_capacity(READ_BUFFER, source),
            sent,
        }
    }
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.inner.read(buf)?;
        if n > 0 {
            self.sent.fetch_add(n as u64, Ordering::Relaxed);
        }
        Ok(n)
    }
}

/// Exponentially-weighted moving average over instantaneous throughput
/// samples, suppressing jitter from bursty I/O.
#[derive(Debug, Default)]
pub(crate) struct ThroughputEstimator {
    smoothed: Option<f64>,
}

impl ThroughputEstimator {
    const ALPHA: f64 = 0.5;

    /// Fold in one bytes-per-second sample and return the smoothed rate.
    pub(crate) fn update(&mut self, instant_bps: f64) -> f64 {
        let smoothed = match self.smoothed {
            None => instant_bps,
            Some(prev) => Self::ALPHA * instant_bps + (1.0 - Self::ALPHA) * prev,
        };
        self.smoothed = Some(smoothed);
        smoothed
    }
}

fn format_speed(bps: f64) -> String {
    if bps < 1024.0 {
        format!("{bps:.0} B/s")
    } else if bps < 1024.0 * 1024.0 {
        format!("{:.1} KB/s", bps / 1024.0)
    } else {
        format!("{:.1} MB/s", bps / (1024.0 * 1024.0))
    }
}

fn format_eta(secs: f64) -> String {
    let total = secs as u64;
    format!(
        "{:02}:{:02}:{:02}",
        total / 3600,
        (total % 3600) / 60,
        total % 60
    )
}

fn progress_bar(size: u64) -> ProgressBar {
    let bar = ProgressBar::new(size);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    bar
}

/// Reporter loop: wakes once per second, folds the byte counter delta into
/// the EWMA, and repaints the bar with speed and ETA. Exits when the counter
/// reaches `size` or `done` is set, whichever comes first.
fn report_progress(sent: Arc<AtomicU64>, size: u64, done: Arc<AtomicBool>, bar: ProgressBar) {
    let mut estimator = ThroughputEstimator::default();
    let mut last_bytes = 0u64;
    let mut last_tick = Instant::now();

    loop {
        thread::sleep(REPORT_TICK);
        if done.load(Ordering::Relaxed) {
            return;
        }

        let now = Instant::now();
        let current = sent.load(Ordering::Relaxed);
        let elapsed = now.duration_since(last_tick).as_secs_f64();
        let instant_bps = (current.saturating_sub(last_bytes)) as f64 / elapsed.max(0.001);
        last_bytes = current;
        last_tick = now;

        let smoothed = estimator.update(instant_bps);
        let eta = if smoothed > 0.0 {
            format_eta((size.saturating_sub(current)) as f64 / smoothed)
        } else {
            "N/A".into()
        };

        bar.set_position(current.min(size));
        bar.set_message(format!("{} ETA {}", format_speed(smoothed), eta));

        if current >= size {
            return;
        }
    }
}

/// Stream `source` (of known `size`) to `url` with a PUT.
///
/// Refuses a zero-byte source before any network activity: a zero-byte remote
/// object is indistinguishable from a stalled upload. `Content-Length` is set
/// from `size` and there is no `Expect: 100-continue` negotiation, which the
/// intermediate proxies in front of this backend mishandle by stalling the
/// upload silently.
pub fn upload_file<R>(url: &str, token: &str, source: R, size: u64) -> Result<()>
where
    R: Read + Send + 'static,
{
    if size == 0 {
        return Err(Error::EmptyUpload);
    }

    let sent = Arc::new(AtomicU64::new(0));
    let done = Arc::new(AtomicBool::new(false));
    let reader = CountingReader::new(source, Arc::clone(&sent));

    tracing::debug!(url, size, "starting upload");

    let bar = progress_bar(size);
    let reporter = thread::spawn({
        let sent = Arc::clone(&sent);
        let done = Arc::clone(&done);
        let bar = bar.clone();
        move || report_progress(sent, size, done, bar)
    });

    let result = UPLOAD_CLIENT
        .put(url)
        .header("Content-Type", "application/octet-stream")
        .header("Accept", "application/json")
        .header("X-Auth-Token", token)
        .body(Body::sized(reader, size))
        .send();

    // The reporter must never outlive this call.
    done.store(true, Ordering::Relaxed);
    let _ = reporter.join();

    let resp = match result {
        Ok(resp) => resp,
        Err(e) => {
            bar.abandon();
            return Err(Error::Http(format!("upload failed: {e}")));
        }
    };

    let status = resp.status().as_u16();
    if status != 200 && status != 204 {
        bar.abandon();
        let body = resp.text().unwrap_or_default();
        return Err(Error::UploadFailed { status, body });
    }

    bar.finish_with_message("upload complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn counting_reader_tracks_bytes() {
        let sent = Arc::new(AtomicU64::new(0));
        let mut reader = CountingReader::new(Cursor::new(vec![7u8; 4096]), Arc::clone(&sent));
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).unwrap();
        assert_eq!(buf.len(), 4096);
        assert_eq!(sent.load(Ordering::Relaxed), 4096);
    }

    #[test]
    fn estimator_seeds_with_first_sample() {
        let mut est = ThroughputEstimator::default();
        assert_eq!(est.update(1000.0), 1000.0);
    }

    #[test]
    fn estimator_smooths_with_half_weight() {
        let mut est = ThroughputEstimator::default();
        est.update(1000.0);
        assert_eq!(est.update(2000.0), 1500.0);
        assert_eq!(est.update(1500.0), 1500.0);
    }

    #[test]
    fn speed_formatting_picks_units() {
        assert_eq!(format_speed(512.0), "512 B/s");
        assert_eq!(format_speed(2048.0), "2.0 KB/s");
        assert_eq!(format_speed(3.0 * 1024.0 * 1024.0), "3.0 MB/s");
    }

    #[test]
    fn eta_formatting_is_hms() {
        assert_eq!(format_eta(0.0), "00:00:00");
        assert_eq!(format_eta(3661.0), "01:01:01");
    }

    #[test]
    fn zero_size_source_is_refused_before_any_network_call() {
        // The URL does not resolve; reaching the transport would error with
        // an Http variant, not EmptyUpload.
        let err = upload_file("http://invalid.test/file", "tok", std::io::empty(), 0)
            .expect_err("empty upload must be refused");
        assert!(matches!(err, Error::EmptyUpload));
    }
}
