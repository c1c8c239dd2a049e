// src/sampler.rs - Steps a frame source through time and runs detection
use anyhow::Result;
use tracing::{debug, warn};

use crate::source::{FrameSource, HandLandmarks, LandmarkDetector};

// Absorbs float error so a clip of exactly k steps still samples its last frame.
const ENDPOINT_TOLERANCE: f64 = 1e-9;

/// Number of samples in `[0, duration]` at `step` spacing.
///
/// Invalid inputs give `Some(0)`. `None` means the count does not fit in a `usize`.
pub fn sample_count(duration: f64, step: f64) -> Option<usize> {
    if !(step > 0.0 && step.is_finite() && duration >= 0.0 && duration.is_finite()) {
        return Some(0);
    }
    let steps = (duration / step + ENDPOINT_TOLERANCE).floor();
    if steps >= usize::MAX as f64 {
        return None;
    }
    (steps as usize).checked_add(1)
}

/// Sample timestamps `0, step, 2*step, ...` up to and including `duration`.
///
/// Each timestamp is `i * step` rather than a running sum, so long clips do not drift.
/// Yields nothing when [`sample_count`] cannot represent the count.
pub fn sample_times(duration: f64, step: f64) -> impl Iterator<Item = f64> {
    let count = sample_count(duration, step).unwrap_or(0);
    (0..count).map(move |i| i as f64 * step)
}

pub struct FrameSampler {
    step: f64,
}

impl FrameSampler {
    pub fn new(step: f64) -> Self {
        Self { step }
    }

    /// Visit every sample time in ascending order.
    ///
    /// A frame that cannot be sought, captured or detected is reported to
    /// `visit` as `None`; it never stops the scan. Returns the number of
    /// samples taken.
    pub async fn for_each_sample<S, D, V>(&self, source: &mut S, detector: &mut D, mut visit: V) -> usize
    where
        S: FrameSource,
        D: LandmarkDetector<S::Frame>,
        V: FnMut(f64, Option<&HandLandmarks>),
    {
        let mut samples = 0;
        for t in sample_times(source.duration(), self.step) {
            debug!("seek t={:.2}s", t);
            let landmarks = match seek_then_detect(source, detector, t).await {
                Ok(Some(landmarks)) => Some(landmarks),
                Ok(None) => {
                    debug!("t={:.2}s: no landmarks", t);
                    None
                }
                Err(e) => {
                    warn!("t={:.2}s: frame skipped: {:#}", t, e);
                    None
                }
            };
            visit(t, landmarks.as_ref());
            samples += 1;
        }
        samples
    }
}

/// One attempt at a timestamp: seek, wait for the frame, run the detector.
pub async fn seek_then_detect<S, D>(source: &mut S, detector: &mut D, t: f64) -> Result<Option<HandLandmarks>>
where
    S: FrameSource,
    D: LandmarkDetector<S::Frame>,
{
    source.seek(t).await?;
    let frame = source.capture().await?;
    detector.detect(&frame).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::io;
    use std::sync::{Arc, Mutex};

    #[test]
    fn includes_endpoint() {
        let times: Vec<f64> = sample_times(1.5, 0.5).collect();
        assert_eq!(times, vec![0.0, 0.5, 1.0, 1.5]);
    }

    #[test]
    fn stops_before_partial_step() {
        let times: Vec<f64> = sample_times(1.4, 0.5).collect();
        assert_eq!(times, vec![0.0, 0.5, 1.0]);
    }

    #[test]
    fn zero_duration_samples_once() {
        assert_eq!(sample_times(0.0, 0.5).collect::<Vec<_>>(), vec![0.0]);
    }

    #[test]
    fn no_drift_over_long_clips() {
        let times: Vec<f64> = sample_times(30.0, 0.1).collect();
        assert_eq!(times.len(), 301);
        assert!((times[300] - 30.0).abs() < 1e-9);
    }

    #[test]
    fn invalid_inputs_sample_nothing() {
        assert_eq!(sample_times(f64::NAN, 0.5).count(), 0);
        assert_eq!(sample_times(2.0, 0.0).count(), 0);
        assert_eq!(sample_times(-1.0, 0.5).count(), 0);
    }

    #[test]
    fn huge_duration_count_is_unrepresentable() {
        assert_eq!(sample_count(1e300, 0.5), None);
        assert_eq!(sample_count(f64::MAX, 1e-300), None);
        assert_eq!(sample_times(1e300, 0.5).take(3).count(), 0);
        assert_eq!(sample_count(1.5, 0.5), Some(4));
    }

    struct Clock {
        duration: f64,
        now: f64,
        seeks: Vec<f64>,
    }

    impl FrameSource for Clock {
        type Frame = f64;

        fn duration(&self) -> f64 {
            self.duration
        }

        fn current_time(&self) -> f64 {
            self.now
        }

        async fn seek(&mut self, t: f64) -> Result<()> {
            self.seeks.push(t);
            if (t - 1.0).abs() < 1e-9 {
                return Err(anyhow!("seek timed out"));
            }
            self.now = t;
            Ok(())
        }

        async fn capture(&mut self) -> Result<f64> {
            Ok(self.now)
        }
    }

    struct Flaky;

    impl LandmarkDetector<f64> for Flaky {
        async fn detect(&mut self, frame: &f64) -> Result<Option<HandLandmarks>> {
            if (*frame - 0.5).abs() < 1e-9 {
                Err(anyhow!("detector crashed"))
            } else {
                Ok(None)
            }
        }
    }

    #[tokio::test]
    async fn failures_become_misses_and_scan_continues() {
        let mut source = Clock { duration: 2.0, now: 0.0, seeks: Vec::new() };
        let mut visited = Vec::new();

        let samples = FrameSampler::new(0.5)
            .for_each_sample(&mut source, &mut Flaky, |t, lm| visited.push((t, lm.is_some())))
            .await;

        assert_eq!(samples, 5);
        assert_eq!(source.seeks, vec![0.0, 0.5, 1.0, 1.5, 2.0]);
        assert_eq!(
            visited,
            vec![(0.0, false), (0.5, false), (1.0, false), (1.5, false), (2.0, false)]
        );
    }

    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn every_seek_and_miss_is_logged() {
        let logs = LogBuffer::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::new("debug"))
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let mut source = Clock { duration: 1.0, now: 0.0, seeks: Vec::new() };
        FrameSampler::new(0.5)
            .for_each_sample(&mut source, &mut Flaky, |_, _| {})
            .await;

        let text = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        for t in ["0.00", "0.50", "1.00"] {
            assert!(text.contains(&format!("seek t={t}s")), "missing seek {t} in:\n{text}");
        }
        assert!(text.contains("t=0.00s: no landmarks"));
        assert!(text.contains("t=0.50s: frame skipped: detector crashed"));
        assert!(text.contains("t=1.00s: frame skipped: seek timed out"));
    }
}
