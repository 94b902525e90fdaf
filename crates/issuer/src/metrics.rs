//! Elapsed-time reporting.

use std::time::{Duration, Instant};

/// Receives one duration per measured operation.
pub trait ElapsedRecorder: Send + Sync {
    fn record_elapsed(&self, operation: &'static str, elapsed: Duration);
}

/// Emits each measurement as a `tracing` event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingRecorder;

impl ElapsedRecorder for TracingRecorder {
    #[allow(clippy::cast_possible_truncation)]
    fn record_elapsed(&self, operation: &'static str, elapsed: Duration) {
        tracing::info!(
            operation,
            elapsed_ms = elapsed.as_millis() as u64,
            "operation finished"
        );
    }
}

/// Reports the time since [`Stopwatch::start`] when dropped, on every exit path.
#[must_use = "the measurement is reported when the stopwatch is dropped"]
pub struct Stopwatch<'a> {
    recorder: &'a dyn ElapsedRecorder,
    operation: &'static str,
    started: Instant,
}

impl<'a> Stopwatch<'a> {
    pub fn start(recorder: &'a dyn ElapsedRecorder, operation: &'static str) -> Self {
        Self {
            recorder,
            operation,
            started: Instant::now(),
        }
    }
}

impl Drop for Stopwatch<'_> {
    fn drop(&mut self) {
        self.recorder
            .record_elapsed(self.operation, self.started.elapsed());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::RecordingRecorder;

    #[test]
    fn stopwatch_reports_once_on_drop() {
        let recorder = RecordingRecorder::default();

        {
            let _stopwatch = Stopwatch::start(&recorder, "unit");
            std::thread::sleep(Duration::from_millis(2));
        }

        let records = recorder.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].0, "unit");
        assert!(records[0].1 >= Duration::from_millis(2));
    }
}
