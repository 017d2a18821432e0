use std::panic::{self, AssertUnwindSafe};

use crate::models::audio_models::AudioFrame;
use crate::models::error::CaptureError;
use crate::traits::frame_sink::FrameSink;

struct SinkSlot {
    sink: Box<dyn FrameSink>,
    /// Set once the sink panics; a faulted sink receives no more frames.
    faulted: bool,
}

/// Result of handing one frame to every sink.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub delivered: usize,
    pub failed: usize,
}

/// The ordered sinks of one capture session.
///
/// Failures are isolated per sink: an error or panic in one sink is
/// reported and the remaining sinks still receive the frame.
pub struct SinkSet {
    slots: Vec<SinkSlot>,
}

impl SinkSet {
    /// Start every sink in registration order.
    ///
    /// If sink `k` fails to start, sinks `0..k` are stopped again in reverse
    /// order before the error is returned.
    pub fn start_all(sinks: Vec<Box<dyn FrameSink>>) -> Result<Self, CaptureError> {
        let mut started = SinkSet { slots: Vec::with_capacity(sinks.len()) };
        for mut sink in sinks {
            let name = sink.name().to_string();
            match guarded(&name, "start", || sink.start()) {
                Ok(()) => {
                    log::debug!("Sink '{}' started", name);
                    started.slots.push(SinkSlot { sink, faulted: false });
                }
                Err(e) => {
                    log::error!("Sink '{}' failed to start: {}", name, e);
                    if let Err(stop_err) = started.stop_all() {
                        log::warn!("Rollback after failed start: {}", stop_err);
                    }
                    return Err(e);
                }
            }
        }
        Ok(started)
    }

    /// Hand `frame` to every healthy sink, in registration order.
    pub fn dispatch(&mut self, frame: &AudioFrame, mut on_failure: impl FnMut(&CaptureError)) -> DispatchOutcome {
        let mut outcome = DispatchOutcome::default();
        for slot in self.slots.iter_mut().filter(|s| !s.faulted) {
            let sink = &mut slot.sink;
            let result = panic::catch_unwind(AssertUnwindSafe(|| sink.on_frame(frame)));
            match result {
                Ok(Ok(())) => outcome.delivered += 1,
                Ok(Err(e)) => {
                    outcome.failed += 1;
                    let err = sink_failed(slot.sink.name(), &e.to_string());
                    log::error!("{} (frame {})", err, frame.sequence());
                    on_failure(&err);
                }
                Err(_) => {
                    outcome.failed += 1;
                    slot.faulted = true;
                    let err = sink_failed(slot.sink.name(), "panicked while consuming a frame");
                    log::error!("{}; no further frames will be delivered to it", err);
                    on_failure(&err);
                }
            }
        }
        outcome
    }

    /// Stop every sink in reverse registration order.
    ///
    /// All sinks are stopped even if some fail; the first failure is returned.
    pub fn stop_all(self) -> Result<(), CaptureError> {
        let mut first_error = None;
        for mut slot in self.slots.into_iter().rev() {
            let name = slot.sink.name().to_string();
            match guarded(&name, "stop", || slot.sink.stop()) {
                Ok(()) => log::debug!("Sink '{}' stopped", name),
                Err(e) => {
                    log::error!("Sink '{}' failed to stop: {}", name, e);
                    first_error.get_or_insert(sink_failed(&name, &e.to_string()));
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

fn guarded(
    name: &str,
    operation: &str,
    f: impl FnOnce() -> Result<(), CaptureError>,
) -> Result<(), CaptureError> {
    panic::catch_unwind(AssertUnwindSafe(f))
        .unwrap_or_else(|_| Err(sink_failed(name, &format!("panicked during {}", operation))))
}

fn sink_failed(name: &str, message: &str) -> CaptureError {
    CaptureError::SinkFailed {
        sink: name.to_string(),
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::audio_models::SampleFormat;
    use parking_lot::Mutex;
    use std::sync::Arc;

    type Log = Arc<Mutex<Vec<String>>>;

    enum Behavior {
        Ok,
        FailStart,
        FailFrames,
        PanicFrames,
        FailStop,
    }

    struct Probe {
        name: String,
        log: Log,
        behavior: Behavior,
    }

    impl Probe {
        fn boxed(name: &str, log: &Log, behavior: Behavior) -> Box<dyn FrameSink> {
            Box::new(Probe {
                name: name.to_string(),
                log: Arc::clone(log),
                behavior,
            })
        }
    }

    impl FrameSink for Probe {
        fn name(&self) -> &str {
            &self.name
        }

        fn start(&mut self) -> Result<(), CaptureError> {
            if let Behavior::FailStart = self.behavior {
                return Err(CaptureError::StorageError("no space".into()));
            }
            self.log.lock().push(format!("start {}", self.name));
            Ok(())
        }

        fn on_frame(&mut self, frame: &AudioFrame) -> Result<(), CaptureError> {
            match self.behavior {
                Behavior::FailFrames => Err(CaptureError::StorageError("write failed".into())),
                Behavior::PanicFrames => panic!("sink bug"),
                _ => {
                    self.log.lock().push(format!("frame {} {}", self.name, frame.sequence()));
                    Ok(())
                }
            }
        }

        fn stop(&mut self) -> Result<(), CaptureError> {
            self.log.lock().push(format!("stop {}", self.name));
            if let Behavior::FailStop = self.behavior {
                return Err(CaptureError::StorageError("flush failed".into()));
            }
            Ok(())
        }
    }

    fn frame(sequence: u64) -> AudioFrame {
        let format = SampleFormat {
            sample_rate: 44100,
            channels: 2,
            bit_depth: 16,
        };
        AudioFrame::copy_from(sequence, format, &[0u8; 8])
    }

    #[test]
    fn failed_start_rolls_back_in_reverse() {
        let log = Log::default();
        let result = SinkSet::start_all(vec![
            Probe::boxed("a", &log, Behavior::Ok),
            Probe::boxed("b", &log, Behavior::Ok),
            Probe::boxed("c", &log, Behavior::FailStart),
        ]);

        assert!(matches!(result, Err(CaptureError::StorageError(_))));
        assert_eq!(*log.lock(), vec!["start a", "start b", "stop b", "stop a"]);
    }

    #[test]
    fn failing_sink_does_not_block_others() {
        let log = Log::default();
        let mut sinks = SinkSet::start_all(vec![
            Probe::boxed("wave", &log, Behavior::FailFrames),
            Probe::boxed("speech", &log, Behavior::Ok),
        ])
        .unwrap();

        let mut failures = Vec::new();
        let outcome = sinks.dispatch(&frame(0), |e| failures.push(e.clone()));

        assert_eq!(outcome, DispatchOutcome { delivered: 1, failed: 1 });
        assert!(log.lock().contains(&"frame speech 0".to_string()));
        assert!(matches!(&failures[0], CaptureError::SinkFailed { sink, .. } if sink == "wave"));
    }

    #[test]
    fn panicking_sink_is_skipped_afterwards() {
        let log = Log::default();
        let mut sinks = SinkSet::start_all(vec![
            Probe::boxed("buggy", &log, Behavior::PanicFrames),
            Probe::boxed("speech", &log, Behavior::Ok),
        ])
        .unwrap();

        let first = sinks.dispatch(&frame(0), |_| {});
        let second = sinks.dispatch(&frame(1), |_| {});

        assert_eq!(first, DispatchOutcome { delivered: 1, failed: 1 });
        assert_eq!(second, DispatchOutcome { delivered: 1, failed: 0 });
    }

    #[test]
    fn stop_continues_past_failures_and_reports_first() {
        let log = Log::default();
        let sinks = SinkSet::start_all(vec![
            Probe::boxed("a", &log, Behavior::FailStop),
            Probe::boxed("b", &log, Behavior::Ok),
            Probe::boxed("c", &log, Behavior::FailStop),
        ])
        .unwrap();
        log.lock().clear();

        let err = sinks.stop_all().unwrap_err();

        assert_eq!(*log.lock(), vec!["stop c", "stop b", "stop a"]);
        assert!(matches!(err, CaptureError::SinkFailed { sink, .. } if sink == "c"));
    }
}
