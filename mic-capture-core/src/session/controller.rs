use std::sync::atomic::{AtomicBool, Ordering};

use crate::models::error::CaptureError;
use crate::models::state::CaptureState;
use crate::session::capture_loop::CaptureLoop;
use crate::traits::audio_source::AudioSource;
use crate::traits::capture_control::CaptureControl;
use crate::traits::frame_sink::FrameSink;

/// Builds the sinks for one recording session.
pub type SinkFactory = Box<dyn Fn() -> Result<Vec<Box<dyn FrameSink>>, CaptureError> + Send + Sync>;

/// Button-level control over a `CaptureLoop`.
///
/// Each start builds a fresh sink list from the factory, once the loop has
/// accepted the start and the source has opened. Redundant
/// start/stop requests are logged and ignored. A start refused for lack of
/// microphone permission is remembered and retried once the permission
/// result comes back granted.
pub struct CaptureController<S: AudioSource> {
    capture: CaptureLoop<S>,
    make_sinks: SinkFactory,
    permission_pending: AtomicBool,
}

impl<S: AudioSource> CaptureController<S> {
    pub fn new(capture: CaptureLoop<S>, make_sinks: SinkFactory) -> Self {
        Self {
            capture,
            make_sinks,
            permission_pending: AtomicBool::new(false),
        }
    }

    pub fn capture_loop(&self) -> &CaptureLoop<S> {
        &self.capture
    }

    /// Whether a start is waiting on a permission answer.
    pub fn is_permission_pending(&self) -> bool {
        self.permission_pending.load(Ordering::Acquire)
    }
}

impl<S: AudioSource> CaptureControl for CaptureController<S> {
    fn state(&self) -> CaptureState {
        self.capture.state()
    }

    fn start_capture(&self) -> Result<(), CaptureError> {
        match self.capture.start_with(|| (self.make_sinks)()) {
            Ok(()) => Ok(()),
            Err(CaptureError::AlreadyRunning) => {
                log::warn!("Start requested while already recording");
                Ok(())
            }
            Err(CaptureError::PermissionDenied) => {
                log::info!("Microphone permission required; waiting for the user");
                self.permission_pending.store(true, Ordering::Release);
                Err(CaptureError::PermissionDenied)
            }
            Err(e) => Err(e),
        }
    }

    fn stop_capture(&self) -> Result<(), CaptureError> {
        // a stop also cancels a start still waiting for permission
        self.permission_pending.store(false, Ordering::Release);
        match self.capture.stop() {
            Err(CaptureError::NotRunning) => {
                log::warn!("Stop requested while not recording");
                Ok(())
            }
            other => other,
        }
    }

    fn on_permission_result(&self, granted: bool) -> Result<(), CaptureError> {
        let was_pending = self.permission_pending.swap(false, Ordering::AcqRel);
        if !granted {
            log::warn!("Microphone permission denied");
            return Err(CaptureError::PermissionDenied);
        }
        if !was_pending {
            log::debug!("Microphone permission granted; no start pending");
            return Ok(());
        }
        log::info!("Microphone permission granted; starting capture");
        self.start_capture()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::audio_models::{AudioFrame, DeviceInfo};
    use crate::models::config::CaptureConfiguration;
    use crate::traits::audio_source::AudioHandle;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    /// Microphone whose permission can be flipped from the test.
    struct GatedMic {
        allowed: Arc<AtomicBool>,
        opens: Arc<Mutex<u32>>,
    }

    struct SilentHandle {
        buffer: Vec<u8>,
    }

    impl AudioHandle for SilentHandle {
        fn read_frame(&mut self, expected_len: usize) -> Result<&[u8], CaptureError> {
            thread::sleep(Duration::from_millis(2));
            self.buffer.resize(expected_len, 0);
            Ok(&self.buffer)
        }

        fn close(&mut self) {}
    }

    impl AudioSource for GatedMic {
        type Handle = SilentHandle;

        fn is_available(&self) -> bool {
            true
        }

        fn device_info(&self) -> DeviceInfo {
            DeviceInfo {
                id: "gated".into(),
                name: "Gated Mic".into(),
                is_default: true,
            }
        }

        fn open(&mut self, _config: &CaptureConfiguration) -> Result<SilentHandle, CaptureError> {
            if !self.allowed.load(Ordering::Acquire) {
                return Err(CaptureError::PermissionDenied);
            }
            *self.opens.lock() += 1;
            Ok(SilentHandle { buffer: Vec::new() })
        }
    }

    struct Counter(Arc<Mutex<u64>>);

    impl FrameSink for Counter {
        fn name(&self) -> &str {
            "counter"
        }

        fn start(&mut self) -> Result<(), CaptureError> {
            Ok(())
        }

        fn on_frame(&mut self, _frame: &AudioFrame) -> Result<(), CaptureError> {
            *self.0.lock() += 1;
            Ok(())
        }

        fn stop(&mut self) -> Result<(), CaptureError> {
            Ok(())
        }
    }

    type Harness = (CaptureController<GatedMic>, Arc<AtomicBool>, Arc<Mutex<u32>>, Arc<Mutex<u64>>, Arc<Mutex<u32>>);

    fn controller(allowed: bool) -> Harness {
        let allowed = Arc::new(AtomicBool::new(allowed));
        let opens = Arc::new(Mutex::new(0));
        let frames = Arc::new(Mutex::new(0));
        let mic = GatedMic {
            allowed: Arc::clone(&allowed),
            opens: Arc::clone(&opens),
        };
        let capture = CaptureLoop::new(mic, CaptureConfiguration::default()).unwrap();
        let builds = Arc::new(Mutex::new(0));
        let counted = Arc::clone(&frames);
        let built = Arc::clone(&builds);
        let factory: SinkFactory = Box::new(move || {
            *built.lock() += 1;
            Ok(vec![Box::new(Counter(Arc::clone(&counted))) as Box<dyn FrameSink>])
        });
        (CaptureController::new(capture, factory), allowed, opens, frames, builds)
    }

    #[test]
    fn redundant_requests_are_ignored() {
        let (control, _, opens, _, builds) = controller(true);

        control.stop_capture().unwrap();
        control.start_capture().unwrap();
        control.start_capture().unwrap();
        assert_eq!(control.state(), CaptureState::Running);
        assert_eq!(*opens.lock(), 1);
        assert_eq!(*builds.lock(), 1);

        control.stop_capture().unwrap();
        control.stop_capture().unwrap();
        assert_eq!(control.state(), CaptureState::Idle);
    }

    #[test]
    fn granted_permission_resumes_pending_start() {
        let (control, allowed, opens, frames, builds) = controller(false);

        assert_eq!(control.start_capture(), Err(CaptureError::PermissionDenied));
        assert!(control.is_permission_pending());
        assert_eq!(*builds.lock(), 0);
        assert_eq!(control.state(), CaptureState::Idle);

        allowed.store(true, Ordering::Release);
        control.on_permission_result(true).unwrap();
        assert_eq!(control.state(), CaptureState::Running);
        assert!(!control.is_permission_pending());

        thread::sleep(Duration::from_millis(30));
        control.stop_capture().unwrap();
        assert_eq!(*opens.lock(), 1);
        assert_eq!(*builds.lock(), 1);
        assert!(*frames.lock() > 0);

        // no second start from a stale grant
        control.on_permission_result(true).unwrap();
        assert_eq!(control.state(), CaptureState::Idle);
    }

    #[test]
    fn denied_permission_clears_pending_start() {
        let (control, _, opens, _, builds) = controller(false);

        assert!(control.start_capture().is_err());
        assert_eq!(control.on_permission_result(false), Err(CaptureError::PermissionDenied));
        assert!(!control.is_permission_pending());
        assert_eq!(control.state(), CaptureState::Idle);
        assert_eq!(*opens.lock(), 0);
        assert_eq!(*builds.lock(), 0);
    }
}
