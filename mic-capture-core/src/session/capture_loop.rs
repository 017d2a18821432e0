use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use uuid::Uuid;

use crate::models::audio_models::{AudioFrame, AudioLevels, CaptureDiagnostics, DeviceInfo, SampleFormat};
use crate::models::config::{CaptureConfiguration, FrameGeometry};
use crate::models::error::CaptureError;
use crate::models::state::CaptureState;
use crate::processing::pcm;
use crate::session::dispatch::SinkSet;
use crate::session::handoff::Handoff;
use crate::session::worker;
use crate::traits::audio_source::{AudioHandle, AudioSource};
use crate::traits::capture_delegate::CaptureDelegate;
use crate::traits::frame_sink::FrameSink;

const LEVELS_INTERVAL: Duration = Duration::from_millis(250);

/// Levels and counters written by the capture thread, read by anyone.
#[derive(Default)]
struct Monitor {
    levels: AudioLevels,
    diagnostics: CaptureDiagnostics,
}

/// Everything the capture thread owns while a session runs.
struct SessionParts<H: AudioHandle> {
    handle: H,
    sinks: SinkSet,
}

impl<H: AudioHandle> SessionParts<H> {
    /// Stop sinks in reverse registration order, then close the device.
    fn teardown(mut self) -> Result<(), CaptureError> {
        let result = self.sinks.stop_all();
        self.handle.close();
        result
    }
}

/// One start-to-stop recording run.
struct CaptureSession<H: AudioHandle> {
    id: Uuid,
    running: Arc<AtomicBool>,
    thread: thread::JoinHandle<()>,
    handoff: Arc<Handoff<SessionParts<H>>>,
    started_at: Instant,
}

struct LoopInner<H: AudioHandle> {
    state: CaptureState,
    session: Option<CaptureSession<H>>,
}

/// Real-time capture loop.
///
/// Owns a dedicated capture thread that reads fixed-size frames from an
/// `AudioSource`, copies each one, and hands the copy to every registered
/// `FrameSink` in order before reading the next:
/// ```text
/// [AudioSource] → read_frame → copy → [sink 0] → [sink 1] → ... → read_frame
/// ```
/// At most one session runs at a time. The only state shared with the
/// capture thread is the session's running flag and the level/diagnostic
/// counters.
pub struct CaptureLoop<S: AudioSource> {
    source: Mutex<S>,
    config: CaptureConfiguration,
    geometry: FrameGeometry,
    inner: Mutex<LoopInner<S::Handle>>,
    monitor: Arc<Mutex<Monitor>>,
    delegate: Option<Arc<dyn CaptureDelegate>>,
}

impl<S: AudioSource> CaptureLoop<S> {
    pub fn new(source: S, config: CaptureConfiguration) -> Result<Self, CaptureError> {
        config.validate().map_err(CaptureError::ConfigurationFailed)?;
        let geometry = config.frame_geometry();
        log::debug!(
            "Capture loop configured: {} Hz, {} ch, {}-bit, {} bytes per {} ms frame",
            config.sample_rate,
            config.channels.count(),
            config.bit_depth,
            geometry.expected_byte_length,
            config.buffer_duration_ms
        );
        Ok(Self {
            source: Mutex::new(source),
            config,
            geometry,
            inner: Mutex::new(LoopInner {
                state: CaptureState::Idle,
                session: None,
            }),
            monitor: Arc::new(Mutex::new(Monitor::default())),
            delegate: None,
        })
    }

    pub fn set_delegate(&mut self, delegate: Arc<dyn CaptureDelegate>) {
        self.delegate = Some(delegate);
    }

    pub fn state(&self) -> CaptureState {
        self.inner.lock().state
    }

    pub fn current_levels(&self) -> AudioLevels {
        self.monitor.lock().levels
    }

    pub fn diagnostics(&self) -> CaptureDiagnostics {
        self.monitor.lock().diagnostics.clone()
    }

    pub fn config(&self) -> &CaptureConfiguration {
        &self.config
    }

    pub fn frame_geometry(&self) -> FrameGeometry {
        self.geometry
    }

    pub fn is_source_available(&self) -> bool {
        self.source.lock().is_available()
    }

    pub fn device_info(&self) -> DeviceInfo {
        self.source.lock().device_info()
    }

    /// Start a session. Transitions: idle → starting → running.
    ///
    /// Opens the source, starts `sinks` in order and spawns the capture
    /// thread. Any failure undoes the steps already taken and returns the
    /// loop to idle.
    pub fn start(&self, sinks: Vec<Box<dyn FrameSink>>) -> Result<(), CaptureError> {
        self.start_with(move || Ok(sinks))
    }

    /// Like [`CaptureLoop::start`], but the sinks are only built once the
    /// loop is idle and the source has opened.
    pub fn start_with<F>(&self, make_sinks: F) -> Result<(), CaptureError>
    where
        F: FnOnce() -> Result<Vec<Box<dyn FrameSink>>, CaptureError>,
    {
        {
            let mut inner = self.inner.lock();
            if !inner.state.is_idle() {
                log::warn!("Start ignored: capture loop is {}", inner.state);
                return Err(CaptureError::AlreadyRunning);
            }
            inner.state = CaptureState::Starting;
        }
        self.notify_state(CaptureState::Starting);

        match self.launch(make_sinks) {
            Ok(session) => {
                log::info!("Capture session {} running", session.id);
                let mut inner = self.inner.lock();
                inner.session = Some(session);
                inner.state = CaptureState::Running;
            }
            Err(e) => {
                log::error!("Capture start failed: {}", e);
                self.set_state(CaptureState::Idle);
                return Err(e);
            }
        }
        self.notify_state(CaptureState::Running);
        Ok(())
    }

    /// Stop the running session. Transitions: running → stopping → idle.
    ///
    /// Clears the running flag, waits up to the shutdown timeout for the
    /// capture thread to finish its in-flight frame, then stops the sinks in
    /// reverse order and closes the source. On timeout the loop still
    /// returns to idle and the capture thread tears down on its own once it
    /// exits.
    pub fn stop(&self) -> Result<(), CaptureError> {
        let session = {
            let mut inner = self.inner.lock();
            if !inner.state.is_running() {
                log::warn!("Stop ignored: capture loop is {}", inner.state);
                return Err(CaptureError::NotRunning);
            }
            let Some(session) = inner.session.take() else {
                inner.state = CaptureState::Idle;
                return Err(CaptureError::NotRunning);
            };
            inner.state = CaptureState::Stopping;
            session
        };
        self.notify_state(CaptureState::Stopping);

        session.running.store(false, Ordering::Release);

        let result = match session.handoff.wait(self.config.shutdown_timeout()) {
            Some(parts) => {
                if session.thread.join().is_err() {
                    log::error!("Capture thread of session {} panicked", session.id);
                }
                parts.teardown()
            }
            None => {
                log::error!(
                    "Capture session {} did not stop within {} ms; detaching its thread",
                    session.id,
                    self.config.shutdown_timeout_ms
                );
                Err(CaptureError::ShutdownTimeout)
            }
        };

        let diagnostics = self.diagnostics();
        log::info!(
            "Capture session {} stopped after {:.2}s: {} frames captured, {} underflows, {} sink failures",
            session.id,
            session.started_at.elapsed().as_secs_f64(),
            diagnostics.frames_captured,
            diagnostics.underflows,
            diagnostics.sink_failures
        );

        self.set_state(CaptureState::Idle);
        result
    }

    // --- Internal helpers ---

    fn launch<F>(&self, make_sinks: F) -> Result<CaptureSession<S::Handle>, CaptureError>
    where
        F: FnOnce() -> Result<Vec<Box<dyn FrameSink>>, CaptureError>,
    {
        let mut handle = self.source.lock().open(&self.config)?;

        let sinks = match make_sinks().and_then(SinkSet::start_all) {
            Ok(sinks) => sinks,
            Err(e) => {
                handle.close();
                return Err(e);
            }
        };

        *self.monitor.lock() = Monitor::default();

        let id = Uuid::new_v4();
        let running = Arc::new(AtomicBool::new(true));
        let handoff = Arc::new(Handoff::new());

        let capture_worker = CaptureWorker {
            session_id: id,
            running: Arc::clone(&running),
            format: self.config.sample_format(),
            expected_len: self.geometry.expected_byte_length,
            monitor: Arc::clone(&self.monitor),
            delegate: self.delegate.clone(),
            handoff: Arc::clone(&handoff),
        };

        let builder = thread::Builder::new().name("audio-capture".into());
        match worker::spawn_with(builder, SessionParts { handle, sinks }, move |parts| capture_worker.run(parts)) {
            Ok(thread) => Ok(CaptureSession {
                id,
                running,
                thread,
                handoff,
                started_at: Instant::now(),
            }),
            Err((parts, e)) => {
                if let Some(parts) = parts {
                    if let Err(stop_err) = parts.teardown() {
                        log::warn!("Rollback after failed spawn: {}", stop_err);
                    }
                }
                Err(CaptureError::Unknown(format!("failed to spawn capture thread: {}", e)))
            }
        }
    }

    fn set_state(&self, new_state: CaptureState) {
        self.inner.lock().state = new_state;
        self.notify_state(new_state);
    }

    fn notify_state(&self, state: CaptureState) {
        if let Some(ref delegate) = self.delegate {
            delegate.on_state_changed(state);
        }
    }
}

impl<S: AudioSource> Drop for CaptureLoop<S> {
    fn drop(&mut self) {
        if self.inner.lock().state.is_running() {
            if let Err(e) = self.stop() {
                log::warn!("Capture loop dropped while running: {}", e);
            }
        }
    }
}

/// State moved onto the capture thread.
struct CaptureWorker<H: AudioHandle> {
    session_id: Uuid,
    running: Arc<AtomicBool>,
    format: SampleFormat,
    expected_len: usize,
    monitor: Arc<Mutex<Monitor>>,
    delegate: Option<Arc<dyn CaptureDelegate>>,
    handoff: Arc<Handoff<SessionParts<H>>>,
}

impl<H: AudioHandle> CaptureWorker<H> {
    fn run(self, mut parts: SessionParts<H>) {
        log::debug!("Capture thread for session {} started", self.session_id);

        if panic::catch_unwind(AssertUnwindSafe(|| self.capture(&mut parts))).is_err() {
            let err = CaptureError::Unknown("capture thread panicked".into());
            log::error!("Session {}: {}", self.session_id, err);
            self.report_error(&err);
        }

        if let Some(parts) = self.handoff.complete(parts) {
            log::warn!(
                "Session {} exited after stop gave up waiting; tearing down",
                self.session_id
            );
            if let Err(e) = parts.teardown() {
                log::error!("Late teardown of session {} failed: {}", self.session_id, e);
            }
        }
        log::debug!("Capture thread for session {} exited", self.session_id);
    }

    /// Read-and-dispatch loop. The running flag is only checked between
    /// reads, so the in-flight frame is always delivered.
    fn capture(&self, parts: &mut SessionParts<H>) {
        let mut sequence = 0u64;
        let mut last_levels_report: Option<Instant> = None;

        while self.running.load(Ordering::Acquire) {
            self.monitor.lock().diagnostics.reads_attempted += 1;

            let frame = match parts.handle.read_frame(self.expected_len) {
                Ok(bytes) if bytes.len() == self.expected_len => {
                    AudioFrame::copy_from(sequence, self.format, bytes)
                }
                Ok(bytes) => {
                    self.record_skipped_read(&CaptureError::Underflow {
                        expected: self.expected_len,
                        actual: bytes.len(),
                    });
                    continue;
                }
                Err(e) if e.is_transient() => {
                    self.record_skipped_read(&e);
                    continue;
                }
                Err(e) => {
                    log::error!("Session {}: capture device failed: {}", self.session_id, e);
                    self.report_error(&e);
                    break;
                }
            };
            sequence += 1;

            let levels = pcm::measure_levels(frame.bytes(), self.format);
            {
                let mut m = self.monitor.lock();
                m.levels = levels;
                m.diagnostics.frames_captured += 1;
                m.diagnostics.bytes_captured += frame.len() as u64;
            }

            let outcome = parts.sinks.dispatch(&frame, |e| self.report_error(e));

            {
                let mut m = self.monitor.lock();
                if outcome.delivered > 0 {
                    m.diagnostics.frames_dispatched += 1;
                }
                m.diagnostics.sink_failures += outcome.failed as u64;
            }

            if last_levels_report.map_or(true, |t| t.elapsed() >= LEVELS_INTERVAL) {
                last_levels_report = Some(Instant::now());
                if let Some(ref d) = self.delegate {
                    d.on_levels_updated(&levels);
                }
            }
        }
    }

    fn record_skipped_read(&self, error: &CaptureError) {
        log::warn!("{}; frame skipped", error);
        self.monitor.lock().diagnostics.underflows += 1;
    }

    fn report_error(&self, error: &CaptureError) {
        if let Some(ref d) = self.delegate {
            d.on_error(error);
        }
    }
}
