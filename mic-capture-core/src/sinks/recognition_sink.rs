use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};

use crate::models::audio_models::AudioFrame;
use crate::models::config::CaptureConfiguration;
use crate::models::error::CaptureError;
use crate::processing::pcm;
use crate::recognition::debouncer::WordDebouncer;
use crate::recognition::engine::SpeechEngine;
use crate::recognition::hypothesis::Hypothesis;
use crate::recognition::listener::WordListener;
use crate::session::handoff::Handoff;
use crate::session::worker;
use crate::traits::frame_sink::FrameSink;

struct RecognitionWorker<E> {
    frames: Sender<Vec<i16>>,
    handoff: Arc<Handoff<E>>,
    thread: thread::JoinHandle<()>,
}

/// Frame sink feeding a speech engine on its own worker thread.
///
/// ```text
/// on_frame → first channel as i16 → [bounded queue] → SpeechEngine
///          → WordDebouncer → WordListener::on_word
/// ```
/// `on_frame` never blocks: when the queue is full the frame is dropped.
pub struct RecognitionSink<E: SpeechEngine> {
    engine: Option<E>,
    listener: Arc<dyn WordListener>,
    queue_frames: usize,
    shutdown_timeout: Duration,
    worker: Option<RecognitionWorker<E>>,
    dropped_frames: u64,
}

impl<E: SpeechEngine> RecognitionSink<E> {
    pub fn new(engine: E, listener: Arc<dyn WordListener>, config: &CaptureConfiguration) -> Self {
        Self {
            engine: Some(engine),
            listener,
            queue_frames: config.recognition_queue_frames,
            shutdown_timeout: config.shutdown_timeout(),
            worker: None,
            dropped_frames: 0,
        }
    }

    /// Frames dropped because the recognizer fell behind, this session.
    pub fn dropped_frames(&self) -> u64 {
        self.dropped_frames
    }
}

impl<E: SpeechEngine> FrameSink for RecognitionSink<E> {
    fn name(&self) -> &str {
        "recognition"
    }

    fn start(&mut self) -> Result<(), CaptureError> {
        if self.worker.is_some() {
            return Err(CaptureError::RecognitionFailed("recognizer already started".into()));
        }

        self.listener.on_reset();

        let Some(mut engine) = self.engine.take() else {
            let err = CaptureError::RecognitionFailed("speech engine is not available".into());
            self.listener.on_error(&err.to_string());
            return Err(err);
        };
        engine.reset();

        let (frames, queue) = bounded(self.queue_frames);
        let handoff = Arc::new(Handoff::new());
        let listener = Arc::clone(&self.listener);
        let worker_handoff = Arc::clone(&handoff);

        let builder = thread::Builder::new().name("speech-recognizer".into());
        let body = move |engine: E| recognize(engine, queue, listener, worker_handoff);
        let thread = match worker::spawn_with(builder, engine, body) {
            Ok(thread) => thread,
            Err((engine, e)) => {
                self.engine = engine;
                return Err(CaptureError::Unknown(format!("failed to spawn recognizer thread: {}", e)));
            }
        };

        log::info!("Speech recognition started");
        self.dropped_frames = 0;
        self.worker = Some(RecognitionWorker {
            frames,
            handoff,
            thread,
        });
        Ok(())
    }

    fn on_frame(&mut self, frame: &AudioFrame) -> Result<(), CaptureError> {
        let worker = self
            .worker
            .as_ref()
            .ok_or_else(|| CaptureError::RecognitionFailed("recognizer not started".into()))?;

        let samples = pcm::first_channel_i16(frame.bytes(), frame.format());
        match worker.frames.try_send(samples) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                self.dropped_frames += 1;
                if self.dropped_frames == 1 {
                    log::warn!("Recognizer is falling behind; dropping frames");
                } else {
                    log::debug!("Recognizer queue full; frame {} dropped", frame.sequence());
                }
                Ok(())
            }
            Err(TrySendError::Disconnected(_)) => {
                Err(CaptureError::RecognitionFailed("recognizer worker exited".into()))
            }
        }
    }

    fn stop(&mut self) -> Result<(), CaptureError> {
        let Some(worker) = self.worker.take() else {
            log::warn!("Stop called on a recognizer that is not running");
            return Ok(());
        };

        // closing the queue lets the worker drain and finish the utterance
        drop(worker.frames);

        if self.dropped_frames > 0 {
            log::warn!("Recognizer dropped {} frames this session", self.dropped_frames);
        }

        match worker.handoff.wait(self.shutdown_timeout) {
            Some(engine) => {
                if worker.thread.join().is_err() {
                    log::error!("Recognizer thread panicked after finishing");
                }
                self.engine = Some(engine);
                log::info!("Speech recognition stopped");
                Ok(())
            }
            None => Err(CaptureError::RecognitionFailed(format!(
                "recognizer did not finish within {} ms",
                self.shutdown_timeout.as_millis()
            ))),
        }
    }
}

/// Recognizer worker body: runs until the frame queue is closed, then hands
/// the engine back for the next session.
fn recognize<E: SpeechEngine>(
    mut engine: E,
    queue: Receiver<Vec<i16>>,
    listener: Arc<dyn WordListener>,
    handoff: Arc<Handoff<E>>,
) {
    let mut debouncer = WordDebouncer::new();

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        for samples in queue.iter() {
            match engine.accept_waveform(&samples) {
                Ok(Some(hypothesis)) => deliver(&mut debouncer, &hypothesis, listener.as_ref()),
                Ok(None) => {}
                Err(e) => {
                    log::error!("Speech engine rejected audio: {}", e);
                    listener.on_error(&e.to_string());
                }
            }
        }
        if let Some(hypothesis) = engine.finish() {
            deliver(&mut debouncer, &hypothesis, listener.as_ref());
        }
    }));

    if outcome.is_err() {
        log::error!("Speech engine panicked; recognition ended early");
        listener.on_error("speech engine panicked");
        engine.reset();
    }

    if handoff.complete(engine).is_some() {
        log::warn!("Recognizer finished after stop gave up; engine discarded");
    }
}

fn deliver(debouncer: &mut WordDebouncer, hypothesis: &Hypothesis, listener: &dyn WordListener) {
    let released = debouncer.accept(hypothesis);
    for word in &released.words {
        listener.on_word(word);
    }
    if released.end_of_sentence {
        listener.on_end_of_sentence();
    }
}
