//! # mic-capture-core
//!
//! Platform-agnostic microphone capture loop.
//!
//! Reads fixed-size PCM frames from an audio input on a dedicated thread and
//! fans each frame out to pluggable consumers: a WAV file recorder and a
//! streaming speech recognizer. Platform backends (Windows WASAPI) implement
//! the `AudioSource` trait and plug into the generic `CaptureLoop`.
//!
//! ## Architecture
//!
//! ```text
//! mic-capture-core (this crate)
//! ├── traits/       ← AudioSource, FrameSink, CaptureDelegate, CaptureControl
//! ├── models/       ← CaptureError, CaptureState, CaptureConfiguration, AudioFrame, etc.
//! ├── processing/   ← PCM level metering, WAV header generation
//! ├── session/      ← CaptureLoop (capture thread), SinkSet, CaptureController
//! ├── sinks/        ← WaveSink, RecognitionSink
//! ├── recognition/  ← SpeechEngine, WordDebouncer, WordListener
//! └── storage/      ← WaveFileWriter, metadata sidecar
//! ```

pub mod models;
pub mod processing;
pub mod recognition;
pub mod session;
pub mod sinks;
pub mod storage;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use models::audio_models::{AudioFrame, AudioLevels, CaptureDiagnostics, ChannelLayout, DeviceInfo, SampleFormat};
pub use models::config::{CaptureConfiguration, FrameGeometry};
pub use models::error::CaptureError;
pub use models::recording_result::{RecordingMetadata, RecordingResult};
pub use models::state::CaptureState;
pub use recognition::debouncer::WordDebouncer;
pub use recognition::engine::SpeechEngine;
pub use recognition::hypothesis::Hypothesis;
pub use recognition::listener::{word_channel, ChannelWordListener, WordEvent, WordListener};
pub use session::capture_loop::CaptureLoop;
pub use session::controller::{CaptureController, SinkFactory};
pub use sinks::recognition_sink::RecognitionSink;
pub use sinks::wave_sink::{LastRecording, WaveSink};
pub use storage::wave_writer::WaveFileWriter;
pub use traits::audio_source::{AudioHandle, AudioSource};
pub use traits::capture_control::CaptureControl;
pub use traits::capture_delegate::CaptureDelegate;
pub use traits::frame_sink::FrameSink;
