use crate::models::error::CaptureError;

use super::hypothesis::Hypothesis;

/// A streaming speech recognizer fed mono 16-bit PCM.
///
/// Wraps a concrete model (e.g. a Vosk recognizer). Driven from the
/// recognition worker thread only.
pub trait SpeechEngine: Send + 'static {
    /// Feed samples; returns a new hypothesis when the engine has one.
    fn accept_waveform(&mut self, samples: &[i16]) -> Result<Option<Hypothesis>, CaptureError>;

    /// Flush the utterance in progress at end of stream.
    fn finish(&mut self) -> Option<Hypothesis>;

    /// Discard any utterance in progress.
    fn reset(&mut self);
}
