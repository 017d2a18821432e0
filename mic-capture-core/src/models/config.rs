use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::audio_models::{ChannelLayout, SampleFormat};
use super::error::CaptureError;

/// Configuration for a capture loop.
///
/// The defaults are the reference instantiation: 44.1 kHz, stereo, 16-bit,
/// 10 ms capture interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfiguration {
    /// Sample rate in Hz (default: 44100).
    pub sample_rate: u32,

    /// Channel layout (default: stereo).
    pub channels: ChannelLayout,

    /// Bit depth for PCM samples (default: 16). Valid values: 8, 16.
    pub bit_depth: u16,

    /// Length of one capture interval in milliseconds (default: 10).
    pub buffer_duration_ms: u32,

    /// Upper bound on a single blocking hardware read (default: 200).
    pub read_timeout_ms: u64,

    /// Upper bound on `stop()` waiting for the capture thread (default: 2000).
    pub shutdown_timeout_ms: u64,

    /// Directory where recording files are written.
    pub output_directory: PathBuf,

    /// Frames the recognition worker may queue before frames are dropped.
    pub recognition_queue_frames: usize,
}

/// Highest sample rate accepted by `validate`.
pub const MAX_SAMPLE_RATE: u32 = 384_000;

/// Byte layout of one capture interval, computed once per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameGeometry {
    /// `channels * bit_depth / 8`
    pub bytes_per_frame: usize,
    /// `sample_rate * buffer_duration_ms / 1000`
    pub frames_per_interval: usize,
    /// `bytes_per_frame * frames_per_interval`
    pub expected_byte_length: usize,
}

impl CaptureConfiguration {
    pub fn validate(&self) -> Result<(), String> {
        if self.sample_rate == 0 {
            return Err("sample rate must be positive".into());
        }
        if self.sample_rate > MAX_SAMPLE_RATE {
            return Err(format!(
                "sample rate {} Hz exceeds the {} Hz maximum",
                self.sample_rate, MAX_SAMPLE_RATE
            ));
        }
        if ![8, 16].contains(&self.bit_depth) {
            return Err(format!("unsupported bit depth: {}", self.bit_depth));
        }
        if self.buffer_duration_ms == 0 {
            return Err("buffer duration must be positive".into());
        }
        if (self.sample_rate as u64 * self.buffer_duration_ms as u64) < 1000 {
            return Err(format!(
                "{} ms at {} Hz holds no sample frames",
                self.buffer_duration_ms, self.sample_rate
            ));
        }
        if self.read_timeout_ms == 0 {
            return Err("read timeout must be positive".into());
        }
        if self.shutdown_timeout_ms == 0 {
            return Err("shutdown timeout must be positive".into());
        }
        if self.recognition_queue_frames == 0 {
            return Err("recognition queue must hold at least one frame".into());
        }
        Ok(())
    }

    /// Parse a JSON document, filling missing fields with defaults.
    pub fn from_json(json: &str) -> Result<Self, CaptureError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| CaptureError::ConfigurationFailed(format!("invalid configuration: {}", e)))?;
        config.validate().map_err(CaptureError::ConfigurationFailed)?;
        Ok(config)
    }

    pub fn sample_format(&self) -> SampleFormat {
        SampleFormat {
            sample_rate: self.sample_rate,
            channels: self.channels.count(),
            bit_depth: self.bit_depth,
        }
    }

    pub fn frame_geometry(&self) -> FrameGeometry {
        let bytes_per_frame = self.channels.count() as usize * self.bit_depth as usize / 8;
        let frames_per_interval =
            (self.sample_rate as u64 * self.buffer_duration_ms as u64 / 1000) as usize;
        FrameGeometry {
            bytes_per_frame,
            frames_per_interval,
            expected_byte_length: bytes_per_frame * frames_per_interval,
        }
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}

impl Default for CaptureConfiguration {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            channels: ChannelLayout::Stereo,
            bit_depth: 16,
            buffer_duration_ms: 10,
            read_timeout_ms: 200,
            shutdown_timeout_ms: 2000,
            output_directory: PathBuf::from("."),
            recognition_queue_frames: 256,
        }
    }
}
