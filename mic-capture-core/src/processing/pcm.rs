//! Pure-math helpers over interleaved little-endian PCM byte buffers.
//!
//! 8-bit samples are unsigned with a 128 midpoint, 16-bit samples are
//! signed. Trailing bytes that do not form a whole sample frame are ignored.

use crate::models::audio_models::{AudioLevels, SampleFormat};

/// Decode every sample in `bytes` to a normalized f32 in `[-1.0, 1.0]`.
pub fn to_f32_samples(bytes: &[u8], bit_depth: u16) -> Vec<f32> {
    match bit_depth {
        8 => bytes.iter().map(|&b| (b as f32 - 128.0) / 128.0).collect(),
        16 => bytes
            .chunks_exact(2)
            .map(|c| i16::from_le_bytes([c[0], c[1]]) as f32 / 32768.0)
            .collect(),
        _ => Vec::new(),
    }
}

/// Extract the first channel of every sample frame as signed 16-bit.
///
/// Speech recognizers consume mono 16-bit audio; for stereo input the left
/// channel is kept and 8-bit input is widened.
pub fn first_channel_i16(bytes: &[u8], format: SampleFormat) -> Vec<i16> {
    let block_align = format.block_align();
    if block_align == 0 {
        return Vec::new();
    }
    bytes
        .chunks_exact(block_align)
        .map(|frame| match format.bit_depth {
            8 => ((frame[0] as i16) - 128) << 8,
            _ => i16::from_le_bytes([frame[0], frame[1]]),
        })
        .collect()
}

/// Root-mean-square level of samples.
pub fn rms_level(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = samples.iter().map(|s| s * s).sum();
    (sum_sq / samples.len() as f32).sqrt()
}

/// Peak absolute level of samples.
pub fn peak_level(samples: &[f32]) -> f32 {
    samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max)
}

/// RMS and peak over every channel of a PCM buffer.
pub fn measure_levels(bytes: &[u8], format: SampleFormat) -> AudioLevels {
    let samples = to_f32_samples(bytes, format.bit_depth);
    AudioLevels {
        rms: rms_level(&samples).min(1.0),
        peak: peak_level(&samples).min(1.0),
    }
}
