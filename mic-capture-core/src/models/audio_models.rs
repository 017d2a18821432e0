use serde::{Deserialize, Serialize};

/// Input channel layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelLayout {
    Mono,
    Stereo,
}

impl ChannelLayout {
    pub fn count(&self) -> u16 {
        match self {
            Self::Mono => 1,
            Self::Stereo => 2,
        }
    }
}

/// PCM sample format of a capture stream: interleaved, little-endian,
/// unsigned for 8-bit and signed for 16-bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SampleFormat {
    pub sample_rate: u32,
    pub channels: u16,
    pub bit_depth: u16,
}

impl SampleFormat {
    /// Bytes for one sample of every channel.
    pub fn block_align(&self) -> usize {
        self.channels as usize * self.bit_depth as usize / 8
    }

    /// Bytes per second, saturating at `u32::MAX` for formats no RIFF
    /// header can describe.
    pub fn byte_rate(&self) -> u32 {
        u32::try_from(self.sample_rate as u64 * self.block_align() as u64).unwrap_or(u32::MAX)
    }
}

/// One capture interval of interleaved PCM bytes.
///
/// Owned by the capture loop for a single iteration: sinks borrow it while
/// they consume it and must copy anything they want to keep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFrame {
    sequence: u64,
    format: SampleFormat,
    data: Box<[u8]>,
}

impl AudioFrame {
    /// Copy `bytes` out of a source buffer into a new frame.
    pub fn copy_from(sequence: u64, format: SampleFormat, bytes: &[u8]) -> Self {
        Self {
            sequence,
            format,
            data: bytes.into(),
        }
    }

    /// Zero-based index of this frame within its session.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn format(&self) -> SampleFormat {
        self.format
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// A capture device reported by an `AudioSource`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub id: String,
    pub name: String,
    pub is_default: bool,
}

/// Real-time audio level metering of the latest frame (RMS and peak, 0.0–1.0).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AudioLevels {
    pub rms: f32,
    pub peak: f32,
}

/// Counters for debugging a capture session. Reset on every start.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptureDiagnostics {
    pub reads_attempted: u64,
    pub frames_captured: u64,
    pub underflows: u64,
    pub frames_dispatched: u64,
    pub sink_failures: u64,
    pub bytes_captured: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    const STEREO_16: SampleFormat = SampleFormat {
        sample_rate: 44100,
        channels: 2,
        bit_depth: 16,
    };

    #[test]
    fn block_align_and_byte_rate() {
        assert_eq!(STEREO_16.block_align(), 4);
        assert_eq!(STEREO_16.byte_rate(), 176_400);

        let mono_8 = SampleFormat {
            sample_rate: 8000,
            channels: 1,
            bit_depth: 8,
        };
        assert_eq!(mono_8.block_align(), 1);
        assert_eq!(mono_8.byte_rate(), 8000);
    }

    #[test]
    fn frame_copies_its_bytes() {
        let mut source = vec![1u8, 2, 3, 4, 5, 6, 7, 8];
        let frame = AudioFrame::copy_from(3, STEREO_16, &source);
        source[0] = 99;

        assert_eq!(frame.bytes(), &[1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(frame.sequence(), 3);
        assert_eq!(frame.len(), 8);
    }

    #[test]
    fn channel_layout_counts() {
        assert_eq!(ChannelLayout::Mono.count(), 1);
        assert_eq!(ChannelLayout::Stereo.count(), 2);
    }
}
