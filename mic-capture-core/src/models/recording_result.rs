use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::audio_models::SampleFormat;

/// Result of a finalized WAV recording.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingResult {
    pub file_path: PathBuf,
    pub data_bytes: u64,
    pub duration_secs: f64,
    pub metadata: RecordingMetadata,
    pub checksum: String,
}

/// Metadata stored alongside a recording as a JSON sidecar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingMetadata {
    pub id: String,
    pub duration_secs: f64,
    pub data_bytes: u64,
    pub file_path: String,
    pub checksum: String,
    pub sample_rate: u32,
    pub channels: u16,
    pub bit_depth: u16,
    pub created_at: String,
}

impl RecordingMetadata {
    pub fn new(format: SampleFormat, data_bytes: u64, file_path: &str, checksum: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            duration_secs: duration_secs(format, data_bytes),
            data_bytes,
            file_path: file_path.to_string(),
            checksum: checksum.to_string(),
            sample_rate: format.sample_rate,
            channels: format.channels,
            bit_depth: format.bit_depth,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Playback length of `data_bytes` of PCM in `format`.
pub fn duration_secs(format: SampleFormat, data_bytes: u64) -> f64 {
    let byte_rate = format.byte_rate();
    if byte_rate == 0 {
        return 0.0;
    }
    data_bytes as f64 / byte_rate as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn one_second_of_cd_stereo() {
        let format = SampleFormat {
            sample_rate: 44100,
            channels: 2,
            bit_depth: 16,
        };
        assert_relative_eq!(duration_secs(format, 176_400), 1.0);
        assert_relative_eq!(duration_secs(format, 1764), 0.01);
    }

    #[test]
    fn metadata_round_trips_through_json() {
        let format = SampleFormat {
            sample_rate: 16000,
            channels: 1,
            bit_depth: 16,
        };
        let metadata = RecordingMetadata::new(format, 32000, "/tmp/a.wav", "abc");
        assert_relative_eq!(metadata.duration_secs, 1.0);

        let json = serde_json::to_string(&metadata).unwrap();
        let parsed: RecordingMetadata = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, metadata);
    }
}
