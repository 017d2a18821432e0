use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::audio_models::{AudioFrame, SampleFormat};
use crate::models::config::CaptureConfiguration;
use crate::models::error::CaptureError;
use crate::models::recording_result::{RecordingMetadata, RecordingResult};
use crate::storage::metadata;
use crate::storage::wave_writer::WaveFileWriter;
use crate::traits::frame_sink::FrameSink;

enum Destination {
    /// A new `recording_<uuid>.wav` per session inside this directory.
    Directory(PathBuf),
    /// Always this file, overwritten per session.
    File(PathBuf),
}

/// Shared view of the most recent recording finalized by a `WaveSink`.
///
/// The sink itself moves into the capture loop, so callers keep this
/// handle to find out where the file went.
#[derive(Clone, Default)]
pub struct LastRecording(Arc<Mutex<Option<RecordingResult>>>);

impl LastRecording {
    pub fn get(&self) -> Option<RecordingResult> {
        self.0.lock().clone()
    }

    fn set(&self, result: RecordingResult) {
        *self.0.lock() = Some(result);
    }
}

/// Frame sink persisting the session as a RIFF/WAVE file with a JSON
/// metadata sidecar.
pub struct WaveSink {
    destination: Destination,
    format: SampleFormat,
    writer: Option<WaveFileWriter>,
    last: LastRecording,
}

impl WaveSink {
    /// Write each session to a fresh file in the configured output directory.
    pub fn new(config: &CaptureConfiguration) -> Self {
        Self {
            destination: Destination::Directory(config.output_directory.clone()),
            format: config.sample_format(),
            writer: None,
            last: LastRecording::default(),
        }
    }

    /// Write every session to `path`.
    pub fn with_path(path: PathBuf, format: SampleFormat) -> Self {
        Self {
            destination: Destination::File(path),
            format,
            writer: None,
            last: LastRecording::default(),
        }
    }

    pub fn last_recording(&self) -> LastRecording {
        self.last.clone()
    }

    fn next_path(&self) -> PathBuf {
        match &self.destination {
            Destination::Directory(dir) => dir.join(format!("recording_{}.wav", uuid::Uuid::new_v4())),
            Destination::File(path) => path.clone(),
        }
    }
}

impl FrameSink for WaveSink {
    fn name(&self) -> &str {
        "wave"
    }

    fn start(&mut self) -> Result<(), CaptureError> {
        if self.writer.is_some() {
            return Err(CaptureError::StorageError("wave recording already in progress".into()));
        }

        let mut writer = WaveFileWriter::new(self.next_path(), self.format);
        writer.open()?;
        log::info!("Recording wave file to {:?}", writer.file_path());
        self.writer = Some(writer);
        Ok(())
    }

    fn on_frame(&mut self, frame: &AudioFrame) -> Result<(), CaptureError> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| CaptureError::StorageError("wave recording not started".into()))?;
        writer.write(frame.bytes())
    }

    fn stop(&mut self) -> Result<(), CaptureError> {
        let Some(mut writer) = self.writer.take() else {
            log::warn!("Stop called on a wave sink that is not recording");
            return Ok(());
        };

        let checksum = writer.close()?;
        let file_path = writer.file_path().to_path_buf();
        let data_bytes = writer.data_bytes();

        let metadata = RecordingMetadata::new(self.format, data_bytes, &file_path.to_string_lossy(), &checksum);
        metadata::write_metadata(&metadata, &file_path)?;

        log::info!(
            "Wave file finalized: {:?} ({} data bytes, {:.2}s)",
            file_path,
            data_bytes,
            metadata.duration_secs
        );

        self.last.set(RecordingResult {
            file_path,
            data_bytes,
            duration_secs: metadata.duration_secs,
            checksum,
            metadata,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::wav_format::WavHeader;
    use std::fs;

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("mic_capture_wave_sink_{}", uuid::Uuid::new_v4()))
    }

    fn frame(sequence: u64, format: SampleFormat, fill: u8, len: usize) -> AudioFrame {
        AudioFrame::copy_from(sequence, format, &vec![fill; len])
    }

    #[test]
    fn session_produces_wav_and_sidecar() {
        let dir = temp_dir();
        let config = CaptureConfiguration {
            output_directory: dir.clone(),
            ..Default::default()
        };
        let format = config.sample_format();
        let mut sink = WaveSink::new(&config);
        let last = sink.last_recording();

        sink.start().unwrap();
        for i in 0..3 {
            sink.on_frame(&frame(i, format, i as u8 + 1, 1764)).unwrap();
        }
        sink.stop().unwrap();

        let result = last.get().unwrap();
        assert_eq!(result.data_bytes, 3 * 1764);
        assert!(result.file_path.starts_with(&dir));

        let bytes = fs::read(&result.file_path).unwrap();
        let header = WavHeader::parse(&bytes).unwrap();
        assert_eq!(header.data_size as usize, 3 * 1764);
        assert_eq!(header.riff_size as usize, bytes.len() - 8);
        assert_eq!(bytes[44], 1);
        assert_eq!(bytes[44 + 1764], 2);
        assert_eq!(bytes[44 + 2 * 1764], 3);

        let sidecar = metadata::read_metadata(&result.file_path).unwrap();
        assert_eq!(sidecar.checksum, result.checksum);
        assert_eq!(sidecar.data_bytes, 3 * 1764);

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn each_session_gets_a_new_file() {
        let dir = temp_dir();
        let config = CaptureConfiguration {
            output_directory: dir.clone(),
            ..Default::default()
        };
        let mut sink = WaveSink::new(&config);
        let last = sink.last_recording();

        sink.start().unwrap();
        sink.stop().unwrap();
        let first = last.get().unwrap().file_path;

        sink.start().unwrap();
        sink.stop().unwrap();
        let second = last.get().unwrap().file_path;

        assert_ne!(first, second);
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn frames_before_start_are_rejected() {
        let config = CaptureConfiguration::default();
        let mut sink = WaveSink::new(&config);
        let err = sink.on_frame(&frame(0, config.sample_format(), 0, 4)).unwrap_err();
        assert!(matches!(err, CaptureError::StorageError(_)));
        assert!(sink.stop().is_ok());
    }

    #[test]
    fn double_start_is_rejected() {
        let dir = temp_dir();
        let path = dir.join("fixed.wav");
        let config = CaptureConfiguration::default();
        let mut sink = WaveSink::with_path(path.clone(), config.sample_format());

        sink.start().unwrap();
        assert!(sink.start().is_err());
        sink.stop().unwrap();
        assert_eq!(sink.last_recording().get().unwrap().file_path, path);

        fs::remove_dir_all(&dir).ok();
    }
}
