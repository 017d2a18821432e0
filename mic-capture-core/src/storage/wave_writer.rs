use std::fs::{self, File};
use std::io::{self, BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::models::audio_models::SampleFormat;
use crate::models::error::CaptureError;
use crate::processing::wav_format;

/// Streaming WAV file writer.
///
/// ## File Format
///
/// ```text
/// [44-byte WAV header, sizes zero until close]
/// [raw interleaved PCM data in arrival order...]
/// ```
///
/// The RIFF and data size fields are patched in place on `close`, from the
/// length actually on disk. After a failed write the writer refuses further
/// data.
pub struct WaveFileWriter {
    file_path: PathBuf,
    format: SampleFormat,
    file: Option<BufWriter<File>>,
    data_bytes: u64,
    failed: bool,
}

impl WaveFileWriter {
    pub fn new(file_path: PathBuf, format: SampleFormat) -> Self {
        Self {
            file_path,
            format,
            file: None,
            data_bytes: 0,
            failed: false,
        }
    }

    /// Create the file and write the initial 44-byte WAV header.
    pub fn open(&mut self) -> Result<(), CaptureError> {
        if self.file.is_some() {
            return Ok(());
        }

        if let Some(parent) = self.file_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    CaptureError::StorageError(format!("failed to create directory: {}", e))
                })?;
            }
        }

        let file = File::create(&self.file_path)
            .map_err(|e| CaptureError::StorageError(format!("failed to create file: {}", e)))?;
        let mut file = BufWriter::new(file);

        // data size placeholder, updated on close
        let header = wav_format::generate_wav_header(self.format, 0);
        file.write_all(&header)
            .map_err(|e| CaptureError::StorageError(format!("write failed: {}", e)))?;

        self.file = Some(file);
        self.data_bytes = 0;
        self.failed = false;
        Ok(())
    }

    /// Append PCM sample data.
    pub fn write(&mut self, data: &[u8]) -> Result<(), CaptureError> {
        if self.failed {
            return Err(CaptureError::StorageError(
                "an earlier write failed; recording is incomplete".into(),
            ));
        }
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| CaptureError::StorageError("file is not open for writing".into()))?;

        let total = self.data_bytes + data.len() as u64;
        if total > wav_format::MAX_DATA_SIZE {
            return Err(CaptureError::StorageError(format!(
                "data chunk would exceed the WAV limit ({} bytes)",
                total
            )));
        }

        if let Err(e) = file.write_all(data) {
            self.failed = true;
            return Err(CaptureError::StorageError(format!("write failed: {}", e)));
        }
        self.data_bytes = total;
        Ok(())
    }

    /// Finalize the file: patch the WAV header sizes, flush, and return the
    /// SHA-256 checksum of the completed file.
    pub fn close(&mut self) -> Result<String, CaptureError> {
        let mut file = self
            .file
            .take()
            .ok_or_else(|| CaptureError::StorageError("file is not open".into()))?;

        file.flush().map_err(|e| CaptureError::StorageError(e.to_string()))?;
        let total_file_size = file
            .seek(SeekFrom::End(0))
            .map_err(|e| CaptureError::StorageError(e.to_string()))?;
        self.data_bytes = total_file_size.saturating_sub(wav_format::WAV_HEADER_SIZE as u64);

        let mut sizes = wav_format::generate_wav_header(self.format, 0);
        wav_format::patch_file_size(&mut sizes, total_file_size);
        wav_format::patch_data_size(&mut sizes, self.data_bytes);

        patch_at(&mut file, 4, &sizes[4..8])?;
        patch_at(&mut file, 40, &sizes[40..44])?;

        file.flush().map_err(|e| CaptureError::StorageError(e.to_string()))?;
        file.get_ref()
            .sync_all()
            .map_err(|e| CaptureError::StorageError(format!("sync failed: {}", e)))?;
        drop(file);

        sha256_file(&self.file_path)
    }

    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }

    /// PCM bytes written so far (excluding the header).
    pub fn data_bytes(&self) -> u64 {
        self.data_bytes
    }

    pub fn format(&self) -> SampleFormat {
        self.format
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }
}

fn patch_at(file: &mut BufWriter<File>, offset: u64, bytes: &[u8]) -> Result<(), CaptureError> {
    file.seek(SeekFrom::Start(offset))
        .map_err(|e| CaptureError::StorageError(e.to_string()))?;
    file.write_all(bytes)
        .map_err(|e| CaptureError::StorageError(e.to_string()))
}

/// Compute SHA-256 hex digest of a file.
fn sha256_file(path: &Path) -> Result<String, CaptureError> {
    let mut file = File::open(path)
        .map_err(|e| CaptureError::StorageError(format!("failed to read file for checksum: {}", e)))?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)
        .map_err(|e| CaptureError::StorageError(format!("failed to read file for checksum: {}", e)))?;
    Ok(hex_encode(&hasher.finalize()))
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
