//! Canonical 44-byte RIFF/WAVE header generation, patching and parsing.

use crate::models::audio_models::SampleFormat;

/// Size of the standard WAV RIFF header in bytes.
pub const WAV_HEADER_SIZE: usize = 44;

/// Largest data chunk a 32-bit RIFF size field can describe.
pub const MAX_DATA_SIZE: u64 = u32::MAX as u64 - (WAV_HEADER_SIZE as u64 - 8);

/// Generate a 44-byte WAV RIFF header.
///
/// Format: PCM (format code 1), little-endian.
///
/// Layout:
/// ```text
/// [0-3]    "RIFF"
/// [4-7]    file size - 8 (36 + data_size)
/// [8-11]   "WAVE"
/// [12-15]  "fmt "
/// [16-19]  16 (PCM format chunk size)
/// [20-21]  1 (PCM format code)
/// [22-23]  channels
/// [24-27]  sample_rate
/// [28-31]  byte_rate = sample_rate * channels * bit_depth / 8
/// [32-33]  block_align = channels * bit_depth / 8
/// [34-35]  bit_depth
/// [36-39]  "data"
/// [40-43]  data_size
/// ```
pub fn generate_wav_header(format: SampleFormat, data_size: u32) -> [u8; WAV_HEADER_SIZE] {
    let block_align = u16::try_from(format.block_align()).unwrap_or(u16::MAX);
    let byte_rate = format.byte_rate();
    let chunk_size = data_size.saturating_add(36);

    let mut header = [0u8; WAV_HEADER_SIZE];

    // RIFF chunk descriptor
    header[0..4].copy_from_slice(b"RIFF");
    header[4..8].copy_from_slice(&chunk_size.to_le_bytes());
    header[8..12].copy_from_slice(b"WAVE");

    // fmt sub-chunk
    header[12..16].copy_from_slice(b"fmt ");
    header[16..20].copy_from_slice(&16u32.to_le_bytes());
    header[20..22].copy_from_slice(&1u16.to_le_bytes());
    header[22..24].copy_from_slice(&format.channels.to_le_bytes());
    header[24..28].copy_from_slice(&format.sample_rate.to_le_bytes());
    header[28..32].copy_from_slice(&byte_rate.to_le_bytes());
    header[32..34].copy_from_slice(&block_align.to_le_bytes());
    header[34..36].copy_from_slice(&format.bit_depth.to_le_bytes());

    // data sub-chunk
    header[36..40].copy_from_slice(b"data");
    header[40..44].copy_from_slice(&data_size.to_le_bytes());

    header
}

/// Patch the file-size field at offset 4 (RIFF chunk size = file_size - 8).
pub fn patch_file_size(header: &mut [u8], total_file_size: u64) {
    let chunk_size = (total_file_size - 8) as u32;
    header[4..8].copy_from_slice(&chunk_size.to_le_bytes());
}

/// Patch the data-size field at offset 40.
pub fn patch_data_size(header: &mut [u8], data_size: u64) {
    let data_size_u32 = data_size as u32;
    header[40..44].copy_from_slice(&data_size_u32.to_le_bytes());
}

/// Fields of a parsed canonical WAV header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavHeader {
    pub riff_size: u32,
    pub format: SampleFormat,
    pub byte_rate: u32,
    pub block_align: u16,
    pub data_size: u32,
}

impl WavHeader {
    /// Parse the first 44 bytes of a canonical PCM WAV file.
    pub fn parse(bytes: &[u8]) -> Result<Self, String> {
        if bytes.len() < WAV_HEADER_SIZE {
            return Err(format!("header too short: {} bytes", bytes.len()));
        }
        if &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" {
            return Err("not a RIFF/WAVE stream".into());
        }
        if &bytes[12..16] != b"fmt " || &bytes[36..40] != b"data" {
            return Err("unexpected chunk layout".into());
        }
        if read_u16(bytes, 20) != 1 {
            return Err(format!("unsupported format code {}", read_u16(bytes, 20)));
        }

        Ok(Self {
            riff_size: read_u32(bytes, 4),
            format: SampleFormat {
                sample_rate: read_u32(bytes, 24),
                channels: read_u16(bytes, 22),
                bit_depth: read_u16(bytes, 34),
            },
            byte_rate: read_u32(bytes, 28),
            block_align: read_u16(bytes, 32),
            data_size: read_u32(bytes, 40),
        })
    }
}

fn read_u16(bytes: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    const CD_STEREO: SampleFormat = SampleFormat {
        sample_rate: 44100,
        channels: 2,
        bit_depth: 16,
    };

    #[test]
    fn header_magic_and_pcm_format() {
        let header = generate_wav_header(CD_STEREO, 0);
        assert_eq!(header.len(), 44);
        assert_eq!(&header[0..4], b"RIFF");
        assert_eq!(&header[8..12], b"WAVE");
        assert_eq!(&header[12..16], b"fmt ");
        assert_eq!(&header[36..40], b"data");
        assert_eq!(read_u16(&header, 20), 1);
        assert_eq!(read_u32(&header, 16), 16);
    }

    #[test]
    fn header_44khz_stereo_16bit() {
        let parsed = WavHeader::parse(&generate_wav_header(CD_STEREO, 176_400)).unwrap();

        assert_eq!(parsed.format, CD_STEREO);
        assert_eq!(parsed.byte_rate, 176_400);
        assert_eq!(parsed.block_align, 4);
        assert_eq!(parsed.data_size, 176_400);
        assert_eq!(parsed.riff_size, 36 + 176_400);
    }

    #[test]
    fn header_mono_8bit() {
        let format = SampleFormat {
            sample_rate: 8000,
            channels: 1,
            bit_depth: 8,
        };
        let parsed = WavHeader::parse(&generate_wav_header(format, 0)).unwrap();
        assert_eq!(parsed.byte_rate, 8000);
        assert_eq!(parsed.block_align, 1);
    }

    #[test]
    fn patch_sizes() {
        let mut header = generate_wav_header(CD_STEREO, 0);

        patch_data_size(&mut header, 19200);
        patch_file_size(&mut header, 19200 + 44);

        let parsed = WavHeader::parse(&header).unwrap();
        assert_eq!(parsed.data_size, 19200);
        assert_eq!(parsed.riff_size, 19200 + 36);
    }

    #[test]
    fn oversized_byte_rate_saturates_instead_of_overflowing() {
        let format = SampleFormat {
            sample_rate: 2_000_000_000,
            channels: 2,
            bit_depth: 16,
        };
        let parsed = WavHeader::parse(&generate_wav_header(format, u32::MAX)).unwrap();

        assert_eq!(parsed.byte_rate, u32::MAX);
        assert_eq!(parsed.block_align, 4);
        assert_eq!(parsed.riff_size, u32::MAX);
    }

    #[test]
    fn parse_rejects_foreign_bytes() {
        assert!(WavHeader::parse(&[0u8; 10]).is_err());
        assert!(WavHeader::parse(&[0u8; 44]).is_err());

        let mut header = generate_wav_header(CD_STEREO, 0);
        header[20] = 3; // IEEE float
        assert!(WavHeader::parse(&header).is_err());
    }
}
