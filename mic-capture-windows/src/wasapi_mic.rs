//! WASAPI microphone source.
//!
//! Opens a capture endpoint in shared mode at the configured PCM format and
//! pumps packets from a dedicated thread into a bounded channel. Reads on
//! the capture loop's thread regroup those packets into fixed-size frames.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{bounded, Sender, TrySendError};
use windows::core::*;
use windows::Win32::Media::Audio::*;
use windows::Win32::System::Com::*;
use windows::Win32::System::Threading::*;

use mic_capture_core::{AudioHandle, AudioSource, CaptureConfiguration, CaptureError, DeviceInfo, SampleFormat};

use crate::assembler::FrameAssembler;
use crate::com::ComApartment;
use crate::permissions;

/// Packets the pump may queue ahead of the capture loop.
const PACKET_QUEUE: usize = 64;
/// Shared-mode engine buffer: 100ms in 100-nanosecond units.
const ENGINE_BUFFER_HNS: i64 = 1_000_000;
const POLL_INTERVAL: Duration = Duration::from_millis(5);
const OPEN_TIMEOUT: Duration = Duration::from_secs(2);

const E_ACCESSDENIED: i32 = 0x8007_0005_u32 as i32;

/// WASAPI microphone input.
pub struct WasapiMicSource {
    device_id: Option<String>,
    device_name: String,
    is_default: bool,
}

impl WasapiMicSource {
    /// Source for the system default microphone.
    pub fn default_device() -> Self {
        Self {
            device_id: None,
            device_name: "Default Microphone".into(),
            is_default: true,
        }
    }

    /// Source for a specific microphone by endpoint ID.
    pub fn with_device(id: String, name: String) -> Self {
        Self {
            device_id: Some(id),
            device_name: name,
            is_default: false,
        }
    }
}

impl AudioSource for WasapiMicSource {
    type Handle = WasapiMicHandle;

    fn is_available(&self) -> bool {
        let Ok(_com) = ComApartment::enter() else {
            return false;
        };
        unsafe {
            CoCreateInstance::<_, IMMDeviceEnumerator>(&MMDeviceEnumerator, None, CLSCTX_ALL)
                .and_then(|e| e.GetDefaultAudioEndpoint(eCapture, eConsole))
                .is_ok()
        }
    }

    fn device_info(&self) -> DeviceInfo {
        DeviceInfo {
            id: self.device_id.clone().unwrap_or_else(|| "default-mic".into()),
            name: self.device_name.clone(),
            is_default: self.is_default,
        }
    }

    fn open(&mut self, config: &CaptureConfiguration) -> std::result::Result<WasapiMicHandle, CaptureError> {
        permissions::require_microphone_permission()?;

        let format = config.sample_format();
        let running = Arc::new(AtomicBool::new(true));
        let (packets_tx, packets_rx) = bounded(PACKET_QUEUE);
        let (ready_tx, ready_rx) = bounded(1);

        let pump_running = Arc::clone(&running);
        let device_id = self.device_id.clone();
        let pump = thread::Builder::new()
            .name("wasapi-mic-pump".into())
            .spawn(move || {
                if let Err(e) = pump_packets(&pump_running, device_id, format, &packets_tx, &ready_tx) {
                    log::error!("Mic capture error: {}", e);
                    // no-op if open already succeeded
                    let _ = ready_tx.try_send(Err(e));
                }
                pump_running.store(false, Ordering::SeqCst);
            })
            .map_err(|e| CaptureError::Unknown(format!("failed to spawn mic thread: {}", e)))?;

        let mut handle = WasapiMicHandle {
            assembler: FrameAssembler::new(packets_rx, config.read_timeout()),
            running,
            pump: Some(pump),
        };

        match ready_rx.recv_timeout(OPEN_TIMEOUT) {
            Ok(Ok(())) => {
                log::info!(
                    "Opened {} at {} Hz, {} ch, {}-bit",
                    self.device_name,
                    format.sample_rate,
                    format.channels,
                    format.bit_depth
                );
                Ok(handle)
            }
            Ok(Err(e)) => {
                handle.close();
                Err(e)
            }
            Err(_) => {
                handle.close();
                Err(CaptureError::DeviceUnavailable)
            }
        }
    }
}

/// Open WASAPI stream. Frames are served from packets the pump thread queued.
pub struct WasapiMicHandle {
    assembler: FrameAssembler,
    running: Arc<AtomicBool>,
    pump: Option<thread::JoinHandle<()>>,
}

impl AudioHandle for WasapiMicHandle {
    fn read_frame(&mut self, expected_len: usize) -> std::result::Result<&[u8], CaptureError> {
        self.assembler.next_frame(expected_len)
    }

    fn close(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(pump) = self.pump.take() {
            if pump.join().is_err() {
                log::error!("Mic pump thread panicked");
            }
            log::debug!("Mic stream closed");
        }
    }
}

impl Drop for WasapiMicHandle {
    fn drop(&mut self) {
        self.close();
    }
}

fn pcm_wave_format(format: SampleFormat) -> WAVEFORMATEX {
    let block_align = format.block_align() as u16;
    WAVEFORMATEX {
        wFormatTag: WAVE_FORMAT_PCM as u16,
        nChannels: format.channels,
        nSamplesPerSec: format.sample_rate,
        nAvgBytesPerSec: format.byte_rate(),
        nBlockAlign: block_align,
        wBitsPerSample: format.bit_depth,
        cbSize: 0,
    }
}

/// Pump thread body.
///
/// Sequence:
/// 1. Enter a COM apartment (MTA)
/// 2. Get capture device (default or by ID)
/// 3. Activate IAudioClient
/// 4. Initialize in shared mode with the requested PCM format
/// 5. Get IAudioCaptureClient service
/// 6. Report readiness, register with MMCSS
/// 7. Start capture, poll for packets until stopped
fn pump_packets(
    running: &AtomicBool,
    device_id: Option<String>,
    format: SampleFormat,
    packets: &Sender<Vec<u8>>,
    ready: &Sender<std::result::Result<(), CaptureError>>,
) -> std::result::Result<(), CaptureError> {
    let _com = ComApartment::enter()?;

    unsafe {
        let enumerator: IMMDeviceEnumerator = CoCreateInstance(&MMDeviceEnumerator, None, CLSCTX_ALL)
            .map_err(|_| CaptureError::DeviceUnavailable)?;

        let device = if let Some(ref id) = device_id {
            let wide_id: Vec<u16> = id.encode_utf16().chain(std::iter::once(0)).collect();
            enumerator
                .GetDevice(PCWSTR(wide_id.as_ptr()))
                .map_err(|_| CaptureError::DeviceUnavailable)?
        } else {
            enumerator
                .GetDefaultAudioEndpoint(eCapture, eConsole)
                .map_err(|_| CaptureError::DeviceUnavailable)?
        };

        let audio_client: IAudioClient = device.Activate(CLSCTX_ALL, None).map_err(|e| {
            if e.code().0 == E_ACCESSDENIED {
                CaptureError::PermissionDenied
            } else {
                CaptureError::DeviceUnavailable
            }
        })?;

        // The engine converts from its mix format to ours.
        let wave_format = pcm_wave_format(format);
        audio_client
            .Initialize(
                AUDCLNT_SHAREMODE_SHARED,
                AUDCLNT_STREAMFLAGS_AUTOCONVERTPCM | AUDCLNT_STREAMFLAGS_SRC_DEFAULT_QUALITY,
                ENGINE_BUFFER_HNS,
                0,
                &wave_format,
                None,
            )
            .map_err(|e| {
                log::error!("IAudioClient::Initialize rejected the format: {}", e);
                CaptureError::DeviceUnavailable
            })?;

        let capture_client: IAudioCaptureClient = audio_client
            .GetService()
            .map_err(|e| CaptureError::ConfigurationFailed(format!("GetService failed: {}", e)))?;

        let mut task_index: u32 = 0;
        let task_name: Vec<u16> = "Pro Audio\0".encode_utf16().collect();
        let _mmcss_handle = AvSetMmThreadCharacteristicsW(PCWSTR(task_name.as_ptr()), &mut task_index);

        audio_client
            .Start()
            .map_err(|e| CaptureError::Unknown(format!("IAudioClient::Start failed: {}", e)))?;
        // the receiver may have timed out already
        let _ = ready.try_send(Ok(()));

        let block_align = format.block_align();
        let mut dropped: u64 = 0;

        while running.load(Ordering::SeqCst) {
            thread::sleep(POLL_INTERVAL);

            let mut packet_length = capture_client
                .GetNextPacketSize()
                .map_err(|e| CaptureError::Unknown(format!("GetNextPacketSize failed: {}", e)))?;

            while packet_length > 0 {
                let mut buffer_ptr: *mut u8 = std::ptr::null_mut();
                let mut num_frames: u32 = 0;
                let mut flags: u32 = 0;

                capture_client
                    .GetBuffer(&mut buffer_ptr, &mut num_frames, &mut flags, None, None)
                    .map_err(|e| CaptureError::Unknown(format!("GetBuffer failed: {}", e)))?;

                if num_frames > 0 && !buffer_ptr.is_null() {
                    let len = num_frames as usize * block_align;
                    let packet = if flags & (AUDCLNT_BUFFERFLAGS_SILENT.0 as u32) != 0 {
                        vec![silence_byte(format); len]
                    } else {
                        std::slice::from_raw_parts(buffer_ptr, len).to_vec()
                    };

                    match packets.try_send(packet) {
                        Ok(()) => {}
                        Err(TrySendError::Full(_)) => {
                            dropped += 1;
                            if dropped == 1 {
                                log::warn!("Capture loop is not keeping up; dropping mic packets");
                            }
                        }
                        Err(TrySendError::Disconnected(_)) => running.store(false, Ordering::SeqCst),
                    }
                }

                capture_client
                    .ReleaseBuffer(num_frames)
                    .map_err(|e| CaptureError::Unknown(format!("ReleaseBuffer failed: {}", e)))?;

                packet_length = capture_client
                    .GetNextPacketSize()
                    .map_err(|e| CaptureError::Unknown(format!("GetNextPacketSize failed: {}", e)))?;
            }
        }

        if dropped > 0 {
            log::warn!("Mic pump dropped {} packets", dropped);
        }
        let _ = audio_client.Stop();
    }

    Ok(())
}

/// Zero level for the sample encoding: unsigned 8-bit is centred on 128.
fn silence_byte(format: SampleFormat) -> u8 {
    if format.bit_depth == 8 {
        0x80
    } else {
        0
    }
}
