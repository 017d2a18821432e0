//! # mic-capture-windows
//!
//! Windows WASAPI backend for mic-capture-core.
//!
//! Provides:
//! - `WasapiMicSource`: microphone input via a WASAPI capture endpoint
//! - `permissions`: Windows microphone privacy check
//! - `FrameAssembler`: packet-to-frame regrouping, platform independent
//!
//! ## Platform Requirements
//! - Windows 10 1703+
//! - Visual Studio Build Tools 2022 + Windows SDK for linking
//!
//! ## Usage
//! ```ignore
//! use mic_capture_core::{CaptureConfiguration, CaptureLoop, WaveSink};
//! use mic_capture_windows::WasapiMicSource;
//!
//! let config = CaptureConfiguration::default();
//! let capture = CaptureLoop::new(WasapiMicSource::default_device(), config.clone())?;
//! capture.start(vec![Box::new(WaveSink::new(&config))])?;
//! ```

pub mod assembler;
#[cfg(target_os = "windows")]
mod com;
#[cfg(target_os = "windows")]
pub mod permissions;
#[cfg(target_os = "windows")]
pub mod wasapi_mic;

pub use assembler::FrameAssembler;
#[cfg(target_os = "windows")]
pub use wasapi_mic::{WasapiMicHandle, WasapiMicSource};
