pub mod audio_source;
pub mod capture_control;
pub mod capture_delegate;
pub mod frame_sink;
