pub mod recognition_sink;
pub mod wave_sink;
