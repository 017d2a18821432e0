pub mod debouncer;
pub mod engine;
pub mod hypothesis;
pub mod listener;
