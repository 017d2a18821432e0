pub mod capture_loop;
pub mod controller;
pub mod dispatch;
pub mod handoff;
pub(crate) mod worker;
