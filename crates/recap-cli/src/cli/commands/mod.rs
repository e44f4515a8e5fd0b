//! CLI command handlers, one per file.

mod cache;
mod capture;
mod config;
mod encode;

pub use cache::run_cache;
pub use capture::run_capture;
pub use config::run_config;
pub use encode::run_encode;
