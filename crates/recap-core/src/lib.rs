pub mod config;
pub mod logging;

pub mod archiver;
pub mod cache;
pub mod control;
pub mod metadata;
pub mod multipart;
pub mod notify;
pub mod tee;
pub mod upload;

pub use archiver::{Archiver, StatsSnapshot};
pub use cache::MetadataCache;
pub use config::RecapConfig;
pub use metadata::{DocumentKind, DocumentMetadata};
pub use tee::{StreamListener, StreamTee};
