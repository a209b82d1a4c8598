pub mod config;
pub mod logging;

pub mod cancel;
pub mod catalog;
pub mod downloader;
pub mod error;
pub mod filename;
pub mod planner;
pub mod progress;
pub mod storage;
pub mod transport;
