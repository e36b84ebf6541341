pub mod config;
pub mod logging;

pub mod assemble;
pub mod driver;
pub mod fetcher;
pub mod job;
pub mod manifest;
pub mod transcode;
pub mod transport;
