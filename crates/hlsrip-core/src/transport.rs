//! Blocking HTTP transport over libcurl.
//!
//! Two fetch shapes: manifests come back as text, segments are streamed
//! straight to disk. Segment bodies are written to a `.part` file and renamed
//! on success so an interrupted download never satisfies the resume
//! existence check.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use thiserror::Error;

/// Suffix for in-flight segment files before the atomic rename.
pub const PART_SUFFIX: &str = ".part";

/// Error from a single HTTP fetch (curl failure, non-2xx status, or disk I/O).
#[derive(Debug, Error)]
pub enum TransportError {
    #[error(transparent)]
    Curl(#[from] curl::Error),
    #[error("HTTP {0}")]
    Http(u32),
    #[error("i/o: {0}")]
    Io(#[from] std::io::Error),
}

/// HTTP GET seam used by the resolver and the fetcher pool.
///
/// The production implementation is [`CurlTransport`]; tests substitute an
/// in-memory map so resolution and fetching run without a network.
pub trait Transport: Send + Sync {
    /// Fetch `url` and return the body as text (UTF-8, lossy).
    fn fetch_text(&self, url: &str) -> Result<String, TransportError>;

    /// Fetch `url` and write the body verbatim to `dest`. The write is
    /// all-or-nothing: on any error no file is left at `dest`.
    fn fetch_to_file(&self, url: &str, dest: &Path) -> Result<(), TransportError>;
}

/// Transport backed by `curl::easy::Easy`, one handle per request.
#[derive(Debug, Default)]
pub struct CurlTransport;

impl CurlTransport {
    pub fn new() -> Self {
        Self
    }

    fn fetch_to_part(&self, url: &str, part: &Path) -> Result<(), TransportError> {
        let mut easy = curl::easy::Easy::new();
        easy.url(url)?;
        easy.follow_location(true)?;
        // No total timeout on segment bodies: a hung connection stalls one
        // worker slot, not the job.

        let mut file = File::create(part)?;
        let write_error: Arc<Mutex<Option<std::io::Error>>> = Arc::new(Mutex::new(None));
        let write_error_cb = Arc::clone(&write_error);
        {
            let mut transfer = easy.transfer();
            transfer.write_function(move |data| {
                Ok(sink_chunk(&mut file, data, &write_error_cb))
            })?;
            if let Err(e) = transfer.perform() {
                if e.is_write_error() {
                    if let Some(io_err) = write_error.lock().unwrap().take() {
                        return Err(TransportError::Io(io_err));
                    }
                }
                return Err(TransportError::Curl(e));
            }
        }

        let code = easy.response_code()?;
        if !(200..300).contains(&code) {
            return Err(TransportError::Http(code));
        }
        Ok(())
    }
}

impl Transport for CurlTransport {
    fn fetch_text(&self, url: &str) -> Result<String, TransportError> {
        let mut easy = curl::easy::Easy::new();
        easy.url(url)?;
        easy.follow_location(true)?;
        easy.connect_timeout(Duration::from_secs(15))?;
        easy.timeout(Duration::from_secs(30))?;

        let mut body = Vec::new();
        {
            let mut transfer = easy.transfer();
            transfer.write_function(|data| {
                body.extend_from_slice(data);
                Ok(data.len())
            })?;
            transfer.perform()?;
        }

        let code = easy.response_code()?;
        if !(200..300).contains(&code) {
            return Err(TransportError::Http(code));
        }
        Ok(String::from_utf8_lossy(&body).into_owned())
    }

    fn fetch_to_file(&self, url: &str, dest: &Path) -> Result<(), TransportError> {
        let part = part_path(dest);
        match self.fetch_to_part(url, &part) {
            Ok(()) => {
                fs::rename(&part, dest)?;
                Ok(())
            }
            Err(e) => {
                let _ = fs::remove_file(&part);
                Err(e)
            }
        }
    }
}

/// Writes one body chunk from the curl write callback.
///
/// On a write failure the io::Error is stashed and 0 is returned, which makes
/// curl abort the transfer with a write error (recovered after `perform()`).
/// Returning `WriteError::Pause` instead would pause the transfer with no
/// unpause path, blocking the worker forever on a handle with no timeout.
fn sink_chunk<W: Write>(dest: &mut W, data: &[u8], stash: &Mutex<Option<std::io::Error>>) -> usize {
    match dest.write_all(data) {
        Ok(()) => data.len(),
        Err(e) => {
            let _ = stash.lock().unwrap().replace(e);
            0
        }
    }
}

/// Path for the in-flight file: appends `.part` to the destination.
pub fn part_path(dest: &Path) -> PathBuf {
    let mut o = dest.as_os_str().to_owned();
    o.push(PART_SUFFIX);
    PathBuf::from(o)
}
