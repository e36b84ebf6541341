//! Concurrent segment fetching.
//!
//! A bounded pool of worker threads pulls pre-zipped (ordinal, URL,
//! destination) items from a shared queue and writes each segment to the job
//! working directory. Completion order is irrelevant: the ordinal-to-filename
//! mapping is assigned before dispatch, so workers share no mutable state
//! beyond disjoint files.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context, Result};

use crate::job::segment_filename;
use crate::manifest::{substitute_reference, SegmentLocator};
use crate::transport::{Transport, TransportError};

/// Default worker pool width.
pub const DEFAULT_WORKERS: usize = 25;

/// Outcome counts for one fetch pass over a locator list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchReport {
    /// Segments downloaded by this pass.
    pub downloaded: usize,
    /// Segments already present on disk (resume).
    pub skipped: usize,
    /// Segments whose fetch failed; the assembler's completeness check will
    /// reject the gap downstream.
    pub failed: usize,
}

impl FetchReport {
    pub fn complete(&self) -> bool {
        self.failed == 0
    }
}

struct WorkItem {
    ordinal: usize,
    url: String,
    dest: PathBuf,
}

enum Outcome {
    Downloaded,
    Skipped,
}

fn fetch_one(transport: &dyn Transport, item: &WorkItem) -> Result<Outcome, TransportError> {
    if item.dest.exists() {
        return Ok(Outcome::Skipped);
    }
    transport.fetch_to_file(&item.url, &item.dest)?;
    Ok(Outcome::Downloaded)
}

/// Downloads every segment in `locators` into `work_dir`, at most `workers`
/// fetches in flight. Idempotent: segments already on disk are skipped.
///
/// Per-segment transport errors are logged and counted, never fatal; the pool
/// always waits for all dispatched items before returning. Only a worker
/// panic fails the call.
pub fn fetch_segments(
    transport: Arc<dyn Transport>,
    work_dir: &Path,
    base_manifest_url: &str,
    locators: &[SegmentLocator],
    workers: usize,
) -> Result<FetchReport> {
    let mut items = Vec::with_capacity(locators.len());
    for locator in locators {
        let url = substitute_reference(base_manifest_url, &locator.reference)
            .with_context(|| format!("segment {}", locator.ordinal))?;
        items.push(WorkItem {
            ordinal: locator.ordinal,
            url,
            dest: work_dir.join(segment_filename(locator.ordinal)),
        });
    }

    if items.is_empty() {
        return Ok(FetchReport::default());
    }

    let count = items.len();
    let work: Arc<Mutex<VecDeque<WorkItem>>> = Arc::new(Mutex::new(items.into_iter().collect()));
    let (tx, rx) = mpsc::channel();
    let num_workers = workers.max(1).min(count);
    let mut handles = Vec::with_capacity(num_workers);
    for _ in 0..num_workers {
        let work = Arc::clone(&work);
        let tx = tx.clone();
        let transport = Arc::clone(&transport);
        handles.push(std::thread::spawn(move || loop {
            let item = match work.lock().unwrap().pop_front() {
                Some(i) => i,
                None => break,
            };
            let res = fetch_one(transport.as_ref(), &item);
            let _ = tx.send((item, res));
        }));
    }
    drop(tx);

    let mut report = FetchReport::default();
    for (item, res) in rx.iter() {
        match res {
            Ok(Outcome::Downloaded) => {
                report.downloaded += 1;
                tracing::debug!(ordinal = item.ordinal, "segment downloaded");
            }
            Ok(Outcome::Skipped) => {
                report.skipped += 1;
            }
            Err(e) => {
                report.failed += 1;
                tracing::warn!(
                    ordinal = item.ordinal,
                    url = %item.url,
                    error = %e,
                    "segment fetch failed, continuing"
                );
            }
        }
    }

    for h in handles {
        h.join()
            .map_err(|e| anyhow!("fetch worker panicked: {:?}", e))?;
    }

    tracing::info!(
        downloaded = report.downloaded,
        skipped = report.skipped,
        failed = report.failed,
        "fetch pass finished"
    );
    Ok(report)
}
