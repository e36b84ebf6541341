//! Per-job orchestration: dedup, resolve, fetch, assemble, cleanup.
//!
//! Jobs run one at a time; only the fetch phase fans out internally. Each
//! phase is a join point, and any failure moves the job straight to Failed
//! without aborting sibling jobs.

use std::fs;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::assemble;
use crate::config::HlsripConfig;
use crate::fetcher;
use crate::job::Job;
use crate::manifest;
use crate::transcode::{FfmpegTranscoder, Transcoder};
use crate::transport::{CurlTransport, Transport};

/// Job lifecycle states, logged at each transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Queued,
    Resolving,
    Fetching,
    Assembling,
    Done,
    Failed,
}

/// Per-job options passed explicitly through the driver (no process-wide
/// mutable flags).
#[derive(Debug, Clone, Copy, Default)]
pub struct JobOptions {
    /// Remove the job's segment cache after successful assembly.
    pub clean_work_dir: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    /// Resolved, fetched, and assembled in this run.
    Completed,
    /// Output artifact already existed; no network activity occurred.
    AlreadyExists,
}

/// Drives jobs end-to-end against a transport and a transcoder.
pub struct JobDriver {
    config: HlsripConfig,
    transport: Arc<dyn Transport>,
    transcoder: Box<dyn Transcoder>,
}

impl JobDriver {
    pub fn new(
        config: HlsripConfig,
        transport: Arc<dyn Transport>,
        transcoder: Box<dyn Transcoder>,
    ) -> Self {
        Self {
            config,
            transport,
            transcoder,
        }
    }

    /// Production wiring: curl transport, ffmpeg transcoder.
    pub fn with_defaults(config: HlsripConfig) -> Self {
        let transcoder = FfmpegTranscoder::new(config.audio.clone());
        Self::new(config, Arc::new(CurlTransport::new()), Box::new(transcoder))
    }

    fn trace_state(job: &Job, state: JobState) {
        tracing::info!(job = %job.hash, state = ?state, url = %job.manifest_url, "job state");
    }

    /// Runs one job end-to-end. Transitions are strictly sequential:
    /// Queued -> Resolving -> Fetching -> Assembling -> Done.
    pub fn run_job(&self, job: &Job, options: JobOptions) -> Result<JobOutcome> {
        Self::trace_state(job, JobState::Queued);

        let output_path = job.output_path(&self.config.output_dir);
        if output_path.exists() {
            tracing::info!(job = %job.hash, output = %output_path.display(), "output already exists, skipping job");
            return Ok(JobOutcome::AlreadyExists);
        }

        // Directory creation happens here, under sole ownership of the
        // driver, before the fetch fan-out.
        fs::create_dir_all(&self.config.output_dir)
            .with_context(|| format!("create output dir {}", self.config.output_dir.display()))?;
        let work_dir = job.work_dir(&self.config.temp_dir);
        fs::create_dir_all(&work_dir)
            .with_context(|| format!("create work dir {}", work_dir.display()))?;

        Self::trace_state(job, JobState::Resolving);
        let locators = manifest::resolve(self.transport.as_ref(), &job.manifest_url)?;
        tracing::info!(job = %job.hash, segments = locators.len(), "manifest resolved");

        Self::trace_state(job, JobState::Fetching);
        let report = fetcher::fetch_segments(
            Arc::clone(&self.transport),
            &work_dir,
            &job.manifest_url,
            &locators,
            self.config.workers,
        )?;
        if !report.complete() {
            tracing::warn!(
                job = %job.hash,
                failed = report.failed,
                "fetch pass left gaps, assembly will reject the incomplete set"
            );
        }

        Self::trace_state(job, JobState::Assembling);
        assemble::assemble(&work_dir, &locators, &output_path, self.transcoder.as_ref())?;

        if options.clean_work_dir {
            if let Err(e) = fs::remove_dir_all(&work_dir) {
                tracing::warn!(job = %job.hash, dir = %work_dir.display(), error = %e, "cleanup failed");
            }
        }

        Self::trace_state(job, JobState::Done);
        Ok(JobOutcome::Completed)
    }

    /// Runs every job in sequence; a failed job is logged and does not abort
    /// its siblings. Returns the failure count.
    pub fn run_all(&self, jobs: &[Job], options: JobOptions) -> usize {
        let mut failed = 0;
        for job in jobs {
            match self.run_job(job, options) {
                Ok(JobOutcome::Completed) => {
                    tracing::info!(job = %job.hash, output = %job.output_name, "job completed");
                }
                Ok(JobOutcome::AlreadyExists) => {}
                Err(e) => {
                    failed += 1;
                    Self::trace_state(job, JobState::Failed);
                    tracing::error!(job = %job.hash, error = format!("{:#}", e), "job failed");
                }
            }
        }
        failed
    }
}
