use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Parser;

use hlsrip_core::config;
use hlsrip_core::driver::{JobDriver, JobOptions};
use hlsrip_core::job::Job;

use crate::jobs;

/// hlsrip: download an HLS playlist and transcode it to a single audio file.
#[derive(Debug, Parser)]
#[command(name = "hlsrip")]
#[command(about = "HLS playlist to audio file downloader", long_about = None)]
pub struct Cli {
    /// Playlist URLs to download.
    pub urls: Vec<String>,

    /// File with one job per line: "output-name:url" or a bare URL.
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output filename for URLs given on the command line.
    #[arg(short = 'o', long = "output")]
    pub output: Option<String>,

    /// Remove each job's segment cache after a successful run.
    #[arg(long)]
    pub clean: bool,

    /// Override the configured worker pool width.
    #[arg(long)]
    pub workers: Option<usize>,
}

pub fn run_from_args() -> Result<()> {
    run(Cli::parse())
}

pub fn run(cli: Cli) -> Result<()> {
    let mut cfg = config::load_or_init()?;
    tracing::debug!("loaded config: {:?}", cfg);
    if let Some(workers) = cli.workers {
        cfg.workers = workers;
    }

    let mut descriptors: Vec<(String, String)> = cli
        .urls
        .iter()
        .map(|url| (cli.output.clone().unwrap_or_default(), url.clone()))
        .collect();
    if let Some(path) = &cli.input {
        descriptors.extend(jobs::parse_job_file(path)?);
    }
    if descriptors.is_empty() {
        bail!("no jobs given: pass playlist URLs or --input <file>");
    }

    let mut queued = Vec::new();
    for (name, url) in &descriptors {
        match Job::new(url, name, &cfg.audio.container) {
            Ok(job) => queued.push(job),
            Err(e) => tracing::error!(url = %url, error = %e, "skipping invalid job"),
        }
    }
    if queued.is_empty() {
        bail!("no valid jobs among {} given", descriptors.len());
    }

    let options = JobOptions {
        clean_work_dir: cli.clean || cfg.clean_work_dir,
    };
    let driver = JobDriver::with_defaults(cfg);
    let failed = driver.run_all(&queued, options);
    if failed > 0 {
        tracing::warn!(failed, total = queued.len(), "some jobs failed");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_urls_and_flags() {
        let cli = Cli::parse_from([
            "hlsrip",
            "-o",
            "episode.mp3",
            "--clean",
            "--workers",
            "8",
            "https://cdn.example.com/p.m3u8",
        ]);
        assert_eq!(cli.urls, vec!["https://cdn.example.com/p.m3u8"]);
        assert_eq!(cli.output.as_deref(), Some("episode.mp3"));
        assert!(cli.clean);
        assert_eq!(cli.workers, Some(8));
        assert!(cli.input.is_none());
    }

    #[test]
    fn parses_input_file_flag() {
        let cli = Cli::parse_from(["hlsrip", "--input", "jobs.txt"]);
        assert_eq!(cli.input.as_deref(), Some(std::path::Path::new("jobs.txt")));
        assert!(cli.urls.is_empty());
    }
}
