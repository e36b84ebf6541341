//! Job-list file parsing.
//!
//! One job per line: either `output-name:url` or a bare URL (empty output
//! name, so the core derives one from the manifest hash). `#` and blank
//! lines are ignored.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

/// Parses a job-list file into `(output_name, manifest_url)` pairs.
pub fn parse_job_file(path: &Path) -> Result<Vec<(String, String)>> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("read job file {}", path.display()))?;
    Ok(parse_job_lines(&data))
}

pub fn parse_job_lines(data: &str) -> Vec<(String, String)> {
    data.lines().filter_map(parse_job_line).collect()
}

/// Bare URLs are recognized by scheme prefix so the colon inside `https://`
/// is never mistaken for the name separator.
fn parse_job_line(line: &str) -> Option<(String, String)> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    if line.starts_with("http://") || line.starts_with("https://") {
        return Some((String::new(), line.to_string()));
    }
    let (name, url) = line.split_once(':')?;
    Some((name.trim().to_string(), url.trim().to_string()))
}
