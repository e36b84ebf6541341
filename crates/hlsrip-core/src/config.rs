use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::fetcher::DEFAULT_WORKERS;
use crate::transcode::AudioParams;

/// Global configuration loaded from `~/.config/hlsrip/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HlsripConfig {
    /// Worker pool width for concurrent segment fetches.
    pub workers: usize,
    /// Output root for finished artifacts.
    pub output_dir: PathBuf,
    /// Temp root holding per-job segment caches.
    pub temp_dir: PathBuf,
    /// Remove a job's segment cache after successful assembly.
    /// Overridable per run with `--clean`.
    #[serde(default)]
    pub clean_work_dir: bool,
    /// Target audio parameters for the transcode step.
    #[serde(default)]
    pub audio: AudioParams,
}

impl Default for HlsripConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            output_dir: PathBuf::from("dist"),
            temp_dir: PathBuf::from("temp"),
            clean_work_dir: false,
            audio: AudioParams::default(),
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("hlsrip")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<HlsripConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = HlsripConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: HlsripConfig = toml::from_str(&data)?;
    Ok(cfg)
}
