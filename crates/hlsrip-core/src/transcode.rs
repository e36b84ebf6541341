//! External transcode process interface.
//!
//! The transcoder is the only codec-aware component and is deliberately an
//! external process: it receives an ordered list of local segment paths plus
//! audio parameters and must leave a finished artifact at the output path.
//! The contract is pass/fail only; its internal errors are not interpreted.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Target audio parameters handed to ffmpeg (config `[audio]` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioParams {
    /// Audio codec, e.g. "libmp3lame".
    pub codec: String,
    /// Target bitrate, e.g. "256k".
    pub bitrate: String,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Channel count.
    pub channels: u8,
    /// Container format and output extension, e.g. "mp3".
    pub container: String,
}

impl Default for AudioParams {
    fn default() -> Self {
        Self {
            codec: "libmp3lame".to_string(),
            bitrate: "256k".to_string(),
            sample_rate: 44100,
            channels: 2,
            container: "mp3".to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum TranscodeError {
    #[error("failed to spawn ffmpeg: {0}")]
    Spawn(std::io::Error),
    #[error("ffmpeg exited with {0}")]
    Exit(std::process::ExitStatus),
    #[error("ffmpeg exited successfully but wrote no output at {0}")]
    MissingOutput(PathBuf),
}

/// Seam for the external transcode step. Implementations must
/// stream-concatenate `inputs` in the given order and write the artifact to
/// `output`, or fail.
pub trait Transcoder {
    fn transcode(&self, inputs: &[PathBuf], output: &Path) -> Result<(), TranscodeError>;
}

/// Shells out to `ffmpeg` with the protocol-level `concat:` input, mirroring
/// how the segments were meant to be played back to back.
pub struct FfmpegTranscoder {
    params: AudioParams,
}

impl FfmpegTranscoder {
    pub fn new(params: AudioParams) -> Self {
        Self { params }
    }

    fn command(&self, inputs: &[PathBuf], output: &Path) -> Command {
        let concat = format!(
            "concat:{}",
            inputs
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join("|")
        );
        let mut cmd = Command::new("ffmpeg");
        cmd.arg("-i")
            .arg(concat)
            .arg("-vn")
            .arg("-acodec")
            .arg(&self.params.codec)
            .arg("-ab")
            .arg(&self.params.bitrate)
            .arg("-ar")
            .arg(self.params.sample_rate.to_string())
            .arg("-ac")
            .arg(self.params.channels.to_string())
            .arg("-f")
            .arg(&self.params.container)
            .arg("-y")
            .arg(output)
            .stdin(Stdio::null());
        cmd
    }
}

impl Transcoder for FfmpegTranscoder {
    fn transcode(&self, inputs: &[PathBuf], output: &Path) -> Result<(), TranscodeError> {
        let mut cmd = self.command(inputs, output);
        tracing::debug!(inputs = inputs.len(), output = %output.display(), "invoking ffmpeg");
        let status = cmd.status().map_err(TranscodeError::Spawn)?;
        if !status.success() {
            return Err(TranscodeError::Exit(status));
        }
        if !output.exists() {
            return Err(TranscodeError::MissingOutput(output.to_path_buf()));
        }
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_audio_params_match_mp3_target() {
        let p = AudioParams::default();
        assert_eq!(p.codec, "libmp3lame");
        assert_eq!(p.bitrate, "256k");
        assert_eq!(p.sample_rate, 44100);
        assert_eq!(p.channels, 2);
        assert_eq!(p.container, "mp3");
    }

    #[test]
    fn ffmpeg_command_shape() {
        let t = FfmpegTranscoder::new(AudioParams::default());
        let inputs = vec![PathBuf::from("temp/j/0000.ts"), PathBuf::from("temp/j/0001.ts")];
        let cmd = t.command(&inputs, Path::new("dist/out.mp3"));
        let args: Vec<String> = cmd
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(cmd.get_program().to_string_lossy(), "ffmpeg");
        assert_eq!(
            args,
            vec![
                "-i",
                "concat:temp/j/0000.ts|temp/j/0001.ts",
                "-vn",
                "-acodec",
                "libmp3lame",
                "-ab",
                "256k",
                "-ar",
                "44100",
                "-ac",
                "2",
                "-f",
                "mp3",
                "-y",
                "dist/out.mp3",
            ]
        );
    }
}
