//! Ordered reassembly of fetched segments.
//!
//! Verifies the segment cache is gap-free before handing the ordinal-ordered
//! path list to the transcoder. Never attempts a partial merge.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::job::segment_filename;
use crate::manifest::SegmentLocator;
use crate::transcode::{TranscodeError, Transcoder};

#[derive(Debug, Error)]
pub enum AssemblyError {
    #[error("segment {ordinal} of {total} missing from {}", dir.display())]
    Incomplete {
        ordinal: usize,
        total: usize,
        dir: PathBuf,
    },
    #[error(transparent)]
    Transcode(#[from] TranscodeError),
}

/// Assembles the job's segments into the output artifact.
///
/// If `output_path` already exists the job was finished by an earlier run and
/// assembly is skipped. Otherwise every ordinal in `[0, N)` must have a file
/// in `work_dir`; the first gap fails with [`AssemblyError::Incomplete`]
/// (a re-run of the fetch pass fills gaps without refetching the rest).
pub fn assemble(
    work_dir: &Path,
    locators: &[SegmentLocator],
    output_path: &Path,
    transcoder: &dyn Transcoder,
) -> Result<(), AssemblyError> {
    if output_path.exists() {
        tracing::info!(output = %output_path.display(), "output already exists, skipping assembly");
        return Ok(());
    }

    let mut inputs = Vec::with_capacity(locators.len());
    for locator in locators {
        let path = work_dir.join(segment_filename(locator.ordinal));
        if !path.exists() {
            return Err(AssemblyError::Incomplete {
                ordinal: locator.ordinal,
                total: locators.len(),
                dir: work_dir.to_path_buf(),
            });
        }
        inputs.push(path);
    }

    tracing::info!(
        segments = inputs.len(),
        output = %output_path.display(),
        "assembling segments"
    );
    transcoder.transcode(&inputs, output_path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcode::testing::FakeTranscoder;
    use std::fs;

    fn locators(n: usize) -> Vec<SegmentLocator> {
        (0..n)
            .map(|ordinal| SegmentLocator {
                ordinal,
                reference: format!("s{}.ts", ordinal),
            })
            .collect()
    }

    fn write_segments(dir: &Path, ordinals: &[usize]) {
        for &i in ordinals {
            fs::write(dir.join(segment_filename(i)), format!("seg{}", i)).unwrap();
        }
    }

    #[test]
    fn merges_in_ordinal_order() {
        let dir = tempfile::tempdir().unwrap();
        write_segments(dir.path(), &[0, 1, 2]);
        let out = dir.path().join("out.mp3");
        let transcoder = FakeTranscoder::new();

        assemble(dir.path(), &locators(3), &out, &transcoder).unwrap();

        assert_eq!(fs::read(&out).unwrap(), b"seg0seg1seg2");
        let calls = transcoder.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        let names: Vec<_> = calls[0]
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["0000.ts", "0001.ts", "0002.ts"]);
    }

    #[test]
    fn missing_ordinal_fails_without_partial_merge() {
        let dir = tempfile::tempdir().unwrap();
        write_segments(dir.path(), &[0, 1, 3, 4]);
        let out = dir.path().join("out.mp3");
        let transcoder = FakeTranscoder::new();

        match assemble(dir.path(), &locators(5), &out, &transcoder) {
            Err(AssemblyError::Incomplete { ordinal, total, .. }) => {
                assert_eq!(ordinal, 2);
                assert_eq!(total, 5);
            }
            other => panic!("expected Incomplete, got {:?}", other.map(|_| ())),
        }
        assert!(!out.exists());
        assert!(transcoder.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn existing_output_skips_transcoder() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.mp3");
        fs::write(&out, b"done").unwrap();
        let transcoder = FakeTranscoder::new();

        assemble(dir.path(), &locators(3), &out, &transcoder).unwrap();

        assert_eq!(fs::read(&out).unwrap(), b"done");
        assert!(transcoder.calls.lock().unwrap().is_empty());
    }
}
