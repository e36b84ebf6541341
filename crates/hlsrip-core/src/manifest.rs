//! HLS manifest resolution.
//!
//! Fetches a playlist, follows sub-playlists exactly one level deep
//! (master -> media manifests -> segments), and returns the flattened,
//! order-preserving list of segment references, each pre-zipped with its
//! ordinal.

use thiserror::Error;

use crate::transport::{Transport, TransportError};

/// File extension that marks a reference as a media segment; anything else
/// is treated as a sub-manifest.
pub const SEGMENT_EXT: &str = ".ts";

/// One media segment reference from the flattened resolution order.
///
/// `reference` is the raw manifest line (relative to the base manifest's
/// directory); `ordinal` is its position in playback order and the sole
/// ordering key for reassembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentLocator {
    pub ordinal: usize,
    pub reference: String,
}

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to fetch manifest {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: TransportError,
    },
    #[error("manifest {url} contains no segment or sub-playlist references")]
    Empty { url: String },
    #[error("cannot extract a path segment from URL {url}")]
    InvalidUrl { url: String },
}

/// Last path segment of a URL, e.g. `playlist.m3u8` for
/// `https://cdn.example.com/a/playlist.m3u8?token=x`.
pub fn last_path_segment(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let segment = parsed.path().split('/').filter(|s| !s.is_empty()).last()?;
    Some(segment.to_string())
}

/// Builds an absolute URL for `reference` by substituting it for the last
/// path segment of `base_url`.
///
/// This is a literal string substitution, matching the wire format's
/// simplicity: every reference is assumed to live in the base manifest's
/// directory. `../`-style and absolute-path references are not handled.
pub fn substitute_reference(base_url: &str, reference: &str) -> Result<String, ManifestError> {
    let last = last_path_segment(base_url).ok_or_else(|| ManifestError::InvalidUrl {
        url: base_url.to_string(),
    })?;
    Ok(base_url.replace(&last, reference))
}

/// Non-blank, non-comment lines of a manifest body, trimmed.
fn reference_lines(body: &str) -> impl Iterator<Item = &str> {
    body.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
}

fn is_segment(reference: &str) -> bool {
    reference.ends_with(SEGMENT_EXT)
}

/// Resolves `manifest_url` to the ordered list of segment locators.
///
/// References ending in [`SEGMENT_EXT`] are segments; any other reference is
/// a sub-manifest, fetched and scanned for segment lines in document order.
/// The result is the concatenation of all segment lists, flattened with
/// order preserved and no dedup. A manifest that yields zero segments is a
/// format error, never a silent no-op.
pub fn resolve(
    transport: &dyn Transport,
    manifest_url: &str,
) -> Result<Vec<SegmentLocator>, ManifestError> {
    let body = transport
        .fetch_text(manifest_url)
        .map_err(|source| ManifestError::Fetch {
            url: manifest_url.to_string(),
            source,
        })?;

    let mut references: Vec<String> = Vec::new();
    for line in reference_lines(&body) {
        if is_segment(line) {
            references.push(line.to_string());
            continue;
        }
        let sub_url = substitute_reference(manifest_url, line)?;
        tracing::debug!(url = %sub_url, "resolving sub-playlist");
        let sub_body = transport
            .fetch_text(&sub_url)
            .map_err(|source| ManifestError::Fetch {
                url: sub_url.clone(),
                source,
            })?;
        references.extend(
            reference_lines(&sub_body)
                .filter(|l| is_segment(l))
                .map(String::from),
        );
    }

    if references.is_empty() {
        return Err(ManifestError::Empty {
            url: manifest_url.to_string(),
        });
    }

    Ok(references
        .into_iter()
        .enumerate()
        .map(|(ordinal, reference)| SegmentLocator { ordinal, reference })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::testing::MemoryTransport;

    #[test]
    fn last_path_segment_basic() {
        assert_eq!(
            last_path_segment("https://cdn.example.com/a/b/playlist.m3u8").as_deref(),
            Some("playlist.m3u8")
        );
        assert_eq!(last_path_segment("https://cdn.example.com/"), None);
        assert_eq!(last_path_segment("not a url"), None);
    }

    #[test]
    fn substitute_keeps_query_string() {
        let url = substitute_reference(
            "https://cdn.example.com/a/playlist.m3u8?token=x",
            "chunk.m3u8",
        )
        .unwrap();
        assert_eq!(url, "https://cdn.example.com/a/chunk.m3u8?token=x");
    }

    #[test]
    fn substitute_segment_reference() {
        let url =
            substitute_reference("https://cdn.example.com/a/media.m3u8", "seg0.ts").unwrap();
        assert_eq!(url, "https://cdn.example.com/a/seg0.ts");
    }

    #[test]
    fn reference_lines_skip_comments_and_blanks() {
        let body = "#EXTM3U\n\n#EXTINF:4.0,\nseg0.ts\n  seg1.ts  \n#EXT-X-ENDLIST\n";
        let lines: Vec<_> = reference_lines(body).collect();
        assert_eq!(lines, vec!["seg0.ts", "seg1.ts"]);
    }

    #[test]
    fn resolve_flattens_master_in_document_order() {
        let t = MemoryTransport::new();
        t.insert(
            "https://cdn.example.com/x/master.m3u8",
            "#EXTM3U\na.m3u8\nb.m3u8\n",
        );
        t.insert(
            "https://cdn.example.com/x/a.m3u8",
            "#EXTM3U\n#EXTINF:4.0,\na0.ts\n#EXTINF:4.0,\na1.ts\n",
        );
        t.insert(
            "https://cdn.example.com/x/b.m3u8",
            "#EXTM3U\nb0.ts\nb1.ts\nb2.ts\n",
        );
        let locators = resolve(&t, "https://cdn.example.com/x/master.m3u8").unwrap();
        let refs: Vec<_> = locators.iter().map(|l| l.reference.as_str()).collect();
        assert_eq!(refs, vec!["a0.ts", "a1.ts", "b0.ts", "b1.ts", "b2.ts"]);
        let ordinals: Vec<_> = locators.iter().map(|l| l.ordinal).collect();
        assert_eq!(ordinals, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn resolve_media_manifest_directly() {
        let t = MemoryTransport::new();
        t.insert(
            "https://cdn.example.com/m/media.m3u8",
            "#EXTM3U\nseg0.ts\nseg1.ts\n",
        );
        let locators = resolve(&t, "https://cdn.example.com/m/media.m3u8").unwrap();
        assert_eq!(locators.len(), 2);
        assert_eq!(locators[0].reference, "seg0.ts");
        assert_eq!(locators[1].ordinal, 1);
    }

    #[test]
    fn resolve_preserves_duplicate_references() {
        let t = MemoryTransport::new();
        t.insert(
            "https://cdn.example.com/m/media.m3u8",
            "seg.ts\nseg.ts\nseg.ts\n",
        );
        let locators = resolve(&t, "https://cdn.example.com/m/media.m3u8").unwrap();
        assert_eq!(locators.len(), 3);
        // Duplicates keep distinct ordinals (no index-of lookup).
        assert_eq!(locators[2].ordinal, 2);
        assert_eq!(locators[2].reference, "seg.ts");
    }

    #[test]
    fn resolve_comment_only_manifest_is_format_error() {
        let t = MemoryTransport::new();
        t.insert(
            "https://cdn.example.com/m/media.m3u8",
            "#EXTM3U\n#EXT-X-VERSION:3\n#EXT-X-ENDLIST\n",
        );
        match resolve(&t, "https://cdn.example.com/m/media.m3u8") {
            Err(ManifestError::Empty { url }) => {
                assert_eq!(url, "https://cdn.example.com/m/media.m3u8");
            }
            other => panic!("expected Empty, got {:?}", other),
        }
    }

    #[test]
    fn resolve_unreachable_manifest_is_fetch_error() {
        let t = MemoryTransport::new();
        match resolve(&t, "https://cdn.example.com/m/gone.m3u8") {
            Err(ManifestError::Fetch { url, .. }) => {
                assert_eq!(url, "https://cdn.example.com/m/gone.m3u8");
            }
            other => panic!("expected Fetch, got {:?}", other),
        }
    }

    #[test]
    fn resolve_unreachable_sub_manifest_is_fetch_error() {
        let t = MemoryTransport::new();
        t.insert("https://cdn.example.com/m/master.m3u8", "missing.m3u8\n");
        match resolve(&t, "https://cdn.example.com/m/master.m3u8") {
            Err(ManifestError::Fetch { url, .. }) => {
                assert_eq!(url, "https://cdn.example.com/m/missing.m3u8");
            }
            other => panic!("expected Fetch, got {:?}", other),
        }
    }
}
