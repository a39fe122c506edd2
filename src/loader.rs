//! Raw loading of the wide ridership CSV.
//!
//! Resolves where the bytes come from, decodes them (legacy Korean code page
//! first, BOM-aware UTF-8 second) and splits them into header and records
//! without interpreting any column.

use csv::{ReaderBuilder, StringRecord};
use encoding_rs::{EUC_KR, UTF_8};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::borrow::Cow;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::error::{PipelineError, Result};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Where the ridership table comes from.
#[derive(Debug, Clone)]
pub enum Source {
    /// A single file path.
    Path(PathBuf),
    /// An uploaded or in-memory buffer.
    Bytes(Vec<u8>),
    /// Fallback paths tried in order; the first readable one wins.
    Candidates(Vec<PathBuf>),
}

/// The text encoding that successfully decoded the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TextEncoding {
    #[serde(rename = "cp949")]
    Cp949,
    #[serde(rename = "utf-8-sig")]
    Utf8Bom,
}

impl TextEncoding {
    pub fn name(self) -> &'static str {
        match self {
            TextEncoding::Cp949 => "cp949",
            TextEncoding::Utf8Bom => "utf-8-sig",
        }
    }
}

/// Header and records exactly as they appear in the source.
#[derive(Debug, Clone)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub records: Vec<StringRecord>,
    pub encoding: TextEncoding,
    /// Lowercase SHA-256 hex digest of the undecoded bytes.
    pub source_hash: String,
}

/// Reads the bytes behind a [`Source`].
///
/// # Errors
///
/// Returns [`PipelineError::SourceNotFound`] when no path could be read.
pub fn read_source(source: &Source) -> Result<Vec<u8>> {
    match source {
        Source::Bytes(bytes) => Ok(bytes.clone()),
        Source::Path(path) => fs::read(path).map_err(|e| {
            debug!(path = %path.display(), error = %e, "Source path not readable");
            PipelineError::SourceNotFound {
                tried: vec![path.clone()],
            }
        }),
        Source::Candidates(paths) => {
            for path in paths {
                match fs::read(path) {
                    Ok(bytes) => {
                        debug!(path = %path.display(), "Using candidate source");
                        return Ok(bytes);
                    }
                    Err(e) => {
                        debug!(path = %path.display(), error = %e, "Candidate source skipped");
                    }
                }
            }
            Err(PipelineError::SourceNotFound {
                tried: paths.clone(),
            })
        }
    }
}

/// Decodes `bytes` as CP949, falling back to UTF-8 with an optional BOM.
///
/// No third encoding is attempted.
pub fn decode(bytes: &[u8]) -> Result<(Cow<'_, str>, TextEncoding)> {
    if let Some(text) = EUC_KR.decode_without_bom_handling_and_without_replacement(bytes) {
        return Ok((text, TextEncoding::Cp949));
    }
    warn!("Source is not valid cp949, retrying as utf-8-sig");

    let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    if let Some(text) = UTF_8.decode_without_bom_handling_and_without_replacement(body) {
        return Ok((text, TextEncoding::Utf8Bom));
    }

    Err(PipelineError::Encoding {
        attempted: vec![TextEncoding::Cp949.name(), TextEncoding::Utf8Bom.name()],
    })
}

/// Hex digest used to key everything derived from a given source.
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Decodes and splits raw bytes into a [`RawTable`].
pub fn parse_bytes(bytes: &[u8]) -> Result<RawTable> {
    parse_hashed(bytes, content_hash(bytes))
}

/// Like [`parse_bytes`] when the caller already hashed the bytes.
#[tracing::instrument(skip(bytes), fields(len = bytes.len()))]
pub fn parse_hashed(bytes: &[u8], source_hash: String) -> Result<RawTable> {
    let (text, encoding) = decode(bytes)?;

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = reader.headers()?.iter().map(str::to_string).collect();
    let records = reader.records().collect::<std::result::Result<Vec<_>, _>>()?;

    info!(
        encoding = encoding.name(),
        records = records.len(),
        hash = %source_hash,
        "Raw table loaded"
    );

    Ok(RawTable {
        headers,
        records,
        encoding,
        source_hash,
    })
}

/// Reads a [`Source`] and parses it into a [`RawTable`].
pub fn load(source: &Source) -> Result<RawTable> {
    let bytes = read_source(source)?;
    parse_bytes(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cp949(text: &str) -> Vec<u8> {
        let (bytes, _, had_errors) = EUC_KR.encode(text);
        assert!(!had_errors);
        bytes.into_owned()
    }

    #[test]
    fn test_decode_prefers_cp949() {
        let bytes = cp949("지하철역,호선명\n강남,2호선\n");
        let (text, encoding) = decode(&bytes).unwrap();
        assert_eq!(encoding, TextEncoding::Cp949);
        assert!(text.starts_with("지하철역"));
    }

    #[test]
    fn test_decode_falls_back_to_utf8_bom() {
        let mut bytes = UTF8_BOM.to_vec();
        bytes.extend_from_slice("사용월,지하철역\n202401,강남\n".as_bytes());
        let (text, encoding) = decode(&bytes).unwrap();
        assert_eq!(encoding, TextEncoding::Utf8Bom);
        assert!(text.starts_with("사용월"));
    }

    #[test]
    fn test_decode_fails_after_two_encodings() {
        // 0xFF is neither a cp949 lead byte nor valid utf-8
        let err = decode(&[0x41, 0xFF, 0xFF, 0x42]).unwrap_err();
        assert!(matches!(err, PipelineError::Encoding { ref attempted } if attempted.len() == 2));
    }

    #[test]
    fn test_missing_path_is_source_not_found() {
        let err = read_source(&Source::Path(PathBuf::from("/nonexistent/ridership.csv")))
            .unwrap_err();
        assert!(matches!(err, PipelineError::SourceNotFound { .. }));
    }

    #[test]
    fn test_candidates_use_first_readable() {
        let dir = tempfile::tempdir().unwrap();
        let present = dir.path().join("present.csv");
        fs::write(&present, b"a,b\n1,2\n").unwrap();

        let source = Source::Candidates(vec![dir.path().join("missing.csv"), present]);
        assert_eq!(read_source(&source).unwrap(), b"a,b\n1,2\n");

        let none = Source::Candidates(vec![dir.path().join("missing.csv")]);
        match read_source(&none).unwrap_err() {
            PipelineError::SourceNotFound { tried } => assert_eq!(tried.len(), 1),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_parse_bytes_splits_headers_and_records() {
        let bytes = cp949("사용월,호선명,역ID,지하철역\n202401,2호선,222,강남\n");
        let table = parse_bytes(&bytes).unwrap();
        assert_eq!(table.headers, vec!["사용월", "호선명", "역ID", "지하철역"]);
        assert_eq!(table.records.len(), 1);
        assert_eq!(table.source_hash.len(), 64);
        assert_eq!(&table.records[0][3], "강남");
    }

    #[test]
    fn test_content_hash_is_stable() {
        assert_eq!(content_hash(b"abc"), content_hash(b"abc"));
        assert_ne!(content_hash(b"abc"), content_hash(b"abd"));
    }
}
