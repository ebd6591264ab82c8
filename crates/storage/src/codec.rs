//! JSON file helpers with optional gzip compression.

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use merklechain_core::Hash;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// First two bytes of every gzip stream.
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Storage errors.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("JSON error in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("block {height} stores hash {stored}, header hashes to {computed}")]
    HashMismatch {
        height: u64,
        stored: Hash,
        computed: Hash,
    },
}

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

impl StorageError {
    fn io(path: &Path, source: io::Error) -> Self {
        StorageError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    fn json(path: &Path, source: serde_json::Error) -> Self {
        StorageError::Json {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Whether the error is a missing file.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::Io { source, .. } if source.kind() == io::ErrorKind::NotFound)
    }
}

/// On-disk encoding of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Pretty JSON inside a gzip stream.
    Gzip,
    /// Pretty JSON.
    Plain,
}

/// Read a JSON document, decompressing it if it is gzipped.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = fs::read(path).map_err(|e| StorageError::io(path, e))?;

    let text = if bytes.starts_with(&GZIP_MAGIC) {
        let mut text = Vec::new();
        GzDecoder::new(bytes.as_slice())
            .read_to_end(&mut text)
            .map_err(|e| StorageError::io(path, e))?;
        text
    } else {
        bytes
    };

    serde_json::from_slice(&text).map_err(|e| StorageError::json(path, e))
}

/// Write a JSON document, replacing any existing file.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T, format: Format) -> Result<()> {
    let file = File::create(path).map_err(|e| StorageError::io(path, e))?;
    let writer = BufWriter::new(file);

    match format {
        Format::Gzip => {
            let mut encoder = GzEncoder::new(writer, flate2::Compression::default());
            serde_json::to_writer_pretty(&mut encoder, value).map_err(|e| StorageError::json(path, e))?;
            encoder
                .finish()
                .and_then(|mut w| w.flush())
                .map_err(|e| StorageError::io(path, e))
        }
        Format::Plain => {
            let mut writer = writer;
            serde_json::to_writer_pretty(&mut writer, value).map_err(|e| StorageError::json(path, e))?;
            writer
                .write_all(b"\n")
                .and_then(|()| writer.flush())
                .map_err(|e| StorageError::io(path, e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn sample() -> BTreeMap<String, u64> {
        [("a".to_string(), 1), ("b".to_string(), 2)].into_iter().collect()
    }

    #[test]
    fn test_gzip_file_is_compressed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.json.gz");
        write_json(&path, &sample(), Format::Gzip).unwrap();

        let bytes = fs::read(&path).unwrap();
        assert!(bytes.starts_with(&GZIP_MAGIC));
        let back: BTreeMap<String, u64> = read_json(&path).unwrap();
        assert_eq!(back, sample());
    }

    #[test]
    fn test_plain_file_is_readable_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.json");
        write_json(&path, &sample(), Format::Plain).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"a\": 1"));
        assert!(text.ends_with('\n'));
        let back: BTreeMap<String, u64> = read_json(&path).unwrap();
        assert_eq!(back, sample());
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_json::<Vec<u64>>(&dir.path().join("absent.json")).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_malformed_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "[1, 2,").unwrap();
        let err = read_json::<Vec<u64>>(&path).unwrap_err();
        assert!(matches!(err, StorageError::Json { .. }));
        assert!(!err.is_not_found());
    }
}
