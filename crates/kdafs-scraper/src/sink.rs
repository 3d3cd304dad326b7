//! Durable, append-only record output.
//!
//! The output is a single JSON array. It is reset to `[]` when the sink is
//! created and rewritten after every append through a temporary file and a
//! rename, so the file on disk is always a complete array holding exactly the
//! records appended so far.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use kdafs_core::InspectionRecord;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("I/O error writing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not serialize records: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Receives finished records in discovery order.
pub trait RecordSink {
    /// Persists `record`. On error nothing is recorded and [`len`](Self::len)
    /// is unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError`] if the record could not be made durable.
    fn append(&mut self, record: InspectionRecord) -> Result<(), SinkError>;

    /// Number of records persisted so far.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Writes records to a pretty-printed JSON array file.
#[derive(Debug)]
pub struct JsonFileSink {
    path: PathBuf,
    staging_path: PathBuf,
    records: Vec<InspectionRecord>,
}

impl JsonFileSink {
    /// Creates the sink and truncates `path` to an empty array.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::Io`] if the file cannot be written.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self, SinkError> {
        let path = path.into();
        let staging_path = staging_path_for(&path);
        let sink = Self {
            path,
            staging_path,
            records: Vec::new(),
        };
        sink.write_all()?;
        Ok(sink)
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn records(&self) -> &[InspectionRecord] {
        &self.records
    }

    fn write_all(&self) -> Result<(), SinkError> {
        let bytes = encode(&self.records)?;
        let io_err = |source: std::io::Error| SinkError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(io_err)?;
        }

        let mut file = File::create(&self.staging_path).map_err(io_err)?;
        file.write_all(&bytes).map_err(io_err)?;
        file.sync_all().map_err(io_err)?;
        drop(file);
        fs::rename(&self.staging_path, &self.path).map_err(io_err)
    }
}

impl RecordSink for JsonFileSink {
    fn append(&mut self, record: InspectionRecord) -> Result<(), SinkError> {
        self.records.push(record);
        if let Err(err) = self.write_all() {
            self.records.pop();
            return Err(err);
        }
        tracing::debug!(
            path = %self.path.display(),
            records = self.records.len(),
            "record persisted"
        );
        Ok(())
    }

    fn len(&self) -> usize {
        self.records.len()
    }
}

/// Serializes with 4-space indentation and a trailing newline.
fn encode(records: &[InspectionRecord]) -> Result<Vec<u8>, serde_json::Error> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    records.serialize(&mut serializer)?;
    buf.push(b'\n');
    Ok(buf)
}

fn staging_path_for(path: &Path) -> PathBuf {
    let mut staging = path.as_os_str().to_owned();
    staging.push(".partial");
    PathBuf::from(staging)
}
