//! Output-archive assembly with atomic promotion.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use renest_error::{RenestError, Result};
use tempfile::NamedTempFile;
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::reader::ArchiveReader;

/// Builds the repaired archive on a temp file beside its destination, then
/// promotes it with a rename. Dropping the writer without `finish` discards
/// the partial output.
pub struct ArchiveWriter {
    destination: PathBuf,
    temp: NamedTempFile,
    zip: ZipWriter<File>,
}

impl ArchiveWriter {
    /// Create a writer whose `finish` will atomically replace `destination`.
    pub fn create(destination: impl AsRef<Path>) -> Result<Self> {
        let destination = destination.as_ref().to_path_buf();
        let dir = destination.parent().unwrap_or_else(|| Path::new("."));
        let io_err = |source| RenestError::Io {
            path: destination.clone(),
            source,
        };
        // Same directory as the destination, so the final rename never
        // crosses a filesystem boundary.
        let temp = NamedTempFile::new_in(dir).map_err(io_err)?;
        let file = temp.reopen().map_err(io_err)?;
        Ok(Self {
            destination,
            temp,
            zip: ZipWriter::new(file),
        })
    }

    fn archive_err(&self, source: zip::result::ZipError) -> RenestError {
        RenestError::Archive {
            path: self.destination.clone(),
            source,
        }
    }

    /// Write a fresh entry from bytes (deflated).
    pub fn write_entry(&mut self, name: &str, bytes: &[u8]) -> Result<()> {
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        self.zip
            .start_file(name, options)
            .map_err(|source| self.archive_err(source))?;
        self.zip.write_all(bytes).map_err(|source| RenestError::Io {
            path: self.destination.clone(),
            source,
        })?;
        Ok(())
    }

    /// Copy an entry from the input archive without recompressing it; the
    /// stored bytes are preserved exactly.
    pub fn copy_raw(&mut self, reader: &mut ArchiveReader, index: usize) -> Result<()> {
        let input_path = reader.path().to_path_buf();
        let entry = reader.raw_entry(index)?;
        self.zip
            .raw_copy_file(entry)
            .map_err(|source| RenestError::Archive {
                path: input_path,
                source,
            })
    }

    /// Close the archive, flush it to disk, and atomically rename it onto
    /// the destination path.
    pub fn finish(self) -> Result<PathBuf> {
        let io_err = |source| RenestError::Io {
            path: self.destination.clone(),
            source,
        };
        let file = self
            .zip
            .finish()
            .map_err(|source| RenestError::Archive {
                path: self.destination.clone(),
                source,
            })?;
        file.sync_all().map_err(io_err)?;
        self.temp
            .persist(&self.destination)
            .map_err(|e| RenestError::Io {
                path: self.destination.clone(),
                source: e.error,
            })?;
        debug!(path = %self.destination.display(), "archive promoted");
        Ok(self.destination)
    }
}
