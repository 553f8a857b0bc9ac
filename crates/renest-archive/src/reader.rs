//! Read-only, ordered access to an input archive.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use renest_error::{RenestError, Result};
use zip::ZipArchive;

use crate::is_class_entry;

/// Name and shape of one entry, without its contents.
#[derive(Debug, Clone)]
pub struct EntryMeta {
    pub name: String,
    pub is_dir: bool,
    pub is_class: bool,
}

/// An input archive opened read-only. Entries keep their original order and
/// are addressed by position.
pub struct ArchiveReader {
    path: PathBuf,
    zip: ZipArchive<BufReader<File>>,
}

impl ArchiveReader {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|source| RenestError::Io {
            path: path.clone(),
            source,
        })?;
        let zip = ZipArchive::new(BufReader::new(file)).map_err(|source| RenestError::Archive {
            path: path.clone(),
            source,
        })?;
        Ok(Self { path, zip })
    }

    /// Path the archive was opened from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of entries, directories included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.zip.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.zip.len() == 0
    }

    /// Metadata for the entry at `index`.
    pub fn meta(&mut self, index: usize) -> Result<EntryMeta> {
        let path = self.path.clone();
        let entry = self
            .zip
            .by_index_raw(index)
            .map_err(|source| RenestError::Archive { path, source })?;
        Ok(EntryMeta {
            name: entry.name().to_owned(),
            is_dir: entry.is_dir(),
            is_class: is_class_entry(entry.name()),
        })
    }

    /// Decompressed contents of the entry at `index`.
    pub fn read(&mut self, index: usize) -> Result<Vec<u8>> {
        let path = self.path.clone();
        let mut entry = self
            .zip
            .by_index(index)
            .map_err(|source| RenestError::Archive { path, source })?;
        let mut bytes = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut bytes).map_err(|source| RenestError::Io {
            path: self.path.clone(),
            source,
        })?;
        Ok(bytes)
    }

    pub(crate) fn raw_entry(
        &mut self,
        index: usize,
    ) -> Result<zip::read::ZipFile<'_>> {
        let path = self.path.clone();
        self.zip
            .by_index_raw(index)
            .map_err(|source| RenestError::Archive { path, source })
    }
}

impl std::fmt::Debug for ArchiveReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveReader")
            .field("path", &self.path)
            .field("entries", &self.zip.len())
            .finish()
    }
}
