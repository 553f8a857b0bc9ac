//! Shared jar-fixture helpers.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use zip::write::SimpleFileOptions;

/// An input entry: a file with contents, or a directory marker.
pub enum Entry<'a> {
    File(&'a str, &'a [u8]),
    Dir(&'a str),
}

pub fn write_jar(path: &Path, entries: &[Entry<'_>]) {
    let file = File::create(path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    let options =
        || SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    for entry in entries {
        match entry {
            Entry::File(name, bytes) => {
                zip.start_file(*name, options()).unwrap();
                zip.write_all(bytes).unwrap();
            }
            Entry::Dir(name) => {
                zip.add_directory(*name, options()).unwrap();
            }
        }
    }
    zip.finish().unwrap();
}

pub fn entry_bytes(path: &Path, name: &str) -> Vec<u8> {
    let mut zip = zip::ZipArchive::new(File::open(path).unwrap()).unwrap();
    let mut entry = zip.by_name(name).unwrap();
    let mut bytes = Vec::new();
    entry.read_to_end(&mut bytes).unwrap();
    bytes
}

pub fn entry_names(path: &Path) -> Vec<String> {
    let mut zip = zip::ZipArchive::new(File::open(path).unwrap()).unwrap();
    (0..zip.len())
        .map(|i| zip.by_index_raw(i).unwrap().name().to_owned())
        .collect()
}

pub fn count_return_opcodes(bytes: &[u8]) -> usize {
    bytes.iter().filter(|&&b| b == 0xB1).count()
}
