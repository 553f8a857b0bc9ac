//! Constant-pool parsing.
//!
//! Only `Utf8` and `Class` entries are materialized; every other kind is
//! skipped by its fixed size and recorded as an opaque slot so that index
//! arithmetic (including the two-slot `Long`/`Double` rule) stays exact.

use renest_error::{RenestError, Result};
use renest_types::ClassName;

use crate::cursor::Cursor;

const TAG_UTF8: u8 = 1;
const TAG_INTEGER: u8 = 3;
const TAG_FLOAT: u8 = 4;
const TAG_LONG: u8 = 5;
const TAG_DOUBLE: u8 = 6;
const TAG_CLASS: u8 = 7;
const TAG_STRING: u8 = 8;
const TAG_FIELDREF: u8 = 9;
const TAG_METHODREF: u8 = 10;
const TAG_INTERFACE_METHODREF: u8 = 11;
const TAG_NAME_AND_TYPE: u8 = 12;
const TAG_METHOD_HANDLE: u8 = 15;
const TAG_METHOD_TYPE: u8 = 16;
const TAG_DYNAMIC: u8 = 17;
const TAG_INVOKE_DYNAMIC: u8 = 18;
const TAG_MODULE: u8 = 19;
const TAG_PACKAGE: u8 = 20;

#[derive(Debug, Clone)]
pub(crate) enum PoolEntry {
    Utf8(String),
    Class(u16),
    Opaque,
}

/// Parsed constant pool plus the byte offset where it ends.
#[derive(Debug, Clone)]
pub struct ConstantPool {
    entries: Vec<Option<PoolEntry>>,
    end_offset: usize,
}

impl ConstantPool {
    /// Parse a pool; the cursor must sit on `constant_pool_count`.
    pub(crate) fn parse(cur: &mut Cursor<'_>) -> Result<Self> {
        let count = cur.u16()?;
        let mut entries: Vec<Option<PoolEntry>> = Vec::with_capacity(count as usize);
        entries.resize_with(count as usize, || None);

        let mut index: u16 = 1;
        while index < count {
            let tag = cur.u8()?;
            let entry = match tag {
                TAG_UTF8 => {
                    let len = cur.u16()? as usize;
                    let raw = cur.take(len)?;
                    PoolEntry::Utf8(String::from_utf8_lossy(raw).into_owned())
                }
                TAG_CLASS => PoolEntry::Class(cur.u16()?),
                TAG_STRING | TAG_METHOD_TYPE | TAG_MODULE | TAG_PACKAGE => {
                    cur.skip(2)?;
                    PoolEntry::Opaque
                }
                TAG_METHOD_HANDLE => {
                    cur.skip(3)?;
                    PoolEntry::Opaque
                }
                TAG_INTEGER | TAG_FLOAT | TAG_FIELDREF | TAG_METHODREF
                | TAG_INTERFACE_METHODREF | TAG_NAME_AND_TYPE | TAG_DYNAMIC
                | TAG_INVOKE_DYNAMIC => {
                    cur.skip(4)?;
                    PoolEntry::Opaque
                }
                TAG_LONG | TAG_DOUBLE => {
                    cur.skip(8)?;
                    PoolEntry::Opaque
                }
                other => {
                    return Err(RenestError::malformed(format!(
                        "unknown constant tag {other} at pool index {index}"
                    )));
                }
            };

            let wide = matches!(tag, TAG_LONG | TAG_DOUBLE);
            entries[index as usize] = Some(entry);
            // Long and Double occupy the following slot as well; it stays
            // unusable per the format.
            index += if wide { 2 } else { 1 };
        }

        Ok(Self {
            entries,
            end_offset: cur.pos(),
        })
    }

    /// Declared `constant_pool_count` (one more than the last usable slot).
    #[must_use]
    pub fn count(&self) -> u16 {
        self.entries.len() as u16
    }

    /// Byte offset just past the final pool entry.
    #[must_use]
    pub fn end_offset(&self) -> usize {
        self.end_offset
    }

    fn entry(&self, index: u16) -> Result<&PoolEntry> {
        self.entries
            .get(index as usize)
            .and_then(Option::as_ref)
            .ok_or_else(|| {
                RenestError::malformed(format!("constant pool index {index} out of range"))
            })
    }

    /// Resolve a `Utf8` entry.
    pub fn utf8(&self, index: u16) -> Result<&str> {
        match self.entry(index)? {
            PoolEntry::Utf8(text) => Ok(text),
            _ => Err(RenestError::malformed(format!(
                "constant pool index {index} is not Utf8"
            ))),
        }
    }

    /// Resolve a `Class` entry to its name.
    pub fn class_name(&self, index: u16) -> Result<ClassName> {
        match self.entry(index)? {
            PoolEntry::Class(name_index) => Ok(ClassName::new(self.utf8(*name_index)?)),
            _ => Err(RenestError::malformed(format!(
                "constant pool index {index} is not a Class"
            ))),
        }
    }

    /// Resolve an optional `Class` reference (index 0 means absent).
    pub fn opt_class_name(&self, index: u16) -> Result<Option<ClassName>> {
        if index == 0 {
            return Ok(None);
        }
        self.class_name(index).map(Some)
    }

    /// Resolve an optional `Utf8` reference (index 0 means absent).
    pub fn opt_utf8(&self, index: u16) -> Result<Option<&str>> {
        if index == 0 {
            return Ok(None);
        }
        self.utf8(index).map(Some)
    }

    /// Existing `Utf8` entry with this exact text, if any.
    pub(crate) fn find_utf8(&self, text: &str) -> Option<u16> {
        self.entries.iter().enumerate().find_map(|(i, e)| match e {
            Some(PoolEntry::Utf8(t)) if t == text => Some(i as u16),
            _ => None,
        })
    }

    /// Existing `Class` entry naming this class, if any.
    pub(crate) fn find_class(&self, name: &str) -> Option<u16> {
        self.entries.iter().enumerate().find_map(|(i, e)| match e {
            Some(PoolEntry::Class(name_index)) => match self.utf8(*name_index) {
                Ok(text) if text == name => Some(i as u16),
                _ => None,
            },
            _ => None,
        })
    }
}
