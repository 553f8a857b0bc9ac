//! Surgical nesting-metadata patching.
//!
//! A patch is applied by splicing, never by re-encoding: the output is the
//! original bytes with (1) a new constant-pool tail, (2) an amended or
//! appended `InnerClasses` attribute, and (3) a set-or-created
//! `EnclosingMethod` attribute. Everything between those regions — method
//! bodies, line-number tables, stack-map frames, unrelated attributes — is
//! copied verbatim from the input slices.

use std::collections::HashMap;

use renest_error::{RenestError, Result};
use renest_types::ClassName;
use tracing::debug;

use crate::class::{ATTR_ENCLOSING_METHOD, ATTR_INNER_CLASSES, ClassFile};
use crate::pool::ConstantPool;
use crate::records::InnerClassRecord;

/// Accumulated edits for one class: inner-table rows to append and an
/// enclosing class to set. Applied as a single splice.
#[derive(Debug, Clone, Default)]
pub struct NestingPatch {
    add_inner: Vec<InnerClassRecord>,
    set_enclosing: Option<ClassName>,
}

impl NestingPatch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an inner-table row. Duplicate inner names are collapsed.
    pub fn add_inner_record(&mut self, record: InnerClassRecord) {
        if !self.add_inner.iter().any(|r| r.inner == record.inner) {
            self.add_inner.push(record);
        }
    }

    /// Set (or overwrite) the enclosing class. The method half is always
    /// cleared: enclosure is repaired from names alone, and a method cannot
    /// be inferred that way.
    pub fn set_enclosing(&mut self, class: ClassName) {
        self.set_enclosing = Some(class);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.add_inner.is_empty() && self.set_enclosing.is_none()
    }
}

/// Constant-pool extension: reuses existing `Utf8`/`Class` entries and
/// appends the rest after the original pool, one slot each.
struct PoolTail<'a> {
    pool: &'a ConstantPool,
    extra: Vec<u8>,
    next_index: u32,
    utf8_cache: HashMap<String, u16>,
    class_cache: HashMap<String, u16>,
}

impl<'a> PoolTail<'a> {
    fn new(pool: &'a ConstantPool) -> Self {
        Self {
            pool,
            extra: Vec::new(),
            next_index: u32::from(pool.count()),
            utf8_cache: HashMap::new(),
            class_cache: HashMap::new(),
        }
    }

    fn allocate(&mut self, name: &str) -> Result<u16> {
        let index = u16::try_from(self.next_index).map_err(|_| RenestError::PoolExhausted {
            name: name.to_owned(),
        })?;
        self.next_index += 1;
        Ok(index)
    }

    fn utf8(&mut self, text: &str) -> Result<u16> {
        if let Some(&index) = self.utf8_cache.get(text) {
            return Ok(index);
        }
        if let Some(index) = self.pool.find_utf8(text) {
            self.utf8_cache.insert(text.to_owned(), index);
            return Ok(index);
        }
        let index = self.allocate(text)?;
        self.extra.push(1); // CONSTANT_Utf8
        let len = u16::try_from(text.len())
            .map_err(|_| RenestError::malformed(format!("utf8 constant too long: {text}")))?;
        self.extra.extend_from_slice(&len.to_be_bytes());
        self.extra.extend_from_slice(text.as_bytes());
        self.utf8_cache.insert(text.to_owned(), index);
        Ok(index)
    }

    fn class(&mut self, name: &ClassName) -> Result<u16> {
        if let Some(&index) = self.class_cache.get(name.as_str()) {
            return Ok(index);
        }
        if let Some(index) = self.pool.find_class(name.as_str()) {
            self.class_cache.insert(name.as_str().to_owned(), index);
            return Ok(index);
        }
        let name_index = self.utf8(name.as_str())?;
        let index = self.allocate(name.as_str())?;
        self.extra.push(7); // CONSTANT_Class
        self.extra.extend_from_slice(&name_index.to_be_bytes());
        self.class_cache.insert(name.as_str().to_owned(), index);
        Ok(index)
    }

    fn new_count(&self) -> Result<u16> {
        u16::try_from(self.next_index).map_err(|_| RenestError::PoolExhausted {
            name: String::from("constant pool tail"),
        })
    }
}

/// An inner-table row lowered to constant-pool indices.
struct EncodedRow {
    inner: u16,
    outer: u16,
    simple_name: u16,
    flags: u16,
}

impl ClassFile {
    /// Produce the patched binary form. The input view is untouched; the
    /// result is byte-identical to the original outside the spliced
    /// metadata regions.
    pub fn patched(&self, patch: &NestingPatch) -> Result<Vec<u8>> {
        let scan = self.scan_ref();
        let bytes = self.bytes();

        // Union semantics: rows already present are not added twice.
        let rows: Vec<&InnerClassRecord> = patch
            .add_inner
            .iter()
            .filter(|r| !self.has_inner_record(&r.inner))
            .collect();
        let set_enclosing = patch
            .set_enclosing
            .as_ref()
            .filter(|class| scan.enclosing.as_ref().map(|e| &e.class) != Some(*class));

        if rows.is_empty() && set_enclosing.is_none() {
            return Ok(bytes.to_vec());
        }

        debug!(
            class = %self.name(),
            rows = rows.len(),
            enclosing = set_enclosing.is_some(),
            "splicing nesting metadata"
        );

        let mut tail = PoolTail::new(&scan.pool);

        let encoded: Vec<EncodedRow> = rows
            .iter()
            .map(|row| {
                Ok(EncodedRow {
                    inner: tail.class(&row.inner)?,
                    outer: row.outer.as_ref().map_or(Ok(0), |o| tail.class(o))?,
                    simple_name: row
                        .simple_name
                        .as_deref()
                        .map_or(Ok(0), |s| tail.utf8(s))?,
                    flags: row.access.bits(),
                })
            })
            .collect::<Result<_>>()?;

        let enclosing_class = set_enclosing.map(|c| tail.class(c)).transpose()?;
        let new_inner_attr_name = if !encoded.is_empty() && scan.inner_attr.is_none() {
            Some(tail.utf8(ATTR_INNER_CLASSES)?)
        } else {
            None
        };
        let new_enclosing_attr_name =
            if enclosing_class.is_some() && scan.enclosing_attr.is_none() {
                Some(tail.utf8(ATTR_ENCLOSING_METHOD)?)
            } else {
                None
            };

        let pool_end = scan.pool.end_offset();
        let mut out = Vec::with_capacity(bytes.len() + tail.extra.len() + 8 * encoded.len() + 32);

        // Header through major version, then the widened pool.
        out.extend_from_slice(&bytes[..8]);
        out.extend_from_slice(&tail.new_count()?.to_be_bytes());
        out.extend_from_slice(&bytes[10..pool_end]);
        out.extend_from_slice(&tail.extra);

        // access_flags through the end of the method table, verbatim.
        out.extend_from_slice(&bytes[pool_end..scan.attrs_count_offset]);

        let appended_attrs =
            usize::from(new_inner_attr_name.is_some()) + usize::from(new_enclosing_attr_name.is_some());
        let attr_count = u16::try_from(scan.attributes.len() + appended_attrs)
            .map_err(|_| RenestError::malformed("attribute table overflow"))?;
        out.extend_from_slice(&attr_count.to_be_bytes());

        for (position, attr) in scan.attributes.iter().enumerate() {
            if Some(position) == scan.inner_attr && !encoded.is_empty() {
                let data = &bytes[attr.data_start..attr.end()];
                let old_rows = u16::from_be_bytes([data[0], data[1]]);
                let new_rows = old_rows
                    .checked_add(encoded.len() as u16)
                    .ok_or_else(|| RenestError::malformed("inner-class table overflow"))?;
                let new_len = u32::try_from(attr.data_len + 8 * encoded.len())
                    .map_err(|_| RenestError::malformed("inner-class attribute overflow"))?;
                out.extend_from_slice(&attr.name_index.to_be_bytes());
                out.extend_from_slice(&new_len.to_be_bytes());
                out.extend_from_slice(&new_rows.to_be_bytes());
                out.extend_from_slice(&data[2..]);
                write_rows(&mut out, &encoded);
            } else if Some(position) == scan.enclosing_attr && enclosing_class.is_some() {
                // Replace the class half, clear the method half; the
                // attribute's length is fixed at four bytes.
                out.extend_from_slice(&attr.name_index.to_be_bytes());
                out.extend_from_slice(&4u32.to_be_bytes());
                out.extend_from_slice(&enclosing_class.unwrap_or(0).to_be_bytes());
                out.extend_from_slice(&0u16.to_be_bytes());
            } else {
                out.extend_from_slice(&bytes[attr.start..attr.end()]);
            }
        }

        if let Some(name_index) = new_inner_attr_name {
            let len = u32::try_from(2 + 8 * encoded.len())
                .map_err(|_| RenestError::malformed("inner-class attribute overflow"))?;
            out.extend_from_slice(&name_index.to_be_bytes());
            out.extend_from_slice(&len.to_be_bytes());
            out.extend_from_slice(&(encoded.len() as u16).to_be_bytes());
            write_rows(&mut out, &encoded);
        }
        if let Some(name_index) = new_enclosing_attr_name {
            out.extend_from_slice(&name_index.to_be_bytes());
            out.extend_from_slice(&4u32.to_be_bytes());
            out.extend_from_slice(&enclosing_class.unwrap_or(0).to_be_bytes());
            out.extend_from_slice(&0u16.to_be_bytes());
        }

        Ok(out)
    }
}

fn write_rows(out: &mut Vec<u8>, rows: &[EncodedRow]) {
    for row in rows {
        out.extend_from_slice(&row.inner.to_be_bytes());
        out.extend_from_slice(&row.outer.to_be_bytes());
        out.extend_from_slice(&row.simple_name.to_be_bytes());
        out.extend_from_slice(&row.flags.to_be_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::ClassSpec;
    use renest_types::InnerClassAccess;

    fn parse(bytes: Vec<u8>) -> ClassFile {
        ClassFile::parse(bytes).unwrap()
    }

    #[test]
    fn empty_patch_is_identity() {
        let class = parse(ClassSpec::new("a/Outer").build());
        let out = class.patched(&NestingPatch::new()).unwrap();
        assert_eq!(out, class.bytes());
    }

    #[test]
    fn appends_row_to_existing_table() {
        let class = parse(
            ClassSpec::new("a/Outer")
                .inner_row("a/Outer$Kept", Some("a/Outer"), Some("Kept"), 0x0001)
                .build(),
        );
        let mut patch = NestingPatch::new();
        patch.add_inner_record(InnerClassRecord::declaring(
            &ClassName::new("a/Outer$Added"),
            InnerClassAccess::PUBLIC,
        ));
        let patched = parse(class.patched(&patch).unwrap());

        let rows = patched.inner_records();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].inner, ClassName::new("a/Outer$Kept"));
        assert_eq!(rows[1].inner, ClassName::new("a/Outer$Added"));
        assert_eq!(rows[1].outer, Some(ClassName::new("a/Outer")));
        assert_eq!(rows[1].simple_name.as_deref(), Some("Added"));
    }

    #[test]
    fn creates_table_when_absent() {
        let class = parse(ClassSpec::new("a/Outer").build());
        let mut patch = NestingPatch::new();
        patch.add_inner_record(InnerClassRecord::declaring(
            &ClassName::new("a/Outer$7"),
            InnerClassAccess::empty(),
        ));
        let patched = parse(class.patched(&patch).unwrap());
        let rows = patched.inner_records();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].inner, ClassName::new("a/Outer$7"));
        assert_eq!(rows[0].outer, None);
        assert_eq!(rows[0].simple_name, None);
    }

    #[test]
    fn creates_enclosing_attribute() {
        let class = parse(ClassSpec::new("a/Outer$3").build());
        let mut patch = NestingPatch::new();
        patch.set_enclosing(ClassName::new("a/Outer"));
        let patched = parse(class.patched(&patch).unwrap());
        let enc = patched.enclosing().unwrap();
        assert_eq!(enc.class, ClassName::new("a/Outer"));
        assert_eq!(enc.method_index, 0);
    }

    #[test]
    fn rewrites_wrong_enclosing_class_and_clears_method() {
        let class = parse(
            ClassSpec::new("a/Outer$3")
                .enclosing_with_method("a/Wrong", 5)
                .build(),
        );
        let mut patch = NestingPatch::new();
        patch.set_enclosing(ClassName::new("a/Outer"));
        let patched = parse(class.patched(&patch).unwrap());
        let enc = patched.enclosing().unwrap();
        assert_eq!(enc.class, ClassName::new("a/Outer"));
        assert_eq!(enc.method_index, 0);
    }

    #[test]
    fn matching_enclosing_class_is_left_alone() {
        let bytes = ClassSpec::new("a/Outer$3").enclosing("a/Outer").build();
        let class = parse(bytes);
        let mut patch = NestingPatch::new();
        patch.set_enclosing(ClassName::new("a/Outer"));
        let out = class.patched(&patch).unwrap();
        assert_eq!(out, class.bytes());
    }

    #[test]
    fn already_recorded_row_is_not_duplicated() {
        let class = parse(
            ClassSpec::new("a/Outer")
                .inner_row("a/Outer$Inner", Some("a/Outer"), Some("Inner"), 0x0001)
                .build(),
        );
        let mut patch = NestingPatch::new();
        patch.add_inner_record(InnerClassRecord::declaring(
            &ClassName::new("a/Outer$Inner"),
            InnerClassAccess::PUBLIC,
        ));
        let out = class.patched(&patch).unwrap();
        assert_eq!(out, class.bytes());
    }

    #[test]
    fn method_bodies_survive_byte_for_byte() {
        let original = ClassSpec::new("a/Outer").methods(3).build();
        let class = parse(original.clone());
        let mut patch = NestingPatch::new();
        patch.add_inner_record(InnerClassRecord::declaring(
            &ClassName::new("a/Outer$X"),
            InnerClassAccess::PUBLIC,
        ));
        let patched = class.patched(&patch).unwrap();

        // The method table region is identical; only the pool count, pool
        // tail, and attribute section differ.
        let marker: &[u8] = &[0xB1]; // the lone `return` instruction
        assert_eq!(
            original.iter().filter(|&&b| b == 0xB1).count(),
            patched.iter().filter(|&&b| b == 0xB1).count(),
        );
        assert!(patched.windows(marker.len()).any(|w| w == marker));
        // And the patched class still parses with the same name.
        assert_eq!(parse(patched).name(), &ClassName::new("a/Outer"));
    }

    #[test]
    fn duplicate_queued_rows_collapse() {
        let class = parse(ClassSpec::new("a/Outer").build());
        let mut patch = NestingPatch::new();
        patch.add_inner_record(InnerClassRecord::declaring(
            &ClassName::new("a/Outer$A"),
            InnerClassAccess::PUBLIC,
        ));
        patch.add_inner_record(InnerClassRecord::declaring(
            &ClassName::new("a/Outer$A"),
            InnerClassAccess::PUBLIC,
        ));
        let patched = parse(class.patched(&patch).unwrap());
        assert_eq!(patched.inner_records().len(), 1);
    }
}
