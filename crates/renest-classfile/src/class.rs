//! Structural scan and the full-fidelity class view.
//!
//! The scan walks the fixed layout once: header, constant pool, interfaces,
//! fields, methods (bodies skipped by declared length), then the class-level
//! attribute table. Method bodies, debug tables, and frames are never
//! decoded; they survive any later patch byte-for-byte.

use renest_error::{RenestError, Result};
use renest_types::{ClassAccess, ClassName};

use crate::cursor::Cursor;
use crate::pool::ConstantPool;
use crate::records::{EnclosingRecord, InnerClassRecord};

const MAGIC: u32 = 0xCAFE_BABE;

pub(crate) const ATTR_INNER_CLASSES: &str = "InnerClasses";
pub(crate) const ATTR_ENCLOSING_METHOD: &str = "EnclosingMethod";

/// A class-level attribute located in the original bytes.
#[derive(Debug, Clone)]
pub(crate) struct RawAttribute {
    pub(crate) name_index: u16,
    /// Offset of `attribute_name_index`.
    pub(crate) start: usize,
    /// Offset of `info[0]`.
    pub(crate) data_start: usize,
    pub(crate) data_len: usize,
}

impl RawAttribute {
    pub(crate) fn end(&self) -> usize {
        self.data_start + self.data_len
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Scan {
    pub(crate) pool: ConstantPool,
    pub(crate) access: ClassAccess,
    pub(crate) this_class: ClassName,
    /// Offset of the class-level `attributes_count`.
    pub(crate) attrs_count_offset: usize,
    pub(crate) attributes: Vec<RawAttribute>,
    /// Position of the `InnerClasses` attribute within `attributes`.
    pub(crate) inner_attr: Option<usize>,
    /// Position of the `EnclosingMethod` attribute within `attributes`.
    pub(crate) enclosing_attr: Option<usize>,
    pub(crate) inner_records: Vec<InnerClassRecord>,
    pub(crate) enclosing: Option<EnclosingRecord>,
}

fn skip_member_table(cur: &mut Cursor<'_>) -> Result<()> {
    let count = cur.u16()?;
    for _ in 0..count {
        // access_flags, name_index, descriptor_index
        cur.skip(6)?;
        let attr_count = cur.u16()?;
        for _ in 0..attr_count {
            cur.skip(2)?;
            let len = cur.u32()? as usize;
            cur.skip(len)?;
        }
    }
    Ok(())
}

fn parse_inner_table(pool: &ConstantPool, data: &[u8]) -> Result<Vec<InnerClassRecord>> {
    let mut cur = Cursor::new(data);
    let count = cur.u16()?;
    let mut records = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let inner_index = cur.u16()?;
        let outer_index = cur.u16()?;
        let name_index = cur.u16()?;
        let flags = cur.u16()?;
        records.push(InnerClassRecord {
            inner: pool.class_name(inner_index)?,
            outer: pool.opt_class_name(outer_index)?,
            simple_name: pool.opt_utf8(name_index)?.map(str::to_owned),
            access: renest_types::InnerClassAccess::from_bits_retain(flags),
        });
    }
    Ok(records)
}

fn parse_enclosing(pool: &ConstantPool, data: &[u8]) -> Result<EnclosingRecord> {
    let mut cur = Cursor::new(data);
    let class_index = cur.u16()?;
    let method_index = cur.u16()?;
    Ok(EnclosingRecord {
        class: pool.class_name(class_index)?,
        method_index,
    })
}

pub(crate) fn scan(bytes: &[u8]) -> Result<Scan> {
    let mut cur = Cursor::new(bytes);
    let magic = cur.u32()?;
    if magic != MAGIC {
        return Err(RenestError::malformed(format!(
            "bad magic {magic:#010x}"
        )));
    }
    // minor_version, major_version
    cur.skip(4)?;

    let pool = ConstantPool::parse(&mut cur)?;

    let access = ClassAccess::from_bits_retain(cur.u16()?);
    let this_class = pool.class_name(cur.u16()?)?;
    // super_class (0 for java/lang/Object)
    cur.skip(2)?;
    let interfaces = cur.u16()? as usize;
    cur.skip(interfaces * 2)?;

    skip_member_table(&mut cur)?; // fields
    skip_member_table(&mut cur)?; // methods

    let attrs_count_offset = cur.pos();
    let attr_count = cur.u16()?;
    let mut attributes = Vec::with_capacity(attr_count as usize);
    let mut inner_attr = None;
    let mut enclosing_attr = None;
    let mut inner_records = Vec::new();
    let mut enclosing = None;

    for position in 0..attr_count as usize {
        let start = cur.pos();
        let name_index = cur.u16()?;
        let data_len = cur.u32()? as usize;
        let data_start = cur.pos();
        let data = cur.take(data_len)?;
        attributes.push(RawAttribute {
            name_index,
            start,
            data_start,
            data_len,
        });

        match pool.utf8(name_index)? {
            ATTR_INNER_CLASSES if inner_attr.is_none() => {
                inner_attr = Some(position);
                inner_records = parse_inner_table(&pool, data)?;
            }
            ATTR_ENCLOSING_METHOD if enclosing_attr.is_none() => {
                enclosing_attr = Some(position);
                enclosing = Some(parse_enclosing(&pool, data)?);
            }
            _ => {}
        }
    }

    Ok(Scan {
        pool,
        access,
        this_class,
        attrs_count_offset,
        attributes,
        inner_attr,
        enclosing_attr,
        inner_records,
        enclosing,
    })
}

/// Full-fidelity view of one class entry.
///
/// Owns the original bytes; everything a patch needs to splice new
/// relationship records is resolved at parse time.
#[derive(Debug, Clone)]
pub struct ClassFile {
    bytes: Vec<u8>,
    scan: Scan,
}

impl ClassFile {
    /// Parse a class entry, retaining its bytes. Any structural defect is a
    /// [`RenestError::MalformedClass`].
    pub fn parse(bytes: Vec<u8>) -> Result<Self> {
        let scan = scan(&bytes)?;
        Ok(Self { bytes, scan })
    }

    /// The class's qualified name.
    #[must_use]
    pub fn name(&self) -> &ClassName {
        &self.scan.this_class
    }

    /// Class-header access flags.
    #[must_use]
    pub fn access(&self) -> ClassAccess {
        self.scan.access
    }

    /// Literal rows of the embedded `InnerClasses` table, in table order.
    #[must_use]
    pub fn inner_records(&self) -> &[InnerClassRecord] {
        &self.scan.inner_records
    }

    /// The embedded `EnclosingMethod` record, if present.
    #[must_use]
    pub fn enclosing(&self) -> Option<&EnclosingRecord> {
        self.scan.enclosing.as_ref()
    }

    /// Whether any embedded row names `class` as an inner class.
    #[must_use]
    pub fn has_inner_record(&self, class: &ClassName) -> bool {
        self.scan.inner_records.iter().any(|r| &r.inner == class)
    }

    /// The original entry bytes.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub(crate) fn scan_ref(&self) -> &Scan {
        &self.scan
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::ClassSpec;
    use renest_types::InnerClassAccess;

    #[test]
    fn parses_name_and_access() {
        let bytes = ClassSpec::new("a/b/Outer").build();
        let class = ClassFile::parse(bytes).unwrap();
        assert_eq!(class.name(), &ClassName::new("a/b/Outer"));
        assert!(class.access().contains(ClassAccess::PUBLIC));
        assert!(class.inner_records().is_empty());
        assert!(class.enclosing().is_none());
    }

    #[test]
    fn reads_inner_table_rows() {
        let bytes = ClassSpec::new("a/Outer")
            .inner_row("a/Outer$Inner", Some("a/Outer"), Some("Inner"), 0x0009)
            .inner_row("a/Outer$1", None, None, 0x0000)
            .build();
        let class = ClassFile::parse(bytes).unwrap();
        let rows = class.inner_records();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].inner, ClassName::new("a/Outer$Inner"));
        assert_eq!(rows[0].outer, Some(ClassName::new("a/Outer")));
        assert_eq!(rows[0].simple_name.as_deref(), Some("Inner"));
        assert_eq!(
            rows[0].access,
            InnerClassAccess::PUBLIC | InnerClassAccess::STATIC
        );
        assert_eq!(rows[1].outer, None);
        assert!(class.has_inner_record(&ClassName::new("a/Outer$1")));
        assert!(!class.has_inner_record(&ClassName::new("a/Outer$Other")));
    }

    #[test]
    fn reads_enclosing_record() {
        let bytes = ClassSpec::new("a/Outer$1").enclosing("a/Outer").build();
        let class = ClassFile::parse(bytes).unwrap();
        let enc = class.enclosing().unwrap();
        assert_eq!(enc.class, ClassName::new("a/Outer"));
        assert_eq!(enc.method_index, 0);
    }

    #[test]
    fn bad_magic_is_malformed() {
        let mut bytes = ClassSpec::new("a/Outer").build();
        bytes[0] = 0;
        assert!(matches!(
            ClassFile::parse(bytes),
            Err(RenestError::MalformedClass { .. })
        ));
    }

    #[test]
    fn truncated_tail_is_malformed() {
        let bytes = ClassSpec::new("a/Outer").build();
        let cut = bytes[..bytes.len() - 3].to_vec();
        assert!(ClassFile::parse(cut).is_err());
    }
}
