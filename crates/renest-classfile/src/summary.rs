//! Lightweight structural view used by the index pass.

use renest_error::Result;
use renest_types::{ClassAccess, ClassName};

use crate::class::scan;
use crate::records::{EnclosingRecord, InnerClassRecord};

/// What the index pass keeps per class: name, flags, and the embedded
/// relationship records. Offsets and raw bytes are dropped; re-obtaining
/// full fidelity means an explicit [`crate::ClassFile::parse`].
#[derive(Debug, Clone)]
pub struct ClassSummary {
    pub name: ClassName,
    pub access: ClassAccess,
    pub inner_records: Vec<InnerClassRecord>,
    pub enclosing: Option<EnclosingRecord>,
}

impl ClassSummary {
    /// Summarize one class entry without retaining its bytes.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let scan = scan(bytes)?;
        Ok(Self {
            name: scan.this_class,
            access: scan.access,
            inner_records: scan.inner_records,
            enclosing: scan.enclosing,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::ClassSpec;

    #[test]
    fn summary_matches_full_view() {
        let bytes = ClassSpec::new("a/Outer")
            .inner_row("a/Outer$Inner", Some("a/Outer"), Some("Inner"), 0x0001)
            .build();
        let summary = ClassSummary::parse(&bytes).unwrap();
        let full = crate::ClassFile::parse(bytes).unwrap();
        assert_eq!(&summary.name, full.name());
        assert_eq!(summary.inner_records, full.inner_records());
        assert_eq!(summary.enclosing.as_ref(), full.enclosing());
    }
}
