//! Per-class verification against the structural index.

use renest_classfile::ClassFile;
use renest_types::ClassName;
use smallvec::SmallVec;

use crate::index::StructuralIndex;
use crate::report::DiscrepancyKind;

/// A detected mismatch between a class's nominal/structural nesting and
/// its embedded relationship records. All three kinds are repaired on the
/// class they were detected on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Discrepancy {
    /// A class the index reports as inner to this one is missing from its
    /// embedded table.
    MissingInnerRecord { inner: ClassName },
    /// This nested class does not list itself under its own nominal parent.
    MissingSelfRecord,
    /// This anonymous class's enclosing-class reference is absent or does
    /// not match its nominal parent; `enclosing` is the correct value.
    MissingEnclosingClass { enclosing: ClassName },
}

impl Discrepancy {
    #[must_use]
    pub fn kind(&self) -> DiscrepancyKind {
        match self {
            Self::MissingInnerRecord { .. } => DiscrepancyKind::MissingInnerRecord,
            Self::MissingSelfRecord => DiscrepancyKind::MissingSelfRecord,
            Self::MissingEnclosingClass { .. } => DiscrepancyKind::MissingEnclosingClass,
        }
    }
}

/// Compare one class's literal embedded records (from the full-fidelity
/// view) with what the index expects of it.
///
/// The checks are independent and the patcher applies their union, so
/// detection order never changes the outcome. Method-local classes are
/// deliberately not checked for enclosure: a method cannot be inferred from
/// names, and guessing would repair more than the upstream toolchain does.
#[must_use]
pub fn verify_class(class: &ClassFile, index: &StructuralIndex) -> SmallVec<[Discrepancy; 4]> {
    let mut found = SmallVec::new();
    let name = class.name();

    for inner in index.inner_of(name) {
        if !class.has_inner_record(inner) {
            found.push(Discrepancy::MissingInnerRecord {
                inner: inner.clone(),
            });
        }
    }

    if name.is_nested() && !class.has_inner_record(name) {
        found.push(Discrepancy::MissingSelfRecord);
    }

    if name.is_anonymous() {
        if let Some(parent) = name.nominal_parent() {
            let matches = class.enclosing().is_some_and(|e| e.class == parent);
            if !matches {
                found.push(Discrepancy::MissingEnclosingClass { enclosing: parent });
            }
        }
    }

    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use renest_archive::ArchiveReader;
    use renest_classfile::testutil::ClassSpec;
    use std::io::Write;

    fn jar_with(classes: &[Vec<u8>]) -> tempfile::TempPath {
        let temp = tempfile::NamedTempFile::new().unwrap();
        let mut zip = zip::ZipWriter::new(temp.reopen().unwrap());
        for bytes in classes {
            let class = ClassFile::parse(bytes.clone()).unwrap();
            zip.start_file(
                class.name().entry_path(),
                zip::write::SimpleFileOptions::default(),
            )
            .unwrap();
            zip.write_all(bytes).unwrap();
        }
        zip.finish().unwrap();
        temp.into_temp_path()
    }

    fn index_of(classes: &[Vec<u8>]) -> StructuralIndex {
        let path = jar_with(classes);
        let mut reader = ArchiveReader::open(&path).unwrap();
        StructuralIndex::build(&mut reader).unwrap()
    }

    #[test]
    fn detects_missing_inner_and_self_records() {
        let outer = ClassSpec::new("a/Outer").build();
        let inner = ClassSpec::new("a/Outer$In").build();
        let index = index_of(&[outer.clone(), inner.clone()]);

        let outer_view = ClassFile::parse(outer).unwrap();
        let found = verify_class(&outer_view, &index);
        assert_eq!(
            found.as_slice(),
            [Discrepancy::MissingInnerRecord {
                inner: ClassName::new("a/Outer$In")
            }]
        );

        let inner_view = ClassFile::parse(inner).unwrap();
        let found = verify_class(&inner_view, &index);
        assert_eq!(found.as_slice(), [Discrepancy::MissingSelfRecord]);
    }

    #[test]
    fn recorded_relationships_verify_clean() {
        let outer = ClassSpec::new("a/Outer")
            .inner_row("a/Outer$In", Some("a/Outer"), Some("In"), 0x0001)
            .build();
        let inner = ClassSpec::new("a/Outer$In")
            .inner_row("a/Outer$In", Some("a/Outer"), Some("In"), 0x0001)
            .build();
        let index = index_of(&[outer.clone(), inner.clone()]);

        assert!(verify_class(&ClassFile::parse(outer).unwrap(), &index).is_empty());
        assert!(verify_class(&ClassFile::parse(inner).unwrap(), &index).is_empty());
    }

    #[test]
    fn anonymous_class_needs_matching_enclosure() {
        let outer = ClassSpec::new("a/Outer").build();
        let anon_missing = ClassSpec::new("a/Outer$1")
            .inner_row("a/Outer$1", None, None, 0)
            .build();
        let anon_wrong = ClassSpec::new("a/Outer$2")
            .inner_row("a/Outer$2", None, None, 0)
            .enclosing("a/Elsewhere")
            .build();
        let index = index_of(&[outer, anon_missing.clone(), anon_wrong.clone()]);

        let found = verify_class(&ClassFile::parse(anon_missing).unwrap(), &index);
        assert_eq!(
            found.as_slice(),
            [Discrepancy::MissingEnclosingClass {
                enclosing: ClassName::new("a/Outer")
            }]
        );

        let found = verify_class(&ClassFile::parse(anon_wrong).unwrap(), &index);
        assert_eq!(
            found.as_slice(),
            [Discrepancy::MissingEnclosingClass {
                enclosing: ClassName::new("a/Outer")
            }]
        );
    }

    #[test]
    fn local_class_enclosure_is_not_inferred() {
        // `a/Outer$1Local` is method-local, not anonymous: no enclosing
        // check applies, only the self record.
        let outer = ClassSpec::new("a/Outer").build();
        let local = ClassSpec::new("a/Outer$1Local")
            .inner_row("a/Outer$1Local", None, None, 0)
            .build();
        let index = index_of(&[outer, local.clone()]);
        let found = verify_class(&ClassFile::parse(local).unwrap(), &index);
        assert!(found.is_empty());
    }
}
