//! Archive-wide structural model.
//!
//! Built in a single linear pass before any verification runs: pairings are
//! global, so the model must cover every class first. Once built it is
//! read-only for the rest of the run.

use std::collections::{BTreeMap, BTreeSet};

use renest_archive::ArchiveReader;
use renest_classfile::ClassSummary;
use renest_error::Result;
use renest_types::{ClassAccess, ClassName};
use tracing::debug;

/// Per-class structural facts derived from the summary view.
#[derive(Debug, Clone)]
pub struct StructuralRecord {
    pub name: ClassName,
    pub access: ClassAccess,
    /// Classes this class's own table ties to it: rows with an explicit
    /// outer reference to it, or anonymous/local rows whose name nominally
    /// parents to it. Rows merely citing other outers' nested classes do
    /// not count.
    pub recorded_inner: BTreeSet<ClassName>,
    pub nominal_parent: Option<ClassName>,
    pub is_anonymous: bool,
    /// Position of the class's entry in the archive, kept so later passes
    /// can re-read it without another directory walk.
    pub entry_index: usize,
}

/// Map from qualified class name to structural record, plus the derived
/// inner-class pairings (recorded rows unioned with nominal children found
/// in the archive).
#[derive(Debug, Default)]
pub struct StructuralIndex {
    records: BTreeMap<ClassName, StructuralRecord>,
    inner_of: BTreeMap<ClassName, BTreeSet<ClassName>>,
}

impl StructuralIndex {
    /// Scan every class entry once and build the model. A class carrying no
    /// relationship records is ordinary input, not a failure; a class that
    /// cannot be parsed at all is fatal for the run.
    pub fn build(reader: &mut ArchiveReader) -> Result<Self> {
        let mut records = BTreeMap::new();

        for entry_index in 0..reader.len() {
            let meta = reader.meta(entry_index)?;
            if meta.is_dir || !meta.is_class {
                continue;
            }
            let bytes = reader.read(entry_index)?;
            let summary = ClassSummary::parse(&bytes)
                .map_err(|e| e.for_entry(&meta.name, reader.path()))?;

            let mut recorded_inner = BTreeSet::new();
            for row in &summary.inner_records {
                let tied = row.outer.as_ref() == Some(&summary.name)
                    || (row.outer.is_none()
                        && row.inner.nominal_parent().as_ref() == Some(&summary.name));
                if tied {
                    recorded_inner.insert(row.inner.clone());
                }
            }

            let record = StructuralRecord {
                nominal_parent: summary.name.nominal_parent(),
                is_anonymous: summary.name.is_anonymous(),
                access: summary.access,
                recorded_inner,
                entry_index,
                name: summary.name.clone(),
            };
            records.insert(summary.name, record);
        }

        let mut inner_of: BTreeMap<ClassName, BTreeSet<ClassName>> = BTreeMap::new();
        for record in records.values() {
            for inner in &record.recorded_inner {
                inner_of
                    .entry(record.name.clone())
                    .or_default()
                    .insert(inner.clone());
            }
            // A nominal child pairs with its parent only when the parent is
            // actually present in the archive.
            if let Some(parent) = &record.nominal_parent {
                if records.contains_key(parent) {
                    inner_of
                        .entry(parent.clone())
                        .or_default()
                        .insert(record.name.clone());
                }
            }
        }

        debug!(
            classes = records.len(),
            pairings = inner_of.values().map(BTreeSet::len).sum::<usize>(),
            "structural index built"
        );

        Ok(Self { records, inner_of })
    }

    /// Record for a class, if the archive contains it.
    #[must_use]
    pub fn get(&self, name: &ClassName) -> Option<&StructuralRecord> {
        self.records.get(name)
    }

    #[must_use]
    pub fn contains(&self, name: &ClassName) -> bool {
        self.records.contains_key(name)
    }

    /// Classes logically inner to `name` (recorded ∪ nominal).
    pub fn inner_of(&self, name: &ClassName) -> impl Iterator<Item = &ClassName> + '_ {
        self.inner_of.get(name).into_iter().flatten()
    }

    /// Whether verification could possibly find anything for this class.
    #[must_use]
    pub fn involved_in_nesting(&self, name: &ClassName) -> bool {
        name.is_nested() || self.inner_of.get(name).is_some_and(|s| !s.is_empty())
    }

    /// Count of classes with any nested-class relationship at all; zero
    /// means the whole pass is a no-op.
    #[must_use]
    pub fn nested_class_count(&self) -> usize {
        self.records
            .values()
            .filter(|r| self.involved_in_nesting(&r.name))
            .count()
    }

    /// All records, ordered by class name.
    pub fn iter(&self) -> impl Iterator<Item = &StructuralRecord> + '_ {
        self.records.values()
    }

    /// Number of classes in the archive.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
