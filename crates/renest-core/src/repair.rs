//! The repair orchestrator.
//!
//! INIT → INDEXING → SKIP | VERIFYING → WRITING → FINALIZE → DONE. The
//! index must be complete before the first verification because pairings
//! are global; after that each entry is independent. Any parse failure is
//! fatal for the whole run — records elsewhere may reference the
//! unparseable class, so a partial repair would be inconsistent.

use std::collections::BTreeMap;
use std::path::Path;

use renest_archive::{ArchiveReader, ArchiveWriter};
use renest_classfile::{ClassFile, InnerClassRecord, NestingPatch};
use renest_error::{RenestError, Result};
use renest_types::{ClassName, InnerClassAccess};
use smallvec::SmallVec;
use tracing::{info, warn};

use crate::index::StructuralIndex;
use crate::report::{Finding, NestingReport, RepairOutcome, ScanReport};
use crate::verify::{Discrepancy, verify_class};

/// A class that failed verification: its cached full-fidelity view plus
/// the discrepancy batch to apply.
struct PendingPatch {
    class: ClassFile,
    discrepancies: SmallVec<[Discrepancy; 4]>,
}

/// Repair an archive in place. The replacement is atomic: until the final
/// rename the path holds the unmodified input.
pub fn repair_in_place(path: impl AsRef<Path>) -> Result<RepairOutcome> {
    let path = path.as_ref();
    run_repair(path, path)
}

/// Repair `input` into a separate `output` path. When nothing needs
/// repair, no output is written.
pub fn repair_to(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Result<RepairOutcome> {
    run_repair(input.as_ref(), output.as_ref())
}

/// Verify only: report every discrepancy without writing anything.
pub fn scan(path: impl AsRef<Path>) -> Result<ScanReport> {
    let path = path.as_ref();
    let mut reader = ArchiveReader::open(path)?;
    let index = StructuralIndex::build(&mut reader)?;
    let classes_with_nesting = announce(&index);
    if classes_with_nesting == 0 {
        return Ok(empty_report(path, 0));
    }
    let pending = collect_pending(&mut reader, &index)?;
    Ok(build_report(path, classes_with_nesting, &pending))
}

fn run_repair(input: &Path, output: &Path) -> Result<RepairOutcome> {
    let mut reader = ArchiveReader::open(input)?;
    let index = StructuralIndex::build(&mut reader)?;

    let classes_with_nesting = announce(&index);
    if classes_with_nesting == 0 {
        return Ok(RepairOutcome::Clean(empty_report(input, 0)));
    }

    let pending = collect_pending(&mut reader, &index)?;
    if pending.is_empty() {
        info!("all relationship records verified, nothing to repair");
        return Ok(RepairOutcome::Clean(build_report(
            input,
            classes_with_nesting,
            &pending,
        )));
    }

    let report = build_report(input, classes_with_nesting, &pending);
    for finding in &report.findings {
        match &finding.subject {
            Some(subject) => info!(
                class = %finding.class,
                kind = %finding.kind,
                subject = %subject,
                "repairing"
            ),
            None => info!(class = %finding.class, kind = %finding.kind, "repairing"),
        }
    }

    // WRITING: original entry order, directory entries dropped, untouched
    // entries copied without recompression.
    let mut writer = ArchiveWriter::create(output)?;
    for entry_index in 0..reader.len() {
        let meta = reader.meta(entry_index)?;
        if meta.is_dir {
            continue;
        }
        if let Some(entry) = pending.get(&entry_index) {
            let patch = assemble_patch(entry, &index);
            let bytes = entry
                .class
                .patched(&patch)
                .map_err(|e| e.for_entry(&meta.name, input))?;
            writer.write_entry(&meta.name, &bytes)?;
        } else {
            writer.copy_raw(&mut reader, entry_index)?;
        }
    }
    let output = writer.finish()?;

    info!(
        classes = report.classes_affected,
        fixes = report.findings.len(),
        "repair complete"
    );
    Ok(RepairOutcome::Repaired { report, output })
}

/// Count and announce the classes participating in nesting before the pass
/// proper starts.
fn announce(index: &StructuralIndex) -> usize {
    let count = index.nested_class_count();
    if count == 0 {
        info!("no nested-class relationships found, nothing to repair");
    } else {
        info!(classes = count, "classes with nested-class relationships");
    }
    count
}

/// VERIFYING: fetch the full-fidelity view of every involved class and keep
/// the ones with discrepancies, keyed by entry position.
fn collect_pending(
    reader: &mut ArchiveReader,
    index: &StructuralIndex,
) -> Result<BTreeMap<usize, PendingPatch>> {
    let mut pending = BTreeMap::new();
    for record in index.iter() {
        if !index.involved_in_nesting(&record.name) {
            continue;
        }
        let entry_name = reader.meta(record.entry_index)?.name;
        let bytes = reader.read(record.entry_index)?;
        let class =
            ClassFile::parse(bytes).map_err(|e| e.for_entry(&entry_name, reader.path()))?;
        if class.name() != &record.name {
            return Err(RenestError::internal(format!(
                "index drift: entry {} re-parsed as `{}` but was indexed as `{}`",
                record.entry_index,
                class.name(),
                record.name,
            )));
        }
        let discrepancies = verify_class(&class, index);
        if !discrepancies.is_empty() {
            pending.insert(
                record.entry_index,
                PendingPatch {
                    class,
                    discrepancies,
                },
            );
        }
    }
    Ok(pending)
}

/// Lower a discrepancy batch into a single splice for its class.
fn assemble_patch(pending: &PendingPatch, index: &StructuralIndex) -> NestingPatch {
    let mut patch = NestingPatch::new();
    for discrepancy in &pending.discrepancies {
        match discrepancy {
            Discrepancy::MissingInnerRecord { inner } => {
                patch.add_inner_record(InnerClassRecord::declaring(inner, inner_flags(index, inner)));
            }
            Discrepancy::MissingSelfRecord => {
                let name = pending.class.name();
                patch.add_inner_record(InnerClassRecord::declaring(name, inner_flags(index, name)));
            }
            Discrepancy::MissingEnclosingClass { enclosing } => {
                patch.set_enclosing(enclosing.clone());
            }
        }
    }
    patch
}

/// Access flags for a new row: copied from the inner class's own
/// declaration when the archive has it, otherwise the least-authority
/// default.
fn inner_flags(index: &StructuralIndex, name: &ClassName) -> InnerClassAccess {
    index.get(name).map_or_else(
        || {
            warn!(class = %name, "inner class not in archive, defaulting access flags");
            InnerClassAccess::empty()
        },
        |record| record.access.as_inner(),
    )
}

fn empty_report(archive: &Path, classes_with_nesting: usize) -> NestingReport {
    NestingReport {
        archive: archive.to_path_buf(),
        classes_with_nesting,
        classes_affected: 0,
        findings: Vec::new(),
    }
}

fn build_report(
    archive: &Path,
    classes_with_nesting: usize,
    pending: &BTreeMap<usize, PendingPatch>,
) -> NestingReport {
    let mut findings = Vec::new();
    for p in pending.values() {
        for discrepancy in &p.discrepancies {
            let subject = match discrepancy {
                Discrepancy::MissingInnerRecord { inner } => Some(inner.clone()),
                Discrepancy::MissingSelfRecord => None,
                Discrepancy::MissingEnclosingClass { enclosing } => Some(enclosing.clone()),
            };
            findings.push(Finding {
                class: p.class.name().clone(),
                kind: discrepancy.kind(),
                subject,
            });
        }
    }
    NestingReport {
        archive: archive.to_path_buf(),
        classes_with_nesting,
        classes_affected: pending.len(),
        findings,
    }
}
