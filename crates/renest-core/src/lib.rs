//! Nested-class metadata repair.
//!
//! When two independently renamed archives are merged, per-class rename and
//! merge tools lose cross-class relationship records: an outer class
//! forgets its members, a nested class forgets to declare itself, an
//! anonymous class points at a stale enclosing class. This crate rebuilds
//! an independent structural model of the merged archive, diffs it against
//! each class's embedded records, and patches only the classes that drifted
//! — every other byte of the archive is preserved.
//!
//! Entry points: [`repair_in_place`], [`repair_to`], and the read-only
//! [`scan`].

pub mod index;
pub mod repair;
pub mod report;
pub mod verify;

pub use index::{StructuralIndex, StructuralRecord};
pub use repair::{repair_in_place, repair_to, scan};
pub use report::{DiscrepancyKind, Finding, NestingReport, RepairOutcome, ScanReport};
pub use verify::{Discrepancy, verify_class};
