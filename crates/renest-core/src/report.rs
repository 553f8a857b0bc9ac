//! Run reports and outcomes.

use std::fmt;
use std::path::PathBuf;

use renest_types::ClassName;
use serde::Serialize;

/// The three repairable mismatch kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiscrepancyKind {
    MissingInnerRecord,
    MissingSelfRecord,
    MissingEnclosingClass,
}

impl fmt::Display for DiscrepancyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::MissingInnerRecord => "missing inner-class record",
            Self::MissingSelfRecord => "missing self inner-class record",
            Self::MissingEnclosingClass => "missing enclosing-class record",
        })
    }
}

/// One discrepancy, located on the class it is repaired on. `subject` names
/// the other side of the relationship where one exists: the omitted inner
/// class, or the correct enclosing class.
#[derive(Debug, Clone, Serialize)]
pub struct Finding {
    pub class: ClassName,
    pub kind: DiscrepancyKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<ClassName>,
}

/// What a pass saw (for `scan`) or fixed (for repair).
#[derive(Debug, Clone, Serialize)]
pub struct NestingReport {
    pub archive: PathBuf,
    /// Classes with any nested-class relationship, counted before the pass
    /// starts.
    pub classes_with_nesting: usize,
    /// Classes carrying at least one discrepancy.
    pub classes_affected: usize,
    pub findings: Vec<Finding>,
}

impl NestingReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.findings.is_empty()
    }
}

/// Scan and repair share the report shape.
pub type ScanReport = NestingReport;

/// Result of a repair run.
#[derive(Debug)]
pub enum RepairOutcome {
    /// Nothing to repair; the input archive was left untouched.
    Clean(NestingReport),
    /// A repaired archive was written to `output`.
    Repaired {
        report: NestingReport,
        output: PathBuf,
    },
}

impl RepairOutcome {
    #[must_use]
    pub fn report(&self) -> &NestingReport {
        match self {
            Self::Clean(report) | Self::Repaired { report, .. } => report,
        }
    }

    #[must_use]
    pub fn was_repaired(&self) -> bool {
        matches!(self, Self::Repaired { .. })
    }
}
