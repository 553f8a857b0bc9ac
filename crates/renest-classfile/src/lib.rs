//! Class-file binary layer.
//!
//! Two capability levels are exposed over the same entry bytes:
//!
//! - [`ClassSummary`] — the lightweight structural view used to build an
//!   archive-wide index: name, access flags, embedded relationship records.
//!   Nothing else is retained.
//! - [`ClassFile`] — the full-fidelity view: owns the entry bytes and keeps
//!   constant-pool contents plus section offsets, so a [`NestingPatch`] can
//!   be spliced in without touching method bodies, debug tables, or
//!   stack-map frames.
//!
//! Fetching the full view is an explicit operation ([`ClassFile::parse`]);
//! callers that need it more than once are expected to cache it.

mod class;
mod cursor;
mod patch;
mod pool;
mod records;
mod summary;

#[cfg(any(test, feature = "testutil"))]
pub mod testutil;

pub use class::ClassFile;
pub use patch::NestingPatch;
pub use pool::ConstantPool;
pub use records::{EnclosingRecord, InnerClassRecord};
pub use summary::ClassSummary;
