//! Access-flag bitsets from the class-file format.

use bitflags::bitflags;

bitflags! {
    /// Class-level access flags (`access_flags` in the class header).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ClassAccess: u16 {
        const PUBLIC     = 0x0001;
        const FINAL      = 0x0010;
        const SUPER      = 0x0020;
        const INTERFACE  = 0x0200;
        const ABSTRACT   = 0x0400;
        const SYNTHETIC  = 0x1000;
        const ANNOTATION = 0x2000;
        const ENUM       = 0x4000;
        const MODULE     = 0x8000;
    }
}

bitflags! {
    /// Per-row access flags of the embedded inner-class table. The inner
    /// table admits member-visibility bits the class header cannot carry.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct InnerClassAccess: u16 {
        const PUBLIC     = 0x0001;
        const PRIVATE    = 0x0002;
        const PROTECTED  = 0x0004;
        const STATIC     = 0x0008;
        const FINAL      = 0x0010;
        const INTERFACE  = 0x0200;
        const ABSTRACT   = 0x0400;
        const SYNTHETIC  = 0x1000;
        const ANNOTATION = 0x2000;
        const ENUM       = 0x4000;
    }
}

impl ClassAccess {
    /// Project class-header flags onto the inner-table flag set, dropping
    /// bits the table does not define (`SUPER`, `MODULE`).
    #[must_use]
    pub fn as_inner(self) -> InnerClassAccess {
        InnerClassAccess::from_bits_truncate(self.bits())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_flags_project_onto_inner_flags() {
        let access = ClassAccess::PUBLIC | ClassAccess::SUPER | ClassAccess::FINAL;
        let inner = access.as_inner();
        assert_eq!(inner, InnerClassAccess::PUBLIC | InnerClassAccess::FINAL);
    }

    #[test]
    fn unknown_bits_round_trip_through_truncation() {
        let access = ClassAccess::from_bits_truncate(0xFFFF);
        assert!(access.contains(ClassAccess::MODULE));
        assert_eq!(access.as_inner().bits() & 0x8000, 0);
    }
}
