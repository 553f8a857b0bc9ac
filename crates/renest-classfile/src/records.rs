//! Embedded relationship records.

use renest_types::{ClassName, InnerClassAccess};

/// One row of a class's `InnerClasses` table.
///
/// Anonymous rows carry neither an outer reference nor a simple name; the
/// nesting they imply lives only in the inner class's qualified name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InnerClassRecord {
    pub inner: ClassName,
    pub outer: Option<ClassName>,
    pub simple_name: Option<String>,
    pub access: InnerClassAccess,
}

impl InnerClassRecord {
    /// Build the row declaring `inner` under its nominal parent, as the
    /// format's convention requires: anonymous classes get an empty outer
    /// reference and no simple name, member classes get both.
    #[must_use]
    pub fn declaring(inner: &ClassName, access: InnerClassAccess) -> Self {
        if inner.is_anonymous() {
            Self {
                inner: inner.clone(),
                outer: None,
                simple_name: None,
                access,
            }
        } else {
            Self {
                inner: inner.clone(),
                outer: inner.nominal_parent(),
                simple_name: Some(inner.simple_name().to_owned()),
                access,
            }
        }
    }
}

/// The class half of an `EnclosingMethod` attribute. The raw method index
/// is retained untouched; 0 means no enclosing method is recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnclosingRecord {
    pub class: ClassName,
    pub method_index: u16,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declaring_row_for_member_class() {
        let row = InnerClassRecord::declaring(
            &ClassName::new("a/Outer$Inner"),
            InnerClassAccess::PUBLIC,
        );
        assert_eq!(row.outer, Some(ClassName::new("a/Outer")));
        assert_eq!(row.simple_name.as_deref(), Some("Inner"));
    }

    #[test]
    fn declaring_row_for_anonymous_class() {
        let row =
            InnerClassRecord::declaring(&ClassName::new("a/Outer$3"), InnerClassAccess::empty());
        assert_eq!(row.outer, None);
        assert_eq!(row.simple_name, None);
    }
}
