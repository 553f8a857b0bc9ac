//! Qualified class names in internal (slash) form.
//!
//! A name like `com/example/Outer$Inner$1` carries two kinds of structure:
//! the package path separated by `/`, and nominal nesting separated by `$`
//! inside the final path segment. Nesting derivation only ever looks at the
//! basename; a `$` in a package segment is left alone.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A qualified JVM class name, stored in internal form (`a/b/Outer$Inner`).
///
/// Construction normalizes dotted input (`a.b.Outer$Inner`) to slashes so
/// that names read from constant pools, archive entry paths, and user input
/// all compare equal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassName(String);

impl ClassName {
    /// Create a name from dotted or slashed input.
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().replace('.', "/"))
    }

    /// The internal (slash) form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Archive entry path for this class (`a/b/Outer$Inner.class`).
    #[must_use]
    pub fn entry_path(&self) -> String {
        format!("{}.class", self.0)
    }

    /// The final path segment, nesting suffix included (`Outer$Inner$1`).
    #[must_use]
    pub fn basename(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// The name implied by truncating at the basename's last `$`, or `None`
    /// for a top-level class. An empty suffix (`Outer$`) yields no parent.
    #[must_use]
    pub fn nominal_parent(&self) -> Option<Self> {
        let base_start = self.0.len() - self.basename().len();
        let dollar = self.0[base_start..].rfind('$')?;
        if base_start + dollar + 1 == self.0.len() {
            return None;
        }
        // A leading `$` in the basename is part of the outermost name, not
        // a nesting separator.
        if dollar == 0 {
            return None;
        }
        Some(Self(self.0[..base_start + dollar].to_owned()))
    }

    /// The simple (source-level) name: the piece after the last `$` for a
    /// nested class, otherwise the basename.
    #[must_use]
    pub fn simple_name(&self) -> &str {
        let base = self.basename();
        match base.rfind('$') {
            Some(i) if i > 0 && i + 1 < base.len() => &base[i + 1..],
            _ => base,
        }
    }

    /// Whether the name is nominally nested (basename has an interior `$`).
    #[must_use]
    pub fn is_nested(&self) -> bool {
        self.nominal_parent().is_some()
    }

    /// Whether the final `$`-segment is non-empty and purely ASCII digits.
    ///
    /// Known limitation: this is a naming heuristic, not a semantic test. A
    /// hand-written nested class whose simple name is all digits will be
    /// classified as anonymous. Kept for compatibility with the upstream
    /// toolchain, which applies the same rule.
    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        self.is_nested() && self.simple_name().bytes().all(|b| b.is_ascii_digit())
    }
}

impl fmt::Display for ClassName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClassName {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for ClassName {
    fn from(raw: String) -> Self {
        if raw.contains('.') {
            Self::new(&raw)
        } else {
            Self(raw)
        }
    }
}
