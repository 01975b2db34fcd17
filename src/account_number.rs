use std::fmt;

use serde::{Deserialize, Serialize};

/// A dotted hierarchical account code, e.g. `405` or `405.1.2`.
///
/// Immutable once parsed. `405.1` is a direct child of `405`; depth is the
/// segment count. Ordering and equality are by the full string value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountNumber(String);

impl AccountNumber {
    /// Parse a dotted code. Every segment must be a non-negative integer
    /// literal; anything else (blank, trailing dot, letters) is rejected.
    pub fn parse(raw: &str) -> Option<AccountNumber> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        for segment in raw.split('.') {
            if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
        }
        Some(AccountNumber(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Segment count: `405` is level 1, `405.1.2` is level 3.
    pub fn level(&self) -> usize {
        self.0.split('.').count()
    }

    /// The code with its last segment removed, or `None` at top level.
    pub fn parent_code(&self) -> Option<AccountNumber> {
        let idx = self.0.rfind('.')?;
        Some(AccountNumber(self.0[..idx].to_string()))
    }

    /// True when `child` is exactly one level below and prefixed by `self + "."`.
    pub fn is_parent_of(&self, child: &AccountNumber) -> bool {
        child.is_child_of(self)
    }

    pub fn is_child_of(&self, parent: &AccountNumber) -> bool {
        self.0.starts_with(&format!("{}.", parent.0)) && self.level() == parent.level() + 1
    }

    /// True when `other` sits anywhere below `self` in the hierarchy.
    pub fn is_ancestor_of(&self, other: &AccountNumber) -> bool {
        other.0.starts_with(&format!("{}.", self.0))
    }
}

impl fmt::Display for AccountNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
