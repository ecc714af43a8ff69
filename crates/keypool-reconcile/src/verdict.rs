//! [`Verdict`] — the binary outcome of probing one token.

use std::fmt;

/// Classification of a token from a single reconciliation pass.
///
/// A verdict is a pure function of the validation endpoint's response
/// category at probe time. It is consumed once by the reconciler and never
/// persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The endpoint recognizes the token (accepted or rate-limited).
    Active,
    /// The endpoint rejected the token, or the probe could not be concluded
    /// within the retry budget (fail-closed).
    Invalid,
}

impl Verdict {
    pub fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Invalid => "invalid",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
