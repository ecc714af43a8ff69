//! [`Token`] — the opaque credential string managed by the pools.

use std::fmt;

/// Errors produced when constructing a [`Token`].
#[derive(Debug, Clone, PartialEq)]
pub enum TokenError {
    /// A token must contain at least one character.
    Empty,
    /// Tokens are persisted one-per-line in staging files; an embedded line
    /// break would corrupt that format.
    ContainsLineBreak,
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "token must not be empty"),
            Self::ContainsLineBreak => write!(f, "token must not contain a line break"),
        }
    }
}

impl std::error::Error for TokenError {}

/// An opaque credential identifier (API key or auth secret).
///
/// Equality is exact string match — tokens are case-sensitive and never
/// normalized. `Ord` follows byte order so sets of tokens iterate (and are
/// written to files) deterministically.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Token(String);

impl Token {
    pub fn new(s: impl Into<String>) -> Result<Self, TokenError> {
        let s: String = s.into();
        if s.is_empty() {
            return Err(TokenError::Empty);
        }
        if s.contains('\n') || s.contains('\r') {
            return Err(TokenError::ContainsLineBreak);
        }
        Ok(Self(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Token {
    type Error = TokenError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl TryFrom<&str> for Token {
    type Error = TokenError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}
