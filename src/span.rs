//! Byte ranges into the source text the AST was parsed from.
//!
//! Trees built in code, and AST files whose parser left a span out, carry
//! [`Span::UNKNOWN`]. It is distinct from every real range, so an empty span
//! at offset 0 is still a location.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    /// No source location.
    pub const UNKNOWN: Span = Span {
        start: u32::MAX,
        end: u32::MAX,
    };

    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    pub fn dummy() -> Self {
        Self::UNKNOWN
    }

    pub fn is_dummy(&self) -> bool {
        *self == Self::UNKNOWN
    }

    /// Smallest range covering both. An unknown side contributes nothing.
    pub fn merge(self, other: Span) -> Span {
        match (self.is_dummy(), other.is_dummy()) {
            (true, _) => other,
            (_, true) => self,
            _ => Span::new(self.start.min(other.start), self.end.max(other.end)),
        }
    }
}

impl Default for Span {
    fn default() -> Self {
        Self::UNKNOWN
    }
}

/// An AST node together with where it came from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Spanned<T> {
    pub node: T,
    #[serde(default, skip_serializing_if = "Span::is_dummy")]
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Self { node, span }
    }

    pub fn dummy(node: T) -> Self {
        Self::new(node, Span::UNKNOWN)
    }
}
