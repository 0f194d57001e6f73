//! The Navigation Engine (C4): resolves go-to-definition, find-references,
//! and hover from a cursor position, consulting the BIR view ([`bir`]) and
//! the line index ([`bir_index`]).
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]
mod definition;
mod hover;
mod references;

pub use definition::definition;
pub use hover::hover;
pub use references::references;

/// A half-open character range on a single listing line, expressed in the
/// same char-based coordinates [`bir_listing::tokenize_at`] uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineRange {
    pub line: u32,
    pub start_char: u32,
    pub end_char: u32,
}

/// The outcome of a navigation request. `Found` carries the handler's
/// result; every other variant corresponds to one of spec.md §7's K4/K5
/// failure kinds and is meant to be surfaced as a `window/showMessage`
/// diagnostic plus a `null`/absent LSP result, per the propagation policy
/// — navigation never panics or errors out of the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationOutcome<T> {
    Found(T),
    /// K4: the request named a line outside the document, or the document
    /// itself was never indexed (callers normally catch the latter before
    /// calling in, but an out-of-range line surfaces the same way).
    DocumentNotCached,
    /// K5: no token at cursor, unknown symbol, proxy referent, or no
    /// resolvable address/line, with a human-readable explanation.
    TokenResolution(String),
}

impl<T> NavigationOutcome<T> {
    pub fn found(self) -> Option<T> {
        match self {
            NavigationOutcome::Found(value) => Some(value),
            _ => None,
        }
    }
}

#[cfg(feature = "lsp-compat")]
pub mod lsp_compat {
    //! Conversions from [`LineRange`] to `lsp_types::Range`, gated behind
    //! the `lsp-compat` feature so the navigation crate's core logic does
    //! not depend on LSP wire types.
    use crate::LineRange;
    use lsp_types::{Position, Range};

    impl From<LineRange> for Range {
        fn from(range: LineRange) -> Self {
            Range {
                start: Position { line: range.line, character: range.start_char },
                end: Position { line: range.line, character: range.end_char },
            }
        }
    }
}
