//! Shared error type for the birls workspace.
//!
//! Every crate in this workspace defines its own narrow error enum for the
//! failures it can produce; this crate defines the eight error kinds named
//! in the server's error handling design (K1 through K8) and converts the
//! per-crate errors into them at the points where they cross into session
//! or dispatch logic.
//!
//! # Propagation policy
//!
//! - [`Error::IndexStale`] is recovered locally by rebuilding the index; it
//!   should rarely escape the session layer.
//! - [`Error::PathMalformed`], [`Error::DocumentNotCached`],
//!   [`Error::TokenResolution`], [`Error::Assembler`], and
//!   [`Error::AddressOutOfRange`] surface as a `window/showMessage`
//!   diagnostic plus a `null`/absent result; the session remains usable.
//! - [`Error::BirLoad`] and [`Error::RemoteIo`] abort the open and leave the
//!   URI unregistered; subsequent requests against that URI see
//!   [`Error::DocumentNotCached`].
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]
use std::fmt;

/// The eight error kinds a session or dispatch handler can observe.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// K1: the listing URI did not fit the `<dir>/.vscode.<birname>/<isa>/<birname>.view` shape.
    #[error("path does not match the expected listing layout: {0}")]
    PathMalformed(String),

    /// K2: the BIR failed to decode, or its file was missing.
    #[error("failed to load BIR: {0}")]
    BirLoad(String),

    /// K3: the on-disk index was unreadable or failed to parse.
    #[error("index is stale or unreadable: {0}")]
    IndexStale(String),

    /// K4: a request named a URI with no open session.
    #[error("document is not open: {0}")]
    DocumentNotCached(String),

    /// K5: no token at cursor, unknown symbol, proxy referent, or no address.
    #[error("could not resolve token: {0}")]
    TokenResolution(String),

    /// K6: the rewrite batch was rejected by the assembler.
    #[error("assembler rejected the rewrite batch: {0}")]
    Assembler(String),

    /// K7: the remote client did not honor a custom request.
    #[error("remote I/O failure: {0}")]
    RemoteIo(String),

    /// K8: no block covers the requested address.
    #[error("address out of range: {0}")]
    AddressOutOfRange(String),
}

impl Error {
    /// Whether this error should be surfaced to the editor user via
    /// `window/showMessage`, as opposed to logged at debug level only.
    pub fn is_user_visible(&self) -> bool {
        !matches!(self, Error::IndexStale(_))
    }

    /// Whether encountering this error should tear down the session for its URI.
    pub fn aborts_session(&self) -> bool {
        matches!(self, Error::BirLoad(_) | Error::RemoteIo(_))
    }
}

/// A shorthand `Result` alias used throughout the workspace's outer crates.
pub type Result<T> = std::result::Result<T, Error>;

/// Minimal JSON-RPC-facing projection of an [`Error`], used when a custom
/// command needs to hand its failure back over the wire as structured data
/// rather than just a display string.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ErrorPayload {
    pub kind: &'static str,
    pub message: String,
}

impl fmt::Display for ErrorPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl From<&Error> for ErrorPayload {
    fn from(err: &Error) -> Self {
        let kind = match err {
            Error::PathMalformed(_) => "path_malformed",
            Error::BirLoad(_) => "bir_load",
            Error::IndexStale(_) => "index_stale",
            Error::DocumentNotCached(_) => "document_not_cached",
            Error::TokenResolution(_) => "token_resolution",
            Error::Assembler(_) => "assembler",
            Error::RemoteIo(_) => "remote_io",
            Error::AddressOutOfRange(_) => "address_out_of_range",
        };
        ErrorPayload { kind, message: err.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_stale_is_not_user_visible() {
        let err = Error::IndexStale("bad json".into());
        assert!(!err.is_user_visible());
        assert!(!err.aborts_session());
    }

    #[test]
    fn bir_load_aborts_session_and_is_visible() {
        let err = Error::BirLoad("missing file".into());
        assert!(err.is_user_visible());
        assert!(err.aborts_session());
    }

    #[test]
    fn payload_kind_matches_variant() {
        let err = Error::AddressOutOfRange("0xdead".into());
        let payload: ErrorPayload = (&err).into();
        assert_eq!(payload.kind, "address_out_of_range");
    }
}
