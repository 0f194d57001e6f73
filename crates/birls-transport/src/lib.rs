//! `Content-Length`-framed JSON message transport, the same wire framing
//! every LSP server/client uses regardless of which side of stdio or TCP
//! it sits on. See [`framing`] for the read/write primitives.
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]
#![deny(unsafe_code)]
#![warn(missing_docs)]

mod framing;

pub use framing::{log_response, read_message, write_message, write_notification};
