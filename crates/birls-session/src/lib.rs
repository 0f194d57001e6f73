//! The Session Manager (C6): per-document lifecycle, path resolution
//! (local and remote), the session registry, and the five editor-facing
//! custom commands (spec.md §4.6).
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]
mod commands;
mod path;
mod remote;
mod session;

pub use commands::{
    get_address_of_symbol, get_function_locations, get_line_address_list, get_line_from_address, get_module_name,
    LineAddress,
};
pub use path::{parse_listing_path, parse_listing_uri, ResolvedPaths};
pub use remote::{ensure_cached, remote_cache_path, RemoteClient};
pub use session::{Session, SessionRegistry};
