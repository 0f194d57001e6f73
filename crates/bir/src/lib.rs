//! The BIR View (C1): a read-mostly data model and query facade over a
//! decoded binary intermediate representation.
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]
pub mod error;
pub mod io;
mod query;
pub mod types;

pub use error::BirError;
pub use types::{
    AuxTable, BlockKind, ByteBlock, ByteInterval, CfgEdge, Ir, Isa, Module, Node, Offset, Referent, SymExpr, Symbol,
};
