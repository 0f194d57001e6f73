//! The BIR data model: modules, blocks, symbols, symbolic expressions, the
//! control-flow graph, and the auxiliary data tables a module carries.
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

/// Instruction set a module was disassembled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Isa {
    X86,
    X64,
    Arm,
    Arm64,
    Mips32,
    Mips64,
    Ppc32,
    Ppc64,
}

/// What a symbol's body actually is: a code block, a data block, or a
/// proxy — a sentinel meaning "no body defined in this module".
///
/// Every navigation path must check for [`Referent::Proxy`] explicitly
/// before treating a referent as an addressable location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "uuid", rename_all = "lowercase")]
pub enum Referent {
    Code(Uuid),
    Data(Uuid),
    Proxy,
}

impl Referent {
    /// The block UUID this referent points at, or `None` for a proxy.
    pub fn block_uuid(&self) -> Option<Uuid> {
        match self {
            Referent::Code(uuid) | Referent::Data(uuid) => Some(*uuid),
            Referent::Proxy => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    pub uuid: Uuid,
    pub name: String,
    pub referent: Option<Referent>,
}

/// A symbolic expression attached to a byte interval displacement: a
/// reference to one symbol, or to a sum of two symbols. `all_symbolic_expressions`
/// canonicalizes a two-symbol expression to its first symbol, reproducing
/// the original server's choice exactly (see DESIGN.md Open Question 3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum SymExpr {
    Addr { symbol: Uuid },
    AddrAddend { symbol1: Uuid, symbol2: Uuid },
}

impl SymExpr {
    /// The canonical symbol this expression references for cross-reference purposes.
    pub fn canonical_symbol(&self) -> Uuid {
        match self {
            SymExpr::Addr { symbol } => *symbol,
            SymExpr::AddrAddend { symbol1, .. } => *symbol1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ByteInterval {
    pub uuid: Uuid,
    pub address: u64,
    pub size: u64,
    /// Symbolic expressions keyed by their displacement within this interval.
    pub symbolic_expressions: BTreeMap<u64, SymExpr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockKind {
    Code,
    Data,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ByteBlock {
    pub uuid: Uuid,
    pub address: u64,
    pub size: u64,
    pub kind: BlockKind,
}

impl ByteBlock {
    /// Whether `addr` falls within `[address, address + size)`.
    pub fn covers(&self, addr: u64) -> bool {
        addr >= self.address && addr < self.address + self.size
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CfgEdge {
    pub source: Uuid,
    pub target: Uuid,
}

/// A point inside a block: `displacement` bytes past `element`'s start.
///
/// `displacement` is signed because [`crate::query::references`] can
/// legitimately produce a negative value for an address landing on a
/// block's first byte (the "-1" bias, see DESIGN.md Open Question 4 and
/// SPEC_FULL.md §3); such offsets never resolve to a listing line but must
/// not panic or wrap when constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Offset {
    pub element: Uuid,
    pub displacement: i64,
}

impl Offset {
    pub fn new(element: Uuid, displacement: i64) -> Self {
        Self { element, displacement }
    }
}

/// `Offset` renders as `{uuid}:{displacement}` so it can serve as a JSON
/// object key (`comments`/`AuxTable::OffsetIndexed` are keyed by `Offset`,
/// and JSON object keys must be strings, unlike the struct's in-memory
/// shape). Mirrors `bir_index`'s hex-uuid encoding of the on-disk index.
impl fmt::Display for Offset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.element.simple(), self.displacement)
    }
}

impl FromStr for Offset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (uuid_part, disp_part) = s.split_once(':').ok_or_else(|| format!("malformed offset key: {s}"))?;
        let element = Uuid::parse_str(uuid_part).map_err(|e| format!("malformed offset key {s}: {e}"))?;
        let displacement = disp_part.parse::<i64>().map_err(|e| format!("malformed offset key {s}: {e}"))?;
        Ok(Offset { element, displacement })
    }
}

impl Serialize for Offset {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Offset {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct OffsetVisitor;
        impl Visitor<'_> for OffsetVisitor {
            type Value = Offset;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a string of the form <uuid>:<displacement>")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Offset, E> {
                v.parse().map_err(de::Error::custom)
            }
        }
        deserializer.deserialize_str(OffsetVisitor)
    }
}

/// A generic aux-data table that isn't one of the named tables `Module`
/// exposes dedicated accessors for. Known shapes are enumerated rather than
/// modeled as a dynamically typed value, per SPEC_FULL.md §3/§9.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "shape")]
pub enum AuxTable {
    OffsetIndexed(BTreeMap<Offset, String>),
    UuidIndexed(BTreeMap<Uuid, String>),
    Other(serde_json::Value),
}

/// The generic lookup result of [`crate::Ir::get_by_uuid`].
#[derive(Debug, Clone, Copy)]
pub enum Node<'a> {
    Code(&'a ByteBlock),
    Data(&'a ByteBlock),
    Symbol(&'a Symbol),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Module {
    pub name: String,
    pub isa: Isa,
    pub symbols: Vec<Symbol>,
    pub byte_intervals: Vec<ByteInterval>,
    pub byte_blocks: Vec<ByteBlock>,
    pub cfg: Vec<CfgEdge>,

    /// `functionNames`: function UUID -> the name of its entry symbol.
    #[serde(default)]
    pub function_names: BTreeMap<Uuid, String>,
    /// `functionBlocks`: function UUID -> the code blocks that make it up.
    #[serde(default)]
    pub function_blocks: BTreeMap<Uuid, Vec<Uuid>>,
    /// `functionSources`: function UUID -> source name -> decompiled text.
    #[serde(default)]
    pub function_sources: BTreeMap<Uuid, BTreeMap<String, String>>,
    /// `prototypeTable`: function UUID -> type id in `type_table`.
    #[serde(default)]
    pub prototype_table: BTreeMap<Uuid, Uuid>,
    /// `typeTable`: type id -> rendered C prototype string.
    #[serde(default)]
    pub type_table: BTreeMap<Uuid, String>,
    /// `comments`: offset -> free-form comment text.
    #[serde(default)]
    pub comments: BTreeMap<Offset, String>,
    /// Any further aux tables not named above, surfaced for hover only.
    #[serde(default)]
    pub aux_data: BTreeMap<String, AuxTable>,

    /// Block UUID -> the literal assembly text the rewrite pipeline last
    /// committed for it. This is the substitution for the real assembler's
    /// output (see `birls-rewrite::LiteralPatchAssembler` and DESIGN.md
    /// Open Question 2): instead of re-encoding machine code, a committed
    /// rewrite records the replacement source text directly on the block,
    /// so a reload of the BIR after `did_save` observes the edit.
    #[serde(default)]
    pub rewritten_blocks: BTreeMap<Uuid, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ir {
    pub modules: Vec<Module>,
}
