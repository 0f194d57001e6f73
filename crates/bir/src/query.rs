//! The BIR View (C1): a stateless, read-only facade over a loaded [`Ir`].
use uuid::Uuid;

use crate::types::{AuxTable, ByteBlock, Ir, Module, Node, Offset, Referent};

impl Ir {
    /// The sole module this system ever consults. BIRs with zero modules
    /// are rejected at load time (see [`crate::io::load`]), so this never panics.
    pub fn module(&self) -> &Module {
        &self.modules[0]
    }

    /// Mutable access to `module[0]`, used by the rewrite pipeline to
    /// commit a patch's replacement text before the BIR is saved back to
    /// disk.
    pub fn module_mut(&mut self) -> &mut Module {
        &mut self.modules[0]
    }
}

impl Module {
    /// The first symbol whose name matches exactly.
    pub fn symbol_by_name(&self, name: &str) -> Option<&crate::types::Symbol> {
        self.symbols.iter().find(|s| s.name == name)
    }

    /// Every block covering `addr`.
    pub fn byte_blocks_on(&self, addr: u64) -> impl Iterator<Item = &ByteBlock> {
        self.byte_blocks.iter().filter(move |b| b.covers(addr))
    }

    /// Generic lookup across code blocks, data blocks, and symbols.
    pub fn get_by_uuid(&self, uuid: Uuid) -> Option<Node<'_>> {
        if let Some(symbol) = self.symbols.iter().find(|s| s.uuid == uuid) {
            return Some(Node::Symbol(symbol));
        }
        self.byte_blocks.iter().find(|b| b.uuid == uuid).map(|b| match b.kind {
            crate::types::BlockKind::Code => Node::Code(b),
            crate::types::BlockKind::Data => Node::Data(b),
        })
    }

    /// CFG edges whose target is `block`.
    pub fn in_edges(&self, block: Uuid) -> impl Iterator<Item = &crate::types::CfgEdge> {
        self.cfg.iter().filter(move |e| e.target == block)
    }

    /// CFG edges whose source is `block`.
    pub fn out_edges(&self, block: Uuid) -> impl Iterator<Item = &crate::types::CfgEdge> {
        self.cfg.iter().filter(move |e| e.source == block)
    }

    /// The block's base address, if it is a known byte block.
    pub fn block_address(&self, uuid: Uuid) -> Option<u64> {
        self.byte_blocks.iter().find(|b| b.uuid == uuid).map(|b| b.address)
    }

    /// Every symbolic expression in the module, expressed as
    /// `(absolute_address, referenced_symbol_uuid)`. A two-symbol
    /// expression contributes only its canonical (first) symbol. This is
    /// the canonical cross-reference source used by [`crate::query::references_to`].
    pub fn all_symbolic_expressions(&self) -> Vec<(u64, Uuid)> {
        let mut out = Vec::new();
        for interval in &self.byte_intervals {
            for (disp, expr) in &interval.symbolic_expressions {
                out.push((interval.address + disp, expr.canonical_symbol()));
            }
        }
        out
    }

    /// Symbol UUIDs whose referent is `block`.
    pub fn symbols_referencing(&self, block: Uuid) -> Vec<Uuid> {
        self.symbols
            .iter()
            .filter(|s| matches!(s.referent.and_then(|r| r.block_uuid()), Some(b) if b == block))
            .map(|s| s.uuid)
            .collect()
    }

    /// Names of the aux tables whose keys are [`Offset`]s: the named
    /// `comments` table, plus any entry in the free-form `aux_data` map
    /// whose shape is [`AuxTable::OffsetIndexed`].
    pub fn offset_indexed_aux_data_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        if !self.comments.is_empty() {
            names.push("comments");
        }
        for (name, table) in &self.aux_data {
            if matches!(table, AuxTable::OffsetIndexed(_)) {
                names.push(name.as_str());
            }
        }
        names
    }

    /// Concatenation of `"{name}: {value}\n"` across every offset-indexed
    /// aux table with an entry at `offset`; `None` if none has one.
    pub fn offset_to_aux_text(&self, offset: Offset) -> Option<String> {
        let mut text = String::new();
        if let Some(value) = self.comments.get(&offset) {
            text.push_str(&format!("comments: {value}\n"));
        }
        for (name, table) in &self.aux_data {
            if let AuxTable::OffsetIndexed(map) = table {
                if let Some(value) = map.get(&offset) {
                    text.push_str(&format!("{name}: {value}\n"));
                }
            }
        }
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }

    /// Inverts `function_blocks`: which function (if any) owns `block`.
    pub fn function_for_block(&self, block: Uuid) -> Option<Uuid> {
        self.function_blocks
            .iter()
            .find(|(_, blocks)| blocks.contains(&block))
            .map(|(function, _)| *function)
    }

    /// The function UUID whose entry symbol (per `function_names`) is named `name`.
    pub fn function_uuid_for_name(&self, name: &str) -> Option<Uuid> {
        self.function_names.iter().find(|(_, n)| n.as_str() == name).map(|(uuid, _)| *uuid)
    }
}
