//! The Index (C3): the bidirectional `line <-> Offset` mapping, its
//! persistence format, and the tolerant reverse lookup used by reference
//! resolution.
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]
pub mod error;

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use bir::{Module, Offset};
use uuid::Uuid;

pub use error::IndexError;

/// Bytes the tolerant reverse lookup is willing to walk backward looking
/// for a line, accommodating symbolic-expression addresses that land in
/// the interior of an instruction rather than at its first byte.
pub const DISPLACEMENT_INTERVAL: i64 = 5;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Index {
    pub offset_by_line: BTreeMap<u32, Offset>,
    pub line_by_offset: BTreeMap<Offset, u32>,
}

impl Index {
    /// Builds the index by joining the listing parser's `(address, line)`
    /// pairs with a dense `address -> Offset` map derived from every block
    /// in `module`. Rejects BIRs where two blocks cover the same address
    /// (invariant I1/I2 in SPEC_FULL.md §3).
    pub fn build(module: &Module, addr_lines: &[(u64, usize)]) -> Result<Index, IndexError> {
        let mut addr_to_offset: BTreeMap<u64, Offset> = BTreeMap::new();
        for block in &module.byte_blocks {
            for i in 0..block.size {
                let addr = block.address + i;
                let offset = Offset::new(block.uuid, i as i64);
                if let Some(existing) = addr_to_offset.get(&addr) {
                    if existing.element != block.uuid {
                        return Err(IndexError::OverlappingBlocks { address: addr, first: existing.element, second: block.uuid });
                    }
                }
                addr_to_offset.insert(addr, offset);
            }
        }

        let mut index = Index::default();
        for &(addr, line) in addr_lines {
            if let Some(offset) = addr_to_offset.get(&addr) {
                let line = line as u32;
                index.offset_by_line.insert(line, *offset);
                index.line_by_offset.insert(*offset, line);
            }
        }
        Ok(index)
    }

    /// Exact or tolerant reverse lookup: tries `offset` exactly, then walks
    /// its displacement downward one byte at a time up to
    /// [`DISPLACEMENT_INTERVAL`] bytes, returning the first line found.
    pub fn offset_to_line(&self, offset: Offset) -> Option<u32> {
        if let Some(&line) = self.line_by_offset.get(&offset) {
            return Some(line);
        }
        for step in 1..=DISPLACEMENT_INTERVAL {
            let candidate = Offset::new(offset.element, offset.displacement - step);
            if let Some(&line) = self.line_by_offset.get(&candidate) {
                return Some(line);
            }
        }
        None
    }

    /// The minimum line number among all offsets whose block is `uuid`.
    pub fn first_line_for_uuid(&self, uuid: Uuid) -> Option<u32> {
        self.offset_by_line
            .iter()
            .filter(|(_, offset)| offset.element == uuid)
            .map(|(&line, _)| line)
            .min()
    }

    /// The ordered list of lines touching any offset of `block`.
    pub fn block_lines(&self, block: Uuid) -> Vec<u32> {
        let mut lines: Vec<u32> = self.offset_by_line.iter().filter(|(_, offset)| offset.element == block).map(|(&line, _)| line).collect();
        lines.sort_unstable();
        lines
    }

    /// `block_lines(block)` joined with `\n`, each line first stripped at
    /// its first `#` and trimmed of trailing whitespace.
    pub fn block_text(&self, block: Uuid, listing_lines: &[String]) -> String {
        self.block_lines(block)
            .into_iter()
            .filter_map(|line| listing_lines.get(line as usize))
            .map(|line| line.split('#').next().unwrap_or("").trim_end())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Serializes as an ordered `[[line, [uuid_hex32, displacement]], ...]` array.
    pub fn save(&self, path: &Path) -> Result<(), IndexError> {
        let entries: Vec<(u32, (String, i64))> =
            self.offset_by_line.iter().map(|(&line, offset)| (line, (offset.element.simple().to_string(), offset.displacement))).collect();
        let bytes = serde_json::to_vec(&entries).map_err(|source| IndexError::Encode { path: path.to_path_buf(), source })?;
        fs::write(path, bytes).map_err(|source| IndexError::Write { path: path.to_path_buf(), source })
    }

    /// Loads a previously saved index. Any parse failure is surfaced as an
    /// error so the caller can fall back to rebuilding from the listing (K3).
    pub fn load(path: &Path) -> Result<Index, IndexError> {
        let bytes = fs::read(path).map_err(|source| IndexError::Read { path: path.to_path_buf(), source })?;
        let entries: Vec<(u32, (String, i64))> = serde_json::from_slice(&bytes).map_err(|source| IndexError::Parse { path: path.to_path_buf(), source })?;

        let mut index = Index::default();
        for (line, (uuid_hex, displacement)) in entries {
            let uuid = Uuid::parse_str(&uuid_hex).map_err(|source| IndexError::InvalidUuid { uuid: uuid_hex, source })?;
            let offset = Offset::new(uuid, displacement);
            index.offset_by_line.insert(line, offset);
            index.line_by_offset.insert(offset, line);
        }
        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bir::{BlockKind, ByteBlock, ByteInterval, Isa, Module};
    use std::collections::BTreeMap as Map;

    fn sample_module() -> Module {
        Module {
            name: "m".into(),
            isa: Isa::X64,
            symbols: vec![],
            byte_intervals: vec![ByteInterval { uuid: Uuid::from_u128(100), address: 0x1000, size: 16, symbolic_expressions: Map::new() }],
            byte_blocks: vec![ByteBlock { uuid: Uuid::from_u128(1), address: 0x1000, size: 4, kind: BlockKind::Code }],
            cfg: vec![],
            function_names: Map::new(),
            function_blocks: Map::new(),
            function_sources: Map::new(),
            prototype_table: Map::new(),
            type_table: Map::new(),
            comments: Map::new(),
            aux_data: Map::new(),
            rewritten_blocks: Map::new(),
        }
    }

    #[test]
    fn build_creates_bijection() {
        let module = sample_module();
        let addr_lines = vec![(0x1000, 0), (0x1002, 1)];
        let index = Index::build(&module, &addr_lines).unwrap();
        for (&line, &offset) in &index.offset_by_line {
            assert_eq!(index.line_by_offset.get(&offset), Some(&line));
        }
        assert_eq!(index.offset_by_line.len(), 2);
    }

    #[test]
    fn build_rejects_overlapping_blocks() {
        let mut module = sample_module();
        module.byte_blocks.push(ByteBlock { uuid: Uuid::from_u128(2), address: 0x1000, size: 4, kind: BlockKind::Code });
        let result = Index::build(&module, &[]);
        assert!(matches!(result, Err(IndexError::OverlappingBlocks { .. })));
    }

    #[test]
    fn offset_to_line_is_tolerant_within_interval() {
        let module = sample_module();
        let addr_lines = vec![(0x1000, 0)];
        let index = Index::build(&module, &addr_lines).unwrap();
        let exact = Offset::new(Uuid::from_u128(1), 0);
        let near = Offset::new(Uuid::from_u128(1), 3);
        let far = Offset::new(Uuid::from_u128(1), 10);
        assert_eq!(index.offset_to_line(exact), Some(0));
        assert_eq!(index.offset_to_line(near), Some(0));
        assert_eq!(index.offset_to_line(far), None);
    }

    #[test]
    fn round_trips_through_disk() {
        let module = sample_module();
        let addr_lines = vec![(0x1000, 0), (0x1002, 1)];
        let index = Index::build(&module, &addr_lines).unwrap();

        let path = std::env::temp_dir().join(format!("birls-index-test-{}.json", std::process::id()));
        index.save(&path).unwrap();
        let loaded = Index::load(&path).unwrap();
        assert_eq!(loaded, index);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn block_text_strips_comment_and_trims() {
        let module = sample_module();
        let addr_lines = vec![(0x1000, 0), (0x1001, 1)];
        let index = Index::build(&module, &addr_lines).unwrap();
        let listing = vec!["mov eax, 1 # EA: 0x1000   ".to_string(), "nop # EA: 0x1001".to_string()];
        let text = index.block_text(Uuid::from_u128(1), &listing);
        assert_eq!(text, "mov eax, 1 \nnop ");
    }
}
