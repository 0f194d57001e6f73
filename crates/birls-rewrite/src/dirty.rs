use std::collections::{BTreeMap, BTreeSet};

use bir_index::Index;
use uuid::Uuid;

/// Accumulates the set of blocks touched by edits since the last save, plus
/// a first-touch snapshot of each block's assembled text for audit —
/// mirroring the original's `modified_blocks[uri]` set and its debug log of
/// a block's current text the moment it first becomes dirty.
#[derive(Debug, Clone, Default)]
pub struct DirtyTracker {
    dirty_blocks: BTreeSet<Uuid>,
    first_touch_snapshots: BTreeMap<Uuid, String>,
}

impl DirtyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks every block touched by listing lines `start_line..=end_line`
    /// as dirty, snapshotting each block's current text the first time it
    /// is seen.
    pub fn mark_range_dirty(&mut self, index: &Index, listing_lines: &[String], start_line: u32, end_line: u32) {
        for line in start_line..=end_line {
            let Some(offset) = index.offset_by_line.get(&line) else {
                continue;
            };
            let block = offset.element;
            if self.dirty_blocks.insert(block) {
                let snapshot = index.block_text(block, listing_lines);
                self.first_touch_snapshots.insert(block, snapshot);
            }
        }
    }

    pub fn is_dirty(&self) -> bool {
        !self.dirty_blocks.is_empty()
    }

    pub fn dirty_blocks(&self) -> &BTreeSet<Uuid> {
        &self.dirty_blocks
    }

    pub fn snapshot_for(&self, block: Uuid) -> Option<&str> {
        self.first_touch_snapshots.get(&block).map(String::as_str)
    }

    /// Clears the dirty set. Called only after a successful `did_save`
    /// commit; a failed commit must leave the tracker untouched so the next
    /// save attempt retries the same blocks.
    pub fn clear(&mut self) {
        self.dirty_blocks.clear();
        self.first_touch_snapshots.clear();
    }
}

#[cfg(test)]
mod tests {
    use bir::{BlockKind, ByteBlock, ByteInterval, Isa, Module, Offset};
    use std::collections::BTreeMap as Map;

    use super::*;

    fn module_with_block(block: Uuid) -> Module {
        Module {
            name: "m".into(),
            isa: Isa::X64,
            symbols: vec![],
            byte_intervals: vec![ByteInterval { uuid: Uuid::from_u128(9), address: 0x1000, size: 4, symbolic_expressions: Map::new() }],
            byte_blocks: vec![ByteBlock { uuid: block, address: 0x1000, size: 4, kind: BlockKind::Code }],
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
    fn marking_the_same_block_twice_keeps_the_first_snapshot() {
        let block = Uuid::from_u128(1);
        let module = module_with_block(block);
        let addr_lines = vec![(0x1000, 0)];
        let index = Index::build(&module, &addr_lines).unwrap_or_default();
        let lines = vec!["mov eax, 1 # EA: 0x1000".to_string()];

        let mut tracker = DirtyTracker::new();
        tracker.mark_range_dirty(&index, &lines, 0, 0);
        assert_eq!(tracker.snapshot_for(block), Some("mov eax, 1"));

        let changed_lines = vec!["mov eax, 2 # EA: 0x1000".to_string()];
        tracker.mark_range_dirty(&index, &changed_lines, 0, 0);
        assert_eq!(tracker.snapshot_for(block), Some("mov eax, 1"));
        assert_eq!(tracker.dirty_blocks().len(), 1);
    }

    #[test]
    fn clear_empties_dirty_state() {
        let block = Uuid::from_u128(1);
        let module = module_with_block(block);
        let index = Index::build(&module, &[(0x1000, 0)]).unwrap_or_default();
        let lines = vec!["nop # EA: 0x1000".to_string()];

        let mut tracker = DirtyTracker::new();
        tracker.mark_range_dirty(&index, &lines, 0, 0);
        assert!(tracker.is_dirty());
        tracker.clear();
        assert!(!tracker.is_dirty());
        assert_eq!(tracker.snapshot_for(block), None);
    }

    #[test]
    fn offset_without_an_offset_annotation_is_not_tracked() {
        let module = module_with_block(Uuid::from_u128(1));
        let index = Index::default();
        let lines = vec!["nop".to_string()];
        let mut tracker = DirtyTracker::new();
        tracker.mark_range_dirty(&index, &lines, 0, 0);
        assert!(!tracker.is_dirty());
        let _ = module;
        let _ = Offset::new(Uuid::from_u128(1), 0);
    }
}
