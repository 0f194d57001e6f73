use bir::Ir;
use bir_index::Index;

use crate::assembler::Assembler;
use crate::dirty::DirtyTracker;
use crate::error::RewriteError;

/// The `did_save` pipeline (spec.md §4.5): for each dirty block, reassemble
/// its current listing text and stage it; skip blocks whose body is now
/// empty (block deletion is unsupported — spec.md §1's explicit
/// non-goal); apply every staged block in one batch; clear the dirty set
/// only once the batch succeeds. A no-op (`Ok(())`) if nothing is dirty.
pub fn commit(
    ir: &mut Ir,
    tracker: &mut DirtyTracker,
    index: &Index,
    listing_lines: &[String],
    assembler: &mut dyn Assembler,
) -> Result<(), RewriteError> {
    if !tracker.is_dirty() {
        return Ok(());
    }

    let isa = ir.module().isa;
    let mut staged = Vec::new();
    for &block in tracker.dirty_blocks() {
        let asm = index.block_text(block, listing_lines);
        if asm.trim().is_empty() {
            tracing::warn!(?block, "skipping empty block body; block deletion is unsupported");
            continue;
        }
        staged.push((block, asm));
    }

    for (block, asm) in &staged {
        assembler.assemble_block(isa, *block, asm)?;
    }
    assembler.apply(ir.module_mut())?;
    tracker.clear();
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap as Map;

    use bir::{BlockKind, ByteBlock, ByteInterval, Isa, Module};
    use uuid::Uuid;

    use super::*;
    use crate::assembler::LiteralPatchAssembler;
    use crate::error::AssembleError;

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
    fn commit_is_a_no_op_when_nothing_is_dirty() {
        let block = Uuid::from_u128(1);
        let module = module_with_block(block);
        let mut ir = Ir { modules: vec![module] };
        let mut tracker = DirtyTracker::new();
        let index = Index::default();
        let mut assembler = LiteralPatchAssembler::default();

        let result = commit(&mut ir, &mut tracker, &index, &[], &mut assembler);
        assert!(result.is_ok());
        assert!(ir.module().rewritten_blocks.is_empty());
    }

    #[test]
    fn commit_writes_patches_and_clears_dirty_set_on_success() {
        let block = Uuid::from_u128(1);
        let module = module_with_block(block);
        let mut ir = Ir { modules: vec![module.clone()] };
        let index = Index::build(&module, &[(0x1000, 0)]).unwrap_or_default();
        let lines = vec!["mov eax, 1 # EA: 0x1000".to_string()];

        let mut tracker = DirtyTracker::new();
        tracker.mark_range_dirty(&index, &lines, 0, 0);
        let mut assembler = LiteralPatchAssembler::default();

        let result = commit(&mut ir, &mut tracker, &index, &lines, &mut assembler);
        assert!(result.is_ok());
        assert!(!tracker.is_dirty());
        assert_eq!(ir.module().rewritten_blocks.get(&block).map(String::as_str), Some("mov eax, 1"));
    }

    struct FailingAssembler;
    impl Assembler for FailingAssembler {
        fn assemble_block(&self, _isa: Isa, block: Uuid, _asm: &str) -> Result<(), AssembleError> {
            Err(AssembleError::Rejected { block, message: "bad encoding".to_string() })
        }
        fn apply(&mut self, _module: &mut Module) -> Result<(), AssembleError> {
            Ok(())
        }
    }

    #[test]
    fn commit_retains_dirty_set_on_assembler_failure() {
        let block = Uuid::from_u128(1);
        let module = module_with_block(block);
        let mut ir = Ir { modules: vec![module.clone()] };
        let index = Index::build(&module, &[(0x1000, 0)]).unwrap_or_default();
        let lines = vec!["mov eax, 1 # EA: 0x1000".to_string()];

        let mut tracker = DirtyTracker::new();
        tracker.mark_range_dirty(&index, &lines, 0, 0);
        let mut assembler = FailingAssembler;

        let result = commit(&mut ir, &mut tracker, &index, &lines, &mut assembler);
        assert!(result.is_err());
        assert!(tracker.is_dirty());
        assert!(ir.module().rewritten_blocks.is_empty());
    }

    #[test]
    fn commit_skips_blocks_with_empty_assembled_text() {
        let block = Uuid::from_u128(1);
        let module = module_with_block(block);
        let mut ir = Ir { modules: vec![module.clone()] };
        let index = Index::build(&module, &[(0x1000, 0)]).unwrap_or_default();
        let lines = vec!["   # EA: 0x1000".to_string()];

        let mut tracker = DirtyTracker::new();
        tracker.mark_range_dirty(&index, &lines, 0, 0);
        let mut assembler = LiteralPatchAssembler::default();

        let result = commit(&mut ir, &mut tracker, &index, &lines, &mut assembler);
        assert!(result.is_ok());
        assert!(ir.module().rewritten_blocks.is_empty());
        assert!(!tracker.is_dirty());
    }
}
