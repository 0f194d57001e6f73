use std::cell::RefCell;
use std::collections::BTreeMap;

use bir::{Isa, Module};
use uuid::Uuid;

use crate::error::AssembleError;

/// The rewriting backend boundary spec.md §1 places out of scope as an
/// external collaborator (the real `gtirb_rewriting`/assembler library).
/// `assemble_block` stages one block's replacement; `apply` commits every
/// staged block to `module` in a single batch, matching `did_save`'s
/// atomic-apply step (spec.md §4.5 point 4).
pub trait Assembler {
    fn assemble_block(&self, isa: Isa, block: Uuid, asm: &str) -> Result<(), AssembleError>;
    fn apply(&mut self, module: &mut Module) -> Result<(), AssembleError>;
}

/// Default [`Assembler`]: rather than invoking a real x86/ARM assembler
/// (unavailable in this workspace's dependency stack), it records each
/// block's literal replacement source and, on `apply`, writes it straight
/// into [`Module::rewritten_blocks`]. This stands in for the original's
/// `RewritingContext` + literal-patch registration, without re-encoding
/// machine code.
#[derive(Debug, Default)]
pub struct LiteralPatchAssembler {
    pending: RefCell<BTreeMap<Uuid, String>>,
}

impl Assembler for LiteralPatchAssembler {
    fn assemble_block(&self, _isa: Isa, block: Uuid, asm: &str) -> Result<(), AssembleError> {
        self.pending.borrow_mut().insert(block, asm.to_string());
        Ok(())
    }

    fn apply(&mut self, module: &mut Module) -> Result<(), AssembleError> {
        let pending = self.pending.get_mut();
        module.rewritten_blocks.extend(pending.iter().map(|(uuid, asm)| (*uuid, asm.clone())));
        pending.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap as Map;

    use bir::{BlockKind, ByteBlock, ByteInterval};
    use uuid::Uuid;

    use super::*;

    fn empty_module() -> Module {
        Module {
            name: "m".into(),
            isa: Isa::X64,
            symbols: vec![],
            byte_intervals: Vec::<ByteInterval>::new(),
            byte_blocks: Vec::<ByteBlock>::new(),
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
    fn apply_writes_staged_patches_and_drains_pending() {
        let mut assembler = LiteralPatchAssembler::default();
        let block = Uuid::from_u128(1);
        assembler.assemble_block(Isa::X64, block, "mov eax, 1").unwrap_or_default();

        let mut module = empty_module();
        assembler.apply(&mut module).unwrap_or_default();

        assert_eq!(module.rewritten_blocks.get(&block).map(String::as_str), Some("mov eax, 1"));
        assert!(assembler.pending.borrow().is_empty());
    }

    #[test]
    fn blocks_assembled_after_apply_are_not_already_present() {
        let assembler = LiteralPatchAssembler::default();
        let block = Uuid::from_u128(2);
        assembler.assemble_block(Isa::Arm64, block, "bl decode").unwrap_or_default();
        assert_eq!(assembler.pending.borrow().get(&block).map(String::as_str), Some("bl decode"));
    }
}
