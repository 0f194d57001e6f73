use bir::{Ir, Offset, Referent};
use bir_index::Index;

use crate::{LineRange, NavigationOutcome};

/// `textDocument/references`: spec.md §4.4.
///
/// If the token under the cursor resolves to a symbol (and it isn't a
/// proxy referent), references are resolved against that symbol's
/// defining block; otherwise the cursor's own line stands in for it. Every
/// symbol that refers to that block is then cross-referenced against the
/// module's symbolic expressions, each hit offset by the `-1` byte bias
/// (spec.md §9, DESIGN.md Open Question 3) before the tolerant reverse
/// lookup turns it back into a listing line.
pub fn references(ir: &Ir, index: &Index, lines: &[String], line: u32, character: u32) -> NavigationOutcome<Vec<LineRange>> {
    let Some(text) = lines.get(line as usize) else {
        return NavigationOutcome::DocumentNotCached;
    };

    let token = bir_listing::tokenize_at(text, character as usize);
    if token.is_empty() {
        return NavigationOutcome::TokenResolution(format!("no token found for {line}:{character}"));
    }

    let module = ir.module();
    let symbol = module.symbol_by_name(&token);

    let reference_line = match symbol {
        None => line,
        Some(sym) => match sym.referent {
            Some(Referent::Proxy) => line,
            None => return NavigationOutcome::TokenResolution(format!("symbol for {token} not found")),
            Some(referent) => {
                let Some(uuid) = referent.block_uuid() else {
                    return NavigationOutcome::TokenResolution(format!("symbol for {token} not found"));
                };
                match index.first_line_for_uuid(uuid) {
                    Some(l) => l,
                    None => return NavigationOutcome::TokenResolution(format!("no definition found for {token}")),
                }
            }
        },
    };

    let Some(&block_offset) = index.offset_by_line.get(&reference_line) else {
        return NavigationOutcome::TokenResolution(format!("no offset found for line {reference_line}"));
    };
    let block = block_offset.element;

    let referring_symbols = module.symbols_referencing(block);
    if referring_symbols.is_empty() {
        return NavigationOutcome::TokenResolution(format!("no references found for line {reference_line}"));
    }

    let matches: Vec<(u64, uuid::Uuid)> =
        module.all_symbolic_expressions().into_iter().filter(|(_, sym)| referring_symbols.contains(sym)).collect();
    if matches.is_empty() {
        return NavigationOutcome::TokenResolution(format!("no references found for line {reference_line}"));
    }

    let mut lines_and_symbols: Vec<(u32, uuid::Uuid)> = Vec::new();
    for (addr, sym_uuid) in matches {
        for block in module.byte_blocks_on(addr) {
            let displacement = (addr as i64 - block.address as i64) - 1;
            let offset = Offset::new(block.uuid, displacement);
            if let Some(found_line) = index.offset_to_line(offset) {
                lines_and_symbols.push((found_line, sym_uuid));
            }
        }
    }
    if lines_and_symbols.is_empty() {
        return NavigationOutcome::TokenResolution(format!("no lines found for references to line {reference_line}"));
    }

    let mut locations = Vec::with_capacity(lines_and_symbols.len());
    for (found_line, sym_uuid) in lines_and_symbols {
        let Some(symbol) = module.symbols.iter().find(|s| s.uuid == sym_uuid) else {
            continue;
        };
        let Some(reference_text) = lines.get(found_line as usize) else {
            continue;
        };
        // Matches the original's `reference_line.find(symbol.name) > 0`
        // quirk exactly: a match at character 0 is treated the same as no
        // match, falling back to the whole line (DESIGN.md grounding).
        let range = match bir_listing::find_token_range(reference_text, &symbol.name) {
            Some((start, end)) if start > 0 => LineRange { line: found_line, start_char: start as u32, end_char: end as u32 },
            _ => LineRange { line: found_line, start_char: 0, end_char: reference_text.chars().count() as u32 },
        };
        locations.push(range);
    }

    NavigationOutcome::Found(locations)
}
