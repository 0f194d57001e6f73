use bir::{Ir, Referent};
use bir_index::Index;

use crate::{LineRange, NavigationOutcome};

/// `textDocument/definition`: spec.md §4.4.
///
/// 1. Tokenize the cursor line at `character`; fail (K5) if empty.
/// 2. Resolve the token as a symbol name; fail if unknown, referent-less,
///    or a proxy block.
/// 3. Find the first listing line for the referent's block.
/// 4. Snap to the preceding function label, if one directly precedes it.
pub fn definition(ir: &Ir, index: &Index, lines: &[String], line: u32, character: u32) -> NavigationOutcome<LineRange> {
    let Some(text) = lines.get(line as usize) else {
        return NavigationOutcome::DocumentNotCached;
    };

    let token = bir_listing::tokenize_at(text, character as usize);
    if token.is_empty() {
        return NavigationOutcome::TokenResolution(format!("no token found for {line}:{character}"));
    }

    let module = ir.module();
    let Some(symbol) = module.symbol_by_name(&token) else {
        return NavigationOutcome::TokenResolution(format!("{token} is not defined"));
    };
    let block_uuid = match symbol.referent {
        Some(Referent::Proxy) | None => {
            return NavigationOutcome::TokenResolution(format!("{token} is not defined"));
        }
        Some(referent) => match referent.block_uuid() {
            Some(uuid) => uuid,
            None => return NavigationOutcome::TokenResolution(format!("{token} is not defined")),
        },
    };

    let Some(first_line) = index.first_line_for_uuid(block_uuid) else {
        return NavigationOutcome::TokenResolution(format!("no definition found for {token}"));
    };

    let target_line =
        bir_listing::preceding_function_line(lines, &token, first_line as usize).map(|l| l as u32).unwrap_or(first_line);

    let Some(target_text) = lines.get(target_line as usize) else {
        return NavigationOutcome::TokenResolution(format!("no definition found for {token}"));
    };

    let (start_char, end_char) = bir_listing::find_token_range(target_text, &token)
        .map(|(s, e)| (s as u32, e as u32))
        .unwrap_or((0, target_text.chars().count() as u32));

    NavigationOutcome::Found(LineRange { line: target_line, start_char, end_char })
}
