use bir::Ir;
use bir_index::Index;

const NO_AUXDATA: &str = "No auxdata found";

/// `textDocument/hover`: spec.md §4.4.
///
/// Three tiers, each falling through to the next on a miss:
/// 1. any offset-indexed aux table (`comments` plus free-form tables) keyed
///    by the cursor line's offset, rendered as plain text;
/// 2. a function's decompiled source, rendered as fenced `c` code blocks
///    titled by source name, keyed by `parse_function_name` on the cursor
///    line itself (a label/`.globl`/`.type` line, not the token under the
///    cursor);
/// 3. that function's prototype, via `prototype_table`/`type_table`, keyed
///    by the token under the cursor (with a trailing `@PLT` stripped, since
///    PLT stub call targets are named after the real function).
///
/// [`NO_AUXDATA`] is returned if nothing in any tier resolves.
pub fn hover(ir: &Ir, index: &Index, lines: &[String], line: u32, character: u32) -> String {
    let module = ir.module();

    if let Some(&offset) = index.offset_by_line.get(&line) {
        if let Some(text) = module.offset_to_aux_text(offset) {
            return text;
        }
    }

    let Some(text) = lines.get(line as usize) else {
        return NO_AUXDATA.to_string();
    };

    if let Some(function_name) = bir_listing::parse_function_name(text) {
        if let Some(function_uuid) = module.function_uuid_for_name(&function_name) {
            if let Some(sources) = module.function_sources.get(&function_uuid) {
                let rendered: Vec<String> = sources
                    .iter()
                    .filter(|(_, source_text)| !source_text.trim().is_empty())
                    .map(|(source_name, source_text)| format!("## {source_name}\n```c\n{}\n```", source_text.trim()))
                    .collect();
                if !rendered.is_empty() {
                    return rendered.join("\n\n");
                }
            }
        }
    }

    let token = bir_listing::tokenize_at(text, character as usize);
    if token.is_empty() {
        return NO_AUXDATA.to_string();
    }
    let stripped = token.strip_suffix("@PLT").unwrap_or(&token);

    let Some(function_uuid) = module.function_uuid_for_name(stripped) else {
        return NO_AUXDATA.to_string();
    };

    if let Some(type_uuid) = module.prototype_table.get(&function_uuid) {
        if let Some(prototype) = module.type_table.get(type_uuid) {
            return prototype.clone();
        }
    }

    NO_AUXDATA.to_string()
}
