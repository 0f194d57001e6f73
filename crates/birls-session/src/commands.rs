//! The five editor-facing custom commands named in spec.md §4.6. Each
//! takes the already-resolved [`Session`] plus whatever extra parameter the
//! command needs, and returns a plain domain value or a [`birls_error::Error`]
//! for the caller to turn into a `window/showMessage` diagnostic.
use bir::{Ir, Offset, Referent};
use birls_error::Error;
use birls_navigation::LineRange;

use crate::session::Session;

/// One entry of `getLineAddressList`'s result: `[line, address]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineAddress {
    pub line: u32,
    pub address: u64,
}

fn parse_hex_addr(hex_addr: &str) -> Result<u64, Error> {
    let trimmed = hex_addr.strip_prefix("0x").unwrap_or(hex_addr);
    u64::from_str_radix(trimmed, 16).map_err(|_| Error::TokenResolution(format!("invalid hex address: {hex_addr}")))
}

/// `getLineFromAddress(uri, hex_addr)`: translates an address to the
/// listing line that covers it, via the block whose range contains the
/// address and the tolerant reverse lookup (K8 if no block covers it, K5
/// on malformed hex).
pub fn get_line_from_address(session: &Session, hex_addr: &str) -> Result<LineRange, Error> {
    let addr = parse_hex_addr(hex_addr)?;
    let module = session.ir.module();
    let Some(block) = module.byte_blocks_on(addr).next() else {
        return Err(Error::AddressOutOfRange(hex_addr.to_string()));
    };
    let displacement = (addr - block.address) as i64;
    let offset = Offset::new(block.uuid, displacement);
    let Some(line) = session.index.offset_to_line(offset) else {
        return Err(Error::AddressOutOfRange(hex_addr.to_string()));
    };
    let text = session.lines.get(line as usize).map(String::as_str).unwrap_or("");
    Ok(LineRange { line, start_char: 0, end_char: text.chars().count() as u32 })
}

/// `getAddressOfSymbol(uri, name)`: `None` if the symbol is unknown, has no
/// referent, or its referent is a [`Referent::Proxy`].
pub fn get_address_of_symbol(session: &Session, name: &str) -> Option<String> {
    let module = session.ir.module();
    let symbol = module.symbol_by_name(name)?;
    let block_uuid = match symbol.referent {
        Some(Referent::Proxy) | None => return None,
        Some(referent) => referent.block_uuid()?,
    };
    let address = module.block_address(block_uuid)?;
    Some(format!("{address:#x}"))
}

/// `getLineAddressList(uri)`: every `(line, address)` pair currently in the
/// session's index, ordered by line.
pub fn get_line_address_list(session: &Session) -> Vec<LineAddress> {
    let module = session.ir.module();
    session
        .index
        .offset_by_line
        .iter()
        .filter_map(|(&line, offset)| {
            let base = module.block_address(offset.element)?;
            let address = (base as i64 + offset.displacement) as u64;
            Some(LineAddress { line, address })
        })
        .collect()
}

/// `getFunctionLocations(uri)`: one [`LineRange`] per entry in
/// `functionNames`, anchored to the function's label line when one
/// directly precedes its first instruction.
pub fn get_function_locations(session: &Session) -> Vec<LineRange> {
    let module = session.ir.module();
    let mut locations = Vec::new();
    for (function_uuid, name) in &module.function_names {
        let Some(blocks) = module.function_blocks.get(function_uuid) else {
            continue;
        };
        let Some(first_line) = blocks.iter().filter_map(|&b| session.index.first_line_for_uuid(b)).min() else {
            continue;
        };
        let target_line = bir_listing::preceding_function_line(&session.lines, name, first_line as usize)
            .map(|l| l as u32)
            .unwrap_or(first_line);
        let Some(target_text) = session.lines.get(target_line as usize) else {
            continue;
        };
        let (start_char, end_char) = bir_listing::find_token_range(target_text, name)
            .map(|(s, e)| (s as u32, e as u32))
            .unwrap_or((0, target_text.chars().count() as u32));
        locations.push(LineRange { line: target_line, start_char, end_char });
    }
    locations
}

/// `getModuleName(uri, idx)`: the module's name, or `"module{idx}"` if
/// `idx` names no module (this system only ever loads `module[0]`, but the
/// fallback is kept for whatever index the client happens to ask about).
pub fn get_module_name(ir: &Ir, module_index: usize) -> String {
    ir.modules.get(module_index).map(|m| m.name.clone()).unwrap_or_else(|| format!("module{module_index}"))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    use bir::{BlockKind, ByteBlock, ByteInterval, Isa, Module, Symbol};
    use bir_index::Index;
    use uuid::Uuid;
    use url::Url;

    use super::*;
    use crate::path::ResolvedPaths;

    fn module_with_main() -> Module {
        let block = Uuid::from_u128(1);
        let symbol = Uuid::from_u128(2);
        let mut function_blocks = BTreeMap::new();
        function_blocks.insert(symbol, vec![block]);
        let mut function_names = BTreeMap::new();
        function_names.insert(symbol, "main".to_string());
        Module {
            name: "hello".into(),
            isa: Isa::X64,
            symbols: vec![Symbol { uuid: symbol, name: "main".into(), referent: Some(Referent::Code(block)) }],
            byte_intervals: vec![ByteInterval { uuid: Uuid::from_u128(3), address: 0x401130, size: 4, symbolic_expressions: BTreeMap::new() }],
            byte_blocks: vec![ByteBlock { uuid: block, address: 0x401130, size: 4, kind: BlockKind::Code }],
            cfg: vec![],
            function_names,
            function_blocks,
            function_sources: BTreeMap::new(),
            prototype_table: BTreeMap::new(),
            type_table: BTreeMap::new(),
            comments: BTreeMap::new(),
            aux_data: BTreeMap::new(),
            rewritten_blocks: BTreeMap::new(),
        }
    }

    fn session_with(module: Module, lines: Vec<&str>) -> Session {
        let lines: Vec<String> = lines.into_iter().map(str::to_string).collect();
        let addr_lines = bir_listing::extract_address_lines(&lines);
        let index = Index::build(&module, &addr_lines).unwrap_or_default();
        let ir = Ir { modules: vec![module] };
        let uri = Url::parse("file:///work/.vscode.hello/x64/hello.view").unwrap();
        let paths = ResolvedPaths {
            listing_path: PathBuf::from("/tmp/hello.view"),
            bir_path: PathBuf::from("/tmp/hello"),
            default_index_path: PathBuf::from("/tmp/birls-commands-test-missing-index.json"),
        };
        Session { uri, ir, index, dirty: Default::default(), lines, bir_path: paths.bir_path, index_path: paths.default_index_path, rewriting_enabled: true }
    }

    #[test]
    fn line_from_address_resolves_within_a_block() {
        let module = module_with_main();
        let session = session_with(module, vec!["main:", "mov eax, 1 # EA: 0x401130"]);
        let location = get_line_from_address(&session, "0x401130").unwrap();
        assert_eq!(location.line, 1);
    }

    #[test]
    fn line_from_address_rejects_uncovered_address() {
        let module = module_with_main();
        let session = session_with(module, vec!["main:", "mov eax, 1 # EA: 0x401130"]);
        let result = get_line_from_address(&session, "0xdead");
        assert!(matches!(result, Err(Error::AddressOutOfRange(_))));
    }

    #[test]
    fn line_from_address_rejects_malformed_hex() {
        let module = module_with_main();
        let session = session_with(module, vec!["main:", "mov eax, 1 # EA: 0x401130"]);
        let result = get_line_from_address(&session, "not-hex");
        assert!(matches!(result, Err(Error::TokenResolution(_))));
    }

    #[test]
    fn address_of_symbol_formats_lowercase_hex() {
        let module = module_with_main();
        let session = session_with(module, vec!["main:", "mov eax, 1 # EA: 0x401130"]);
        assert_eq!(get_address_of_symbol(&session, "main"), Some("0x401130".to_string()));
        assert_eq!(get_address_of_symbol(&session, "nope"), None);
    }

    #[test]
    fn line_address_list_enumerates_the_index() {
        let module = module_with_main();
        let session = session_with(module, vec!["main:", "mov eax, 1 # EA: 0x401130"]);
        let list = get_line_address_list(&session);
        assert_eq!(list, vec![LineAddress { line: 1, address: 0x401130 }]);
    }

    #[test]
    fn function_locations_snap_to_the_label_line() {
        let module = module_with_main();
        let session = session_with(module, vec!["main:", "mov eax, 1 # EA: 0x401130"]);
        let locations = get_function_locations(&session);
        assert_eq!(locations, vec![LineRange { line: 0, start_char: 0, end_char: 4 }]);
    }

    #[test]
    fn module_name_falls_back_for_unknown_index() {
        let module = module_with_main();
        let ir = Ir { modules: vec![module] };
        assert_eq!(get_module_name(&ir, 0), "hello");
        assert_eq!(get_module_name(&ir, 1), "module1");
    }
}
