//! Wire types for the birls language server: the generic JSON-RPC 2.0
//! envelope plus the payloads for the two custom server→client requests
//! and the five custom client→server commands this server exposes beyond
//! the standard LSP surface.
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]
pub mod jsonrpc;

use serde::{Deserialize, Serialize};

pub use jsonrpc::{JsonRpcError, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};

/// Params for the server-initiated `getBirFile` request.
#[derive(Debug, Serialize, Deserialize)]
pub struct GetBirFileParams {
    pub uri: String,
}

/// Result of `getBirFile`: the BIR file contents, base64-encoded.
#[derive(Debug, Serialize, Deserialize)]
pub struct GetBirFileResult {
    pub text: String,
}

/// Params for the server-initiated `pushBirFile` request.
#[derive(Debug, Serialize, Deserialize)]
pub struct PushBirFileParams {
    pub uri: String,
    pub content: String,
}

/// Params shared by `getLineFromAddress` and `getAddressOfSymbol`.
#[derive(Debug, Serialize, Deserialize)]
pub struct UriAddressParams {
    pub uri: String,
    #[serde(rename = "hexAddr")]
    pub hex_addr: String,
}

/// Params shared by `getLineAddressList`, `getFunctionLocations`, and the
/// `uri`-only half of `getModuleName`.
#[derive(Debug, Serialize, Deserialize)]
pub struct UriParams {
    pub uri: String,
}

/// Params for `getAddressOfSymbol`.
#[derive(Debug, Serialize, Deserialize)]
pub struct UriSymbolParams {
    pub uri: String,
    pub name: String,
}

/// Params for `getModuleName`.
#[derive(Debug, Serialize, Deserialize)]
pub struct UriModuleIndexParams {
    pub uri: String,
    #[serde(rename = "moduleIndex")]
    pub module_index: usize,
}

/// One entry of `getLineAddressList`'s result: `[line, address]`.
#[derive(Debug, Serialize, Deserialize)]
pub struct LineAddress {
    pub line: u32,
    pub address: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uri_address_params_round_trip_hex_addr_field_name() {
        let params = UriAddressParams { uri: "file:///a.view".into(), hex_addr: "0x1820".into() };
        let json = serde_json::to_value(&params).unwrap();
        assert_eq!(json["hexAddr"], "0x1820");
    }
}
