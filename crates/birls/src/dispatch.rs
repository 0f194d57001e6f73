//! The LSP Adapter: routes framed JSON-RPC messages to the Session
//! Manager, Navigation Engine, and Edit Tracker & Rewriter. This is the
//! "external collaborator" spec.md §1 calls out as out of scope for the
//! core engine, kept thin by design — every decision of substance lives in
//! `bir`/`bir-index`/`bir-listing`/`birls-navigation`/`birls-rewrite`/
//! `birls-session`.
use std::io::{BufRead, Write};
use std::path::PathBuf;

use birls_error::Error;
use birls_navigation::{definition, hover, references, NavigationOutcome};
use birls_rewrite::LiteralPatchAssembler;
use birls_session::{ensure_cached, parse_listing_uri, remote_cache_path, Session, SessionRegistry};
use serde_json::{json, Value};
use url::Url;

use crate::remote_client::StdioRemoteClient;

const MSG_ERROR: i32 = 1;
const MSG_INFO: i32 = 3;

pub struct Server<R, W> {
    reader: R,
    writer: W,
    registry: SessionRegistry,
    rewriting_enabled: bool,
    remote: bool,
    peer_ip: String,
    next_id: i64,
}

impl<R: BufRead, W: Write> Server<R, W> {
    pub fn new(reader: R, writer: W, rewriting_enabled: bool, remote: bool, peer_ip: String) -> Self {
        Self { reader, writer, registry: SessionRegistry::new(), rewriting_enabled, remote, peer_ip, next_id: 0 }
    }

    /// Drives the message loop until `exit` or a clean EOF. Returns once
    /// the connection ends; the caller decides the process exit code.
    pub fn run(&mut self) -> std::io::Result<()> {
        loop {
            let Some(message) = birls_transport::read_message(&mut self.reader)? else {
                return Ok(());
            };
            let Some(method) = message.get("method").and_then(Value::as_str).map(str::to_string) else {
                // A response to one of our own server-initiated requests (shouldn't
                // normally reach here, since round trips are read inline) or a
                // malformed frame; ignore either way.
                continue;
            };
            if method == "exit" {
                return Ok(());
            }
            let id = message.get("id").cloned();
            let params = message.get("params").cloned().unwrap_or(Value::Null);
            let result = self.dispatch(&method, &params);
            if let Some(id) = id {
                let response = match result {
                    Ok(value) => birls_protocol::JsonRpcResponse::success(Some(id), value),
                    Err(err) => birls_protocol::JsonRpcResponse::error(
                        Some(id),
                        birls_protocol::JsonRpcError::new(birls_protocol::INTERNAL_ERROR, err.to_string()),
                    ),
                };
                let value = serde_json::to_value(&response).unwrap_or(Value::Null);
                birls_transport::log_response(&value);
                birls_transport::write_message(&mut self.writer, &value)?;
            } else if let Err(err) = result {
                tracing::debug!(%err, %method, "notification handler failed");
            }
        }
    }

    fn dispatch(&mut self, method: &str, params: &Value) -> Result<Value, Error> {
        match method {
            "initialize" => Ok(self.capabilities()),
            "shutdown" => Ok(Value::Null),
            "textDocument/didOpen" => self.did_open(params).map(|()| Value::Null),
            "textDocument/didChange" => self.did_change(params).map(|()| Value::Null),
            "textDocument/didSave" => self.did_save(params).map(|()| Value::Null),
            "textDocument/didClose" => self.did_close(params).map(|()| Value::Null),
            "textDocument/definition" => Ok(self.handle_definition(params)),
            "textDocument/references" => Ok(self.handle_references(params)),
            "textDocument/hover" => Ok(self.handle_hover(params)),
            "getLineFromAddress" => Ok(self.cmd_get_line_from_address(params)),
            "getAddressOfSymbol" => Ok(self.cmd_get_address_of_symbol(params)),
            "getLineAddressList" => self.cmd_get_line_address_list(params),
            "getFunctionLocations" => self.cmd_get_function_locations(params),
            "getModuleName" => self.cmd_get_module_name(params),
            other => Err(Error::PathMalformed(format!("unknown method: {other}"))),
        }
    }

    fn capabilities(&self) -> Value {
        json!({
            "capabilities": {
                "textDocumentSync": { "openClose": true, "change": 2, "save": { "includeText": true } },
                "definitionProvider": true,
                "referencesProvider": true,
                "hoverProvider": true,
            }
        })
    }

    fn show_message(&mut self, kind: i32, message: &str) {
        let params = json!({ "type": kind, "message": message });
        if let Err(err) = birls_transport::write_notification(&mut self.writer, "window/showMessage", params) {
            tracing::warn!(%err, "failed to send window/showMessage");
        }
    }

    // ---- document lifecycle --------------------------------------------

    fn did_open(&mut self, params: &Value) -> Result<(), Error> {
        let uri_str = text_document_uri(params)?;
        let text = params.get("textDocument").and_then(|t| t.get("text")).and_then(Value::as_str).unwrap_or("");
        match self.open_document(&uri_str, text) {
            Ok(()) => Ok(()),
            Err(err) => {
                if err.is_user_visible() {
                    self.show_message(MSG_ERROR, &err.to_string());
                }
                Err(err)
            }
        }
    }

    fn open_document(&mut self, uri_str: &str, text: &str) -> Result<(), Error> {
        let uri = Url::parse(uri_str).map_err(|e| Error::PathMalformed(format!("invalid uri {uri_str}: {e}")))?;
        let paths = parse_listing_uri(&uri)?;

        let (bir_path, index_path) = if self.remote {
            let temp_dir = std::env::temp_dir();
            let cache_path = remote_cache_path(&temp_dir, &self.peer_ip, uri_str);
            {
                let mut client = StdioRemoteClient { reader: &mut self.reader, writer: &mut self.writer, next_id: &mut self.next_id };
                ensure_cached(&mut client, uri_str, &cache_path)?;
            }
            let index_path = PathBuf::from(format!("{}.json", cache_path.display()));
            (cache_path, index_path)
        } else {
            (paths.bir_path.clone(), paths.default_index_path.clone())
        };

        let ir = bir::io::load(&bir_path).map_err(|err| Error::BirLoad(err.to_string()))?;
        let resolved = birls_session::ResolvedPaths { listing_path: paths.listing_path, bir_path, default_index_path: index_path };
        let session = Session::open(uri, resolved, ir, text, self.rewriting_enabled)?;
        let _ = session.persist_index();
        self.registry.insert(session);
        Ok(())
    }

    fn did_change(&mut self, params: &Value) -> Result<(), Error> {
        let uri = text_document_url(params)?;
        let Some(session) = self.registry.get_mut(&uri) else {
            return Err(Error::DocumentNotCached(uri.to_string()));
        };
        let changes = params.get("contentChanges").and_then(Value::as_array).cloned().unwrap_or_default();
        for change in changes {
            apply_one_change(session, &change);
        }
        Ok(())
    }

    fn did_save(&mut self, params: &Value) -> Result<(), Error> {
        let uri = text_document_url(params)?;
        let Some(session) = self.registry.get_mut(&uri) else {
            return Err(Error::DocumentNotCached(uri.to_string()));
        };
        if !session.dirty.is_dirty() {
            return Ok(());
        }

        let mut assembler = LiteralPatchAssembler::default();
        match session.save(&mut assembler) {
            Ok(()) => {
                session.persist_bir()?;
                if self.remote {
                    let bir_path = session.bir_path.clone();
                    let bytes = std::fs::read(&bir_path).map_err(|err| Error::RemoteIo(err.to_string()))?;
                    let mut client = StdioRemoteClient { reader: &mut self.reader, writer: &mut self.writer, next_id: &mut self.next_id };
                    client.push_bir_file(uri.as_str(), &bytes)?;
                }
                self.show_message(MSG_INFO, &format!("birls: rewrite committed for {uri}"));
                Ok(())
            }
            Err(birls_rewrite::RewriteError::Unavailable) => {
                self.show_message(MSG_ERROR, "rewriting is disabled");
                Ok(())
            }
            Err(birls_rewrite::RewriteError::Assembler(err)) => {
                self.show_message(MSG_ERROR, &err.to_string());
                Err(Error::Assembler(err.to_string()))
            }
        }
    }

    fn did_close(&mut self, params: &Value) -> Result<(), Error> {
        let uri = text_document_url(params)?;
        self.registry.remove(&uri);
        Ok(())
    }

    // ---- navigation ------------------------------------------------------

    fn handle_definition(&mut self, params: &Value) -> Value {
        let Ok((uri, line, character)) = position_params(params) else {
            return Value::Null;
        };
        let Some(session) = self.registry.get(&uri) else {
            tracing::debug!(%uri, "definition requested for an unopened document");
            return Value::Null;
        };
        match definition(&session.ir, &session.index, &session.lines, line, character) {
            NavigationOutcome::Found(range) => location_json(&uri, range),
            other => {
                tracing::debug!(?other, "definition did not resolve");
                Value::Null
            }
        }
    }

    fn handle_references(&mut self, params: &Value) -> Value {
        let Ok((uri, line, character)) = position_params(params) else {
            return Value::Null;
        };
        let Some(session) = self.registry.get(&uri) else {
            tracing::debug!(%uri, "references requested for an unopened document");
            return Value::Null;
        };
        match references(&session.ir, &session.index, &session.lines, line, character) {
            NavigationOutcome::Found(locations) => {
                Value::Array(locations.into_iter().map(|range| location_json(&uri, range)).collect())
            }
            other => {
                tracing::debug!(?other, "references did not resolve");
                Value::Null
            }
        }
    }

    fn handle_hover(&mut self, params: &Value) -> Value {
        let Ok((uri, line, character)) = position_params(params) else {
            return Value::Null;
        };
        let Some(session) = self.registry.get(&uri) else {
            tracing::debug!(%uri, "hover requested for an unopened document");
            return Value::Null;
        };
        let text = hover(&session.ir, &session.index, &session.lines, line, character);
        json!({ "contents": text })
    }

    // ---- custom commands (spec.md §4.6) -----------------------------------

    fn cmd_get_line_from_address(&mut self, params: &Value) -> Value {
        let uri = match uri_only(params) {
            Ok(uri) => uri,
            Err(err) => {
                self.show_message(MSG_ERROR, &err.to_string());
                return Value::Null;
            }
        };
        let Some(hex_addr) = params.get("hexAddr").and_then(Value::as_str) else {
            self.show_message(MSG_ERROR, "getLineFromAddress: missing hexAddr");
            return Value::Null;
        };
        let Some(session) = self.registry.get(&uri) else {
            self.show_message(MSG_ERROR, &format!("{uri} is not open"));
            return Value::Null;
        };
        match birls_session::get_line_from_address(session, hex_addr) {
            Ok(range) => serde_json::to_value(lsp_range(range)).unwrap_or(Value::Null),
            Err(err) => {
                self.show_message(MSG_ERROR, &err.to_string());
                Value::Null
            }
        }
    }

    fn cmd_get_address_of_symbol(&mut self, params: &Value) -> Value {
        let uri = match uri_only(params) {
            Ok(uri) => uri,
            Err(err) => {
                self.show_message(MSG_ERROR, &err.to_string());
                return Value::Null;
            }
        };
        let Some(name) = params.get("name").and_then(Value::as_str) else {
            self.show_message(MSG_ERROR, "getAddressOfSymbol: missing name");
            return Value::Null;
        };
        let Some(session) = self.registry.get(&uri) else {
            self.show_message(MSG_ERROR, &format!("{uri} is not open"));
            return Value::Null;
        };
        match birls_session::get_address_of_symbol(session, name) {
            Some(addr) => Value::String(addr),
            None => {
                self.show_message(MSG_ERROR, &format!("unknown symbol: {name}"));
                Value::Null
            }
        }
    }

    fn cmd_get_line_address_list(&mut self, params: &Value) -> Result<Value, Error> {
        let uri = uri_only(params)?;
        let Some(session) = self.registry.get(&uri) else {
            return Err(Error::DocumentNotCached(uri.to_string()));
        };
        let list = birls_session::get_line_address_list(session);
        Ok(Value::Array(list.into_iter().map(|entry| json!([entry.line, entry.address])).collect()))
    }

    fn cmd_get_function_locations(&mut self, params: &Value) -> Result<Value, Error> {
        let uri = uri_only(params)?;
        let Some(session) = self.registry.get(&uri) else {
            return Err(Error::DocumentNotCached(uri.to_string()));
        };
        let locations = birls_session::get_function_locations(session);
        Ok(Value::Array(locations.into_iter().map(|range| location_json(&uri, range)).collect()))
    }

    fn cmd_get_module_name(&mut self, params: &Value) -> Result<Value, Error> {
        let uri = uri_only(params)?;
        let Some(session) = self.registry.get(&uri) else {
            return Err(Error::DocumentNotCached(uri.to_string()));
        };
        let index = params.get("moduleIndex").and_then(Value::as_u64).unwrap_or(0) as usize;
        Ok(Value::String(birls_session::get_module_name(&session.ir, index)))
    }
}

fn text_document_uri(params: &Value) -> Result<String, Error> {
    params
        .get("textDocument")
        .and_then(|t| t.get("uri"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| Error::PathMalformed("missing textDocument.uri".to_string()))
}

fn text_document_url(params: &Value) -> Result<Url, Error> {
    let uri_str = text_document_uri(params)?;
    Url::parse(&uri_str).map_err(|e| Error::PathMalformed(format!("invalid uri {uri_str}: {e}")))
}

fn uri_only(params: &Value) -> Result<Url, Error> {
    let uri_str = params
        .get("uri")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::PathMalformed("missing uri".to_string()))?;
    Url::parse(uri_str).map_err(|e| Error::PathMalformed(format!("invalid uri {uri_str}: {e}")))
}

fn position_params(params: &Value) -> Result<(Url, u32, u32), Error> {
    let uri = text_document_url(params)?;
    let position = params.get("position").ok_or_else(|| Error::TokenResolution("missing position".to_string()))?;
    let line = position.get("line").and_then(Value::as_u64).ok_or_else(|| Error::TokenResolution("missing position.line".to_string()))? as u32;
    let character = position
        .get("character")
        .and_then(Value::as_u64)
        .ok_or_else(|| Error::TokenResolution("missing position.character".to_string()))? as u32;
    Ok((uri, line, character))
}

fn lsp_range(range: birls_navigation::LineRange) -> lsp_types::Range {
    range.into()
}

fn location_json(uri: &Url, range: birls_navigation::LineRange) -> Value {
    let range = lsp_range(range);
    json!({ "uri": uri.to_string(), "range": serde_json::to_value(&range).unwrap_or_default() })
}

/// Reconstructs the full replacement text and document lines for one
/// `TextDocumentContentChangeEvent`, preserving the unedited characters on
/// either side of the changed range so that both whole-line and
/// intra-line edits apply correctly, then threads the result through
/// [`Session::apply_change`].
fn apply_one_change(session: &mut Session, change: &Value) {
    let Some(range) = change.get("range") else {
        tracing::warn!("full-document didChange events are not supported; ignoring");
        return;
    };
    let text = change.get("text").and_then(Value::as_str).unwrap_or("");

    let start_line = range.get("start").and_then(|p| p.get("line")).and_then(Value::as_u64).unwrap_or(0) as u32;
    let start_char = range.get("start").and_then(|p| p.get("character")).and_then(Value::as_u64).unwrap_or(0) as usize;
    let end_line = range.get("end").and_then(|p| p.get("line")).and_then(Value::as_u64).unwrap_or(0) as u32;
    let end_char = range.get("end").and_then(|p| p.get("character")).and_then(Value::as_u64).unwrap_or(0) as usize;

    let Some(start_text) = session.lines.get(start_line as usize).cloned() else {
        return;
    };
    let Some(end_text) = session.lines.get(end_line as usize).cloned() else {
        return;
    };

    let prefix = char_slice(&start_text, 0, Some(start_char));
    let suffix = char_slice(&end_text, end_char, None);
    let full_text = format!("{prefix}{text}{suffix}");

    let mut new_lines: Vec<String> = session.lines[..start_line as usize].to_vec();
    new_lines.extend(full_text.split('\n').map(str::to_string));
    new_lines.extend(session.lines[(end_line as usize + 1).min(session.lines.len())..].iter().cloned());

    let change = birls_rewrite::Change { start_line, end_line, text: full_text };
    session.apply_change(change, new_lines);
}

fn char_slice(line: &str, start: usize, end: Option<usize>) -> String {
    let chars: Vec<char> = line.chars().collect();
    let end = end.unwrap_or(chars.len()).min(chars.len());
    let start = start.min(end);
    chars[start..end].iter().collect()
}
