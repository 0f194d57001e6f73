//! Implements [`birls_session::RemoteClient`] over the same framed
//! transport the dispatch loop reads and writes, per spec.md §5's "remote
//! fetches are asynchronous and suspend only on the custom-request round
//! trip" — modeled here as a synchronous nested read, since this server
//! has no concurrent request handling to interleave with anyway.
use std::io::{BufRead, Write};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use birls_error::Error;
use birls_session::RemoteClient;
use serde_json::{json, Value};

pub struct StdioRemoteClient<'a, R, W> {
    pub reader: &'a mut R,
    pub writer: &'a mut W,
    pub next_id: &'a mut i64,
}

impl<R: BufRead, W: Write> RemoteClient for StdioRemoteClient<'_, R, W> {
    fn get_bir_file(&mut self, uri: &str) -> Result<Vec<u8>, Error> {
        let response = self.round_trip("getBirFile", json!({ "uri": uri }))?;
        let text = response
            .get("text")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::RemoteIo(format!("getBirFile response for {uri} had no text field")))?;
        BASE64.decode(text).map_err(|err| Error::RemoteIo(format!("getBirFile response was not valid base64: {err}")))
    }

    fn push_bir_file(&mut self, uri: &str, content: &[u8]) -> Result<(), Error> {
        let encoded = BASE64.encode(content);
        self.round_trip("pushBirFile", json!({ "uri": uri, "content": encoded })).map(|_| ())
    }
}

impl<R: BufRead, W: Write> StdioRemoteClient<'_, R, W> {
    fn round_trip(&mut self, method: &str, params: Value) -> Result<Value, Error> {
        *self.next_id += 1;
        let id = *self.next_id;
        let request = json!({ "jsonrpc": "2.0", "id": id, "method": method, "params": params });
        birls_transport::write_message(self.writer, &request)
            .map_err(|err| Error::RemoteIo(format!("failed to send {method}: {err}")))?;

        let response = birls_transport::read_message(self.reader)
            .map_err(|err| Error::RemoteIo(format!("failed to read {method} response: {err}")))?
            .ok_or_else(|| Error::RemoteIo(format!("client closed the connection while awaiting {method}")))?;

        if let Some(error) = response.get("error") {
            return Err(Error::RemoteIo(format!("{method} was rejected by the client: {error}")));
        }
        Ok(response.get("result").cloned().unwrap_or(Value::Null))
    }
}
