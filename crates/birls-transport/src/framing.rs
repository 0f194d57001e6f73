//! Reads and writes `Content-Length`-framed JSON messages.
use std::io::{self, BufRead, Write};

use serde_json::Value;

/// Reads one framed message from `reader`.
///
/// Returns `Ok(None)` on a clean EOF (no `Content-Length` header was seen
/// before the stream ended) and also on a malformed frame — a missing or
/// unparsable `Content-Length`, or a body that isn't valid JSON — logging
/// the problem rather than propagating it, since a single bad frame from a
/// misbehaving client should not bring the whole server down.
pub fn read_message<R: BufRead>(reader: &mut R) -> io::Result<Option<Value>> {
    let mut content_length: Option<usize> = None;

    loop {
        let mut header = String::new();
        let bytes_read = reader.read_line(&mut header)?;
        if bytes_read == 0 {
            return Ok(None);
        }
        let header = header.trim_end_matches(['\r', '\n']);
        if header.is_empty() {
            break;
        }
        if let Some(value) = header.strip_prefix("Content-Length:") {
            match value.trim().parse::<usize>() {
                Ok(len) => content_length = Some(len),
                Err(err) => {
                    tracing::warn!("malformed Content-Length header {:?}: {}", value, err);
                    return Ok(None);
                }
            }
        }
        // Any other header (e.g. Content-Type) is accepted and ignored.
    }

    let Some(len) = content_length else {
        tracing::warn!("message frame had no Content-Length header");
        return Ok(None);
    };

    let mut body = vec![0u8; len];
    reader.read_exact(&mut body)?;

    match serde_json::from_slice(&body) {
        Ok(value) => Ok(Some(value)),
        Err(err) => {
            tracing::warn!("failed to parse message body as JSON: {}", err);
            Ok(None)
        }
    }
}

/// Writes one framed message to `writer` and flushes it.
pub fn write_message<W: Write>(writer: &mut W, message: &Value) -> io::Result<()> {
    let body = serde_json::to_vec(message)?;
    write!(writer, "Content-Length: {}\r\n\r\n", body.len())?;
    writer.write_all(&body)?;
    writer.flush()
}

/// Writes a notification (a message with no `id`) built from `method` and
/// `params`, the shape used for `window/showMessage` and the
/// `textDocument/publishDiagnostics`-style one-way events.
pub fn write_notification<W: Write>(writer: &mut W, method: &str, params: Value) -> io::Result<()> {
    let message = serde_json::json!({
        "jsonrpc": "2.0",
        "method": method,
        "params": params,
    });
    write_message(writer, &message)
}

/// Logs an outgoing response at debug level before it is written, useful
/// for tracing request/response pairs without duplicating the logging call
/// at every call site.
pub fn log_response(message: &Value) {
    tracing::debug!(?message, "sending response");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn framed(body: &str) -> Vec<u8> {
        format!("Content-Length: {}\r\n\r\n{}", body.len(), body).into_bytes()
    }

    #[test]
    fn round_trips_a_simple_message() {
        let mut buf = Vec::new();
        let message = serde_json::json!({"jsonrpc": "2.0", "id": 1, "method": "initialize"});
        write_message(&mut buf, &message).unwrap();

        let mut cursor = Cursor::new(buf);
        let parsed = read_message(&mut cursor).unwrap();
        assert_eq!(parsed, Some(message));
    }

    #[test]
    fn returns_none_on_clean_eof() {
        let mut cursor = Cursor::new(Vec::new());
        assert_eq!(read_message(&mut cursor).unwrap(), None);
    }

    #[test]
    fn returns_none_on_malformed_content_length() {
        let bytes = b"Content-Length: notanumber\r\n\r\n{}".to_vec();
        let mut cursor = Cursor::new(bytes);
        assert_eq!(read_message(&mut cursor).unwrap(), None);
    }

    #[test]
    fn returns_none_on_invalid_json_body() {
        let bytes = framed("{not json");
        let mut cursor = Cursor::new(bytes);
        assert_eq!(read_message(&mut cursor).unwrap(), None);
    }

    #[test]
    fn ignores_unrelated_headers() {
        let body = r#"{"a":1}"#;
        let bytes = format!("Content-Type: application/vscode-jsonrpc\r\nContent-Length: {}\r\n\r\n{}", body.len(), body);
        let mut cursor = Cursor::new(bytes.into_bytes());
        let parsed = read_message(&mut cursor).unwrap();
        assert_eq!(parsed, Some(serde_json::json!({"a": 1})));
    }
}
