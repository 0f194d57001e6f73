use std::path::{Path, PathBuf};

use birls_error::Error;

/// Abstracts the server-initiated `getBirFile`/`pushBirFile` round trip
/// (spec.md §6) so the session layer never depends on a concrete
/// transport. Base64 encoding/decoding happens on the wire side of this
/// boundary (in whatever implements this trait); callers here always see
/// plain bytes.
pub trait RemoteClient {
    /// Fetches the BIR bytes for `uri` from the editor's filesystem.
    fn get_bir_file(&mut self, uri: &str) -> Result<Vec<u8>, Error>;

    /// Pushes the rewritten BIR bytes for `uri` back to the editor.
    fn push_bir_file(&mut self, uri: &str, content: &[u8]) -> Result<(), Error>;
}

/// The server-side cache path for a remote BIR: `{temp_dir}/{md5(peer_ip +
/// ":" + uri)}.bir` (spec.md §6), with the index alongside it suffixed
/// `.json`.
pub fn remote_cache_path(temp_dir: &Path, peer_ip: &str, uri: &str) -> PathBuf {
    let digest = md5::compute(format!("{peer_ip}:{uri}"));
    temp_dir.join(format!("{digest:x}.bir"))
}

/// Ensures the remote BIR cache file at `cache_path` exists, fetching it
/// via `client` and writing it to disk if it is missing.
pub fn ensure_cached(client: &mut dyn RemoteClient, uri: &str, cache_path: &Path) -> Result<(), Error> {
    if cache_path.exists() {
        return Ok(());
    }
    let bytes = client.get_bir_file(uri)?;
    std::fs::write(cache_path, bytes).map_err(|err| Error::RemoteIo(format!("failed to cache BIR for {uri}: {err}")))
}
