use std::path::{Path, PathBuf};

use birls_error::Error;

/// The three filesystem locations a listing URI resolves to, per spec.md
/// §4.6.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPaths {
    pub listing_path: PathBuf,
    pub bir_path: PathBuf,
    pub default_index_path: PathBuf,
}

/// Splits a `file://` listing URI into its three resolved paths, rejecting
/// anything that isn't a local file URI (K1).
pub fn parse_listing_uri(uri: &url::Url) -> Result<ResolvedPaths, Error> {
    if uri.scheme() != "file" {
        return Err(Error::PathMalformed(format!("not a file:// uri: {uri}")));
    }
    let listing_path =
        uri.to_file_path().map_err(|()| Error::PathMalformed(format!("uri has no filesystem path: {uri}")))?;
    parse_listing_path(&listing_path)
        .ok_or_else(|| Error::PathMalformed(format!("does not match the .vscode.<birname> layout: {}", listing_path.display())))
}

/// The path-shape half of [`parse_listing_uri`]: the listing file's path
/// has the shape `<dir>/.vscode.<birname>/<isa>/<birname>.view`, so its BIR
/// lives two directories up from the listing, with the `.vscode.` prefix
/// stripped from the cache directory's name. `None` if the path doesn't fit
/// that shape.
pub fn parse_listing_path(listing_path: &Path) -> Option<ResolvedPaths> {
    let isa_dir = listing_path.parent()?;
    let cache_dir = isa_dir.parent()?;
    let cache_dir_name = cache_dir.file_name()?.to_str()?;
    let bir_name = cache_dir_name.strip_prefix(".vscode.")?;
    let dir = cache_dir.parent()?;
    let bir_path = dir.join(bir_name);

    let mut index_name = listing_path.as_os_str().to_os_string();
    index_name.push(".json");

    Some(ResolvedPaths { listing_path: listing_path.to_path_buf(), bir_path, default_index_path: PathBuf::from(index_name) })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_bir_and_index_paths_from_listing_shape() {
        let listing = Path::new("/work/proj/.vscode.hello/x64/hello.view");
        let resolved = parse_listing_path(listing).expect("path matches the .vscode.<birname> shape");
        assert_eq!(resolved.bir_path, Path::new("/work/proj/hello"));
        assert_eq!(resolved.default_index_path, Path::new("/work/proj/.vscode.hello/x64/hello.view.json"));
    }

    #[test]
    fn rejects_a_path_missing_the_vscode_prefix() {
        let listing = Path::new("/work/proj/hello/x64/hello.view");
        assert!(parse_listing_path(listing).is_none());
    }

    #[test]
    fn rejects_a_path_too_shallow_to_contain_the_shape() {
        let listing = Path::new("hello.view");
        assert!(parse_listing_path(listing).is_none());
    }

    #[test]
    fn parse_listing_uri_rejects_non_file_scheme() {
        let uri = url::Url::parse("http://example.com/hello.view").unwrap();
        assert!(matches!(parse_listing_uri(&uri), Err(Error::PathMalformed(_))));
    }
}
