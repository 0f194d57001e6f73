use std::collections::HashMap;
use std::path::PathBuf;

use bir::Ir;
use bir_index::Index;
use birls_error::Error;
use birls_rewrite::{Assembler, Change, DirtyTracker, RewriteError};
use url::Url;

use crate::path::ResolvedPaths;

/// Per-open-document state: the loaded BIR, its line index, the dirty-block
/// set, and the paths it was resolved from. Owned exclusively by its URI;
/// the only structure shared across handlers is the [`SessionRegistry`]
/// that keys sessions by URI (spec.md §9's "per-document process-wide
/// state" redesign).
pub struct Session {
    pub uri: Url,
    pub ir: Ir,
    pub index: Index,
    pub dirty: DirtyTracker,
    pub lines: Vec<String>,
    pub bir_path: PathBuf,
    pub index_path: PathBuf,
    pub rewriting_enabled: bool,
}

impl Session {
    /// Opens a session: builds or reloads the index (K3: a missing or
    /// unparsable on-disk index is recovered silently by rebuilding from
    /// the listing, never surfaced to the user).
    pub fn open(uri: Url, paths: ResolvedPaths, ir: Ir, listing_text: &str, rewriting_enabled: bool) -> Result<Session, Error> {
        let lines: Vec<String> = listing_text.lines().map(str::to_string).collect();
        let addr_lines = bir_listing::extract_address_lines(&lines);

        let index = match Index::load(&paths.default_index_path) {
            Ok(index) => index,
            Err(err) => {
                tracing::debug!(%err, "index missing or stale, rebuilding from listing");
                Index::build(ir.module(), &addr_lines).map_err(|err| Error::BirLoad(err.to_string()))?
            }
        };

        Ok(Session {
            uri,
            ir,
            index,
            dirty: DirtyTracker::new(),
            lines,
            bir_path: paths.bir_path,
            index_path: paths.default_index_path,
            rewriting_enabled,
        })
    }

    /// Applies one `didChange` content change in place: marks the touched
    /// blocks dirty against the pre-change index and listing, rebuilds the
    /// index under the change's line-shift algebra, then installs the new
    /// listing text. Callers apply a document's changes one at a time, in
    /// the order the editor reported them.
    pub fn apply_change(&mut self, change: Change, new_lines: Vec<String>) {
        self.dirty.mark_range_dirty(&self.index, &self.lines, change.start_line, change.end_line);
        self.index = birls_rewrite::apply_change(&self.index, &change);
        self.lines = new_lines;
    }

    /// Runs the `did_save` commit pipeline (spec.md §4.5): reassembles
    /// every dirty block and applies the batch. The dirty set is cleared
    /// only on success; a failure leaves it untouched for a retry.
    pub fn save(&mut self, assembler: &mut dyn Assembler) -> Result<(), RewriteError> {
        if !self.rewriting_enabled {
            return Err(RewriteError::Unavailable);
        }
        birls_rewrite::commit(&mut self.ir, &mut self.dirty, &self.index, &self.lines, assembler)
    }

    /// Persists the in-memory BIR to `self.bir_path`.
    pub fn persist_bir(&self) -> Result<(), Error> {
        bir::io::save(&self.ir, &self.bir_path).map_err(|err| Error::BirLoad(err.to_string()))
    }

    /// Persists the current index to `self.index_path`.
    pub fn persist_index(&self) -> Result<(), Error> {
        self.index.save(&self.index_path).map_err(|err| Error::IndexStale(err.to_string()))
    }
}

/// Owns every open document's [`Session`], keyed by URI. The sole structure
/// shared across handlers; mutated only on open/close (spec.md §9).
#[derive(Default)]
pub struct SessionRegistry {
    sessions: HashMap<Url, Session>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, session: Session) {
        self.sessions.insert(session.uri.clone(), session);
    }

    pub fn get(&self, uri: &Url) -> Option<&Session> {
        self.sessions.get(uri)
    }

    pub fn get_mut(&mut self, uri: &Url) -> Option<&mut Session> {
        self.sessions.get_mut(uri)
    }

    pub fn remove(&mut self, uri: &Url) -> Option<Session> {
        self.sessions.remove(uri)
    }

    pub fn contains(&self, uri: &Url) -> bool {
        self.sessions.contains_key(uri)
    }
}
