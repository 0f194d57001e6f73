use bir_index::Index;

/// A single `textDocument/didChange` content change, already normalized to
/// listing-space line numbers. `end_line` is inclusive, matching the range
/// the editor reports for the lines it replaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    pub start_line: u32,
    pub end_line: u32,
    pub text: String,
}

impl Change {
    /// Number of lines `text` occupies once substituted in: a `\n`-delimited
    /// count, so an empty replacement still counts as the one empty line it
    /// leaves behind.
    pub fn new_line_count(&self) -> u32 {
        self.text.split('\n').count() as u32
    }

    /// Number of lines being replaced, inclusive of both ends.
    pub fn old_line_count(&self) -> u32 {
        self.end_line + 1 - self.start_line
    }
}

/// Rebuilds the line↔offset map after `change`, per spec.md §4.5's
/// `update_line` mapping: lines before the shrinking/growing span keep their
/// offset at the same line number, lines after it shift by `growth`, and
/// lines strictly inside the overlap that neither survives are dropped
/// (DESIGN.md's "drop interior lines" resolution of the two source
/// variants). Offsets untouched by the change pass through unchanged.
pub fn apply_change(index: &Index, change: &Change) -> Index {
    let old_count = change.old_line_count();
    let new_count = change.new_line_count();
    let growth = i64::from(new_count) - i64::from(old_count);
    let surviving_prefix = new_count.min(old_count);

    let mut rebuilt = Index::default();
    for (&old_line, &offset) in &index.offset_by_line {
        let new_line = if old_line < change.start_line + surviving_prefix {
            Some(old_line)
        } else if old_line > change.end_line {
            u32::try_from(i64::from(old_line) + growth).ok()
        } else {
            None
        };

        if let Some(new_line) = new_line {
            rebuilt.offset_by_line.insert(new_line, offset);
            rebuilt.line_by_offset.insert(offset, new_line);
        }
    }
    rebuilt
}
