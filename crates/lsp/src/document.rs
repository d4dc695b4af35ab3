//! Document state management for open files in the editor.

use std::collections::HashMap;

/// Tracks which documents are currently open in the editor.
pub struct DocumentState {
    documents: HashMap<String, DocumentInfo>,
}

/// Information about a single open document.
pub struct DocumentInfo {
    /// Editor-reported version number.
    pub version: i32,
    /// Latest content from the editor.
    pub content: String,
}

impl Default for DocumentState {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentState {
    pub fn new() -> Self {
        Self {
            documents: HashMap::new(),
        }
    }

    /// Track a newly opened document.
    pub fn open(&mut self, uri: &str, version: i32, content: String) {
        self.documents
            .insert(uri.to_owned(), DocumentInfo { version, content });
    }

    /// Update content for an already-open document. Stale versions are
    /// ignored.
    pub fn change(&mut self, uri: &str, version: i32, content: String) {
        if let Some(doc) = self.documents.get_mut(uri) {
            if version >= doc.version {
                doc.version = version;
                doc.content = content;
            }
        }
    }

    /// Remove a closed document from tracking.
    pub fn close(&mut self, uri: &str) {
        self.documents.remove(uri);
    }

    /// Get information about an open document.
    pub fn get(&self, uri: &str) -> Option<&DocumentInfo> {
        self.documents.get(uri)
    }
}

/// Maps the parser's character columns to LSP's UTF-16 columns.
pub struct LineIndex<'a> {
    lines: Vec<&'a str>,
}

impl<'a> LineIndex<'a> {
    pub fn new(content: &'a str) -> Self {
        Self {
            lines: content.split('\n').collect(),
        }
    }

    /// UTF-16 offset of character column `col` on 0-based `line`. Columns
    /// past the end of the line clamp to its length.
    pub fn utf16_col(&self, line: u32, col: u32) -> u32 {
        let Some(text) = self.lines.get(line as usize) else {
            return col;
        };
        text.chars()
            .take(col as usize)
            .map(|c| c.len_utf16() as u32)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_change_close() {
        let mut state = DocumentState::new();
        state.open("file:///a.rdm", 1, "TRUE {}".into());
        state.change("file:///a.rdm", 2, "FALSE {}".into());
        assert_eq!(state.get("file:///a.rdm").map(|d| d.content.as_str()), Some("FALSE {}"));
        state.change("file:///a.rdm", 1, "stale".into());
        assert_eq!(state.get("file:///a.rdm").map(|d| d.version), Some(2));
        state.close("file:///a.rdm");
        assert!(state.get("file:///a.rdm").is_none());
    }

    #[test]
    fn change_of_unknown_document_is_ignored() {
        let mut state = DocumentState::default();
        state.change("file:///b.rdm", 3, "TRUE {}".into());
        assert!(state.get("file:///b.rdm").is_none());
    }

    #[test]
    fn utf16_columns() {
        let index = LineIndex::new("abc\n'😀' x");
        assert_eq!(index.utf16_col(0, 2), 2);
        assert_eq!(index.utf16_col(1, 4), 5);
        assert_eq!(index.utf16_col(1, 100), 6);
        assert_eq!(index.utf16_col(9, 3), 3);
    }
}
