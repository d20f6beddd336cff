//! Rope-based text buffer with per-line revision tracking.
//!
//! The indentation engine caches computed state per line and must detect when
//! a cached entry went stale. Rather than hanging user data off GUI text
//! blocks, the buffer itself tracks a revision counter per line (bumped on
//! every edit touching that line) plus a whole-document revision; cache
//! entries store the revision they were computed at and compare.

use anyhow::Result;
use ropey::Rope;
use unicode_width::UnicodeWidthChar;

/// A text buffer backed by a `ropey::Rope`, with line-oriented edits.
#[derive(Clone)]
pub struct Buffer {
    rope: Rope,
    pub name: String,
    revision: u64,
    line_revisions: Vec<u64>,
}

impl Buffer {
    /// Construct a buffer from an in-memory string slice.
    pub fn from_str(name: impl Into<String>, content: &str) -> Result<Self> {
        let rope = Rope::from_str(content);
        let line_revisions = vec![0; rope.len_lines()];
        Ok(Self {
            rope,
            name: name.into(),
            revision: 0,
            line_revisions,
        })
    }

    /// Total number of lines in the buffer.
    pub fn line_count(&self) -> usize {
        self.rope.len_lines()
    }

    /// Return the requested line as an owned `String`, without any trailing
    /// newline.
    pub fn line(&self, idx: usize) -> Option<String> {
        if idx < self.rope.len_lines() {
            let mut s = self.rope.line(idx).to_string();
            if s.ends_with('\n') {
                s.pop();
                if s.ends_with('\r') {
                    s.pop();
                }
            }
            Some(s)
        } else {
            None
        }
    }

    /// Byte length of a line (excluding any newline).
    pub fn line_byte_len(&self, idx: usize) -> usize {
        self.line(idx).map_or(0, |s| s.len())
    }

    /// Monotonic revision of the whole document; bumped on every edit.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Revision of one line: the document revision at which it last changed.
    /// Out-of-range lines report the current document revision so stale
    /// cache slots never accidentally validate against them.
    pub fn line_revision(&self, idx: usize) -> u64 {
        self.line_revisions.get(idx).copied().unwrap_or(self.revision)
    }

    /// Replace the content of one line (newline handling is internal).
    pub fn replace_line(&mut self, idx: usize, content: &str) {
        if idx >= self.rope.len_lines() {
            return;
        }
        self.revision += 1;
        let start = self.rope.line_to_char(idx);
        let line_len = self.rope.line(idx).len_chars();
        let had_newline = self.rope.line(idx).to_string().ends_with('\n');
        let end = start + line_len - usize::from(had_newline);
        self.rope.remove(start..end);
        self.rope.insert(start, content);
        self.line_revisions[idx] = self.revision;
    }

    /// Insert a new line before `idx` (or append when `idx == line_count`).
    pub fn insert_line(&mut self, idx: usize, content: &str) {
        let idx = idx.min(self.rope.len_lines());
        self.revision += 1;
        if idx == self.rope.len_lines() {
            let len = self.rope.len_chars();
            self.rope.insert(len, "\n");
            self.rope.insert(len + 1, content);
        } else {
            let start = self.rope.line_to_char(idx);
            self.rope.insert(start, "\n");
            self.rope.insert(start, content);
        }
        self.line_revisions.insert(idx, self.revision);
        // Every following line shifted; their identities changed.
        for rev in self.line_revisions.iter_mut().skip(idx + 1) {
            *rev = self.revision;
        }
    }

    /// Remove a whole line including its newline.
    pub fn remove_line(&mut self, idx: usize) {
        if idx >= self.rope.len_lines() {
            return;
        }
        self.revision += 1;
        let start = self.rope.line_to_char(idx);
        let end = start + self.rope.line(idx).len_chars();
        self.rope.remove(start..end);
        self.line_revisions.remove(idx);
        for rev in self.line_revisions.iter_mut().skip(idx) {
            *rev = self.revision;
        }
        if self.line_revisions.is_empty() {
            self.line_revisions.push(self.revision);
        }
    }

    /// Whole buffer as a `String`.
    pub fn text(&self) -> String {
        self.rope.to_string()
    }
}

/// Display column of `byte` within `text`, expanding tabs to the next
/// multiple of `tab_size` and counting wide characters by their width.
pub fn visual_col(text: &str, byte: usize, tab_size: usize) -> usize {
    let tab_size = tab_size.max(1);
    let mut col = 0;
    for (i, ch) in text.char_indices() {
        if i >= byte {
            break;
        }
        if ch == '\t' {
            col = (col / tab_size + 1) * tab_size;
        } else {
            col += ch.width().unwrap_or(0);
        }
    }
    col
}
