use serde::{Deserialize, Serialize};

/// A zero-based location in document text.
///
/// `character` counts bytes from the start of the line, matching what
/// tree-sitter reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    pub line: usize,
    pub character: usize,
}

impl Position {
    #[must_use]
    pub const fn new(line: usize, character: usize) -> Self {
        Self { line, character }
    }

    /// Byte offset of this position within `text`, or `None` when the
    /// position lies past the end of the document.
    #[must_use]
    pub fn to_offset(self, text: &str) -> Option<usize> {
        let mut offset = 0usize;
        for (line_no, line) in text.split('\n').enumerate() {
            if line_no == self.line {
                if self.character > line.len() {
                    return None;
                }
                return Some(offset + self.character);
            }
            offset += line.len() + 1;
        }
        None
    }
}

/// A half-open source span, `start` inclusive and `end` exclusive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    #[must_use]
    pub const fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    #[must_use]
    pub fn contains(&self, position: Position) -> bool {
        position >= self.start && position < self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_counts_newlines() {
        let text = "ab\ncd\nef";
        assert_eq!(Position::new(0, 0).to_offset(text), Some(0));
        assert_eq!(Position::new(1, 1).to_offset(text), Some(4));
        assert_eq!(Position::new(2, 2).to_offset(text), Some(8));
    }

    #[test]
    fn offset_rejects_out_of_bounds() {
        let text = "ab\ncd";
        assert_eq!(Position::new(0, 3).to_offset(text), None);
        assert_eq!(Position::new(5, 0).to_offset(text), None);
    }

    #[test]
    fn range_containment_is_half_open() {
        let range = Range::new(Position::new(1, 2), Position::new(1, 6));
        assert!(range.contains(Position::new(1, 2)));
        assert!(range.contains(Position::new(1, 5)));
        assert!(!range.contains(Position::new(1, 6)));
        assert!(!range.contains(Position::new(0, 4)));
    }
}
