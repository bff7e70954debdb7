//! Source buffer addressed by byte offset.
//!
//! Positions used by the engine are byte offsets into the UTF-8 text and always sit
//! on a character boundary. Line and column numbers are derived on demand, only when a
//! failure is reported: lines are split on `\n` and columns count code points, so a
//! caret printed under the source line lands on the right character.

/// 1-based line and column of an offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

/// Immutable source text.
#[derive(Debug, Clone, Copy)]
pub struct Input<'src> {
    text: &'src str,
}

impl<'src> Input<'src> {
    pub fn new(text: &'src str) -> Self {
        Input { text }
    }

    pub fn text(&self) -> &'src str {
        self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Text from `offset` to the end. Offsets past the end give the empty string.
    pub fn rest(&self, offset: usize) -> &'src str {
        self.text.get(offset..).unwrap_or("")
    }

    /// Text between two offsets
    pub fn slice(&self, start: usize, end: usize) -> &'src str {
        self.text.get(start..end).unwrap_or("")
    }

    /// The character starting at `offset`, if any
    pub fn char_at(&self, offset: usize) -> Option<char> {
        self.rest(offset).chars().next()
    }

    /// Byte offset of the start of the line containing `offset`
    fn line_start(&self, offset: usize) -> usize {
        let offset = offset.min(self.text.len());
        self.text[..offset].rfind('\n').map_or(0, |newline| newline + 1)
    }

    /// 1-based line and column of `offset`. Offsets past the end clamp to the end.
    pub fn location(&self, offset: usize) -> Location {
        let offset = offset.min(self.text.len());
        let line = self.text[..offset].matches('\n').count() + 1;
        let start = self.line_start(offset);
        let column = self.text[start..offset].chars().count() + 1;
        Location { line, column }
    }

    /// The source line containing `offset`, without its line terminator
    pub fn line_text(&self, offset: usize) -> &'src str {
        let start = self.line_start(offset);
        let rest = &self.text[start..];
        let line = rest.split('\n').next().unwrap_or("");
        line.strip_suffix('\r').unwrap_or(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locations() {
        let input = Input::new("(a\n  bc)\n\nxyz");
        // (offset, line, column)
        let test_cases = [
            (0, 1, 1),
            (1, 1, 2),
            (2, 1, 3), // the newline itself belongs to line 1
            (3, 2, 1),
            (5, 2, 3),
            (8, 2, 6),
            (9, 3, 1),
            (10, 4, 1),
            (13, 4, 4), // end of input
            (99, 4, 4), // clamped
        ];
        for (offset, line, column) in test_cases {
            assert_eq!(
                input.location(offset),
                Location { line, column },
                "offset {offset}"
            );
        }
    }

    #[test]
    fn test_columns_count_code_points() {
        let input = Input::new("(λ é x)");
        let offset = input.text().find('x').unwrap_or_default();
        assert_eq!(input.location(offset), Location { line: 1, column: 6 });
    }

    #[test]
    fn test_line_text() {
        let input = Input::new("first\r\nsecond\nthird");
        assert_eq!(input.line_text(0), "first");
        assert_eq!(input.line_text(7), "second");
        assert_eq!(input.line_text(input.len()), "third");
        assert_eq!(Input::new("abc\n").line_text(4), "");
    }

    #[test]
    fn test_rest_and_char_at() {
        let input = Input::new("#t x");
        assert_eq!(input.rest(3), "x");
        assert_eq!(input.rest(10), "");
        assert_eq!(input.char_at(0), Some('#'));
        assert_eq!(input.char_at(4), None);
        assert_eq!(input.slice(0, 2), "#t");
    }
}
