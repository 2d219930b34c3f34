use crate::parser::ParseError;

/// Byte-offset to line/column conversion, built once per diagnostic.
/// Lines and columns are 1-indexed for display.
pub struct LineIndex {
    line_starts: Vec<u32>,
    source_len: u32,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0u32];
        for (i, ch) in source.char_indices() {
            if ch == '\n' {
                line_starts.push((i + 1) as u32);
            }
        }
        LineIndex { line_starts, source_len: source.len() as u32 }
    }

    pub fn line_col(&self, byte_offset: u32) -> (usize, usize) {
        let offset = byte_offset.min(self.source_len);

        let line_idx = match self.line_starts.binary_search(&offset) {
            Ok(idx) => idx,
            Err(idx) => idx.saturating_sub(1),
        };

        let line = line_idx + 1;
        let col = (offset - self.line_starts[line_idx]) as usize + 1;
        (line, col)
    }

    pub fn line_text<'a>(&self, source: &'a str, line: usize) -> &'a str {
        if line == 0 || line > self.line_starts.len() {
            return "";
        }
        let start = self.line_starts[line - 1] as usize;
        let end = self.line_starts.get(line).map(|&e| e as usize).unwrap_or(source.len());

        source[start..end].trim_end_matches('\n')
    }
}

fn underline(col_start: usize, col_end: usize) -> String {
    let prefix = " ".repeat(col_start - 1);
    let carets = "^".repeat(col_end.saturating_sub(col_start).max(1));
    format!("{}{}", prefix, carets)
}

/// Renders a parse error the way the formatter reports it: message,
/// `file:line:col` locator, the offending source line, and a caret run
/// under the token.
pub fn render_parse_error(error: &ParseError, path: &str, source: &str) -> String {
    let line_index = LineIndex::new(source);
    let (line, col_start) = line_index.line_col(error.span.start);
    let (end_line, col_end) = line_index.line_col(error.span.end);
    let col_end = if end_line == line { col_end } else { col_start + 1 };
    let line_text = line_index.line_text(source, line);

    format!(
        "error: {}\n  --> {}:{}:{}\n   |\n{:>3}| {}\n   | {}",
        error,
        path,
        line,
        col_start,
        line,
        line_text,
        underline(col_start, col_end)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_col() {
        let index = LineIndex::new("ab\ncd\n");
        assert_eq!(index.line_col(0), (1, 1));
        assert_eq!(index.line_col(1), (1, 2));
        assert_eq!(index.line_col(3), (2, 1));
        assert_eq!(index.line_col(6), (3, 1));
    }

    #[test]
    fn test_line_col_past_end_clamps() {
        let index = LineIndex::new("ab");
        assert_eq!(index.line_col(99), (1, 3));
    }

    #[test]
    fn test_line_text() {
        let source = "first\nsecond\n";
        let index = LineIndex::new(source);
        assert_eq!(index.line_text(source, 1), "first");
        assert_eq!(index.line_text(source, 2), "second");
        assert_eq!(index.line_text(source, 9), "");
    }

    #[test]
    fn test_underline() {
        assert_eq!(underline(1, 3), "^^");
        assert_eq!(underline(3, 3), "  ^");
        assert_eq!(underline(4, 6), "   ^^");
    }
}
