//! Line layout
//!
//! Turns a token stream into positioned styled spans. A run of characters is
//! flushed as a span whenever the style changes, the line wraps, a line
//! break occurs, or the input ends.

use serde::{Deserialize, Serialize};

use super::color::ColorCode;
use super::escape::{EscapeParser, ParseError, Token};

/// A run of visible characters sharing one colour
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyledSpan {
    pub row: usize,
    pub column: usize,
    pub color: ColorCode,
    pub text: String,
}

/// Accumulates spans from tokens
#[derive(Debug)]
struct Layout {
    columns: usize,
    row: usize,
    column: usize,
    color: ColorCode,
    run: String,
    run_start: (usize, usize),
    spans: Vec<StyledSpan>,
}

impl Layout {
    fn new(columns: usize) -> Self {
        Self {
            columns,
            row: 0,
            column: 0,
            color: ColorCode::WHITE,
            run: String::new(),
            run_start: (0, 0),
            spans: Vec::new(),
        }
    }

    fn push(&mut self, token: Token) {
        match token {
            Token::Text(c) => self.print(c),
            Token::LineBreak => {
                self.flush();
                self.newline();
            }
            Token::Style(color) => {
                self.flush();
                self.color = color;
            }
            Token::Ignored(_) => {}
        }
    }

    fn print(&mut self, c: char) {
        if self.run.is_empty() {
            self.run_start = (self.row, self.column);
        }
        self.run.push(c);
        self.column += 1;

        if self.columns > 0 && self.column == self.columns {
            self.flush();
            self.newline();
        }
    }

    fn newline(&mut self) {
        self.row += 1;
        self.column = 0;
    }

    fn flush(&mut self) {
        if self.run.is_empty() {
            return;
        }
        let (row, column) = self.run_start;
        self.spans.push(StyledSpan {
            row,
            column,
            color: self.color,
            text: std::mem::take(&mut self.run),
        });
    }

    fn finish(mut self) -> Vec<StyledSpan> {
        self.flush();
        self.spans
    }
}

/// Parse escape sequences and lay out `content` on a grid `columns` wide.
///
/// Zero columns disables wrapping.
pub fn layout(content: &str, columns: usize) -> Result<Vec<StyledSpan>, ParseError> {
    let mut parser = EscapeParser::new();
    let mut layout = Layout::new(columns);
    for c in content.chars() {
        if let Some(token) = parser.advance(c)? {
            layout.push(token);
        }
    }
    parser.finish()?;
    Ok(layout.finish())
}

/// Lay out text without interpreting escape sequences
pub fn layout_plain(text: &str, columns: usize) -> Vec<StyledSpan> {
    let mut layout = Layout::new(columns);
    for c in text.chars() {
        match c {
            '\n' => layout.push(Token::LineBreak),
            '\r' => {}
            _ => layout.push(Token::Text(c)),
        }
    }
    layout.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(row: usize, column: usize, code: u8, text: &str) -> StyledSpan {
        StyledSpan {
            row,
            column,
            color: ColorCode::new(code).unwrap(),
            text: text.to_string(),
        }
    }

    #[test]
    fn test_wrap_after_exactly_width() {
        let spans = layout("0123456789X", 10).unwrap();
        assert_eq!(
            spans,
            vec![span(0, 0, 37, "0123456789"), span(1, 0, 37, "X")]
        );
    }

    #[test]
    fn test_exact_width_has_no_extra_span() {
        let spans = layout("0123456789", 10).unwrap();
        assert_eq!(spans, vec![span(0, 0, 37, "0123456789")]);
    }

    #[test]
    fn test_color_runs() {
        let spans = layout("\x1b[31mRED\x1b[0mEND", 80).unwrap();
        assert_eq!(spans, vec![span(0, 0, 31, "RED"), span(0, 3, 0, "END")]);
    }

    #[test]
    fn test_newline_resets_column() {
        let spans = layout("ab\ncd", 80).unwrap();
        assert_eq!(spans, vec![span(0, 0, 37, "ab"), span(1, 0, 37, "cd")]);
    }

    #[test]
    fn test_style_change_mid_line_keeps_column() {
        let spans = layout("ab\x1b[32mcd\x1b[33m", 3).unwrap();
        assert_eq!(
            spans,
            vec![
                span(0, 0, 37, "ab"),
                span(0, 2, 32, "c"),
                span(1, 0, 32, "d"),
            ]
        );
    }

    #[test]
    fn test_escape_sequences_do_not_count_as_columns() {
        let spans = layout("\x1b[?25l\x1b[Habc", 3).unwrap();
        assert_eq!(spans, vec![span(0, 0, 37, "abc")]);
    }

    #[test]
    fn test_zero_columns_never_wraps() {
        let spans = layout("abcdef", 0).unwrap();
        assert_eq!(spans, vec![span(0, 0, 37, "abcdef")]);
    }

    #[test]
    fn test_plain_ignores_escapes() {
        let spans = layout_plain("\x1b[31mhi\nthere", 80);
        assert_eq!(
            spans,
            vec![span(0, 0, 37, "\x1b[31mhi"), span(1, 0, 37, "there")]
        );
    }

    #[test]
    fn test_parse_error_propagates() {
        assert_eq!(
            layout("ok\x1b[99m", 80),
            Err(ParseError::UnknownColor("99".to_string()))
        );
    }
}
