//! Escape Sequence Parser
//!
//! Splits guest output into visible characters, line breaks and the small
//! set of CSI sequences the guest emits.
//!
//! # Wire format
//!
//! `ESC '[' <params> <final>` where `<final>` is one of `m l h H i`.
//! Only `m` (SGR) carries meaning here: its parameter is a colour code.
//! The other finals are consumed and reported as [`Token::Ignored`].
//!
//! States:
//! - Ground: normal text
//! - Escape: after ESC, expecting `[`
//! - Csi: collecting parameters until a final character

use super::color::ColorCode;

/// Characters that terminate a CSI sequence
pub const FINAL_CHARS: [char; 5] = ['m', 'l', 'h', 'H', 'i'];

/// Maximum number of parameter characters scanned before giving up
pub const MAX_PARAM_LEN: usize = 10;

const ESC: char = '\x1b';

/// Output of the parser
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    /// A visible character
    Text(char),
    /// Explicit newline in the content
    LineBreak,
    /// SGR colour change
    Style(ColorCode),
    /// A recognised sequence with no visible effect, tagged by its final
    Ignored(char),
}

/// Error type for escape sequence parsing
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("escape sequence has no final character within 10 parameter characters")]
    TooLong,

    #[error("expected '[' after ESC, found {0:?}")]
    MissingBracket(char),

    #[error("content ends inside an escape sequence")]
    Unterminated,

    #[error("unknown colour code {0:?}")]
    UnknownColor(String),
}

/// Parser state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Ground,
    Escape,
    Csi,
}

/// Incremental escape sequence parser
#[derive(Debug)]
pub struct EscapeParser {
    state: State,
    /// Parameter characters of the sequence being collected
    params: String,
}

impl Default for EscapeParser {
    fn default() -> Self {
        Self::new()
    }
}

impl EscapeParser {
    pub fn new() -> Self {
        Self {
            state: State::Ground,
            params: String::with_capacity(MAX_PARAM_LEN),
        }
    }

    /// Reset to the ground state
    pub fn reset(&mut self) {
        self.state = State::Ground;
        self.params.clear();
    }

    /// Process one character
    pub fn advance(&mut self, c: char) -> Result<Option<Token>, ParseError> {
        match self.state {
            State::Ground => Ok(self.process_ground(c)),
            State::Escape => self.process_escape(c),
            State::Csi => self.process_csi(c),
        }
    }

    /// Check that the input did not stop inside a sequence
    pub fn finish(&mut self) -> Result<(), ParseError> {
        let state = self.state;
        self.reset();
        match state {
            State::Ground => Ok(()),
            State::Escape | State::Csi => Err(ParseError::Unterminated),
        }
    }

    fn process_ground(&mut self, c: char) -> Option<Token> {
        match c {
            ESC => {
                self.state = State::Escape;
                None
            }
            '\n' => Some(Token::LineBreak),
            '\r' => None,
            _ => Some(Token::Text(c)),
        }
    }

    fn process_escape(&mut self, c: char) -> Result<Option<Token>, ParseError> {
        if c != '[' {
            self.reset();
            return Err(ParseError::MissingBracket(c));
        }
        self.state = State::Csi;
        self.params.clear();
        Ok(None)
    }

    fn process_csi(&mut self, c: char) -> Result<Option<Token>, ParseError> {
        if !FINAL_CHARS.contains(&c) {
            if self.params.chars().count() == MAX_PARAM_LEN {
                self.reset();
                return Err(ParseError::TooLong);
            }
            self.params.push(c);
            return Ok(None);
        }

        let token = if c == 'm' {
            parse_sgr(&self.params).map(Token::Style)
        } else {
            Ok(Token::Ignored(c))
        };
        self.reset();
        token.map(Some)
    }
}

/// Interpret an SGR parameter string as a single colour code.
///
/// An empty parameter is the SGR reset. Compound parameters such as `1;31`
/// are rejected along with codes outside the colour table.
fn parse_sgr(params: &str) -> Result<ColorCode, ParseError> {
    if params.is_empty() {
        return Ok(ColorCode::RESET);
    }
    if !params.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ParseError::UnknownColor(params.to_string()));
    }
    params
        .parse::<u8>()
        .ok()
        .and_then(ColorCode::new)
        .ok_or_else(|| ParseError::UnknownColor(params.to_string()))
}

/// Parse a complete piece of content into tokens
pub fn tokenize(content: &str) -> Result<Vec<Token>, ParseError> {
    let mut parser = EscapeParser::new();
    let mut tokens = Vec::with_capacity(content.len());
    for c in content.chars() {
        if let Some(token) = parser.advance(c)? {
            tokens.push(token);
        }
    }
    parser.finish()?;
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn color(code: u8) -> Token {
        Token::Style(ColorCode::new(code).unwrap())
    }

    fn text(s: &str) -> Vec<Token> {
        s.chars().map(Token::Text).collect()
    }

    #[test]
    fn test_plain_text() {
        assert_eq!(tokenize("abc").unwrap(), text("abc"));
    }

    #[test]
    fn test_sgr_color() {
        let mut expected = vec![color(31)];
        expected.extend(text("RED"));
        expected.push(color(0));
        expected.extend(text("END"));
        assert_eq!(tokenize("\x1b[31mRED\x1b[0mEND").unwrap(), expected);
    }

    #[test]
    fn test_line_breaks() {
        assert_eq!(
            tokenize("a\r\nb").unwrap(),
            vec![Token::Text('a'), Token::LineBreak, Token::Text('b')]
        );
    }

    #[test]
    fn test_non_sgr_finals_ignored() {
        assert_eq!(
            tokenize("\x1b[?25l\x1b[?25h\x1b[Hx\x1b[5i").unwrap(),
            vec![
                Token::Ignored('l'),
                Token::Ignored('h'),
                Token::Ignored('H'),
                Token::Text('x'),
                Token::Ignored('i'),
            ]
        );
    }

    #[test]
    fn test_empty_sgr_resets() {
        assert_eq!(tokenize("\x1b[m").unwrap(), vec![color(0)]);
    }

    #[test]
    fn test_unknown_color_fails_closed() {
        assert_eq!(
            tokenize("\x1b[38mX"),
            Err(ParseError::UnknownColor("38".to_string()))
        );
        assert_eq!(
            tokenize("\x1b[1;31mX"),
            Err(ParseError::UnknownColor("1;31".to_string()))
        );
        assert_eq!(
            tokenize("\x1b[300m"),
            Err(ParseError::UnknownColor("300".to_string()))
        );
    }

    #[test]
    fn test_parameter_run_is_bounded() {
        // Ten parameter characters still terminate
        assert_eq!(
            tokenize("\x1b[0123456789l").unwrap(),
            vec![Token::Ignored('l')]
        );
        // The eleventh fails instead of scanning on
        let long = format!("\x1b[{}", "1".repeat(11));
        assert_eq!(tokenize(&long), Err(ParseError::TooLong));
        let longer = format!("\x1b[{}m", "1".repeat(200));
        assert_eq!(tokenize(&longer), Err(ParseError::TooLong));
    }

    #[test]
    fn test_missing_bracket() {
        assert_eq!(tokenize("\x1bX"), Err(ParseError::MissingBracket('X')));
    }

    #[test]
    fn test_unterminated() {
        assert_eq!(tokenize("abc\x1b"), Err(ParseError::Unterminated));
        assert_eq!(tokenize("abc\x1b[31"), Err(ParseError::Unterminated));
    }

    #[test]
    fn test_parser_recovers_after_error() {
        let mut parser = EscapeParser::new();
        for c in "\x1b[".chars() {
            parser.advance(c).unwrap();
        }
        assert_eq!(parser.advance('\x1b'), Ok(None));
        assert!(parser.advance('9').is_ok());
        assert!(parser.advance('9').is_ok());
        assert!(parser.advance('m').is_err());
        assert_eq!(parser.advance('z'), Ok(Some(Token::Text('z'))));
    }
}
