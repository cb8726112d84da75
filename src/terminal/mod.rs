//! Terminal
//!
//! Escape-sequence-aware renderer plus the guest's input queue.
//!
//! The terminal does not draw anything itself. Each successful render
//! replaces the current [`Frame`], a list of positioned [`StyledSpan`]s that
//! a front end rasterises (or the headless driver dumps).

mod color;
mod escape;
mod grid;
mod layout;
mod snapshot;
mod stdin;

pub use color::{ColorCode, NamedColor};
pub use escape::{tokenize, EscapeParser, ParseError, Token, FINAL_CHARS, MAX_PARAM_LEN};
pub use grid::{CellSize, Grid};
pub use layout::{layout, layout_plain, StyledSpan};
pub use snapshot::{FrameSnapshot, SpanSnapshot};
pub use stdin::{StdinQueue, NO_INPUT};

/// The content currently on display
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    spans: Vec<StyledSpan>,
    generation: u64,
}

impl Frame {
    pub fn spans(&self) -> &[StyledSpan] {
        &self.spans
    }

    /// Incremented on every committed render
    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn replace(&mut self, spans: Vec<StyledSpan>) {
        self.spans = spans;
        self.generation += 1;
    }
}

/// Character-cell terminal state
#[derive(Debug, Default)]
pub struct Terminal {
    grid: Grid,
    frame: Frame,
    stdin: StdinQueue,
}

impl Terminal {
    pub fn new(grid: Grid) -> Self {
        Self {
            grid,
            frame: Frame::default(),
            stdin: StdinQueue::new(),
        }
    }

    /// Render guest output.
    ///
    /// Bytes are decoded as UTF-8 (lossily). On a parse error the previous
    /// frame stays on display. Empty content is not a render.
    pub fn set_content(&mut self, bytes: &[u8]) -> Result<(), ParseError> {
        if bytes.is_empty() {
            return Ok(());
        }
        let content = String::from_utf8_lossy(bytes);
        let spans = layout(&content, self.grid.columns)?;
        self.frame.replace(spans);
        Ok(())
    }

    /// Replace the display with a host message, bypassing escape parsing
    pub fn print_message(&mut self, message: &str) {
        let spans = layout_plain(message, self.grid.columns);
        self.frame.replace(spans);
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Apply new geometry. The current frame is kept as laid out.
    pub fn resize(&mut self, grid: Grid) {
        if grid != self.grid {
            tracing::debug!(columns = grid.columns, rows = grid.rows, "terminal resized");
        }
        self.grid = grid;
    }

    pub fn width(&self) -> usize {
        self.grid.columns
    }

    pub fn height(&self) -> usize {
        self.grid.rows
    }

    /// Queue one input byte for the guest
    pub fn push_input(&mut self, byte: u8) {
        self.stdin.push(byte);
    }

    /// Pop one input byte, or [`NO_INPUT`]
    pub fn read_char(&mut self) -> i32 {
        self.stdin.read_char()
    }

    pub fn stdin(&self) -> &StdinQueue {
        &self.stdin
    }

    pub fn snapshot(&self) -> FrameSnapshot {
        FrameSnapshot::capture(&self.frame, &self.grid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_content_commits_frame() {
        let mut terminal = Terminal::new(Grid::with_size(10, 2));
        assert_eq!(terminal.frame().generation(), 0);

        terminal.set_content(b"hello").unwrap();
        assert_eq!(terminal.frame().generation(), 1);
        assert_eq!(terminal.frame().spans()[0].text, "hello");
    }

    #[test]
    fn test_empty_content_keeps_previous_frame() {
        let mut terminal = Terminal::new(Grid::with_size(10, 2));
        terminal.set_content(b"hello").unwrap();
        terminal.set_content(b"").unwrap();

        assert_eq!(terminal.frame().generation(), 1);
        assert_eq!(terminal.frame().spans()[0].text, "hello");
    }

    #[test]
    fn test_parse_error_keeps_previous_frame() {
        let mut terminal = Terminal::new(Grid::with_size(10, 2));
        terminal.set_content(b"hello").unwrap();
        let before = terminal.frame().clone();

        let err = terminal.set_content(b"bad\x1b[12345678901").unwrap_err();
        assert_eq!(err, ParseError::TooLong);
        assert_eq!(terminal.frame(), &before);
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let mut terminal = Terminal::new(Grid::with_size(10, 2));
        terminal.set_content(&[b'a', 0xC3, b'b']).unwrap();
        assert_eq!(terminal.frame().spans()[0].text, "a\u{FFFD}b");
    }

    #[test]
    fn test_print_message_bypasses_parser() {
        let mut terminal = Terminal::new(Grid::with_size(80, 2));
        terminal.print_message("exit \x1b[999m 2");
        assert_eq!(terminal.frame().spans()[0].text, "exit \x1b[999m 2");
        assert_eq!(terminal.frame().spans()[0].color, ColorCode::WHITE);
    }

    #[test]
    fn test_read_char() {
        let mut terminal = Terminal::default();
        terminal.push_input(b'q');
        assert_eq!(terminal.read_char(), b'q' as i32);
        assert_eq!(terminal.read_char(), NO_INPUT);
    }

    #[test]
    fn test_resize_keeps_frame() {
        let mut terminal = Terminal::new(Grid::with_size(10, 2));
        terminal.set_content(b"hi").unwrap();
        terminal.resize(Grid::with_size(40, 12));
        assert_eq!(terminal.width(), 40);
        assert_eq!(terminal.height(), 12);
        assert_eq!(terminal.frame().generation(), 1);
    }
}
