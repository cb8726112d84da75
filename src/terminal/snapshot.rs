//! Frame snapshots
//!
//! Serializable copy of the displayed frame, used by the headless driver
//! and by tests. Given the same output bytes and grid, two terminals produce
//! identical snapshots.

use serde::{Deserialize, Serialize};

use super::color::NamedColor;
use super::{Frame, Grid};

/// A complete snapshot of the displayed frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameSnapshot {
    /// Grid dimensions
    pub columns: usize,
    pub rows: usize,
    /// Number of committed renders so far
    pub generation: u64,
    pub spans: Vec<SpanSnapshot>,
}

/// Snapshot of one styled span
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpanSnapshot {
    pub row: usize,
    pub column: usize,
    pub code: u8,
    pub color: NamedColor,
    pub text: String,
}

impl FrameSnapshot {
    pub fn capture(frame: &Frame, grid: &Grid) -> Self {
        FrameSnapshot {
            columns: grid.columns,
            rows: grid.rows,
            generation: frame.generation(),
            spans: frame
                .spans()
                .iter()
                .map(|span| SpanSnapshot {
                    row: span.row,
                    column: span.column,
                    code: span.color.code(),
                    color: span.color.named(),
                    text: span.text.clone(),
                })
                .collect(),
        }
    }

    /// Convert snapshot to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Parse snapshot from JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Plain text rendering of the frame, one line per row.
    ///
    /// Rows past the bottom of the grid are kept so nothing is lost when
    /// the guest overflows the screen.
    pub fn to_text(&self) -> String {
        let mut lines: Vec<Vec<char>> = Vec::new();

        for span in &self.spans {
            if lines.len() <= span.row {
                lines.resize_with(span.row + 1, Vec::new);
            }
            let line = &mut lines[span.row];
            for (offset, c) in span.text.chars().enumerate() {
                let column = span.column + offset;
                if line.len() <= column {
                    line.resize(column + 1, ' ');
                }
                line[column] = c;
            }
        }

        let mut result = String::new();
        for line in &lines {
            let text: String = line.iter().collect();
            result.push_str(text.trim_end());
            result.push('\n');
        }
        result
    }
}
