//! Font Rendering
//!
//! Loads a monospace system font and rasterises glyphs with fontdue.

use std::collections::HashMap;
use std::path::Path;

use fontdue::{Font, FontSettings};
use tracing::{debug, info};

use crate::terminal::CellSize;

#[derive(Debug, thiserror::Error)]
pub enum FontError {
    #[error("failed to parse font: {0}")]
    Parse(String),

    #[error("no usable font among {0} candidates")]
    NoFontFound(usize),
}

/// A rasterised glyph, alpha coverage one byte per pixel
#[derive(Debug, Clone)]
pub struct Glyph {
    pub bitmap: Vec<u8>,
    pub width: usize,
    pub height: usize,
    pub xmin: i32,
    pub ymin: i32,
}

/// One font at one pixel size, with its glyphs cached
pub struct GlyphCache {
    font: Font,
    size: f32,
    glyphs: HashMap<char, Glyph>,
}

impl GlyphCache {
    /// Load the first readable font from `paths`
    pub fn load(paths: &[String], size: f32) -> Result<Self, FontError> {
        for path in paths {
            let Ok(data) = std::fs::read(Path::new(path)) else {
                continue;
            };
            match Self::from_bytes(&data, size) {
                Ok(cache) => {
                    info!(path = %path, size, "font loaded");
                    return Ok(cache);
                }
                Err(err) => debug!(path = %path, error = %err, "skipping font"),
            }
        }
        Err(FontError::NoFontFound(paths.len()))
    }

    pub fn from_bytes(data: &[u8], size: f32) -> Result<Self, FontError> {
        let font = Font::from_bytes(data, FontSettings::default())
            .map_err(|err| FontError::Parse(err.to_string()))?;
        Ok(Self {
            font,
            size,
            glyphs: HashMap::new(),
        })
    }

    /// Change the pixel size, dropping every cached glyph
    pub fn set_size(&mut self, size: f32) {
        if size != self.size {
            self.size = size;
            self.glyphs.clear();
        }
    }

    /// Cell box for this font: the advance of `M` by `line_height`
    pub fn cell_size(&self, line_height: f32) -> CellSize {
        let metrics = self.font.metrics('M', self.size);
        CellSize {
            width: metrics.advance_width.ceil().max(1.0),
            height: line_height.ceil().max(1.0),
        }
    }

    /// Baseline offset from the top of a cell
    pub fn baseline(&self) -> f32 {
        self.font
            .horizontal_line_metrics(self.size)
            .map_or(self.size, |metrics| metrics.ascent)
    }

    pub fn glyph(&mut self, c: char) -> &Glyph {
        let (font, size) = (&self.font, self.size);
        self.glyphs.entry(c).or_insert_with(|| {
            let (metrics, bitmap) = font.rasterize(c, size);
            Glyph {
                bitmap,
                width: metrics.width,
                height: metrics.height,
                xmin: metrics.xmin,
                ymin: metrics.ymin,
            }
        })
    }
}
