//! Terminal renderer using softbuffer (CPU rendering)
//!
//! Paints the current [`Frame`] into the window: a background fill, then
//! every span's glyphs at their grid positions.

use std::num::NonZeroU32;
use std::rc::Rc;

use softbuffer::{Context, Surface};
use winit::window::Window;

use super::font::{FontError, Glyph, GlyphCache};
use crate::app::{ColorPalette, FontConfig};
use crate::terminal::{CellSize, Frame, Grid};

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("graphics surface error: {0}")]
    Surface(#[from] softbuffer::SoftBufferError),

    #[error(transparent)]
    Font(#[from] FontError),
}

pub struct Renderer {
    #[allow(dead_code)]
    context: Context<Rc<Window>>,
    surface: Surface<Rc<Window>, Rc<Window>>,
    glyphs: GlyphCache,
    /// Logical font size and line height, before scaling
    font_size: f32,
    line_height: f32,
    scale_factor: f32,
    width: u32,
    height: u32,
}

impl Renderer {
    pub fn new(window: Rc<Window>, font: &FontConfig) -> Result<Self, RenderError> {
        let context = Context::new(window.clone())?;
        let surface = Surface::new(&context, window.clone())?;

        // The scale factor plays the part of the device pixel ratio
        let scale_factor = window.scale_factor() as f32;
        let glyphs = GlyphCache::load(&font.paths, font.size * scale_factor)?;
        let size = window.inner_size();

        Ok(Self {
            context,
            surface,
            glyphs,
            font_size: font.size,
            line_height: font.line_height,
            scale_factor,
            width: size.width,
            height: size.height,
        })
    }

    pub fn set_scale_factor(&mut self, scale_factor: f32) {
        self.scale_factor = scale_factor;
        self.glyphs.set_size(self.font_size * scale_factor);
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    /// Cell box in physical pixels
    pub fn cell_size(&self) -> CellSize {
        self.glyphs.cell_size(self.line_height * self.scale_factor)
    }

    /// The grid that fits the current surface
    pub fn grid(&self) -> Grid {
        Grid::fit(self.width as f32, self.height as f32, self.cell_size())
    }

    pub fn render(
        &mut self,
        frame: &Frame,
        grid: &Grid,
        palette: &ColorPalette,
    ) -> Result<(), RenderError> {
        let (Some(width), Some(height)) =
            (NonZeroU32::new(self.width), NonZeroU32::new(self.height))
        else {
            return Ok(());
        };
        self.surface.resize(width, height)?;

        let buf_width = self.width as usize;
        let buf_height = self.height as usize;
        let baseline = self.glyphs.baseline();

        let mut buffer = self.surface.buffer_mut()?;
        buffer.fill(rgb_to_pixel(palette.background));

        for span in frame.spans() {
            let color = palette.rgb(span.color);
            for (offset, c) in span.text.chars().enumerate() {
                if c == ' ' {
                    continue;
                }
                let (x, y) = grid.cell_origin(span.row, span.column + offset);
                let glyph = self.glyphs.glyph(c);
                draw_glyph(
                    &mut buffer,
                    buf_width,
                    buf_height,
                    (x as i32, y as i32),
                    glyph,
                    color,
                    baseline,
                );
            }
        }

        buffer.present()?;
        Ok(())
    }
}

/// Convert RGB to pixel value (ARGB format)
fn rgb_to_pixel((r, g, b): (u8, u8, u8)) -> u32 {
    0xFF00_0000 | (u32::from(r) << 16) | (u32::from(g) << 8) | u32::from(b)
}

fn pixel_to_rgb(pixel: u32) -> (u8, u8, u8) {
    ((pixel >> 16) as u8, (pixel >> 8) as u8, pixel as u8)
}

/// Alpha-blend a glyph whose cell starts at `origin`
fn draw_glyph(
    buffer: &mut [u32],
    buf_width: usize,
    buf_height: usize,
    origin: (i32, i32),
    glyph: &Glyph,
    color: (u8, u8, u8),
    baseline: f32,
) {
    let gx = origin.0 + glyph.xmin;
    let gy = origin.1 + baseline as i32 - glyph.ymin - glyph.height as i32;

    for dy in 0..glyph.height {
        let Ok(py) = usize::try_from(gy + dy as i32) else {
            continue;
        };
        if py >= buf_height {
            break;
        }
        for dx in 0..glyph.width {
            let Ok(px) = usize::try_from(gx + dx as i32) else {
                continue;
            };
            if px >= buf_width {
                break;
            }

            let alpha = u32::from(glyph.bitmap[dy * glyph.width + dx]);
            if alpha == 0 {
                continue;
            }
            let idx = py * buf_width + px;
            let Some(pixel) = buffer.get_mut(idx) else {
                continue;
            };
            if alpha == 255 {
                *pixel = rgb_to_pixel(color);
                continue;
            }
            let existing = pixel_to_rgb(*pixel);
            let blend = |fg: u8, bg: u8| {
                ((u32::from(fg) * alpha + u32::from(bg) * (255 - alpha)) / 255) as u8
            };
            *pixel = rgb_to_pixel((
                blend(color.0, existing.0),
                blend(color.1, existing.1),
                blend(color.2, existing.2),
            ));
        }
    }
}
