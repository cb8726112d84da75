//! Configuration for the host

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::bridge::ClockKind;
use crate::terminal::{ColorCode, Grid};

/// Guest module loaded when no URL is given, fixed at build time
pub const DEFAULT_MODULE_URL: &str = match option_env!("WASM_TERMINAL_HOST_MODULE") {
    Some(url) => url,
    None => "main.wasm",
};

/// 15625 pages of 64 KiB, about 1 GB
pub const DEFAULT_MEMORY_PAGES: u32 = 15625;

/// Host configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Path, `file://` URL or `http(s)://` URL of the guest module
    pub module_url: String,
    /// Exported function invoked by `run`
    pub entry_point: String,
    /// Size of the host-provided linear memory, in wasm pages
    pub memory_pages: u32,
    /// Real or frame-stepped time
    pub clock: ClockKind,
    /// Display refreshes per second
    pub frame_rate: u32,
    /// Grid used until a front end measures the real one
    pub columns: usize,
    pub rows: usize,
    pub font: FontConfig,
    pub colors: ColorPalette,
    pub window: WindowConfig,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            module_url: DEFAULT_MODULE_URL.to_string(),
            entry_point: "wasm_main".to_string(),
            memory_pages: DEFAULT_MEMORY_PAGES,
            clock: ClockKind::Realtime,
            frame_rate: 60,
            columns: 80,
            rows: 24,
            font: FontConfig::default(),
            colors: ColorPalette::default(),
            window: WindowConfig::default(),
        }
    }
}

impl HostConfig {
    /// Default configuration for a given module
    pub fn for_module(url: impl Into<String>) -> Self {
        Self {
            module_url: url.into(),
            ..Self::default()
        }
    }

    /// Time between two frame ticks
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs(1) / self.frame_rate.max(1)
    }

    /// Initial character grid
    pub fn grid(&self) -> Grid {
        Grid::with_size(self.columns, self.rows)
    }
}

/// Font settings, in logical pixels (multiplied by the scale factor)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FontConfig {
    pub size: f32,
    pub line_height: f32,
    /// Candidate font files, first readable one wins
    pub paths: Vec<String>,
}

impl Default for FontConfig {
    fn default() -> Self {
        Self {
            size: 16.0,
            line_height: 16.0,
            paths: [
                "/usr/share/fonts/truetype/terminus/TerminusTTF-Bold.ttf",
                "/usr/share/fonts/truetype/ubuntu/UbuntuMono-B.ttf",
                "/usr/share/fonts/truetype/dejavu/DejaVuSansMono-Bold.ttf",
                "/usr/share/fonts/TTF/DejaVuSansMono-Bold.ttf",
                "/usr/share/fonts/truetype/liberation/LiberationMono-Bold.ttf",
                "/usr/share/fonts/truetype/dejavu/DejaVuSansMono.ttf",
                "/usr/share/fonts/TTF/DejaVuSansMono.ttf",
                "/System/Library/Fonts/Menlo.ttc",
                "C:\\Windows\\Fonts\\consolab.ttf",
            ]
            .iter()
            .map(|path| path.to_string())
            .collect(),
        }
    }
}

/// Color palette configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColorPalette {
    /// Background behind the grid
    pub background: (u8, u8, u8),
    /// The 16 ANSI colors (0-15)
    pub ansi: [(u8, u8, u8); 16],
}

impl Default for ColorPalette {
    fn default() -> Self {
        Self {
            background: (0, 0, 0),
            ansi: [
                (0, 0, 0),       // 0: Black
                (205, 0, 0),     // 1: Red
                (0, 205, 0),     // 2: Green
                (205, 205, 0),   // 3: Yellow
                (0, 0, 238),     // 4: Blue
                (205, 0, 205),   // 5: Magenta
                (0, 205, 205),   // 6: Cyan
                (255, 255, 255), // 7: White
                (127, 127, 127), // 8: Bright Black
                (255, 0, 0),     // 9: Bright Red
                (0, 255, 0),     // 10: Bright Green
                (255, 255, 0),   // 11: Bright Yellow
                (92, 92, 255),   // 12: Bright Blue
                (255, 0, 255),   // 13: Bright Magenta
                (0, 255, 255),   // 14: Bright Cyan
                (255, 255, 255), // 15: Bright White
            ],
        }
    }
}

impl ColorPalette {
    /// RGB value of a colour code
    pub fn rgb(&self, code: ColorCode) -> (u8, u8, u8) {
        self.ansi[code.named().ansi_index()]
    }
}

/// Window configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    /// Initial inner size in logical pixels
    pub width: u32,
    pub height: u32,
    /// Window title
    pub title: String,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 640,
            title: "Wasm Terminal".to_string(),
        }
    }
}
