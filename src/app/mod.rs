//! Application glue module
//!
//! Configuration and logging shared by the GUI and headless front ends.

mod config;
pub mod logging;

pub use config::{
    ColorPalette, FontConfig, HostConfig, WindowConfig, DEFAULT_MEMORY_PAGES, DEFAULT_MODULE_URL,
};
