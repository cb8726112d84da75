//! Input Encoding Module
//!
//! Translates key presses into the single-byte codes the guest reads from
//! its stdin queue.
//!
//! # Keyboard Encoding
//!
//! | Key | Byte |
//! |-----|------|
//! | Backspace | `0x7F` |
//! | Enter | `0x0D` |
//! | Escape | `0x1B` |
//! | Ctrl+C | `0x03` |
//! | printable | first character, if it fits in one byte |
//!
//! Modifier-only presses, other Ctrl combinations and the remaining named
//! keys produce nothing.

pub const KEY_BACKSPACE: u8 = 0x7F;
pub const KEY_ENTER: u8 = 0x0D;
pub const KEY_ESCAPE: u8 = 0x1B;
pub const CTRL_C: u8 = 0x03;

/// Keyboard modifiers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        ctrl: false,
        alt: false,
    };

    pub const CTRL: Modifiers = Modifiers {
        shift: false,
        ctrl: true,
        alt: false,
    };

    /// Check if any modifier is pressed
    pub fn any(&self) -> bool {
        self.shift || self.ctrl || self.alt
    }
}

/// A key press as reported by the front end
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    /// Text produced by the key, already shifted
    Character(String),

    // Editing
    Backspace,
    Enter,
    Escape,
    Tab,
    Delete,
    Insert,

    // Cursor and navigation
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,

    /// Function key F1-F24
    Function(u8),

    // Modifier-only presses
    Shift,
    Control,
    Alt,
    Super,
}

impl Key {
    pub fn is_modifier(&self) -> bool {
        matches!(self, Key::Shift | Key::Control | Key::Alt | Key::Super)
    }
}

/// Encode a key press as one stdin byte
pub fn encode_key(key: &Key, modifiers: Modifiers) -> Option<u8> {
    match key {
        Key::Backspace => Some(KEY_BACKSPACE),
        Key::Enter => Some(KEY_ENTER),
        Key::Escape => Some(KEY_ESCAPE),
        Key::Character(text) if modifiers.ctrl => (text == "c").then_some(CTRL_C),
        Key::Character(text) => encode_character(text),
        _ => None,
    }
}

fn encode_character(text: &str) -> Option<u8> {
    let c = text.chars().next()?;
    u8::try_from(u32::from(c)).ok()
}
