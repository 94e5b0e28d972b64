//! Structured events produced by the input parser.

// =============================================================================
// Keys
// =============================================================================

/// A key press.
///
/// `name` is the lowercase key name (`"a"`, `"enter"`, `"f5"`, `"up"`); `ch`
/// is the character a printable key produces. `full` is the name with
/// `C-`/`M-`/`S-` prefixes, the form key bindings are written in.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KeyEvent {
    pub name: String,
    pub ch: Option<char>,
    pub ctrl: bool,
    pub meta: bool,
    pub shift: bool,
    pub sequence: String,
    pub full: String,
}

impl KeyEvent {
    pub fn new(name: &str, sequence: &[u8]) -> Self {
        let mut key = Self {
            name: name.to_string(),
            sequence: String::from_utf8_lossy(sequence).into_owned(),
            ..Default::default()
        };
        key.refresh_full();
        key
    }

    pub fn with_char(mut self, ch: char) -> Self {
        self.ch = Some(ch);
        self
    }

    /// OR in modifiers and recompute `full`.
    pub fn with_modifiers(mut self, shift: bool, meta: bool, ctrl: bool) -> Self {
        self.shift |= shift;
        self.meta |= meta;
        self.ctrl |= ctrl;
        self.refresh_full();
        self
    }

    fn refresh_full(&mut self) {
        let mut full = String::new();
        if self.ctrl {
            full.push_str("C-");
        }
        if self.meta {
            full.push_str("M-");
        }
        if self.shift && !self.name.is_empty() {
            full.push_str("S-");
        }
        match (self.name.is_empty(), self.ch) {
            (false, _) => full.push_str(&self.name),
            (true, Some(c)) => full.push(c),
            (true, None) => {}
        }
        self.full = full;
    }

    /// True if this is the named key with no modifiers.
    pub fn is(&self, name: &str) -> bool {
        self.full == name
    }
}

// =============================================================================
// Mouse
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseAction {
    MouseDown,
    MouseUp,
    MouseMove,
    WheelUp,
    WheelDown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
    #[default]
    None,
}

/// One decoded mouse report, in zero-based cell coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MouseEvent {
    pub action: MouseAction,
    pub button: MouseButton,
    pub x: u16,
    pub y: u16,
    pub shift: bool,
    pub meta: bool,
    pub ctrl: bool,
    pub raw: Vec<u8>,
}

// =============================================================================
// Responses
// =============================================================================

/// Replies to queries the driver sent to the terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// `CSI ? ... c` or, when `secondary`, `CSI > ... c`.
    DeviceAttributes { secondary: bool, params: Vec<u32> },
    /// Zero-based cursor position from `CSI row ; col R`.
    CursorPosition { x: u16, y: u16 },
    /// `CSI ... n`
    DeviceStatus(Vec<u32>),
    /// `CSI kind ; ... t`
    WindowReport { kind: u32, params: Vec<u32> },
    /// `OSC code ; data` terminated by BEL or ST.
    Osc { code: Option<u32>, data: String },
    /// `DCS data ST`
    Dcs(String),
}

// =============================================================================
// Event
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Key(KeyEvent),
    Mouse(MouseEvent),
    Response(Response),
    /// Terminal window gained focus.
    Focus,
    /// Terminal window lost focus.
    Blur,
    /// Bracketed paste content.
    Paste(String),
    Resize { cols: u16, rows: u16 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_name_prefixes() {
        let k = KeyEvent::new("a", b"\x01").with_modifiers(false, false, true);
        assert_eq!(k.full, "C-a");
        let k = KeyEvent::new("up", b"\x1b[1;4A").with_modifiers(true, true, false);
        assert_eq!(k.full, "M-S-up");
        assert!(KeyEvent::new("enter", b"\r").is("enter"));
    }
}
