//! Input byte-stream classifier.
//!
//! One buffer feeds four kinds of event:
//! - keys: printable text, control bytes, CSI/SS3 named keys, `ESC`+key meta
//! - mouse: X10 (`ESC [ M b x y`), urxvt (`ESC [ b;x;y M`), SGR (`ESC [ < b;x;y M|m`)
//! - terminal responses: DA, cursor reports, DSR, window reports, OSC, DCS
//! - focus in/out and bracketed paste
//!
//! Bytes that do not yet form a complete sequence stay buffered until more
//! input arrives or the caller's escape timeout calls [`InputParser::flush_pending`].
//! Malformed sequences are dropped at the first offending byte so they never
//! block what follows.

use tracing::trace;

use super::events::{Event, KeyEvent, MouseAction, MouseButton, MouseEvent, Response};

/// Longest CSI sequence accepted before the bytes are discarded.
const MAX_CSI_LEN: usize = 64;

/// Longest OSC/DCS reply accepted before the bytes are discarded.
const MAX_STRING_LEN: usize = 4096;

const PASTE_END: &[u8] = b"\x1b[201~";

enum Step {
    Emit(Event, usize),
    Skip(usize),
    Incomplete,
}

// =============================================================================
// Parser
// =============================================================================

/// Incremental input parser.
#[derive(Debug, Default)]
pub struct InputParser {
    buf: Vec<u8>,
    paste: Option<Vec<u8>>,
    cursor_queries: usize,
    last_button: MouseButton,
}

impl InputParser {
    pub fn new() -> Self {
        Self { buf: Vec::with_capacity(64), ..Default::default() }
    }

    /// A cursor position query was sent; the next `CSI r;c R` is its reply
    /// rather than a modified F3.
    pub fn expect_cursor_report(&mut self) {
        self.cursor_queries += 1;
    }

    /// Append bytes and return every event that is now complete.
    pub fn feed(&mut self, data: &[u8]) -> Vec<Event> {
        self.buf.extend_from_slice(data);
        let mut events = Vec::new();

        loop {
            if self.paste.is_some() {
                if !self.take_paste(&mut events) {
                    break;
                }
                continue;
            }
            if self.buf.is_empty() {
                break;
            }
            match self.step() {
                Step::Emit(ev, n) => {
                    self.buf.drain(..n);
                    events.push(ev);
                }
                Step::Skip(n) => {
                    trace!(bytes = n, "dropping unrecognized input");
                    self.buf.drain(..n.max(1).min(self.buf.len()));
                }
                Step::Incomplete => break,
            }
        }

        events
    }

    /// True if bytes are waiting for either more input or the escape timeout.
    pub fn has_pending(&self) -> bool {
        self.paste.is_none() && !self.buf.is_empty()
    }

    /// Escape timeout expired: a buffered `ESC` is the escape key itself.
    pub fn flush_pending(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        if self.paste.is_some() {
            return events;
        }
        while !self.buf.is_empty() {
            if self.buf[0] == 0x1b {
                self.buf.drain(..1);
                events.push(Event::Key(KeyEvent::new("escape", b"\x1b")));
                events.extend(self.feed(&[]));
            } else {
                trace!(byte = self.buf[0], "dropping truncated input");
                self.buf.drain(..1);
                events.extend(self.feed(&[]));
            }
        }
        events
    }

    fn take_paste(&mut self, events: &mut Vec<Event>) -> bool {
        let Some(paste) = self.paste.as_mut() else {
            return true;
        };
        if let Some(i) = find(&self.buf, PASTE_END) {
            paste.extend_from_slice(&self.buf[..i]);
            self.buf.drain(..i + PASTE_END.len());
            let content = self.paste.take().unwrap_or_default();
            events.push(Event::Paste(String::from_utf8_lossy(&content).into_owned()));
            true
        } else {
            let keep = partial_suffix(&self.buf, PASTE_END);
            let moved = self.buf.len() - keep;
            paste.extend(self.buf.drain(..moved));
            false
        }
    }

    fn step(&mut self) -> Step {
        if self.buf[0] == 0x1b {
            self.escape()
        } else {
            self.plain(0, false)
        }
    }

    // =========================================================================
    // Keys
    // =========================================================================

    /// Key starting at `at`. With `meta`, the preceding byte was `ESC`.
    fn plain(&self, at: usize, meta: bool) -> Step {
        let b = self.buf[at];
        let (name, ch, ctrl, shift, len): (String, Option<char>, bool, bool, usize) = match b {
            b'\r' => ("enter".into(), None, false, false, 1),
            b'\n' => ("linefeed".into(), None, false, false, 1),
            b'\t' => ("tab".into(), None, false, false, 1),
            0x08 | 0x7f => ("backspace".into(), None, false, false, 1),
            0x00 => ("space".into(), None, true, false, 1),
            0x01..=0x1a => (((b'a' + b - 1) as char).to_string(), None, true, false, 1),
            0x1c..=0x1f => (((b'\\' + b - 0x1c) as char).to_string(), None, true, false, 1),
            0x1b => ("escape".into(), None, false, false, 1),
            b' ' => ("space".into(), Some(' '), false, false, 1),
            b'A'..=b'Z' => ((b as char).to_ascii_lowercase().to_string(), Some(b as char), false, true, 1),
            0x21..=0x7e => ((b as char).to_string(), Some(b as char), false, false, 1),
            _ => {
                let Some(need) = utf8_len(b) else {
                    return Step::Skip(at + 1);
                };
                if self.buf.len() < at + need {
                    return Step::Incomplete;
                }
                match std::str::from_utf8(&self.buf[at..at + need]).ok().and_then(|s| s.chars().next()) {
                    Some(c) => (c.to_string(), Some(c), false, false, need),
                    None => return Step::Skip(at + 1),
                }
            }
        };
        let end = at + len;
        let mut key = KeyEvent::new(&name, &self.buf[..end]).with_modifiers(shift, meta, ctrl);
        key.ch = ch;
        Step::Emit(Event::Key(key), end)
    }

    fn escape(&mut self) -> Step {
        if self.buf.len() < 2 {
            return Step::Incomplete;
        }
        match self.buf[1] {
            b'[' => self.csi(),
            b'O' => self.ss3(),
            b']' => self.string_sequence(false),
            b'P' => self.string_sequence(true),
            0x1b => {
                let key = KeyEvent::new("escape", &self.buf[..2]).with_modifiers(false, true, false);
                Step::Emit(Event::Key(key), 2)
            }
            _ => self.plain(1, true),
        }
    }

    fn ss3(&self) -> Step {
        if self.buf.len() < 3 {
            return Step::Incomplete;
        }
        let (name, ctrl) = match self.buf[2] {
            b'A' => ("up", false),
            b'B' => ("down", false),
            b'C' => ("right", false),
            b'D' => ("left", false),
            b'E' => ("clear", false),
            b'F' => ("end", false),
            b'H' => ("home", false),
            b'P' => ("f1", false),
            b'Q' => ("f2", false),
            b'R' => ("f3", false),
            b'S' => ("f4", false),
            b'a' => ("up", true),
            b'b' => ("down", true),
            b'c' => ("right", true),
            b'd' => ("left", true),
            b'e' => ("clear", true),
            _ => return Step::Skip(3),
        };
        let key = KeyEvent::new(name, &self.buf[..3]).with_modifiers(false, false, ctrl);
        Step::Emit(Event::Key(key), 3)
    }

    // =========================================================================
    // CSI
    // =========================================================================

    fn csi(&mut self) -> Step {
        if self.buf.len() < 3 {
            return Step::Incomplete;
        }
        match self.buf[2] {
            b'M' => return self.x10_mouse(),
            b'I' => return Step::Emit(Event::Focus, 3),
            b'O' => return Step::Emit(Event::Blur, 3),
            b'[' => return self.linux_function_key(),
            _ => {}
        }

        let mut end = 2;
        loop {
            if end > MAX_CSI_LEN {
                return Step::Skip(end);
            }
            let Some(&b) = self.buf.get(end) else {
                return Step::Incomplete;
            };
            match b {
                0x30..=0x3f => end += 1,
                b'$' | 0x40..=0x7e => break,
                _ => return Step::Skip(end),
            }
        }

        let final_byte = self.buf[end];
        let len = end + 1;
        let body = &self.buf[2..end];
        let (prefix, param_bytes) = match body.first() {
            Some(p @ (b'?' | b'>' | b'<' | b'=')) => (Some(*p), &body[1..]),
            _ => (None, body),
        };
        let params = parse_params(param_bytes);

        match (prefix, final_byte) {
            (Some(b'<'), b'M' | b'm') => {
                let [cb, x, y] = params[..] else {
                    return Step::Skip(len);
                };
                let raw = self.buf[..len].to_vec();
                let ev = self.decode_mouse(cb, sgr_coord(x), sgr_coord(y), Some(final_byte == b'm'), raw);
                Step::Emit(Event::Mouse(ev), len)
            }
            (Some(p @ (b'?' | b'>')), b'c') => Step::Emit(
                Event::Response(Response::DeviceAttributes { secondary: p == b'>', params }),
                len,
            ),
            (Some(b'?'), b'R') => self.cursor_report(&params, len),
            (None, b'R') if self.cursor_queries > 0 && params.len() == 2 => {
                self.cursor_queries -= 1;
                self.cursor_report(&params, len)
            }
            (_, b'n') => Step::Emit(Event::Response(Response::DeviceStatus(params)), len),
            (None, b't') => {
                let kind = params.first().copied().unwrap_or(0);
                let rest = params.get(1..).map(<[u32]>::to_vec).unwrap_or_default();
                Step::Emit(Event::Response(Response::WindowReport { kind, params: rest }), len)
            }
            (None, b'M') if params.len() == 3 => {
                let raw = self.buf[..len].to_vec();
                let cb = params[0].saturating_sub(32);
                let ev = self.decode_mouse(cb, sgr_coord(params[1]), sgr_coord(params[2]), None, raw);
                Step::Emit(Event::Mouse(ev), len)
            }
            (None, b'~') if params.first() == Some(&200) => {
                self.paste = Some(Vec::new());
                Step::Skip(len)
            }
            (None, b'~') if params.first() == Some(&201) => Step::Skip(len),
            (None, _) => match csi_key(final_byte, &params, &self.buf[..len]) {
                Some(key) => Step::Emit(Event::Key(key), len),
                None => Step::Skip(len),
            },
            _ => Step::Skip(len),
        }
    }

    fn cursor_report(&self, params: &[u32], len: usize) -> Step {
        let row = params.first().copied().unwrap_or(1);
        let col = params.get(1).copied().unwrap_or(1);
        Step::Emit(
            Event::Response(Response::CursorPosition { x: sgr_coord(col), y: sgr_coord(row) }),
            len,
        )
    }

    fn linux_function_key(&self) -> Step {
        if self.buf.len() < 4 {
            return Step::Incomplete;
        }
        let name = match self.buf[3] {
            b'A' => "f1",
            b'B' => "f2",
            b'C' => "f3",
            b'D' => "f4",
            b'E' => "f5",
            _ => return Step::Skip(4),
        };
        Step::Emit(Event::Key(KeyEvent::new(name, &self.buf[..4])), 4)
    }

    // =========================================================================
    // OSC / DCS
    // =========================================================================

    /// `ESC ] ... BEL|ST` or, for `dcs`, `ESC P ... ST`.
    fn string_sequence(&self, dcs: bool) -> Step {
        let mut i = 2;
        loop {
            if i > MAX_STRING_LEN {
                return Step::Skip(i);
            }
            let Some(&b) = self.buf.get(i) else {
                return Step::Incomplete;
            };
            if b == 0x07 && !dcs {
                return Step::Emit(Event::Response(self.string_response(dcs, i)), i + 1);
            }
            if b == 0x1b {
                return match self.buf.get(i + 1) {
                    None => Step::Incomplete,
                    Some(b'\\') => Step::Emit(Event::Response(self.string_response(dcs, i)), i + 2),
                    Some(_) => Step::Skip(i),
                };
            }
            i += 1;
        }
    }

    fn string_response(&self, dcs: bool, end: usize) -> Response {
        let content = String::from_utf8_lossy(&self.buf[2..end]).into_owned();
        if dcs {
            return Response::Dcs(content);
        }
        match content.split_once(';') {
            Some((code, data)) if code.bytes().all(|b| b.is_ascii_digit()) => Response::Osc {
                code: code.parse().ok(),
                data: data.to_string(),
            },
            _ => Response::Osc { code: content.parse().ok(), data: String::new() },
        }
    }

    // =========================================================================
    // Mouse
    // =========================================================================

    fn x10_mouse(&mut self) -> Step {
        if self.buf.len() < 6 {
            return Step::Incomplete;
        }
        let cb = u32::from(self.buf[3].saturating_sub(32));
        let x = x10_coord(self.buf[4]);
        let y = x10_coord(self.buf[5]);
        let raw = self.buf[..6].to_vec();
        let ev = self.decode_mouse(cb, x, y, None, raw);
        Step::Emit(Event::Mouse(ev), 6)
    }

    /// Shared button decoding. `release` is `Some` only for SGR reports,
    /// where the final byte's case carries press vs release.
    fn decode_mouse(&mut self, cb: u32, x: u16, y: u16, release: Option<bool>, raw: Vec<u8>) -> MouseEvent {
        let base = cb & 3;
        let from_base = |base: u32| match base {
            0 => MouseButton::Left,
            1 => MouseButton::Middle,
            2 => MouseButton::Right,
            _ => MouseButton::None,
        };

        let (action, button) = if cb & 128 != 0 {
            (MouseAction::MouseMove, MouseButton::None)
        } else if cb & 64 != 0 {
            match base {
                0 => (MouseAction::WheelUp, MouseButton::None),
                1 => (MouseAction::WheelDown, MouseButton::None),
                _ => (MouseAction::MouseMove, MouseButton::None),
            }
        } else if cb & 32 != 0 {
            (MouseAction::MouseMove, from_base(base))
        } else {
            match release {
                Some(true) => (MouseAction::MouseUp, from_base(base)),
                Some(false) => {
                    self.last_button = from_base(base);
                    (MouseAction::MouseDown, self.last_button)
                }
                None if base == 3 => {
                    let held = std::mem::take(&mut self.last_button);
                    (MouseAction::MouseUp, held)
                }
                None => {
                    self.last_button = from_base(base);
                    (MouseAction::MouseDown, self.last_button)
                }
            }
        };

        MouseEvent {
            action,
            button,
            x,
            y,
            shift: cb & 4 != 0,
            meta: cb & 8 != 0,
            ctrl: cb & 16 != 0,
            raw,
        }
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn parse_params(bytes: &[u8]) -> Vec<u32> {
    if bytes.is_empty() {
        return Vec::new();
    }
    bytes
        .split(|b| *b == b';')
        .map(|p| std::str::from_utf8(p).ok().and_then(|s| s.parse().ok()).unwrap_or(0))
        .collect()
}

/// One-based decimal coordinate to zero-based.
fn sgr_coord(v: u32) -> u16 {
    v.saturating_sub(1).min(u16::MAX as u32) as u16
}

/// X10 coordinate byte to zero-based column.
///
/// The byte is `coord + 32` with a one-based coord, so 255 is column 222.
/// Some terminals send 0 once the column no longer fits in a byte; that
/// is read as the rightmost encodable column rather than the leftmost.
fn x10_coord(b: u8) -> u16 {
    if b == 0 { 222 } else { u16::from(b.saturating_sub(33)) }
}

fn csi_key(final_byte: u8, params: &[u32], seq: &[u8]) -> Option<KeyEvent> {
    let mut shift = false;
    let mut ctrl = false;
    let name = match final_byte {
        b'A' => "up",
        b'B' => "down",
        b'C' => "right",
        b'D' => "left",
        b'E' => "clear",
        b'F' => "end",
        b'H' => "home",
        b'P' => "f1",
        b'Q' => "f2",
        b'R' => "f3",
        b'S' => "f4",
        b'Z' => {
            shift = true;
            "tab"
        }
        b'a' | b'b' | b'c' | b'd' | b'e' => {
            shift = true;
            ["up", "down", "right", "left", "clear"][(final_byte - b'a') as usize]
        }
        b'~' | b'$' | b'^' => {
            shift = final_byte == b'$';
            ctrl = final_byte == b'^';
            tilde_name(params.first().copied().unwrap_or(0))?
        }
        _ => return None,
    };

    let mut meta = false;
    if let Some(&m) = params.get(1) {
        if m > 1 {
            let bits = m - 1;
            shift |= bits & 1 != 0;
            meta = bits & 2 != 0;
            ctrl |= bits & 4 != 0;
        }
    }
    Some(KeyEvent::new(name, seq).with_modifiers(shift, meta, ctrl))
}

fn tilde_name(n: u32) -> Option<&'static str> {
    Some(match n {
        1 | 7 => "home",
        2 => "insert",
        3 => "delete",
        4 | 8 => "end",
        5 => "pageup",
        6 => "pagedown",
        11 => "f1",
        12 => "f2",
        13 => "f3",
        14 => "f4",
        15 => "f5",
        17 => "f6",
        18 => "f7",
        19 => "f8",
        20 => "f9",
        21 => "f10",
        23 => "f11",
        24 => "f12",
        _ => return None,
    })
}

fn utf8_len(lead: u8) -> Option<usize> {
    match lead {
        0xc2..=0xdf => Some(2),
        0xe0..=0xef => Some(3),
        0xf0..=0xf4 => Some(4),
        _ => None,
    }
}

fn find(hay: &[u8], needle: &[u8]) -> Option<usize> {
    hay.windows(needle.len()).position(|w| w == needle)
}

/// Length of the longest suffix of `hay` that is a proper prefix of `needle`.
fn partial_suffix(hay: &[u8], needle: &[u8]) -> usize {
    (1..needle.len())
        .rev()
        .find(|&n| hay.len() >= n && hay[hay.len() - n..] == needle[..n])
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(events: &[Event]) -> Vec<String> {
        events
            .iter()
            .filter_map(|e| match e {
                Event::Key(k) => Some(k.full.clone()),
                _ => None,
            })
            .collect()
    }

    fn parse(bytes: &[u8]) -> Vec<Event> {
        InputParser::new().feed(bytes)
    }

    // ── keys ──

    #[test]
    fn printable_and_shifted() {
        assert_eq!(keys(&parse(b"aB1")), vec!["a", "S-b", "1"]);
    }

    #[test]
    fn return_is_enter_and_newline_is_linefeed() {
        assert_eq!(keys(&parse(b"\r\n")), vec!["enter", "linefeed"]);
    }

    #[test]
    fn control_bytes() {
        assert_eq!(keys(&parse(b"\x01\x09\x7f\x08")), vec!["C-a", "tab", "backspace", "backspace"]);
    }

    #[test]
    fn meta_prefix() {
        assert_eq!(keys(&parse(b"\x1bx\x1b\r")), vec!["M-x", "M-enter"]);
    }

    #[test]
    fn csi_named_keys_with_modifiers() {
        assert_eq!(
            keys(&parse(b"\x1b[A\x1b[1;5C\x1b[3~\x1b[5;2~\x1b[Z\x1bOP")),
            vec!["up", "C-right", "delete", "S-pageup", "S-tab", "f1"]
        );
    }

    #[test]
    fn rxvt_and_linux_variants() {
        assert_eq!(
            keys(&parse(b"\x1b[2$\x1b[3^\x1b[a\x1bOb\x1b[[A\x1b[11~")),
            vec!["S-insert", "C-delete", "S-up", "C-down", "f1", "f1"]
        );
    }

    #[test]
    fn utf8_split_across_chunks() {
        let mut p = InputParser::new();
        assert!(p.feed(&[0xe4, 0xbd]).is_empty());
        let ev = p.feed(&[0xa0]);
        match &ev[..] {
            [Event::Key(k)] => assert_eq!(k.ch, Some('你')),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn lone_escape_waits_for_timeout() {
        let mut p = InputParser::new();
        assert!(p.feed(b"\x1b").is_empty());
        assert!(p.has_pending());
        assert_eq!(keys(&p.flush_pending()), vec!["escape"]);
        assert!(!p.has_pending());
    }

    #[test]
    fn timeout_on_partial_csi_yields_escape_then_bracket() {
        let mut p = InputParser::new();
        assert!(p.feed(b"\x1b[").is_empty());
        assert_eq!(keys(&p.flush_pending()), vec!["escape", "["]);
    }

    // ── mouse ──

    fn mouse(events: Vec<Event>) -> MouseEvent {
        match events.into_iter().next() {
            Some(Event::Mouse(m)) => m,
            other => panic!("expected mouse, got {other:?}"),
        }
    }

    #[test]
    fn sgr_press_and_release() {
        let mut p = InputParser::new();
        let down = mouse(p.feed(b"\x1b[<2;5;6M"));
        assert_eq!((down.action, down.button, down.x, down.y), (MouseAction::MouseDown, MouseButton::Right, 4, 5));
        let up = mouse(p.feed(b"\x1b[<2;5;6m"));
        assert_eq!((up.action, up.button), (MouseAction::MouseUp, MouseButton::Right));
    }

    #[test]
    fn legacy_release_uses_last_pressed_button() {
        let mut p = InputParser::new();
        mouse(p.feed(b"\x1b[M\x21\x30\x30"));
        let up = mouse(p.feed(b"\x1b[M\x23\x30\x30"));
        assert_eq!((up.action, up.button), (MouseAction::MouseUp, MouseButton::Middle));
    }

    #[test]
    fn wheel_motion_and_modifiers() {
        let mut p = InputParser::new();
        let wheel = mouse(p.feed(b"\x1b[<65;1;1M"));
        assert_eq!(wheel.action, MouseAction::WheelDown);
        let drag = mouse(p.feed(b"\x1b[<32;3;3M"));
        assert_eq!((drag.action, drag.button), (MouseAction::MouseMove, MouseButton::Left));
        let hover = mouse(p.feed(b"\x1b[<35;3;3M"));
        assert_eq!((hover.action, hover.button), (MouseAction::MouseMove, MouseButton::None));
        let mods = mouse(p.feed(b"\x1b[<28;1;1M"));
        assert!(mods.shift && mods.meta && mods.ctrl);
        assert_eq!(mods.button, MouseButton::Left);
    }

    #[test]
    fn unknown_button_code_keeps_coordinates() {
        let m = mouse(parse(b"\x1b[<130;7;8M"));
        assert_eq!(m.button, MouseButton::None);
        assert_eq!((m.x, m.y), (6, 7));
    }

    #[test]
    fn x10_coordinate_ceiling() {
        let m = mouse(parse(&[0x1b, b'[', b'M', 0x20, 0xff, 0x00]));
        assert_eq!((m.x, m.y), (222, 222));
    }

    #[test]
    fn chunked_mouse_report() {
        let mut p = InputParser::new();
        assert!(p.feed(b"\x1b[<0;1").is_empty());
        let m = mouse(p.feed(b"0;5M"));
        assert_eq!((m.x, m.y), (9, 4));
    }

    // ── responses ──

    #[test]
    fn device_attributes() {
        assert_eq!(
            parse(b"\x1b[?62;22c\x1b[>41;354;0c"),
            vec![
                Event::Response(Response::DeviceAttributes { secondary: false, params: vec![62, 22] }),
                Event::Response(Response::DeviceAttributes { secondary: true, params: vec![41, 354, 0] }),
            ]
        );
    }

    #[test]
    fn cursor_report_only_when_expected() {
        let mut p = InputParser::new();
        assert_eq!(keys(&p.feed(b"\x1b[1;2R")), vec!["S-f3"]);
        p.expect_cursor_report();
        assert_eq!(
            p.feed(b"\x1b[12;40R"),
            vec![Event::Response(Response::CursorPosition { x: 39, y: 11 })]
        );
        assert_eq!(
            p.feed(b"\x1b[?3;4R"),
            vec![Event::Response(Response::CursorPosition { x: 3, y: 2 })]
        );
    }

    #[test]
    fn osc_reply_split_and_interleaved() {
        let mut p = InputParser::new();
        let first = p.feed(b"\x1b]4;1;rgb:cd");
        assert!(first.is_empty());
        let rest = p.feed(b"cd/0000/0000\x1b\\a");
        assert_eq!(
            rest[0],
            Event::Response(Response::Osc { code: Some(4), data: "1;rgb:cdcd/0000/0000".into() })
        );
        assert_eq!(keys(&rest), vec!["a"]);
    }

    #[test]
    fn dcs_and_status_and_window() {
        let ev = parse(b"\x1bP>|xterm(380)\x1b\\\x1b[0n\x1b[8;24;80t");
        assert_eq!(ev[0], Event::Response(Response::Dcs(">|xterm(380)".into())));
        assert_eq!(ev[1], Event::Response(Response::DeviceStatus(vec![0])));
        assert_eq!(ev[2], Event::Response(Response::WindowReport { kind: 8, params: vec![24, 80] }));
    }

    #[test]
    fn malformed_csi_does_not_block_following_bytes() {
        assert_eq!(keys(&parse(b"\x1b[12\x07x")), vec!["C-g", "x"]);
    }

    // ── focus and paste ──

    #[test]
    fn focus_events() {
        assert_eq!(parse(b"\x1b[I\x1b[O"), vec![Event::Focus, Event::Blur]);
    }

    #[test]
    fn bracketed_paste_across_chunks() {
        let mut p = InputParser::new();
        assert!(p.feed(b"\x1b[200~hello \x1b[2").is_empty());
        assert!(!p.has_pending());
        let ev = p.feed(b"01~q");
        assert_eq!(ev[0], Event::Paste("hello ".into()));
        assert_eq!(keys(&ev), vec!["q"]);
    }
}
