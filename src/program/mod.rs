//! Terminal I/O driver.
//!
//! A [`Program`] owns one output sink and one input parser. It detects the
//! terminal once at construction, tracks cursor/mode state as it emits
//! control sequences, and turns input bytes into [`Event`]s.
//!
//! # Example
//!
//! ```no_run
//! use spark_term::program::{Program, ProgramOptions};
//!
//! let mut program = Program::with_stdio(ProgramOptions::default())?;
//! program.alt_buffer(true);
//! program.hide_cursor();
//! program.cup(0, 0);
//! program.emit(b"hello");
//! program.flush();
//! program.destroy();
//! # Ok::<(), spark_term::Error>(())
//! ```

pub mod ansi;
pub mod caps;
pub mod events;
pub mod host;
pub mod output;
pub mod parser;
pub mod reader;
pub mod registry;
pub mod sgr;
pub mod tty;

use std::io::{self, Write};
use std::sync::mpsc::{Receiver, RecvTimeoutError, TryRecvError};
use std::time::{Duration, Instant};

use tracing::debug;

pub use self::ansi::{CursorShape, MouseTracking};
pub use self::caps::{Cap, Capabilities, MouseProtocol, TerminalFamily};
pub use self::events::{Event, KeyEvent, MouseAction, MouseButton, MouseEvent, Response};
pub use self::host::{Host, StaticHost, SystemHost};
pub use self::output::{Capture, Output};

use self::parser::InputParser;
use self::reader::{InputChunk, InputReader};
use self::registry::InstanceId;
use crate::error::Result;
use crate::types::Attr;

// =============================================================================
// Options
// =============================================================================

/// Driver configuration.
#[derive(Debug, Clone)]
pub struct ProgramOptions {
    /// Terminal name overriding detection.
    pub term: Option<String>,
    /// Accumulate output until the next flush.
    pub buffered: bool,
    /// Wrap OSC/DCS writes for tmux when running inside it.
    pub tmux_passthrough: bool,
    /// How long a lone `ESC` waits before it is the escape key.
    pub escape_timeout: Duration,
    /// Override locale-based unicode detection.
    pub force_unicode: Option<bool>,
    /// Initial size when it cannot be queried.
    pub size: (u16, u16),
}

impl Default for ProgramOptions {
    fn default() -> Self {
        Self {
            term: None,
            buffered: true,
            tmux_passthrough: true,
            escape_timeout: Duration::from_millis(50),
            force_unicode: None,
            size: tty::DEFAULT_SIZE,
        }
    }
}

impl ProgramOptions {
    pub fn term(mut self, term: &str) -> Self {
        self.term = Some(term.to_string());
        self
    }

    pub fn buffered(mut self, buffered: bool) -> Self {
        self.buffered = buffered;
        self
    }

    pub fn size(mut self, cols: u16, rows: u16) -> Self {
        self.size = (cols, rows);
        self
    }

    pub fn escape_timeout(mut self, timeout: Duration) -> Self {
        self.escape_timeout = timeout;
        self
    }

    pub fn force_unicode(mut self, on: bool) -> Self {
        self.force_unicode = Some(on);
        self
    }
}

// =============================================================================
// Program
// =============================================================================

/// Terminal driver: capability record, output sink, input parser.
pub struct Program {
    caps: Capabilities,
    output: Output,
    parser: InputParser,
    options: ProgramOptions,

    cols: u16,
    rows: u16,
    x: u16,
    y: u16,
    saved_cursor: Option<(u16, u16)>,
    scroll_top: u16,
    scroll_bottom: u16,

    cursor_hidden: bool,
    in_alt_buffer: bool,
    mouse: Option<MouseTracking>,
    paste_enabled: bool,
    focus_enabled: bool,
    title: Option<String>,

    reader: Option<(InputReader, Receiver<InputChunk>)>,
    pending_since: Option<Instant>,
    owns_raw_mode: bool,
    instance: Option<InstanceId>,
    destroyed: bool,
}

impl Program {
    /// Driver writing to `writer`, detecting the terminal through `host`.
    pub fn new(writer: impl Write + Send + 'static, host: &dyn Host, options: ProgramOptions) -> Self {
        let mut caps = Capabilities::detect(host, options.term.as_deref());
        if let Some(u) = options.force_unicode {
            caps.unicode = u;
        }
        let output = Output::new(writer, options.buffered);
        let instance = Some(registry::register(&output));
        let (cols, rows) = options.size;

        let mut program = Self {
            caps,
            output,
            parser: InputParser::new(),
            options,
            cols: cols.max(1),
            rows: rows.max(1),
            x: 0,
            y: 0,
            saved_cursor: None,
            scroll_top: 0,
            scroll_bottom: rows.max(1) - 1,
            cursor_hidden: false,
            in_alt_buffer: false,
            mouse: None,
            paste_enabled: false,
            focus_enabled: false,
            title: None,
            reader: None,
            pending_since: None,
            owns_raw_mode: false,
            instance,
            destroyed: false,
        };
        program.update_restore();
        program
    }

    /// Driver on the real terminal: stdout, stdin reader thread, raw mode.
    pub fn with_stdio(mut options: ProgramOptions) -> Result<Self> {
        let host = SystemHost;
        options.size = tty::size();
        let tty = host.is_tty();
        let mut program = Self::new(io::stdout(), &host, options);
        if tty {
            tty::enable_raw_mode()?;
            program.owns_raw_mode = true;
        }
        program.reader = Some(InputReader::stdin()?);
        Ok(program)
    }

    // =========================================================================
    // State
    // =========================================================================

    pub fn caps(&self) -> &Capabilities {
        &self.caps
    }

    pub fn has(&self, cap: Cap) -> bool {
        self.caps.has(cap)
    }

    pub fn cols(&self) -> u16 {
        self.cols
    }

    pub fn rows(&self) -> u16 {
        self.rows
    }

    /// Tracked cursor position.
    pub fn cursor(&self) -> (u16, u16) {
        (self.x, self.y)
    }

    pub fn cursor_hidden(&self) -> bool {
        self.cursor_hidden
    }

    pub fn scroll_region(&self) -> (u16, u16) {
        (self.scroll_top, self.scroll_bottom)
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn output(&self) -> &Output {
        &self.output
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub fn instance(&self) -> Option<InstanceId> {
        self.instance
    }

    // =========================================================================
    // Raw output
    // =========================================================================

    /// Write bytes as-is.
    pub fn emit(&mut self, bytes: &[u8]) {
        self.output.write(bytes);
    }

    /// Write a sequence that must reach the outer terminal through tmux.
    pub fn twrite(&mut self, data: &str) {
        if self.caps.tmux && self.options.tmux_passthrough {
            self.output.flush();
            self.output.write(ansi::tmux_wrap(data).as_bytes());
        } else {
            self.output.write(data.as_bytes());
        }
    }

    fn seq(&mut self, f: impl FnOnce(&mut Vec<u8>) -> io::Result<()>) {
        let mut buf = Vec::with_capacity(16);
        // Writing into a Vec cannot fail.
        let _ = f(&mut buf);
        self.output.write(&buf);
    }

    /// Flush buffered output now.
    pub fn flush(&mut self) {
        self.output.flush();
    }

    /// Cooperative tick: flush anything buffered since the last tick.
    pub fn tick(&mut self) {
        if self.output.pending() > 0 {
            self.output.flush();
        }
    }

    // =========================================================================
    // Cursor
    // =========================================================================

    fn clamp(&self, x: i32, y: i32) -> (u16, u16) {
        (
            x.clamp(0, self.cols as i32 - 1) as u16,
            y.clamp(0, self.rows as i32 - 1) as u16,
        )
    }

    /// Absolute move, clamped to the screen.
    pub fn cup(&mut self, x: i32, y: i32) {
        let (x, y) = self.clamp(x, y);
        self.x = x;
        self.y = y;
        self.seq(|w| ansi::cup(w, x, y));
    }

    pub fn cuf(&mut self, n: u16) {
        let (x, _) = self.clamp(self.x as i32 + n as i32, 0);
        let moved = x - self.x;
        self.x = x;
        self.seq(|w| ansi::cuf(w, moved));
    }

    pub fn cub(&mut self, n: u16) {
        let (x, _) = self.clamp(self.x as i32 - n as i32, 0);
        let moved = self.x - x;
        self.x = x;
        self.seq(|w| ansi::cub(w, moved));
    }

    pub fn cuu(&mut self, n: u16) {
        let (_, y) = self.clamp(0, self.y as i32 - n as i32);
        let moved = self.y - y;
        self.y = y;
        self.seq(|w| ansi::cuu(w, moved));
    }

    pub fn cud(&mut self, n: u16) {
        let (_, y) = self.clamp(0, self.y as i32 + n as i32);
        let moved = y - self.y;
        self.y = y;
        self.seq(|w| ansi::cud(w, moved));
    }

    /// Absolute column on the current row.
    pub fn cha(&mut self, x: i32) {
        let (x, _) = self.clamp(x, 0);
        self.x = x;
        self.seq(|w| ansi::cha(w, x));
    }

    pub fn save_cursor(&mut self) {
        self.saved_cursor = Some((self.x, self.y));
        self.seq(ansi::save_cursor);
    }

    pub fn restore_cursor(&mut self) {
        if let Some((x, y)) = self.saved_cursor {
            self.x = x;
            self.y = y;
        }
        self.seq(ansi::restore_cursor);
    }

    /// Record a cursor position reached by bytes written through [`emit`](Self::emit).
    pub fn set_tracked_cursor(&mut self, x: u16, y: u16) {
        let (x, y) = self.clamp(x as i32, y as i32);
        self.x = x;
        self.y = y;
    }

    pub fn hide_cursor(&mut self) {
        self.cursor_hidden = true;
        self.seq(ansi::hide_cursor);
        self.update_restore();
    }

    pub fn show_cursor(&mut self) {
        self.cursor_hidden = false;
        self.seq(ansi::show_cursor);
        self.update_restore();
    }

    pub fn cursor_shape(&mut self, shape: CursorShape, blink: bool) {
        self.seq(|w| ansi::cursor_shape(w, shape, blink));
    }

    // =========================================================================
    // Screen
    // =========================================================================

    /// Set the scroll region to rows `top..=bottom`. The terminal homes the
    /// cursor afterwards, and so does the tracked position.
    pub fn csr(&mut self, top: u16, bottom: u16) {
        let bottom = bottom.min(self.rows - 1);
        let top = top.min(bottom);
        self.scroll_top = top;
        self.scroll_bottom = bottom;
        self.x = 0;
        self.y = 0;
        self.seq(|w| ansi::csr(w, top, bottom));
    }

    pub fn erase_eol(&mut self) {
        self.seq(ansi::erase_eol);
    }

    pub fn clear(&mut self) {
        self.x = 0;
        self.y = 0;
        self.seq(ansi::clear_screen);
    }

    pub fn insert_lines(&mut self, n: u16) {
        self.seq(|w| ansi::insert_lines(w, n));
    }

    pub fn delete_lines(&mut self, n: u16) {
        self.seq(|w| ansi::delete_lines(w, n));
    }

    /// Enter or leave the alternate buffer.
    pub fn alt_buffer(&mut self, on: bool) {
        if on && !self.caps.alt_screen {
            return;
        }
        self.in_alt_buffer = on;
        self.seq(|w| ansi::alt_buffer(w, on));
        self.update_restore();
    }

    pub fn in_alt_buffer(&self) -> bool {
        self.in_alt_buffer
    }

    /// Write the SGR sequence for `attr`, reduced to the terminal's depth.
    pub fn sgr(&mut self, attr: Attr) {
        let code = sgr::code_attr(attr, self.caps.colors);
        self.output.write(code.as_bytes());
    }

    pub fn bell(&mut self) {
        self.seq(ansi::bell);
    }

    pub fn set_title(&mut self, title: &str) {
        self.title = Some(title.to_string());
        self.twrite(&format!("\x1b]0;{title}\x07"));
    }

    // =========================================================================
    // Modes
    // =========================================================================

    pub fn enable_mouse(&mut self, tracking: MouseTracking) {
        let protocol = self.caps.mouse;
        self.mouse = Some(tracking);
        self.seq(|w| ansi::mouse(w, true, tracking, protocol));
        self.update_restore();
    }

    pub fn disable_mouse(&mut self) {
        if let Some(tracking) = self.mouse.take() {
            let protocol = self.caps.mouse;
            self.seq(|w| ansi::mouse(w, false, tracking, protocol));
            self.update_restore();
        }
    }

    pub fn mouse_enabled(&self) -> bool {
        self.mouse.is_some()
    }

    pub fn bracketed_paste(&mut self, on: bool) {
        if on && !self.caps.bracketed_paste {
            return;
        }
        self.paste_enabled = on;
        self.seq(|w| ansi::bracketed_paste(w, on));
        self.update_restore();
    }

    pub fn focus_reporting(&mut self, on: bool) {
        if on && !self.caps.focus_events {
            return;
        }
        self.focus_enabled = on;
        self.seq(|w| ansi::focus_reporting(w, on));
        self.update_restore();
    }

    /// Rebuild the sequence the exit hooks write for this driver.
    fn update_restore(&mut self) {
        let mut seq = Vec::new();
        if let Some(tracking) = self.mouse {
            let _ = ansi::mouse(&mut seq, false, tracking, self.caps.mouse);
        }
        if self.paste_enabled {
            let _ = ansi::bracketed_paste(&mut seq, false);
        }
        if self.focus_enabled {
            let _ = ansi::focus_reporting(&mut seq, false);
        }
        seq.extend_from_slice(ansi::SGR_RESET.as_bytes());
        if self.cursor_hidden {
            let _ = ansi::show_cursor(&mut seq);
        }
        if self.in_alt_buffer {
            let _ = ansi::alt_buffer(&mut seq, false);
        }
        self.output.set_restore(seq);
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn query_device_attributes(&mut self, secondary: bool) {
        if secondary {
            self.seq(ansi::query_secondary_attributes);
        } else {
            self.seq(ansi::query_device_attributes);
        }
    }

    pub fn query_cursor_position(&mut self) {
        self.parser.expect_cursor_report();
        self.seq(ansi::query_cursor_position);
    }

    pub fn query_status(&mut self) {
        self.seq(ansi::query_status);
    }

    pub fn query_window_size(&mut self) {
        self.seq(ansi::query_window_size);
    }

    pub fn query_palette_color(&mut self, index: u8) {
        self.twrite(&format!("\x1b]4;{index};?\x07"));
    }

    // =========================================================================
    // Input
    // =========================================================================

    /// Parse bytes received from the terminal.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<Event> {
        let mut events = self.parser.feed(bytes);
        self.track_pending();
        self.absorb_responses(&mut events);
        events
    }

    /// Flush an incomplete sequence once the escape timeout has passed.
    pub fn check_escape_timeout(&mut self, now: Instant) -> Vec<Event> {
        match self.pending_since {
            Some(since) if now.duration_since(since) >= self.options.escape_timeout => {
                self.pending_since = None;
                self.parser.flush_pending()
            }
            _ => Vec::new(),
        }
    }

    fn track_pending(&mut self) {
        if self.parser.has_pending() {
            self.pending_since.get_or_insert_with(Instant::now);
        } else {
            self.pending_since = None;
        }
    }

    fn absorb_responses(&mut self, events: &mut [Event]) {
        for ev in events.iter() {
            if let Event::Response(Response::CursorPosition { x, y }) = ev {
                self.set_tracked_cursor(*x, *y);
            }
        }
    }

    /// Wait up to `timeout` for input from the reader thread.
    pub fn poll(&mut self, timeout: Duration) -> Vec<Event> {
        let wait = if self.pending_since.is_some() {
            timeout.min(self.options.escape_timeout)
        } else {
            timeout
        };
        let mut chunks = Vec::new();
        let mut closed = false;
        match &self.reader {
            Some((_, rx)) => {
                match rx.recv_timeout(wait) {
                    Ok(InputChunk::Data(d)) => chunks.push(d),
                    Ok(InputChunk::Closed) | Err(RecvTimeoutError::Disconnected) => closed = true,
                    Err(RecvTimeoutError::Timeout) => {}
                }
                while !closed {
                    match rx.try_recv() {
                        Ok(InputChunk::Data(d)) => chunks.push(d),
                        Ok(InputChunk::Closed) | Err(TryRecvError::Disconnected) => closed = true,
                        Err(TryRecvError::Empty) => break,
                    }
                }
            }
            None => std::thread::sleep(wait),
        }
        if closed {
            debug!("input closed");
            self.reader = None;
        }

        let mut events = Vec::new();
        for chunk in chunks {
            events.extend(self.feed(&chunk));
        }
        events.extend(self.check_escape_timeout(Instant::now()));
        events
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Record a new size. Returns the resize event to dispatch.
    pub fn resize(&mut self, cols: u16, rows: u16) -> Event {
        self.cols = cols.max(1);
        self.rows = rows.max(1);
        self.scroll_top = 0;
        self.scroll_bottom = self.rows - 1;
        let (x, y) = self.clamp(self.x as i32, self.y as i32);
        self.x = x;
        self.y = y;
        Event::Resize { cols: self.cols, rows: self.rows }
    }

    /// Re-run detection for a different terminal name.
    pub fn switch_terminal(&mut self, term: &str, host: &dyn Host) {
        let mut caps = Capabilities::detect(host, Some(term));
        if let Some(u) = self.options.force_unicode {
            caps.unicode = u;
        }
        self.caps = caps;
        self.options.term = Some(term.to_string());
        self.update_restore();
    }

    /// Restore the terminal and release the driver. Safe to call twice.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        self.output.set_exiting();

        self.disable_mouse();
        if self.paste_enabled {
            self.bracketed_paste(false);
        }
        if self.focus_enabled {
            self.focus_reporting(false);
        }
        if self.scroll_top != 0 || self.scroll_bottom != self.rows - 1 {
            let rows = self.rows;
            self.csr(0, rows - 1);
        }
        self.seq(|w| w.write_all(ansi::SGR_RESET.as_bytes()));
        if self.cursor_hidden {
            self.show_cursor();
        }
        if self.in_alt_buffer {
            self.alt_buffer(false);
        }
        self.output.flush();

        if let Some((mut reader, _)) = self.reader.take() {
            reader.stop();
        }
        if self.owns_raw_mode {
            self.owns_raw_mode = false;
            if let Err(e) = tty::disable_raw_mode() {
                debug!(error = %e, "failed to leave raw mode");
            }
        }
        if let Some(id) = self.instance.take() {
            registry::unregister(id);
        }
    }
}

impl Drop for Program {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl std::fmt::Debug for Program {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Program")
            .field("term", &self.caps.term)
            .field("cols", &self.cols)
            .field("rows", &self.rows)
            .field("cursor", &(self.x, self.y))
            .field("destroyed", &self.destroyed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn program(term: &str) -> (Program, Capture) {
        let cap = Capture::new();
        let host = StaticHost::new();
        let p = Program::new(cap.clone(), &host, ProgramOptions::default().term(term).buffered(false).size(80, 24));
        (p, cap)
    }

    #[test]
    fn cursor_moves_are_clamped_and_tracked() {
        let (mut p, cap) = program("xterm-256color");
        p.cup(100, -3);
        assert_eq!(p.cursor(), (79, 0));
        assert_eq!(cap.take(), "\x1b[1;80H");
        p.cub(5);
        p.cud(2);
        assert_eq!(p.cursor(), (74, 2));
        p.cuf(50);
        assert_eq!(p.cursor(), (79, 2));
        assert_eq!(cap.take(), "\x1b[5D\x1b[2B\x1b[5C");
    }

    #[test]
    fn csr_homes_tracked_cursor() {
        let (mut p, cap) = program("xterm");
        p.cup(5, 5);
        cap.take();
        p.csr(2, 10);
        assert_eq!(p.cursor(), (0, 0));
        assert_eq!(p.scroll_region(), (2, 10));
        assert_eq!(cap.take(), "\x1b[3;11r");
    }

    #[test]
    fn buffered_output_flushes_on_tick() {
        let cap = Capture::new();
        let mut p = Program::new(cap.clone(), &StaticHost::new(), ProgramOptions::default().term("xterm"));
        p.cup(0, 0);
        assert_eq!(cap.contents(), "");
        p.tick();
        assert_eq!(cap.take(), "\x1b[1;1H");
    }

    #[test]
    fn tmux_passthrough_wraps_osc() {
        let cap = Capture::new();
        let host = StaticHost::new().with_env("TERM", "screen").with_env("TMUX", "1");
        let mut p = Program::new(cap.clone(), &host, ProgramOptions::default().buffered(false));
        p.set_title("x");
        assert_eq!(cap.take(), "\x1bPtmux;\x1b\x1b]0;x\x07\x1b\\");
    }

    #[test]
    fn destroy_restores_modes_once() {
        let (mut p, cap) = program("xterm");
        p.alt_buffer(true);
        p.hide_cursor();
        p.enable_mouse(MouseTracking::Normal);
        cap.take();
        p.destroy();
        let out = cap.take();
        assert!(out.contains("\x1b[?1000l\x1b[?1006l"));
        assert!(out.contains("\x1b[?25h"));
        assert!(out.ends_with("\x1b[?1049l"));
        p.destroy();
        assert_eq!(cap.take(), "");
        assert!(p.is_destroyed());
    }

    #[test]
    fn cursor_report_updates_tracked_position() {
        let (mut p, _cap) = program("xterm");
        p.query_cursor_position();
        let ev = p.feed(b"\x1b[4;7R");
        assert_eq!(ev, vec![Event::Response(Response::CursorPosition { x: 6, y: 3 })]);
        assert_eq!(p.cursor(), (6, 3));
    }

    #[test]
    fn escape_timeout_flushes_lone_escape() {
        let (mut p, _cap) = program("xterm");
        assert!(p.feed(b"\x1b").is_empty());
        let later = Instant::now() + Duration::from_secs(1);
        match &p.check_escape_timeout(later)[..] {
            [Event::Key(k)] => assert_eq!(k.name, "escape"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn switch_terminal_recomputes_caps() {
        let (mut p, _cap) = program("xterm");
        assert_eq!(p.caps().mouse, MouseProtocol::Sgr);
        p.switch_terminal("rxvt-unicode", &StaticHost::new());
        assert_eq!(p.caps().family, TerminalFamily::Rxvt);
        assert_eq!(p.caps().mouse, MouseProtocol::Urxvt);
    }

    #[test]
    fn sgr_reduces_to_terminal_depth() {
        let (mut p, cap) = program("xterm");
        p.sgr(Attr::new(crate::types::AttrFlags::BOLD, 196, crate::types::DEFAULT_COLOR));
        assert_eq!(cap.take(), "\x1b[1;31m");
    }
}
