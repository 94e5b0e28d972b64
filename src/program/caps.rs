//! Terminal capability record.
//!
//! Detection runs once per driver: an explicit `term` wins, a non-POSIX
//! platform gets the `windows-ansi` profile, and otherwise emulator-specific
//! environment variables pick a [`TerminalFamily`]. The family selects a
//! static profile; colour depth, unicode, and multiplexer facts are layered
//! on top from the environment.

use tracing::debug;

use super::host::Host;

/// Closed set of terminal families the engine distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TerminalFamily {
    Xterm,
    ITerm2,
    AppleTerminal,
    Vte,
    Rxvt,
    Screen,
    Linux,
    WindowsAnsi,
    Dumb,
    Generic,
}

/// Mouse report dialect to request from the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseProtocol {
    /// `ESC [ < b ; x ; y M|m`
    Sgr,
    /// `ESC [ b ; x ; y M`
    Urxvt,
    /// `ESC [ M b x y`, single offset bytes
    X10,
}

/// Individual capabilities the output path asks about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cap {
    /// Relative cursor forward (`CUF`).
    ParmRightCursor,
    /// Scroll regions (`DECSTBM`).
    ChangeScrollRegion,
    /// Erase fills with the current background.
    BackColorErase,
    AltScreen,
    BracketedPaste,
    FocusEvents,
    Color256,
    TrueColor,
    Unicode,
}

/// Everything the engine knows about the connected terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capabilities {
    pub term: String,
    pub family: TerminalFamily,
    pub colors: u16,
    pub true_color: bool,
    pub bce: bool,
    pub bracketed_paste: bool,
    pub focus_events: bool,
    pub unicode: bool,
    pub parm_right_cursor: bool,
    pub csr: bool,
    pub alt_screen: bool,
    pub mouse: MouseProtocol,
    pub tmux: bool,
    pub tmux_version: u32,
}

/// Version assumed when `tmux -V` cannot be run or parsed.
pub const FALLBACK_TMUX_VERSION: u32 = 2;

impl Capabilities {
    /// Static profile for a family.
    pub fn profile(family: TerminalFamily, term: &str) -> Self {
        use TerminalFamily::*;
        let (colors, bce, paste, focus, parm, csr, alt, mouse) = match family {
            Xterm => (8, true, true, true, true, true, true, MouseProtocol::Sgr),
            ITerm2 | Vte => (256, true, true, true, true, true, true, MouseProtocol::Sgr),
            AppleTerminal => (256, true, true, false, true, true, true, MouseProtocol::Sgr),
            Rxvt => (88, true, true, false, true, true, true, MouseProtocol::Urxvt),
            Screen => (8, false, true, true, true, true, true, MouseProtocol::Sgr),
            Linux => (8, true, false, false, true, true, false, MouseProtocol::X10),
            WindowsAnsi => (16, false, true, false, true, false, true, MouseProtocol::Sgr),
            Dumb => (2, false, false, false, false, false, false, MouseProtocol::X10),
            Generic => (8, false, false, false, true, true, true, MouseProtocol::X10),
        };
        Self {
            term: term.to_string(),
            family,
            colors,
            true_color: false,
            bce,
            bracketed_paste: paste,
            focus_events: focus,
            unicode: false,
            parm_right_cursor: parm,
            csr,
            alt_screen: alt,
            mouse,
            tmux: false,
            tmux_version: FALLBACK_TMUX_VERSION,
        }
    }

    /// Detect from the host environment. `term_override` always wins.
    pub fn detect(host: &dyn Host, term_override: Option<&str>) -> Self {
        let (family, term) = match term_override {
            Some(t) => (family_for_term(t), t.to_string()),
            None if !host.is_posix() => (TerminalFamily::WindowsAnsi, "windows-ansi".to_string()),
            None => {
                let term = host.env("TERM").unwrap_or_else(|| "xterm".to_string());
                (family_from_env(host, &term), term)
            }
        };

        let mut caps = Self::profile(family, &term);

        if term.contains("256color") {
            caps.colors = 256;
        }
        if let Some(ct) = host.env("COLORTERM") {
            let ct = ct.to_ascii_lowercase();
            if ct.contains("truecolor") || ct.contains("24bit") {
                caps.true_color = true;
                caps.colors = 256;
            }
        }

        caps.unicode = family == TerminalFamily::WindowsAnsi
            || ["LANG", "LC_ALL", "LC_CTYPE"].iter().any(|k| {
                host.env(k)
                    .map(|v| {
                        let v = v.to_ascii_lowercase();
                        v.contains("utf-8") || v.contains("utf8")
                    })
                    .unwrap_or(false)
            });

        if host.env("TMUX").is_some() {
            caps.tmux = true;
            caps.tmux_version = probe_tmux_version(host);
        }

        debug!(
            term = %caps.term,
            family = ?caps.family,
            colors = caps.colors,
            tmux = caps.tmux,
            "detected terminal"
        );
        caps
    }

    pub fn has(&self, cap: Cap) -> bool {
        match cap {
            Cap::ParmRightCursor => self.parm_right_cursor,
            Cap::ChangeScrollRegion => self.csr,
            Cap::BackColorErase => self.bce,
            Cap::AltScreen => self.alt_screen,
            Cap::BracketedPaste => self.bracketed_paste,
            Cap::FocusEvents => self.focus_events,
            Cap::Color256 => self.colors >= 256,
            Cap::TrueColor => self.true_color,
            Cap::Unicode => self.unicode,
        }
    }
}

/// Family for an explicit terminal name.
pub fn family_for_term(term: &str) -> TerminalFamily {
    let t = term.to_ascii_lowercase();
    if t == "windows-ansi" {
        TerminalFamily::WindowsAnsi
    } else if t.contains("rxvt") {
        TerminalFamily::Rxvt
    } else if t.starts_with("xterm") {
        TerminalFamily::Xterm
    } else if t.starts_with("screen") || t.starts_with("tmux") {
        TerminalFamily::Screen
    } else if t.starts_with("linux") {
        TerminalFamily::Linux
    } else if t == "dumb" {
        TerminalFamily::Dumb
    } else if t.starts_with("vte") || t.starts_with("gnome") {
        TerminalFamily::Vte
    } else if t.starts_with("iterm") {
        TerminalFamily::ITerm2
    } else {
        TerminalFamily::Generic
    }
}

fn family_from_env(host: &dyn Host, term: &str) -> TerminalFamily {
    let program = host.env("TERM_PROGRAM").unwrap_or_default();
    if program == "iTerm.app" || host.env("ITERM_SESSION_ID").is_some() {
        return TerminalFamily::ITerm2;
    }
    if program == "Apple_Terminal" {
        return TerminalFamily::AppleTerminal;
    }
    let colorterm = host.env("COLORTERM").unwrap_or_default();
    if host.env("VTE_VERSION").is_some()
        || colorterm.contains("xfce")
        || host.env("TERMINATOR_UUID").is_some()
    {
        return TerminalFamily::Vte;
    }
    if colorterm.contains("rxvt") {
        return TerminalFamily::Rxvt;
    }
    family_for_term(term)
}

fn probe_tmux_version(host: &dyn Host) -> u32 {
    let parsed = host.run("tmux", &["-V"]).ok().and_then(|out| {
        let v = out.trim().strip_prefix("tmux ")?.trim_start_matches("next-");
        let major: String = v.chars().take_while(|c| c.is_ascii_digit()).collect();
        major.parse().ok()
    });
    match parsed {
        Some(v) => v,
        None => {
            debug!(fallback = FALLBACK_TMUX_VERSION, "tmux version probe failed");
            FALLBACK_TMUX_VERSION
        }
    }
}
