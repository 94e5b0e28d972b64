//! Packed attribute <-> SGR sequence codec.
//!
//! [`code_attr`] is what the diff renderer writes; [`attr_code`] interprets
//! raw SGR found in element content so it can be folded into cell
//! attributes. The two are inverse for every flag combination and every
//! palette index, including the default-colour sentinel.

use std::fmt::Write as _;

use crate::color;
use crate::types::{Attr, AttrFlags, DEFAULT_COLOR};

/// Encode an attribute as one SGR sequence.
///
/// Colours are reduced to `colors` first. The default attribute encodes as a
/// bare reset.
pub fn code_attr(attr: Attr, colors: u16) -> String {
    let mut out = String::from("\x1b[");
    push_body(&mut out, attr, colors);
    out.push('m');
    out
}

/// Write the parameter list of [`code_attr`] without the `CSI`/`m` framing.
pub fn push_body(out: &mut String, attr: Attr, colors: u16) {
    let start = out.len();
    let flags = attr.flags();
    for (flag, code) in [
        (AttrFlags::BOLD, "1;"),
        (AttrFlags::DIM, "2;"),
        (AttrFlags::UNDERLINE, "4;"),
        (AttrFlags::BLINK, "5;"),
        (AttrFlags::INVERSE, "7;"),
        (AttrFlags::INVISIBLE, "8;"),
    ] {
        if flags.contains(flag) {
            out.push_str(code);
        }
    }

    let bg = attr.bg();
    if bg != DEFAULT_COLOR {
        let bg = color::reduce(bg, colors);
        let _ = match bg {
            0..=7 => write!(out, "{};", 40 + bg),
            8..=15 => write!(out, "{};", 100 + bg - 8),
            _ => write!(out, "48;5;{bg};"),
        };
    }

    let fg = attr.fg();
    if fg != DEFAULT_COLOR {
        let fg = color::reduce(fg, colors);
        let _ = match fg {
            0..=7 => write!(out, "{};", 30 + fg),
            8..=15 => write!(out, "{};", 90 + fg - 8),
            _ => write!(out, "38;5;{fg};"),
        };
    }

    if out.len() > start && out.ends_with(';') {
        out.pop();
    }
}

/// Apply an SGR sequence to `cur`.
///
/// Accepts either the full `ESC [ ... m` form or just the parameter list.
/// `0` (or an empty list) resets to `def`; the `2x` codes clear their flag;
/// `39`/`49` restore the default colours. True-colour parameters snap to the
/// nearest palette entry.
pub fn attr_code(code: &str, cur: Attr, def: Attr) -> Attr {
    let body = code.strip_prefix("\x1b[").unwrap_or(code);
    let body = body.strip_suffix('m').unwrap_or(body);

    let mut flags = cur.flags();
    let mut fg = cur.fg();
    let mut bg = cur.bg();

    let params: Vec<u16> = if body.is_empty() {
        vec![0]
    } else {
        body.split([';', ':']).map(|p| p.parse().unwrap_or(0)).collect()
    };

    let mut i = 0;
    while i < params.len() {
        let c = params[i];
        match c {
            0 => {
                flags = def.flags();
                fg = def.fg();
                bg = def.bg();
            }
            1 => flags |= AttrFlags::BOLD,
            2 => flags |= AttrFlags::DIM,
            4 => flags |= AttrFlags::UNDERLINE,
            5 => flags |= AttrFlags::BLINK,
            7 => flags |= AttrFlags::INVERSE,
            8 => flags |= AttrFlags::INVISIBLE,
            22 => flags -= AttrFlags::BOLD | AttrFlags::DIM,
            24 => flags -= AttrFlags::UNDERLINE,
            25 => flags -= AttrFlags::BLINK,
            27 => flags -= AttrFlags::INVERSE,
            28 => flags -= AttrFlags::INVISIBLE,
            30..=37 => fg = c - 30,
            90..=97 => fg = c - 90 + 8,
            39 => fg = def.fg(),
            40..=47 => bg = c - 40,
            100..=107 => bg = c - 100 + 8,
            49 => bg = def.bg(),
            38 | 48 => {
                let (value, used) = extended_color(&params[i + 1..], if c == 38 { def.fg() } else { def.bg() });
                if c == 38 {
                    fg = value;
                } else {
                    bg = value;
                }
                i += used;
            }
            _ => {}
        }
        i += 1;
    }

    Attr::new(flags, fg, bg)
}

/// Decode `5;n` or `2;r;g;b` after a 38/48. Returns the colour and the
/// number of parameters consumed.
fn extended_color(rest: &[u16], fallback: u16) -> (u16, usize) {
    match rest {
        [5, n, ..] => (if *n < 256 { *n } else { fallback }, 2),
        [2, r, g, b, ..] => (color::match_rgb(clamp8(*r), clamp8(*g), clamp8(*b)), 4),
        [2, ..] => (fallback, rest.len()),
        _ => (fallback, 0),
    }
}

fn clamp8(v: u16) -> u8 {
    v.min(255) as u8
}
