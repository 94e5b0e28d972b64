//! The 256-colour palette: RGB values, nearest-colour matching, depth
//! reduction, and the 50% blend used by transparent elements.

use crate::types::{Attr, DEFAULT_COLOR};

// =============================================================================
// Palette
// =============================================================================

const BASE16: [(u8, u8, u8); 16] = [
    (0x00, 0x00, 0x00),
    (0xcd, 0x00, 0x00),
    (0x00, 0xcd, 0x00),
    (0xcd, 0xcd, 0x00),
    (0x00, 0x00, 0xee),
    (0xcd, 0x00, 0xcd),
    (0x00, 0xcd, 0xcd),
    (0xe5, 0xe5, 0xe5),
    (0x7f, 0x7f, 0x7f),
    (0xff, 0x00, 0x00),
    (0x00, 0xff, 0x00),
    (0xff, 0xff, 0x00),
    (0x5c, 0x5c, 0xff),
    (0xff, 0x00, 0xff),
    (0x00, 0xff, 0xff),
    (0xff, 0xff, 0xff),
];

const CUBE: [u8; 6] = [0x00, 0x5f, 0x87, 0xaf, 0xd7, 0xff];

const fn build_palette() -> [(u8, u8, u8); 256] {
    let mut out = [(0u8, 0u8, 0u8); 256];
    let mut i = 0;
    while i < 16 {
        out[i] = BASE16[i];
        i += 1;
    }
    let mut r = 0;
    while r < 6 {
        let mut g = 0;
        while g < 6 {
            let mut b = 0;
            while b < 6 {
                out[16 + r * 36 + g * 6 + b] = (CUBE[r], CUBE[g], CUBE[b]);
                b += 1;
            }
            g += 1;
        }
        r += 1;
    }
    let mut k = 0;
    while k < 24 {
        let v = (8 + k * 10) as u8;
        out[232 + k] = (v, v, v);
        k += 1;
    }
    out
}

/// xterm 256-colour palette.
pub static PALETTE: [(u8, u8, u8); 256] = build_palette();

/// RGB of a palette index. The default colour is treated as black.
pub fn rgb(index: u16) -> (u8, u8, u8) {
    PALETTE.get(index as usize).copied().unwrap_or((0, 0, 0))
}

// =============================================================================
// Matching
// =============================================================================

fn distance(a: (u8, u8, u8), b: (u8, u8, u8)) -> u32 {
    let dr = a.0 as i32 - b.0 as i32;
    let dg = a.1 as i32 - b.1 as i32;
    let db = a.2 as i32 - b.2 as i32;
    (dr * dr * 30 + dg * dg * 59 + db * db * 11) as u32
}

fn nearest_in(range: std::ops::Range<usize>, target: (u8, u8, u8)) -> u16 {
    let mut best = range.start;
    let mut best_d = u32::MAX;
    for i in range {
        let d = distance(PALETTE[i], target);
        if d == 0 {
            return i as u16;
        }
        if d < best_d {
            best_d = d;
            best = i;
        }
    }
    best as u16
}

/// Nearest palette index for an RGB triple (luma-weighted distance).
pub fn match_rgb(r: u8, g: u8, b: u8) -> u16 {
    nearest_in(0..256, (r, g, b))
}

/// Parse `#rgb` / `#rrggbb` into the nearest palette index.
pub fn match_hex(hex: &str) -> Option<u16> {
    let h = hex.strip_prefix('#')?;
    let digits: Vec<u8> = match h.len() {
        3 => h
            .chars()
            .map(|c| c.to_digit(16).map(|d| (d * 17) as u8))
            .collect::<Option<Vec<_>>>()?,
        6 => (0..3)
            .map(|i| u8::from_str_radix(&h[i * 2..i * 2 + 2], 16).ok())
            .collect::<Option<Vec<_>>>()?,
        _ => return None,
    };
    Some(match_rgb(digits[0], digits[1], digits[2]))
}

// =============================================================================
// Names
// =============================================================================

const NAMES: [&str; 16] = [
    "black", "red", "green", "yellow", "blue", "magenta", "cyan", "white",
    "brightblack", "brightred", "brightgreen", "brightyellow", "brightblue",
    "brightmagenta", "brightcyan", "brightwhite",
];

/// Resolve a colour spelled as a name, `#hex`, or a decimal index.
///
/// `default` maps to [`DEFAULT_COLOR`]. Accepts `light`/`bright` prefixes
/// and the `grey`/`gray` aliases for bright black.
pub fn convert(name: &str) -> Option<u16> {
    let lower = name.trim().to_ascii_lowercase();
    if lower == "default" {
        return Some(DEFAULT_COLOR);
    }
    if lower.starts_with('#') {
        return match_hex(&lower);
    }
    if let Ok(n) = lower.parse::<u16>() {
        return (n < 256).then_some(n);
    }
    let normalized = match lower.as_str() {
        "grey" | "gray" => "brightblack".to_string(),
        other => other.replace("light", "bright").replace(['-', '_', ' '], ""),
    };
    NAMES.iter().position(|n| *n == normalized).map(|i| i as u16)
}

// =============================================================================
// Reduction and blending
// =============================================================================

/// Reduce a colour index to what a terminal with `depth` colours can show.
///
/// The default colour is passed through untouched.
pub fn reduce(color: u16, depth: u16) -> u16 {
    if color == DEFAULT_COLOR {
        return color;
    }
    let mut c = color;
    if c >= 16 && depth <= 16 {
        c = nearest_in(0..16, rgb(c));
    }
    if c >= 8 && depth <= 8 {
        c -= 8;
    }
    if depth <= 2 {
        c %= 2;
    }
    c
}

/// Mix two palette colours at `alpha` and snap back to the palette.
///
/// The default colour counts as black on both sides.
pub fn mix(c1: u16, c2: u16, alpha: f32) -> u16 {
    let a = if c1 == DEFAULT_COLOR { (0, 0, 0) } else { rgb(c1) };
    let b = if c2 == DEFAULT_COLOR { (0, 0, 0) } else { rgb(c2) };
    let lerp = |x: u8, y: u8| -> u8 { (x as f32 + (y as f32 - x as f32) * alpha) as i32 as u8 };
    match_rgb(lerp(a.0, b.0), lerp(a.1, b.1), lerp(a.2, b.2))
}

/// Blend `attr` over the attribute already in a cell.
///
/// Backgrounds mix with the default treated as black; foregrounds treat the
/// default as palette 248 so text stays legible. Flags come from `attr`.
pub fn blend(attr: Attr, under: Attr, alpha: f32) -> Attr {
    let bg = mix(attr.bg(), under.bg(), alpha);
    let fg_top = if attr.fg() == DEFAULT_COLOR { 248 } else { attr.fg() };
    let fg_under = if under.fg() == DEFAULT_COLOR { 248 } else { under.fg() };
    let fg = mix(fg_top, fg_under, alpha);
    Attr::new(attr.flags(), fg, bg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AttrFlags;

    #[test]
    fn palette_cube_and_greys() {
        assert_eq!(PALETTE[16], (0, 0, 0));
        assert_eq!(PALETTE[231], (0xff, 0xff, 0xff));
        assert_eq!(PALETTE[196], (0xff, 0, 0));
        assert_eq!(PALETTE[232], (8, 8, 8));
        assert_eq!(PALETTE[255], (238, 238, 238));
    }

    #[test]
    fn exact_rgb_matches_find_the_index() {
        assert_eq!(match_rgb(0xff, 0, 0), 9);
        assert_eq!(match_rgb(0x5f, 0x87, 0xaf), 16 + 36 + 12 + 3);
    }

    #[test]
    fn convert_names_and_hex() {
        assert_eq!(convert("red"), Some(1));
        assert_eq!(convert("light-blue"), Some(12));
        assert_eq!(convert("grey"), Some(8));
        assert_eq!(convert("default"), Some(DEFAULT_COLOR));
        assert_eq!(convert("#ff0000"), Some(9));
        assert_eq!(convert("#f00"), Some(9));
        assert_eq!(convert("123"), Some(123));
        assert_eq!(convert("chartreuse"), None);
    }

    #[test]
    fn reduce_keeps_default_and_folds_bright() {
        assert_eq!(reduce(DEFAULT_COLOR, 8), DEFAULT_COLOR);
        assert_eq!(reduce(9, 8), 1);
        assert_eq!(reduce(196, 16), 9);
        assert_eq!(reduce(196, 256), 196);
    }

    #[test]
    fn blend_mixes_halfway() {
        let top = Attr::new(AttrFlags::BOLD, 15, 15);
        let under = Attr::new(AttrFlags::empty(), 0, 0);
        let out = blend(top, under, 0.5);
        assert_eq!(out.flags(), AttrFlags::BOLD);
        // halfway between black and white lands in the grey ramp
        assert!((232..=255).contains(&out.bg()) || out.bg() == 8);
    }
}
