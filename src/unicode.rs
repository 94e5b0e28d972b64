//! Cell-width measurement for glyphs and styled strings.
//!
//! Widths follow East Asian Width with emoji presentation sequences forced to
//! two cells, which is what current terminal emulators actually render.

use std::borrow::Cow;

use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthChar;

/// Columns taken by one codepoint. Controls and combining marks are 0.
#[inline]
pub fn char_width(c: char) -> usize {
    match c as u32 {
        0x1F300..=0x1F64F | 0x1F680..=0x1F6FF | 0x1F900..=0x1F9FF | 0x1FA70..=0x1FAFF => 2,
        _ => c.width().unwrap_or(0),
    }
}

/// Columns taken by a grapheme cluster.
pub fn grapheme_width(g: &str) -> usize {
    let mut chars = g.chars();
    let Some(first) = chars.next() else {
        return 0;
    };
    if (0x1F1E6..=0x1F1FF).contains(&(first as u32)) && chars.clone().next().is_some() {
        return 2;
    }
    let emoji_seq = chars.any(|c| matches!(c as u32, 0x200D | 0xFE0F | 0x20E3 | 0x1F3FB..=0x1F3FF));
    if emoji_seq {
        2
    } else {
        char_width(first)
    }
}

/// True for glyphs that occupy two columns.
#[inline]
pub fn is_wide(g: &str) -> bool {
    grapheme_width(g) == 2
}

/// Display width of a string, ignoring escape sequences.
pub fn str_width(s: &str) -> usize {
    if s.is_ascii() && !s.contains('\x1b') {
        return s.bytes().filter(|b| *b >= 0x20 && *b != 0x7f).count();
    }
    strip_ansi(s).graphemes(true).map(grapheme_width).sum()
}

/// Split into grapheme clusters.
pub fn graphemes(s: &str) -> impl Iterator<Item = &str> {
    s.graphemes(true)
}

// =============================================================================
// Escape stripping
// =============================================================================

/// Remove CSI, OSC/DCS string sequences, and two-byte escapes.
pub fn strip_ansi(s: &str) -> Cow<'_, str> {
    if !s.contains('\x1b') {
        return Cow::Borrowed(s);
    }
    let bytes = s.as_bytes();
    let mut out = String::with_capacity(s.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != 0x1b {
            let start = i;
            while i < bytes.len() && bytes[i] != 0x1b {
                i += 1;
            }
            out.push_str(&s[start..i]);
            continue;
        }
        i = escape_end(bytes, i);
    }
    Cow::Owned(out)
}

/// Index just past the escape sequence starting at `pos`.
pub(crate) fn escape_end(bytes: &[u8], pos: usize) -> usize {
    let Some(&kind) = bytes.get(pos + 1) else {
        return bytes.len();
    };
    let mut i = pos + 2;
    match kind {
        b'[' => {
            while i < bytes.len() {
                match bytes[i] {
                    0x40..=0x7e => return i + 1,
                    0x20..=0x3f => i += 1,
                    _ => return i,
                }
            }
            bytes.len()
        }
        b']' | b'P' | b'^' | b'_' => {
            while i < bytes.len() {
                if bytes[i] == 0x07 {
                    return i + 1;
                }
                if bytes[i] == 0x1b && bytes.get(i + 1) == Some(&b'\\') {
                    return i + 2;
                }
                i += 1;
            }
            bytes.len()
        }
        _ => pos + 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_and_controls() {
        assert_eq!(char_width('a'), 1);
        assert_eq!(char_width('\0'), 0);
        assert_eq!(str_width("hello"), 5);
        assert_eq!(str_width("a\tb"), 2);
    }

    #[test]
    fn cjk_is_wide() {
        assert_eq!(char_width('你'), 2);
        assert_eq!(str_width("你好"), 4);
        assert!(is_wide("界"));
    }

    #[test]
    fn combining_mark_attaches_to_base() {
        assert_eq!(grapheme_width("e\u{0301}"), 1);
        assert_eq!(graphemes("e\u{0301}x").count(), 2);
    }

    #[test]
    fn emoji_sequences_take_two_cells() {
        assert_eq!(grapheme_width("👍🏽"), 2);
        assert_eq!(grapheme_width("🇺🇸"), 2);
        assert_eq!(grapheme_width("🚀"), 2);
    }

    #[test]
    fn escapes_have_no_width() {
        assert_eq!(str_width("\x1b[1;31mred\x1b[m"), 3);
        assert_eq!(strip_ansi("a\x1b]0;title\x07b"), "ab");
        assert_eq!(strip_ansi("a\x1bPq\x1b\\b"), "ab");
        assert!(matches!(strip_ansi("plain"), Cow::Borrowed(_)));
    }
}
