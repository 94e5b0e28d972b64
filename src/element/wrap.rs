//! Styled line layout and word wrapping.
//!
//! Tokens from the lexer are folded into glyphs carrying their final
//! attribute, split on newlines, and wrapped greedily to a column width.
//! A double-width glyph is followed by a zero-width filler glyph so that
//! one glyph is always one column.

use super::content::{Tag, Token};
use super::Align;
use crate::program::sgr::attr_code;
use crate::types::Attr;
use crate::unicode::{graphemes, grapheme_width};

/// How far back from the wrap column a space is searched for.
const WORD_BREAK_WINDOW: usize = 10;

/// One column of laid-out text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Glyph {
    pub ch: String,
    pub attr: Attr,
    /// 1 or 2 for a visible glyph, 0 for the filler after a wide one.
    pub width: u8,
}

impl Glyph {
    pub fn is_filler(&self) -> bool {
        self.width == 0
    }
}

/// One visual line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub glyphs: Vec<Glyph>,
    pub align: Align,
    /// Attribute in effect before the first glyph.
    pub start: Attr,
    /// Attribute in effect after the last glyph; fills the rest of the row.
    pub end: Attr,
}

impl Line {
    pub fn width(&self) -> usize {
        self.glyphs.len()
    }

    pub fn text(&self) -> String {
        self.glyphs.iter().map(|g| g.ch.as_str()).collect()
    }
}

/// Laid-out content of one element.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Wrapped {
    pub lines: Vec<Line>,
    pub max_width: usize,
}

impl Wrapped {
    pub fn height(&self) -> usize {
        self.lines.len()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct WrapOptions {
    /// Column budget; 0 disables wrapping.
    pub width: usize,
    pub wrap: bool,
    /// Keep wide glyphs and combining clusters; otherwise wide glyphs
    /// become `?` and clusters keep their base character.
    pub full_unicode: bool,
    pub align: Align,
}

impl Default for WrapOptions {
    fn default() -> Self {
        Self { width: 0, wrap: true, full_unicode: true, align: Align::Left }
    }
}

// =============================================================================
// Style folding
// =============================================================================

enum Entry {
    Tag(Tag),
    Sgr(String),
}

struct StyleStack {
    base: Attr,
    entries: Vec<Entry>,
    current: Attr,
}

impl StyleStack {
    fn new(base: Attr) -> Self {
        Self { base, entries: Vec::new(), current: base }
    }

    fn push(&mut self, entry: Entry) {
        self.entries.push(entry);
        self.refold();
    }

    fn pop(&mut self, tag: &Tag) {
        let found = self.entries.iter().rposition(|e| matches!(e, Entry::Tag(t) if tag.closes(t)));
        if let Some(i) = found {
            self.entries.remove(i);
            self.refold();
        }
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.current = self.base;
    }

    fn refold(&mut self) {
        let mut a = self.base;
        for e in &self.entries {
            a = match e {
                Entry::Tag(Tag::Flag(f)) => a.with_flags(a.flags() | *f),
                Entry::Tag(Tag::Fg(c)) => a.with_fg(*c),
                Entry::Tag(Tag::Bg(c)) => a.with_bg(*c),
                Entry::Sgr(code) => attr_code(code, a, self.base),
            };
        }
        self.current = a;
    }
}

// =============================================================================
// Layout
// =============================================================================

struct Logical {
    glyphs: Vec<Glyph>,
    align: Align,
    start: Attr,
    end: Attr,
}

/// Lay out `tokens` with `base` as the element's default attribute.
pub fn layout(tokens: &[Token], base: Attr, opts: WrapOptions) -> Wrapped {
    let mut style = StyleStack::new(base);
    let mut align = opts.align;
    let mut logical = Vec::new();
    let mut cur = Logical { glyphs: Vec::new(), align, start: base, end: base };

    for token in tokens {
        match token {
            Token::Text(text) => push_text(&mut cur.glyphs, text, style.current, opts.full_unicode),
            Token::Push(tag) => style.push(Entry::Tag(*tag)),
            Token::Pop(tag) => style.pop(tag),
            Token::PopAll => style.clear(),
            Token::Sgr(code) => {
                if code == "\x1b[m" || code == "\x1b[0m" {
                    style.clear();
                } else {
                    style.push(Entry::Sgr(code.clone()));
                }
            }
            Token::Align(a) => {
                align = *a;
                if cur.glyphs.is_empty() {
                    cur.align = align;
                }
            }
            Token::Newline => {
                cur.end = style.current;
                let next = Logical { glyphs: Vec::new(), align, start: style.current, end: style.current };
                logical.push(std::mem::replace(&mut cur, next));
            }
        }
    }
    cur.end = style.current;
    logical.push(cur);

    let mut out = Wrapped::default();
    for line in logical {
        if opts.wrap && opts.width > 0 {
            wrap_line(line, opts.width, &mut out.lines);
        } else {
            out.lines.push(Line { glyphs: line.glyphs, align: line.align, start: line.start, end: line.end });
        }
    }
    out.max_width = out.lines.iter().map(Line::width).max().unwrap_or(0);
    out
}

fn push_text(glyphs: &mut Vec<Glyph>, text: &str, attr: Attr, full_unicode: bool) {
    for g in graphemes(text) {
        let width = grapheme_width(g);
        if width == 0 {
            // Stray combining mark: attach to the previous visible glyph.
            if full_unicode {
                if let Some(prev) = glyphs.iter_mut().rev().find(|p| !p.is_filler()) {
                    prev.ch.push_str(g);
                }
            }
            continue;
        }
        if !full_unicode {
            let ch = if width >= 2 { "?".to_string() } else { g.chars().take(1).collect() };
            glyphs.push(Glyph { ch, attr, width: 1 });
            continue;
        }
        glyphs.push(Glyph { ch: g.to_string(), attr, width: width.min(2) as u8 });
        if width >= 2 {
            glyphs.push(Glyph { ch: String::new(), attr, width: 0 });
        }
    }
}

fn wrap_line(line: Logical, width: usize, out: &mut Vec<Line>) {
    let Logical { mut glyphs, align, start, end } = line;
    let mut seg_start = start;
    while glyphs.len() > width {
        let mut cut = width;
        if glyphs[cut].is_filler() {
            cut -= 1;
        }
        let mut j = cut;
        while j > cut.saturating_sub(WORD_BREAK_WINDOW) && j > 0 {
            j -= 1;
            if glyphs[j].ch == " " {
                cut = j + 1;
                break;
            }
        }
        if cut == 0 {
            // A wide glyph wider than the whole budget.
            cut = glyphs.len().min(2);
        }
        let rest = glyphs.split_off(cut);
        let seg_end = glyphs.last().map_or(seg_start, |g| g.attr);
        out.push(Line { glyphs, align, start: seg_start, end: seg_end });
        seg_start = rest.first().map_or(end, |g| g.attr);
        glyphs = rest;
    }
    out.push(Line { glyphs, align, start: seg_start, end });
}
