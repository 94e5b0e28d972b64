//! Content cleaning and the tag lexer.
//!
//! Element text is first normalized ([`clean`]) and then split into a flat
//! [`Token`] stream ([`lex`]). Styling is not applied here; the wrapper
//! folds push/pop tokens into attributes as it lays out glyphs.
//!
//! Recognized tags:
//!
//! ```text
//!  {bold} {underline} {ul} {blink} {inverse} {invisible} {dim}
//!  {red-fg} {light-blue-bg} {#ff8800-fg} {123-bg}
//!  {left} {center} {right}          alignment of the current line onward
//!  {/name}                          close the innermost matching tag
//!  {/}                              close everything
//!  {open} {close}                   literal braces
//!  {escape}...{/escape}             literal text
//! ```
//!
//! Anything else in braces is kept as literal text.

use super::wrap::{self, WrapOptions, Wrapped};
use super::{Align, Element};
use crate::color;
use crate::types::{Attr, AttrFlags};
use crate::unicode::escape_end;

/// Longest tag body considered before treating `{` as literal.
const MAX_TAG_LEN: usize = 32;

/// One styling instruction a tag can open or close.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    Flag(AttrFlags),
    Fg(u16),
    Bg(u16),
}

impl Tag {
    /// Whether closing `self` may pop `open`.
    pub fn closes(&self, open: &Tag) -> bool {
        match (self, open) {
            (Tag::Flag(a), Tag::Flag(b)) => a == b,
            (Tag::Fg(_), Tag::Fg(_)) | (Tag::Bg(_), Tag::Bg(_)) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Text(String),
    Push(Tag),
    Pop(Tag),
    PopAll,
    /// A raw `ESC [ ... m` sequence.
    Sgr(String),
    Align(Align),
    Newline,
}

/// Text settings shared by every element on a screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextOptions {
    pub full_unicode: bool,
    pub tab_size: usize,
}

impl Default for TextOptions {
    fn default() -> Self {
        Self { full_unicode: true, tab_size: 4 }
    }
}

/// Clean, lex and lay out an element's content at `width` columns.
pub fn parse(el: &Element, width: i32, text: TextOptions, base: Attr) -> Wrapped {
    if el.content.is_empty() {
        return Wrapped::default();
    }
    let cleaned = clean(&el.content, text.tab_size);
    let tokens = lex(&cleaned, el.tags);
    let opts = WrapOptions {
        width: width.max(0) as usize,
        wrap: el.wrap,
        full_unicode: text.full_unicode,
        align: el.align,
    };
    wrap::layout(&tokens, base, opts)
}

// =============================================================================
// Cleaning
// =============================================================================

/// Normalize line endings, expand tabs, and drop control characters other
/// than newline and escape.
pub fn clean(content: &str, tab_size: usize) -> String {
    let mut out = String::with_capacity(content.len());
    let mut chars = content.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                out.push('\n');
            }
            '\t' => out.extend(std::iter::repeat(' ').take(tab_size)),
            '\n' | '\x1b' => out.push(c),
            c if c.is_control() => {}
            c => out.push(c),
        }
    }
    out
}

// =============================================================================
// Lexer
// =============================================================================

/// Split cleaned content into tokens. With `tags` off only raw SGR escapes
/// and newlines are structural.
pub fn lex(content: &str, tags: bool) -> Vec<Token> {
    let mut lexer = Lexer { tokens: Vec::new(), text: String::new() };
    let bytes = content.as_bytes();
    let mut i = 0;
    while i < content.len() {
        let rest = &content[i..];
        match bytes[i] {
            b'\n' => {
                lexer.flush();
                lexer.tokens.push(Token::Newline);
                i += 1;
            }
            0x1b => {
                let mut end = escape_end(bytes, i);
                while !content.is_char_boundary(end) {
                    end += 1;
                }
                let seq = &content[i..end];
                if seq.len() > 2 && seq.starts_with("\x1b[") && seq.ends_with('m') {
                    lexer.flush();
                    lexer.tokens.push(Token::Sgr(seq.to_string()));
                }
                i = end;
            }
            b'{' if tags => match tag_body(rest) {
                Some(body) => {
                    let consumed = body.len() + 2;
                    if body == "escape" {
                        let tail = &rest[consumed..];
                        let (literal, skip) = match tail.find("{/escape}") {
                            Some(p) => (&tail[..p], p + "{/escape}".len()),
                            None => (tail, tail.len()),
                        };
                        lexer.text.push_str(literal);
                        i += consumed + skip;
                    } else if lexer.tag(body) {
                        i += consumed;
                    } else {
                        lexer.text.push('{');
                        i += 1;
                    }
                }
                None => {
                    lexer.text.push('{');
                    i += 1;
                }
            },
            _ => {
                let Some(c) = rest.chars().next() else { break };
                lexer.text.push(c);
                i += c.len_utf8();
            }
        }
    }
    lexer.flush();
    lexer.tokens
}

/// Body of a `{...}` tag at the start of `s`, if well-formed.
fn tag_body(s: &str) -> Option<&str> {
    let close = s[1..].find('}')? + 1;
    let body = &s[1..close];
    if body.len() > MAX_TAG_LEN {
        return None;
    }
    let ok = body.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '#' | '/' | ','));
    ok.then_some(body)
}

struct Lexer {
    tokens: Vec<Token>,
    text: String,
}

impl Lexer {
    fn flush(&mut self) {
        if !self.text.is_empty() {
            self.tokens.push(Token::Text(std::mem::take(&mut self.text)));
        }
    }

    /// Emit the token(s) for a tag body; false if it is not a tag.
    fn tag(&mut self, body: &str) -> bool {
        match body {
            "open" => {
                self.text.push('{');
                return true;
            }
            "close" => {
                self.text.push('}');
                return true;
            }
            "/" => {
                self.flush();
                self.tokens.push(Token::PopAll);
                return true;
            }
            _ => {}
        }
        let (closing, name) = match body.strip_prefix('/') {
            Some(n) => (true, n),
            None => (false, body),
        };
        if let Some(align) = parse_align(name) {
            self.flush();
            self.tokens.push(Token::Align(if closing { Align::Left } else { align }));
            return true;
        }
        let parsed: Option<Vec<Tag>> = name.split(',').map(parse_tag).collect();
        let Some(parsed) = parsed else { return false };
        self.flush();
        for tag in parsed {
            self.tokens.push(if closing { Token::Pop(tag) } else { Token::Push(tag) });
        }
        true
    }
}

fn parse_align(name: &str) -> Option<Align> {
    match name {
        "left" => Some(Align::Left),
        "center" => Some(Align::Center),
        "right" => Some(Align::Right),
        _ => None,
    }
}

fn parse_tag(name: &str) -> Option<Tag> {
    let flag = match name {
        "bold" => Some(AttrFlags::BOLD),
        "underline" | "underlined" | "ul" => Some(AttrFlags::UNDERLINE),
        "blink" => Some(AttrFlags::BLINK),
        "inverse" => Some(AttrFlags::INVERSE),
        "invisible" => Some(AttrFlags::INVISIBLE),
        "dim" => Some(AttrFlags::DIM),
        _ => None,
    };
    if let Some(f) = flag {
        return Some(Tag::Flag(f));
    }
    if let Some(c) = name.strip_suffix("-fg") {
        return color::convert(c).map(Tag::Fg);
    }
    if let Some(c) = name.strip_suffix("-bg") {
        return color::convert(c).map(Tag::Bg);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Token {
        Token::Text(s.to_string())
    }

    #[test]
    fn clean_normalizes_line_endings_and_tabs() {
        assert_eq!(clean("a\r\nb\rc\td\x07", 2), "a\nb\nc  d");
        assert_eq!(clean("\x1b[1mx", 4), "\x1b[1mx");
    }

    #[test]
    fn lexes_flags_and_colours() {
        let toks = lex("{bold}a{/bold}{red-fg}b{/red-fg}", true);
        assert_eq!(
            toks,
            vec![
                Token::Push(Tag::Flag(AttrFlags::BOLD)),
                text("a"),
                Token::Pop(Tag::Flag(AttrFlags::BOLD)),
                Token::Push(Tag::Fg(1)),
                text("b"),
                Token::Pop(Tag::Fg(1)),
            ]
        );
    }

    #[test]
    fn unknown_tags_stay_literal() {
        assert_eq!(lex("{nope}x", true), vec![text("{nope}x")]);
        assert_eq!(lex("a { b", true), vec![text("a { b")]);
        assert_eq!(lex("{bold}", false), vec![text("{bold}")]);
    }

    #[test]
    fn braces_and_escape_blocks() {
        assert_eq!(lex("{open}x{close}", true), vec![text("{x}")]);
        assert_eq!(lex("{escape}{bold}{/escape}!", true), vec![text("{bold}!")]);
    }

    #[test]
    fn alignment_and_reset() {
        let toks = lex("{center}t{/center}\n{/}", true);
        assert_eq!(
            toks,
            vec![
                Token::Align(Align::Center),
                text("t"),
                Token::Align(Align::Left),
                Token::Newline,
                Token::PopAll,
            ]
        );
    }

    #[test]
    fn raw_sgr_kept_other_escapes_dropped() {
        let toks = lex("\x1b[31mr\x1b[2Jx\x1b]0;t\x07", false);
        assert_eq!(toks, vec![Token::Sgr("\x1b[31m".into()), text("rx")]);
    }

    #[test]
    fn combined_tags_push_each() {
        let toks = lex("{bold,blue-bg}", true);
        assert_eq!(toks, vec![Token::Push(Tag::Flag(AttrFlags::BOLD)), Token::Push(Tag::Bg(4))]);
    }

    #[test]
    fn parse_wraps_element_content() {
        let el = Element::new().content("one two three").tags(true);
        let w = parse(&el, 8, TextOptions::default(), Attr::DEFAULT);
        assert_eq!(w.height(), 2);
        assert!(parse(&Element::new(), 8, TextOptions::default(), Attr::DEFAULT).lines.is_empty());
    }

    #[test]
    fn close_matches_kind() {
        assert!(Tag::Fg(3).closes(&Tag::Fg(1)));
        assert!(!Tag::Fg(3).closes(&Tag::Bg(3)));
        assert!(!Tag::Flag(AttrFlags::BOLD).closes(&Tag::Flag(AttrFlags::DIM)));
    }
}
