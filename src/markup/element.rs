//! HTML-like elements and their attribute syntax.
//!
//! The tag name gates which subgrammar applies; see
//! [`element_class`](crate::config::element_class). Unknown tag names and
//! stray close tags decay to plain text.

use super::{MarkupCached, MkEngine, inline};
use crate::{
    ast::{Attribute, Block, ElementContent, HtmlElement, Inline},
    codemap::{Span, Spanned},
    config::{Compiled, ElementClass, VOID_TAGS, element_class},
    engine::{RuleId, pattern::match_close_tag, trap::Trap},
};
use std::sync::LazyLock;

/// An XML-ish name: `[:A-Z_a-z0-9][:A-Z_a-z0-9\-.]*`.
static NAME: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new("^[:A-Za-z0-9_][:A-Za-z0-9_.-]*").unwrap());

/// The outcome of parsing an HTML-like element: its class decides whether
/// it lives in inline or block position.
pub(super) enum ParsedElement {
    Inline(Spanned<Inline>),
    Block(Spanned<Block>),
}

/// An HTML-like element at the current position.
pub(super) fn element(e: &mut MkEngine<'_>) -> Option<ParsedElement> {
    e.attempt(|e| {
        let start = e.pos;
        e.literal("<").then_some(())?;
        if e.buf.byte(e.pos) == Some(b'/') {
            // Unmatched close tags are left as literal text.
            return None;
        }
        let name_span = e.regex(&NAME)?;
        let name = e.slice(name_span);
        let class = element_class(name)?;
        let lower = name.to_ascii_lowercase();

        let attrs = attributes(e, AttrContext::Tag);
        skip_ws(e, AttrContext::Tag);
        let self_closing = e.literal("/");
        e.blanks();
        e.literal(">").then_some(())?;

        if self_closing || VOID_TAGS.contains(lower.as_str()) {
            let el = HtmlElement {
                name: name_span,
                attrs,
                content: ElementContent::None,
                self_closing,
                unclosed: false,
            };
            return Some(match class {
                ElementClass::Nowiki => ParsedElement::Inline(Spanned::new(
                    Inline::Nowiki { content: Span::new(e.pos, e.pos) },
                    start,
                    e.pos,
                )),
                ElementClass::Ref => ParsedElement::Inline(Spanned::new(
                    Inline::Ref { attrs: el.attrs, content: Vec::new() },
                    start,
                    e.pos,
                )),
                ElementClass::Inline => {
                    ParsedElement::Inline(Spanned::new(Inline::Html(el), start, e.pos))
                }
                _ => ParsedElement::Block(Spanned::new(Block::Html(el), start, e.pos)),
            });
        }

        Some(match class {
            ElementClass::Inline => {
                e.trap(Trap::PushIfnotCloseTag(lower.clone()));
                let content = inline::inline_flow(e);
                e.trap(Trap::PopIfnot);
                let unclosed = !consume_close(e, &lower);
                if unclosed {
                    e.warn(Span::new(start, e.pos), format!("unclosed <{lower}>"));
                }
                ParsedElement::Inline(Spanned::new(
                    Inline::Html(HtmlElement {
                        name: name_span,
                        attrs,
                        content: ElementContent::Inline(content),
                        self_closing: false,
                        unclosed,
                    }),
                    start,
                    e.pos,
                ))
            }

            ElementClass::Nowiki => {
                let content_start = e.pos;
                let content = match scan_close(e, e.pos, "nowiki") {
                    Some((content_end, after)) => {
                        e.pos = after;
                        Span::new(content_start, content_end)
                    }
                    None => {
                        e.pos = e.buf.len();
                        e.warn(Span::new(start, e.pos), "unclosed <nowiki>");
                        Span::new(content_start, e.pos)
                    }
                };
                ParsedElement::Inline(Spanned::new(
                    Inline::Nowiki { content },
                    start,
                    e.pos,
                ))
            }

            ElementClass::Ref => {
                e.trap(Trap::PushIfnotCloseTag(lower.clone()));
                e.trap(Trap::PushWspreOff);
                let content = super::document(e, true, false);
                e.trap(Trap::PopWspre);
                e.trap(Trap::PopIfnot);
                if !consume_close(e, &lower) {
                    e.warn(Span::new(start, e.pos), "unclosed <ref>");
                }
                ParsedElement::Inline(Spanned::new(
                    Inline::Ref { attrs, content },
                    start,
                    e.pos,
                ))
            }

            ElementClass::Pre => {
                let (content, unclosed) = pre_content(e);
                if unclosed {
                    e.warn(Span::new(start, e.pos), "unclosed <pre>");
                }
                ParsedElement::Block(Spanned::new(
                    Block::Html(HtmlElement {
                        name: name_span,
                        attrs,
                        content: ElementContent::Inline(content),
                        self_closing: false,
                        unclosed,
                    }),
                    start,
                    e.pos,
                ))
            }

            ElementClass::Heading => {
                e.trap(Trap::PushIfnotCloseTag(lower.clone()));
                e.trap(Trap::PushNoNl);
                let content = inline::inline_content(e);
                e.trap(Trap::PopNo);
                e.trap(Trap::PopIfnot);
                let unclosed = !consume_close(e, &lower);
                if unclosed {
                    e.warn(Span::new(start, e.pos), format!("unclosed <{lower}>"));
                }
                ParsedElement::Block(Spanned::new(
                    Block::Html(HtmlElement {
                        name: name_span,
                        attrs,
                        content: ElementContent::Inline(content),
                        self_closing: false,
                        unclosed,
                    }),
                    start,
                    e.pos,
                ))
            }

            ElementClass::ParagraphLike => {
                e.trap(Trap::PushIfnotCloseTag(lower.clone()));
                e.trap(Trap::PushWspreOff);
                let content = inline::inline_flow(e);
                e.trap(Trap::PopWspre);
                e.trap(Trap::PopIfnot);
                let unclosed = !consume_close(e, &lower);
                if unclosed {
                    e.warn(Span::new(start, e.pos), format!("unclosed <{lower}>"));
                }
                ParsedElement::Block(Spanned::new(
                    Block::Html(HtmlElement {
                        name: name_span,
                        attrs,
                        content: ElementContent::Inline(content),
                        self_closing: false,
                        unclosed,
                    }),
                    start,
                    e.pos,
                ))
            }

            ElementClass::BlockDocument
            | ElementClass::BlockNoPre
            | ElementClass::Structure => {
                e.trap(Trap::PushIfnotCloseTag(lower.clone()));
                let wspre = match class {
                    // div/center/references re-enable indent-pre
                    // explicitly; blockquote disables it.
                    // FIXME: the off-then-reenable toggling is a known
                    // limitation of how these scopes compose.
                    ElementClass::BlockDocument => Some(Trap::SetWspreOn),
                    ElementClass::BlockNoPre => Some(Trap::PushWspreOff),
                    _ => None,
                };
                if let Some(trap) = wspre.clone() {
                    e.trap(trap);
                }
                let content = super::document(e, true, false);
                if wspre.is_some() {
                    e.trap(Trap::PopWspre);
                }
                e.trap(Trap::PopIfnot);
                let unclosed = !consume_close(e, &lower);
                if unclosed {
                    e.warn(Span::new(start, e.pos), format!("unclosed <{lower}>"));
                }
                ParsedElement::Block(Spanned::new(
                    Block::Html(HtmlElement {
                        name: name_span,
                        attrs,
                        content: ElementContent::Blocks(content),
                        self_closing: false,
                        unclosed,
                    }),
                    start,
                    e.pos,
                ))
            }
        })
    })
}

/// Consumes `</name >` at the current position.
pub(super) fn consume_close(e: &mut MkEngine<'_>, name: &str) -> bool {
    match match_close_tag(e.buf.rest(e.pos), name) {
        Some(len) => {
            e.pos += len;
            true
        }
        None => false,
    }
}

/// Finds `</name >` at or after `from`. Returns the content end and the
/// position after the close tag.
fn scan_close(e: &MkEngine<'_>, from: usize, name: &str) -> Option<(usize, usize)> {
    let hay = e.buf.rest(from);
    for lt in memchr::memchr_iter(b'<', hay.as_bytes()) {
        if let Some(len) = match_close_tag(&hay[lt..], name) {
            return Some((from + lt, from + lt + len));
        }
    }
    None
}

/// `<pre>` content: verbatim until `</pre>`, with `<nowiki>` and entities
/// respected inside. The nowiki close tag is mandatory here; an unclosed
/// `<nowiki>` stays literal.
fn pre_content(e: &mut MkEngine<'_>) -> (Vec<Spanned<Inline>>, bool) {
    let mut content: Vec<Spanned<Inline>> = Vec::new();
    let mut text_start = e.pos;
    let unclosed;
    loop {
        if e.eof() {
            unclosed = true;
            break;
        }
        let b = e.buf.byte(e.pos).expect("checked not at eof");
        if b == b'<' {
            if let Some(len) = match_close_tag(e.buf.rest(e.pos), "pre") {
                flush_text(&mut content, text_start, e.pos);
                e.pos += len;
                unclosed = false;
                return (content, unclosed);
            }
            if e.buf.starts_with(e.pos, "<nowiki>")
                && let Some((content_end, after)) = scan_close(e, e.pos + 8, "nowiki")
            {
                flush_text(&mut content, text_start, e.pos);
                content.push(Spanned::new(
                    Inline::Nowiki { content: Span::new(e.pos + 8, content_end) },
                    e.pos,
                    after,
                ));
                e.pos = after;
                text_start = e.pos;
                continue;
            }
        } else if b == b'&' {
            flush_text(&mut content, text_start, e.pos);
            if let Some(node) = inline::entity(e) {
                inline::push(&mut content, node);
                text_start = e.pos;
                continue;
            }
            text_start = e.pos;
        }
        e.pos += e.buf.at(e.pos).map_or(1, char::len_utf8);
    }
    flush_text(&mut content, text_start, e.pos);
    (content, unclosed)
}

/// Pushes the pending text run, if any.
fn flush_text(content: &mut Vec<Spanned<Inline>>, start: usize, end: usize) {
    if start < end {
        inline::push(content, Spanned::new(Inline::Text, start, end));
    }
}

////////////////
// Attributes //
////////////////

/// Where an attribute list appears; decides its terminators and whether
/// whitespace may include newlines.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(super) enum AttrContext {
    /// Inside an XML-like tag: may span lines, ends at `>` or `/`.
    Tag,
    /// A `{|` or `|-` line: ends at the newline.
    Line,
    /// Before a cell's `|` delimiter: ends at `|`, `!`, a newline, or a
    /// wikilink start.
    Cell,
}

/// Parses a `name = value` attribute list, tolerating junk between
/// attributes; `<` is not allowed in junk and ends the list.
pub(super) fn attributes(e: &mut MkEngine<'_>, ctx: AttrContext) -> Vec<Attribute> {
    let mut out = Vec::new();
    loop {
        // Whitespace and junk between attributes.
        loop {
            if e.eof() || at_stop(e, ctx) {
                return out;
            }
            let c = e.buf.at(e.pos).expect("checked not at eof");
            if c == ' ' || c == '\t' || (ctx == AttrContext::Tag && matches!(c, '\n' | '\r')) {
                e.pos += 1;
            } else if is_name_start(c) {
                break;
            } else if c == '<' {
                return out;
            } else {
                e.pos += c.len_utf8();
            }
        }
        match attribute(e, ctx) {
            Some(attr) => out.push(attr),
            None => {
                // Cannot happen while the junk loop stops at name starts,
                // but never risk a livelock.
                e.pos += e.buf.at(e.pos).map_or(1, char::len_utf8);
            }
        }
    }
}

/// Returns true at a terminator of the attribute list.
fn at_stop(e: &MkEngine<'_>, ctx: AttrContext) -> bool {
    let Some(b) = e.buf.byte(e.pos) else { return true };
    match ctx {
        AttrContext::Tag => matches!(b, b'>' | b'/'),
        AttrContext::Line => matches!(b, b'\n' | b'\r' | b'<'),
        AttrContext::Cell => {
            matches!(b, b'|' | b'!' | b'\n' | b'\r' | b'<') || e.buf.starts_with(e.pos, "[[")
        }
    }
}

fn is_name_start(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == ':' || c == '_'
}

/// One attribute: a name, optionally `= value`.
fn attribute(e: &mut MkEngine<'_>, ctx: AttrContext) -> Option<Attribute> {
    e.attempt(|e| {
        let start = e.pos;
        let cached = e.memoized(RuleId::AttributeName, |e| {
            e.regex(&NAME).map(MarkupCached::Span)
        })?;
        let MarkupCached::Span(name_span) = cached else {
            unreachable!("AttributeName cached a non-span");
        };
        let name = e.slice(name_span).to_string();

        let before_eq = e.checkpoint();
        skip_ws(e, ctx);
        let value = if e.literal("=") {
            skip_ws(e, ctx);
            Some(attr_value(e, ctx))
        } else {
            e.rewind(before_eq);
            None
        };
        Some(Attribute { name, value, span: Span::new(start, e.pos) })
    })
}

/// Skips blanks, and line breaks when the context allows them.
fn skip_ws(e: &mut MkEngine<'_>, ctx: AttrContext) {
    loop {
        match e.buf.byte(e.pos) {
            Some(b' ' | b'\t') => e.pos += 1,
            Some(b'\n' | b'\r') if ctx == AttrContext::Tag => e.pos += 1,
            _ => break,
        }
    }
}

/// An attribute value: double-quoted, single-quoted, or unquoted. Entities
/// are decoded.
fn attr_value(e: &mut MkEngine<'_>, ctx: AttrContext) -> String {
    for quote in [b'"', b'\''] {
        if e.buf.byte(e.pos) != Some(quote) {
            continue;
        }
        e.pos += 1;
        let start = e.pos;
        loop {
            match e.buf.byte(e.pos) {
                None => break,
                Some(b) if b == quote => break,
                Some(b'\n' | b'\r') if ctx != AttrContext::Tag => break,
                Some(_) => e.pos += e.buf.at(e.pos).map_or(1, char::len_utf8),
            }
        }
        let raw = &e.buf.as_str()[start..e.pos];
        let value = decode_entities(raw, &e.config);
        if e.buf.byte(e.pos) == Some(quote) {
            e.pos += 1;
        }
        return value;
    }

    let start = e.pos;
    loop {
        if e.eof() || at_stop(e, ctx) {
            break;
        }
        let c = e.buf.at(e.pos).expect("checked not at eof");
        if c.is_whitespace() || c == '>' || c == '<' {
            break;
        }
        e.pos += c.len_utf8();
    }
    decode_entities(&e.buf.as_str()[start..e.pos], &e.config)
}

/// Decodes `&name;`/`&#d;`/`&#xh;` references in an attribute value.
pub(super) fn decode_entities(raw: &str, config: &Compiled) -> String {
    let Some(first) = raw.find('&') else {
        return raw.to_string();
    };
    let mut out = String::with_capacity(raw.len());
    out.push_str(&raw[..first]);
    let mut rest = &raw[first..];
    while let Some(at) = rest.find('&') {
        out.push_str(&rest[..at]);
        rest = &rest[at..];
        match decode_one(rest, config) {
            Some((c, len)) => {
                out.push(c);
                rest = &rest[len..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Decodes one entity reference at the start of `s`, returning the code
/// point and consumed length.
fn decode_one(s: &str, config: &Compiled) -> Option<(char, usize)> {
    let body = s.strip_prefix('&')?;
    let end = body.find(';')?;
    let name = &body[..end];
    let len = end + 2;
    if let Some(digits) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
        let value = u32::from_str_radix(digits, 16).ok()?;
        return char::from_u32(value).map(|c| (c, len));
    }
    if let Some(digits) = name.strip_prefix('#') {
        let value = digits.parse::<u32>().ok()?;
        return char::from_u32(value).map(|c| (c, len));
    }
    if name.is_empty() || !name.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return None;
    }
    config.resolve_entity(name).map(|c| (c, len))
}
