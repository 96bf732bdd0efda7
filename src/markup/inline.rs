//! The inline grammar: plain text, quote formatting, links, entities, and
//! comments.
//!
//! Per the side-stack protocol, `check_ifnots` runs before every generic
//! character consumption, so any pattern pushed by an enclosing context can
//! stop the inline flow at exactly the right position.

use super::{MarkupCached, MkEngine, at_newline};
use crate::{
    ast::{EntityForm, Inline},
    codemap::{Span, Spanned},
    engine::{RuleId, trap::Trap},
};
use std::sync::LazyLock;

/// An apostrophe run that starts bold/italic markup.
static QUOTES: LazyLock<regex::Regex> = LazyLock::new(|| regex::Regex::new("^'{2,}").unwrap());

/// Inline content within a single line: stops at a newline, at any
/// `ifnot`/`no` pattern, or before an HTML-like block element.
pub(super) fn inline_content(e: &mut MkEngine<'_>) -> Vec<Spanned<Inline>> {
    inline_items(e, false)
}

/// Inline content that crosses soft line breaks (piped link text, `<p>`,
/// inline tags). Stops at blank lines and block productions.
pub(super) fn inline_flow(e: &mut MkEngine<'_>) -> Vec<Spanned<Inline>> {
    inline_items(e, true)
}

fn inline_items(e: &mut MkEngine<'_>, cross_newlines: bool) -> Vec<Spanned<Inline>> {
    let mut out: Vec<Spanned<Inline>> = Vec::new();
    loop {
        if e.eof() || !e.trap(Trap::CheckIfnots) {
            break;
        }
        let Some(c) = e.buf.at(e.pos) else { break };

        if c == '\n' || c == '\r' {
            if !cross_newlines || !cross_soft_break(e, &mut out) {
                break;
            }
            continue;
        }

        let parsed = match c {
            '<' => match comment(e) {
                Some(node) => Some(node),
                None => {
                    let checkpoint = e.checkpoint();
                    match super::element::element(e) {
                        Some(super::element::ParsedElement::Inline(node)) => Some(node),
                        Some(super::element::ParsedElement::Block(_)) => {
                            // A block element terminates the inline flow.
                            e.rewind(checkpoint);
                            break;
                        }
                        None => None,
                    }
                }
            },
            '&' => entity(e),
            '[' => internal_link(e).or_else(|| external_link(e)),
            '\'' if e.buf.starts_with(e.pos, "''") => {
                if let Some(nodes) = quote(e) {
                    for node in nodes {
                        push(&mut out, node);
                    }
                    continue;
                }
                None
            }
            _ => None,
        };
        if let Some(node) = parsed {
            push(&mut out, node);
            continue;
        }

        if let Some(node) = plain_link(e) {
            push(&mut out, node);
            continue;
        }

        // The generic character consumption.
        let start = e.pos;
        e.any_char();
        push(&mut out, Spanned::new(Inline::Text, start, e.pos));
    }
    out
}

/// Crosses one soft line break inside flowing inline content. Fails at
/// blank lines, block productions, and nested terminators.
fn cross_soft_break(e: &mut MkEngine<'_>, out: &mut Vec<Spanned<Inline>>) -> bool {
    let crossed = e.attempt(|e| {
        let info = super::line_break(e)?;
        let blank = e
            .peek(|e| {
                e.blanks();
                (at_newline(e) || e.eof()).then_some(())
            })
            .is_some();
        if blank {
            return None;
        }
        if !e.trap(Trap::CheckIfnot) || !e.trap(Trap::CheckNo) {
            return None;
        }
        if e.peek(|e| super::try_block(e, true).map(|_| ())).is_some() {
            return None;
        }
        Some(info)
    });
    match crossed {
        Some(info) => {
            out.push(Spanned { node: Inline::Text, span: info.newline });
            true
        }
        None => false,
    }
}

/// Appends a node, merging contiguous text runs.
pub(super) fn push(out: &mut Vec<Spanned<Inline>>, node: Spanned<Inline>) {
    if let (Some(Spanned { node: Inline::Text, span: last }), Inline::Text) =
        (out.last_mut(), &node.node)
        && last.end == node.span.start
    {
        last.end = node.span.end;
        return;
    }
    out.push(node);
}

/// Appends a whole chunk via [`push`].
pub(super) fn append(out: &mut Vec<Spanned<Inline>>, chunk: Vec<Spanned<Inline>>) {
    for node in chunk {
        push(out, node);
    }
}

/// Trims blanks from the edges of inline content (leading/trailing text
/// spans), dropping text nodes that become empty.
pub(super) fn trim_edges(content: &mut Vec<Spanned<Inline>>, e: &MkEngine<'_>) {
    if let Some(Spanned { node: Inline::Text, span }) = content.first_mut() {
        let text = &e.buf.as_str()[span.into_range()];
        span.start += text.len() - text.trim_start_matches([' ', '\t']).len();
    }
    if matches!(content.first(), Some(Spanned { node: Inline::Text, span }) if span.is_empty()) {
        content.remove(0);
    }
    if let Some(Spanned { node: Inline::Text, span }) = content.last_mut() {
        let text = &e.buf.as_str()[span.into_range()];
        span.end -= text.len() - text.trim_end_matches([' ', '\t']).len();
    }
    if matches!(content.last(), Some(Spanned { node: Inline::Text, span }) if span.is_empty()) {
        content.pop();
    }
}

//////////////
// Comments //
//////////////

/// An HTML comment surviving preprocessing (one that was not alone on its
/// line).
pub(super) fn comment(e: &mut MkEngine<'_>) -> Option<Spanned<Inline>> {
    let cached = e.memoized(RuleId::Comment, |e| {
        let start = e.pos;
        e.literal("<!--").then_some(())?;
        let content_start = e.pos;
        let rest = e.buf.rest(e.pos);
        let (content_end, unclosed) = match memchr::memmem::find(rest.as_bytes(), b"-->") {
            Some(at) => {
                e.pos += at + 3;
                (content_start + at, false)
            }
            None => {
                e.pos = e.buf.len();
                e.warn(Span::new(start, e.pos), "unclosed comment");
                (e.pos, true)
            }
        };
        Some(MarkupCached::Inline(Spanned::new(
            Inline::Comment { content: Span::new(content_start, content_end), unclosed },
            start,
            e.pos,
        )))
    })?;
    let MarkupCached::Inline(node) = cached else {
        unreachable!("Comment cached a non-inline");
    };
    Some(node)
}

//////////////
// Entities //
//////////////

/// An HTML entity: `&name;`, `&#digits;`, or `&#xhex;`. Unresolvable
/// references decay to plain text.
pub(super) fn entity(e: &mut MkEngine<'_>) -> Option<Spanned<Inline>> {
    let cached = e.memoized(RuleId::Entity, |e| {
        let start = e.pos;
        e.literal("&").then_some(())?;
        let (form, value) = if e.literal("#x") || e.literal("#X") {
            let digits = digit_run(e, 16)?;
            (EntityForm::Hex, u32::from_str_radix(digits, 16).ok().and_then(char::from_u32)?)
        } else if e.literal("#") {
            let digits = digit_run(e, 10)?;
            (EntityForm::Decimal, digits.parse::<u32>().ok().and_then(char::from_u32)?)
        } else {
            let name_start = e.pos;
            while matches!(e.buf.byte(e.pos), Some(b) if b.is_ascii_alphanumeric()) {
                e.pos += 1;
            }
            if e.pos == name_start {
                return None;
            }
            let name = &e.buf.as_str()[name_start..e.pos];
            (EntityForm::Named, e.config.resolve_entity(name)?)
        };
        e.literal(";").then_some(())?;
        Some(MarkupCached::Inline(Spanned::new(
            Inline::Entity { form, value },
            start,
            e.pos,
        )))
    })?;
    let MarkupCached::Inline(node) = cached else {
        unreachable!("Entity cached a non-inline");
    };
    Some(node)
}

/// A run of digits in the given radix.
fn digit_run<'s>(e: &mut MkEngine<'s>, radix: u32) -> Option<&'s str> {
    let start = e.pos;
    while matches!(e.buf.at(e.pos), Some(c) if c.is_digit(radix)) {
        e.pos += 1;
    }
    (e.pos > start).then(|| &e.buf.as_str()[start..e.pos])
}

///////////
// Links //
///////////

/// An internal link with optional piped text and link trail.
///
/// ```wikitext
/// [[target|text]]trail
/// ```
fn internal_link(e: &mut MkEngine<'_>) -> Option<Spanned<Inline>> {
    e.attempt(|e| {
        let start = e.pos;
        e.literal("[[").then_some(())?;

        e.trap(Trap::PushIfnotLinkEnd);
        e.trap(Trap::PushIfnotPipe);
        e.trap(Trap::PushNoNl);
        let target = inline_content(e);
        e.trap(Trap::PopNo);
        e.trap(Trap::PopIfnot);
        e.trap(Trap::PopIfnot);
        if target.is_empty() {
            return None;
        }

        let text = if e.literal("|") {
            // The pipe separator disables indent-pre inside the text.
            e.trap(Trap::PushIfnotLinkEnd);
            e.trap(Trap::PushWspreOff);
            let text = inline_flow(e);
            e.trap(Trap::PopWspre);
            e.trap(Trap::PopIfnot);
            Some(text)
        } else {
            None
        };

        e.literal("]]").then_some(())?;
        let trail = link_trail(e);
        Some(Spanned::new(
            Inline::InternalLink { target, text, trail },
            start,
            e.pos,
        ))
    })
}

/// The contiguous run of letters and lone apostrophes after `]]`.
fn link_trail(e: &mut MkEngine<'_>) -> Option<Span> {
    let start = e.pos;
    loop {
        let Some(c) = e.buf.at(e.pos) else { break };
        if c.is_ascii_alphabetic() {
            e.pos += 1;
        } else if c == '\'' && e.buf.byte(e.pos + 1) != Some(b'\'') {
            e.pos += 1;
        } else {
            break;
        }
    }
    (e.pos > start).then(|| Span::new(start, e.pos))
}

/// A bracketed external link.
///
/// ```wikitext
/// [https://example.org text]
/// ```
fn external_link(e: &mut MkEngine<'_>) -> Option<Spanned<Inline>> {
    e.attempt(|e| {
        let start = e.pos;
        e.literal("[").then_some(())?;
        let scheme = e.config.scheme.clone();
        let url_start = e.pos;
        let scheme_span = e.regex(&scheme)?;
        while let Some(c) = e.buf.at(e.pos) {
            if !is_url_char(c) {
                break;
            }
            e.pos += c.len_utf8();
        }
        if e.pos == scheme_span.end {
            return None;
        }
        let url = Span::new(url_start, e.pos);

        e.blanks();
        let text = if e.buf.byte(e.pos) == Some(b']') {
            None
        } else {
            e.trap(Trap::PushIfnotBracket);
            e.trap(Trap::PushNoNl);
            let text = inline_content(e);
            e.trap(Trap::PopNo);
            e.trap(Trap::PopIfnot);
            (!text.is_empty()).then_some(text)
        };

        e.literal("]").then_some(())?;
        Some(Spanned::new(Inline::ExternalLink { url, text }, start, e.pos))
    })
}

/// A bare URL in running text, starting at a word boundary. Trailing
/// punctuation is not absorbed; a closing `)` is absorbed only when a
/// matching `(` appears within the URL.
fn plain_link(e: &mut MkEngine<'_>) -> Option<Spanned<Inline>> {
    let c = e.buf.at(e.pos)?;
    if !c.is_ascii_alphabetic() && c != '/' {
        return None;
    }
    if e.pos > 0
        && matches!(e.buf.byte(e.pos - 1), Some(b) if b.is_ascii_alphanumeric())
    {
        return None;
    }
    e.attempt(|e| {
        let start = e.pos;
        let scheme = e.config.scheme.clone();
        let scheme_span = e.regex(&scheme)?;
        while let Some(c) = e.buf.at(e.pos) {
            if !is_url_char(c) {
                break;
            }
            e.pos += c.len_utf8();
        }
        if e.pos == scheme_span.end {
            return None;
        }

        // Shed trailing punctuation.
        let bytes = e.buf.as_str().as_bytes();
        while e.pos > scheme_span.end {
            let last = bytes[e.pos - 1];
            if matches!(last, b'.' | b',' | b';' | b':' | b'!' | b'?') {
                e.pos -= 1;
            } else if last == b')'
                && !e.buf.as_str()[start..e.pos].contains('(')
            {
                e.pos -= 1;
            } else {
                break;
            }
        }
        if e.pos == scheme_span.end {
            return None;
        }
        Some(Spanned::new(
            Inline::PlainLink { url: Span::new(start, e.pos) },
            start,
            e.pos,
        ))
    })
}

/// Characters that can appear in a URL.
fn is_url_char(c: char) -> bool {
    !c.is_whitespace() && !matches!(c, '<' | '>' | '[' | ']' | '"' | '{' | '}' | '|' | '\\' | '^')
}

////////////
// Quotes //
////////////

/// An apostrophe run opening bold/italic markup.
///
/// Runs of four or more than five apostrophes begin with plain-text
/// apostrophes, peeled off so exactly three or five remain as markers.
fn quote(e: &mut MkEngine<'_>) -> Option<Vec<Spanned<Inline>>> {
    let run = e.regex(&QUOTES)?;
    let mut out = Vec::new();
    let (markers, lead) = match run.len() {
        4 => (3, 1),
        n if n > 5 => (5, n - 5),
        n => (n, 0),
    };
    if lead > 0 {
        out.push(Spanned::new(Inline::Text, run.start, run.start + lead));
    }
    let mark_start = run.start + lead;
    let node = match markers {
        2 => styled(e, mark_start, "''", Trap::PushNoItalic, Inline::Italic),
        3 => styled(e, mark_start, "'''", Trap::PushNoBold, Inline::Bold),
        _ => five_quotes(e, mark_start),
    };
    out.push(node);
    Some(out)
}

/// Bold or italic content up to the closing marker, a newline, or any
/// enclosing terminator. An apostrophe run that would re-enter the same
/// level stops the content instead; a missing closer closes the style
/// anyway.
fn styled(
    e: &mut MkEngine<'_>,
    start: usize,
    marker: &str,
    no: Trap,
    wrap: fn(Vec<Spanned<Inline>>) -> Inline,
) -> Spanned<Inline> {
    e.trap(no);
    let content = inline_content(e);
    e.trap(Trap::PopNo);
    close_quote(e, marker);
    Spanned::new(wrap(content), start, e.pos)
}

/// Consumes a closing marker, refusing to bite into a longer run.
fn close_quote(e: &mut MkEngine<'_>, marker: &str) -> bool {
    e.attempt(|e| {
        e.literal(marker).then_some(())?;
        e.not(|e| e.literal("'").then_some(())).then_some(())
    })
    .is_some()
}

/// A run of exactly five apostrophes: bold-then-italic, italic-then-bold,
/// or an inseparable bold italic, tried in that order.
fn five_quotes(e: &mut MkEngine<'_>, start: usize) -> Spanned<Inline> {
    // Bold wrapping italic: both closers must be present.
    if let Some(node) = e.attempt(|e| {
        e.trap(Trap::PushNoBold);
        e.trap(Trap::PushNoItalic);
        let inner_start = start + 3;
        let first = inline_content(e);
        e.trap(Trap::PopNo);
        if !close_quote(e, "''") {
            return None;
        }
        let inner = Spanned::new(Inline::Italic(first), inner_start, e.pos);
        let mut content = vec![inner];
        append(&mut content, inline_content(e));
        e.trap(Trap::PopNo);
        if !close_quote(e, "'''") {
            return None;
        }
        Some(Spanned::new(Inline::Bold(content), start, e.pos))
    }) {
        return node;
    }

    // Italic wrapping bold.
    if let Some(node) = e.attempt(|e| {
        e.trap(Trap::PushNoItalic);
        e.trap(Trap::PushNoBold);
        let inner_start = start + 2;
        let first = inline_content(e);
        e.trap(Trap::PopNo);
        if !close_quote(e, "'''") {
            return None;
        }
        let inner = Spanned::new(Inline::Bold(first), inner_start, e.pos);
        let mut content = vec![inner];
        append(&mut content, inline_content(e));
        e.trap(Trap::PopNo);
        if !close_quote(e, "''") {
            return None;
        }
        Some(Spanned::new(Inline::Italic(content), start, e.pos))
    }) {
        return node;
    }

    // Inseparable: close on a full five-run or fall back to the line end.
    e.trap(Trap::PushNoBold);
    let content = inline_content(e);
    e.trap(Trap::PopNo);
    close_quote(e, "'''''");
    Spanned::new(Inline::BoldItalic(content), start, e.pos)
}
