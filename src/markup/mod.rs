//! The main markup grammar.
//!
//! Runs over the preprocessed text and produces the document tree. Block
//! flow lives here; inline items, HTML-like elements, and tables are in the
//! sibling modules.
//!
//! Line discipline: blocks never consume their own trailing newline. All
//! line crossing goes through [`line_break`], which consumes the newline
//! plus every `bol_skip` prefix, so indentation-sensitive nesting works the
//! same way everywhere.

pub(crate) mod element;
pub(crate) mod inline;
pub(crate) mod table;

use crate::{
    ast::{Block, HeadingLevel, Inline, ItemKind, List, ListItem, ListKind, TocKind},
    codemap::{Span, Spanned},
    config::Compiled,
    engine::{Engine, EngineDiagnostic, trap::Trap},
};
use std::sync::LazyLock;

/// A line with at least one non-blank character before its end.
static NONBLANK_LINE: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"^[ \t]*[^ \t\r\n]").unwrap());

/// Memoized values of the markup grammar.
#[derive(Clone, Debug)]
pub(crate) enum MarkupCached {
    Inline(Spanned<Inline>),
    Span(Span),
}

pub(crate) type MkEngine<'src> = Engine<'src, MarkupCached>;

/// Runs the main grammar over preprocessed `source`.
pub(crate) fn parse(
    source: &str,
    config: &Compiled,
) -> (Vec<Spanned<Block>>, Vec<EngineDiagnostic>) {
    let mut e = MkEngine::new(source, config);
    let blocks = document(&mut e, false, true);
    debug_assert!(e.eof(), "main grammar stopped early at {}", e.pos);
    debug_assert!(e.stacks.is_balanced(), "side stacks left unbalanced");
    (blocks, e.diagnostics)
}

/// A consumed line boundary.
pub(super) struct LineBreakInfo {
    /// The newline plus all consumed `bol_skip` prefixes.
    pub span: Span,
    /// Just the newline.
    pub newline: Span,
    /// The last character consumed by the topmost `bol_skip` entry (the
    /// innermost list marker of the new line).
    pub marker: Option<char>,
}

/// Crosses a line boundary: a newline followed by every `bol_skip` prefix,
/// bottom to top. Fails without consuming anything if a prefix is missing.
pub(super) fn line_break(e: &mut MkEngine<'_>) -> Option<LineBreakInfo> {
    e.attempt(|e| {
        let start = e.pos;
        if !e.newline() {
            return None;
        }
        let newline = Span::new(start, e.pos);
        if !e.trap(Trap::CheckBolSkip) {
            return None;
        }
        Some(LineBreakInfo {
            span: Span::new(start, e.pos),
            newline,
            marker: e.bol_marker,
        })
    })
}

/// Returns true when the buffer is at a `\r?\n`.
pub(super) fn at_newline(e: &MkEngine<'_>) -> bool {
    matches!(e.buf.byte(e.pos), Some(b'\n'))
        || (e.buf.byte(e.pos) == Some(b'\r') && e.buf.byte(e.pos + 1) == Some(b'\n'))
}

/// Parses a block document: the top level, or the nested content of an
/// HTML-like block element, `<ref>`, or table cell.
///
/// `nested` stops the loop when an `ifnot`/`no` pattern matches at a block
/// boundary; `cut` commits the memo table after each block and is only true
/// at the top level.
pub(super) fn document(e: &mut MkEngine<'_>, nested: bool, cut: bool) -> Vec<Spanned<Block>> {
    let mut blocks: Vec<Spanned<Block>> = Vec::new();
    let mut at_line_start = e.bol();
    let mut after_heading = false;

    'blocks: loop {
        // Cross line boundaries, consuming blank lines.
        let empties_start = e.pos;
        let mut empties = 0_usize;
        while at_newline(e) {
            if line_break(e).is_none() {
                // A bol_skip prefix is missing on the next line, so the
                // enclosing nested context ends here.
                break 'blocks;
            }
            at_line_start = true;
            let blank = e
                .peek(|e| {
                    e.blanks();
                    (at_newline(e) || e.eof()).then_some(())
                })
                .is_some();
            if !blank {
                break;
            }
            e.blanks();
            if at_newline(e) {
                empties += 1;
            }
        }

        if e.eof() {
            // A run of empty lines at the end of input is dropped.
            break;
        }
        if nested && (!e.trap(Trap::CheckIfnot) || !e.trap(Trap::CheckNo)) {
            break;
        }

        if after_heading {
            // Empty lines directly after a heading are consumed silently.
            empties = 0;
        }
        if empties >= 2 {
            let span = Span::new(empties_start, e.pos);
            blocks.push(Spanned {
                node: Block::Paragraph {
                    content: vec![Spanned { node: Inline::LineBreak, span }],
                    leading_break: false,
                    trailing_break: false,
                },
                span,
            });
        }

        let leading_break = empties == 1;
        let before = e.pos;
        let block = match try_block(e, at_line_start) {
            Some(block) => block,
            None => paragraph(e, leading_break),
        };
        after_heading = matches!(block.node, Block::Heading { .. });
        at_line_start = false;
        blocks.push(block);
        if cut {
            e.cut();
        }
        if e.pos == before {
            // The catch-all paragraph always makes progress; this is a
            // backstop against a livelocked grammar bug.
            debug_assert!(false, "no progress at {}", e.pos);
            break;
        }
    }

    blocks
}

/// Tries every block production except the paragraph catch-all, in dispatch
/// order: line-anchored blocks first (table before list, for the `::{|`
/// indent-table idiom), then HTML-like block elements.
pub(super) fn try_block(e: &mut MkEngine<'_>, at_line_start: bool) -> Option<Spanned<Block>> {
    if at_line_start {
        if let Some(block) = heading(e) {
            return Some(block);
        }
        if let Some(block) = hr(e) {
            return Some(block);
        }
        if let Some(block) = table::table(e) {
            return Some(block);
        }
        if let Some(block) = list(e) {
            return Some(block);
        }
        if let Some(block) = toc_marker(e) {
            return Some(block);
        }
        if let Some(block) = indent_pre(e) {
            return Some(block);
        }
    }
    block_element(e)
}

/// An HTML-like element in block position.
fn block_element(e: &mut MkEngine<'_>) -> Option<Spanned<Block>> {
    if e.buf.byte(e.pos) != Some(b'<') {
        return None;
    }
    let checkpoint = e.checkpoint();
    match element::element(e) {
        Some(element::ParsedElement::Block(block)) => Some(block),
        Some(element::ParsedElement::Inline(_)) => {
            e.rewind(checkpoint);
            None
        }
        None => None,
    }
}

////////////////////////
// Line-anchored blocks
////////////////////////

/// A wikitext heading, greedy from level six down.
///
/// ```wikitext
/// == Section ==
/// ```
fn heading(e: &mut MkEngine<'_>) -> Option<Spanned<Block>> {
    if e.buf.byte(e.pos) != Some(b'=') {
        return None;
    }
    let open_run = e.buf.rest(e.pos).bytes().take_while(|b| *b == b'=').count();
    for level in (1..=6_u8).rev() {
        if usize::from(level) > open_run {
            continue;
        }
        if let Some(block) = e.attempt(|e| heading_at(e, level, open_run)) {
            return Some(block);
        }
    }
    None
}

fn heading_at(e: &mut MkEngine<'_>, level: u8, open_run: usize) -> Option<Spanned<Block>> {
    let start = e.pos;
    let marker = &"======"[..usize::from(level)];
    e.literal(marker).then_some(())?;

    e.trap(Trap::PushNoH(level));
    e.trap(Trap::PushNoNl);
    e.blanks();
    let mut content = inline::inline_content(e);
    e.trap(Trap::PopNo);
    e.trap(Trap::PopNo);
    inline::trim_edges(&mut content, e);

    // A heading needs content. Bare `=` runs still decompose at a lower
    // level with the surplus markers as text: `===` is an `=` wrapped in
    // h1, `====` is `==` wrapped in h1, `======` is `==` wrapped in h2.
    if content.is_empty() {
        return None;
    }

    e.literal(marker).then_some(())?;
    e.blanks();
    while let Some(comment) = inline::comment(e) {
        content.push(comment);
        e.blanks();
    }
    if !at_newline(e) && !e.eof() {
        return None;
    }

    if open_run != usize::from(level) {
        e.warn(
            Span::new(start, e.pos),
            format!("heading opened with {open_run} '=' but closed as level {level}"),
        );
    }

    let level = HeadingLevel::try_from(level).ok()?;
    Some(Spanned::new(Block::Heading { level, content }, start, e.pos))
}

/// A horizontal rule: four or more `-`, optionally followed by blanks.
fn hr(e: &mut MkEngine<'_>) -> Option<Spanned<Block>> {
    e.attempt(|e| {
        let start = e.pos;
        e.literal("----").then_some(())?;
        while e.literal("-") {}
        e.blanks();
        Some(Spanned::new(Block::HorizontalRule, start, e.pos))
    })
}

/// A `__TOC__`/`__NOTOC__`/`__FORCETOC__` marker surrounded by blanks on
/// its own line.
fn toc_marker(e: &mut MkEngine<'_>) -> Option<Spanned<Block>> {
    e.attempt(|e| {
        let start = e.pos;
        e.blanks();
        let kind = if e.literal("__TOC__") {
            TocKind::Toc
        } else if e.literal("__NOTOC__") {
            TocKind::NoToc
        } else if e.literal("__FORCETOC__") {
            TocKind::ForceToc
        } else {
            return None;
        };
        e.blanks();
        (at_newline(e) || e.eof()).then_some(())?;
        Some(Spanned::new(Block::TocMarker(kind), start, e.pos))
    })
}

////////////
// Lists  //
////////////

/// An unordered, ordered, or definition list.
///
/// ```wikitext
/// * Unordered
/// # Ordered
/// ; Term : Detail
/// ```
fn list(e: &mut MkEngine<'_>) -> Option<Spanned<Block>> {
    list_at(e).map(|list| {
        let span = list.span;
        Spanned { node: Block::List(list.node), span }
    })
}

/// A list starting at the current position, whose first marker is the
/// character under the cursor. Pushes its continuation marker onto
/// `bol_skip` so deeper lines consume the parent markers first.
fn list_at(e: &mut MkEngine<'_>) -> Option<Spanned<List>> {
    let marker = e.buf.at(e.pos)?;
    let kind = match marker {
        '*' => ListKind::Unordered,
        '#' => ListKind::Ordered,
        ';' | ':' => ListKind::Definition,
        _ => return None,
    };
    e.attempt(|e| {
        let start = e.pos;
        e.any_char();
        e.trap(match kind {
            ListKind::Unordered => Trap::PushBolSkipUl,
            ListKind::Ordered => Trap::PushBolSkipOl,
            ListKind::Definition => Trap::PushBolSkipDl,
        });

        let mut items: Vec<Spanned<ListItem>> = Vec::new();
        item_line(e, marker, &mut items);

        loop {
            // A continuation line carries every parent marker plus ours,
            // consumed by the bol_skip stack.
            let Some(info) = line_break(e) else { break };
            if let Some(next) = e.buf.at(e.pos)
                && "*#;:".contains(next)
            {
                // Deeper markers on the following line: the sublist
                // attaches to the previous item instead of making a new
                // one.
                let Some(sublist) = list_at(e) else { break };
                let last = items.last_mut().expect("list with no items");
                last.span.end = sublist.span.end;
                last.node.sublists.push(sublist);
                continue;
            }
            // A sibling item; its innermost marker was consumed by our
            // bol_skip entry.
            item_line(e, info.marker.unwrap_or(marker), &mut items);
        }

        e.trap(Trap::PopBolSkip);
        Some(Spanned::new(List { kind, items }, start, e.pos))
    })
}

/// The remainder of a list item line, after its innermost marker has been
/// consumed.
fn item_line(e: &mut MkEngine<'_>, marker: char, items: &mut Vec<Spanned<ListItem>>) {
    let start = e.pos;

    // Extra markers on the same line open a nested list inside a content-
    // less container item.
    if let Some(next) = e.buf.at(e.pos)
        && "*#;:".contains(next)
        && let Some(sublist) = list_at(e)
    {
        items.push(Spanned::new(
            ListItem {
                kind: item_kind(marker),
                content: Vec::new(),
                sublists: vec![sublist],
            },
            start,
            e.pos,
        ));
        return;
    }

    if marker == ';' {
        // A term may share its line with a detail via `:`. Only inline
        // content is admitted after the `:`; this is known to be more
        // restrictive than it could be, and is preserved as-is.
        e.trap(Trap::PushNoNl);
        e.trap(Trap::PushIfnotColon);
        e.blanks();
        let mut term = inline::inline_content(e);
        e.trap(Trap::PopIfnot);
        e.trap(Trap::PopNo);
        inline::trim_edges(&mut term, e);
        items.push(Spanned::new(
            ListItem { kind: ItemKind::Term, content: term, sublists: Vec::new() },
            start,
            e.pos,
        ));

        if e.literal(":") {
            let detail_start = e.pos;
            e.trap(Trap::PushNoNl);
            e.blanks();
            let mut detail = inline::inline_content(e);
            e.trap(Trap::PopNo);
            inline::trim_edges(&mut detail, e);
            items.push(Spanned::new(
                ListItem {
                    kind: ItemKind::Definition,
                    content: detail,
                    sublists: Vec::new(),
                },
                detail_start,
                e.pos,
            ));
        }
        return;
    }

    e.trap(Trap::PushNoNl);
    e.blanks();
    let mut content = inline::inline_content(e);
    e.trap(Trap::PopNo);
    inline::trim_edges(&mut content, e);
    items.push(Spanned::new(
        ListItem { kind: item_kind(marker), content, sublists: Vec::new() },
        start,
        e.pos,
    ));
}

/// The item kind decided by a marker character.
fn item_kind(marker: char) -> ItemKind {
    match marker {
        ';' => ItemKind::Term,
        ':' => ItemKind::Definition,
        _ => ItemKind::Item,
    }
}

////////////////
// Indent-pre //
////////////////

/// A preformatted block introduced by a leading space, when indent-pre
/// recognition is enabled. The first line must contain non-blank content;
/// each following line must begin with a single space, consumed via
/// `bol_skip`. An HTML-like block element inside terminates the block.
fn indent_pre(e: &mut MkEngine<'_>) -> Option<Spanned<Block>> {
    if !e.trap(Trap::CheckWspre) {
        return None;
    }
    e.attempt(|e| {
        let start = e.pos;
        e.literal(" ").then_some(())?;
        e.peek(|e| e.regex(&NONBLANK_LINE)).is_some().then_some(())?;
        e.trap(Trap::PushBolSkipWspre);

        let mut content: Vec<Spanned<Inline>> = Vec::new();
        loop {
            let line = inline::inline_content(e);
            inline::append(&mut content, line);
            if !at_newline(e) {
                // EOF, or an HTML-like block element terminating the block.
                break;
            }
            let Some(info) = line_break(e) else { break };
            content.push(Spanned { node: Inline::LineBreak, span: info.newline });
        }

        e.trap(Trap::PopBolSkip);
        Some(Spanned::new(Block::IndentPre { content }, start, e.pos))
    })
}

////////////////
// Paragraphs //
////////////////

/// The paragraph catch-all: any run of inline content, crossing soft line
/// breaks, ended by a blank line, a block production, a nested terminator,
/// or the end of input.
fn paragraph(e: &mut MkEngine<'_>, leading_break: bool) -> Spanned<Block> {
    let start = e.pos;
    let mut content: Vec<Spanned<Inline>> = Vec::new();
    let mut trailing_break = false;

    loop {
        let chunk = inline::inline_content(e);
        inline::append(&mut content, chunk);

        if e.eof() {
            break;
        }
        if at_newline(e) {
            let crossed = e.attempt(|e| {
                let info = line_break(e)?;
                // A blank line ends the paragraph.
                let blank = e
                    .peek(|e| {
                        e.blanks();
                        (at_newline(e) || e.eof()).then_some(())
                    })
                    .is_some();
                if blank {
                    return None;
                }
                // So does any block production or nested terminator.
                if !e.trap(Trap::CheckIfnot) || !e.trap(Trap::CheckNo) {
                    return None;
                }
                if e.peek(|e| try_block(e, true).map(|_| ())).is_some() {
                    return None;
                }
                Some(info)
            });
            match crossed {
                Some(info) => {
                    // The newline itself is ordinary whitespace text.
                    content.push(Spanned { node: Inline::Text, span: info.newline });
                    continue;
                }
                None => break,
            }
        }

        // Stopped mid-line: a nested terminator or an HTML-like block
        // element. The latter cuts this paragraph short.
        if e.buf.byte(e.pos) == Some(b'<')
            && e.peek(|e| block_element(e).map(|_| ())).is_some()
        {
            trailing_break = true;
        }
        break;
    }

    // The catch-all must always make progress.
    if e.pos == start && !e.eof() && !at_newline(e) {
        let char_start = e.pos;
        e.any_char();
        content.push(Spanned::new(Inline::Text, char_start, e.pos));
    }

    Spanned::new(
        Block::Paragraph { content, leading_break, trailing_break },
        start,
        e.pos,
    )
}
