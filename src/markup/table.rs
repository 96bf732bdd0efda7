//! The wikitext table grammar.
//!
//! ```wikitext
//! {| class="wikitable"
//! |+ Caption
//! |-
//! ! H1 !! H2
//! |-
//! | a || b
//! |}
//! ```

use super::{MkEngine, at_newline, element, element::AttrContext, inline};
use crate::{
    ast::{Attribute, Block, CellContent, CellKind, Table, TableCaption, TableCell, TableRow},
    codemap::{Span, Spanned},
    engine::trap::Trap,
};

/// A `{| … |}` table on its own line, optionally indented with `:`
/// characters (the indent is preserved on the node).
pub(super) fn table(e: &mut MkEngine<'_>) -> Option<Spanned<Block>> {
    e.attempt(|e| {
        let start = e.pos;
        let mut indent = 0_usize;
        while e.literal(":") {
            indent += 1;
        }
        if indent > 0 {
            e.blanks();
        }
        e.literal("{|").then_some(())?;
        let attrs = element::attributes(e, AttrContext::Line);
        to_line_end(e);

        let mut caption: Option<Spanned<TableCaption>> = None;
        let mut rows: Vec<Spanned<TableRow>> = Vec::new();
        loop {
            if e.eof() {
                e.warn(Span::new(start, e.pos), "unclosed table");
                break;
            }
            if at_newline(e) {
                e.newline();
                continue;
            }
            let line_start = e.pos;
            e.blanks();
            if e.literal("|}") {
                break;
            }
            if e.literal("|-") {
                while e.literal("-") {}
                let row_attrs = element::attributes(e, AttrContext::Line);
                to_line_end(e);
                rows.push(Spanned::new(
                    TableRow { attrs: row_attrs, cells: Vec::new() },
                    line_start,
                    e.pos,
                ));
                continue;
            }
            if e.literal("|+") {
                let parsed = caption_line(e);
                if caption.is_none() {
                    caption = Some(parsed);
                }
                continue;
            }
            if matches!(e.buf.byte(e.pos), Some(b'|' | b'!')) {
                cell_line(e, &mut rows, line_start);
                continue;
            }

            // Content between rows that belongs to no cell. MediaWiki
            // fosters it out of the table with bizarre whitespace rules;
            // here it is parsed and dropped.
            e.pos = line_start;
            e.trap(Trap::PushNoTableLine);
            let dropped = super::document(e, true, false);
            e.trap(Trap::PopNo);
            if !dropped.is_empty() {
                log::debug!("dropped {} fostered block(s) in table", dropped.len());
            }
            if e.pos == line_start {
                e.pos += e.buf.at(e.pos).map_or(1, char::len_utf8);
            }
        }

        e.blanks();
        Some(Spanned::new(
            Block::Table(Table { indent, attrs, caption, rows }),
            start,
            e.pos,
        ))
    })
}

/// Consumes the remainder of the current line.
fn to_line_end(e: &mut MkEngine<'_>) {
    while !e.eof() && !at_newline(e) {
        e.pos += e.buf.at(e.pos).map_or(1, char::len_utf8);
    }
}

/// A `|+` caption, after its marker has been consumed.
fn caption_line(e: &mut MkEngine<'_>) -> Spanned<TableCaption> {
    let start = e.pos;
    let attrs = cell_attrs(e);
    e.blanks();
    let content = cell_body(e, Sep::None);
    Spanned::new(TableCaption { attrs, content }, start, e.pos)
}

/// A line of one or more cells, starting at its `|` or `!` marker.
fn cell_line(e: &mut MkEngine<'_>, rows: &mut Vec<Spanned<TableRow>>, line_start: usize) {
    if rows.is_empty() {
        // The first row's `|-` is optional.
        rows.push(Spanned::new(
            TableRow { attrs: Vec::new(), cells: Vec::new() },
            line_start,
            line_start,
        ));
    }
    let header_line = e.buf.byte(e.pos) == Some(b'!');
    e.pos += 1;
    let mut kind = if header_line { CellKind::Header } else { CellKind::Data };

    loop {
        let cell = cell(e, kind, header_line);
        let row = rows.last_mut().expect("cell line with no row");
        row.span.end = cell.span.end;
        row.node.cells.push(cell);

        // After `!`, `||` is a synonym for `!!`.
        if header_line && (e.literal("!!") || e.literal("||")) {
            kind = CellKind::Header;
            continue;
        }
        if !header_line && e.literal("||") {
            kind = CellKind::Data;
            continue;
        }
        break;
    }
}

/// One table cell, after its marker (or separator) has been consumed.
fn cell(e: &mut MkEngine<'_>, kind: CellKind, header_line: bool) -> Spanned<TableCell> {
    let start = e.pos;
    let attrs = cell_attrs(e);
    e.blanks();
    let content = cell_body(e, if header_line { Sep::Header } else { Sep::Data });
    Spanned::new(TableCell { kind, attrs, content }, start, e.pos)
}

/// Cell attributes: everything before a single `|` that is not a `||`
/// separator. Rewound entirely when no such delimiter exists on the line.
fn cell_attrs(e: &mut MkEngine<'_>) -> Vec<Attribute> {
    e.attempt(|e| {
        let attrs = element::attributes(e, AttrContext::Cell);
        e.literal("|").then_some(())?;
        if e.buf.byte(e.pos) == Some(b'|') {
            return None;
        }
        Some(attrs)
    })
    .unwrap_or_default()
}

/// The separators that end an inline cell.
#[derive(Clone, Copy, Eq, PartialEq)]
enum Sep {
    /// A caption: no same-line separator.
    None,
    /// A data cell line: `||`.
    Data,
    /// A header cell line: `!!` or `||`.
    Header,
}

/// Cell or caption content.
///
/// Inline content ends at the line's next separator or at the newline when
/// the following line is a table line. Otherwise the terminal cell extends
/// into block mode: a nested document parsed until a table content line,
/// kept from swallowing later cells by the `no` table-line pattern.
fn cell_body(e: &mut MkEngine<'_>, sep: Sep) -> CellContent {
    let checkpoint = e.checkpoint();

    match sep {
        Sep::Data => {
            e.trap(Trap::PushIfnotPipePipe);
        }
        Sep::Header => {
            e.trap(Trap::PushIfnotHeaderSep);
        }
        Sep::None => {}
    }
    e.trap(Trap::PushNoNl);
    let mut content = inline::inline_content(e);
    e.trap(Trap::PopNo);
    if sep != Sep::None {
        e.trap(Trap::PopIfnot);
    }

    let at_sep = match sep {
        Sep::Data => e.buf.starts_with(e.pos, "||"),
        Sep::Header => e.buf.starts_with(e.pos, "!!") || e.buf.starts_with(e.pos, "||"),
        Sep::None => false,
    };
    if at_sep || e.eof() || !at_newline(e) {
        inline::trim_edges(&mut content, e);
        return CellContent::Inline(content);
    }

    let table_line_next = e
        .peek(|e| {
            e.newline().then_some(())?;
            e.blanks();
            matches!(e.buf.byte(e.pos), Some(b'|' | b'!')).then_some(())
        })
        .is_some();
    if table_line_next {
        inline::trim_edges(&mut content, e);
        return CellContent::Inline(content);
    }

    // Terminal cell with block content.
    e.rewind(checkpoint);
    e.trap(Trap::PushNoTableLine);
    let blocks = super::document(e, true, false);
    e.trap(Trap::PopNo);
    CellContent::Blocks(blocks)
}
