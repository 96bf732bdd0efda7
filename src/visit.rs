//! A depth-first visitor over the document tree.

use crate::{
    ast::{Block, CellContent, ElementContent, Inline, List},
    codemap::{Span, Spanned},
};
use core::fmt;

/// Tree visitor. Every hook has a default empty implementation; the `walk_*`
/// functions drive the traversal.
pub trait Visitor {
    /// A run of plain text.
    fn visit_text(&mut self, span: Span) {
        let _ = span;
    }
    /// A decoded entity.
    fn visit_entity(&mut self, span: Span, value: char) {
        let _ = (span, value);
    }
    /// Verbatim nowiki content.
    fn visit_nowiki(&mut self, content: Span) {
        let _ = content;
    }
    /// A comment.
    fn visit_comment(&mut self, content: Span) {
        let _ = content;
    }
    /// A line break inside preformatted flow.
    fn visit_line_break(&mut self, span: Span) {
        let _ = span;
    }
    /// Called before a block's children.
    fn enter_block(&mut self, block: &Spanned<Block>) {
        let _ = block;
    }
    /// Called before an inline node's children.
    fn enter_inline(&mut self, inline: &Spanned<Inline>) {
        let _ = inline;
    }
}

/// Walks a block list depth-first.
pub fn walk_blocks<V: Visitor>(visitor: &mut V, blocks: &[Spanned<Block>]) {
    for block in blocks {
        walk_block(visitor, block);
    }
}

/// Walks one block depth-first.
pub fn walk_block<V: Visitor>(visitor: &mut V, block: &Spanned<Block>) {
    visitor.enter_block(block);
    match &block.node {
        Block::Heading { content, .. }
        | Block::IndentPre { content }
        | Block::Paragraph { content, .. } => walk_inlines(visitor, content),
        Block::List(list) => walk_list(visitor, list),
        Block::Table(table) => {
            if let Some(caption) = &table.caption {
                walk_cell_content(visitor, &caption.node.content);
            }
            for row in &table.rows {
                for cell in &row.node.cells {
                    walk_cell_content(visitor, &cell.node.content);
                }
            }
        }
        Block::Html(el) => walk_element_content(visitor, &el.content),
        Block::HorizontalRule | Block::TocMarker(_) => {}
    }
}

fn walk_list<V: Visitor>(visitor: &mut V, list: &List) {
    for item in &list.items {
        walk_inlines(visitor, &item.node.content);
        for sublist in &item.node.sublists {
            walk_list(visitor, &sublist.node);
        }
    }
}

fn walk_cell_content<V: Visitor>(visitor: &mut V, content: &CellContent) {
    match content {
        CellContent::Inline(inline) => walk_inlines(visitor, inline),
        CellContent::Blocks(blocks) => walk_blocks(visitor, blocks),
    }
}

fn walk_element_content<V: Visitor>(visitor: &mut V, content: &ElementContent) {
    match content {
        ElementContent::None => {}
        ElementContent::Inline(inline) => walk_inlines(visitor, inline),
        ElementContent::Blocks(blocks) => walk_blocks(visitor, blocks),
    }
}

/// Walks an inline list depth-first.
pub fn walk_inlines<V: Visitor>(visitor: &mut V, content: &[Spanned<Inline>]) {
    for node in content {
        visitor.enter_inline(node);
        match &node.node {
            Inline::Text => visitor.visit_text(node.span),
            Inline::Entity { value, .. } => visitor.visit_entity(node.span, *value),
            Inline::Nowiki { content } => visitor.visit_nowiki(*content),
            Inline::Comment { content, .. } => visitor.visit_comment(*content),
            Inline::LineBreak => visitor.visit_line_break(node.span),
            Inline::Bold(inner) | Inline::Italic(inner) | Inline::BoldItalic(inner) => {
                walk_inlines(visitor, inner);
            }
            Inline::InternalLink { target, text, .. } => {
                walk_inlines(visitor, text.as_deref().unwrap_or(target.as_slice()));
            }
            Inline::ExternalLink { url, text } => match text {
                Some(text) => walk_inlines(visitor, text),
                None => visitor.visit_text(*url),
            },
            Inline::PlainLink { url } => visitor.visit_text(*url),
            Inline::Html(el) => walk_element_content(visitor, &el.content),
            Inline::Ref { content, .. } => walk_blocks(visitor, content),
        }
    }
}

/// Extracts all text content from a tree.
pub struct TextContent<'src, W> {
    /// The accumulated text.
    content: W,
    /// The parsed source the spans index into.
    source: &'src str,
}

impl<'src, W: fmt::Write> TextContent<'src, W> {
    /// Creates a new extractor over `source` writing into `content`.
    pub fn new(source: &'src str, content: W) -> Self {
        Self { content, source }
    }

    /// Returns the accumulated text, consuming the extractor.
    pub fn finish(self) -> W {
        self.content
    }
}

impl<W: fmt::Write> Visitor for TextContent<'_, W> {
    fn visit_text(&mut self, span: Span) {
        let _ = self.content.write_str(&self.source[span.into_range()]);
    }
    fn visit_entity(&mut self, _span: Span, value: char) {
        let _ = self.content.write_char(value);
    }
    fn visit_nowiki(&mut self, content: Span) {
        let _ = self.content.write_str(&self.source[content.into_range()]);
    }
    fn visit_line_break(&mut self, _span: Span) {
        let _ = self.content.write_char('\n');
    }
}
