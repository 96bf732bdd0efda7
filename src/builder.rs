//! Post-processing of the parsed tree.
//!
//! Entities are already materialized during parsing (unresolvable
//! references decay to text there), and list nesting is already collapsed
//! by construction: an item whose line carried extra markers holds its
//! deeper list in `sublists` with no content of its own. What remains here
//! is the table-cell flattening rule, applied uniformly to captions, data
//! cells, and header cells.

use crate::{
    ast::{Block, CellContent, ElementContent, Inline, List},
    codemap::Spanned,
};

/// Runs all post-processing passes over the document tree.
pub(crate) fn postprocess(blocks: &mut [Spanned<Block>]) {
    for block in blocks {
        visit_block(block);
    }
}

fn visit_block(block: &mut Spanned<Block>) {
    match &mut block.node {
        Block::Table(table) => {
            if let Some(caption) = &mut table.caption {
                flatten_cell(&mut caption.node.content);
            }
            for row in &mut table.rows {
                for cell in &mut row.node.cells {
                    flatten_cell(&mut cell.node.content);
                }
            }
        }
        Block::List(list) => visit_list(list),
        Block::Html(el) => match &mut el.content {
            ElementContent::Blocks(blocks) => postprocess(blocks),
            ElementContent::Inline(content) => visit_inlines(content),
            ElementContent::None => {}
        },
        Block::Heading { content, .. }
        | Block::IndentPre { content }
        | Block::Paragraph { content, .. } => visit_inlines(content),
        Block::HorizontalRule | Block::TocMarker(_) => {}
    }
}

fn visit_list(list: &mut List) {
    for item in &mut list.items {
        visit_inlines(&mut item.node.content);
        for sublist in &mut item.node.sublists {
            visit_list(&mut sublist.node);
        }
    }
}

fn visit_inlines(content: &mut [Spanned<Inline>]) {
    for node in content {
        match &mut node.node {
            Inline::Bold(inner) | Inline::Italic(inner) | Inline::BoldItalic(inner) => {
                visit_inlines(inner);
            }
            Inline::InternalLink { target, text, .. } => {
                visit_inlines(target);
                if let Some(text) = text {
                    visit_inlines(text);
                }
            }
            Inline::ExternalLink { text, .. } => {
                if let Some(text) = text {
                    visit_inlines(text);
                }
            }
            Inline::Html(el) => match &mut el.content {
                ElementContent::Blocks(blocks) => postprocess(blocks),
                ElementContent::Inline(inner) => visit_inlines(inner),
                ElementContent::None => {}
            },
            Inline::Ref { content, .. } => postprocess(content),
            _ => {}
        }
    }
}

/// Flattens cell content whose body is a single paragraph-like block into
/// inline content.
fn flatten_cell(content: &mut CellContent) {
    if let CellContent::Blocks(blocks) = content {
        postprocess(blocks);
        if blocks.len() == 1
            && matches!(
                &blocks[0].node,
                Block::Paragraph { leading_break: false, trailing_break: false, .. }
            )
        {
            let Some(Spanned {
                node: Block::Paragraph { content: inline, .. },
                ..
            }) = blocks.pop()
            else {
                unreachable!();
            };
            *content = CellContent::Inline(inline);
        }
    }
}
