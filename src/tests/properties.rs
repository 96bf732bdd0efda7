//! Grammar-wide invariants, checked over generated pseudo-wikitext.

use super::assert_coverage;
use crate::{
    Options,
    ast::{Block, CellContent, ElementContent},
    codemap::Spanned,
};
use proptest::prelude::*;

/// Builds strings by gluing together tokens that exercise every grammar
/// corner: markers, quotes, brackets, tags, and plain words.
fn wiki_text() -> impl Strategy<Value = String> {
    let token = prop::sample::select(vec![
        "a", "b c", "\n", " ", "\t", "*", "#", ";", ":", "'", "''", "'''",
        "=", "==", "======", "[", "]", "[[", "]]", "{{", "}}", "{{{", "}}}",
        "{|", "|}", "|", "|-", "|+", "!", "!!", "||", "----", "__TOC__",
        "<!--", "-->", "<div>", "</div>", "<blockquote>", "</blockquote>",
        "<ref>", "</ref>", "<nowiki>", "</nowiki>", "<em>", "</em>",
        "<pre>", "</pre>", "<br>", "<span x=1>", "&amp;", "&#65;", "&#x42;",
        "&bogus;", "https://e.org/x", "mailto:a@b", "<noinclude>",
        "</noinclude>", "<onlyinclude>", "<includeonly>",
    ]);
    prop::collection::vec(token, 0..24).prop_map(|tokens| tokens.concat())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(96))]

    /// Every input terminates, and the blocks tile the preprocessed source
    /// with nothing but whitespace between them.
    #[test]
    fn parse_terminates_and_covers(input in wiki_text()) {
        let doc = crate::parse(&input);
        assert_coverage(&doc);
    }

    /// Memoization never changes the tree, only the complexity.
    #[test]
    fn memoization_is_transparent(input in wiki_text()) {
        let on = crate::parse(&input);
        let off = crate::parse_with(
            &input,
            &Options { memoization: false, ..Options::default() },
        )
        .unwrap();
        prop_assert_eq!(on.blocks, off.blocks);
    }

    /// Cut purges are a space optimization, never a semantic change.
    #[test]
    fn cut_is_transparent(input in wiki_text()) {
        let purged = crate::parse(&input);
        let mut config = Options::default().compile().unwrap();
        config.purge_on_cut = false;
        let unpurged = crate::parse_compiled(&input, &config);
        prop_assert_eq!(purged.blocks, unpurged.blocks);
    }

    /// Every heading consumed exactly `level` markers on each side.
    #[test]
    fn heading_levels_match_markers(input in wiki_text()) {
        let doc = crate::parse(&input);
        let mut headings = Vec::new();
        collect_headings(&doc.blocks, &mut headings);
        for (level, span) in headings {
            let text = &doc.source[span.into_range()];
            let run = "=".repeat(usize::from(level));
            prop_assert!(
                text.starts_with(&run),
                "level-{level} heading does not open with {run}: {text:?}"
            );
            prop_assert!(
                text.trim_end().ends_with(&run) || text.contains("-->"),
                "level-{level} heading does not close with {run}: {text:?}"
            );
        }
    }

    /// Preprocessing with expansion disabled on a comment-free document is
    /// the identity, so the markup pass sees exactly what was written.
    #[test]
    fn expansion_without_comments_is_identity(input in wiki_text()) {
        prop_assume!(!input.contains("<!--"));
        prop_assume!(!input.contains("clude>"));
        let pre = crate::preprocess(&input, &Options::default()).unwrap();
        prop_assert_eq!(pre.expand(false), input);
    }

    /// The preprocessed text round-trips: parsing it again yields the same
    /// tree (expansion is idempotent, and the markup pass deterministic).
    #[test]
    fn reparse_is_idempotent(input in wiki_text()) {
        let doc = crate::parse(&input);
        let again = crate::parse(&doc.source);
        prop_assert_eq!(&doc.source, &again.source);
        prop_assert_eq!(doc.blocks, again.blocks);
    }
}

fn collect_headings(blocks: &[Spanned<Block>], out: &mut Vec<(u8, crate::Span)>) {
    for block in blocks {
        match &block.node {
            Block::Heading { level, .. } => out.push((level.get(), block.span)),
            Block::Html(el) => {
                if let ElementContent::Blocks(blocks) = &el.content {
                    collect_headings(blocks, out);
                }
            }
            Block::Table(table) => {
                if let Some(caption) = &table.caption
                    && let CellContent::Blocks(blocks) = &caption.node.content
                {
                    collect_headings(blocks, out);
                }
                for row in &table.rows {
                    for cell in &row.node.cells {
                        if let CellContent::Blocks(blocks) = &cell.node.content {
                            collect_headings(blocks, out);
                        }
                    }
                }
            }
            _ => {}
        }
    }
}
