use crate::{
    Document,
    ast::{
        Attribute, Block, CellContent, ElementContent, HtmlElement, Inline, ItemKind, List,
        ListKind, Table, TocKind,
    },
    codemap::Spanned,
};

mod preprocess;
mod properties;
mod scenarios;

#[track_caller]
fn parse(input: &str) -> Document {
    let _ = env_logger::try_init();
    crate::parse(input)
}

/// Asserts that the top-level blocks tile the preprocessed source: ordered,
/// non-overlapping, with nothing but whitespace between them.
#[track_caller]
fn assert_coverage(doc: &Document) {
    let mut pos = 0;
    for block in &doc.blocks {
        assert!(
            block.span.start >= pos,
            "block at {} overlaps previous end {pos}",
            block.span.start
        );
        let gap = &doc.source[pos..block.span.start];
        assert!(
            gap.chars().all(char::is_whitespace),
            "non-whitespace gap between blocks: {gap:?}"
        );
        assert!(block.span.end >= block.span.start);
        pos = block.span.end;
    }
    let tail = &doc.source[pos..];
    assert!(
        tail.chars().all(char::is_whitespace),
        "non-whitespace tail after last block: {tail:?}"
    );
}

/// Renders the tree into a compact shape string for exact assertions,
/// ignoring spans of structural nodes but including the text of leaves.
fn shape(doc: &Document) -> String {
    blocks_shape(&doc.source, &doc.blocks)
}

fn blocks_shape(src: &str, blocks: &[Spanned<Block>]) -> String {
    blocks
        .iter()
        .map(|block| block_shape(src, block))
        .collect::<Vec<_>>()
        .join(" ")
}

fn block_shape(src: &str, block: &Spanned<Block>) -> String {
    match &block.node {
        Block::Heading { level, content } => {
            format!("h{}[{}]", level.get(), inlines_shape(src, content))
        }
        Block::HorizontalRule => "hr".to_string(),
        Block::TocMarker(kind) => match kind {
            TocKind::Toc => "toc",
            TocKind::NoToc => "notoc",
            TocKind::ForceToc => "forcetoc",
        }
        .to_string(),
        Block::Paragraph { content, leading_break, trailing_break } => {
            let mut tag = String::from("p");
            if *leading_break {
                tag.push('+');
            }
            if *trailing_break {
                tag.push('-');
            }
            format!("{tag}[{}]", inlines_shape(src, content))
        }
        Block::List(list) => list_shape(src, list),
        Block::IndentPre { content } => format!("pre[{}]", inlines_shape(src, content)),
        Block::Table(table) => table_shape(src, table),
        Block::Html(el) => html_shape(src, el),
    }
}

fn list_shape(src: &str, list: &List) -> String {
    let kind = match list.kind {
        ListKind::Unordered => "ul",
        ListKind::Ordered => "ol",
        ListKind::Definition => "dl",
    };
    let items = list
        .items
        .iter()
        .map(|item| {
            let tag = match item.node.kind {
                ItemKind::Item => "li",
                ItemKind::Term => "dt",
                ItemKind::Definition => "dd",
            };
            let mut out = format!("{tag}[{}]", inlines_shape(src, &item.node.content));
            if !item.node.sublists.is_empty() {
                let subs = item
                    .node
                    .sublists
                    .iter()
                    .map(|sub| list_shape(src, &sub.node))
                    .collect::<Vec<_>>()
                    .join(" ");
                out.push('{');
                out.push_str(&subs);
                out.push('}');
            }
            out
        })
        .collect::<Vec<_>>()
        .join(" ");
    format!("{kind}[{items}]")
}

fn table_shape(src: &str, table: &Table) -> String {
    let mut out = String::from("table");
    if table.indent > 0 {
        out.push_str(&format!("@{}", table.indent));
    }
    out.push_str(&attrs_shape(&table.attrs));
    out.push('[');
    let mut parts = Vec::new();
    if let Some(caption) = &table.caption {
        parts.push(format!(
            "caption{}[{}]",
            attrs_shape(&caption.node.attrs),
            cell_content_shape(src, &caption.node.content),
        ));
    }
    for row in &table.rows {
        let cells = row
            .node
            .cells
            .iter()
            .map(|cell| {
                let tag = match cell.node.kind {
                    crate::ast::CellKind::Data => "td",
                    crate::ast::CellKind::Header => "th",
                };
                format!(
                    "{tag}{}[{}]",
                    attrs_shape(&cell.node.attrs),
                    cell_content_shape(src, &cell.node.content),
                )
            })
            .collect::<Vec<_>>()
            .join(" ");
        parts.push(format!("tr{}[{cells}]", attrs_shape(&row.node.attrs)));
    }
    out.push_str(&parts.join(" "));
    out.push(']');
    out
}

fn cell_content_shape(src: &str, content: &CellContent) -> String {
    match content {
        CellContent::Inline(inline) => inlines_shape(src, inline),
        CellContent::Blocks(blocks) => format!("({})", blocks_shape(src, blocks)),
    }
}

fn attrs_shape(attrs: &[Attribute]) -> String {
    if attrs.is_empty() {
        return String::new();
    }
    let inner = attrs
        .iter()
        .map(|attr| match &attr.value {
            Some(value) => format!("{}={value:?}", attr.name),
            None => attr.name.clone(),
        })
        .collect::<Vec<_>>()
        .join(" ");
    format!("{{{inner}}}")
}

fn html_shape(src: &str, el: &HtmlElement) -> String {
    let name = &src[el.name.into_range()];
    match &el.content {
        ElementContent::None => format!("<{name}{}/>", attrs_shape(&el.attrs)),
        ElementContent::Inline(inline) => {
            format!("<{name}{}>[{}]", attrs_shape(&el.attrs), inlines_shape(src, inline))
        }
        ElementContent::Blocks(blocks) => {
            format!("<{name}{}>[{}]", attrs_shape(&el.attrs), blocks_shape(src, blocks))
        }
    }
}

fn inlines_shape(src: &str, content: &[Spanned<Inline>]) -> String {
    content
        .iter()
        .map(|node| inline_shape(src, node))
        .collect::<Vec<_>>()
        .join(" ")
}

fn inline_shape(src: &str, node: &Spanned<Inline>) -> String {
    match &node.node {
        Inline::Text => format!("{:?}", &src[node.span.into_range()]),
        Inline::Bold(inner) => format!("b[{}]", inlines_shape(src, inner)),
        Inline::Italic(inner) => format!("i[{}]", inlines_shape(src, inner)),
        Inline::BoldItalic(inner) => format!("bi[{}]", inlines_shape(src, inner)),
        Inline::InternalLink { target, text, trail } => {
            let text = text
                .as_ref()
                .map(|text| format!("|{}", inlines_shape(src, text)))
                .unwrap_or_default();
            let trail = trail
                .map(|trail| format!("~{:?}", &src[trail.into_range()]))
                .unwrap_or_default();
            format!("[[{}{text}]]{trail}", inlines_shape(src, target))
        }
        Inline::ExternalLink { url, text } => {
            let text = text
                .as_ref()
                .map(|text| format!(" {}", inlines_shape(src, text)))
                .unwrap_or_default();
            format!("[{:?}{text}]", &src[url.into_range()])
        }
        Inline::PlainLink { url } => format!("url({:?})", &src[url.into_range()]),
        Inline::Entity { value, .. } => format!("ent({value:?})"),
        Inline::Nowiki { content } => format!("nowiki({:?})", &src[content.into_range()]),
        Inline::Comment { content, .. } => format!("cmt({:?})", &src[content.into_range()]),
        Inline::Html(el) => html_shape(src, el),
        Inline::Ref { attrs, content } => {
            format!("ref{}({})", attrs_shape(attrs), blocks_shape(src, content))
        }
        Inline::LineBreak => "br".to_string(),
    }
}

macro_rules! run_smoke_tests {
    ($($name:ident => $input:expr),* $(,)?) => {
        $(#[test]
        fn $name() {
            let doc = parse($input);
            assert_coverage(&doc);
        })*
    }
}

// Inputs that once misbehaved or that cover awkward corners; these only
// assert that the parse terminates with sane spans.
run_smoke_tests! {
    empty => "",
    only_newlines => "\n\n\n",
    lone_markers => "* \n# \n; \n: \n",
    list_restart => "* a\n* b\nno more list\n* c\n\n",
    list_deep => "*#* like this\n*#*; definitions\n*#*: work\n",
    definition_mix => "; item 1 : definition\n:; sub-item : detail\n; item 2\n: back\n",
    heading_junk => "==\n=\n= x\n==== y ==\n",
    table_partial => "{| class=\"wikitable\"\n| Orange\n| Apple\n|-",
    table_multi_attr => "{| a\n| b=c | d || style=\"x\" | e\n|}",
    table_in_list => "::{| hello\n|good || bye\n|}\n",
    stray_close_tags => "a</div>b</em>c\n",
    stray_brackets => "[[ ]] ] [ {{ }} {{{ }}}\n",
    quotes_torture => "''a'''b''''c'''''d''''''e\n",
    unclosed_everything => "<div><em>''[[a|b\n",
    urls => "https://mediawiki.org.\n(https://example.org)\nhttp://\n",
    template_soup => "{{a | b = http://www.example.com/ | c = {{d|e}}}}\n",
    pre_with_nowiki => "<pre>a<nowiki>b</pre>c</nowiki>d</pre>\n",
    comment_everywhere => "<!-- a -->b<!-- c\n",
    include_tags => "<noinclude>hello</noinclude><onlyinclude>hi</onlyinclude><includeonly>x</includeonly>\n",
}
