//! End-to-end scenarios pinning exact tree shapes.

use super::{assert_coverage, parse, shape};

macro_rules! assert_tree_tests {
    ($($name:ident: $input:expr => $expected:expr),* $(,)?) => {
        $(#[test]
        fn $name() {
            let doc = parse($input);
            assert_eq!(shape(&doc), $expected, "input: {:?}", $input);
            assert_coverage(&doc);
        })*
    }
}

assert_tree_tests! {
    heading_simple: "== Hello ==\n" => r#"h2["Hello"]"#,
    heading_extra_markers: "===x==\n" => r#"h2["=x"]"#,
    bare_equals_pair: "==\n" => r#"p["=="]"#,
    bare_equals_run_4: "====\n" => r#"h1["=="]"#,
    bare_equals_run_6: "======\n" => r#"h2["=="]"#,
    heading_with_comment: "== h == <!-- c -->\n" => r#"h2["h" cmt(" c ")]"#,
    heading_with_link: "== [[a]] ==\n" => r#"h2[[["a"]]]"#,
    heading_consumes_blank_lines: "== h ==\n\npara\n" => r#"h2["h"] p["para"]"#,

    nested_list: "* a\n** b\n* c\n" => r#"ul[li["a"]{ul[li["b"]]} li["c"]]"#,
    mixed_list_markers: "*# a\n*# b\n" => r#"ul[li[]{ol[li["a"] li["b"]]}]"#,
    definition_line: "; term : detail\n" => r#"dl[dt["term"] dd["detail"]]"#,

    horizontal_rule: "----\ntext\n" => r#"hr p["text"]"#,
    toc_marker: "__NOTOC__\nx\n" => r#"notoc p["x"]"#,

    paragraph_breaks: "a\n\nb\n\n\nc\n" => r#"p["a"] p+["b"] p[br] p["c"]"#,

    indent_pre: " hello\n world\n" => r#"pre["hello" br "world"]"#,
    blockquote_disables_pre: "<blockquote>\n text\n</blockquote>\n" =>
        r#"<blockquote>[p[" text"]]"#,
    div_reenables_pre: "<div>\n x\n</div>\n" => r#"<div>[pre["x"]]"#,

    table_basic: "{| class=\"x\"\n|-\n! H1 !! H2\n|-\n| a || b\n|}\n" =>
        r#"table{class="x"}[tr[th["H1"] th["H2"]] tr[td["a"] td["b"]]]"#,
    table_caption: "{|\n|+ Cap\n| x\n|}\n" => r#"table[caption["Cap"] tr[td["x"]]]"#,
    table_block_cell_flattens: "{|\n| a\ncontinued\n|}\n" =>
        "table[tr[td[\"a\\ncontinued\"]]]",
    table_indented: "::{|\n| x\n|}\n" => r#"table@2[tr[td["x"]]]"#,
    table_cell_attrs: "{|\n| style=\"a\" | x\n|}\n" =>
        r#"table[tr[td{style="a"}["x"]]]"#,
    header_pipe_synonym: "{|\n! a || b\n|}\n" => r#"table[tr[th["a"] th["b"]]]"#,

    quotes_unbalanced: "'''a''b'''c''" => r#"p[b["a" i["b"]] "c" i[]]"#,
    quote_leader_peel: "''''a'''\n" => r#"p["'" b["a"]]"#,
    five_run_closed: "'''''a'''''\n" => r#"p[bi["a"]]"#,
    five_run_split: "'''''a''b'''\n" => r#"p[b[i["a"] "b"]]"#,

    link_with_trail: "[[foo|bar]]baz" => r#"p[[["foo"|"bar"]]~"baz"]"#,
    external_link: "[https://example.org Example]\n" =>
        r#"p[["https://example.org" "Example"]]"#,
    external_link_bare: "[https://example.org]\n" => r#"p[["https://example.org"]]"#,
    plain_link_parens: "see https://example.org/a(b). end\n" =>
        r#"p["see " url("https://example.org/a(b)") ". end"]"#,
    plain_link_wrapped: "(https://example.org)\n" =>
        r#"p["(" url("https://example.org") ")"]"#,

    entities: "a&nbsp;b &bogus; &#65; &#x42;\n" =>
        "p[\"a\" ent('\\u{a0}') \"b &bogus; \" ent('A') \" \" ent('B')]",
    nowiki_inline: "a<nowiki>''x''</nowiki>b\n" => r#"p["a" nowiki("''x''") "b"]"#,
    pre_tag: "<pre>a&amp;b\n c</pre>\n" => "<pre>[\"a\" ent('&') \"b\\n c\"]",
    ref_tag: "x<ref>note</ref>y\n" => r#"p["x" ref(p["note"]) "y"]"#,
    span_with_attr: "<span class=\"x\">y</span>z\n" => r#"p[<span{class="x"}>["y"] "z"]"#,
    void_br: "a<br>b\n" => r#"p["a" <br/> "b"]"#,
    template_is_plain_text: "{{t|a}}\n" => r#"p["{{t|a}}"]"#,
}

#[test]
fn heading_mismatch_warns() {
    let doc = parse("===x==\n");
    assert!(
        doc.diagnostics.iter().any(|d| d.message.contains("heading")),
        "expected a heading mismatch diagnostic, got {:?}",
        doc.diagnostics
    );
}

#[test]
fn unclosed_tags_warn() {
    let doc = parse("a <em>b\n");
    assert_eq!(shape(&doc), r#"p["a " <em>["b"]]"#);
    assert!(
        doc.diagnostics.iter().any(|d| d.message.contains("unclosed <em>")),
        "expected an unclosed-tag diagnostic, got {:?}",
        doc.diagnostics
    );
}

#[test]
fn unclosed_comment_warns() {
    let doc = parse("a<!--b\n");
    assert_eq!(shape(&doc), "p[\"a\" cmt(\"b\\n\")]");
    assert!(!doc.diagnostics.is_empty());
}

#[test]
fn custom_schemes() {
    let options = crate::Options {
        allow_schemes: vec!["gopher://".to_string()],
        ..crate::Options::default()
    };
    let doc = crate::parse_with("gopher://x and http://y\n", &options).unwrap();
    assert_eq!(shape(&doc), r#"p[url("gopher://x") " and http://y"]"#);
}

#[test]
fn line_col_reporting() {
    let doc = parse("a\nb é c\n");
    let col = doc.line_col(doc.source.find('c').unwrap());
    assert_eq!((col.line, col.column), (2, 5));
}
