//! Preprocessor grammar and expansion tests.

use crate::{
    Options,
    codemap::Spanned,
    preprocessor::{InclusionMode, PreDocument, Segment},
};

#[track_caller]
fn pre(input: &str) -> PreDocument<'_> {
    let _ = env_logger::try_init();
    crate::preprocess(input, &Options::default()).unwrap()
}

/// Concatenated text of the plain-text segments in a list.
fn text_of(doc: &PreDocument<'_>, segments: &[Spanned<Segment>]) -> String {
    segments
        .iter()
        .filter(|segment| matches!(segment.node, Segment::Text))
        .map(|segment| &doc.source[segment.span.into_range()])
        .collect()
}

#[test]
fn template_with_args() {
    let doc = pre("{{t|a|k=v}}");
    let [segment] = doc.segments.as_slice() else {
        panic!("expected one segment, got {:?}", doc.segments);
    };
    let Segment::Template { name, args, bol } = &segment.node else {
        panic!("expected a template, got {:?}", segment.node);
    };
    assert!(*bol);
    assert_eq!(text_of(&doc, name), "t");

    assert_eq!(args.len(), 2);
    assert!(args[0].node.name.is_none());
    assert_eq!(text_of(&doc, &args[0].node.value), "a");
    let named = args[1].node.name.as_ref().expect("second argument is named");
    assert_eq!(text_of(&doc, named), "k");
    assert_eq!(text_of(&doc, &args[1].node.value), "v");
}

#[test]
fn template_not_at_bol() {
    let doc = pre("x{{t}}");
    let Some(Segment::Template { bol, .. }) =
        doc.segments.iter().map(|s| &s.node).find(|s| matches!(s, Segment::Template { .. }))
    else {
        panic!("expected a template");
    };
    assert!(!*bol);
}

#[test]
fn template_missing_close_decays_to_text() {
    let doc = pre("{{t");
    assert_eq!(doc.segments.len(), 1);
    assert!(matches!(doc.segments[0].node, Segment::Text));
    assert_eq!(doc.expand(false), "{{t");
}

#[test]
fn nested_template_argument() {
    let doc = pre("{{a|{{b}}|x}}");
    let Segment::Template { args, .. } = &doc.segments[0].node else {
        panic!("expected a template");
    };
    assert_eq!(args.len(), 2);
    assert!(matches!(
        args[0].node.value.as_slice(),
        [Spanned { node: Segment::Template { .. }, .. }]
    ));
}

#[test]
fn parameter_with_default() {
    let doc = pre("{{{p|d}}}");
    let Segment::Parameter { name, defaults } = &doc.segments[0].node else {
        panic!("expected a parameter, got {:?}", doc.segments[0].node);
    };
    assert_eq!(text_of(&doc, name), "p");
    assert_eq!(defaults.len(), 1);
    assert_eq!(text_of(&doc, &defaults[0]), "d");
}

#[test]
fn link_content_is_balanced() {
    let doc = pre("[[a|b{{c}}]]");
    let Segment::Link { content } = &doc.segments[0].node else {
        panic!("expected a link, got {:?}", doc.segments[0].node);
    };
    // `|` is ordinary inside a preprocessor link.
    assert_eq!(text_of(&doc, content), "a|b");
    assert!(content.iter().any(|s| matches!(s.node, Segment::Template { .. })));
}

#[test]
fn comment_alone_swallows_one_newline() {
    let doc = pre("x\n<!-- c -->\ny");
    assert_eq!(doc.expand(false), "x\ny");
}

#[test]
fn comment_alone_with_leading_blanks() {
    // The blanks on either side of the comment vanish with it.
    let doc = pre("x\n   <!-- c -->  \ny");
    assert_eq!(doc.expand(false), "x\ny");
}

#[test]
fn comment_on_first_line_is_not_alone() {
    let doc = pre("<!-- c -->\ny");
    assert_eq!(doc.expand(false), "<!-- c -->\ny");

    // Leading blanks do not change the first-line exception.
    let doc = pre("  <!-- c -->\ny");
    assert_eq!(doc.expand(false), "  <!-- c -->\ny");
}

#[test]
fn strip_comments_on_first_line() {
    let options = Options {
        strip_comments_on_first_line: true,
        ..Options::default()
    };
    let doc = crate::preprocess("<!-- c -->\ny", &options).unwrap();
    assert_eq!(doc.expand(false), "y");
}

#[test]
fn inline_comment_is_kept() {
    let doc = pre("a <!-- c --> b");
    assert_eq!(doc.expand(false), "a <!-- c --> b");
}

#[test]
fn noinclude() {
    let doc = pre("a<noinclude>b</noinclude>c");
    assert_eq!(doc.expand(false), "abc");
    assert_eq!(doc.expand(true), "ac");
}

#[test]
fn includeonly() {
    let doc = pre("a<includeonly>b</includeonly>c");
    assert_eq!(doc.expand(false), "ac");
    assert_eq!(doc.expand(true), "abc");
}

#[test]
fn onlyinclude_inverts_the_page() {
    let doc = pre("x<onlyinclude>y</onlyinclude>z");
    assert!(doc.has_onlyinclude);
    assert_eq!(doc.expand(true), "y");
    assert_eq!(doc.expand(false), "xyz");
}

#[test]
fn unclosed_include_runs_to_eof() {
    let doc = pre("a<noinclude>b");
    let Some(Segment::Include { mode, unclosed, .. }) =
        doc.segments.iter().map(|s| &s.node).find(|s| matches!(s, Segment::Include { .. }))
    else {
        panic!("expected an include region");
    };
    assert_eq!(*mode, InclusionMode::NoInclude);
    assert!(*unclosed);
    assert!(!doc.diagnostics.is_empty());
    assert_eq!(doc.expand(false), "ab");
    assert_eq!(doc.expand(true), "a");
}

#[test]
fn dangling_close_tag_is_discarded() {
    let doc = pre("a</noinclude>b");
    assert!(doc.segments.iter().any(|s| matches!(s.node, Segment::Ignore)));
    assert_eq!(doc.expand(false), "ab");
}

#[test]
fn unclosed_comment_runs_to_eof() {
    let doc = pre("a<!--b");
    let Some(Segment::Comment { unclosed, .. }) =
        doc.segments.iter().map(|s| &s.node).find(|s| matches!(s, Segment::Comment { .. }))
    else {
        panic!("expected a comment");
    };
    assert!(*unclosed);
    assert!(!doc.diagnostics.is_empty());
}

#[test]
fn segments_cover_the_source() {
    let input = "a{{t|x}}b[[l]]<noinclude>c</noinclude>\n<!-- d -->\ne";
    let doc = pre(input);
    let mut pos = 0;
    for segment in &doc.segments {
        assert_eq!(segment.span.start, pos, "gap before {:?}", segment.node);
        pos = segment.span.end;
    }
    assert_eq!(pos, input.len());
}
