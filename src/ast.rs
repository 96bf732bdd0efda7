//! The document tree produced by the main markup grammar.
//!
//! Every node is wrapped in [`Spanned`] by the grammar; spans index into the
//! preprocessed source text held by the owning
//! [`Document`](crate::Document).

use crate::codemap::{Span, Spanned};

/// A block-level item.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Block {
    /// A wikitext heading.
    ///
    /// ```wikitext
    /// == Section ==
    /// ```
    Heading {
        /// The heading outline level.
        level: HeadingLevel,
        /// The heading content.
        content: Vec<Spanned<Inline>>,
    },
    /// A horizontal rule (`----`).
    HorizontalRule,
    /// An unordered, ordered, or definition list.
    List(List),
    /// A wikitext table.
    Table(Table),
    /// A preformatted block introduced by a leading space.
    ///
    /// ```wikitext
    ///  preformatted
    ///  text
    /// ```
    IndentPre {
        /// The preformatted content, with [`Inline::LineBreak`] between
        /// source lines.
        content: Vec<Spanned<Inline>>,
    },
    /// A paragraph of inline content.
    Paragraph {
        /// The paragraph content.
        content: Vec<Spanned<Inline>>,
        /// An empty line directly preceded the paragraph.
        leading_break: bool,
        /// The paragraph was cut short by a following block element.
        trailing_break: bool,
    },
    /// A table-of-contents behavior switch on its own line.
    TocMarker(TocKind),
    /// An HTML-like block element (`<div>`, `<center>`, `<blockquote>`,
    /// `<p>`, `<pre>`, `<h1>`…`<h6>`, `<references>`, and the table family).
    Html(HtmlElement),
}

/// An unordered, ordered, or definition list.
///
/// ```wikitext
/// * Unordered
/// # Ordered
/// ; Term : Detail
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct List {
    /// The list kind, decided by the marker of its first item.
    pub kind: ListKind,
    /// The list items.
    pub items: Vec<Spanned<ListItem>>,
}

/// The kind of a [`List`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ListKind {
    /// `*` markers (`<ul>`).
    Unordered,
    /// `#` markers (`<ol>`).
    Ordered,
    /// `;`/`:` markers (`<dl>`).
    Definition,
}

/// A single item of a [`List`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ListItem {
    /// The item kind, decided by the innermost marker of its line.
    pub kind: ItemKind,
    /// The inline content of the item.
    pub content: Vec<Spanned<Inline>>,
    /// Deeper lists attached to this item, either from extra markers on the
    /// same line or from more deeply nested following lines.
    pub sublists: Vec<Spanned<List>>,
}

/// The kind of a [`ListItem`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ItemKind {
    /// A `*` or `#` item (`<li>`).
    Item,
    /// A `;` definition term (`<dt>`).
    Term,
    /// A `:` definition detail (`<dd>`).
    Definition,
}

/// A wikitext table.
///
/// ```wikitext
/// {| class="wikitable"
/// |+ Caption
/// |-
/// ! H1 !! H2
/// |-
/// | a || b
/// |}
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Table {
    /// The number of `:` indent characters preceding `{|`.
    pub indent: usize,
    /// The table attributes.
    pub attrs: Vec<Attribute>,
    /// The optional `|+` caption.
    pub caption: Option<Spanned<TableCaption>>,
    /// The table rows.
    pub rows: Vec<Spanned<TableRow>>,
}

/// A `|+` table caption.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TableCaption {
    /// The caption attributes.
    pub attrs: Vec<Attribute>,
    /// The caption content.
    pub content: CellContent,
}

/// A table row.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TableRow {
    /// The row attributes from its `|-` line.
    pub attrs: Vec<Attribute>,
    /// The row cells.
    pub cells: Vec<Spanned<TableCell>>,
}

/// A table cell.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TableCell {
    /// Whether this is a data or header cell.
    pub kind: CellKind,
    /// The cell attributes.
    pub attrs: Vec<Attribute>,
    /// The cell content.
    pub content: CellContent,
}

/// The kind of a [`TableCell`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CellKind {
    /// A `|` cell (`<td>`).
    Data,
    /// A `!` cell (`<th>`).
    Header,
}

/// Content of a table cell or caption.
///
/// A terminal cell on a line may contain full block content; cells whose
/// body is a single paragraph-like block are flattened to inline content by
/// the post-processor, uniformly for captions, data cells, and header cells.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CellContent {
    /// Inline-only content.
    Inline(Vec<Spanned<Inline>>),
    /// Nested block content.
    Blocks(Vec<Spanned<Block>>),
}

/// A table-of-contents behavior switch.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TocKind {
    /// `__TOC__`
    Toc,
    /// `__NOTOC__`
    NoToc,
    /// `__FORCETOC__`
    ForceToc,
}

/// An inline item.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Inline {
    /// A run of plain text. The text is the node’s span.
    Text,
    /// `'''bold'''`
    Bold(Vec<Spanned<Inline>>),
    /// `''italic''`
    Italic(Vec<Spanned<Inline>>),
    /// `'''''bold italic'''''`, when the styles cannot be decomposed.
    BoldItalic(Vec<Spanned<Inline>>),
    /// An internal link.
    ///
    /// ```wikitext
    /// [[target|text]]trail
    /// ```
    InternalLink {
        /// The link target.
        target: Vec<Spanned<Inline>>,
        /// The link text, if a `|` separator was present.
        text: Option<Vec<Spanned<Inline>>>,
        /// The link trail directly following `]]`.
        trail: Option<Span>,
    },
    /// A bracketed external link.
    ///
    /// ```wikitext
    /// [https://example.org text]
    /// ```
    ExternalLink {
        /// The link URL.
        url: Span,
        /// The link text, if any content followed the URL.
        text: Option<Vec<Spanned<Inline>>>,
    },
    /// A bare URL recognized in plain text.
    PlainLink {
        /// The link URL.
        url: Span,
    },
    /// A decoded HTML entity.
    Entity {
        /// The source form of the entity.
        form: EntityForm,
        /// The decoded code point.
        value: char,
    },
    /// Verbatim `<nowiki>` content.
    Nowiki {
        /// The raw content between the tags.
        content: Span,
    },
    /// An HTML comment.
    Comment {
        /// The raw contents of the comment.
        content: Span,
        /// Whether the comment tag was unterminated.
        unclosed: bool,
    },
    /// An inline HTML-like element (`<em>`, `<span>`, …).
    Html(HtmlElement),
    /// A `<ref>` footnote; positioned inline but containing block content.
    Ref {
        /// The tag attributes.
        attrs: Vec<Attribute>,
        /// The footnote body.
        content: Vec<Spanned<Block>>,
    },
    /// A forced line break within preformatted or paragraph flow.
    LineBreak,
}

/// The source form of an [`Inline::Entity`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EntityForm {
    /// `&name;`
    Named,
    /// `&#9733;`
    Decimal,
    /// `&#x2605;`
    Hex,
}

/// An HTML-like element recognized by the main grammar.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct HtmlElement {
    /// The tag name.
    pub name: Span,
    /// The tag attributes.
    pub attrs: Vec<Attribute>,
    /// The element content.
    pub content: ElementContent,
    /// Whether the tag was written self-closing (`<br/>`).
    pub self_closing: bool,
    /// Whether the close tag was missing.
    pub unclosed: bool,
}

/// Content of an [`HtmlElement`], depending on the element class.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ElementContent {
    /// No content (void or self-closing elements).
    None,
    /// Inline content (`<em>`, `<p>`, `<h1>`…`<h6>`, `<pre>`).
    Inline(Vec<Spanned<Inline>>),
    /// A nested block document (`<div>`, `<blockquote>`, table family).
    Blocks(Vec<Spanned<Block>>),
}

/// A `name="value"` attribute of an HTML-like element or table line.
///
/// Entities in the value are decoded during parsing, so the fields are owned
/// rather than spans.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Attribute {
    /// The attribute name.
    pub name: String,
    /// The attribute value, with quotes stripped and entities decoded.
    pub value: Option<String>,
    /// The source span of the whole attribute.
    pub span: Span,
}

/// A conversion error for out-of-range heading levels.
#[derive(Debug, thiserror::Error)]
#[error("{0} is not a valid heading level")]
pub struct HeadingRangeError(u8);

/// A heading level.
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub struct HeadingLevel(u8);

impl HeadingLevel {
    /// Returns the HTML tag name corresponding to this heading level.
    pub fn tag_name(self) -> &'static str {
        const TAGS: [&str; 6] = ["h1", "h2", "h3", "h4", "h5", "h6"];
        TAGS[usize::from(self.0) - 1]
    }

    /// The level as a number in `1..=6`.
    #[inline]
    pub fn get(self) -> u8 {
        self.0
    }
}

impl From<HeadingLevel> for u8 {
    fn from(value: HeadingLevel) -> Self {
        value.0
    }
}

impl TryFrom<u8> for HeadingLevel {
    type Error = HeadingRangeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if (1..=6).contains(&value) {
            Ok(Self(value))
        } else {
            Err(HeadingRangeError(value))
        }
    }
}
