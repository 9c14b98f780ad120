//! The markup grammar: one set of productions serving both directions.
//!
//! Every production here is a [`Grammar`], so the text a document prints to
//! is exactly the text that parses back to it. The parse direction accepts
//! loosely formatted input in both modes; the two [`PrintMode`]s differ only
//! in the canonical whitespace installed into the productions.

use tracing::{debug, trace};

use crate::error::{Error, InvariantViolation, Pos, Result, UnexpectedInput};
use crate::grammar::combine::{depth, lazy, opt, repeat, sep_by, BoxedGrammar};
use crate::grammar::primitive::{
    EndOfInput, LineEnd, Literal, NotFollowedBy, PrefixUpTo, PrefixWhile, SpaceClass, Whitespace,
};
use crate::grammar::{Grammar, GrammarExt};
use crate::input::{Cursor, Output};
use crate::xml::model::{Attributes, Document, Element, Node};

/// Spaces per nesting level in indented mode
const INDENT_STEP: usize = 4;

/// Default maximum element nesting depth
pub const DEFAULT_MAX_DEPTH: u16 = 128;
/// Default maximum input size in bytes (10 MiB)
pub const DEFAULT_MAX_SIZE: usize = 10 * 1024 * 1024;

/// Canonical formatting policy, selected at construction time.
///
/// Parsing behavior is identical in both modes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PrintMode {
    /// No newlines or indentation
    Flat,
    /// One content item per line, four spaces per nesting level
    #[default]
    Indented,
}

/// Parse limits (0 means unlimited). Printing ignores both.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    /// Maximum element nesting depth
    pub max_depth: u16,
    /// Maximum input size in bytes
    pub max_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_size: DEFAULT_MAX_SIZE,
        }
    }
}

impl Config {
    /// Create a new config with unlimited depth and size
    pub const fn unlimited() -> Self {
        Self {
            max_depth: 0,
            max_size: 0,
        }
    }

    /// Create a new config with specific limits
    pub const fn new(max_depth: u16, max_size: usize) -> Self {
        Self {
            max_depth,
            max_size,
        }
    }
}

/// The whitespace policy threaded through the productions.
#[derive(Clone, Copy, Debug)]
struct Layout {
    mode: PrintMode,
    max_depth: u16,
}

impl Layout {
    fn line_break(self) -> &'static str {
        match self.mode {
            PrintMode::Flat => "",
            PrintMode::Indented => "\n",
        }
    }

    fn indent(self, level: u16) -> String {
        match self.mode {
            PrintMode::Flat => String::new(),
            PrintMode::Indented => " ".repeat(usize::from(level) * INDENT_STEP),
        }
    }
}

fn tag_name(expected: &'static str) -> PrefixWhile {
    PrefixWhile {
        pred: |b| b.is_ascii_alphabetic(),
        min: 1,
        expected,
    }
}

/// `"..."` ⇄ the contained string
fn quoted_string() -> impl Grammar<Value = String> {
    Literal("\"")
        .ignore_then(PrefixUpTo { terminator: "\"" })
        .then_ignore(Literal("\""))
}

// Keys stop at tag-structural bytes, not just `=`: attributes are parsed
// in the open input stream, so a run-to-`=` key would reach across `/>`
// into a sibling tag.
fn is_attribute_key_byte(b: u8) -> bool {
    !matches!(
        b,
        b'=' | b'<' | b'>' | b'/' | b'"' | b' ' | b'\t' | b'\r' | b'\n'
    )
}

/// `key="value"` ⇄ `(key, value)`
fn attribute() -> impl Grammar<Value = (String, String)> {
    PrefixWhile {
        pred: is_attribute_key_byte,
        min: 1,
        expected: "attribute key",
    }
    .then_ignore(Literal("="))
    .then(quoted_string())
}

fn attributes_from_pairs(pairs: Vec<(String, String)>) -> Result<Attributes> {
    let mut attributes = Attributes::new();
    for (key, value) in pairs {
        if attributes.contains_key(&key) {
            return Err(Error::unexpected(
                UnexpectedInput::DuplicateAttribute { name: key },
                Pos::default(),
            ));
        }
        let _ = attributes.insert(key, value);
    }
    Ok(attributes)
}

fn pairs_from_attributes(attributes: &Attributes) -> Result<Vec<(String, String)>> {
    Ok(attributes
        .iter()
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect())
}

/// Whitespace-separated attributes ⇄ insertion-ordered mapping.
/// Repeated keys are rejected while parsing.
fn attribute_list() -> impl Grammar<Value = Attributes> {
    sep_by(attribute(), Whitespace::horizontal(1, " "), 1)
        .map(attributes_from_pairs, pairs_from_attributes)
}

fn head_from_parts((name, attributes): (String, Option<Attributes>)) -> Result<(String, Attributes)> {
    Ok((name, attributes.unwrap_or_default()))
}

fn parts_from_head(head: &(String, Attributes)) -> Result<(String, Option<Attributes>)> {
    let (name, attributes) = head;
    let attributes = if attributes.is_empty() {
        None
    } else {
        Some(attributes.clone())
    };
    Ok((name.clone(), attributes))
}

/// `name` or `name attrs` ⇄ `(name, attributes)`; an absent attribute list
/// converts to and from the empty mapping
fn tag_head() -> impl Grammar<Value = (String, Attributes)> {
    tag_name("tag name")
        .then(opt(
            Whitespace::horizontal(1, " ").ignore_then(attribute_list()),
        ))
        .map(head_from_parts, parts_from_head)
}

fn element_from_head((name, attributes): (String, Attributes)) -> Result<Element> {
    Ok(Element {
        name,
        attributes,
        content: Vec::new(),
    })
}

fn head_from_empty_element(element: &Element) -> Result<(String, Attributes)> {
    if element.content.is_empty() {
        Ok((element.name.clone(), element.attributes.clone()))
    } else {
        Err(Error::invariant(InvariantViolation::NonEmptyContent {
            name: element.name.clone(),
        }))
    }
}

/// `<name attrs/>` (optional space before the slash) ⇄ an element with
/// empty content; printing drops the space
fn empty_tag() -> impl Grammar<Value = Element> {
    Literal("<")
        .ignore_then(NotFollowedBy("/"))
        .ignore_then(tag_head())
        .then_ignore(Whitespace::horizontal(0, ""))
        .then_ignore(Literal("/>"))
        .map(element_from_head, head_from_empty_element)
}

/// `<name attrs>` ⇄ `(name, attributes)` — no content commitment yet
fn opening_tag() -> impl Grammar<Value = (String, Attributes)> {
    Literal("<")
        .ignore_then(NotFollowedBy("/"))
        .ignore_then(tag_head())
        .then_ignore(Whitespace::horizontal(0, ""))
        .then_ignore(NotFollowedBy("/"))
        .then_ignore(Literal(">"))
}

/// `<!--text-->` ⇄ the comment text
fn comment() -> impl Grammar<Value = String> {
    Literal("<!--")
        .ignore_then(PrefixUpTo { terminator: "-->" })
        .then_ignore(Literal("-->"))
}

/// One source line of text: leading horizontal whitespace stripped, the run
/// stops at `<` or the line break.
///
/// An empty run is a value — `Text("")` for a blank line — but only when
/// the line actually ends in a newline; otherwise the whitespace belongs to
/// a closing tag's indentation and the production fails so the enclosing
/// repetition terminates.
struct TextLine;

impl Grammar for TextLine {
    type Value = String;

    fn parse(&self, cursor: &mut Cursor<'_>) -> Result<String> {
        let start = cursor.position();
        let _ = cursor.take_while(|b| SpaceClass::Horizontal.contains(b));
        let run = cursor.take_while(|b| b != b'<' && b != b'\n');
        if run.is_empty() && cursor.current() != Some(b'\n') {
            return Err(Error::unexpected(
                UnexpectedInput::ExpectedRun { expected: "text" },
                start,
            ));
        }
        std::str::from_utf8(run)
            .map(str::to_string)
            .map_err(|_| Error::unexpected(UnexpectedInput::InvalidUtf8, cursor.position()))
    }

    fn print(&self, value: &String, out: &mut Output) -> Result<()> {
        out.push_str(value);
        Ok(())
    }
}

fn node_from_element(element: Element) -> Result<Node> {
    Ok(Node::Element(element))
}

fn element_from_node(node: &Node) -> Result<Element> {
    match node {
        Node::Element(element) => Ok(element.clone()),
        _ => Err(Error::invariant(InvariantViolation::ShapeMismatch {
            expected: "an element node",
        })),
    }
}

fn node_from_comment(text: String) -> Result<Node> {
    Ok(Node::Comment(text))
}

fn comment_from_node(node: &Node) -> Result<String> {
    match node {
        Node::Comment(text) => Ok(text.clone()),
        _ => Err(Error::invariant(InvariantViolation::ShapeMismatch {
            expected: "a comment node",
        })),
    }
}

fn node_from_text(text: String) -> Result<Node> {
    Ok(Node::Text(text))
}

fn text_from_node(node: &Node) -> Result<String> {
    match node {
        Node::Text(text) => Ok(text.clone()),
        _ => Err(Error::invariant(InvariantViolation::ShapeMismatch {
            expected: "a text node",
        })),
    }
}

/// One content node.
///
/// The alternative order serves both directions: the lookaheads make parse
/// order-insensitive, while printing an empty-content element must hit the
/// self-closing alternative before the container one.
fn node(level: u16, layout: Layout) -> impl Grammar<Value = Node> {
    let empty = empty_tag().map(node_from_element, element_from_node);
    let container = lazy(move || -> BoxedGrammar<Node> {
        Box::new(container_tag(level, layout).map(node_from_element, element_from_node))
    });
    let comment_node = comment().map(node_from_comment, comment_from_node);
    let text = TextLine.map(node_from_text, text_from_node);
    empty.or(container).or(comment_node).or(text)
}

/// One line of element content: indentation, the node, the line end.
fn content_item(level: u16, layout: Layout) -> impl Grammar<Value = Node> {
    Whitespace::horizontal(0, layout.indent(level))
        .ignore_then(node(level, layout))
        .then_ignore(LineEnd {
            canonical: layout.line_break(),
        })
}

fn element_from_container(
    ((head, content), closing): (((String, Attributes), Vec<Node>), String),
) -> Result<Element> {
    let (name, attributes) = head;
    if name != closing {
        return Err(Error::unexpected(
            UnexpectedInput::MismatchedClosingTag {
                expected: name,
                found: closing,
            },
            Pos::default(),
        ));
    }
    Ok(Element {
        name,
        attributes,
        content,
    })
}

fn container_from_element(
    element: &Element,
) -> Result<(((String, Attributes), Vec<Node>), String)> {
    Ok((
        (
            (element.name.clone(), element.attributes.clone()),
            element.content.clone(),
        ),
        element.name.clone(),
    ))
}

/// `<name attrs>content</name>` ⇄ an element; the closing name must match
/// the opening name byte for byte (vacuous when printing, since both derive
/// from the same field).
fn container_tag(level: u16, layout: Layout) -> impl Grammar<Value = Element> {
    let open = opening_tag().then_ignore(LineEnd {
        canonical: layout.line_break(),
    });
    let body = repeat(content_item(level + 1, layout), 0);
    let close = Whitespace::horizontal(0, layout.indent(level))
        .ignore_then(Literal("</"))
        .ignore_then(tag_name("closing tag name"))
        .then_ignore(Literal(">"));
    depth(
        open.then(body)
            .then(close)
            .map(element_from_container, container_from_element),
        layout.max_depth,
    )
}

/// `<?xml attrs?>` ⇄ the prolog mapping
fn prolog() -> impl Grammar<Value = Attributes> {
    Literal("<?xml")
        .ignore_then(Whitespace::horizontal(1, " "))
        .ignore_then(attribute_list())
        .then_ignore(Whitespace::horizontal(0, ""))
        .then_ignore(Literal("?>"))
}

fn document_from_parts((prolog, root): (Option<Attributes>, Element)) -> Result<Document> {
    Ok(Document {
        prolog: prolog.unwrap_or_default(),
        root,
    })
}

fn parts_from_document(doc: &Document) -> Result<(Option<Attributes>, Element)> {
    let prolog = if doc.prolog.is_empty() {
        None
    } else {
        Some(doc.prolog.clone())
    };
    Ok((prolog, doc.root.clone()))
}

/// Whole document: optional prolog, one root element, nothing else.
/// Surrounding whitespace is tolerated while parsing and never printed.
fn document(layout: Layout) -> impl Grammar<Value = Document> {
    let head = opt(prolog().then_ignore(Whitespace::any(0, layout.line_break())));
    Whitespace::any(0, "")
        .ignore_then(head)
        .then(container_tag(0, layout))
        .then_ignore(Whitespace::any(0, ""))
        .then_ignore(EndOfInput)
        .map(document_from_parts, parts_from_document)
}

/// The engine's public face: a document grammar plus a formatting mode.
///
/// Both modes accept the same relaxed input; they differ only in the
/// canonical text [`Xml::print`] produces.
#[derive(Clone, Copy, Debug)]
pub struct Xml {
    mode: PrintMode,
    config: Config,
}

impl Xml {
    /// Create an engine with the given print mode and default limits
    pub fn new(mode: PrintMode) -> Self {
        Self {
            mode,
            config: Config::default(),
        }
    }

    /// Setter method to configure parse limits
    pub const fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Flat-printing engine
    pub fn flat() -> Self {
        Self::new(PrintMode::Flat)
    }

    /// Indented-printing engine
    pub fn indented() -> Self {
        Self::new(PrintMode::Indented)
    }

    fn layout(&self) -> Layout {
        Layout {
            mode: self.mode,
            max_depth: self.config.max_depth,
        }
    }

    /// Parse a document from raw UTF-8 bytes.
    ///
    /// All-or-nothing: malformed input yields an `UnexpectedInput` error
    /// and no partial document.
    pub fn parse(&self, input: &[u8]) -> Result<Document> {
        debug!(bytes = input.len(), "parsing document");
        if self.config.max_size > 0 && input.len() > self.config.max_size {
            return Err(Error::unexpected(
                UnexpectedInput::MaxSizeExceeded {
                    max: self.config.max_size,
                },
                Pos::default(),
            ));
        }
        let mut cursor = Cursor::new(input);
        document(self.layout())
            .parse(&mut cursor)
            .inspect_err(|err| trace!(%err, "parse failed"))
    }

    /// Print a document to its canonical text for this engine's mode.
    ///
    /// Fails with an `InvariantViolation` when the document's shape cannot
    /// be represented (never for trees this engine itself parsed).
    pub fn print(&self, doc: &Document) -> Result<String> {
        debug!("printing document");
        let mut out = Output::new();
        document(self.layout())
            .print(doc, &mut out)
            .inspect_err(|err| trace!(%err, "print failed"))?;
        Ok(out.into_string())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn flat() -> Layout {
        Layout {
            mode: PrintMode::Flat,
            max_depth: 0,
        }
    }

    fn parse_with<G: Grammar>(grammar: &G, input: &str) -> Result<G::Value> {
        let mut cursor = Cursor::new(input.as_bytes());
        grammar.parse(&mut cursor)
    }

    fn print_with<G: Grammar>(grammar: &G, value: &G::Value) -> String {
        let mut out = Output::new();
        grammar.print(value, &mut out).unwrap();
        out.into_string()
    }

    #[test]
    fn test_quoted_string() {
        let grammar = quoted_string();
        let result = parse_with(&grammar, "\"hoi\"").unwrap();
        assert_eq!(result, "hoi");
        assert_eq!(print_with(&grammar, &result), "\"hoi\"");
    }

    #[test]
    fn test_attribute() {
        let grammar = attribute();
        let result = parse_with(&grammar, "header=\"none\"").unwrap();
        assert_eq!(result.0, "header");
        assert_eq!(result.1, "none");
        assert_eq!(print_with(&grammar, &result), "header=\"none\"");
    }

    #[test]
    fn test_attribute_list_preserves_order() {
        let grammar = attribute_list();
        let result = parse_with(&grammar, "headerOne=\"none\" headerTwo=\"some\"").unwrap();
        assert_eq!(result.get("headerOne"), Some(&"none".to_string()));
        assert_eq!(result.get("headerTwo"), Some(&"some".to_string()));
        let keys: Vec<&str> = result.keys().map(String::as_str).collect();
        assert_eq!(keys, ["headerOne", "headerTwo"]);
        assert_eq!(
            print_with(&grammar, &result),
            "headerOne=\"none\" headerTwo=\"some\""
        );
    }

    #[test]
    fn test_attribute_list_rejects_duplicates() {
        let grammar = attribute_list();
        let err = parse_with(&grammar, "key=\"1\" key=\"2\"").unwrap_err();
        match err.kind() {
            ErrorKind::UnexpectedInput(UnexpectedInput::DuplicateAttribute { name }) => {
                assert_eq!(name, "key");
            }
            other => panic!("unexpected kind: {other:?}"),
        }
    }

    #[test]
    fn test_tag_head() {
        let grammar = tag_head();
        let with_attrs = parse_with(&grammar, "xmlTag header=\"none\"").unwrap();
        assert_eq!(with_attrs.0, "xmlTag");
        assert_eq!(with_attrs.1.get("header"), Some(&"none".to_string()));

        let bare = parse_with(&grammar, "xmlTag").unwrap();
        assert_eq!(bare.0, "xmlTag");
        assert!(bare.1.is_empty());
    }

    #[test]
    fn test_empty_tag_canonicalizes_spacing() {
        let grammar = empty_tag();
        let tight = parse_with(&grammar, "<xmlTag header=\"none\"/>").unwrap();
        let spaced = parse_with(&grammar, "<xmlTag header=\"none\" />").unwrap();
        assert_eq!(tight, spaced);
        assert_eq!(tight, Element::new("xmlTag").with_attribute("header", "none"));
        assert_eq!(print_with(&grammar, &tight), "<xmlTag header=\"none\"/>");
    }

    #[test]
    fn test_empty_tag_print_rejects_content() {
        let grammar = empty_tag();
        let element = Element::new("full").with_text("content");
        let mut out = Output::new();
        let err = grammar.print(&element, &mut out).unwrap_err();
        assert!(err.is_invariant_violation());
    }

    #[test]
    fn test_opening_tag() {
        let grammar = opening_tag();
        let result = parse_with(&grammar, "<xmlTag header=\"none\">").unwrap();
        assert_eq!(result.0, "xmlTag");
        assert_eq!(result.1.get("header"), Some(&"none".to_string()));
        assert_eq!(print_with(&grammar, &result), "<xmlTag header=\"none\">");

        assert!(parse_with(&grammar, "</xmlTag>").is_err());
        assert!(parse_with(&grammar, "<xmlTag/>").is_err());
    }

    #[test]
    fn test_comment() {
        let grammar = comment();
        let input = "<!--some comments <xml in=\"between\"> endOfcomment-->";
        let result = parse_with(&grammar, input).unwrap();
        assert_eq!(result, "some comments <xml in=\"between\"> endOfcomment");
        assert_eq!(print_with(&grammar, &result), input);
    }

    #[test]
    fn test_text_line() {
        let result = parse_with(&TextLine, "hoi").unwrap();
        assert_eq!(result, "hoi");
        assert_eq!(print_with(&TextLine, &result), "hoi");
    }

    #[test]
    fn test_text_line_strips_leading_whitespace() {
        assert_eq!(parse_with(&TextLine, "    indented").unwrap(), "indented");
    }

    #[test]
    fn test_text_line_blank_needs_newline() {
        // Blank line: allowed, the newline stays for the line end.
        assert_eq!(parse_with(&TextLine, "\n").unwrap(), "");
        // Closing-tag indentation: not a text line.
        assert!(parse_with(&TextLine, "    </tag>").is_err());
        assert!(parse_with(&TextLine, "").is_err());
    }

    #[test]
    fn test_container_tag() {
        let grammar = container_tag(0, flat());
        let input = "<xmlTag headerContent=\"none\">tagContent</xmlTag>";
        let result = parse_with(&grammar, input).unwrap();
        assert_eq!(
            result,
            Element::new("xmlTag")
                .with_attribute("headerContent", "none")
                .with_text("tagContent")
        );
        assert_eq!(print_with(&grammar, &result), input);
    }

    #[test]
    fn test_container_tag_rejects_mismatched_closing_name() {
        let grammar = container_tag(0, flat());
        let err = parse_with(&grammar, "<a>text</b>").unwrap_err();
        match err.kind() {
            ErrorKind::UnexpectedInput(UnexpectedInput::MismatchedClosingTag {
                expected,
                found,
            }) => {
                assert_eq!(expected, "a");
                assert_eq!(found, "b");
            }
            other => panic!("unexpected kind: {other:?}"),
        }
    }

    #[test]
    fn test_node_prints_empty_element_self_closing() {
        let grammar = node(0, flat());
        let parsed = parse_with(&grammar, "<empty></empty>").unwrap();
        assert_eq!(parsed, Node::Element(Element::new("empty")));
        assert_eq!(print_with(&grammar, &parsed), "<empty/>");
    }

    #[test]
    fn test_prolog() {
        let grammar = prolog();
        let input = "<?xml version=\"1.0\" encoding=\"utf-8\"?>";
        let result = parse_with(&grammar, input).unwrap();
        assert_eq!(result.get("version"), Some(&"1.0".to_string()));
        assert_eq!(result.get("encoding"), Some(&"utf-8".to_string()));
        assert_eq!(print_with(&grammar, &result), input);
    }

    #[test]
    fn test_parse_rejects_oversized_input() {
        let engine = Xml::flat().with_config(Config::new(0, 8));
        let err = engine.parse(b"<root>text</root>").unwrap_err();
        match err.kind() {
            ErrorKind::UnexpectedInput(UnexpectedInput::MaxSizeExceeded { max }) => {
                assert_eq!(*max, 8);
            }
            other => panic!("unexpected kind: {other:?}"),
        }
    }

    #[test]
    fn test_parse_rejects_deep_nesting() {
        let engine = Xml::flat().with_config(Config::new(3, 0));
        assert!(engine.parse(b"<a><b><c></c></b></a>").is_ok());
        let err = engine.parse(b"<a><b><c><d></d></c></b></a>").unwrap_err();
        match err.kind() {
            ErrorKind::UnexpectedInput(UnexpectedInput::MaxDepthExceeded { max }) => {
                assert_eq!(*max, 3);
            }
            other => panic!("unexpected kind: {other:?}"),
        }
    }
}
