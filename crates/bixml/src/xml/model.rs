//! XML data model
//!
//! The tree the grammar parses into and prints from. All three types are
//! plain owned values; a document is built once and handed around by value
//! or reference, never mutated behind the engine's back.

use indexmap::IndexMap;

/// Attribute mapping preserving insertion order, unique keys.
pub type Attributes = IndexMap<String, String>;

/// XML document: optional prolog attributes plus exactly one root element.
///
/// An absent `<?xml ...?>` header is the empty map, never an option, so
/// parse and print stay total over one shape.
#[derive(Clone, Debug, Default)]
pub struct Document {
    pub prolog: Attributes,
    pub root: Element,
}

/// XML element.
///
/// `<a/>` and `<a></a>` both parse to empty `content`; printing always
/// regenerates the self-closing form for empty non-root elements. That
/// many-to-one normalization is deliberate — consumers must not expect
/// byte-level format preservation for empty elements.
#[derive(Clone, Debug, Default)]
pub struct Element {
    pub name: String,
    pub attributes: Attributes,
    pub content: Vec<Node>,
}

/// XML content node.
///
/// A text run spanning several source lines parses to one `Text` node per
/// line, with `Text("")` for each blank line. Text never contains `<` or a
/// newline; printed text is not re-validated, so feeding such strings in
/// produces output that will not parse back.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
    Comment(String),
}

impl Document {
    pub fn new(root: Element) -> Self {
        Self {
            prolog: Attributes::new(),
            root,
        }
    }

    /// Setter-style builder for prolog attributes
    pub fn with_prolog_attribute(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        let _ = self.prolog.insert(key.into(), value.into());
        self
    }
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Attributes::new(),
            content: Vec::new(),
        }
    }

    /// Setter-style builder for attributes
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let _ = self.attributes.insert(key.into(), value.into());
        self
    }

    /// Setter-style builder for content nodes
    pub fn with_child(mut self, node: Node) -> Self {
        self.content.push(node);
        self
    }

    /// Setter-style builder for a text line
    pub fn with_text(self, text: impl Into<String>) -> Self {
        self.with_child(Node::Text(text.into()))
    }
}

fn attributes_equal(left: &Attributes, right: &Attributes) -> bool {
    // IndexMap's own equality ignores order; attribute order is semantic
    // here, so compare the iteration sequences.
    left.len() == right.len() && left.iter().eq(right.iter())
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        attributes_equal(&self.prolog, &other.prolog) && self.root == other.root
    }
}

impl Eq for Document {}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && attributes_equal(&self.attributes, &other.attributes)
            && self.content == other.content
    }
}

impl Eq for Element {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_order_is_semantic() {
        let ab = Element::new("tag").with_attribute("a", "1").with_attribute("b", "2");
        let ba = Element::new("tag").with_attribute("b", "2").with_attribute("a", "1");
        assert_ne!(ab, ba);

        let ab2 = Element::new("tag").with_attribute("a", "1").with_attribute("b", "2");
        assert_eq!(ab, ab2);
    }

    #[test]
    fn test_prolog_order_is_semantic() {
        let root = Element::new("root");
        let first = Document::new(root.clone())
            .with_prolog_attribute("version", "1.0")
            .with_prolog_attribute("encoding", "utf-8");
        let second = Document::new(root)
            .with_prolog_attribute("encoding", "utf-8")
            .with_prolog_attribute("version", "1.0");
        assert_ne!(first, second);
    }

    #[test]
    fn test_node_equality_is_structural() {
        let left = Node::Element(Element::new("a").with_text("x"));
        let right = Node::Element(Element::new("a").with_text("x"));
        assert_eq!(left, right);
        assert_ne!(left, Node::Text("x".to_string()));
        assert_ne!(Node::Text("x".to_string()), Node::Comment("x".to_string()));
    }
}
