//! Owned element-tree model for the parsed CVRF document.
//!
//! The converters never touch the XML reader directly; they walk this
//! concrete tree instead. Tag names are namespace-stripped local names,
//! attribute lookups ignore namespace prefixes, and every element carries
//! the source line for diagnostics.

use crate::error::{ConvertError, Result};

/// A single XML element: local tag name, attributes, text content,
/// ordered children and the source line it started on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Local tag name with the namespace prefix stripped
    pub tag: String,
    /// Attributes with their raw (possibly prefixed) names
    pub attributes: Vec<(String, String)>,
    /// Concatenated, trimmed text content; `None` when the element is empty
    pub text: Option<String>,
    /// Child elements in document order
    pub children: Vec<Element>,
    /// Line number of the start tag in the source document
    pub line: u64,
}

impl Element {
    /// Create an element with no attributes, text or children.
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: Vec::new(),
            text: None,
            children: Vec::new(),
            line: 0,
        }
    }

    /// Look up an attribute by local name, ignoring any namespace prefix.
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| local_name(key) == name)
            .map(|(_, value)| value.as_str())
    }

    /// Look up an attribute by its raw, possibly prefixed name
    /// (e.g. `xml:lang`).
    #[must_use]
    pub fn attr_raw(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// First child with the given local tag name.
    #[must_use]
    pub fn child(&self, tag: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.tag == tag)
    }

    /// All children with the given local tag name, in document order.
    pub fn children_named<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Element> {
        self.children.iter().filter(move |c| c.tag == tag)
    }

    /// Whether at least one child with the given tag exists.
    #[must_use]
    pub fn has_child(&self, tag: &str) -> bool {
        self.child(tag).is_some()
    }

    /// Trimmed text content, if any.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// First child with the given tag, or a [`ConvertError::MissingElement`].
    pub fn require_child(&self, tag: &str) -> Result<&Element> {
        self.child(tag).ok_or_else(|| ConvertError::MissingElement {
            tag: tag.to_string(),
            parent: self.tag.clone(),
            line: self.line,
        })
    }

    /// Text content, or a [`ConvertError::MissingText`].
    pub fn require_text(&self) -> Result<&str> {
        self.text().ok_or_else(|| ConvertError::MissingText {
            tag: self.tag.clone(),
            line: self.line,
        })
    }

    /// Attribute value by local name, or a [`ConvertError::MissingAttribute`].
    pub fn require_attr(&self, name: &str) -> Result<&str> {
        self.attr(name).ok_or_else(|| ConvertError::MissingAttribute {
            name: name.to_string(),
            tag: self.tag.clone(),
            line: self.line,
        })
    }

    /// Depth-first walk over this element and all descendants.
    pub fn walk(&self, visit: &mut dyn FnMut(&Element)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }
}

/// Strip a namespace prefix from an attribute or tag name.
fn local_name(name: &str) -> &str {
    name.rsplit(':').next().unwrap_or(name)
}
