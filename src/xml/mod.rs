//! Parsed element-tree abstraction over the CVRF XML input.

mod element;
mod reader;

pub use element::Element;
pub use reader::{load_document, parse_document, XmlDocument};
