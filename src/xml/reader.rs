//! quick-xml based loader that turns a CVRF document into an [`Element`] tree.
//!
//! XML-Schema validation of the input is an external concern; this reader
//! only builds the tree the converters walk. Namespace declarations are
//! collected separately so the orchestrator can sniff the CVSS v3.x schema
//! version in use.

use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{ConvertError, Result};
use crate::xml::Element;

/// A parsed CVRF document: the root element plus every namespace URI
/// declared anywhere in the document.
#[derive(Debug, Clone)]
pub struct XmlDocument {
    pub root: Element,
    pub namespaces: Vec<String>,
}

/// Read and parse a CVRF file from disk.
pub fn load_document(path: &Path) -> Result<XmlDocument> {
    let content =
        std::fs::read_to_string(path).map_err(|e| ConvertError::io(path.to_path_buf(), e))?;
    parse_document(&content)
}

/// Parse a CVRF document from string content.
pub fn parse_document(content: &str) -> Result<XmlDocument> {
    let mut reader = Reader::from_str(content);
    let mut namespaces: Vec<String> = Vec::new();
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    // Incremental line tracking: every event moves the reader forward, so
    // newlines only need to be counted once.
    let mut scanned: usize = 0;
    let mut line: u64 = 1;
    let advance = |pos: usize, line: &mut u64, scanned: &mut usize| {
        let pos = pos.min(content.len());
        if pos > *scanned {
            *line += content[*scanned..pos].bytes().filter(|b| *b == b'\n').count() as u64;
            *scanned = pos;
        }
        *line
    };

    loop {
        match reader.read_event() {
            Ok(Event::Start(start)) => {
                let line = advance(reader.buffer_position() as usize, &mut line, &mut scanned);
                stack.push(element_from_start(&start, line, &mut namespaces)?);
            }
            Ok(Event::Empty(start)) => {
                let line = advance(reader.buffer_position() as usize, &mut line, &mut scanned);
                let element = element_from_start(&start, line, &mut namespaces)?;
                attach(element, &mut stack, &mut root)?;
            }
            Ok(Event::Text(text)) => {
                let value = text
                    .unescape()
                    .map_err(|e| ConvertError::Xml(e.to_string()))?;
                append_text(&mut stack, &value);
            }
            Ok(Event::CData(data)) => {
                let value = String::from_utf8_lossy(&data.into_inner()).into_owned();
                append_text(&mut stack, &value);
            }
            Ok(Event::End(_)) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| ConvertError::Xml("unbalanced end tag".into()))?;
                attach(element, &mut stack, &mut root)?;
            }
            Ok(Event::Eof) => break,
            // Declarations, comments, processing instructions and doctypes
            // carry nothing the converters need.
            Ok(_) => {}
            Err(e) => return Err(ConvertError::Xml(e.to_string())),
        }
    }

    if !stack.is_empty() {
        return Err(ConvertError::Xml("unexpected end of document".into()));
    }

    root.ok_or_else(|| ConvertError::Xml("document has no root element".into()))
        .map(|root| XmlDocument { root, namespaces })
}

fn element_from_start(
    start: &BytesStart<'_>,
    line: u64,
    namespaces: &mut Vec<String>,
) -> Result<Element> {
    let tag = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
    let mut attributes = Vec::new();

    for attr in start.attributes() {
        let attr = attr.map_err(|e| ConvertError::Xml(e.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| ConvertError::Xml(e.to_string()))?
            .into_owned();

        // xmlns declarations are recorded for schema sniffing, not exposed
        // as element attributes.
        if key == "xmlns" || key.starts_with("xmlns:") {
            if !namespaces.contains(&value) {
                namespaces.push(value);
            }
            continue;
        }
        attributes.push((key, value));
    }

    Ok(Element {
        tag,
        attributes,
        text: None,
        children: Vec::new(),
        line,
    })
}

fn append_text(stack: &mut [Element], value: &str) {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return;
    }
    if let Some(current) = stack.last_mut() {
        match &mut current.text {
            Some(existing) => existing.push_str(trimmed),
            None => current.text = Some(trimmed.to_string()),
        }
    }
}

fn attach(element: Element, stack: &mut Vec<Element>, root: &mut Option<Element>) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => {
            if root.is_some() {
                return Err(ConvertError::Xml("multiple root elements".into()));
            }
            *root = Some(element);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<cvrf:cvrfdoc xmlns:cvrf="http://docs.oasis-open.org/csaf/ns/csaf-cvrf/v1.2/cvrf"
              xmlns:vuln="http://docs.oasis-open.org/csaf/ns/csaf-cvrf/v1.2/vuln">
  <cvrf:DocumentTitle xml:lang="en">Test advisory</cvrf:DocumentTitle>
  <cvrf:DocumentType>Security Notice</cvrf:DocumentType>
  <cvrf:DocumentPublisher Type="Vendor">
    <cvrf:ContactDetails>security@example.com</cvrf:ContactDetails>
  </cvrf:DocumentPublisher>
</cvrf:cvrfdoc>
"#;

    #[test]
    fn test_parse_strips_namespaces() {
        let doc = parse_document(SAMPLE).expect("parse failed");
        assert_eq!(doc.root.tag, "cvrfdoc");
        assert_eq!(
            doc.root.child("DocumentTitle").and_then(Element::text),
            Some("Test advisory")
        );
        assert_eq!(
            doc.root
                .child("DocumentPublisher")
                .and_then(|p| p.attr("Type")),
            Some("Vendor")
        );
    }

    #[test]
    fn test_namespaces_collected() {
        let doc = parse_document(SAMPLE).expect("parse failed");
        assert_eq!(doc.namespaces.len(), 2);
        assert!(doc.namespaces[0].contains("csaf-cvrf"));
    }

    #[test]
    fn test_xml_lang_kept_as_attribute() {
        let doc = parse_document(SAMPLE).expect("parse failed");
        let title = doc.root.child("DocumentTitle").expect("title");
        assert_eq!(title.attr_raw("xml:lang"), Some("en"));
    }

    #[test]
    fn test_line_numbers_ascend() {
        let doc = parse_document(SAMPLE).expect("parse failed");
        let title = doc.root.child("DocumentTitle").expect("title");
        let publisher = doc.root.child("DocumentPublisher").expect("publisher");
        assert!(title.line > doc.root.line);
        assert!(publisher.line > title.line);
    }

    #[test]
    fn test_malformed_input_is_an_error() {
        assert!(parse_document("<a><b></a>").is_err());
        assert!(parse_document("").is_err());
    }

    #[test]
    fn test_nested_text_and_empty_elements() {
        let doc =
            parse_document("<r><a>one</a><b/><c> padded </c></r>").expect("parse failed");
        assert_eq!(doc.root.children.len(), 3);
        assert_eq!(doc.root.child("b").and_then(Element::text), None);
        assert_eq!(doc.root.child("c").and_then(Element::text), Some("padded"));
    }
}
