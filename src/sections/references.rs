//! Converts reference lists.
//!
//! Used for both `/cvrf:cvrfdoc/cvrf:DocumentReferences` and the
//! per-vulnerability `vuln:References` subtrees.

use serde_json::{Map, Value};

use crate::error::Result;
use crate::sections::{ConversionContext, Fragment, SectionConverter};
use crate::xml::Element;

/// Convert the `Reference` children of the given element.
///
/// When the source `Type` attribute is missing or empty, the CSAF category
/// defaults to "external" only if `force_default_category` is set;
/// otherwise the key is omitted.
pub fn convert_references(
    element: &Element,
    force_default_category: bool,
    ctx: &mut ConversionContext,
) -> Vec<Value> {
    let mut references = Vec::new();

    for reference in element.children_named("Reference") {
        let mut entry = Map::new();

        match reference.child("Description").and_then(Element::text) {
            Some(summary) => {
                entry.insert("summary".into(), Value::String(summary.to_string()));
            }
            None => ctx.fail(format!(
                "Reference without Description, input line: {}",
                reference.line
            )),
        }
        match reference.child("URL").and_then(Element::text) {
            Some(url) => {
                entry.insert("url".into(), Value::String(url.to_string()));
            }
            None => ctx.fail(format!(
                "Reference without URL, input line: {}",
                reference.line
            )),
        }

        match reference.attr("Type").filter(|t| !t.is_empty()) {
            Some(cvrf_type) => {
                entry.insert("category".into(), Value::String(cvrf_type.to_lowercase()));
            }
            None if force_default_category => {
                entry.insert("category".into(), Value::String("external".to_string()));
                tracing::info!(
                    "'Type' attribute not present in 'Reference' element, using default value \
                     'external'. This can be controlled by the \
                     'force_insert_default_reference_category' option."
                );
            }
            None => {}
        }

        references.push(Value::Object(entry));
    }

    references
}

/// Section converter wrapping [`convert_references`] for the top-level
/// `DocumentReferences` tag.
pub struct ReferencesConverter {
    force_default_category: bool,
    csaf: Vec<Value>,
}

impl ReferencesConverter {
    #[must_use]
    pub fn new(force_default_category: bool) -> Self {
        Self {
            force_default_category,
            csaf: Vec::new(),
        }
    }
}

impl SectionConverter for ReferencesConverter {
    fn process_mandatory(&mut self, element: &Element, ctx: &mut ConversionContext) -> Result<()> {
        self.csaf = convert_references(element, self.force_default_category, ctx);
        Ok(())
    }

    fn process_optional(&mut self, _element: &Element, _ctx: &mut ConversionContext) -> Result<()> {
        Ok(())
    }

    fn take_output(&mut self) -> Fragment {
        Fragment::List(std::mem::take(&mut self.csaf))
    }
}
