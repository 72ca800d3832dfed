//! Converts acknowledgment lists.
//!
//! Used for both `/cvrf:cvrfdoc/cvrf:Acknowledgments` and the per-vulnerability
//! `vuln:Acknowledgments` subtrees, which share the same shape.

use serde_json::{Map, Value};

use crate::error::Result;
use crate::sections::{ConversionContext, Fragment, SectionConverter};
use crate::xml::Element;

/// Convert the `Acknowledgment` children of the given element.
///
/// CSAF allows only one organization per acknowledgment; extra CVRF
/// organizations are dropped with a warning naming the lost values.
/// Entries with none of name/organization/summary/url are skipped, since
/// empty `Acknowledgment` elements slip through CVRF input validation.
pub fn convert_acknowledgments(element: &Element, ctx: &mut ConversionContext) -> Vec<Value> {
    let mut acknowledgments = Vec::new();

    for ack in element.children_named("Acknowledgment") {
        let organizations: Vec<&str> = ack
            .children_named("Organization")
            .filter_map(Element::text)
            .collect();
        let names: Vec<&str> = ack.children_named("Name").filter_map(Element::text).collect();
        let urls: Vec<&str> = ack.children_named("URL").filter_map(Element::text).collect();
        let summary = ack.child("Description").and_then(Element::text);

        if organizations.is_empty() && names.is_empty() && urls.is_empty() && summary.is_none() {
            ctx.warn(format!(
                "skipping empty Acknowledgment entry, input line: {}",
                ack.line
            ));
            continue;
        }

        let mut entry = Map::new();

        if let Some((first, rest)) = organizations.split_first() {
            if !rest.is_empty() {
                ctx.warn(format!(
                    "CSAF 2.0 allows only one organization inside an acknowledgment; \
                     taking the first occurrence, ignoring: {rest:?}"
                ));
            }
            entry.insert("organization".into(), Value::String((*first).to_string()));
        }

        if let Some(summary) = summary {
            entry.insert("summary".into(), Value::String(summary.to_string()));
        }

        if !names.is_empty() {
            entry.insert(
                "names".into(),
                Value::Array(names.iter().map(|n| Value::String((*n).to_string())).collect()),
            );
        }

        if !urls.is_empty() {
            entry.insert(
                "urls".into(),
                Value::Array(urls.iter().map(|u| Value::String((*u).to_string())).collect()),
            );
        }

        acknowledgments.push(Value::Object(entry));
    }

    acknowledgments
}

/// Section converter wrapping [`convert_acknowledgments`] for the top-level
/// `Acknowledgments` tag.
#[derive(Default)]
pub struct AcknowledgmentsConverter {
    csaf: Vec<Value>,
}

impl AcknowledgmentsConverter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SectionConverter for AcknowledgmentsConverter {
    fn process_mandatory(&mut self, _element: &Element, _ctx: &mut ConversionContext) -> Result<()> {
        // No field is mandatory per cvrf.xsd 1.2.
        Ok(())
    }

    fn process_optional(&mut self, element: &Element, ctx: &mut ConversionContext) -> Result<()> {
        self.csaf = convert_acknowledgments(element, ctx);
        Ok(())
    }

    fn take_output(&mut self) -> Fragment {
        Fragment::List(std::mem::take(&mut self.csaf))
    }
}
