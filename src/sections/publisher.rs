//! Converts `/cvrf:cvrfdoc/cvrf:DocumentPublisher` into `/document/publisher`.

use serde_json::{Map, Value};

use crate::config::ConversionConfig;
use crate::error::Result;
use crate::sections::{ConversionContext, Fragment, SectionConverter};
use crate::xml::Element;

pub struct PublisherConverter {
    name: String,
    namespace: String,
    csaf: Map<String, Value>,
}

impl PublisherConverter {
    #[must_use]
    pub fn new(config: &ConversionConfig) -> Self {
        Self {
            name: config.publisher_name.clone(),
            namespace: config.publisher_namespace.clone(),
            csaf: Map::new(),
        }
    }
}

/// CVRF publisher type to CSAF publisher category.
fn publisher_category(cvrf_type: &str) -> Option<&'static str> {
    match cvrf_type {
        "Vendor" => Some("vendor"),
        "Coordinator" => Some("coordinator"),
        "User" => Some("user"),
        "Discoverer" => Some("discoverer"),
        "Other" => Some("other"),
        _ => None,
    }
}

impl SectionConverter for PublisherConverter {
    fn process_mandatory(&mut self, element: &Element, ctx: &mut ConversionContext) -> Result<()> {
        // Name and namespace come from configuration, not the source tree.
        self.csaf
            .insert("name".into(), Value::String(self.name.clone()));
        self.csaf
            .insert("namespace".into(), Value::String(self.namespace.clone()));

        let cvrf_type = element.require_attr("Type")?;
        match publisher_category(cvrf_type) {
            Some(category) => {
                self.csaf
                    .insert("category".into(), Value::String(category.to_string()));
            }
            None => {
                // Keep name/namespace so a forced run still produces
                // reviewable output; the category key is omitted.
                ctx.fail(format!(
                    "invalid publisher type '{cvrf_type}' (line {})",
                    element.line
                ));
            }
        }
        Ok(())
    }

    fn process_optional(&mut self, element: &Element, _ctx: &mut ConversionContext) -> Result<()> {
        if let Some(contact) = element.child("ContactDetails").and_then(Element::text) {
            self.csaf
                .insert("contact_details".into(), Value::String(contact.to_string()));
        }
        if let Some(authority) = element.child("IssuingAuthority").and_then(Element::text) {
            self.csaf.insert(
                "issuing_authority".into(),
                Value::String(authority.to_string()),
            );
        }
        Ok(())
    }

    fn take_output(&mut self) -> Fragment {
        Fragment::Map(std::mem::take(&mut self.csaf))
    }
}
