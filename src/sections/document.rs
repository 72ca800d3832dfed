//! Converts the document leaf elements, handled on the CVRF root itself:
//! `csaf_version`, `category`, `title`, `distribution`, `aggregate_severity`
//! and the derived `lang`.

use serde_json::{Map, Value};

use crate::config::ConversionConfig;
use crate::error::Result;
use crate::sections::{ConversionContext, Fragment, SectionConverter};
use crate::xml::Element;

/// Profile names CSAF 2.0 attaches special semantics to. A free-text CVRF
/// document type that is merely a case/punctuation variant of one of these
/// is folded onto the canonical spelling.
const PROTECTED_PROFILES: [&str; 4] = [
    "Informational Advisory",
    "security-incident-response",
    "Security Advisory",
    "veX",
];

/// Edit distances below this count as a collision.
const COLLISION_DISTANCE: usize = 3;

/// Profiles shorter than this (normalized) are only matched exactly;
/// edit distance is meaningless for strings as short as "vex".
const MIN_FUZZY_LENGTH: usize = 5;

pub struct DocumentLeafConverter {
    csaf_version: String,
    csaf: Map<String, Value>,
}

impl DocumentLeafConverter {
    #[must_use]
    pub fn new(config: &ConversionConfig) -> Self {
        Self {
            csaf_version: config.csaf_version.clone(),
            csaf: Map::new(),
        }
    }
}

/// Case/punctuation-insensitive normalization used for profile comparison.
fn normalize_category(input: &str) -> String {
    input
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            '_' | '-' | '.' | '/' => ' ',
            other => other,
        })
        .collect()
}

/// Fold case/punctuation variants of a protected profile name onto the
/// canonical profile string, leaving unrelated free text untouched.
fn resolve_category(input: &str, ctx: &mut ConversionContext) -> String {
    let normalized = normalize_category(input);

    let mut best: Option<(&str, usize)> = None;
    for profile in PROTECTED_PROFILES {
        let distance = strsim::levenshtein(&normalized, &normalize_category(profile));
        if best.map_or(true, |(_, d)| distance < d) {
            best = Some((profile, distance));
        }
    }

    if let Some((profile, distance)) = best {
        let exact = normalized == normalize_category(profile);
        let fuzzy =
            distance < COLLISION_DISTANCE && normalize_category(profile).len() > MIN_FUZZY_LENGTH;
        if exact || fuzzy {
            if profile != input {
                ctx.warn(format!(
                    "document category '{input}' is too close to the profile '{profile}'; \
                     using the canonical profile name"
                ));
            }
            return profile.to_string();
        }
    }

    input.to_string()
}

impl SectionConverter for DocumentLeafConverter {
    fn process_mandatory(&mut self, root: &Element, ctx: &mut ConversionContext) -> Result<()> {
        // csaf_version is new in CSAF, not present in CVRF.
        self.csaf
            .insert("csaf_version".into(), Value::String(self.csaf_version.clone()));

        let category = root.require_child("DocumentType")?.require_text()?;
        self.csaf.insert(
            "category".into(),
            Value::String(resolve_category(category, ctx)),
        );

        let title = root.require_child("DocumentTitle")?.require_text()?;
        self.csaf.insert("title".into(), Value::String(title.to_string()));
        Ok(())
    }

    fn process_optional(&mut self, root: &Element, ctx: &mut ConversionContext) -> Result<()> {
        if let Some(text) = root.child("DocumentDistribution").and_then(Element::text) {
            let mut distribution = Map::new();
            distribution.insert("text".into(), Value::String(text.to_string()));
            self.csaf
                .insert("distribution".into(), Value::Object(distribution));
        }

        if let Some(severity) = root.child("AggregateSeverity") {
            if let Some(text) = severity.text() {
                let mut aggregate = Map::new();
                aggregate.insert("text".into(), Value::String(text.to_string()));
                if let Some(namespace) = severity.attr("Namespace") {
                    aggregate.insert("namespace".into(), Value::String(namespace.to_string()));
                }
                self.csaf
                    .insert("aggregate_severity".into(), Value::Object(aggregate));
            }
        }

        self.process_xml_lang(root, ctx);
        Ok(())
    }

    fn take_output(&mut self) -> Fragment {
        Fragment::Map(std::mem::take(&mut self.csaf))
    }
}

impl DocumentLeafConverter {
    /// Derive `lang` from the distinct `xml:lang` attributes anywhere in the
    /// tree: exactly one distinct value is used, zero or multiple are
    /// reported and the field is omitted.
    fn process_xml_lang(&mut self, root: &Element, ctx: &mut ConversionContext) {
        let mut langs: Vec<String> = Vec::new();
        root.walk(&mut |element| {
            if let Some(lang) = element.attr_raw("xml:lang") {
                if !langs.iter().any(|l| l == lang) {
                    langs.push(lang.to_string());
                }
            }
        });

        match langs.as_slice() {
            [lang] => {
                self.csaf.insert("lang".into(), Value::String(lang.clone()));
            }
            [] => ctx.warn(
                "could not determine value for 'lang': no language specified in XML".to_string(),
            ),
            many => ctx.warn(format!(
                "could not determine value for 'lang': multiple languages specified in XML: {}. \
                 A document with multiple languages might have been produced",
                many.join(", ")
            )),
        }
    }
}
