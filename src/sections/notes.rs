//! Converts note lists.
//!
//! Used for both `/cvrf:cvrfdoc/cvrf:DocumentNotes` and the per-vulnerability
//! `vuln:Notes` subtrees.

use serde_json::{Map, Value};

use crate::error::Result;
use crate::sections::{ConversionContext, Fragment, SectionConverter};
use crate::xml::Element;

/// Note categories accepted by CSAF 2.0.
const NOTE_CATEGORIES: [&str; 7] = [
    "description",
    "details",
    "faq",
    "general",
    "legal_disclaimer",
    "other",
    "summary",
];

/// Convert the `Note` children of the given element.
///
/// The CVRF `Type` attribute is matched case-insensitively with spaces and
/// underscores interchangeable. An unrecognized category escalates to the
/// failure flag unless `force` downgrades it to a warning; the note is kept
/// either way so a forced run loses nothing.
pub fn convert_notes(element: &Element, force: bool, ctx: &mut ConversionContext) -> Vec<Value> {
    let mut notes = Vec::new();

    for note in element.children_named("Note") {
        let Some(text) = note.text() else {
            ctx.fail(format!("Note without text content, input line: {}", note.line));
            continue;
        };
        let category = note
            .attr("Type")
            .unwrap_or("")
            .to_lowercase()
            .replace(' ', "_");

        if !NOTE_CATEGORIES.contains(&category.as_str()) {
            let message = format!(
                "invalid note category '{category}', should be one of: {}",
                NOTE_CATEGORIES.join(", ")
            );
            if force {
                ctx.warn(message);
            } else {
                ctx.fail(message);
            }
        }

        let mut entry = Map::new();
        entry.insert("text".into(), Value::String(text.to_string()));
        entry.insert("category".into(), Value::String(category));

        if let Some(audience) = note.attr("Audience") {
            entry.insert("audience".into(), Value::String(audience.to_string()));
        }
        if let Some(title) = note.attr("Title") {
            entry.insert("title".into(), Value::String(title.to_string()));
        }

        notes.push(Value::Object(entry));
    }

    notes
}

/// Section converter wrapping [`convert_notes`] for the top-level
/// `DocumentNotes` tag.
pub struct NotesConverter {
    force: bool,
    csaf: Vec<Value>,
}

impl NotesConverter {
    #[must_use]
    pub fn new(force: bool) -> Self {
        Self {
            force,
            csaf: Vec::new(),
        }
    }
}

impl SectionConverter for NotesConverter {
    fn process_mandatory(&mut self, element: &Element, ctx: &mut ConversionContext) -> Result<()> {
        self.csaf = convert_notes(element, self.force, ctx);
        Ok(())
    }

    fn process_optional(&mut self, _element: &Element, _ctx: &mut ConversionContext) -> Result<()> {
        // Audience and title are handled per note in the mandatory pass.
        Ok(())
    }

    fn take_output(&mut self) -> Fragment {
        Fragment::List(std::mem::take(&mut self.csaf))
    }
}
