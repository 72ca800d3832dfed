//! Section converters: one per top-level CVRF subtree.
//!
//! Every converter follows the same contract: a mandatory phase and an
//! optional phase, each run through [`run_section`] so a failure in one
//! phase never prevents the other from running, and never unwinds past
//! the orchestrator. Converters report unrecoverable problems through the
//! [`ConversionContext`] instead of their return value, because any
//! converter at any depth may need to raise the failure flag.

mod acknowledgments;
mod document;
mod notes;
mod product_tree;
mod publisher;
mod references;
mod tracking;
mod vulnerability;

pub use acknowledgments::{convert_acknowledgments, AcknowledgmentsConverter};
pub use document::DocumentLeafConverter;
pub use notes::{convert_notes, NotesConverter};
pub use product_tree::ProductTreeConverter;
pub use publisher::PublisherConverter;
pub use references::{convert_references, ReferencesConverter};
pub use tracking::TrackingConverter;
pub use vulnerability::VulnerabilityConverter;

use serde_json::{Map, Value};

use crate::error::Result;
use crate::xml::Element;

/// Shared conversion state threaded through every converter call.
///
/// Holds the accumulated warnings and the process-wide failure flag. The
/// flag is monotone: once set it is never cleared, and it is consulted once
/// at the end of the run to decide whether the output is valid.
#[derive(Debug, Default)]
pub struct ConversionContext {
    warnings: Vec<String>,
    fatal: bool,
}

impl ConversionContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a tolerated problem. Conversion continues unaffected.
    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!("{message}");
        self.warnings.push(message);
    }

    /// Record an unrecoverable CSAF constraint violation and raise the
    /// failure flag.
    pub fn fail(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::error!("{message}");
        self.warnings.push(message);
        self.fatal = true;
    }

    /// Whether any converter raised the failure flag.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        self.fatal
    }

    /// All warnings and errors recorded so far, in emission order.
    #[must_use]
    pub fn messages(&self) -> &[String] {
        &self.warnings
    }
}

/// A converter's owned piece of the CSAF output document.
///
/// Sections produce either a mapping (publisher, tracking, product tree)
/// or a sequence (notes, references, acknowledgments, vulnerabilities).
/// Empty fragments are omitted from the final document entirely, which
/// makes "section absent" and "section present but empty" identical.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    Map(Map<String, Value>),
    List(Vec<Value>),
}

impl Fragment {
    #[must_use]
    pub fn map() -> Self {
        Self::Map(Map::new())
    }

    #[must_use]
    pub fn list() -> Self {
        Self::List(Vec::new())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Map(map) => map.is_empty(),
            Self::List(list) => list.is_empty(),
        }
    }

    /// Convert into a JSON value, or `None` when empty.
    #[must_use]
    pub fn into_value(self) -> Option<Value> {
        if self.is_empty() {
            return None;
        }
        Some(match self {
            Self::Map(map) => Value::Object(map),
            Self::List(list) => Value::Array(list),
        })
    }
}

/// Contract shared by all section converters.
///
/// `process_mandatory` handles fields whose absence or malformation is a
/// CSAF constraint violation; `process_optional` handles fields that are
/// silently omitted when absent. The phases are independent: both are
/// always attempted, and failures are logged separately.
pub trait SectionConverter {
    fn process_mandatory(&mut self, element: &Element, ctx: &mut ConversionContext) -> Result<()>;

    fn process_optional(&mut self, element: &Element, ctx: &mut ConversionContext) -> Result<()>;

    /// Take the fragment accumulated so far, leaving the converter empty.
    fn take_output(&mut self) -> Fragment;
}

/// Run both phases of a converter, capturing errors at this boundary.
///
/// A mandatory-phase error means a CSAF mandatory field could not be
/// produced, so it raises the failure flag; an optional-phase error is
/// logged as a warning. Neither aborts the rest of the conversion.
pub fn run_section(
    name: &str,
    converter: &mut dyn SectionConverter,
    element: &Element,
    ctx: &mut ConversionContext,
) {
    if let Err(e) = converter.process_mandatory(element, ctx) {
        ctx.fail(format!("processing mandatory elements of {name} failed: {e}"));
    }
    if let Err(e) = converter.process_optional(element, ctx) {
        ctx.warn(format!("processing optional elements of {name} failed: {e}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConvertError;

    struct FailingMandatory {
        csaf: Fragment,
    }

    impl SectionConverter for FailingMandatory {
        fn process_mandatory(&mut self, _: &Element, _: &mut ConversionContext) -> Result<()> {
            Err(ConvertError::invalid_value("field", "bad"))
        }

        fn process_optional(&mut self, _: &Element, _: &mut ConversionContext) -> Result<()> {
            if let Fragment::Map(map) = &mut self.csaf {
                map.insert("optional".into(), Value::Bool(true));
            }
            Ok(())
        }

        fn take_output(&mut self) -> Fragment {
            std::mem::replace(&mut self.csaf, Fragment::map())
        }
    }

    #[test]
    fn test_fragment_empty_is_omitted() {
        assert_eq!(Fragment::map().into_value(), None);
        assert_eq!(Fragment::list().into_value(), None);

        let mut map = Map::new();
        map.insert("k".into(), Value::Null);
        assert!(Fragment::Map(map).into_value().is_some());
    }

    #[test]
    fn test_mandatory_failure_does_not_stop_optional() {
        let mut converter = FailingMandatory {
            csaf: Fragment::map(),
        };
        let mut ctx = ConversionContext::new();
        let element = Element::new("Section");

        run_section("Section", &mut converter, &element, &mut ctx);

        assert!(ctx.is_fatal());
        // The optional phase still ran and produced output.
        let value = converter.take_output().into_value().expect("fragment");
        assert_eq!(value["optional"], Value::Bool(true));
    }

    #[test]
    fn test_fail_is_monotone() {
        let mut ctx = ConversionContext::new();
        assert!(!ctx.is_fatal());
        ctx.warn("just a warning");
        assert!(!ctx.is_fatal());
        ctx.fail("broken");
        assert!(ctx.is_fatal());
        ctx.warn("later warning");
        assert!(ctx.is_fatal());
        assert_eq!(ctx.messages().len(), 3);
    }
}
