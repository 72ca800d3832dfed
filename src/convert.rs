//! Document orchestrator.
//!
//! Dispatches every top-level child of the CVRF root to its section
//! converter, then composes the fragments into the final CSAF document.
//! Dispatch is a closed mapping: one tag, one converter, so no two
//! converters can ever own the same output key.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::config::ConversionConfig;
use crate::sections::{
    run_section, AcknowledgmentsConverter, ConversionContext, DocumentLeafConverter,
    NotesConverter, ProductTreeConverter, PublisherConverter, ReferencesConverter,
    SectionConverter, TrackingConverter, VulnerabilityConverter,
};
use crate::xml::XmlDocument;

/// CVSS v3.x schema namespaces look like `.../cvss-v3.1/...`.
static CVSS3_NS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r".*cvss-v(3\.[01]).*").expect("static regex"));

/// The top-level CVRF tags the orchestrator dispatches on. Anything else
/// is skipped with an informational message, never a failure; unknown tags
/// must not break conversion of future CVRF revisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SectionKind {
    Acknowledgments,
    DocumentNotes,
    DocumentPublisher,
    DocumentReferences,
    DocumentTracking,
    ProductTree,
    Vulnerability,
}

impl SectionKind {
    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "Acknowledgments" => Some(Self::Acknowledgments),
            "DocumentNotes" => Some(Self::DocumentNotes),
            "DocumentPublisher" => Some(Self::DocumentPublisher),
            "DocumentReferences" => Some(Self::DocumentReferences),
            "DocumentTracking" => Some(Self::DocumentTracking),
            "ProductTree" => Some(Self::ProductTree),
            "Vulnerability" => Some(Self::Vulnerability),
            _ => None,
        }
    }
}

/// Outcome of a conversion run: the composed CSAF document, the failure
/// flag, and every warning/error message in emission order.
#[derive(Debug)]
pub struct CsafResult {
    pub csaf: Value,
    pub fatal: bool,
    pub messages: Vec<String>,
}

impl CsafResult {
    /// Whether the output may be written without an override.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.fatal
    }

    /// The tracking id of the converted document, when one was produced.
    #[must_use]
    pub fn tracking_id(&self) -> Option<&str> {
        self.csaf
            .get("document")
            .and_then(|document| document.get("tracking"))
            .and_then(|tracking| tracking.get("id"))
            .and_then(Value::as_str)
    }
}

/// Single-use converter for one CVRF document. Parallel conversion of
/// multiple documents requires one `DocumentConverter` per document; the
/// failure flag and all per-section state are local to the instance.
pub struct DocumentConverter {
    document_leaf: DocumentLeafConverter,
    acknowledgments: AcknowledgmentsConverter,
    notes: NotesConverter,
    publisher: PublisherConverter,
    references: ReferencesConverter,
    tracking: TrackingConverter,
    product_tree: ProductTreeConverter,
    vulnerability: VulnerabilityConverter,
}

impl DocumentConverter {
    #[must_use]
    pub fn new(config: &ConversionConfig) -> Self {
        Self {
            document_leaf: DocumentLeafConverter::new(config),
            acknowledgments: AcknowledgmentsConverter::new(),
            notes: NotesConverter::new(config.force),
            publisher: PublisherConverter::new(config),
            references: ReferencesConverter::new(config.force_insert_default_reference_category),
            tracking: TrackingConverter::new(config, env!("CARGO_PKG_VERSION")),
            product_tree: ProductTreeConverter::new(),
            vulnerability: VulnerabilityConverter::new(config),
        }
    }

    /// Derive the default CVSS v3.x version from the schema namespaces the
    /// document declares. Two conflicting candidates cancel the sniffing.
    fn sniff_cvss_version(&mut self, doc: &XmlDocument) {
        let mut candidate: Option<&str> = None;
        for namespace in &doc.namespaces {
            if let Some(captures) = CVSS3_NS_RE.captures(namespace) {
                let matched = captures.get(1).map_or("", |m| m.as_str());
                match candidate {
                    None => candidate = Some(matched),
                    Some(existing) if existing == matched => {}
                    Some(_) => return,
                }
            }
        }
        if let Some(version) = candidate {
            tracing::info!(
                "default CVSS v3.x version set to {version} based on document XML schemas"
            );
            self.vulnerability.set_default_cvss_version(version);
        }
    }

    /// Convert a parsed CVRF document into a CSAF 2.0 document.
    #[must_use]
    pub fn convert(mut self, doc: &XmlDocument) -> CsafResult {
        let mut ctx = ConversionContext::new();

        self.sniff_cvss_version(doc);

        // Document leaf elements are handled on the root itself; children
        // with deeper structure go through the dispatch table.
        run_section("document", &mut self.document_leaf, &doc.root, &mut ctx);

        for element in &doc.root.children {
            let Some(kind) = SectionKind::from_tag(&element.tag) else {
                tracing::info!("unhandled tag '{}' (line {})", element.tag, element.line);
                continue;
            };
            let converter: &mut dyn SectionConverter = match kind {
                SectionKind::Acknowledgments => &mut self.acknowledgments,
                SectionKind::DocumentNotes => &mut self.notes,
                SectionKind::DocumentPublisher => &mut self.publisher,
                SectionKind::DocumentReferences => &mut self.references,
                SectionKind::DocumentTracking => &mut self.tracking,
                SectionKind::ProductTree => &mut self.product_tree,
                SectionKind::Vulnerability => &mut self.vulnerability,
            };
            run_section(&element.tag, converter, element, &mut ctx);
        }

        let csaf = self.compose();
        CsafResult {
            csaf,
            fatal: ctx.is_fatal(),
            messages: ctx.messages().to_vec(),
        }
    }

    /// Merge the section fragments into the final document. Sections with
    /// empty content are omitted entirely.
    fn compose(&mut self) -> Value {
        let mut document = match self.document_leaf.take_output() {
            crate::sections::Fragment::Map(map) => map,
            crate::sections::Fragment::List(_) => Map::new(),
        };

        let document_sections = [
            ("publisher", self.publisher.take_output()),
            ("tracking", self.tracking.take_output()),
            ("notes", self.notes.take_output()),
            ("references", self.references.take_output()),
            ("acknowledgments", self.acknowledgments.take_output()),
        ];
        for (key, fragment) in document_sections {
            if let Some(value) = fragment.into_value() {
                document.insert(key.to_string(), value);
            }
        }

        let mut csaf = Map::new();
        csaf.insert("document".into(), Value::Object(document));
        if let Some(value) = self.product_tree.take_output().into_value() {
            csaf.insert("product_tree".into(), value);
        }
        if let Some(value) = self.vulnerability.take_output().into_value() {
            csaf.insert("vulnerabilities".into(), value);
        }
        Value::Object(csaf)
    }
}
