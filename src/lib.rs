//! **Converts CVRF 1.2 XML security advisories into CSAF 2.0 JSON.**
//!
//! CVRF and CSAF are competing standards for describing vulnerabilities,
//! affected products and remediation guidance. This crate maps each CVRF
//! section onto its CSAF counterpart while enforcing the structural
//! constraints CSAF added: closed enumerations, semantic versioning of the
//! revision history, and uniqueness of sub-elements CVRF allowed to repeat.
//!
//! ## Core Concepts & Modules
//!
//! - **[`xml`]**: Parses the CVRF input into an owned element tree
//!   (namespace-stripped tags, attributes, text, children, source lines)
//!   that the converters walk.
//! - **[`sections`]**: One converter per top-level CVRF subtree, all
//!   following the same mandatory/optional two-phase contract. Problems are
//!   reported through a shared [`sections::ConversionContext`]: warnings
//!   are tolerated, CSAF constraint violations raise a monotone failure
//!   flag.
//! - **[`convert`]**: The [`DocumentConverter`] orchestrator dispatches
//!   top-level tags to their converters and composes the fragments into the
//!   final document.
//! - **[`output`]**: CSAF file naming (including the `_invalid` marker for
//!   forced output) and JSON writing.
//!
//! ## Getting Started
//!
//! ```no_run
//! use cvrf2csaf::{ConversionConfig, DocumentConverter, load_document};
//! use std::path::Path;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let doc = load_document(Path::new("advisory.cvrf.xml"))?;
//!
//!     let config = ConversionConfig {
//!         publisher_name: "Example Corp".into(),
//!         publisher_namespace: "https://example.com".into(),
//!         ..ConversionConfig::default()
//!     };
//!     let result = DocumentConverter::new(&config).convert(&doc);
//!
//!     if result.is_valid() {
//!         println!("{}", serde_json::to_string_pretty(&result.csaf)?);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! Validating the input against the CVRF XML schema and the output against
//! the CSAF JSON schema are external concerns; the converter consumes an
//! already-parsed tree and produces a serializable document.

// Lint to discourage unwrap() in production code - prefer explicit error handling
#![warn(clippy::unwrap_used)]

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod sections;
pub mod time;
pub mod xml;

// Re-export main types for convenience
pub use config::{ConversionConfig, ENGINE_NAME};
pub use convert::{CsafResult, DocumentConverter};
pub use error::{ConvertError, Result};
pub use output::{create_file_name, store_json};
pub use sections::{ConversionContext, Fragment, SectionConverter};
pub use xml::{load_document, parse_document, Element, XmlDocument};
