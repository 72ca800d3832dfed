//! cvrf2csaf: CVRF 1.2 XML to CSAF 2.0 JSON converter.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use cvrf2csaf::{
    create_file_name, load_document, store_json, ConversionConfig, DocumentConverter,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cvrf2csaf")]
#[command(version)]
#[command(about = "Converts CVRF 1.2 XML input into CSAF 2.0 JSON output", long_about = None)]
struct Cli {
    /// CVRF XML input file to parse
    #[arg(long, value_name = "PATH")]
    input_file: PathBuf,

    /// CSAF output dir to write to. Filename is derived from /document/tracking/id
    #[arg(long, value_name = "PATH", default_value = "./")]
    output_dir: PathBuf,

    /// Optional YAML configuration file; command-line flags override it
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Additionally print CSAF JSON output on stdout
    #[arg(long)]
    print: bool,

    /// Produce output even if it is invalid (errors occurred during
    /// conversion). Target use case: best-effort conversion to JSON, fix
    /// the errors manually, e.g. in Secvisogram
    #[arg(long)]
    force: bool,

    /// Name of the publisher
    #[arg(long)]
    publisher_name: Option<String>,

    /// Namespace of the publisher. Must be a valid URI
    #[arg(long)]
    publisher_namespace: Option<String>,

    /// If the current version is not present in the revision history, add
    /// it (with a warning). By default an error is produced
    #[arg(long)]
    fix_insert_current_version_into_revision_history: bool,

    /// When the "Type" attribute is not present in a "Reference" element,
    /// force using the default value "external"
    #[arg(long)]
    force_insert_default_reference_category: bool,

    /// If a vector is not present in a CVSS ScoreSet, remove the whole
    /// ScoreSet instead of producing an error
    #[arg(long)]
    remove_cvss_values_without_vector: bool,

    /// Default version used for CVSS version 3, when the version cannot be
    /// derived from other sources
    #[arg(long)]
    default_cvss3_version: Option<String>,
}

impl Cli {
    /// Merge the config file (if any) with command-line overrides.
    fn into_config(self) -> Result<(ConversionConfig, PathBuf, PathBuf, bool)> {
        let mut config = match &self.config {
            Some(path) => ConversionConfig::from_yaml_file(path)
                .with_context(|| format!("loading config file {}", path.display()))?,
            None => ConversionConfig::default(),
        };

        if let Some(name) = self.publisher_name {
            config.publisher_name = name;
        }
        if let Some(namespace) = self.publisher_namespace {
            config.publisher_namespace = namespace;
        }
        if let Some(version) = self.default_cvss3_version {
            config.default_cvss3_version = version;
        }
        if self.fix_insert_current_version_into_revision_history {
            config.fix_insert_current_version_into_revision_history = true;
        }
        if self.force_insert_default_reference_category {
            config.force_insert_default_reference_category = true;
        }
        if self.remove_cvss_values_without_vector {
            config.remove_cvss_values_without_vector = true;
        }
        if self.force {
            config.force = true;
        }

        Ok((config, self.input_file, self.output_dir, self.print))
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let (config, input_file, output_dir, print) = cli.into_config()?;

    let doc = load_document(&input_file)
        .with_context(|| format!("failed to open input file {}", input_file.display()))?;

    let result = DocumentConverter::new(&config).convert(&doc);

    if !result.is_valid() {
        if config.force {
            tracing::warn!(
                "some errors occurred during conversion, but producing output as --force \
                 option is used"
            );
        } else {
            bail!("some error occurred during conversion, can't produce output; to override this, use --force");
        }
    }

    let file_name = create_file_name(result.tracking_id(), result.is_valid());
    let path = output_dir.join(file_name);
    store_json(&result.csaf, &path)?;

    if print {
        println!("{}", serde_json::to_string_pretty(&result.csaf)?);
    }
    Ok(())
}
