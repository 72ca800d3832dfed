//! Converts `/cvrf:cvrfdoc/cvrf:DocumentTracking` into `/document/tracking`,
//! including the revision-history reconciliation required by Conformance
//! Clause 5 (CVRF CSAF converter).
//!
//! CSAF requires every revision number to follow semantic versioning and the
//! document version to appear in the history. CVRF enforced neither, so the
//! reconciler validates, optionally repairs, and reindexes the history.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::config::{ConversionConfig, ENGINE_NAME};
use crate::error::{ConvertError, Result};
use crate::sections::{ConversionContext, Fragment, SectionConverter};
use crate::time::{now_utc_timestamp, utc_timestamp};
use crate::xml::Element;

/// version_t grammar from the CSAF 2.0 standard, section 3.1.11.
static SEMVER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^((0|[1-9]\d*)\.(0|[1-9]\d*)\.(0|[1-9]\d*)(?:-((?:0|[1-9]\d*|\d*[a-zA-Z-][0-9a-zA-Z-]*)(?:\.(?:0|[1-9]\d*|\d*[a-zA-Z-][0-9a-zA-Z-]*))*))?(?:\+([0-9a-zA-Z-]+(?:\.[0-9a-zA-Z-]+)*))?)$",
    )
    .expect("static regex")
});

/// A revision-history entry plus the transient reconciliation fields.
/// `number_cvrf` and `sort_key` never reach the output.
#[derive(Debug, Clone)]
struct Revision {
    date: Option<String>,
    number: String,
    summary: String,
    legacy_version: Option<String>,
    number_cvrf: String,
    sort_key: Vec<u64>,
}

impl Revision {
    fn into_value(self) -> Value {
        let mut entry = Map::new();
        entry.insert("date".into(), opt_string(self.date));
        entry.insert("number".into(), Value::String(self.number));
        entry.insert("summary".into(), Value::String(self.summary));
        if let Some(legacy) = self.legacy_version {
            entry.insert("legacy_version".into(), Value::String(legacy));
        }
        Value::Object(entry)
    }
}

fn opt_string(value: Option<String>) -> Value {
    value.map_or(Value::Null, Value::String)
}

/// Dotted-integer ordering key; any unparsable segment makes the whole
/// version sort last.
fn as_int_tuple(text: &str) -> Vec<u64> {
    text.split('.')
        .map(|part| part.parse::<u64>())
        .collect::<std::result::Result<Vec<u64>, _>>()
        .unwrap_or_else(|_| vec![u64::MAX])
}

/// Whether every revision number matches the version_t grammar.
fn all_semver(revisions: &[Revision]) -> bool {
    revisions.iter().all(|rev| SEMVER_RE.is_match(&rev.number))
}

/// CVRF tracking status to CSAF document status.
fn tracking_status(cvrf_status: &str) -> Option<&'static str> {
    match cvrf_status {
        "Final" => Some("final"),
        "Draft" => Some("draft"),
        "Interim" => Some("interim"),
        _ => None,
    }
}

pub struct TrackingConverter {
    engine_version: String,
    fix_insert_current_version: bool,
    csaf: Map<String, Value>,
}

impl TrackingConverter {
    #[must_use]
    pub fn new(config: &ConversionConfig, engine_version: &str) -> Self {
        Self {
            engine_version: engine_version.to_string(),
            fix_insert_current_version: config.fix_insert_current_version_into_revision_history,
            csaf: Map::new(),
        }
    }

    /// Strip leading/trailing whitespace and linebreaks from the tracking ID.
    fn clean_id(id: &str, ctx: &mut ConversionContext) -> String {
        let cleaned: String = id.trim().replace(['\r', '\n'], "");
        if cleaned != id {
            ctx.warn(
                "the ID string contained leading/trailing whitespace or linebreaks; \
                 these were removed",
            );
        }
        cleaned
    }

    fn collect_revisions(
        element: &Element,
        ctx: &mut ConversionContext,
    ) -> Result<Vec<Revision>> {
        let history = element.require_child("RevisionHistory")?;
        let mut revisions = Vec::new();
        for revision in history.children_named("Revision") {
            let number = revision.require_child("Number")?.require_text()?.to_string();
            revisions.push(Revision {
                date: utc_timestamp(revision.require_child("Date")?.require_text()?, ctx),
                summary: revision
                    .require_child("Description")?
                    .require_text()?
                    .to_string(),
                legacy_version: None,
                number_cvrf: number.clone(),
                sort_key: as_int_tuple(&number),
                number,
            });
        }
        Ok(revisions)
    }

    /// Produce the final `(revision_history, version)` pair.
    fn reconcile(
        &self,
        element: &Element,
        ctx: &mut ConversionContext,
    ) -> Result<(Vec<Revision>, String)> {
        let declared = element.require_child("Version")?.require_text()?.to_string();
        let mut revisions = Self::collect_revisions(element, ctx)?;
        let mut version = declared.clone();

        let mut current_missing = !revisions.iter().any(|rev| rev.number == declared);
        if current_missing {
            if self.fix_insert_current_version {
                ctx.warn(
                    "trying to fix the revision history by adding the current version; this \
                     may lead to inconsistent history. This happens because \
                     --fix-insert-current-version-into-revision-history is used",
                );
                let date = element
                    .child("CurrentReleaseDate")
                    .and_then(Element::text)
                    .and_then(|text| utc_timestamp(text, ctx));
                revisions.push(Revision {
                    date,
                    number: declared.clone(),
                    summary: format!(
                        "Added by {ENGINE_NAME} as the value was missing in the original CVRF."
                    ),
                    legacy_version: None,
                    number_cvrf: declared.clone(),
                    sort_key: as_int_tuple(&declared),
                });
                current_missing = false;
            } else {
                ctx.fail(
                    "current version is missing in revision history; this can be fixed by \
                     using --fix-insert-current-version-into-revision-history",
                );
            }
        }

        if !all_semver(&revisions) {
            if current_missing {
                // Hard stop: without the current version there is nothing to
                // resolve the reindexed version against. The unreindexed
                // history is still emitted best-effort.
                ctx.fail(
                    "can not reindex revision history to integers because the current version \
                     is missing; this can be fixed with \
                     --fix-insert-current-version-into-revision-history",
                );
            } else {
                ctx.warn(
                    "some version numbers in revision_history do not match semantic \
                     versioning; reindexing to integers",
                );
                revisions.sort_by(|a, b| a.sort_key.cmp(&b.sort_key));
                for (index, revision) in revisions.iter_mut().enumerate() {
                    revision.number = (index + 1).to_string();
                    revision.legacy_version = Some(revision.number_cvrf.clone());
                }
                version = revisions
                    .iter()
                    .find(|rev| rev.number_cvrf == declared)
                    .map(|rev| rev.number.clone())
                    .ok_or_else(|| {
                        ConvertError::invalid_value("document version", declared.clone())
                    })?;
            }
        }

        Ok((revisions, version))
    }
}

impl SectionConverter for TrackingConverter {
    fn process_mandatory(&mut self, element: &Element, ctx: &mut ConversionContext) -> Result<()> {
        let identification = element.require_child("Identification")?;
        let id = identification.require_child("ID")?.require_text()?;
        self.csaf
            .insert("id".into(), Value::String(Self::clean_id(id, ctx)));

        let current = element.require_child("CurrentReleaseDate")?.require_text()?;
        self.csaf.insert(
            "current_release_date".into(),
            opt_string(utc_timestamp(current, ctx)),
        );
        let initial = element.require_child("InitialReleaseDate")?.require_text()?;
        self.csaf.insert(
            "initial_release_date".into(),
            opt_string(utc_timestamp(initial, ctx)),
        );

        let status = element.require_child("Status")?.require_text()?;
        let status = tracking_status(status)
            .ok_or_else(|| ConvertError::invalid_value("tracking status", status))?;
        self.csaf
            .insert("status".into(), Value::String(status.to_string()));

        let (revisions, version) = self.reconcile(element, ctx)?;
        self.csaf.insert(
            "revision_history".into(),
            Value::Array(revisions.into_iter().map(Revision::into_value).collect()),
        );
        self.csaf.insert("version".into(), Value::String(version));

        // The generator block describes this converter, not the source.
        let mut engine = Map::new();
        engine.insert("name".into(), Value::String(ENGINE_NAME.to_string()));
        engine.insert(
            "version".into(),
            Value::String(self.engine_version.clone()),
        );
        let mut generator = Map::new();
        generator.insert("date".into(), Value::String(now_utc_timestamp()));
        generator.insert("engine".into(), Value::Object(engine));
        self.csaf.insert("generator".into(), Value::Object(generator));

        Ok(())
    }

    fn process_optional(&mut self, element: &Element, _ctx: &mut ConversionContext) -> Result<()> {
        if let Some(identification) = element.child("Identification") {
            let aliases: Vec<Value> = identification
                .children_named("Alias")
                .filter_map(Element::text)
                .map(|alias| Value::String(alias.to_string()))
                .collect();
            if !aliases.is_empty() {
                self.csaf.insert("aliases".into(), Value::Array(aliases));
            }
        }
        Ok(())
    }

    fn take_output(&mut self) -> Fragment {
        Fragment::Map(std::mem::take(&mut self.csaf))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sections::run_section;
    use crate::xml::parse_document;

    fn tracking_xml(version: &str, revisions: &[(&str, &str)]) -> String {
        let revisions: String = revisions
            .iter()
            .map(|(number, date)| {
                format!(
                    "<Revision><Number>{number}</Number><Date>{date}</Date>\
                     <Description>rev {number}</Description></Revision>"
                )
            })
            .collect();
        format!(
            "<DocumentTracking>
               <Identification><ID>EXAMPLE-2021-001</ID></Identification>
               <Status>Final</Status>
               <Version>{version}</Version>
               <RevisionHistory>{revisions}</RevisionHistory>
               <InitialReleaseDate>2021-01-01T10:00:00Z</InitialReleaseDate>
               <CurrentReleaseDate>2021-02-01T10:00:00Z</CurrentReleaseDate>
             </DocumentTracking>"
        )
    }

    fn convert(xml: &str, fix_insert: bool) -> (Map<String, Value>, ConversionContext) {
        let doc = parse_document(xml).expect("parse");
        let config = ConversionConfig {
            fix_insert_current_version_into_revision_history: fix_insert,
            ..ConversionConfig::default()
        };
        let mut converter = TrackingConverter::new(&config, "0.1.0");
        let mut ctx = ConversionContext::new();
        run_section("DocumentTracking", &mut converter, &doc.root, &mut ctx);
        let Fragment::Map(map) = converter.take_output() else {
            panic!("expected map fragment");
        };
        (map, ctx)
    }

    #[test]
    fn test_semver_history_is_untouched() {
        let xml = tracking_xml(
            "1.1.0",
            &[("1.0.0", "2021-01-01T10:00:00Z"), ("1.1.0", "2021-02-01T10:00:00Z")],
        );
        let (csaf, ctx) = convert(&xml, false);

        assert!(!ctx.is_fatal());
        assert_eq!(csaf["version"], "1.1.0");
        let history = csaf["revision_history"].as_array().expect("history");
        assert_eq!(history.len(), 2);
        assert_eq!(history[0]["number"], "1.0.0");
        assert_eq!(history[1]["number"], "1.1.0");
        assert!(history[0].get("legacy_version").is_none());
    }

    #[test]
    fn test_non_semver_history_reindexed_with_legacy_version() {
        let xml = tracking_xml(
            "2",
            &[("2", "2021-02-01T10:00:00Z"), ("1", "2021-01-01T10:00:00Z")],
        );
        let (csaf, ctx) = convert(&xml, false);

        assert!(!ctx.is_fatal());
        let history = csaf["revision_history"].as_array().expect("history");
        // sorted ascending by the numeric tuple, renumbered from 1
        assert_eq!(history[0]["number"], "1");
        assert_eq!(history[0]["legacy_version"], "1");
        assert_eq!(history[1]["number"], "2");
        assert_eq!(history[1]["legacy_version"], "2");
        assert_eq!(csaf["version"], "2");
    }

    #[test]
    fn test_reindex_resolves_renumbered_version() {
        let xml = tracking_xml(
            "1.2",
            &[("1.0", "2021-01-01T10:00:00Z"), ("1.2", "2021-02-01T10:00:00Z")],
        );
        let (csaf, ctx) = convert(&xml, false);

        assert!(!ctx.is_fatal());
        assert_eq!(csaf["version"], "2");
        let history = csaf["revision_history"].as_array().expect("history");
        assert_eq!(history[1]["legacy_version"], "1.2");
    }

    #[test]
    fn test_missing_version_with_repair_synthesizes_entry() {
        let xml = tracking_xml("1.1.0", &[("1.0.0", "2021-01-01T10:00:00Z")]);
        let (csaf, ctx) = convert(&xml, true);

        assert!(!ctx.is_fatal());
        let history = csaf["revision_history"].as_array().expect("history");
        assert_eq!(history.len(), 2);
        assert_eq!(history[1]["number"], "1.1.0");
        assert_eq!(history[1]["date"], "2021-02-01T10:00:00.000+00:00");
        assert!(history[1]["summary"]
            .as_str()
            .expect("summary")
            .contains("Added by cvrf2csaf"));
        assert_eq!(csaf["version"], "1.1.0");
    }

    #[test]
    fn test_missing_version_without_repair_raises_flag() {
        let xml = tracking_xml("1.1.0", &[("1.0.0", "2021-01-01T10:00:00Z")]);
        let (csaf, ctx) = convert(&xml, false);

        assert!(ctx.is_fatal());
        // best-effort: history and declared version are still emitted
        assert_eq!(csaf["version"], "1.1.0");
        assert_eq!(csaf["revision_history"].as_array().expect("history").len(), 1);
    }

    #[test]
    fn test_missing_version_and_non_semver_is_a_hard_stop() {
        let xml = tracking_xml("3", &[("1", "2021-01-01T10:00:00Z")]);
        let (csaf, ctx) = convert(&xml, false);

        assert!(ctx.is_fatal());
        // no reindexing happened
        let history = csaf["revision_history"].as_array().expect("history");
        assert_eq!(history[0]["number"], "1");
        assert!(history[0].get("legacy_version").is_none());
        assert_eq!(csaf["version"], "3");
    }

    #[test]
    fn test_status_and_generator() {
        let xml = tracking_xml("1.0.0", &[("1.0.0", "2021-01-01T10:00:00Z")]);
        let (csaf, _ctx) = convert(&xml, false);

        assert_eq!(csaf["status"], "final");
        assert_eq!(csaf["generator"]["engine"]["name"], "cvrf2csaf");
        assert_eq!(csaf["generator"]["engine"]["version"], "0.1.0");
        assert_eq!(csaf["id"], "EXAMPLE-2021-001");
    }

    #[test]
    fn test_id_whitespace_cleaned_with_warning() {
        let mut ctx = ConversionContext::new();
        let cleaned = TrackingConverter::clean_id(" EX-1\n", &mut ctx);
        assert_eq!(cleaned, "EX-1");
        assert_eq!(ctx.messages().len(), 1);

        let mut quiet = ConversionContext::new();
        assert_eq!(TrackingConverter::clean_id("EX-1", &mut quiet), "EX-1");
        assert!(quiet.messages().is_empty());
    }

    #[test]
    fn test_unknown_status_raises_flag() {
        let xml = tracking_xml("1.0.0", &[("1.0.0", "2021-01-01T10:00:00Z")])
            .replace("Final", "Obsolete");
        let (_, ctx) = convert(&xml, false);
        assert!(ctx.is_fatal());
    }

    #[test]
    fn test_as_int_tuple_unparsable_sorts_last() {
        assert_eq!(as_int_tuple("1.2.3"), vec![1, 2, 3]);
        assert_eq!(as_int_tuple("1.0-beta"), vec![u64::MAX]);
        assert!(as_int_tuple("glibc-2.1") > as_int_tuple("99.99.99"));
    }

    #[test]
    fn test_semver_grammar() {
        for good in ["0.0.1", "1.0.0", "1.0.0-alpha.1", "1.0.0+build.5", "10.20.30"] {
            assert!(SEMVER_RE.is_match(good), "{good} should match");
        }
        for bad in ["1", "1.0", "01.0.0", "1.0.0 ", "v1.0.0", "1.0.0-"] {
            assert!(!SEMVER_RE.is_match(bad), "{bad} should not match");
        }
    }
}
