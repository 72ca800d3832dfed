//! Converts the repeating `/cvrf:cvrfdoc/vuln:Vulnerability` sections into
//! the `/vulnerabilities` sequence.
//!
//! The converter is invoked once per `Vulnerability` element and accumulates
//! one output entry per call. Notes, references and acknowledgments reuse
//! the shared leaf-section logic.

use serde_json::{Map, Number, Value};

use crate::config::ConversionConfig;
use crate::error::Result;
use crate::sections::{
    convert_acknowledgments, convert_notes, convert_references, ConversionContext, Fragment,
    SectionConverter,
};
use crate::time::utc_timestamp;
use crate::xml::Element;

pub struct VulnerabilityConverter {
    force: bool,
    force_default_reference_category: bool,
    remove_cvss_values_without_vector: bool,
    default_cvss_version: String,
    csaf: Vec<Value>,
}

impl VulnerabilityConverter {
    #[must_use]
    pub fn new(config: &ConversionConfig) -> Self {
        Self {
            force: config.force,
            force_default_reference_category: config.force_insert_default_reference_category,
            remove_cvss_values_without_vector: config.remove_cvss_values_without_vector,
            default_cvss_version: config.default_cvss3_version.clone(),
            csaf: Vec::new(),
        }
    }

    /// Override the CVSS v3.x version hint, e.g. after schema sniffing.
    pub fn set_default_cvss_version(&mut self, version: impl Into<String>) {
        self.default_cvss_version = version.into();
    }
}

fn involvement_party(cvrf: &str) -> Option<&'static str> {
    match cvrf {
        "Coordinator" => Some("coordinator"),
        "Discoverer" => Some("discoverer"),
        "Other" => Some("other"),
        "User" => Some("user"),
        "Vendor" => Some("vendor"),
        _ => None,
    }
}

fn involvement_status(cvrf: &str) -> Option<&'static str> {
    match cvrf {
        "Completed" => Some("completed"),
        "Contact Attempted" => Some("contact_attempted"),
        "Disputed" => Some("disputed"),
        "In Progress" => Some("in_progress"),
        "Not Contacted" => Some("not_contacted"),
        "Open" => Some("open"),
        _ => None,
    }
}

fn product_status_key(cvrf: &str) -> Option<&'static str> {
    match cvrf {
        "First Affected" => Some("first_affected"),
        "First Fixed" => Some("first_fixed"),
        "Fixed" => Some("fixed"),
        "Known Affected" => Some("known_affected"),
        "Known Not Affected" => Some("known_not_affected"),
        "Last Affected" => Some("last_affected"),
        "Recommended" => Some("recommended"),
        _ => None,
    }
}

fn threat_category(cvrf: &str) -> Option<&'static str> {
    match cvrf {
        "Impact" => Some("impact"),
        "Exploit Status" => Some("exploit_status"),
        "Target Set" => Some("target_set"),
        _ => None,
    }
}

fn remediation_category(cvrf: &str) -> Option<&'static str> {
    match cvrf {
        "Workaround" => Some("workaround"),
        "Mitigation" => Some("mitigation"),
        "Vendor Fix" => Some("vendor_fix"),
        "None Available" => Some("none_available"),
        "Will Not Fix" => Some("no_fix_planned"),
        _ => None,
    }
}

/// CVSS v3.x base severity derived from the base score.
fn cvss_v3_severity(score: f64) -> &'static str {
    if score <= 0.0 {
        "NONE"
    } else if score < 4.0 {
        "LOW"
    } else if score < 7.0 {
        "MEDIUM"
    } else if score < 9.0 {
        "HIGH"
    } else {
        "CRITICAL"
    }
}

fn number_value(text: &str) -> Option<Value> {
    text.trim()
        .parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
}

fn string_list(element: &Element, tag: &str) -> Vec<Value> {
    element
        .children_named(tag)
        .filter_map(Element::text)
        .map(|text| Value::String(text.to_string()))
        .collect()
}

impl VulnerabilityConverter {
    fn handle_involvements(element: &Element, entry: &mut Map<String, Value>, ctx: &mut ConversionContext) {
        let Some(involvements_element) = element.child("Involvements") else {
            return;
        };

        let mut involvements = Vec::new();
        for involvement in involvements_element.children_named("Involvement") {
            let party = involvement.attr("Party").unwrap_or("");
            let status = involvement.attr("Status").unwrap_or("");
            let (Some(party), Some(status)) =
                (involvement_party(party), involvement_status(status))
            else {
                ctx.fail(format!(
                    "invalid involvement party/status, input line: {}",
                    involvement.line
                ));
                continue;
            };

            let mut value = Map::new();
            value.insert("party".into(), Value::String(party.to_string()));
            value.insert("status".into(), Value::String(status.to_string()));
            if let Some(summary) = involvement.child("Description").and_then(Element::text) {
                value.insert("summary".into(), Value::String(summary.to_string()));
            }
            involvements.push(Value::Object(value));
        }
        if !involvements.is_empty() {
            entry.insert("involvements".into(), Value::Array(involvements));
        }
    }

    fn handle_product_status(element: &Element, entry: &mut Map<String, Value>, ctx: &mut ConversionContext) {
        let Some(statuses_element) = element.child("ProductStatuses") else {
            return;
        };

        let mut product_status = Map::new();
        for status in statuses_element.children_named("Status") {
            let cvrf_type = status.attr("Type").unwrap_or("");
            let Some(key) = product_status_key(cvrf_type) else {
                ctx.fail(format!(
                    "invalid product status type '{cvrf_type}', input line: {}",
                    status.line
                ));
                continue;
            };
            let ids = string_list(status, "ProductID");
            match product_status.get_mut(key) {
                // CVRF allows repeating the same status type; CSAF has one
                // array per status.
                Some(Value::Array(existing)) => existing.extend(ids),
                _ => {
                    product_status.insert(key.to_string(), Value::Array(ids));
                }
            }
        }
        if !product_status.is_empty() {
            entry.insert("product_status".into(), Value::Object(product_status));
        }
    }

    fn handle_threats(element: &Element, entry: &mut Map<String, Value>, ctx: &mut ConversionContext) {
        let Some(threats_element) = element.child("Threats") else {
            return;
        };

        let mut threats = Vec::new();
        for threat in threats_element.children_named("Threat") {
            let cvrf_type = threat.attr("Type").unwrap_or("");
            let Some(category) = threat_category(cvrf_type) else {
                ctx.fail(format!(
                    "invalid threat type '{cvrf_type}', input line: {}",
                    threat.line
                ));
                continue;
            };
            let Some(details) = threat.child("Description").and_then(Element::text) else {
                ctx.fail(format!(
                    "Threat without Description, input line: {}",
                    threat.line
                ));
                continue;
            };

            let mut value = Map::new();
            value.insert("category".into(), Value::String(category.to_string()));
            value.insert("details".into(), Value::String(details.to_string()));
            if let Some(date) = threat.attr("Date") {
                if let Some(date) = utc_timestamp(date, ctx) {
                    value.insert("date".into(), Value::String(date));
                }
            }
            let product_ids = string_list(threat, "ProductID");
            if !product_ids.is_empty() {
                value.insert("product_ids".into(), Value::Array(product_ids));
            }
            let group_ids = string_list(threat, "GroupID");
            if !group_ids.is_empty() {
                value.insert("group_ids".into(), Value::Array(group_ids));
            }
            threats.push(Value::Object(value));
        }
        if !threats.is_empty() {
            entry.insert("threats".into(), Value::Array(threats));
        }
    }

    fn handle_remediations(element: &Element, entry: &mut Map<String, Value>, ctx: &mut ConversionContext) {
        let Some(remediations_element) = element.child("Remediations") else {
            return;
        };

        let mut remediations = Vec::new();
        for remediation in remediations_element.children_named("Remediation") {
            let cvrf_type = remediation.attr("Type").unwrap_or("");
            let Some(category) = remediation_category(cvrf_type) else {
                ctx.fail(format!(
                    "invalid remediation type '{cvrf_type}', input line: {}",
                    remediation.line
                ));
                continue;
            };
            let Some(details) = remediation.child("Description").and_then(Element::text) else {
                ctx.fail(format!(
                    "Remediation without Description, input line: {}",
                    remediation.line
                ));
                continue;
            };

            let mut value = Map::new();
            value.insert("category".into(), Value::String(category.to_string()));
            value.insert("details".into(), Value::String(details.to_string()));
            if let Some(date) = remediation.attr("Date") {
                if let Some(date) = utc_timestamp(date, ctx) {
                    value.insert("date".into(), Value::String(date));
                }
            }
            if let Some(url) = remediation.child("URL").and_then(Element::text) {
                value.insert("url".into(), Value::String(url.to_string()));
            }
            if let Some(entitlement) = remediation.child("Entitlement").and_then(Element::text) {
                value.insert(
                    "entitlements".into(),
                    Value::Array(vec![Value::String(entitlement.to_string())]),
                );
            }

            let product_ids = string_list(remediation, "ProductID");
            let group_ids = string_list(remediation, "GroupID");
            if product_ids.is_empty() && group_ids.is_empty() {
                // CSAF mandates that a remediation names its scope.
                ctx.fail(format!(
                    "Remediation with neither product nor group references, input line: {}",
                    remediation.line
                ));
            }
            if !product_ids.is_empty() {
                value.insert("product_ids".into(), Value::Array(product_ids));
            }
            if !group_ids.is_empty() {
                value.insert("group_ids".into(), Value::Array(group_ids));
            }
            remediations.push(Value::Object(value));
        }
        if !remediations.is_empty() {
            entry.insert("remediations".into(), Value::Array(remediations));
        }
    }

    fn handle_scores(
        &self,
        element: &Element,
        entry: &mut Map<String, Value>,
        ctx: &mut ConversionContext,
    ) {
        let Some(score_sets_element) = element.child("CVSSScoreSets") else {
            return;
        };

        let mut scores = Vec::new();
        for score_set in &score_sets_element.children {
            let (version_suffix, key) = match score_set.tag.as_str() {
                "ScoreSetV2" => ("V2", "cvss_v2"),
                "ScoreSetV3" => ("V3", "cvss_v3"),
                _ => continue,
            };

            let vector = score_set
                .child(&format!("Vector{version_suffix}"))
                .and_then(Element::text);
            if vector.is_none() {
                if self.remove_cvss_values_without_vector {
                    ctx.warn(format!(
                        "removing CVSS score set without vector, input line: {}",
                        score_set.line
                    ));
                    continue;
                }
                // Kept best-effort; the output cannot be valid without the
                // vector string, which the force flag lets through.
                ctx.fail(format!(
                    "CVSS score set without vector, input line: {}; score sets like this can \
                     be dropped with --remove-cvss-values-without-vector",
                    score_set.line
                ));
            }

            let mut cvss = Map::new();
            let version = match key {
                "cvss_v2" => "2.0".to_string(),
                _ => vector
                    .and_then(|v| v.strip_prefix("CVSS:"))
                    .and_then(|v| v.split('/').next())
                    .map_or_else(|| self.default_cvss_version.clone(), ToString::to_string),
            };
            cvss.insert("version".into(), Value::String(version));
            if let Some(vector) = vector {
                cvss.insert("vectorString".into(), Value::String(vector.to_string()));
            }

            let mut base_score = None;
            if let Some(text) = score_set
                .child(&format!("BaseScore{version_suffix}"))
                .and_then(Element::text)
            {
                base_score = text.trim().parse::<f64>().ok();
                if let Some(value) = number_value(text) {
                    cvss.insert("baseScore".into(), value);
                }
            }
            if key == "cvss_v3" {
                if let Some(score) = base_score {
                    cvss.insert(
                        "baseSeverity".into(),
                        Value::String(cvss_v3_severity(score).to_string()),
                    );
                }
            }
            if let Some(value) = score_set
                .child(&format!("TemporalScore{version_suffix}"))
                .and_then(Element::text)
                .and_then(number_value)
            {
                cvss.insert("temporalScore".into(), value);
            }
            if let Some(value) = score_set
                .child(&format!("EnvironmentalScore{version_suffix}"))
                .and_then(Element::text)
                .and_then(number_value)
            {
                cvss.insert("environmentalScore".into(), value);
            }

            let mut score = Map::new();
            let products = string_list(score_set, "ProductID");
            if products.is_empty() {
                ctx.fail(format!(
                    "CVSS score set without product references, input line: {}",
                    score_set.line
                ));
            } else {
                score.insert("products".into(), Value::Array(products));
            }
            score.insert(key.to_string(), Value::Object(cvss));
            scores.push(Value::Object(score));
        }
        if !scores.is_empty() {
            entry.insert("scores".into(), Value::Array(scores));
        }
    }
}

impl SectionConverter for VulnerabilityConverter {
    fn process_mandatory(&mut self, element: &Element, ctx: &mut ConversionContext) -> Result<()> {
        let mut entry = Map::new();

        if let Some(title) = element.child("Title").and_then(Element::text) {
            entry.insert("title".into(), Value::String(title.to_string()));
        }
        if let Some(id) = element.child("ID") {
            let mut value = Map::new();
            value.insert(
                "system_name".into(),
                Value::String(id.require_attr("SystemName")?.to_string()),
            );
            value.insert("text".into(), Value::String(id.require_text()?.to_string()));
            entry.insert("ids".into(), Value::Array(vec![Value::Object(value)]));
        }
        if let Some(notes) = element.child("Notes") {
            let notes = convert_notes(notes, self.force, ctx);
            if !notes.is_empty() {
                entry.insert("notes".into(), Value::Array(notes));
            }
        }
        if let Some(date) = element.child("DiscoveryDate").and_then(Element::text) {
            if let Some(date) = utc_timestamp(date, ctx) {
                entry.insert("discovery_date".into(), Value::String(date));
            }
        }
        if let Some(date) = element.child("ReleaseDate").and_then(Element::text) {
            if let Some(date) = utc_timestamp(date, ctx) {
                entry.insert("release_date".into(), Value::String(date));
            }
        }

        Self::handle_involvements(element, &mut entry, ctx);

        if let Some(cve) = element.child("CVE").and_then(Element::text) {
            entry.insert("cve".into(), Value::String(cve.to_string()));
        }

        let cwes: Vec<&Element> = element.children_named("CWE").collect();
        if let Some((first, rest)) = cwes.split_first() {
            if !rest.is_empty() {
                ctx.warn(format!(
                    "CSAF 2.0 allows only one CWE per vulnerability; taking the first \
                     occurrence, input line: {}",
                    first.line
                ));
            }
            let mut cwe = Map::new();
            cwe.insert(
                "id".into(),
                Value::String(first.require_attr("ID")?.to_string()),
            );
            cwe.insert(
                "name".into(),
                Value::String(first.require_text()?.to_string()),
            );
            entry.insert("cwe".into(), Value::Object(cwe));
        }

        Self::handle_product_status(element, &mut entry, ctx);
        Self::handle_threats(element, &mut entry, ctx);
        self.handle_scores(element, &mut entry, ctx);
        Self::handle_remediations(element, &mut entry, ctx);

        if let Some(references) = element.child("References") {
            let references =
                convert_references(references, self.force_default_reference_category, ctx);
            if !references.is_empty() {
                entry.insert("references".into(), Value::Array(references));
            }
        }
        if let Some(acknowledgments) = element.child("Acknowledgments") {
            let acknowledgments = convert_acknowledgments(acknowledgments, ctx);
            if !acknowledgments.is_empty() {
                entry.insert("acknowledgments".into(), Value::Array(acknowledgments));
            }
        }

        self.csaf.push(Value::Object(entry));
        Ok(())
    }

    fn process_optional(&mut self, _element: &Element, _ctx: &mut ConversionContext) -> Result<()> {
        // Every vulnerability field is optional in CVRF; the single pass
        // above covers them all.
        Ok(())
    }

    fn take_output(&mut self) -> Fragment {
        Fragment::List(std::mem::take(&mut self.csaf))
    }
}
