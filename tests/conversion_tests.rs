//! End-to-end conversion tests: full CVRF documents through
//! `DocumentConverter`, asserting on the composed CSAF output.

use cvrf2csaf::{create_file_name, ConversionConfig, DocumentConverter};
use cvrf2csaf::xml::parse_document;
use serde_json::{json, Value};

const FULL_ADVISORY: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<cvrfdoc xmlns="http://docs.oasis-open.org/csaf/ns/csaf-cvrf/v1.2/cvrf"
         xmlns:vuln="http://docs.oasis-open.org/csaf/ns/csaf-cvrf/v1.2/vuln"
         xmlns:prod="http://docs.oasis-open.org/csaf/ns/csaf-cvrf/v1.2/prod"
         xmlns:cvssv3="https://www.first.org/cvss/cvss-v3.1.xsd">
  <DocumentTitle xml:lang="en">Example appliance overflow</DocumentTitle>
  <DocumentType>Security Advisory</DocumentType>
  <DocumentPublisher Type="Vendor">
    <ContactDetails>security@example.com</ContactDetails>
    <IssuingAuthority>Example PSIRT</IssuingAuthority>
  </DocumentPublisher>
  <DocumentTracking>
    <Identification>
      <ID>EX-2021:0042</ID>
      <Alias>EXB-101</Alias>
    </Identification>
    <Status>Final</Status>
    <Version>1.1.0</Version>
    <RevisionHistory>
      <Revision>
        <Number>1.0.0</Number>
        <Date>2021-03-01T08:00:00Z</Date>
        <Description>Initial release</Description>
      </Revision>
      <Revision>
        <Number>1.1.0</Number>
        <Date>2021-03-15T08:00:00Z</Date>
        <Description>Added fixed versions</Description>
      </Revision>
    </RevisionHistory>
    <InitialReleaseDate>2021-03-01T08:00:00Z</InitialReleaseDate>
    <CurrentReleaseDate>2021-03-15T08:00:00Z</CurrentReleaseDate>
  </DocumentTracking>
  <DocumentNotes>
    <Note Type="Summary" Ordinal="1" Title="Overview">A stack overflow was found.</Note>
    <Note Type="Legal Disclaimer" Ordinal="2">Provided as is.</Note>
  </DocumentNotes>
  <DocumentDistribution>Public</DocumentDistribution>
  <AggregateSeverity Namespace="https://example.com/severity">Critical</AggregateSeverity>
  <DocumentReferences>
    <Reference Type="Self">
      <URL>https://example.com/advisories/ex-2021-0042</URL>
      <Description>Canonical URL</Description>
    </Reference>
  </DocumentReferences>
  <Acknowledgments>
    <Acknowledgment>
      <Name>Jamie Researcher</Name>
      <Organization>Example Labs</Organization>
      <Description>found and reported the issue</Description>
    </Acknowledgment>
  </Acknowledgments>
  <ProductTree xmlns="http://docs.oasis-open.org/csaf/ns/csaf-cvrf/v1.2/prod">
    <Branch Type="Vendor" Name="Example Corp">
      <Branch Type="Product Name" Name="Appliance">
        <FullProductName ProductID="EXA-1">Example Appliance 1.0</FullProductName>
      </Branch>
    </Branch>
    <Relationship ProductReference="EXA-1" RelationType="Installed On" RelatesToProductReference="OS-1">
      <FullProductName ProductID="EXA-1-OS-1">Example Appliance 1.0 on ExampleOS</FullProductName>
    </Relationship>
  </ProductTree>
  <Vulnerability xmlns="http://docs.oasis-open.org/csaf/ns/csaf-cvrf/v1.2/vuln" Ordinal="1">
    <Title>Stack overflow in request parser</Title>
    <CVE>CVE-2021-0042</CVE>
    <ProductStatuses>
      <Status Type="Known Affected">
        <ProductID>EXA-1</ProductID>
      </Status>
    </ProductStatuses>
    <CVSSScoreSets>
      <ScoreSetV3>
        <BaseScoreV3>9.8</BaseScoreV3>
        <VectorV3>CVSS:3.1/AV:N/AC:L/PR:N/UI:N/S:U/C:H/I:H/A:H</VectorV3>
        <ProductID>EXA-1</ProductID>
      </ScoreSetV3>
    </CVSSScoreSets>
    <Remediations>
      <Remediation Type="Vendor Fix" Date="2021-03-15T08:00:00Z">
        <Description>Upgrade to release 1.1</Description>
        <URL>https://example.com/downloads</URL>
        <ProductID>EXA-1</ProductID>
      </Remediation>
    </Remediations>
  </Vulnerability>
</cvrfdoc>
"#;

fn config() -> ConversionConfig {
    ConversionConfig {
        publisher_name: "Example Corp".into(),
        publisher_namespace: "https://example.com".into(),
        ..ConversionConfig::default()
    }
}

fn convert(xml: &str, config: &ConversionConfig) -> (Value, bool, Vec<String>) {
    let doc = parse_document(xml).expect("fixture parses");
    let result = DocumentConverter::new(config).convert(&doc);
    (result.csaf, result.fatal, result.messages)
}

#[test]
fn full_advisory_converts_without_errors() {
    let (csaf, fatal, messages) = convert(FULL_ADVISORY, &config());
    assert!(!fatal, "unexpected errors: {messages:?}");

    let document = &csaf["document"];
    assert_eq!(document["csaf_version"], "2.0");
    assert_eq!(document["category"], "Security Advisory");
    assert_eq!(document["title"], "Example appliance overflow");
    assert_eq!(document["lang"], "en");
    assert_eq!(document["distribution"]["text"], "Public");
    assert_eq!(document["aggregate_severity"]["text"], "Critical");

    assert_eq!(document["publisher"]["category"], "vendor");
    assert_eq!(document["publisher"]["name"], "Example Corp");
    assert_eq!(document["publisher"]["contact_details"], "security@example.com");

    let tracking = &document["tracking"];
    assert_eq!(tracking["id"], "EX-2021:0042");
    assert_eq!(tracking["aliases"], json!(["EXB-101"]));
    assert_eq!(tracking["status"], "final");
    assert_eq!(tracking["version"], "1.1.0");
    assert_eq!(tracking["current_release_date"], "2021-03-15T08:00:00.000+00:00");
    assert_eq!(tracking["generator"]["engine"]["name"], "cvrf2csaf");

    assert_eq!(document["notes"][0]["category"], "summary");
    assert_eq!(document["notes"][0]["title"], "Overview");
    assert_eq!(document["notes"][1]["category"], "legal_disclaimer");

    assert_eq!(document["references"][0]["category"], "self");
    assert_eq!(document["acknowledgments"][0]["organization"], "Example Labs");
    assert_eq!(document["acknowledgments"][0]["names"], json!(["Jamie Researcher"]));
}

#[test]
fn full_advisory_product_tree_and_vulnerabilities() {
    let (csaf, fatal, messages) = convert(FULL_ADVISORY, &config());
    assert!(!fatal, "unexpected errors: {messages:?}");

    let vendor = &csaf["product_tree"]["branches"][0];
    assert_eq!(vendor["category"], "vendor");
    assert_eq!(vendor["name"], "Example Corp");
    let product = &vendor["branches"][0];
    assert_eq!(product["category"], "product_name");
    assert_eq!(product["product"]["product_id"], "EXA-1");

    let relationship = &csaf["product_tree"]["relationships"][0];
    assert_eq!(relationship["category"], "installed_on");
    assert_eq!(relationship["product_reference"], "EXA-1");
    assert_eq!(
        relationship["full_product_name"]["product_id"],
        "EXA-1-OS-1"
    );

    let vulnerability = &csaf["vulnerabilities"][0];
    assert_eq!(vulnerability["cve"], "CVE-2021-0042");
    assert_eq!(
        vulnerability["product_status"]["known_affected"],
        json!(["EXA-1"])
    );
    let cvss = &vulnerability["scores"][0]["cvss_v3"];
    assert_eq!(cvss["version"], "3.1");
    assert_eq!(cvss["baseSeverity"], "CRITICAL");
    assert_eq!(vulnerability["remediations"][0]["category"], "vendor_fix");
}

#[test]
fn non_semver_history_is_reindexed_end_to_end() {
    let xml = FULL_ADVISORY
        .replace("<Version>1.1.0</Version>", "<Version>2</Version>")
        .replace("<Number>1.0.0</Number>", "<Number>1</Number>")
        .replace("<Number>1.1.0</Number>", "<Number>2</Number>");
    let (csaf, fatal, messages) = convert(&xml, &config());
    assert!(!fatal, "unexpected errors: {messages:?}");

    let history = csaf["document"]["tracking"]["revision_history"]
        .as_array()
        .expect("history");
    assert_eq!(history[0]["number"], "1");
    assert_eq!(history[0]["legacy_version"], "1");
    assert_eq!(history[1]["number"], "2");
    assert_eq!(history[1]["legacy_version"], "2");
    assert_eq!(csaf["document"]["tracking"]["version"], "2");
    assert!(messages.iter().any(|m| m.contains("reindexing")));
}

#[test]
fn missing_current_version_fails_unless_repaired() {
    let xml = FULL_ADVISORY.replace("<Version>1.1.0</Version>", "<Version>1.2.0</Version>");

    let (_, fatal, messages) = convert(&xml, &config());
    assert!(fatal, "messages: {messages:?}");

    let repair = ConversionConfig {
        fix_insert_current_version_into_revision_history: true,
        ..config()
    };
    let (csaf, fatal, messages) = convert(&xml, &repair);
    assert!(!fatal, "unexpected errors: {messages:?}");
    let history = csaf["document"]["tracking"]["revision_history"]
        .as_array()
        .expect("history");
    assert_eq!(history.len(), 3);
    assert_eq!(history[2]["number"], "1.2.0");
    assert!(history[2]["summary"]
        .as_str()
        .expect("summary")
        .contains("Added by cvrf2csaf"));
}

#[test]
fn second_acknowledgment_organization_dropped_with_warning() {
    let xml = FULL_ADVISORY.replace(
        "<Organization>Example Labs</Organization>",
        "<Organization>Example Labs</Organization><Organization>Other Org</Organization>",
    );
    let (csaf, fatal, messages) = convert(&xml, &config());

    assert!(!fatal);
    assert_eq!(
        csaf["document"]["acknowledgments"][0]["organization"],
        "Example Labs"
    );
    assert!(messages.iter().any(|m| m.contains("Other Org")));
}

#[test]
fn reference_default_category_follows_flag() {
    let xml = FULL_ADVISORY.replace(r#"<Reference Type="Self">"#, "<Reference>");

    let (csaf, fatal, _) = convert(&xml, &config());
    assert!(!fatal);
    assert!(csaf["document"]["references"][0].get("category").is_none());

    let forced = ConversionConfig {
        force_insert_default_reference_category: true,
        ..config()
    };
    let (csaf, fatal, _) = convert(&xml, &forced);
    assert!(!fatal);
    assert_eq!(csaf["document"]["references"][0]["category"], "external");
}

#[test]
fn cvss_version_sniffed_from_schema_namespace() {
    // Vector prefix is removed so the only version source is the xmlns
    // declaration on the root.
    let xml = FULL_ADVISORY.replace(
        "<VectorV3>CVSS:3.1/AV:N/AC:L/PR:N/UI:N/S:U/C:H/I:H/A:H</VectorV3>",
        "<VectorV3>AV:N/AC:L/PR:N/UI:N/S:U/C:H/I:H/A:H</VectorV3>",
    );
    let (csaf, fatal, messages) = convert(&xml, &config());

    assert!(!fatal, "unexpected errors: {messages:?}");
    assert_eq!(csaf["vulnerabilities"][0]["scores"][0]["cvss_v3"]["version"], "3.1");
}

#[test]
fn invalid_publisher_category_sets_failure_flag() {
    let xml = FULL_ADVISORY.replace(
        r#"<DocumentPublisher Type="Vendor">"#,
        r#"<DocumentPublisher Type="Reseller">"#,
    );
    let (csaf, fatal, _) = convert(&xml, &config());

    assert!(fatal);
    // best-effort output still carries the configured identity
    assert_eq!(csaf["document"]["publisher"]["name"], "Example Corp");
    assert!(csaf["document"]["publisher"].get("category").is_none());
}

#[test]
fn invalid_output_gets_marked_file_name() {
    let xml = FULL_ADVISORY.replace(
        r#"<DocumentPublisher Type="Vendor">"#,
        r#"<DocumentPublisher Type="Reseller">"#,
    );
    let doc = parse_document(&xml).expect("parse");
    let result = DocumentConverter::new(&config()).convert(&doc);

    assert!(!result.is_valid());
    assert_eq!(
        create_file_name(result.tracking_id(), result.is_valid()),
        "ex-2021_0042_invalid.json"
    );
}

#[test]
fn empty_sections_are_omitted_from_output() {
    let xml = FULL_ADVISORY
        .replace(r#"  <Acknowledgments>
    <Acknowledgment>
      <Name>Jamie Researcher</Name>
      <Organization>Example Labs</Organization>
      <Description>found and reported the issue</Description>
    </Acknowledgment>
  </Acknowledgments>
"#, "  <Acknowledgments></Acknowledgments>\n");
    let (csaf, fatal, _) = convert(&xml, &config());

    assert!(!fatal);
    assert!(csaf["document"].get("acknowledgments").is_none());
}

#[test]
fn converting_same_input_twice_gives_identical_output() {
    // The generator timestamp is the only nondeterministic field.
    let (mut first, _, _) = convert(FULL_ADVISORY, &config());
    let (mut second, _, _) = convert(FULL_ADVISORY, &config());
    for csaf in [&mut first, &mut second] {
        csaf["document"]["tracking"]["generator"]
            .as_object_mut()
            .expect("generator")
            .remove("date");
    }
    assert_eq!(first, second);
}
