//! Converts `/cvrf:cvrfdoc/prod:ProductTree` into `/product_tree`.
//!
//! Four independent sub-conversions merged into one mapping: full product
//! names, relationships, product groups and the recursive branch hierarchy.

use serde_json::{Map, Value};

use crate::error::Result;
use crate::sections::{ConversionContext, Fragment, SectionConverter};
use crate::xml::Element;

#[derive(Default)]
pub struct ProductTreeConverter {
    csaf: Map<String, Value>,
}

impl ProductTreeConverter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// CVRF branch type to CSAF branch category. Realm and Resource were
/// dropped from CSAF 2.0 and remap to `product_name`.
fn branch_category(cvrf_type: &str, line: u64, ctx: &mut ConversionContext) -> String {
    match cvrf_type {
        "Vendor" => "vendor",
        "Product Family" => "product_family",
        "Product Name" => "product_name",
        "Product Version" => "product_version",
        "Patch Level" => "patch_level",
        "Service Pack" => "service_pack",
        "Architecture" => "architecture",
        "Language" => "language",
        "Legacy" => "legacy",
        "Specification" => "specification",
        "Host Name" => "host_name",
        "Realm" | "Resource" => {
            ctx.warn(format!(
                "branch type '{cvrf_type}' was removed in CSAF 2.0, converting to \
                 'product_name' (line {line})"
            ));
            "product_name"
        }
        other => {
            ctx.warn(format!("unexpected branch type '{other}' (line {line})"));
            return other.to_lowercase().replace(' ', "_");
        }
    }
    .to_string()
}

/// CVRF relation type to CSAF relationship category.
fn relationship_category(cvrf_type: &str) -> Option<&'static str> {
    match cvrf_type {
        "Default Component Of" => Some("default_component_of"),
        "Optional Component Of" => Some("optional_component_of"),
        "External Component Of" => Some("external_component_of"),
        "Installed On" => Some("installed_on"),
        "Installed With" => Some("installed_with"),
        _ => None,
    }
}

/// Build a CSAF full_product_name from a CVRF `FullProductName` element.
fn full_product_name(element: &Element) -> Result<Value> {
    let mut entry = Map::new();
    entry.insert(
        "product_id".into(),
        Value::String(element.require_attr("ProductID")?.to_string()),
    );
    entry.insert(
        "name".into(),
        Value::String(element.require_text()?.to_string()),
    );
    if let Some(cpe) = element.attr("CPE") {
        let mut helper = Map::new();
        helper.insert("cpe".into(), Value::String(cpe.to_string()));
        entry.insert("product_identification_helper".into(), Value::Object(helper));
    }
    Ok(Value::Object(entry))
}

impl ProductTreeConverter {
    fn handle_full_product_names(
        &mut self,
        element: &Element,
        ctx: &mut ConversionContext,
    ) -> Result<()> {
        let mut names = Vec::new();
        for fpn in element.children_named("FullProductName") {
            match full_product_name(fpn) {
                Ok(value) => names.push(value),
                Err(e) => ctx.fail(format!("invalid FullProductName: {e}")),
            }
        }
        if !names.is_empty() {
            self.csaf.insert("full_product_names".into(), Value::Array(names));
        }
        Ok(())
    }

    fn handle_relationships(
        &mut self,
        element: &Element,
        ctx: &mut ConversionContext,
    ) -> Result<()> {
        let mut relationships = Vec::new();
        for relationship in element.children_named("Relationship") {
            let names: Vec<&Element> =
                relationship.children_named("FullProductName").collect();
            let Some(first_name) = names.first() else {
                ctx.fail(format!(
                    "Relationship without FullProductName, input line: {}",
                    relationship.line
                ));
                continue;
            };
            if names.len() > 1 {
                // CSAF expects exactly one full product name per relationship.
                ctx.warn(format!(
                    "input line {}: Relationship contains more FullProductNames; taking only \
                     the first one, since CSAF expects only 1 value here",
                    relationship.line
                ));
            }

            let cvrf_type = relationship.require_attr("RelationType")?;
            let Some(category) = relationship_category(cvrf_type) else {
                ctx.fail(format!(
                    "invalid relation type '{cvrf_type}' (line {})",
                    relationship.line
                ));
                continue;
            };

            let mut entry = Map::new();
            entry.insert("category".into(), Value::String(category.to_string()));
            entry.insert(
                "product_reference".into(),
                Value::String(relationship.require_attr("ProductReference")?.to_string()),
            );
            entry.insert(
                "relates_to_product_reference".into(),
                Value::String(
                    relationship
                        .require_attr("RelatesToProductReference")?
                        .to_string(),
                ),
            );
            entry.insert("full_product_name".into(), full_product_name(first_name)?);
            relationships.push(Value::Object(entry));
        }
        if !relationships.is_empty() {
            self.csaf.insert("relationships".into(), Value::Array(relationships));
        }
        Ok(())
    }

    fn handle_product_groups(
        &mut self,
        element: &Element,
        _ctx: &mut ConversionContext,
    ) -> Result<()> {
        let Some(groups_element) = element.child("ProductGroups") else {
            return Ok(());
        };

        let mut groups = Vec::new();
        for group in groups_element.children_named("Group") {
            let mut entry = Map::new();
            entry.insert(
                "group_id".into(),
                Value::String(group.require_attr("GroupID")?.to_string()),
            );
            entry.insert(
                "product_ids".into(),
                Value::Array(
                    group
                        .children_named("ProductID")
                        .filter_map(Element::text)
                        .map(|id| Value::String(id.to_string()))
                        .collect(),
                ),
            );
            if let Some(summary) = group.child("Description").and_then(Element::text) {
                entry.insert("summary".into(), Value::String(summary.to_string()));
            }
            groups.push(Value::Object(entry));
        }
        if !groups.is_empty() {
            self.csaf.insert("product_groups".into(), Value::Array(groups));
        }
        Ok(())
    }

    fn handle_branches(&mut self, element: &Element, ctx: &mut ConversionContext) -> Result<()> {
        let mut branches = Vec::new();
        for branch in element.children_named("Branch") {
            if let Some(value) = convert_branch(branch, ctx)? {
                branches.push(value);
            }
        }
        if !branches.is_empty() {
            self.csaf.insert("branches".into(), Value::Array(branches));
        }
        Ok(())
    }
}

/// Recursively convert one CVRF `Branch` element.
///
/// A branch with a direct `FullProductName` child is a leaf and carries a
/// `product`; a branch with child `Branch` elements is a container and
/// carries `branches`. A branch with neither is dropped with a warning.
fn convert_branch(branch: &Element, ctx: &mut ConversionContext) -> Result<Option<Value>> {
    let mut entry = Map::new();
    entry.insert(
        "name".into(),
        Value::String(branch.require_attr("Name")?.to_string()),
    );
    entry.insert(
        "category".into(),
        Value::String(branch_category(
            branch.require_attr("Type")?,
            branch.line,
            ctx,
        )),
    );

    if let Some(fpn) = branch.child("FullProductName") {
        entry.insert("product".into(), full_product_name(fpn)?);
        return Ok(Some(Value::Object(entry)));
    }

    let mut children = Vec::new();
    for child in branch.children_named("Branch") {
        if let Some(value) = convert_branch(child, ctx)? {
            children.push(value);
        }
    }
    if children.is_empty() {
        ctx.warn(format!(
            "skipping branch without product or child branches, input line: {}",
            branch.line
        ));
        return Ok(None);
    }
    entry.insert("branches".into(), Value::Array(children));
    Ok(Some(Value::Object(entry)))
}

impl SectionConverter for ProductTreeConverter {
    fn process_mandatory(&mut self, _element: &Element, _ctx: &mut ConversionContext) -> Result<()> {
        // The ProductTree section has no mandatory elements.
        Ok(())
    }

    fn process_optional(&mut self, element: &Element, ctx: &mut ConversionContext) -> Result<()> {
        self.handle_branches(element, ctx)?;
        self.handle_full_product_names(element, ctx)?;
        self.handle_relationships(element, ctx)?;
        self.handle_product_groups(element, ctx)?;
        Ok(())
    }

    fn take_output(&mut self) -> Fragment {
        Fragment::Map(std::mem::take(&mut self.csaf))
    }
}
