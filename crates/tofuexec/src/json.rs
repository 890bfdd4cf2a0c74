//! Machine-readable documents printed by the engine.
//!
//! Only the fields this workspace inspects are typed. Everything else is
//! kept in a flattened `extra` map so a document survives a decode/encode
//! cycle without losing information.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Output of `tofu show -json <planfile>`.
///
/// Sensitive values are already masked by the engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    /// Plan document format version.
    #[serde(default)]
    pub format_version: String,

    /// Changes to root module outputs.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub output_changes: BTreeMap<String, Change>,

    /// Planned resource changes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resource_changes: Vec<ResourceChange>,

    /// Changes detected outside the engine since the last apply.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resource_drift: Vec<ResourceChange>,

    /// Attributes that contributed to the plan.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub relevant_attributes: Vec<ResourceAttribute>,

    /// Remaining top-level fields (planned values, configuration, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Plan {
    /// Whether any resource or output change does something.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        self.resource_changes.iter().any(|rc| !rc.change.is_noop())
            || self.output_changes.values().any(|c| !c.is_noop())
    }
}

/// One entry of `resource_changes` or `resource_drift`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceChange {
    /// Absolute resource address, e.g. `module.a.aws_instance.b`.
    pub address: String,

    /// The change itself.
    #[serde(default)]
    pub change: Change,

    /// Mode, type, name, provider and friends.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A before/after change description.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Change {
    /// Actions such as `create`, `update`, `delete`, `no-op`.
    #[serde(default)]
    pub actions: Vec<String>,

    /// `before`, `after`, `after_unknown`, sensitivity markers.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Change {
    /// Whether the change is a no-op (or a pure read).
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.actions.iter().all(|a| a == "no-op" || a == "read")
    }
}

/// A `resource` + `attribute` path pair from `relevant_attributes`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceAttribute {
    /// Resource address.
    pub resource: String,
    /// Attribute path, as printed by the engine.
    pub attribute: Value,
}

/// Output of `tofu providers schema -json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderSchemas {
    /// Schema document format version.
    #[serde(default)]
    pub format_version: String,

    /// Schemas keyed by provider source address.
    #[serde(default)]
    pub provider_schemas: BTreeMap<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHOW_OUTPUT: &str = r#"{
        "format_version": "1.2",
        "terraform_version": "1.8.2",
        "planned_values": {"root_module": {}},
        "resource_changes": [{
            "address": "aws_instance.web",
            "mode": "managed",
            "type": "aws_instance",
            "name": "web",
            "provider_name": "registry.opentofu.org/hashicorp/aws",
            "change": {
                "actions": ["create"],
                "before": null,
                "after": {"ami": "ami-123"},
                "after_unknown": {"id": true}
            }
        }],
        "relevant_attributes": [{"resource": "aws_instance.web", "attribute": ["ami"]}]
    }"#;

    #[test]
    fn test_parse_show_output() {
        let plan: Plan = serde_json::from_str(SHOW_OUTPUT).unwrap();
        assert_eq!(plan.format_version, "1.2");
        assert_eq!(plan.resource_changes.len(), 1);
        assert_eq!(plan.resource_changes[0].address, "aws_instance.web");
        assert_eq!(plan.resource_changes[0].change.actions, vec!["create"]);
        assert_eq!(plan.relevant_attributes[0].resource, "aws_instance.web");
        assert!(plan.extra.contains_key("planned_values"));
        assert!(plan.has_changes());
    }

    #[test]
    fn test_unknown_fields_survive_reencoding() {
        let plan: Plan = serde_json::from_str(SHOW_OUTPUT).unwrap();
        let original: Value = serde_json::from_str(SHOW_OUTPUT).unwrap();
        let reencoded = serde_json::to_value(&plan).unwrap();
        assert_eq!(reencoded, original);
    }

    #[test]
    fn test_noop_plan_has_no_changes() {
        let plan: Plan = serde_json::from_str(
            r#"{"format_version":"1.2","resource_changes":[
                {"address":"a.b","change":{"actions":["no-op"]}},
                {"address":"data.c.d","change":{"actions":["read"]}}
            ]}"#,
        )
        .unwrap();
        assert!(!plan.has_changes());
    }

    #[test]
    fn test_parse_provider_schemas() {
        let schemas: ProviderSchemas = serde_json::from_str(
            r#"{"format_version":"1.0","provider_schemas":{"registry.opentofu.org/hashicorp/null":{"provider":{}}}}"#,
        )
        .unwrap();
        assert_eq!(schemas.format_version, "1.0");
        assert!(
            schemas
                .provider_schemas
                .contains_key("registry.opentofu.org/hashicorp/null")
        );
    }
}
