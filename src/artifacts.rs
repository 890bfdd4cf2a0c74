//! Post-plan artifacts.
//!
//! A plan with changes produces three documents for upload: the binary plan
//! file as written by the engine, the redacted plan as printed by
//! `tofu show -json`, and a hosted JSON plan combining the plan's changes
//! with the provider schema catalog.

use crate::error::RunError;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
use tofuexec::{Change, Engine, Plan, ProviderSchemas, ResourceAttribute, ResourceChange};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Artifact {
    PlanFile,
    HostedJsonPlan,
    RedactedJsonPlan,
    StructuredJson,
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Artifact::PlanFile => "plan file",
            Artifact::HostedJsonPlan => "hosted json plan",
            Artifact::RedactedJsonPlan => "redacted json plan",
            Artifact::StructuredJson => "structured json",
        })
    }
}

/// The hosted JSON plan document.
#[derive(Debug, Serialize)]
pub struct HostedPlan<'a> {
    pub plan_format_version: &'a str,
    pub output_changes: &'a BTreeMap<String, Change>,
    pub resource_changes: &'a [ResourceChange],
    pub resource_drift: &'a [ResourceChange],
    pub relevant_attributes: &'a [ResourceAttribute],
    pub provider_format_version: &'a str,
    pub provider_schemas: &'a BTreeMap<String, Value>,
}

impl<'a> HostedPlan<'a> {
    pub fn new(plan: &'a Plan, schemas: &'a ProviderSchemas) -> Self {
        Self {
            plan_format_version: &plan.format_version,
            output_changes: &plan.output_changes,
            resource_changes: &plan.resource_changes,
            resource_drift: &plan.resource_drift,
            relevant_attributes: &plan.relevant_attributes,
            provider_format_version: &schemas.format_version,
            provider_schemas: &schemas.provider_schemas,
        }
    }
}

/// Serialized artifacts of one plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactBundle {
    pub plan_file: Vec<u8>,
    pub hosted_json_plan: Vec<u8>,
    pub redacted_json_plan: Vec<u8>,
}

/// Read the plan file and build both JSON documents.
///
/// Either every document is produced or an error is returned.
pub fn assemble(engine: &mut dyn Engine, plan_file: &Path) -> Result<ArtifactBundle, RunError> {
    let raw = fs::read(plan_file).map_err(|source| RunError::PlanFileUnreadable {
        path: plan_file.to_path_buf(),
        source,
    })?;

    log::debug!("Reading plan file {}", plan_file.display());
    let plan = engine
        .show_plan_file(plan_file)
        .map_err(RunError::PlanExecutionFailed)?;
    if !plan.has_changes() {
        log::warn!(
            "Plan file {} holds only no-op resource changes",
            plan_file.display()
        );
    }

    log::debug!("Fetching provider schemas");
    let schemas = engine
        .providers_schema()
        .map_err(RunError::PlanExecutionFailed)?;

    let (hosted, redacted) = serialize(&plan, &schemas)?;
    Ok(ArtifactBundle {
        plan_file: raw,
        hosted_json_plan: hosted,
        redacted_json_plan: redacted,
    })
}

/// Encode the hosted and redacted documents.
pub fn serialize(plan: &Plan, schemas: &ProviderSchemas) -> Result<(Vec<u8>, Vec<u8>), RunError> {
    let redacted = serde_json::to_vec(plan).map_err(|source| {
        RunError::ArtifactSerializationFailed {
            artifact: Artifact::RedactedJsonPlan,
            source,
        }
    })?;
    let hosted = serde_json::to_vec(&HostedPlan::new(plan, schemas)).map_err(|source| {
        RunError::ArtifactSerializationFailed {
            artifact: Artifact::HostedJsonPlan,
            source,
        }
    })?;
    Ok((hosted, redacted))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tofuexec::{MockEngine, MockFailure};

    fn sample_plan() -> Plan {
        serde_json::from_str(
            r#"{
                "format_version": "1.2",
                "output_changes": {"ip": {"actions": ["create"], "after_unknown": true}},
                "resource_changes": [
                    {"address": "aws_instance.a", "type": "aws_instance",
                     "change": {"actions": ["create"], "after": {"ami": "ami-1"}, "after_sensitive": {}}},
                    {"address": "aws_instance.b", "type": "aws_instance",
                     "change": {"actions": ["delete", "create"], "before": {"ami": "ami-0"}}}
                ],
                "resource_drift": [
                    {"address": "aws_s3_bucket.logs", "change": {"actions": ["update"]}}
                ],
                "relevant_attributes": [{"resource": "aws_instance.b", "attribute": ["ami"]}],
                "prior_state": {"format_version": "1.0"}
            }"#,
        )
        .unwrap()
    }

    fn sample_schemas() -> ProviderSchemas {
        serde_json::from_str(
            r#"{"format_version":"1.0","provider_schemas":{"registry.opentofu.org/hashicorp/aws":{"provider":{"version":0}}}}"#,
        )
        .unwrap()
    }

    #[test]
    fn test_hosted_plan_fields() {
        let (hosted, _) = serialize(&sample_plan(), &sample_schemas()).unwrap();
        let doc: Value = serde_json::from_slice(&hosted).unwrap();

        assert_eq!(doc["plan_format_version"], "1.2");
        assert_eq!(doc["provider_format_version"], "1.0");
        assert!(doc["provider_schemas"]["registry.opentofu.org/hashicorp/aws"].is_object());
        assert_eq!(doc["output_changes"]["ip"]["actions"][0], "create");
        assert_eq!(doc["resource_drift"][0]["address"], "aws_s3_bucket.logs");
        assert_eq!(doc["relevant_attributes"][0]["resource"], "aws_instance.b");
        assert!(doc.get("prior_state").is_none());
    }

    #[test]
    fn test_hosted_resource_changes_round_trip() {
        let plan = sample_plan();
        let (hosted, _) = serialize(&plan, &sample_schemas()).unwrap();

        let doc: Value = serde_json::from_slice(&hosted).unwrap();
        let decoded: Vec<ResourceChange> =
            serde_json::from_value(doc["resource_changes"].clone()).unwrap();

        assert_eq!(decoded, plan.resource_changes);
        assert_eq!(
            serde_json::to_string(&decoded).unwrap(),
            serde_json::to_string(&plan.resource_changes).unwrap()
        );
    }

    #[test]
    fn test_redacted_is_full_plan() {
        let plan = sample_plan();
        let (_, redacted) = serialize(&plan, &sample_schemas()).unwrap();
        let decoded: Plan = serde_json::from_slice(&redacted).unwrap();
        assert_eq!(decoded, plan);
        assert!(decoded.extra.contains_key("prior_state"));
    }

    #[test]
    fn test_assemble_reads_plan_file() {
        let dir = TempDir::new().unwrap();
        let plan_file = dir.path().join("tfplan");
        fs::write(&plan_file, b"binary plan").unwrap();

        let mut engine = MockEngine::new(dir.path())
            .with_plan(sample_plan())
            .with_schemas(sample_schemas());
        let bundle = assemble(&mut engine, &plan_file).unwrap();

        assert_eq!(bundle.plan_file, b"binary plan");
        assert!(!bundle.hosted_json_plan.is_empty());
        assert!(!bundle.redacted_json_plan.is_empty());
        let calls = engine.calls();
        assert_eq!(calls.show_plan_file, 1);
        assert_eq!(calls.providers_schema, 1);
    }

    #[test]
    fn test_assemble_missing_plan_file() {
        let dir = TempDir::new().unwrap();
        let mut engine = MockEngine::new(dir.path());
        let err = assemble(&mut engine, &dir.path().join("tfplan")).unwrap_err();

        assert!(matches!(err, RunError::PlanFileUnreadable { .. }));
        assert_eq!(engine.calls().show_plan_file, 0);
    }

    #[test]
    fn test_assemble_schema_failure_yields_nothing() {
        let dir = TempDir::new().unwrap();
        let plan_file = dir.path().join("tfplan");
        fs::write(&plan_file, b"binary plan").unwrap();

        let mut engine = MockEngine::new(dir.path()).failing(MockFailure::Schema);
        let err = assemble(&mut engine, &plan_file).unwrap_err();
        assert!(matches!(err, RunError::PlanExecutionFailed(_)));
    }
}
