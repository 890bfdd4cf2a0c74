//! In-memory engine for tests.

use crate::engine::Engine;
use crate::env::check_prohibited;
use crate::error::{Error, Result};
use crate::json::{Plan, ProviderSchemas};
use crate::options::{InitOptions, PlanOptions};
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Which call a [`MockEngine`] should fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    /// `set_env`.
    SetEnv,
    /// `init`.
    Init,
    /// `plan_json`.
    Plan,
    /// `show_plan_file`.
    Show,
    /// `providers_schema`.
    Schema,
}

/// Everything a [`MockEngine`] was asked to do.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MockCalls {
    /// Number of `set_env` calls.
    pub set_env: usize,
    /// Number of `init` calls.
    pub init: usize,
    /// Number of `plan_json` calls.
    pub plan: usize,
    /// Number of `show_plan_file` calls.
    pub show_plan_file: usize,
    /// Number of `providers_schema` calls.
    pub providers_schema: usize,
    /// Environment passed to the last `set_env`.
    pub env: BTreeMap<String, String>,
    /// Options of the last `init`.
    pub init_options: Option<InitOptions>,
    /// Options of the last `plan_json`.
    pub plan_options: Option<PlanOptions>,
}

/// An [`Engine`] that never spawns a process.
///
/// `plan_json` writes the configured events and a placeholder plan file
/// into the working directory. Clones share their call record.
///
/// ```
/// use tofuexec::{Engine, MockEngine, PlanOptions};
///
/// let dir = std::env::temp_dir();
/// let mut engine = MockEngine::new(&dir).with_changes(false);
/// let mut events = Vec::new();
/// assert!(!engine.plan_json(&mut events, &PlanOptions::new("tfplan")).unwrap());
/// assert_eq!(engine.calls().plan, 1);
/// ```
#[derive(Clone)]
pub struct MockEngine {
    working_dir: PathBuf,
    exec_path: PathBuf,
    has_changes: bool,
    events: Vec<String>,
    plan: Plan,
    schemas: ProviderSchemas,
    failure: Option<MockFailure>,
    calls: Arc<Mutex<MockCalls>>,
    stdout: Arc<Mutex<Box<dyn Write + Send>>>,
    stderr: Arc<Mutex<Box<dyn Write + Send>>>,
}

/// Placeholder written where the binary plan file would be.
pub const MOCK_PLAN_FILE_CONTENTS: &[u8] = b"mock binary plan";

impl MockEngine {
    /// A mock reporting changes, with a single `create` resource change.
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        let plan: Plan = serde_json::from_value(serde_json::json!({
            "format_version": "1.2",
            "resource_changes": [{
                "address": "null_resource.example",
                "type": "null_resource",
                "change": {"actions": ["create"], "before": null, "after": {}}
            }]
        }))
        .unwrap_or_default();

        Self {
            working_dir: working_dir.into(),
            exec_path: PathBuf::from("tofu"),
            has_changes: true,
            events: vec![
                r#"{"@level":"info","@message":"OpenTofu 1.8.2","type":"version"}"#.to_string(),
                r#"{"@level":"info","@message":"Plan: 1 to add, 0 to change, 0 to destroy.","type":"change_summary"}"#.to_string(),
            ],
            plan,
            schemas: ProviderSchemas {
                format_version: "1.0".to_string(),
                provider_schemas: BTreeMap::new(),
            },
            failure: None,
            calls: Arc::default(),
            stdout: Arc::new(Mutex::new(Box::new(io::sink()))),
            stderr: Arc::new(Mutex::new(Box::new(io::sink()))),
        }
    }

    /// Set whether `plan_json` reports changes.
    #[must_use]
    pub fn with_changes(mut self, has_changes: bool) -> Self {
        self.has_changes = has_changes;
        self
    }

    /// Events written by `plan_json`, one per line.
    #[must_use]
    pub fn with_events<I, S>(mut self, events: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.events = events.into_iter().map(Into::into).collect();
        self
    }

    /// Document returned by `show_plan_file`.
    #[must_use]
    pub fn with_plan(mut self, plan: Plan) -> Self {
        self.plan = plan;
        self
    }

    /// Document returned by `providers_schema`.
    #[must_use]
    pub fn with_schemas(mut self, schemas: ProviderSchemas) -> Self {
        self.schemas = schemas;
        self
    }

    /// Make one call fail.
    #[must_use]
    pub fn failing(mut self, failure: MockFailure) -> Self {
        self.failure = Some(failure);
        self
    }

    /// Snapshot of the calls made so far, across all clones.
    #[must_use]
    pub fn calls(&self) -> MockCalls {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn record(&self, f: impl FnOnce(&mut MockCalls)) {
        if let Ok(mut calls) = self.calls.lock() {
            f(&mut calls);
        }
    }

    fn check(&self, stage: MockFailure, command: &str) -> Result<()> {
        if self.failure == Some(stage) {
            return Err(Error::CommandFailed {
                command: command.to_string(),
                code: Some(1),
                stderr: format!("mock failure in {command}"),
            });
        }
        Ok(())
    }

    fn write_to(sink: &Mutex<Box<dyn Write + Send>>, line: &str) {
        if let Ok(mut w) = sink.lock() {
            let _ = writeln!(w, "{line}");
        }
    }
}

impl Engine for MockEngine {
    fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    fn exec_path(&self) -> &Path {
        &self.exec_path
    }

    fn set_env(&mut self, env: BTreeMap<String, String>) -> Result<()> {
        self.record(|c| c.set_env += 1);
        if self.failure == Some(MockFailure::SetEnv) {
            return Err(Error::ManualEnvVar("TF_LOG".to_string()));
        }
        check_prohibited(&env)?;
        self.record(|c| c.env = env);
        Ok(())
    }

    fn set_stdout(&mut self, writer: Box<dyn Write + Send>) {
        self.stdout = Arc::new(Mutex::new(writer));
    }

    fn set_stderr(&mut self, writer: Box<dyn Write + Send>) {
        self.stderr = Arc::new(Mutex::new(writer));
    }

    fn init(&mut self, opts: &InitOptions) -> Result<()> {
        self.record(|c| {
            c.init += 1;
            c.init_options = Some(opts.clone());
        });
        self.check(MockFailure::Init, "tofu init")?;
        Self::write_to(&self.stdout, "OpenTofu has been successfully initialized!");
        Ok(())
    }

    fn plan_json(&mut self, events: &mut dyn Write, opts: &PlanOptions) -> Result<bool> {
        self.record(|c| {
            c.plan += 1;
            c.plan_options = Some(opts.clone());
        });
        self.check(MockFailure::Plan, "tofu plan")?;

        let io_error = |source| Error::Io {
            command: "tofu plan".to_string(),
            source,
        };
        for event in &self.events {
            writeln!(events, "{event}").map_err(io_error)?;
        }
        if let Some(out) = &opts.out {
            fs::write(self.working_dir.join(out), MOCK_PLAN_FILE_CONTENTS).map_err(io_error)?;
        }
        Self::write_to(&self.stderr, "mock plan finished");
        Ok(self.has_changes)
    }

    fn show_plan_file(&mut self, plan_file: &Path) -> Result<Plan> {
        self.record(|c| c.show_plan_file += 1);
        self.check(MockFailure::Show, "tofu show")?;
        if !plan_file.exists() {
            return Err(Error::CommandFailed {
                command: format!("tofu show -json {}", plan_file.display()),
                code: Some(1),
                stderr: "Failed to read the given file as a state or plan file".to_string(),
            });
        }
        Self::write_to(&self.stdout, "show");
        Ok(self.plan.clone())
    }

    fn providers_schema(&mut self) -> Result<ProviderSchemas> {
        self.record(|c| c.providers_schema += 1);
        self.check(MockFailure::Schema, "tofu providers schema")?;
        Self::write_to(&self.stdout, "providers schema");
        Ok(self.schemas.clone())
    }
}
