//! The engine abstraction.

use crate::error::Result;
use crate::json::{Plan, ProviderSchemas};
use crate::options::{InitOptions, PlanOptions};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

/// A handle on one engine executable bound to one working directory.
///
/// Implemented by [`crate::TofuCli`] for real runs and by
/// [`crate::MockEngine`] in tests.
pub trait Engine: Send {
    /// Directory the engine runs in.
    fn working_dir(&self) -> &Path;

    /// Path of the engine executable.
    fn exec_path(&self) -> &Path;

    /// Replace the environment passed to every subsequent command.
    ///
    /// # Errors
    ///
    /// Returns `Error::ManualEnvVar` when `env` contains a variable the
    /// driver manages itself.
    fn set_env(&mut self, env: BTreeMap<String, String>) -> Result<()>;

    /// Sink for the standard output of non-JSON commands.
    fn set_stdout(&mut self, writer: Box<dyn Write + Send>);

    /// Sink for the standard error of every command.
    fn set_stderr(&mut self, writer: Box<dyn Write + Send>);

    /// `tofu init`.
    fn init(&mut self, opts: &InitOptions) -> Result<()>;

    /// `tofu plan -json`, streaming machine-readable events to `events`.
    ///
    /// Returns whether the plan contains changes.
    fn plan_json(&mut self, events: &mut dyn Write, opts: &PlanOptions) -> Result<bool>;

    /// `tofu show -json <plan_file>`.
    fn show_plan_file(&mut self, plan_file: &Path) -> Result<Plan>;

    /// `tofu providers schema -json`.
    fn providers_schema(&mut self) -> Result<ProviderSchemas>;
}
