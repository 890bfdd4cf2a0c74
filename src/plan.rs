//! Plan execution.
//!
//! Drives the engine through `init` and `plan`. The executor tracks where
//! the engine is in that sequence so a plan can never run uninitialized.

use crate::config::PlanSettings;
use crate::error::RunError;
use std::io::{self, Write};
use std::path::PathBuf;
use tofuexec::{Engine, InitOptions, PlanOptions};

/// Name of the binary plan file, relative to the working directory.
pub const PLAN_FILE: &str = "tfplan";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanState {
    NotInitialized,
    Initialized,
    Planned { has_changes: bool },
    Failed,
}

/// Result of a successful plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanOutcome {
    NoChanges,
    Changes { plan_file: PathBuf },
}

/// Engine options for a plan.
pub fn plan_options(settings: &PlanSettings) -> PlanOptions {
    settings
        .targets
        .iter()
        .fold(
            PlanOptions::new(PLAN_FILE)
                .lock(!settings.plan_only)
                .destroy(settings.destroy),
            |opts, target| opts.target(target.as_str()),
        )
}

pub struct PlanExecutor<'e> {
    engine: &'e mut dyn Engine,
    state: PlanState,
}

impl<'e> PlanExecutor<'e> {
    pub fn new(engine: &'e mut dyn Engine) -> Self {
        Self {
            engine,
            state: PlanState::NotInitialized,
        }
    }

    pub fn state(&self) -> PlanState {
        self.state
    }

    /// `init` without upgrading modules or providers.
    pub fn init(&mut self) -> Result<(), RunError> {
        log::debug!("Initializing tofu in {}", self.engine.working_dir().display());
        match self.engine.init(&InitOptions { upgrade: false }) {
            Ok(()) => {
                self.state = PlanState::Initialized;
                log::debug!("Tofu initialized");
                Ok(())
            }
            Err(e) => {
                self.state = PlanState::Failed;
                Err(RunError::EngineInitFailed(e))
            }
        }
    }

    /// Run the plan, streaming JSON events to `events`.
    ///
    /// After a plan with changes the engine's stdout is discarded and its
    /// stderr goes to the console, keeping later commands out of the log.
    pub fn plan(
        &mut self,
        events: &mut dyn Write,
        settings: &PlanSettings,
    ) -> Result<PlanOutcome, RunError> {
        if self.state != PlanState::Initialized {
            return Err(RunError::NotInitialized);
        }

        let opts = plan_options(settings);
        log::info!(
            "Running plan ({} targets, lock={}, destroy={})",
            opts.targets.len(),
            opts.lock,
            opts.destroy
        );

        let has_changes = match self.engine.plan_json(events, &opts) {
            Ok(changed) => changed,
            Err(e) => {
                self.state = PlanState::Failed;
                return Err(RunError::PlanExecutionFailed(e));
            }
        };
        self.state = PlanState::Planned { has_changes };

        if !has_changes {
            log::info!("No changes");
            return Ok(PlanOutcome::NoChanges);
        }

        self.engine.set_stdout(Box::new(io::sink()));
        self.engine.set_stderr(Box::new(io::stderr()));

        Ok(PlanOutcome::Changes {
            plan_file: self.engine.working_dir().join(PLAN_FILE),
        })
    }
}
