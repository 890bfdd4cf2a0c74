//! Run orchestration.
//!
//! resolve → install → environment → init → plan → assemble → upload, with
//! the captured log uploaded once at the end whatever happened after the
//! environment was set up.

use crate::artifacts::{self, Artifact};
use crate::bootstrap::ApiClient;
use crate::cli::Operation;
use crate::config::RunConfig;
use crate::error::{RunError, UploadError};
use crate::logs::{LogBuffer, LogUploadAdapter, Tee};
use crate::plan::{PlanExecutor, PlanOutcome};
use crate::progress;
use crate::ui;
use crate::upload::{self, HttpPut, UploadJob, UploadOutcome, UploadReport};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tofuexec::{Engine, TofuCli};
use toolchain::{Client, Version, version};

/// Exit code for a fatal error.
pub const EXIT_FATAL: u8 = 1;
/// Exit code when the plan succeeded but an upload did not.
pub const EXIT_UPLOAD_FAILED: u8 = 3;

/// Where engine output is echoed.
#[derive(Debug, Clone, Copy)]
pub struct Console {
    /// Mirror engine output to this process's stdout/stderr.
    pub echo: bool,
    /// Hide progress indicators.
    pub quiet: bool,
}

impl Console {
    fn stdout(self) -> Box<dyn Write + Send> {
        if self.echo {
            Box::new(io::stdout())
        } else {
            Box::new(io::sink())
        }
    }

    fn stderr(self) -> Box<dyn Write + Send> {
        if self.echo {
            Box::new(io::stderr())
        } else {
            Box::new(io::sink())
        }
    }
}

/// What a finished run did.
#[derive(Debug)]
pub struct RunSummary {
    pub operation: Operation,
    pub version: Version,
    pub engine_path: PathBuf,
    pub has_changes: bool,
    pub uploads: UploadReport,
    pub log_upload: Option<UploadError>,
}

impl RunSummary {
    pub fn exit_code(&self) -> u8 {
        if self.uploads.is_success() && self.log_upload.is_none() {
            0
        } else {
            EXIT_UPLOAD_FAILED
        }
    }
}

/// Run against the real engine and release host.
pub fn run(config: &RunConfig, console: Console) -> Result<RunSummary, RunError> {
    execute(
        config,
        &Client::new(),
        &HttpPut::new(),
        |dir, exec| Box::new(TofuCli::new(dir, exec)),
        console,
    )
}

/// Run with explicit collaborators.
pub fn execute<F>(
    config: &RunConfig,
    client: &Client,
    http: &HttpPut,
    make_engine: F,
    console: Console,
) -> Result<RunSummary, RunError>
where
    F: FnOnce(&Path, &Path) -> Box<dyn Engine>,
{
    if config.operation != Operation::Plan {
        return Err(RunError::Unimplemented(config.operation));
    }

    if let Some(address) = &config.api_address {
        let api = ApiClient::new(address, config.token.as_deref())?;
        log::info!("Control plane at {}", api.address());
    }

    let spec = version::resolve(&config.version)?;
    log::info!("Installing tofu {spec} for {}", config.working_dir.display());

    let pb = progress::spinner(&format!("Installing tofu {spec}"), console.quiet);
    let installed = match client.install(&spec, &config.strategy) {
        Ok(installed) => {
            progress::finish_success(&pb, &installed.to_string());
            installed
        }
        Err(e) => {
            progress::finish_error(&pb, "Installation failed");
            return Err(e.into());
        }
    };

    let mut engine = make_engine(&config.working_dir, &installed.path);
    log::debug!(
        "Engine {} bound to {}",
        engine.exec_path().display(),
        engine.working_dir().display()
    );

    log::debug!("Setting up log adapter");
    let adapter = LogUploadAdapter::new(config.uploads.logs.clone(), config.token.clone(), http.clone());

    log::debug!("Setting up execution environment");
    tofuexec::env::setup(
        engine.as_mut(),
        Box::new(Tee::new().with(adapter.sink()).with(console.stdout())),
        Box::new(Tee::new().with(adapter.sink()).with(console.stderr())),
    )
    .map_err(RunError::EnvironmentSetupFailed)?;

    let result = plan_and_upload(config, engine.as_mut(), adapter.sink(), http, console);

    let log_upload = adapter.flush().err();
    if let Some(e) = &log_upload {
        log::error!("{e}");
    }

    let (has_changes, uploads) = result?;
    Ok(RunSummary {
        operation: config.operation,
        version: installed.version,
        engine_path: installed.path,
        has_changes,
        uploads,
        log_upload,
    })
}

fn plan_and_upload(
    config: &RunConfig,
    engine: &mut dyn Engine,
    log_sink: LogBuffer,
    http: &HttpPut,
    console: Console,
) -> Result<(bool, UploadReport), RunError> {
    let structured = LogBuffer::default();
    let mut events = Tee::new().with(log_sink).with(console.stdout());
    if config.uploads.structured_json.is_some() {
        events = events.with(structured.clone());
    }

    let mut executor = PlanExecutor::new(engine);
    executor.init()?;
    let outcome = executor.plan(&mut events, &config.plan)?;
    log::debug!("Plan state: {:?}", executor.state());
    let plan_file = match outcome {
        PlanOutcome::NoChanges => return Ok((false, UploadReport::default())),
        PlanOutcome::Changes { plan_file } => plan_file,
    };

    let bundle = artifacts::assemble(engine, &plan_file)?;
    let structured = structured.contents();

    let targets = &config.uploads;
    let mut jobs = vec![
        UploadJob {
            artifact: Artifact::PlanFile,
            url: targets.plan_file.as_deref(),
            body: &bundle.plan_file,
        },
        UploadJob {
            artifact: Artifact::HostedJsonPlan,
            url: targets.hosted_json_plan.as_deref(),
            body: &bundle.hosted_json_plan,
        },
        UploadJob {
            artifact: Artifact::RedactedJsonPlan,
            url: targets.redacted_json_plan.as_deref(),
            body: &bundle.redacted_json_plan,
        },
    ];
    if targets.structured_json.is_some() {
        jobs.push(UploadJob {
            artifact: Artifact::StructuredJson,
            url: targets.structured_json.as_deref(),
            body: &structured,
        });
    }

    Ok((true, upload::fan_out(http, &jobs)))
}

/// Print the end-of-run summary.
pub fn print_summary(summary: &RunSummary) {
    ui::header(&format!("tofu {}", summary.operation));
    ui::kv("version", &summary.version.to_string());
    ui::kv("engine", &summary.engine_path.display().to_string());
    ui::kv("uploaded", &summary.uploads.uploaded().to_string());

    if !summary.has_changes {
        ui::success("No changes, nothing uploaded");
        return;
    }

    for (artifact, outcome) in &summary.uploads.results {
        match outcome {
            UploadOutcome::Uploaded => ui::success(&format!("Uploaded {artifact}")),
            UploadOutcome::Skipped => ui::warn(&format!("Skipped {artifact} (no URL)")),
            UploadOutcome::Failed(e) => ui::error(&e.to_string()),
        }
    }
    if let Some(e) = &summary.log_upload {
        ui::error(&e.to_string());
    }
}
