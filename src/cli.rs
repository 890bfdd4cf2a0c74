use clap::builder::BoolishValueParser;
use clap::{ArgAction, CommandFactory, Parser, ValueEnum};
use std::ffi::OsString;
use std::fmt;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "tofu-runner")]
#[command(author = "Alberto Cavalcante")]
#[command(about = "Provision OpenTofu, run a plan and upload its artifacts", long_about = None)]
#[command(disable_version_flag = true)]
#[command(args_override_self = true)]
pub struct Cli {
    /// Operation to run
    #[arg(value_enum)]
    pub operation: Operation,

    /// Working directory for the engine (defaults to the current directory)
    #[arg(long, env = "TOFU_RUNNER_DIRECTORY")]
    pub directory: Option<String>,

    /// OpenTofu version to run ("latest" selects the pinned default)
    #[arg(long = "version", env = "TOFU_RUNNER_VERSION", default_value = "latest")]
    pub tofu_version: String,

    /// Log debug statements
    #[arg(long, env = "TOFU_RUNNER_DEBUG", action = ArgAction::Set, num_args = 0..=1,
          require_equals = true, default_value = "false", default_missing_value = "true",
          value_parser = BoolishValueParser::new())]
    pub debug: bool,

    // ========================================================================
    // Plan shaping
    // ========================================================================
    /// Only run a plan (disables state locking)
    #[arg(long, env = "TOFU_RUNNER_PLAN_ONLY", action = ArgAction::Set, num_args = 0..=1,
          require_equals = true, default_value = "false", default_missing_value = "true",
          value_parser = BoolishValueParser::new())]
    pub plan_only: bool,

    /// Comma-separated resource addresses to target
    #[arg(long, env = "TOFU_RUNNER_TARGETS", default_value = "")]
    pub targets: String,

    /// Plan a destroy
    #[arg(long, env = "TOFU_RUNNER_DESTROY", action = ArgAction::Set, num_args = 0..=1,
          require_equals = true, default_value = "false", default_missing_value = "true",
          value_parser = BoolishValueParser::new())]
    pub destroy: bool,

    // ========================================================================
    // Upload destinations
    // ========================================================================
    /// URL to upload logs to
    #[arg(long, env = "TOFU_RUNNER_LOG_UPLOAD_URL")]
    pub log_upload_url: Option<String>,

    /// URL to upload the binary plan file to
    #[arg(long, env = "TOFU_RUNNER_HOSTED_PLAN_UPLOAD_URL")]
    pub hosted_plan_upload_url: Option<String>,

    /// URL to upload the hosted JSON plan to
    #[arg(long, env = "TOFU_RUNNER_HOSTED_JSON_PLAN_UPLOAD_URL")]
    pub hosted_json_plan_upload_url: Option<String>,

    /// URL to upload the structured plan event stream to
    #[arg(long, env = "TOFU_RUNNER_HOSTED_STRUCTURED_JSON_UPLOAD_URL")]
    pub hosted_structured_json_upload_url: Option<String>,

    /// URL to upload the redacted JSON plan to
    #[arg(long, env = "TOFU_RUNNER_REDACTED_JSON_UPLOAD_URL")]
    pub redacted_json_upload_url: Option<String>,

    /// Log service base address, used with --run-id when no log URL is given
    #[arg(long, env = "TOFU_RUNNER_LOG_ADDRESS")]
    pub log_address: Option<String>,

    /// ID of the current run
    #[arg(long, env = "TOFU_RUNNER_RUN_ID")]
    pub run_id: Option<String>,

    /// Endpoint for streaming logs (streaming is disabled; accepted and ignored)
    #[arg(long, env = "TOFU_RUNNER_LOG_STREAM_URL", hide = true)]
    pub log_stream_url: Option<String>,

    /// Control plane address; requires TFE_TOKEN
    #[arg(long, env = "TOFU_RUNNER_API_ADDRESS")]
    pub api_address: Option<String>,

    /// Token for the control plane and the log endpoint
    #[arg(long, env = "TFE_TOKEN", hide_env_values = true, hide = true)]
    pub token: Option<String>,

    // ========================================================================
    // Provisioning
    // ========================================================================
    /// How the engine binary is provisioned
    #[arg(long, env = "TOFU_RUNNER_INSTALL_STRATEGY", value_enum, default_value_t = InstallStrategy::Download)]
    pub install_strategy: InstallStrategy,

    /// Directory the downloaded engine is written to (download strategy)
    #[arg(long, env = "TOFU_RUNNER_INSTALL_DIR")]
    pub install_dir: Option<PathBuf>,

    /// Cache root (cached strategy)
    #[arg(long, env = "TOFU_RUNNER_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Verbosity level
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long)]
    pub quiet: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Operation {
    Plan,
    Apply,
    Destroy,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::Plan => "plan",
            Operation::Apply => "apply",
            Operation::Destroy => "destroy",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum InstallStrategy {
    /// Download the release archive on every run
    Download,
    /// Reuse binaries cached per version
    Cached,
}

impl Cli {
    /// Parse `args`, accepting single-dash long flags (`-version=1.8.2`).
    pub fn parse_normalized<I, T>(args: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        Self::parse_from(normalize_args(args))
    }

    /// Like [`Cli::parse_normalized`] but returns parse errors.
    pub fn try_parse_normalized<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        Self::try_parse_from(normalize_args(args))
    }
}

/// Rewrite `-name` / `-name=value` to `--name...` for every known long flag.
///
/// Short flags (`-v`, `-vv`, `-q`) and everything after `--` are untouched.
pub fn normalize_args<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let command = Cli::command();
    let longs: Vec<&str> = command.get_arguments().filter_map(|a| a.get_long()).collect();

    let mut seen_separator = false;
    args.into_iter()
        .map(Into::into)
        .map(|arg| {
            if seen_separator {
                return arg;
            }
            let Some(s) = arg.to_str() else {
                return arg;
            };
            if s == "--" {
                seen_separator = true;
                return arg;
            }
            match s.strip_prefix('-') {
                Some(rest) if !rest.starts_with('-') => {
                    let name = rest.split_once('=').map_or(rest, |(n, _)| n);
                    if longs.contains(&name) {
                        OsString::from(format!("-{s}"))
                    } else {
                        arg
                    }
                }
                _ => arg,
            }
        })
        .collect()
}
