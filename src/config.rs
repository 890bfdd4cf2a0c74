//! Immutable run configuration.
//!
//! Built once from the parsed command line and handed by reference to every
//! stage of the pipeline.

use crate::cli::{Cli, InstallStrategy, Operation};
use crate::error::RunError;
use std::path::{Path, PathBuf};
use toolchain::Strategy;
use toolchain::install::cached::CachedInstaller;

/// Everything a run needs to know.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub operation: Operation,
    /// Directory the engine runs in.
    pub working_dir: PathBuf,
    /// Raw version string; resolved during provisioning.
    pub version: String,
    pub plan: PlanSettings,
    pub uploads: UploadTargets,
    /// `TFE_TOKEN`, sent to the log endpoint and the control plane.
    pub token: Option<String>,
    pub api_address: Option<String>,
    pub strategy: Strategy,
}

/// Plan shaping flags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanSettings {
    pub plan_only: bool,
    pub destroy: bool,
    /// Target addresses in command-line order.
    pub targets: Vec<String>,
}

/// Upload destinations. `None` means the artifact is not uploaded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadTargets {
    pub logs: Option<String>,
    pub plan_file: Option<String>,
    pub hosted_json_plan: Option<String>,
    pub structured_json: Option<String>,
    pub redacted_json_plan: Option<String>,
}

impl RunConfig {
    /// Build the configuration relative to `cwd`.
    pub fn from_cli(cli: &Cli, cwd: &Path) -> Result<Self, RunError> {
        let working_dir = match non_empty(cli.directory.as_deref()) {
            Some(dir) => absolutize(cwd, &shellexpand::tilde(dir)),
            None => cwd.to_path_buf(),
        };
        if !working_dir.is_dir() {
            return Err(RunError::InvalidConfig(format!(
                "working directory {} does not exist",
                working_dir.display()
            )));
        }

        let strategy = match cli.install_strategy {
            InstallStrategy::Download => Strategy::Download {
                install_dir: cli
                    .install_dir
                    .as_deref()
                    .map_or_else(|| cwd.to_path_buf(), |d| absolutize(cwd, &d.to_string_lossy())),
            },
            InstallStrategy::Cached => Strategy::Cached {
                cache_dir: match &cli.cache_dir {
                    Some(dir) => absolutize(cwd, &dir.to_string_lossy()),
                    None => CachedInstaller::default_cache_dir().ok_or_else(|| {
                        RunError::InvalidConfig(
                            "no cache directory available; pass --cache-dir".to_string(),
                        )
                    })?,
                },
            },
        };

        if cli.log_stream_url.is_some() {
            log::debug!("Log streaming is disabled; ignoring --log-stream-url");
        }

        Ok(Self {
            operation: cli.operation,
            working_dir,
            version: cli.tofu_version.clone(),
            plan: PlanSettings {
                plan_only: cli.plan_only,
                destroy: cli.destroy,
                targets: parse_targets(&cli.targets),
            },
            uploads: UploadTargets {
                logs: log_upload_url(
                    cli.log_upload_url.as_deref(),
                    cli.log_address.as_deref(),
                    cli.run_id.as_deref(),
                ),
                plan_file: owned(cli.hosted_plan_upload_url.as_deref()),
                hosted_json_plan: owned(cli.hosted_json_plan_upload_url.as_deref()),
                structured_json: owned(cli.hosted_structured_json_upload_url.as_deref()),
                redacted_json_plan: owned(cli.redacted_json_upload_url.as_deref()),
            },
            token: owned(cli.token.as_deref()),
            api_address: owned(cli.api_address.as_deref()),
            strategy,
        })
    }
}

/// Split a comma-separated target list, keeping order.
///
/// Blank entries are dropped, so `""` yields no targets.
pub fn parse_targets(targets: &str) -> Vec<String> {
    targets
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// The explicit log URL, or `<log-address>/runs/<run-id>/logs`.
pub fn log_upload_url(
    explicit: Option<&str>,
    address: Option<&str>,
    run_id: Option<&str>,
) -> Option<String> {
    if let Some(url) = non_empty(explicit) {
        return Some(url.to_string());
    }
    match (non_empty(address), non_empty(run_id)) {
        (Some(address), Some(run_id)) => Some(format!(
            "{}/runs/{run_id}/logs",
            address.trim_end_matches('/')
        )),
        _ => None,
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn owned(value: Option<&str>) -> Option<String> {
    non_empty(value).map(str::to_string)
}

fn absolutize(cwd: &Path, path: &str) -> PathBuf {
    let path = PathBuf::from(path);
    if path.is_absolute() { path } else { cwd.join(path) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_normalized(std::iter::once("tofu-runner").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn test_parse_targets_order() {
        assert_eq!(
            parse_targets("aws_instance.a,aws_instance.b"),
            vec!["aws_instance.a", "aws_instance.b"]
        );
    }

    #[test]
    fn test_parse_targets_empty() {
        assert!(parse_targets("").is_empty());
        assert!(parse_targets(" , ").is_empty());
    }

    #[test]
    fn test_log_url_explicit_wins() {
        assert_eq!(
            log_upload_url(Some("http://logs/x"), Some("http://addr"), Some("run-1")),
            Some("http://logs/x".to_string())
        );
    }

    #[test]
    fn test_log_url_from_address_and_run_id() {
        assert_eq!(
            log_upload_url(None, Some("http://addr/"), Some("run-1")),
            Some("http://addr/runs/run-1/logs".to_string())
        );
        assert_eq!(log_upload_url(Some(""), Some("http://addr"), None), None);
    }

    #[test]
    fn test_from_cli_defaults_to_cwd() {
        let dir = TempDir::new().unwrap();
        let config = RunConfig::from_cli(&cli(&["plan"]), dir.path()).unwrap();

        assert_eq!(config.working_dir, dir.path());
        assert_eq!(config.version, "latest");
        assert_eq!(
            config.strategy,
            Strategy::Download {
                install_dir: dir.path().to_path_buf()
            }
        );
        assert_eq!(config.plan, PlanSettings::default());
    }

    #[test]
    fn test_from_cli_relative_directory() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("infra")).unwrap();

        let config = RunConfig::from_cli(
            &cli(&["-directory=infra", "-plan-only", "-targets=a,b", "plan"]),
            dir.path(),
        )
        .unwrap();

        assert_eq!(config.working_dir, dir.path().join("infra"));
        assert!(config.plan.plan_only);
        assert_eq!(config.plan.targets, vec!["a", "b"]);
    }

    #[test]
    fn test_from_cli_missing_directory() {
        let dir = TempDir::new().unwrap();
        let err = RunConfig::from_cli(&cli(&["-directory=nope", "plan"]), dir.path()).unwrap_err();
        assert!(matches!(err, RunError::InvalidConfig(_)));
    }

    #[test]
    fn test_from_cli_cached_strategy() {
        let dir = TempDir::new().unwrap();
        let config = RunConfig::from_cli(
            &cli(&["--install-strategy=cached", "--cache-dir=cache", "plan"]),
            dir.path(),
        )
        .unwrap();
        assert_eq!(
            config.strategy,
            Strategy::Cached {
                cache_dir: dir.path().join("cache")
            }
        );
    }

    #[test]
    fn test_empty_urls_are_unset() {
        let dir = TempDir::new().unwrap();
        let config = RunConfig::from_cli(
            &cli(&["--hosted-plan-upload-url=", "--redacted-json-upload-url=http://r", "plan"]),
            dir.path(),
        )
        .unwrap();
        assert_eq!(config.uploads.plan_file, None);
        assert_eq!(config.uploads.redacted_json_plan.as_deref(), Some("http://r"));
    }
}
