//! Subprocess driver for the `tofu` executable.

use crate::engine::Engine;
use crate::env::check_prohibited;
use crate::error::{Error, Result};
use crate::json::{Plan, ProviderSchemas};
use crate::options::{InitOptions, PlanOptions};
use std::collections::BTreeMap;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;

/// Bytes of stderr kept for error messages.
const STDERR_TAIL: usize = 4096;

/// `-detailed-exitcode`: success with a non-empty diff.
const EXIT_CHANGES_PRESENT: i32 = 2;

/// Drives the `tofu` binary as a child process.
pub struct TofuCli {
    working_dir: PathBuf,
    exec_path: PathBuf,
    env: Option<BTreeMap<String, String>>,
    stdout: Box<dyn Write + Send>,
    stderr: Box<dyn Write + Send>,
}

/// Exit status and stderr tail of a finished command.
struct Finished {
    code: Option<i32>,
    stderr: String,
}

impl TofuCli {
    /// Bind `exec_path` to `working_dir`.
    ///
    /// Output is discarded until sinks are set.
    pub fn new(working_dir: impl Into<PathBuf>, exec_path: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
            exec_path: exec_path.into(),
            env: None,
            stdout: Box::new(io::sink()),
            stderr: Box::new(io::sink()),
        }
    }

    fn render(&self, args: &[String]) -> String {
        let program = self
            .exec_path
            .file_name()
            .map_or_else(|| self.exec_path.display().to_string(), |n| n.to_string_lossy().into_owned());
        format!("{program} {}", args.join(" "))
    }

    fn command(&self, args: &[String]) -> Command {
        let mut cmd = Command::new(&self.exec_path);
        cmd.args(args)
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(env) = &self.env {
            cmd.env_clear().envs(env);
        }
        cmd.env("TF_IN_AUTOMATION", "1")
            .env("TF_INPUT", "0")
            .env("CHECKPOINT_DISABLE", "1");
        cmd
    }

    /// Run `args`, copying stdout into `stdout` and stderr into the stderr
    /// sink while keeping a tail for error reporting.
    fn run(&mut self, args: &[String], stdout: Option<&mut dyn Write>) -> Result<Finished> {
        let rendered = self.render(args);
        log::debug!("Running {rendered} in {}", self.working_dir.display());

        let mut child = spawn(&mut self.command(args)).map_err(|source| Error::Spawn {
            command: rendered.clone(),
            source,
        })?;

        let io_error = |source| Error::Io {
            command: rendered.clone(),
            source,
        };

        let mut child_stdout = child.stdout.take();
        let mut child_stderr = child.stderr.take();
        let stderr_sink = &mut self.stderr;
        let stdout_sink: &mut dyn Write = match stdout {
            Some(w) => w,
            None => &mut self.stdout,
        };

        let streamed = thread::scope(|s| {
            let reader = s.spawn(move || -> io::Result<String> {
                let mut tail = Vec::new();
                if let Some(stream) = child_stderr.as_mut() {
                    copy_with_tail(stream, stderr_sink, &mut tail)?;
                }
                Ok(String::from_utf8_lossy(&tail).trim().to_string())
            });

            let copied = match child_stdout.as_mut() {
                Some(stream) => copy_lines(stream, stdout_sink),
                None => Ok(()),
            };
            // Nobody drains stdout any more; the child would block on a full pipe.
            if copied.is_err()
                && let Err(e) = child.kill()
            {
                log::debug!("Failed to kill {rendered}: {e}");
            }

            let tail = reader
                .join()
                .unwrap_or_else(|_| Err(io::Error::other("stderr reader panicked")));
            copied.and(tail)
        });

        let stderr_tail = match streamed {
            Ok(tail) => tail,
            Err(e) => {
                if let Err(wait_err) = child.wait() {
                    log::debug!("Failed to reap {rendered}: {wait_err}");
                }
                return Err(io_error(e));
            }
        };

        let status = child.wait().map_err(io_error)?;
        Ok(Finished {
            code: status.code(),
            stderr: stderr_tail,
        })
    }

    /// Run `args` and capture stdout, failing on a non-zero exit.
    fn run_capture(&mut self, args: &[String]) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        let finished = self.run(args, Some(&mut out))?;
        self.expect_success(args, finished)?;
        Ok(out)
    }

    fn expect_success(&self, args: &[String], finished: Finished) -> Result<()> {
        match finished.code {
            Some(0) => Ok(()),
            code => Err(Error::CommandFailed {
                command: self.render(args),
                code,
                stderr: finished.stderr,
            }),
        }
    }

    fn decode<T: serde::de::DeserializeOwned>(&self, args: &[String], raw: &[u8]) -> Result<T> {
        serde_json::from_slice(raw).map_err(|source| Error::InvalidOutput {
            command: self.render(args),
            source,
        })
    }
}

/// Spawn `cmd`, retrying while the executable is still held open for
/// writing by a concurrent fork (ETXTBSY right after installation).
fn spawn(cmd: &mut Command) -> io::Result<std::process::Child> {
    const ETXTBSY: i32 = 26;
    let mut attempts = 0;
    loop {
        match cmd.spawn() {
            Err(e) if cfg!(unix) && e.raw_os_error() == Some(ETXTBSY) && attempts < 5 => {
                attempts += 1;
                thread::sleep(std::time::Duration::from_millis(20 * attempts));
            }
            result => return result,
        }
    }
}

/// Forward `reader` to `writer` line by line so consumers see events as
/// they are produced.
fn copy_lines(reader: &mut dyn Read, writer: &mut dyn Write) -> io::Result<()> {
    let mut reader = BufReader::new(reader);
    let mut line = Vec::new();
    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            break;
        }
        writer.write_all(&line)?;
    }
    writer.flush()
}

fn copy_with_tail(reader: &mut dyn Read, writer: &mut dyn Write, tail: &mut Vec<u8>) -> io::Result<()> {
    let mut buf = [0u8; 8192];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        writer.write_all(&buf[..n])?;
        tail.extend_from_slice(&buf[..n]);
        if tail.len() > STDERR_TAIL {
            let excess = tail.len() - STDERR_TAIL;
            tail.drain(..excess);
        }
    }
    writer.flush()
}

fn args<I: IntoIterator<Item = S>, S: Into<String>>(items: I) -> Vec<String> {
    items.into_iter().map(Into::into).collect()
}

impl Engine for TofuCli {
    fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    fn exec_path(&self) -> &Path {
        &self.exec_path
    }

    fn set_env(&mut self, env: BTreeMap<String, String>) -> Result<()> {
        check_prohibited(&env)?;
        self.env = Some(env);
        Ok(())
    }

    fn set_stdout(&mut self, writer: Box<dyn Write + Send>) {
        self.stdout = writer;
    }

    fn set_stderr(&mut self, writer: Box<dyn Write + Send>) {
        self.stderr = writer;
    }

    fn init(&mut self, opts: &InitOptions) -> Result<()> {
        let mut argv = args(["init", "-no-color", "-input=false"]);
        argv.extend(opts.args());
        let finished = self.run(&argv, None)?;
        self.expect_success(&argv, finished)
    }

    fn plan_json(&mut self, events: &mut dyn Write, opts: &PlanOptions) -> Result<bool> {
        let mut argv = args([
            "plan",
            "-no-color",
            "-input=false",
            "-detailed-exitcode",
            "-json",
        ]);
        argv.extend(opts.args());

        let finished = self.run(&argv, Some(events))?;
        match finished.code {
            Some(0) => Ok(false),
            Some(EXIT_CHANGES_PRESENT) => Ok(true),
            code => Err(Error::CommandFailed {
                command: self.render(&argv),
                code,
                stderr: finished.stderr,
            }),
        }
    }

    fn show_plan_file(&mut self, plan_file: &Path) -> Result<Plan> {
        let mut argv = args(["show", "-json", "-no-color"]);
        argv.push(plan_file.display().to_string());
        let raw = self.run_capture(&argv)?;
        self.decode(&argv, &raw)
    }

    fn providers_schema(&mut self) -> Result<ProviderSchemas> {
        let argv = args(["providers", "schema", "-json", "-no-color"]);
        let raw = self.run_capture(&argv)?;
        self.decode(&argv, &raw)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    /// A fake engine: a shell script answering the subcommands we issue.
    const FAKE_TOFU: &str = r#"#!/bin/sh
case "$1" in
  init)
    echo "OpenTofu has been successfully initialized!"
    echo "init args: $*" >&2
    exit 0 ;;
  plan)
    echo '{"@level":"info","type":"version"}'
    echo '{"@level":"info","type":"change_summary"}'
    for arg in "$@"; do
      case "$arg" in -target=none) exit 0 ;; -target=broken) echo "Error: boom" >&2; exit 1 ;; esac
    done
    echo "plan" > tfplan
    exit 2 ;;
  show)
    echo '{"format_version":"1.2","resource_changes":[{"address":"null_resource.a","change":{"actions":["create"]}}]}'
    exit 0 ;;
  providers)
    echo '{"format_version":"1.0","provider_schemas":{}}'
    exit 0 ;;
  env)
    echo "FROM_ENV=$FROM_ENV TF_IN_AUTOMATION=$TF_IN_AUTOMATION"
    exit 0 ;;
esac
exit 64
"#;

    #[derive(Clone, Default)]
    struct Shared(Arc<Mutex<Vec<u8>>>);

    impl Write for Shared {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Shared {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    fn fake_engine() -> (TempDir, TofuCli) {
        let dir = TempDir::new().unwrap();
        let exec = dir.path().join("tofu");
        fs::write(&exec, FAKE_TOFU).unwrap();
        fs::set_permissions(&exec, fs::Permissions::from_mode(0o755)).unwrap();
        let cli = TofuCli::new(dir.path(), exec);
        (dir, cli)
    }

    #[test]
    fn test_init_streams_to_sinks() {
        let (_dir, mut cli) = fake_engine();
        let stdout = Shared::default();
        let stderr = Shared::default();
        cli.set_stdout(Box::new(stdout.clone()));
        cli.set_stderr(Box::new(stderr.clone()));

        cli.init(&InitOptions::default()).unwrap();

        assert!(stdout.text().contains("successfully initialized"));
        assert!(stderr.text().contains("-upgrade=false"));
    }

    #[test]
    fn test_plan_json_with_changes() {
        let (dir, mut cli) = fake_engine();
        let mut events = Vec::new();

        let changed = cli.plan_json(&mut events, &PlanOptions::new("tfplan")).unwrap();

        assert!(changed);
        let events = String::from_utf8(events).unwrap();
        assert_eq!(events.lines().count(), 2);
        assert!(dir.path().join("tfplan").exists());
    }

    #[test]
    fn test_plan_json_without_changes() {
        let (_dir, mut cli) = fake_engine();
        let mut events = Vec::new();
        let changed = cli
            .plan_json(&mut events, &PlanOptions::new("tfplan").target("none"))
            .unwrap();
        assert!(!changed);
    }

    #[test]
    fn test_plan_json_failure_reports_stderr() {
        let (_dir, mut cli) = fake_engine();
        let err = cli
            .plan_json(&mut io::sink(), &PlanOptions::new("tfplan").target("broken"))
            .unwrap_err();
        assert_eq!(err.exit_code(), Some(1));
        assert!(err.to_string().contains("Error: boom"));
    }

    #[test]
    fn test_show_and_schema_decode() {
        let (dir, mut cli) = fake_engine();
        let plan = cli.show_plan_file(&dir.path().join("tfplan")).unwrap();
        assert_eq!(plan.resource_changes[0].address, "null_resource.a");

        let schemas = cli.providers_schema().unwrap();
        assert_eq!(schemas.format_version, "1.0");
    }

    #[test]
    fn test_set_env_replaces_environment() {
        let (_dir, mut cli) = fake_engine();
        let mut env = BTreeMap::new();
        env.insert("FROM_ENV".to_string(), "yes".to_string());
        env.insert("PATH".to_string(), "/usr/bin:/bin".to_string());
        cli.set_env(env).unwrap();

        let out = cli.run_capture(&args(["env"])).unwrap();
        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("FROM_ENV=yes"));
        assert!(out.contains("TF_IN_AUTOMATION=1"));
    }

    #[test]
    fn test_set_env_rejects_managed_variables() {
        let (_dir, mut cli) = fake_engine();
        let mut env = BTreeMap::new();
        env.insert("TF_IN_AUTOMATION".to_string(), "1".to_string());
        assert!(matches!(cli.set_env(env), Err(Error::ManualEnvVar(_))));
    }

    /// A console that has gone away, like stdout piped into `head`.
    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::ErrorKind::BrokenPipe.into())
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_stdout_write_error_kills_child() {
        let dir = TempDir::new().unwrap();
        let exec = dir.path().join("tofu");
        fs::write(&exec, "#!/bin/sh
echo started
exec sleep 30
").unwrap();
        fs::set_permissions(&exec, fs::Permissions::from_mode(0o755)).unwrap();
        let mut cli = TofuCli::new(dir.path(), exec);
        cli.set_stdout(Box::new(ClosedPipe));

        let started = std::time::Instant::now();
        let err = cli.init(&InitOptions::default()).unwrap_err();

        assert!(matches!(err, Error::Io { .. }));
        assert!(started.elapsed() < std::time::Duration::from_secs(20));
    }

    #[test]
    fn test_spawn_failure() {
        let dir = TempDir::new().unwrap();
        let mut cli = TofuCli::new(dir.path(), dir.path().join("missing"));
        let err = cli.init(&InitOptions::default()).unwrap_err();
        assert!(matches!(err, Error::Spawn { .. }));
    }
}
