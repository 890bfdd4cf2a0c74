//! Child process environment.

use crate::engine::Engine;
use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::io::Write;

/// Variables the driver sets on every invocation. Passing any of them in
/// through [`Engine::set_env`] is an error.
pub const PROHIBITED_ENV: &[&str] = &[
    "CHECKPOINT_DISABLE",
    "TF_APPEND_USER_AGENT",
    "TF_CLI_ARGS",
    "TF_DISABLE_PLUGIN_TLS",
    "TF_INPUT",
    "TF_IN_AUTOMATION",
    "TF_LOG",
    "TF_LOG_CORE",
    "TF_LOG_PATH",
    "TF_LOG_PROVIDER",
    "TF_REATTACH_PROVIDERS",
    "TF_SKIP_PROVIDER_VERIFY",
    "TF_WORKSPACE",
];

/// Collect `KEY=VALUE` entries into a map.
///
/// Entries that do not contain exactly one `=` are skipped, so a value that
/// itself contains `=` is not passed through.
pub fn environ_map<I, S>(entries: I) -> BTreeMap<String, String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut env = BTreeMap::new();
    for entry in entries {
        let entry = entry.as_ref();
        let mut chunks = entry.split('=');
        match (chunks.next(), chunks.next(), chunks.next()) {
            (Some(key), Some(value), None) => {
                env.insert(key.to_string(), value.to_string());
            }
            _ => log::trace!("Skipping malformed environment entry"),
        }
    }
    env
}

/// The current process environment as `KEY=VALUE` strings.
///
/// Variables that are not valid UTF-8 are left out.
#[must_use]
pub fn process_environ() -> Vec<String> {
    std::env::vars_os()
        .filter_map(|(k, v)| Some(format!("{}={}", k.into_string().ok()?, v.into_string().ok()?)))
        .collect()
}

/// Reject variables in [`PROHIBITED_ENV`].
pub fn check_prohibited(env: &BTreeMap<String, String>) -> Result<()> {
    match PROHIBITED_ENV.iter().find(|name| env.contains_key(**name)) {
        Some(name) => Err(Error::ManualEnvVar((*name).to_string())),
        None => Ok(()),
    }
}

/// Pass the current process environment to `engine` and bind its output
/// streams.
pub fn setup(
    engine: &mut dyn Engine,
    stdout: Box<dyn Write + Send>,
    stderr: Box<dyn Write + Send>,
) -> Result<()> {
    let env = environ_map(process_environ());
    log::debug!("Passing {} environment variables to the engine", env.len());
    engine.set_env(env)?;
    engine.set_stdout(stdout);
    engine.set_stderr(stderr);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environ_map_keeps_well_formed() {
        let env = environ_map(["HOME=/root", "PATH=/usr/bin:/bin", "EMPTY="]);
        assert_eq!(env.len(), 3);
        assert_eq!(env["HOME"], "/root");
        assert_eq!(env["EMPTY"], "");
    }

    #[test]
    fn test_environ_map_skips_malformed() {
        let env = environ_map(["NOEQUALS", "A=b=c", "OK=1"]);
        assert_eq!(env.len(), 1);
        assert_eq!(env["OK"], "1");
    }

    #[test]
    fn test_environ_map_last_wins() {
        let env = environ_map(["X=1", "X=2"]);
        assert_eq!(env["X"], "2");
    }

    #[test]
    fn test_process_environ_is_well_formed() {
        for entry in process_environ() {
            assert!(entry.contains('='));
        }
    }

    #[test]
    fn test_check_prohibited() {
        let ok = environ_map(["AWS_REGION=eu-west-1", "TF_VAR_name=x"]);
        assert!(check_prohibited(&ok).is_ok());

        let bad = environ_map(["TF_LOG=TRACE"]);
        let err = check_prohibited(&bad).unwrap_err();
        assert!(matches!(err, Error::ManualEnvVar(ref name) if name == "TF_LOG"));
    }
}
