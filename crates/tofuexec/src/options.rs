//! Command options.

use std::path::PathBuf;

/// Options for `tofu plan`.
///
/// ```
/// use tofuexec::PlanOptions;
///
/// let opts = PlanOptions::new("tfplan").lock(false).target("aws_instance.a");
/// assert_eq!(
///     opts.args(),
///     vec!["-out=tfplan", "-lock=false", "-target=aws_instance.a"],
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanOptions {
    /// Where the binary plan file is written, relative to the working dir.
    pub out: Option<PathBuf>,
    /// Whether to take the state lock.
    pub lock: bool,
    /// Plan a destroy.
    pub destroy: bool,
    /// Resource addresses to scope the plan to, in order.
    pub targets: Vec<String>,
}

impl Default for PlanOptions {
    fn default() -> Self {
        Self {
            out: None,
            lock: true,
            destroy: false,
            targets: Vec::new(),
        }
    }
}

impl PlanOptions {
    /// Plan writing the binary plan to `out`.
    #[must_use]
    pub fn new(out: impl Into<PathBuf>) -> Self {
        Self {
            out: Some(out.into()),
            ..Self::default()
        }
    }

    /// Set whether the state lock is taken.
    #[must_use]
    pub fn lock(mut self, lock: bool) -> Self {
        self.lock = lock;
        self
    }

    /// Set destroy mode.
    #[must_use]
    pub fn destroy(mut self, destroy: bool) -> Self {
        self.destroy = destroy;
        self
    }

    /// Add one target address.
    #[must_use]
    pub fn target(mut self, address: impl Into<String>) -> Self {
        self.targets.push(address.into());
        self
    }

    /// Render as command-line flags.
    #[must_use]
    pub fn args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(out) = &self.out {
            args.push(format!("-out={}", out.display()));
        }
        if !self.lock {
            args.push("-lock=false".to_string());
        }
        if self.destroy {
            args.push("-destroy".to_string());
        }
        for target in &self.targets {
            args.push(format!("-target={target}"));
        }
        args
    }
}

/// Options for `tofu init`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InitOptions {
    /// Upgrade modules and providers to the newest allowed versions.
    pub upgrade: bool,
}

impl InitOptions {
    /// Render as command-line flags.
    #[must_use]
    pub fn args(&self) -> Vec<String> {
        vec![format!("-upgrade={}", self.upgrade)]
    }
}
