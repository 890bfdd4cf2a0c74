//! # tofuexec
//!
//! Drive the OpenTofu CLI from Rust.
//!
//! The [`Engine`] trait covers the handful of commands a plan runner needs:
//! `init`, `plan -json`, `show -json` and `providers schema -json`.
//! [`TofuCli`] implements it by spawning the `tofu` executable;
//! [`MockEngine`] implements it in memory for tests.
//!
//! ## Example
//!
//! ```no_run
//! use tofuexec::{Engine, InitOptions, PlanOptions, TofuCli};
//!
//! let mut tofu = TofuCli::new("./infra", "/usr/local/bin/tofu");
//! tofu.init(&InitOptions::default())?;
//!
//! let mut events = std::io::stdout();
//! let changed = tofu.plan_json(&mut events, &PlanOptions::new("tfplan"))?;
//! println!("changes: {changed}");
//! # Ok::<(), tofuexec::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod cli;
pub mod engine;
pub mod env;
pub mod error;
pub mod json;
pub mod mock;
pub mod options;

pub use cli::TofuCli;
pub use engine::Engine;
pub use error::{Error, Result};
pub use json::{Change, Plan, ProviderSchemas, ResourceAttribute, ResourceChange};
pub use mock::{MockCalls, MockEngine, MockFailure};
pub use options::{InitOptions, PlanOptions};
