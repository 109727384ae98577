// src/config/mod.rs

//! Command catalog loading and validation.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a catalog from disk or the built-in copy (`loader.rs`).
//! - Validate it (`validate.rs`).
//! - Resolve `{host}` / `{port}` templates into commands (`template.rs`).

pub mod duration;
pub mod loader;
pub mod model;
pub mod template;
pub mod validate;

pub use duration::parse_duration;
pub use loader::{builtin_catalog, load_and_validate, load_catalog, load_from_path, parse_and_validate};
pub use model::{
    CatalogFile, CommandConfig, ConfigSection, DefaultSection, ModuleConfig, RawCatalogFile,
};
pub use template::{Target, resolve};

use crate::errors::{DiaghubError, Result};
use crate::exec::{RunnerOptions, Shell};

impl ConfigSection {
    /// Runner options described by this section.
    pub fn runner_options(&self) -> Result<RunnerOptions> {
        let grace_period =
            parse_duration(&self.grace_period).map_err(DiaghubError::ConfigError)?;

        let default_shell = Shell::default();
        let shell = Shell {
            program: self.shell.clone().unwrap_or(default_shell.program),
            flag: self.shell_flag.clone().unwrap_or(default_shell.flag),
        };

        Ok(RunnerOptions {
            shell,
            grace_period,
            busy_policy: self.when_busy,
        })
    }
}
