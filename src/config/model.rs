// src/config/model.rs

use serde::Deserialize;

use crate::command::Command;
use crate::config::template::{Target, resolve};
use crate::errors::Result;
use crate::types::{BusyPolicy, ExecutionMode};

/// Catalog as read from TOML, before validation.
///
/// ```toml
/// [config]
/// grace_period = "3s"
/// when_busy = "reject"
///
/// [default]
/// host = "8.8.8.8"
/// port = 80
///
/// [[module]]
/// title = "Connectivity"
/// input_host = true
///
/// [[module.command]]
/// name = "Ping"
/// cmd = "ping -c 4 {host}"
/// ```
///
/// All sections except `module` are optional.
#[derive(Debug, Clone, Deserialize)]
pub struct RawCatalogFile {
    #[serde(default)]
    pub config: ConfigSection,

    #[serde(default)]
    pub default: DefaultSection,

    #[serde(default, rename = "module")]
    pub modules: Vec<ModuleConfig>,
}

/// A validated catalog. Only obtainable through `TryFrom<RawCatalogFile>`
/// (or the loaders built on it).
#[derive(Debug, Clone)]
pub struct CatalogFile {
    pub config: ConfigSection,
    pub default: DefaultSection,
    pub modules: Vec<ModuleConfig>,
}

impl CatalogFile {
    pub(crate) fn new_unchecked(
        config: ConfigSection,
        default: DefaultSection,
        modules: Vec<ModuleConfig>,
    ) -> Self {
        Self {
            config,
            default,
            modules,
        }
    }

    /// Every command with the module it belongs to, in catalog order.
    pub fn commands(&self) -> impl Iterator<Item = (&ModuleConfig, &CommandConfig)> {
        self.modules
            .iter()
            .flat_map(|m| m.commands.iter().map(move |c| (m, c)))
    }

    /// Look a command up by name, ignoring case.
    pub fn find_command(&self, name: &str) -> Option<(&ModuleConfig, &CommandConfig)> {
        let wanted = name.trim();
        self.commands()
            .find(|(_, c)| c.name.eq_ignore_ascii_case(wanted))
    }

    /// Host/port from `[default]`, overridden where the caller supplies one.
    pub fn target(&self, host: Option<String>, port: Option<u16>) -> Target {
        Target {
            host: host.unwrap_or_else(|| self.default.host.clone()),
            port: port.unwrap_or(self.default.port),
        }
    }
}

/// `[config]` section: how commands are executed.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Shell program; platform default (`sh` / `cmd`) when unset.
    #[serde(default)]
    pub shell: Option<String>,

    /// Flag passing the command string to the shell (`-c` / `/C`).
    #[serde(default)]
    pub shell_flag: Option<String>,

    /// Time between terminate and hard kill, e.g. `"3s"` or `"500ms"`.
    #[serde(default = "default_grace_period")]
    pub grace_period: String,

    #[serde(default)]
    pub when_busy: BusyPolicy,
}

fn default_grace_period() -> String {
    "3s".to_string()
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            shell: None,
            shell_flag: None,
            grace_period: default_grace_period(),
            when_busy: BusyPolicy::default(),
        }
    }
}

/// `[default]` section: values pre-filled into `{host}` and `{port}`.
#[derive(Debug, Clone, Deserialize)]
pub struct DefaultSection {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "8.8.8.8".to_string()
}

fn default_port() -> u16 {
    80
}

impl Default for DefaultSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// `[[module]]`: a titled group of commands.
#[derive(Debug, Clone, Deserialize)]
pub struct ModuleConfig {
    pub title: String,

    /// Commands of this module may use `{host}`.
    #[serde(default)]
    pub input_host: bool,

    /// Commands of this module may use `{port}`.
    #[serde(default)]
    pub input_port: bool,

    #[serde(default, rename = "command")]
    pub commands: Vec<CommandConfig>,
}

/// `[[module.command]]`.
#[derive(Debug, Clone, Deserialize)]
pub struct CommandConfig {
    /// Label shown to the user and used for lookup.
    pub name: String,

    /// Command template, e.g. `"ping -c 4 {host}"`.
    pub cmd: String,

    /// Runs until cancelled (e.g. a ping without count).
    #[serde(default)]
    pub continuous: bool,
}

impl CommandConfig {
    pub fn mode(&self) -> ExecutionMode {
        ExecutionMode::from_continuous(self.continuous)
    }

    /// Substitute `target` into the template.
    pub fn resolve(&self, target: &Target) -> Result<Command> {
        resolve(&self.cmd, target)
    }
}
