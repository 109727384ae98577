#![allow(dead_code)]

use diaghub::config::{
    CatalogFile, CommandConfig, ConfigSection, DefaultSection, ModuleConfig, RawCatalogFile,
};
use diaghub::types::BusyPolicy;

/// Builder for `CatalogFile` to simplify test setup.
pub struct CatalogBuilder {
    catalog: RawCatalogFile,
}

impl CatalogBuilder {
    pub fn new() -> Self {
        Self {
            catalog: RawCatalogFile {
                config: ConfigSection::default(),
                default: DefaultSection::default(),
                modules: Vec::new(),
            },
        }
    }

    pub fn with_module(mut self, module: ModuleConfig) -> Self {
        self.catalog.modules.push(module);
        self
    }

    pub fn with_default_host(mut self, host: &str) -> Self {
        self.catalog.default.host = host.to_string();
        self
    }

    pub fn with_default_port(mut self, port: u16) -> Self {
        self.catalog.default.port = port;
        self
    }

    pub fn with_grace_period(mut self, grace: &str) -> Self {
        self.catalog.config.grace_period = grace.to_string();
        self
    }

    pub fn with_when_busy(mut self, policy: BusyPolicy) -> Self {
        self.catalog.config.when_busy = policy;
        self
    }

    pub fn raw(self) -> RawCatalogFile {
        self.catalog
    }

    pub fn build(self) -> CatalogFile {
        CatalogFile::try_from(self.catalog).expect("Failed to build valid catalog from builder")
    }
}

impl Default for CatalogBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `ModuleConfig`.
pub struct ModuleBuilder {
    module: ModuleConfig,
}

impl ModuleBuilder {
    pub fn new(title: &str) -> Self {
        Self {
            module: ModuleConfig {
                title: title.to_string(),
                input_host: false,
                input_port: false,
                commands: vec![],
            },
        }
    }

    pub fn input_host(mut self, val: bool) -> Self {
        self.module.input_host = val;
        self
    }

    pub fn input_port(mut self, val: bool) -> Self {
        self.module.input_port = val;
        self
    }

    pub fn command(mut self, name: &str, cmd: &str) -> Self {
        self.module.commands.push(CommandConfig {
            name: name.to_string(),
            cmd: cmd.to_string(),
            continuous: false,
        });
        self
    }

    pub fn continuous(mut self, name: &str, cmd: &str) -> Self {
        self.module.commands.push(CommandConfig {
            name: name.to_string(),
            cmd: cmd.to_string(),
            continuous: true,
        });
        self
    }

    pub fn build(self) -> ModuleConfig {
        self.module
    }
}
