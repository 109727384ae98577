// src/config/validate.rs

use std::collections::HashSet;

use crate::config::duration::parse_duration;
use crate::config::model::{CatalogFile, RawCatalogFile};
use crate::config::template::{HOST, PORT, placeholders};
use crate::errors::{DiaghubError, Result};

impl TryFrom<RawCatalogFile> for CatalogFile {
    type Error = crate::errors::DiaghubError;

    fn try_from(raw: RawCatalogFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_catalog(&raw)?;
        Ok(CatalogFile::new_unchecked(raw.config, raw.default, raw.modules))
    }
}

fn validate_raw_catalog(cfg: &RawCatalogFile) -> Result<()> {
    ensure_has_modules(cfg)?;
    validate_global_config(cfg)?;
    validate_modules(cfg)?;
    validate_command_names(cfg)?;
    validate_templates(cfg)?;
    Ok(())
}

fn config_error(msg: impl Into<String>) -> DiaghubError {
    DiaghubError::ConfigError(msg.into())
}

fn ensure_has_modules(cfg: &RawCatalogFile) -> Result<()> {
    if cfg.modules.is_empty() {
        return Err(config_error(
            "catalog must contain at least one [[module]] section",
        ));
    }
    Ok(())
}

fn validate_global_config(cfg: &RawCatalogFile) -> Result<()> {
    // when_busy is strongly typed and checked during deserialization.

    parse_duration(&cfg.config.grace_period)
        .map_err(|e| config_error(format!("[config].grace_period: {e}")))?;

    if let Some(shell) = &cfg.config.shell {
        if shell.trim().is_empty() {
            return Err(config_error("[config].shell must not be empty"));
        }
    }

    if cfg.default.port == 0 {
        return Err(config_error("[default].port must be in 1..=65535 (got 0)"));
    }

    Ok(())
}

fn validate_modules(cfg: &RawCatalogFile) -> Result<()> {
    for (idx, module) in cfg.modules.iter().enumerate() {
        if module.title.trim().is_empty() {
            return Err(config_error(format!("module #{} has an empty title", idx + 1)));
        }
        if module.commands.is_empty() {
            return Err(config_error(format!(
                "module '{}' has no [[module.command]] entries",
                module.title
            )));
        }
        for command in &module.commands {
            if command.name.trim().is_empty() {
                return Err(config_error(format!(
                    "module '{}' has a command with an empty name",
                    module.title
                )));
            }
            if command.cmd.trim().is_empty() {
                return Err(config_error(format!(
                    "command '{}' has an empty `cmd`",
                    command.name
                )));
            }
        }
    }
    Ok(())
}

fn validate_command_names(cfg: &RawCatalogFile) -> Result<()> {
    let mut seen = HashSet::new();
    for command in cfg.modules.iter().flat_map(|m| m.commands.iter()) {
        if !seen.insert(command.name.trim().to_lowercase()) {
            return Err(config_error(format!(
                "duplicate command name '{}'",
                command.name
            )));
        }
    }
    Ok(())
}

fn validate_templates(cfg: &RawCatalogFile) -> Result<()> {
    for module in &cfg.modules {
        for command in &module.commands {
            for placeholder in placeholders(&command.cmd) {
                let allowed = match placeholder {
                    HOST => module.input_host,
                    PORT => module.input_port,
                    other => {
                        return Err(DiaghubError::TemplateError(format!(
                            "command '{}' uses unknown placeholder '{{{other}}}'",
                            command.name
                        )));
                    }
                };
                if !allowed {
                    return Err(config_error(format!(
                        "command '{}' uses '{{{placeholder}}}' but module '{}' does not set input_{placeholder} = true",
                        command.name, module.title
                    )));
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_text: &str) -> Result<CatalogFile> {
        let raw: RawCatalogFile = toml::from_str(toml_text)?;
        CatalogFile::try_from(raw)
    }

    const VALID: &str = r#"
        [[module]]
        title = "Connectivity"
        input_host = true

        [[module.command]]
        name = "Ping"
        cmd = "ping -c 4 {host}"
    "#;

    #[test]
    fn minimal_catalog_gets_defaults() {
        let cfg = parse(VALID).unwrap();
        assert_eq!(cfg.default.host, "8.8.8.8");
        assert_eq!(cfg.default.port, 80);
        assert_eq!(cfg.config.grace_period, "3s");
        assert_eq!(cfg.modules.len(), 1);
    }

    #[test]
    fn empty_catalog_is_rejected() {
        let err = parse("").unwrap_err();
        assert!(err.to_string().contains("at least one [[module]]"), "{err}");
    }

    #[test]
    fn module_without_commands_is_rejected() {
        let err = parse("[[module]]\ntitle = \"Empty\"\n").unwrap_err();
        assert!(err.to_string().contains("no [[module.command]]"), "{err}");
    }

    #[test]
    fn duplicate_names_are_rejected_case_insensitively() {
        let text = r#"
            [[module]]
            title = "A"
            [[module.command]]
            name = "ARP"
            cmd = "ip neigh"

            [[module]]
            title = "B"
            [[module.command]]
            name = "arp"
            cmd = "arp -a"
        "#;
        let err = parse(text).unwrap_err();
        assert!(err.to_string().contains("duplicate command name"), "{err}");
    }

    #[test]
    fn host_placeholder_requires_input_host() {
        let text = r#"
            [[module]]
            title = "Info"
            [[module.command]]
            name = "Ping"
            cmd = "ping {host}"
        "#;
        let err = parse(text).unwrap_err();
        assert!(err.to_string().contains("input_host"), "{err}");
    }

    #[test]
    fn unknown_placeholder_is_rejected() {
        let text = r#"
            [[module]]
            title = "Info"
            input_host = true
            [[module.command]]
            name = "Ping"
            cmd = "ping {hostname}"
        "#;
        assert!(matches!(parse(text), Err(DiaghubError::TemplateError(_))));
    }

    #[test]
    fn bad_grace_period_is_rejected() {
        let text = format!("[config]\ngrace_period = \"soon\"\n{VALID}");
        let err = parse(&text).unwrap_err();
        assert!(err.to_string().contains("grace_period"), "{err}");
    }

    #[test]
    fn port_zero_is_rejected() {
        let text = format!("[default]\nport = 0\n{VALID}");
        assert!(parse(&text).is_err());
    }

    #[test]
    fn invalid_when_busy_fails_to_deserialize() {
        let text = format!("[config]\nwhen_busy = \"queue\"\n{VALID}");
        assert!(matches!(parse(&text), Err(DiaghubError::TomlError(_))));
    }
}
