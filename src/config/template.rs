// src/config/template.rs

//! `{host}` / `{port}` substitution in command templates.

use std::sync::LazyLock;

use regex::Regex;

use crate::command::Command;
use crate::errors::{DiaghubError, Result};

pub const HOST: &str = "host";
pub const PORT: &str = "port";

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([^{}]*)\}").expect("placeholder regex is valid"));

/// Values the user entered for the host and port fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub host: String,
    pub port: u16,
}

/// Names of all `{...}` placeholders in `template`, in order of appearance.
pub fn placeholders(template: &str) -> Vec<&str> {
    PLACEHOLDER
        .captures_iter(template)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect()
}

/// Substitute `target` into `template`.
///
/// Fails on unknown placeholders, on a host that could smuggle shell syntax
/// into the command line, and on a result that is empty.
pub fn resolve(template: &str, target: &Target) -> Result<Command> {
    if let Some(unknown) = placeholders(template)
        .into_iter()
        .find(|p| *p != HOST && *p != PORT)
    {
        return Err(DiaghubError::TemplateError(format!(
            "unknown placeholder '{{{unknown}}}' in '{template}'"
        )));
    }

    let uses_host = placeholders(template).contains(&HOST);
    if uses_host {
        validate_host(&target.host)?;
    }

    let resolved = PLACEHOLDER.replace_all(template, |caps: &regex::Captures<'_>| {
        match caps.get(1).map(|m| m.as_str()) {
            Some(HOST) => target.host.clone(),
            Some(PORT) => target.port.to_string(),
            _ => String::new(),
        }
    });

    Ok(Command::new(resolved.into_owned())?)
}

/// Hostnames, IPv4 and IPv6 literals (optionally bracketed, with a zone).
fn validate_host(host: &str) -> Result<()> {
    if host.is_empty() {
        return Err(DiaghubError::TemplateError("host must not be empty".to_string()));
    }
    if let Some(bad) = host
        .chars()
        .find(|&c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | ':' | '_' | '%' | '[' | ']')))
    {
        return Err(DiaghubError::TemplateError(format!(
            "host '{host}' contains invalid character '{bad}'"
        )));
    }
    if host.starts_with('-') {
        return Err(DiaghubError::TemplateError(format!(
            "host '{host}' must not start with '-'"
        )));
    }
    Ok(())
}
