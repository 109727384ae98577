// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{CatalogFile, RawCatalogFile};
use crate::errors::Result;

/// Catalog compiled into the binary, used when no catalog file is present.
pub const BUILTIN_CATALOG: &str = include_str!("../../catalogs/default.toml");

/// Load a catalog file from a given path and return the raw `RawCatalogFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawCatalogFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let catalog: RawCatalogFile = toml::from_str(&contents)?;

    Ok(catalog)
}

/// Load a catalog file from path and validate it.
///
/// - Reads TOML.
/// - Applies defaults (handled by `serde` + `Default` impls).
/// - Checks module/command shape, name uniqueness, placeholders and the
///   `[config]` values.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<CatalogFile> {
    let raw = load_from_path(&path)?;
    CatalogFile::try_from(raw)
}

/// Parse and validate catalog text.
pub fn parse_and_validate(contents: &str) -> Result<CatalogFile> {
    let raw: RawCatalogFile = toml::from_str(contents)?;
    CatalogFile::try_from(raw)
}

/// The built-in catalog.
pub fn builtin_catalog() -> Result<CatalogFile> {
    parse_and_validate(BUILTIN_CATALOG)
}

/// `Diaghub.toml` in the current working directory.
pub fn default_catalog_path() -> PathBuf {
    PathBuf::from("Diaghub.toml")
}

/// Resolve the catalog to use.
///
/// - An explicit path must exist and be valid.
/// - Without one, `Diaghub.toml` is used if present, otherwise the built-in
///   catalog.
pub fn load_catalog(explicit: Option<&Path>) -> Result<CatalogFile> {
    if let Some(path) = explicit {
        debug!(path = %path.display(), "loading catalog");
        return load_and_validate(path);
    }

    let fallback = default_catalog_path();
    if fallback.is_file() {
        debug!(path = %fallback.display(), "loading catalog from working directory");
        load_and_validate(fallback)
    } else {
        debug!("no catalog file found; using built-in catalog");
        builtin_catalog()
    }
}
