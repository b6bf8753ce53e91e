//! Plugin definitions and the compiled-in kind table
//!
//! A definition records a plugin's identity and the compiled-in
//! implementation backing it. The reference plugins are always registered;
//! additional definitions come from discovered `*.toml` files carrying a
//! `[plugin]` table.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use super::contract::{toml_to_json, FormatPlugin, OptionMap};
use super::import_sorter::ImportGroupSorter;
use super::string_normalizer::StringNormalizer;

#[derive(Debug, Error)]
pub enum DefinitionError {
    #[error("Failed to read plugin definition: {0}")]
    Read(String),

    #[error("Failed to parse plugin definition: {0}")]
    Parse(String),

    #[error("Plugin definition has an empty name")]
    EmptyName,

    #[error("Unknown plugin kind '{kind}', expected one of: {valid}")]
    UnknownKind { kind: String, valid: String },
}

/// Compiled-in plugin implementations a definition can name as its `kind`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginKind {
    ImportSorter,
    StringNormalizer,
}

impl PluginKind {
    pub const ALL: [PluginKind; 2] = [PluginKind::ImportSorter, PluginKind::StringNormalizer];

    pub fn as_str(&self) -> &'static str {
        match self {
            PluginKind::ImportSorter => "import_sorter",
            PluginKind::StringNormalizer => "string_normalizer",
        }
    }

    pub fn parse(kind: &str) -> Result<Self, DefinitionError> {
        Self::ALL
            .into_iter()
            .find(|candidate| candidate.as_str() == kind)
            .ok_or_else(|| DefinitionError::UnknownKind {
                kind: kind.to_string(),
                valid: Self::ALL.map(|k| k.as_str()).join(", "),
            })
    }

    /// Builds a fresh, unconfigured instance of this kind
    pub fn instantiate(&self) -> Box<dyn FormatPlugin> {
        match self {
            PluginKind::ImportSorter => Box::new(ImportGroupSorter::default()),
            PluginKind::StringNormalizer => Box::new(StringNormalizer::default()),
        }
    }
}

/// A registered plugin definition
#[derive(Debug, Clone)]
pub struct PluginDefinition {
    pub name: String,
    pub description: String,
    pub version: String,
    pub kind: PluginKind,

    /// Options from the definition file, applied under the user's options
    pub baseline_options: OptionMap,

    /// Definition file this came from; `None` for compiled-in definitions
    pub source: Option<PathBuf>,
}

impl PluginDefinition {
    /// The compiled-in definition for a kind, taking metadata from the
    /// implementation itself
    pub fn builtin(kind: PluginKind) -> Self {
        let plugin = kind.instantiate();
        Self {
            name: plugin.name().to_string(),
            description: plugin.description().to_string(),
            version: plugin.version().to_string(),
            kind,
            baseline_options: OptionMap::new(),
            source: None,
        }
    }

    /// Loads a definition from a `[plugin]` table file.
    ///
    /// Qualifying files declare a non-empty `name` and a `kind` that
    /// resolves in the compiled-in table.
    pub fn load(path: &Path) -> Result<Self, DefinitionError> {
        let content = fs::read_to_string(path).map_err(|e| DefinitionError::Read(e.to_string()))?;
        let file: DefinitionFile =
            toml::from_str(&content).map_err(|e| DefinitionError::Parse(e.to_string()))?;
        let raw = file.plugin;

        if raw.name.trim().is_empty() {
            return Err(DefinitionError::EmptyName);
        }
        let kind = PluginKind::parse(&raw.kind)?;

        Ok(Self {
            name: raw.name,
            description: raw.description,
            version: raw.version,
            kind,
            baseline_options: raw
                .options
                .into_iter()
                .map(|(key, value)| (key, toml_to_json(value)))
                .collect(),
            source: Some(path.to_path_buf()),
        })
    }
}

#[derive(Debug, Deserialize)]
struct DefinitionFile {
    plugin: RawDefinition,
}

#[derive(Debug, Deserialize)]
struct RawDefinition {
    name: String,

    #[serde(default)]
    description: String,

    #[serde(default = "default_version")]
    version: String,

    kind: String,

    #[serde(default)]
    options: toml::Table,
}

fn default_version() -> String {
    "0.1.0".to_string()
}
