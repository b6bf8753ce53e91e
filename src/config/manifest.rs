//! Project manifest handling for sable
//!
//! Plugin configuration lives in the `[plugins]` section of `sable.toml`,
//! found by walking up from the working directory or named explicitly.
//! Command-line overrides are merged on top in a fixed order.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::plugin::{toml_to_json, OptionMap};

/// File name of the project manifest
pub const MANIFEST_FILE_NAME: &str = "sable.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read manifest: {0}")]
    Read(String),

    #[error("Failed to parse manifest: {0}")]
    Parse(String),
}

/// Tri-state enablement for a single plugin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PluginState {
    Enabled,
    Disabled,
    /// Fall back to `enable_by_default`
    #[default]
    Default,
}

/// Configuration for a single plugin
#[derive(Debug, Clone, Default)]
pub struct PluginConfig {
    pub name: String,
    pub state: PluginState,
    pub options: OptionMap,
    pub version_requirement: Option<String>,
}

impl PluginConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Aggregate plugin configuration resolved from the manifest and CLI
#[derive(Debug, Clone)]
pub struct PluginsConfig {
    pub plugin_configs: BTreeMap<String, PluginConfig>,
    pub discovery_paths: Vec<PathBuf>,
    pub disable_all: bool,
    pub enable_by_default: bool,
}

impl Default for PluginsConfig {
    fn default() -> Self {
        Self {
            plugin_configs: BTreeMap::new(),
            discovery_paths: Vec::new(),
            disable_all: false,
            enable_by_default: true,
        }
    }
}

impl PluginsConfig {
    /// Resolves whether a named plugin should be enabled.
    ///
    /// `disable_all` beats everything; otherwise an explicit state wins and
    /// an absent or `Default` entry falls back to `enable_by_default`.
    pub fn is_enabled(&self, name: &str) -> bool {
        if self.disable_all {
            return false;
        }
        match self.plugin_configs.get(name).map(|config| config.state) {
            Some(PluginState::Enabled) => true,
            Some(PluginState::Disabled) => false,
            Some(PluginState::Default) | None => self.enable_by_default,
        }
    }

    /// User-supplied options for a named plugin, if any were configured
    pub fn options_for(&self, name: &str) -> Option<&OptionMap> {
        self.plugin_configs.get(name).map(|config| &config.options)
    }
}

/// Plugin-related command-line overrides, applied over the manifest
#[derive(Debug, Clone, Default)]
pub struct PluginOverrides {
    /// `--disable-all-plugins`
    pub disable_all: bool,

    /// `--plugin-config PATH`
    pub config_path: Option<PathBuf>,

    /// Each `--plugin NAME[:key=value,...]` spec
    pub enable_specs: Vec<String>,

    /// Each `--disable-plugin NAME`
    pub disable: Vec<String>,
}

/// Raw manifest shape. Only the `[plugins]` section belongs to this
/// subsystem; every other section is left alone.
#[derive(Debug, Deserialize)]
struct ManifestFile {
    plugins: Option<RawPluginsSection>,
}

#[derive(Debug, Deserialize)]
struct RawPluginsSection {
    discovery_paths: Option<Vec<String>>,
    disable_all: Option<bool>,
    enable_by_default: Option<bool>,

    #[serde(flatten)]
    entries: BTreeMap<String, RawPluginEntry>,
}

/// A per-plugin manifest entry: bare boolean shorthand or a detailed table
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawPluginEntry {
    Switch(bool),
    Detailed {
        enabled: Option<bool>,
        #[serde(default)]
        options: toml::Table,
        version: Option<String>,
    },
    Other(toml::Value),
}

/// Loads the project manifest and merges command-line overrides
#[derive(Debug, Default)]
pub struct ConfigurationManager {
    config: PluginsConfig,
    manifest_path: Option<PathBuf>,
}

impl ConfigurationManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads plugin configuration from `sable.toml`.
    ///
    /// With no explicit path the manifest is searched upward from the
    /// working directory. A missing, unreadable, or malformed manifest is
    /// logged and leaves the current configuration untouched; loading is
    /// never fatal.
    pub fn load(&mut self, path: Option<&Path>) {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match find_manifest() {
                Some(path) => path,
                None => {
                    debug!("no manifest found, using defaults");
                    return;
                }
            },
        };

        match self.load_file(&path) {
            Ok(()) => {
                debug!(path = %path.display(), "loaded manifest");
                self.manifest_path = Some(path);
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load manifest, continuing without it");
            }
        }
    }

    /// Applies command-line overrides, strictly in this order: the global
    /// disable flag, an alternate manifest path, enable specs, then
    /// per-plugin disables. A name that appears in both an enable spec and
    /// a disable flag ends up disabled.
    pub fn apply_cli(&mut self, overrides: &PluginOverrides) {
        if overrides.disable_all {
            self.config.disable_all = true;
        }

        if let Some(path) = &overrides.config_path {
            self.load(Some(path));
        }

        for spec in &overrides.enable_specs {
            let (name, options) = parse_plugin_spec(spec);
            let plugin = self
                .config
                .plugin_configs
                .entry(name.clone())
                .or_insert_with(|| PluginConfig::new(name));
            plugin.state = PluginState::Enabled;
            plugin.options.extend(options);
        }

        for name in &overrides.disable {
            let plugin = self
                .config
                .plugin_configs
                .entry(name.clone())
                .or_insert_with(|| PluginConfig::new(name.clone()));
            plugin.state = PluginState::Disabled;
        }
    }

    pub fn config(&self) -> &PluginsConfig {
        &self.config
    }

    /// Directory containing the loaded manifest, if one was found
    pub fn project_root(&self) -> Option<&Path> {
        self.manifest_path.as_deref().and_then(Path::parent)
    }

    fn load_file(&mut self, path: &Path) -> Result<(), ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Read(e.to_string()))?;
        let manifest: ManifestFile =
            toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;

        let Some(section) = manifest.plugins else {
            return Ok(());
        };

        // Global keys replace only when the file carries them
        if let Some(paths) = section.discovery_paths {
            self.config.discovery_paths = paths.into_iter().map(PathBuf::from).collect();
        }
        if let Some(disable_all) = section.disable_all {
            self.config.disable_all = disable_all;
        }
        if let Some(enable_by_default) = section.enable_by_default {
            self.config.enable_by_default = enable_by_default;
        }

        // Named entries replace wholesale; entries the file does not name
        // survive from earlier loads
        for (name, entry) in section.entries {
            let mut plugin = PluginConfig::new(name.clone());
            match entry {
                RawPluginEntry::Switch(enabled) => {
                    plugin.state = switch_state(enabled);
                }
                RawPluginEntry::Detailed {
                    enabled,
                    options,
                    version,
                } => {
                    if let Some(enabled) = enabled {
                        plugin.state = switch_state(enabled);
                    }
                    plugin.options = options
                        .into_iter()
                        .map(|(key, value)| (key, toml_to_json(value)))
                        .collect();
                    plugin.version_requirement = version;
                }
                RawPluginEntry::Other(_) => {
                    warn!(plugin = %name, "ignoring manifest entry with unsupported shape");
                    continue;
                }
            }
            self.config.plugin_configs.insert(name, plugin);
        }

        Ok(())
    }
}

fn switch_state(enabled: bool) -> PluginState {
    if enabled {
        PluginState::Enabled
    } else {
        PluginState::Disabled
    }
}

/// Finds the manifest by walking up from the working directory
pub fn find_manifest() -> Option<PathBuf> {
    let current = std::env::current_dir().ok()?;
    find_manifest_from(&current)
}

/// Finds the manifest by walking up from a starting directory
pub fn find_manifest_from(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();

    loop {
        let candidate = current.join(MANIFEST_FILE_NAME);
        if candidate.is_file() {
            return Some(candidate);
        }

        if !current.pop() {
            return None;
        }
    }
}

/// Parses a `NAME[:key=value,...]` plugin spec.
///
/// Pairs without `=` are ignored; values go through
/// [`coerce_option_value`].
pub fn parse_plugin_spec(spec: &str) -> (String, OptionMap) {
    let (name, rest) = match spec.split_once(':') {
        Some((name, rest)) => (name, Some(rest)),
        None => (spec, None),
    };

    let mut options = OptionMap::new();
    if let Some(rest) = rest.filter(|rest| !rest.is_empty()) {
        for pair in rest.split(',') {
            if let Some((key, value)) = pair.split_once('=') {
                options.insert(key.trim().to_string(), coerce_option_value(value.trim()));
            }
        }
    }

    (name.trim().to_string(), options)
}

/// Coerces a textual option value: `true`/`false` in any case become
/// booleans, all-digit text becomes an integer, digits with a single
/// decimal point become a float, and anything else stays a string.
pub fn coerce_option_value(raw: &str) -> Value {
    if raw.eq_ignore_ascii_case("true") {
        return Value::Bool(true);
    }
    if raw.eq_ignore_ascii_case("false") {
        return Value::Bool(false);
    }

    if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()) {
        // Digit runs too long for an integer stay strings
        if let Ok(n) = raw.parse::<i64>() {
            return Value::from(n);
        }
        return Value::String(raw.to_string());
    }

    if raw.bytes().filter(|&b| b == b'.').count() == 1 {
        let digits = raw.replacen('.', "", 1);
        if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
            if let Some(n) = raw.parse::<f64>().ok().and_then(serde_json::Number::from_f64) {
                return Value::Number(n);
            }
        }
    }

    Value::String(raw.to_string())
}
