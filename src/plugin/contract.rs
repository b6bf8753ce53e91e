//! The contract every format plugin implements

use std::collections::BTreeMap;

use serde_json::Value;
use thiserror::Error;

use crate::pipeline::{DispatchContext, NodeRenderer};
use crate::syntax::SyntaxNode;

/// Plugin option values keyed by option name
pub type OptionMap = BTreeMap<String, Value>;

#[derive(Debug, Error)]
pub enum PluginError {
    #[error("Invalid value for option '{option}': {reason}")]
    InvalidOption { option: String, reason: String },

    #[error("Unknown options: {0}")]
    UnknownOptions(String),

    #[error("{0}")]
    Failed(String),
}

/// A formatting plugin.
///
/// Plugins are offered syntax nodes by the dispatch pipeline. `apply`
/// returns `Ok(None)` to defer to the next plugin or the host renderer,
/// `Ok(Some(lines))` to claim the node with finished output (an empty
/// vector still claims), or an error, which the pipeline logs and then
/// treats as a deferral.
pub trait FormatPlugin {
    /// Unique plugin name
    fn name(&self) -> &str;

    /// One-line human description
    fn description(&self) -> &str;

    /// Plugin version
    fn version(&self) -> &str;

    /// Declared options with their default values
    fn default_options(&self) -> OptionMap;

    /// Applies user options. Keys the plugin does not declare are ignored;
    /// a declared key with an unusable value is an error.
    fn configure(&mut self, options: &OptionMap) -> Result<(), PluginError>;

    /// Offers a node to the plugin. See the trait docs for the return
    /// contract.
    fn apply(
        &self,
        renderer: &dyn NodeRenderer,
        node: &SyntaxNode,
        ctx: &mut DispatchContext,
    ) -> Result<Option<Vec<String>>, PluginError>;

    /// Checks that every option key is declared, without applying anything.
    fn validate_options(&self, options: &OptionMap) -> Result<(), PluginError> {
        let known = self.default_options();
        let unknown: Vec<&str> = options
            .keys()
            .filter(|key| !known.contains_key(key.as_str()))
            .map(|key| key.as_str())
            .collect();
        if unknown.is_empty() {
            Ok(())
        } else {
            Err(PluginError::UnknownOptions(unknown.join(", ")))
        }
    }
}

/// Reads a boolean option into `target` if present.
pub fn read_bool(options: &OptionMap, key: &str, target: &mut bool) -> Result<(), PluginError> {
    if let Some(value) = options.get(key) {
        match value {
            Value::Bool(b) => *target = *b,
            other => return Err(invalid(key, "expected a boolean", other)),
        }
    }
    Ok(())
}

/// Reads a non-negative integer option into `target` if present.
pub fn read_usize(options: &OptionMap, key: &str, target: &mut usize) -> Result<(), PluginError> {
    if let Some(value) = options.get(key) {
        match value.as_u64() {
            Some(n) => *target = n as usize,
            None => return Err(invalid(key, "expected a non-negative integer", value)),
        }
    }
    Ok(())
}

/// Reads a string option into `target` if present.
pub fn read_string(options: &OptionMap, key: &str, target: &mut String) -> Result<(), PluginError> {
    if let Some(value) = options.get(key) {
        match value.as_str() {
            Some(s) => *target = s.to_string(),
            None => return Err(invalid(key, "expected a string", value)),
        }
    }
    Ok(())
}

/// Reads a list-of-strings option into `target` if present. Accepts either
/// an array of strings or a comma-separated string; empty items are
/// dropped.
pub fn read_string_list(
    options: &OptionMap,
    key: &str,
    target: &mut Vec<String>,
) -> Result<(), PluginError> {
    if let Some(value) = options.get(key) {
        match string_list(value) {
            Some(list) => *target = list,
            None => {
                return Err(invalid(
                    key,
                    "expected a string or an array of strings",
                    value,
                ))
            }
        }
    }
    Ok(())
}

fn string_list(value: &Value) -> Option<Vec<String>> {
    match value {
        Value::String(s) => Some(
            s.split(',')
                .map(|item| item.trim().to_string())
                .filter(|item| !item.is_empty())
                .collect(),
        ),
        Value::Array(items) => items
            .iter()
            .map(|item| item.as_str().map(str::to_string))
            .collect(),
        _ => None,
    }
}

fn invalid(option: &str, reason: &str, value: &Value) -> PluginError {
    PluginError::InvalidOption {
        option: option.to_string(),
        reason: format!("{reason}, got {value}"),
    }
}

/// Converts a TOML value into the JSON value form used for plugin options.
pub fn toml_to_json(value: toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::Number(i.into()),
        toml::Value::Float(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(items) => Value::Array(items.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .into_iter()
                .map(|(key, item)| (key, toml_to_json(item)))
                .collect(),
        ),
    }
}
