//! Profile management commands

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Subcommand, ValueEnum};
use serde_json::Value;

use super::output::Output;
use crate::config::{
    coerce_option_value, project_profile_dir, ConfigurationManager, ConfigurationProfile,
    ProfileLocation, ProfileRegistry,
};

#[derive(Subcommand)]
pub enum ProfileCommands {
    /// List known profiles
    List,

    /// Show one profile
    Show {
        /// Profile name
        name: String,

        /// Resolve inherited settings instead of showing the profile's own
        #[arg(long)]
        effective: bool,
    },

    /// Create or update a profile
    Save {
        /// Profile name
        name: String,

        /// A setting to store, repeatable: KEY=VALUE
        #[arg(long = "set", value_name = "KEY=VALUE")]
        set: Vec<String>,

        /// Parent profile to inherit from
        #[arg(long)]
        parent: Option<String>,

        /// Description shown in listings
        #[arg(long)]
        description: Option<String>,

        /// Where to store the profile
        #[arg(long, value_enum, default_value_t = SaveLocation::User)]
        location: SaveLocation,
    },

    /// Write a profile to a standalone file
    Export {
        /// Profile name
        name: String,

        /// Destination path
        path: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SaveLocation {
    System,
    User,
    Project,
}

impl From<SaveLocation> for ProfileLocation {
    fn from(location: SaveLocation) -> Self {
        match location {
            SaveLocation::System => ProfileLocation::System,
            SaveLocation::User => ProfileLocation::User,
            SaveLocation::Project => ProfileLocation::Project,
        }
    }
}

pub fn run(cmd: ProfileCommands, output: &Output) -> Result<()> {
    let registry = default_registry();

    match cmd {
        ProfileCommands::List => list(output, &registry),
        ProfileCommands::Show { name, effective } => show(output, &registry, &name, effective),
        ProfileCommands::Save {
            name,
            set,
            parent,
            description,
            location,
        } => save(output, registry, name, set, parent, description, location),
        ProfileCommands::Export { name, path } => export(output, &registry, &name, &path),
    }
}

/// Builds a registry from the default locations, rooted at the project
/// holding the manifest when one is found
fn default_registry() -> ProfileRegistry {
    let mut config = ConfigurationManager::new();
    config.load(None);
    ProfileRegistry::load_defaults(config.project_root().map(project_profile_dir))
}

fn list(output: &Output, registry: &ProfileRegistry) -> Result<()> {
    let profiles = registry.list();

    if output.is_json() {
        let items: Vec<_> = profiles
            .iter()
            .map(|profile| {
                serde_json::json!({
                    "name": profile.name,
                    "description": profile.description,
                    "version": profile.version,
                    "parent": profile.parent,
                })
            })
            .collect();
        output.data(&items);
        return Ok(());
    }

    println!("{:<12} {:<10} {}", "NAME", "PARENT", "DESCRIPTION");
    println!("{}", "-".repeat(70));
    for profile in profiles {
        println!(
            "{:<12} {:<10} {}",
            profile.name,
            profile.parent.as_deref().unwrap_or("-"),
            profile.description
        );
    }

    Ok(())
}

fn show(output: &Output, registry: &ProfileRegistry, name: &str, effective: bool) -> Result<()> {
    if effective {
        let settings = registry
            .effective(name)
            .with_context(|| format!("Cannot resolve profile '{}'", name))?;

        if output.is_json() {
            output.data(&serde_json::json!({ "name": name, "settings": settings }));
        } else {
            println!("Effective settings for '{}':", name);
            for (key, value) in &settings {
                println!("  {} = {}", key, value);
            }
        }
        return Ok(());
    }

    let profile = registry
        .get(name)
        .with_context(|| format!("Profile not found: {}", name))?;

    if output.is_json() {
        output.data(profile);
        return Ok(());
    }

    println!("Profile: {}", profile.name);
    if !profile.description.is_empty() {
        println!("Description: {}", profile.description);
    }
    println!("Version: {}", profile.version);
    if let Some(parent) = &profile.parent {
        println!("Inherits: {}", parent);
    }
    if !profile.settings.is_empty() {
        println!("Settings:");
        for (key, value) in &profile.settings {
            println!("  {} = {}", key, value);
        }
    }

    Ok(())
}

fn save(
    output: &Output,
    mut registry: ProfileRegistry,
    name: String,
    set: Vec<String>,
    parent: Option<String>,
    description: Option<String>,
    location: SaveLocation,
) -> Result<()> {
    // Updates start from the existing profile of that name
    let mut profile = registry
        .get(&name)
        .cloned()
        .unwrap_or_else(|| ConfigurationProfile::new(&name));

    for spec in &set {
        let (key, value) = parse_setting(spec)?;
        profile.settings.insert(key, value);
    }
    if let Some(parent) = parent {
        profile.parent = Some(parent);
    }
    if let Some(description) = description {
        profile.description = description;
    }

    let path = registry.save(profile, location.into())?;
    output.success(&format!("Saved profile '{}' to {}", name, path.display()));
    Ok(())
}

fn export(output: &Output, registry: &ProfileRegistry, name: &str, path: &Path) -> Result<()> {
    registry.export(name, path)?;
    output.success(&format!("Exported profile '{}' to {}", name, path.display()));
    Ok(())
}

/// Splits `KEY=VALUE` and coerces the value like a plugin option
fn parse_setting(spec: &str) -> Result<(String, toml::Value)> {
    let (key, raw) = spec
        .split_once('=')
        .with_context(|| format!("Invalid setting '{}', expected KEY=VALUE", spec))?;
    Ok((key.trim().to_string(), coerce_setting(raw.trim())))
}

fn coerce_setting(raw: &str) -> toml::Value {
    match coerce_option_value(raw) {
        Value::Bool(flag) => toml::Value::Boolean(flag),
        Value::Number(number) => match number.as_i64() {
            Some(integer) => toml::Value::Integer(integer),
            None => toml::Value::Float(number.as_f64().unwrap_or_default()),
        },
        Value::String(text) => toml::Value::String(text),
        _ => toml::Value::String(raw.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_parse_and_coerce() {
        let (key, value) = parse_setting("line_length=100").unwrap();
        assert_eq!(key, "line_length");
        assert_eq!(value, toml::Value::Integer(100));

        let (_, value) = parse_setting("skip_string_normalization=true").unwrap();
        assert_eq!(value, toml::Value::Boolean(true));

        let (_, value) = parse_setting("target = py310").unwrap();
        assert_eq!(value, toml::Value::String("py310".to_string()));

        let (_, value) = parse_setting("scale=1.5").unwrap();
        assert_eq!(value, toml::Value::Float(1.5));
    }

    #[test]
    fn settings_without_equals_are_rejected() {
        assert!(parse_setting("line_length").is_err());
    }
}
