//! Named formatter profiles with inheritance
//!
//! A profile is a reusable bundle of formatter settings stored one per file
//! under a `[profile]` table. Profiles may name a parent; effective
//! settings are the parent chain resolved root to leaf, each level
//! overriding inherited keys.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Profile settings keyed by setting name
pub type ProfileSettings = BTreeMap<String, toml::Value>;

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("Profile not found: {0}")]
    NotFound(String),

    #[error("Profile inheritance cycle at '{0}'")]
    InheritanceCycle(String),

    #[error("Failed to read profile file: {0}")]
    Read(String),

    #[error("Failed to parse profile file: {0}")]
    Parse(String),

    #[error("Failed to write profile file: {0}")]
    Write(String),
}

/// A named bundle of formatter settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigurationProfile {
    pub name: String,

    /// Human description shown in listings
    pub description: String,

    /// Profile format version
    pub version: String,

    /// Settings this profile sets itself, before inheritance
    pub settings: ProfileSettings,

    /// Name of the profile to inherit from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

impl Default for ConfigurationProfile {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: String::new(),
            version: "1.0".to_string(),
            settings: ProfileSettings::new(),
            parent: None,
        }
    }
}

impl ConfigurationProfile {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// On-disk profile layout: everything under a `[profile]` table
#[derive(Debug, Serialize, Deserialize)]
struct ProfileFile {
    profile: ConfigurationProfile,
}

/// Where a profile is stored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileLocation {
    System,
    User,
    Project,
}

/// Returns the project-local profile directory for a project root
pub fn project_profile_dir(root: &Path) -> PathBuf {
    root.join(".sable").join("profiles")
}

/// Registry of known profiles.
///
/// Seeded with the built-in profiles, then loaded from the system, user,
/// and project directories in that order; a later load shadows an earlier
/// profile with the same name.
#[derive(Debug)]
pub struct ProfileRegistry {
    profiles: BTreeMap<String, ConfigurationProfile>,
    project_dir: Option<PathBuf>,
}

impl ProfileRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            profiles: BTreeMap::new(),
            project_dir: None,
        };
        for profile in builtin_profiles() {
            registry.add(profile);
        }
        registry
    }

    /// Creates a registry with every default location already loaded
    pub fn load_defaults(project_dir: Option<PathBuf>) -> Self {
        let mut registry = Self::new();
        registry.project_dir = project_dir;
        registry.load_default_locations();
        registry
    }

    pub fn set_project_dir(&mut self, dir: impl Into<PathBuf>) {
        self.project_dir = Some(dir.into());
    }

    /// Loads profiles from the system, user, and project directories
    pub fn load_default_locations(&mut self) {
        self.load_dir(&crate::config::system_share_dir().join("profiles"));
        if let Some(dir) = crate::config::user_config_dir() {
            self.load_dir(&dir.join("profiles"));
        }
        if let Some(dir) = self.project_dir.clone() {
            self.load_dir(&dir);
        }
    }

    /// Loads every profile file in a directory. Files that fail to load
    /// are logged and skipped; a missing or unreadable directory is
    /// ignored.
    pub fn load_dir(&mut self, dir: &Path) {
        if !dir.is_dir() {
            return;
        }
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(_) => return,
        };

        let mut candidates: Vec<PathBuf> = entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "toml"))
            .collect();
        candidates.sort();

        for path in candidates {
            match load_profile_file(&path) {
                Ok(profile) => self.add(profile),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping profile file");
                }
            }
        }
    }

    /// Registers a profile, replacing any existing profile with its name
    pub fn add(&mut self, profile: ConfigurationProfile) {
        self.profiles.insert(profile.name.clone(), profile);
    }

    pub fn get(&self, name: &str) -> Option<&ConfigurationProfile> {
        self.profiles.get(name)
    }

    /// All known profiles in name order
    pub fn list(&self) -> Vec<&ConfigurationProfile> {
        self.profiles.values().collect()
    }

    /// Resolves a profile's effective settings by walking its parent chain
    /// root to leaf. A parent that does not resolve truncates the chain; a
    /// chain that revisits a profile is an inheritance cycle.
    pub fn effective(&self, name: &str) -> Result<ProfileSettings, ProfileError> {
        let mut chain: Vec<&ConfigurationProfile> = Vec::new();
        let mut visited: BTreeSet<&str> = BTreeSet::new();

        let mut current = self
            .get(name)
            .ok_or_else(|| ProfileError::NotFound(name.to_string()))?;
        loop {
            if !visited.insert(current.name.as_str()) {
                return Err(ProfileError::InheritanceCycle(current.name.clone()));
            }
            chain.push(current);
            match current.parent.as_deref().and_then(|parent| self.get(parent)) {
                Some(parent) => current = parent,
                None => break,
            }
        }

        let mut settings = ProfileSettings::new();
        for profile in chain.iter().rev() {
            for (key, value) in &profile.settings {
                settings.insert(key.clone(), value.clone());
            }
        }
        Ok(settings)
    }

    /// Writes a profile to the given location and registers it
    pub fn save(
        &mut self,
        profile: ConfigurationProfile,
        location: ProfileLocation,
    ) -> Result<PathBuf, ProfileError> {
        let dir = self.location_dir(location)?;
        fs::create_dir_all(&dir)
            .map_err(|e| ProfileError::Write(format!("{}: {}", dir.display(), e)))?;

        let path = dir.join(format!("{}.toml", profile.name));
        write_profile_file(&path, &profile)?;
        self.add(profile);
        Ok(path)
    }

    /// Writes one profile to an arbitrary file
    pub fn export(&self, name: &str, path: &Path) -> Result<(), ProfileError> {
        let profile = self
            .get(name)
            .ok_or_else(|| ProfileError::NotFound(name.to_string()))?;
        write_profile_file(path, profile)
    }

    fn location_dir(&self, location: ProfileLocation) -> Result<PathBuf, ProfileError> {
        match location {
            ProfileLocation::System => Ok(crate::config::system_share_dir().join("profiles")),
            ProfileLocation::User => crate::config::user_config_dir()
                .map(|dir| dir.join("profiles"))
                .ok_or_else(|| {
                    ProfileError::Write("no user configuration directory available".to_string())
                }),
            ProfileLocation::Project => self.project_dir.clone().ok_or_else(|| {
                ProfileError::Write("not inside a project (no manifest found)".to_string())
            }),
        }
    }
}

impl Default for ProfileRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn load_profile_file(path: &Path) -> Result<ConfigurationProfile, ProfileError> {
    let content = fs::read_to_string(path).map_err(|e| ProfileError::Read(e.to_string()))?;
    let file: ProfileFile = toml::from_str(&content).map_err(|e| ProfileError::Parse(e.to_string()))?;
    if file.profile.name.trim().is_empty() {
        return Err(ProfileError::Parse(format!(
            "{}: profile has no name",
            path.display()
        )));
    }
    Ok(file.profile)
}

fn write_profile_file(path: &Path, profile: &ConfigurationProfile) -> Result<(), ProfileError> {
    let content = toml::to_string_pretty(&ProfileFile {
        profile: profile.clone(),
    })
    .map_err(|e| ProfileError::Write(e.to_string()))?;
    fs::write(path, content).map_err(|e| ProfileError::Write(format!("{}: {}", path.display(), e)))
}

fn builtin(
    name: &str,
    description: &str,
    parent: Option<&str>,
    settings: Vec<(&str, toml::Value)>,
) -> ConfigurationProfile {
    ConfigurationProfile {
        name: name.to_string(),
        description: description.to_string(),
        settings: settings
            .into_iter()
            .map(|(key, value)| (key.to_string(), value))
            .collect(),
        parent: parent.map(str::to_string),
        ..ConfigurationProfile::default()
    }
}

fn builtin_profiles() -> Vec<ConfigurationProfile> {
    use toml::Value::{Boolean, Integer};

    vec![
        builtin(
            "default",
            "Standard sable formatting",
            None,
            vec![
                ("line_length", Integer(88)),
                ("skip_string_normalization", Boolean(false)),
                ("skip_magic_trailing_comma", Boolean(false)),
            ],
        ),
        builtin(
            "pycharm",
            "Matches PyCharm's default line length and quote handling",
            Some("default"),
            vec![
                ("line_length", Integer(120)),
                ("skip_string_normalization", Boolean(true)),
            ],
        ),
        builtin(
            "vscode",
            "Matches common VS Code formatter settings",
            Some("default"),
            vec![("line_length", Integer(100))],
        ),
        builtin(
            "google",
            "Google style guide",
            None,
            vec![
                ("line_length", Integer(80)),
                ("skip_string_normalization", Boolean(true)),
            ],
        ),
        builtin(
            "compact",
            "Tighter output for small screens",
            Some("default"),
            vec![
                ("line_length", Integer(79)),
                ("skip_magic_trailing_comma", Boolean(true)),
            ],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use toml::Value::{Boolean, Integer};

    #[test]
    fn builtins_are_seeded() {
        let registry = ProfileRegistry::new();
        for name in ["default", "pycharm", "vscode", "google", "compact"] {
            assert!(registry.get(name).is_some(), "missing builtin {name}");
        }
    }

    #[test]
    fn effective_walks_parent_chain_root_to_leaf() {
        let mut registry = ProfileRegistry::new();
        registry.add(builtin(
            "a",
            "",
            None,
            vec![("line_length", Integer(88))],
        ));
        registry.add(builtin(
            "b",
            "",
            Some("a"),
            vec![("line_length", Integer(120))],
        ));
        registry.add(builtin(
            "c",
            "",
            Some("b"),
            vec![("skip_string_normalization", Boolean(true))],
        ));

        let settings = registry.effective("c").unwrap();
        assert_eq!(settings.get("line_length"), Some(&Integer(120)));
        assert_eq!(
            settings.get("skip_string_normalization"),
            Some(&Boolean(true))
        );
    }

    #[test]
    fn missing_parent_truncates_silently() {
        let mut registry = ProfileRegistry::new();
        registry.add(builtin(
            "orphan",
            "",
            Some("no_such_profile"),
            vec![("line_length", Integer(70))],
        ));

        let settings = registry.effective("orphan").unwrap();
        assert_eq!(settings.get("line_length"), Some(&Integer(70)));
        assert_eq!(settings.len(), 1);
    }

    #[test]
    fn inheritance_cycle_is_an_error() {
        let mut registry = ProfileRegistry::new();
        registry.add(builtin("a", "", Some("b"), vec![]));
        registry.add(builtin("b", "", Some("a"), vec![]));

        let err = registry.effective("a").unwrap_err();
        assert!(matches!(err, ProfileError::InheritanceCycle(_)));
    }

    #[test]
    fn self_parent_is_a_cycle() {
        let mut registry = ProfileRegistry::new();
        registry.add(builtin("selfish", "", Some("selfish"), vec![]));

        assert!(matches!(
            registry.effective("selfish"),
            Err(ProfileError::InheritanceCycle(_))
        ));
    }

    #[test]
    fn unknown_profile_is_not_found() {
        let registry = ProfileRegistry::new();
        assert!(matches!(
            registry.effective("nope"),
            Err(ProfileError::NotFound(_))
        ));
    }

    #[test]
    fn save_and_reload_round_trip() {
        let dir = TempDir::new().unwrap();
        let mut registry = ProfileRegistry::new();
        registry.set_project_dir(dir.path());

        let mut profile = ConfigurationProfile::new("team");
        profile.description = "Team conventions".to_string();
        profile.parent = Some("default".to_string());
        profile
            .settings
            .insert("line_length".to_string(), Integer(100));

        let path = registry
            .save(profile, ProfileLocation::Project)
            .unwrap();
        assert!(path.exists());

        let mut fresh = ProfileRegistry::new();
        fresh.load_dir(dir.path());

        let loaded = fresh.get("team").unwrap();
        assert_eq!(loaded.description, "Team conventions");
        assert_eq!(loaded.parent.as_deref(), Some("default"));
        assert_eq!(loaded.settings.get("line_length"), Some(&Integer(100)));
    }

    #[test]
    fn file_profiles_shadow_builtins() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("default.toml"),
            r#"
[profile]
name = "default"
description = "overridden"

[profile.settings]
line_length = 60
"#,
        )
        .unwrap();

        let mut registry = ProfileRegistry::new();
        registry.load_dir(dir.path());

        let profile = registry.get("default").unwrap();
        assert_eq!(profile.description, "overridden");
        assert_eq!(profile.settings.get("line_length"), Some(&Integer(60)));
    }

    #[test]
    fn malformed_profile_file_is_skipped() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("bad.toml"), "not toml at all [").unwrap();
        fs::write(dir.path().join("nameless.toml"), "[profile]\ndescription = \"x\"\n").unwrap();
        fs::write(
            dir.path().join("good.toml"),
            "[profile]\nname = \"good\"\n",
        )
        .unwrap();

        let mut registry = ProfileRegistry::new();
        registry.load_dir(dir.path());

        assert!(registry.get("good").is_some());
        assert!(registry.get("nameless").is_none());
    }

    #[test]
    fn export_writes_a_loadable_file() {
        let dir = TempDir::new().unwrap();
        let registry = ProfileRegistry::new();
        let path = dir.path().join("exported.toml");

        registry.export("pycharm", &path).unwrap();

        let loaded = load_profile_file(&path).unwrap();
        assert_eq!(loaded.name, "pycharm");
        assert_eq!(loaded.parent.as_deref(), Some("default"));
    }

    #[test]
    fn export_unknown_profile_fails() {
        let dir = TempDir::new().unwrap();
        let registry = ProfileRegistry::new();
        assert!(matches!(
            registry.export("missing", &dir.path().join("x.toml")),
            Err(ProfileError::NotFound(_))
        ));
    }

    #[test]
    fn effective_builtin_chain() {
        let registry = ProfileRegistry::new();
        let settings = registry.effective("pycharm").unwrap();

        assert_eq!(settings.get("line_length"), Some(&Integer(120)));
        // Inherited from the default profile
        assert_eq!(
            settings.get("skip_magic_trailing_comma"),
            Some(&Boolean(false))
        );
    }
}
