//! # Configuration Layer
//!
//! Three-tier configuration for the formatting pipeline.
//!
//! | Source | Format | Location |
//! |--------|--------|----------|
//! | Manifest | TOML, `[plugins]` section | `sable.toml` at the project root |
//! | Profiles | TOML, `[profile]` table per file | system, user, and project profile dirs |
//! | CLI overrides | flags | applied last, in a fixed order |
//!
//! Precedence for plugin enablement, highest first: explicit disable,
//! explicit CLI enable, manifest entry, `enable_by_default`.
//!
//! ## Key Types
//!
//! - [`ConfigurationManager`] - Loads the manifest and merges CLI overrides
//! - [`PluginsConfig`] - Resolved plugin configuration consumed by the plugin manager
//! - [`ProfileRegistry`] - Named, inheritable formatter settings bundles

mod manifest;
mod profile;

pub use manifest::{
    coerce_option_value, find_manifest, find_manifest_from, parse_plugin_spec, ConfigError,
    ConfigurationManager, PluginConfig, PluginOverrides, PluginState, PluginsConfig,
    MANIFEST_FILE_NAME,
};
pub use profile::{
    project_profile_dir, ConfigurationProfile, ProfileError, ProfileLocation, ProfileRegistry,
    ProfileSettings,
};

use std::path::PathBuf;

use directories::ProjectDirs;

/// Per-user configuration directory (`~/.config/sable-fmt` on Linux)
pub fn user_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("dev", "sable", "sable-fmt").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Install-prefix shared data directory. `SABLE_SYSTEM_DIR` overrides the
/// default so tests and relocated installs can point elsewhere.
pub fn system_share_dir() -> PathBuf {
    std::env::var_os("SABLE_SYSTEM_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("/usr/local/share/sable"))
}
