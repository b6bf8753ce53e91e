//! Plugin discovery and registration
//!
//! Definitions come from two sources:
//! 1. The compiled-in reference plugins, always registered first
//! 2. `*.toml` definition files found in the discovery paths
//!
//! One manager is created per formatting session and passed by reference
//! to the dispatch pipeline and the CLI layer.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::contract::FormatPlugin;
use super::definition::{PluginDefinition, PluginKind};
use crate::config::PluginsConfig;

#[derive(Default)]
pub struct PluginManager {
    definitions: Vec<PluginDefinition>,
    enabled: Vec<Box<dyn FormatPlugin>>,
    /// Definition names for `enabled`, index for index
    enabled_names: Vec<String>,
    discovered: bool,
}

impl PluginManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Default discovery paths, in search order: a relative `plugins`
    /// folder, the per-user plugin folder, and the install-prefix share
    /// folder
    pub fn default_discovery_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("plugins")];
        if let Some(dir) = crate::config::user_config_dir() {
            paths.push(dir.join("plugins"));
        }
        paths.push(crate::config::system_share_dir().join("plugins"));
        paths
    }

    /// Rebuilds the registration table: compiled-in definitions first,
    /// then definition files from each path in order
    pub fn discover(&mut self, paths: &[PathBuf]) {
        self.definitions.clear();
        for kind in PluginKind::ALL {
            self.register(PluginDefinition::builtin(kind));
        }
        for path in paths {
            self.scan_directory(path);
        }
        self.discovered = true;
    }

    /// Runs discovery if it has not happened yet, using the configured
    /// paths or the defaults
    pub fn ensure_discovered(&mut self, config: &PluginsConfig) {
        if self.discovered {
            return;
        }
        if config.discovery_paths.is_empty() {
            self.discover(&Self::default_discovery_paths());
        } else {
            self.discover(&config.discovery_paths);
        }
    }

    /// Rebuilds the enabled set from the resolved configuration.
    ///
    /// A plugin that fails to configure is logged and left out; the rest
    /// are unaffected.
    pub fn configure(&mut self, config: &PluginsConfig) {
        self.enabled.clear();
        self.enabled_names.clear();

        if config.disable_all {
            debug!("all plugins disabled");
            return;
        }

        self.ensure_discovered(config);

        for definition in &self.definitions {
            if !config.is_enabled(&definition.name) {
                continue;
            }

            let mut options = definition.baseline_options.clone();
            if let Some(user) = config.options_for(&definition.name) {
                options.extend(user.clone());
            }

            let mut plugin = definition.kind.instantiate();
            match plugin.configure(&options) {
                Ok(()) => {
                    self.enabled.push(plugin);
                    self.enabled_names.push(definition.name.clone());
                }
                Err(e) => {
                    warn!(plugin = %definition.name, error = %e, "failed to configure plugin, skipping it");
                }
            }
        }
    }

    /// Enabled plugin instances in registration order
    pub fn enabled_plugins(&self) -> &[Box<dyn FormatPlugin>] {
        &self.enabled
    }

    /// Definition names of the enabled plugins, in order
    pub fn enabled_names(&self) -> &[String] {
        &self.enabled_names
    }

    /// One enabled plugin, looked up by its definition name
    pub fn enabled_plugin(&self, name: &str) -> Option<&dyn FormatPlugin> {
        self.enabled_names
            .iter()
            .position(|candidate| candidate == name)
            .map(|index| self.enabled[index].as_ref())
    }

    /// The registration table, for read-only introspection
    pub fn definitions(&self) -> &[PluginDefinition] {
        &self.definitions
    }

    /// Registers a definition. A name collision replaces the earlier
    /// definition in place, keeping its registration position.
    fn register(&mut self, definition: PluginDefinition) {
        let position = self
            .definitions
            .iter()
            .position(|existing| existing.name == definition.name);
        match position {
            Some(index) => {
                debug!(plugin = %definition.name, "definition replaced by a later one");
                self.definitions[index] = definition;
            }
            None => self.definitions.push(definition),
        }
    }

    fn scan_directory(&mut self, dir: &Path) {
        if !dir.is_dir() {
            return;
        }
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(_) => return,
        };

        // Lexicographic file order keeps name collisions deterministic
        let mut candidates: Vec<PathBuf> = entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| is_definition_file(path))
            .collect();
        candidates.sort();

        for path in candidates {
            match PluginDefinition::load(&path) {
                Ok(definition) => self.register(definition),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping plugin definition");
                }
            }
        }
    }
}

/// Definition candidates are regular `*.toml` files whose stem does not
/// start with an underscore
fn is_definition_file(path: &Path) -> bool {
    path.is_file()
        && path.extension().is_some_and(|ext| ext == "toml")
        && path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .is_some_and(|stem| !stem.starts_with('_'))
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tempfile::TempDir;

    use super::*;
    use crate::config::PluginConfig;
    use crate::pipeline::DispatchContext;
    use crate::syntax::{LineRenderer, NodeKind, SyntaxNode};

    fn discovered_manager(dir: &Path) -> PluginManager {
        let mut manager = PluginManager::new();
        manager.discover(&[dir.to_path_buf()]);
        manager
    }

    fn definition_names(manager: &PluginManager) -> Vec<&str> {
        manager
            .definitions()
            .iter()
            .map(|definition| definition.name.as_str())
            .collect()
    }

    fn enabled_names(manager: &PluginManager) -> Vec<&str> {
        manager
            .enabled_plugins()
            .iter()
            .map(|plugin| plugin.name())
            .collect()
    }

    #[test]
    fn builtins_are_always_registered() {
        let dir = TempDir::new().unwrap();
        let manager = discovered_manager(dir.path());

        assert_eq!(
            definition_names(&manager),
            vec!["import_sorter", "string_normalizer"]
        );
    }

    #[test]
    fn definition_files_extend_the_table() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("team_sorter.toml"),
            "[plugin]\nname = \"team_sorter\"\nkind = \"import_sorter\"\n",
        )
        .unwrap();

        let manager = discovered_manager(dir.path());
        assert_eq!(
            definition_names(&manager),
            vec!["import_sorter", "string_normalizer", "team_sorter"]
        );
    }

    #[test]
    fn underscore_files_are_ignored() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("_draft.toml"),
            "[plugin]\nname = \"draft\"\nkind = \"import_sorter\"\n",
        )
        .unwrap();

        let manager = discovered_manager(dir.path());
        assert!(!definition_names(&manager).contains(&"draft"));
    }

    #[test]
    fn broken_definitions_do_not_abort_discovery() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("aaa_broken.toml"), "not [ toml").unwrap();
        fs::write(
            dir.path().join("zzz_good.toml"),
            "[plugin]\nname = \"good\"\nkind = \"import_sorter\"\n",
        )
        .unwrap();

        let manager = discovered_manager(dir.path());
        assert!(definition_names(&manager).contains(&"good"));
    }

    #[test]
    fn collisions_take_the_later_file_but_keep_the_position() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("a_custom.toml"),
            "[plugin]\nname = \"custom\"\nversion = \"1.0.0\"\nkind = \"import_sorter\"\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("b_other.toml"),
            "[plugin]\nname = \"other\"\nkind = \"import_sorter\"\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("c_custom.toml"),
            "[plugin]\nname = \"custom\"\nversion = \"2.0.0\"\nkind = \"string_normalizer\"\n",
        )
        .unwrap();

        let manager = discovered_manager(dir.path());
        assert_eq!(
            definition_names(&manager),
            vec!["import_sorter", "string_normalizer", "custom", "other"]
        );

        let custom = manager
            .definitions()
            .iter()
            .find(|definition| definition.name == "custom")
            .unwrap();
        assert_eq!(custom.version, "2.0.0");
        assert_eq!(custom.kind, PluginKind::StringNormalizer);
    }

    #[test]
    fn a_definition_file_can_shadow_a_builtin() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("import_sorter.toml"),
            r#"
[plugin]
name = "import_sorter"
kind = "import_sorter"

[plugin.options]
first_party_prefixes = "acme"
"#,
        )
        .unwrap();

        let manager = discovered_manager(dir.path());
        let sorter = &manager.definitions()[0];
        assert_eq!(sorter.name, "import_sorter");
        assert!(sorter.source.is_some());
        assert_eq!(sorter.baseline_options["first_party_prefixes"], json!("acme"));
    }

    #[test]
    fn configure_enables_by_default() {
        let dir = TempDir::new().unwrap();
        let mut manager = discovered_manager(dir.path());

        manager.configure(&PluginsConfig::default());
        assert_eq!(
            enabled_names(&manager),
            vec!["import_sorter", "string_normalizer"]
        );
    }

    #[test]
    fn explicit_disable_removes_one_plugin() {
        let dir = TempDir::new().unwrap();
        let mut manager = discovered_manager(dir.path());

        let mut config = PluginsConfig::default();
        let mut sorter = PluginConfig::new("import_sorter");
        sorter.state = crate::config::PluginState::Disabled;
        config.plugin_configs.insert("import_sorter".to_string(), sorter);

        manager.configure(&config);
        assert_eq!(enabled_names(&manager), vec!["string_normalizer"]);
    }

    #[test]
    fn disable_all_empties_the_set() {
        let dir = TempDir::new().unwrap();
        let mut manager = discovered_manager(dir.path());

        let mut config = PluginsConfig::default();
        config.disable_all = true;
        let mut sorter = PluginConfig::new("import_sorter");
        sorter.state = crate::config::PluginState::Enabled;
        config.plugin_configs.insert("import_sorter".to_string(), sorter);

        manager.configure(&config);
        assert!(manager.enabled_plugins().is_empty());
    }

    #[test]
    fn enable_by_default_off_requires_explicit_enables() {
        let dir = TempDir::new().unwrap();
        let mut manager = discovered_manager(dir.path());

        let mut config = PluginsConfig::default();
        config.enable_by_default = false;
        manager.configure(&config);
        assert!(manager.enabled_plugins().is_empty());

        let mut sorter = PluginConfig::new("import_sorter");
        sorter.state = crate::config::PluginState::Enabled;
        config.plugin_configs.insert("import_sorter".to_string(), sorter);
        manager.configure(&config);
        assert_eq!(enabled_names(&manager), vec!["import_sorter"]);
    }

    #[test]
    fn user_options_reach_the_plugin() {
        let dir = TempDir::new().unwrap();
        let mut manager = discovered_manager(dir.path());

        let mut config = PluginsConfig::default();
        let mut normalizer = PluginConfig::new("string_normalizer");
        normalizer
            .options
            .insert("quotes".to_string(), json!("single"));
        config
            .plugin_configs
            .insert("string_normalizer".to_string(), normalizer);

        manager.configure(&config);

        let plugin = manager.enabled_plugin("string_normalizer").unwrap();
        let node = SyntaxNode::new(NodeKind::Str, "\"hi\"");
        let mut ctx = DispatchContext::new();
        let lines = plugin.apply(&LineRenderer, &node, &mut ctx).unwrap();
        assert_eq!(lines, Some(vec!["'hi'".to_string()]));
    }

    #[test]
    fn baseline_options_sit_under_user_options() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("house.toml"),
            r#"
[plugin]
name = "house"
kind = "import_sorter"

[plugin.options]
first_party_prefixes = "acme"
separate_groups_with_blank_line = false
"#,
        )
        .unwrap();

        let mut manager = discovered_manager(dir.path());
        let mut config = PluginsConfig::default();
        let mut house = PluginConfig::new("house");
        house
            .options
            .insert("separate_groups_with_blank_line".to_string(), json!(true));
        config.plugin_configs.insert("house".to_string(), house);

        manager.configure(&config);

        let plugin = manager.enabled_plugin("house").unwrap();
        let module = crate::syntax::parse_module("import acme.core\nimport os\n");
        let mut ctx = DispatchContext::new();
        let lines = plugin.apply(&LineRenderer, &module, &mut ctx).unwrap().unwrap();

        // Baseline first-party grouping holds; the user's separator
        // override wins over the baseline's
        assert_eq!(lines, vec!["import os", "", "import acme.core"]);
    }

    #[test]
    fn bad_options_skip_only_that_plugin() {
        let dir = TempDir::new().unwrap();
        let mut manager = discovered_manager(dir.path());

        let mut config = PluginsConfig::default();
        let mut normalizer = PluginConfig::new("string_normalizer");
        normalizer.options.insert("quotes".to_string(), json!(123));
        config
            .plugin_configs
            .insert("string_normalizer".to_string(), normalizer);

        manager.configure(&config);
        assert_eq!(enabled_names(&manager), vec!["import_sorter"]);
    }

    #[test]
    fn configure_discovers_with_the_configured_paths() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("house.toml"),
            "[plugin]\nname = \"house\"\nkind = \"import_sorter\"\n",
        )
        .unwrap();

        let mut manager = PluginManager::new();
        let mut config = PluginsConfig::default();
        config.discovery_paths = vec![dir.path().to_path_buf()];

        manager.configure(&config);
        assert!(definition_names(&manager).contains(&"house"));
    }
}
