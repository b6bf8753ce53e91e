//! Plugin listing

use anyhow::Result;

use super::output::Output;
use crate::config::PluginsConfig;
use crate::plugin::PluginManager;

/// Prints the registration table with enablement under the given
/// configuration
pub fn list(output: &Output, manager: &PluginManager, config: &PluginsConfig) -> Result<()> {
    let definitions = manager.definitions();

    if output.is_json() {
        let items: Vec<_> = definitions
            .iter()
            .map(|definition| {
                serde_json::json!({
                    "name": definition.name,
                    "version": definition.version,
                    "description": definition.description,
                    "kind": definition.kind.as_str(),
                    "enabled": config.is_enabled(&definition.name),
                    "source": definition.source.as_ref().map(|path| path.display().to_string()),
                })
            })
            .collect();
        output.data(&items);
        return Ok(());
    }

    if definitions.is_empty() {
        println!("No plugins registered.");
        return Ok(());
    }

    println!(
        "{:<24} {:<10} {:<9} DESCRIPTION",
        "NAME", "VERSION", "ENABLED"
    );
    println!("{}", "-".repeat(78));
    for definition in definitions {
        let enabled = if config.is_enabled(&definition.name) {
            "yes"
        } else {
            "no"
        };
        println!(
            "{:<24} {:<10} {:<9} {}",
            definition.name, definition.version, enabled, definition.description
        );
    }

    Ok(())
}
