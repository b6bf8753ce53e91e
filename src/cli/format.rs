//! The format command

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;
use tracing::{debug, warn};

use super::output::Output;
use super::plugin_cmd;
use crate::config::{
    project_profile_dir, ConfigurationManager, PluginOverrides, ProfileRegistry, ProfileSettings,
};
use crate::pipeline::{DispatchContext, DispatchPipeline, NodeRenderer};
use crate::plugin::PluginManager;
use crate::syntax::{parse_module, render_source, LineRenderer};

/// Arguments for the format command
#[derive(Debug, Args)]
pub struct FormatArgs {
    /// Files to format
    pub files: Vec<PathBuf>,

    /// Configuration profile to apply
    #[arg(long, short = 'p')]
    pub profile: Option<String>,

    /// Rewrite files in place instead of printing to stdout
    #[arg(long, short = 'w')]
    pub write: bool,

    /// Enable a plugin for this run: NAME or NAME:key=value,key=value
    #[arg(long = "plugin", value_name = "SPEC")]
    pub plugins: Vec<String>,

    /// Disable a plugin for this run
    #[arg(long = "disable-plugin", value_name = "NAME")]
    pub disable_plugins: Vec<String>,

    /// Disable every plugin for this run
    #[arg(long)]
    pub disable_all_plugins: bool,

    /// Read plugin configuration from this file instead of the manifest
    #[arg(long = "plugin-config", value_name = "PATH")]
    pub plugin_config: Option<PathBuf>,

    /// List known plugins and exit
    #[arg(long)]
    pub list_plugins: bool,
}

pub fn run(output: &Output, args: FormatArgs) -> Result<()> {
    let mut config = ConfigurationManager::new();
    config.load(None);
    config.apply_cli(&PluginOverrides {
        disable_all: args.disable_all_plugins,
        config_path: args.plugin_config.clone(),
        enable_specs: args.plugins.clone(),
        disable: args.disable_plugins.clone(),
    });

    let mut plugins = PluginManager::new();
    plugins.configure(config.config());

    if args.list_plugins {
        plugins.ensure_discovered(config.config());
        return plugin_cmd::list(output, &plugins, config.config());
    }

    if args.files.is_empty() {
        bail!("No input files given");
    }

    let profile = resolve_profile(args.profile.as_deref(), &config)?;
    if let Some((name, settings)) = &profile {
        debug!(profile = %name, settings = ?settings, "resolved profile");
    }

    // In JSON mode stdout carries the summary, so file contents are
    // echoed only for a text-mode dry run
    let echo = !args.write && output.is_text();

    let mut reformatted = 0usize;
    let mut failed = 0usize;

    for path in &args.files {
        match format_file(path, &plugins, args.write, echo) {
            Ok(true) => {
                reformatted += 1;
                if args.write && output.is_text() {
                    println!("reformatted {}", path.display());
                }
            }
            Ok(false) => {}
            Err(e) => {
                failed += 1;
                warn!(path = %path.display(), error = %e, "skipping file");
            }
        }
    }

    if output.is_json() {
        output.data(&serde_json::json!({
            "files": args.files.len(),
            "reformatted": reformatted,
            "failed": failed,
            "profile": profile.as_ref().map(|(name, _)| name),
            "plugins": plugins.enabled_names(),
        }));
    } else if args.write {
        println!(
            "{} file(s) reformatted, {} unchanged, {} failed",
            reformatted,
            args.files.len() - reformatted - failed,
            failed
        );
    }

    Ok(())
}

/// Formats one source text through the plugin pipeline
pub fn format_source(source: &str, plugins: &PluginManager) -> String {
    let module = parse_module(source);
    let host = LineRenderer;
    let pipeline = DispatchPipeline::new(plugins.enabled_plugins(), &host);
    let mut ctx = DispatchContext::new();
    let lines = pipeline.render(&module, &mut ctx);
    render_source(&lines)
}

/// Formats one file. Returns whether the content changed.
fn format_file(path: &Path, plugins: &PluginManager, write: bool, echo: bool) -> Result<bool> {
    let source = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let formatted = format_source(&source, plugins);
    let changed = formatted != source;

    if write {
        if changed {
            fs::write(path, &formatted)
                .with_context(|| format!("Failed to write {}", path.display()))?;
        }
    } else if echo {
        print!("{}", formatted);
    }

    Ok(changed)
}

/// Resolves the named profile against the default registry locations.
///
/// Resolution failures (unknown profile, inheritance cycle) abort the run.
fn resolve_profile(
    name: Option<&str>,
    config: &ConfigurationManager,
) -> Result<Option<(String, ProfileSettings)>> {
    let Some(name) = name else {
        return Ok(None);
    };

    let project_profiles = config.project_root().map(project_profile_dir);
    let registry = ProfileRegistry::load_defaults(project_profiles);
    let settings = registry
        .effective(name)
        .with_context(|| format!("Cannot apply profile '{}'", name))?;
    Ok(Some((name.to_string(), settings)))
}
