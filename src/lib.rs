//! Sable - a code formatter with a pluggable formatting pipeline
//!
//! Formatting walks a parsed module through a dispatch pipeline: each
//! enabled plugin may claim a syntax node and render it, and unclaimed
//! nodes fall back to the host renderer. Plugins, their options, and the
//! formatter's setting profiles are all configured from TOML files with
//! command-line overrides on top.

pub mod cli;
pub mod config;
pub mod pipeline;
pub mod plugin;
pub mod syntax;

pub use pipeline::{DispatchContext, DispatchPipeline, NodeRenderer};
pub use plugin::{FormatPlugin, PluginError, PluginManager};
