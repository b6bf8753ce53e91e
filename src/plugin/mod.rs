//! # Plugin System
//!
//! Extensibility layer for the formatting pipeline.
//!
//! ## Overview
//!
//! A plugin claims syntax nodes during dispatch and renders them itself;
//! nodes it declines fall through to the next plugin and finally to the
//! host formatter. Plugins are compiled in and activated through TOML
//! definition files, so a deployment chooses behavior without rebuilding.
//!
//! ## Reference Plugins
//!
//! | Name | Claims | Purpose |
//! |------|--------|---------|
//! | `import_sorter` | `Module`, import statements | Groups and orders imports |
//! | `string_normalizer` | String literals | Enforces one quote style |
//!
//! ## Plugin Discovery
//!
//! Definition files (`*.toml`, skipping `_`-prefixed names) are scanned
//! from, in order:
//! 1. `plugins/` relative to the working directory
//! 2. The per-user config folder's `plugins/`
//! 3. The install-prefix share folder's `plugins/`
//!
//! The compiled-in definitions are registered before any file, and a name
//! collision is won by the definition processed last.
//!
//! ## Key Types
//!
//! - [`FormatPlugin`] - Trait every plugin implements
//! - [`PluginManager`] - Discovers definitions and holds the enabled set
//! - [`PluginDefinition`] - One registration table entry
//! - [`ImportGroupSorter`], [`StringNormalizer`] - The reference plugins

mod contract;
mod definition;
mod import_sorter;
mod manager;
mod string_normalizer;

pub use contract::{
    read_bool, read_string, read_string_list, read_usize, toml_to_json, FormatPlugin, OptionMap,
    PluginError,
};
pub use definition::{DefinitionError, PluginDefinition, PluginKind};
pub use import_sorter::{ImportGroupSorter, IMPORT_SORTING_IN_PROGRESS};
pub use manager::PluginManager;
pub use string_normalizer::StringNormalizer;
