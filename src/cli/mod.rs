//! # Command-Line Interface
//!
//! User-facing CLI commands and output formatting.
//!
//! ## Command Groups
//!
//! | Group | Purpose | Examples |
//! |-------|---------|----------|
//! | Format | Run the formatter | `sable src/app.py`, `sable -w src/` |
//! | Plugins | Control the plugin set | `--plugin`, `--disable-plugin`, `--list-plugins` |
//! | Profile | Manage setting profiles | `profile list`, `profile save`, `profile export` |
//!
//! ## Output Formats
//!
//! All commands support the `--format` flag:
//! - `text` (default) - Human-readable output
//! - `json` - Machine-parseable JSON
//!
//! ## Verbose Mode
//!
//! Use `--verbose` (or `-v`) for debug logging on stderr:
//! ```bash
//! sable --verbose --list-plugins
//! ```
//!
//! ## Entry Point
//!
//! Call [`run()`] to parse arguments and execute the appropriate command.

mod app;
mod format;
mod output;
mod plugin_cmd;
mod profile_cmd;

pub use app::{run, Cli, Commands};
pub use format::{format_source, FormatArgs};
pub use output::{Output, OutputFormat};
