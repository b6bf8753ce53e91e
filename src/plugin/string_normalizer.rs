//! Reference plugin: normalizes the quote style of string-literal
//! statements
//!
//! Intentionally conservative: only single-line strings wrapped in the
//! disfavored quote and free of the favored quote are rewritten; anything
//! else defers to the next plugin or the host renderer.

use serde_json::json;

use super::contract::{read_bool, FormatPlugin, OptionMap, PluginError};
use crate::pipeline::{DispatchContext, NodeRenderer};
use crate::syntax::{NodeKind, SyntaxNode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QuoteStyle {
    Single,
    Double,
    /// Leave quoting to the host formatter
    Default,
}

impl QuoteStyle {
    fn parse(raw: &str) -> Result<Self, PluginError> {
        match raw {
            "single" => Ok(QuoteStyle::Single),
            "double" => Ok(QuoteStyle::Double),
            "default" => Ok(QuoteStyle::Default),
            other => Err(PluginError::InvalidOption {
                option: "quotes".to_string(),
                reason: format!("'{other}' is not one of: single, double, default"),
            }),
        }
    }
}

pub struct StringNormalizer {
    quotes: QuoteStyle,
    normalize_docstrings: bool,
}

impl Default for StringNormalizer {
    fn default() -> Self {
        Self {
            quotes: QuoteStyle::Double,
            normalize_docstrings: true,
        }
    }
}

impl FormatPlugin for StringNormalizer {
    fn name(&self) -> &str {
        "string_normalizer"
    }

    fn description(&self) -> &str {
        "Normalizes string literals with configurable quote style and docstring format"
    }

    fn version(&self) -> &str {
        "1.0.0"
    }

    fn default_options(&self) -> OptionMap {
        OptionMap::from([
            ("quotes".to_string(), json!("double")),
            ("normalize_docstrings".to_string(), json!(true)),
        ])
    }

    fn configure(&mut self, options: &OptionMap) -> Result<(), PluginError> {
        if let Some(value) = options.get("quotes") {
            let raw = value.as_str().ok_or_else(|| PluginError::InvalidOption {
                option: "quotes".to_string(),
                reason: "expected a string".to_string(),
            })?;
            self.quotes = QuoteStyle::parse(raw)?;
        }
        read_bool(options, "normalize_docstrings", &mut self.normalize_docstrings)
    }

    fn apply(
        &self,
        _renderer: &dyn NodeRenderer,
        node: &SyntaxNode,
        _ctx: &mut DispatchContext,
    ) -> Result<Option<Vec<String>>, PluginError> {
        if node.kind != NodeKind::Str {
            return Ok(None);
        }

        let (from, to) = match self.quotes {
            QuoteStyle::Default => return Ok(None),
            QuoteStyle::Double => ("'", "\""),
            QuoteStyle::Single => ("\"", "'"),
        };

        // Triple-quoted statements are docstrings as far as this line-based
        // model can tell
        if is_triple_quoted(&node.text) && !self.normalize_docstrings {
            return Ok(None);
        }

        Ok(normalize(&node.text, from, to).map(|line| vec![line]))
    }
}

fn is_triple_quoted(text: &str) -> bool {
    text.starts_with("'''") || text.starts_with("\"\"\"")
}

/// Swaps the outer quotes when the text is wrapped in the disfavored
/// quote and contains none of the favored one
fn normalize(text: &str, from: &str, to: &str) -> Option<String> {
    if text.contains(to) {
        return None;
    }

    let triple_from = from.repeat(3);
    let triple_to = to.repeat(3);
    swap_quotes(text, &triple_from, &triple_to).or_else(|| swap_quotes(text, from, to))
}

fn swap_quotes(text: &str, from: &str, to: &str) -> Option<String> {
    if text.len() >= from.len() * 2 && text.starts_with(from) && text.ends_with(from) {
        let inner = &text[from.len()..text.len() - from.len()];
        Some(format!("{to}{inner}{to}"))
    } else {
        None
    }
}
