//! Reference plugin: groups and reorders module-level imports
//!
//! Imports are classified into groups (stdlib, third-party, first-party,
//! local), sorted within each group, and emitted in a configurable group
//! order. Everything else in the module renders unchanged after the
//! import block.

use serde_json::{json, Value};

use super::contract::{
    read_bool, read_string_list, read_usize, FormatPlugin, OptionMap, PluginError,
};
use crate::pipeline::{DispatchContext, NodeRenderer};
use crate::syntax::{NodeKind, SyntaxNode};

/// Context flag set while the sorter renders a module's imports, so the
/// re-dispatched import nodes are not claimed a second time
pub const IMPORT_SORTING_IN_PROGRESS: &str = "import_sorting_in_progress";

/// Well-known standard library modules, used when no stdlib prefixes are
/// configured
const STDLIB_MODULES: [&str; 22] = [
    "sys",
    "os",
    "re",
    "math",
    "time",
    "datetime",
    "collections",
    "itertools",
    "functools",
    "random",
    "socket",
    "json",
    "csv",
    "argparse",
    "logging",
    "pathlib",
    "typing",
    "abc",
    "io",
    "tempfile",
    "shutil",
    "unittest",
];

pub struct ImportGroupSorter {
    group_order: Vec<String>,
    stdlib_prefixes: Vec<String>,
    third_party_prefixes: Vec<String>,
    first_party_prefixes: Vec<String>,
    local_prefixes: Vec<String>,
    sort_case_insensitive: bool,
    sort_by_package_then_name: bool,
    separate_groups_with_blank_line: bool,
    /// Declared for parity with the host formatter's width setting; this
    /// plugin never rewraps import lines
    #[allow(dead_code)]
    line_length: usize,
}

impl Default for ImportGroupSorter {
    fn default() -> Self {
        Self {
            group_order: vec![
                "stdlib".to_string(),
                "third_party".to_string(),
                "first_party".to_string(),
                "local".to_string(),
            ],
            stdlib_prefixes: Vec::new(),
            third_party_prefixes: Vec::new(),
            first_party_prefixes: Vec::new(),
            local_prefixes: vec![".".to_string()],
            sort_case_insensitive: true,
            sort_by_package_then_name: true,
            separate_groups_with_blank_line: true,
            line_length: 88,
        }
    }
}

impl FormatPlugin for ImportGroupSorter {
    fn name(&self) -> &str {
        "import_sorter"
    }

    fn description(&self) -> &str {
        "Sorts imports with customizable grouping and ordering rules"
    }

    fn version(&self) -> &str {
        "1.0.0"
    }

    fn default_options(&self) -> OptionMap {
        OptionMap::from([
            (
                "group_order".to_string(),
                json!("stdlib,third_party,first_party,local"),
            ),
            ("stdlib_prefixes".to_string(), json!("")),
            ("third_party_prefixes".to_string(), json!("")),
            ("first_party_prefixes".to_string(), json!("")),
            ("local_prefixes".to_string(), json!(".")),
            ("sort_case_insensitive".to_string(), json!(true)),
            ("sort_by_package_then_name".to_string(), json!(true)),
            ("separate_groups_with_blank_line".to_string(), json!(true)),
            ("line_length".to_string(), json!(88)),
        ])
    }

    fn configure(&mut self, options: &OptionMap) -> Result<(), PluginError> {
        read_string_list(options, "group_order", &mut self.group_order)?;
        read_string_list(options, "stdlib_prefixes", &mut self.stdlib_prefixes)?;
        read_string_list(options, "third_party_prefixes", &mut self.third_party_prefixes)?;
        read_string_list(options, "first_party_prefixes", &mut self.first_party_prefixes)?;
        read_string_list(options, "local_prefixes", &mut self.local_prefixes)?;
        read_bool(options, "sort_case_insensitive", &mut self.sort_case_insensitive)?;
        read_bool(
            options,
            "sort_by_package_then_name",
            &mut self.sort_by_package_then_name,
        )?;
        read_bool(
            options,
            "separate_groups_with_blank_line",
            &mut self.separate_groups_with_blank_line,
        )?;
        read_usize(options, "line_length", &mut self.line_length)?;
        Ok(())
    }

    fn apply(
        &self,
        renderer: &dyn NodeRenderer,
        node: &SyntaxNode,
        ctx: &mut DispatchContext,
    ) -> Result<Option<Vec<String>>, PluginError> {
        match node.kind {
            NodeKind::Module => Ok(self.sort_module(renderer, node, ctx)),
            NodeKind::Import | NodeKind::ImportFrom => {
                if ctx.flag(IMPORT_SORTING_IN_PROGRESS) {
                    // The module pass owns these nodes
                    Ok(None)
                } else {
                    Ok(Some(vec![node.text.clone()]))
                }
            }
            _ => Ok(None),
        }
    }
}

impl ImportGroupSorter {
    /// Renders a whole module with its imports grouped and sorted. Returns
    /// `None` when the module has no imports to sort.
    fn sort_module(
        &self,
        renderer: &dyn NodeRenderer,
        module: &SyntaxNode,
        ctx: &mut DispatchContext,
    ) -> Option<Vec<String>> {
        let imports: Vec<&SyntaxNode> = module
            .children
            .iter()
            .filter(|child| child.is_import())
            .collect();
        if imports.is_empty() {
            return None;
        }

        ctx.set(IMPORT_SORTING_IN_PROGRESS, Value::Bool(true));

        let mut import_lines: Vec<String> = Vec::new();
        let mut current_group: Option<&str> = None;
        for (group, import) in self.sort_imports(&imports) {
            if self.separate_groups_with_blank_line
                && current_group.is_some_and(|previous| previous != group)
            {
                import_lines.push(String::new());
            }
            import_lines.extend(renderer.render(import, ctx));
            current_group = Some(group);
        }

        // The separator policy owns the whitespace between the import block
        // and the rest of the module, so leading blanks are not re-emitted
        let mut other_lines: Vec<String> = Vec::new();
        let mut seen_statement = false;
        for child in module.children.iter().filter(|child| !child.is_import()) {
            if !seen_statement && child.kind == NodeKind::Blank {
                continue;
            }
            seen_statement = true;
            other_lines.extend(renderer.render(child, ctx));
        }

        ctx.remove(IMPORT_SORTING_IN_PROGRESS);

        let mut lines = import_lines;
        if !lines.is_empty() && !other_lines.is_empty() {
            lines.push(String::new());
        }
        lines.extend(other_lines);
        Some(lines)
    }

    /// Groups the imports, sorts each group, and emits groups in the
    /// configured order. Groups not listed in the order are appended in
    /// first-seen order.
    fn sort_imports<'n>(&self, imports: &[&'n SyntaxNode]) -> Vec<(&'static str, &'n SyntaxNode)> {
        let mut grouped: Vec<(&'static str, Vec<&'n SyntaxNode>)> = Vec::new();
        for &import in imports {
            let group = self.classify(&import_path(&import.text));
            match grouped.iter_mut().find(|(name, _)| *name == group) {
                Some((_, members)) => members.push(import),
                None => grouped.push((group, vec![import])),
            }
        }

        // Stable sort, so ties keep their source order
        for (_, members) in &mut grouped {
            members.sort_by_key(|import| self.sort_key(&import_path(&import.text)));
        }

        let mut sorted = Vec::new();
        for name in &self.group_order {
            if let Some((group, members)) = grouped.iter().find(|(group, _)| *group == name.as_str())
            {
                sorted.extend(members.iter().map(|&import| (*group, import)));
            }
        }
        for (group, members) in &grouped {
            if !self.group_order.iter().any(|name| name.as_str() == *group) {
                sorted.extend(members.iter().map(|&import| (*group, import)));
            }
        }
        sorted
    }

    /// Classifies an import path into a group, tested in a fixed priority
    /// order: local, first-party, third-party, stdlib, with third-party as
    /// the default bucket.
    fn classify(&self, path: &str) -> &'static str {
        if matches_prefix(path, &self.local_prefixes) {
            return "local";
        }
        if matches_prefix(path, &self.first_party_prefixes) {
            return "first_party";
        }
        if matches_prefix(path, &self.third_party_prefixes) {
            return "third_party";
        }

        let stdlib = if self.stdlib_prefixes.is_empty() {
            is_stdlib_module(path)
        } else {
            matches_prefix(path, &self.stdlib_prefixes)
        };
        if stdlib {
            "stdlib"
        } else {
            "third_party"
        }
    }

    /// Sort key within a group. With package-first sorting, submodules
    /// cluster under their top-level package.
    fn sort_key(&self, path: &str) -> (String, String) {
        let path = if self.sort_case_insensitive {
            path.to_lowercase()
        } else {
            path.to_string()
        };

        let package = match path.split_once('.') {
            Some((package, _)) if self.sort_by_package_then_name => package.to_string(),
            _ => path.clone(),
        };
        (package, path)
    }
}

fn matches_prefix(path: &str, prefixes: &[String]) -> bool {
    prefixes.iter().any(|prefix| path.starts_with(prefix.as_str()))
}

/// A module path counts as standard library when its top-level component
/// is one of the well-known names
fn is_stdlib_module(path: &str) -> bool {
    let top = path.split('.').next().unwrap_or(path);
    STDLIB_MODULES.contains(&top)
}

/// Extracts the leading module path from an import statement's text
fn import_path(text: &str) -> String {
    if let Some(rest) = text.strip_prefix("import ") {
        let first = rest.split(',').next().unwrap_or(rest);
        return first
            .split_whitespace()
            .next()
            .unwrap_or("")
            .to_string();
    }
    if let Some(rest) = text.strip_prefix("from ") {
        return rest.split_whitespace().next().unwrap_or("").to_string();
    }
    String::new()
}
