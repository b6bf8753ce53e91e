//! Per-node dispatch: every syntax node is offered to the enabled plugins
//! before the host renderer formats it.

use std::collections::HashMap;

use serde_json::Value;
use tracing::warn;

use crate::plugin::FormatPlugin;
use crate::syntax::{NodeKind, SyntaxNode};

/// Mutable key-value scope shared by plugins while one top-level node is
/// formatted.
///
/// The driver creates a fresh context per module and discards it when the
/// module is done, so nothing leaks between files or runs. Plugins use it
/// to signal one another, for example that a subtree has already been
/// claimed.
#[derive(Debug, Default)]
pub struct DispatchContext {
    values: HashMap<String, Value>,
}

impl DispatchContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.values.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    /// Returns true if `key` holds a boolean true
    pub fn flag(&self, key: &str) -> bool {
        matches!(self.values.get(key), Some(Value::Bool(true)))
    }
}

/// Rendering callback handed to plugins.
///
/// The dispatch pipeline itself implements this, so a plugin that renders
/// child nodes re-enters dispatch and the other plugins get their turn at
/// those children.
pub trait NodeRenderer {
    fn render(&self, node: &SyntaxNode, ctx: &mut DispatchContext) -> Vec<String>;
}

impl<F> NodeRenderer for F
where
    F: Fn(&SyntaxNode, &mut DispatchContext) -> Vec<String>,
{
    fn render(&self, node: &SyntaxNode, ctx: &mut DispatchContext) -> Vec<String> {
        self(node, ctx)
    }
}

/// Offers each node to the enabled plugins in registration order and falls
/// back to the host renderer when no plugin claims it.
///
/// The first plugin returning `Some(lines)` wins; its output is used
/// verbatim. A plugin error is logged and treated as a deferral, so one
/// faulty plugin never blocks the rest of the pipeline.
pub struct DispatchPipeline<'a> {
    plugins: &'a [Box<dyn FormatPlugin>],
    host: &'a dyn NodeRenderer,
}

impl<'a> DispatchPipeline<'a> {
    pub fn new(plugins: &'a [Box<dyn FormatPlugin>], host: &'a dyn NodeRenderer) -> Self {
        Self { plugins, host }
    }
}

impl NodeRenderer for DispatchPipeline<'_> {
    fn render(&self, node: &SyntaxNode, ctx: &mut DispatchContext) -> Vec<String> {
        for plugin in self.plugins {
            match plugin.apply(self, node, ctx) {
                Ok(Some(lines)) => return lines,
                Ok(None) => {}
                Err(e) => {
                    warn!(plugin = plugin.name(), error = %e, "plugin failed, continuing without it");
                }
            }
        }

        // No plugin claimed the node. Modules fall back to dispatching each
        // child; leaf nodes go to the host renderer.
        match node.kind {
            NodeKind::Module => node
                .children
                .iter()
                .flat_map(|child| self.render(child, ctx))
                .collect(),
            _ => self.host.render(node, ctx),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::plugin::{OptionMap, PluginError};
    use crate::syntax::LineRenderer;

    type Trace = Rc<RefCell<Vec<String>>>;

    /// Records its name in a shared trace when offered a node, then defers,
    /// claims, or fails.
    struct Probe {
        name: &'static str,
        claims: Option<Vec<String>>,
        fails: bool,
        trace: Option<Trace>,
    }

    impl Probe {
        fn deferring(name: &'static str) -> Self {
            Self {
                name,
                claims: None,
                fails: false,
                trace: None,
            }
        }

        fn claiming(name: &'static str, lines: &[&str]) -> Self {
            Self {
                claims: Some(lines.iter().map(|l| l.to_string()).collect()),
                ..Self::deferring(name)
            }
        }

        fn failing(name: &'static str) -> Self {
            Self {
                fails: true,
                ..Self::deferring(name)
            }
        }

        fn traced(name: &'static str, trace: &Trace) -> Self {
            Self {
                trace: Some(Rc::clone(trace)),
                ..Self::deferring(name)
            }
        }
    }

    impl FormatPlugin for Probe {
        fn name(&self) -> &str {
            self.name
        }

        fn description(&self) -> &str {
            "test probe"
        }

        fn version(&self) -> &str {
            "0.0.0"
        }

        fn default_options(&self) -> OptionMap {
            OptionMap::new()
        }

        fn configure(&mut self, _options: &OptionMap) -> Result<(), PluginError> {
            Ok(())
        }

        fn apply(
            &self,
            _renderer: &dyn NodeRenderer,
            _node: &SyntaxNode,
            _ctx: &mut DispatchContext,
        ) -> Result<Option<Vec<String>>, PluginError> {
            if let Some(trace) = &self.trace {
                trace.borrow_mut().push(self.name.to_string());
            }
            if self.fails {
                return Err(PluginError::Failed("boom".to_string()));
            }
            Ok(self.claims.clone())
        }
    }

    fn boxed(probe: Probe) -> Box<dyn FormatPlugin> {
        Box::new(probe)
    }

    #[test]
    fn first_claim_wins() {
        let plugins = vec![
            boxed(Probe::claiming("first", &["claimed"])),
            boxed(Probe::claiming("second", &["ignored"])),
        ];
        let host = LineRenderer;
        let pipeline = DispatchPipeline::new(&plugins, &host);

        let node = SyntaxNode::new(NodeKind::Statement, "x = 1");
        let mut ctx = DispatchContext::new();
        assert_eq!(pipeline.render(&node, &mut ctx), vec!["claimed".to_string()]);
    }

    #[test]
    fn plugins_are_offered_in_registration_order() {
        let trace: Trace = Rc::new(RefCell::new(Vec::new()));
        let plugins = vec![
            boxed(Probe::traced("a", &trace)),
            boxed(Probe::traced("b", &trace)),
            boxed(Probe::traced("c", &trace)),
        ];
        let host = LineRenderer;
        let pipeline = DispatchPipeline::new(&plugins, &host);

        let node = SyntaxNode::new(NodeKind::Statement, "x = 1");
        let mut ctx = DispatchContext::new();
        assert_eq!(pipeline.render(&node, &mut ctx), vec!["x = 1".to_string()]);
        assert_eq!(*trace.borrow(), vec!["a", "b", "c"]);
    }

    #[test]
    fn failing_plugin_is_skipped() {
        let plugins = vec![
            boxed(Probe::failing("broken")),
            boxed(Probe::claiming("healthy", &["rescued"])),
        ];
        let host = LineRenderer;
        let pipeline = DispatchPipeline::new(&plugins, &host);

        let node = SyntaxNode::new(NodeKind::Statement, "x = 1");
        let mut ctx = DispatchContext::new();
        assert_eq!(pipeline.render(&node, &mut ctx), vec!["rescued".to_string()]);
    }

    #[test]
    fn failing_plugin_still_reaches_host_fallback() {
        let plugins = vec![boxed(Probe::failing("broken"))];
        let host = LineRenderer;
        let pipeline = DispatchPipeline::new(&plugins, &host);

        let node = SyntaxNode::new(NodeKind::Statement, "x = 1");
        let mut ctx = DispatchContext::new();
        assert_eq!(pipeline.render(&node, &mut ctx), vec!["x = 1".to_string()]);
    }

    #[test]
    fn unclaimed_module_dispatches_each_child() {
        let probe = Probe::deferring("watcher");
        let plugins = vec![boxed(probe)];
        let host = LineRenderer;
        let pipeline = DispatchPipeline::new(&plugins, &host);

        let module = crate::syntax::parse_module("import os\nx = 1\n");
        let mut ctx = DispatchContext::new();
        let lines = pipeline.render(&module, &mut ctx);

        assert_eq!(lines, vec!["import os".to_string(), "x = 1".to_string()]);
    }

    #[test]
    fn empty_claim_still_wins() {
        let plugins = vec![boxed(Probe::claiming("eraser", &[]))];
        let host = LineRenderer;
        let pipeline = DispatchPipeline::new(&plugins, &host);

        let node = SyntaxNode::new(NodeKind::Statement, "x = 1");
        let mut ctx = DispatchContext::new();
        assert!(pipeline.render(&node, &mut ctx).is_empty());
    }

    #[test]
    fn context_flags() {
        let mut ctx = DispatchContext::new();
        assert!(!ctx.flag("claimed"));

        ctx.set("claimed", Value::Bool(true));
        assert!(ctx.flag("claimed"));

        ctx.remove("claimed");
        assert!(!ctx.flag("claimed"));
    }
}
