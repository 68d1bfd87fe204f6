//! Send-control location: pluggable per-origin adapters.
//!
//! After pasting an auto-send message the executor must find the page's
//! "send" control. Host pages expose no stable API for that, so the default
//! adapter runs a small ordered set of heuristics over the surface's control
//! tree; origins whose markup defeats the defaults get an explicit override
//! registered in [`OriginAdapters`].

use std::collections::HashMap;
use std::sync::Arc;

use crate::utils::contains_ci;

/// Path of child indices from the tree root to a node
pub type NodePath = Vec<usize>;

/// A snapshot node of the target surface's control tree.
///
/// Only the attributes the heuristics inspect are carried; the driver that
/// produced the snapshot resolves a [`NodePath`] back to the live element.
#[derive(Debug, Clone, Default)]
pub struct ControlNode {
    pub attributes: HashMap<String, String>,
    pub clickable: bool,
    pub children: Vec<ControlNode>,
}

impl ControlNode {
    pub fn new() -> Self {
        ControlNode::default()
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn clickable(mut self) -> Self {
        self.clickable = true;
        self
    }

    pub fn child(mut self, child: ControlNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn node_at(&self, path: &[usize]) -> Option<&ControlNode> {
        let mut node = self;
        for &index in path {
            node = node.children.get(index)?;
        }
        Some(node)
    }
}

/// Locates the send control within a surface's control tree
pub trait SendControlLocator: Send + Sync {
    fn locate_send_control(&self, root: &ControlNode) -> Option<NodePath>;
}

/// Default heuristic adapter.
///
/// Ordered heuristics, first hit wins:
/// 1. a node whose test-id attribute equals a known id;
/// 2. a node whose aria-label contains a localized label substring;
/// 3. a node whose icon attribute names a send icon, walked up to its
///    nearest clickable ancestor.
#[derive(Debug, Clone)]
pub struct HeuristicLocator {
    pub test_ids: Vec<String>,
    pub aria_labels: Vec<String>,
    pub icon_names: Vec<String>,
}

impl Default for HeuristicLocator {
    fn default() -> Self {
        HeuristicLocator {
            test_ids: vec!["compose-btn-send".to_string()],
            aria_labels: vec!["enviar".to_string(), "send".to_string()],
            icon_names: vec!["send".to_string(), "wds-ic-send-filled".to_string()],
        }
    }
}

impl HeuristicLocator {
    fn find_by<F>(&self, node: &ControlNode, path: &mut NodePath, pred: &F) -> Option<NodePath>
    where
        F: Fn(&ControlNode) -> bool,
    {
        if pred(node) {
            return Some(path.clone());
        }
        for (index, child) in node.children.iter().enumerate() {
            path.push(index);
            if let Some(found) = self.find_by(child, path, pred) {
                return Some(found);
            }
            path.pop();
        }
        None
    }

    /// Nearest clickable node on the path from root to `path`, inclusive
    fn clickable_ancestor(root: &ControlNode, path: &[usize]) -> Option<NodePath> {
        for end in (0..=path.len()).rev() {
            let candidate = &path[..end];
            if root.node_at(candidate).is_some_and(|n| n.clickable) {
                return Some(candidate.to_vec());
            }
        }
        None
    }
}

impl SendControlLocator for HeuristicLocator {
    fn locate_send_control(&self, root: &ControlNode) -> Option<NodePath> {
        if let Some(path) = self.find_by(root, &mut Vec::new(), &|n| {
            n.attr("data-testid")
                .is_some_and(|id| self.test_ids.iter().any(|known| known == id))
        }) {
            return Some(path);
        }

        if let Some(path) = self.find_by(root, &mut Vec::new(), &|n| {
            n.attr("aria-label")
                .is_some_and(|label| self.aria_labels.iter().any(|l| contains_ci(label, l)))
        }) {
            return Some(path);
        }

        let icon_path = self.find_by(root, &mut Vec::new(), &|n| {
            n.attr("data-icon")
                .is_some_and(|icon| self.icon_names.iter().any(|known| known == icon))
        })?;
        Self::clickable_ancestor(root, &icon_path)
    }
}

/// Per-origin adapter registry with a default heuristic fallback
#[derive(Clone)]
pub struct OriginAdapters {
    default: Arc<dyn SendControlLocator>,
    overrides: Vec<(String, Arc<dyn SendControlLocator>)>,
}

impl Default for OriginAdapters {
    fn default() -> Self {
        OriginAdapters {
            default: Arc::new(HeuristicLocator::default()),
            overrides: Vec::new(),
        }
    }
}

impl OriginAdapters {
    pub fn with_default(locator: Arc<dyn SendControlLocator>) -> Self {
        OriginAdapters {
            default: locator,
            overrides: Vec::new(),
        }
    }

    /// Register an override for origins containing `pattern`
    pub fn register(&mut self, pattern: impl Into<String>, locator: Arc<dyn SendControlLocator>) {
        self.overrides.push((pattern.into(), locator));
    }

    pub fn locator_for(&self, origin: &str) -> &dyn SendControlLocator {
        self.overrides
            .iter()
            .find(|(pattern, _)| contains_ci(origin, pattern))
            .map(|(_, locator)| locator.as_ref())
            .unwrap_or(self.default.as_ref())
    }
}
