//! Local index of the remote resource tree.
//!
//! Keyed by absolute path. An entry is either a node the gateway reported
//! (or returned from a creation) or a creation that has been planned but
//! not executed yet. A child is only ever created while its parent is
//! resolved.

use crate::error::{Error, Result};
use cloudkit::RemoteResourceNode;
use std::collections::BTreeMap;

/// One entry of the resource index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeEntry {
    /// A node that exists remotely.
    Resolved(RemoteResourceNode),
    /// A planned creation not yet executed.
    Pending,
}

/// Path-keyed index of the API's resources.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceTree {
    entries: BTreeMap<String, TreeEntry>,
}

impl ResourceTree {
    /// Index a resource listing.
    pub fn from_nodes(nodes: impl IntoIterator<Item = RemoteResourceNode>) -> Self {
        Self {
            entries: nodes
                .into_iter()
                .map(|node| (node.path.clone(), TreeEntry::Resolved(node)))
                .collect(),
        }
    }

    /// Tree of an API that does not exist yet: only its root, pending.
    #[must_use]
    pub fn pending_root() -> Self {
        let mut tree = Self::default();
        tree.mark_pending("/");
        tree
    }

    /// Entry at `path`.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&TreeEntry> {
        self.entries.get(path)
    }

    /// Whether `path` is indexed, resolved or pending.
    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    /// Resolved node at `path`.
    #[must_use]
    pub fn node(&self, path: &str) -> Option<&RemoteResourceNode> {
        match self.entries.get(path) {
            Some(TreeEntry::Resolved(node)) => Some(node),
            _ => None,
        }
    }

    /// Id of the resolved node at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Tree`] if the path is unknown or still pending.
    pub fn resource_id(&self, path: &str) -> Result<&str> {
        match self.entries.get(path) {
            Some(TreeEntry::Resolved(node)) => Ok(&node.id),
            Some(TreeEntry::Pending) => Err(Error::Tree(format!(
                "{path} is used before its creation ran"
            ))),
            None => Err(Error::Tree(format!("{path} is not in the resource tree"))),
        }
    }

    /// Record a planned creation. Resolved entries are left alone.
    pub fn mark_pending(&mut self, path: &str) {
        self.entries
            .entry(path.to_string())
            .or_insert(TreeEntry::Pending);
    }

    /// Record a node that now exists remotely.
    pub fn resolve(&mut self, node: RemoteResourceNode) {
        self.entries
            .insert(node.path.clone(), TreeEntry::Resolved(node));
    }

    /// Mutable access to a resolved node.
    pub fn node_mut(&mut self, path: &str) -> Option<&mut RemoteResourceNode> {
        match self.entries.get_mut(path) {
            Some(TreeEntry::Resolved(node)) => Some(node),
            _ => None,
        }
    }

    /// Drop `path` and every entry below it. Returns the dropped paths.
    pub fn remove_subtree(&mut self, path: &str) -> Vec<String> {
        let removed: Vec<String> = self
            .entries
            .keys()
            .filter(|p| p.as_str() == path || is_ancestor(path, p))
            .cloned()
            .collect();
        for p in &removed {
            self.entries.remove(p);
        }
        removed
    }

    /// Resolved nodes in path order.
    pub fn nodes(&self) -> impl Iterator<Item = &RemoteResourceNode> {
        self.entries.values().filter_map(|entry| match entry {
            TreeEntry::Resolved(node) => Some(node),
            TreeEntry::Pending => None,
        })
    }

    /// Indexed paths in path order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Parent of an absolute path; `None` for the root.
#[must_use]
pub fn parent_path(path: &str) -> Option<&str> {
    if path == "/" {
        return None;
    }
    match path.rfind('/') {
        Some(0) => Some("/"),
        Some(i) => Some(&path[..i]),
        None => None,
    }
}

/// Last segment of an absolute path.
#[must_use]
pub fn path_part(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Proper ancestors of a path, excluding the root, shallowest first.
///
/// `/a/b/c` yields `/a`, `/a/b`.
#[must_use]
pub fn ancestors(path: &str) -> Vec<&str> {
    path.match_indices('/')
        .map(|(i, _)| i)
        .filter(|&i| i > 0)
        .map(|i| &path[..i])
        .collect()
}

/// Whether `ancestor` is a proper ancestor of `path`.
#[must_use]
pub fn is_ancestor(ancestor: &str, path: &str) -> bool {
    if ancestor == path {
        return false;
    }
    if ancestor == "/" {
        return path.starts_with('/');
    }
    path.strip_prefix(ancestor)
        .is_some_and(|rest| rest.starts_with('/'))
}
