//! Folder tree: the caller-supplied bookmark hierarchy.
//!
//! The tree is an in-memory index of folder nodes keyed by identifier.
//! Parent relations are a separate lookup table rather than embedded
//! pointers, so the whole structure is a plain value: cheaply cloneable,
//! `Send`, and free of ownership cycles. This core never mutates a tree;
//! it is a snapshot for the duration of one resolution.

pub mod parse;
pub mod resolver;

pub use resolver::{FolderResolver, ResolutionFailure, ResolverConfig};

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifier of the synthetic root. Never a resolution candidate.
pub const ROOT_ID: &str = "__root__";

/// Errors raised while building a tree from serialized folders
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TreeError {
    /// Two folders share the same identifier
    #[error("Duplicate folder identifier: {0}")]
    DuplicateId(String),

    /// A folder uses the reserved synthetic root identifier
    #[error("Folder identifier is reserved: {0}")]
    ReservedId(String),
}

/// Serialized folder as supplied by the folder store
///
/// This is the wire shape bookmark exports reduce to: an identifier, a
/// display name, and nested children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Folder {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub children: Vec<Folder>,
}

impl Folder {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<Folder>) -> Self {
        self.children = children;
        self
    }
}

/// A single node of an indexed tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderNode {
    /// Identifier, unique across the whole tree
    pub id: String,
    /// Display name as the user sees it
    pub name: String,
    /// Child identifiers, in original order
    pub children: Vec<String>,
}

/// Indexed, immutable folder hierarchy
#[derive(Debug, Clone)]
pub struct FolderTree {
    nodes: HashMap<String, FolderNode>,
    /// child id -> parent id, for every non-root node
    parents: HashMap<String, String>,
    /// id -> root-to-node display path ("Work/Projects/Alpha")
    paths: HashMap<String, String>,
}

impl FolderTree {
    /// Index a forest of serialized folders under a synthetic root.
    ///
    /// Identifier uniqueness is enforced here; depth and breadth bounds
    /// are the caller's contract.
    pub fn from_folders(folders: &[Folder]) -> Result<Self, TreeError> {
        let mut tree = Self {
            nodes: HashMap::new(),
            parents: HashMap::new(),
            paths: HashMap::new(),
        };

        let mut root = FolderNode {
            id: ROOT_ID.to_string(),
            name: String::new(),
            children: Vec::new(),
        };
        for folder in folders {
            root.children.push(folder.id.clone());
        }
        tree.nodes.insert(ROOT_ID.to_string(), root);

        for folder in folders {
            tree.index_folder(folder, ROOT_ID, "")?;
        }

        Ok(tree)
    }

    fn index_folder(&mut self, folder: &Folder, parent: &str, prefix: &str) -> Result<(), TreeError> {
        if folder.id == ROOT_ID {
            return Err(TreeError::ReservedId(folder.id.clone()));
        }
        if self.nodes.contains_key(&folder.id) {
            return Err(TreeError::DuplicateId(folder.id.clone()));
        }

        let path = if prefix.is_empty() {
            folder.name.clone()
        } else {
            format!("{}/{}", prefix, folder.name)
        };

        self.nodes.insert(
            folder.id.clone(),
            FolderNode {
                id: folder.id.clone(),
                name: folder.name.clone(),
                children: folder.children.iter().map(|c| c.id.clone()).collect(),
            },
        );
        self.parents.insert(folder.id.clone(), parent.to_string());
        self.paths.insert(folder.id.clone(), path.clone());

        for child in &folder.children {
            self.index_folder(child, &folder.id, &path)?;
        }
        Ok(())
    }

    /// Look up a node by identifier. The synthetic root is not returned.
    pub fn get(&self, id: &str) -> Option<&FolderNode> {
        if id == ROOT_ID {
            return None;
        }
        self.nodes.get(id)
    }

    /// Parent of a node, if it has a real (non-synthetic) one
    pub fn parent(&self, id: &str) -> Option<&FolderNode> {
        let parent_id = self.parents.get(id)?;
        self.get(parent_id)
    }

    /// Root-to-node display path, e.g. "Work/Projects/Alpha"
    pub fn path(&self, id: &str) -> Option<&str> {
        self.paths.get(id).map(String::as_str)
    }

    /// All real nodes, in no particular order
    pub fn nodes(&self) -> impl Iterator<Item = &FolderNode> {
        self.nodes.values().filter(|n| n.id != ROOT_ID)
    }

    /// Real nodes in depth-first order, parents before children.
    /// This is the order prompt serialization uses.
    pub fn nodes_depth_first(&self) -> Vec<&FolderNode> {
        let mut out = Vec::with_capacity(self.len());
        let mut stack: Vec<&str> = self.nodes[ROOT_ID]
            .children
            .iter()
            .rev()
            .map(String::as_str)
            .collect();
        while let Some(id) = stack.pop() {
            if let Some(node) = self.nodes.get(id) {
                out.push(node);
                for child in node.children.iter().rev() {
                    stack.push(child);
                }
            }
        }
        out
    }

    /// Number of real nodes
    pub fn len(&self) -> usize {
        self.nodes.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Depth of a node below the root (top-level folders are depth 0)
    pub fn depth(&self, id: &str) -> Option<usize> {
        self.paths.get(id).map(|p| p.matches('/').count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tree() -> FolderTree {
        let folders = vec![
            Folder::new("1", "Work").with_children(vec![Folder::new("2", "Projects")
                .with_children(vec![
                    Folder::new("3", "Alpha"),
                    Folder::new("4", "Beta"),
                ])]),
            Folder::new("5", "Personal").with_children(vec![Folder::new("6", "Recipes")]),
        ];
        FolderTree::from_folders(&folders).unwrap()
    }

    #[test]
    fn test_index_and_paths() {
        let tree = sample_tree();
        assert_eq!(tree.len(), 6);
        assert_eq!(tree.path("3"), Some("Work/Projects/Alpha"));
        assert_eq!(tree.path("6"), Some("Personal/Recipes"));
        assert_eq!(tree.get("3").unwrap().name, "Alpha");
    }

    #[test]
    fn test_parent_lookup() {
        let tree = sample_tree();
        assert_eq!(tree.parent("3").unwrap().id, "2");
        assert_eq!(tree.parent("2").unwrap().id, "1");
        // Top-level folders hang off the synthetic root
        assert!(tree.parent("1").is_none());
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let folders = vec![Folder::new("1", "Work"), Folder::new("1", "Personal")];
        let err = FolderTree::from_folders(&folders).unwrap_err();
        assert_eq!(err, TreeError::DuplicateId("1".to_string()));
    }

    #[test]
    fn test_reserved_root_id_rejected() {
        let folders = vec![Folder::new(ROOT_ID, "Sneaky")];
        let err = FolderTree::from_folders(&folders).unwrap_err();
        assert_eq!(err, TreeError::ReservedId(ROOT_ID.to_string()));
    }

    #[test]
    fn test_depth_first_order() {
        let tree = sample_tree();
        let names: Vec<&str> = tree
            .nodes_depth_first()
            .iter()
            .map(|n| n.name.as_str())
            .collect();
        assert_eq!(
            names,
            vec!["Work", "Projects", "Alpha", "Beta", "Personal", "Recipes"]
        );
    }

    #[test]
    fn test_root_is_not_visible() {
        let tree = sample_tree();
        assert!(tree.get(ROOT_ID).is_none());
        assert!(tree.nodes().all(|n| n.id != ROOT_ID));
    }

    #[test]
    fn test_depth() {
        let tree = sample_tree();
        assert_eq!(tree.depth("1"), Some(0));
        assert_eq!(tree.depth("3"), Some(2));
    }
}
