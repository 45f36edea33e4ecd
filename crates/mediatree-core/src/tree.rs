//! Variant dependency tree
//!
//! A [`VariantTree`] owns every [`Variant`] of one context in an arena. Links
//! between nodes are arena indices, so the tree is immutable, `Send + Sync` and
//! cheap to share once built.
//!
//! Invariants of a tree built with [`VariantTree::from_definitions`]:
//! - at most one node has no parent (the root);
//! - every declared parent exists in the tree;
//! - following parent links from any node reaches the root;
//! - node names are unique.

use std::collections::HashMap;

use crate::config::VariantDefinitions;
use crate::error::{MediaTreeError, Result};
use crate::variant::{Variant, VariantId};

#[derive(Debug, Clone, Default)]
pub struct VariantTree {
    nodes: Vec<Variant>,
    by_name: HashMap<String, VariantId>,
    root: Option<VariantId>,
}

impl VariantTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `variant` under the node named `parent`, or as the root when
    /// `parent` is none or empty.
    ///
    /// The parent must already be in the tree. Use [`from_definitions`](Self::from_definitions)
    /// when declarations are not ordered by dependency.
    pub fn add_node(&mut self, variant: Variant, parent: Option<&str>) -> Result<VariantId> {
        self.check_unique(variant.name())?;
        let parent_id = match parent.filter(|p| !p.is_empty()) {
            Some(parent) => Some(self.by_name.get(parent).copied().ok_or_else(|| {
                MediaTreeError::UnknownParent {
                    variant: variant.name().to_string(),
                    parent: parent.to_string(),
                }
            })?),
            None => None,
        };
        if parent_id.is_none() {
            self.check_single_root(variant.name())?;
        }

        let id = self.insert_shell(variant)?;
        match parent_id {
            Some(parent_id) => self.link(id, parent_id),
            None => self.root = Some(id),
        }
        Ok(id)
    }

    /// Build a tree from flat declarations.
    ///
    /// First every named node is created, then every parent reference is
    /// resolved by name, then each node is checked to reach the root. No partial
    /// tree is returned on failure.
    pub fn from_definitions(definitions: &VariantDefinitions) -> Result<Self> {
        let mut tree = VariantTree::new();

        for (name, definition) in definitions.iter() {
            tree.insert_shell(Variant::new(
                name,
                definition.mode,
                definition.process.clone(),
            ))?;
        }

        for (index, (name, definition)) in definitions.iter().enumerate() {
            let id = VariantId(index);
            match definition.parent_name() {
                Some(parent) => {
                    let parent_id = tree.by_name.get(parent).copied().ok_or_else(|| {
                        MediaTreeError::UnknownParent {
                            variant: name.to_string(),
                            parent: parent.to_string(),
                        }
                    })?;
                    tree.link(id, parent_id);
                }
                None => {
                    tree.check_single_root(name)?;
                    tree.root = Some(id);
                }
            }
        }

        tree.check_acyclic()?;

        tracing::debug!(
            nodes = tree.len(),
            root = tree.root().map(Variant::name).unwrap_or_default(),
            "Built variant tree"
        );
        Ok(tree)
    }

    fn check_unique(&self, name: &str) -> Result<()> {
        if self.by_name.contains_key(name) {
            return Err(MediaTreeError::DuplicateName {
                name: name.to_string(),
            });
        }
        Ok(())
    }

    fn insert_shell(&mut self, mut variant: Variant) -> Result<VariantId> {
        self.check_unique(variant.name())?;
        let id = VariantId(self.nodes.len());
        variant.parent = None;
        variant.children.clear();
        self.by_name.insert(variant.name().to_string(), id);
        self.nodes.push(variant);
        Ok(id)
    }

    fn link(&mut self, child: VariantId, parent: VariantId) {
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    fn check_single_root(&self, candidate: &str) -> Result<()> {
        match self.root {
            Some(root) => Err(MediaTreeError::MultipleRoots {
                first: self.nodes[root.0].name().to_string(),
                second: candidate.to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Walk parent links from every node, bounded by the node count.
    fn check_acyclic(&self) -> Result<()> {
        let limit = self.nodes.len();
        for start in 0..self.nodes.len() {
            let mut path = vec![VariantId(start)];
            let mut current = VariantId(start);
            let mut steps = 0;
            while let Some(parent) = self.nodes[current.0].parent {
                steps += 1;
                if steps > limit {
                    return Err(self.cycle_error(&path));
                }
                if let Some(pos) = path.iter().position(|&id| id == parent) {
                    let mut cycle = path[pos..].to_vec();
                    cycle.push(parent);
                    return Err(self.cycle_error(&cycle));
                }
                path.push(parent);
                current = parent;
            }
        }
        Ok(())
    }

    fn cycle_error(&self, ids: &[VariantId]) -> MediaTreeError {
        MediaTreeError::CyclicDependency {
            path: ids
                .iter()
                .map(|id| self.nodes[id.0].name().to_string())
                .collect(),
        }
    }

    pub fn get_node(&self, name: &str) -> Result<&Variant> {
        self.by_name
            .get(name)
            .map(|&id| &self.nodes[id.0])
            .ok_or_else(|| MediaTreeError::NotFound(format!("Variant \"{}\"", name)))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn node(&self, id: VariantId) -> Option<&Variant> {
        self.nodes.get(id.0)
    }

    pub fn root(&self) -> Option<&Variant> {
        self.root.map(|id| &self.nodes[id.0])
    }

    pub fn parent(&self, variant: &Variant) -> Option<&Variant> {
        variant.parent_id().map(|id| &self.nodes[id.0])
    }

    pub fn children<'a>(&'a self, variant: &'a Variant) -> impl Iterator<Item = &'a Variant> + 'a {
        variant.child_ids().iter().map(move |id| &self.nodes[id.0])
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Pre-order walk from the root: a parent is always yielded before any of
    /// its descendants, siblings in configuration order. Each call starts a new walk.
    pub fn traverse(&self) -> Traverse<'_> {
        Traverse {
            tree: self,
            stack: self.root.into_iter().collect(),
        }
    }
}

/// Lazy pre-order iterator returned by [`VariantTree::traverse`]
pub struct Traverse<'a> {
    tree: &'a VariantTree,
    stack: Vec<VariantId>,
}

impl<'a> Iterator for Traverse<'a> {
    type Item = &'a Variant;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        let node = &self.tree.nodes[id.0];
        self.stack.extend(node.child_ids().iter().rev().copied());
        Some(node)
    }
}
