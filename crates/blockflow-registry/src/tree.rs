//! Category tree used to present the block library.
//!
//! Trees come from two places: `*.tree.toml` files and each definition's own
//! `category` path. A tree file is a nest of tables named after categories,
//! each optionally holding a `blocks` list:
//!
//! ```toml
//! [Sources]
//! blocks = ["const_source", "sig_source"]
//!
//! [Sources.Noise]
//! blocks = ["noise_source"]
//! ```
//!
//! The tree is presentational only; it never affects validation or codegen.

use std::collections::BTreeMap;

use toml::{Table, Value};

/// A node in the category tree. The root has an empty name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryTree {
    /// Category name.
    pub name: String,
    /// Block ids directly in this category, in insertion order.
    pub blocks: Vec<String>,
    /// Subcategories by name.
    pub children: BTreeMap<String, CategoryTree>,
}

impl CategoryTree {
    /// An empty root.
    pub fn root() -> Self {
        Self::default()
    }

    fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    /// Adds `block_id` under `path`, creating categories as needed. A block
    /// already present in that category is not added twice.
    pub fn insert(&mut self, path: &[String], block_id: &str) {
        let node = self.node_mut(path);
        if !node.blocks.iter().any(|b| b == block_id) {
            node.blocks.push(block_id.to_string());
        }
    }

    fn node_mut(&mut self, path: &[String]) -> &mut CategoryTree {
        let mut node = self;
        for segment in path {
            node = node
                .children
                .entry(segment.clone())
                .or_insert_with(|| CategoryTree::named(segment));
        }
        node
    }

    /// Finds the node at `path`.
    pub fn get(&self, path: &[&str]) -> Option<&CategoryTree> {
        let mut node = self;
        for segment in path {
            node = node.children.get(*segment)?;
        }
        Some(node)
    }

    /// Merges a parsed tree file into this tree.
    pub fn merge_table(&mut self, table: &Table) {
        self.merge_at(&mut Vec::new(), table);
    }

    fn merge_at(&mut self, path: &mut Vec<String>, table: &Table) {
        for (key, value) in table {
            match (key.as_str(), value) {
                ("blocks", Value::Array(items)) => {
                    // Declares the category even when the list is empty.
                    self.node_mut(path);
                    for id in items.iter().filter_map(Value::as_str) {
                        self.insert(path, id);
                    }
                }
                (_, Value::Table(sub)) => {
                    path.push(key.clone());
                    self.node_mut(path);
                    self.merge_at(path, sub);
                    path.pop();
                }
                _ => {
                    tracing::warn!(key = %key, "ignoring non-table entry in category tree");
                }
            }
        }
    }

    /// Returns a copy keeping only blocks for which `keep` holds, pruning
    /// categories left empty.
    pub fn filtered(&self, keep: &dyn Fn(&str) -> bool) -> CategoryTree {
        CategoryTree {
            name: self.name.clone(),
            blocks: self.blocks.iter().filter(|b| keep(b)).cloned().collect(),
            children: self
                .children
                .iter()
                .map(|(name, child)| (name.clone(), child.filtered(keep)))
                .filter(|(_, child)| !child.is_empty())
                .collect(),
        }
    }

    /// True when neither this node nor any descendant holds a block.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty() && self.children.values().all(CategoryTree::is_empty)
    }

    /// Every block id in the tree, depth first.
    pub fn block_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.blocks.iter().map(String::as_str).collect();
        for child in self.children.values() {
            ids.extend(child.block_ids());
        }
        ids
    }
}
