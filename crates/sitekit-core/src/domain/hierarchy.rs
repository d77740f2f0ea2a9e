// ============================================================================
// SiteKit Core - Hierarchy Builder
// File: crates/sitekit-core/src/domain/hierarchy.rs
// Description: Flat entity list to ordered forest conversion
// ============================================================================
//! Builds the nested tree from an already access-filtered flat list.
//! Entities whose parent is missing from the input (filtered out or
//! nonexistent) are orphans and are excluded from the result.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Implemented by entities that live in a parent/child tree.
pub trait TreeItem {
    fn id(&self) -> Uuid;
    fn parent_id(&self) -> Option<Uuid>;
    fn sort_order(&self) -> i32;
    fn created_at(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Serialize)]
pub struct TreeNode<T> {
    #[serde(flatten)]
    pub item: T,
    pub children: Vec<TreeNode<T>>,
}

/// Groups entities by parent id, then attaches children starting from the
/// root group, each sibling group ordered by (sort_order, created_at).
/// O(n) over the input thanks to the precomputed parent index.
pub fn build_forest<T: TreeItem + Clone>(items: &[T]) -> Vec<TreeNode<T>> {
    let mut by_parent: HashMap<Option<Uuid>, Vec<&T>> = HashMap::new();
    for item in items {
        by_parent.entry(item.parent_id()).or_default().push(item);
    }
    for group in by_parent.values_mut() {
        group.sort_by_key(|item| (item.sort_order(), item.created_at()));
    }
    // The visited set keeps a corrupt parent graph from recursing forever.
    let mut visited = HashSet::with_capacity(items.len());
    attach(None, &by_parent, &mut visited)
}

fn attach<T: TreeItem + Clone>(
    parent: Option<Uuid>,
    by_parent: &HashMap<Option<Uuid>, Vec<&T>>,
    visited: &mut HashSet<Uuid>,
) -> Vec<TreeNode<T>> {
    let Some(group) = by_parent.get(&parent) else {
        return Vec::new();
    };
    let mut nodes = Vec::with_capacity(group.len());
    for item in group {
        if !visited.insert(item.id()) {
            continue;
        }
        nodes.push(TreeNode {
            item: (*item).clone(),
            children: attach(Some(item.id()), by_parent, visited),
        });
    }
    nodes
}
