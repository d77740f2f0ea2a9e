// ============================================================================
// SiteKit Core - Cycle Guard
// File: crates/sitekit-core/src/domain/cycle.rs
// Description: Parent-assignment validation over a flat entity snapshot
// ============================================================================
//! Cycle detection runs as a reachability check over the in-memory
//! snapshot, never as recursive database queries. Callers run it inside
//! the same transaction as the write (validate-before-write).

use std::collections::{HashMap, HashSet};

use uuid::Uuid;

use crate::domain::hierarchy::TreeItem;
use crate::error::DomainError;

/// Validates that assigning `proposed_parent_id` as the parent of
/// `entity_id` keeps the parent graph a forest.
pub fn validate_parent_assignment<T: TreeItem>(
    entity_id: Uuid,
    proposed_parent_id: Option<Uuid>,
    all: &[T],
) -> Result<(), DomainError> {
    let Some(parent_id) = proposed_parent_id else {
        return Ok(());
    };
    if parent_id == entity_id {
        return Err(DomainError::SelfParent);
    }

    let parents: HashMap<Uuid, Option<Uuid>> =
        all.iter().map(|item| (item.id(), item.parent_id())).collect();

    // Walk the ancestor chain of the proposed parent. Hitting the entity
    // means the entity is an ancestor of its proposed parent. The walk is
    // bounded by the entity count so a pre-existing corrupt cycle cannot
    // spin forever.
    let mut cursor = Some(parent_id);
    let mut steps = 0usize;
    while let Some(current) = cursor {
        if current == entity_id {
            return Err(DomainError::CircularReference { entity_id, parent_id });
        }
        steps += 1;
        if steps > all.len() {
            return Err(DomainError::Internal(
                "parent chain does not terminate at a root".to_string(),
            ));
        }
        cursor = parents.get(&current).copied().flatten();
    }
    Ok(())
}

/// All transitive children of `entity_id` within the snapshot.
pub fn descendants_of<T: TreeItem>(entity_id: Uuid, all: &[T]) -> HashSet<Uuid> {
    let mut children_of: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    for item in all {
        if let Some(parent) = item.parent_id() {
            children_of.entry(parent).or_default().push(item.id());
        }
    }

    let mut found = HashSet::new();
    let mut queue = vec![entity_id];
    while let Some(current) = queue.pop() {
        if let Some(children) = children_of.get(&current) {
            for child in children {
                if found.insert(*child) {
                    queue.push(*child);
                }
            }
        }
    }
    found
}

/// Equivalent detection from the other direction: is `candidate` inside
/// the subtree rooted at `entity_id`?
pub fn is_descendant<T: TreeItem>(candidate: Uuid, entity_id: Uuid, all: &[T]) -> bool {
    descendants_of(entity_id, all).contains(&candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};

    #[derive(Debug, Clone)]
    struct Item {
        id: Uuid,
        parent_id: Option<Uuid>,
    }

    impl TreeItem for Item {
        fn id(&self) -> Uuid {
            self.id
        }
        fn parent_id(&self) -> Option<Uuid> {
            self.parent_id
        }
        fn sort_order(&self) -> i32 {
            0
        }
        fn created_at(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }

    /// root -> mid -> leaf
    fn chain() -> (Item, Item, Item) {
        let root = Item { id: Uuid::new_v4(), parent_id: None };
        let mid = Item { id: Uuid::new_v4(), parent_id: Some(root.id) };
        let leaf = Item { id: Uuid::new_v4(), parent_id: Some(mid.id) };
        (root, mid, leaf)
    }

    #[test]
    fn test_self_parent_rejected() {
        let (root, mid, leaf) = chain();
        let all = vec![root.clone(), mid, leaf];
        assert!(matches!(
            validate_parent_assignment(root.id, Some(root.id), &all),
            Err(DomainError::SelfParent)
        ));
    }

    #[test]
    fn test_parenting_under_descendant_rejected() {
        let (root, mid, leaf) = chain();
        let all = vec![root.clone(), mid.clone(), leaf.clone()];

        let err = validate_parent_assignment(root.id, Some(leaf.id), &all)
            .expect_err("must reject");
        assert!(matches!(err, DomainError::CircularReference { .. }));
        assert!(err.to_string().contains("circular reference"));

        assert!(matches!(
            validate_parent_assignment(root.id, Some(mid.id), &all),
            Err(DomainError::CircularReference { .. })
        ));
    }

    #[test]
    fn test_valid_moves_accepted() {
        let (root, mid, leaf) = chain();
        let other = Item { id: Uuid::new_v4(), parent_id: None };
        let all = vec![root.clone(), mid.clone(), leaf.clone(), other.clone()];

        assert!(validate_parent_assignment(leaf.id, Some(root.id), &all).is_ok());
        assert!(validate_parent_assignment(mid.id, Some(other.id), &all).is_ok());
        assert!(validate_parent_assignment(mid.id, None, &all).is_ok());
    }

    #[test]
    fn test_ancestor_walk_terminates_within_entity_count() {
        // 50-deep chain: the walk from the deepest node must terminate.
        let mut all = Vec::new();
        let mut parent = None;
        for _ in 0..50 {
            let node = Item { id: Uuid::new_v4(), parent_id: parent };
            parent = Some(node.id);
            all.push(node);
        }
        let deepest = all.last().map(|i| i.id).unwrap();
        let newcomer = Item { id: Uuid::new_v4(), parent_id: None };
        all.push(newcomer.clone());
        assert!(validate_parent_assignment(newcomer.id, Some(deepest), &all).is_ok());
    }

    #[test]
    fn test_corrupt_chain_reported_not_looped() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let all = vec![
            Item { id: a, parent_id: Some(b) },
            Item { id: b, parent_id: Some(a) },
        ];
        let outsider = Uuid::new_v4();
        assert!(matches!(
            validate_parent_assignment(outsider, Some(a), &all),
            Err(DomainError::Internal(_))
        ));
    }

    #[test]
    fn test_descendant_set() {
        let (root, mid, leaf) = chain();
        let all = vec![root.clone(), mid.clone(), leaf.clone()];

        let descendants = descendants_of(root.id, &all);
        assert_eq!(descendants.len(), 2);
        assert!(descendants.contains(&mid.id));
        assert!(descendants.contains(&leaf.id));

        assert!(is_descendant(leaf.id, root.id, &all));
        assert!(!is_descendant(root.id, leaf.id, &all));
    }
}
