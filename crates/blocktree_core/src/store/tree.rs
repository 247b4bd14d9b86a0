//! Export format and forest integrity checks.
//!
//! # Responsibility
//! - Define the only wire format owned by the engine:
//!   `{ roots, blocks, metadata: { version, createdAt, updatedAt } }`.
//! - Verify that a root list plus block map forms a legal forest.
//!
//! # Invariants
//! - `blocks` keeps insertion order so an export/import cycle reproduces the
//!   store's iteration order.
//! - A tree that passes [`check_forest`] can be adopted by a store as-is.

use crate::model::block::{Block, BlockId};
use crate::schema::registry::SchemaRegistry;
use crate::store::error::{BlockError, BlockResult};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Export format version written by this build.
pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeMetadata {
    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Snapshot of a whole block store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockTree {
    /// Root ids in root-set order.
    pub roots: Vec<BlockId>,
    /// Every block keyed by id.
    pub blocks: IndexMap<BlockId, Block>,
    pub metadata: TreeMetadata,
}

impl BlockTree {
    /// Creates an empty tree stamped with the current format version.
    pub fn empty() -> Self {
        let now = Utc::now();
        Self {
            roots: Vec::new(),
            blocks: IndexMap::new(),
            metadata: TreeMetadata {
                version: FORMAT_VERSION,
                created_at: now,
                updated_at: now,
            },
        }
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Checks format version and every structural and schema rule.
    ///
    /// # Errors
    /// - [`BlockError::UnsupportedFormat`] for trees from a newer format.
    /// - Any error returned by [`check_forest`].
    pub fn verify(&self, registry: &SchemaRegistry) -> BlockResult<()> {
        if self.metadata.version > FORMAT_VERSION {
            return Err(BlockError::UnsupportedFormat {
                found: self.metadata.version,
                supported: FORMAT_VERSION,
            });
        }
        check_forest(&self.roots, &self.blocks, registry)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(input: &str) -> serde_json::Result<Self> {
        serde_json::from_str(input)
    }
}

/// Verifies that `roots` and `blocks` form a legal forest under `registry`.
///
/// Checks, in order: map keys match ids, types are registered and payloads
/// validate, root entries are real parentless blocks listed once, every child
/// edge is mirrored by the child's `parent_id` and is a permitted pairing,
/// every block is reachable from a root (no cycles, no orphans).
pub fn check_forest(
    roots: &[BlockId],
    blocks: &IndexMap<BlockId, Block>,
    registry: &SchemaRegistry,
) -> BlockResult<()> {
    for (key, block) in blocks {
        if *key != block.id {
            return Err(invalid(format!("entry {key} holds block {}", block.id)));
        }
        let kind = block.kind();
        if !registry.is_registered(&kind) {
            return Err(BlockError::UnknownType(kind));
        }
        let result = registry.validate(&kind, &block.data.to_value());
        if !result.valid {
            return Err(BlockError::validation(kind, result.errors));
        }
    }

    let mut listed_roots = HashSet::with_capacity(roots.len());
    for root_id in roots {
        let Some(root) = blocks.get(root_id) else {
            return Err(invalid(format!("root {root_id} does not exist")));
        };
        if root.parent_id.is_some() {
            return Err(invalid(format!("root {root_id} has a parent")));
        }
        if !listed_roots.insert(*root_id) {
            return Err(invalid(format!("root {root_id} is listed twice")));
        }
    }

    let mut claimed = HashSet::with_capacity(blocks.len());
    for block in blocks.values() {
        match block.parent_id {
            None if !listed_roots.contains(&block.id) => {
                return Err(invalid(format!(
                    "block {} has no parent but is not a root",
                    block.id
                )));
            }
            Some(parent_id) if !blocks.contains_key(&parent_id) => {
                return Err(invalid(format!(
                    "block {} points at missing parent {parent_id}",
                    block.id
                )));
            }
            _ => {}
        }

        for child_id in &block.children {
            let Some(child) = blocks.get(child_id) else {
                return Err(invalid(format!(
                    "block {} lists missing child {child_id}",
                    block.id
                )));
            };
            if child.parent_id != Some(block.id) {
                return Err(invalid(format!(
                    "block {child_id} is listed under {} but points elsewhere",
                    block.id
                )));
            }
            if !claimed.insert(*child_id) {
                return Err(invalid(format!("block {child_id} is listed twice")));
            }
            let (parent_kind, child_kind) = (block.kind(), child.kind());
            if !registry.can_have_child(&parent_kind, &child_kind) {
                return Err(BlockError::InvalidRelationship {
                    parent: parent_kind,
                    child: child_kind,
                });
            }
        }
    }

    for block in blocks.values() {
        if block.parent_id.is_some() && !claimed.contains(&block.id) {
            return Err(invalid(format!(
                "block {} is missing from its parent's children",
                block.id
            )));
        }
    }

    // Every edge is now consistent, so unreachable blocks can only sit on a cycle.
    let mut visited = HashSet::with_capacity(blocks.len());
    let mut stack: Vec<BlockId> = roots.iter().rev().copied().collect();
    while let Some(id) = stack.pop() {
        if !visited.insert(id) {
            continue;
        }
        if let Some(block) = blocks.get(&id) {
            stack.extend(block.children.iter().rev().copied());
        }
    }
    if visited.len() != blocks.len() {
        return Err(invalid(format!(
            "{} blocks are unreachable from any root (cycle)",
            blocks.len() - visited.len()
        )));
    }

    Ok(())
}

fn invalid(message: String) -> BlockError {
    BlockError::InvalidTree(message)
}

#[cfg(test)]
mod tests {
    use super::{check_forest, BlockTree, FORMAT_VERSION};
    use crate::model::block::{Block, BlockMetadata};
    use crate::model::data::{BlockData, TodoData};
    use crate::schema::registry::SchemaRegistry;
    use crate::store::error::BlockError;
    use chrono::Utc;
    use indexmap::IndexMap;
    use uuid::Uuid;

    fn todo(content: &str) -> Block {
        let now = Utc::now();
        Block {
            id: Uuid::new_v4(),
            data: BlockData::Todo(TodoData {
                content: content.to_string(),
                ..TodoData::default()
            }),
            children: Vec::new(),
            parent_id: None,
            created_at: now,
            updated_at: now,
            version: 1,
            metadata: BlockMetadata::default(),
        }
    }

    fn map(blocks: &[&Block]) -> IndexMap<Uuid, Block> {
        blocks
            .iter()
            .map(|block| (block.id, (*block).clone()))
            .collect()
    }

    #[test]
    fn accepts_nested_todos() {
        let registry = SchemaRegistry::with_builtin_schemas();
        let mut parent = todo("parent");
        let mut child = todo("child");
        parent.children.push(child.id);
        child.parent_id = Some(parent.id);

        check_forest(&[parent.id], &map(&[&parent, &child]), &registry).unwrap();
    }

    #[test]
    fn rejects_two_block_cycle() {
        let registry = SchemaRegistry::with_builtin_schemas();
        let mut a = todo("a");
        let mut b = todo("b");
        a.parent_id = Some(b.id);
        a.children.push(b.id);
        b.parent_id = Some(a.id);
        b.children.push(a.id);

        let err = check_forest(&[], &map(&[&a, &b]), &registry).unwrap_err();
        match err {
            BlockError::InvalidTree(message) => assert!(message.contains("cycle")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn rejects_one_sided_edge() {
        let registry = SchemaRegistry::with_builtin_schemas();
        let mut parent = todo("parent");
        let child = todo("child");
        parent.children.push(child.id);

        let err = check_forest(&[parent.id, child.id], &map(&[&parent, &child]), &registry)
            .unwrap_err();
        assert!(matches!(err, BlockError::InvalidTree(_)));
    }

    #[test]
    fn rejects_newer_format() {
        let registry = SchemaRegistry::with_builtin_schemas();
        let mut tree = BlockTree::empty();
        tree.metadata.version = FORMAT_VERSION + 1;
        assert_eq!(
            tree.verify(&registry).unwrap_err(),
            BlockError::UnsupportedFormat {
                found: FORMAT_VERSION + 1,
                supported: FORMAT_VERSION,
            }
        );
    }

    #[test]
    fn json_helpers_round_trip() {
        let mut tree = BlockTree::empty();
        let block = todo("ship");
        tree.roots.push(block.id);
        tree.blocks.insert(block.id, block);

        let json = tree.to_json().unwrap();
        assert!(json.contains("\"roots\""));
        assert!(json.contains("\"createdAt\""));
        assert_eq!(BlockTree::from_json(&json).unwrap(), tree);
    }
}
