//! In-memory block forest engine.
//!
//! # Responsibility
//! - Own every block record, parent/child adjacency and root order.
//! - Enforce schema validation and relationship rules on every mutation.
//!
//! # Invariants
//! - No block is its own ancestor.
//! - `children` and `parent_id` always agree; only `link_child` and
//!   `unlink_child` touch either side of an edge.
//! - Parentless blocks appear exactly once in `roots`; parented blocks never do.
//! - A failing call leaves the store unchanged: every check runs before the
//!   first write.

use crate::model::block::{Block, BlockId, BlockMetadata, BlockType};
use crate::model::data::BlockData;
use crate::schema::registry::SchemaRegistry;
use crate::schema::rules::{codes, FieldError};
use crate::store::error::{BlockError, BlockResult};
use crate::store::requests::{
    BlockFilter, CreateBlock, DeleteBlock, DuplicateBlock, MoveBlock, ParentFilter, SearchQuery,
    UpdateBlock,
};
use crate::store::tree::{check_forest, BlockTree, TreeMetadata, FORMAT_VERSION};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use log::{info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use uuid::Uuid;

/// Pulls the key out of serde's "unknown field `x`" and "missing field `x`".
static DECODE_FIELD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:unknown|missing) field `([^`]+)`").expect("valid field regex"));

/// Tunables for a [`BlockStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreOptions {
    /// Search page size when the query sets no limit.
    pub default_search_limit: usize,
    /// Upper bound applied to every search limit.
    pub max_search_limit: usize,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            default_search_limit: 50,
            max_search_limit: 500,
        }
    }
}

/// Typed, schema-validated block forest.
///
/// Single-writer; wrap in [`SharedBlockStore`](crate::store::SharedBlockStore)
/// for use across threads.
#[derive(Debug, Clone)]
pub struct BlockStore {
    registry: Arc<SchemaRegistry>,
    options: StoreOptions,
    /// All blocks in insertion order.
    blocks: IndexMap<BlockId, Block>,
    roots: Vec<BlockId>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl BlockStore {
    /// Creates an empty store with default options.
    pub fn new(registry: Arc<SchemaRegistry>) -> Self {
        Self::with_options(registry, StoreOptions::default())
    }

    pub fn with_options(registry: Arc<SchemaRegistry>, options: StoreOptions) -> Self {
        let now = Utc::now();
        Self {
            registry,
            options,
            blocks: IndexMap::new(),
            roots: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    pub fn options(&self) -> StoreOptions {
        self.options
    }

    /// Creates one block, optionally under a parent.
    ///
    /// # Errors
    /// - [`BlockError::UnknownType`] when the type has no schema.
    /// - [`BlockError::Validation`] when the payload (or default) is invalid.
    /// - [`BlockError::NotFound`] when the parent does not exist.
    /// - [`BlockError::InvalidRelationship`] when the pairing is not allowed.
    pub fn create(&mut self, request: CreateBlock) -> BlockResult<Block> {
        traced("block_create", self.create_inner(request))
    }

    fn create_inner(&mut self, request: CreateBlock) -> BlockResult<Block> {
        let CreateBlock {
            kind,
            data,
            parent_id,
            position,
            metadata,
        } = request;
        let kind = kind.normalized();

        let Some(schema) = self.registry.get_schema(&kind) else {
            return Err(BlockError::UnknownType(kind));
        };
        let data = data.unwrap_or_else(|| schema.default_data.clone());
        let data = self.checked_data(&kind, data)?;

        if let Some(parent_id) = parent_id {
            let parent = self.require(parent_id)?;
            self.ensure_pairing(&parent.kind(), &kind)?;
        }

        let now = Utc::now();
        let block = Block {
            id: Uuid::new_v4(),
            data,
            children: Vec::new(),
            parent_id: None,
            created_at: now,
            updated_at: now,
            version: 1,
            metadata: metadata.unwrap_or_default(),
        };
        let id = block.id;
        self.blocks.insert(id, block);
        self.link_child(parent_id, id, position, now);
        self.touch(now);

        info!(
            "event=block_create module=store status=ok block_id={id} kind={kind} parent_id={}",
            display_parent(parent_id)
        );
        self.cloned(id)
    }

    /// Returns one block, or `None` when it does not exist.
    pub fn get(&self, id: BlockId) -> Option<Block> {
        self.blocks.get(&id).cloned()
    }

    /// Returns the blocks that exist, in input order, without repeats.
    pub fn get_many(&self, ids: &[BlockId]) -> Vec<Block> {
        let mut seen = HashSet::with_capacity(ids.len());
        ids.iter()
            .filter(|id| seen.insert(**id))
            .filter_map(|id| self.blocks.get(id).cloned())
            .collect()
    }

    /// Returns matching blocks in insertion order.
    pub fn query(&self, filter: &BlockFilter) -> Vec<Block> {
        self.blocks
            .values()
            .filter(|block| matches_kinds(block, filter.kinds.as_deref()))
            .filter(|block| match filter.parent {
                None => true,
                Some(ParentFilter::Root) => block.parent_id.is_none(),
                Some(ParentFilter::Block(parent_id)) => block.parent_id == Some(parent_id),
            })
            .cloned()
            .collect()
    }

    /// Case-insensitive substring search over each type's searchable fields.
    ///
    /// Results follow insertion order; `offset` and `limit` apply after
    /// matching. A blank query matches nothing.
    pub fn search(&self, query: &SearchQuery) -> Vec<Block> {
        let needle = query.text.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        let limit = query
            .limit
            .unwrap_or(self.options.default_search_limit)
            .min(self.options.max_search_limit);

        self.blocks
            .values()
            .filter(|block| matches_kinds(block, query.kinds.as_deref()))
            .filter(|block| self.matches_text(block, &needle))
            .skip(query.offset)
            .take(limit)
            .cloned()
            .collect()
    }

    fn matches_text(&self, block: &Block, needle: &str) -> bool {
        let fields = self.registry.searchable_fields(&block.kind());
        if fields.is_empty() {
            return false;
        }
        let data = block.data.to_object();
        let contains = |text: &str| text.to_lowercase().contains(needle);
        fields.iter().any(|field| match data.get(field) {
            Some(Value::String(text)) => contains(text),
            Some(Value::Array(items)) => items
                .iter()
                .any(|item| item.as_str().is_some_and(|text| contains(text))),
            _ => false,
        })
    }

    /// Returns direct children, or every descendant in depth-first pre-order.
    ///
    /// Unknown ids yield an empty list.
    pub fn get_children(&self, id: BlockId, recursive: bool) -> Vec<Block> {
        let Some(block) = self.blocks.get(&id) else {
            return Vec::new();
        };
        if !recursive {
            return self.get_many(&block.children);
        }

        let mut descendants = Vec::new();
        let mut stack: Vec<BlockId> = block.children.iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            if let Some(child) = self.blocks.get(&next) {
                stack.extend(child.children.iter().rev().copied());
                descendants.push(child.clone());
            }
        }
        descendants
    }

    pub fn get_parent(&self, id: BlockId) -> Option<Block> {
        let parent_id = self.blocks.get(&id)?.parent_id?;
        self.get(parent_id)
    }

    /// Returns ancestors from the immediate parent up to the root.
    pub fn get_ancestors(&self, id: BlockId) -> Vec<Block> {
        self.ancestor_ids(id)
            .into_iter()
            .filter_map(|ancestor| self.get(ancestor))
            .collect()
    }

    /// Returns root blocks in root order.
    pub fn get_roots(&self) -> Vec<Block> {
        self.get_many(&self.roots)
    }

    /// Merges data and metadata patches into a block.
    ///
    /// The merged payload is validated as a whole.
    ///
    /// # Errors
    /// - [`BlockError::NotFound`] when the block does not exist.
    /// - [`BlockError::Validation`] when the merged payload or metadata is invalid.
    pub fn update(&mut self, request: UpdateBlock) -> BlockResult<Block> {
        traced("block_update", self.update_inner(request))
    }

    fn update_inner(&mut self, request: UpdateBlock) -> BlockResult<Block> {
        let UpdateBlock { id, data, metadata } = request;
        let block = self.require(id)?;
        let kind = block.kind();
        let data = data.map(|patch| object_patch(&kind, "data", patch)).transpose()?;
        let metadata = metadata
            .map(|patch| object_patch(&kind, "metadata", patch))
            .transpose()?;

        let next_data = match data {
            Some(patch) => {
                let mut merged = block.data.to_object();
                merged.extend(patch);
                Some(self.checked_data(&kind, Value::Object(merged))?)
            }
            None => None,
        };
        let next_metadata = match metadata {
            Some(patch) => Some(merge_metadata(&kind, &block.metadata, patch)?),
            None => None,
        };

        let now = Utc::now();
        let block = self.block_mut(id)?;
        if let Some(data) = next_data {
            block.data = data;
        }
        if let Some(metadata) = next_metadata {
            block.metadata = metadata;
        }
        block.updated_at = now;
        self.touch(now);

        info!("event=block_update module=store status=ok block_id={id} kind={kind}");
        self.cloned(id)
    }

    /// Moves a block under a new parent, or to the root set.
    ///
    /// `position` indexes the destination list after the block has been
    /// removed from its old place; out-of-range values append.
    ///
    /// # Errors
    /// - [`BlockError::NotFound`] when the block or target parent is missing.
    /// - [`BlockError::Cycle`] when the target is the block or a descendant.
    /// - [`BlockError::InvalidRelationship`] when the pairing is not allowed.
    pub fn move_block(&mut self, request: MoveBlock) -> BlockResult<Block> {
        traced("block_move", self.move_inner(request))
    }

    fn move_inner(&mut self, request: MoveBlock) -> BlockResult<Block> {
        let MoveBlock {
            id,
            new_parent_id,
            position,
        } = request;
        let kind = self.require(id)?.kind();

        if let Some(parent_id) = new_parent_id {
            if parent_id == id || self.ancestor_ids(parent_id).contains(&id) {
                return Err(BlockError::Cycle { id, parent_id });
            }
            let parent = self.require(parent_id)?;
            self.ensure_pairing(&parent.kind(), &kind)?;
        }

        let now = Utc::now();
        self.unlink_child(id, now);
        self.link_child(new_parent_id, id, position, now);
        self.block_mut(id)?.updated_at = now;
        self.touch(now);

        info!(
            "event=block_move module=store status=ok block_id={id} parent_id={}",
            display_parent(new_parent_id)
        );
        self.cloned(id)
    }

    /// Deletes a block, and its descendants when cascading.
    ///
    /// Returns removed ids, descendants first (depth-first post-order).
    ///
    /// # Errors
    /// - [`BlockError::NotFound`] when the block does not exist.
    /// - [`BlockError::HasChildren`] when the block has children and the
    ///   request does not cascade.
    pub fn delete(&mut self, request: DeleteBlock) -> BlockResult<Vec<BlockId>> {
        traced("block_delete", self.delete_inner(request))
    }

    fn delete_inner(&mut self, request: DeleteBlock) -> BlockResult<Vec<BlockId>> {
        let DeleteBlock {
            id,
            delete_children,
        } = request;
        let block = self.require(id)?;
        if block.has_children() && !delete_children {
            return Err(BlockError::HasChildren(id));
        }

        let removed = self.subtree_post_order(id);
        let now = Utc::now();
        self.unlink_child(id, now);
        for removed_id in &removed {
            self.blocks.shift_remove(removed_id);
        }
        self.touch(now);

        info!(
            "event=block_delete module=store status=ok block_id={id} removed={}",
            removed.len()
        );
        Ok(removed)
    }

    /// Copies a block next to the original, optionally with its subtree.
    ///
    /// Copies get fresh ids and timestamps, version 1, and cloned data and
    /// metadata. The copy is placed directly after the original.
    ///
    /// # Errors
    /// - [`BlockError::NotFound`] when the block does not exist.
    pub fn duplicate(&mut self, request: DuplicateBlock) -> BlockResult<Block> {
        traced("block_duplicate", self.duplicate_inner(request))
    }

    fn duplicate_inner(&mut self, request: DuplicateBlock) -> BlockResult<Block> {
        let DuplicateBlock {
            id,
            duplicate_children,
        } = request;
        let original = self.require(id)?;
        let parent_id = original.parent_id;
        let position = self
            .siblings(parent_id)
            .and_then(|siblings| siblings.iter().position(|sibling| *sibling == id))
            .map(|index| index + 1);

        let now = Utc::now();
        let copy = fresh_copy(original, now);
        let copy_id = copy.id;
        self.blocks.insert(copy_id, copy);
        self.link_child(parent_id, copy_id, position, now);

        let mut copied = 1;
        if duplicate_children {
            copied += self.copy_descendants(id, copy_id, now);
        }
        self.touch(now);

        info!(
            "event=block_duplicate module=store status=ok block_id={id} copy_id={copy_id} copied={copied}"
        );
        self.cloned(copy_id)
    }

    /// Copies the children of `source` under `target`, breadth-first.
    fn copy_descendants(&mut self, source: BlockId, target: BlockId, now: DateTime<Utc>) -> usize {
        let mut queue = VecDeque::from([(source, target)]);
        let mut copied = 0;
        while let Some((source_id, target_id)) = queue.pop_front() {
            let children = match self.blocks.get(&source_id) {
                Some(block) => block.children.clone(),
                None => continue,
            };
            for child_id in children {
                let Some(child) = self.blocks.get(&child_id) else {
                    continue;
                };
                let copy = fresh_copy(child, now);
                let copy_id = copy.id;
                self.blocks.insert(copy_id, copy);
                self.link_child(Some(target_id), copy_id, None, now);
                queue.push_back((child_id, copy_id));
                copied += 1;
            }
        }
        copied
    }

    /// Snapshots the whole store.
    pub fn export_tree(&self) -> BlockTree {
        BlockTree {
            roots: self.roots.clone(),
            blocks: self.blocks.clone(),
            metadata: TreeMetadata {
                version: FORMAT_VERSION,
                created_at: self.created_at,
                updated_at: self.updated_at,
            },
        }
    }

    /// Replaces the store contents with `tree`.
    ///
    /// The tree is verified first; on error the store is unchanged. Returns
    /// the number of imported blocks.
    pub fn import_tree(&mut self, tree: BlockTree) -> BlockResult<usize> {
        traced("tree_import", self.import_inner(tree))
    }

    fn import_inner(&mut self, tree: BlockTree) -> BlockResult<usize> {
        tree.verify(&self.registry)?;
        let BlockTree {
            roots,
            blocks,
            metadata,
        } = tree;
        self.roots = roots;
        self.blocks = blocks;
        self.created_at = metadata.created_at;
        self.updated_at = metadata.updated_at;

        let count = self.blocks.len();
        info!(
            "event=tree_import module=store status=ok blocks={count} roots={}",
            self.roots.len()
        );
        Ok(count)
    }

    /// Removes every block.
    pub fn clear(&mut self) {
        let removed = self.blocks.len();
        self.blocks.clear();
        self.roots.clear();
        self.touch(Utc::now());
        info!("event=store_clear module=store status=ok removed={removed}");
    }

    pub fn count(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Re-checks every forest invariant on the live store.
    pub fn verify_integrity(&self) -> BlockResult<()> {
        check_forest(&self.roots, &self.blocks, &self.registry)
    }

    fn checked_data(&self, kind: &BlockType, data: Value) -> BlockResult<BlockData> {
        let result = self.registry.validate(kind, &data);
        if !result.valid {
            return Err(BlockError::validation(kind.clone(), result.errors));
        }
        BlockData::from_value(kind, data).map_err(|err| {
            let message = err.to_string();
            let field = DECODE_FIELD_RE
                .captures(&message)
                .and_then(|captures| captures.get(1))
                .map_or("data", |field| field.as_str());
            BlockError::validation(
                kind.clone(),
                vec![FieldError::new(field, message.as_str(), codes::INVALID_SHAPE)],
            )
        })
    }

    fn ensure_pairing(&self, parent: &BlockType, child: &BlockType) -> BlockResult<()> {
        if self.registry.can_have_child(parent, child) {
            Ok(())
        } else {
            Err(BlockError::InvalidRelationship {
                parent: parent.clone(),
                child: child.clone(),
            })
        }
    }

    fn require(&self, id: BlockId) -> BlockResult<&Block> {
        self.blocks.get(&id).ok_or(BlockError::NotFound(id))
    }

    fn block_mut(&mut self, id: BlockId) -> BlockResult<&mut Block> {
        self.blocks.get_mut(&id).ok_or(BlockError::NotFound(id))
    }

    fn cloned(&self, id: BlockId) -> BlockResult<Block> {
        self.require(id).cloned()
    }

    fn ancestor_ids(&self, id: BlockId) -> Vec<BlockId> {
        let mut ancestors = Vec::new();
        let mut current = self.blocks.get(&id).and_then(|block| block.parent_id);
        while let Some(parent_id) = current {
            // The forest is acyclic; the bound only guards against corrupted input.
            if ancestors.len() > self.blocks.len() {
                break;
            }
            ancestors.push(parent_id);
            current = self.blocks.get(&parent_id).and_then(|block| block.parent_id);
        }
        ancestors
    }

    fn subtree_post_order(&self, id: BlockId) -> Vec<BlockId> {
        let mut order = Vec::new();
        let mut stack = vec![(id, false)];
        while let Some((next, expanded)) = stack.pop() {
            if expanded {
                order.push(next);
                continue;
            }
            stack.push((next, true));
            if let Some(block) = self.blocks.get(&next) {
                stack.extend(block.children.iter().rev().map(|child| (*child, false)));
            }
        }
        order
    }

    fn siblings(&self, parent_id: Option<BlockId>) -> Option<&Vec<BlockId>> {
        match parent_id {
            None => Some(&self.roots),
            Some(parent_id) => self.blocks.get(&parent_id).map(|parent| &parent.children),
        }
    }

    fn siblings_mut(&mut self, parent_id: Option<BlockId>) -> Option<&mut Vec<BlockId>> {
        match parent_id {
            None => Some(&mut self.roots),
            Some(parent_id) => self
                .blocks
                .get_mut(&parent_id)
                .map(|parent| &mut parent.children),
        }
    }

    /// Attaches a detached block under `parent_id` (or the root set).
    fn link_child(
        &mut self,
        parent_id: Option<BlockId>,
        child_id: BlockId,
        position: Option<usize>,
        now: DateTime<Utc>,
    ) {
        if let Some(siblings) = self.siblings_mut(parent_id) {
            let index = position.map_or(siblings.len(), |index| index.min(siblings.len()));
            siblings.insert(index, child_id);
        }
        if let Some(parent_id) = parent_id {
            if let Some(parent) = self.blocks.get_mut(&parent_id) {
                parent.updated_at = now;
            }
        }
        if let Some(child) = self.blocks.get_mut(&child_id) {
            child.parent_id = parent_id;
        }
    }

    /// Detaches a block from its parent's children (or the root set).
    fn unlink_child(&mut self, child_id: BlockId, now: DateTime<Utc>) {
        let Some(parent_id) = self.blocks.get(&child_id).map(|child| child.parent_id) else {
            return;
        };
        if let Some(siblings) = self.siblings_mut(parent_id) {
            siblings.retain(|sibling| *sibling != child_id);
        }
        if let Some(parent_id) = parent_id {
            if let Some(parent) = self.blocks.get_mut(&parent_id) {
                parent.updated_at = now;
            }
        }
        if let Some(child) = self.blocks.get_mut(&child_id) {
            child.parent_id = None;
        }
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}

fn traced<T>(event: &str, result: BlockResult<T>) -> BlockResult<T> {
    if let Err(err) = &result {
        warn!(
            "event={event} module=store status=error error_code={}",
            err.code()
        );
    }
    result
}

fn display_parent(parent_id: Option<BlockId>) -> String {
    parent_id.map_or_else(|| "root".to_string(), |id| id.to_string())
}

fn matches_kinds(block: &Block, kinds: Option<&[BlockType]>) -> bool {
    kinds.map_or(true, |kinds| kinds.contains(&block.kind()))
}

fn fresh_copy(source: &Block, now: DateTime<Utc>) -> Block {
    Block {
        id: Uuid::new_v4(),
        data: source.data.clone(),
        children: Vec::new(),
        parent_id: source.parent_id,
        created_at: now,
        updated_at: now,
        version: 1,
        metadata: source.metadata.clone(),
    }
}

/// Update patches merge per key, so anything but an object is rejected.
fn object_patch(kind: &BlockType, field: &str, patch: Value) -> BlockResult<Map<String, Value>> {
    match patch {
        Value::Object(map) => Ok(map),
        _ => Err(BlockError::validation(
            kind.clone(),
            vec![FieldError::new(
                field,
                format!("{field} patch must be an object"),
                codes::INVALID_TYPE,
            )],
        )),
    }
}

fn merge_metadata(
    kind: &BlockType,
    current: &BlockMetadata,
    patch: Map<String, Value>,
) -> BlockResult<BlockMetadata> {
    let invalid = |message: String| {
        BlockError::validation(
            kind.clone(),
            vec![FieldError::new("metadata", message, codes::INVALID_SHAPE)],
        )
    };
    let mut merged = match serde_json::to_value(current) {
        Ok(Value::Object(map)) => map,
        Ok(_) => Map::new(),
        Err(err) => return Err(invalid(err.to_string())),
    };
    merged.extend(patch);
    serde_json::from_value(Value::Object(merged)).map_err(|err| invalid(err.to_string()))
}
