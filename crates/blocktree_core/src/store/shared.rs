//! Thread-safe handle around one [`BlockStore`].
//!
//! Mutations take the write lock and are serialized per store. Reads take the
//! read lock and return owned clones, so callers never observe a partial
//! mutation.

use crate::model::block::{Block, BlockId};
use crate::repo::tree_repo::{TreeRepoResult, TreeSnapshotRepository};
use crate::schema::registry::SchemaRegistry;
use crate::store::block_store::{BlockStore, StoreOptions};
use crate::store::error::BlockResult;
use crate::store::requests::{
    BlockFilter, CreateBlock, DeleteBlock, DuplicateBlock, MoveBlock, SearchQuery, UpdateBlock,
};
use crate::store::tree::BlockTree;
use log::info;
use parking_lot::RwLock;
use std::sync::Arc;

/// Cloneable, lock-guarded block store. Clones share the same store.
#[derive(Debug, Clone)]
pub struct SharedBlockStore {
    inner: Arc<RwLock<BlockStore>>,
}

impl SharedBlockStore {
    pub fn new(registry: Arc<SchemaRegistry>) -> Self {
        Self::from_store(BlockStore::new(registry))
    }

    pub fn with_options(registry: Arc<SchemaRegistry>, options: StoreOptions) -> Self {
        Self::from_store(BlockStore::with_options(registry, options))
    }

    pub fn from_store(store: BlockStore) -> Self {
        Self {
            inner: Arc::new(RwLock::new(store)),
        }
    }

    /// Runs `f` under the read lock.
    pub fn read<T>(&self, f: impl FnOnce(&BlockStore) -> T) -> T {
        f(&self.inner.read())
    }

    /// Runs `f` under the write lock, e.g. to apply several mutations as one
    /// critical section.
    pub fn write<T>(&self, f: impl FnOnce(&mut BlockStore) -> T) -> T {
        f(&mut self.inner.write())
    }

    pub fn create(&self, request: CreateBlock) -> BlockResult<Block> {
        self.inner.write().create(request)
    }

    pub fn get(&self, id: BlockId) -> Option<Block> {
        self.inner.read().get(id)
    }

    pub fn get_many(&self, ids: &[BlockId]) -> Vec<Block> {
        self.inner.read().get_many(ids)
    }

    pub fn query(&self, filter: &BlockFilter) -> Vec<Block> {
        self.inner.read().query(filter)
    }

    pub fn search(&self, query: &SearchQuery) -> Vec<Block> {
        self.inner.read().search(query)
    }

    pub fn get_children(&self, id: BlockId, recursive: bool) -> Vec<Block> {
        self.inner.read().get_children(id, recursive)
    }

    pub fn get_parent(&self, id: BlockId) -> Option<Block> {
        self.inner.read().get_parent(id)
    }

    pub fn get_ancestors(&self, id: BlockId) -> Vec<Block> {
        self.inner.read().get_ancestors(id)
    }

    pub fn get_roots(&self) -> Vec<Block> {
        self.inner.read().get_roots()
    }

    pub fn update(&self, request: UpdateBlock) -> BlockResult<Block> {
        self.inner.write().update(request)
    }

    pub fn move_block(&self, request: MoveBlock) -> BlockResult<Block> {
        self.inner.write().move_block(request)
    }

    pub fn delete(&self, request: DeleteBlock) -> BlockResult<Vec<BlockId>> {
        self.inner.write().delete(request)
    }

    pub fn duplicate(&self, request: DuplicateBlock) -> BlockResult<Block> {
        self.inner.write().duplicate(request)
    }

    pub fn export_tree(&self) -> BlockTree {
        self.inner.read().export_tree()
    }

    pub fn import_tree(&self, tree: BlockTree) -> BlockResult<usize> {
        self.inner.write().import_tree(tree)
    }

    pub fn clear(&self) {
        self.inner.write().clear();
    }

    pub fn count(&self) -> usize {
        self.inner.read().count()
    }

    pub fn verify_integrity(&self) -> BlockResult<()> {
        self.inner.read().verify_integrity()
    }

    /// Saves a point-in-time snapshot through `repo`. Returns the block count.
    ///
    /// The lock is released before any I/O starts.
    pub fn persist(&self, repo: &impl TreeSnapshotRepository) -> TreeRepoResult<usize> {
        let tree = self.export_tree();
        repo.save_tree(&tree)?;
        info!(
            "event=store_persist module=store status=ok blocks={}",
            tree.len()
        );
        Ok(tree.len())
    }

    /// Replaces the store with the snapshot held by `repo`, if any.
    ///
    /// Returns the restored block count, or `None` when no snapshot exists.
    pub fn restore(&self, repo: &impl TreeSnapshotRepository) -> TreeRepoResult<Option<usize>> {
        let Some(tree) = repo.load_tree()? else {
            info!("event=store_restore module=store status=skipped reason=no_snapshot");
            return Ok(None);
        };
        let count = self.import_tree(tree)?;
        info!("event=store_restore module=store status=ok blocks={count}");
        Ok(Some(count))
    }
}
