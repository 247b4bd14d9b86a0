//! Request shapes for block store operations.
//!
//! Plain data with builder-style setters so hosts can map HTTP bodies onto
//! them directly.

use crate::model::block::{BlockId, BlockMetadata, BlockType};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Input for [`BlockStore::create`](crate::store::BlockStore::create).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBlock {
    #[serde(rename = "type")]
    pub kind: BlockType,
    /// `None` uses the schema's default payload.
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub parent_id: Option<BlockId>,
    /// Insertion index among siblings; out-of-range appends.
    #[serde(default)]
    pub position: Option<usize>,
    #[serde(default)]
    pub metadata: Option<BlockMetadata>,
}

impl CreateBlock {
    pub fn new(kind: BlockType) -> Self {
        Self {
            kind,
            data: None,
            parent_id: None,
            position: None,
            metadata: None,
        }
    }

    pub fn data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn parent(mut self, parent_id: BlockId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    pub fn position(mut self, position: usize) -> Self {
        self.position = Some(position);
        self
    }

    pub fn metadata(mut self, metadata: BlockMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Input for [`BlockStore::update`](crate::store::BlockStore::update).
///
/// Both patches must be JSON objects. They are merged per top-level key;
/// nested objects are replaced whole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBlock {
    pub id: BlockId,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub metadata: Option<Value>,
}

impl UpdateBlock {
    pub fn new(id: BlockId) -> Self {
        Self {
            id,
            data: None,
            metadata: None,
        }
    }

    pub fn data(mut self, patch: Value) -> Self {
        self.data = Some(patch);
        self
    }

    pub fn metadata(mut self, patch: Value) -> Self {
        self.metadata = Some(patch);
        self
    }
}

/// Input for [`BlockStore::move_block`](crate::store::BlockStore::move_block).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveBlock {
    pub id: BlockId,
    /// `None` moves the block to the root set.
    #[serde(default)]
    pub new_parent_id: Option<BlockId>,
    #[serde(default)]
    pub position: Option<usize>,
}

impl MoveBlock {
    pub fn to_root(id: BlockId) -> Self {
        Self {
            id,
            new_parent_id: None,
            position: None,
        }
    }

    pub fn under(id: BlockId, new_parent_id: BlockId) -> Self {
        Self {
            id,
            new_parent_id: Some(new_parent_id),
            position: None,
        }
    }

    pub fn position(mut self, position: usize) -> Self {
        self.position = Some(position);
        self
    }
}

/// Input for [`BlockStore::delete`](crate::store::BlockStore::delete).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteBlock {
    pub id: BlockId,
    #[serde(default)]
    pub delete_children: bool,
}

impl DeleteBlock {
    pub fn new(id: BlockId) -> Self {
        Self {
            id,
            delete_children: false,
        }
    }

    pub fn cascade(id: BlockId) -> Self {
        Self {
            id,
            delete_children: true,
        }
    }
}

/// Input for [`BlockStore::duplicate`](crate::store::BlockStore::duplicate).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateBlock {
    pub id: BlockId,
    #[serde(default)]
    pub duplicate_children: bool,
}

impl DuplicateBlock {
    pub fn new(id: BlockId) -> Self {
        Self {
            id,
            duplicate_children: false,
        }
    }

    pub fn deep(id: BlockId) -> Self {
        Self {
            id,
            duplicate_children: true,
        }
    }
}

/// Parent match for [`BlockFilter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentFilter {
    /// Root blocks only.
    Root,
    Block(BlockId),
}

/// Filter for [`BlockStore::query`](crate::store::BlockStore::query).
///
/// Set fields are AND-combined; an empty filter matches every block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockFilter {
    pub kinds: Option<Vec<BlockType>>,
    pub parent: Option<ParentFilter>,
}

impl BlockFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn kind(mut self, kind: BlockType) -> Self {
        self.kinds = Some(vec![kind]);
        self
    }

    pub fn kinds(mut self, kinds: impl IntoIterator<Item = BlockType>) -> Self {
        self.kinds = Some(kinds.into_iter().collect());
        self
    }

    pub fn roots(mut self) -> Self {
        self.parent = Some(ParentFilter::Root);
        self
    }

    pub fn parent(mut self, parent_id: BlockId) -> Self {
        self.parent = Some(ParentFilter::Block(parent_id));
        self
    }
}

/// Input for [`BlockStore::search`](crate::store::BlockStore::search).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    pub text: String,
    pub kinds: Option<Vec<BlockType>>,
    /// Defaults to `StoreOptions::default_search_limit`.
    pub limit: Option<usize>,
    pub offset: usize,
}

impl SearchQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn kind(mut self, kind: BlockType) -> Self {
        self.kinds = Some(vec![kind]);
        self
    }

    pub fn kinds(mut self, kinds: impl IntoIterator<Item = BlockType>) -> Self {
        self.kinds = Some(kinds.into_iter().collect());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }
}
