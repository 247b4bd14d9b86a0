//! Block store engine and its supporting types.
//!
//! [`BlockStore`] is the single-writer engine; [`SharedBlockStore`] adds the
//! locking discipline for multi-threaded hosts. [`BlockTree`] is the
//! export/import format and the only persistence seam.

pub mod block_store;
pub mod error;
pub mod requests;
pub mod shared;
pub mod tree;

pub use block_store::{BlockStore, StoreOptions};
pub use error::{BlockError, BlockResult};
pub use requests::{
    BlockFilter, CreateBlock, DeleteBlock, DuplicateBlock, MoveBlock, ParentFilter, SearchQuery,
    UpdateBlock,
};
pub use shared::SharedBlockStore;
pub use tree::{BlockTree, TreeMetadata, FORMAT_VERSION};
