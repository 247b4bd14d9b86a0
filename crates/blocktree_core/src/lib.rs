//! Typed block tree engine.
//!
//! One forest of schema-validated blocks backs pages, Kanban boards, tables
//! and AI content. The [`SchemaRegistry`] is injected into the
//! [`BlockStore`]; [`BlockTree`] export/import is the only persistence seam.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod schema;
pub mod store;

pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::block::{
    AiProvenance, Block, BlockId, BlockMetadata, BlockPermissions, BlockType, UiState,
};
pub use model::data::BlockData;
pub use repo::tree_repo::{
    SqliteTreeRepository, TreeRepoError, TreeRepoResult, TreeSnapshotRepository,
};
pub use schema::{
    BlockSchema, BlockValidator, FieldError, SchemaCategory, SchemaRegistry, ValidationResult,
};
pub use store::{
    BlockError, BlockFilter, BlockResult, BlockStore, BlockTree, CreateBlock, DeleteBlock,
    DuplicateBlock, MoveBlock, ParentFilter, SearchQuery, SharedBlockStore, StoreOptions,
    TreeMetadata, UpdateBlock, FORMAT_VERSION,
};

/// Minimal health-check API for host integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
