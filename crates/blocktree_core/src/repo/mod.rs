//! Host-side persistence for exported block trees.

pub mod tree_repo;

pub use tree_repo::{SqliteTreeRepository, TreeRepoError, TreeRepoResult, TreeSnapshotRepository};
