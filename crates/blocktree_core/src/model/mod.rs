//! Block domain model.
//!
//! # Responsibility
//! - Define the canonical block record used by every content projection
//!   (pages, Kanban boards, tables, AI blocks).
//! - Tie payload shape to block type statically.
//!
//! # Invariants
//! - Every block is identified by a stable `BlockId`.
//! - A block's type is derived from its payload, never stored twice.

pub mod block;
pub mod data;
