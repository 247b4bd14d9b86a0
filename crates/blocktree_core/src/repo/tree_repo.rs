//! Block tree snapshot repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist whole [`BlockTree`] snapshots produced by the store's export.
//! - Keep SQL details and row ordering inside the repository boundary.
//!
//! # Invariants
//! - A save replaces the previous snapshot atomically.
//! - Rows are written in export order; loads read them back by `rowid`.
//! - Root order is rebuilt from `sort_order` of parentless rows.
//! - Loaded trees are not trusted: the store verifies them on import.

use crate::db::migrations::{latest_version, schema_version};
use crate::db::DbError;
use crate::model::block::{Block, BlockId};
use crate::store::error::BlockError;
use crate::store::tree::{BlockTree, TreeMetadata};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use log::info;
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};
use std::collections::HashMap;
use thiserror::Error;
use uuid::Uuid;

/// Result type used by snapshot repository operations.
pub type TreeRepoResult<T> = Result<T, TreeRepoError>;

/// Errors from snapshot repository operations.
#[derive(Debug, Error)]
pub enum TreeRepoError {
    /// Underlying SQLite/bootstrap error.
    #[error(transparent)]
    Db(#[from] DbError),
    /// Block payload could not be encoded or decoded.
    #[error("invalid block payload json: {0}")]
    Json(#[from] serde_json::Error),
    /// Restored snapshot was rejected by the engine.
    #[error(transparent)]
    Block(#[from] BlockError),
    /// Connection schema is not at the expected migrated version.
    #[error("tree repository requires schema version {expected_version}, got {actual_version}")]
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    #[error("tree repository requires table `{0}`")]
    MissingRequiredTable(&'static str),
    #[error("tree repository requires column `{column}` in table `{table}`")]
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    /// Persisted rows cannot be converted into a snapshot.
    #[error("invalid snapshot data: {0}")]
    InvalidData(String),
}

impl From<rusqlite::Error> for TreeRepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Storage for whole-tree snapshots.
pub trait TreeSnapshotRepository {
    /// Replaces the stored snapshot with `tree`.
    fn save_tree(&self, tree: &BlockTree) -> TreeRepoResult<()>;
    /// Loads the stored snapshot, or `None` when nothing was saved yet.
    fn load_tree(&self) -> TreeRepoResult<Option<BlockTree>>;
}

/// SQLite-backed snapshot repository.
pub struct SqliteTreeRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTreeRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> TreeRepoResult<Self> {
        ensure_tree_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl TreeSnapshotRepository for SqliteTreeRepository<'_> {
    fn save_tree(&self, tree: &BlockTree) -> TreeRepoResult<()> {
        let sort_orders = sibling_positions(tree);
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        tx.execute("DELETE FROM blocks;", [])?;
        {
            let mut insert = tx.prepare(
                "INSERT INTO blocks (
                    block_uuid,
                    kind,
                    parent_uuid,
                    sort_order,
                    payload,
                    created_at,
                    updated_at
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            )?;
            for block in tree.blocks.values() {
                let payload = serde_json::to_string(block)?;
                insert.execute(params![
                    block.id.to_string(),
                    block.kind().as_str(),
                    block.parent_id.map(|id| id.to_string()),
                    sort_orders.get(&block.id).copied().unwrap_or_default(),
                    payload,
                    block.created_at.to_rfc3339(),
                    block.updated_at.to_rfc3339(),
                ])?;
            }
        }
        tx.execute(
            "INSERT INTO tree_meta (id, format_version, created_at, updated_at, saved_at)
             VALUES (1, ?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET
                format_version = excluded.format_version,
                created_at = excluded.created_at,
                updated_at = excluded.updated_at,
                saved_at = excluded.saved_at;",
            params![
                tree.metadata.version,
                tree.metadata.created_at.to_rfc3339(),
                tree.metadata.updated_at.to_rfc3339(),
                Utc::now().timestamp_millis(),
            ],
        )?;
        tx.commit()?;

        info!(
            "event=snapshot_save module=repo status=ok blocks={} roots={}",
            tree.blocks.len(),
            tree.roots.len()
        );
        Ok(())
    }

    fn load_tree(&self) -> TreeRepoResult<Option<BlockTree>> {
        let meta = self
            .conn
            .query_row(
                "SELECT format_version, created_at, updated_at FROM tree_meta WHERE id = 1;",
                [],
                |row| {
                    Ok((
                        row.get::<_, u32>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()?;
        let Some((version, created_at, updated_at)) = meta else {
            return Ok(None);
        };
        let metadata = TreeMetadata {
            version,
            created_at: parse_timestamp(&created_at, "tree_meta.created_at")?,
            updated_at: parse_timestamp(&updated_at, "tree_meta.updated_at")?,
        };

        let mut blocks = IndexMap::new();
        let mut stmt = self
            .conn
            .prepare("SELECT block_uuid, payload FROM blocks ORDER BY rowid ASC;")?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let block_uuid = parse_uuid(&row.get::<_, String>(0)?, "blocks.block_uuid")?;
            let block: Block = serde_json::from_str(&row.get::<_, String>(1)?)?;
            if block.id != block_uuid {
                return Err(TreeRepoError::InvalidData(format!(
                    "row {block_uuid} holds payload of block {}",
                    block.id
                )));
            }
            blocks.insert(block_uuid, block);
        }

        let mut roots = Vec::new();
        let mut stmt = self.conn.prepare(
            "SELECT block_uuid
             FROM blocks
             WHERE parent_uuid IS NULL
             ORDER BY sort_order ASC, rowid ASC;",
        )?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            roots.push(parse_uuid(&row.get::<_, String>(0)?, "blocks.block_uuid")?);
        }

        info!(
            "event=snapshot_load module=repo status=ok blocks={} roots={}",
            blocks.len(),
            roots.len()
        );
        Ok(Some(BlockTree {
            roots,
            blocks,
            metadata,
        }))
    }
}

/// Index of every block among its siblings (or among roots).
fn sibling_positions(tree: &BlockTree) -> HashMap<BlockId, i64> {
    let mut positions = HashMap::with_capacity(tree.blocks.len());
    for (index, root) in tree.roots.iter().enumerate() {
        positions.insert(*root, index as i64);
    }
    for block in tree.blocks.values() {
        for (index, child) in block.children.iter().enumerate() {
            positions.insert(*child, index as i64);
        }
    }
    positions
}

fn parse_uuid(value: &str, column: &'static str) -> TreeRepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| TreeRepoError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}

fn parse_timestamp(value: &str, column: &'static str) -> TreeRepoResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|_| TreeRepoError::InvalidData(format!("invalid timestamp `{value}` in {column}")))
}

fn ensure_tree_connection_ready(conn: &Connection) -> TreeRepoResult<()> {
    let expected_version = latest_version();
    let actual_version = schema_version(conn)?;
    if actual_version != expected_version {
        return Err(TreeRepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for (table, columns) in [
        (
            "blocks",
            &[
                "block_uuid",
                "kind",
                "parent_uuid",
                "sort_order",
                "payload",
                "created_at",
                "updated_at",
            ][..],
        ),
        (
            "tree_meta",
            &["id", "format_version", "created_at", "updated_at", "saved_at"][..],
        ),
    ] {
        if !table_exists(conn, table)? {
            return Err(TreeRepoError::MissingRequiredTable(table));
        }
        for &column in columns {
            if !table_has_column(conn, table, column)? {
                return Err(TreeRepoError::MissingRequiredColumn { table, column });
            }
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> TreeRepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> TreeRepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
