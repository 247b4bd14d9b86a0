use blocktree_core::db::{open_db, open_db_in_memory};
use blocktree_core::{
    BlockType, CreateBlock, MoveBlock, SchemaRegistry, SharedBlockStore, SqliteTreeRepository,
    TreeRepoError, TreeSnapshotRepository,
};
use rusqlite::Connection;
use serde_json::json;
use std::sync::Arc;

fn new_store() -> SharedBlockStore {
    SharedBlockStore::new(Arc::new(SchemaRegistry::with_builtin_schemas()))
}

fn seed(store: &SharedBlockStore) {
    let page = store
        .create(CreateBlock::new(BlockType::Page).data(json!({ "title": "Plans" })))
        .unwrap();
    let board = store
        .create(
            CreateBlock::new(BlockType::KanbanBoard)
                .parent(page.id)
                .data(json!({ "name": "Board" })),
        )
        .unwrap();
    for title in ["Todo", "Doing", "Done"] {
        store
            .create(
                CreateBlock::new(BlockType::KanbanColumn)
                    .parent(board.id)
                    .data(json!({ "title": title })),
            )
            .unwrap();
    }
    store
        .create(CreateBlock::new(BlockType::Text).data(json!({ "content": "loose note" })))
        .unwrap();
}

#[test]
fn persist_and_restore_round_trip_in_memory() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteTreeRepository::try_new(&conn).unwrap();
    let source = new_store();
    seed(&source);

    assert_eq!(source.persist(&repo).unwrap(), source.count());

    let target = new_store();
    assert_eq!(target.restore(&repo).unwrap(), Some(source.count()));
    assert_eq!(target.export_tree(), source.export_tree());
    target.verify_integrity().unwrap();
}

#[test]
fn restore_from_empty_database_keeps_store_untouched() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteTreeRepository::try_new(&conn).unwrap();
    let store = new_store();
    seed(&store);
    let before = store.export_tree();

    assert_eq!(store.restore(&repo).unwrap(), None);
    assert_eq!(store.export_tree(), before);
}

#[test]
fn snapshot_survives_reopening_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("blocktree.db");
    let source = new_store();
    seed(&source);

    {
        let conn = open_db(&path).unwrap();
        let repo = SqliteTreeRepository::try_new(&conn).unwrap();
        source.persist(&repo).unwrap();
    }

    let conn = open_db(&path).unwrap();
    let repo = SqliteTreeRepository::try_new(&conn).unwrap();
    let target = new_store();
    target.restore(&repo).unwrap();
    assert_eq!(target.export_tree(), source.export_tree());
}

#[test]
fn saving_again_replaces_the_previous_snapshot() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteTreeRepository::try_new(&conn).unwrap();
    let store = new_store();
    seed(&store);
    store.persist(&repo).unwrap();

    store.clear();
    let only = store
        .create(CreateBlock::new(BlockType::Quote).data(json!({ "content": "fresh start" })))
        .unwrap();
    store.persist(&repo).unwrap();

    let loaded = repo.load_tree().unwrap().unwrap();
    assert_eq!(loaded.roots, vec![only.id]);
    assert_eq!(loaded.len(), 1);
    let rows: i64 = conn
        .query_row("SELECT COUNT(*) FROM blocks;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(rows, 1);
}

#[test]
fn sibling_order_is_preserved_after_moves() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteTreeRepository::try_new(&conn).unwrap();
    let store = new_store();
    seed(&store);

    // Reverse root order and move the last column to the front.
    let roots = store.get_roots();
    store
        .move_block(MoveBlock::to_root(roots[1].id).position(0))
        .unwrap();
    let board = store.get_children(roots[0].id, false).remove(0);
    let last = *board.children.last().unwrap();
    store
        .move_block(MoveBlock::under(last, board.id).position(0))
        .unwrap();
    store.persist(&repo).unwrap();

    let loaded = repo.load_tree().unwrap().unwrap();
    let expected = store.export_tree();
    assert_eq!(loaded.roots, expected.roots);
    assert_eq!(loaded.blocks[&board.id].children, expected.blocks[&board.id].children);
}

#[test]
fn restore_rejects_tampered_rows() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteTreeRepository::try_new(&conn).unwrap();
    let source = new_store();
    seed(&source);
    source.persist(&repo).unwrap();

    // Drop a column row; the board still lists it as a child.
    conn.execute(
        "DELETE FROM blocks WHERE block_uuid = (
            SELECT block_uuid FROM blocks WHERE kind = 'KANBAN_COLUMN' LIMIT 1
        );",
        [],
    )
    .unwrap();

    let target = new_store();
    let err = target.restore(&repo).unwrap_err();
    assert!(matches!(err, TreeRepoError::Block(_)));
    assert_eq!(target.count(), 0);
}

#[test]
fn repository_requires_migrated_connection() {
    let conn = Connection::open_in_memory().unwrap();
    assert!(matches!(
        SqliteTreeRepository::try_new(&conn),
        Err(TreeRepoError::UninitializedConnection { .. })
    ));
}
