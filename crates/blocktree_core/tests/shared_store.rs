use blocktree_core::{
    BlockType, CreateBlock, DeleteBlock, MoveBlock, SchemaRegistry, SharedBlockStore,
};
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

fn setup() -> SharedBlockStore {
    SharedBlockStore::new(Arc::new(SchemaRegistry::with_builtin_schemas()))
}

#[test]
fn clones_share_one_store() {
    let store = setup();
    let other = store.clone();

    let page = other
        .create(CreateBlock::new(BlockType::Page).data(json!({ "title": "Shared" })))
        .unwrap();
    assert_eq!(store.get(page.id).unwrap(), page);
    assert_eq!(store.count(), 1);

    store.clear();
    assert_eq!(other.count(), 0);
}

#[test]
fn concurrent_creates_under_one_parent_keep_the_tree_consistent() {
    let store = setup();
    let page = store
        .create(CreateBlock::new(BlockType::Page).data(json!({ "title": "Inbox" })))
        .unwrap();

    let handles: Vec<_> = (0..8)
        .map(|worker| {
            let store = store.clone();
            thread::spawn(move || {
                (0..25)
                    .map(|index| {
                        store
                            .create(
                                CreateBlock::new(BlockType::Text)
                                    .parent(page.id)
                                    .position(0)
                                    .data(json!({ "content": format!("w{worker}-{index}") })),
                            )
                            .unwrap()
                            .id
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut created = HashSet::new();
    for handle in handles {
        created.extend(handle.join().unwrap());
    }

    assert_eq!(created.len(), 200);
    assert_eq!(store.count(), 201);
    let children: HashSet<_> = store.get(page.id).unwrap().children.into_iter().collect();
    assert_eq!(children, created);
    store.verify_integrity().unwrap();
}

#[test]
fn concurrent_moves_and_deletes_never_break_integrity() {
    let store = setup();
    let left = store
        .create(CreateBlock::new(BlockType::Page).data(json!({ "title": "Left" })))
        .unwrap();
    let right = store
        .create(CreateBlock::new(BlockType::Page).data(json!({ "title": "Right" })))
        .unwrap();
    let items: Vec<_> = (0..40)
        .map(|index| {
            store
                .create(
                    CreateBlock::new(BlockType::Todo)
                        .parent(left.id)
                        .data(json!({ "content": format!("item {index}") })),
                )
                .unwrap()
                .id
        })
        .collect();

    let movers: Vec<_> = items
        .chunks(10)
        .enumerate()
        .map(|(chunk_index, chunk)| {
            let store = store.clone();
            let chunk = chunk.to_vec();
            let target = if chunk_index % 2 == 0 { right.id } else { left.id };
            thread::spawn(move || {
                for id in chunk {
                    // Deleting threads may win; a missing block is acceptable here.
                    let _ = store.move_block(MoveBlock::under(id, target));
                }
            })
        })
        .collect();
    let deleter = {
        let store = store.clone();
        let doomed: Vec<_> = items.iter().step_by(3).copied().collect();
        thread::spawn(move || {
            for id in doomed {
                let _ = store.delete(DeleteBlock::new(id));
            }
        })
    };

    for handle in movers {
        handle.join().unwrap();
    }
    deleter.join().unwrap();

    let deleted = items.iter().step_by(3).count();
    assert_eq!(store.count(), 2 + items.len() - deleted);
    store.verify_integrity().unwrap();
}

#[test]
fn write_closure_applies_several_mutations_atomically() {
    let store = setup();
    let observer = store.clone();

    let (page, count_inside) = store.write(|inner| {
        let page = inner
            .create(CreateBlock::new(BlockType::Page).data(json!({ "title": "Batch" })))
            .unwrap();
        for index in 0..3 {
            inner
                .create(
                    CreateBlock::new(BlockType::Text)
                        .parent(page.id)
                        .data(json!({ "content": format!("line {index}") })),
                )
                .unwrap();
        }
        (page, inner.count())
    });

    assert_eq!(count_inside, 4);
    assert_eq!(observer.read(|inner| inner.get_children(page.id, false).len()), 3);
}
