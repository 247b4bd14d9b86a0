use blocktree_core::schema::rules::{codes, integer_in_range, non_empty_string, object};
use blocktree_core::{
    BlockData, BlockError, BlockSchema, BlockStore, BlockType, CreateBlock, FieldError,
    SchemaCategory, SchemaRegistry, SearchQuery, UpdateBlock,
};
use serde_json::{json, Value};
use std::sync::Arc;

fn habit() -> BlockType {
    BlockType::custom("HABIT")
}

fn validate_habit(data: &Value) -> Vec<FieldError> {
    object(data, |fields| {
        let mut errors = Vec::new();
        errors.extend(non_empty_string(fields, "name"));
        errors.extend(integer_in_range(fields, "streak", 0, 10_000));
        errors
    })
}

fn registry_with_habit() -> SchemaRegistry {
    let mut registry = SchemaRegistry::with_builtin_schemas();
    registry.register(
        BlockSchema::new(habit(), "Habit", SchemaCategory::Custom, validate_habit)
            .parents(&[BlockType::Page])
            .default_data(json!({ "name": "New habit", "streak": 0 }))
            .searchable(&["name"]),
    );
    registry
}

#[test]
fn builtin_registry_covers_every_builtin_type() {
    let registry = SchemaRegistry::with_builtin_schemas();
    for kind in BlockType::BUILTIN.iter() {
        let schema = registry.get_schema(kind).unwrap();
        assert_eq!(&schema.kind, kind);
    }
    assert_eq!(registry.len(), BlockType::BUILTIN.len());
    assert_eq!(
        registry.get_schema(&BlockType::KanbanCard).unwrap().category,
        SchemaCategory::Kanban
    );
    assert_eq!(
        registry.searchable_fields(&BlockType::Page),
        &["title".to_string()][..]
    );
    assert!(registry.searchable_fields(&BlockType::Divider).is_empty());
}

#[test]
fn custom_schema_drives_the_store() {
    let mut store = BlockStore::new(Arc::new(registry_with_habit()));
    let page = store
        .create(CreateBlock::new(BlockType::Page).data(json!({ "title": "Routines" })))
        .unwrap();

    let default = store
        .create(CreateBlock::new(habit()).parent(page.id))
        .unwrap();
    match &default.data {
        BlockData::Custom { kind, fields } => {
            assert_eq!(kind, "HABIT");
            assert_eq!(fields["name"], json!("New habit"));
        }
        other => panic!("unexpected payload: {other:?}"),
    }

    let reading = store
        .create(
            CreateBlock::new(habit())
                .parent(page.id)
                .data(json!({ "name": "Read 20 pages", "streak": 4 })),
        )
        .unwrap();
    assert_eq!(store.get_children(page.id, false).len(), 2);

    let hits = store.search(&SearchQuery::new("read").kind(habit()));
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, reading.id);

    let err = store
        .update(UpdateBlock::new(reading.id).data(json!({ "streak": -1 })))
        .unwrap_err();
    match err {
        BlockError::Validation { kind, errors } => {
            assert_eq!(kind, habit());
            assert_eq!(errors[0].field, "streak");
            assert_eq!(errors[0].code, codes::OUT_OF_RANGE);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn custom_parent_restriction_is_enforced() {
    let mut store = BlockStore::new(Arc::new(registry_with_habit()));
    let err = store
        .create(CreateBlock::new(BlockType::Quote).data(json!({ "content": "q" })))
        .and_then(|quote| store.create(CreateBlock::new(habit()).parent(quote.id)))
        .unwrap_err();
    assert!(matches!(err, BlockError::InvalidRelationship { .. }));

    // Roots are always allowed.
    store.create(CreateBlock::new(habit())).unwrap();
}

#[test]
fn registries_are_isolated_per_store() {
    let mut with_habit = BlockStore::new(Arc::new(registry_with_habit()));
    let mut builtin_only = BlockStore::new(Arc::new(SchemaRegistry::with_builtin_schemas()));

    with_habit.create(CreateBlock::new(habit())).unwrap();
    assert_eq!(
        builtin_only.create(CreateBlock::new(habit())).unwrap_err(),
        BlockError::UnknownType(habit())
    );

    let tree = with_habit.export_tree();
    assert_eq!(
        builtin_only.import_tree(tree).unwrap_err(),
        BlockError::UnknownType(habit())
    );
    assert_eq!(builtin_only.count(), 0);
}

#[test]
fn closures_can_act_as_validators() {
    let mut registry = SchemaRegistry::new();
    let kind = BlockType::custom("PING");
    registry.register(BlockSchema::new(
        kind.clone(),
        "Ping",
        SchemaCategory::Custom,
        |data: &Value| match data.get("ok") {
            Some(Value::Bool(true)) => Vec::new(),
            _ => vec![FieldError::new("ok", "ok must be true", codes::INVALID_ENUM)],
        },
    ));

    assert!(registry.validate(&kind, &json!({ "ok": true })).valid);
    let result = registry.validate(&kind, &json!({ "ok": false }));
    assert!(!result.valid);
    assert_eq!(result.errors[0].field, "ok");
}

#[test]
fn custom_schema_named_after_builtin_replaces_it() {
    let mut registry = SchemaRegistry::with_builtin_schemas();
    let permissive = |_: &Value| Vec::<FieldError>::new();
    let replaced = registry.register(BlockSchema::new(
        BlockType::Custom("QUOTE".to_string()),
        "Loose quote",
        SchemaCategory::Custom,
        permissive,
    ));
    assert_eq!(replaced.unwrap().name, "Quote");
    assert_eq!(registry.len(), BlockType::BUILTIN.len());
    assert_eq!(
        registry.get_schema(&BlockType::Quote).unwrap().name,
        "Loose quote"
    );

    let registry = Arc::new(registry);
    let mut store = BlockStore::new(Arc::clone(&registry));

    // The schema accepts anything, but the payload must still fit a quote.
    let err = store
        .create(CreateBlock::new(BlockType::custom("QUOTE")).data(json!({ "x": 1 })))
        .unwrap_err();
    match err {
        BlockError::Validation { errors, .. } => {
            assert_eq!(errors[0].code, codes::INVALID_SHAPE)
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(store.count(), 0);

    let quote = store
        .create(
            CreateBlock::new(BlockType::Custom("QUOTE".to_string()))
                .data(json!({ "content": "Less is more" })),
        )
        .unwrap();
    assert_eq!(quote.kind(), BlockType::Quote);
    assert!(matches!(quote.data, BlockData::Quote(_)));

    let json = store.export_tree().to_json().unwrap();
    let mut restored = BlockStore::new(registry);
    restored
        .import_tree(blocktree_core::BlockTree::from_json(&json).unwrap())
        .unwrap();
    assert_eq!(restored.get(quote.id).unwrap(), quote);
}
