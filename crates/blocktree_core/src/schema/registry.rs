//! In-process schema registry.
//!
//! # Responsibility
//! - Hold one [`BlockSchema`] per block type.
//! - Answer "is this payload valid" and "may this type nest under that type".
//!
//! # Invariants
//! - Registering a schema never touches existing blocks.
//! - Default payloads are handed out as fresh copies.
//! - An absent allow-list means "unrestricted".

use crate::model::block::BlockType;
use crate::schema::rules::{codes, FieldError, ValidationResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

/// Payload validator for one block type.
pub trait BlockValidator: Send + Sync {
    /// Returns every problem found in `data`; empty means valid.
    fn validate(&self, data: &Value) -> Vec<FieldError>;
}

impl<F> BlockValidator for F
where
    F: Fn(&Value) -> Vec<FieldError> + Send + Sync,
{
    fn validate(&self, data: &Value) -> Vec<FieldError> {
        self(data)
    }
}

/// Grouping used by pickers and docs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaCategory {
    Basic,
    Layout,
    Kanban,
    Table,
    Ai,
    Media,
    Custom,
}

/// Contract for one block type.
#[derive(Clone)]
pub struct BlockSchema {
    pub kind: BlockType,
    /// Human-readable name.
    pub name: String,
    pub category: SchemaCategory,
    pub can_have_children: bool,
    /// `None` means any parent type is accepted.
    pub allowed_parents: Option<Vec<BlockType>>,
    /// `None` means any child type is accepted.
    pub allowed_children: Option<Vec<BlockType>>,
    /// Template payload for blocks created without data.
    pub default_data: Value,
    /// Top-level payload keys matched by text search.
    pub searchable_fields: Vec<String>,
    validator: Arc<dyn BlockValidator>,
}

impl BlockSchema {
    /// Creates a leaf schema with no relationship restrictions.
    pub fn new(
        kind: BlockType,
        name: impl Into<String>,
        category: SchemaCategory,
        validator: impl BlockValidator + 'static,
    ) -> Self {
        Self {
            kind,
            name: name.into(),
            category,
            can_have_children: false,
            allowed_parents: None,
            allowed_children: None,
            default_data: Value::Object(Map::new()),
            searchable_fields: Vec::new(),
            validator: Arc::new(validator),
        }
    }

    /// Allows children of any type.
    pub fn container(mut self) -> Self {
        self.can_have_children = true;
        self
    }

    /// Allows children of the listed types only.
    pub fn children(mut self, kinds: &[BlockType]) -> Self {
        self.can_have_children = true;
        self.allowed_children = Some(kinds.to_vec());
        self
    }

    /// Restricts placement to parents of the listed types.
    pub fn parents(mut self, kinds: &[BlockType]) -> Self {
        self.allowed_parents = Some(kinds.to_vec());
        self
    }

    pub fn default_data(mut self, data: Value) -> Self {
        self.default_data = data;
        self
    }

    pub fn searchable(mut self, fields: &[&str]) -> Self {
        self.searchable_fields = fields.iter().map(|field| field.to_string()).collect();
        self
    }

    /// Runs this schema's validator.
    pub fn validate(&self, data: &Value) -> ValidationResult {
        ValidationResult::from_errors(self.validator.validate(data))
    }

    fn accepts_child(&self, child: &BlockType) -> bool {
        self.can_have_children
            && self
                .allowed_children
                .as_ref()
                .map_or(true, |allowed| allowed.contains(child))
    }

    fn accepts_parent(&self, parent: &BlockType) -> bool {
        self.allowed_parents
            .as_ref()
            .map_or(true, |allowed| allowed.contains(parent))
    }
}

impl Debug for BlockSchema {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockSchema")
            .field("kind", &self.kind)
            .field("name", &self.name)
            .field("category", &self.category)
            .field("can_have_children", &self.can_have_children)
            .field("allowed_parents", &self.allowed_parents)
            .field("allowed_children", &self.allowed_children)
            .field("searchable_fields", &self.searchable_fields)
            .finish_non_exhaustive()
    }
}

/// Lookup table of block schemas, passed to the store at construction.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: BTreeMap<BlockType, Arc<BlockSchema>>,
}

impl SchemaRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding every built-in schema.
    pub fn with_builtin_schemas() -> Self {
        let mut registry = Self::new();
        for schema in crate::schema::builtin::builtin_schemas() {
            registry.register(schema);
        }
        registry
    }

    /// Adds or replaces the schema for `schema.kind`.
    ///
    /// Type tags are normalized first, so a custom schema named after a
    /// built-in type replaces the built-in schema. Returns the replaced
    /// schema, if any.
    pub fn register(&mut self, mut schema: BlockSchema) -> Option<Arc<BlockSchema>> {
        schema.kind = schema.kind.normalized();
        schema.allowed_parents = normalized_all(schema.allowed_parents.take());
        schema.allowed_children = normalized_all(schema.allowed_children.take());
        self.schemas.insert(schema.kind.clone(), Arc::new(schema))
    }

    pub fn is_registered(&self, kind: &BlockType) -> bool {
        self.get_schema(kind).is_some()
    }

    pub fn get_schema(&self, kind: &BlockType) -> Option<&BlockSchema> {
        let schema = match kind {
            BlockType::Custom(name) => self.schemas.get(&BlockType::parse(name)),
            builtin => self.schemas.get(builtin),
        };
        schema.map(Arc::as_ref)
    }

    /// Returns registered types in a stable order.
    pub fn registered_types(&self) -> Vec<BlockType> {
        self.schemas.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// Validates `data` against the schema of `kind`.
    ///
    /// Unregistered types yield a single `unknown_type` error.
    pub fn validate(&self, kind: &BlockType, data: &Value) -> ValidationResult {
        match self.get_schema(kind) {
            Some(schema) => schema.validate(data),
            None => ValidationResult::from_errors(vec![FieldError::new(
                "type",
                format!("unknown block type: {kind}"),
                codes::UNKNOWN_TYPE,
            )]),
        }
    }

    /// Returns whether a `child` block may be placed under a `parent` block.
    ///
    /// Both types must be registered and both sides' allow-lists must agree.
    pub fn can_have_child(&self, parent: &BlockType, child: &BlockType) -> bool {
        let (Some(parent_schema), Some(child_schema)) =
            (self.get_schema(parent), self.get_schema(child))
        else {
            return false;
        };
        parent_schema.accepts_child(child) && child_schema.accepts_parent(parent)
    }

    /// Returns a fresh copy of the default payload for `kind`.
    pub fn create_default_data(&self, kind: &BlockType) -> Option<Value> {
        self.get_schema(kind)
            .map(|schema| schema.default_data.clone())
    }

    /// Returns the searchable payload keys for `kind`.
    pub fn searchable_fields(&self, kind: &BlockType) -> &[String] {
        self.get_schema(kind)
            .map(|schema| schema.searchable_fields.as_slice())
            .unwrap_or(&[])
    }
}

fn normalized_all(kinds: Option<Vec<BlockType>>) -> Option<Vec<BlockType>> {
    kinds.map(|kinds| kinds.into_iter().map(BlockType::normalized).collect())
}
