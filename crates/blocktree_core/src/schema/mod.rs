//! Block schemas: validation rules and permitted tree shapes.
//!
//! The registry is an explicit value handed to the store at construction;
//! there is no process-wide schema table.

pub mod builtin;
pub mod registry;
pub mod rules;

pub use registry::{BlockSchema, BlockValidator, SchemaCategory, SchemaRegistry};
pub use rules::{FieldError, ValidationResult};
