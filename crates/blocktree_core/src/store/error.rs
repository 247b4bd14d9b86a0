//! Engine error taxonomy.

use crate::model::block::{BlockId, BlockType};
use crate::schema::rules::FieldError;
use thiserror::Error;

/// Result type used by block store operations.
pub type BlockResult<T> = Result<T, BlockError>;

/// Errors raised by block store operations.
///
/// Every variant is returned before any mutation is applied.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BlockError {
    /// Referenced block does not exist.
    #[error("block not found: {0}")]
    NotFound(BlockId),
    /// Payload failed its type's validator.
    #[error("invalid {kind} data: {}", summarize(.errors))]
    Validation {
        kind: BlockType,
        errors: Vec<FieldError>,
    },
    /// Parent/child type pairing is not permitted.
    #[error("{child} blocks cannot be placed under {parent} blocks")]
    InvalidRelationship { parent: BlockType, child: BlockType },
    /// Move would make a block its own ancestor.
    #[error("move would create cycle: block {id} under parent {parent_id}")]
    Cycle { id: BlockId, parent_id: BlockId },
    /// Delete without cascade on a block that still has children.
    #[error("block {0} has children; delete them first or cascade")]
    HasChildren(BlockId),
    /// Block type has no registered schema.
    #[error("unknown block type: {0}")]
    UnknownType(BlockType),
    /// Imported tree breaks a structural invariant.
    #[error("invalid tree: {0}")]
    InvalidTree(String),
    /// Imported tree was written by a newer format.
    #[error("tree format version {found} is newer than supported {supported}")]
    UnsupportedFormat { found: u32, supported: u32 },
}

impl BlockError {
    /// Stable machine-readable code for host-side mapping.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::Validation { .. } => "validation",
            Self::InvalidRelationship { .. } => "invalid_relationship",
            Self::Cycle { .. } => "cycle",
            Self::HasChildren(_) => "has_children",
            Self::UnknownType(_) => "unknown_type",
            Self::InvalidTree(_) => "invalid_tree",
            Self::UnsupportedFormat { .. } => "unsupported_format",
        }
    }

    pub(crate) fn validation(kind: BlockType, errors: Vec<FieldError>) -> Self {
        Self::Validation { kind, errors }
    }
}

fn summarize(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|err| format!("{} ({})", err.field, err.code))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::BlockError;
    use crate::model::block::BlockType;
    use crate::schema::rules::{codes, FieldError};

    #[test]
    fn validation_message_lists_fields_without_values() {
        let err = BlockError::validation(
            BlockType::KanbanCard,
            vec![FieldError::new("title", "title must not be empty", codes::EMPTY)],
        );
        assert_eq!(err.to_string(), "invalid KANBAN_CARD data: title (empty)");
        assert_eq!(err.code(), "validation");
    }

    #[test]
    fn relationship_message_names_both_types() {
        let err = BlockError::InvalidRelationship {
            parent: BlockType::Text,
            child: BlockType::KanbanCard,
        };
        assert_eq!(
            err.to_string(),
            "KANBAN_CARD blocks cannot be placed under TEXT blocks"
        );
    }
}
