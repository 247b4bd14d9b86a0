//! Block record, type tags and metadata.
//!
//! # Responsibility
//! - Define the canonical node shape shared by pages, boards, tables and AI
//!   content.
//! - Keep the wire form (`{id, type, data, ...}`) stable for export/import.
//!
//! # Invariants
//! - `id` is stable and never reused for another block.
//! - `type` on the wire always equals `data.kind()`; the record cannot carry a
//!   payload of a different type.
//! - `children` order is display order.

use crate::model::data::BlockData;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier for every block.
pub type BlockId = Uuid;

/// Type tag selecting the payload shape of a block.
///
/// Built-in tags serialize as SCREAMING_SNAKE strings. Any other string is a
/// host-registered [`BlockType::Custom`] type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BlockType {
    Text,
    Heading,
    Todo,
    KanbanBoard,
    KanbanColumn,
    KanbanCard,
    KanbanSwimlane,
    Table,
    TableRow,
    TableCell,
    AiBlock,
    AiChat,
    AiSuggestion,
    Page,
    Row,
    Column,
    Image,
    Embed,
    Divider,
    Quote,
    Code,
    List,
    ListItem,
    /// Host-defined type; only usable once a schema is registered for it.
    Custom(String),
}

impl BlockType {
    /// Every built-in type, in declaration order.
    pub const BUILTIN: [BlockType; 23] = [
        BlockType::Text,
        BlockType::Heading,
        BlockType::Todo,
        BlockType::KanbanBoard,
        BlockType::KanbanColumn,
        BlockType::KanbanCard,
        BlockType::KanbanSwimlane,
        BlockType::Table,
        BlockType::TableRow,
        BlockType::TableCell,
        BlockType::AiBlock,
        BlockType::AiChat,
        BlockType::AiSuggestion,
        BlockType::Page,
        BlockType::Row,
        BlockType::Column,
        BlockType::Image,
        BlockType::Embed,
        BlockType::Divider,
        BlockType::Quote,
        BlockType::Code,
        BlockType::List,
        BlockType::ListItem,
    ];

    /// Creates a host-defined type tag.
    ///
    /// A built-in wire name yields the built-in variant.
    pub fn custom(name: impl Into<String>) -> Self {
        Self::parse(&name.into())
    }

    /// Maps a `Custom` tag carrying a built-in wire name onto that variant.
    pub fn normalized(self) -> Self {
        match self {
            Self::Custom(name) => Self::parse(&name),
            builtin => builtin,
        }
    }

    /// Wire name of this type.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Text => "TEXT",
            Self::Heading => "HEADING",
            Self::Todo => "TODO",
            Self::KanbanBoard => "KANBAN_BOARD",
            Self::KanbanColumn => "KANBAN_COLUMN",
            Self::KanbanCard => "KANBAN_CARD",
            Self::KanbanSwimlane => "KANBAN_SWIMLANE",
            Self::Table => "TABLE",
            Self::TableRow => "TABLE_ROW",
            Self::TableCell => "TABLE_CELL",
            Self::AiBlock => "AI_BLOCK",
            Self::AiChat => "AI_CHAT",
            Self::AiSuggestion => "AI_SUGGESTION",
            Self::Page => "PAGE",
            Self::Row => "ROW",
            Self::Column => "COLUMN",
            Self::Image => "IMAGE",
            Self::Embed => "EMBED",
            Self::Divider => "DIVIDER",
            Self::Quote => "QUOTE",
            Self::Code => "CODE",
            Self::List => "LIST",
            Self::ListItem => "LIST_ITEM",
            Self::Custom(name) => name.as_str(),
        }
    }

    /// Parses a wire name. Unknown names become [`BlockType::Custom`].
    pub fn parse(value: &str) -> Self {
        Self::BUILTIN
            .iter()
            .find(|kind| kind.as_str() == value)
            .cloned()
            .unwrap_or_else(|| Self::Custom(value.to_string()))
    }

    /// Returns whether this is one of the built-in types.
    pub fn is_builtin(&self) -> bool {
        !matches!(self, Self::Custom(_))
    }
}

impl Display for BlockType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

impl From<String> for BlockType {
    fn from(value: String) -> Self {
        Self::parse(value.as_str())
    }
}

impl From<&str> for BlockType {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

impl From<BlockType> for String {
    fn from(value: BlockType) -> Self {
        match value {
            BlockType::Custom(name) => name,
            other => other.as_str().to_string(),
        }
    }
}

/// Permission flags carried for the host; the engine does not enforce them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BlockPermissions {
    pub can_edit: bool,
    pub can_delete: bool,
    pub can_move: bool,
    pub locked: bool,
}

impl Default for BlockPermissions {
    fn default() -> Self {
        Self {
            can_edit: true,
            can_delete: true,
            can_move: true,
            locked: false,
        }
    }
}

/// Provenance hints for AI-generated content.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AiProvenance {
    pub generated: bool,
    pub model: Option<String>,
    pub prompt: Option<String>,
    pub confidence: Option<f64>,
}

/// Client-side presentation state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UiState {
    pub collapsed: bool,
    pub color: Option<String>,
    pub icon: Option<String>,
}

/// Open-ended block metadata.
///
/// Opaque to the engine apart from top-level merge on update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<BlockPermissions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai: Option<AiProvenance>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ui: Option<UiState>,
    /// Free-form bag for host extensions.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub custom: Map<String, Value>,
}

/// Atomic typed node of the content forest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "WireBlock", into = "WireBlock")]
pub struct Block {
    /// Stable id, immutable after creation.
    pub id: BlockId,
    /// Type-specific payload. The block type is derived from it.
    pub data: BlockData,
    /// Ordered child ids.
    pub children: Vec<BlockId>,
    /// `None` for root blocks.
    pub parent_id: Option<BlockId>,
    pub created_at: DateTime<Utc>,
    /// Refreshed on every direct or indirect mutation.
    pub updated_at: DateTime<Utc>,
    /// Payload shape version for future migrations.
    pub version: u32,
    pub metadata: BlockMetadata,
}

impl Block {
    /// Returns this block's type tag.
    pub fn kind(&self) -> BlockType {
        self.data.kind()
    }

    /// Returns whether this block has no parent.
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }
}

/// Serialized form of [`Block`] with an explicit `type` tag and untyped data.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireBlock {
    id: BlockId,
    #[serde(rename = "type")]
    kind: BlockType,
    data: Value,
    #[serde(default)]
    children: Vec<BlockId>,
    #[serde(default)]
    parent_id: Option<BlockId>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(default = "initial_version")]
    version: u32,
    #[serde(default)]
    metadata: BlockMetadata,
}

fn initial_version() -> u32 {
    1
}

impl TryFrom<WireBlock> for Block {
    type Error = serde_json::Error;

    fn try_from(value: WireBlock) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.id,
            data: BlockData::from_value(&value.kind, value.data)?,
            children: value.children,
            parent_id: value.parent_id,
            created_at: value.created_at,
            updated_at: value.updated_at,
            version: value.version,
            metadata: value.metadata,
        })
    }
}

impl From<Block> for WireBlock {
    fn from(value: Block) -> Self {
        Self {
            id: value.id,
            kind: value.data.kind(),
            data: value.data.to_value(),
            children: value.children,
            parent_id: value.parent_id,
            created_at: value.created_at,
            updated_at: value.updated_at,
            version: value.version,
            metadata: value.metadata,
        }
    }
}
