//! Typed block payloads.
//!
//! # Responsibility
//! - Define one payload struct per built-in block type.
//! - Tie payload shape to the block type through [`BlockData`].
//!
//! # Invariants
//! - `BlockData::kind()` is the only source of a block's type.
//! - Conversion through `serde_json::Value` is lossless for every variant, so
//!   validators and merges can work on the JSON form.
//! - Payload structs reject keys they do not declare.

use crate::model::block::{BlockId, BlockType};
use chrono::{DateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TextData {
    pub content: String,
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct HeadingData {
    pub content: String,
    /// 1..=6
    pub level: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TodoData {
    pub content: String,
    #[serde(default)]
    pub checked: bool,
    pub due_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct KanbanBoardData {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct KanbanColumnData {
    pub title: String,
    /// `#rrggbb`
    pub color: Option<String>,
    /// Work-in-progress limit; `None` means unlimited.
    pub wip_limit: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardPriority {
    Low,
    Medium,
    High,
    Urgent,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct KanbanCardData {
    pub title: String,
    pub description: Option<String>,
    pub priority: Option<CardPriority>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub assignees: Vec<String>,
    pub due_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct KanbanSwimlaneData {
    pub title: String,
    #[serde(default)]
    pub collapsed: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableColumnKind {
    #[default]
    Text,
    Number,
    Date,
    Select,
    Checkbox,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TableColumnDef {
    pub id: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: TableColumnKind,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TableData {
    pub title: Option<String>,
    #[serde(default)]
    pub columns: Vec<TableColumnDef>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TableRowData {
    pub height: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TableCellData {
    pub column_id: String,
    #[serde(default)]
    pub value: Value,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AiStatus {
    #[default]
    Idle,
    Running,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AiBlockData {
    pub prompt: String,
    pub model: Option<String>,
    #[serde(default)]
    pub status: AiStatus,
    pub response: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    #[default]
    User,
    Assistant,
    System,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AiChatData {
    pub title: Option<String>,
    pub model: Option<String>,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AiSuggestionData {
    pub content: String,
    pub target_block_id: Option<BlockId>,
    /// 0.0..=1.0
    pub confidence: Option<f64>,
    pub accepted: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PageData {
    pub title: String,
    pub icon: Option<String>,
    pub cover_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RowData {
    pub gap: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ColumnData {
    /// Fraction of the row width, 0.0..=1.0.
    pub width: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ImageData {
    pub url: String,
    pub caption: Option<String>,
    pub alt: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EmbedData {
    pub url: String,
    pub provider: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DividerData {}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct QuoteData {
    pub content: String,
    pub author: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CodeData {
    pub content: String,
    pub language: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListStyle {
    #[default]
    Bulleted,
    Numbered,
    Checklist,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ListData {
    #[serde(default)]
    pub style: ListStyle,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ListItemData {
    pub content: String,
    pub checked: Option<bool>,
}

macro_rules! block_data {
    ($($variant:ident($payload:ty)),+ $(,)?) => {
        /// Payload of a block, one variant per type.
        #[derive(Debug, Clone, PartialEq)]
        pub enum BlockData {
            $($variant($payload),)+
            /// Payload of a host-registered type, validated only by its schema.
            Custom {
                kind: String,
                fields: Map<String, Value>,
            },
        }

        impl BlockData {
            /// Returns the block type this payload belongs to.
            pub fn kind(&self) -> BlockType {
                match self {
                    $(Self::$variant(_) => BlockType::$variant,)+
                    Self::Custom { kind, .. } => BlockType::Custom(kind.clone()),
                }
            }

            /// Decodes a JSON payload into the variant selected by `kind`.
            pub fn from_value(kind: &BlockType, value: Value) -> Result<Self, serde_json::Error> {
                match kind {
                    $(BlockType::$variant => serde_json::from_value(value).map(Self::$variant),)+
                    BlockType::Custom(name) if BlockType::parse(name).is_builtin() => {
                        Self::from_value(&BlockType::parse(name), value)
                    }
                    BlockType::Custom(name) => match value {
                        Value::Object(fields) => Ok(Self::Custom {
                            kind: name.clone(),
                            fields,
                        }),
                        _ => Err(serde_json::Error::custom(format!(
                            "payload of `{name}` must be a JSON object"
                        ))),
                    },
                }
            }

            /// Encodes this payload as a JSON value.
            pub fn to_value(&self) -> Value {
                let encoded = match self {
                    $(Self::$variant(payload) => serde_json::to_value(payload),)+
                    Self::Custom { fields, .. } => Ok(Value::Object(fields.clone())),
                };
                // Payload structs only hold string-keyed maps, so encoding cannot fail.
                encoded.unwrap_or_else(|_| Value::Object(Map::new()))
            }
        }
    };
}

block_data! {
    Text(TextData),
    Heading(HeadingData),
    Todo(TodoData),
    KanbanBoard(KanbanBoardData),
    KanbanColumn(KanbanColumnData),
    KanbanCard(KanbanCardData),
    KanbanSwimlane(KanbanSwimlaneData),
    Table(TableData),
    TableRow(TableRowData),
    TableCell(TableCellData),
    AiBlock(AiBlockData),
    AiChat(AiChatData),
    AiSuggestion(AiSuggestionData),
    Page(PageData),
    Row(RowData),
    Column(ColumnData),
    Image(ImageData),
    Embed(EmbedData),
    Divider(DividerData),
    Quote(QuoteData),
    Code(CodeData),
    List(ListData),
    ListItem(ListItemData),
}

impl BlockData {
    /// Returns the payload as a JSON object map.
    pub fn to_object(&self) -> Map<String, Value> {
        match self.to_value() {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }
}
