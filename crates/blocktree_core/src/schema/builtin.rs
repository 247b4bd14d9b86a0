//! Built-in block schemas.
//!
//! One schema per [`BlockType`] variant except `Custom`. Relationship rules:
//!
//! - Kanban: board > (swimlane >) column > card > rich content.
//! - Tables: table > row > cell.
//! - AI: suggestions live under AI blocks or chats.
//! - Layout: row > column; pages and columns accept anything.
//! - Lists: list > list item > nested list.

use crate::model::block::BlockType;
use crate::schema::registry::{BlockSchema, SchemaCategory};
use crate::schema::rules::{
    boolean, codes, hex_color, http_url, integer_in_range, non_empty_string, number_in_range,
    object, one_of, optional_string, required, string, string_array, timestamp, uuid, FieldError,
};
use serde_json::{json, Map, Value};
use std::collections::HashSet;

const CARD_PRIORITIES: &[&str] = &["low", "medium", "high", "urgent"];
const AI_STATUSES: &[&str] = &["idle", "running", "completed", "failed"];
const CHAT_ROLES: &[&str] = &["user", "assistant", "system"];
const TABLE_COLUMN_KINDS: &[&str] = &["text", "number", "date", "select", "checkbox"];
const LIST_STYLES: &[&str] = &["bulleted", "numbered", "checklist"];

/// Rich content accepted inside Kanban cards and AI blocks.
const CARD_CONTENT: &[BlockType] = &[
    BlockType::Text,
    BlockType::Heading,
    BlockType::Todo,
    BlockType::List,
    BlockType::Quote,
    BlockType::Code,
    BlockType::Image,
    BlockType::Embed,
    BlockType::Divider,
];

/// Returns a schema for every built-in block type.
pub fn builtin_schemas() -> Vec<BlockSchema> {
    vec![
        // Basic content.
        BlockSchema::new(
            BlockType::Text,
            "Text",
            SchemaCategory::Basic,
            validate_text,
        )
        .default_data(json!({ "content": "" }))
        .searchable(&["content"]),
        BlockSchema::new(
            BlockType::Heading,
            "Heading",
            SchemaCategory::Basic,
            validate_heading,
        )
        .default_data(json!({ "content": "", "level": 1 }))
        .searchable(&["content"]),
        BlockSchema::new(
            BlockType::Todo,
            "To-do",
            SchemaCategory::Basic,
            validate_todo,
        )
        .children(&[BlockType::Todo])
        .default_data(json!({ "content": "", "checked": false }))
        .searchable(&["content"]),
        BlockSchema::new(
            BlockType::Quote,
            "Quote",
            SchemaCategory::Basic,
            validate_quote,
        )
        .default_data(json!({ "content": "" }))
        .searchable(&["content", "author"]),
        BlockSchema::new(
            BlockType::Code,
            "Code",
            SchemaCategory::Basic,
            validate_code,
        )
        .default_data(json!({ "content": "", "language": "plaintext" }))
        .searchable(&["content"]),
        BlockSchema::new(
            BlockType::Divider,
            "Divider",
            SchemaCategory::Basic,
            validate_divider,
        ),
        BlockSchema::new(
            BlockType::List,
            "List",
            SchemaCategory::Basic,
            validate_list,
        )
        .children(&[BlockType::ListItem])
        .default_data(json!({ "style": "bulleted" })),
        BlockSchema::new(
            BlockType::ListItem,
            "List item",
            SchemaCategory::Basic,
            validate_list_item,
        )
        .children(&[BlockType::List])
        .parents(&[BlockType::List])
        .default_data(json!({ "content": "" }))
        .searchable(&["content"]),
        // Kanban.
        BlockSchema::new(
            BlockType::KanbanBoard,
            "Kanban board",
            SchemaCategory::Kanban,
            validate_board,
        )
        .children(&[BlockType::KanbanColumn, BlockType::KanbanSwimlane])
        .parents(&[BlockType::Page, BlockType::Column])
        .default_data(json!({ "name": "Untitled board" }))
        .searchable(&["name", "description"]),
        BlockSchema::new(
            BlockType::KanbanSwimlane,
            "Swimlane",
            SchemaCategory::Kanban,
            validate_swimlane,
        )
        .children(&[BlockType::KanbanColumn])
        .parents(&[BlockType::KanbanBoard])
        .default_data(json!({ "title": "New swimlane", "collapsed": false }))
        .searchable(&["title"]),
        BlockSchema::new(
            BlockType::KanbanColumn,
            "Kanban column",
            SchemaCategory::Kanban,
            validate_column,
        )
        .children(&[BlockType::KanbanCard])
        .parents(&[BlockType::KanbanBoard, BlockType::KanbanSwimlane])
        .default_data(json!({ "title": "New column" }))
        .searchable(&["title"]),
        BlockSchema::new(
            BlockType::KanbanCard,
            "Kanban card",
            SchemaCategory::Kanban,
            validate_card,
        )
        .children(CARD_CONTENT)
        .parents(&[BlockType::KanbanColumn])
        .default_data(json!({ "title": "Untitled card", "labels": [], "assignees": [] }))
        .searchable(&["title", "description", "labels"]),
        // Tables.
        BlockSchema::new(
            BlockType::Table,
            "Table",
            SchemaCategory::Table,
            validate_table,
        )
        .children(&[BlockType::TableRow])
        .default_data(json!({ "columns": [] }))
        .searchable(&["title"]),
        BlockSchema::new(
            BlockType::TableRow,
            "Table row",
            SchemaCategory::Table,
            validate_table_row,
        )
        .children(&[BlockType::TableCell])
        .parents(&[BlockType::Table]),
        BlockSchema::new(
            BlockType::TableCell,
            "Table cell",
            SchemaCategory::Table,
            validate_table_cell,
        )
        .parents(&[BlockType::TableRow])
        .default_data(json!({ "columnId": "", "value": null }))
        .searchable(&["value"]),
        // AI.
        BlockSchema::new(
            BlockType::AiBlock,
            "AI block",
            SchemaCategory::Ai,
            validate_ai_block,
        )
        .children(&with_suggestions(CARD_CONTENT))
        .default_data(json!({ "prompt": "", "status": "idle" }))
        .searchable(&["prompt", "response"]),
        BlockSchema::new(
            BlockType::AiChat,
            "AI chat",
            SchemaCategory::Ai,
            validate_ai_chat,
        )
        .children(&[BlockType::AiSuggestion])
        .default_data(json!({ "messages": [] }))
        .searchable(&["title"]),
        BlockSchema::new(
            BlockType::AiSuggestion,
            "AI suggestion",
            SchemaCategory::Ai,
            validate_ai_suggestion,
        )
        .parents(&[BlockType::AiBlock, BlockType::AiChat])
        .default_data(json!({ "content": "" }))
        .searchable(&["content"]),
        // Layout.
        BlockSchema::new(
            BlockType::Page,
            "Page",
            SchemaCategory::Layout,
            validate_page,
        )
        .container()
        .default_data(json!({ "title": "Untitled" }))
        .searchable(&["title"]),
        BlockSchema::new(BlockType::Row, "Row", SchemaCategory::Layout, validate_row)
            .children(&[BlockType::Column]),
        BlockSchema::new(
            BlockType::Column,
            "Column",
            SchemaCategory::Layout,
            validate_layout_column,
        )
        .container()
        .parents(&[BlockType::Row]),
        // Media.
        BlockSchema::new(
            BlockType::Image,
            "Image",
            SchemaCategory::Media,
            validate_image,
        )
        .default_data(json!({ "url": "" }))
        .searchable(&["caption", "alt"]),
        BlockSchema::new(
            BlockType::Embed,
            "Embed",
            SchemaCategory::Media,
            validate_embed,
        )
        .default_data(json!({ "url": "" }))
        .searchable(&["provider"]),
    ]
}

fn with_suggestions(base: &[BlockType]) -> Vec<BlockType> {
    let mut kinds = base.to_vec();
    kinds.push(BlockType::AiSuggestion);
    kinds
}

fn validate_text(data: &Value) -> Vec<FieldError> {
    object(data, |fields| {
        let mut errors = Vec::new();
        errors.extend(string(fields, "content"));
        errors.extend(optional_string(fields, "color"));
        errors.extend(hex_color(fields, "color"));
        errors
    })
}

fn validate_heading(data: &Value) -> Vec<FieldError> {
    object(data, |fields| {
        let mut errors = Vec::new();
        errors.extend(string(fields, "content"));
        errors.extend(required(fields, "level"));
        errors.extend(integer_in_range(fields, "level", 1, 6));
        errors
    })
}

fn validate_todo(data: &Value) -> Vec<FieldError> {
    object(data, |fields| {
        let mut errors = Vec::new();
        errors.extend(string(fields, "content"));
        errors.extend(boolean(fields, "checked"));
        errors.extend(optional_string(fields, "dueAt"));
        errors.extend(timestamp(fields, "dueAt"));
        errors
    })
}

fn validate_quote(data: &Value) -> Vec<FieldError> {
    object(data, |fields| {
        let mut errors = Vec::new();
        errors.extend(string(fields, "content"));
        errors.extend(optional_string(fields, "author"));
        errors
    })
}

fn validate_code(data: &Value) -> Vec<FieldError> {
    object(data, |fields| {
        let mut errors = Vec::new();
        errors.extend(string(fields, "content"));
        errors.extend(non_empty_string(fields, "language"));
        errors
    })
}

fn validate_divider(data: &Value) -> Vec<FieldError> {
    object(data, |_| Vec::new())
}

fn validate_list(data: &Value) -> Vec<FieldError> {
    object(data, |fields| {
        one_of(fields, "style", LIST_STYLES).into_iter().collect()
    })
}

fn validate_list_item(data: &Value) -> Vec<FieldError> {
    object(data, |fields| {
        let mut errors = Vec::new();
        errors.extend(string(fields, "content"));
        errors.extend(boolean(fields, "checked"));
        errors
    })
}

fn validate_board(data: &Value) -> Vec<FieldError> {
    object(data, |fields| {
        let mut errors = Vec::new();
        errors.extend(non_empty_string(fields, "name"));
        errors.extend(optional_string(fields, "description"));
        errors
    })
}

fn validate_swimlane(data: &Value) -> Vec<FieldError> {
    object(data, |fields| {
        let mut errors = Vec::new();
        errors.extend(non_empty_string(fields, "title"));
        errors.extend(boolean(fields, "collapsed"));
        errors
    })
}

fn validate_column(data: &Value) -> Vec<FieldError> {
    object(data, |fields| {
        let mut errors = Vec::new();
        errors.extend(non_empty_string(fields, "title"));
        errors.extend(optional_string(fields, "color"));
        errors.extend(hex_color(fields, "color"));
        errors.extend(integer_in_range(fields, "wipLimit", 0, 999));
        errors
    })
}

fn validate_card(data: &Value) -> Vec<FieldError> {
    object(data, |fields| {
        let mut errors = Vec::new();
        errors.extend(non_empty_string(fields, "title"));
        errors.extend(optional_string(fields, "description"));
        errors.extend(one_of(fields, "priority", CARD_PRIORITIES));
        errors.extend(string_array(fields, "labels"));
        errors.extend(string_array(fields, "assignees"));
        errors.extend(optional_string(fields, "dueAt"));
        errors.extend(timestamp(fields, "dueAt"));
        errors
    })
}

fn validate_table(data: &Value) -> Vec<FieldError> {
    object(data, |fields| {
        let mut errors = Vec::new();
        errors.extend(optional_string(fields, "title"));
        match fields.get("columns") {
            None | Some(Value::Null) => {}
            Some(Value::Array(columns)) => errors.extend(validate_table_columns(columns)),
            Some(_) => errors.push(FieldError::new(
                "columns",
                "columns must be an array",
                codes::INVALID_TYPE,
            )),
        }
        errors
    })
}

fn validate_table_columns(columns: &[Value]) -> Vec<FieldError> {
    let mut errors = Vec::new();
    let mut seen_ids = HashSet::new();
    for (index, column) in columns.iter().enumerate() {
        let Value::Object(column) = column else {
            errors.push(FieldError::new(
                format!("columns[{index}]"),
                "column definition must be an object",
                codes::INVALID_TYPE,
            ));
            continue;
        };
        let nested = [
            non_empty_string(column, "id"),
            non_empty_string(column, "name"),
            one_of(column, "type", TABLE_COLUMN_KINDS),
        ];
        errors.extend(nested.into_iter().flatten().map(|err| FieldError {
            field: format!("columns[{index}].{}", err.field),
            ..err
        }));
        if let Some(Value::String(id)) = column.get("id") {
            if !seen_ids.insert(id.as_str()) {
                errors.push(FieldError::new(
                    format!("columns[{index}].id"),
                    format!("column id `{id}` is used more than once"),
                    codes::DUPLICATE,
                ));
            }
        }
    }
    errors
}

fn validate_table_row(data: &Value) -> Vec<FieldError> {
    object(data, |fields| {
        integer_in_range(fields, "height", 1, 2000)
            .into_iter()
            .collect()
    })
}

fn validate_table_cell(data: &Value) -> Vec<FieldError> {
    object(data, |fields| {
        non_empty_string(fields, "columnId").into_iter().collect()
    })
}

fn validate_ai_block(data: &Value) -> Vec<FieldError> {
    object(data, |fields| {
        let mut errors = Vec::new();
        errors.extend(string(fields, "prompt"));
        errors.extend(optional_string(fields, "model"));
        errors.extend(one_of(fields, "status", AI_STATUSES));
        errors.extend(optional_string(fields, "response"));
        errors
    })
}

fn validate_ai_chat(data: &Value) -> Vec<FieldError> {
    object(data, |fields| {
        let mut errors = Vec::new();
        errors.extend(optional_string(fields, "title"));
        errors.extend(optional_string(fields, "model"));
        match fields.get("messages") {
            None | Some(Value::Null) => {}
            Some(Value::Array(messages)) => {
                for (index, message) in messages.iter().enumerate() {
                    errors.extend(validate_chat_message(index, message));
                }
            }
            Some(_) => errors.push(FieldError::new(
                "messages",
                "messages must be an array",
                codes::INVALID_TYPE,
            )),
        }
        errors
    })
}

fn validate_chat_message(index: usize, message: &Value) -> Vec<FieldError> {
    let empty = Map::new();
    let fields = match message {
        Value::Object(fields) => fields,
        _ => &empty,
    };
    let mut errors: Vec<FieldError> = Vec::new();
    errors.extend(required(fields, "role"));
    errors.extend(one_of(fields, "role", CHAT_ROLES));
    errors.extend(string(fields, "content"));
    errors
        .into_iter()
        .map(|err| FieldError {
            field: format!("messages[{index}].{}", err.field),
            ..err
        })
        .collect()
}

fn validate_ai_suggestion(data: &Value) -> Vec<FieldError> {
    object(data, |fields| {
        let mut errors = Vec::new();
        errors.extend(non_empty_string(fields, "content"));
        errors.extend(optional_string(fields, "targetBlockId"));
        errors.extend(uuid(fields, "targetBlockId"));
        errors.extend(number_in_range(fields, "confidence", 0.0, 1.0));
        errors.extend(boolean(fields, "accepted"));
        errors
    })
}

fn validate_page(data: &Value) -> Vec<FieldError> {
    object(data, |fields| {
        let mut errors = Vec::new();
        errors.extend(non_empty_string(fields, "title"));
        errors.extend(optional_string(fields, "icon"));
        errors.extend(optional_string(fields, "coverUrl"));
        errors.extend(http_url(fields, "coverUrl"));
        errors
    })
}

fn validate_row(data: &Value) -> Vec<FieldError> {
    object(data, |fields| {
        integer_in_range(fields, "gap", 0, 256).into_iter().collect()
    })
}

fn validate_layout_column(data: &Value) -> Vec<FieldError> {
    object(data, |fields| {
        number_in_range(fields, "width", 0.0, 1.0)
            .into_iter()
            .collect()
    })
}

fn validate_image(data: &Value) -> Vec<FieldError> {
    object(data, |fields| {
        let mut errors = Vec::new();
        errors.extend(non_empty_string(fields, "url"));
        errors.extend(http_url(fields, "url"));
        errors.extend(optional_string(fields, "caption"));
        errors.extend(optional_string(fields, "alt"));
        errors.extend(integer_in_range(fields, "width", 1, 20_000));
        errors.extend(integer_in_range(fields, "height", 1, 20_000));
        errors
    })
}

fn validate_embed(data: &Value) -> Vec<FieldError> {
    object(data, |fields| {
        let mut errors = Vec::new();
        errors.extend(non_empty_string(fields, "url"));
        errors.extend(http_url(fields, "url"));
        errors.extend(optional_string(fields, "provider"));
        errors
    })
}
