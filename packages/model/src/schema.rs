//! # Block types and field schemas
//!
//! Block types form a closed set at the control-panel boundary. Field
//! schemas are looked up through [`SchemaRegistry`] instead of probing
//! block values at runtime.

use crate::error::{ModelError, ModelResult};
use crate::field::{FieldRole, FieldValue, LinkTarget, MediaRef};
use crate::ids::IdGenerator;
use crate::richtext::RichText;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BlockType {
    Title,
    Text,
    Slate,
    Image,
    Teaser,
    Listing,
    Columns,
    /// Project-specific block registered at runtime
    Custom(String),
}

impl BlockType {
    pub fn as_str(&self) -> &str {
        match self {
            BlockType::Title => "title",
            BlockType::Text => "text",
            BlockType::Slate => "slate",
            BlockType::Image => "image",
            BlockType::Teaser => "teaser",
            BlockType::Listing => "listing",
            BlockType::Columns => "columns",
            BlockType::Custom(name) => name,
        }
    }
}

impl From<String> for BlockType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "title" => BlockType::Title,
            "text" => BlockType::Text,
            "slate" => BlockType::Slate,
            "image" => BlockType::Image,
            "teaser" => BlockType::Teaser,
            "listing" => BlockType::Listing,
            "columns" => BlockType::Columns,
            _ => BlockType::Custom(s),
        }
    }
}

impl From<&str> for BlockType {
    fn from(s: &str) -> Self {
        BlockType::from(s.to_string())
    }
}

impl From<BlockType> for String {
    fn from(t: BlockType) -> Self {
        t.as_str().to_string()
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    RichText,
    Link,
    Media,
    Number,
    Bool,
}

impl FieldKind {
    /// Inline editing role; numbers and booleans are edited in the sidebar
    pub fn role(self) -> Option<FieldRole> {
        match self {
            FieldKind::Text => Some(FieldRole::PlainText),
            FieldKind::RichText => Some(FieldRole::RichText),
            FieldKind::Link => Some(FieldRole::LinkTarget),
            FieldKind::Media => Some(FieldRole::MediaReference),
            FieldKind::Number | FieldKind::Bool => None,
        }
    }

    fn default_value(self, node_ids: &mut IdGenerator) -> FieldValue {
        match self {
            FieldKind::Text => FieldValue::Text(String::new()),
            FieldKind::RichText => FieldValue::RichText(RichText::paragraph(node_ids, "")),
            FieldKind::Link => FieldValue::Link(LinkTarget {
                href: String::new(),
                title: None,
            }),
            FieldKind::Media => FieldValue::Media(MediaRef {
                url: String::new(),
                alt: None,
            }),
            FieldKind::Number => FieldValue::Number(0.0),
            FieldKind::Bool => FieldValue::Bool(false),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSchema {
    pub name: String,
    pub kind: FieldKind,
    /// Explicit default; falls back to the kind's empty value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<FieldValue>,
}

impl FieldSchema {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            default: None,
        }
    }

    pub fn with_default(mut self, value: FieldValue) -> Self {
        self.default = Some(value);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockSchema {
    pub block_type: BlockType,
    pub fields: Vec<FieldSchema>,
}

impl BlockSchema {
    pub fn new(block_type: BlockType, fields: Vec<FieldSchema>) -> Self {
        Self { block_type, fields }
    }

    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Field schemas per block type
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: HashMap<BlockType, BlockSchema>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in block types
    pub fn with_builtins() -> Self {
        use FieldKind as K;

        let mut registry = Self::new();
        registry.register(BlockSchema::new(BlockType::Title, vec![FieldSchema::new("title", K::Text)]));
        registry.register(BlockSchema::new(BlockType::Text, vec![FieldSchema::new("text", K::Text)]));
        registry.register(BlockSchema::new(BlockType::Slate, vec![FieldSchema::new("value", K::RichText)]));
        registry.register(BlockSchema::new(
            BlockType::Image,
            vec![
                FieldSchema::new("url", K::Media),
                FieldSchema::new("alt", K::Text),
                FieldSchema::new("href", K::Link),
            ],
        ));
        registry.register(BlockSchema::new(
            BlockType::Teaser,
            vec![
                FieldSchema::new("title", K::Text),
                FieldSchema::new("description", K::Text),
                FieldSchema::new("href", K::Link),
                FieldSchema::new("preview_image", K::Media),
            ],
        ));
        registry.register(BlockSchema::new(
            BlockType::Listing,
            vec![
                FieldSchema::new("headline", K::Text),
                FieldSchema::new("b_size", K::Number).with_default(FieldValue::Number(10.0)),
            ],
        ));
        registry.register(BlockSchema::new(
            BlockType::Columns,
            vec![FieldSchema::new("title", K::Text), FieldSchema::new("stack_on_mobile", K::Bool)],
        ));
        registry
    }

    pub fn register(&mut self, schema: BlockSchema) {
        self.schemas.insert(schema.block_type.clone(), schema);
    }

    pub fn get(&self, block_type: &BlockType) -> Option<&BlockSchema> {
        self.schemas.get(block_type)
    }

    pub fn field(&self, block_type: &BlockType, field: &str) -> ModelResult<&FieldSchema> {
        let schema = self
            .get(block_type)
            .ok_or_else(|| ModelError::UnknownBlockType(block_type.to_string()))?;
        schema.field(field).ok_or_else(|| ModelError::UnknownField {
            block_type: block_type.to_string(),
            field: field.to_string(),
        })
    }

    pub fn field_role(&self, block_type: &BlockType, field: &str) -> Option<FieldRole> {
        self.field(block_type, field).ok().and_then(|f| f.kind.role())
    }

    /// Initial field values for a new block of `block_type`
    pub fn defaults_for(
        &self,
        block_type: &BlockType,
        node_ids: &mut IdGenerator,
    ) -> ModelResult<BTreeMap<String, FieldValue>> {
        let schema = self
            .get(block_type)
            .ok_or_else(|| ModelError::UnknownBlockType(block_type.to_string()))?;

        Ok(schema
            .fields
            .iter()
            .map(|f| {
                let value = match &f.default {
                    Some(value) => value.clone(),
                    None => f.kind.default_value(node_ids),
                };
                (f.name.clone(), value)
            })
            .collect())
    }

    pub fn block_types(&self) -> impl Iterator<Item = &BlockType> {
        self.schemas.keys()
    }
}
