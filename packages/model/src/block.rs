use crate::field::FieldValue;
use crate::ids::BlockId;
use crate::schema::BlockType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Marker tying a block to its position in a template tree
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateSource {
    pub template: String,
    /// Child indices from the template root down to the block
    pub path: Vec<usize>,
}

impl TemplateSource {
    pub fn new(template: impl Into<String>, path: Vec<usize>) -> Self {
        Self {
            template: template.into(),
            path,
        }
    }
}

impl fmt::Display for TemplateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = self
            .path
            .iter()
            .map(|i| i.to_string())
            .collect::<Vec<_>>()
            .join(".");
        write!(f, "{}#{}", self.template, path)
    }
}

/// Placeholder region a page-owned block lives in
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlaceholderRef {
    pub template: String,
    pub name: String,
}

impl PlaceholderRef {
    pub fn new(template: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            name: name.into(),
        }
    }
}

/// Where a new or moved block lands relative to a reference block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsertPosition {
    Before,
    After,
}

/// A unit of page content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub id: BlockId,

    #[serde(rename = "type")]
    pub block_type: BlockType,

    #[serde(default)]
    pub fields: BTreeMap<String, FieldValue>,

    /// Only true for blocks contributed by a template's fixed region
    #[serde(default)]
    pub locked: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_source: Option<TemplateSource>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<PlaceholderRef>,

    /// Nested blocks of container types
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Block>,
}

impl Block {
    pub fn new(id: impl Into<BlockId>, block_type: BlockType) -> Self {
        Self {
            id: id.into(),
            block_type,
            fields: BTreeMap::new(),
            locked: false,
            template_source: None,
            placeholder: None,
            children: Vec::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: FieldValue) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    pub fn with_children(mut self, children: Vec<Block>) -> Self {
        self.children = children;
        self
    }

    pub fn in_placeholder(mut self, placeholder: PlaceholderRef) -> Self {
        self.placeholder = Some(placeholder);
        self
    }

    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Template this block belongs to, either as fixed content or as
    /// page content inside one of its placeholders
    pub fn template_name(&self) -> Option<&str> {
        self.template_source
            .as_ref()
            .map(|source| source.template.as_str())
            .or_else(|| self.placeholder.as_ref().map(|p| p.template.as_str()))
    }

    /// This block's id followed by every descendant id
    pub fn all_ids(&self) -> Vec<&BlockId> {
        let mut ids = vec![&self.id];
        for child in &self.children {
            ids.extend(child.all_ids());
        }
        ids
    }

    pub fn find(&self, id: &BlockId) -> Option<&Block> {
        if &self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }

    pub fn find_mut(&mut self, id: &BlockId) -> Option<&mut Block> {
        if &self.id == id {
            return Some(self);
        }
        self.children.iter_mut().find_map(|child| child.find_mut(id))
    }
}
