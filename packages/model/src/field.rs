use crate::richtext::RichText;
use serde::{Deserialize, Serialize};

/// How a field is edited inline in the preview.
///
/// Each role has its own DOM marker so the toolbar can choose affordances:
/// format buttons for rich text, a link icon for link targets, an image
/// picker for media references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldRole {
    PlainText,
    RichText,
    LinkTarget,
    MediaReference,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkTarget {
    pub href: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaRef {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
}

/// Value stored in a block field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Text(String),
    Number(f64),
    Bool(bool),
    Link(LinkTarget),
    Media(MediaRef),
    RichText(RichText),
}

impl FieldValue {
    pub fn text(s: impl Into<String>) -> Self {
        FieldValue::Text(s.into())
    }

    /// Inline editing role, if the value is edited in place
    pub fn role(&self) -> Option<FieldRole> {
        match self {
            FieldValue::Text(_) => Some(FieldRole::PlainText),
            FieldValue::RichText(_) => Some(FieldRole::RichText),
            FieldValue::Link(_) => Some(FieldRole::LinkTarget),
            FieldValue::Media(_) => Some(FieldRole::MediaReference),
            FieldValue::Number(_) | FieldValue::Bool(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_rich_text(&self) -> Option<&RichText> {
        match self {
            FieldValue::RichText(doc) => Some(doc),
            _ => None,
        }
    }

    pub fn as_rich_text_mut(&mut self) -> Option<&mut RichText> {
        match self {
            FieldValue::RichText(doc) => Some(doc),
            _ => None,
        }
    }
}
