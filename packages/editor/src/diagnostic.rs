use blockframe_model::BlockId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity level of a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticLevel {
    Error,
    Warning,
    Info,
}

/// Page audit rules. Each rule has a fixed severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Rule {
    DuplicateBlockId,
    DuplicateNodeId,
    LockedWithoutSource,
    UnknownBlockType,
    UnknownField,
    UnknownTemplate,
    OrphanTemplateSource,
    OrphanPlaceholder,
}

impl Rule {
    pub fn level(self) -> DiagnosticLevel {
        match self {
            Rule::DuplicateBlockId | Rule::DuplicateNodeId | Rule::LockedWithoutSource => DiagnosticLevel::Error,
            Rule::UnknownField | Rule::UnknownTemplate | Rule::OrphanTemplateSource | Rule::OrphanPlaceholder => {
                DiagnosticLevel::Warning
            }
            Rule::UnknownBlockType => DiagnosticLevel::Info,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Rule::DuplicateBlockId => "duplicate-block-id",
            Rule::DuplicateNodeId => "duplicate-node-id",
            Rule::LockedWithoutSource => "locked-without-source",
            Rule::UnknownBlockType => "unknown-block-type",
            Rule::UnknownField => "unknown-field",
            Rule::UnknownTemplate => "unknown-template",
            Rule::OrphanTemplateSource => "orphan-template-source",
            Rule::OrphanPlaceholder => "orphan-placeholder",
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A finding about one block of a stored page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    pub rule: Rule,
    pub message: String,
    pub block_id: BlockId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl Diagnostic {
    pub fn new(rule: Rule, block_id: &BlockId, message: impl Into<String>) -> Self {
        Self {
            level: rule.level(),
            rule,
            message: message.into(),
            block_id: block_id.clone(),
            suggestion: None,
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.level == DiagnosticLevel::Error
    }
}
