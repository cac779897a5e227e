//! Page integrity audit.
//!
//! Checks a stored page for problems the editor would otherwise only hit at
//! edit time: id collisions, rich-text fields without unique node ids, and
//! template markers that no longer resolve.

use crate::diagnostic::{Diagnostic, Rule};
use crate::template::TemplateStore;
use blockframe_model::{Block, BlockId, SchemaRegistry};
use std::collections::HashSet;
use tracing::debug;

pub fn audit_page(blocks: &[Block], schema: &SchemaRegistry, templates: Option<&TemplateStore>) -> Vec<Diagnostic> {
    let mut audit = Audit {
        schema,
        templates,
        seen: HashSet::new(),
        diagnostics: Vec::new(),
    };
    for block in blocks {
        audit.visit(block);
    }
    audit.diagnostics
}

struct Audit<'a> {
    schema: &'a SchemaRegistry,
    templates: Option<&'a TemplateStore>,
    seen: HashSet<BlockId>,
    diagnostics: Vec<Diagnostic>,
}

impl Audit<'_> {
    fn visit(&mut self, block: &Block) {
        if !self.seen.insert(block.id.clone()) {
            self.report(Diagnostic::new(
                Rule::DuplicateBlockId,
                &block.id,
                format!("Block id {} is used more than once", block.id),
            ));
        }

        if block.locked && block.template_source.is_none() {
            self.report(
                Diagnostic::new(
                    Rule::LockedWithoutSource,
                    &block.id,
                    format!("Block {} is locked but names no template source", block.id),
                )
                .with_suggestion("Unlock the block or re-apply its template"),
            );
        }

        self.check_fields(block);
        self.check_template(block);

        for child in &block.children {
            self.visit(child);
        }
    }

    fn report(&mut self, diagnostic: Diagnostic) {
        debug!(rule = %diagnostic.rule, block_id = %diagnostic.block_id, "Audit finding");
        self.diagnostics.push(diagnostic);
    }

    fn check_fields(&mut self, block: &Block) {
        let schema = self.schema.get(&block.block_type);
        if schema.is_none() {
            self.report(Diagnostic::new(
                Rule::UnknownBlockType,
                &block.id,
                format!("Block {} has unregistered type {}", block.id, block.block_type),
            ));
        }

        for (name, value) in &block.fields {
            if schema.is_some_and(|s| s.field(name).is_none()) {
                self.report(Diagnostic::new(
                    Rule::UnknownField,
                    &block.id,
                    format!("Block {} ({}) has undeclared field {}", block.id, block.block_type, name),
                ));
            }

            if let Some(Err(error)) = value.as_rich_text().map(|document| document.validate()) {
                self.report(Diagnostic::new(
                    Rule::DuplicateNodeId,
                    &block.id,
                    format!("Field {}.{}: {}", block.id, name, error),
                ));
            }
        }
    }

    fn check_template(&mut self, block: &Block) {
        let Some(templates) = self.templates else { return };
        let Some(name) = block.template_name() else { return };

        let Some(template) = templates.get(name) else {
            self.report(Diagnostic::new(
                Rule::UnknownTemplate,
                &block.id,
                format!("Block {} refers to unknown template {}", block.id, name),
            ));
            return;
        };

        if let Some(source) = &block.template_source {
            if !template.source_paths().contains(&source.path) {
                self.report(
                    Diagnostic::new(
                        Rule::OrphanTemplateSource,
                        &block.id,
                        format!("Block {} claims {} which the template no longer has", block.id, source),
                    )
                    .with_suggestion("Run a merge to turn it into ordinary content"),
                );
            }
        }

        if let Some(placeholder) = &block.placeholder {
            if !template.placeholder_names().contains(&placeholder.name) {
                self.report(Diagnostic::new(
                    Rule::OrphanPlaceholder,
                    &block.id,
                    format!("Block {} sits in unknown placeholder {}", block.id, placeholder.name),
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::{Template, TemplateNode};
    use blockframe_model::{BlockType, FieldValue, RichNode, RichText, TemplateSource};

    fn rules(diagnostics: &[Diagnostic]) -> Vec<&str> {
        diagnostics.iter().map(|d| d.rule.as_str()).collect()
    }

    #[test]
    fn test_clean_page_has_no_findings() {
        let blocks = vec![Block::new("a", BlockType::Text).with_field("text", FieldValue::text("hi"))];
        assert!(audit_page(&blocks, &SchemaRegistry::with_builtins(), None).is_empty());
    }

    #[test]
    fn test_duplicate_ids_and_node_ids() {
        let doc = RichText::new(vec![RichNode::leaf("n", "a"), RichNode::leaf("n", "b")]);
        let blocks = vec![
            Block::new("a", BlockType::Slate).with_field("value", FieldValue::RichText(doc)),
            Block::new("a", BlockType::Text),
        ];

        let diagnostics = audit_page(&blocks, &SchemaRegistry::with_builtins(), None);
        assert_eq!(rules(&diagnostics), vec!["duplicate-node-id", "duplicate-block-id"]);
        assert!(diagnostics.iter().all(Diagnostic::is_error));
    }

    #[test]
    fn test_template_markers_checked_against_store() {
        let mut store = TemplateStore::new();
        store.insert(Template::new(
            "T",
            vec![TemplateNode::Placeholder {
                name: "main".to_string(),
                defaults: Vec::new(),
            }],
        ));

        let mut stale = Block::new("s", BlockType::Title);
        stale.locked = true;
        stale.template_source = Some(TemplateSource::new("T", vec![4]));
        let mut gone = Block::new("g", BlockType::Title);
        gone.template_source = Some(TemplateSource::new("Gone", vec![0]));
        let mut unlocked = Block::new("u", BlockType::Title);
        unlocked.locked = true;

        let diagnostics = audit_page(&[stale, gone, unlocked], &SchemaRegistry::with_builtins(), Some(&store));
        assert_eq!(
            rules(&diagnostics),
            vec!["orphan-template-source", "unknown-template", "locked-without-source"]
        );
    }

    #[test]
    fn test_undeclared_field_warns() {
        let blocks = vec![Block::new("a", BlockType::Title).with_field("colour", FieldValue::text("red"))];
        let diagnostics = audit_page(&blocks, &SchemaRegistry::with_builtins(), None);
        assert_eq!(rules(&diagnostics), vec!["unknown-field"]);
        assert!(!diagnostics[0].is_error());
    }
}
