//! # Template Merge Engine
//!
//! Overlays a named template's block tree onto a page.
//!
//! ```text
//! template                       page before              page after
//! ┌────────────────────┐         ┌──────────────┐         ┌──────────────────┐
//! │ Block  Header  [0] │──sync──▶│ Header (old) │         │ Header  (locked) │
//! │ Placeholder "main" │──keep──▶│ UserX        │    ⇒    │ UserX            │
//! │ Block  Footer  [2] │──add───▶│              │         │ Footer  (locked) │
//! └────────────────────┘         └──────────────┘         └──────────────────┘
//! ```
//!
//! - Fixed blocks are matched by their template-source path, never by id;
//!   the template's field values replace the page's copy and the page id is kept
//! - Placeholder members are kept verbatim; template defaults are only used
//!   when the page has nothing in that placeholder
//! - Nested children of a fixed block are synced only when they carry a
//!   marker; unmarked children stay where they are
//! - Page blocks claiming a source the template no longer has become
//!   orphans: unlocked ordinary content, reported as [`MergeConflict`]s

use crate::errors::{EditorError, EditorResult};
use crate::mutations::MutationError;
use crate::page::Page;
use blockframe_model::{Block, BlockId, IdGenerator, PlaceholderRef, TemplateSource};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// Node of a template's block tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TemplateNode {
    /// Fixed content; becomes a locked block on the page
    Block {
        block: Block,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        children: Vec<TemplateNode>,
    },
    /// Named slot for page-owned blocks
    Placeholder {
        name: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        defaults: Vec<Block>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub name: String,
    pub nodes: Vec<TemplateNode>,
}

impl Template {
    pub fn new(name: impl Into<String>, nodes: Vec<TemplateNode>) -> Self {
        Self {
            name: name.into(),
            nodes,
        }
    }

    pub fn from_json(raw: &str) -> EditorResult<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Every fixed-block path in the tree
    pub fn source_paths(&self) -> BTreeSet<Vec<usize>> {
        let mut paths = BTreeSet::new();
        collect_paths(&self.nodes, &mut Vec::new(), &mut paths);
        paths
    }

    pub fn placeholder_names(&self) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        collect_placeholders(&self.nodes, &mut names);
        names
    }
}

fn collect_paths(nodes: &[TemplateNode], prefix: &mut Vec<usize>, paths: &mut BTreeSet<Vec<usize>>) {
    for (index, node) in nodes.iter().enumerate() {
        if let TemplateNode::Block { children, .. } = node {
            prefix.push(index);
            paths.insert(prefix.clone());
            collect_paths(children, prefix, paths);
            prefix.pop();
        }
    }
}

fn collect_placeholders(nodes: &[TemplateNode], names: &mut BTreeSet<String>) {
    for node in nodes {
        match node {
            TemplateNode::Block { children, .. } => collect_placeholders(children, names),
            TemplateNode::Placeholder { name, .. } => {
                names.insert(name.clone());
            }
        }
    }
}

/// Templates by name
#[derive(Debug, Clone, Default)]
pub struct TemplateStore {
    templates: BTreeMap<String, Template>,
}

impl TemplateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every `*.json` template in a directory
    pub fn load_dir(dir: &Path) -> EditorResult<Self> {
        let mut store = Self::new();
        let mut paths: Vec<_> = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();

        for path in paths {
            let template = Template::from_json(&fs::read_to_string(&path)?)?;
            debug!(template = %template.name, path = %path.display(), "Loaded template");
            store.insert(template);
        }
        Ok(store)
    }

    pub fn insert(&mut self, template: Template) {
        self.templates.insert(template.name.clone(), template);
    }

    pub fn get(&self, name: &str) -> Option<&Template> {
        self.templates.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

/// A page block whose template marker no longer resolves
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum MergeConflict {
    UnknownSource { block_id: BlockId, source: TemplateSource },
    UnknownPlaceholder { block_id: BlockId, placeholder: PlaceholderRef },
    UnknownTemplate { block_id: BlockId, template: String },
}

impl MergeConflict {
    pub fn block_id(&self) -> &BlockId {
        match self {
            MergeConflict::UnknownSource { block_id, .. }
            | MergeConflict::UnknownPlaceholder { block_id, .. }
            | MergeConflict::UnknownTemplate { block_id, .. } => block_id,
        }
    }
}

/// What one merge did to the page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeReport {
    pub template: String,
    /// False when the page had no instance of the template
    pub applied: bool,
    /// Fixed blocks whose fields were replaced
    pub updated: Vec<BlockId>,
    /// Fixed blocks (and placeholder defaults) newly added
    pub inserted: Vec<BlockId>,
    /// Placeholder members kept verbatim
    pub preserved: Vec<BlockId>,
    pub conflicts: Vec<MergeConflict>,
}

impl MergeReport {
    fn new(template: &str) -> Self {
        Self {
            template: template.to_string(),
            ..Self::default()
        }
    }

    pub fn orphans(&self) -> Vec<&BlockId> {
        self.conflicts.iter().map(MergeConflict::block_id).collect()
    }
}

/// Merge a template into the page's existing instance of it.
///
/// The instance region is every top-level block belonging to the template;
/// the merged blocks are placed where the first of them was. A page without
/// an instance is left alone.
pub fn merge_template(page: &mut Page, template: &Template) -> MergeReport {
    let mut report = MergeReport::new(&template.name);
    let Some(start) = page
        .blocks
        .iter()
        .position(|block| block.template_name() == Some(template.name.as_str()))
    else {
        debug!(template = %template.name, "Template not on page, nothing to merge");
        return report;
    };

    let (mut region, rest): (Vec<Block>, Vec<Block>) = page
        .blocks
        .drain(..)
        .partition(|block| block.template_name() == Some(template.name.as_str()));
    page.blocks = rest;

    let mut merger = Merger {
        template: &template.name,
        ids: page.ids_mut(),
        report: &mut report,
    };
    let mut merged = merger.merge_nodes(&template.nodes, &[], &mut region);
    merged.extend(region.into_iter().map(|block| merger.orphan(block)));

    page.blocks.splice(start..start, merged);
    page.repair_selection();
    report.applied = true;

    info!(
        template = %template.name,
        updated = report.updated.len(),
        inserted = report.inserted.len(),
        preserved = report.preserved.len(),
        orphans = report.conflicts.len(),
        "Merged template"
    );
    report
}

/// Blocks for a fresh application of a template: fixed blocks plus
/// placeholder defaults, all with new ids from the page
pub fn instantiate_template(page: &mut Page, template: &Template) -> (Vec<Block>, MergeReport) {
    let mut report = MergeReport::new(&template.name);
    let mut merger = Merger {
        template: &template.name,
        ids: page.ids_mut(),
        report: &mut report,
    };
    let blocks = merger.merge_nodes(&template.nodes, &[], &mut Vec::new());
    report.applied = true;
    (blocks, report)
}

/// Merge every template the page refers to.
///
/// Blocks naming a template the store does not know are orphaned.
pub fn apply_templates(page: &mut Page, store: &TemplateStore) -> Vec<MergeReport> {
    let mut names: Vec<String> = Vec::new();
    for block in page.blocks() {
        if let Some(name) = block.template_name() {
            if !names.iter().any(|known| known == name) {
                names.push(name.to_string());
            }
        }
    }

    names
        .iter()
        .map(|name| match store.get(name) {
            Some(template) => merge_template(page, template),
            None => orphan_template(page, name),
        })
        .collect()
}

/// Unlock and unmark every block of a template that no longer exists
fn orphan_template(page: &mut Page, name: &str) -> MergeReport {
    let mut report = MergeReport::new(name);
    for block in page.blocks.iter_mut() {
        if block.template_name() == Some(name) {
            warn!(block_id = %block.id, template = %name, "Block refers to unknown template");
            report.conflicts.push(MergeConflict::UnknownTemplate {
                block_id: block.id.clone(),
                template: name.to_string(),
            });
            clear_markers(block);
        }
    }
    report
}

/// Insert a fresh instance at a top-level index, or merge the existing one.
///
/// `index` is ignored when the page already holds an instance.
pub fn insert_template(page: &mut Page, template: &Template, index: usize) -> EditorResult<MergeReport> {
    if page.blocks().iter().any(|b| b.template_name() == Some(template.name.as_str())) {
        debug!(template = %template.name, index, "Template already on page, merging in place");
        return Ok(merge_template(page, template));
    }
    if index > page.len() {
        return Err(EditorError::Mutation(MutationError::IndexOutOfBounds {
            index,
            len: page.len(),
        }));
    }

    let (blocks, report) = instantiate_template(page, template);
    page.blocks.splice(index..index, blocks);
    Ok(report)
}

struct Merger<'a> {
    template: &'a str,
    ids: &'a mut IdGenerator,
    report: &'a mut MergeReport,
}

impl Merger<'_> {
    /// Merge one level of template nodes against the marked page blocks in
    /// `pool`. Matched blocks are taken out of the pool; leftovers are the
    /// caller's orphans.
    fn merge_nodes(&mut self, nodes: &[TemplateNode], prefix: &[usize], pool: &mut Vec<Block>) -> Vec<Block> {
        let mut out = Vec::new();
        for (index, node) in nodes.iter().enumerate() {
            let mut path = prefix.to_vec();
            path.push(index);

            match node {
                TemplateNode::Block { block, children } => {
                    let existing = take_first(pool, |b| {
                        b.template_source
                            .as_ref()
                            .is_some_and(|source| source.template == self.template && source.path == path)
                    });
                    out.push(self.sync_fixed(existing, block, children, path));
                }
                TemplateNode::Placeholder { name, defaults } => {
                    let members = take_all(pool, |b| {
                        b.template_source.is_none()
                            && b.placeholder
                                .as_ref()
                                .is_some_and(|p| p.template == self.template && &p.name == name)
                    });
                    if members.is_empty() {
                        for default in defaults {
                            let block = self.instantiate_default(default, name);
                            self.report.inserted.push(block.id.clone());
                            out.push(block);
                        }
                    } else {
                        self.report.preserved.extend(members.iter().map(|b| b.id.clone()));
                        out.extend(members);
                    }
                }
            }
        }
        out
    }

    fn sync_fixed(
        &mut self,
        existing: Option<Block>,
        template_block: &Block,
        children: &[TemplateNode],
        path: Vec<usize>,
    ) -> Block {
        let (id, old_children) = match existing {
            Some(block) => {
                self.report.updated.push(block.id.clone());
                (block.id, block.children)
            }
            None => {
                let id = self.ids.new_block_id();
                self.report.inserted.push(id.clone());
                (id, Vec::new())
            }
        };

        let mut marked = Vec::new();
        let mut unmarked = Vec::new();
        for (index, child) in old_children.into_iter().enumerate() {
            if child.template_source.is_some() || child.placeholder.is_some() {
                marked.push(child);
            } else {
                unmarked.push((index, child));
            }
        }

        let mut synced = self.merge_nodes(children, &path, &mut marked);
        for (index, child) in unmarked {
            let at = index.min(synced.len());
            synced.insert(at, child);
        }
        synced.extend(marked.into_iter().map(|child| self.orphan(child)));

        Block {
            id,
            block_type: template_block.block_type.clone(),
            fields: template_block.fields.clone(),
            locked: true,
            template_source: Some(TemplateSource::new(self.template, path)),
            placeholder: None,
            children: synced,
        }
    }

    fn instantiate_default(&mut self, default: &Block, placeholder: &str) -> Block {
        let mut block = default.clone();
        self.assign_fresh_ids(&mut block);
        clear_markers(&mut block);
        block.placeholder = Some(PlaceholderRef::new(self.template, placeholder));
        block
    }

    fn assign_fresh_ids(&mut self, block: &mut Block) {
        block.id = self.ids.new_block_id();
        for child in &mut block.children {
            self.assign_fresh_ids(child);
        }
    }

    fn orphan(&mut self, mut block: Block) -> Block {
        let conflict = match (&block.template_source, &block.placeholder) {
            (Some(source), _) => MergeConflict::UnknownSource {
                block_id: block.id.clone(),
                source: source.clone(),
            },
            (None, Some(placeholder)) => MergeConflict::UnknownPlaceholder {
                block_id: block.id.clone(),
                placeholder: placeholder.clone(),
            },
            (None, None) => return block,
        };
        warn!(block_id = %block.id, template = %self.template, "Orphaned template block");
        self.report.conflicts.push(conflict);
        clear_markers(&mut block);
        block
    }
}

/// Turn a block and its descendants into ordinary page content
fn clear_markers(block: &mut Block) {
    block.locked = false;
    block.template_source = None;
    block.placeholder = None;
    for child in &mut block.children {
        clear_markers(child);
    }
}

fn take_first(pool: &mut Vec<Block>, predicate: impl Fn(&Block) -> bool) -> Option<Block> {
    let index = pool.iter().position(predicate)?;
    Some(pool.remove(index))
}

fn take_all(pool: &mut Vec<Block>, predicate: impl Fn(&Block) -> bool) -> Vec<Block> {
    let (taken, kept): (Vec<Block>, Vec<Block>) = pool.drain(..).partition(|block| predicate(block));
    *pool = kept;
    taken
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockframe_model::{BlockType, FieldValue};

    fn fixed_node(title: &str) -> TemplateNode {
        TemplateNode::Block {
            block: Block::new("tpl", BlockType::Title).with_field("title", FieldValue::text(title)),
            children: Vec::new(),
        }
    }

    fn template(header: &str) -> Template {
        Template::new(
            "T",
            vec![
                fixed_node(header),
                TemplateNode::Placeholder {
                    name: "P".to_string(),
                    defaults: vec![Block::new("tpl-default", BlockType::Text)
                        .with_field("text", FieldValue::text("Write here"))],
                },
                fixed_node("Footer"),
            ],
        )
    }

    fn locked(id: &str, path: Vec<usize>, title: &str) -> Block {
        let mut block = Block::new(id, BlockType::Title).with_field("title", FieldValue::text(title));
        block.locked = true;
        block.template_source = Some(TemplateSource::new("T", path));
        block
    }

    fn titles(page: &Page) -> Vec<String> {
        page.blocks()
            .iter()
            .map(|block| {
                block
                    .field("title")
                    .or_else(|| block.field("text"))
                    .and_then(FieldValue::as_text)
                    .unwrap_or("")
                    .to_string()
            })
            .collect()
    }

    #[test]
    fn test_fixed_fields_replaced_ids_kept() {
        let mut page = Page::new(
            "/p",
            vec![
                locked("h", vec![0], "Stale header"),
                Block::new("x", BlockType::Text).in_placeholder(PlaceholderRef::new("T", "P")),
                locked("f", vec![2], "Footer"),
            ],
        )
        .unwrap();

        let report = merge_template(&mut page, &template("Header v2"));

        assert_eq!(page.order(), vec![BlockId::from("h"), BlockId::from("x"), BlockId::from("f")]);
        assert_eq!(titles(&page)[0], "Header v2");
        assert_eq!(report.updated, vec![BlockId::from("h"), BlockId::from("f")]);
        assert_eq!(report.preserved, vec![BlockId::from("x")]);
        assert!(report.inserted.is_empty());
    }

    #[test]
    fn test_missing_fixed_block_inserted_with_fresh_id() {
        let mut page = Page::new("/p", vec![locked("h", vec![0], "Header")]).unwrap();
        let report = merge_template(&mut page, &template("Header"));

        assert_eq!(page.len(), 3);
        assert_eq!(report.inserted.len(), 2);
        let footer = &page.blocks()[2];
        assert!(footer.locked);
        assert_ne!(footer.id, BlockId::from("tpl"));
        assert_eq!(footer.template_source, Some(TemplateSource::new("T", vec![2])));
    }

    #[test]
    fn test_empty_placeholder_gets_defaults() {
        let mut page = Page::new("/p", vec![locked("h", vec![0], "Header"), locked("f", vec![2], "Footer")]).unwrap();
        merge_template(&mut page, &template("Header"));

        let default = &page.blocks()[1];
        assert!(!default.locked);
        assert_eq!(default.placeholder, Some(PlaceholderRef::new("T", "P")));
        assert_eq!(default.field("text"), Some(&FieldValue::text("Write here")));
        assert_ne!(default.id, BlockId::from("tpl-default"));
    }

    #[test]
    fn test_unknown_source_becomes_orphan() {
        let mut page = Page::new("/p", vec![locked("h", vec![0], "Header"), locked("old", vec![7], "Gone")]).unwrap();
        let report = merge_template(&mut page, &template("Header"));

        assert_eq!(report.orphans(), vec![&BlockId::from("old")]);
        let orphan = page.get(&BlockId::from("old")).unwrap();
        assert!(!orphan.locked);
        assert!(orphan.template_source.is_none());
        assert_eq!(orphan.field("title"), Some(&FieldValue::text("Gone")));
    }

    #[test]
    fn test_page_without_instance_untouched() {
        let mut page = Page::new("/p", vec![Block::new("a", BlockType::Text)]).unwrap();
        let report = merge_template(&mut page, &template("Header"));
        assert!(!report.applied);
        assert_eq!(page.order(), vec![BlockId::from("a")]);
    }

    #[test]
    fn test_nested_children_synced_only_when_marked() {
        let template = Template::new(
            "T",
            vec![TemplateNode::Block {
                block: Block::new("tpl", BlockType::Columns).with_field("title", FieldValue::text("Grid")),
                children: vec![TemplateNode::Block {
                    block: Block::new("tpl-c", BlockType::Text).with_field("text", FieldValue::text("Fixed cell v2")),
                    children: Vec::new(),
                }],
            }],
        );

        let mut cell = Block::new("cell", BlockType::Text).with_field("text", FieldValue::text("Fixed cell"));
        cell.locked = true;
        cell.template_source = Some(TemplateSource::new("T", vec![0, 0]));
        let own = Block::new("own", BlockType::Text).with_field("text", FieldValue::text("Mine"));
        let grid = locked("grid", vec![0], "Grid").with_children(vec![own.clone(), cell]);

        let mut page = Page::new("/p", vec![grid]).unwrap();
        merge_template(&mut page, &template);

        let grid = &page.blocks()[0];
        assert_eq!(grid.children.len(), 2);
        assert_eq!(grid.children[0], own);
        assert_eq!(grid.children[1].id, BlockId::from("cell"));
        assert_eq!(grid.children[1].field("text"), Some(&FieldValue::text("Fixed cell v2")));
    }

    #[test]
    fn test_unknown_template_orphans_blocks() {
        let mut page = Page::new("/p", vec![locked("h", vec![0], "Header")]).unwrap();
        let reports = apply_templates(&mut page, &TemplateStore::new());

        assert_eq!(reports.len(), 1);
        assert!(matches!(reports[0].conflicts[0], MergeConflict::UnknownTemplate { .. }));
        assert!(!page.blocks()[0].locked);
    }

    #[test]
    fn test_insert_template_at_index() {
        let mut page = Page::new("/p", vec![Block::new("a", BlockType::Text)]).unwrap();
        let report = insert_template(&mut page, &template("Header"), 1).unwrap();

        assert_eq!(page.len(), 4);
        assert_eq!(report.inserted.len(), 3);
        assert_eq!(titles(&page), vec!["", "Header", "Write here", "Footer"]);
    }

    #[test]
    fn test_template_json_shape() {
        let raw = r#"{
            "name": "landing",
            "nodes": [
                { "kind": "block", "block": { "id": "t1", "type": "title" } },
                { "kind": "placeholder", "name": "body" }
            ]
        }"#;
        let template = Template::from_json(raw).unwrap();
        assert_eq!(template.source_paths().len(), 1);
        assert!(template.placeholder_names().contains("body"));
    }
}
