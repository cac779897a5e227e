//! Template instances and the selection hierarchy.
//!
//! An instance has no storage of its own: it is recomputed from the markers
//! each contributed block carries, as the maximal contiguous run of
//! top-level blocks belonging to one template.

use crate::page::Page;
use blockframe_model::{Block, BlockId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateInstance {
    pub template: String,
    /// Index of the first member in the page's block list
    pub start: usize,
    pub block_ids: Vec<BlockId>,
}

impl TemplateInstance {
    pub fn len(&self) -> usize {
        self.block_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.block_ids.is_empty()
    }

    pub fn contains(&self, id: &BlockId) -> bool {
        self.block_ids.contains(id)
    }

    /// Page-owned members living in one of the template's placeholders
    pub fn placeholder_members<'a>(&self, blocks: &'a [Block]) -> Vec<&'a Block> {
        blocks
            .iter()
            .skip(self.start)
            .take(self.len())
            .filter(|block| block.template_source.is_none() && block.placeholder.is_some())
            .collect()
    }
}

pub fn template_instances(blocks: &[Block]) -> Vec<TemplateInstance> {
    let mut instances: Vec<TemplateInstance> = Vec::new();
    let mut previous: Option<&str> = None;

    for (index, block) in blocks.iter().enumerate() {
        let template = block.template_name();
        match (template, previous) {
            (Some(name), Some(prev)) if name == prev => {
                if let Some(current) = instances.last_mut() {
                    current.block_ids.push(block.id.clone());
                }
            }
            (Some(name), _) => instances.push(TemplateInstance {
                template: name.to_string(),
                start: index,
                block_ids: vec![block.id.clone()],
            }),
            (None, _) => {}
        }
        previous = template;
    }

    instances
}

/// The instance a top-level block belongs to
pub fn instance_of(blocks: &[Block], id: &BlockId) -> Option<TemplateInstance> {
    template_instances(blocks)
        .into_iter()
        .find(|instance| instance.contains(id))
}

/// One level of the selection hierarchy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "level", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum Crumb {
    Page { path: String },
    Instance { template: String, first_block: BlockId },
    Block { block_id: BlockId },
}

/// Result of collapsing the breadcrumb by one level
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParentLevel {
    pub breadcrumb: Vec<Crumb>,
    /// Navigable children of the new innermost level
    pub children: Vec<BlockId>,
}

/// Page → instance → block path for a selected block
pub fn breadcrumb(page: &Page, id: &BlockId) -> Option<Vec<Crumb>> {
    let chain = ancestry(page.blocks(), id)?;
    let mut crumbs = vec![Crumb::Page {
        path: page.path().to_string(),
    }];

    if let Some(instance) = chain.first().and_then(|top| instance_of(page.blocks(), &top.id)) {
        crumbs.push(Crumb::Instance {
            template: instance.template,
            first_block: instance.block_ids[0].clone(),
        });
    }

    crumbs.extend(chain.into_iter().map(|block| Crumb::Block {
        block_id: block.id.clone(),
    }));
    Some(crumbs)
}

/// Drop the innermost crumb and list what the parent level contains.
///
/// Returns `None` at the page level.
pub fn go_to_parent(page: &Page, crumbs: &[Crumb]) -> Option<ParentLevel> {
    if crumbs.len() < 2 {
        return None;
    }
    let breadcrumb = crumbs[..crumbs.len() - 1].to_vec();

    let children = match breadcrumb.last()? {
        Crumb::Page { .. } => page.order(),
        Crumb::Instance { first_block, .. } => instance_of(page.blocks(), first_block)?
            .placeholder_members(page.blocks())
            .into_iter()
            .map(|block| block.id.clone())
            .collect(),
        Crumb::Block { block_id } => page
            .get(block_id)?
            .children
            .iter()
            .map(|child| child.id.clone())
            .collect(),
    };

    Some(ParentLevel { breadcrumb, children })
}

/// Blocks from the top level down to `id`
fn ancestry<'a>(blocks: &'a [Block], id: &BlockId) -> Option<Vec<&'a Block>> {
    for block in blocks {
        if &block.id == id {
            return Some(vec![block]);
        }
        if let Some(mut rest) = ancestry(&block.children, id) {
            rest.insert(0, block);
            return Some(rest);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockframe_model::{BlockType, PlaceholderRef, TemplateSource};

    fn fixed(id: &str, index: usize) -> Block {
        let mut block = Block::new(id, BlockType::Title);
        block.locked = true;
        block.template_source = Some(TemplateSource::new("T", vec![index]));
        block
    }

    fn member(id: &str) -> Block {
        Block::new(id, BlockType::Text).in_placeholder(PlaceholderRef::new("T", "main"))
    }

    fn page() -> Page {
        Page::new(
            "/p",
            vec![
                Block::new("intro", BlockType::Text),
                fixed("header", 0),
                member("x").with_children(vec![Block::new("x1", BlockType::Text)]),
                fixed("footer", 2),
                Block::new("outro", BlockType::Text),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_instance_is_contiguous_run() {
        let page = page();
        let instances = template_instances(page.blocks());

        assert_eq!(instances.len(), 1);
        assert_eq!(instances[0].start, 1);
        assert_eq!(
            instances[0].block_ids,
            vec![BlockId::from("header"), BlockId::from("x"), BlockId::from("footer")]
        );
    }

    #[test]
    fn test_three_level_breadcrumb() {
        let page = page();
        let crumbs = breadcrumb(&page, &BlockId::from("x")).unwrap();

        assert_eq!(crumbs.len(), 3);
        assert!(matches!(&crumbs[1], Crumb::Instance { template, .. } if template == "T"));
        assert_eq!(crumbs[2], Crumb::Block { block_id: BlockId::from("x") });

        let plain = breadcrumb(&page, &BlockId::from("intro")).unwrap();
        assert_eq!(plain.len(), 2);
    }

    #[test]
    fn test_go_to_parent_lists_placeholder_children() {
        let page = page();
        let crumbs = breadcrumb(&page, &BlockId::from("footer")).unwrap();

        let parent = go_to_parent(&page, &crumbs).unwrap();
        assert_eq!(parent.breadcrumb.len(), 2);
        assert_eq!(parent.children, vec![BlockId::from("x")]);

        let top = go_to_parent(&page, &parent.breadcrumb).unwrap();
        assert_eq!(top.children.len(), 5);
        assert!(go_to_parent(&page, &top.breadcrumb).is_none());
    }

    #[test]
    fn test_nested_block_breadcrumb() {
        let page = page();
        let crumbs = breadcrumb(&page, &BlockId::from("x1")).unwrap();
        assert_eq!(crumbs.len(), 4);

        let parent = go_to_parent(&page, &crumbs).unwrap();
        assert_eq!(parent.children, vec![BlockId::from("x1")]);
    }
}
