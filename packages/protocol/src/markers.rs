//! DOM attribute contract the preview's renderer must emit.
//!
//! - every element belonging to a block carries [`BLOCK_ID`]
//! - editable fields carry exactly one role marker whose value is the field name
//! - every addressable rich-text node carries [`NODE_ID`]
//! - elements of locked template blocks carry [`TEMPLATE_SOURCE`]
//!
//! A rich-text element without [`NODE_ID`] is an integrity error; no id is
//! ever synthesized for it.

use blockframe_model::FieldRole;

/// Bumped together with [`crate::PROTOCOL_VERSION`] when markers change
pub const MARKER_VERSION: u32 = 1;

pub const BLOCK_ID: &str = "data-block-uid";
pub const NODE_ID: &str = "data-node-id";
pub const TEMPLATE_SOURCE: &str = "data-template-source";
pub const CONTENT_EDITABLE: &str = "contenteditable";

pub const PLAIN_TEXT: &str = "data-edit-text";
pub const RICH_TEXT: &str = "data-edit-richtext";
pub const LINK_TARGET: &str = "data-edit-link";
pub const MEDIA_REFERENCE: &str = "data-edit-media";

pub const ROLE_MARKERS: [(FieldRole, &str); 4] = [
    (FieldRole::PlainText, PLAIN_TEXT),
    (FieldRole::RichText, RICH_TEXT),
    (FieldRole::LinkTarget, LINK_TARGET),
    (FieldRole::MediaReference, MEDIA_REFERENCE),
];

pub fn role_marker(role: FieldRole) -> &'static str {
    match role {
        FieldRole::PlainText => PLAIN_TEXT,
        FieldRole::RichText => RICH_TEXT,
        FieldRole::LinkTarget => LINK_TARGET,
        FieldRole::MediaReference => MEDIA_REFERENCE,
    }
}

pub fn role_for_attribute(name: &str) -> Option<FieldRole> {
    ROLE_MARKERS
        .iter()
        .find(|(_, attr)| *attr == name)
        .map(|(role, _)| *role)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_markers_are_distinct() {
        for (role, attr) in ROLE_MARKERS {
            assert_eq!(role_marker(role), attr);
            assert_eq!(role_for_attribute(attr), Some(role));
        }
        assert_eq!(role_for_attribute(BLOCK_ID), None);
    }
}
