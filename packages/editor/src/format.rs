//! Rich-text formatting round trip, control-panel side.
//!
//! A `FORMAT_REQUEST` carries the preview's current document (it may hold
//! keystrokes the control panel has not seen yet). The mark is toggled over
//! the requested range and the response re-expresses the range in node-id
//! paths of the new document.

use crate::errors::{EditorError, EditorResult};
use blockframe_model::{RichText, Selection};
use blockframe_protocol::{FormatRequest, FormatResponse};
use tracing::debug;

/// Toggle the request's mark on `document`
pub fn apply_format(document: RichText, request: &FormatRequest) -> EditorResult<FormatResponse> {
    if request.selection.block_id != request.block_id || request.selection.field != request.field {
        return Err(EditorError::SelectionMismatch {
            block_id: request.block_id.clone(),
            field: request.field.clone(),
        });
    }

    let mut document = document;
    let mut node_ids = document.id_generator(&format!("{}-{}", request.block_id, request.field));
    let (start, end) = document.toggle_mark(
        &request.selection.anchor(),
        &request.selection.extent(),
        &request.mark,
        &mut node_ids,
    )?;

    debug!(
        request_id = request.request_id,
        block_id = %request.block_id,
        field = %request.field,
        "Applied format"
    );

    Ok(FormatResponse {
        request_id: request.request_id,
        block_id: request.block_id.clone(),
        field: request.field.clone(),
        selection: Selection::range(request.block_id.clone(), request.field.clone(), start, end),
        document,
    })
}
