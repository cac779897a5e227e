//! Edit debouncer and apply rules.
//!
//! Dirty fields are tracked explicitly: each keystroke replaces the field's
//! pending value and restarts its window. A field flushes as one
//! `FIELD_UPDATE` carrying the whole value once its window passes without
//! input. Fields flush independently.

use crate::selection::FieldAddress;
use blockframe_model::{BlockId, FieldValue};
use blockframe_protocol::FieldUpdate;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug, Clone)]
struct PendingEdit {
    value: FieldValue,
    last_input: Instant,
}

#[derive(Debug)]
pub struct EditDebouncer {
    window: Duration,
    pending: BTreeMap<FieldAddress, PendingEdit>,
}

impl EditDebouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: BTreeMap::new(),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Record the field's latest local value and restart its window
    pub fn record(&mut self, address: FieldAddress, value: FieldValue, now: Instant) {
        self.pending.insert(address, PendingEdit { value, last_input: now });
    }

    pub fn is_pending(&self, address: &FieldAddress) -> bool {
        self.pending.contains_key(address)
    }

    pub fn pending_value(&self, address: &FieldAddress) -> Option<&FieldValue> {
        self.pending.get(address).map(|edit| &edit.value)
    }

    pub fn pending(&self) -> impl Iterator<Item = (&FieldAddress, &FieldValue)> {
        self.pending.iter().map(|(address, edit)| (address, &edit.value))
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Updates for every field whose window has elapsed
    pub fn flush_due(&mut self, now: Instant) -> Vec<FieldUpdate> {
        let due: Vec<FieldAddress> = self
            .pending
            .iter()
            .filter(|(_, edit)| now.saturating_duration_since(edit.last_input) >= self.window)
            .map(|(address, _)| address.clone())
            .collect();

        due.into_iter().filter_map(|address| self.flush(&address)).collect()
    }

    /// Flush one field regardless of its window
    pub fn flush(&mut self, address: &FieldAddress) -> Option<FieldUpdate> {
        let edit = self.pending.remove(address)?;
        debug!(field = %address, "Flushing field edit");
        Some(FieldUpdate {
            block_id: address.block_id.clone(),
            field: address.field.clone(),
            value: edit.value,
        })
    }

    pub fn flush_all(&mut self) -> Vec<FieldUpdate> {
        let addresses: Vec<FieldAddress> = self.pending.keys().cloned().collect();
        addresses.iter().filter_map(|address| self.flush(address)).collect()
    }

    pub fn cancel(&mut self, address: &FieldAddress) -> bool {
        self.pending.remove(address).is_some()
    }

    /// Drop pending edits for every field of a block
    pub fn cancel_block(&mut self, block_id: &BlockId) -> usize {
        let before = self.pending.len();
        self.pending.retain(|address, _| &address.block_id != block_id);
        let cancelled = before - self.pending.len();
        if cancelled > 0 {
            debug!(block_id = %block_id, cancelled, "Cancelled pending edits");
        }
        cancelled
    }

    /// Earliest instant at which some field becomes due
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().map(|edit| edit.last_input + self.window).min()
    }
}

/// What to do with an incoming value for a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyDecision {
    /// Not the field being edited: apply now
    Apply,
    /// Local keystrokes not yet flushed: local wins
    Suppress,
    /// Edited field with nothing in flight: replace the whole value and
    /// re-resolve the caret
    ReplaceAndReresolve,
}

pub fn decide(editing: Option<&FieldAddress>, debouncer: &EditDebouncer, address: &FieldAddress) -> ApplyDecision {
    if editing != Some(address) {
        ApplyDecision::Apply
    } else if debouncer.is_pending(address) {
        ApplyDecision::Suppress
    } else {
        ApplyDecision::ReplaceAndReresolve
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(block: &str, field: &str) -> FieldAddress {
        FieldAddress::new(block, field)
    }

    #[test]
    fn test_continuous_typing_flushes_once() {
        let start = Instant::now();
        let window = Duration::from_millis(300);
        let mut debouncer = EditDebouncer::new(window);
        let title = addr("b1", "title");

        let mut now = start;
        let mut emitted = Vec::new();
        for text in ["H", "He", "Hel", "Hell", "Hello"] {
            debouncer.record(title.clone(), FieldValue::text(text), now);
            emitted.extend(debouncer.flush_due(now));
            now += Duration::from_millis(100);
        }
        assert!(emitted.is_empty());

        let flushed = debouncer.flush_due(start + Duration::from_millis(400) + window);
        assert_eq!(flushed.len(), 1);
        assert_eq!(flushed[0].value, FieldValue::text("Hello"));
        assert!(!debouncer.is_pending(&title));
    }

    #[test]
    fn test_fields_flush_independently() {
        let start = Instant::now();
        let mut debouncer = EditDebouncer::new(Duration::from_millis(300));

        debouncer.record(addr("b1", "title"), FieldValue::text("a"), start);
        debouncer.record(addr("b2", "title"), FieldValue::text("b"), start + Duration::from_millis(200));

        let first = debouncer.flush_due(start + Duration::from_millis(300));
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].block_id, BlockId::from("b1"));
        assert_eq!(debouncer.next_deadline(), Some(start + Duration::from_millis(500)));

        let second = debouncer.flush_due(start + Duration::from_millis(500));
        assert_eq!(second[0].block_id, BlockId::from("b2"));
    }

    #[test]
    fn test_cancel_block() {
        let now = Instant::now();
        let mut debouncer = EditDebouncer::new(Duration::from_millis(300));
        debouncer.record(addr("b1", "title"), FieldValue::text("a"), now);
        debouncer.record(addr("b1", "text"), FieldValue::text("b"), now);
        debouncer.record(addr("b2", "title"), FieldValue::text("c"), now);

        assert_eq!(debouncer.cancel_block(&BlockId::from("b1")), 2);
        assert_eq!(debouncer.flush_all().len(), 1);
    }

    #[test]
    fn test_apply_decisions() {
        let now = Instant::now();
        let mut debouncer = EditDebouncer::new(Duration::from_millis(300));
        let editing = addr("b1", "title");
        let other = addr("b2", "title");

        assert_eq!(decide(Some(&editing), &debouncer, &other), ApplyDecision::Apply);
        assert_eq!(decide(None, &debouncer, &editing), ApplyDecision::Apply);
        assert_eq!(decide(Some(&editing), &debouncer, &editing), ApplyDecision::ReplaceAndReresolve);

        debouncer.record(editing.clone(), FieldValue::text("x"), now);
        assert_eq!(decide(Some(&editing), &debouncer, &editing), ApplyDecision::Suppress);
    }
}
