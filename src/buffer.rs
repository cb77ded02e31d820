//! Write Buffer: dynamic writes held back until the owning record has an
//! identity, then flushed by the persistence layer's post-save hook.

use crate::cache::FieldSet;
use crate::core::{FieldDefinition, FieldId, NewFieldValue, RecordId, Result, Value};
use crate::values::ValueStore;
use log::warn;
use std::collections::HashMap;
use tracing::{Level, event, info_span};

#[derive(Debug, Clone, PartialEq)]
pub struct PendingWrite {
    pub definition: FieldDefinition,
    pub value: Value,
}

/// Outcome of one flush.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    pub updated: usize,
    pub inserted: usize,
    /// Inserts went out as one bulk statement.
    pub bulk: bool,
}

impl FlushReport {
    pub fn is_empty(&self) -> bool {
        self.updated == 0 && self.inserted == 0
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBuffer {
    pending: Vec<PendingWrite>,
}

impl WriteBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a write. A second write to the same field replaces the first
    /// and keeps its position.
    pub fn push(&mut self, definition: FieldDefinition, value: Value) {
        match self.pending.iter_mut().find(|p| p.definition.id == definition.id) {
            Some(existing) => existing.value = value,
            None => self.pending.push(PendingWrite { definition, value }),
        }
    }

    pub fn get(&self, field_name: &str) -> Option<&Value> {
        self.pending
            .iter()
            .find(|p| p.definition.field_name == field_name)
            .map(|p| &p.value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PendingWrite> {
        self.pending.iter()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    /// Write every pending value for `record_id`.
    ///
    /// `fields` is the current field set of the record's model type. Writes
    /// to fields removed since they were buffered are dropped with a warning.
    /// Fields that already have a row are updated one by one; the rest are
    /// inserted, as a single bulk statement when `bulk` allows it. The buffer
    /// is cleared on success. On failure writes applied so far stay
    /// committed and the buffer is left intact, so a retried save applies it
    /// again (already written fields then take the update path).
    pub fn flush(
        &mut self,
        store: &ValueStore<'_>,
        fields: &FieldSet,
        record_id: RecordId,
        bulk: bool,
    ) -> Result<FlushReport> {
        if self.pending.is_empty() {
            return Ok(FlushReport::default());
        }

        let span = info_span!("dynafield.flush", record_id = record_id.0, pending = self.pending.len());
        let _guard = span.enter();

        match self.apply(store, fields, record_id, bulk) {
            Ok(report) => {
                self.pending.clear();
                event!(
                    Level::DEBUG,
                    updated = report.updated,
                    inserted = report.inserted,
                    bulk = report.bulk,
                    "flushed dynamic attributes"
                );
                Ok(report)
            }
            Err(e) => {
                warn!(
                    "Flush for record {} failed, dynamic attributes are indeterminate until the save is retried: {}",
                    record_id, e
                );
                Err(e)
            }
        }
    }

    fn apply(&self, store: &ValueStore<'_>, fields: &FieldSet, record_id: RecordId, bulk: bool) -> Result<FlushReport> {
        let mut writes = Vec::with_capacity(self.pending.len());
        for write in &self.pending {
            match fields.get_by_id(write.definition.id) {
                Some(definition) => writes.push((definition, &write.value)),
                None => warn!(
                    "Dropping pending write to removed field {}:{} of record {}",
                    write.definition.model_type, write.definition.field_name, record_id
                ),
            }
        }

        let mut report = FlushReport::default();
        if writes.is_empty() {
            return Ok(report);
        }

        let field_ids: Vec<FieldId> = writes.iter().map(|(definition, _)| definition.id).collect();
        let existing: HashMap<FieldId, _> = store
            .existing_rows(record_id, &field_ids)?
            .into_iter()
            .map(|row| (row.field_id, row.id))
            .collect();

        let mut inserts = Vec::new();
        for (definition, value) in writes {
            match existing.get(&definition.id) {
                Some(row_id) => {
                    store.update_row(*row_id, value.clone())?;
                    report.updated += 1;
                }
                None => inserts.push(NewFieldValue {
                    field_id: definition.id,
                    record_id,
                    value: value.clone(),
                }),
            }
        }

        report.inserted = inserts.len();
        if !inserts.is_empty() {
            report.bulk = store.insert_rows(inserts, bulk)?;
        }
        Ok(report)
    }
}
