// 📒 Ledger - In-memory record store
// The ordered list of entries for one session. Nothing is persisted.
//
// Mutations:
//   add      → derive + fresh UUID, appended at the end
//   replace  → derive from the NEW input only, same id, same position
//   remove   → exactly one entry leaves, every other entry is untouched
//
// Every mutation also records a LedgerEvent (session audit trail).

use crate::entry::{EntryInput, IncomeBasis, LedgerEntry};
use crate::error::{LedgerError, Result};
use crate::summary::{self, GroupMode, SummaryRow, Totals};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Audit record for one store mutation
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LedgerEvent {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    /// entry_added | entry_replaced | entry_removed
    pub event_type: String,
    pub entry_id: String,
    pub data: serde_json::Value,
}

impl LedgerEvent {
    pub fn new(event_type: &str, entry_id: &str, data: serde_json::Value) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type: event_type.to_string(),
            entry_id: entry_id.to_string(),
            data,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Ledger {
    entries: Vec<LedgerEntry>,
    events: Vec<LedgerEvent>,
    basis: IncomeBasis,
}

impl Ledger {
    pub fn new(basis: IncomeBasis) -> Self {
        Ledger {
            entries: Vec::new(),
            events: Vec::new(),
            basis,
        }
    }

    pub fn basis(&self) -> IncomeBasis {
        self.basis
    }

    /// Derive and append a new entry
    pub fn add(&mut self, input: &EntryInput) -> &LedgerEntry {
        let id = uuid::Uuid::new_v4().to_string();
        let entry = LedgerEntry::derive(id, input, self.basis);

        tracing::debug!(entry_id = %entry.id, date = %entry.date, net_income = %entry.net_income, "entry added");
        self.record("entry_added", &entry.id, serde_json::json!({ "after": entry }));

        self.entries.push(entry);
        let last = self.entries.len() - 1;
        &self.entries[last]
    }

    /// Replace the entry `id` wholesale, keeping its id and position
    pub fn replace(&mut self, id: &str, input: &EntryInput) -> Result<&LedgerEntry> {
        let pos = self.position(id)?;
        let entry = LedgerEntry::derive(id.to_string(), input, self.basis);

        tracing::debug!(entry_id = %id, date = %entry.date, net_income = %entry.net_income, "entry replaced");
        self.record(
            "entry_replaced",
            id,
            serde_json::json!({ "before": self.entries[pos], "after": entry }),
        );

        self.entries[pos] = entry;
        Ok(&self.entries[pos])
    }

    /// Remove the entry `id` and return it
    pub fn remove(&mut self, id: &str) -> Result<LedgerEntry> {
        let pos = self.position(id)?;
        let removed = self.entries.remove(pos);

        tracing::debug!(entry_id = %id, "entry removed");
        self.record("entry_removed", id, serde_json::json!({ "before": removed }));

        Ok(removed)
    }

    pub fn get(&self, id: &str) -> Option<&LedgerEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn events(&self) -> &[LedgerEvent] {
        &self.events
    }

    pub fn summary(&self, mode: GroupMode) -> Vec<SummaryRow> {
        summary::summarize(&self.entries, mode)
    }

    pub fn totals(&self) -> Totals {
        summary::totals(&self.entries)
    }

    fn position(&self, id: &str) -> Result<usize> {
        self.entries
            .iter()
            .position(|e| e.id == id)
            .ok_or_else(|| LedgerError::EntryNotFound(id.to_string()))
    }

    fn record(&mut self, event_type: &str, entry_id: &str, data: serde_json::Value) {
        self.events.push(LedgerEvent::new(event_type, entry_id, data));
    }
}
