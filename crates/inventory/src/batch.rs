//! Named withdrawal manifests.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

/// One `(code, quantity)` line of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchEntry {
    pub code: String,
    pub quantity: u64,
}

impl BatchEntry {
    pub fn new(code: impl Into<String>, quantity: u64) -> Self {
        Self {
            code: code.into(),
            quantity,
        }
    }
}

/// An ordered list of withdrawal requests applied all-or-nothing.
///
/// Not inventory itself; entries may repeat a code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchDefinition {
    pub code: String,
    pub name: String,
    pub entries: Vec<BatchEntry>,
}

impl BatchDefinition {
    /// Build a batch, trimming codes and rejecting empty or zero-quantity lines.
    pub fn new(
        code: impl Into<String>,
        name: impl Into<String>,
        entries: Vec<BatchEntry>,
    ) -> Result<Self, LedgerError> {
        let code = code.into().trim().to_string();
        if code.is_empty() {
            return Err(LedgerError::validation("batch code cannot be empty"));
        }
        if entries.is_empty() {
            return Err(LedgerError::validation(format!("batch '{code}' has no entries")));
        }

        let mut normalized = Vec::with_capacity(entries.len());
        for (index, entry) in entries.into_iter().enumerate() {
            let entry_code = entry.code.trim().to_string();
            if entry_code.is_empty() {
                return Err(LedgerError::validation(format!(
                    "batch '{code}' entry {index} has an empty print code"
                )));
            }
            if entry.quantity == 0 {
                return Err(LedgerError::invalid_quantity(format!(
                    "batch '{code}' entry {index} ('{entry_code}') must withdraw at least one unit"
                )));
            }
            normalized.push(BatchEntry::new(entry_code, entry.quantity));
        }

        let name = name.into().trim().to_string();
        Ok(Self {
            name: if name.is_empty() { code.clone() } else { name },
            code,
            entries: normalized,
        })
    }

    pub fn total_quantity(&self) -> u64 {
        self.entries
            .iter()
            .fold(0u64, |acc, e| acc.saturating_add(e.quantity))
    }
}

/// Registry of batch definitions, keyed by batch code.
#[derive(Debug, Clone, Default)]
pub struct BatchCatalog {
    batches: BTreeMap<String, BatchDefinition>,
}

impl BatchCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define(&mut self, batch: BatchDefinition) -> Result<(), LedgerError> {
        if self.batches.contains_key(&batch.code) {
            return Err(LedgerError::DuplicateBatch(batch.code));
        }
        self.batches.insert(batch.code.clone(), batch);
        Ok(())
    }

    pub fn get(&self, code: &str) -> Result<&BatchDefinition, LedgerError> {
        self.batches
            .get(code.trim())
            .ok_or_else(|| LedgerError::BatchNotFound(code.trim().to_string()))
    }

    pub fn remove(&mut self, code: &str) -> Result<BatchDefinition, LedgerError> {
        self.batches
            .remove(code.trim())
            .ok_or_else(|| LedgerError::BatchNotFound(code.trim().to_string()))
    }

    /// All batches ordered by code.
    pub fn list(&self) -> impl Iterator<Item = &BatchDefinition> {
        self.batches.values()
    }

    pub fn len(&self) -> usize {
        self.batches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_trims_codes_and_defaults_name() {
        let batch = BatchDefinition::new(" LOTE-1 ", "  ", vec![BatchEntry::new(" EST001 ", 3)]).unwrap();
        assert_eq!(batch.code, "LOTE-1");
        assert_eq!(batch.name, "LOTE-1");
        assert_eq!(batch.entries[0].code, "EST001");
    }

    #[test]
    fn new_rejects_empty_and_zero_lines() {
        assert!(matches!(
            BatchDefinition::new("B", "", vec![]),
            Err(LedgerError::Validation(_))
        ));
        assert!(matches!(
            BatchDefinition::new("B", "", vec![BatchEntry::new("EST001", 0)]),
            Err(LedgerError::InvalidQuantity(_))
        ));
        assert!(matches!(
            BatchDefinition::new("B", "", vec![BatchEntry::new(" ", 2)]),
            Err(LedgerError::Validation(_))
        ));
    }

    #[test]
    fn catalog_rejects_duplicates_and_reports_missing() {
        let mut catalog = BatchCatalog::new();
        let batch = BatchDefinition::new("B1", "Morning run", vec![BatchEntry::new("EST001", 2)]).unwrap();

        catalog.define(batch.clone()).unwrap();
        assert_eq!(catalog.define(batch), Err(LedgerError::DuplicateBatch("B1".to_string())));
        assert_eq!(catalog.get("B1").unwrap().total_quantity(), 2);
        assert_eq!(catalog.get("B2").unwrap_err(), LedgerError::BatchNotFound("B2".to_string()));

        catalog.remove("B1").unwrap();
        assert!(catalog.is_empty());
    }

    #[test]
    fn total_quantity_saturates() {
        let batch = BatchDefinition::new(
            "BIG",
            "",
            vec![BatchEntry::new("EST001", u64::MAX), BatchEntry::new("EST002", 5)],
        )
        .unwrap();
        assert_eq!(batch.total_quantity(), u64::MAX);
    }
}
