//! Lot selection when several in-process records share a code.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::LedgerError;
use crate::record::InventoryRecord;

/// How a withdrawal picks its lot among in-process records of one code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LotSelection {
    /// First candidate in ledger order (creation order).
    #[default]
    FirstMatch,
    /// Candidate with the earliest entry timestamp; ties keep ledger order.
    OldestEntry,
    /// Refuse to guess: more than one candidate is an `AmbiguousMatch`.
    RejectAmbiguous,
}

impl LotSelection {
    /// Pick one record out of `candidates` (already filtered to in-process
    /// records of `code`, in ledger order).
    pub fn select<'a>(
        self,
        code: &str,
        candidates: &[&'a InventoryRecord],
    ) -> Result<&'a InventoryRecord, LedgerError> {
        let picked = match self {
            LotSelection::FirstMatch => candidates.first().copied(),
            LotSelection::OldestEntry => candidates
                .iter()
                .copied()
                .min_by_key(|r| r.entry_timestamp),
            LotSelection::RejectAmbiguous => {
                if candidates.len() > 1 {
                    return Err(LedgerError::AmbiguousMatch {
                        code: code.to_string(),
                        candidates: candidates.len(),
                    });
                }
                candidates.first().copied()
            }
        };

        picked.ok_or_else(|| LedgerError::NoInProcessStock(code.to_string()))
    }
}

impl FromStr for LotSelection {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "first_match" => Ok(LotSelection::FirstMatch),
            "oldest_entry" => Ok(LotSelection::OldestEntry),
            "reject_ambiguous" => Ok(LotSelection::RejectAmbiguous),
            other => Err(LedgerError::validation(format!("unknown lot selection '{other}'"))),
        }
    }
}
