use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use printshop_core::RecordId;

use crate::error::LedgerError;

/// Lifecycle state of a stock lot.
///
/// Usual flow is `pending → in_process → completed`, but the ledger does not
/// restrict transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    #[default]
    Pending,
    InProcess,
    Completed,
}

impl RecordStatus {
    pub const ALL: [RecordStatus; 3] = [
        RecordStatus::Pending,
        RecordStatus::InProcess,
        RecordStatus::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Pending => "pending",
            RecordStatus::InProcess => "in_process",
            RecordStatus::Completed => "completed",
        }
    }
}

impl core::fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordStatus {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "pending" => Ok(RecordStatus::Pending),
            "in_process" | "inprocess" => Ok(RecordStatus::InProcess),
            "completed" => Ok(RecordStatus::Completed),
            other => Err(LedgerError::validation(format!(
                "unknown status '{other}' (expected pending, in_process or completed)"
            ))),
        }
    }
}

/// A quantity of one print in one lifecycle state (a lot).
///
/// Several records may share a `code`. Name and description are copied from
/// the print at creation so a record reads on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryRecord {
    pub id: RecordId,
    pub code: String,
    pub name: String,
    pub description: String,
    pub quantity: u64,
    pub status: RecordStatus,
    pub entry_timestamp: DateTime<Utc>,
    pub exit_timestamp: Option<DateTime<Utc>>,
    pub operator: String,
}

impl InventoryRecord {
    pub fn is_in_process(&self) -> bool {
        self.status == RecordStatus::InProcess
    }
}
