//! Inventory ledger for the print shop.
//!
//! This crate contains the business rules for prints and their stock lots,
//! implemented purely as deterministic domain logic (no IO, no HTTP, no storage).
//! The ledger is the only owner of its records; every change goes through a
//! command that is validated in full before any event is applied.

pub mod batch;
pub mod error;
pub mod ledger;
pub mod policy;
pub mod print;
pub mod quantity;
pub mod record;
pub mod stats;

pub use batch::{BatchCatalog, BatchDefinition, BatchEntry};
pub use error::LedgerError;
pub use ledger::{
    CorrectQuantity, InventoryLedger, LedgerCommand, LedgerEvent, PrintRegistered,
    QuantityCorrected, RecordCompleted, RecordSplit, RegisterPrint, StatusChanged, UpdateStatus,
    Withdraw, WithdrawBatch,
};
pub use policy::LotSelection;
pub use print::Print;
pub use quantity::parse_quantity;
pub use record::{InventoryRecord, RecordStatus};
pub use stats::{InventoryStats, compute_stats};
