//! Inventory ledger aggregate.
//!
//! The ledger owns the print catalog and every stock lot. Commands are
//! validated by `handle` without touching state; `apply` then replays the
//! resulting events. A batch is validated entry by entry against a scratch
//! copy, so either every entry's events are applied or none are.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use printshop_core::{Aggregate, AggregateRoot, LedgerId, RecordId};
use printshop_events::Event;

use crate::batch::{BatchCatalog, BatchDefinition};
use crate::error::LedgerError;
use crate::policy::LotSelection;
use crate::print::Print;
use crate::record::{InventoryRecord, RecordStatus};
use crate::stats::{InventoryStats, compute_stats};

// ─────────────────────────────────────────────────────────────────────────────
// Aggregate
// ─────────────────────────────────────────────────────────────────────────────

/// Aggregate root: the shop's inventory ledger.
///
/// # Invariants
/// - Print codes are unique.
/// - No record quantity is ever negative.
/// - Withdrawals never change the total quantity of a code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryLedger {
    id: LedgerId,
    prints: Vec<Print>,
    records: Vec<InventoryRecord>,
    lot_selection: LotSelection,
    version: u64,
}

impl InventoryLedger {
    pub fn new(id: LedgerId) -> Self {
        Self::with_lot_selection(id, LotSelection::default())
    }

    pub fn with_lot_selection(id: LedgerId, lot_selection: LotSelection) -> Self {
        Self {
            id,
            prints: Vec::new(),
            records: Vec::new(),
            lot_selection,
            version: 0,
        }
    }

    pub fn lot_selection(&self) -> LotSelection {
        self.lot_selection
    }

    pub fn prints(&self) -> &[Print] {
        &self.prints
    }

    pub fn print(&self, code: &str) -> Option<&Print> {
        let code = code.trim();
        self.prints.iter().find(|p| p.code == code)
    }

    /// All records in ledger (creation) order.
    pub fn records(&self) -> &[InventoryRecord] {
        &self.records
    }

    pub fn record(&self, id: RecordId) -> Option<&InventoryRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn records_for_code<'a>(
        &'a self,
        code: &'a str,
    ) -> impl Iterator<Item = &'a InventoryRecord> + 'a {
        let code = code.trim();
        self.records.iter().filter(move |r| r.code == code)
    }

    /// Quantity still awaiting withdrawal for `code` (saturating).
    pub fn in_process_quantity(&self, code: &str) -> u64 {
        self.records_for_code(code)
            .filter(|r| r.is_in_process())
            .fold(0u64, |acc, r| acc.saturating_add(r.quantity))
    }

    pub fn total_quantity(&self, code: &str) -> u64 {
        self.records_for_code(code)
            .fold(0u64, |acc, r| acc.saturating_add(r.quantity))
    }

    pub fn stats(&self) -> InventoryStats {
        compute_stats(&self.records)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Operations (handle + apply)
    // ─────────────────────────────────────────────────────────────────────────

    pub fn register_print(&mut self, cmd: RegisterPrint) -> Result<Vec<LedgerEvent>, LedgerError> {
        self.execute(&LedgerCommand::RegisterPrint(cmd))
    }

    pub fn withdraw(&mut self, cmd: Withdraw) -> Result<Vec<LedgerEvent>, LedgerError> {
        self.execute(&LedgerCommand::Withdraw(cmd))
    }

    /// Resolve `batch_code` in `catalog` and withdraw every entry, all-or-nothing.
    pub fn withdraw_batch(
        &mut self,
        batch_code: &str,
        catalog: &BatchCatalog,
        occurred_at: DateTime<Utc>,
    ) -> Result<Vec<LedgerEvent>, LedgerError> {
        let batch = catalog.get(batch_code)?.clone();
        self.execute(&LedgerCommand::WithdrawBatch(WithdrawBatch { batch, occurred_at }))
    }

    pub fn update_status(&mut self, cmd: UpdateStatus) -> Result<Vec<LedgerEvent>, LedgerError> {
        self.execute(&LedgerCommand::UpdateStatus(cmd))
    }

    pub fn correct_quantity(&mut self, cmd: CorrectQuantity) -> Result<Vec<LedgerEvent>, LedgerError> {
        self.execute(&LedgerCommand::CorrectQuantity(cmd))
    }
}

impl AggregateRoot for InventoryLedger {
    type Id = LedgerId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────────────────────────────────────

/// Command: register a new print with its initial lot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterPrint {
    pub code: String,
    pub name: String,
    pub description: String,
    pub image_url: Option<String>,
    pub quantity: u64,
    /// Defaults to `pending`.
    pub status: Option<RecordStatus>,
    pub operator: String,
    pub occurred_at: DateTime<Utc>,
}

/// Command: withdraw `quantity` units of `code` from in-process stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Withdraw {
    pub code: String,
    pub quantity: u64,
    pub occurred_at: DateTime<Utc>,
}

/// Command: withdraw every entry of a resolved batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawBatch {
    pub batch: BatchDefinition,
    pub occurred_at: DateTime<Utc>,
}

/// Command: set a record's status (any transition allowed).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateStatus {
    pub record_id: RecordId,
    pub status: RecordStatus,
    pub occurred_at: DateTime<Utc>,
}

/// Command: overwrite a record's quantity (administrative correction).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrectQuantity {
    pub record_id: RecordId,
    pub quantity: u64,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerCommand {
    RegisterPrint(RegisterPrint),
    Withdraw(Withdraw),
    WithdrawBatch(WithdrawBatch),
    UpdateStatus(UpdateStatus),
    CorrectQuantity(CorrectQuantity),
}

// ─────────────────────────────────────────────────────────────────────────────
// Events
// ─────────────────────────────────────────────────────────────────────────────

/// Event: a print and its initial lot were registered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrintRegistered {
    pub print: Print,
    pub record: InventoryRecord,
    pub occurred_at: DateTime<Utc>,
}

/// Event: a whole in-process lot was withdrawn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordCompleted {
    pub record_id: RecordId,
    pub code: String,
    pub quantity: u64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: part of an in-process lot was withdrawn into a new completed lot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSplit {
    pub source_id: RecordId,
    pub new_record_id: RecordId,
    pub code: String,
    pub quantity: u64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: a record's status was set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChanged {
    pub record_id: RecordId,
    pub from: RecordStatus,
    pub to: RecordStatus,
    pub occurred_at: DateTime<Utc>,
}

/// Event: a record's quantity was corrected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuantityCorrected {
    pub record_id: RecordId,
    pub from: u64,
    pub to: u64,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerEvent {
    PrintRegistered(PrintRegistered),
    RecordCompleted(RecordCompleted),
    RecordSplit(RecordSplit),
    StatusChanged(StatusChanged),
    QuantityCorrected(QuantityCorrected),
}

impl Event for LedgerEvent {
    fn event_type(&self) -> &'static str {
        match self {
            LedgerEvent::PrintRegistered(_) => "inventory.print.registered",
            LedgerEvent::RecordCompleted(_) => "inventory.record.completed",
            LedgerEvent::RecordSplit(_) => "inventory.record.split",
            LedgerEvent::StatusChanged(_) => "inventory.record.status_changed",
            LedgerEvent::QuantityCorrected(_) => "inventory.record.quantity_corrected",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            LedgerEvent::PrintRegistered(e) => e.occurred_at,
            LedgerEvent::RecordCompleted(e) => e.occurred_at,
            LedgerEvent::RecordSplit(e) => e.occurred_at,
            LedgerEvent::StatusChanged(e) => e.occurred_at,
            LedgerEvent::QuantityCorrected(e) => e.occurred_at,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Aggregate Implementation
// ─────────────────────────────────────────────────────────────────────────────

impl Aggregate for InventoryLedger {
    type Command = LedgerCommand;
    type Event = LedgerEvent;
    type Error = LedgerError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            LedgerEvent::PrintRegistered(e) => self.apply_registered(e),
            LedgerEvent::RecordCompleted(e) => self.apply_completed(e),
            LedgerEvent::RecordSplit(e) => self.apply_split(e),
            LedgerEvent::StatusChanged(e) => self.apply_status_changed(e),
            LedgerEvent::QuantityCorrected(e) => self.apply_quantity_corrected(e),
        }
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            LedgerCommand::RegisterPrint(cmd) => self.handle_register(cmd),
            LedgerCommand::Withdraw(cmd) => self.handle_withdraw(cmd),
            LedgerCommand::WithdrawBatch(cmd) => self.handle_withdraw_batch(cmd),
            LedgerCommand::UpdateStatus(cmd) => self.handle_update_status(cmd),
            LedgerCommand::CorrectQuantity(cmd) => self.handle_correct_quantity(cmd),
        }
    }
}

impl InventoryLedger {
    // ─────────────────────────────────────────────────────────────────────────
    // Command Handlers
    // ─────────────────────────────────────────────────────────────────────────

    fn handle_register(&self, cmd: &RegisterPrint) -> Result<Vec<LedgerEvent>, LedgerError> {
        let code = cmd.code.trim();
        if code.is_empty() {
            return Err(LedgerError::validation("print code cannot be empty"));
        }

        let name = cmd.name.trim();
        if name.is_empty() {
            return Err(LedgerError::validation("print name cannot be empty"));
        }

        if cmd.quantity == 0 {
            return Err(LedgerError::invalid_quantity(
                "initial quantity must be greater than zero",
            ));
        }

        if self.print(code).is_some() {
            return Err(LedgerError::DuplicateCode(code.to_string()));
        }

        let description = cmd.description.trim().to_string();
        let print = Print {
            code: code.to_string(),
            name: name.to_string(),
            description: description.clone(),
            image_url: cmd
                .image_url
                .as_deref()
                .map(str::trim)
                .filter(|url| !url.is_empty())
                .map(str::to_string),
            registered_at: cmd.occurred_at,
        };

        let record = InventoryRecord {
            id: RecordId::new(),
            code: code.to_string(),
            name: name.to_string(),
            description,
            quantity: cmd.quantity,
            status: cmd.status.unwrap_or_default(),
            entry_timestamp: cmd.occurred_at,
            exit_timestamp: None,
            operator: cmd.operator.trim().to_string(),
        };

        Ok(vec![LedgerEvent::PrintRegistered(PrintRegistered {
            print,
            record,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_withdraw(&self, cmd: &Withdraw) -> Result<Vec<LedgerEvent>, LedgerError> {
        let code = cmd.code.trim();

        if cmd.quantity == 0 {
            return Err(LedgerError::invalid_quantity(
                "withdrawal quantity must be greater than zero",
            ));
        }

        if self.print(code).is_none() {
            return Err(LedgerError::PrintNotFound(code.to_string()));
        }

        let candidates: Vec<&InventoryRecord> = self
            .records_for_code(code)
            .filter(|r| r.is_in_process())
            .collect();
        let lot = self.lot_selection.select(code, &candidates)?;

        if cmd.quantity > lot.quantity {
            return Err(LedgerError::InsufficientQuantity {
                code: code.to_string(),
                requested: cmd.quantity,
                available: lot.quantity,
            });
        }

        let event = if cmd.quantity == lot.quantity {
            LedgerEvent::RecordCompleted(RecordCompleted {
                record_id: lot.id,
                code: code.to_string(),
                quantity: lot.quantity,
                occurred_at: cmd.occurred_at,
            })
        } else {
            LedgerEvent::RecordSplit(RecordSplit {
                source_id: lot.id,
                new_record_id: RecordId::new(),
                code: code.to_string(),
                quantity: cmd.quantity,
                occurred_at: cmd.occurred_at,
            })
        };

        Ok(vec![event])
    }

    fn handle_withdraw_batch(&self, cmd: &WithdrawBatch) -> Result<Vec<LedgerEvent>, LedgerError> {
        if cmd.batch.entries.is_empty() {
            return Err(LedgerError::validation(format!(
                "batch '{}' has no entries",
                cmd.batch.code
            )));
        }

        // Each entry is validated against the state left by the entries before it,
        // so two lines for the same code cannot both claim the same units.
        let mut scratch = self.clone();
        let mut events = Vec::new();

        for (index, entry) in cmd.batch.entries.iter().enumerate() {
            let withdraw = Withdraw {
                code: entry.code.clone(),
                quantity: entry.quantity,
                occurred_at: cmd.occurred_at,
            };

            let entry_events =
                scratch
                    .handle_withdraw(&withdraw)
                    .map_err(|source| LedgerError::BatchEntryFailed {
                        index,
                        code: entry.code.trim().to_string(),
                        source: Box::new(source),
                    })?;

            for event in &entry_events {
                scratch.apply(event);
            }
            events.extend(entry_events);
        }

        Ok(events)
    }

    fn handle_update_status(&self, cmd: &UpdateStatus) -> Result<Vec<LedgerEvent>, LedgerError> {
        let record = self
            .record(cmd.record_id)
            .ok_or(LedgerError::RecordNotFound(cmd.record_id))?;

        Ok(vec![LedgerEvent::StatusChanged(StatusChanged {
            record_id: record.id,
            from: record.status,
            to: cmd.status,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_correct_quantity(&self, cmd: &CorrectQuantity) -> Result<Vec<LedgerEvent>, LedgerError> {
        let record = self
            .record(cmd.record_id)
            .ok_or(LedgerError::RecordNotFound(cmd.record_id))?;

        Ok(vec![LedgerEvent::QuantityCorrected(QuantityCorrected {
            record_id: record.id,
            from: record.quantity,
            to: cmd.quantity,
            occurred_at: cmd.occurred_at,
        })])
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Event Appliers
    // ─────────────────────────────────────────────────────────────────────────

    fn record_mut(&mut self, id: RecordId) -> Option<&mut InventoryRecord> {
        self.records.iter_mut().find(|r| r.id == id)
    }

    fn apply_registered(&mut self, e: &PrintRegistered) {
        self.prints.push(e.print.clone());
        self.records.push(e.record.clone());
    }

    fn apply_completed(&mut self, e: &RecordCompleted) {
        if let Some(record) = self.record_mut(e.record_id) {
            record.status = RecordStatus::Completed;
            record.exit_timestamp = Some(e.occurred_at);
        }
    }

    fn apply_split(&mut self, e: &RecordSplit) {
        let Some(source) = self.record_mut(e.source_id) else {
            return;
        };

        source.quantity = source.quantity.saturating_sub(e.quantity);

        let split = InventoryRecord {
            id: e.new_record_id,
            quantity: e.quantity,
            status: RecordStatus::Completed,
            exit_timestamp: Some(e.occurred_at),
            ..source.clone()
        };
        self.records.push(split);
    }

    fn apply_status_changed(&mut self, e: &StatusChanged) {
        if let Some(record) = self.record_mut(e.record_id) {
            record.status = e.to;
            if e.to == RecordStatus::Completed {
                record.exit_timestamp = Some(e.occurred_at);
            }
        }
    }

    fn apply_quantity_corrected(&mut self, e: &QuantityCorrected) {
        if let Some(record) = self.record_mut(e.record_id) {
            record.quantity = e.to;
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
