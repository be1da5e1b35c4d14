use std::{
    convert::Infallible,
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::broadcast;
use tokio_stream::{StreamExt, wrappers::BroadcastStream};

use printshop_auth::{
    Argon2Params, AuthError, JwtIssuer, NewUser, TokenError, User, UserDirectory,
    hash_new_password, verify_password,
};
use printshop_core::{AggregateRoot, LedgerId, RecordId, UserId};
use printshop_events::{EventEnvelope, Journal};
use printshop_inventory::{
    BatchCatalog, BatchDefinition, CorrectQuantity, InventoryLedger, InventoryRecord,
    InventoryStats, LedgerError, LedgerEvent, Print, RecordStatus, RegisterPrint, UpdateStatus,
    Withdraw,
};

use crate::config::ApiConfig;

const REALTIME_CAPACITY: usize = 1024;

/// Realtime message broadcasted via SSE.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RealtimeMessage {
    pub topic: String,
    pub payload: serde_json::Value,
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error("state lock poisoned: {0}")]
    LockPoisoned(&'static str),

    #[error("blocking task failed: {0}")]
    Blocking(String),
}

/// Filters for the record listing.
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    pub status: Option<RecordStatus>,
    pub code: Option<String>,
}

/// Shared service state.
///
/// Lock order when more than one guard is held: batches, ledger, journal.
pub struct AppServices {
    ledger: Mutex<InventoryLedger>,
    batches: Mutex<BatchCatalog>,
    journal: Mutex<Journal<LedgerEvent>>,
    users: Mutex<UserDirectory>,
    issuer: JwtIssuer,
    realtime_tx: broadcast::Sender<RealtimeMessage>,
}

fn lock<'a, T>(m: &'a Mutex<T>, what: &'static str) -> Result<MutexGuard<'a, T>, ServiceError> {
    m.lock().map_err(|_| ServiceError::LockPoisoned(what))
}

pub fn build_services(config: &ApiConfig) -> Result<AppServices, ServiceError> {
    let params: Argon2Params = config.password_hashing.into();
    let users = if config.seed_demo_users {
        UserDirectory::with_demo_accounts(params, Utc::now())?
    } else {
        UserDirectory::new(params)
    };

    let ledger_id = LedgerId::new();
    let ledger = InventoryLedger::with_lot_selection(ledger_id, config.lot_selection);
    let (realtime_tx, _rx) = broadcast::channel(REALTIME_CAPACITY);

    tracing::info!(
        ledger_id = %ledger_id,
        lot_selection = ?config.lot_selection,
        users = users.len(),
        "inventory services ready"
    );

    Ok(AppServices {
        ledger: Mutex::new(ledger),
        batches: Mutex::new(BatchCatalog::new()),
        journal: Mutex::new(Journal::new(*ledger_id.as_uuid())),
        users: Mutex::new(users),
        issuer: JwtIssuer::new(config.jwt_secret.as_bytes(), config.token_ttl()),
        realtime_tx,
    })
}

impl AppServices {
    pub fn realtime_tx(&self) -> &broadcast::Sender<RealtimeMessage> {
        &self.realtime_tx
    }

    // ─────────────────────────────────────────────────────────────────────
    // Ledger commands
    // ─────────────────────────────────────────────────────────────────────

    /// Register a print; returns its initial record.
    pub fn register_print(&self, cmd: RegisterPrint) -> Result<InventoryRecord, ServiceError> {
        let code = cmd.code.clone();
        let mut ledger = lock(&self.ledger, "ledger")?;
        let events = ledger
            .register_print(cmd)
            .inspect_err(|e| log_rejection("register_print", &code, e))?;

        let envelopes = self.commit(&ledger, events)?;

        let record = envelopes.iter().find_map(|e| match e.payload() {
            LedgerEvent::PrintRegistered(r) => Some(r.record.clone()),
            _ => None,
        });
        let record = record.ok_or_else(|| {
            LedgerError::validation(format!("registration of '{code}' produced no record"))
        })?;

        tracing::info!(
            code = %record.code,
            quantity = record.quantity,
            status = %record.status,
            record_id = %record.id,
            "print registered"
        );
        Ok(record)
    }

    pub fn withdraw(&self, cmd: Withdraw) -> Result<Vec<EventEnvelope<LedgerEvent>>, ServiceError> {
        let code = cmd.code.clone();
        let quantity = cmd.quantity;
        let mut ledger = lock(&self.ledger, "ledger")?;
        let events = ledger
            .withdraw(cmd)
            .inspect_err(|e| log_rejection("withdraw", &code, e))?;

        tracing::info!(
            code = %code,
            quantity,
            remaining_in_process = ledger.in_process_quantity(&code),
            "withdrawal recorded"
        );
        self.commit(&ledger, events)
    }

    pub fn withdraw_batch(
        &self,
        batch_code: &str,
        occurred_at: DateTime<Utc>,
    ) -> Result<Vec<EventEnvelope<LedgerEvent>>, ServiceError> {
        let batches = lock(&self.batches, "batches")?;
        let mut ledger = lock(&self.ledger, "ledger")?;
        let events = ledger
            .withdraw_batch(batch_code, &batches, occurred_at)
            .inspect_err(|e| log_rejection("withdraw_batch", batch_code, e))?;

        tracing::info!(batch = batch_code, events = events.len(), "batch withdrawal recorded");
        self.commit(&ledger, events)
    }

    pub fn update_status(&self, cmd: UpdateStatus) -> Result<InventoryRecord, ServiceError> {
        let record_id = cmd.record_id;
        let mut ledger = lock(&self.ledger, "ledger")?;
        let events = ledger.update_status(cmd).inspect_err(|e| {
            tracing::warn!(record_id = %record_id, error = %e, kind = e.kind(), "update_status rejected")
        })?;

        self.commit(&ledger, events)?;
        let record = current_record(&ledger, record_id)?;
        tracing::info!(record_id = %record_id, status = %record.status, "record status updated");
        Ok(record)
    }

    pub fn correct_quantity(&self, cmd: CorrectQuantity) -> Result<InventoryRecord, ServiceError> {
        let record_id = cmd.record_id;
        let mut ledger = lock(&self.ledger, "ledger")?;
        let events = ledger.correct_quantity(cmd).inspect_err(|e| {
            tracing::warn!(record_id = %record_id, error = %e, kind = e.kind(), "correct_quantity rejected")
        })?;

        self.commit(&ledger, events)?;
        let record = current_record(&ledger, record_id)?;
        tracing::info!(record_id = %record_id, quantity = record.quantity, "record quantity corrected");
        Ok(record)
    }

    /// Journal and broadcast events that were just applied to `ledger`.
    ///
    /// Called with the ledger guard held so journal order matches apply order.
    fn commit(
        &self,
        ledger: &InventoryLedger,
        events: Vec<LedgerEvent>,
    ) -> Result<Vec<EventEnvelope<LedgerEvent>>, ServiceError> {
        let envelopes = lock(&self.journal, "journal")?.append(events);

        for envelope in &envelopes {
            let payload = serde_json::json!({
                "sequence_number": envelope.sequence_number(),
                "ledger_version": ledger.version(),
                "event": envelope.payload(),
            });
            // Lossy; no subscribers is fine.
            let _ = self.realtime_tx.send(RealtimeMessage {
                topic: envelope.event_type().to_string(),
                payload,
            });
        }

        Ok(envelopes)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Ledger queries
    // ─────────────────────────────────────────────────────────────────────

    pub fn records(&self, filter: &RecordFilter) -> Result<Vec<InventoryRecord>, ServiceError> {
        let ledger = lock(&self.ledger, "ledger")?;
        let code = filter.code.as_deref().map(str::trim);
        Ok(ledger
            .records()
            .iter()
            .filter(|r| filter.status.is_none_or(|s| r.status == s))
            .filter(|r| code.is_none_or(|c| r.code == c))
            .cloned()
            .collect())
    }

    pub fn record(&self, id: RecordId) -> Result<InventoryRecord, ServiceError> {
        let ledger = lock(&self.ledger, "ledger")?;
        current_record(&ledger, id)
    }

    pub fn prints(&self) -> Result<Vec<Print>, ServiceError> {
        Ok(lock(&self.ledger, "ledger")?.prints().to_vec())
    }

    /// Catalog entry plus its in-process and total quantities.
    pub fn print_summary(&self, code: &str) -> Result<(Print, u64, u64), ServiceError> {
        let ledger = lock(&self.ledger, "ledger")?;
        let print = ledger
            .print(code)
            .cloned()
            .ok_or_else(|| LedgerError::PrintNotFound(code.trim().to_string()))?;
        Ok((
            print,
            ledger.in_process_quantity(code),
            ledger.total_quantity(code),
        ))
    }

    pub fn stats(&self) -> Result<InventoryStats, ServiceError> {
        Ok(lock(&self.ledger, "ledger")?.stats())
    }

    pub fn events_since(&self, after: u64) -> Result<Vec<EventEnvelope<LedgerEvent>>, ServiceError> {
        Ok(lock(&self.journal, "journal")?.since(after).to_vec())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Batches
    // ─────────────────────────────────────────────────────────────────────

    pub fn batches(&self) -> Result<Vec<BatchDefinition>, ServiceError> {
        Ok(lock(&self.batches, "batches")?.list().cloned().collect())
    }

    pub fn define_batch(&self, batch: BatchDefinition) -> Result<BatchDefinition, ServiceError> {
        let mut batches = lock(&self.batches, "batches")?;
        batches.define(batch.clone())?;
        tracing::info!(batch = %batch.code, entries = batch.entries.len(), "batch defined");
        Ok(batch)
    }

    pub fn remove_batch(&self, code: &str) -> Result<BatchDefinition, ServiceError> {
        let removed = lock(&self.batches, "batches")?.remove(code)?;
        tracing::info!(batch = %removed.code, "batch removed");
        Ok(removed)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Users & sessions
    // ─────────────────────────────────────────────────────────────────────

    /// Verify credentials and mint a bearer token.
    ///
    /// The users lock is only held to read the stored hash and to stamp
    /// `last_login`; argon2 verification runs on a blocking thread.
    pub async fn login(&self, username: &str, password: &str) -> Result<(String, User), ServiceError> {
        let (user_id, hash) = lock(&self.users, "users")?
            .login_candidate(username, password)
            .inspect_err(|e| tracing::info!(username, error = %e, "login rejected"))?;

        let password = password.to_string();
        let is_valid = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
            .await
            .map_err(|e| ServiceError::Blocking(format!("password verification: {e}")))??;
        if !is_valid {
            tracing::info!(username, "login rejected: bad password");
            return Err(AuthError::InvalidCredentials.into());
        }

        let now = Utc::now();
        // The account may have been removed while the hash was checked.
        let user = lock(&self.users, "users")?
            .record_login(user_id, now)
            .map_err(|_| AuthError::InvalidCredentials)?;

        let token = self.issuer.issue(&user, now)?;
        tracing::info!(username = %user.username, role = %user.role, "login");
        Ok((token, user))
    }

    pub fn token_ttl_seconds(&self) -> i64 {
        self.issuer.ttl().num_seconds()
    }

    /// The live account behind a token subject, if it still exists.
    pub fn user(&self, id: UserId) -> Result<Option<User>, ServiceError> {
        Ok(lock(&self.users, "users")?.get(id).cloned())
    }

    pub fn users(&self) -> Result<Vec<User>, ServiceError> {
        Ok(lock(&self.users, "users")?.list().to_vec())
    }

    pub async fn add_user(&self, new_user: NewUser) -> Result<User, ServiceError> {
        let params = {
            let users = lock(&self.users, "users")?;
            users.check_new_user(&new_user)?;
            users.params()
        };

        let password_hash = {
            let new_user = new_user.clone();
            tokio::task::spawn_blocking(move || hash_new_password(&new_user, params))
                .await
                .map_err(|e| ServiceError::Blocking(format!("password hashing: {e}")))??
        };

        let user = lock(&self.users, "users")?
            .insert_hashed(new_user, password_hash, Utc::now())?
            .clone();
        tracing::info!(username = %user.username, role = %user.role, "user added");
        Ok(user)
    }

    pub fn remove_user(&self, id: UserId) -> Result<User, ServiceError> {
        let removed = lock(&self.users, "users")?.remove(id)?;
        tracing::info!(username = %removed.username, "user removed");
        Ok(removed)
    }
}

fn current_record(ledger: &InventoryLedger, id: RecordId) -> Result<InventoryRecord, ServiceError> {
    ledger
        .record(id)
        .cloned()
        .ok_or(ServiceError::Ledger(LedgerError::RecordNotFound(id)))
}

fn log_rejection(operation: &'static str, code: &str, err: &LedgerError) {
    match err.root() {
        LedgerError::InsufficientQuantity {
            requested,
            available,
            ..
        } => tracing::warn!(
            operation,
            code,
            requested,
            available,
            kind = err.kind(),
            "ledger command rejected"
        ),
        _ => tracing::warn!(operation, code, error = %err, kind = err.kind(), "ledger command rejected"),
    }
}

pub fn ledger_sse_stream(
    services: Arc<AppServices>,
) -> Sse<impl tokio_stream::Stream<Item = Result<SseEvent, Infallible>>> {
    let rx = services.realtime_tx().subscribe();
    let stream = BroadcastStream::new(rx).filter_map(|msg| match msg {
        Ok(m) => {
            let data = serde_json::to_string(&m.payload).unwrap_or_else(|_| "{}".to_string());
            Some(Ok(SseEvent::default().event(m.topic).data(data)))
        }
        // Lagged receivers skip ahead; clients resync through `/events`.
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}
