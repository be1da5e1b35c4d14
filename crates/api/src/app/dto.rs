use serde::Deserialize;
use serde_json::json;

use printshop_auth::User;
use printshop_events::EventEnvelope;
use printshop_inventory::{
    BatchDefinition, InventoryRecord, InventoryStats, LedgerError, LedgerEvent, Print,
    parse_quantity,
};

// -------------------------
// Request DTOs
// -------------------------

/// A quantity as sent by clients: a JSON number, or the text typed into the
/// withdrawal form.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum QuantityInput {
    Number(serde_json::Number),
    Text(String),
}

impl QuantityInput {
    pub fn parse(&self) -> Result<u64, LedgerError> {
        match self {
            QuantityInput::Number(n) => parse_quantity(&n.to_string()),
            QuantityInput::Text(s) => parse_quantity(s),
        }
    }

    /// Like [`QuantityInput::parse`], but zero is allowed (emptying a lot).
    pub fn parse_correction(&self) -> Result<u64, LedgerError> {
        let raw = match self {
            QuantityInput::Number(n) => n.to_string(),
            QuantityInput::Text(s) => s.clone(),
        };
        match raw.trim().parse::<u64>() {
            Ok(0) => Ok(0),
            _ => parse_quantity(&raw),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterPrintRequest {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub image_url: Option<String>,
    pub quantity: QuantityInput,
    /// Initial lifecycle status; defaults to `pending`.
    pub status: Option<String>,
    /// Defaults to the authenticated username.
    pub operator: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WithdrawRequest {
    pub code: String,
    pub quantity: QuantityInput,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct CorrectQuantityRequest {
    pub quantity: QuantityInput,
}

#[derive(Debug, Deserialize)]
pub struct BatchEntryRequest {
    pub code: String,
    pub quantity: QuantityInput,
}

#[derive(Debug, Deserialize)]
pub struct DefineBatchRequest {
    pub code: String,
    #[serde(default)]
    pub name: String,
    pub entries: Vec<BatchEntryRequest>,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub role: String,
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RecordListQuery {
    pub status: Option<String>,
    pub code: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct EventListQuery {
    /// Only events with a sequence number greater than this.
    pub after: Option<u64>,
}

// -------------------------
// JSON mappers
// -------------------------

pub fn record_to_json(r: &InventoryRecord) -> serde_json::Value {
    json!({
        "id": r.id.to_string(),
        "code": r.code,
        "name": r.name,
        "description": r.description,
        "quantity": r.quantity,
        "status": r.status.as_str(),
        "entry_timestamp": r.entry_timestamp.to_rfc3339(),
        "exit_timestamp": r.exit_timestamp.map(|t| t.to_rfc3339()),
        "operator": r.operator,
    })
}

pub fn print_to_json(p: &Print) -> serde_json::Value {
    json!({
        "code": p.code,
        "name": p.name,
        "description": p.description,
        "image_url": p.image_url,
        "registered_at": p.registered_at.to_rfc3339(),
    })
}

pub fn batch_to_json(b: &BatchDefinition) -> serde_json::Value {
    json!({
        "code": b.code,
        "name": b.name,
        "total_quantity": b.total_quantity(),
        "entries": b.entries.iter().map(|e| json!({
            "code": e.code,
            "quantity": e.quantity,
        })).collect::<Vec<_>>(),
    })
}

pub fn user_to_json(u: &User) -> serde_json::Value {
    json!({
        "id": u.id.to_string(),
        "username": u.username,
        "role": u.role.as_str(),
        "last_login": u.last_login.map(|t| t.to_rfc3339()),
        "created_at": u.created_at.to_rfc3339(),
    })
}

pub fn stats_to_json(s: &InventoryStats) -> serde_json::Value {
    json!({
        "pending_items": s.pending_items,
        "in_process_items": s.in_process_items,
        "completed_items": s.completed_items,
        "total_items": s.total_items,
        "completion_percentage": s.completion_percentage,
    })
}

pub fn envelope_to_json(e: &EventEnvelope<LedgerEvent>) -> serde_json::Value {
    json!({
        "event_id": e.event_id().to_string(),
        "event_type": e.event_type(),
        "sequence_number": e.sequence_number(),
        "recorded_at": e.recorded_at().to_rfc3339(),
        "payload": e.payload(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quantity(raw: serde_json::Value) -> Result<u64, LedgerError> {
        serde_json::from_value::<QuantityInput>(raw).unwrap().parse()
    }

    #[test]
    fn quantity_accepts_numbers_and_numeric_text() {
        assert_eq!(quantity(json!(12)), Ok(12));
        assert_eq!(quantity(json!(" 7 ")), Ok(7));
    }

    #[test]
    fn corrections_may_zero_a_lot() {
        for raw in [json!(0), json!("0"), json!("00"), json!(" 0 ")] {
            let zero: QuantityInput = serde_json::from_value(raw.clone()).unwrap();
            assert_eq!(zero.parse_correction(), Ok(0), "input {raw}");
        }
        let padded: QuantityInput = serde_json::from_value(json!(" 08 ")).unwrap();
        assert_eq!(padded.parse_correction(), Ok(8));
        let negative: QuantityInput = serde_json::from_value(json!(-1)).unwrap();
        assert!(negative.parse_correction().is_err());
    }

    #[test]
    fn quantity_rejects_bad_input() {
        for raw in [json!(0), json!(-3), json!(2.5), json!(""), json!("abc")] {
            assert!(matches!(quantity(raw), Err(LedgerError::InvalidQuantity(_))));
        }
    }
}
