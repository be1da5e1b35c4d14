use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Catalog entry for a stampable design.
///
/// Immutable once registered; `code` is unique within a ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Print {
    pub code: String,
    pub name: String,
    pub description: String,
    pub image_url: Option<String>,
    pub registered_at: DateTime<Utc>,
}
