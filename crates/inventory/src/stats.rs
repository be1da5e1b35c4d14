use serde::{Deserialize, Serialize};

use crate::record::{InventoryRecord, RecordStatus};

/// Aggregate quantities across a record list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InventoryStats {
    pub pending_items: u64,
    pub in_process_items: u64,
    pub completed_items: u64,
    pub total_items: u64,
    /// `completed_items / total_items` as a rounded percentage (0 when empty).
    pub completion_percentage: u64,
}

/// Sum quantities per status. Pure; recompute on every read.
///
/// Sums saturate at `u64::MAX`; the percentage is computed from the
/// saturated figures.
pub fn compute_stats(records: &[InventoryRecord]) -> InventoryStats {
    let mut stats = InventoryStats::default();

    for record in records {
        let bucket = match record.status {
            RecordStatus::Pending => &mut stats.pending_items,
            RecordStatus::InProcess => &mut stats.in_process_items,
            RecordStatus::Completed => &mut stats.completed_items,
        };
        *bucket = bucket.saturating_add(record.quantity);
        stats.total_items = stats.total_items.saturating_add(record.quantity);
    }

    stats.completion_percentage = completion_percentage(stats.completed_items, stats.total_items);
    stats
}

/// Rounded half up, like the dashboard's percentage badge.
fn completion_percentage(completed: u64, total: u64) -> u64 {
    if total == 0 {
        return 0;
    }
    let (completed, total) = (u128::from(completed), u128::from(total));
    let pct = (completed * 100 + total / 2) / total;
    u64::try_from(pct).unwrap_or(100).min(100)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use printshop_core::RecordId;

    use super::*;

    fn record(quantity: u64, status: RecordStatus) -> InventoryRecord {
        InventoryRecord {
            id: RecordId::new(),
            code: "EST001".to_string(),
            name: "Floral".to_string(),
            description: String::new(),
            quantity,
            status,
            entry_timestamp: Utc::now(),
            exit_timestamp: None,
            operator: "admin".to_string(),
        }
    }

    #[test]
    fn empty_list_is_all_zero() {
        assert_eq!(compute_stats(&[]), InventoryStats::default());
    }

    #[test]
    fn sums_by_status() {
        let records = vec![
            record(6, RecordStatus::InProcess),
            record(4, RecordStatus::Completed),
            record(5, RecordStatus::Pending),
            record(3, RecordStatus::InProcess),
        ];

        let stats = compute_stats(&records);
        assert_eq!(stats.in_process_items, 9);
        assert_eq!(stats.completed_items, 4);
        assert_eq!(stats.pending_items, 5);
        assert_eq!(stats.total_items, 18);
        assert_eq!(stats.completion_percentage, 22);
    }

    #[test]
    fn percentage_rounds_half_up() {
        let records = vec![record(1, RecordStatus::Completed), record(7, RecordStatus::Pending)];
        // 12.5% -> 13%
        assert_eq!(compute_stats(&records).completion_percentage, 13);
    }

    #[test]
    fn huge_completed_lot_does_not_overflow_percentage() {
        let records = vec![
            record(200_000_000_000_000_000, RecordStatus::Completed),
            record(200_000_000_000_000_000, RecordStatus::Pending),
        ];

        let stats = compute_stats(&records);
        assert_eq!(stats.completed_items, 200_000_000_000_000_000);
        assert_eq!(stats.total_items, 400_000_000_000_000_000);
        assert_eq!(stats.completion_percentage, 50);
    }

    #[test]
    fn totals_saturate_near_u64_max() {
        let records = vec![
            record(u64::MAX, RecordStatus::InProcess),
            record(1, RecordStatus::InProcess),
            record(u64::MAX, RecordStatus::Completed),
        ];

        let stats = compute_stats(&records);
        assert_eq!(stats.in_process_items, u64::MAX);
        assert_eq!(stats.completed_items, u64::MAX);
        assert_eq!(stats.total_items, u64::MAX);
        assert_eq!(stats.completion_percentage, 100);
    }
}
