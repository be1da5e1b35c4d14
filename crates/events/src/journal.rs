//! In-memory, append-only event journal.

use chrono::Utc;
use uuid::Uuid;

use crate::{Event, EventEnvelope};

/// Ordered log of the events emitted by one stream (e.g. one ledger).
///
/// - No IO
/// - Append-only; envelopes are never rewritten
/// - Sequence numbers are assigned on append
#[derive(Debug, Clone)]
pub struct Journal<E> {
    stream_id: Uuid,
    entries: Vec<EventEnvelope<E>>,
}

impl<E: Event> Journal<E> {
    pub fn new(stream_id: Uuid) -> Self {
        Self {
            stream_id,
            entries: Vec::new(),
        }
    }

    pub fn stream_id(&self) -> Uuid {
        self.stream_id
    }

    /// Wrap each event in an envelope and append it.
    ///
    /// Returns the newly appended envelopes, in order.
    pub fn append(&mut self, events: impl IntoIterator<Item = E>) -> Vec<EventEnvelope<E>> {
        let start = self.entries.len();
        for event in events {
            let sequence_number = self.entries.len() as u64 + 1;
            self.entries.push(EventEnvelope::new(
                Uuid::now_v7(),
                self.stream_id,
                event.event_type(),
                sequence_number,
                Utc::now(),
                event,
            ));
        }
        self.entries[start..].to_vec()
    }

    /// Envelopes with a sequence number strictly greater than `after`.
    pub fn since(&self, after: u64) -> &[EventEnvelope<E>] {
        // Sequence n lives at index n - 1.
        let start = usize::try_from(after).unwrap_or(usize::MAX).min(self.entries.len());
        &self.entries[start..]
    }

    pub fn last_sequence(&self) -> u64 {
        self.entries.len() as u64
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    #[derive(Debug, Clone)]
    struct Ping(DateTime<Utc>);

    impl Event for Ping {
        fn event_type(&self) -> &'static str {
            "test.ping"
        }

        fn version(&self) -> u32 {
            1
        }

        fn occurred_at(&self) -> DateTime<Utc> {
            self.0
        }
    }

    #[test]
    fn append_assigns_increasing_sequence_numbers() {
        let mut journal = Journal::new(Uuid::now_v7());
        let first = journal.append([Ping(Utc::now())]);
        let rest = journal.append([Ping(Utc::now()), Ping(Utc::now())]);

        assert_eq!(first[0].sequence_number(), 1);
        assert_eq!(
            rest.iter().map(|e| e.sequence_number()).collect::<Vec<_>>(),
            vec![2, 3]
        );
        assert_eq!(journal.last_sequence(), 3);
        assert!(rest.iter().all(|e| e.event_type() == "test.ping"));
    }

    #[test]
    fn since_skips_already_seen_entries() {
        let mut journal = Journal::new(Uuid::now_v7());
        journal.append([Ping(Utc::now()), Ping(Utc::now()), Ping(Utc::now())]);

        assert_eq!(journal.since(0).len(), 3);
        assert_eq!(journal.since(2)[0].sequence_number(), 3);
        assert!(journal.since(3).is_empty());
        assert!(journal.since(99).is_empty());
    }
}
