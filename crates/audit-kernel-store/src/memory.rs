//! In-memory store for tests and detached kernels.

use async_trait::async_trait;
use audit_kernel_core::{Event, RunId};
use tokio::sync::RwLock;

use crate::error::Result;
use crate::traits::{EventStore, RunIndex};

/// In-memory event store. Same semantics as the JSONL store minus
/// durability and blob offload.
pub struct MemoryStore {
    run_id: RunId,
    events: RwLock<Vec<Event>>,
}

impl MemoryStore {
    pub fn new(run_id: RunId) -> Self {
        Self {
            run_id,
            events: RwLock::new(Vec::new()),
        }
    }

    /// Number of events currently held.
    pub async fn len(&self) -> usize {
        self.events.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.events.read().await.is_empty()
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn append(&self, event: &Event) -> Result<()> {
        self.events.write().await.push(event.clone());
        Ok(())
    }

    async fn read_log(&self) -> Result<Vec<Event>> {
        Ok(self.events.read().await.clone())
    }

    async fn index(&self) -> Result<RunIndex> {
        let events = self.events.read().await;
        Ok(RunIndex {
            run_id: self.run_id.clone(),
            event_count: events.len(),
            started: events.first().map(|e| e.timestamp),
            finished: events.last().map(|e| e.timestamp),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use audit_kernel_core::{EventBuilder, EventPayload, RunStarted};

    fn started_event(seq: u64) -> Event {
        EventBuilder::new(RunId::new("mem-run"), seq)
            .timestamp(42 + seq as i64)
            .build(&EventPayload::RunStarted(RunStarted {
                name: "agent".into(),
                version: "0.1.0".into(),
            }))
            .unwrap()
    }

    #[tokio::test]
    async fn test_append_then_read() {
        let store = MemoryStore::new(RunId::new("mem-run"));
        let event = started_event(0);
        store.append(&event).await.unwrap();

        assert_eq!(store.read_log().await.unwrap(), vec![event]);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_index() {
        let store = MemoryStore::new(RunId::new("mem-run"));
        store.append(&started_event(0)).await.unwrap();
        store.append(&started_event(1)).await.unwrap();

        let index = store.index().await.unwrap();
        assert_eq!(index.event_count, 2);
        assert_eq!(index.started, Some(42));
        assert_eq!(index.finished, Some(43));
    }
}
