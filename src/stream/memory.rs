//! In-process [`MessageLog`] with consumer-group semantics, for tests and
//! dry runs

use super::{parse_entry_id, MessageLog, StreamMessage};
use crate::error::{BotError, Result};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Notify;

#[derive(Debug, Default)]
struct GroupState {
    /// Index of the first entry not yet delivered to the group
    next_index: usize,
    /// Delivered but unacknowledged: id -> (entry index, consumer)
    pending: BTreeMap<(u64, u64), (usize, String)>,
}

#[derive(Debug, Default)]
struct LogState {
    streams: HashMap<String, Vec<StreamMessage>>,
    groups: HashMap<(String, String), GroupState>,
    last_id: (u64, u64),
}

impl LogState {
    fn next_id(&mut self) -> (u64, u64) {
        let millis = u64::try_from(Utc::now().timestamp_millis()).unwrap_or_default();
        self.last_id = if millis > self.last_id.0 {
            (millis, 0)
        } else {
            (self.last_id.0, self.last_id.1 + 1)
        };
        self.last_id
    }
}

#[derive(Debug, Default)]
pub struct InMemoryLog {
    state: Mutex<LogState>,
    appended: Notify,
    closed: AtomicBool,
    failing_reads: AtomicUsize,
    failing_acks: AtomicUsize,
    /// stream -> remaining append failures
    failing_appends: Mutex<HashMap<String, usize>>,
}

impl InMemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// All entries of a stream in append order
    pub fn entries(&self, stream: &str) -> Vec<StreamMessage> {
        self.state
            .lock()
            .streams
            .get(stream)
            .cloned()
            .unwrap_or_default()
    }

    /// Ids delivered to `group` and not yet acknowledged
    pub fn pending(&self, stream: &str, group: &str) -> Vec<String> {
        let state = self.state.lock();
        let Some(group) = state.groups.get(&(stream.to_string(), group.to_string())) else {
            return Vec::new();
        };
        let entries = state.streams.get(stream);
        group
            .pending
            .values()
            .filter_map(|(index, _)| entries.and_then(|e| e.get(*index)).map(|m| m.id.clone()))
            .collect()
    }

    pub fn has_group(&self, stream: &str, group: &str) -> bool {
        self.state
            .lock()
            .groups
            .contains_key(&(stream.to_string(), group.to_string()))
    }

    /// Make the next `count` group reads fail
    pub fn fail_next_reads(&self, count: usize) {
        self.failing_reads.store(count, Ordering::SeqCst);
    }

    /// Make the next `count` acknowledgements fail
    pub fn fail_next_acks(&self, count: usize) {
        self.failing_acks.store(count, Ordering::SeqCst);
    }

    /// Make the next `count` appends to `stream` fail
    pub fn fail_next_appends(&self, stream: &str, count: usize) {
        self.failing_appends.lock().insert(stream.to_string(), count);
    }

    fn take_failure(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(BotError::Stream("log connection is closed".into()));
        }
        Ok(())
    }

    fn take_new(&self, stream: &str, group: &str, consumer: &str, count: usize) -> Result<Vec<StreamMessage>> {
        let mut state = self.state.lock();
        let LogState { streams, groups, .. } = &mut *state;

        let group_state = groups
            .get_mut(&(stream.to_string(), group.to_string()))
            .ok_or_else(|| BotError::Stream(format!("NOGROUP no such group {} on {}", group, stream)))?;
        let entries = streams.get(stream).map(Vec::as_slice).unwrap_or_default();

        let start = group_state.next_index;
        let mut delivered = Vec::new();
        for (index, message) in entries.iter().enumerate().skip(start).take(count) {
            if let Some(id) = parse_entry_id(&message.id) {
                group_state.pending.insert(id, (index, consumer.to_string()));
            }
            delivered.push(message.clone());
        }
        group_state.next_index = start + delivered.len();
        Ok(delivered)
    }

    fn take_pending(
        &self,
        stream: &str,
        group: &str,
        consumer: &str,
        after: &str,
        count: usize,
    ) -> Result<Vec<StreamMessage>> {
        let state = self.state.lock();
        let group_state = state
            .groups
            .get(&(stream.to_string(), group.to_string()))
            .ok_or_else(|| BotError::Stream(format!("NOGROUP no such group {} on {}", group, stream)))?;
        let entries = state.streams.get(stream).map(Vec::as_slice).unwrap_or_default();

        let after = if after == "0" {
            (0, 0)
        } else {
            parse_entry_id(after).ok_or_else(|| BotError::Stream(format!("invalid stream id {}", after)))?
        };

        Ok(group_state
            .pending
            .iter()
            .filter(|(id, (_, owner))| **id > after && owner == consumer)
            .take(count)
            .filter_map(|(_, (index, _))| entries.get(*index).cloned())
            .collect())
    }
}

#[async_trait]
impl MessageLog for InMemoryLog {
    async fn create_group(&self, stream: &str, group: &str, start_id: &str) -> Result<()> {
        self.ensure_open()?;
        let mut state = self.state.lock();
        let len = state.streams.entry(stream.to_string()).or_default().len();
        let next_index = if start_id == "$" { len } else { 0 };
        state
            .groups
            .entry((stream.to_string(), group.to_string()))
            .or_insert_with(|| GroupState {
                next_index,
                pending: BTreeMap::new(),
            });
        Ok(())
    }

    async fn read_group(
        &self,
        stream: &str,
        group: &str,
        consumer: &str,
        start: &str,
        count: usize,
        block_ms: Option<u64>,
    ) -> Result<Vec<StreamMessage>> {
        self.ensure_open()?;

        if Self::take_failure(&self.failing_reads) {
            return Err(BotError::Stream("injected read failure".into()));
        }

        if start != ">" {
            return self.take_pending(stream, group, consumer, start, count);
        }

        let appended = self.appended.notified();
        let batch = self.take_new(stream, group, consumer, count)?;
        if !batch.is_empty() {
            return Ok(batch);
        }

        let Some(ms) = block_ms else {
            return Ok(batch);
        };
        if tokio::time::timeout(Duration::from_millis(ms), appended).await.is_err() {
            return Ok(Vec::new());
        }
        self.ensure_open()?;
        self.take_new(stream, group, consumer, count)
    }

    async fn ack(&self, stream: &str, group: &str, id: &str) -> Result<()> {
        self.ensure_open()?;
        if Self::take_failure(&self.failing_acks) {
            return Err(BotError::Stream("injected ack failure".into()));
        }
        let Some(id) = parse_entry_id(id) else {
            return Err(BotError::Stream(format!("invalid stream id {}", id)));
        };
        if let Some(group) = self
            .state
            .lock()
            .groups
            .get_mut(&(stream.to_string(), group.to_string()))
        {
            group.pending.remove(&id);
        }
        Ok(())
    }

    async fn append(&self, stream: &str, fields: &[(String, String)]) -> Result<String> {
        self.ensure_open()?;
        if let Some(remaining) = self.failing_appends.lock().get_mut(stream).filter(|n| **n > 0) {
            *remaining -= 1;
            return Err(BotError::Stream(format!("injected append failure on {}", stream)));
        }
        let id = {
            let mut state = self.state.lock();
            let (millis, seq) = state.next_id();
            let id = format!("{}-{}", millis, seq);
            let message = StreamMessage::new(id.clone(), fields.iter().cloned().collect());
            state.streams.entry(stream.to_string()).or_default().push(message);
            id
        };
        self.appended.notify_waiters();
        Ok(id)
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        self.appended.notify_waiters();
        Ok(())
    }
}
