//! Durable message log consumption
//!
//! Alerts arrive as entries on an append-only log (a Redis stream) and are
//! read through a consumer group, so every entry is either acknowledged or
//! copied to a dead-letter log:
//!
//! ```text
//! producer -> log -> StreamProcessor -> [bounded workers] -> MessageHandler
//!                          |                                     |
//!                          +-- ack on success / dead-letter on failure
//! ```

pub mod memory;
pub mod processor;
pub mod redis;


pub use self::memory::InMemoryLog;
pub use self::processor::{ProcessorSnapshot, ProcessorState, StreamProcessor};
pub use self::redis::RedisStreamLog;

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Envelope field names written by producers
pub mod fields {
    pub const CHANNEL: &str = "channel";
    pub const CHILD: &str = "child";
    pub const PAYLOAD: &str = "payload";
    pub const TIMESTAMP: &str = "timestamp";
    /// Dead-letter only
    pub const ERROR: &str = "error";
    /// Dead-letter only: id of the failed entry
    pub const SOURCE_ID: &str = "source_id";
}

/// One log entry as delivered to a consumer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamMessage {
    /// Log-assigned id, `<millis>-<sequence>`
    pub id: String,
    pub fields: HashMap<String, String>,
}

impl StreamMessage {
    pub fn new(id: impl Into<String>, fields: HashMap<String, String>) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Enqueue time encoded in the id
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        let (millis, _) = parse_entry_id(&self.id)?;
        DateTime::from_timestamp_millis(i64::try_from(millis).ok()?)
    }
}

/// Split a `<millis>-<sequence>` id
pub fn parse_entry_id(id: &str) -> Option<(u64, u64)> {
    let (millis, seq) = id.split_once('-')?;
    Some((millis.parse().ok()?, seq.parse().ok()?))
}

/// The inbound alert: which feed it came from and its raw text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertEnvelope {
    pub channel: String,
    /// Sub-channel / topic tag, empty when the feed has none
    #[serde(default)]
    pub child: String,
    pub payload: String,
    pub timestamp: String,
}

impl AlertEnvelope {
    pub fn new(channel: impl Into<String>, child: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            child: child.into(),
            payload: payload.into(),
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    /// Read the envelope fields of an entry. `None` when channel or payload
    /// is missing.
    pub fn from_message(message: &StreamMessage) -> Option<Self> {
        Some(Self {
            channel: message.field(fields::CHANNEL)?.to_string(),
            child: message.field(fields::CHILD).unwrap_or_default().to_string(),
            payload: message.field(fields::PAYLOAD)?.to_string(),
            timestamp: message.field(fields::TIMESTAMP).unwrap_or_default().to_string(),
        })
    }

    pub fn to_fields(&self) -> Vec<(String, String)> {
        vec![
            (fields::CHANNEL.to_string(), self.channel.clone()),
            (fields::CHILD.to_string(), self.child.clone()),
            (fields::PAYLOAD.to_string(), self.payload.clone()),
            (fields::TIMESTAMP.to_string(), self.timestamp.clone()),
        ]
    }
}

/// Append-only, replayable log with consumer groups
#[async_trait]
pub trait MessageLog: Send + Sync {
    /// Create `group` on `stream` starting at `start_id`. An existing group
    /// is not an error.
    async fn create_group(&self, stream: &str, group: &str, start_id: &str) -> Result<()>;

    /// Read up to `count` entries for `consumer`. `start` is `">"` for
    /// entries never delivered to the group, or an id to re-read this
    /// consumer's pending entries after it. Waits up to `block_ms` when
    /// nothing is available.
    async fn read_group(
        &self,
        stream: &str,
        group: &str,
        consumer: &str,
        start: &str,
        count: usize,
        block_ms: Option<u64>,
    ) -> Result<Vec<StreamMessage>>;

    /// Remove an entry from the group's pending list
    async fn ack(&self, stream: &str, group: &str, id: &str) -> Result<()>;

    /// Append an entry, returning its id
    async fn append(&self, stream: &str, fields: &[(String, String)]) -> Result<String>;

    /// Release the underlying connection
    async fn close(&self) -> Result<()>;
}

/// Per-message work driven by the processor
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// `Ok` acknowledges the entry, `Err` dead-letters it
    async fn handle(&self, message: &StreamMessage) -> Result<()>;
}

/// Consumer settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Stream holding inbound alerts; dead letters go to `<key>:dlq`
    pub key: String,
    pub group: String,
    pub consumer: String,
    /// Entries per read
    pub batch_size: usize,
    /// How long a read waits for new entries
    pub block_ms: u64,
    /// Messages in flight at once, independent of batch size
    pub concurrency: usize,
    /// Pause after a failed read
    pub retry_delay_ms: u64,
    /// Re-process this consumer's unacknowledged entries on start
    pub recover_pending: bool,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            key: "token_alerts".to_string(),
            group: "token_analysis".to_string(),
            consumer: "consumer-1".to_string(),
            batch_size: 10,
            block_ms: 2000,
            concurrency: 3,
            retry_delay_ms: 1000,
            recover_pending: true,
        }
    }
}

impl StreamConfig {
    pub fn dead_letter_key(&self) -> String {
        format!("{}:dlq", self.key)
    }
}
