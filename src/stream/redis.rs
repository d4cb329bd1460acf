//! Redis streams implementation of [`MessageLog`]

use super::{MessageLog, StreamMessage};
use crate::error::{BotError, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use redis::aio::ConnectionManager;
use redis::streams::{StreamReadOptions, StreamReadReply};
use redis::{AsyncCommands, RedisResult};
use tracing::{debug, info};

/// Stream access over two managed connections: blocking group reads get
/// their own so they never stall acks and appends.
pub struct RedisStreamLog {
    reader: RwLock<Option<ConnectionManager>>,
    writer: RwLock<Option<ConnectionManager>>,
}

impl RedisStreamLog {
    pub async fn connect(redis_url: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| BotError::Config(format!("Invalid Redis URL: {}", e)))?;

        let reader = ConnectionManager::new(client.clone()).await?;
        let writer = ConnectionManager::new(client).await?;
        info!("Connected to Redis stream log");

        Ok(Self {
            reader: RwLock::new(Some(reader)),
            writer: RwLock::new(Some(writer)),
        })
    }

    fn reader(&self) -> Result<ConnectionManager> {
        self.reader
            .read()
            .clone()
            .ok_or_else(|| BotError::Stream("log connection is closed".into()))
    }

    fn writer(&self) -> Result<ConnectionManager> {
        self.writer
            .read()
            .clone()
            .ok_or_else(|| BotError::Stream("log connection is closed".into()))
    }
}

#[async_trait]
impl MessageLog for RedisStreamLog {
    async fn create_group(&self, stream: &str, group: &str, start_id: &str) -> Result<()> {
        let mut conn = self.writer()?;
        let created: RedisResult<()> = conn.xgroup_create_mkstream(stream, group, start_id).await;

        match created {
            Ok(()) => {
                info!("Created consumer group {} on {}", group, stream);
                Ok(())
            }
            Err(e) if e.code() == Some("BUSYGROUP") => {
                debug!("Consumer group {} already exists on {}", group, stream);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
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
        let mut conn = self.reader()?;

        let mut opts = StreamReadOptions::default().group(group, consumer).count(count);
        if let Some(ms) = block_ms {
            opts = opts.block(ms as usize);
        }

        let reply: Option<StreamReadReply> = conn.xread_options(&[stream], &[start], &opts).await?;

        let messages = reply
            .map(|reply| {
                reply
                    .keys
                    .into_iter()
                    .flat_map(|key| key.ids)
                    .map(|entry| {
                        let fields = entry
                            .map
                            .iter()
                            .filter_map(|(k, v)| {
                                redis::from_redis_value::<String>(v).ok().map(|s| (k.clone(), s))
                            })
                            .collect();
                        StreamMessage::new(entry.id, fields)
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(messages)
    }

    async fn ack(&self, stream: &str, group: &str, id: &str) -> Result<()> {
        let mut conn = self.writer()?;
        let _acked: i64 = conn.xack(stream, group, &[id]).await?;
        Ok(())
    }

    async fn append(&self, stream: &str, fields: &[(String, String)]) -> Result<String> {
        let mut conn = self.writer()?;
        let id: String = conn.xadd(stream, "*", fields).await?;
        Ok(id)
    }

    async fn close(&self) -> Result<()> {
        self.reader.write().take();
        self.writer.write().take();
        info!("Redis stream log closed");
        Ok(())
    }
}
