//! Consumer-group processor
//!
//! Reads batches from the log, runs the handler on at most `concurrency`
//! messages at a time and settles every delivered entry exactly once:
//! acknowledged on success, copied to `<key>:dlq` on failure.

use super::{fields, AlertEnvelope, MessageHandler, MessageLog, StreamConfig, StreamMessage};
use crate::error::{BotError, Result};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::Duration;
use tracing::{debug, error, info, warn};

/// Lifecycle of a processor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessorState {
    Uninitialized,
    Initialized,
    Processing,
    Stopped,
    Closed,
}

#[derive(Debug, Default)]
struct ProcessorStats {
    received: AtomicU64,
    acknowledged: AtomicU64,
    dead_lettered: AtomicU64,
    read_errors: AtomicU64,
    settle_errors: AtomicU64,
}

/// Counters since start
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessorSnapshot {
    pub received: u64,
    pub acknowledged: u64,
    pub dead_lettered: u64,
    pub read_errors: u64,
    /// Failed acks and dead-letter writes; the entry stays pending
    pub settle_errors: u64,
}

pub struct StreamProcessor {
    log: Arc<dyn MessageLog>,
    config: StreamConfig,
    state: RwLock<ProcessorState>,
    permits: Arc<Semaphore>,
    stats: ProcessorStats,
}

impl StreamProcessor {
    pub fn new(log: Arc<dyn MessageLog>, config: StreamConfig) -> Self {
        let permits = Arc::new(Semaphore::new(config.concurrency.max(1)));
        Self {
            log,
            config,
            state: RwLock::new(ProcessorState::Uninitialized),
            permits,
            stats: ProcessorStats::default(),
        }
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    pub fn state(&self) -> ProcessorState {
        *self.state.read()
    }

    pub fn is_processing(&self) -> bool {
        self.state() == ProcessorState::Processing
    }

    pub fn stats(&self) -> ProcessorSnapshot {
        ProcessorSnapshot {
            received: self.stats.received.load(Ordering::Relaxed),
            acknowledged: self.stats.acknowledged.load(Ordering::Relaxed),
            dead_lettered: self.stats.dead_lettered.load(Ordering::Relaxed),
            read_errors: self.stats.read_errors.load(Ordering::Relaxed),
            settle_errors: self.stats.settle_errors.load(Ordering::Relaxed),
        }
    }

    /// Create the consumer group (and the stream) if missing. Safe to call
    /// more than once.
    pub async fn initialize(&self) -> Result<()> {
        if self.state() == ProcessorState::Closed {
            return Err(BotError::Stream("processor is closed".into()));
        }

        self.log
            .create_group(&self.config.key, &self.config.group, "0")
            .await?;

        let mut state = self.state.write();
        if *state == ProcessorState::Uninitialized {
            *state = ProcessorState::Initialized;
        }
        info!(
            "[Stream] Ready: stream={}, group={}, consumer={}",
            self.config.key, self.config.group, self.config.consumer
        );
        Ok(())
    }

    /// Start the read loop in the background
    pub fn start_processing(self: &Arc<Self>, handler: Arc<dyn MessageHandler>) -> Result<JoinHandle<()>> {
        {
            let mut state = self.state.write();
            match *state {
                ProcessorState::Initialized | ProcessorState::Stopped => *state = ProcessorState::Processing,
                ProcessorState::Processing => {
                    return Err(BotError::Stream("processor is already running".into()))
                }
                ProcessorState::Uninitialized => {
                    return Err(BotError::Stream("processor is not initialized".into()))
                }
                ProcessorState::Closed => return Err(BotError::Stream("processor is closed".into())),
            }
        }

        info!(
            "[Stream] Processing started: batch={}, concurrency={}, block={}ms",
            self.config.batch_size, self.config.concurrency, self.config.block_ms
        );

        let processor = Arc::clone(self);
        Ok(tokio::spawn(async move {
            processor.run(handler).await;
        }))
    }

    /// Ask the read loop to exit after the current batch
    pub fn stop_processing(&self) {
        let mut state = self.state.write();
        if *state == ProcessorState::Processing {
            *state = ProcessorState::Stopped;
            info!("[Stream] Stopping");
        }
    }

    /// Stop and release the log connection
    pub async fn close(&self) -> Result<()> {
        self.stop_processing();
        if self.state() == ProcessorState::Closed {
            return Ok(());
        }
        *self.state.write() = ProcessorState::Closed;
        self.log.close().await?;
        info!("[Stream] Closed");
        Ok(())
    }

    /// Append an alert to the inbound stream
    pub async fn add_message(&self, envelope: &AlertEnvelope) -> Result<String> {
        let id = self.log.append(&self.config.key, &envelope.to_fields()).await?;
        debug!("[Stream] Appended {} to {}", id, self.config.key);
        Ok(id)
    }

    async fn run(self: Arc<Self>, handler: Arc<dyn MessageHandler>) {
        if self.config.recover_pending {
            self.recover_pending(&handler).await;
        }

        let retry_delay = Duration::from_millis(self.config.retry_delay_ms);

        while self.is_processing() {
            let read = self
                .log
                .read_group(
                    &self.config.key,
                    &self.config.group,
                    &self.config.consumer,
                    ">",
                    self.config.batch_size,
                    Some(self.config.block_ms),
                )
                .await;

            match read {
                Ok(batch) if batch.is_empty() => {}
                Ok(batch) => self.dispatch(batch, &handler).await,
                Err(e) => {
                    self.stats.read_errors.fetch_add(1, Ordering::Relaxed);
                    if !self.is_processing() {
                        break;
                    }
                    error!("[Stream] Read failed: {}", e);
                    tokio::time::sleep(retry_delay).await;
                }
            }

            tokio::task::yield_now().await;
        }

        info!("[Stream] Processing loop exited");
    }

    /// Re-run entries this consumer received before a restart but never
    /// settled
    async fn recover_pending(self: &Arc<Self>, handler: &Arc<dyn MessageHandler>) {
        let mut cursor = "0".to_string();

        while self.is_processing() {
            let read = self
                .log
                .read_group(
                    &self.config.key,
                    &self.config.group,
                    &self.config.consumer,
                    &cursor,
                    self.config.batch_size,
                    None,
                )
                .await;

            match read {
                Ok(batch) => {
                    let Some(last) = batch.last() else {
                        break;
                    };
                    cursor = last.id.clone();
                    info!("[Stream] Recovering {} pending entries", batch.len());
                    self.dispatch(batch, handler).await;
                }
                Err(e) => {
                    warn!("[Stream] Pending recovery skipped: {}", e);
                    break;
                }
            }
        }
    }

    /// Run one batch with bounded concurrency and wait for all of it
    async fn dispatch(self: &Arc<Self>, batch: Vec<StreamMessage>, handler: &Arc<dyn MessageHandler>) {
        debug!("[Stream] Dispatching {} messages", batch.len());
        let mut workers = JoinSet::new();

        for message in batch {
            let permit = match Arc::clone(&self.permits).acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    warn!("[Stream] Worker pool closed, leaving {} pending", message.id);
                    break;
                }
            };

            let processor = Arc::clone(self);
            let handler = Arc::clone(handler);
            workers.spawn(async move {
                processor.process(message, handler).await;
                drop(permit);
            });
        }

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                error!("[Stream] Worker task failed: {}", e);
            }
        }
    }

    async fn process(&self, message: StreamMessage, handler: Arc<dyn MessageHandler>) {
        self.stats.received.fetch_add(1, Ordering::Relaxed);

        // A panicking handler surfaces as a JoinError instead of taking the
        // worker down with the entry unsettled.
        let task_message = message.clone();
        let outcome = tokio::spawn(async move { handler.handle(&task_message).await })
            .await
            .unwrap_or_else(|e| Err(BotError::Internal(format!("handler task failed: {}", e))));

        match outcome {
            Ok(()) => self.acknowledge(&message).await,
            Err(e) => {
                warn!("[Stream] Message {} failed: {}", message.id, e);
                self.dead_letter(&message, &e).await;
            }
        }
    }

    async fn acknowledge(&self, message: &StreamMessage) {
        match self
            .log
            .ack(&self.config.key, &self.config.group, &message.id)
            .await
        {
            Ok(()) => {
                self.stats.acknowledged.fetch_add(1, Ordering::Relaxed);
                debug!("[Stream] Acked {}", message.id);
            }
            Err(e) => {
                self.stats.settle_errors.fetch_add(1, Ordering::Relaxed);
                error!("[Stream] Ack failed for {}: {}", message.id, e);
            }
        }
    }

    /// Copy a failed entry to the dead-letter stream. The original stays
    /// pending for the group.
    async fn dead_letter(&self, message: &StreamMessage, cause: &BotError) {
        let mut entry: Vec<(String, String)> = message
            .fields
            .iter()
            .filter(|(k, _)| k.as_str() != fields::ERROR && k.as_str() != fields::SOURCE_ID)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        entry.sort();
        entry.push((fields::ERROR.to_string(), cause.to_string()));
        entry.push((fields::SOURCE_ID.to_string(), message.id.clone()));

        let dlq = self.config.dead_letter_key();
        match self.log.append(&dlq, &entry).await {
            Ok(id) => {
                self.stats.dead_lettered.fetch_add(1, Ordering::Relaxed);
                info!("[Stream] Dead-lettered {} as {} on {}", message.id, id, dlq);
            }
            Err(e) => {
                self.stats.settle_errors.fetch_add(1, Ordering::Relaxed);
                error!("[Stream] Dead-letter write failed for {}: {}", message.id, e);
            }
        }
    }
}
