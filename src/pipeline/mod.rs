//! Per-message pipeline
//!
//! envelope -> extract -> merge with cached record -> decide -> alert.
//! The cache read and write for one token are separate calls, so two
//! messages for the same address processed concurrently can lose one
//! writer's fields or under-count `alert`.


use crate::decision::{ChannelKind, DecisionEngine, TokenMetrics};
use crate::error::Result;
use crate::notify::{templates, AlertSink};
use crate::parser;
use crate::storage::{load_record, store_record, TokenArchive, TokenCache};
use crate::stream::{AlertEnvelope, MessageHandler, StreamMessage};
use crate::types::TokenRecord;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What happened to one alert
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Text carried no contract address
    NoAddress,
    /// Record merged and cached, verdict negative
    Skipped { ca: String },
    /// Verdict positive, alert sent
    Alerted { ca: String, kind: ChannelKind, alert: u32 },
}

pub struct AlertPipeline {
    cache: Arc<dyn TokenCache>,
    engine: DecisionEngine,
    sink: Arc<dyn AlertSink>,
    archive: Option<TokenArchive>,
}

impl AlertPipeline {
    pub fn new(cache: Arc<dyn TokenCache>, engine: DecisionEngine, sink: Arc<dyn AlertSink>) -> Self {
        Self {
            cache,
            engine,
            sink,
            archive: None,
        }
    }

    pub fn with_archive(mut self, archive: TokenArchive) -> Self {
        self.archive = Some(archive);
        self
    }

    /// Run one alert through the pipeline. Errors come from the cache only.
    pub async fn process(&self, envelope: &AlertEnvelope) -> Result<Outcome> {
        let fields = parser::extract(&envelope.payload);
        let Some(incoming) = TokenRecord::from_fields(&fields) else {
            debug!("[Pipeline] No contract address in {} alert", envelope.channel);
            return Ok(Outcome::NoAddress);
        };

        let mut record = match load_record(self.cache.as_ref(), &incoming.ca).await? {
            Some(mut cached) => {
                cached.merge(&fields);
                cached
            }
            None => incoming,
        };

        let metrics = TokenMetrics::from_record(&record);
        let decision = self.engine.decide(&envelope.channel, &envelope.child, &metrics);

        let kind = match decision.kind {
            Some(kind) if decision.actionable => kind,
            _ => {
                store_record(self.cache.as_ref(), &record).await?;
                debug!(
                    "[Pipeline] {} ({}) not actionable on {}/{}",
                    record.symbol(),
                    record.ca,
                    envelope.channel,
                    envelope.child
                );
                return Ok(Outcome::Skipped { ca: record.ca });
            }
        };

        let alert = record.bump_alert();
        store_record(self.cache.as_ref(), &record).await?;
        info!(
            "[Pipeline] {} alert #{} for {} ({})",
            kind.label(),
            alert,
            record.symbol(),
            record.ca
        );

        let text = templates::render(kind, &record);
        if let Err(e) = self.sink.send_text(&text).await {
            warn!("[Pipeline] Alert for {} not delivered: {}", record.ca, e);
        }

        if let Some(archive) = &self.archive {
            if let Err(e) = archive.upsert(&record, kind).await {
                warn!("[Pipeline] Archive write failed for {}: {}", record.ca, e);
            }
        }

        Ok(Outcome::Alerted {
            ca: record.ca,
            kind,
            alert,
        })
    }
}

#[async_trait]
impl MessageHandler for AlertPipeline {
    async fn handle(&self, message: &StreamMessage) -> Result<()> {
        let Some(envelope) = AlertEnvelope::from_message(message) else {
            warn!("[Pipeline] Entry {} has no channel or payload, skipping", message.id);
            return Ok(());
        };

        self.process(&envelope).await.map(|_| ())
    }
}
