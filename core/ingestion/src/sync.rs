use anyhow::Result;
use gpt_gulp_schemas::Conversation;
use gpt_gulp_vault::{ExportOutcome, VaultExporter};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::{ConversationProcessor, ConversationStore, GulpError};

/// Counters for one pass over the unprocessed backlog
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Unprocessed rows read at the start of the tick
    pub fetched: usize,
    /// Enriched, saved and written to the vault
    pub exported: usize,
    /// Enriched and saved, but the vault was missing
    pub skipped_export: usize,
    /// Failed to enrich, save or export; left for a later tick
    pub failed: usize,
}

const MIN_INTERVAL: Duration = Duration::from_secs(1);

/// Periodically enriches unprocessed conversations and exports them to the vault
pub struct SyncWorker {
    store: Arc<Mutex<ConversationStore>>,
    processor: Arc<dyn ConversationProcessor>,
    exporter: VaultExporter,
    interval: Duration,
}

impl SyncWorker {
    /// `interval` is raised to at least one second
    pub fn new(
        store: Arc<Mutex<ConversationStore>>,
        processor: Arc<dyn ConversationProcessor>,
        exporter: VaultExporter,
        interval: Duration,
    ) -> Self {
        Self {
            store,
            processor,
            exporter,
            interval: interval.max(MIN_INTERVAL),
        }
    }

    /// Process every unprocessed record once.
    ///
    /// Only the initial fetch can fail the tick; per-record failures are
    /// logged and counted.
    pub async fn tick(&self) -> Result<TickReport> {
        let pending = {
            let store = self.store.lock().await;
            store.get_unprocessed()?
        };

        let mut report = TickReport {
            fetched: pending.len(),
            ..TickReport::default()
        };

        if pending.is_empty() {
            debug!("No unprocessed conversations");
            return Ok(report);
        }

        info!("Processing {} unprocessed conversations", pending.len());

        for conversation in &pending {
            match self.sync_one(conversation).await {
                Ok(ExportOutcome::Written(_)) => report.exported += 1,
                Ok(ExportOutcome::VaultMissing(_)) => report.skipped_export += 1,
                Err(e) => {
                    error!("Error processing conversation {}: {}", conversation.id, e);
                    report.failed += 1;
                }
            }
        }

        info!(
            "Sync tick finished: {} exported, {} not exported, {} failed",
            report.exported, report.skipped_export, report.failed
        );
        Ok(report)
    }

    async fn sync_one(&self, conversation: &Conversation) -> Result<ExportOutcome> {
        let enriched = self
            .processor
            .process(conversation)
            .map_err(|e| GulpError::Extraction {
                id: conversation.id.to_string(),
                reason: e.to_string(),
            })?;

        {
            let store = self.store.lock().await;
            store.save(&enriched)?;
        }

        self.exporter.export(&enriched)
    }

    /// Tick immediately, then once per interval until `shutdown` turns true
    /// or its sender is dropped
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(
            "Sync worker started (interval: {}s)",
            self.interval.as_secs()
        );

        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.tick().await {
                        error!("Sync tick failed: {}", e);
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        warn!("Sync worker stopped");
    }
}
