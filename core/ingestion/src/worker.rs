use anyhow::Result;
use gpt_gulp_schemas::{Conversation, RawConversation};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, warn};

use crate::ConversationStore;

/// Background worker that persists raw conversations handed over by collectors
pub struct IngestionWorker {
    store: Arc<Mutex<ConversationStore>>,
    receiver: mpsc::UnboundedReceiver<RawConversation>,
}

impl IngestionWorker {
    pub fn new(
        store: Arc<Mutex<ConversationStore>>,
        receiver: mpsc::UnboundedReceiver<RawConversation>,
    ) -> Self {
        Self { store, receiver }
    }

    /// Runs until every sender is dropped
    pub async fn run(mut self) -> usize {
        info!("Ingestion worker started");
        let mut saved = 0;

        while let Some(raw) = self.receiver.recv().await {
            let id = raw.id.clone();
            match self.ingest(raw).await {
                Ok(()) => saved += 1,
                // One bad record must not stop the worker
                Err(e) => error!("Failed to save conversation {}: {}", id, e),
            }
        }

        warn!("Ingestion worker stopped - channel closed");
        saved
    }

    async fn ingest(&self, raw: RawConversation) -> Result<()> {
        let conversation = Conversation::from(raw);
        debug!(
            "Saving {} conversation {}",
            conversation.platform, conversation.id
        );

        let store = self.store.lock().await;
        store.save(&conversation)
    }
}
