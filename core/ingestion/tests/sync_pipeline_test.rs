use gpt_gulp_ingestion::{
    ConversationStore, HeuristicEnricher, IngestionWorker, SyncWorker, TickReport,
};
use gpt_gulp_schemas::{ConversationId, RawConversation, Timestamp};
use gpt_gulp_vault::VaultExporter;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::{mpsc, Mutex};

const PORTFOLIO_CHAT: &str = "I need to build a portfolio site with html and css.
How do I deploy it to netlify?
- use `index.html` as entry
TODO: write the about page";

fn raw(id: &str, timestamp: &str, title: &str, content: &str) -> RawConversation {
    RawConversation {
        id: ConversationId::from(id),
        platform: "claude_ai".to_string(),
        timestamp: Timestamp::parse(timestamp),
        title: Some(title.to_string()),
        raw_content: Some(content.to_string()),
        source_file: None,
        url: None,
    }
}

/// Collector output flows through the store, the enricher and into the vault
#[tokio::test]
async fn test_collected_conversation_reaches_vault() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("storage").join("conversations.db");
    let vault = temp_dir.path().join("vault");
    std::fs::create_dir_all(&vault).unwrap();

    let store = Arc::new(Mutex::new(ConversationStore::open(&db_path).unwrap()));

    // Collectors hand raw records to the ingestion worker
    let (tx, rx) = mpsc::unbounded_channel();
    let ingestion = tokio::spawn(IngestionWorker::new(store.clone(), rx).run());
    tx.send(raw(
        "claude_1",
        "2024-01-01T10:00:00",
        "Portfolio site help",
        PORTFOLIO_CHAT,
    ))
    .unwrap();
    tx.send(raw("claude_2", "2024-01-02T08:30:00", "Hi", "ok"))
        .unwrap();
    drop(tx);
    assert_eq!(ingestion.await.unwrap(), 2);

    let stats = store.lock().await.get_stats().unwrap();
    assert_eq!(stats.total, 2);
    assert_eq!(stats.unprocessed, 2);

    let worker = SyncWorker::new(
        store.clone(),
        Arc::new(HeuristicEnricher::new()),
        VaultExporter::new(&vault, "AI Conversations"),
        Duration::from_secs(60),
    );
    let report = worker.tick().await.unwrap();
    assert_eq!(
        report,
        TickReport {
            fetched: 2,
            exported: 2,
            skipped_export: 0,
            failed: 0,
        }
    );

    let store = store.lock().await;
    let enriched = store
        .get(&ConversationId::from("claude_1"))
        .unwrap()
        .unwrap();
    assert!(enriched.processed);
    assert!(enriched.processed_at.is_some());
    assert_eq!(enriched.project, "portfolio");
    assert_eq!(enriched.topic, "Portfolio site help");
    assert_eq!(
        enriched.summary,
        "I need to build a portfolio site with html and css. How do I deploy it to netlify?"
    );
    assert_eq!(
        enriched.key_points,
        vec!["- use `index.html` as entry", "TODO: write the about page"]
    );
    for tag in ["claude_ai", "portfolio", "web", "deployment", "development", "help"] {
        assert!(enriched.tags.contains(tag), "missing tag {}", tag);
    }
    assert_eq!(enriched.resources.first().map(String::as_str), Some("index.html"));

    let note_path = vault
        .join("AI Conversations")
        .join("2024-01-01_claude_ai_Portfolio site help.md");
    let note = std::fs::read_to_string(&note_path).unwrap();
    assert!(note.starts_with("# Portfolio site help\n\n## Metadata\n"));
    assert!(note.contains("- **Project**: portfolio\n"));
    assert!(note.contains("- **Date**: 2024-01-01 10:00:00\n"));
    assert!(note.contains("- [[index.html]]\n"));

    // Short title and content fall back to the literal topic
    let short_note = vault
        .join("AI Conversations")
        .join("2024-01-02_claude_ai_conversation.md");
    assert!(short_note.exists());

    let stats = store.get_stats().unwrap();
    assert_eq!(stats.total, 2);
    assert_eq!(stats.processed, 2);
    assert_eq!(stats.unprocessed, 0);
    assert_eq!(stats.by_platform.get("claude_ai"), Some(&2));
    assert_eq!(stats.by_project.get("portfolio"), Some(&1));
    assert_eq!(stats.by_project.get("general"), Some(&1));
}

/// Re-saving an enriched record as raw makes it eligible again and the
/// re-export overwrites the same note
#[tokio::test]
async fn test_reprocessing_overwrites_note() {
    let temp_dir = TempDir::new().unwrap();
    let vault = temp_dir.path().join("vault");
    std::fs::create_dir_all(&vault).unwrap();

    let store = Arc::new(Mutex::new(
        ConversationStore::open(temp_dir.path().join("gulp.db")).unwrap(),
    ));
    let worker = SyncWorker::new(
        store.clone(),
        Arc::new(HeuristicEnricher::new()),
        VaultExporter::new(&vault, "AI Conversations"),
        Duration::from_secs(60),
    );

    let first = raw(
        "claude_1",
        "2024-01-01T10:00:00",
        "Portfolio site help",
        PORTFOLIO_CHAT,
    );
    store.lock().await.save(&first.clone().into()).unwrap();
    assert_eq!(worker.tick().await.unwrap().exported, 1);

    let mut revised = first;
    revised.raw_content = Some("How should the client business report be laid out?".to_string());
    store.lock().await.save(&revised.into()).unwrap();
    assert_eq!(worker.tick().await.unwrap().exported, 1);

    let folder = vault.join("AI Conversations");
    assert_eq!(std::fs::read_dir(&folder).unwrap().count(), 1);

    let note =
        std::fs::read_to_string(folder.join("2024-01-01_claude_ai_Portfolio site help.md"))
            .unwrap();
    assert!(note.contains("- **Project**: consulting\n"));
    assert_eq!(store.lock().await.count().unwrap(), 1);
}
