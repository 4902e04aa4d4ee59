use gpt_gulp_schemas::{Conversation, Timestamp};
use gpt_gulp_vault::{ExportOutcome, VaultExporter};
use std::collections::BTreeSet;
use tempfile::TempDir;

fn enriched(id: &str, topic: &str) -> Conversation {
    let mut conversation = Conversation::raw(
        id,
        "claude_ai",
        Timestamp::parse("2024-01-01T10:00:00"),
        "Demo conversation",
        "User: show me a demo\nAssistant: here it is",
    );
    conversation.topic = topic.to_string();
    conversation.summary = "A demo".to_string();
    conversation.project = "general".to_string();
    conversation.duration = "Unknown".to_string();
    conversation.tags = BTreeSet::from(["claude_ai".to_string(), "general".to_string()]);
    conversation.processed = true;
    conversation
}

/// Export into a missing vault is a silent no-op
#[test]
fn test_missing_vault_is_noop() {
    let temp = TempDir::new().unwrap();
    let vault = temp.path().join("does-not-exist");
    let exporter = VaultExporter::new(&vault, "AI Conversations");

    let outcome = exporter.export(&enriched("c1", "demo")).unwrap();

    assert_eq!(outcome, ExportOutcome::VaultMissing(vault.clone()));
    assert!(!vault.exists());
    assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 0);
}

/// Export creates the folder and writes the expected file name
#[test]
fn test_export_writes_note() {
    let vault = TempDir::new().unwrap();
    let exporter = VaultExporter::new(vault.path(), "AI Conversations");

    let outcome = exporter.export(&enriched("c1", "demo")).unwrap();

    let expected = vault
        .path()
        .join("AI Conversations")
        .join("2024-01-01_claude_ai_demo.md");
    assert_eq!(outcome, ExportOutcome::Written(expected.clone()));

    let note = std::fs::read_to_string(&expected).unwrap();
    assert!(note.starts_with("# Demo conversation\n"));
    assert!(note.contains("#claude_ai #general"));
    assert!(!note.contains("## Full Conversation"));
}

/// Re-exporting identical input leaves identical content
#[test]
fn test_export_is_idempotent() {
    let vault = TempDir::new().unwrap();
    let exporter = VaultExporter::new(vault.path(), "AI Conversations");
    let conversation = enriched("c1", "demo");

    let ExportOutcome::Written(path) = exporter.export(&conversation).unwrap() else {
        panic!("expected a written note");
    };
    let first = std::fs::read_to_string(&path).unwrap();

    exporter.export(&conversation).unwrap();
    let second = std::fs::read_to_string(&path).unwrap();

    assert_eq!(first, second);
    let files = std::fs::read_dir(vault.path().join("AI Conversations"))
        .unwrap()
        .count();
    assert_eq!(files, 1);
}

/// Two records with the same date, platform and topic share a file; the last one wins
#[test]
fn test_filename_collision_last_write_wins() {
    let vault = TempDir::new().unwrap();
    let exporter = VaultExporter::new(vault.path(), "AI Conversations");

    let first = enriched("c1", "demo");
    let mut second = enriched("c2", "demo");
    second.summary = "The second summary".to_string();

    exporter.export(&first).unwrap();
    let ExportOutcome::Written(path) = exporter.export(&second).unwrap() else {
        panic!("expected a written note");
    };

    let note = std::fs::read_to_string(path).unwrap();
    assert!(note.contains("The second summary"));
}

/// The transcript is included when either the record or the exporter asks for it
#[test]
fn test_full_conversation_flags() {
    let vault = TempDir::new().unwrap();

    let mut flagged = enriched("c1", "flagged");
    flagged.include_full_conversation = true;
    let plain = enriched("c2", "plain");

    let exporter = VaultExporter::new(vault.path(), "Notes");
    let ExportOutcome::Written(path) = exporter.export(&flagged).unwrap() else {
        panic!("expected a written note");
    };
    assert!(std::fs::read_to_string(path)
        .unwrap()
        .contains("## Full Conversation\nUser: show me a demo"));

    let ExportOutcome::Written(path) = exporter.export(&plain).unwrap() else {
        panic!("expected a written note");
    };
    assert!(!std::fs::read_to_string(&path).unwrap().contains("## Full Conversation"));

    let always = VaultExporter::new(vault.path(), "Notes").with_full_conversation(true);
    always.export(&plain).unwrap();
    assert!(std::fs::read_to_string(&path).unwrap().contains("## Full Conversation"));
}

/// Batch export counts outcomes without stopping on a bad record
#[test]
fn test_export_all_isolates_failures() {
    let vault = TempDir::new().unwrap();
    let exporter = VaultExporter::new(vault.path(), "AI Conversations");

    // A topic with a path separator points into a folder that does not exist
    let broken = enriched("bad", "missing-dir/nested");
    let conversations = vec![enriched("c1", "one"), broken, enriched("c2", "two")];

    let summary = exporter.export_all(&conversations);
    assert_eq!(summary.written, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.skipped, 0);
}
