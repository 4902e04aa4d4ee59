//! VS Code conversation collector
//!
//! Watches VS Code data directories and forwards files that look like AI
//! chat transcripts to the ingestion worker.

use anyhow::{Context, Result};
use gpt_gulp_schemas::{generate_conversation_id, RawConversation, Timestamp};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

pub const VSCODE_PLATFORM: &str = "vscode";

const AI_PATH_INDICATORS: &[&str] = &[
    "copilot",
    "claude",
    "gpt",
    "ai",
    "assistant",
    "chat",
    "conversation",
    "history",
];
const MIN_CONTENT_CHARS: usize = 100;
const MAX_TITLE_CHARS: usize = 80;
const FALLBACK_TITLE: &str = "VS Code Conversation";

pub struct VsCodeCollector {
    watch_paths: Vec<PathBuf>,
    sender: mpsc::UnboundedSender<RawConversation>,
}

impl VsCodeCollector {
    /// An empty `watch_paths` means the platform's default VS Code directories
    pub fn new(watch_paths: Vec<PathBuf>, sender: mpsc::UnboundedSender<RawConversation>) -> Self {
        let watch_paths = if watch_paths.is_empty() {
            default_watch_paths()
        } else {
            watch_paths
        };
        Self {
            watch_paths,
            sender,
        }
    }

    pub fn watch_paths(&self) -> &[PathBuf] {
        &self.watch_paths
    }

    /// Watch until `shutdown` turns true; the watcher is dropped on return
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        let existing: Vec<&PathBuf> = self.watch_paths.iter().filter(|p| p.exists()).collect();
        if existing.is_empty() {
            warn!("No VS Code directories found to watch");
            return Ok(());
        }

        let (event_tx, mut event_rx) = mpsc::channel(100);
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                let _ = event_tx.blocking_send(res);
            },
            notify::Config::default(),
        )
        .context("Failed to create file watcher")?;

        for path in existing {
            match watcher.watch(path, RecursiveMode::Recursive) {
                Ok(()) => info!("Watching VS Code directory: {}", path.display()),
                Err(e) => error!("Failed to watch {}: {}", path.display(), e),
            }
        }

        loop {
            tokio::select! {
                Some(res) = event_rx.recv() => match res {
                    Ok(event) => {
                        self.handle_event(&event);
                    }
                    Err(e) => warn!("File watch error: {}", e),
                },
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        drop(watcher);
        info!("VS Code collector stopped");
        Ok(())
    }

    /// Forward every conversation-like file touched by a create or modify event
    pub fn handle_event(&self, event: &Event) -> usize {
        if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
            return 0;
        }

        let mut forwarded = 0;
        for path in &event.paths {
            if !path.is_file() || !is_conversation_file(path) {
                continue;
            }

            match read_conversation(path) {
                Ok(Some(raw)) => {
                    info!("Collected VS Code conversation: {}", raw.id);
                    if self.sender.send(raw).is_err() {
                        warn!("Ingestion channel closed, dropping {}", path.display());
                        continue;
                    }
                    forwarded += 1;
                }
                Ok(None) => debug!("Skipping short file {}", path.display()),
                Err(e) => error!("Error processing VS Code file {}: {}", path.display(), e),
            }
        }
        forwarded
    }
}

/// Directories VS Code keeps workspace state and logs in, for this OS
pub fn default_watch_paths() -> Vec<PathBuf> {
    let home = std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from);

    let base = if cfg!(target_os = "windows") {
        std::env::var_os("APPDATA").map(|appdata| PathBuf::from(appdata).join("Code"))
    } else if cfg!(target_os = "macos") {
        home.map(|h| h.join("Library").join("Application Support").join("Code"))
    } else {
        home.map(|h| h.join(".config").join("Code"))
    };

    match base {
        Some(base) => vec![base.join("User").join("workspaceStorage"), base.join("logs")],
        None => Vec::new(),
    }
}

/// Path mentions an AI assistant, chat, or history
pub fn is_conversation_file(path: &Path) -> bool {
    let lowered = path.to_string_lossy().to_lowercase();
    AI_PATH_INDICATORS
        .iter()
        .any(|indicator| lowered.contains(indicator))
}

/// Read a candidate file; `None` when it is too short to be a conversation
pub fn read_conversation(path: &Path) -> Result<Option<RawConversation>> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let content = String::from_utf8_lossy(&bytes).into_owned();

    if content.chars().count() < MIN_CONTENT_CHARS {
        return Ok(None);
    }

    Ok(Some(RawConversation {
        id: generate_conversation_id(VSCODE_PLATFORM),
        platform: VSCODE_PLATFORM.to_string(),
        timestamp: Timestamp::now(),
        title: Some(extract_title(&content)),
        raw_content: Some(content),
        source_file: Some(path.to_string_lossy().into_owned()),
        url: None,
    }))
}

/// First line of reasonable length, cut to 80 characters
pub fn extract_title(content: &str) -> String {
    for line in content.lines().map(str::trim) {
        let len = line.chars().count();
        if len > 10 && len < 100 {
            if len > MAX_TITLE_CHARS {
                let cut: String = line.chars().take(MAX_TITLE_CHARS).collect();
                return format!("{}...", cut);
            }
            return line.to_string();
        }
    }
    FALLBACK_TITLE.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, DataChange, ModifyKind, RemoveKind};
    use tempfile::TempDir;

    fn transcript() -> String {
        format!(
            "Copilot chat about parsers\nUser: how do I parse this?\n{}",
            "Assistant: use a tokenizer. ".repeat(5)
        )
    }

    #[test]
    fn test_is_conversation_file() {
        assert!(is_conversation_file(Path::new("/x/Code/logs/GitHub.Copilot-Chat/out.log")));
        assert!(is_conversation_file(Path::new("/x/state/CHAT_history.json")));
        assert!(!is_conversation_file(Path::new("/x/src/lib.rs")));
    }

    #[test]
    fn test_extract_title() {
        assert_eq!(extract_title("short\nA reasonable first line\nmore"), "A reasonable first line");
        assert_eq!(extract_title("tiny\n\nnope"), FALLBACK_TITLE);

        let long = "y".repeat(90);
        assert_eq!(extract_title(&long), format!("{}...", "y".repeat(80)));

        // Exactly 100 characters is not a title candidate
        assert_eq!(extract_title(&"z".repeat(100)), FALLBACK_TITLE);
    }

    #[test]
    fn test_read_conversation() {
        let temp = TempDir::new().unwrap();

        let short = temp.path().join("chat-short.json");
        std::fs::write(&short, "User: hi").unwrap();
        assert!(read_conversation(&short).unwrap().is_none());

        let full = temp.path().join("chat-full.json");
        std::fs::write(&full, transcript()).unwrap();
        let raw = read_conversation(&full).unwrap().unwrap();

        assert!(raw.id.0.starts_with("vscode_"));
        assert_eq!(raw.platform, "vscode");
        assert_eq!(raw.title.as_deref(), Some("Copilot chat about parsers"));
        assert_eq!(raw.source_file, Some(full.to_string_lossy().into_owned()));
        assert_eq!(raw.raw_content, Some(transcript()));
    }

    #[test]
    fn test_handle_event_forwards_modified_files() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("copilot-chat.json");
        std::fs::write(&path, transcript()).unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let collector = VsCodeCollector::new(vec![temp.path().to_path_buf()], tx);

        let modified = Event::new(EventKind::Modify(ModifyKind::Data(DataChange::Content)))
            .add_path(path.clone());
        assert_eq!(collector.handle_event(&modified), 1);

        let created = Event::new(EventKind::Create(CreateKind::File)).add_path(path.clone());
        assert_eq!(collector.handle_event(&created), 1);

        let removed = Event::new(EventKind::Remove(RemoveKind::File)).add_path(path.clone());
        assert_eq!(collector.handle_event(&removed), 0);

        let first = rx.try_recv().unwrap();
        let second = rx.try_recv().unwrap();
        assert_ne!(first.id, second.id);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_explicit_watch_paths_are_kept() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let collector = VsCodeCollector::new(vec![PathBuf::from("/custom/dir")], tx);
        assert_eq!(collector.watch_paths(), &[PathBuf::from("/custom/dir")]);
    }

    #[tokio::test]
    async fn test_run_without_directories_returns() {
        let temp = TempDir::new().unwrap();
        let (tx, _rx) = mpsc::unbounded_channel();
        let collector = VsCodeCollector::new(vec![temp.path().join("missing")], tx);

        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        collector.run(shutdown_rx).await.unwrap();
    }
}
