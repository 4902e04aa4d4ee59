use anyhow::Result;
use gpt_gulp_schemas::Conversation;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::templates::NoteRenderer;

#[derive(Debug, Error)]
pub enum VaultError {
    #[error("failed to create folder {path}: {source}")]
    CreateFolder {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write note {path}: {source}")]
    WriteNote {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// What an export call did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    /// Note written (or overwritten) at this path
    Written(PathBuf),
    /// The vault root does not exist; nothing was written
    VaultMissing(PathBuf),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportSummary {
    pub written: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Writes conversation notes into `vault_root/folder`
pub struct VaultExporter {
    vault_root: PathBuf,
    folder: String,
    include_full_conversation: bool,
    renderer: NoteRenderer,
}

impl VaultExporter {
    pub fn new(vault_root: impl Into<PathBuf>, folder: impl Into<String>) -> Self {
        Self {
            vault_root: vault_root.into(),
            folder: folder.into(),
            include_full_conversation: false,
            renderer: NoteRenderer::new(),
        }
    }

    /// Append the transcript to every note, not only flagged records
    pub fn with_full_conversation(mut self, include: bool) -> Self {
        self.include_full_conversation = include;
        self
    }

    pub fn vault_root(&self) -> &Path {
        &self.vault_root
    }

    pub fn target_folder(&self) -> PathBuf {
        self.vault_root.join(&self.folder)
    }

    /// Export one conversation.
    ///
    /// A missing vault root is reported as `ExportOutcome::VaultMissing`
    /// with a warning. An existing note with the same name is replaced.
    pub fn export(&self, conversation: &Conversation) -> Result<ExportOutcome> {
        if !self.vault_root.exists() {
            warn!("Obsidian vault not found: {}", self.vault_root.display());
            return Ok(ExportOutcome::VaultMissing(self.vault_root.clone()));
        }

        let folder = self.target_folder();
        fs::create_dir_all(&folder).map_err(|source| VaultError::CreateFolder {
            path: folder.clone(),
            source,
        })?;

        let path = folder.join(self.renderer.file_name(conversation));
        if path.exists() {
            debug!(
                "Overwriting existing note {} with conversation {}",
                path.display(),
                conversation.id
            );
        }

        let include_full = self.include_full_conversation || conversation.include_full_conversation;
        let content = self.renderer.render(conversation, include_full);

        fs::write(&path, content).map_err(|source| VaultError::WriteNote {
            path: path.clone(),
            source,
        })?;

        info!("Exported conversation to: {}", path.display());
        Ok(ExportOutcome::Written(path))
    }

    /// Export a batch; a failing record is logged and counted, never fatal
    pub fn export_all(&self, conversations: &[Conversation]) -> ExportSummary {
        let mut summary = ExportSummary::default();

        for conversation in conversations {
            match self.export(conversation) {
                Ok(ExportOutcome::Written(_)) => summary.written += 1,
                Ok(ExportOutcome::VaultMissing(_)) => summary.skipped += 1,
                Err(e) => {
                    error!("Failed to export conversation {}: {}", conversation.id, e);
                    summary.failed += 1;
                }
            }
        }

        summary
    }
}
