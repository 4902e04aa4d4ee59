pub mod exporter;
pub mod templates;

pub use exporter::{ExportOutcome, ExportSummary, VaultError, VaultExporter};
pub use templates::NoteRenderer;
