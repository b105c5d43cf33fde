//! Run report returned by [`crate::generate`].

use crate::config::EcLevel;
use crate::error::ArtifactError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One successfully generated QR artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    /// 1-based position of the token in the input list.
    pub index: usize,
    /// `<artifact_dir>/<prefix>_<index:04>.png`
    pub path: PathBuf,
}

/// Everything a caller may want to know after a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationOutput {
    /// Successful artifacts, in input order.
    pub artifacts: Vec<Artifact>,
    /// Tokens whose artifact could not be produced.
    pub failures: Vec<ArtifactError>,
    /// Where the LaTeX layout document was written.
    pub layout_path: PathBuf,
    /// Final PDF, or `None` when rendering was disabled.
    pub pdf_path: Option<PathBuf>,
    /// Number of front/back page pairs in the document.
    pub page_pairs: usize,
    /// Level passed to qrencode.
    pub error_correction: EcLevel,
    /// True when the level was raised to `H` because of the icon overlay.
    pub error_correction_upgraded: bool,
    pub stats: GenerationStats,
}

/// Counters and wall-clock timings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationStats {
    /// Non-blank tokens read from the input.
    pub total_tokens: usize,
    pub generated: usize,
    pub failed: usize,
    pub artifact_duration_ms: u64,
    /// Zero when rendering was disabled.
    pub render_duration_ms: u64,
    pub total_duration_ms: u64,
}
