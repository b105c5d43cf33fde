//! Error types for the ecash-sheet library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`CashNoteError`]: **Fatal**: the run cannot proceed (input list
//!   missing, icon missing, nothing generated, pdflatex failed). Returned as
//!   `Err(CashNoteError)` from the top-level `generate*` functions.
//!
//! * [`ArtifactError`]: **Non-fatal**: one token's QR artifact could not be
//!   produced, but the other notes are fine. Collected in
//!   [`crate::output::GenerationOutput::failures`]; the batch only fails when
//!   no token at all succeeded.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the ecash-sheet library.
///
/// Per-token failures use [`ArtifactError`] and are collected rather than
/// propagated here.
#[derive(Debug, Error)]
pub enum CashNoteError {
    // ── Pre-flight errors ─────────────────────────────────────────────────
    /// The token list was not found at the given path.
    #[error("Token list not found: '{path}'\nCheck the path exists and is readable.")]
    InputNotFound { path: PathBuf },

    /// An icon overlay was requested but the icon file does not exist.
    #[error("Icon file not found: '{path}'")]
    IconNotFound { path: PathBuf },

    /// The token list exists but could not be read.
    #[error("Failed to read token list '{path}': {source}")]
    InputReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Batch errors ──────────────────────────────────────────────────────
    /// Every token failed; there is nothing to lay out.
    #[error("No QR codes were generated successfully ({total} tokens attempted).\nFirst error: {first_error}")]
    NoArtifactsProduced { total: usize, first_error: String },

    // ── Render errors ─────────────────────────────────────────────────────
    /// pdflatex exited non-zero (or could not be started) on the given pass.
    #[error("LaTeX compilation failed on pass {pass}:\n{diagnostic}")]
    RenderFailed { pass: u8, diagnostic: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create the artifact working directory.
    #[error("Failed to create working directory '{path}': {source}")]
    WorkDirFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not write the layout document or move the PDF into place.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A length string such as `7cm` could not be parsed.
    #[error("Invalid length '{0}': expected a number followed by cm, mm, in, pt or bp")]
    InvalidLength(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single token.
///
/// `index` is the 1-based position of the token in the input list, which is
/// also the number in the artifact's file name.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum ArtifactError {
    /// `qrencode` failed or produced no image.
    #[error("Note {index}: QR encoding failed: {detail}")]
    EncodeFailed { index: usize, detail: String },

    /// `magick` could not strip the background to transparency.
    #[error("Note {index}: transparency pass failed: {detail}")]
    TransparencyFailed { index: usize, detail: String },

    /// Measuring, resizing or compositing the centre icon failed.
    #[error("Note {index}: icon overlay failed: {detail}")]
    IconOverlayFailed { index: usize, detail: String },
}

impl ArtifactError {
    /// 1-based input position of the token that failed.
    pub fn index(&self) -> usize {
        match self {
            ArtifactError::EncodeFailed { index, .. }
            | ArtifactError::TransparencyFailed { index, .. }
            | ArtifactError::IconOverlayFailed { index, .. } => *index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_artifacts_display() {
        let e = CashNoteError::NoArtifactsProduced {
            total: 7,
            first_error: "qrencode: command not found".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("7 tokens"), "got: {msg}");
        assert!(msg.contains("command not found"));
    }

    #[test]
    fn render_failed_carries_diagnostic() {
        let e = CashNoteError::RenderFailed {
            pass: 2,
            diagnostic: "! Undefined control sequence.".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("pass 2"));
        assert!(msg.contains("Undefined control sequence"));
    }

    #[test]
    fn input_not_found_names_path() {
        let e = CashNoteError::InputNotFound {
            path: PathBuf::from("notes.csv"),
        };
        assert!(e.to_string().contains("notes.csv"));
    }

    #[test]
    fn artifact_error_index() {
        let e = ArtifactError::TransparencyFailed {
            index: 12,
            detail: "magick: no decode delegate".into(),
        };
        assert_eq!(e.index(), 12);
        assert!(e.to_string().starts_with("Note 12:"));
    }

    #[test]
    fn artifact_error_serialises() {
        let e = ArtifactError::EncodeFailed {
            index: 3,
            detail: "exit status 1".into(),
        };
        let json = serde_json::to_string(&e).expect("serialise");
        assert!(json.contains("EncodeFailed"));
        assert!(json.contains("\"index\":3"));
    }
}
