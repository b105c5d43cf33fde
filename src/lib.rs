//! # ecash-sheet
//!
//! Batch-generate a printable PDF sheet of physical ecash notes. Each note
//! carries a QR code encoding one redeemable token string.
//!
//! ## Pipeline Overview
//!
//! ```text
//! tokens.txt
//!  │
//!  ├─ 1. Tokens    one token per non-blank line, order preserved
//!  ├─ 2. Artifacts qrencode → magick (transparency, optional centre icon)
//!  ├─ 3. Layout    LaTeX document: front/back page pairs, cut guides
//!  └─ 4. Render    pdflatex × 2, move PDF into place, drop .aux/.log
//! ```
//!
//! Front pages anchor notes from the top-left corner; back pages anchor from
//! the top-right so a sheet printed duplex and flipped horizontally lines up.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ecash_sheet::{generate, GenerationConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = GenerationConfig::builder()
//!         .front_image("front.png")
//!         .back_image("back.png")
//!         .output("notes.pdf")
//!         .build()?;
//!     let report = generate("tokens.txt", &config).await?;
//!     eprintln!("{} notes on {} sheets", report.artifacts.len(), report.page_pairs);
//!     Ok(())
//! }
//! ```
//!
//! ## External tools
//!
//! | Tool       | Used for                                   |
//! |------------|--------------------------------------------|
//! | `qrencode` | token → PNG QR code on stdout              |
//! | `magick`   | white → transparent, icon resize/composite |
//! | `pdflatex` | layout document → PDF                      |
//!
//! Every invocation goes through the [`ToolRunner`] trait, so the pipeline
//! can be driven by something other than real processes.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `ecash-sheet` binary (clap + anyhow + indicatif + tracing-subscriber) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod generate;
pub mod output;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    EcLevel, GenerationConfig, GenerationConfigBuilder, LayoutConfig, Length, LengthUnit,
    ToolPaths,
};
pub use error::{ArtifactError, CashNoteError};
pub use generate::{generate, generate_sync, generate_with_runner};
pub use output::{Artifact, GenerationOutput, GenerationStats};
pub use pipeline::tool::{SystemToolRunner, ToolInvocation, ToolOutput, ToolRunner};
pub use progress::{GenerationProgressCallback, NoopProgressCallback, ProgressCallback};
