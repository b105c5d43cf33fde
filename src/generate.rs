//! Sheet generation entry points.
//!
//! [`generate`] runs the whole pipeline against the real tools;
//! [`generate_with_runner`] takes any [`ToolRunner`], which is how the
//! integration tests drive it without qrencode, magick or pdflatex installed.

use crate::config::GenerationConfig;
use crate::error::{ArtifactError, CashNoteError};
use crate::output::{Artifact, GenerationOutput, GenerationStats};
use crate::pipeline::artifact::{self, ArtifactSettings, IconOverlay};
use crate::pipeline::tool::{SystemToolRunner, ToolRunner};
use crate::pipeline::{layout, render, tokens};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Generate the note sheet for the token list at `input`.
///
/// # Returns
/// `Ok(GenerationOutput)` on success, even if some tokens failed
/// (check `output.failures`).
///
/// # Errors
/// Returns `Err(CashNoteError)` only for fatal errors:
/// - token list or icon not found
/// - no artifact could be generated
/// - pdflatex failed
pub async fn generate(
    input: impl AsRef<Path>,
    config: &GenerationConfig,
) -> Result<GenerationOutput, CashNoteError> {
    generate_with_runner(input, config, &SystemToolRunner).await
}

/// [`generate`] with a caller-supplied tool runner.
pub async fn generate_with_runner<R: ToolRunner>(
    input: impl AsRef<Path>,
    config: &GenerationConfig,
    runner: &R,
) -> Result<GenerationOutput, CashNoteError> {
    let total_start = Instant::now();
    let input = input.as_ref();
    info!("Reading notes from {}", input.display());

    // ── Step 1: Pre-flight ───────────────────────────────────────────────
    let tokens = tokens::load_tokens(input).await?;

    if let Some(ref icon) = config.icon {
        if !tokio::fs::try_exists(icon).await.unwrap_or(false) {
            return Err(CashNoteError::IconNotFound { path: icon.clone() });
        }
    }

    for (side, image) in [("Front", &config.front_image), ("Back", &config.back_image)] {
        if !tokio::fs::try_exists(image).await.unwrap_or(false) {
            let message = format!(
                "{side} image '{}' not found. Make sure it exists before running LaTeX.",
                image.display()
            );
            warn!("{message}");
            if let Some(ref cb) = config.progress_callback {
                cb.on_warning(&message);
            }
        }
    }

    let (error_correction, upgraded) = config.effective_error_correction();
    if upgraded {
        info!("Icon overlay requested: using error correction level H for maximum redundancy");
    }

    let total = tokens.len();
    if total == 0 {
        return Err(CashNoteError::NoArtifactsProduced {
            total: 0,
            first_error: format!("'{}' contains no tokens", input.display()),
        });
    }
    info!("Found {total} notes. Generating QR codes...");

    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_start(total);
    }

    // ── Step 2: Per-token artifacts ──────────────────────────────────────
    tokio::fs::create_dir_all(&config.artifact_dir)
        .await
        .map_err(|source| CashNoteError::WorkDirFailed {
            path: config.artifact_dir.clone(),
            source,
        })?;

    let settings = ArtifactSettings {
        work_dir: config.artifact_dir.clone(),
        prefix: config.artifact_prefix.clone(),
        error_correction,
        icon: config.icon.as_ref().map(|path| IconOverlay {
            path: path.clone(),
            size_percent: config.icon_size_percent,
        }),
        tools: config.tools.clone(),
    };

    let artifact_start = Instant::now();
    let (artifacts, failures) = generate_artifacts(runner, &settings, &tokens, config).await;
    let artifact_duration_ms = artifact_start.elapsed().as_millis() as u64;

    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_complete(total, artifacts.len());
    }

    if artifacts.is_empty() {
        let first_error = failures
            .first()
            .map(|e| e.to_string())
            .unwrap_or_else(|| "Unknown error".to_string());
        return Err(CashNoteError::NoArtifactsProduced { total, first_error });
    }
    info!("Generated {} QR codes successfully", artifacts.len());

    // ── Step 3: Layout document ──────────────────────────────────────────
    let paths: Vec<&Path> = artifacts.iter().map(|a| a.path.as_path()).collect();
    let document = layout::build_layout_document(
        &paths,
        &config.front_image,
        &config.back_image,
        &config.layout,
    );
    let page_pairs = layout::page_pair_count(artifacts.len(), config.layout.entries_per_page);

    write_layout(&config.layout_path, &document).await?;
    info!(
        "Layout document written: {} ({page_pairs} page pairs)",
        config.layout_path.display()
    );

    // ── Step 4: Render ───────────────────────────────────────────────────
    let render_start = Instant::now();
    let pdf_path = if config.render {
        if let Some(ref cb) = config.progress_callback {
            cb.on_render_start(&config.layout_path);
        }
        let output_dir = match config.layout_path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        info!("Compiling LaTeX to PDF: {}", config.output.display());
        Some(
            render::render_document(
                runner,
                &config.tools.pdflatex,
                &config.layout_path,
                output_dir,
                &config.output,
            )
            .await?,
        )
    } else {
        debug!("Rendering disabled; stopping after layout document");
        None
    };
    let render_duration_ms = if config.render {
        render_start.elapsed().as_millis() as u64
    } else {
        0
    };

    let stats = GenerationStats {
        total_tokens: total,
        generated: artifacts.len(),
        failed: failures.len(),
        artifact_duration_ms,
        render_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    info!(
        "Generation complete: {}/{} notes, {}ms total",
        stats.generated, total, stats.total_duration_ms
    );

    Ok(GenerationOutput {
        artifacts,
        failures,
        layout_path: config.layout_path.clone(),
        pdf_path,
        page_pairs,
        error_correction,
        error_correction_upgraded: upgraded,
        stats,
    })
}

/// Synchronous wrapper around [`generate`].
///
/// Creates a temporary tokio runtime internally.
pub fn generate_sync(
    input: impl AsRef<Path>,
    config: &GenerationConfig,
) -> Result<GenerationOutput, CashNoteError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| CashNoteError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(generate(input, config))
}

/// Run every token through the artifact stage, one at a time.
///
/// Successes and failures are collected separately; a failure never stops
/// the batch.
async fn generate_artifacts<R: ToolRunner>(
    runner: &R,
    settings: &ArtifactSettings,
    tokens: &[String],
    config: &GenerationConfig,
) -> (Vec<Artifact>, Vec<ArtifactError>) {
    let total = tokens.len();
    let mut artifacts = Vec::with_capacity(total);
    let mut failures = Vec::new();

    for (i, token) in tokens.iter().enumerate() {
        let index = i + 1;
        if let Some(ref cb) = config.progress_callback {
            cb.on_token_start(index, total);
        }
        debug!("Generating QR code {index}/{total}");

        match artifact::generate_artifact(runner, settings, index, token).await {
            Ok(a) => {
                if let Some(ref cb) = config.progress_callback {
                    cb.on_token_complete(index, total);
                }
                artifacts.push(a);
            }
            Err(e) => {
                warn!("Failed to generate QR code for note {index}: {e}");
                if let Some(ref cb) = config.progress_callback {
                    cb.on_token_error(index, total, &e.to_string());
                }
                failures.push(e);
            }
        }
    }

    (artifacts, failures)
}

async fn write_layout(path: &Path, document: &str) -> Result<(), CashNoteError> {
    let write_err = |source| CashNoteError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }
    tokio::fs::write(path, document).await.map_err(write_err)
}
