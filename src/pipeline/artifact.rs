//! Per-token QR artifact generation.
//!
//! ```text
//! token ──▶ qrencode -o - ──▶ magick - -transparent white ──▶ <prefix>_NNNN.png
//!                                                       │
//!                              (icon) resize + composite ┘
//! ```
//!
//! The artifact's file name depends only on the token's input position, so a
//! failed token leaves a gap in the numbering rather than shifting the
//! notes after it.

use crate::config::{EcLevel, ToolPaths};
use crate::error::ArtifactError;
use crate::output::Artifact;
use crate::pipeline::tool::{ToolInvocation, ToolRunner};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Settings shared by every token of a run.
#[derive(Debug, Clone)]
pub struct ArtifactSettings {
    pub work_dir: PathBuf,
    pub prefix: String,
    pub error_correction: EcLevel,
    pub icon: Option<IconOverlay>,
    pub tools: ToolPaths,
}

/// Centre icon and its size relative to the QR code width.
#[derive(Debug, Clone)]
pub struct IconOverlay {
    pub path: PathBuf,
    pub size_percent: u32,
}

/// `<work_dir>/<prefix>_<index:04>.png`
pub fn artifact_path(work_dir: &Path, prefix: &str, index: usize) -> PathBuf {
    work_dir.join(format!("{prefix}_{index:04}.png"))
}

/// Icon edge length in pixels for a QR image `qr_width` pixels wide.
pub fn icon_edge_px(qr_width: u32, size_percent: u32) -> u32 {
    let edge = (f64::from(qr_width) * f64::from(size_percent) / 100.0).round() as u32;
    edge.max(1)
}

/// Produce the artifact for the token at 1-based `index`.
///
/// On failure any partially written artifact is removed.
pub async fn generate_artifact<R: ToolRunner>(
    runner: &R,
    settings: &ArtifactSettings,
    index: usize,
    token: &str,
) -> Result<Artifact, ArtifactError> {
    let path = artifact_path(&settings.work_dir, &settings.prefix, index);

    let result = build_artifact(runner, settings, index, token, &path).await;
    if result.is_err() {
        remove_partial(&path).await;
    }
    result.map(|()| Artifact { index, path })
}

async fn build_artifact<R: ToolRunner>(
    runner: &R,
    settings: &ArtifactSettings,
    index: usize,
    token: &str,
    path: &Path,
) -> Result<(), ArtifactError> {
    let png = encode_qr(runner, settings, index, token).await?;
    make_transparent(runner, settings, index, png, path).await?;

    if let Some(icon) = &settings.icon {
        overlay_icon(runner, settings, index, icon, path).await?;
    }

    debug!("Note {index}: wrote {}", path.display());
    Ok(())
}

/// `qrencode -o - -l <level> -- <token>` → PNG bytes.
async fn encode_qr<R: ToolRunner>(
    runner: &R,
    settings: &ArtifactSettings,
    index: usize,
    token: &str,
) -> Result<Vec<u8>, ArtifactError> {
    let inv = ToolInvocation::new(&settings.tools.qrencode)
        .args(["-o", "-", "-l", settings.error_correction.as_flag(), "--"])
        .arg(token);

    let fail = |detail: String| ArtifactError::EncodeFailed { index, detail };

    let out = runner
        .run(&inv)
        .await
        .map_err(|e| fail(format!("could not run {}: {e}", inv.program_name())))?;
    if !out.success {
        return Err(fail(out.diagnostic()));
    }
    if out.stdout.is_empty() {
        return Err(fail("no image data on stdout".into()));
    }
    Ok(out.stdout)
}

/// `magick - -transparent white <path>` with the PNG on stdin.
async fn make_transparent<R: ToolRunner>(
    runner: &R,
    settings: &ArtifactSettings,
    index: usize,
    png: Vec<u8>,
    path: &Path,
) -> Result<(), ArtifactError> {
    let inv = ToolInvocation::new(&settings.tools.magick)
        .args(["-", "-transparent", "white"])
        .arg(path)
        .stdin(png);

    let fail = |detail: String| ArtifactError::TransparencyFailed { index, detail };

    let out = runner
        .run(&inv)
        .await
        .map_err(|e| fail(format!("could not run {}: {e}", inv.program_name())))?;
    if !out.success {
        return Err(fail(out.diagnostic()));
    }
    Ok(())
}

/// Resize the icon relative to the QR width and composite it centred.
///
/// The resized icon lives in a temp file inside the work dir that is removed
/// when this function returns, whatever the outcome.
async fn overlay_icon<R: ToolRunner>(
    runner: &R,
    settings: &ArtifactSettings,
    index: usize,
    icon: &IconOverlay,
    path: &Path,
) -> Result<(), ArtifactError> {
    let fail = |detail: String| ArtifactError::IconOverlayFailed { index, detail };

    let (width, _) =
        image::image_dimensions(path).map_err(|e| fail(format!("cannot measure QR code: {e}")))?;
    let edge = icon_edge_px(width, icon.size_percent);
    debug!("Note {index}: QR {width}px wide, icon {edge}px");

    let resized = tempfile::Builder::new()
        .prefix(".icon_")
        .suffix(".png")
        .tempfile_in(&settings.work_dir)
        .map_err(|e| fail(format!("cannot create temp file: {e}")))?;

    let resize = ToolInvocation::new(&settings.tools.magick)
        .arg(&icon.path)
        .args(["-filter", "Lanczos", "-resize"])
        .arg(format!("{edge}x{edge}"))
        .arg(resized.path());
    let out = runner
        .run(&resize)
        .await
        .map_err(|e| fail(format!("could not run {}: {e}", resize.program_name())))?;
    if !out.success {
        return Err(fail(format!("resize: {}", out.diagnostic())));
    }

    let composite = ToolInvocation::new(&settings.tools.magick)
        .arg(path)
        .arg(resized.path())
        .args(["-gravity", "center", "-composite"])
        .arg(path);
    let out = runner
        .run(&composite)
        .await
        .map_err(|e| fail(format!("could not run {}: {e}", composite.program_name())))?;
    if !out.success {
        return Err(fail(format!("composite: {}", out.diagnostic())));
    }

    if let Err(e) = resized.close() {
        warn!("Could not remove temporary icon: {e}");
    }
    Ok(())
}

async fn remove_partial(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!("Removed partial artifact {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Could not remove partial artifact {}: {e}", path.display()),
    }
}
