//! PDF rendering: compile the layout document with pdflatex.
//!
//! ## Why two passes?
//!
//! The layout positions every note relative to `current page`, which TikZ
//! only knows after a first run has written it to the `.aux` file. The
//! second pass reads those coordinates back.

use crate::error::CashNoteError;
use crate::pipeline::tool::{ToolInvocation, ToolRunner};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Byproducts pdflatex leaves next to the PDF.
const BYPRODUCT_EXTENSIONS: [&str; 3] = ["aux", "log", "out"];

/// Compile `layout_path` into `output_dir`, then move the PDF to `final_pdf`.
///
/// Returns the final PDF path.
pub async fn render_document<R: ToolRunner>(
    runner: &R,
    pdflatex: &str,
    layout_path: &Path,
    output_dir: &Path,
    final_pdf: &Path,
) -> Result<PathBuf, CashNoteError> {
    let inv = ToolInvocation::new(pdflatex)
        .arg("-interaction=nonstopmode")
        .arg("-output-directory")
        .arg(output_dir)
        .arg(layout_path);

    for pass in 1..=2u8 {
        debug!("pdflatex pass {pass}: {}", inv.display());
        let out = runner
            .run(&inv)
            .await
            .map_err(|e| CashNoteError::RenderFailed {
                pass,
                diagnostic: format!("could not run {}: {e}", inv.program_name()),
            })?;
        if !out.success {
            return Err(CashNoteError::RenderFailed {
                pass,
                diagnostic: out.diagnostic(),
            });
        }
    }

    let stem = layout_path.file_stem().ok_or_else(|| {
        CashNoteError::Internal(format!("{} has no file name", layout_path.display()))
    })?;
    let produced = sibling(output_dir, stem, "pdf");
    if !tokio::fs::try_exists(&produced).await.unwrap_or(false) {
        return Err(CashNoteError::RenderFailed {
            pass: 2,
            diagnostic: format!(
                "pdflatex reported success but {} is missing",
                produced.display()
            ),
        });
    }

    relocate(&produced, final_pdf).await?;
    info!("PDF written: {}", final_pdf.display());

    cleanup_byproducts(output_dir, &produced).await;
    Ok(final_pdf.to_path_buf())
}

/// Move `from` to `to`, copying when a rename crosses filesystems.
async fn relocate(from: &Path, to: &Path) -> Result<(), CashNoteError> {
    if same_file(from, to).await {
        return Ok(());
    }

    let write_err = |source: io::Error| CashNoteError::OutputWriteFailed {
        path: to.to_path_buf(),
        source,
    };

    if let Some(parent) = to.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    match tokio::fs::rename(from, to).await {
        Ok(()) => Ok(()),
        Err(e) => {
            debug!("rename failed ({e}); falling back to copy");
            copy_and_remove(from, to).await.map_err(write_err)
        }
    }
}

/// Copy `from` to `to`, then delete `from`. Only the copy can fail.
async fn copy_and_remove(from: &Path, to: &Path) -> io::Result<()> {
    tokio::fs::copy(from, to).await?;
    if let Err(e) = tokio::fs::remove_file(from).await {
        warn!("Could not remove {}: {e}", from.display());
    }
    Ok(())
}

/// `<dir>/<stem>.<ext>`, keeping any dots inside `stem`.
fn sibling(dir: &Path, stem: &std::ffi::OsStr, ext: &str) -> PathBuf {
    let mut name = stem.to_os_string();
    name.push(".");
    name.push(ext);
    dir.join(name)
}

async fn same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    let b_dir = match b.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    match (
        tokio::fs::canonicalize(a).await,
        tokio::fs::canonicalize(b_dir).await,
    ) {
        (Ok(a), Ok(b_dir)) => b.file_name().is_some_and(|n| a == b_dir.join(n)),
        _ => false,
    }
}

/// Best-effort removal of `.aux`/`.log`/`.out`; never fails the run.
async fn cleanup_byproducts(output_dir: &Path, produced_pdf: &Path) {
    let Some(stem) = produced_pdf.file_stem() else {
        return;
    };
    for ext in BYPRODUCT_EXTENSIONS {
        let path = sibling(output_dir, stem, ext);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => debug!("Removed {}", path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!("Could not remove {}: {e}", path.display()),
        }
    }
}
