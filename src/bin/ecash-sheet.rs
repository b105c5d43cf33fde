//! CLI binary for ecash-sheet.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `GenerationConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use ecash_sheet::{
    generate, EcLevel, GenerationConfig, GenerationProgressCallback, LayoutConfig, Length,
    ProgressCallback, ToolPaths,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: [&str; 11] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a live bar over the token list plus one log
/// line per failed note.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    /// Spinner until `on_batch_start` tells us how many notes there are.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Reading tokens…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self { bar })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>4}/{len} notes  \
             ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("QR codes");
    }
}

impl GenerationProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total_tokens: usize) {
        self.activate_bar(total_tokens);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Generating {total_tokens} notes…"))
        ));
    }

    fn on_token_start(&self, index: usize, _total: usize) {
        self.bar.set_message(format!("note {index}"));
    }

    fn on_token_complete(&self, _index: usize, _total: usize) {
        self.bar.inc(1);
    }

    fn on_token_error(&self, index: usize, total: usize, error: &str) {
        // Keep one line per failure even for multi-line tool output.
        let first = error.lines().next().unwrap_or(error);
        let msg = if first.chars().count() > 80 {
            format!("{}\u{2026}", first.chars().take(79).collect::<String>())
        } else {
            first.to_string()
        };

        self.bar.println(format!(
            "  {} Note {:>4}/{:<4}  {}",
            red("✗"),
            index,
            total,
            red(&msg),
        ));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, total_tokens: usize, success_count: usize) {
        let failed = total_tokens.saturating_sub(success_count);
        self.bar.finish_and_clear();

        if failed == 0 {
            eprintln!(
                "{} {} QR codes generated",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} QR codes generated  ({} failed)",
                if failed == total_tokens {
                    red("✘")
                } else {
                    cyan("⚠")
                },
                bold(&success_count.to_string()),
                total_tokens,
                red(&failed.to_string()),
            );
        }
    }

    fn on_warning(&self, message: &str) {
        self.bar.println(format!("{} {}", cyan("⚠"), message));
    }

    fn on_render_start(&self, layout_path: &Path) {
        eprintln!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Compiling {} (2 passes)…", layout_path.display()))
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Basic sheet with default front.png / back.png
  ecash-sheet tokens.txt

  # Custom artwork and output
  ecash-sheet tokens.txt --front-image art/front.png --back-image art/back.png -o batch1.pdf

  # Logo in the middle of each QR code (error correction goes to H)
  ecash-sheet tokens.txt --icon logo.png --icon-size 22

  # Move the QR code to the right half of a 14cm × 7cm note
  ecash-sheet tokens.txt --qr-x 7cm --qr-size 6.5cm --qr-y 0.25cm

  # Only write the LaTeX document
  ecash-sheet tokens.txt --no-render --tex build/notes.tex

INPUT FORMAT:
  Plain text, one token per line. Blank lines are ignored; nothing else is
  checked.

DUPLEX PRINTING:
  Pages alternate front, back, front, back… Print double-sided, flipping on
  the long edge. Backs are right-aligned so they line up with their fronts.

REQUIRED TOOLS:
  qrencode     QR code generation
  magick       ImageMagick 7 (transparency, icon overlay)
  pdflatex     with the tikz, graphicx, geometry and calc packages

ENVIRONMENT VARIABLES:
  ECASH_QRENCODE   Path to qrencode
  ECASH_MAGICK     Path to magick
  ECASH_PDFLATEX   Path to pdflatex
  RUST_LOG         Override the log filter (e.g. ecash_sheet=debug)
"#;

/// Generate a printable PDF of ecash notes with QR codes.
#[derive(Parser, Debug)]
#[command(
    name = "ecash-sheet",
    version,
    about = "Generate a printable PDF of ecash notes with QR codes",
    long_about = "Read ecash tokens (one per line), render each as a QR code on top of a \
front image, and lay the notes out as duplex-ready front/back page pairs compiled with pdflatex.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Token list: one ecash token per line.
    input: PathBuf,

    /// Base image for the front side.
    #[arg(long, env = "ECASH_FRONT_IMAGE", default_value = "front.png")]
    front_image: PathBuf,

    /// Image for the back side.
    #[arg(long, env = "ECASH_BACK_IMAGE", default_value = "back.png")]
    back_image: PathBuf,

    /// Output PDF file.
    #[arg(short, long, env = "ECASH_OUTPUT", default_value = "ecash_notes.pdf")]
    output: PathBuf,

    /// Directory for the generated QR code images.
    #[arg(long, env = "ECASH_QR_DIR", default_value = "qr_codes")]
    qr_dir: PathBuf,

    /// File name prefix of each QR code image.
    #[arg(long, env = "ECASH_PREFIX", default_value = "ecash")]
    prefix: String,

    /// Where to write the LaTeX layout document.
    #[arg(long, env = "ECASH_TEX", default_value = "ecash_notes.tex")]
    tex: PathBuf,

    /// Icon composited in the centre of every QR code.
    #[arg(long, env = "ECASH_ICON")]
    icon: Option<PathBuf>,

    /// Icon edge as a percentage of the QR code width (1–100).
    #[arg(long, env = "ECASH_ICON_SIZE", default_value_t = 20,
          value_parser = clap::value_parser!(u32).range(1..=100))]
    icon_size: u32,

    /// QR error correction: l, m, q, h. Default: l, or h with --icon.
    #[arg(long, env = "ECASH_EC_LEVEL", value_enum)]
    ec_level: Option<EcLevelArg>,

    /// QR x-offset from the left edge of the front image.
    #[arg(long, env = "ECASH_QR_X", default_value = "0cm")]
    qr_x: Length,

    /// QR y-offset from the bottom edge of the front image.
    #[arg(long, env = "ECASH_QR_Y", default_value = "0cm")]
    qr_y: Length,

    /// QR code edge length.
    #[arg(long, env = "ECASH_QR_SIZE", default_value = "7cm")]
    qr_size: Length,

    /// Width of each note image.
    #[arg(long, env = "ECASH_IMAGE_WIDTH", default_value = "14cm")]
    image_width: Length,

    /// Height of each note image.
    #[arg(long, env = "ECASH_IMAGE_HEIGHT", default_value = "7cm")]
    image_height: Length,

    /// Vertical gap between notes.
    #[arg(long, env = "ECASH_SPACING", default_value = "0cm")]
    spacing: Length,

    /// Distance of the first note from the page corner.
    #[arg(long, env = "ECASH_MARGIN", default_value = "0cm")]
    margin: Length,

    /// Notes per page side.
    #[arg(long, env = "ECASH_PER_PAGE", default_value_t = 4,
          value_parser = clap::value_parser!(u32).range(1..))]
    per_page: u32,

    /// Paper width.
    #[arg(long, env = "ECASH_PAPER_WIDTH", default_value = "21cm")]
    paper_width: Length,

    /// Paper height.
    #[arg(long, env = "ECASH_PAPER_HEIGHT", default_value = "29.7cm")]
    paper_height: Length,

    /// Also draw dashed cut lines on back pages.
    #[arg(long, env = "ECASH_BACK_CUT_GUIDES")]
    back_cut_guides: bool,

    /// qrencode executable.
    #[arg(long, env = "ECASH_QRENCODE", default_value = "qrencode")]
    qrencode: String,

    /// ImageMagick 7 executable.
    #[arg(long, env = "ECASH_MAGICK", default_value = "magick")]
    magick: String,

    /// pdflatex executable.
    #[arg(long, env = "ECASH_PDFLATEX", default_value = "pdflatex")]
    pdflatex: String,

    /// Stop after writing the LaTeX document.
    #[arg(long, env = "ECASH_NO_RENDER")]
    no_render: bool,

    /// Print the run report as JSON on stdout.
    #[arg(long, env = "ECASH_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "ECASH_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "ECASH_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "ECASH_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum EcLevelArg {
    L,
    M,
    Q,
    H,
}

impl From<EcLevelArg> for EcLevel {
    fn from(v: EcLevelArg) -> Self {
        match v {
            EcLevelArg::L => EcLevel::L,
            EcLevelArg::M => EcLevel::M,
            EcLevelArg::Q => EcLevel::Q,
            EcLevelArg::H => EcLevel::H,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress library logs below ERROR when the progress bar is active;
    // the bar and its per-note lines carry the feedback that matters.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new_dynamic();
        Some(cb as Arc<dyn GenerationProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb)?;

    let (level, upgraded) = config.effective_error_correction();
    if upgraded && !cli.quiet && !cli.json {
        eprintln!(
            "{} Icon overlay requested: error correction set to {} (maximum redundancy)",
            cyan("ℹ"),
            bold(level.as_flag())
        );
    }

    // ── Run ──────────────────────────────────────────────────────────────
    let output = generate(&cli.input, &config)
        .await
        .context("Failed to generate ecash notes")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise report")?;
        println!("{json}");
        return Ok(());
    }

    if !cli.quiet {
        let done = match output.pdf_path {
            Some(ref pdf) => pdf.display().to_string(),
            None => output.layout_path.display().to_string(),
        };
        eprintln!(
            "{}  {}/{} notes  {} page pairs  {}ms  →  {}",
            if output.failures.is_empty() {
                green("✔")
            } else {
                cyan("⚠")
            },
            output.stats.generated,
            output.stats.total_tokens,
            output.page_pairs,
            output.stats.total_duration_ms,
            bold(&done),
        );
        if !show_progress {
            for f in &output.failures {
                eprintln!("   {}", red(&f.to_string()));
            }
        }
        eprintln!(
            "   {} QR codes in {}  /  error correction {}",
            dim(&output.artifacts.len().to_string()),
            dim(&config.artifact_dir.display().to_string()),
            dim(output.error_correction.as_flag()),
        );
    }

    Ok(())
}

/// Map CLI args to `GenerationConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<GenerationConfig> {
    let layout = LayoutConfig {
        image_width: cli.image_width,
        image_height: cli.image_height,
        qr_x_offset: cli.qr_x,
        qr_y_offset: cli.qr_y,
        qr_size: cli.qr_size,
        vertical_spacing: cli.spacing,
        page_margin: cli.margin,
        entries_per_page: cli.per_page as usize,
        paper_width: cli.paper_width,
        paper_height: cli.paper_height,
        back_cut_guides: cli.back_cut_guides,
    };

    let tools = ToolPaths {
        qrencode: cli.qrencode.clone(),
        magick: cli.magick.clone(),
        pdflatex: cli.pdflatex.clone(),
    };

    let mut builder = GenerationConfig::builder()
        .front_image(&cli.front_image)
        .back_image(&cli.back_image)
        .output(&cli.output)
        .artifact_dir(&cli.qr_dir)
        .artifact_prefix(&cli.prefix)
        .layout_path(&cli.tex)
        .icon_size_percent(cli.icon_size)
        .layout(layout)
        .tools(tools)
        .render(!cli.no_render);

    if let Some(ref icon) = cli.icon {
        builder = builder.icon(icon);
    }
    if let Some(level) = cli.ec_level {
        builder = builder.error_correction(level.into());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
