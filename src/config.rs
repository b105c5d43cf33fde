//! Configuration types for ecash note sheet generation.
//!
//! All run behaviour is controlled through [`GenerationConfig`], built via
//! its [`GenerationConfigBuilder`]. The page geometry lives in its own
//! [`LayoutConfig`] so the layout builder can be called (and tested) without
//! any of the process-level settings.
//!
//! Every value is fixed for the duration of one run.

use crate::error::CashNoteError;
use crate::progress::ProgressCallback;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Configuration for one sheet-generation run.
///
/// Built via [`GenerationConfig::builder()`] or using
/// [`GenerationConfig::default()`].
///
/// # Example
/// ```rust
/// use ecash_sheet::{EcLevel, GenerationConfig};
///
/// let config = GenerationConfig::builder()
///     .output("notes.pdf")
///     .error_correction(EcLevel::Q)
///     .build()
///     .unwrap();
/// assert_eq!(config.effective_error_correction(), (EcLevel::Q, false));
/// ```
#[derive(Clone)]
pub struct GenerationConfig {
    /// Base image for every front side. Default: `front.png`.
    ///
    /// Only pdflatex reads this file, so a missing image is a warning, not an
    /// error.
    pub front_image: PathBuf,

    /// Image for every back side. Default: `back.png`.
    pub back_image: PathBuf,

    /// Final PDF path. Default: `ecash_notes.pdf`.
    pub output: PathBuf,

    /// Directory receiving the numbered QR artifacts. Default: `qr_codes`.
    pub artifact_dir: PathBuf,

    /// File name prefix of each artifact (`<prefix>_0001.png`). Default: `ecash`.
    pub artifact_prefix: String,

    /// Where the LaTeX layout document is written. Default: `ecash_notes.tex`
    /// in the current directory. pdflatex output lands next to it.
    pub layout_path: PathBuf,

    /// Optional icon composited in the centre of every QR code.
    pub icon: Option<PathBuf>,

    /// Icon edge length as a percentage of the QR code width. Range 1–100.
    /// Default: 20.
    ///
    /// With error correction `H` roughly 30 % of the symbol may be lost, so a
    /// 20 % edge (4 % of the area) leaves plenty of margin.
    pub icon_size_percent: u32,

    /// Requested QR error-correction level. `None` means "not set by the
    /// caller": `L` normally, upgraded to `H` when an icon is configured.
    pub error_correction: Option<EcLevel>,

    /// Page geometry.
    pub layout: LayoutConfig,

    /// Names or paths of the external programs.
    pub tools: ToolPaths,

    /// Compile the layout document to PDF. Default: true.
    ///
    /// With `false` the run stops after writing the `.tex` file, leaving the
    /// compile to the caller.
    pub render: bool,

    /// Progress events for each token and the render step.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            front_image: PathBuf::from("front.png"),
            back_image: PathBuf::from("back.png"),
            output: PathBuf::from("ecash_notes.pdf"),
            artifact_dir: PathBuf::from("qr_codes"),
            artifact_prefix: "ecash".to_string(),
            layout_path: PathBuf::from("ecash_notes.tex"),
            icon: None,
            icon_size_percent: 20,
            error_correction: None,
            layout: LayoutConfig::default(),
            tools: ToolPaths::default(),
            render: true,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for GenerationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationConfig")
            .field("front_image", &self.front_image)
            .field("back_image", &self.back_image)
            .field("output", &self.output)
            .field("artifact_dir", &self.artifact_dir)
            .field("artifact_prefix", &self.artifact_prefix)
            .field("layout_path", &self.layout_path)
            .field("icon", &self.icon)
            .field("icon_size_percent", &self.icon_size_percent)
            .field("error_correction", &self.error_correction)
            .field("layout", &self.layout)
            .field("tools", &self.tools)
            .field("render", &self.render)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn GenerationProgressCallback>"),
            )
            .finish()
    }
}

impl GenerationConfig {
    /// Create a new builder for `GenerationConfig`.
    pub fn builder() -> GenerationConfigBuilder {
        GenerationConfigBuilder {
            config: Self::default(),
        }
    }

    /// The level actually passed to `qrencode`, and whether it was upgraded.
    ///
    /// An icon hides part of the symbol, so when one is configured and the
    /// caller left the level unset, `H` is used instead of the default. An
    /// explicitly requested level is never changed.
    pub fn effective_error_correction(&self) -> (EcLevel, bool) {
        match (self.error_correction, self.icon.is_some()) {
            (Some(level), _) => (level, false),
            (None, true) => (EcLevel::H, true),
            (None, false) => (EcLevel::default(), false),
        }
    }
}

/// Builder for [`GenerationConfig`].
#[derive(Debug)]
pub struct GenerationConfigBuilder {
    config: GenerationConfig,
}

impl GenerationConfigBuilder {
    pub fn front_image(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.front_image = path.into();
        self
    }

    pub fn back_image(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.back_image = path.into();
        self
    }

    pub fn output(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.output = path.into();
        self
    }

    pub fn artifact_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.artifact_dir = path.into();
        self
    }

    pub fn artifact_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.artifact_prefix = prefix.into();
        self
    }

    pub fn layout_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.layout_path = path.into();
        self
    }

    pub fn icon(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.icon = Some(path.into());
        self
    }

    pub fn icon_size_percent(mut self, percent: u32) -> Self {
        self.config.icon_size_percent = percent;
        self
    }

    pub fn error_correction(mut self, level: EcLevel) -> Self {
        self.config.error_correction = Some(level);
        self
    }

    pub fn layout(mut self, layout: LayoutConfig) -> Self {
        self.config.layout = layout;
        self
    }

    pub fn tools(mut self, tools: ToolPaths) -> Self {
        self.config.tools = tools;
        self
    }

    pub fn render(mut self, v: bool) -> Self {
        self.config.render = v;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<GenerationConfig, CashNoteError> {
        let c = &self.config;
        if c.icon_size_percent == 0 || c.icon_size_percent > 100 {
            return Err(CashNoteError::InvalidConfig(format!(
                "Icon size must be 1–100 %, got {}",
                c.icon_size_percent
            )));
        }
        if c.artifact_prefix.trim().is_empty() {
            return Err(CashNoteError::InvalidConfig(
                "Artifact prefix must not be empty".into(),
            ));
        }
        c.layout.validate()?;
        Ok(self.config)
    }
}

// ── Layout ───────────────────────────────────────────────────────────────

/// Page geometry for the layout document.
///
/// Offsets of the QR overlay are measured from the bottom-left corner of
/// each front image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Width of each front/back image. Default: 14cm.
    pub image_width: Length,
    /// Height of each front/back image. Default: 7cm.
    pub image_height: Length,
    /// QR overlay distance from the left edge of the front image. Default: 0cm.
    pub qr_x_offset: Length,
    /// QR overlay distance from the bottom edge of the front image. Default: 0cm.
    pub qr_y_offset: Length,
    /// QR overlay edge length. Default: 7cm.
    pub qr_size: Length,
    /// Vertical gap between stacked notes. Default: 0cm.
    pub vertical_spacing: Length,
    /// Distance of the first note from the page corner. Default: 0cm.
    pub page_margin: Length,
    /// Notes per page side. Default: 4 (four 7cm notes fill an A4 height).
    pub entries_per_page: usize,
    /// Default: 21cm (A4).
    pub paper_width: Length,
    /// Default: 29.7cm (A4).
    pub paper_height: Length,
    /// Draw dashed cut lines on back pages too. Default: false.
    #[serde(default)]
    pub back_cut_guides: bool,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            image_width: Length::cm(14.0),
            image_height: Length::cm(7.0),
            qr_x_offset: Length::cm(0.0),
            qr_y_offset: Length::cm(0.0),
            qr_size: Length::cm(7.0),
            vertical_spacing: Length::cm(0.0),
            page_margin: Length::cm(0.0),
            entries_per_page: 4,
            paper_width: Length::cm(21.0),
            paper_height: Length::cm(29.7),
            back_cut_guides: false,
        }
    }
}

impl LayoutConfig {
    /// Check the constraints the layout builder relies on.
    pub fn validate(&self) -> Result<(), CashNoteError> {
        if self.entries_per_page == 0 {
            return Err(CashNoteError::InvalidConfig(
                "Entries per page must be ≥ 1".into(),
            ));
        }
        let sizes = [
            ("image width", &self.image_width),
            ("image height", &self.image_height),
            ("QR size", &self.qr_size),
            ("paper width", &self.paper_width),
            ("paper height", &self.paper_height),
        ];
        for (name, len) in sizes {
            if !len.is_positive() {
                return Err(CashNoteError::InvalidConfig(format!(
                    "{name} must be positive, got {len}"
                )));
            }
        }
        Ok(())
    }
}

// ── Lengths ──────────────────────────────────────────────────────────────

/// A TeX length such as `7cm` or `0.5in`.
///
/// Serialised as its string form so configs stay readable in JSON reports.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Length {
    pub value: f64,
    pub unit: LengthUnit,
}

/// Units understood by both the CLI parser and pdflatex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LengthUnit {
    Cm,
    Mm,
    In,
    Pt,
    /// PostScript "big point" (1/72 in).
    Bp,
}

impl LengthUnit {
    pub fn as_str(self) -> &'static str {
        match self {
            LengthUnit::Cm => "cm",
            LengthUnit::Mm => "mm",
            LengthUnit::In => "in",
            LengthUnit::Pt => "pt",
            LengthUnit::Bp => "bp",
        }
    }
}

impl Length {
    pub const fn new(value: f64, unit: LengthUnit) -> Self {
        Self { value, unit }
    }

    pub const fn cm(value: f64) -> Self {
        Self::new(value, LengthUnit::Cm)
    }

    pub fn is_positive(&self) -> bool {
        self.value > 0.0
    }
}

impl fmt::Display for Length {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.value, self.unit.as_str())
    }
}

static RE_LENGTH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(-?(?:\d+(?:\.\d*)?|\.\d+))\s*(cm|mm|in|pt|bp)\s*$").unwrap()
});

impl FromStr for Length {
    type Err = CashNoteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = RE_LENGTH
            .captures(s)
            .ok_or_else(|| CashNoteError::InvalidLength(s.to_string()))?;
        let value: f64 = caps[1]
            .parse()
            .map_err(|_| CashNoteError::InvalidLength(s.to_string()))?;
        let unit = match &caps[2] {
            "cm" => LengthUnit::Cm,
            "mm" => LengthUnit::Mm,
            "in" => LengthUnit::In,
            "pt" => LengthUnit::Pt,
            _ => LengthUnit::Bp,
        };
        // `-0` would print as "-0cm"; normalise it.
        let value = if value == 0.0 { 0.0 } else { value };
        Ok(Length { value, unit })
    }
}

impl From<Length> for String {
    fn from(len: Length) -> Self {
        len.to_string()
    }
}

impl TryFrom<String> for Length {
    type Error = CashNoteError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// QR error-correction level, in order of increasing redundancy.
///
/// | Level | Recoverable | Capacity |
/// |-------|-------------|----------|
/// | L     | ~7 %        | highest  |
/// | M     | ~15 %       |          |
/// | Q     | ~25 %       |          |
/// | H     | ~30 %       | lowest   |
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub enum EcLevel {
    /// qrencode's own default.
    #[default]
    L,
    M,
    Q,
    H,
}

impl EcLevel {
    /// The value of qrencode's `-l` flag.
    pub fn as_flag(self) -> &'static str {
        match self {
            EcLevel::L => "L",
            EcLevel::M => "M",
            EcLevel::Q => "Q",
            EcLevel::H => "H",
        }
    }
}

impl fmt::Display for EcLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_flag())
    }
}

/// Program names (or absolute paths) of the external tools.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolPaths {
    /// Default: `qrencode`.
    pub qrencode: String,
    /// ImageMagick 7 entry point. Default: `magick`.
    pub magick: String,
    /// Default: `pdflatex`.
    pub pdflatex: String,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            qrencode: "qrencode".to_string(),
            magick: "magick".to_string(),
            pdflatex: "pdflatex".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_cli_defaults() {
        let c = GenerationConfig::default();
        assert_eq!(c.front_image, PathBuf::from("front.png"));
        assert_eq!(c.output, PathBuf::from("ecash_notes.pdf"));
        assert_eq!(c.artifact_dir, PathBuf::from("qr_codes"));
        assert_eq!(c.layout.entries_per_page, 4);
        assert_eq!(c.layout.qr_size.to_string(), "7cm");
        assert!(c.render);
    }

    #[test]
    fn ec_level_defaults_without_icon() {
        let c = GenerationConfig::default();
        assert_eq!(c.effective_error_correction(), (EcLevel::L, false));
    }

    #[test]
    fn ec_level_upgraded_with_icon_when_unset() {
        let c = GenerationConfig::builder().icon("logo.png").build().unwrap();
        assert_eq!(c.effective_error_correction(), (EcLevel::H, true));
    }

    #[test]
    fn explicit_ec_level_is_kept_with_icon() {
        let c = GenerationConfig::builder()
            .icon("logo.png")
            .error_correction(EcLevel::L)
            .build()
            .unwrap();
        assert_eq!(c.effective_error_correction(), (EcLevel::L, false));
    }

    #[test]
    fn ec_levels_are_ordered_by_redundancy() {
        assert!(EcLevel::L < EcLevel::M);
        assert!(EcLevel::M < EcLevel::Q);
        assert!(EcLevel::Q < EcLevel::H);
        assert_eq!(EcLevel::Q.as_flag(), "Q");
    }

    #[test]
    fn builder_rejects_bad_icon_size() {
        assert!(GenerationConfig::builder().icon_size_percent(0).build().is_err());
        assert!(GenerationConfig::builder().icon_size_percent(101).build().is_err());
        assert!(GenerationConfig::builder().icon_size_percent(100).build().is_ok());
    }

    #[test]
    fn builder_rejects_zero_entries_per_page() {
        let layout = LayoutConfig {
            entries_per_page: 0,
            ..LayoutConfig::default()
        };
        let err = GenerationConfig::builder().layout(layout).build().unwrap_err();
        assert!(err.to_string().contains("Entries per page"));
    }

    #[test]
    fn builder_rejects_empty_prefix() {
        assert!(GenerationConfig::builder().artifact_prefix("  ").build().is_err());
    }

    #[test]
    fn builder_rejects_non_positive_qr_size() {
        let layout = LayoutConfig {
            qr_size: Length::cm(0.0),
            ..LayoutConfig::default()
        };
        assert!(GenerationConfig::builder().layout(layout).build().is_err());
    }

    #[test]
    fn length_parses_units() {
        assert_eq!("7cm".parse::<Length>().unwrap(), Length::cm(7.0));
        assert_eq!(
            "0.5 in".parse::<Length>().unwrap(),
            Length::new(0.5, LengthUnit::In)
        );
        assert_eq!(
            "-2mm".parse::<Length>().unwrap(),
            Length::new(-2.0, LengthUnit::Mm)
        );
        assert_eq!(
            ".25pt".parse::<Length>().unwrap(),
            Length::new(0.25, LengthUnit::Pt)
        );
    }

    #[test]
    fn length_rejects_garbage() {
        assert!("7".parse::<Length>().is_err());
        assert!("cm".parse::<Length>().is_err());
        assert!("7 furlongs".parse::<Length>().is_err());
        assert!("".parse::<Length>().is_err());
    }

    #[test]
    fn length_display() {
        assert_eq!(Length::cm(14.0).to_string(), "14cm");
        assert_eq!(Length::cm(29.7).to_string(), "29.7cm");
        assert_eq!("-0cm".parse::<Length>().unwrap().to_string(), "0cm");
    }

    #[test]
    fn layout_serialises_lengths_as_strings() {
        let json = serde_json::to_string(&LayoutConfig::default()).unwrap();
        assert!(json.contains("\"image_width\":\"14cm\""), "got: {json}");
        let back: LayoutConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, LayoutConfig::default());
    }
}
