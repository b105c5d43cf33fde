//! Pipeline stages for ecash note sheet generation.
//!
//! Each submodule implements exactly one step, so each can be tested on its
//! own and the external tools can be swapped through [`tool::ToolRunner`].
//!
//! ## Data Flow
//!
//! ```text
//! tokens ──▶ artifact ──▶ layout ──▶ render
//! (lines)    (PNG/token)  (LaTeX)    (pdflatex × 2)
//! ```
//!
//! 1. [`tokens`]:   read the list, drop blank lines, keep order
//! 2. [`artifact`]: qrencode + magick per token; failures are per-token
//! 3. [`layout`]:   pure LaTeX templating of front/back page pairs
//! 4. [`render`]:   compile, move the PDF into place, clean up
//!
//! [`tool`] is the process boundary shared by stages 2 and 4.

pub mod artifact;
pub mod layout;
pub mod render;
pub mod tokens;
pub mod tool;
