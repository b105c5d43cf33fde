//! LaTeX layout document for the note sheet.
//!
//! Each group of `entries_per_page` artifacts becomes a front page followed
//! by a back page. Fronts are anchored at the page's north-west corner and
//! carry the QR overlay plus dashed cut lines; backs are anchored at the
//! north-east corner so that, printed duplex and flipped horizontally, every
//! back lands behind its front. Backs carry no cut lines unless
//! [`LayoutConfig::back_cut_guides`] is set.
//!
//! [`build_layout_document`] is pure: the same inputs always give the same
//! bytes.

use crate::config::LayoutConfig;
use std::ops::Range;
use std::path::Path;

/// Consecutive index ranges of at most `per_page` entries.
///
/// The last range may be shorter; no range is ever empty.
pub fn page_groups(total: usize, per_page: usize) -> Vec<Range<usize>> {
    let per_page = per_page.max(1);
    (0..total)
        .step_by(per_page)
        .map(|start| start..(start + per_page).min(total))
        .collect()
}

/// Front/back page pairs needed for `total` entries.
pub fn page_pair_count(total: usize, per_page: usize) -> usize {
    total.div_ceil(per_page.max(1))
}

/// Render the complete LaTeX document.
pub fn build_layout_document<P: AsRef<Path>>(
    artifacts: &[P],
    front_image: &Path,
    back_image: &Path,
    layout: &LayoutConfig,
) -> String {
    let front = tex_path(front_image);
    let back = tex_path(back_image);
    let groups = page_groups(artifacts.len(), layout.entries_per_page);

    let mut doc = preamble(layout);

    for (page_idx, group) in groups.iter().enumerate() {
        // ── Front ────────────────────────────────────────────────────────
        doc.push_str(&format!("\t% ===== PAGE {} (FRONT) =====\n", page_idx * 2 + 1));
        doc.push_str("\t\\begin{tikzpicture}[remember picture, overlay]\n");
        for (i, idx) in group.clone().enumerate() {
            if i == 0 {
                doc.push_str("\t\t% First image (top)\n");
            } else {
                doc.push_str(&format!("\t\t% Image {}\n", i + 1));
            }
            doc.push_str(&format!(
                "\t\t\\node[anchor=north west, inner sep=0pt] at ([xshift=\\pagemargin, yshift={}]current page.north west) {{%\n",
                row_shift(i)
            ));
            doc.push_str(&format!(
                "\t\t\t\\overlayimage{{{front}}}{{{}}}%\n",
                tex_path(artifacts[idx].as_ref())
            ));
            doc.push_str("\t\t};\n");
        }
        doc.push_str("\t\\end{tikzpicture}\n\n");
        doc.push_str("\t\\newpage\n\n");

        // ── Back ─────────────────────────────────────────────────────────
        doc.push_str(&format!("\t% ===== PAGE {} (BACK) =====\n", page_idx * 2 + 2));
        doc.push_str("\t% Backs are right-aligned so they register with the fronts when flipped\n");
        doc.push_str("\t\\begin{tikzpicture}[remember picture, overlay]\n");
        for i in 0..group.len() {
            if i == 0 {
                doc.push_str("\t\t% First back (top) - aligns with first front\n");
            } else {
                doc.push_str(&format!("\t\t% Back {}\n", i + 1));
            }
            doc.push_str(&format!(
                "\t\t\\node[anchor=north east, inner sep=0pt] at ([xshift=-\\pagemargin, yshift={}]current page.north east) {{%\n",
                row_shift(i)
            ));
            doc.push_str(&format!("\t\t\t\\backimage{{{back}}}%\n"));
            doc.push_str("\t\t};\n");
        }
        doc.push_str("\t\\end{tikzpicture}\n\n");

        if page_idx + 1 < groups.len() {
            doc.push_str("\t\\newpage\n\n");
        }
    }

    doc.push_str("\\end{document}\n");
    doc
}

/// Vertical shift of the `i`-th note on a page.
fn row_shift(i: usize) -> String {
    if i == 0 {
        "-\\pagemargin".to_string()
    } else {
        format!("-\\pagemargin-{i}\\imgheight-{i}\\vspacing")
    }
}

/// Paths as TeX wants them: forward slashes only.
fn tex_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

fn preamble(l: &LayoutConfig) -> String {
    let mut s = String::new();
    s.push_str("\\documentclass{article}\n");
    s.push_str(&format!(
        "\\usepackage[margin=0cm, paperwidth={}, paperheight={}]{{geometry}}\n",
        l.paper_width, l.paper_height
    ));
    s.push_str(
        "\\usepackage{graphicx}\n\
         \\usepackage{tikz}\n\
         \\usepackage{calc}\n\
         % ===== CONFIGURATION VARIABLES =====\n\
         % Image dimensions\n\
         \\newlength{\\imgwidth}\n\
         \\newlength{\\imgheight}\n",
    );
    s.push_str(&format!("\\setlength{{\\imgwidth}}{{{}}}\n", l.image_width));
    s.push_str(&format!("\\setlength{{\\imgheight}}{{{}}}\n", l.image_height));
    s.push_str(
        "% QR code positioning (relative to bottom-left of front image)\n\
         \\newlength{\\qrxoffset}\n\
         \\newlength{\\qryoffset}\n",
    );
    s.push_str(&format!("\\setlength{{\\qrxoffset}}{{{}}}\n", l.qr_x_offset));
    s.push_str(&format!("\\setlength{{\\qryoffset}}{{{}}}\n", l.qr_y_offset));
    s.push_str("% QR code size\n\\newlength{\\qrsize}\n");
    s.push_str(&format!("\\setlength{{\\qrsize}}{{{}}}\n", l.qr_size));
    s.push_str("% Spacing between images\n\\newlength{\\vspacing}\n");
    s.push_str(&format!("\\setlength{{\\vspacing}}{{{}}}\n", l.vertical_spacing));
    s.push_str("% Page margins\n\\newlength{\\pagemargin}\n");
    s.push_str(&format!("\\setlength{{\\pagemargin}}{{{}}}\n", l.page_margin));
    s.push_str(MACROS);
    s.push_str(if l.back_cut_guides {
        BACK_MACRO_WITH_GUIDES
    } else {
        BACK_MACRO
    });
    s.push_str("\\begin{document}\n");
    s
}

const MACROS: &str = r"% ===================================
\pagestyle{empty}
\setlength{\parindent}{0pt}
\setlength{\parskip}{0pt}
% Front of one note: base image, QR overlay, cut lines
% Usage: \overlayimage{front_image.png}{qr_code.png}
\newcommand{\overlayimage}[2]{%
	\begin{tikzpicture}
		\node[anchor=south west, inner sep=0pt] (base) at (0,0) {%
			\includegraphics[width=\imgwidth, height=\imgheight]{#1}%
		};
		\node[anchor=south west, inner sep=0pt] at (\qrxoffset, \qryoffset) {%
			\includegraphics[width=\qrsize, height=\qrsize]{#2}%
		};
		\draw[thin, dashed] (0,0) -- (\imgwidth,0); % bottom
		\draw[thin, dashed] (0,\imgheight) -- (\imgwidth,\imgheight); % top
		\draw[thin, dashed] (\imgwidth,0) -- (\imgwidth,\imgheight); % right
	\end{tikzpicture}%
}
";

const BACK_MACRO: &str = r"% Back of one note, no QR overlay
% Usage: \backimage{back_image.png}
\newcommand{\backimage}[1]{%
	\begin{tikzpicture}
		\node[anchor=south west, inner sep=0pt] (base) at (0,0) {%
			\includegraphics[width=\imgwidth, height=\imgheight]{#1}%
		};
	\end{tikzpicture}%
}
";

const BACK_MACRO_WITH_GUIDES: &str = r"% Back of one note, no QR overlay, cut lines on the fold side
% Usage: \backimage{back_image.png}
\newcommand{\backimage}[1]{%
	\begin{tikzpicture}
		\node[anchor=south west, inner sep=0pt] (base) at (0,0) {%
			\includegraphics[width=\imgwidth, height=\imgheight]{#1}%
		};
		\draw[thin, dashed] (0,0) -- (\imgwidth,0); % bottom
		\draw[thin, dashed] (0,\imgheight) -- (\imgwidth,\imgheight); % top
		\draw[thin, dashed] (0,0) -- (0,\imgheight); % left
	\end{tikzpicture}%
}
";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Length;
    use std::path::PathBuf;

    fn artifacts(n: usize) -> Vec<PathBuf> {
        (1..=n)
            .map(|i| PathBuf::from(format!("qr_codes/ecash_{i:04}.png")))
            .collect()
    }

    fn doc(n: usize) -> String {
        build_layout_document(
            &artifacts(n),
            Path::new("front.png"),
            Path::new("back.png"),
            &LayoutConfig::default(),
        )
    }

    fn fronts(doc: &str) -> usize {
        doc.matches("(FRONT) =====").count()
    }

    fn backs(doc: &str) -> usize {
        doc.matches("(BACK) =====").count()
    }

    #[test]
    fn groups_partition_in_order() {
        assert_eq!(page_groups(9, 4), vec![0..4, 4..8, 8..9]);
        assert_eq!(page_groups(4, 4), vec![0..4]);
        assert!(page_groups(0, 4).is_empty());
        assert_eq!(page_pair_count(9, 4), 3);
        assert_eq!(page_pair_count(8, 4), 2);
        assert_eq!(page_pair_count(1, 4), 1);
    }

    #[test]
    fn four_entries_make_one_pair_without_trailing_page() {
        let d = doc(4);
        assert_eq!(fronts(&d), 1);
        assert_eq!(backs(&d), 1);
        assert_eq!(d.matches("\\newpage").count(), 1);
        assert_eq!(d.matches("\\overlayimage{front.png}").count(), 4);
        assert_eq!(d.matches("\\backimage{back.png}").count(), 4);
        assert!(d.ends_with("\\end{tikzpicture}\n\n\\end{document}\n"));
    }

    #[test]
    fn five_entries_make_two_pairs_with_short_last_group() {
        let d = doc(5);
        assert_eq!(fronts(&d), 2);
        assert_eq!(backs(&d), 2);
        // front, back, front, back → three breaks
        assert_eq!(d.matches("\\newpage").count(), 3);

        let second_front = d.split("PAGE 3 (FRONT)").nth(1).unwrap();
        let second_front = second_front.split("PAGE 4 (BACK)").next().unwrap();
        assert_eq!(second_front.matches("\\overlayimage").count(), 1);
        assert!(second_front.contains("qr_codes/ecash_0005.png"));

        let second_back = d.split("PAGE 4 (BACK)").nth(1).unwrap();
        assert_eq!(second_back.matches("\\backimage{back.png}").count(), 1);
    }

    #[test]
    fn backs_are_anchored_from_the_opposite_edge() {
        let d = doc(5);
        for page in d.split("(FRONT) =====").skip(1) {
            let (front, back) = page.split_once("(BACK) =====").unwrap();
            assert!(front.contains("anchor=north west"));
            assert!(front.contains("current page.north west"));
            assert!(!front.contains("north east"));
            assert!(back.contains("anchor=north east"));
            assert!(back.contains("current page.north east"));
            assert!(!back.contains("\\overlayimage"));
        }
    }

    #[test]
    fn artifacts_appear_in_input_order() {
        let d = doc(6);
        let positions: Vec<usize> = artifacts(6)
            .iter()
            .map(|p| d.find(&*p.to_string_lossy()).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn rows_shift_down_by_image_height() {
        let d = doc(3);
        assert!(d.contains("yshift=-\\pagemargin]current page.north west"));
        assert!(d.contains("yshift=-\\pagemargin-1\\imgheight-1\\vspacing]"));
        assert!(d.contains("yshift=-\\pagemargin-2\\imgheight-2\\vspacing]"));
        assert!(!d.contains("-3\\imgheight"));
    }

    #[test]
    fn layout_values_are_substituted() {
        let layout = LayoutConfig {
            qr_x_offset: Length::cm(6.5),
            qr_y_offset: "5mm".parse().unwrap(),
            qr_size: Length::cm(5.0),
            entries_per_page: 2,
            ..LayoutConfig::default()
        };
        let d = build_layout_document(
            &artifacts(3),
            Path::new("f.png"),
            Path::new("b.png"),
            &layout,
        );
        assert!(d.contains("\\setlength{\\qrxoffset}{6.5cm}"));
        assert!(d.contains("\\setlength{\\qryoffset}{5mm}"));
        assert!(d.contains("\\setlength{\\qrsize}{5cm}"));
        assert!(d.contains("paperwidth=21cm, paperheight=29.7cm"));
        assert_eq!(fronts(&d), 2);
    }

    #[test]
    fn windows_separators_become_slashes() {
        let d = build_layout_document(
            &[PathBuf::from(r"qr\ecash_0001.png")],
            Path::new(r"art\front.png"),
            Path::new("back.png"),
            &LayoutConfig::default(),
        );
        assert!(d.contains("\\overlayimage{art/front.png}{qr/ecash_0001.png}"));
    }

    /// The `\backimage` definition, up to `\begin{document}`.
    fn back_macro(d: &str) -> &str {
        let start = d.find("\\newcommand{\\backimage}").unwrap();
        let end = d.find("\\begin{document}").unwrap();
        &d[start..end]
    }

    #[test]
    fn backs_have_no_cut_guides_by_default() {
        let d = doc(4);
        assert_eq!(back_macro(&d).matches("\\draw").count(), 0);
        // Fronts keep theirs.
        let front = &d[d.find("\\newcommand{\\overlayimage}").unwrap()..];
        assert!(front.contains("\\draw[thin, dashed]"));
    }

    #[test]
    fn back_cut_guides_are_opt_in() {
        let layout = LayoutConfig {
            back_cut_guides: true,
            ..LayoutConfig::default()
        };
        let d = build_layout_document(
            &artifacts(2),
            Path::new("front.png"),
            Path::new("back.png"),
            &layout,
        );
        let back = back_macro(&d);
        assert_eq!(back.matches("\\draw").count(), 3);
        assert!(back.contains("(0,0) -- (0,\\imgheight); % left"));
        assert_eq!(d.matches("\\newcommand{\\backimage}").count(), 1);
    }

    #[test]
    fn output_is_deterministic() {
        assert_eq!(doc(7), doc(7));
    }
}
