//! Paragraph Line Layout (Headless)
//!
//! Breaks one paragraph into visual lines for a given width. Widths and line heights come
//! from a [`TextMeasurer`]; the built-in [`CellMeasurer`] measures in terminal-style cells
//! (UAX #11 via `unicode-width`) scaled by the run's font size.
//!
//! Wrapping works on extended grapheme clusters, so a cluster is never split across lines.
//! Lines prefer to break after whitespace; a word wider than the line falls back to a
//! cluster break. Trailing whitespace hangs past the right edge instead of starting the next
//! line.

use crate::format::{FormatRange, TextFormat};
use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

/// Cells taken by a tab.
pub const TAB_CELLS: usize = 4;

/// Source of glyph advances and line heights.
pub trait TextMeasurer {
    /// Horizontal advance of one grapheme cluster rendered with `format`.
    fn advance(&self, grapheme: &str, format: &TextFormat) -> f64;

    /// Height of a line of text rendered with `format`.
    fn line_height(&self, format: &TextFormat) -> f64;
}

/// Monospace-cell measurer.
///
/// A narrow character takes one cell, a wide (CJK, fullwidth) character two. Sizes scale with
/// `font_size / base_font_size` for runs that set a font size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellMeasurer {
    /// Width of one cell at the base font size.
    pub cell_width: f64,
    /// Line height at the base font size.
    pub line_height: f64,
    /// Font size (points) that `cell_width` and `line_height` describe.
    pub base_font_size: f64,
}

impl Default for CellMeasurer {
    fn default() -> Self {
        Self {
            cell_width: 8.0,
            line_height: 20.0,
            base_font_size: 12.0,
        }
    }
}

impl CellMeasurer {
    /// Measurer with the given cell size at the default base font size.
    pub fn new(cell_width: f64, line_height: f64) -> Self {
        Self {
            cell_width,
            line_height,
            ..Self::default()
        }
    }

    fn scale(&self, format: &TextFormat) -> f64 {
        match format.font_size {
            Some(size) if size > 0.0 && self.base_font_size > 0.0 => size / self.base_font_size,
            _ => 1.0,
        }
    }
}

impl TextMeasurer for CellMeasurer {
    fn advance(&self, grapheme: &str, format: &TextFormat) -> f64 {
        let cells = if grapheme == "\t" {
            TAB_CELLS
        } else {
            grapheme.width()
        };
        cells as f64 * self.cell_width * self.scale(format)
    }

    fn line_height(&self, format: &TextFormat) -> f64 {
        self.line_height * self.scale(format)
    }
}

/// One visual line of a laid-out paragraph.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutLine {
    /// First character of the line, relative to the paragraph start.
    pub start: usize,
    /// One past the last character of the line (trailing whitespace included).
    pub end: usize,
    /// Width of the line content, trailing whitespace excluded.
    pub width: f64,
    /// Line height.
    pub height: f64,
    /// Top of the line, relative to the paragraph top.
    pub y: f64,
}

struct Cluster {
    char_start: usize,
    advance: f64,
    line_height: f64,
    whitespace: bool,
}

/// Lay out `text` into lines no wider than `width`.
///
/// `runs` are paragraph-relative format runs ordered by start (as produced by
/// `FormatLayer::runs_for_paragraph`); text outside every run uses the default format.
/// `width <= 0` disables wrapping. An empty paragraph yields a single empty line.
pub fn layout_paragraph(
    text: &str,
    runs: &[FormatRange],
    width: f64,
    measurer: &dyn TextMeasurer,
) -> Vec<LayoutLine> {
    let default_format = TextFormat::default();
    let clusters = measure_clusters(text, runs, &default_format, measurer);
    let char_len = text.chars().count();

    if clusters.is_empty() {
        let format = runs.first().map_or(&default_format, |run| &run.format);
        return vec![LayoutLine {
            start: 0,
            end: 0,
            width: 0.0,
            height: measurer.line_height(format),
            y: 0.0,
        }];
    }

    let breaks = wrap_points(&clusters, width);

    let mut lines = Vec::with_capacity(breaks.len() + 1);
    let mut y = 0.0;
    let starts = std::iter::once(0).chain(breaks.iter().copied());
    let ends = breaks.iter().copied().chain(std::iter::once(clusters.len()));
    for (first, last) in starts.zip(ends) {
        let line = &clusters[first..last];
        let height = line
            .iter()
            .map(|c| c.line_height)
            .fold(0.0_f64, f64::max);
        let content = line
            .iter()
            .rposition(|c| !c.whitespace)
            .map_or(0, |i| i + 1);
        let line_width: f64 = line[..content].iter().map(|c| c.advance).sum();
        let end = clusters.get(last).map_or(char_len, |c| c.char_start);

        lines.push(LayoutLine {
            start: line[0].char_start,
            end,
            width: line_width,
            height,
            y,
        });
        y += height;
    }
    lines
}

/// Total height of a set of lines.
pub fn lines_height(lines: &[LayoutLine]) -> f64 {
    lines.iter().map(|line| line.height).sum()
}

fn measure_clusters(
    text: &str,
    runs: &[FormatRange],
    default_format: &TextFormat,
    measurer: &dyn TextMeasurer,
) -> Vec<Cluster> {
    let mut clusters = Vec::new();
    let mut char_start = 0usize;
    let mut run_index = 0usize;

    for grapheme in text.graphemes(true) {
        while run_index < runs.len() && runs[run_index].end <= char_start {
            run_index += 1;
        }
        let format = match runs.get(run_index) {
            Some(run) if run.contains(char_start) => &run.format,
            _ => default_format,
        };

        clusters.push(Cluster {
            char_start,
            advance: measurer.advance(grapheme, format),
            line_height: measurer.line_height(format),
            whitespace: grapheme.chars().all(char::is_whitespace),
        });
        char_start += grapheme.chars().count();
    }
    clusters
}

/// Cluster indices where a new line begins.
fn wrap_points(clusters: &[Cluster], width: f64) -> Vec<usize> {
    let mut points = Vec::new();
    if width <= 0.0 || width.is_nan() {
        return points;
    }

    let mut segment_start = 0usize;
    let mut segment_start_x = 0.0;
    // (cluster index after the whitespace, x at that point)
    let mut last_break: Option<(usize, f64)> = None;
    let mut x = 0.0;

    for (index, cluster) in clusters.iter().enumerate() {
        // Whitespace hangs past the edge.
        if !cluster.whitespace {
            loop {
                if x - segment_start_x + cluster.advance <= width {
                    break;
                }
                if let Some((break_index, break_x)) = last_break
                    && break_index > segment_start
                {
                    points.push(break_index);
                    segment_start = break_index;
                    segment_start_x = break_x;
                    last_break = None;
                    continue;
                }
                // No whitespace to break at: split the word before this cluster, unless the
                // cluster alone is wider than the line.
                if index > segment_start {
                    points.push(index);
                    segment_start = index;
                    segment_start_x = x;
                }
                last_break = None;
                break;
            }
        }

        x += cluster.advance;
        if cluster.whitespace {
            last_break = Some((index + 1, x));
        }
    }
    points
}
