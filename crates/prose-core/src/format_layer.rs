//! Format layer: character formatting over absolute offsets.
//!
//! Ranges may overlap; the effective format at a position is the merge of every range that
//! contains it. The layer keeps its ranges aligned with the text by observing
//! [`TextEvent`]s.

use crate::error::{EngineError, Result};
use crate::format::{FormatRange, FormatType, TextFormat};
use crate::format_index::FormatIndex;
use crate::text_store::{TextEvent, TextObserver, TextStore};

/// Flags whose value is stored in [`TextFormat`] and replaced (not layered) by `add_format`.
const VALUE_FLAGS: FormatType = FormatType(
    FormatType::FONT_FAMILY.0
        | FormatType::FONT_SIZE.0
        | FormatType::FOREGROUND_COLOR.0
        | FormatType::BACKGROUND_COLOR.0,
);

/// Owner of the document's format ranges.
#[derive(Debug, Clone, Default)]
pub struct FormatLayer {
    index: FormatIndex,
}

impl FormatLayer {
    /// Create an empty layer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace all ranges with `ranges` (balanced bulk build).
    pub fn load_ranges(&mut self, ranges: impl IntoIterator<Item = FormatRange>) {
        self.index = FormatIndex::from_ranges(ranges);
        tracing::debug!(ranges = self.index.len(), "loaded format ranges");
    }

    /// Apply `format` over `[start, end)`.
    ///
    /// Flags layer over what is already there. Values (font family, size, colors) replace
    /// the previous value inside the span. Ranges with the same format that overlap or touch
    /// the span are merged into one.
    pub fn add_format(&mut self, start: usize, end: usize, format: TextFormat) -> Result<()> {
        check_span(start, end)?;
        if start == end || format.is_empty() {
            return Ok(());
        }
        let replaced = format.flags & VALUE_FLAGS;
        if !replaced.is_empty() {
            self.remove_format(start, end, replaced)?;
        }
        self.insert_coalesced(FormatRange::new(start, end, format));
        tracing::trace!(start, end, ranges = self.index.len(), "added format");
        Ok(())
    }

    /// Remove `flags` from every range over `[start, end)`, keeping their other attributes.
    pub fn remove_format(&mut self, start: usize, end: usize, flags: FormatType) -> Result<()> {
        check_span(start, end)?;
        if start == end || flags.is_empty() {
            return Ok(());
        }
        self.rewrite_span(start, end, |range| range.format.has(flags), |format| {
            let inner = format.without(flags);
            (!inner.is_empty()).then_some(inner)
        });
        Ok(())
    }

    /// Remove all formatting from `[start, end)`. Ranges extending past the span are trimmed.
    pub fn clear_formats(&mut self, start: usize, end: usize) -> Result<()> {
        check_span(start, end)?;
        if start == end {
            return Ok(());
        }
        self.rewrite_span(start, end, |_| true, |_| None);
        Ok(())
    }

    /// Remove every range.
    pub fn clear_all(&mut self) {
        self.index.clear();
    }

    /// Toggle `flag` over `[start, end)` and return whether it ended up enabled.
    ///
    /// If `flag` is set on every position of the span it is removed from the whole span,
    /// otherwise it is applied to the whole span. An empty span is left alone and reports
    /// `false`.
    pub fn toggle_format(&mut self, start: usize, end: usize, flag: FormatType) -> Result<bool> {
        check_span(start, end)?;
        if start == end {
            return Ok(false);
        }
        if self.has_format_in_range(start, end, flag) {
            self.remove_format(start, end, flag)?;
            Ok(false)
        } else {
            self.add_format(start, end, TextFormat::with_flags(flag))?;
            Ok(true)
        }
    }

    /// Ranges containing `position`.
    pub fn formats_at(&self, position: usize) -> Vec<&FormatRange> {
        self.index.find_at(position)
    }

    /// Effective format at `position`.
    pub fn merged_format_at(&self, position: usize) -> TextFormat {
        self.index
            .find_at(position)
            .into_iter()
            .fold(TextFormat::default(), |acc, range| acc.merged(&range.format))
    }

    /// Ranges intersecting `[start, end)`, unclipped.
    pub fn formats_in_range(&self, start: usize, end: usize) -> Vec<&FormatRange> {
        self.index.find_overlapping(start, end)
    }

    /// Ranges intersecting paragraph `index`, in absolute offsets.
    pub fn formats_for_paragraph(&self, store: &TextStore, index: usize) -> Result<Vec<&FormatRange>> {
        let span = store.paragraph_range(index)?;
        Ok(self.index.find_overlapping(span.start, span.end))
    }

    /// Styled runs of paragraph `index`, relative to the paragraph start.
    ///
    /// The runs cover the paragraph without gaps (unformatted text gets a default format)
    /// and adjacent runs never share a format. An empty paragraph has no runs.
    pub fn runs_for_paragraph(&self, store: &TextStore, index: usize) -> Result<Vec<FormatRange>> {
        let span = store.paragraph_range(index)?;
        if span.is_empty() {
            return Ok(Vec::new());
        }
        let ranges = self.index.find_overlapping(span.start, span.end);

        let mut cuts = vec![span.start, span.end];
        for range in &ranges {
            cuts.push(range.start.clamp(span.start, span.end));
            cuts.push(range.end.clamp(span.start, span.end));
        }
        cuts.sort_unstable();
        cuts.dedup();

        let mut runs: Vec<FormatRange> = Vec::new();
        for window in cuts.windows(2) {
            let (a, b) = (window[0], window[1]);
            let format = ranges
                .iter()
                .filter(|range| range.contains(a))
                .fold(TextFormat::default(), |acc, range| acc.merged(&range.format));
            let (a, b) = (a - span.start, b - span.start);
            match runs.last_mut() {
                Some(last) if last.format == format => last.end = b,
                _ => runs.push(FormatRange::new(a, b, format)),
            }
        }
        Ok(runs)
    }

    /// Whether `flag` is set at `position`.
    pub fn has_format_at(&self, position: usize, flag: FormatType) -> bool {
        self.index
            .find_at(position)
            .iter()
            .any(|range| range.format.has(flag))
    }

    /// Whether `flag` is set on every position of `[start, end)`. `false` for an empty span.
    pub fn has_format_in_range(&self, start: usize, end: usize, flag: FormatType) -> bool {
        if start >= end {
            return false;
        }
        let mut covered = start;
        for range in self.index.find_overlapping(start, end) {
            if !range.format.has(flag) {
                continue;
            }
            if range.start > covered {
                return false;
            }
            covered = covered.max(range.end);
            if covered >= end {
                return true;
            }
        }
        false
    }

    /// Number of stored ranges.
    pub fn range_count(&self) -> usize {
        self.index.len()
    }

    /// Whether no range is stored.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Every range, ordered by start.
    pub fn all_ranges(&self) -> Vec<&FormatRange> {
        self.index.all()
    }

    /// Merge overlapping or adjacent ranges with identical formats and drop duplicates.
    ///
    /// Returns the number of ranges removed.
    pub fn coalesce(&mut self) -> usize {
        let before = self.index.len();
        let mut merged: Vec<FormatRange> = Vec::with_capacity(before);
        for range in self.index.all() {
            // Same-format entries in `merged` are disjoint and ordered, so only the latest
            // one can reach `range`.
            let target = merged.iter_mut().rev().find(|m| m.format == range.format);
            match target {
                Some(m) if m.end >= range.start => m.end = m.end.max(range.end),
                _ => merged.push(range.clone()),
            }
        }
        self.index = FormatIndex::from_ranges(merged);
        let removed = before - self.index.len();
        tracing::debug!(removed, ranges = self.index.len(), "coalesced format ranges");
        removed
    }

    /// Insert `range`, absorbing same-format ranges that overlap or touch it.
    fn insert_coalesced(&mut self, range: FormatRange) {
        let mut merged = range;
        let (lo, hi) = (merged.start.saturating_sub(1), merged.end.saturating_add(1));
        let mut absorbed = false;
        for existing in self.index.find_overlapping(lo, hi) {
            if existing.format == merged.format
                && existing.start <= merged.end
                && existing.end >= merged.start
            {
                merged.start = merged.start.min(existing.start);
                merged.end = merged.end.max(existing.end);
                absorbed = true;
            }
        }
        if absorbed {
            let (start, end) = (merged.start, merged.end);
            let format = merged.format.clone();
            self.index
                .remove_if(|r| r.format == format && r.start >= start && r.end <= end);
        }
        self.index.insert(merged);
    }

    /// Replace every range selected by `affected` that intersects `[start, end)` with its
    /// parts outside the span plus, inside the span, the format produced by `inner`.
    fn rewrite_span<P, F>(&mut self, start: usize, end: usize, affected: P, inner: F)
    where
        P: Fn(&FormatRange) -> bool,
        F: Fn(&TextFormat) -> Option<TextFormat>,
    {
        let targets: Vec<FormatRange> = self
            .index
            .find_overlapping(start, end)
            .into_iter()
            .filter(|range| affected(range))
            .cloned()
            .collect();
        if targets.is_empty() {
            return;
        }
        self.index
            .remove_if(|range| range.overlaps(start, end) && affected(range));

        for range in targets {
            if range.start < start {
                self.insert_coalesced(FormatRange::new(range.start, start, range.format.clone()));
            }
            if range.end > end {
                self.insert_coalesced(FormatRange::new(end, range.end, range.format.clone()));
            }
            if let Some(format) = inner(&range.format) {
                let (a, b) = (range.start.max(start), range.end.min(end));
                self.insert_coalesced(FormatRange::new(a, b, format));
            }
        }
    }
}

impl TextObserver for FormatLayer {
    fn on_text_event(&mut self, event: &TextEvent) {
        match *event {
            TextEvent::TextInserted { offset, len } => {
                self.index.shift_ranges(offset, isize::try_from(len).unwrap_or(isize::MAX));
            }
            TextEvent::TextRemoved { offset, len } => {
                self.index.shift_ranges(offset, -isize::try_from(len).unwrap_or(isize::MAX));
            }
            TextEvent::Reset => self.index.clear(),
            // Separator edits already arrived as text insertions/removals.
            TextEvent::ParagraphChanged { .. }
            | TextEvent::ParagraphInserted { .. }
            | TextEvent::ParagraphRemoved { .. }
            | TextEvent::HeightChanged { .. } => {}
        }
    }
}

fn check_span(start: usize, end: usize) -> Result<()> {
    if start > end {
        return Err(EngineError::InvalidRange { start, end });
    }
    Ok(())
}
