//! Viewport-Driven Layout Cache
//!
//! Exact line layout is only computed for paragraphs around the viewport; everything else
//! keeps its estimated height in the [`TextStore`]. Measured heights are pushed back to the
//! store as soon as a paragraph is laid out, so position queries sharpen as the user scrolls.
//!
//! # Paragraph states
//!
//! ```text
//!   Estimated ──layout──► Calculating ──► Calculated
//!       ▲                                     │
//!       └──── text / format / width change ───┘
//! ```
//!
//! # Memory bound
//!
//! Entries are kept in a map keyed by paragraph index, with a logical clock recording the
//! last pass that touched each one. When the map grows past `max_cached_layouts`, entries
//! outside the buffer zone go first, then the least recently used ones. Entries in the
//! visible range are never evicted.

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::format::TextFormat;
use crate::format_layer::FormatLayer;
use crate::paragraph_layout::{CellMeasurer, LayoutLine, TextMeasurer, layout_paragraph, lines_height};
use crate::text_store::{HeightState, TextEvent, TextObserver, TextStore};
use std::collections::HashMap;
use std::ops::{Range, RangeInclusive};

/// Layout state of one paragraph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LayoutState {
    /// No valid layout; the store holds an estimate or a stale measurement.
    #[default]
    Estimated,
    /// Layout in progress.
    Calculating,
    /// Layout is up to date.
    Calculated,
}

/// Cached layout of one paragraph.
#[derive(Debug, Clone)]
pub struct LayoutEntry {
    /// Paragraph this entry belongs to.
    pub paragraph_index: usize,
    /// Visual lines, paragraph-relative.
    pub lines: Vec<LayoutLine>,
    /// Sum of the line heights.
    pub measured_height: f64,
    /// Logical time of the last access.
    pub last_access_tick: u64,
    /// Whether `lines` reflects the current text.
    pub state: LayoutState,
}

impl LayoutEntry {
    fn new(paragraph_index: usize) -> Self {
        Self {
            paragraph_index,
            lines: Vec::new(),
            measured_height: 0.0,
            last_access_tick: 0,
            state: LayoutState::Estimated,
        }
    }

    /// Paragraph-relative offsets where a wrapped line starts (the first line excluded).
    pub fn line_breaks(&self) -> Vec<usize> {
        self.lines.iter().skip(1).map(|line| line.start).collect()
    }

    /// Number of visual lines.
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }
}

/// Position and size of a paragraph in document coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParagraphRect {
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    /// Width.
    pub width: f64,
    /// Height (measured or estimated).
    pub height: f64,
}

/// Summary of one [`LayoutCache::layout_visible`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LayoutPass {
    /// Paragraphs laid out during the pass.
    pub laid_out: usize,
    /// Entries evicted at the end of the pass.
    pub evicted: usize,
    /// Entries cached after the pass.
    pub cached: usize,
}

/// Lazily computed, memory-bounded paragraph layouts.
pub struct LayoutCache {
    entries: HashMap<usize, LayoutEntry>,
    measurer: Box<dyn TextMeasurer + Send>,
    layout_width: f64,
    buffer_size: usize,
    max_cached: usize,
    viewport_y: f64,
    viewport_height: f64,
    /// Inclusive visible paragraph range; `None` when the viewport has no height.
    visible: Option<(usize, usize)>,
    /// Last known first visible paragraph.
    anchor: usize,
    paragraph_count: usize,
    tick: u64,
}

impl Default for LayoutCache {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

impl std::fmt::Debug for LayoutCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayoutCache")
            .field("entries", &self.entries.len())
            .field("layout_width", &self.layout_width)
            .field("visible", &self.visible)
            .field("anchor", &self.anchor)
            .field("tick", &self.tick)
            .finish()
    }
}

impl LayoutCache {
    /// Create a cache using a default [`CellMeasurer`].
    pub fn new(config: &EngineConfig) -> Self {
        Self::with_measurer(config, CellMeasurer::default())
    }

    /// Create a cache using `measurer`.
    pub fn with_measurer<M>(config: &EngineConfig, measurer: M) -> Self
    where
        M: TextMeasurer + Send + 'static,
    {
        Self {
            entries: HashMap::new(),
            measurer: Box::new(measurer),
            layout_width: config.layout_width,
            buffer_size: config.viewport_buffer_size,
            max_cached: config.max_cached_layouts.max(1),
            viewport_y: 0.0,
            viewport_height: 0.0,
            visible: None,
            anchor: 0,
            paragraph_count: 0,
            tick: 0,
        }
    }

    /// Width available to each line.
    pub fn layout_width(&self) -> f64 {
        self.layout_width
    }

    /// Change the wrap width. Every layout is dropped and every height goes back to an
    /// estimate.
    pub fn set_layout_width(&mut self, store: &mut TextStore, width: f64) {
        if self.layout_width == width {
            return;
        }
        self.layout_width = width;
        self.entries.clear();
        store.invalidate_all_heights();
        tracing::debug!(width, "layout width changed");
    }

    /// Replace the measurer. Every layout is dropped, and the store's estimated line height
    /// follows the new measurer's default line height.
    pub fn set_measurer<M>(&mut self, store: &mut TextStore, measurer: M) -> Result<()>
    where
        M: TextMeasurer + Send + 'static,
    {
        let line_height = measurer.line_height(&TextFormat::default());
        store.set_estimation(line_height, store.estimated_chars_per_line())?;
        self.measurer = Box::new(measurer);
        self.entries.clear();
        store.invalidate_all_heights();
        tracing::debug!(line_height, "measurer changed");
        Ok(())
    }

    // ---- Viewport ----------------------------------------------------------------------------

    /// Move the viewport to `[y, y + height)` and recompute the visible range.
    pub fn set_viewport(&mut self, store: &TextStore, y: f64, height: f64) {
        self.viewport_y = if y.is_finite() { y.max(0.0) } else { 0.0 };
        self.viewport_height = height;
        self.resolve_visible(store);
    }

    /// Current viewport as `(y, height)`.
    pub fn viewport(&self) -> (f64, f64) {
        (self.viewport_y, self.viewport_height)
    }

    /// First visible paragraph, or the last known one when the viewport is empty.
    pub fn first_visible(&self) -> usize {
        self.anchor
    }

    /// Last visible paragraph, `None` when the viewport is empty.
    pub fn last_visible(&self) -> Option<usize> {
        self.visible.map(|(_, last)| last)
    }

    /// Visible paragraphs, `None` when the viewport is empty.
    pub fn visible_range(&self) -> Option<RangeInclusive<usize>> {
        self.visible.map(|(first, last)| first..=last)
    }

    /// Paragraphs kept laid out: the visible range widened by the buffer size on each side.
    pub fn buffer_range(&self) -> Range<usize> {
        let (first, last) = self.visible.unwrap_or((self.anchor, self.anchor));
        let end = last
            .saturating_add(self.buffer_size)
            .saturating_add(1)
            .min(self.paragraph_count);
        let start = first.saturating_sub(self.buffer_size).min(end);
        start..end
    }

    /// Lay out every paragraph in the buffer range and return a summary.
    ///
    /// Measured heights move paragraphs around, so the visible range is resolved again until
    /// it stops changing. On return every visible paragraph is [`LayoutState::Calculated`].
    pub fn layout_visible(&mut self, store: &mut TextStore, formats: &FormatLayer) -> Result<LayoutPass> {
        self.tick += 1;
        let mut laid_out = 0;
        loop {
            self.resolve_visible(store);
            let mut fresh = 0;
            for index in self.buffer_range() {
                let measured = store
                    .height_state(index)
                    .is_ok_and(|state| state == HeightState::Calculated);
                if measured && self.layout_state(index) == LayoutState::Calculated {
                    self.touch(index);
                } else {
                    self.compute(store, formats, index)?;
                    fresh += 1;
                }
            }
            laid_out += fresh;
            // Nothing moved: the resolved range is final.
            if fresh == 0 {
                break;
            }
        }

        let evicted = self.enforce_limit();
        let pass = LayoutPass {
            laid_out,
            evicted,
            cached: self.entries.len(),
        };
        tracing::debug!(
            laid_out,
            evicted,
            cached = pass.cached,
            first = self.anchor,
            last = ?self.last_visible(),
            "layout pass"
        );
        Ok(pass)
    }

    // ---- Entries -----------------------------------------------------------------------------

    /// Lay out paragraph `index` now and push its height to the store.
    pub fn layout_paragraph(
        &mut self,
        store: &mut TextStore,
        formats: &FormatLayer,
        index: usize,
    ) -> Result<&LayoutEntry> {
        self.tick += 1;
        self.paragraph_count = store.paragraph_count();
        self.compute(store, formats, index)?;
        self.entries
            .get(&index)
            .ok_or(EngineError::ParagraphOutOfRange {
                index,
                count: self.paragraph_count,
            })
    }

    /// Cached entry of paragraph `index`, whatever its state.
    pub fn entry(&self, index: usize) -> Option<&LayoutEntry> {
        self.entries.get(&index)
    }

    /// Mark paragraph `index` as used now. Returns `false` if it has no entry.
    pub fn touch(&mut self, index: usize) -> bool {
        match self.entries.get_mut(&index) {
            Some(entry) => {
                entry.last_access_tick = self.tick;
                true
            }
            None => false,
        }
    }

    /// Whether paragraph `index` has an up-to-date layout.
    pub fn has_layout(&self, index: usize) -> bool {
        self.layout_state(index) == LayoutState::Calculated
    }

    /// State of paragraph `index` (`Estimated` when not cached).
    pub fn layout_state(&self, index: usize) -> LayoutState {
        self.entries
            .get(&index)
            .map_or(LayoutState::Estimated, |entry| entry.state)
    }

    /// Number of cached entries.
    pub fn layout_count(&self) -> usize {
        self.entries.len()
    }

    /// Number of cached entries in the `Calculated` state.
    pub fn calculated_count(&self) -> usize {
        self.entries
            .values()
            .filter(|entry| entry.state == LayoutState::Calculated)
            .count()
    }

    /// Mark paragraph `index` for re-layout.
    pub fn invalidate_layout(&mut self, index: usize) {
        if let Some(entry) = self.entries.get_mut(&index) {
            entry.state = LayoutState::Estimated;
        }
    }

    /// Mark every cached paragraph for re-layout.
    pub fn invalidate_all_layouts(&mut self) {
        for entry in self.entries.values_mut() {
            entry.state = LayoutState::Estimated;
        }
    }

    /// Drop every cached entry.
    pub fn clear_layouts(&mut self) {
        self.entries.clear();
    }

    /// Drop every entry outside the buffer range, then apply the cache limit.
    ///
    /// Returns the number of dropped entries.
    pub fn release_distant_layouts(&mut self) -> usize {
        let keep = self.buffer_range();
        let before = self.entries.len();
        self.entries.retain(|index, _| keep.contains(index));
        let released = before - self.entries.len();
        released + self.enforce_limit()
    }

    /// Position and size of paragraph `index`.
    ///
    /// The width is the layout width, or the widest line when wrapping is disabled.
    pub fn paragraph_rect(&self, store: &TextStore, index: usize) -> Result<ParagraphRect> {
        let y = store.get_paragraph_y(index)?;
        let height = store.height(index)?.value;
        let width = if self.layout_width > 0.0 {
            self.layout_width
        } else {
            self.entries.get(&index).map_or(0.0, |entry| {
                entry.lines.iter().map(|line| line.width).fold(0.0, f64::max)
            })
        };
        Ok(ParagraphRect {
            x: 0.0,
            y,
            width,
            height,
        })
    }

    // ---- Internals ---------------------------------------------------------------------------

    fn resolve_visible(&mut self, store: &TextStore) {
        let count = store.paragraph_count();
        self.paragraph_count = count;
        let last_index = count.saturating_sub(1);

        if self.viewport_height <= 0.0 || self.viewport_height.is_nan() {
            self.visible = None;
            self.anchor = self.anchor.min(last_index);
            return;
        }

        let top = self.viewport_y;
        let bottom = top + self.viewport_height;
        let first = store.get_paragraph_at_y(top).min(last_index);
        let mut last = store.get_paragraph_at_y(bottom).min(last_index);
        // A paragraph starting exactly at the bottom edge is not visible.
        if last > first && store.get_paragraph_y(last).is_ok_and(|y| y >= bottom) {
            last -= 1;
        }
        self.visible = Some((first, last));
        self.anchor = first;
    }

    fn compute(&mut self, store: &mut TextStore, formats: &FormatLayer, index: usize) -> Result<()> {
        let text = store.paragraph_text(index)?;
        let runs = formats.runs_for_paragraph(store, index)?;

        let entry = self
            .entries
            .entry(index)
            .or_insert_with(|| LayoutEntry::new(index));
        entry.state = LayoutState::Calculating;
        let lines = layout_paragraph(&text, &runs, self.layout_width, self.measurer.as_ref());
        let height = lines_height(&lines);
        if !height.is_finite() || height < 0.0 {
            entry.state = LayoutState::Estimated;
            return Err(EngineError::InvalidHeight(height));
        }

        entry.lines = lines;
        entry.measured_height = height;
        entry.last_access_tick = self.tick;
        entry.state = LayoutState::Calculated;
        tracing::trace!(index, lines = entry.lines.len(), height, "laid out paragraph");

        store.set_paragraph_height(index, height)?;
        Ok(())
    }

    /// Evict down to `max_cached`: entries outside the buffer first, then the least recently
    /// used, farthest from the viewport first. Visible entries stay.
    fn enforce_limit(&mut self) -> usize {
        if self.entries.len() <= self.max_cached {
            return 0;
        }
        let buffer = self.buffer_range();
        let visible = self.visible_range();
        let anchor = self.anchor;

        let mut candidates: Vec<(bool, u64, usize, usize)> = self
            .entries
            .iter()
            .filter(|(index, _)| !visible.as_ref().is_some_and(|v| v.contains(*index)))
            .map(|(&index, entry)| {
                (
                    buffer.contains(&index),
                    entry.last_access_tick,
                    usize::MAX - index.abs_diff(anchor),
                    index,
                )
            })
            .collect();
        candidates.sort_unstable();

        let excess = self.entries.len() - self.max_cached;
        let mut evicted = 0;
        for (_, _, _, index) in candidates.into_iter().take(excess) {
            self.entries.remove(&index);
            evicted += 1;
        }
        evicted
    }

    fn shift_keys(&mut self, from: usize, up: bool) {
        let entries = std::mem::take(&mut self.entries);
        self.entries = entries
            .into_iter()
            .map(|(index, mut entry)| {
                let index = match (index >= from, up) {
                    (true, true) => index + 1,
                    (true, false) => index - 1,
                    (false, _) => index,
                };
                entry.paragraph_index = index;
                (index, entry)
            })
            .collect();
    }
}

impl TextObserver for LayoutCache {
    fn on_text_event(&mut self, event: &TextEvent) {
        match *event {
            TextEvent::ParagraphChanged { index } => self.invalidate_layout(index),
            TextEvent::ParagraphInserted { index } => {
                self.shift_keys(index, true);
                self.paragraph_count += 1;
            }
            TextEvent::ParagraphRemoved { index } => {
                self.entries.remove(&index);
                self.shift_keys(index + 1, false);
                self.paragraph_count = self.paragraph_count.saturating_sub(1);
            }
            TextEvent::Reset => {
                self.entries.clear();
                self.visible = None;
                self.anchor = 0;
                self.paragraph_count = 0;
            }
            TextEvent::HeightChanged { index, new, .. } => {
                // Someone else moved the height: the cached lines no longer back it.
                if let Some(entry) = self.entries.get_mut(&index)
                    && entry.measured_height != new
                {
                    entry.state = LayoutState::Estimated;
                }
            }
            TextEvent::TextInserted { .. } | TextEvent::TextRemoved { .. } => {}
        }
    }
}
