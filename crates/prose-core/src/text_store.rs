//! Paragraph Text Store
//!
//! [`TextStore`] owns the document text and the per-paragraph heights, and keeps the two in
//! step across every edit.
//!
//! # Model
//!
//! - The text is a single [`Rope`]. Paragraph `i` is rope line `i`; paragraphs are separated
//!   by one `'\n'`, which occupies one position in the absolute character offset space.
//! - An empty document is one empty paragraph.
//! - Every paragraph has a [`ParagraphHeight`]: either an estimate derived from its length or
//!   a measured value pushed back by layout. The heights are mirrored into a [`HeightIndex`]
//!   for O(log n) position queries.
//!
//! # Notifications
//!
//! Each mutating call validates its arguments first, commits the change, and only then
//! reports it. The events are returned to the caller (for explicit dispatch, see
//! [`TextObserver`]) and passed to every closure registered with [`TextStore::subscribe`].

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::height_index::HeightIndex;
use ropey::Rope;
use std::borrow::Cow;

/// Whether a paragraph height is a guess or a measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeightState {
    /// Derived from the paragraph length.
    Estimated,
    /// Measured by layout.
    Calculated,
}

/// Height record of one paragraph.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParagraphHeight {
    /// Height in layout units.
    pub value: f64,
    /// Where the value came from.
    pub state: HeightState,
}

/// A committed change to a [`TextStore`].
#[derive(Debug, Clone, PartialEq)]
pub enum TextEvent {
    /// `len` characters were inserted at absolute offset `offset`.
    TextInserted {
        /// Absolute character offset of the insertion.
        offset: usize,
        /// Number of inserted characters (separators included).
        len: usize,
    },
    /// `len` characters were removed at absolute offset `offset`.
    TextRemoved {
        /// Absolute character offset of the removal.
        offset: usize,
        /// Number of removed characters (separators included).
        len: usize,
    },
    /// The content of paragraph `index` changed.
    ParagraphChanged {
        /// Paragraph index after the edit.
        index: usize,
    },
    /// A paragraph now exists at `index`; the former paragraphs `>= index` moved up by one.
    ParagraphInserted {
        /// Index of the new paragraph.
        index: usize,
    },
    /// The paragraph at `index` was removed; the former paragraphs `> index` moved down by one.
    ParagraphRemoved {
        /// Index of the removed paragraph.
        index: usize,
    },
    /// The height of paragraph `index` changed.
    HeightChanged {
        /// Paragraph index.
        index: usize,
        /// Previous height.
        old: f64,
        /// New height.
        new: f64,
    },
    /// The whole content was replaced.
    Reset,
}

/// Receiver of [`TextEvent`]s dispatched by an owner of the store.
pub trait TextObserver {
    /// Handle one committed event.
    fn on_text_event(&mut self, event: &TextEvent);
}

/// Callback registered with [`TextStore::subscribe`].
pub type TextEventCallback = Box<dyn FnMut(&TextEvent) + Send>;

/// Handle returned by [`TextStore::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Paragraph-oriented text storage with height tracking.
pub struct TextStore {
    rope: Rope,
    heights: Vec<ParagraphHeight>,
    index: HeightIndex,
    estimated_line_height: f64,
    estimated_chars_per_line: usize,
    listeners: Vec<(ListenerId, TextEventCallback)>,
    next_listener: u64,
}

impl Default for TextStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TextStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextStore")
            .field("paragraphs", &self.paragraph_count())
            .field("chars", &self.char_count())
            .field("total_height", &self.total_height())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl TextStore {
    /// Create a store holding one empty paragraph, with default estimation settings.
    pub fn new() -> Self {
        Self::with_config(&EngineConfig::default())
    }

    /// Create an empty store using the estimation settings of `config`.
    pub fn with_config(config: &EngineConfig) -> Self {
        let mut store = Self {
            rope: Rope::new(),
            heights: Vec::new(),
            index: HeightIndex::new(),
            estimated_line_height: config.estimated_line_height,
            estimated_chars_per_line: config.estimated_chars_per_line.max(1),
            listeners: Vec::new(),
            next_listener: 0,
        };
        store.rebuild_heights();
        store
    }

    /// Create a store from a list of paragraphs, with default estimation settings.
    pub fn from_paragraphs<I, S>(paragraphs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut store = Self::new();
        store.load_paragraphs(paragraphs);
        store
    }

    /// Replace the whole content with `paragraphs`.
    ///
    /// Heights are rebuilt as estimates in O(n) and a single [`TextEvent::Reset`] is emitted.
    /// Separators embedded in a paragraph split it further.
    pub fn load_paragraphs<I, S>(&mut self, paragraphs: I) -> Vec<TextEvent>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut text = String::new();
        for (i, paragraph) in paragraphs.into_iter().enumerate() {
            if i > 0 {
                text.push('\n');
            }
            text.push_str(&normalize_newlines(paragraph.as_ref()));
        }
        self.rope = Rope::from_str(&text);
        self.rebuild_heights();
        tracing::debug!(
            paragraphs = self.paragraph_count(),
            chars = self.char_count(),
            "loaded paragraphs"
        );

        let events = vec![TextEvent::Reset];
        self.notify(&events);
        events
    }

    /// Register a callback invoked for every committed event.
    pub fn subscribe<F>(&mut self, callback: F) -> ListenerId
    where
        F: FnMut(&TextEvent) + Send + 'static,
    {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, Box::new(callback)));
        id
    }

    /// Remove a callback. Returns `false` if `id` was not registered.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener, _)| *listener != id);
        self.listeners.len() != before
    }

    // ---- Text access -------------------------------------------------------------------------

    /// Number of paragraphs (at least 1).
    pub fn paragraph_count(&self) -> usize {
        self.rope.len_lines()
    }

    /// Number of characters in the document, separators included.
    pub fn char_count(&self) -> usize {
        self.rope.len_chars()
    }

    /// The whole document, paragraphs joined by `'\n'`.
    pub fn text(&self) -> String {
        self.rope.to_string()
    }

    /// Text of the absolute character span `[start, end)`.
    pub fn slice(&self, start: usize, end: usize) -> Result<String> {
        if start > end {
            return Err(EngineError::InvalidRange { start, end });
        }
        self.check_offset(end)?;
        Ok(self.rope.slice(start..end).to_string())
    }

    /// Text of paragraph `index`, without its separator.
    pub fn paragraph_text(&self, index: usize) -> Result<String> {
        let range = self.paragraph_range(index)?;
        Ok(self.rope.slice(range).to_string())
    }

    /// Length of paragraph `index` in characters, without its separator.
    pub fn paragraph_len(&self, index: usize) -> Result<usize> {
        self.check_paragraph(index)?;
        Ok(self.len_of(index))
    }

    /// Absolute offset of the first character of paragraph `index`.
    pub fn paragraph_start(&self, index: usize) -> Result<usize> {
        self.check_paragraph(index)?;
        Ok(self.rope.line_to_char(index))
    }

    /// Absolute span of paragraph `index`, without its separator.
    pub fn paragraph_range(&self, index: usize) -> Result<std::ops::Range<usize>> {
        let start = self.paragraph_start(index)?;
        Ok(start..start + self.len_of(index))
    }

    /// Map an absolute offset to `(paragraph, offset within paragraph)`.
    ///
    /// The offset of a separator maps to the end of the paragraph it terminates.
    pub fn paragraph_at_offset(&self, offset: usize) -> Result<(usize, usize)> {
        self.check_offset(offset)?;
        let paragraph = self.rope.char_to_line(offset);
        Ok((paragraph, offset - self.rope.line_to_char(paragraph)))
    }

    // ---- Edits -------------------------------------------------------------------------------

    /// Insert `text` at absolute offset `position`.
    ///
    /// `"\r\n"` and lone `'\r'` are stored as `'\n'`; every separator creates a paragraph.
    /// Emits [`TextEvent::TextInserted`], then [`TextEvent::ParagraphChanged`] for the edited
    /// paragraph, then [`TextEvent::ParagraphInserted`] for each new paragraph in ascending
    /// order.
    pub fn insert_text(&mut self, position: usize, text: &str) -> Result<Vec<TextEvent>> {
        self.check_offset(position)?;
        let text = normalize_newlines(text);
        if text.is_empty() {
            return Ok(Vec::new());
        }

        let first = self.rope.char_to_line(position);
        let len = text.chars().count();
        let created = text.bytes().filter(|&b| b == b'\n').count();
        self.rope.insert(position, &text);
        self.reestimate(first, first + 1, created + 1)?;

        tracing::trace!(position, len, paragraph = first, created, "inserted text");
        let mut events = Vec::with_capacity(created + 2);
        events.push(TextEvent::TextInserted {
            offset: position,
            len,
        });
        events.push(TextEvent::ParagraphChanged { index: first });
        events.extend((first + 1..=first + created).map(|index| TextEvent::ParagraphInserted { index }));
        self.notify(&events);
        Ok(events)
    }

    /// Remove `length` characters starting at absolute offset `position`.
    ///
    /// Removing separators merges the paragraphs around them. Emits
    /// [`TextEvent::TextRemoved`], then [`TextEvent::ParagraphRemoved`] for each merged
    /// paragraph from the last down, then [`TextEvent::ParagraphChanged`] for the survivor.
    pub fn remove_text(&mut self, position: usize, length: usize) -> Result<Vec<TextEvent>> {
        let end = position
            .checked_add(length)
            .ok_or(EngineError::OffsetOutOfRange {
                offset: position,
                len: self.char_count(),
            })?;
        self.check_offset(end)?;
        if length == 0 {
            return Ok(Vec::new());
        }

        let first = self.rope.char_to_line(position);
        let last = self.rope.char_to_line(end);
        self.rope.remove(position..end);
        self.reestimate(first, last + 1, 1)?;

        tracing::trace!(position, length, paragraph = first, merged = last - first, "removed text");
        let mut events = Vec::with_capacity(last - first + 2);
        events.push(TextEvent::TextRemoved {
            offset: position,
            len: length,
        });
        events.extend(
            (first + 1..=last)
                .rev()
                .map(|index| TextEvent::ParagraphRemoved { index }),
        );
        events.push(TextEvent::ParagraphChanged { index: first });
        self.notify(&events);
        Ok(events)
    }

    /// Split paragraph `index` at `offset` (characters from its start).
    pub fn split_paragraph(&mut self, index: usize, offset: usize) -> Result<Vec<TextEvent>> {
        let range = self.paragraph_range(index)?;
        if offset > range.len() {
            return Err(EngineError::OffsetOutOfRange {
                offset,
                len: range.len(),
            });
        }
        self.insert_text(range.start + offset, "\n")
    }

    /// Join paragraph `index` with paragraph `index + 1`.
    pub fn merge_paragraph(&mut self, index: usize) -> Result<Vec<TextEvent>> {
        self.check_paragraph(index.saturating_add(1))?;
        let separator = self.paragraph_range(index)?.end;
        self.remove_text(separator, 1)
    }

    // ---- Heights -----------------------------------------------------------------------------

    /// Index of the paragraph covering `y`.
    ///
    /// Returns [`paragraph_count`](Self::paragraph_count) when `y` is at or below the bottom
    /// of the document, and 0 for negative `y`.
    pub fn get_paragraph_at_y(&self, y: f64) -> usize {
        self.index.find_index_for_y(y)
    }

    /// Top of paragraph `index`.
    pub fn get_paragraph_y(&self, index: usize) -> Result<f64> {
        self.check_paragraph(index)?;
        Ok(self.index.prefix_sum(index))
    }

    /// Height of the whole document.
    pub fn total_height(&self) -> f64 {
        self.index.total_height()
    }

    /// Height record of paragraph `index`.
    pub fn height(&self, index: usize) -> Result<ParagraphHeight> {
        self.heights
            .get(index)
            .copied()
            .ok_or(EngineError::ParagraphOutOfRange {
                index,
                count: self.heights.len(),
            })
    }

    /// Whether the height of paragraph `index` is estimated or measured.
    pub fn height_state(&self, index: usize) -> Result<HeightState> {
        Ok(self.height(index)?.state)
    }

    /// Number of paragraphs with a measured height.
    pub fn calculated_paragraph_count(&self) -> usize {
        self.heights
            .iter()
            .filter(|h| h.state == HeightState::Calculated)
            .count()
    }

    /// Record a measured height for paragraph `index`.
    pub fn set_paragraph_height(&mut self, index: usize, value: f64) -> Result<Vec<TextEvent>> {
        self.set_paragraph_height_with_state(index, value, HeightState::Calculated)
    }

    /// Set the height of paragraph `index` together with its state.
    ///
    /// Emits [`TextEvent::HeightChanged`] when the value changes. Heights must be finite and
    /// non-negative.
    pub fn set_paragraph_height_with_state(
        &mut self,
        index: usize,
        value: f64,
        state: HeightState,
    ) -> Result<Vec<TextEvent>> {
        if !value.is_finite() || value < 0.0 {
            return Err(EngineError::InvalidHeight(value));
        }
        let old = self.height(index)?.value;
        self.heights[index] = ParagraphHeight { value, state };
        if old == value {
            return Ok(Vec::new());
        }
        self.index.set_height(index, value)?;

        let events = vec![TextEvent::HeightChanged {
            index,
            old,
            new: value,
        }];
        self.notify(&events);
        Ok(events)
    }

    /// Drop the measured height of paragraph `index` in favour of a fresh estimate.
    pub fn invalidate_height(&mut self, index: usize) -> Result<Vec<TextEvent>> {
        self.check_paragraph(index)?;
        let estimate = self.estimate_height(self.len_of(index));
        self.set_paragraph_height_with_state(index, estimate, HeightState::Estimated)
    }

    /// Reset every paragraph to its estimated height. No events are emitted.
    pub fn invalidate_all_heights(&mut self) {
        self.rebuild_heights();
        tracing::debug!(paragraphs = self.paragraph_count(), "invalidated all heights");
    }

    /// Change the estimation parameters and re-estimate every estimated paragraph.
    ///
    /// Measured heights are kept. No events are emitted.
    pub fn set_estimation(&mut self, line_height: f64, chars_per_line: usize) -> Result<()> {
        EngineConfig::default()
            .with_estimated_line_height(line_height)
            .with_estimated_chars_per_line(chars_per_line)
            .validate()?;
        self.estimated_line_height = line_height;
        self.estimated_chars_per_line = chars_per_line;

        for i in 0..self.heights.len() {
            if self.heights[i].state == HeightState::Estimated {
                self.heights[i].value = self.estimate_height(self.len_of(i));
            }
        }
        self.index = HeightIndex::from_heights(self.heights.iter().map(|h| h.value).collect());
        tracing::debug!(line_height, chars_per_line, "changed height estimation");
        Ok(())
    }

    /// Line height used for estimates.
    pub fn estimated_line_height(&self) -> f64 {
        self.estimated_line_height
    }

    /// Characters per line used for estimates.
    pub fn estimated_chars_per_line(&self) -> usize {
        self.estimated_chars_per_line
    }

    /// Estimated height of a paragraph of `chars` characters.
    ///
    /// `max(1, ceil(chars / chars_per_line)) * line_height`: an empty paragraph still takes one
    /// line.
    pub fn estimate_height(&self, chars: usize) -> f64 {
        let lines = chars.div_ceil(self.estimated_chars_per_line).max(1);
        lines as f64 * self.estimated_line_height
    }

    // ---- Internals ---------------------------------------------------------------------------

    fn check_paragraph(&self, index: usize) -> Result<()> {
        let count = self.paragraph_count();
        if index >= count {
            return Err(EngineError::ParagraphOutOfRange { index, count });
        }
        Ok(())
    }

    fn check_offset(&self, offset: usize) -> Result<()> {
        let len = self.char_count();
        if offset > len {
            return Err(EngineError::OffsetOutOfRange { offset, len });
        }
        Ok(())
    }

    /// Paragraph length without the separator. `index` must be valid.
    fn len_of(&self, index: usize) -> usize {
        let len = self.rope.line(index).len_chars();
        if index + 1 < self.paragraph_count() {
            len - 1
        } else {
            len
        }
    }

    /// Replace the height records of the old paragraphs `[start, end)` with fresh estimates
    /// for the `count` paragraphs now starting at `start`.
    fn reestimate(&mut self, start: usize, end: usize, count: usize) -> Result<()> {
        let fresh: Vec<ParagraphHeight> = (start..start + count)
            .map(|i| ParagraphHeight {
                value: self.estimate_height(self.len_of(i)),
                state: HeightState::Estimated,
            })
            .collect();

        // Typing inside one paragraph stays an O(log n) point update.
        if end - start == 1 && count == 1 {
            self.heights[start] = fresh[0];
            return self.index.set_height(start, fresh[0].value);
        }

        self.index
            .splice(start..end, fresh.iter().map(|h| h.value))?;
        self.heights.splice(start..end, fresh);
        Ok(())
    }

    fn rebuild_heights(&mut self) {
        self.heights = (0..self.paragraph_count())
            .map(|i| ParagraphHeight {
                value: self.estimate_height(self.len_of(i)),
                state: HeightState::Estimated,
            })
            .collect();
        self.index = HeightIndex::from_heights(self.heights.iter().map(|h| h.value).collect());
    }

    fn notify(&mut self, events: &[TextEvent]) {
        for (_, callback) in &mut self.listeners {
            for event in events {
                callback(event);
            }
        }
    }
}

/// Store `"\r\n"` and lone `'\r'` as `'\n'`.
fn normalize_newlines(text: &str) -> Cow<'_, str> {
    if !text.contains('\r') {
        return Cow::Borrowed(text);
    }
    Cow::Owned(text.replace("\r\n", "\n").replace('\r', "\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn sample() -> TextStore {
        TextStore::from_paragraphs(["Hello world", "Second paragraph", "Third"])
    }

    #[test]
    fn test_empty_store_has_one_paragraph() {
        let store = TextStore::new();
        assert_eq!(store.paragraph_count(), 1);
        assert_eq!(store.char_count(), 0);
        assert_eq!(store.paragraph_text(0).unwrap(), "");
        assert_eq!(store.total_height(), 20.0);
    }

    #[test]
    fn test_height_scenario() {
        let mut store = sample();
        assert_eq!(store.total_height(), 60.0);

        store.set_paragraph_height(1, 40.0).unwrap();
        assert_eq!(store.total_height(), 80.0);
        assert_eq!(store.get_paragraph_y(2).unwrap(), 60.0);
        assert_eq!(store.height_state(1).unwrap(), HeightState::Calculated);
        assert_eq!(store.calculated_paragraph_count(), 1);
    }

    #[test]
    fn test_paragraph_accessors() {
        let store = sample();
        assert_eq!(store.paragraph_count(), 3);
        assert_eq!(store.paragraph_text(1).unwrap(), "Second paragraph");
        assert_eq!(store.paragraph_start(1).unwrap(), 12);
        assert_eq!(store.paragraph_range(2).unwrap(), 29..34);
        assert_eq!(store.paragraph_at_offset(11).unwrap(), (0, 11));
        assert_eq!(store.paragraph_at_offset(12).unwrap(), (1, 0));
        assert_eq!(store.paragraph_at_offset(34).unwrap(), (2, 5));
        assert_eq!(store.slice(6, 18).unwrap(), "world\nSecond");
        assert!(store.paragraph_text(3).is_err());
        assert!(store.paragraph_at_offset(35).is_err());
    }

    #[test]
    fn test_estimation_formula() {
        let store = TextStore::with_config(
            &EngineConfig::default()
                .with_estimated_chars_per_line(10)
                .with_estimated_line_height(15.0),
        );
        assert_eq!(store.estimate_height(0), 15.0);
        assert_eq!(store.estimate_height(10), 15.0);
        assert_eq!(store.estimate_height(11), 30.0);
        assert_eq!(store.estimate_height(35), 60.0);
    }

    #[test]
    fn test_insert_within_paragraph() {
        let mut store = sample();
        let events = store.insert_text(5, ",").unwrap();
        assert_eq!(store.paragraph_text(0).unwrap(), "Hello, world");
        assert_eq!(
            events,
            vec![
                TextEvent::TextInserted { offset: 5, len: 1 },
                TextEvent::ParagraphChanged { index: 0 },
            ]
        );
    }

    #[test]
    fn test_insert_with_separators_creates_paragraphs() {
        let mut store = sample();
        store.set_paragraph_height(2, 55.0).unwrap();

        let events = store.insert_text(5, "A\r\nB\rC").unwrap();
        assert_eq!(store.paragraph_count(), 5);
        assert_eq!(store.paragraph_text(0).unwrap(), "HelloA");
        assert_eq!(store.paragraph_text(1).unwrap(), "B");
        assert_eq!(store.paragraph_text(2).unwrap(), "C world");
        assert_eq!(
            events,
            vec![
                TextEvent::TextInserted { offset: 5, len: 5 },
                TextEvent::ParagraphChanged { index: 0 },
                TextEvent::ParagraphInserted { index: 1 },
                TextEvent::ParagraphInserted { index: 2 },
            ]
        );

        // The measured paragraph moved with its text.
        assert_eq!(store.height(4).unwrap().value, 55.0);
        assert_eq!(store.total_height(), 20.0 * 4.0 + 55.0);
    }

    #[test]
    fn test_remove_across_paragraphs() {
        let mut store = sample();
        // "world\nSecond paragraph\nTh"
        let events = store.remove_text(6, 25).unwrap();
        assert_eq!(store.paragraph_count(), 1);
        assert_eq!(store.text(), "Hello ird");
        assert_eq!(
            events,
            vec![
                TextEvent::TextRemoved { offset: 6, len: 25 },
                TextEvent::ParagraphRemoved { index: 2 },
                TextEvent::ParagraphRemoved { index: 1 },
                TextEvent::ParagraphChanged { index: 0 },
            ]
        );
        assert_eq!(store.total_height(), 20.0);
    }

    #[test]
    fn test_split_and_merge_are_inverse() {
        let mut store = sample();
        let before = store.text();

        let events = store.split_paragraph(1, 6).unwrap();
        assert_eq!(store.paragraph_text(1).unwrap(), "Second");
        assert_eq!(store.paragraph_text(2).unwrap(), " paragraph");
        assert_eq!(events.last(), Some(&TextEvent::ParagraphInserted { index: 2 }));

        let events = store.merge_paragraph(1).unwrap();
        assert_eq!(store.text(), before);
        assert_eq!(events.first(), Some(&TextEvent::TextRemoved { offset: 18, len: 1 }));
        assert_eq!(store.paragraph_count(), 3);
    }

    #[test]
    fn test_split_at_paragraph_edges() {
        let mut store = sample();
        store.split_paragraph(2, 5).unwrap();
        assert_eq!(store.paragraph_count(), 4);
        assert_eq!(store.paragraph_text(3).unwrap(), "");

        store.split_paragraph(0, 0).unwrap();
        assert_eq!(store.paragraph_text(0).unwrap(), "");
        assert_eq!(store.paragraph_text(1).unwrap(), "Hello world");
    }

    #[test]
    fn test_failed_edits_leave_store_untouched() {
        let mut store = sample();
        let text = store.text();

        assert!(matches!(
            store.insert_text(99, "x"),
            Err(EngineError::OffsetOutOfRange { offset: 99, .. })
        ));
        assert!(store.remove_text(30, 10).is_err());
        assert!(store.remove_text(usize::MAX, 2).is_err());
        assert_eq!(
            store.remove_text(5, usize::MAX),
            Err(EngineError::OffsetOutOfRange { offset: 5, len: 34 })
        );
        assert!(store.split_paragraph(0, 12).is_err());
        assert!(store.merge_paragraph(2).is_err());
        assert!(store.set_paragraph_height(0, -1.0).is_err());
        assert!(store.set_paragraph_height(0, f64::NAN).is_err());
        assert!(store.set_paragraph_height(7, 1.0).is_err());

        assert_eq!(store.text(), text);
        assert_eq!(store.total_height(), 60.0);
    }

    #[test]
    fn test_invalidate_height_restores_estimate() {
        let mut store = sample();
        store.set_paragraph_height(0, 90.0).unwrap();
        let events = store.invalidate_height(0).unwrap();
        assert_eq!(
            events,
            vec![TextEvent::HeightChanged {
                index: 0,
                old: 90.0,
                new: 20.0
            }]
        );
        assert_eq!(store.height_state(0).unwrap(), HeightState::Estimated);
    }

    #[test]
    fn test_set_estimation_keeps_measured_heights() {
        let mut store = sample();
        store.set_paragraph_height(1, 33.0).unwrap();
        store.set_estimation(10.0, 5).unwrap();

        // "Hello world" is 11 chars: 3 lines.
        assert_eq!(store.height(0).unwrap().value, 30.0);
        assert_eq!(store.height(1).unwrap().value, 33.0);
        assert_eq!(store.height(2).unwrap().value, 10.0);
        assert_eq!(store.total_height(), 73.0);

        assert!(store.set_estimation(0.0, 5).is_err());

        store.invalidate_all_heights();
        assert_eq!(store.calculated_paragraph_count(), 0);
        assert_eq!(store.total_height(), 30.0 + 40.0 + 10.0);
    }

    #[test]
    fn test_subscribers_see_committed_state() {
        let mut store = sample();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let id = store.subscribe(move |event| sink.lock().unwrap().push(event.clone()));

        store.split_paragraph(0, 5).unwrap();
        assert_eq!(seen.lock().unwrap().len(), 3);

        assert!(store.unsubscribe(id));
        assert!(!store.unsubscribe(id));
        store.insert_text(0, "x").unwrap();
        assert_eq!(seen.lock().unwrap().len(), 3);
    }

    #[test]
    fn test_load_emits_single_reset() {
        let mut store = sample();
        let events = store.load_paragraphs(vec!["a".to_string(); 1000]);
        assert_eq!(events, vec![TextEvent::Reset]);
        assert_eq!(store.paragraph_count(), 1000);
        assert_eq!(store.total_height(), 20_000.0);
    }
}
