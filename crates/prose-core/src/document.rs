//! Document coordinator.
//!
//! [`Document`] owns one [`TextStore`], [`FormatLayer`] and [`LayoutCache`] and is the place
//! where edits enter: every event the store returns is handed to the format layer and then to
//! the layout cache, in the order the store produced them.

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::format::{FormatRange, FormatType, TextFormat};
use crate::format_layer::FormatLayer;
use crate::layout_cache::{LayoutCache, LayoutPass, ParagraphRect};
use crate::paragraph_layout::TextMeasurer;
use crate::text_store::{ListenerId, TextEvent, TextObserver, TextStore};

/// A formatted document with a viewport-driven layout cache.
#[derive(Debug)]
pub struct Document {
    config: EngineConfig,
    store: TextStore,
    formats: FormatLayer,
    layout: LayoutCache,
}

impl Default for Document {
    fn default() -> Self {
        let config = EngineConfig::default();
        Self {
            store: TextStore::with_config(&config),
            formats: FormatLayer::new(),
            layout: LayoutCache::new(&config),
            config,
        }
    }
}

impl Document {
    /// Create an empty document. Fails if `config` does not validate.
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store: TextStore::with_config(&config),
            formats: FormatLayer::new(),
            layout: LayoutCache::new(&config),
            config,
        })
    }

    /// Create an empty document using a custom measurer.
    pub fn with_measurer<M>(config: EngineConfig, measurer: M) -> Result<Self>
    where
        M: TextMeasurer + Send + 'static,
    {
        let mut document = Self::new(config)?;
        document
            .layout
            .set_measurer(&mut document.store, measurer)?;
        Ok(document)
    }

    /// Replace the content with `paragraphs` and `ranges` in one bulk load.
    pub fn load<I, S, R>(&mut self, paragraphs: I, ranges: R)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        R: IntoIterator<Item = FormatRange>,
    {
        let events = self.store.load_paragraphs(paragraphs);
        self.dispatch(&events);
        self.formats.load_ranges(ranges);
    }

    /// Configuration the document was created with.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Text and heights.
    pub fn store(&self) -> &TextStore {
        &self.store
    }

    /// Format ranges.
    pub fn formats(&self) -> &FormatLayer {
        &self.formats
    }

    /// Layout cache.
    pub fn layout(&self) -> &LayoutCache {
        &self.layout
    }

    /// Register a callback for every committed [`TextEvent`].
    pub fn subscribe<F>(&mut self, callback: F) -> ListenerId
    where
        F: FnMut(&TextEvent) + Send + 'static,
    {
        self.store.subscribe(callback)
    }

    /// Remove a callback registered with [`subscribe`](Self::subscribe).
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.store.unsubscribe(id)
    }

    // ---- Edits -------------------------------------------------------------------------------

    /// See [`TextStore::insert_text`].
    pub fn insert_text(&mut self, position: usize, text: &str) -> Result<Vec<TextEvent>> {
        let events = self.store.insert_text(position, text)?;
        self.dispatch(&events);
        Ok(events)
    }

    /// See [`TextStore::remove_text`].
    pub fn remove_text(&mut self, position: usize, length: usize) -> Result<Vec<TextEvent>> {
        let events = self.store.remove_text(position, length)?;
        self.dispatch(&events);
        Ok(events)
    }

    /// See [`TextStore::split_paragraph`].
    pub fn split_paragraph(&mut self, index: usize, offset: usize) -> Result<Vec<TextEvent>> {
        let events = self.store.split_paragraph(index, offset)?;
        self.dispatch(&events);
        Ok(events)
    }

    /// See [`TextStore::merge_paragraph`].
    pub fn merge_paragraph(&mut self, index: usize) -> Result<Vec<TextEvent>> {
        let events = self.store.merge_paragraph(index)?;
        self.dispatch(&events);
        Ok(events)
    }

    // ---- Formatting --------------------------------------------------------------------------

    /// See [`FormatLayer::add_format`]. The span must lie inside the document.
    pub fn add_format(&mut self, start: usize, end: usize, format: TextFormat) -> Result<()> {
        self.check_span(start, end)?;
        self.formats.add_format(start, end, format)?;
        self.invalidate_span(start, end)
    }

    /// See [`FormatLayer::remove_format`].
    pub fn remove_format(&mut self, start: usize, end: usize, flags: FormatType) -> Result<()> {
        self.check_span(start, end)?;
        self.formats.remove_format(start, end, flags)?;
        self.invalidate_span(start, end)
    }

    /// See [`FormatLayer::clear_formats`].
    pub fn clear_formats(&mut self, start: usize, end: usize) -> Result<()> {
        self.check_span(start, end)?;
        self.formats.clear_formats(start, end)?;
        self.invalidate_span(start, end)
    }

    /// See [`FormatLayer::toggle_format`].
    pub fn toggle_format(&mut self, start: usize, end: usize, flag: FormatType) -> Result<bool> {
        self.check_span(start, end)?;
        let enabled = self.formats.toggle_format(start, end, flag)?;
        self.invalidate_span(start, end)?;
        Ok(enabled)
    }

    // ---- Viewport ----------------------------------------------------------------------------

    /// See [`LayoutCache::set_viewport`].
    pub fn set_viewport(&mut self, y: f64, height: f64) {
        self.layout.set_viewport(&self.store, y, height);
    }

    /// See [`LayoutCache::layout_visible`].
    pub fn layout_visible(&mut self) -> Result<LayoutPass> {
        self.layout.layout_visible(&mut self.store, &self.formats)
    }

    /// See [`LayoutCache::set_layout_width`].
    pub fn set_layout_width(&mut self, width: f64) {
        self.config.layout_width = width;
        self.layout.set_layout_width(&mut self.store, width);
    }

    /// See [`LayoutCache::set_measurer`].
    pub fn set_measurer<M>(&mut self, measurer: M) -> Result<()>
    where
        M: TextMeasurer + Send + 'static,
    {
        self.layout.set_measurer(&mut self.store, measurer)
    }

    /// See [`LayoutCache::paragraph_rect`].
    pub fn paragraph_rect(&self, index: usize) -> Result<ParagraphRect> {
        self.layout.paragraph_rect(&self.store, index)
    }

    /// Height of the whole document.
    pub fn total_height(&self) -> f64 {
        self.store.total_height()
    }

    fn dispatch(&mut self, events: &[TextEvent]) {
        for event in events {
            self.formats.on_text_event(event);
            self.layout.on_text_event(event);
        }
    }

    fn check_span(&self, start: usize, end: usize) -> Result<()> {
        if start > end {
            return Err(EngineError::InvalidRange { start, end });
        }
        let len = self.store.char_count();
        if end > len {
            return Err(EngineError::OffsetOutOfRange { offset: end, len });
        }
        Ok(())
    }

    /// Send every paragraph touched by `[start, end)` back to an estimated height and mark it
    /// for re-layout, whether or not its layout is still cached.
    fn invalidate_span(&mut self, start: usize, end: usize) -> Result<()> {
        if start == end {
            return Ok(());
        }
        let (first, _) = self.store.paragraph_at_offset(start)?;
        let (last, _) = self.store.paragraph_at_offset(end - 1)?;
        for index in first..=last {
            let events = self.store.invalidate_height(index)?;
            self.dispatch(&events);
            self.layout.invalidate_layout(index);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout_cache::LayoutState;
    use crate::paragraph_layout::CellMeasurer;
    use crate::text_store::HeightState;

    fn document() -> Document {
        let mut document = Document::default();
        document.load(["Hello world", "Second paragraph", "Third"], []);
        document
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = EngineConfig::default().with_max_cached_layouts(0);
        assert!(matches!(Document::new(config), Err(EngineError::InvalidConfig(_))));
    }

    #[test]
    fn test_typing_before_bold_run_shifts_it() {
        let mut document = document();
        document.add_format(0, 5, TextFormat::bold()).unwrap();
        document.insert_text(0, "X").unwrap();

        let ranges = document.formats().all_ranges();
        assert_eq!((ranges[0].start, ranges[0].end), (1, 6));
        assert_eq!(document.store().paragraph_text(0).unwrap(), "XHello world");
    }

    #[test]
    fn test_split_shifts_formats_and_layouts() {
        let mut document = document();
        document.add_format(12, 18, TextFormat::italic()).unwrap();
        document.set_viewport(0.0, 100.0);
        document.layout_visible().unwrap();
        assert!(document.layout().has_layout(2));

        document.split_paragraph(0, 5).unwrap();
        assert_eq!(document.store().paragraph_count(), 4);
        // The separator shifted the italic range by one.
        let ranges = document.formats().all_ranges();
        assert_eq!((ranges[0].start, ranges[0].end), (13, 19));
        // Layouts moved with their paragraphs; the edited one needs a new layout.
        assert_eq!(document.layout().layout_state(0), LayoutState::Estimated);
        assert!(!document.layout().has_layout(1));
        assert!(document.layout().has_layout(3));
    }

    #[test]
    fn test_merge_removes_layout_entry() {
        let mut document = document();
        document.set_viewport(0.0, 100.0);
        document.layout_visible().unwrap();

        document.merge_paragraph(0).unwrap();
        assert_eq!(document.store().paragraph_count(), 2);
        assert_eq!(document.layout().layout_count(), 2);
        assert!(document.layout().has_layout(1));
        assert!(!document.layout().has_layout(0));
    }

    #[test]
    fn test_format_change_invalidates_layout() {
        let mut document = document();
        document.set_viewport(0.0, 100.0);
        document.layout_visible().unwrap();

        document
            .add_format(12, 14, TextFormat::font_size(24.0))
            .unwrap();
        assert!(!document.layout().has_layout(1));
        assert!(document.layout().has_layout(0));

        document.layout_visible().unwrap();
        assert_eq!(document.store().height(1).unwrap().value, 40.0);
        assert_eq!(document.total_height(), 80.0);
    }

    #[test]
    fn test_format_change_resets_evicted_height() {
        let config = EngineConfig::default()
            .with_viewport_buffer_size(0)
            .with_max_cached_layouts(1);
        let mut document = Document::new(config).unwrap();
        document.load(["a", "b", "c", "d"], []);

        document.set_viewport(0.0, 20.0);
        document.layout_visible().unwrap();
        document.set_viewport(60.0, 20.0);
        document.layout_visible().unwrap();
        assert!(document.layout().entry(0).is_none());
        assert_eq!(
            document.store().height_state(0).unwrap(),
            HeightState::Calculated
        );

        document
            .add_format(0, 1, TextFormat::font_size(48.0))
            .unwrap();
        assert_eq!(document.store().height_state(0).unwrap(), HeightState::Estimated);
        assert_eq!(document.store().height_state(1).unwrap(), HeightState::Estimated);
        assert_eq!(document.store().height_state(3).unwrap(), HeightState::Calculated);

        document.set_viewport(0.0, 20.0);
        document.layout_visible().unwrap();
        assert_eq!(document.store().height(0).unwrap().value, 80.0);
        assert_eq!(
            document.store().height_state(0).unwrap(),
            HeightState::Calculated
        );
    }

    #[test]
    fn test_format_change_stops_at_span_end() {
        let mut document = document();
        document.set_viewport(0.0, 100.0);
        document.layout_visible().unwrap();

        // Ends right before the separator of paragraph 0.
        document.add_format(0, 11, TextFormat::bold()).unwrap();
        assert!(!document.layout().has_layout(0));
        assert!(document.layout().has_layout(1));
        assert_eq!(document.store().calculated_paragraph_count(), 2);
    }

    #[test]
    fn test_format_span_must_fit_document() {
        let mut document = document();
        assert_eq!(
            document.add_format(30, 40, TextFormat::bold()),
            Err(EngineError::OffsetOutOfRange { offset: 40, len: 34 })
        );
        assert!(document.formats().is_empty());
    }

    #[test]
    fn test_toggle_reports_state() {
        let mut document = document();
        assert!(document.toggle_format(0, 11, FormatType::BOLD).unwrap());
        assert!(!document.toggle_format(0, 11, FormatType::BOLD).unwrap());
        assert!(document.formats().is_empty());
    }

    #[test]
    fn test_custom_measurer_drives_estimates() {
        let mut document =
            Document::with_measurer(EngineConfig::default(), CellMeasurer::new(8.0, 16.0)).unwrap();
        document.load(["a", "b"], []);
        assert_eq!(document.total_height(), 32.0);
    }
}
