//! Scrolling through a large document keeps the layout cache bounded and the viewport laid out.

use prose_core::{Document, EngineConfig, FormatRange, HeightState, LayoutState, TextFormat};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const PARAGRAPHS: usize = 10_000;
const VIEWPORT_HEIGHT: f64 = 600.0;
const MAX_CACHED: usize = 150;

fn paragraph(i: usize) -> String {
    // 7 to 327 characters, so measured heights differ from the estimates.
    format!("p{i:05} {}", "word ".repeat((i % 9) * 8))
}

fn large_document() -> Document {
    let config = EngineConfig::default().with_max_cached_layouts(MAX_CACHED);
    let mut document = Document::new(config).unwrap();
    let ranges = (0..PARAGRAPHS / 10).map(|i| {
        let start = i * 1_500;
        FormatRange::new(start, start + 40, TextFormat::bold())
    });
    document.load((0..PARAGRAPHS).map(paragraph), ranges);
    document
}

fn assert_viewport_ready(document: &Document) {
    let layout = document.layout();
    assert!(layout.layout_count() <= MAX_CACHED);

    let visible = layout.visible_range().expect("viewport has height");
    for index in visible.clone() {
        assert!(layout.has_layout(index), "paragraph {index} not laid out");
        assert_eq!(
            document.store().height_state(index).unwrap(),
            HeightState::Calculated
        );
    }

    // The visible range covers the viewport exactly.
    let (y, height) = layout.viewport();
    let store = document.store();
    let first = *visible.start();
    let last = *visible.end();
    assert!(store.get_paragraph_y(first).unwrap() <= y);
    if last + 1 < store.paragraph_count() {
        assert!(store.get_paragraph_y(last + 1).unwrap() >= (y + height).min(store.total_height()));
    }
}

#[test]
fn test_sequential_scroll_stays_bounded() {
    let mut document = large_document();
    let total = document.total_height();

    let mut y = 0.0;
    while y < total {
        document.set_viewport(y, VIEWPORT_HEIGHT);
        document.layout_visible().unwrap();
        assert_viewport_ready(&document);
        y += VIEWPORT_HEIGHT / 2.0;
    }
    assert!(document.store().calculated_paragraph_count() > MAX_CACHED);
}

#[test]
fn test_random_jumps_stay_bounded() {
    let mut document = large_document();
    let mut rng = StdRng::seed_from_u64(0x5eed);

    for _ in 0..200 {
        let total = document.total_height();
        let y = rng.gen_range(0.0..total);
        document.set_viewport(y, VIEWPORT_HEIGHT);
        let pass = document.layout_visible().unwrap();
        assert_eq!(pass.cached, document.layout().layout_count());
        assert_viewport_ready(&document);
    }
}

#[test]
fn test_scroll_to_end_shows_last_paragraph() {
    let mut document = large_document();
    let total = document.total_height();
    document.set_viewport(total - VIEWPORT_HEIGHT, VIEWPORT_HEIGHT);
    document.layout_visible().unwrap();

    // Measured heights can shrink the document; scroll again to the new end.
    let total = document.total_height();
    document.set_viewport(total - VIEWPORT_HEIGHT, VIEWPORT_HEIGHT);
    document.layout_visible().unwrap();
    assert_eq!(document.layout().last_visible(), Some(PARAGRAPHS - 1));
    assert_viewport_ready(&document);
}

#[test]
fn test_edits_while_scrolled() {
    let mut document = large_document();
    let mid = document.store().get_paragraph_y(5_000).unwrap();
    document.set_viewport(mid, VIEWPORT_HEIGHT);
    document.layout_visible().unwrap();
    // Measured heights above the viewport pull later paragraphs up.
    let first = document.layout().first_visible();
    assert!(first >= 5_000);
    assert!(document.layout().has_layout(first + 4));

    let start = document.store().paragraph_start(first + 2).unwrap();
    document.insert_text(start, "inserted ").unwrap();
    assert_eq!(document.layout().layout_state(first + 2), LayoutState::Estimated);
    assert!(document.layout().has_layout(first + 1));

    document.split_paragraph(first + 3, 3).unwrap();
    assert_eq!(document.store().paragraph_count(), PARAGRAPHS + 1);
    // Layouts after the split moved down by one paragraph.
    assert!(document.layout().has_layout(first + 5));
    assert!(!document.layout().has_layout(first + 4));

    document.merge_paragraph(first - 10).unwrap();
    assert_eq!(document.store().paragraph_count(), PARAGRAPHS);

    document.set_viewport(mid, VIEWPORT_HEIGHT);
    document.layout_visible().unwrap();
    assert_viewport_ready(&document);
    let edited = document.store().paragraph_text(first + 1).unwrap();
    assert!(edited.starts_with(&format!("inserted p{:05}", first + 2)));
}

#[test]
fn test_narrowing_layout_width_remeasures_viewport() {
    let mut document = large_document();
    document.set_viewport(0.0, VIEWPORT_HEIGHT);
    document.layout_visible().unwrap();
    let wide = document.store().height(8).unwrap().value;

    document.set_layout_width(400.0);
    assert_eq!(document.layout().layout_count(), 0);
    assert_eq!(document.store().calculated_paragraph_count(), 0);

    document.layout_visible().unwrap();
    assert!(document.store().height(8).unwrap().value > wide);
    assert_viewport_ready(&document);
}
