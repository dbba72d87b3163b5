use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use prose_core::{Document, FormatRange, FormatType, TextFormat, TextStore};

fn paragraphs(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| {
            format!(
                "{i:06} the quick brown fox jumps over the lazy dog, {} (prose-core benchmark paragraph)",
                "and keeps running ".repeat(i % 7)
            )
        })
        .collect()
}

/// One bold range every 20 paragraphs plus an italic range every 50.
fn ranges(store: &TextStore) -> Vec<FormatRange> {
    let mut out = Vec::new();
    for i in (0..store.paragraph_count()).step_by(20) {
        let start = store.paragraph_start(i).unwrap_or(0);
        out.push(FormatRange::new(start + 7, start + 12, TextFormat::bold()));
    }
    for i in (0..store.paragraph_count()).step_by(50) {
        let start = store.paragraph_start(i).unwrap_or(0);
        out.push(FormatRange::new(start, start + 60, TextFormat::italic()));
    }
    out
}

fn large_document(paragraphs: &[String]) -> Document {
    let ranges = ranges(&TextStore::from_paragraphs(paragraphs));
    let mut document = Document::default();
    document.load(paragraphs, ranges);
    document
}

fn bench_bulk_load(c: &mut Criterion) {
    let paragraphs = paragraphs(100_000);
    c.bench_function("bulk_load/100k_paragraphs", |b| {
        b.iter(|| {
            let store = TextStore::from_paragraphs(black_box(&paragraphs));
            black_box(store.total_height());
        })
    });
}

fn bench_typing_in_middle(c: &mut Criterion) {
    let paragraphs = paragraphs(100_000);
    c.bench_function("typing_middle/100_inserts", |b| {
        b.iter_batched(
            || large_document(&paragraphs),
            |mut document| {
                let mut offset = document.store().char_count() / 2;
                for _ in 0..100 {
                    document.insert_text(offset, "x").unwrap();
                    offset += 1;
                }
                black_box(document.store().char_count());
            },
            BatchSize::LargeInput,
        )
    });
}

fn bench_height_lookup(c: &mut Criterion) {
    let store = TextStore::from_paragraphs(paragraphs(100_000));
    let total = store.total_height();
    c.bench_function("height_lookup/1000_queries", |b| {
        b.iter(|| {
            let mut y = 0.0;
            for _ in 0..1_000 {
                black_box(store.get_paragraph_at_y(black_box(y)));
                y = (y + 7_919.0) % total;
            }
        })
    });
}

fn bench_format_queries(c: &mut Criterion) {
    let document = large_document(&paragraphs(100_000));
    let formats = document.formats();
    let store = document.store();
    c.bench_function("format_queries/runs_60_paragraphs", |b| {
        b.iter(|| {
            for i in 50_000..50_060 {
                black_box(formats.runs_for_paragraph(store, i).unwrap());
            }
        })
    });

    let len = store.char_count();
    c.bench_function("format_queries/has_bold_1000_positions", |b| {
        b.iter(|| {
            for i in 0..1_000 {
                black_box(formats.has_format_at(i * (len / 1_000), FormatType::BOLD));
            }
        })
    });
}

fn bench_viewport_scroll(c: &mut Criterion) {
    let mut document = large_document(&paragraphs(100_000));
    let total = document.total_height();

    // Scroll in screen-sized steps, well into the document.
    let mut y = total / 2.0;
    c.bench_function("viewport_scroll/layout_visible", |b| {
        b.iter(|| {
            y = (y + 600.0) % total;
            document.set_viewport(y, 600.0);
            black_box(document.layout_visible().unwrap());
        })
    });
}

criterion_group!(
    benches,
    bench_bulk_load,
    bench_typing_in_middle,
    bench_height_lookup,
    bench_format_queries,
    bench_viewport_scroll
);
criterion_main!(benches);
