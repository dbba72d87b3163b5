//! Load a large document, scroll through it and edit while scrolled.
//!
//! Run with `RUST_LOG=prose_core=debug` to see layout passes, and `PROSE_*` variables to
//! override the engine configuration (for example `PROSE_MAX_CACHED_LAYOUTS=300`).

use prose_core::{Document, EngineConfig, TextFormat};
use std::time::Instant;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("prose_core=info"))
        .unwrap();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn paragraphs(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| {
            format!(
                "{i:06} the quick brown fox jumps over the lazy dog. {}",
                "It keeps running through the field. ".repeat(i % 11)
            )
        })
        .collect()
}

fn main() {
    init_tracing();

    let config = EngineConfig::from_env();
    let mut document = match Document::new(config) {
        Ok(document) => document,
        Err(err) => {
            tracing::error!("invalid configuration: {}", err);
            return;
        }
    };

    let paragraphs = paragraphs(200_000);
    let start = Instant::now();
    document.load(&paragraphs, []);
    let load_time = start.elapsed();

    let estimated_total = document.total_height();
    let start = Instant::now();
    let mut passes = 0;
    let mut y = 0.0;
    while y < estimated_total {
        document.set_viewport(y, 900.0);
        document.layout_visible().unwrap();
        passes += 1;
        y += estimated_total / 500.0;
    }
    let scroll_time = start.elapsed();

    // Edit in the middle of the current viewport.
    let target = document.layout().first_visible();
    let offset = document.store().paragraph_start(target).unwrap();
    let start = Instant::now();
    document.add_format(offset, offset + 6, TextFormat::bold()).unwrap();
    for _ in 0..100 {
        document.insert_text(offset + 3, "x").unwrap();
    }
    document.split_paragraph(target, 10).unwrap();
    document.layout_visible().unwrap();
    let edit_time = start.elapsed();

    println!("paragraphs:        {}", document.store().paragraph_count());
    println!("load:              {load_time:?}");
    println!("scroll ({passes} passes): {scroll_time:?}");
    println!("edits:             {edit_time:?}");
    println!("estimated height:  {estimated_total:.0}");
    println!("current height:    {:.0}", document.total_height());
    println!(
        "measured:          {} paragraphs",
        document.store().calculated_paragraph_count()
    );
    println!(
        "cached layouts:    {} (limit {})",
        document.layout().layout_count(),
        document.config().max_cached_layouts
    );
}
