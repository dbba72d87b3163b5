#![warn(missing_docs)]
//! Prose Core - Headless Large-Document Text Engine
//!
//! # Overview
//!
//! `prose-core` holds the data structures a word-processor needs to keep documents with
//! hundreds of thousands of words interactive: typing, scrolling and formatting stay
//! logarithmic in the document size. It does not render; a renderer reads the layouts and
//! format runs this crate produces.
//!
//! # Core Features
//!
//! - **Paragraph Storage**: rope-backed text, one paragraph per `'\n'`-separated line
//! - **Height Index**: Fenwick tree over paragraph heights, O(log n) position queries
//! - **Format Ranges**: augmented interval tree, O(log n + k) lookups, independent of the text
//! - **Lazy Layout**: exact line wrapping only around the viewport, LRU-bounded memory
//! - **Change Notifications**: every edit reports ordered [`TextEvent`]s after commit
//!
//! # Architecture Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  Document (edit + event dispatch)           │  ← Public API
//! ├─────────────────────────────────────────────┤
//! │  LayoutCache (viewport, LRU eviction)       │  ← Layout on demand
//! ├──────────────────────┬──────────────────────┤
//! │  FormatLayer         │  paragraph_layout    │  ← Styling / wrapping
//! ├──────────────────────┴──────────────────────┤
//! │  TextStore (rope + heights + events)        │  ← Text
//! ├──────────────────────┬──────────────────────┤
//! │  HeightIndex         │  FormatIndex         │  ← Indices
//! └──────────────────────┴──────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use prose_core::{Document, EngineConfig, FormatType, TextFormat};
//!
//! let mut doc = Document::new(EngineConfig::default()).unwrap();
//! doc.load(["Hello world", "Second paragraph", "Third"], []);
//! assert_eq!(doc.total_height(), 60.0);
//!
//! // Text typed in front of a bold run stays plain.
//! doc.add_format(0, 5, TextFormat::bold()).unwrap();
//! doc.insert_text(0, "X").unwrap();
//! assert!(!doc.formats().has_format_at(0, FormatType::BOLD));
//! assert!(doc.formats().has_format_at(1, FormatType::BOLD));
//!
//! // Lay out what is on screen.
//! doc.set_viewport(0.0, 600.0);
//! doc.layout_visible().unwrap();
//! assert!(doc.layout().has_layout(2));
//! ```
//!
//! # Module Description
//!
//! - [`height_index`] - Fenwick tree over paragraph heights
//! - [`format_index`] - interval tree over format ranges
//! - [`text_store`] - paragraph text, heights and change events
//! - [`format_layer`] - format ranges kept in step with edits
//! - [`paragraph_layout`] - headless line wrapping
//! - [`layout_cache`] - viewport-driven layout cache
//! - [`document`] - owner of all of the above
//!
//! # Logging
//!
//! The crate emits [`tracing`] events (bulk loads and layout passes at `debug`, single edits
//! at `trace`) and never installs a subscriber.

pub mod config;
pub mod document;
pub mod error;
pub mod format;
pub mod format_index;
pub mod format_layer;
pub mod height_index;
pub mod layout_cache;
pub mod paragraph_layout;
pub mod text_store;

pub use config::EngineConfig;
pub use document::Document;
pub use error::{EngineError, Result};
pub use format::{Color, FormatRange, FormatType, TextFormat};
pub use format_index::FormatIndex;
pub use format_layer::FormatLayer;
pub use height_index::HeightIndex;
pub use layout_cache::{LayoutCache, LayoutEntry, LayoutPass, LayoutState, ParagraphRect};
pub use paragraph_layout::{CellMeasurer, LayoutLine, TextMeasurer};
pub use text_store::{
    HeightState, ListenerId, ParagraphHeight, TextEvent, TextEventCallback, TextObserver,
    TextStore,
};
