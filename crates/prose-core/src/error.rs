use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
/// Errors produced by the text engine.
///
/// All of these are argument errors raised by the direct caller's request. A failed
/// call never leaves a partially applied edit behind: the document stays in its
/// last-good state and the caller may simply abort that edit.
pub enum EngineError {
    #[error("paragraph index {index} out of range (paragraph count {count})")]
    /// A paragraph index was `>=` the paragraph count.
    ParagraphOutOfRange {
        /// Requested paragraph index.
        index: usize,
        /// Paragraph count at the time of the call.
        count: usize,
    },

    #[error("offset {offset} out of range (length {len})")]
    /// A character offset pointed past the end of the text it addresses.
    OffsetOutOfRange {
        /// Requested character offset.
        offset: usize,
        /// Length (in chars) of the addressed text.
        len: usize,
    },

    #[error("invalid range {start}..{end}")]
    /// A range whose start lies after its end.
    InvalidRange {
        /// Inclusive start offset.
        start: usize,
        /// Exclusive end offset.
        end: usize,
    },

    #[error("invalid paragraph height {0}")]
    /// A negative or non-finite paragraph height.
    InvalidHeight(f64),

    #[error("invalid configuration: {0}")]
    /// A configuration value outside its allowed domain.
    InvalidConfig(String),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, EngineError>;
