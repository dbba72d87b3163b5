//! Engine configuration.
//!
//! Every tunable consumed by the engine lives in [`EngineConfig`]. Values can be set in code,
//! deserialized (with the `serde` feature), or read from `PROSE_*` environment variables.

use crate::error::{EngineError, Result};
use std::env;
use std::str::FromStr;

/// Default estimated height of one visual line, in layout units.
pub const DEFAULT_ESTIMATED_LINE_HEIGHT: f64 = 20.0;
/// Default number of characters assumed to fit on one visual line.
pub const DEFAULT_ESTIMATED_CHARS_PER_LINE: usize = 80;
/// Default number of paragraphs laid out above and below the visible window.
pub const DEFAULT_VIEWPORT_BUFFER_SIZE: usize = 50;
/// Default upper bound on cached paragraph layouts.
pub const DEFAULT_MAX_CACHED_LAYOUTS: usize = 150;
/// Default width available to paragraph layout, in layout units.
pub const DEFAULT_LAYOUT_WIDTH: f64 = 800.0;

/// Tunables for the text engine.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EngineConfig {
    /// Height of one visual line used for estimated (not yet measured) paragraphs.
    pub estimated_line_height: f64,
    /// Characters per visual line used for estimated paragraphs.
    pub estimated_chars_per_line: usize,
    /// Paragraphs kept laid out on each side of the visible window.
    pub viewport_buffer_size: usize,
    /// Maximum number of cached paragraph layouts.
    pub max_cached_layouts: usize,
    /// Width available for line wrapping. `<= 0` disables wrapping.
    pub layout_width: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            estimated_line_height: DEFAULT_ESTIMATED_LINE_HEIGHT,
            estimated_chars_per_line: DEFAULT_ESTIMATED_CHARS_PER_LINE,
            viewport_buffer_size: DEFAULT_VIEWPORT_BUFFER_SIZE,
            max_cached_layouts: DEFAULT_MAX_CACHED_LAYOUTS,
            layout_width: DEFAULT_LAYOUT_WIDTH,
        }
    }
}

impl EngineConfig {
    /// Read configuration from the environment, falling back to defaults.
    ///
    /// Recognized variables: `PROSE_ESTIMATED_LINE_HEIGHT`, `PROSE_ESTIMATED_CHARS_PER_LINE`,
    /// `PROSE_VIEWPORT_BUFFER_SIZE`, `PROSE_MAX_CACHED_LAYOUTS`, `PROSE_LAYOUT_WIDTH`.
    /// Unparseable values are logged and ignored.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            estimated_line_height: env_or(
                "PROSE_ESTIMATED_LINE_HEIGHT",
                defaults.estimated_line_height,
            ),
            estimated_chars_per_line: env_or(
                "PROSE_ESTIMATED_CHARS_PER_LINE",
                defaults.estimated_chars_per_line,
            ),
            viewport_buffer_size: env_or("PROSE_VIEWPORT_BUFFER_SIZE", defaults.viewport_buffer_size),
            max_cached_layouts: env_or("PROSE_MAX_CACHED_LAYOUTS", defaults.max_cached_layouts),
            layout_width: env_or("PROSE_LAYOUT_WIDTH", defaults.layout_width),
        }
    }

    /// Set the estimated line height.
    pub fn with_estimated_line_height(mut self, line_height: f64) -> Self {
        self.estimated_line_height = line_height;
        self
    }

    /// Set the estimated characters per line.
    pub fn with_estimated_chars_per_line(mut self, chars_per_line: usize) -> Self {
        self.estimated_chars_per_line = chars_per_line;
        self
    }

    /// Set the viewport buffer size (paragraphs).
    pub fn with_viewport_buffer_size(mut self, buffer: usize) -> Self {
        self.viewport_buffer_size = buffer;
        self
    }

    /// Set the maximum number of cached layouts.
    pub fn with_max_cached_layouts(mut self, max: usize) -> Self {
        self.max_cached_layouts = max;
        self
    }

    /// Set the layout width.
    pub fn with_layout_width(mut self, width: f64) -> Self {
        self.layout_width = width;
        self
    }

    /// Check that every value lies in its allowed domain.
    pub fn validate(&self) -> Result<()> {
        if !self.estimated_line_height.is_finite() || self.estimated_line_height <= 0.0 {
            return Err(EngineError::InvalidConfig(format!(
                "estimated_line_height must be positive and finite, got {}",
                self.estimated_line_height
            )));
        }
        if self.estimated_chars_per_line == 0 {
            return Err(EngineError::InvalidConfig(
                "estimated_chars_per_line must be at least 1".to_string(),
            ));
        }
        if self.max_cached_layouts == 0 {
            return Err(EngineError::InvalidConfig(
                "max_cached_layouts must be at least 1".to_string(),
            ));
        }
        if self.layout_width.is_nan() {
            return Err(EngineError::InvalidConfig(
                "layout_width must not be NaN".to_string(),
            ));
        }
        Ok(())
    }
}

fn env_or<T: FromStr + Copy>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!(key, value = %raw, "ignoring unparseable configuration value");
                default
            }
        },
        Err(_) => default,
    }
}
