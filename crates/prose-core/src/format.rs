//! Formatting attributes and format ranges.

use std::fmt;
use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, Not};

/// Set of formatting flags.
///
/// Flags combine with `|`. The value-bearing flags ([`FONT_FAMILY`](Self::FONT_FAMILY),
/// [`FONT_SIZE`](Self::FONT_SIZE), [`FOREGROUND_COLOR`](Self::FOREGROUND_COLOR),
/// [`BACKGROUND_COLOR`](Self::BACKGROUND_COLOR)) only say *that* the value is set; the value
/// itself lives in [`TextFormat`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FormatType(pub u32);

impl FormatType {
    /// No flags.
    pub const NONE: Self = Self(0);
    /// Bold weight.
    pub const BOLD: Self = Self(1 << 0);
    /// Italic style.
    pub const ITALIC: Self = Self(1 << 1);
    /// Underline decoration.
    pub const UNDERLINE: Self = Self(1 << 2);
    /// Strikethrough decoration.
    pub const STRIKETHROUGH: Self = Self(1 << 3);
    /// Subscript position.
    pub const SUBSCRIPT: Self = Self(1 << 4);
    /// Superscript position.
    pub const SUPERSCRIPT: Self = Self(1 << 5);
    /// Explicit font family.
    pub const FONT_FAMILY: Self = Self(1 << 6);
    /// Explicit font size.
    pub const FONT_SIZE: Self = Self(1 << 7);
    /// Explicit text color.
    pub const FOREGROUND_COLOR: Self = Self(1 << 8);
    /// Explicit highlight color.
    pub const BACKGROUND_COLOR: Self = Self(1 << 9);
    /// Small capitals.
    pub const SMALL_CAPS: Self = Self(1 << 10);
    /// All capitals.
    pub const ALL_CAPS: Self = Self(1 << 11);

    /// Returns `true` if no flag is set.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Returns `true` if any flag of `other` is set in `self`.
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// Returns `true` if every flag of `other` is set in `self`.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for FormatType {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for FormatType {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for FormatType {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl BitAndAssign for FormatType {
    fn bitand_assign(&mut self, rhs: Self) {
        self.0 &= rhs.0;
    }
}

impl Not for FormatType {
    type Output = Self;

    fn not(self) -> Self {
        Self(!self.0)
    }
}

impl fmt::Debug for FormatType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [(FormatType, &str); 12] = [
            (FormatType::BOLD, "BOLD"),
            (FormatType::ITALIC, "ITALIC"),
            (FormatType::UNDERLINE, "UNDERLINE"),
            (FormatType::STRIKETHROUGH, "STRIKETHROUGH"),
            (FormatType::SUBSCRIPT, "SUBSCRIPT"),
            (FormatType::SUPERSCRIPT, "SUPERSCRIPT"),
            (FormatType::FONT_FAMILY, "FONT_FAMILY"),
            (FormatType::FONT_SIZE, "FONT_SIZE"),
            (FormatType::FOREGROUND_COLOR, "FOREGROUND_COLOR"),
            (FormatType::BACKGROUND_COLOR, "BACKGROUND_COLOR"),
            (FormatType::SMALL_CAPS, "SMALL_CAPS"),
            (FormatType::ALL_CAPS, "ALL_CAPS"),
        ];
        if self.is_empty() {
            return f.write_str("NONE");
        }
        let mut first = true;
        for (flag, name) in NAMES {
            if self.contains(flag) {
                if !first {
                    f.write_str(" | ")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        Ok(())
    }
}

/// RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Color {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
    /// Alpha channel.
    pub a: u8,
}

impl Color {
    /// Opaque color from RGB components.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }
}

/// Formatting attributes carried by a [`FormatRange`].
///
/// Only the values whose flag is set are meaningful; equality ignores the others.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TextFormat {
    /// Which attributes are set.
    pub flags: FormatType,
    /// Font family (with [`FormatType::FONT_FAMILY`]).
    pub font_family: Option<String>,
    /// Font size in points (with [`FormatType::FONT_SIZE`]).
    pub font_size: Option<f64>,
    /// Text color (with [`FormatType::FOREGROUND_COLOR`]).
    pub foreground: Option<Color>,
    /// Highlight color (with [`FormatType::BACKGROUND_COLOR`]).
    pub background: Option<Color>,
}

impl TextFormat {
    /// Format with only the given flags and no values.
    pub fn with_flags(flags: FormatType) -> Self {
        Self {
            flags,
            ..Self::default()
        }
    }

    /// Bold format.
    pub fn bold() -> Self {
        Self::with_flags(FormatType::BOLD)
    }

    /// Italic format.
    pub fn italic() -> Self {
        Self::with_flags(FormatType::ITALIC)
    }

    /// Underline format.
    pub fn underline() -> Self {
        Self::with_flags(FormatType::UNDERLINE)
    }

    /// Format that sets the font family.
    pub fn font_family(family: impl Into<String>) -> Self {
        Self {
            flags: FormatType::FONT_FAMILY,
            font_family: Some(family.into()),
            ..Self::default()
        }
    }

    /// Format that sets the font size in points.
    pub fn font_size(size: f64) -> Self {
        Self {
            flags: FormatType::FONT_SIZE,
            font_size: Some(size),
            ..Self::default()
        }
    }

    /// Format that sets the text color.
    pub fn foreground(color: Color) -> Self {
        Self {
            flags: FormatType::FOREGROUND_COLOR,
            foreground: Some(color),
            ..Self::default()
        }
    }

    /// Format that sets the highlight color.
    pub fn background(color: Color) -> Self {
        Self {
            flags: FormatType::BACKGROUND_COLOR,
            background: Some(color),
            ..Self::default()
        }
    }

    /// Returns `true` if no attribute is set.
    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    /// Returns `true` if `flag` is set.
    pub fn has(&self, flag: FormatType) -> bool {
        self.flags.intersects(flag)
    }

    /// Enable or disable a flag. Disabling a value-bearing flag drops its value.
    pub fn set(&mut self, flag: FormatType, enabled: bool) {
        if enabled {
            self.flags |= flag;
        } else {
            self.flags &= !flag;
            if flag.intersects(FormatType::FONT_FAMILY) {
                self.font_family = None;
            }
            if flag.intersects(FormatType::FONT_SIZE) {
                self.font_size = None;
            }
            if flag.intersects(FormatType::FOREGROUND_COLOR) {
                self.foreground = None;
            }
            if flag.intersects(FormatType::BACKGROUND_COLOR) {
                self.background = None;
            }
        }
    }

    /// Copy of `self` without `flag`.
    pub fn without(&self, flag: FormatType) -> Self {
        let mut result = self.clone();
        result.set(flag, false);
        result
    }

    /// Merge `other` over `self`: flags union, `other`'s values win where set.
    pub fn merged(&self, other: &TextFormat) -> TextFormat {
        let mut result = self.clone();
        result.flags |= other.flags;
        if other.has(FormatType::FONT_FAMILY) {
            result.font_family = other.font_family.clone();
        }
        if other.has(FormatType::FONT_SIZE) {
            result.font_size = other.font_size;
        }
        if other.has(FormatType::FOREGROUND_COLOR) {
            result.foreground = other.foreground;
        }
        if other.has(FormatType::BACKGROUND_COLOR) {
            result.background = other.background;
        }
        result
    }
}

impl PartialEq for TextFormat {
    fn eq(&self, other: &Self) -> bool {
        if self.flags != other.flags {
            return false;
        }
        if self.has(FormatType::FONT_FAMILY) && self.font_family != other.font_family {
            return false;
        }
        if self.has(FormatType::FONT_SIZE) && self.font_size != other.font_size {
            return false;
        }
        if self.has(FormatType::FOREGROUND_COLOR) && self.foreground != other.foreground {
            return false;
        }
        if self.has(FormatType::BACKGROUND_COLOR) && self.background != other.background {
            return false;
        }
        true
    }
}

/// A formatted span of the document, in absolute character offsets.
///
/// Half-open: `[start, end)`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FormatRange {
    /// Start offset (inclusive).
    pub start: usize,
    /// End offset (exclusive).
    pub end: usize,
    /// Attributes applied to the span.
    pub format: TextFormat,
}

impl FormatRange {
    /// Create a range over `[start, end)`.
    pub fn new(start: usize, end: usize, format: TextFormat) -> Self {
        Self { start, end, format }
    }

    /// Returns `true` if the range covers no character.
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Number of characters covered.
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Check if the range contains `pos`.
    pub fn contains(&self, pos: usize) -> bool {
        self.start <= pos && pos < self.end
    }

    /// Check if the range intersects `[start, end)`.
    pub fn overlaps(&self, start: usize, end: usize) -> bool {
        self.start < end && start < self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_ops() {
        let flags = FormatType::BOLD | FormatType::ITALIC;
        assert!(flags.contains(FormatType::BOLD));
        assert!(flags.intersects(FormatType::ITALIC | FormatType::UNDERLINE));
        assert!(!flags.contains(FormatType::ITALIC | FormatType::UNDERLINE));
        assert_eq!(flags & !FormatType::BOLD, FormatType::ITALIC);
        assert_eq!(format!("{:?}", flags), "BOLD | ITALIC");
        assert_eq!(format!("{:?}", FormatType::NONE), "NONE");
    }

    #[test]
    fn test_equality_ignores_unflagged_values() {
        let a = TextFormat {
            flags: FormatType::BOLD,
            font_size: Some(12.0),
            ..TextFormat::default()
        };
        let b = TextFormat::bold();
        assert_eq!(a, b);

        assert_ne!(TextFormat::font_size(12.0), TextFormat::font_size(14.0));
    }

    #[test]
    fn test_merged_right_wins() {
        let base = TextFormat::bold().merged(&TextFormat::font_size(12.0));
        let top = TextFormat::font_size(18.0);
        let merged = base.merged(&top);

        assert!(merged.has(FormatType::BOLD));
        assert_eq!(merged.font_size, Some(18.0));
    }

    #[test]
    fn test_without_drops_value() {
        let format = TextFormat::italic().merged(&TextFormat::foreground(Color::rgb(1, 2, 3)));
        let stripped = format.without(FormatType::FOREGROUND_COLOR);
        assert_eq!(stripped, TextFormat::italic());
        assert_eq!(stripped.foreground, None);
    }

    #[test]
    fn test_range_predicates() {
        let range = FormatRange::new(5, 10, TextFormat::bold());
        assert!(range.contains(5));
        assert!(!range.contains(10));
        assert!(range.overlaps(9, 12));
        assert!(!range.overlaps(10, 12));
        assert_eq!(range.len(), 5);
        assert!(FormatRange::new(3, 3, TextFormat::bold()).is_empty());
    }
}
