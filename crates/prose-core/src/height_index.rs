//! Cumulative Height Index
//!
//! A Fenwick (binary indexed) tree over paragraph heights, answering "where does paragraph `i`
//! start?" and "which paragraph covers `y`?" in O(log n).
//!
//! Point updates ([`HeightIndex::set_height`]) are O(log n). Structural edits
//! ([`HeightIndex::insert`], [`HeightIndex::remove`], [`HeightIndex::splice`]) rebuild the tree
//! in O(n): they only happen on paragraph split/merge/delete, which are rare compared to
//! per-keystroke height updates.

use crate::error::{EngineError, Result};
use std::ops::Range;

/// Fenwick tree over per-paragraph heights.
#[derive(Debug, Clone, Default)]
pub struct HeightIndex {
    /// Raw height of each paragraph.
    heights: Vec<f64>,
    /// 1-indexed Fenwick tree: `tree.len() == heights.len() + 1`, `tree[0]` unused.
    tree: Vec<f64>,
}

#[inline]
fn lowbit(i: usize) -> usize {
    i & i.wrapping_neg()
}

impl HeightIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self {
            heights: Vec::new(),
            tree: vec![0.0],
        }
    }

    /// Build an index from a list of heights in O(n).
    pub fn from_heights(heights: Vec<f64>) -> Self {
        let mut index = Self {
            heights,
            tree: Vec::new(),
        };
        index.rebuild();
        index
    }

    /// Number of paragraphs tracked.
    pub fn len(&self) -> usize {
        self.heights.len()
    }

    /// Whether the index tracks no paragraphs.
    pub fn is_empty(&self) -> bool {
        self.heights.is_empty()
    }

    /// Remove every entry.
    pub fn clear(&mut self) {
        self.heights.clear();
        self.tree.clear();
        self.tree.push(0.0);
    }

    /// Raw heights, in paragraph order.
    pub fn heights(&self) -> &[f64] {
        &self.heights
    }

    /// Height of paragraph `index`.
    pub fn height(&self, index: usize) -> Result<f64> {
        self.heights
            .get(index)
            .copied()
            .ok_or(EngineError::ParagraphOutOfRange {
                index,
                count: self.len(),
            })
    }

    /// Set the height of paragraph `index`, applying the delta to the tree.
    pub fn set_height(&mut self, index: usize, height: f64) -> Result<()> {
        let old = self.height(index)?;
        let delta = height - old;
        self.heights[index] = height;
        if delta != 0.0 {
            self.add_to_tree(index, delta);
        }
        Ok(())
    }

    /// Cumulative height of paragraphs `[0, index)`.
    ///
    /// `index` past the end is clamped to [`len`](Self::len), so `prefix_sum(len())` is the
    /// total height.
    pub fn prefix_sum(&self, index: usize) -> f64 {
        let mut i = index.min(self.len());
        let mut sum = 0.0;
        while i > 0 {
            sum += self.tree[i];
            i -= lowbit(i);
        }
        sum
    }

    /// Sum of all heights.
    pub fn total_height(&self) -> f64 {
        self.prefix_sum(self.len())
    }

    /// Find the paragraph whose vertical span `[prefix_sum(i), prefix_sum(i + 1))` contains `y`.
    ///
    /// - Empty index or `y < 0`: returns 0.
    /// - `y >= total_height()`: returns `len()` (the past-end sentinel).
    pub fn find_index_for_y(&self, y: f64) -> usize {
        let n = self.len();
        if n == 0 || y < 0.0 || y.is_nan() {
            return 0;
        }
        if y >= self.total_height() {
            return n;
        }

        // Descend the tree looking for the largest `pos` with prefix_sum(pos) <= y.
        let mut pos = 0usize;
        let mut sum = 0.0;
        let mut step = 1usize << (usize::BITS - 1 - n.leading_zeros());
        while step > 0 {
            let next = pos + step;
            if next <= n && sum + self.tree[next] <= y {
                pos = next;
                sum += self.tree[next];
            }
            step >>= 1;
        }

        // The descent adds tree nodes in a different order than `prefix_sum`, so fractional
        // heights can round differently. Settle against `prefix_sum` itself.
        let mut pos = pos.min(n - 1);
        while pos + 1 < n && self.prefix_sum(pos + 1) <= y {
            pos += 1;
        }
        while pos > 0 && self.prefix_sum(pos) > y {
            pos -= 1;
        }
        pos
    }

    /// Insert a paragraph height at `index` (O(n) rebuild).
    pub fn insert(&mut self, index: usize, height: f64) -> Result<()> {
        if index > self.len() {
            return Err(EngineError::ParagraphOutOfRange {
                index,
                count: self.len(),
            });
        }
        self.heights.insert(index, height);
        self.rebuild();
        Ok(())
    }

    /// Remove the paragraph height at `index` (O(n) rebuild). Returns the removed height.
    pub fn remove(&mut self, index: usize) -> Result<f64> {
        let removed = self.height(index)?;
        self.heights.remove(index);
        self.rebuild();
        Ok(removed)
    }

    /// Replace the heights in `range` with `replacement` using a single rebuild.
    pub fn splice<I>(&mut self, range: Range<usize>, replacement: I) -> Result<()>
    where
        I: IntoIterator<Item = f64>,
    {
        if range.start > range.end {
            return Err(EngineError::InvalidRange {
                start: range.start,
                end: range.end,
            });
        }
        if range.end > self.len() {
            return Err(EngineError::ParagraphOutOfRange {
                index: range.end,
                count: self.len(),
            });
        }
        self.heights.splice(range, replacement);
        self.rebuild();
        Ok(())
    }

    fn add_to_tree(&mut self, index: usize, delta: f64) {
        let n = self.len();
        let mut i = index + 1;
        while i <= n {
            self.tree[i] += delta;
            i += lowbit(i);
        }
    }

    /// Linear-time Fenwick construction.
    fn rebuild(&mut self) {
        let n = self.heights.len();
        self.tree.clear();
        self.tree.resize(n + 1, 0.0);
        for i in 1..=n {
            self.tree[i] += self.heights[i - 1];
            let parent = i + lowbit(i);
            if parent <= n {
                let value = self.tree[i];
                self.tree[parent] += value;
            }
        }
    }
}
