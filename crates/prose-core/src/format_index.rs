//! Format Interval Index
//!
//! An augmented binary search tree over [`FormatRange`]s, keyed by `start`, where each node
//! also records the largest `end` in its subtree. Overlap queries prune every subtree whose
//! `max_end` lies at or before the query start, so lookups stay O(log n + k) on a balanced
//! tree.
//!
//! Nodes live in an arena (`Vec<Node>`) and refer to their children by `NodeId`; there are no
//! parent links. All traversals are iterative, so an unbalanced tree built by sorted
//! insertion never overflows the stack. Bulk construction and [`FormatIndex::remove_if`]
//! rebuild a balanced tree.

use crate::format::FormatRange;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct NodeId(usize);

#[derive(Debug, Clone)]
struct Node {
    range: FormatRange,
    /// Largest `range.end` in this subtree.
    max_end: usize,
    left: Option<NodeId>,
    right: Option<NodeId>,
}

/// Interval tree over format ranges.
#[derive(Debug, Clone, Default)]
pub struct FormatIndex {
    nodes: Vec<Node>,
    root: Option<NodeId>,
}

impl FormatIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a balanced index from `ranges`. Malformed ranges (`start >= end`) are skipped.
    pub fn from_ranges(ranges: impl IntoIterator<Item = FormatRange>) -> Self {
        let mut ranges: Vec<FormatRange> = ranges.into_iter().filter(|r| !r.is_empty()).collect();
        ranges.sort_by_key(|r| r.start);
        let mut index = Self::new();
        index.rebuild_sorted(ranges);
        index
    }

    /// Number of stored ranges.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the index holds no ranges.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Remove every range.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.root = None;
    }

    /// Insert a range. Returns `false` (and stores nothing) if `start >= end`.
    pub fn insert(&mut self, range: FormatRange) -> bool {
        if range.is_empty() {
            return false;
        }

        let id = NodeId(self.nodes.len());
        let (start, end) = (range.start, range.end);
        self.nodes.push(Node {
            range,
            max_end: end,
            left: None,
            right: None,
        });

        let Some(mut current) = self.root else {
            self.root = Some(id);
            return true;
        };

        loop {
            let node = &mut self.nodes[current.0];
            node.max_end = node.max_end.max(end);
            let slot = if start < node.range.start {
                &mut node.left
            } else {
                &mut node.right
            };
            match *slot {
                Some(next) => current = next,
                None => {
                    *slot = Some(id);
                    return true;
                }
            }
        }
    }

    /// All ranges containing `position`, ordered by start.
    pub fn find_at(&self, position: usize) -> Vec<&FormatRange> {
        self.find_overlapping(position, position.saturating_add(1))
    }

    /// All ranges intersecting `[start, end)`, ordered by start.
    pub fn find_overlapping(&self, start: usize, end: usize) -> Vec<&FormatRange> {
        let mut result = Vec::new();
        if start >= end {
            return result;
        }

        let mut stack: Vec<NodeId> = Vec::new();
        let mut current = self.root;
        loop {
            while let Some(id) = current {
                let node = &self.nodes[id.0];
                // Nothing in this subtree reaches `start`.
                if node.max_end <= start {
                    break;
                }
                stack.push(id);
                current = node.left;
            }

            let Some(id) = stack.pop() else {
                break;
            };
            let node = &self.nodes[id.0];
            // In-order: every remaining node starts at or after this one.
            if node.range.start >= end {
                break;
            }
            if node.range.end > start {
                result.push(&node.range);
            }
            current = node.right;
        }
        result
    }

    /// All ranges, ordered by start.
    pub fn all(&self) -> Vec<&FormatRange> {
        self.in_order().into_iter().map(|id| &self.nodes[id.0].range).collect()
    }

    /// Remove every range matching `predicate` and rebuild a balanced tree.
    ///
    /// Returns the number of removed ranges.
    pub fn remove_if<F>(&mut self, mut predicate: F) -> usize
    where
        F: FnMut(&FormatRange) -> bool,
    {
        let before = self.len();
        let kept: Vec<FormatRange> = self
            .take_sorted()
            .into_iter()
            .filter(|range| !predicate(range))
            .collect();
        let removed = before - kept.len();
        self.rebuild_sorted(kept);
        removed
    }

    /// Shift every boundary to account for an edit at `position`.
    ///
    /// - `delta > 0`: `delta` characters were inserted at `position`. Starts `>= position` and
    ///   ends `> position` move right, so a range ending exactly at `position` does not grow
    ///   and a range starting exactly there moves along with the inserted text.
    /// - `delta < 0`: `|delta|` characters were removed at `position`. Boundaries past the
    ///   removed span move left, boundaries inside it clamp to `position`, and ranges that
    ///   collapse are dropped.
    pub fn shift_ranges(&mut self, position: usize, delta: isize) {
        let amount = delta.unsigned_abs();
        if amount == 0 || self.is_empty() {
            return;
        }

        // Both boundary maps are monotone, so key order is preserved and each subtree
        // maximum maps to the new subtree maximum.
        if delta > 0 {
            let shift_start = |x: usize| if x >= position { x + amount } else { x };
            let shift_end = |x: usize| if x > position { x + amount } else { x };
            for node in &mut self.nodes {
                node.range.start = shift_start(node.range.start);
                node.range.end = shift_end(node.range.end);
                node.max_end = shift_end(node.max_end);
            }
            return;
        }

        let removed_end = position.saturating_add(amount);
        let shift = |x: usize| {
            if x >= removed_end {
                x - amount
            } else if x >= position {
                position
            } else {
                x
            }
        };
        let mut collapsed = false;
        for node in &mut self.nodes {
            node.range.start = shift(node.range.start);
            node.range.end = shift(node.range.end);
            node.max_end = shift(node.max_end);
            collapsed |= node.range.is_empty();
        }
        if collapsed {
            self.remove_if(FormatRange::is_empty);
        }
    }

    /// Height of the tree (0 when empty).
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack: Vec<(NodeId, usize)> = self.root.map(|id| (id, 1)).into_iter().collect();
        while let Some((id, depth)) = stack.pop() {
            deepest = deepest.max(depth);
            let node = &self.nodes[id.0];
            if let Some(left) = node.left {
                stack.push((left, depth + 1));
            }
            if let Some(right) = node.right {
                stack.push((right, depth + 1));
            }
        }
        deepest
    }

    fn in_order(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = Vec::new();
        let mut current = self.root;
        loop {
            while let Some(id) = current {
                stack.push(id);
                current = self.nodes[id.0].left;
            }
            let Some(id) = stack.pop() else {
                break;
            };
            order.push(id);
            current = self.nodes[id.0].right;
        }
        order
    }

    /// Drain the tree into a start-ordered list.
    fn take_sorted(&mut self) -> Vec<FormatRange> {
        let order = self.in_order();
        let mut slots: Vec<Option<Node>> = std::mem::take(&mut self.nodes)
            .into_iter()
            .map(Some)
            .collect();
        self.root = None;
        order
            .into_iter()
            .filter_map(|id| slots[id.0].take().map(|node| node.range))
            .collect()
    }

    /// Replace the contents with a balanced tree over `ranges` (already sorted by start).
    fn rebuild_sorted(&mut self, ranges: Vec<FormatRange>) {
        self.nodes = ranges
            .into_iter()
            .map(|range| Node {
                max_end: range.end,
                range,
                left: None,
                right: None,
            })
            .collect();
        let len = self.nodes.len();
        self.root = link_balanced(&mut self.nodes, 0, len);
    }
}

/// Link `nodes[lo..hi]` into a balanced subtree rooted at the midpoint. Recursion depth is
/// O(log n).
fn link_balanced(nodes: &mut [Node], lo: usize, hi: usize) -> Option<NodeId> {
    if lo >= hi {
        return None;
    }
    let mid = lo + (hi - lo) / 2;
    let left = link_balanced(nodes, lo, mid);
    let right = link_balanced(nodes, mid + 1, hi);

    let mut max_end = nodes[mid].range.end;
    if let Some(left) = left {
        max_end = max_end.max(nodes[left.0].max_end);
    }
    if let Some(right) = right {
        max_end = max_end.max(nodes[right.0].max_end);
    }

    let node = &mut nodes[mid];
    node.left = left;
    node.right = right;
    node.max_end = max_end;
    Some(NodeId(mid))
}
