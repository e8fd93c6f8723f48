//! An ordered run of integers, built by binary-search insertion.

/// A strictly-ordered (duplicates permitted) sequence of integers, built one
/// insertion at a time.
#[derive(Debug, Default, Clone)]
pub struct SortedRun {
    items: Vec<i32>,
}

impl SortedRun {
    pub fn new() -> SortedRun {
        SortedRun { items: Vec::with_capacity(4) }
    }

    /// Insert `value`, keeping the run ordered.
    ///
    /// Inserts at the first index `i` with `items[i] > target` -- i.e. after
    /// any existing equal values, so insertion is stable with respect to
    /// ties. This is `Vec::partition_point`'s upper-bound search, not a raw
    /// binary search that can return an arbitrary midpoint on an empty or
    /// all-equal range (see the Open Questions in SPEC_FULL.md).
    pub fn insert(&mut self, value: i32) {
        let idx = self.items.partition_point(|&x| x <= value);
        self.items.insert(idx, value);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn as_slice(&self) -> &[i32] {
        &self.items
    }

    pub fn into_vec(self) -> Vec<i32> {
        self.items
    }
}
