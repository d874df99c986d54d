//! Bounded top-k selection over one linear scan.
//!
//! A max-heap of size `k` holds the best entries seen so far; its top is the
//! current worst, so each corpus row costs one comparison and, when it
//! qualifies, one `O(log k)` replacement. Entries order by `(key, id)`, so
//! among equal keys the lower corpus index wins and the output is
//! deterministic.
//!
//! Keys are any totally ordered type: `OrderedFloat<f32>` for float scans,
//! raw `i64` sums for integer kernels so large sums never round together.

use std::collections::BinaryHeap;

/// A scored corpus row. Lower key is better; ties go to the lower id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Entry<K> {
    key: K,
    id: u32,
}

/// Keeps the `k` smallest `(key, id)` pairs pushed into it.
#[derive(Debug)]
pub struct TopK<K: Ord> {
    k: usize,
    heap: BinaryHeap<Entry<K>>,
}

impl<K: Ord + Copy> TopK<K> {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            heap: BinaryHeap::with_capacity(k + 1),
        }
    }

    #[inline]
    pub fn push(&mut self, key: K, id: u32) {
        if self.k == 0 {
            return;
        }
        let entry = Entry { key, id };
        if self.heap.len() < self.k {
            self.heap.push(entry);
        } else if let Some(mut worst) = self.heap.peek_mut() {
            if entry < *worst {
                *worst = entry;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Drain into `(key, id)` pairs sorted best-first.
    pub fn into_sorted(self) -> Vec<(K, u32)> {
        self.heap
            .into_sorted_vec()
            .into_iter()
            .map(|e| (e.key, e.id))
            .collect()
    }
}

/// Score rows `0..n` with `key_fn` and return the best `k`, best-first.
#[inline]
pub fn select<K, F>(n: usize, k: usize, key_fn: F) -> Vec<(K, u32)>
where
    K: Ord + Copy,
    F: Fn(usize) -> K,
{
    let mut top = TopK::new(k);
    for id in 0..n {
        top.push(key_fn(id), id as u32);
    }
    top.into_sorted()
}
