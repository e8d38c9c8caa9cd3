//! Bounded min-heap for top-K selection.
//!
//! The root holds the smallest similarity currently kept, so deciding
//! whether a new candidate belongs in the result set is one comparison,
//! and replacing the worst kept entry is O(log k). `std::BinaryHeap`
//! wants `Ord` keys, which f32 is not, so the sift routines are local.

/// Fixed-capacity min-heap of `(similarity, id)` pairs.
#[derive(Debug)]
pub struct TopK {
    capacity: usize,
    entries: Vec<(f32, i64)>,
}

impl TopK {
    /// Heap keeping at most `capacity` best entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Number of entries currently kept.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing has been kept yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Offer a candidate: pushed while below capacity, otherwise it
    /// replaces the current minimum iff it scores higher.
    pub fn consider(&mut self, similarity: f32, id: i64) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.len() < self.capacity {
            self.entries.push((similarity, id));
            self.sift_up(self.entries.len() - 1);
        } else if similarity > self.entries[0].0 {
            self.entries[0] = (similarity, id);
            self.sift_down(0);
        }
    }

    /// Drain into a list sorted by similarity descending.
    pub fn into_sorted(mut self) -> Vec<(f32, i64)> {
        self.entries
            .sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        self.entries
    }

    fn sift_up(&mut self, mut i: usize) {
        while i > 0 {
            let parent = (i - 1) / 2;
            if self.entries[i].0 < self.entries[parent].0 {
                self.entries.swap(i, parent);
                i = parent;
            } else {
                break;
            }
        }
    }

    fn sift_down(&mut self, mut i: usize) {
        let len = self.entries.len();
        loop {
            let left = 2 * i + 1;
            let right = 2 * i + 2;
            let mut smallest = i;
            if left < len && self.entries[left].0 < self.entries[smallest].0 {
                smallest = left;
            }
            if right < len && self.entries[right].0 < self.entries[smallest].0 {
                smallest = right;
            }
            if smallest == i {
                break;
            }
            self.entries.swap(i, smallest);
            i = smallest;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn naive_top_k(pairs: &[(f32, i64)], k: usize) -> Vec<(f32, i64)> {
        let mut sorted = pairs.to_vec();
        sorted.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap());
        sorted.truncate(k);
        sorted
    }

    #[test]
    fn test_fewer_than_capacity() {
        let mut heap = TopK::new(5);
        heap.consider(0.3, 1);
        heap.consider(0.9, 2);
        let out = heap.into_sorted();
        assert_eq!(out, vec![(0.9, 2), (0.3, 1)]);
    }

    #[test]
    fn test_keeps_best_when_full() {
        let mut heap = TopK::new(2);
        heap.consider(0.1, 1);
        heap.consider(0.5, 2);
        heap.consider(0.3, 3);
        heap.consider(0.9, 4);
        let out = heap.into_sorted();
        assert_eq!(out, vec![(0.9, 4), (0.5, 2)]);
    }

    #[test]
    fn test_capacity_one() {
        let mut heap = TopK::new(1);
        for (i, s) in [0.2f32, 0.8, 0.5, 0.7].iter().enumerate() {
            heap.consider(*s, i as i64);
        }
        assert_eq!(heap.into_sorted(), vec![(0.8, 1)]);
    }

    #[test]
    fn test_capacity_zero_keeps_nothing() {
        let mut heap = TopK::new(0);
        heap.consider(1.0, 1);
        assert!(heap.is_empty());
        assert!(heap.into_sorted().is_empty());
    }

    #[test]
    fn test_negative_similarities() {
        let mut heap = TopK::new(2);
        heap.consider(-0.9, 1);
        heap.consider(-0.1, 2);
        heap.consider(-0.5, 3);
        let out = heap.into_sorted();
        assert_eq!(out, vec![(-0.1, 2), (-0.5, 3)]);
    }

    #[test]
    fn test_ties_keep_count() {
        let mut heap = TopK::new(3);
        for id in 0..10 {
            heap.consider(0.5, id);
        }
        let out = heap.into_sorted();
        assert_eq!(out.len(), 3);
        assert!(out.iter().all(|(s, _)| *s == 0.5));
    }

    #[test]
    fn test_matches_naive_selection() {
        let pairs: Vec<(f32, i64)> = (0..100)
            .map(|i| ((((i * 37) % 100) as f32) / 100.0, i))
            .collect();
        let mut heap = TopK::new(10);
        for (s, id) in &pairs {
            heap.consider(*s, *id);
        }
        let expected = naive_top_k(&pairs, 10);
        let got = heap.into_sorted();
        let expected_sims: Vec<f32> = expected.iter().map(|(s, _)| *s).collect();
        let got_sims: Vec<f32> = got.iter().map(|(s, _)| *s).collect();
        assert_eq!(got_sims, expected_sims);
    }
}
