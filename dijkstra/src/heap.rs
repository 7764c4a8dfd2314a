// This file is part of Metropolis-Freight.
// Copyright © 2025 André de Palma, Lucas Javaudin
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Indexed binary min-heap over a pool of reusable heap elements.
use crate::graph::VertexId;

/// Slot value of a vertex that is no longer in the heap.
const REMOVED: usize = usize::MAX;

/// Record of a vertex in the heap pool.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HeapElement {
    vertex: VertexId,
    weight: f64,
    heuristic: Option<f64>,
    key: f64,
}

impl HeapElement {
    fn init(&mut self, vertex: VertexId, weight: f64) {
        self.vertex = vertex;
        self.weight = weight;
        self.heuristic = None;
        self.key = weight;
    }

    fn update_weight(&mut self, weight: f64) {
        self.weight = weight;
        self.key = weight + self.heuristic.unwrap_or(0.0);
    }

    fn update_heuristic(&mut self, heuristic: f64) {
        self.heuristic = Some(heuristic);
        self.key = self.weight + heuristic;
    }

    /// Return the vertex of the element.
    pub fn vertex(&self) -> VertexId {
        self.vertex
    }

    /// Return the tentative weight of the element.
    pub fn weight(&self) -> f64 {
        self.weight
    }

    /// Return the heuristic estimate of the element, if it has been computed.
    pub fn heuristic(&self) -> Option<f64> {
        self.heuristic
    }

    /// Return the key of the element (weight plus heuristic).
    pub fn key(&self) -> f64 {
        self.key
    }
}

impl Default for HeapElement {
    fn default() -> Self {
        HeapElement {
            vertex: 0,
            weight: f64::INFINITY,
            heuristic: None,
            key: f64::INFINITY,
        }
    }
}

/// A binary min-heap ordered by [HeapElement] keys, with vertex → slot tracking.
///
/// The element pool holds one element per vertex and is reset, not reallocated, when the heap is
/// initialized again with the same number of vertices.
#[derive(Clone, Debug, Default)]
pub struct IndexedBinaryHeap {
    /// Heap element of each vertex.
    elements: Vec<HeapElement>,
    /// Vertex stored at each heap slot; only the first `size` slots are meaningful.
    slots: Vec<VertexId>,
    /// Heap slot of each vertex, or `REMOVED`.
    positions: Vec<usize>,
    size: usize,
}

impl IndexedBinaryHeap {
    /// Reset the heap with all the vertices `0..nb_vertices`.
    ///
    /// The source vertex is put at the root with weight 0, all the other vertices have an
    /// infinite weight.
    pub fn init(&mut self, nb_vertices: usize, source: VertexId) {
        debug_assert!(source < nb_vertices);
        self.elements.resize(nb_vertices, HeapElement::default());
        self.slots.resize(nb_vertices, 0);
        self.positions.resize(nb_vertices, REMOVED);
        let order = std::iter::once(source)
            .chain(source + 1..nb_vertices)
            .chain(0..source);
        for (slot, vertex) in order.enumerate() {
            let weight = if vertex == source { 0.0 } else { f64::INFINITY };
            self.elements[vertex].init(vertex, weight);
            self.slots[slot] = vertex;
            self.positions[vertex] = slot;
        }
        self.size = nb_vertices;
    }

    /// Return the number of vertices still in the heap.
    pub fn len(&self) -> usize {
        self.size
    }

    /// Return `true` if the heap is empty.
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Return `true` if the vertex has not been extracted yet.
    pub fn contains(&self, vertex: VertexId) -> bool {
        self.positions.get(vertex).is_some_and(|&p| p != REMOVED)
    }

    /// Return the heap slot of a vertex, or `None` if it has been extracted.
    pub fn position(&self, vertex: VertexId) -> Option<usize> {
        self.positions.get(vertex).copied().filter(|&p| p != REMOVED)
    }

    /// Return the current weight of a vertex.
    pub fn weight(&self, vertex: VertexId) -> f64 {
        self.elements[vertex].weight
    }

    /// Return the heuristic estimate of a vertex, if computed.
    pub fn heuristic(&self, vertex: VertexId) -> Option<f64> {
        self.elements[vertex].heuristic
    }

    /// Return the element at the root of the heap.
    pub fn peek(&self) -> Option<&HeapElement> {
        if self.size == 0 {
            None
        } else {
            Some(&self.elements[self.slots[0]])
        }
    }

    /// Remove the element with minimum key and return its vertex and weight.
    ///
    /// Return `None` when the heap is drained.
    pub fn extract_min(&mut self) -> Option<(VertexId, f64)> {
        if self.size == 0 {
            return None;
        }
        let top = self.slots[0];
        self.size -= 1;
        if self.size > 0 {
            let last = self.slots[self.size];
            self.slots[0] = last;
            self.positions[last] = 0;
            self.heapify(0);
        }
        self.positions[top] = REMOVED;
        Some((top, self.elements[top].weight))
    }

    /// Lower the weight of a vertex still in the heap and move it up accordingly.
    pub fn decrease_key(&mut self, vertex: VertexId, weight: f64) {
        let slot = self.positions[vertex];
        debug_assert_ne!(slot, REMOVED, "vertex {vertex} was already extracted");
        debug_assert!(weight <= self.elements[vertex].weight);
        self.elements[vertex].update_weight(weight);
        self.sift_up(slot);
    }

    /// Record the heuristic estimate of a vertex still in the heap.
    ///
    /// Adding a non-negative heuristic can only increase the key so the element is moved down.
    pub fn set_heuristic(&mut self, vertex: VertexId, heuristic: f64) {
        let slot = self.positions[vertex];
        debug_assert_ne!(slot, REMOVED, "vertex {vertex} was already extracted");
        debug_assert!(heuristic >= 0.0);
        self.elements[vertex].update_heuristic(heuristic);
        self.heapify(slot);
    }

    /// Restore the heap property downward from the given slot.
    pub fn heapify(&mut self, mut slot: usize) {
        loop {
            let left = 2 * slot + 1;
            let right = left + 1;
            let mut smallest = slot;
            if left < self.size && self.key_at(left) < self.key_at(smallest) {
                smallest = left;
            }
            if right < self.size && self.key_at(right) < self.key_at(smallest) {
                smallest = right;
            }
            if smallest == slot {
                break;
            }
            self.swap(slot, smallest);
            slot = smallest;
        }
    }

    fn sift_up(&mut self, mut slot: usize) {
        while slot > 0 {
            let parent = (slot - 1) / 2;
            if self.key_at(slot) < self.key_at(parent) {
                self.swap(slot, parent);
                slot = parent;
            } else {
                break;
            }
        }
    }

    fn key_at(&self, slot: usize) -> f64 {
        self.elements[self.slots[slot]].key
    }

    fn swap(&mut self, a: usize, b: usize) {
        self.slots.swap(a, b);
        self.positions[self.slots[a]] = a;
        self.positions[self.slots[b]] = b;
    }

    /// Return `true` if every parent key is lower than or equal to its children keys and if the
    /// position map is consistent with the slots.
    pub fn check_invariant(&self) -> bool {
        (0..self.size).all(|slot| {
            let vertex = self.slots[slot];
            let parent_ok = slot == 0 || self.key_at((slot - 1) / 2) <= self.key_at(slot);
            parent_ok && self.positions[vertex] == slot
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use priority_queue::PriorityQueue;
    use rand::prelude::*;
    use rand_xorshift::XorShiftRng;
    use std::cmp::Reverse;

    #[test]
    fn init_test() {
        let mut heap = IndexedBinaryHeap::default();
        heap.init(5, 2);
        assert_eq!(heap.len(), 5);
        assert_eq!(heap.slots, vec![2, 3, 4, 0, 1]);
        assert_eq!(heap.position(2), Some(0));
        assert_eq!(heap.position(0), Some(3));
        assert_eq!(heap.weight(2), 0.0);
        assert_eq!(heap.weight(4), f64::INFINITY);
        assert!(heap.check_invariant());
        // Re-initialization reuses the pool.
        heap.extract_min();
        heap.init(5, 0);
        assert_eq!(heap.slots, vec![0, 1, 2, 3, 4]);
        assert!(heap.contains(2));
    }

    #[test]
    fn extract_min_test() {
        let mut heap = IndexedBinaryHeap::default();
        heap.init(4, 0);
        heap.decrease_key(3, 2.0);
        heap.decrease_key(1, 5.0);
        heap.decrease_key(2, 1.0);
        assert!(heap.check_invariant());
        assert_eq!(heap.extract_min(), Some((0, 0.0)));
        assert_eq!(heap.extract_min(), Some((2, 1.0)));
        assert!(!heap.contains(2));
        assert_eq!(heap.position(2), None);
        assert_eq!(heap.extract_min(), Some((3, 2.0)));
        assert_eq!(heap.extract_min(), Some((1, 5.0)));
        assert_eq!(heap.extract_min(), None);
        assert!(heap.is_empty());
    }

    #[test]
    fn heuristic_test() {
        let mut heap = IndexedBinaryHeap::default();
        heap.init(3, 0);
        heap.extract_min();
        heap.set_heuristic(1, 10.0);
        heap.set_heuristic(2, 1.0);
        heap.decrease_key(1, 1.0);
        heap.decrease_key(2, 5.0);
        assert_eq!(heap.peek().map(|e| e.key()), Some(6.0));
        assert!(heap.check_invariant());
        // Weight, not key, is returned.
        assert_eq!(heap.extract_min(), Some((2, 5.0)));
        assert_eq!(heap.heuristic(1), Some(10.0));
        assert_eq!(heap.extract_min(), Some((1, 1.0)));
    }

    #[test]
    fn zero_heuristic_is_computed_test() {
        let mut heap = IndexedBinaryHeap::default();
        heap.init(2, 0);
        assert_eq!(heap.heuristic(1), None);
        heap.set_heuristic(1, 0.0);
        assert_eq!(heap.heuristic(1), Some(0.0));
    }

    #[test]
    fn priority_queue_cross_check_test() {
        let mut rng = XorShiftRng::seed_from_u64(13081990);
        let n = 200;
        let mut heap = IndexedBinaryHeap::default();
        heap.init(n, 0);
        let mut reference = PriorityQueue::new();
        reference.push(0, Reverse(0u64));
        let mut weights = vec![u64::MAX; n];
        weights[0] = 0;
        for _ in 0..2000 {
            if rng.gen_bool(0.8) {
                let v = rng.gen_range(0..n);
                if !heap.contains(v) {
                    continue;
                }
                let w = rng.gen_range(0..1000);
                if w < weights[v] {
                    weights[v] = w;
                    heap.decrease_key(v, w as f64);
                    reference.push_increase(v, Reverse(w));
                }
            } else {
                let expected = reference.pop().map(|(_, Reverse(w))| w as f64);
                let actual = heap.extract_min().map(|(_, w)| w);
                match expected {
                    Some(w) => assert_eq!(actual, Some(w)),
                    // The reference queue only holds reached vertices.
                    None => assert!(actual.map_or(true, |w| w.is_infinite())),
                }
            }
            assert!(heap.check_invariant());
        }
    }
}
