//! A `SparseObjectMatrix` stores objects addressed by the flat index of an N-dimensional space.
//!
//! Only indices that were explicitly set (or lazily requested) occupy memory. The matrix carries
//! its `Topology`, so callers can translate between flat indices and coordinates on the matrix
//! itself. The column memory of `Connections` is such a matrix.

use super::topology::Topology;
use fxhash::FxHashMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SparseObjectMatrix<T> {
    topology: Topology,
    objects: FxHashMap<usize, T>,
}

impl<T> SparseObjectMatrix<T> {
    /// Creates an empty matrix spanning the given dimensions.
    pub fn new(dimensions: &[usize]) -> Self {
        Self {
            topology: Topology::new(dimensions),
            objects: FxHashMap::default(),
        }
    }

    /// Stores `object` at `index`, returning the object previously stored there.
    pub fn set(&mut self, index: usize, object: T) -> Option<T> {
        debug_assert!(index < self.topology.size(), "index {index} outside of matrix");
        self.objects.insert(index, object)
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.objects.get(&index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.objects.get_mut(&index)
    }

    /// Returns the object at `index`, materializing it with `create` on first access.
    pub fn get_or_insert_with<F: FnOnce() -> T>(&mut self, index: usize, create: F) -> &mut T {
        self.objects.entry(index).or_insert_with(create)
    }

    #[inline]
    pub fn contains(&self, index: usize) -> bool {
        self.objects.contains_key(&index)
    }

    /// Number of materialized objects.
    #[inline]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// The largest addressable flat index, independent of how many objects exist.
    #[inline]
    pub fn max_index(&self) -> usize {
        self.topology.max_index()
    }

    #[inline]
    pub fn dimensions(&self) -> &[usize] {
        self.topology.dimensions()
    }

    #[inline]
    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    #[inline]
    pub fn compute_coordinates(&self, index: usize) -> Vec<usize> {
        self.topology.coordinates(index)
    }

    #[inline]
    pub fn compute_index(&self, coordinates: &[usize]) -> usize {
        self.topology.index(coordinates)
    }

    /// Flat indices of all materialized objects in ascending order.
    pub fn sparse_indices(&self) -> Vec<usize> {
        let mut indices: Vec<usize> = self.objects.keys().copied().collect();
        indices.sort_unstable();
        indices
    }

    /// Iterates over materialized objects in ascending index order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &T)> + '_ {
        self.sparse_indices()
            .into_iter()
            .filter_map(move |index| self.objects.get(&index).map(|object| (index, object)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn materializes_lazily() {
        let mut matrix: SparseObjectMatrix<Vec<u8>> = SparseObjectMatrix::new(&[4, 8]);
        assert!(matrix.is_empty());
        assert_eq!(matrix.max_index(), 31);

        matrix.get_or_insert_with(17, Vec::new).push(3);
        matrix.get_or_insert_with(17, || vec![9]).push(4);

        assert_eq!(matrix.len(), 1);
        assert_eq!(matrix.get(17), Some(&vec![3, 4]));
        assert!(matrix.get(16).is_none());
    }

    #[test]
    fn iterates_in_index_order() {
        let mut matrix = SparseObjectMatrix::new(&[100]);
        for index in [42, 7, 99, 0] {
            matrix.set(index, index * 2);
        }

        let seen: Vec<(usize, usize)> = matrix.iter().map(|(i, &v)| (i, v)).collect();
        assert_eq!(seen, vec![(0, 0), (7, 14), (42, 84), (99, 198)]);
    }

    #[test]
    fn coordinates_follow_matrix_shape() {
        let matrix: SparseObjectMatrix<()> = SparseObjectMatrix::new(&[3, 5]);
        assert_eq!(matrix.compute_coordinates(8), vec![1, 3]);
        assert_eq!(matrix.compute_index(&[1, 3]), 8);
    }
}
