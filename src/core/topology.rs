//! Topology represents an N-dimensional space through a list of dimensions and corresponding stride values.
//! The struct provides methods to convert between linear indices and coordinates in this N-dimensional space,
//! and also offers a way to iterate over neighborhoods of that space within a radius of a given center index.
//!
//! In the HTM Spatial Pooler context, the input and column spaces are N-dimensional.
//! SP uses typical neighborhood notions such as local inhibition and potential pools within a radius.
//! Topology helps manage the relationship between array-like indices and coordinates in these spaces.
//!
//! Neighborhoods are hypercubes (Chebyshev distance). A bounded neighborhood is clipped at the edges
//! of every dimension, a wrapping neighborhood treats the space as a torus. Both enumerate their
//! indices in a fixed order: ascending coordinates, last dimension varying fastest.

use serde::{Deserialize, Serialize};

/// Represents the shape of an N-dimensional space, along with precomputed stride values for
/// linear index conversions. The `dims` field stores the size of each dimension, while `strides`
/// stores the cumulative product of dimension sizes to enable fast index calculations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topology {
    dims: Vec<usize>,
    strides: Vec<usize>,
    column_major: bool,
}

impl Topology {
    /// Creates a new row-major `Topology` from a slice of dimension sizes.
    #[inline]
    pub fn new(dimensions: &[usize]) -> Self {
        Self::with_ordering(dimensions, false)
    }

    /// Creates a new column-major `Topology`, where the first dimension varies fastest.
    #[inline]
    pub fn column_major(dimensions: &[usize]) -> Self {
        Self::with_ordering(dimensions, true)
    }

    fn with_ordering(dimensions: &[usize], column_major: bool) -> Self {
        let dims = dimensions.to_vec();
        let strides = Self::strides(&dims, column_major);

        Self {
            dims,
            strides,
            column_major,
        }
    }

    /// Computes the stride values for each dimension in a given slice of dimension sizes.
    /// Strides are used to convert coordinates in N-dimensional space into a single linear index.
    #[inline]
    fn strides(dims: &[usize], column_major: bool) -> Vec<usize> {
        let mut strides = vec![1; dims.len()];

        if column_major {
            for i in 1..dims.len() {
                strides[i] = strides[i - 1] * dims[i - 1];
            }
        } else {
            for i in (0..dims.len().saturating_sub(1)).rev() {
                strides[i] = strides[i + 1] * dims[i + 1];
            }
        }

        strides
    }

    /// The size of every dimension.
    #[inline]
    pub fn dimensions(&self) -> &[usize] {
        &self.dims
    }

    #[inline]
    pub fn num_dimensions(&self) -> usize {
        self.dims.len()
    }

    /// Whether the first dimension varies fastest.
    #[inline]
    pub fn is_column_major(&self) -> bool {
        self.column_major
    }

    /// Number of addressable elements, the product of all dimensions.
    #[inline]
    pub fn size(&self) -> usize {
        self.dims.iter().product()
    }

    /// The largest valid flat index.
    #[inline]
    pub fn max_index(&self) -> usize {
        self.size().saturating_sub(1)
    }

    /// Converts a linear index into its corresponding set of coordinates in the topology's N-dimensional space.
    /// Each element of the returned `Vec<usize>` is the coordinate along one of the dimensions, in order.
    #[inline]
    pub fn coordinates(&self, index: usize) -> Vec<usize> {
        self.strides
            .iter()
            .zip(&self.dims)
            .map(|(&stride, &dim)| (index / stride) % dim)
            .collect()
    }

    /// Converts a set of coordinates in the topology's N-dimensional space to a single linear index.
    /// The length of `coords` must match the number of dimensions in the topology.
    #[inline]
    pub fn index(&self, coords: &[usize]) -> usize {
        coords.iter().zip(&self.strides).map(|(&c, &s)| c * s).sum()
    }

    /// Returns an iterator over the indices within Chebyshev distance `radius` of `center`,
    /// clipped at the boundaries of every dimension.
    #[inline]
    pub fn neighborhood(&self, center: usize, radius: usize) -> NeighborhoodIter<'_> {
        self.neighborhood_with(center, radius, false)
    }

    /// Returns an iterator over the indices within Chebyshev distance `radius` of `center`,
    /// wrapping around the edges of every dimension. A radius that covers a dimension more
    /// than once still yields every index exactly once.
    #[inline]
    pub fn wrapping_neighborhood(&self, center: usize, radius: usize) -> NeighborhoodIter<'_> {
        self.neighborhood_with(center, radius, true)
    }

    /// Returns an iterator over the neighborhood of indices within a given `radius` of the
    /// specified `center` index. If `wrapping` is true, the neighborhood wraps around edges of
    /// the topology dimensions; otherwise, it is clipped at boundaries.
    pub fn neighborhood_with(&self, center: usize, radius: usize, wrapping: bool) -> NeighborhoodIter<'_> {
        let center_coords = self.coordinates(center);

        let axes: Vec<Vec<usize>> = center_coords
            .iter()
            .zip(&self.dims)
            .map(|(&c, &dim)| {
                if wrapping && radius.saturating_mul(2).saturating_add(1) >= dim {
                    return (0..dim).collect();
                }

                let c = c as isize;
                let radius = radius.min(dim) as isize;
                let dim = dim as isize;

                if wrapping {
                    let mut axis: Vec<usize> = (c - radius..=c + radius)
                        .map(|v| v.rem_euclid(dim) as usize)
                        .collect();
                    axis.sort_unstable();
                    axis.dedup();
                    axis
                } else {
                    let low = (c - radius).max(0);
                    let high = (c + radius).min(dim - 1);
                    (low..=high).map(|v| v as usize).collect()
                }
            })
            .collect();

        let exhausted = axes.is_empty() || axes.iter().any(Vec::is_empty);
        let remaining = if exhausted {
            0
        } else {
            axes.iter().map(Vec::len).product()
        };

        NeighborhoodIter {
            topology: self,
            cursor: vec![0; axes.len()],
            axes,
            remaining,
        }
    }
}

/// An iterator that yields all valid indices within a neighborhood of a central index in the `Topology`.
/// It walks the cartesian product of one coordinate list per dimension.
pub struct NeighborhoodIter<'a> {
    topology: &'a Topology,
    axes: Vec<Vec<usize>>,
    cursor: Vec<usize>,
    remaining: usize,
}

impl Iterator for NeighborhoodIter<'_> {
    type Item = usize;

    /// Returns the next index within the neighborhood. When all indices have been visited, it returns `None`.
    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        let result = self
            .cursor
            .iter()
            .zip(&self.axes)
            .zip(&self.topology.strides)
            .map(|((&pos, axis), &stride)| axis[pos] * stride)
            .sum();

        self.remaining -= 1;

        for i in (0..self.cursor.len()).rev() {
            if self.cursor[i] + 1 < self.axes[i].len() {
                self.cursor[i] += 1;
                break;
            }
            self.cursor[i] = 0;
        }

        Some(result)
    }

    /// The exact number of indices that are still to be visited.
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for NeighborhoodIter<'_> {}
