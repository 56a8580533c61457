//! Helpers for producing and comparing sparse distributed representations.
//!
//! Dense SDRs are `i32` arrays where any non-zero element is an active bit. Sparse SDRs are the
//! ascending indices of the active bits.

use fxhash::FxHashSet;
use rand::{seq::IteratorRandom, Rng};

/// Indices of the non-zero elements of `dense`, ascending.
pub fn active_indices(dense: &[i32]) -> Vec<usize> {
    dense
        .iter()
        .enumerate()
        .filter_map(|(i, &bit)| (bit != 0).then_some(i))
        .collect()
}

/// A dense vector of `size` elements with the bits in `start..end` set to 1. The range is clipped
/// to the vector.
pub fn create_vector(size: usize, start: usize, end: usize) -> Vec<i32> {
    let mut dense = vec![0; size];
    let end = end.min(size);
    if start < end {
        dense[start..end].fill(1);
    }
    dense
}

/// A dense vector of `size` elements with `active` randomly chosen bits set to 1.
pub fn random_vector<R: Rng + ?Sized>(size: usize, active: usize, rng: &mut R) -> Vec<i32> {
    let mut dense = vec![0; size];
    for i in (0..size).choose_multiple(rng, active.min(size)) {
        dense[i] = 1;
    }
    dense
}

/// Similarity of two sparse SDRs: the number of shared indices divided by the length of the
/// longer one. Returns -1 if either is empty.
pub fn calc_array_similarity(a: &[usize], b: &[usize]) -> f64 {
    if a.is_empty() || b.is_empty() {
        return -1.0;
    }

    let lookup: FxHashSet<usize> = a.iter().copied().collect();
    let shared = b.iter().filter(|&&i| lookup.contains(&i)).count();
    shared as f64 / a.len().max(b.len()) as f64
}

/// Pairwise similarity of a list of sparse SDRs. Entry `[i][j]` compares `sdrs[i]` with `sdrs[j]`.
pub fn similarity_matrix(sdrs: &[Vec<usize>]) -> Vec<Vec<f64>> {
    sdrs.iter()
        .map(|a| sdrs.iter().map(|b| calc_array_similarity(a, b)).collect())
        .collect()
}

/// Renders a sparse SDR as `[i0, i1, ...]` for logging.
pub fn stringify(indices: &[usize]) -> String {
    let items: Vec<String> = indices.iter().map(usize::to_string).collect();
    format!("[{}]", items.join(", "))
}
