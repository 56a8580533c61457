//! A `Column` in HTM represents one feature detector or receptive field in the Spatial Pooler.
//!
//! Biological inspiration:
//! Columns in HTM are inspired by cortical mini-columns found in the brain.
//! They consist of a group of neurons, which in HTM are modeled as "cells".
//!
//! Meaning in HTM:
//! Each column receives input from a random subset of the input space
//! (via the potential synapses of its single proximal dendrite), computes its overlap score with
//! the current input, and competes with other columns (via inhibition of neighbors within a radius)
//! to become one of the active "winner columns". Over multiple learning iterations, each column
//! adjusts its synapse permanence values to become selective for particular input patterns.
//! Together, all columns produce a sparse distributed representation of the input space.

use super::{dendrite::ProximalDendrite, synapses::Pool};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

/// A single cell (neuron) of a column.
///
/// The identity of a cell is its global index, `column * cells_per_column + position`.
/// Equality, ordering and hashing look at that index only.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Cell {
    index: usize,
    column: usize,
}

impl Cell {
    /// Creates the cell at `position` within `column`.
    #[inline]
    pub fn new(column: usize, cells_per_column: usize, position: usize) -> Self {
        Self {
            index: column * cells_per_column + position,
            column,
        }
    }

    /// The global index of this cell.
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    /// The index of the owning column.
    #[inline]
    pub fn column(&self) -> usize {
        self.column
    }
}

impl PartialEq for Cell {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl Eq for Cell {}

impl Hash for Cell {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
    }
}

impl PartialOrd for Cell {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Cell {
    fn cmp(&self, other: &Self) -> Ordering {
        self.index.cmp(&other.index)
    }
}

/// Represents a cortical column in the HTM model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Column {
    /// The flat index of the column in column space.
    index: usize,

    /// The cells of this column, `cells_per_column` of them.
    cells: Vec<Cell>,

    /// The dendrite connecting this column to the input space.
    proximal_dendrite: ProximalDendrite,
}

impl Column {
    /// Creates a new Column with `num_cells` cells and an empty proximal dendrite.
    pub fn new(num_cells: usize, index: usize) -> Self {
        Self {
            index,
            cells: (0..num_cells).map(|i| Cell::new(index, num_cells, i)).collect(),
            proximal_dendrite: ProximalDendrite::new(index),
        }
    }

    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Returns the cell at `position` within this column (not the global cell index).
    #[inline]
    pub fn cell(&self, position: usize) -> Option<Cell> {
        self.cells.get(position).copied()
    }

    #[inline]
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    #[inline]
    pub fn num_cells(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn proximal_dendrite(&self) -> &ProximalDendrite {
        &self.proximal_dendrite
    }

    #[inline]
    pub fn proximal_dendrite_mut(&mut self) -> &mut ProximalDendrite {
        &mut self.proximal_dendrite
    }

    /// Creates the potential pool of this column over the given input indices.
    pub fn create_potential_pool(&mut self, potential: &[usize]) -> &mut Pool {
        self.proximal_dendrite.create_pool(potential)
    }

    /// Shortcut for the pool of the proximal dendrite.
    #[inline]
    pub fn pool(&self) -> &Pool {
        self.proximal_dendrite.pool()
    }
}

impl PartialEq for Column {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl Eq for Column {}
