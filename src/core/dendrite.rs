//! Dendritic segments.
//!
//! Proximal dendrite:
//! - Every column owns exactly one, holding the column's potential `Pool` onto the input space.
//! - The Spatial Pooler reads it for overlaps and writes it when permanences are adapted.
//!
//! Distal dendrite (segment):
//! - Owned by a cell, holds synapses whose source is another cell.
//! - Remembers the iteration it was last used in and an ordinal (creation order), so the oldest
//!   segment of a cell can be evicted when the cell runs out of segment capacity.
//! - Sequence learning is not part of this crate; segments exist so that `Connections` offers the
//!   complete structural model to such an algorithm.

use super::{column::Cell, synapses::Pool};
use serde::{Deserialize, Serialize};

/// The single dendrite connecting a column to the input space.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProximalDendrite {
    column: usize,
    pool: Pool,
}

impl ProximalDendrite {
    pub fn new(column: usize) -> Self {
        Self {
            column,
            pool: Pool::default(),
        }
    }

    /// Index of the owning column.
    #[inline]
    pub fn column(&self) -> usize {
        self.column
    }

    /// Replaces the pool with a fresh one over `potential`, all permanences at zero.
    pub fn create_pool(&mut self, potential: &[usize]) -> &mut Pool {
        self.pool = Pool::new(potential);
        &mut self.pool
    }

    #[inline]
    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    #[inline]
    pub fn pool_mut(&mut self) -> &mut Pool {
        &mut self.pool
    }

    /// Input indices of the connected synapses, ascending.
    pub fn connected_synapses_sparse(&self) -> Vec<usize> {
        self.pool.connected_indices()
    }
}

/// A synapse on a distal segment, pointing at its presynaptic cell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistalSynapse {
    pub presynaptic_cell: Cell,
    pub permanence: f64,
}

/// Identifies a distal segment by its global index and its owning cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SegmentId {
    pub cell: Cell,
    pub index: usize,
}

/// A distal dendritic segment owned by a cell.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistalDendrite {
    index: usize,
    cell: Cell,
    last_used_iteration: u64,
    ordinal: u64,
    synapses: Vec<DistalSynapse>,
}

impl DistalDendrite {
    pub fn new(cell: Cell, index: usize, last_used_iteration: u64, ordinal: u64) -> Self {
        Self {
            index,
            cell,
            last_used_iteration,
            ordinal,
            synapses: Vec::new(),
        }
    }

    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    #[inline]
    pub fn id(&self) -> SegmentId {
        SegmentId {
            cell: self.cell,
            index: self.index,
        }
    }

    /// The cell this segment belongs to.
    #[inline]
    pub fn parent_cell(&self) -> Cell {
        self.cell
    }

    #[inline]
    pub fn last_used_iteration(&self) -> u64 {
        self.last_used_iteration
    }

    #[inline]
    pub fn set_last_used_iteration(&mut self, iteration: u64) {
        self.last_used_iteration = iteration;
    }

    #[inline]
    pub fn ordinal(&self) -> u64 {
        self.ordinal
    }

    #[inline]
    pub fn set_ordinal(&mut self, ordinal: u64) {
        self.ordinal = ordinal;
    }

    #[inline]
    pub fn synapses(&self) -> &[DistalSynapse] {
        &self.synapses
    }

    /// Adds a synapse onto `presynaptic_cell`, or updates the permanence of the existing one.
    pub fn add_synapse(&mut self, presynaptic_cell: Cell, permanence: f64) {
        match self
            .synapses
            .iter_mut()
            .find(|syn| syn.presynaptic_cell == presynaptic_cell)
        {
            Some(syn) => syn.permanence = permanence,
            None => self.synapses.push(DistalSynapse {
                presynaptic_cell,
                permanence,
            }),
        }
    }

    /// Removes the synapse with the lowest permanence, the first one on ties.
    pub fn remove_weakest_synapse(&mut self) -> Option<DistalSynapse> {
        let weakest = self
            .synapses
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| a.permanence.total_cmp(&b.permanence))
            .map(|(pos, _)| pos)?;
        Some(self.synapses.remove(weakest))
    }

    /// The synapses whose presynaptic cell is among `active_cells`.
    pub fn active_synapses<'a>(&'a self, active_cells: &'a [Cell]) -> impl Iterator<Item = &'a DistalSynapse> + 'a {
        self.synapses
            .iter()
            .filter(move |syn| active_cells.contains(&syn.presynaptic_cell))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distal_synapses_are_unique_per_presynaptic_cell() {
        let owner = Cell::new(0, 4, 0);
        let mut segment = DistalDendrite::new(owner, 0, 0, 0);
        let source = Cell::new(3, 4, 2);

        segment.add_synapse(source, 0.2);
        segment.add_synapse(source, 0.4);
        segment.add_synapse(Cell::new(5, 4, 1), 0.3);

        assert_eq!(segment.synapses().len(), 2);
        assert_eq!(segment.synapses()[0].permanence, 0.4);

        let active = [source];
        assert_eq!(segment.active_synapses(&active).count(), 1);
    }

    #[test]
    fn proximal_dendrite_reports_connected_inputs() {
        let mut dendrite = ProximalDendrite::new(7);
        dendrite.create_pool(&[1, 2, 3]);
        assert!(dendrite.connected_synapses_sparse().is_empty());
        assert_eq!(dendrite.pool().len(), 3);
    }
}
