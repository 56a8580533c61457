//! Snapshot of the cell activity reached during one compute call.
//!
//! Sequence algorithms compare the activity of consecutive cycles, so they need a frozen copy of
//! the state `Connections` held at the end of a call.

use super::{column::Cell, connections::Connections, dendrite::SegmentId};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComputeCycle {
    pub active_cells: BTreeSet<Cell>,
    pub winner_cells: BTreeSet<Cell>,
    pub active_segments: Vec<SegmentId>,
    pub matching_segments: Vec<SegmentId>,
    predictive_cells: BTreeSet<Cell>,
}

impl ComputeCycle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies the current cell activity out of `c`.
    pub fn from_connections(c: &Connections) -> Self {
        Self {
            active_cells: c.active_cells.clone(),
            winner_cells: c.winner_cells.clone(),
            active_segments: c.active_segments.clone(),
            matching_segments: c.matching_segments.clone(),
            predictive_cells: BTreeSet::new(),
        }
    }

    /// Overrides the derived predictive cells.
    pub fn set_predictive_cells(&mut self, cells: BTreeSet<Cell>) {
        self.predictive_cells = cells;
    }

    /// The cells predicted for the next cycle. Unless set explicitly, these are the parent cells
    /// of the active segments.
    pub fn predictive_cells(&self) -> BTreeSet<Cell> {
        if !self.predictive_cells.is_empty() {
            return self.predictive_cells.clone();
        }
        self.active_segments.iter().map(|seg| seg.cell).collect()
    }
}
