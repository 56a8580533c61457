//! `Connections` is the memory of an HTM region.
//!
//! It owns the column matrix (each column with its cells and its proximal dendrite pool), the
//! per-column state the Spatial Pooler reads and writes on every cycle (overlaps, duty cycles,
//! boost factors), the global counters, the inhibition radius, the random number generator and the
//! configuration. Algorithms are stateless and operate on a `&mut Connections`.
//!
//! It also keeps the distal structure (segments owned by cells) and the cell activity of the
//! current cycle, for sequence algorithms built on top of the columns.

use super::{
    column::{Cell, Column},
    config::HtmConfig,
    dendrite::{DistalDendrite, SegmentId},
    sparse_matrix::SparseObjectMatrix,
    synapses::Pool,
    topology::Topology,
};
use crate::error::{HtmError, Result};
use fxhash::FxHashMap;
use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

fn unseeded_rng() -> StdRng {
    StdRng::seed_from_u64(0)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Connections {
    /// Parameters of this memory.
    pub config: HtmConfig,

    /// The total number of bits/inputs available.
    pub num_inputs: usize,

    /// The total number of columns.
    pub num_columns: usize,

    /// Maps flat column indices to column coordinates.
    pub column_topology: Topology,

    /// Maps flat input indices to input coordinates.
    pub input_topology: Topology,

    /// All columns, addressed by their flat index.
    pub memory: SparseObjectMatrix<Column>,

    /// Raw overlap of every column with the last input. Values below the stimulus threshold are 0.
    pub overlaps: Vec<f64>,

    /// Overlaps after boosting, the values the last inhibition saw.
    pub boosted_overlaps: Vec<f64>,

    /// Rolling average of how often each column had a non-zero overlap.
    pub overlap_duty_cycles: Vec<f64>,

    /// Rolling average of how often each column was a winner.
    pub active_duty_cycles: Vec<f64>,

    /// Per column threshold below which the overlap duty cycle counts as too low.
    pub min_overlap_duty_cycles: Vec<f64>,

    /// Per column threshold below which the active duty cycle counts as too low.
    pub min_active_duty_cycles: Vec<f64>,

    /// Multiplier applied to a column's overlap while learning.
    pub boost_factors: Vec<f64>,

    /// Number of `compute` calls, learning or not.
    pub iteration_num: u64,

    /// Number of `compute` calls with learning enabled.
    pub iteration_learn_num: u64,

    /// Radius (in columns) of the local inhibition area. Always at least 1 once initialized.
    pub inhibition_radius: usize,

    /// Set by `SpatialPooler::init`.
    pub initialized: bool,

    /// Only drawn from during initialization. Reseeded from the configuration after decoding.
    #[serde(skip, default = "unseeded_rng")]
    pub rng: StdRng,

    segments: FxHashMap<usize, Vec<DistalDendrite>>,
    next_segment_index: usize,
    next_segment_ordinal: u64,

    pub active_cells: BTreeSet<Cell>,
    pub winner_cells: BTreeSet<Cell>,
    pub active_segments: Vec<SegmentId>,
    pub matching_segments: Vec<SegmentId>,
}

impl Connections {
    /// Creates an empty memory for `config`. Nothing is allocated until `SpatialPooler::init`.
    pub fn new(config: HtmConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.random_seed);
        Self {
            num_inputs: config.num_inputs(),
            num_columns: config.num_columns(),
            column_topology: Topology::new(&config.column_dimensions),
            input_topology: Topology::new(&config.input_dimensions),
            memory: SparseObjectMatrix::new(&config.column_dimensions),
            config,
            overlaps: Vec::new(),
            boosted_overlaps: Vec::new(),
            overlap_duty_cycles: Vec::new(),
            active_duty_cycles: Vec::new(),
            min_overlap_duty_cycles: Vec::new(),
            min_active_duty_cycles: Vec::new(),
            boost_factors: Vec::new(),
            iteration_num: 0,
            iteration_learn_num: 0,
            inhibition_radius: 0,
            initialized: false,
            rng,
            segments: FxHashMap::default(),
            next_segment_index: 0,
            next_segment_ordinal: 0,
            active_cells: BTreeSet::new(),
            winner_cells: BTreeSet::new(),
            active_segments: Vec::new(),
            matching_segments: Vec::new(),
        }
    }

    /// Allocates the column matrix and the per-column arrays from the current configuration.
    /// Discards any previous state, including distal segments, and reseeds the generator.
    pub fn init_matrices(&mut self) {
        self.num_inputs = self.config.num_inputs();
        self.num_columns = self.config.num_columns();
        self.column_topology = Topology::new(&self.config.column_dimensions);
        self.input_topology = Topology::new(&self.config.input_dimensions);
        self.rng = StdRng::seed_from_u64(self.config.random_seed);

        let cells_per_column = self.config.cells_per_column;
        self.memory = SparseObjectMatrix::new(&self.config.column_dimensions);
        for index in 0..self.num_columns {
            self.memory.set(index, Column::new(cells_per_column, index));
        }

        let n = self.num_columns;
        self.overlaps = vec![0.0; n];
        self.boosted_overlaps = vec![0.0; n];
        self.overlap_duty_cycles = vec![0.0; n];
        self.active_duty_cycles = vec![0.0; n];
        self.min_overlap_duty_cycles = vec![0.0; n];
        self.min_active_duty_cycles = vec![0.0; n];
        self.boost_factors = vec![1.0; n];
        self.iteration_num = 0;
        self.iteration_learn_num = 0;
        self.inhibition_radius = 0;

        self.segments.clear();
        self.next_segment_index = 0;
        self.next_segment_ordinal = 0;
        self.clear_cell_activity();
    }

    /// Reseeds the generator from the configured seed.
    pub fn reseed(&mut self) {
        self.rng = StdRng::seed_from_u64(self.config.random_seed);
    }

    pub fn column(&self, index: usize) -> Result<&Column> {
        self.memory.get(index).ok_or(HtmError::UnknownColumn {
            index,
            num_columns: self.num_columns,
        })
    }

    pub fn column_mut(&mut self, index: usize) -> Result<&mut Column> {
        let num_columns = self.num_columns;
        self.memory
            .get_mut(index)
            .ok_or(HtmError::UnknownColumn { index, num_columns })
    }

    /// The potential pool of column `index`.
    pub fn pool(&self, index: usize) -> Result<&Pool> {
        self.column(index).map(Column::pool)
    }

    /// Input indices of the connected synapses of column `index`, ascending.
    pub fn connected_inputs(&self, index: usize) -> Result<Vec<usize>> {
        self.pool(index).map(Pool::connected_indices)
    }

    /// Permanences of column `index` for every input bit.
    pub fn dense_permanences(&self, index: usize) -> Result<Vec<f64>> {
        let num_inputs = self.num_inputs;
        self.pool(index).map(|pool| pool.dense_permanences(num_inputs))
    }

    /// Number of connected synapses for every column, in column order.
    pub fn connected_counts(&self) -> Vec<usize> {
        self.memory.iter().map(|(_, col)| col.pool().num_connected()).collect()
    }

    /// The cells of column `index`.
    pub fn cells_for_column(&self, index: usize) -> Result<&[Cell]> {
        self.column(index).map(Column::cells)
    }

    /// The cell with global index `cell_index`.
    pub fn cell(&self, cell_index: usize) -> Result<Cell> {
        let cells_per_column = self.config.cells_per_column.max(1);
        let column = cell_index / cells_per_column;
        self.column(column)?
            .cell(cell_index % cells_per_column)
            .ok_or(HtmError::UnknownColumn {
                index: column,
                num_columns: self.num_columns,
            })
    }

    // Distal segments

    /// Creates a new segment on `cell`. If the cell already holds `max_segments_per_cell`
    /// segments, the least recently used one is destroyed first.
    pub fn create_segment(&mut self, cell: Cell) -> SegmentId {
        let max_segments = self.config.distal.max_segments_per_cell.max(1);
        let iteration = self.iteration_num;
        let index = self.next_segment_index;
        let ordinal = self.next_segment_ordinal;
        self.next_segment_index += 1;
        self.next_segment_ordinal += 1;

        let segments = self.segments.entry(cell.index()).or_default();
        while segments.len() >= max_segments {
            let oldest = segments
                .iter()
                .enumerate()
                .min_by_key(|(_, seg)| (seg.last_used_iteration(), seg.ordinal()))
                .map(|(pos, _)| pos);
            match oldest {
                Some(pos) => {
                    segments.remove(pos);
                }
                None => break,
            }
        }

        let segment = DistalDendrite::new(cell, index, iteration, ordinal);
        let id = segment.id();
        segments.push(segment);
        id
    }

    /// Removes a segment with all of its synapses. Returns false if it did not exist.
    pub fn destroy_segment(&mut self, id: SegmentId) -> bool {
        let Some(segments) = self.segments.get_mut(&id.cell.index()) else {
            return false;
        };
        let before = segments.len();
        segments.retain(|seg| seg.index() != id.index);
        before != segments.len()
    }

    /// The segments of `cell`, oldest first.
    pub fn segments(&self, cell: Cell) -> &[DistalDendrite] {
        self.segments
            .get(&cell.index())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn segment(&self, id: SegmentId) -> Option<&DistalDendrite> {
        self.segments(id.cell).iter().find(|seg| seg.index() == id.index)
    }

    pub fn segment_mut(&mut self, id: SegmentId) -> Option<&mut DistalDendrite> {
        self.segments
            .get_mut(&id.cell.index())?
            .iter_mut()
            .find(|seg| seg.index() == id.index)
    }

    /// Marks a segment as used in the current iteration.
    pub fn record_segment_activity(&mut self, id: SegmentId) {
        let iteration = self.iteration_num;
        if let Some(segment) = self.segment_mut(id) {
            segment.set_last_used_iteration(iteration);
        }
    }

    /// Adds a synapse from `presynaptic_cell` onto segment `id`. A full segment drops its weakest
    /// synapse first. Returns false if the segment does not exist.
    pub fn create_distal_synapse(&mut self, id: SegmentId, presynaptic_cell: Cell, permanence: f64) -> bool {
        let max_synapses = self.config.distal.max_synapses_per_segment;
        let Some(segment) = self.segment_mut(id) else {
            return false;
        };

        let exists = segment
            .synapses()
            .iter()
            .any(|syn| syn.presynaptic_cell == presynaptic_cell);
        if !exists && max_synapses > 0 && segment.synapses().len() >= max_synapses {
            segment.remove_weakest_synapse();
        }
        segment.add_synapse(presynaptic_cell, permanence);
        true
    }

    /// Number of synapses on segment `id` whose presynaptic cell is in `active_cells`.
    pub fn num_active_synapses(&self, id: SegmentId, active_cells: &[Cell]) -> usize {
        self.segment(id)
            .map_or(0, |seg| seg.active_synapses(active_cells).count())
    }

    pub fn num_segments(&self) -> usize {
        self.segments.values().map(Vec::len).sum()
    }

    pub fn num_distal_synapses(&self) -> usize {
        self.segments
            .values()
            .flatten()
            .map(|seg| seg.synapses().len())
            .sum()
    }

    /// Picks the cell of column `index` with the fewest segments. Ties go to the lowest cell index.
    pub fn least_used_cell(&self, index: usize) -> Result<Cell> {
        self.cells_for_column(index)?
            .iter()
            .copied()
            .min_by_key(|&cell| (self.segments(cell).len(), cell.index()))
            .ok_or(HtmError::UnknownColumn {
                index,
                num_columns: self.num_columns,
            })
    }

    /// Forgets the cell activity of the current cycle.
    pub fn clear_cell_activity(&mut self) {
        self.active_cells.clear();
        self.winner_cells.clear();
        self.active_segments.clear();
        self.matching_segments.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory() -> Connections {
        let mut config = HtmConfig::new(vec![16], vec![8]);
        config.cells_per_column = 4;
        config.distal.max_segments_per_cell = 2;
        config.distal.max_synapses_per_segment = 2;
        let mut c = Connections::new(config);
        c.init_matrices();
        c
    }

    #[test]
    fn matrices_are_sized_by_configuration() {
        let c = memory();
        assert_eq!(c.num_columns, 8);
        assert_eq!(c.num_inputs, 16);
        assert_eq!(c.memory.len(), 8);
        assert_eq!(c.boost_factors, vec![1.0; 8]);
        assert_eq!(c.overlap_duty_cycles.len(), 8);
        for (index, column) in c.memory.iter() {
            assert_eq!(column.index(), index);
            assert_eq!(column.num_cells(), 4);
        }
    }

    #[test]
    fn unknown_columns_are_errors() {
        let c = memory();
        assert_eq!(
            c.column(8).err(),
            Some(HtmError::UnknownColumn {
                index: 8,
                num_columns: 8
            })
        );
        assert_eq!(c.cell(13).map(|cell| cell.column()), Ok(3));
    }

    #[test]
    fn full_cells_evict_least_recently_used_segment() {
        let mut c = memory();
        let cell = c.cell(5).unwrap();

        let first = c.create_segment(cell);
        c.iteration_num = 1;
        let second = c.create_segment(cell);
        c.iteration_num = 2;
        c.record_segment_activity(first);

        let third = c.create_segment(cell);
        let ids: Vec<SegmentId> = c.segments(cell).iter().map(|seg| seg.id()).collect();
        assert_eq!(ids, vec![first, third]);
        assert!(c.segment(second).is_none());
        assert!(!c.destroy_segment(second));
        assert_eq!(c.num_segments(), 2);
    }

    #[test]
    fn full_segments_drop_their_weakest_synapse() {
        let mut c = memory();
        let owner = c.cell(0).unwrap();
        let id = c.create_segment(owner);
        let (a, b, d) = (c.cell(4).unwrap(), c.cell(8).unwrap(), c.cell(12).unwrap());

        assert!(c.create_distal_synapse(id, a, 0.3));
        assert!(c.create_distal_synapse(id, b, 0.1));
        assert!(c.create_distal_synapse(id, d, 0.5));

        let sources: Vec<Cell> = c.segment(id).unwrap().synapses().iter().map(|s| s.presynaptic_cell).collect();
        assert_eq!(sources, vec![a, d]);
        assert_eq!(c.num_active_synapses(id, &[a, b]), 1);
        assert_eq!(c.num_distal_synapses(), 2);
    }

    #[test]
    fn least_used_cell_prefers_cells_without_segments() {
        let mut c = memory();
        let cells = c.cells_for_column(2).unwrap().to_vec();
        for &cell in &cells[..3] {
            c.create_segment(cell);
        }
        assert_eq!(c.least_used_cell(2), Ok(cells[3]));

        c.create_segment(cells[3]);
        c.create_segment(cells[0]);
        assert_eq!(c.least_used_cell(2), Ok(cells[1]));
        assert_eq!(c.least_used_cell(2), Ok(cells[1]));
    }
}
