//! The `SpatialPooler` is a core component of HTM that:
//! - Initializes a set of columns, each with potential synapses into its own subset of the input space.
//! - Computes an "overlap" score for each column based on how many connected synapses match the current input.
//! - Enforces sparse activity via inhibition, allowing only a subset of top columns to become "winner columns".
//! - Learns to increase/decrease synapse permanence (strength) values if the connected input bit was active/inactive.
//!
//! Each column selectively "tunes" its connections to represent frequently encountered input patterns, leading to SDRs.
//!
//! What are duty cycles?
//! - They are rolling metrics that measure how often each column is meeting certain criteria over time.
//! - The SP tracks: overlap duty cycles (ODC) and active duty cycles (ADC).
//! - ODC tracks how frequently a column has a non-zero overlap score with the input.
//! - ADC tracks how frequently a column is chosen as a winner after inhibition.
//! - By comparing these metrics to thresholds, the SP can decide whether to boost columns.
//! - This prevents columns from becoming inactive or uncompetitive over time.
//!
//! The pooler itself is stateless apart from its execution mode and an optional
//! `HomeostaticPlasticityController`. All learned state lives in `Connections`.

use super::{
    connections::Connections, homeostatic::HomeostaticPlasticityController, sdr, topology::Topology,
};
use crate::error::{HtmError, Result};
use collect_slice::CollectSlice;
use log::{debug, info};
use rand::seq::IteratorRandom;
use rayon::prelude::*;

/// Runs the Spatial Pooler algorithm on a `Connections` memory.
#[derive(Debug, Default)]
pub struct SpatialPooler {
    /// Score overlaps on the rayon pool.
    parallel: bool,

    /// Fed with every learning cycle, may switch boosting off.
    homeostatic: Option<HomeostaticPlasticityController>,
}

impl SpatialPooler {
    /// Creates a single-threaded `SpatialPooler`.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a `SpatialPooler` that scores column overlaps in parallel. Results are identical to
    /// the single-threaded pooler.
    #[inline]
    pub fn multithreaded() -> Self {
        Self {
            parallel: true,
            homeostatic: None,
        }
    }

    /// Attaches a homeostatic plasticity controller that observes every learning cycle.
    pub fn with_homeostatic_controller(mut self, controller: HomeostaticPlasticityController) -> Self {
        self.homeostatic = Some(controller);
        self
    }

    #[inline]
    pub fn is_multithreaded(&self) -> bool {
        self.parallel
    }

    #[inline]
    pub fn homeostatic_controller(&self) -> Option<&HomeostaticPlasticityController> {
        self.homeostatic.as_ref()
    }

    /// Initializes the memory for the Spatial Pooler:
    /// - Validates the configuration and derives dependent parameters.
    /// - Verifies that every column's potential pool can reach the stimulus threshold.
    /// - Allocates columns and per-column state.
    /// - Builds and configures the potential synapses of each column.
    /// - Computes the initial inhibition radius.
    ///
    /// Nothing in `c` is touched unless every check passes.
    pub fn init(&self, c: &mut Connections) -> Result<()> {
        let mut config = c.config.clone();
        config.validate()?;
        config.post_init();

        let column_topology = Topology::new(&config.column_dimensions);
        let input_topology = Topology::new(&config.input_dimensions);
        let radius = config.resolved_potential_radius();
        for column in 0..config.num_columns() {
            let center = map_column_between(column, &column_topology, &input_topology);
            let candidates = input_topology
                .neighborhood_with(center, radius, config.wrap_around)
                .len();
            let pool_size = Self::potential_size(candidates, config.potential_pct);
            if (pool_size as f64) < config.stimulus_threshold {
                return Err(HtmError::PotentialPoolTooSmall {
                    column,
                    pool_size,
                    stimulus_threshold: config.stimulus_threshold,
                });
            }
        }

        c.config = config;
        c.init_matrices();
        self.connect_and_configure_inputs(c)?;
        self.update_inhibition_radius(c);
        c.initialized = true;

        info!(
            "spatial pooler initialized: {} columns {:?}, {} inputs {:?}, inhibition radius {}, {} synapses connected",
            c.num_columns,
            c.config.column_dimensions,
            c.num_inputs,
            c.config.input_dimensions,
            c.inhibition_radius,
            c.connected_counts().iter().sum::<usize>()
        );

        Ok(())
    }

    /// Processes the current `input` and writes the winning columns into `active` (1 = active):
    /// - Validates the memory and both array lengths before anything is mutated.
    /// - Updates iteration counters.
    /// - Calculates overlaps between columns and input subsets.
    /// - Applies boosting if learning is enabled.
    /// - Performs inhibition to pick winner columns.
    ///
    /// If learning is enabled:
    /// - Updates synapse permanence values.
    /// - Updates duty cycles and boost factors.
    /// - Recalculates the inhibition radius and min duty cycles periodically.
    /// - Feeds the attached homeostatic plasticity controller.
    pub fn compute(&mut self, c: &mut Connections, input: &[i32], active: &mut [i32], learn: bool) -> Result<()> {
        if !c.initialized {
            return Err(HtmError::NotInitialized);
        }
        if input.len() != c.num_inputs {
            return Err(HtmError::InputSizeMismatch {
                expected: c.num_inputs,
                actual: input.len(),
            });
        }
        if active.len() != c.num_columns {
            return Err(HtmError::OutputSizeMismatch {
                expected: c.num_columns,
                actual: active.len(),
            });
        }

        self.update_iteration_number(c, learn);
        self.calculate_overlaps(c, input);
        self.boost(c, learn);
        let winners = self.inhibit_columns(c, &c.boosted_overlaps);

        if learn {
            self.adapt_synapses(c, input, &winners);
            self.update_duty_cycles(c, &winners);
            self.bump_up_weak_columns(c);
            self.update_boost_factors(c);
            if self.is_update_round(c) {
                self.update_inhibition_radius(c);
                self.update_min_duty_cycles(c);
                debug!(
                    "update round at iteration {}: inhibition radius {}",
                    c.iteration_num, c.inhibition_radius
                );
            }
        }

        active.fill(0);
        for &col in &winners {
            active[col] = 1;
        }

        if learn {
            if let Some(controller) = self.homeostatic.as_mut() {
                controller.compute(input, active, &mut c.config);
            }
        }

        Ok(())
    }

    /// Like `compute`, but returns the indices of the active columns.
    pub fn compute_active_columns(&mut self, c: &mut Connections, input: &[i32], learn: bool) -> Result<Vec<usize>> {
        let mut active = vec![0; c.num_columns];
        self.compute(c, input, &mut active, learn)?;
        Ok(sdr::active_indices(&active))
    }

    /// Increments the global iteration counters, including a separate counter if `learn` is true.
    #[inline]
    pub fn update_iteration_number(&self, c: &mut Connections, learn: bool) {
        c.iteration_num += 1;
        if learn {
            c.iteration_learn_num += 1;
        }
    }

    /// Whether the current iteration recalculates the inhibition radius and min duty cycles.
    #[inline]
    pub fn is_update_round(&self, c: &Connections) -> bool {
        c.iteration_num % c.config.update_period == 0
    }

    /// Calculates the overlap of each column with `input` into `c.overlaps`:
    /// - Counts how many connected synapses map to an active input bit.
    /// - Reports overlaps below the stimulus threshold as 0.
    pub fn calculate_overlaps(&self, c: &mut Connections, input: &[i32]) {
        let threshold = c.config.stimulus_threshold;
        let memory = &c.memory;
        let overlap_of = |col: usize| {
            let overlap = memory.get(col).map_or(0, |column| {
                column
                    .pool()
                    .connected()
                    .iter()
                    .filter(|syn| input[syn.input] != 0)
                    .count()
            }) as f64;
            if overlap < threshold {
                0.0
            } else {
                overlap
            }
        };

        if self.parallel {
            c.overlaps
                .par_iter_mut()
                .enumerate()
                .for_each(|(col, overlap)| *overlap = overlap_of(col));
        } else {
            c.overlaps
                .iter_mut()
                .enumerate()
                .for_each(|(col, overlap)| *overlap = overlap_of(col));
        }
    }

    /// Multiplies each column's overlap by its boost factor if learning is on, and stores the
    /// result in `c.boosted_overlaps`.
    pub fn boost(&self, c: &mut Connections, learn: bool) {
        if learn {
            c.overlaps
                .iter()
                .zip(&c.boost_factors)
                .map(|(&overlap, &boost)| overlap * boost)
                .collect_slice_checked(&mut c.boosted_overlaps[..]);
        } else {
            c.boosted_overlaps.copy_from_slice(&c.overlaps);
        }
    }

    /// The fraction of columns that may be active within an inhibition area.
    pub fn inhibition_density(&self, c: &Connections) -> f64 {
        if c.config.local_area_density > 0.0 {
            return c.config.local_area_density;
        }

        let diameter = 2 * c.inhibition_radius + 1;
        let area = (diameter as f64)
            .powi(c.config.column_dimensions.len() as i32)
            .min(c.num_columns as f64);
        (c.config.num_active_columns_per_inh_area / area).min(c.config.max_inhibition_density)
    }

    /// Selects the winner columns for the given `overlaps`, ascending.
    /// Global inhibition is used if configured or if the inhibition radius covers the column space.
    pub fn inhibit_columns(&self, c: &Connections, overlaps: &[f64]) -> Vec<usize> {
        let density = self.inhibition_density(c);
        let max_dimension = c.config.column_dimensions.iter().copied().max().unwrap_or(0);

        if c.config.global_inhibition || c.inhibition_radius > max_dimension {
            self.inhibit_columns_global(c, overlaps, density)
        } else {
            self.inhibit_columns_local(c, overlaps, density)
        }
    }

    /// Picks the `density * num_columns` columns with the highest overlaps:
    /// - Sorts all columns by overlap ascending, ties ordered by column index.
    /// - Takes the tail, skipping columns whose overlap is below the stimulus threshold.
    pub fn inhibit_columns_global(&self, c: &Connections, overlaps: &[f64], density: f64) -> Vec<usize> {
        let num_columns = overlaps.len();
        let num_active = (density * num_columns as f64) as usize;
        let threshold = c.config.stimulus_threshold;

        let mut sorted: Vec<usize> = (0..num_columns).collect();
        sorted.sort_by(|&a, &b| overlaps[a].total_cmp(&overlaps[b]));

        let mut start = num_columns.saturating_sub(num_active);
        while start < num_columns && overlaps[sorted[start]] < threshold {
            start += 1;
        }

        let mut winners = sorted[start..].to_vec();
        winners.sort_unstable();
        winners
    }

    /// Lets every column compete with the columns within the inhibition radius:
    /// - Visits columns in ascending order, skipping those below the stimulus threshold.
    /// - A column wins if fewer than `0.5 + density * neighborhood_size` neighbors have a larger overlap.
    /// - A winner's overlap is raised slightly, so later neighbors with the same overlap lose the tie.
    pub fn inhibit_columns_local(&self, c: &Connections, overlaps: &[f64], density: f64) -> Vec<usize> {
        let max_overlap = overlaps.iter().copied().fold(0.0, f64::max);
        let winner_delta = if max_overlap > 0.0 {
            max_overlap / 1000.0
        } else {
            0.001
        };
        let threshold = c.config.stimulus_threshold;

        let mut tie_broken = overlaps.to_vec();
        let mut winners = Vec::new();

        for col in 0..overlaps.len() {
            if overlaps[col] < threshold {
                continue;
            }

            let neighborhood = c
                .column_topology
                .neighborhood_with(col, c.inhibition_radius, c.config.wrap_around);
            let size = neighborhood.len();
            let num_bigger = neighborhood
                .filter(|&neighbor| tie_broken[neighbor] > overlaps[col])
                .count();
            let num_active = (0.5 + density * size as f64) as usize;

            if num_bigger < num_active {
                winners.push(col);
                tie_broken[col] += winner_delta;
            }
        }

        winners
    }

    /// Adjusts the potential synapses of each winner column:
    /// - Increments permanence of synapses whose input bit was active.
    /// - Decrements permanence of synapses whose input bit was inactive.
    /// - Raises the column to the stimulus threshold, trims and clips, refreshes the connected view.
    pub fn adapt_synapses(&self, c: &mut Connections, input: &[i32], winners: &[usize]) {
        let options = c.config.permanence_options();
        let threshold = c.config.stimulus_threshold;

        for &col in winners {
            if let Some(column) = c.memory.get_mut(col) {
                column.proximal_dendrite_mut().pool_mut().update(
                    |syn| {
                        if input[syn.input] != 0 {
                            options.active_increment
                        } else {
                            -options.inactive_decrement
                        }
                    },
                    true,
                    threshold,
                    &options,
                );
            }
        }
    }

    /// Updates the rolling duty cycles for overlap and active states.
    /// The period is `duty_cycle_period`, shortened to the iteration count during warm-up.
    pub fn update_duty_cycles(&self, c: &mut Connections, winners: &[usize]) {
        let period = c.config.duty_cycle_period.min(c.iteration_num).max(1) as f64;

        let overlapping: Vec<f64> = c
            .overlaps
            .iter()
            .map(|&overlap| if overlap > 0.0 { 1.0 } else { 0.0 })
            .collect();
        let mut activity = vec![0.0; c.num_columns];
        for &col in winners {
            activity[col] = 1.0;
        }

        Self::update_duty_cycles_helper(&mut c.overlap_duty_cycles, &overlapping, period);
        Self::update_duty_cycles_helper(&mut c.active_duty_cycles, &activity, period);
    }

    /// Moving average: `(duty_cycle * (period - 1) + new_value) / period`.
    pub fn update_duty_cycles_helper(duty_cycles: &mut [f64], new_values: &[f64], period: f64) {
        duty_cycles
            .iter_mut()
            .zip(new_values)
            .for_each(|(duty, &value)| *duty = (*duty * (period - 1.0) + value) / period);
    }

    /// Increases the permanence of every potential synapse of columns whose overlap duty cycle is
    /// below their minimum, then raises them to the stimulus threshold.
    pub fn bump_up_weak_columns(&self, c: &mut Connections) {
        let options = c.config.permanence_options();
        let threshold = c.config.stimulus_threshold;

        for col in 0..c.num_columns {
            if c.overlap_duty_cycles[col] >= c.min_overlap_duty_cycles[col] {
                continue;
            }
            if let Some(column) = c.memory.get_mut(col) {
                column.proximal_dendrite_mut().pool_mut().update(
                    |_| options.below_stimulus_increment,
                    true,
                    threshold,
                    &options,
                );
            }
        }
    }

    /// Recalculates each column's boost factor from its active duty cycle:
    /// - Above its minimum a column gets exactly 1.0.
    /// - Below, the factor grows linearly towards `max_boost` as the duty cycle approaches 0.
    ///
    /// While every minimum is 0 only the reset to 1.0 applies, other factors keep their value.
    pub fn update_boost_factors(&self, c: &mut Connections) {
        let any_minimum = c.min_active_duty_cycles.iter().any(|&min| min > 0.0);
        let max_boost = c.config.max_boost;

        for ((boost, &active), &min) in c
            .boost_factors
            .iter_mut()
            .zip(&c.active_duty_cycles)
            .zip(&c.min_active_duty_cycles)
        {
            if active > min {
                *boost = 1.0;
            } else if any_minimum {
                *boost = ((1.0 - max_boost) / min.max(f64::EPSILON)) * active + max_boost;
            }
        }
    }

    /// Updates the minimum duty cycles, globally if inhibition is global or the radius exceeds
    /// the input space, otherwise per column neighborhood.
    pub fn update_min_duty_cycles(&self, c: &mut Connections) {
        if c.config.global_inhibition || c.inhibition_radius > c.num_inputs {
            self.update_min_duty_cycles_global(c);
        } else {
            self.update_min_duty_cycles_local(c);
        }
    }

    /// Sets every column's minimum to a fraction of the largest duty cycle of all columns.
    pub fn update_min_duty_cycles_global(&self, c: &mut Connections) {
        let max_overlap = c.overlap_duty_cycles.iter().copied().fold(0.0, f64::max);
        let max_active = c.active_duty_cycles.iter().copied().fold(0.0, f64::max);
        c.min_overlap_duty_cycles
            .fill(c.config.min_pct_overlap_duty_cycles * max_overlap);
        c.min_active_duty_cycles
            .fill(c.config.min_pct_active_duty_cycles * max_active);
    }

    /// Sets every column's minimum to a fraction of the largest duty cycle in its neighborhood.
    pub fn update_min_duty_cycles_local(&self, c: &mut Connections) {
        let topology = &c.column_topology;
        let radius = c.inhibition_radius;
        let wrap_around = c.config.wrap_around;
        let pct_overlap = c.config.min_pct_overlap_duty_cycles;
        let pct_active = c.config.min_pct_active_duty_cycles;
        let overlap_duty_cycles = &c.overlap_duty_cycles;
        let active_duty_cycles = &c.active_duty_cycles;

        c.min_overlap_duty_cycles
            .par_iter_mut()
            .zip(c.min_active_duty_cycles.par_iter_mut())
            .enumerate()
            .for_each(|(col, (min_overlap, min_active))| {
                let (max_overlap, max_active) = topology
                    .neighborhood_with(col, radius, wrap_around)
                    .fold((0.0f64, 0.0f64), |(o, a), neighbor| {
                        (
                            o.max(overlap_duty_cycles[neighbor]),
                            a.max(active_duty_cycles[neighbor]),
                        )
                    });
                *min_overlap = pct_overlap * max_overlap;
                *min_active = pct_active * max_active;
            });
    }

    /// Updates the inhibition radius:
    /// - With global inhibition, the largest column dimension.
    /// - Otherwise the average connected span of the columns, projected into column space.
    pub fn update_inhibition_radius(&self, c: &mut Connections) {
        if c.config.global_inhibition {
            c.inhibition_radius = c.config.column_dimensions.iter().copied().max().unwrap_or(1);
            return;
        }

        let total_span: f64 = (0..c.num_columns)
            .map(|col| self.avg_connected_span_for_column(c, col))
            .sum();
        let avg_span = total_span / c.num_columns.max(1) as f64;
        let diameter = avg_span * self.avg_columns_per_input(c);
        let radius = ((diameter - 1.0) / 2.0).max(1.0);
        c.inhibition_radius = (radius + 0.5) as usize;
    }

    /// The average number of columns per input, over all dimensions.
    pub fn avg_columns_per_input(&self, c: &Connections) -> f64 {
        let dims = &c.config.column_dimensions;
        let ratios: f64 = dims
            .iter()
            .zip(&c.config.input_dimensions)
            .map(|(&col, &inp)| col as f64 / inp as f64)
            .sum();
        ratios / dims.len().max(1) as f64
    }

    /// The extent of a column's connected synapses in input space, averaged over all dimensions.
    /// 0 if the column has no connected synapses.
    pub fn avg_connected_span_for_column(&self, c: &Connections, column: usize) -> f64 {
        let connected = match c.pool(column) {
            Ok(pool) => pool.connected_indices(),
            Err(_) => return 0.0,
        };
        if connected.is_empty() {
            return 0.0;
        }

        let num_dims = c.input_topology.num_dimensions();
        let mut min = vec![usize::MAX; num_dims];
        let mut max = vec![0; num_dims];
        for input in connected {
            for (dim, coord) in c.input_topology.coordinates(input).into_iter().enumerate() {
                min[dim] = min[dim].min(coord);
                max[dim] = max[dim].max(coord);
            }
        }

        let total: usize = min.iter().zip(&max).map(|(&lo, &hi)| hi - lo + 1).sum();
        total as f64 / num_dims.max(1) as f64
    }

    /// Allocates and configures each column's potential synapses, in ascending column order:
    /// - Samples the potential pool with `map_potential`.
    /// - Draws initial permanences.
    /// - Raises the pool to the stimulus threshold.
    pub fn connect_and_configure_inputs(&self, c: &mut Connections) -> Result<()> {
        let wrap_around = c.config.wrap_around;

        for col in 0..c.num_columns {
            let potential = self.map_potential(c, col, wrap_around);
            c.column_mut(col)?.create_potential_pool(&potential);
            self.init_permanence(c, col)?;
            self.update_permanences_for_column(c, col, true)?;
        }

        Ok(())
    }

    /// Draws the initial permanences of the potential pool of `column`.
    pub fn init_permanence(&self, c: &mut Connections, column: usize) -> Result<()> {
        let options = c.config.permanence_options();
        let init_connected_pct = c.config.init_connected_pct;
        let num_columns = c.num_columns;
        c.memory
            .get_mut(column)
            .ok_or(HtmError::UnknownColumn {
                index: column,
                num_columns,
            })?
            .proximal_dendrite_mut()
            .pool_mut()
            .init_permanences(init_connected_pct, &options, &mut c.rng);
        Ok(())
    }

    /// Raises the pool of `column` until it reaches the stimulus threshold, if `raise` is set, then
    /// trims and clips its permanences and refreshes the connected view.
    pub fn update_permanences_for_column(&self, c: &mut Connections, column: usize, raise: bool) -> Result<()> {
        let options = c.config.permanence_options();
        let threshold = c.config.stimulus_threshold;
        let pool = c.column_mut(column)?.proximal_dendrite_mut().pool_mut();
        if raise && (pool.len() as f64) < threshold {
            return Err(HtmError::PotentialPoolTooSmall {
                column,
                pool_size: pool.len(),
                stimulus_threshold: threshold,
            });
        }

        pool.update(|_| 0.0, raise, threshold, &options);
        Ok(())
    }

    /// Raises the permanences of `column` until at least `stimulus_threshold` synapses are
    /// connected. Returns the number of connected synapses.
    pub fn raise_permanence_to_threshold(&self, c: &mut Connections, column: usize) -> Result<usize> {
        self.update_permanences_for_column(c, column, true)?;
        Ok(c.pool(column)?.num_connected())
    }

    /// Samples the potential pool of `column`:
    /// - Determines the center input index for the column via `map_column`.
    /// - Gathers all input indices within the potential radius from that center.
    /// - Randomly selects `potential_pct` of them, returned in ascending order.
    pub fn map_potential(&self, c: &mut Connections, column: usize, wrap_around: bool) -> Vec<usize> {
        let center = self.map_column(c, column);
        let radius = c.config.resolved_potential_radius();
        let neighborhood = c.input_topology.neighborhood_with(center, radius, wrap_around);
        let size = Self::potential_size(neighborhood.len(), c.config.potential_pct);

        let mut sample = neighborhood.choose_multiple(&mut c.rng, size);
        sample.sort_unstable();
        sample
    }

    /// How many potential synapses a column gets out of `candidates` inputs, rounded half up.
    #[inline]
    pub fn potential_size(candidates: usize, potential_pct: f64) -> usize {
        (candidates as f64 * potential_pct + 0.5) as usize
    }

    /// Maps a column index to the "center" input index in the input space:
    /// - Proportionally maps the column's coordinates to the input grid coordinates.
    /// - Offset by half an input-per-column step.
    /// - Clamps the result to the valid input range.
    #[inline]
    pub fn map_column(&self, c: &Connections, column: usize) -> usize {
        map_column_between(column, &c.column_topology, &c.input_topology)
    }

    /// The columns within `radius` of `column`, wrapping around if configured.
    pub fn column_neighborhood(&self, c: &Connections, column: usize, radius: usize) -> Vec<usize> {
        c.column_topology
            .neighborhood_with(column, radius, c.config.wrap_around)
            .collect()
    }

    /// The inputs within `radius` of `center`, wrapping around if configured.
    pub fn input_neighborhood(&self, c: &Connections, center: usize, radius: usize) -> Vec<usize> {
        c.input_topology
            .neighborhood_with(center, radius, c.config.wrap_around)
            .collect()
    }

    /// Removes the columns that never won a competition (active duty cycle 0) from `active`.
    pub fn strip_unlearned_columns(&self, c: &Connections, active: &[usize]) -> Vec<usize> {
        active
            .iter()
            .copied()
            .filter(|&col| c.active_duty_cycles.get(col).is_some_and(|&duty| duty > 0.0))
            .collect()
    }

    /// Every column's overlap relative to its number of connected synapses. 0 for columns without
    /// connected synapses.
    pub fn calculate_overlap_pct(&self, c: &Connections, overlaps: &[f64]) -> Vec<f64> {
        overlaps
            .iter()
            .zip(c.connected_counts())
            .map(|(&overlap, connected)| {
                if connected == 0 {
                    0.0
                } else {
                    overlap / connected as f64
                }
            })
            .collect()
    }
}

fn map_column_between(column: usize, column_topology: &Topology, input_topology: &Topology) -> usize {
    let coords: Vec<usize> = column_topology
        .coordinates(column)
        .into_iter()
        .zip(column_topology.dimensions())
        .zip(input_topology.dimensions())
        .map(|((coord, &col_dim), &in_dim)| {
            let mapped = (coord as f64 / col_dim as f64) * in_dim as f64
                + (in_dim as f64 / col_dim as f64) * 0.5;
            (mapped as usize).min(in_dim - 1)
        })
        .collect();
    input_topology.index(&coords)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::HtmConfig;

    fn memory(config: HtmConfig) -> Connections {
        let mut c = Connections::new(config);
        c.init_matrices();
        c
    }

    fn initialized(config: HtmConfig) -> Connections {
        let mut c = Connections::new(config);
        SpatialPooler::new().init(&mut c).unwrap();
        c
    }

    #[test]
    fn map_column_centers_columns_on_inputs() {
        let sp = SpatialPooler::new();
        let c = memory(HtmConfig::new(vec![12], vec![4]));
        let centers: Vec<usize> = (0..4).map(|col| sp.map_column(&c, col)).collect();
        assert_eq!(centers, vec![1, 4, 7, 10]);

        let c = memory(HtmConfig::new(vec![4, 4], vec![2, 2]));
        assert_eq!(sp.map_column(&c, 0), 5);
        assert_eq!(sp.map_column(&c, 3), 15);
    }

    #[test]
    fn map_potential_samples_the_neighborhood() {
        let sp = SpatialPooler::new();
        let mut config = HtmConfig::new(vec![12], vec![4]);
        config.potential_radius = 2;
        config.potential_pct = 1.0;
        let mut c = memory(config);

        assert_eq!(sp.map_potential(&mut c, 0, true), vec![0, 1, 2, 3, 11]);
        assert_eq!(sp.map_potential(&mut c, 0, false), vec![0, 1, 2, 3]);

        c.config.potential_pct = 0.5;
        let sample = sp.map_potential(&mut c, 1, false);
        assert_eq!(sample.len(), 3);
        assert!(sample.windows(2).all(|w| w[0] < w[1]));
        assert!(sample.iter().all(|&i| (2..=6).contains(&i)));
    }

    #[test]
    fn potential_size_rounds_half_up() {
        assert_eq!(SpatialPooler::potential_size(10, 0.75), 8);
        assert_eq!(SpatialPooler::potential_size(5, 0.5), 3);
        assert_eq!(SpatialPooler::potential_size(5, 0.3), 2);
    }

    #[test]
    fn init_builds_every_column() {
        let mut config = HtmConfig::new(vec![32], vec![16]);
        config.potential_radius = 4;
        config.stimulus_threshold = 3.0;
        config.cells_per_column = 2;
        let c = initialized(config);

        assert!(c.initialized);
        assert_eq!(c.memory.len(), 16);
        assert!(c.inhibition_radius >= 1);
        for (index, column) in c.memory.iter() {
            let pool = column.pool();
            assert_eq!(pool.len(), 7);
            assert!(pool.num_connected() >= 3);
            assert_eq!(column.num_cells(), 2);
            let center = SpatialPooler::new().map_column(&c, index) as isize;
            for input in pool.potential_indices() {
                let distance = (input as isize - center).rem_euclid(32);
                assert!(distance <= 4 || distance >= 28);
            }
        }
    }

    #[test]
    fn init_rejects_unreachable_stimulus_threshold_without_mutation() {
        let mut config = HtmConfig::new(vec![10], vec![5]);
        config.potential_radius = 1;
        config.potential_pct = 1.0;
        config.stimulus_threshold = 5.0;
        config.wrap_around = false;
        let mut c = Connections::new(config);

        let err = SpatialPooler::new().init(&mut c).unwrap_err();
        assert!(matches!(err, HtmError::PotentialPoolTooSmall { column: 0, pool_size: 3, .. }));
        assert!(!c.initialized);
        assert!(c.memory.is_empty());
        assert!(c.boost_factors.is_empty());
    }

    #[test]
    fn raise_permanence_reconnects_a_silenced_column() {
        let mut config = HtmConfig::new(vec![32], vec![16]);
        config.potential_radius = 4;
        config.stimulus_threshold = 3.0;
        let mut c = initialized(config);
        let sp = SpatialPooler::new();
        let options = c.config.permanence_options();

        c.column_mut(2)
            .unwrap()
            .proximal_dendrite_mut()
            .pool_mut()
            .update(|_| -1.0, false, 3.0, &options);
        assert_eq!(c.pool(2).unwrap().num_connected(), 0);

        assert!(sp.raise_permanence_to_threshold(&mut c, 2).unwrap() >= 3);

        c.config.stimulus_threshold = 8.0;
        assert!(matches!(
            sp.raise_permanence_to_threshold(&mut c, 2),
            Err(HtmError::PotentialPoolTooSmall { column: 2, pool_size: 7, .. })
        ));
    }

    #[test]
    fn init_rejects_invalid_inhibition_parameters() {
        let mut config = HtmConfig::new(vec![10], vec![5]);
        config.num_active_columns_per_inh_area = 0.0;
        config.local_area_density = 0.0;
        let mut c = Connections::new(config);
        assert!(matches!(
            SpatialPooler::new().init(&mut c),
            Err(HtmError::InvalidInhibitionParameters { .. })
        ));
    }

    #[test]
    fn global_inhibition_takes_top_columns_and_breaks_ties_by_index() {
        let mut config = HtmConfig::new(vec![10], vec![10]);
        config.global_inhibition = true;
        config.num_active_columns_per_inh_area = 2.0;
        let mut c = memory(config);
        let sp = SpatialPooler::new();
        sp.update_inhibition_radius(&mut c);
        assert_eq!(c.inhibition_radius, 10);
        assert!((sp.inhibition_density(&c) - 0.2).abs() < 1e-12);

        let overlaps = [5.0, 1.0, 7.0, 6.0, 2.0, 7.0, 0.0, 3.0, 4.0, 7.0];
        assert_eq!(sp.inhibit_columns(&c, &overlaps), vec![5, 9]);

        c.config.stimulus_threshold = 4.0;
        let overlaps = [0.0, 0.0, 5.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0];
        assert_eq!(sp.inhibit_columns(&c, &overlaps), vec![2]);
    }

    #[test]
    fn local_inhibition_is_local() {
        let mut config = HtmConfig::new(vec![10], vec![10]);
        config.local_area_density = 0.34;
        config.wrap_around = false;
        let mut c = memory(config);
        c.inhibition_radius = 1;

        let sp = SpatialPooler::new();
        let overlaps = [1.0, 5.0, 1.0, 1.0, 6.0, 1.0, 1.0, 1.0, 1.0, 2.0];
        assert_eq!(sp.inhibit_columns(&c, &overlaps), vec![1, 4, 6, 9]);
    }

    #[test]
    fn overlaps_below_stimulus_threshold_are_zero() {
        let mut config = HtmConfig::new(vec![8], vec![2]);
        config.stimulus_threshold = 3.0;
        let mut c = memory(config);
        let options = c.config.permanence_options();
        c.column_mut(0).unwrap().create_potential_pool(&[0, 1, 2, 3]).update(|_| 0.5, false, 0.0, &options);
        c.column_mut(1).unwrap().create_potential_pool(&[4, 5, 6, 7]).update(|_| 0.5, false, 0.0, &options);

        let input = [1, 1, 1, 0, 1, 1, 0, 0];
        for sp in [SpatialPooler::new(), SpatialPooler::multithreaded()] {
            sp.calculate_overlaps(&mut c, &input);
            assert_eq!(c.overlaps, vec![3.0, 0.0]);
        }

        assert_eq!(SpatialPooler::new().calculate_overlap_pct(&c, &[3.0, 2.0]), vec![0.75, 0.5]);
    }

    #[test]
    fn boost_applies_only_while_learning() {
        let mut c = memory(HtmConfig::new(vec![4], vec![2]));
        c.overlaps = vec![2.0, 3.0];
        c.boost_factors = vec![1.5, 1.0];
        let sp = SpatialPooler::new();

        sp.boost(&mut c, true);
        assert_eq!(c.boosted_overlaps, vec![3.0, 3.0]);
        sp.boost(&mut c, false);
        assert_eq!(c.boosted_overlaps, vec![2.0, 3.0]);
    }

    #[test]
    fn boost_factors_follow_active_duty_cycles() {
        let mut c = memory(HtmConfig::new(vec![4], vec![3]));
        let sp = SpatialPooler::new();

        c.active_duty_cycles = vec![0.05, 0.2, 0.0];
        sp.update_boost_factors(&mut c);
        assert_eq!(c.boost_factors, vec![1.0; 3]);

        c.min_active_duty_cycles = vec![0.1, 0.1, 0.1];
        sp.update_boost_factors(&mut c);
        assert!((c.boost_factors[0] - 5.5).abs() < 1e-9);
        assert_eq!(c.boost_factors[1], 1.0);
        assert!((c.boost_factors[2] - 10.0).abs() < 1e-9);
    }

    #[test]
    fn active_columns_lose_their_boost_when_minimums_are_zero() {
        let mut c = memory(HtmConfig::new(vec![4], vec![3]));
        let sp = SpatialPooler::new();

        c.boost_factors = vec![4.0, 4.0, 4.0];
        c.active_duty_cycles = vec![0.3, 0.0, 0.01];
        c.min_active_duty_cycles = vec![0.0; 3];
        sp.update_boost_factors(&mut c);
        assert_eq!(c.boost_factors, vec![1.0, 4.0, 1.0]);
    }

    #[test]
    fn duty_cycles_are_moving_averages() {
        let mut duty = vec![0.5, 0.5];
        SpatialPooler::update_duty_cycles_helper(&mut duty, &[1.0, 0.0], 10.0);
        assert!((duty[0] - 0.55).abs() < 1e-12);
        assert!((duty[1] - 0.45).abs() < 1e-12);

        let mut c = memory(HtmConfig::new(vec![4], vec![2]));
        c.iteration_num = 1;
        c.overlaps = vec![2.0, 0.0];
        SpatialPooler::new().update_duty_cycles(&mut c, &[1]);
        assert_eq!(c.overlap_duty_cycles, vec![1.0, 0.0]);
        assert_eq!(c.active_duty_cycles, vec![0.0, 1.0]);
    }

    #[test]
    fn min_duty_cycles_local_and_global() {
        let mut config = HtmConfig::new(vec![6], vec![6]);
        config.wrap_around = false;
        config.min_pct_overlap_duty_cycles = 0.5;
        config.min_pct_active_duty_cycles = 0.1;
        let mut c = memory(config);
        c.inhibition_radius = 1;
        c.overlap_duty_cycles = vec![0.2, 0.0, 0.0, 0.0, 0.0, 0.8];
        c.active_duty_cycles = vec![1.0, 0.0, 0.0, 0.0, 0.0, 0.0];
        let sp = SpatialPooler::new();

        sp.update_min_duty_cycles(&mut c);
        assert_eq!(c.min_overlap_duty_cycles, vec![0.1, 0.1, 0.0, 0.0, 0.4, 0.4]);
        assert_eq!(c.min_active_duty_cycles, vec![0.1, 0.1, 0.0, 0.0, 0.0, 0.0]);

        c.config.global_inhibition = true;
        sp.update_min_duty_cycles(&mut c);
        assert_eq!(c.min_overlap_duty_cycles, vec![0.4; 6]);
        assert_eq!(c.min_active_duty_cycles, vec![0.1; 6]);
    }

    #[test]
    fn inhibition_radius_from_connected_span() {
        let mut c = memory(HtmConfig::new(vec![8], vec![4]));
        let options = c.config.permanence_options();
        let all: Vec<usize> = (0..8).collect();
        for col in 0..4 {
            c.column_mut(col).unwrap().create_potential_pool(&all).update(|_| 0.5, false, 0.0, &options);
        }
        let sp = SpatialPooler::new();

        assert_eq!(sp.avg_columns_per_input(&c), 0.5);
        assert_eq!(sp.avg_connected_span_for_column(&c, 0), 8.0);
        sp.update_inhibition_radius(&mut c);
        assert_eq!(c.inhibition_radius, 2);

        c.column_mut(3).unwrap().create_potential_pool(&[]);
        assert_eq!(sp.avg_connected_span_for_column(&c, 3), 0.0);
    }

    #[test]
    fn weak_columns_get_bumped() {
        let mut config = HtmConfig::new(vec![4], vec![2]);
        config.stimulus_threshold = 0.0;
        let mut c = memory(config);
        let options = c.config.permanence_options();
        c.column_mut(0).unwrap().create_potential_pool(&[0, 1]).update(|_| 0.05, false, 0.0, &options);
        c.column_mut(1).unwrap().create_potential_pool(&[2, 3]).update(|_| 0.05, false, 0.0, &options);
        c.min_overlap_duty_cycles = vec![0.1, 0.0];

        SpatialPooler::new().bump_up_weak_columns(&mut c);
        assert!((c.pool(0).unwrap().permanence(0) - 0.06).abs() < 1e-12);
        assert!((c.pool(1).unwrap().permanence(2) - 0.05).abs() < 1e-12);
    }

    #[test]
    fn compute_validates_before_mutating() {
        let mut sp = SpatialPooler::new();
        let mut c = Connections::new(HtmConfig::new(vec![16], vec![8]));
        let mut active = vec![0; 8];
        assert_eq!(
            sp.compute(&mut c, &[0; 16], &mut active, true),
            Err(HtmError::NotInitialized)
        );

        sp.init(&mut c).unwrap();
        assert_eq!(
            sp.compute(&mut c, &[0; 15], &mut active, true),
            Err(HtmError::InputSizeMismatch {
                expected: 16,
                actual: 15
            })
        );
        assert_eq!(
            sp.compute(&mut c, &[0; 16], &mut [0; 7], true),
            Err(HtmError::OutputSizeMismatch {
                expected: 8,
                actual: 7
            })
        );
        assert_eq!(c.iteration_num, 0);
    }

    #[test]
    fn strip_unlearned_columns_keeps_active_ones() {
        let mut c = memory(HtmConfig::new(vec![4], vec![4]));
        c.active_duty_cycles = vec![0.0, 0.3, 0.0, 0.1];
        let sp = SpatialPooler::new();
        assert_eq!(sp.strip_unlearned_columns(&c, &[0, 1, 2, 3]), vec![1, 3]);
    }

    #[test]
    fn neighborhoods_follow_wrap_around() {
        let mut c = memory(HtmConfig::new(vec![10], vec![10]));
        let sp = SpatialPooler::new();
        let mut hood = sp.column_neighborhood(&c, 0, 1);
        hood.sort_unstable();
        assert_eq!(hood, vec![0, 1, 9]);

        c.config.wrap_around = false;
        assert_eq!(sp.input_neighborhood(&c, 0, 1), vec![0, 1]);
    }

    #[test]
    fn update_rounds_follow_update_period() {
        let mut c = memory(HtmConfig::new(vec![4], vec![4]));
        c.config.update_period = 5;
        let sp = SpatialPooler::new();
        c.iteration_num = 4;
        assert!(!sp.is_update_round(&c));
        c.iteration_num = 10;
        assert!(sp.is_update_round(&c));
    }
}
