//! Configuration of the HTM memory.
//!
//! `HtmConfig` is filled once before `SpatialPooler::init` and treated as immutable afterwards.
//! The only later writer is the homeostatic plasticity controller, which switches boosting off
//! when the newborn stage of the pooler ends.

use super::synapses::PermanenceOptions;
use crate::error::{HtmError, Result};
use serde::{Deserialize, Serialize};

/// Parameters of the spatial pooler and of the structural memory it lives in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HtmConfig {
    /// The shape (dimensions) of the input space.
    pub input_dimensions: Vec<usize>,

    /// The shape (dimensions) of the Spatial Pooler's column grid.
    pub column_dimensions: Vec<usize>,

    /// Number of cells in every column.
    pub cells_per_column: usize,

    /// Defines the radius (in input-space) around a column's center from which potential synapses can be drawn. If -1, the entire input space is used.
    pub potential_radius: i32,

    /// Controls how many input bits within the `potential_radius` become potential synapses for each column.
    pub potential_pct: f64,

    /// If true, all columns compete globally. Otherwise columns only compete within the inhibition radius.
    pub global_inhibition: bool,

    /// Target fraction of active columns inside an inhibition area. Ignored if not positive.
    pub local_area_density: f64,

    /// Target number of active columns inside an inhibition area, used when `local_area_density` is not positive.
    pub num_active_columns_per_inh_area: f64,

    /// The minimum overlap a column must have to be considered for winning.
    pub stimulus_threshold: f64,

    pub syn_perm_inactive_dec: f64,
    pub syn_perm_active_inc: f64,

    /// Permanence at or above which a synapse counts as connected.
    pub syn_perm_connected: f64,

    /// Derived in `post_init`: `syn_perm_connected / 10`.
    pub syn_perm_below_stimulus_inc: f64,

    /// Derived in `post_init`: `syn_perm_active_inc / 2`. Permanences at or below it are zeroed.
    pub syn_perm_trim_threshold: f64,

    pub syn_perm_min: f64,
    pub syn_perm_max: f64,

    /// Fraction of the maximum overlap duty cycle used as a threshold for deciding if a column's overlap duty cycle is too low.
    pub min_pct_overlap_duty_cycles: f64,

    /// Fraction of the maximum active duty cycle used as a threshold for deciding if a column's active duty cycle is too low.
    pub min_pct_active_duty_cycles: f64,

    /// The time window over which overlap and active duty cycles are averaged.
    pub duty_cycle_period: u64,

    /// The maximum possible boost factor that can be applied to a column's overlap if it is underactive.
    pub max_boost: f64,

    /// If true, neighborhoods "wrap around" the edges in topology calculations. The space behaves like a torus.
    pub wrap_around: bool,

    /// How often (in iterations) the inhibition radius and the minimum duty cycles are recalculated.
    pub update_period: u64,

    /// Fraction of each column's synapses that initially start out above the "connected" threshold.
    pub init_connected_pct: f64,

    /// Upper bound for the inhibition density derived from `num_active_columns_per_inh_area`.
    pub max_inhibition_density: f64,

    /// Seed of the random number generator used while initializing potential pools.
    pub random_seed: u64,

    /// Parameters of distal segments, kept for algorithms built on top of the column structure.
    pub distal: DistalConfig,
}

/// Distal segment parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistalConfig {
    pub activation_threshold: usize,
    pub min_threshold: usize,
    pub max_new_synapse_count: usize,
    pub max_synapses_per_segment: usize,
    pub max_segments_per_cell: usize,
    pub initial_permanence: f64,
    pub connected_permanence: f64,
    pub permanence_increment: f64,
    pub permanence_decrement: f64,
    pub predicted_segment_decrement: f64,
}

impl Default for DistalConfig {
    fn default() -> Self {
        Self {
            activation_threshold: 13,
            min_threshold: 10,
            max_new_synapse_count: 20,
            max_synapses_per_segment: 225,
            max_segments_per_cell: 225,
            initial_permanence: 0.21,
            connected_permanence: 0.5,
            permanence_increment: 0.10,
            permanence_decrement: 0.10,
            predicted_segment_decrement: 0.0,
        }
    }
}

impl Default for HtmConfig {
    fn default() -> Self {
        Self::new(vec![100], vec![2048])
    }
}

impl HtmConfig {
    /// Creates a configuration with the given input and column dimensions and default parameters.
    pub fn new(input_dimensions: Vec<usize>, column_dimensions: Vec<usize>) -> Self {
        Self {
            input_dimensions,
            column_dimensions,
            cells_per_column: 32,
            potential_radius: 15,
            potential_pct: 0.75,
            global_inhibition: false,
            local_area_density: -1.0,
            num_active_columns_per_inh_area: 10.0,
            stimulus_threshold: 0.0,
            syn_perm_inactive_dec: 0.008,
            syn_perm_active_inc: 0.05,
            syn_perm_connected: 0.10,
            syn_perm_below_stimulus_inc: 0.10 / 10.0,
            syn_perm_trim_threshold: 0.05 / 2.0,
            syn_perm_min: 0.0,
            syn_perm_max: 1.0,
            min_pct_overlap_duty_cycles: 0.001,
            min_pct_active_duty_cycles: 0.001,
            duty_cycle_period: 1000,
            max_boost: 10.0,
            wrap_around: true,
            update_period: 50,
            init_connected_pct: 0.5,
            max_inhibition_density: 0.5,
            random_seed: 42,
            distal: DistalConfig::default(),
        }
    }

    /// Total number of input bits.
    #[inline]
    pub fn num_inputs(&self) -> usize {
        self.input_dimensions.iter().product()
    }

    /// Total number of columns.
    #[inline]
    pub fn num_columns(&self) -> usize {
        self.column_dimensions.iter().product()
    }

    /// The potential radius with the "whole input space" sentinel resolved.
    #[inline]
    pub fn resolved_potential_radius(&self) -> usize {
        usize::try_from(self.potential_radius).unwrap_or_else(|_| self.num_inputs())
    }

    /// Derives dependent parameters. Safe to call more than once.
    pub fn post_init(&mut self) {
        self.syn_perm_below_stimulus_inc = self.syn_perm_connected / 10.0;
        self.syn_perm_trim_threshold = self.syn_perm_active_inc / 2.0;
        if self.potential_radius == -1 {
            self.potential_radius = i32::try_from(self.num_inputs()).unwrap_or(i32::MAX);
        }
    }

    /// The permanence step sizes and bounds used by potential pools.
    pub fn permanence_options(&self) -> PermanenceOptions {
        PermanenceOptions {
            inactive_decrement: self.syn_perm_inactive_dec,
            active_increment: self.syn_perm_active_inc,
            connected: self.syn_perm_connected,
            below_stimulus_increment: self.syn_perm_below_stimulus_inc,
            min: self.syn_perm_min,
            max: self.syn_perm_max,
            trim_threshold: self.syn_perm_trim_threshold,
        }
    }

    /// Checks every parameter the spatial pooler relies on.
    pub fn validate(&self) -> Result<()> {
        if self.num_active_columns_per_inh_area == 0.0
            && (self.local_area_density == 0.0 || self.local_area_density > 0.5)
        {
            return Err(HtmError::InvalidInhibitionParameters {
                num_active: self.num_active_columns_per_inh_area,
                density: self.local_area_density,
            });
        }

        if self.num_active_columns_per_inh_area <= 0.0 && self.local_area_density <= 0.0 {
            return Err(HtmError::InvalidInhibitionParameters {
                num_active: self.num_active_columns_per_inh_area,
                density: self.local_area_density,
            });
        }

        if self.input_dimensions.is_empty() || self.num_inputs() == 0 {
            return Err(HtmError::InvalidDimensions(format!(
                "invalid number of inputs, input dimensions {:?}",
                self.input_dimensions
            )));
        }

        if self.column_dimensions.is_empty() || self.num_columns() == 0 {
            return Err(HtmError::InvalidDimensions(format!(
                "invalid number of columns, column dimensions {:?}",
                self.column_dimensions
            )));
        }

        if self.input_dimensions.len() != self.column_dimensions.len() {
            return Err(HtmError::InvalidDimensions(format!(
                "input dimensions {:?} and column dimensions {:?} differ in rank",
                self.input_dimensions, self.column_dimensions
            )));
        }

        if self.potential_radius < -1 {
            return Err(invalid("potential_radius", "must be -1 or non-negative"));
        }

        if !(self.potential_pct > 0.0 && self.potential_pct <= 1.0) {
            return Err(invalid("potential_pct", "must be within (0, 1]"));
        }

        if !(self.syn_perm_connected > 0.0
            && self.syn_perm_min <= self.syn_perm_connected
            && self.syn_perm_connected <= self.syn_perm_max)
        {
            return Err(invalid(
                "syn_perm_connected",
                "must be positive and within [syn_perm_min, syn_perm_max]",
            ));
        }

        if self.duty_cycle_period == 0 {
            return Err(invalid("duty_cycle_period", "must be positive"));
        }

        if self.update_period == 0 {
            return Err(invalid("update_period", "must be positive"));
        }

        if self.stimulus_threshold < 0.0 {
            return Err(invalid("stimulus_threshold", "must not be negative"));
        }

        Ok(())
    }
}

fn invalid(name: &'static str, message: &str) -> HtmError {
    HtmError::InvalidParameter {
        name,
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(HtmConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_missing_inhibition_target() {
        let mut config = HtmConfig::new(vec![10], vec![10]);
        config.num_active_columns_per_inh_area = 0.0;
        config.local_area_density = 0.0;
        assert!(matches!(
            config.validate(),
            Err(HtmError::InvalidInhibitionParameters { .. })
        ));

        config.local_area_density = 0.7;
        assert!(config.validate().is_err());

        config.local_area_density = 0.2;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_bad_dimensions() {
        let config = HtmConfig::new(vec![], vec![10]);
        assert!(matches!(config.validate(), Err(HtmError::InvalidDimensions(_))));

        let config = HtmConfig::new(vec![10], vec![0]);
        assert!(matches!(config.validate(), Err(HtmError::InvalidDimensions(_))));

        let config = HtmConfig::new(vec![10, 10], vec![100]);
        assert!(matches!(config.validate(), Err(HtmError::InvalidDimensions(_))));
    }

    #[test]
    fn post_init_derives_parameters() {
        let mut config = HtmConfig::new(vec![4, 8], vec![2, 2]);
        config.syn_perm_connected = 0.2;
        config.syn_perm_active_inc = 0.1;
        config.potential_radius = -1;
        config.post_init();

        assert!((config.syn_perm_below_stimulus_inc - 0.02).abs() < 1e-12);
        assert!((config.syn_perm_trim_threshold - 0.05).abs() < 1e-12);
        assert_eq!(config.potential_radius, 32);
        assert_eq!(config.resolved_potential_radius(), 32);
    }

    #[test]
    fn config_survives_bincode() {
        let config = HtmConfig::new(vec![200], vec![2048]);
        let bytes = bincode::serialize(&config).unwrap();
        let decoded: HtmConfig = bincode::deserialize(&bytes).unwrap();
        assert_eq!(config, decoded);
    }
}
