//! Homeostatic plasticity controller.
//!
//! A freshly initialized Spatial Pooler is "newborn": boosting is strong and the SDR produced for
//! the same input keeps changing. The controller watches every learning cycle and
//! - keeps the pooler in the newborn stage for `min_cycles` cycles,
//! - then switches boosting off in the configuration,
//! - then tracks, per distinct input, how many consecutive cycles the produced SDR stayed similar
//!   to the previous one, and declares the pooler stable once every known input reached
//!   `cycles_to_wait_on_change` such cycles.
//!
//! Every change of state is reported through the callback given at construction.

use super::{config::HtmConfig, sdr};
use fnv::FnvHasher;
use fxhash::FxHashMap;
use log::{debug, info, warn};
use std::fmt::{self, Write};
use std::hash::Hasher;

/// Where the controlled pooler currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StabilityState {
    /// Boosting is active, SDRs are not tracked for stability yet.
    Newborn,
    /// Boosting is off, at least one input does not produce a stable SDR yet.
    Stabilizing,
    /// Every known input produced a similar SDR for long enough.
    Stable,
}

impl fmt::Display for StabilityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StabilityState::Newborn => "newborn",
            StabilityState::Stabilizing => "stabilizing",
            StabilityState::Stable => "stable",
        };
        f.write_str(name)
    }
}

/// Passed to the callback on every state transition.
#[derive(Debug, Clone, PartialEq)]
pub struct StabilityReport {
    pub state: StabilityState,
    pub is_stable: bool,
    /// Number of distinct inputs seen so far.
    pub num_patterns: usize,
    /// Average number of active columns over the last SDR of every input.
    pub avg_active_columns: f64,
    /// Number of cycles observed so far.
    pub inputs_seen: u64,
}

pub type StabilityCallback = Box<dyn FnMut(&StabilityReport)>;

#[derive(Debug, Clone, Default)]
struct InputTrace {
    previous: Vec<usize>,
    stable_cycles: usize,
    last_similarity: f64,
}

pub struct HomeostaticPlasticityController {
    min_cycles: u64,
    required_similarity: f64,
    cycles_to_wait_on_change: usize,
    cycle: u64,
    state: StabilityState,
    traces: FxHashMap<u64, InputTrace>,
    on_change: StabilityCallback,
}

impl fmt::Debug for HomeostaticPlasticityController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HomeostaticPlasticityController")
            .field("min_cycles", &self.min_cycles)
            .field("required_similarity", &self.required_similarity)
            .field("cycles_to_wait_on_change", &self.cycles_to_wait_on_change)
            .field("cycle", &self.cycle)
            .field("state", &self.state)
            .field("num_patterns", &self.traces.len())
            .finish()
    }
}

impl HomeostaticPlasticityController {
    /// Creates a controller that keeps the pooler newborn for `min_cycles` learning cycles.
    pub fn new<F>(min_cycles: u64, on_change: F) -> Self
    where
        F: FnMut(&StabilityReport) + 'static,
    {
        Self {
            min_cycles,
            required_similarity: 0.97,
            cycles_to_wait_on_change: 50,
            cycle: 0,
            state: StabilityState::Newborn,
            traces: FxHashMap::default(),
            on_change: Box::new(on_change),
        }
    }

    /// Minimum similarity between two consecutive SDRs of an input to count as unchanged.
    pub fn with_required_similarity(mut self, similarity: f64) -> Self {
        self.required_similarity = similarity;
        self
    }

    /// Number of consecutive unchanged cycles an input needs before it counts as stable.
    pub fn with_cycles_to_wait_on_change(mut self, cycles: usize) -> Self {
        self.cycles_to_wait_on_change = cycles;
        self
    }

    #[inline]
    pub fn state(&self) -> StabilityState {
        self.state
    }

    /// Number of cycles observed so far.
    #[inline]
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Number of distinct inputs seen so far.
    #[inline]
    pub fn num_patterns(&self) -> usize {
        self.traces.len()
    }

    /// Observes one learning cycle. `input` is the dense input, `output` the dense active column
    /// array the pooler produced for it. Returns false while the pooler is newborn.
    ///
    /// When the newborn stage ends, boosting is switched off in `config`.
    pub fn compute(&mut self, input: &[i32], output: &[i32], config: &mut HtmConfig) -> bool {
        self.cycle += 1;

        let key = Self::input_key(input);
        let active = sdr::active_indices(output);
        let required = self.required_similarity;
        let wait = self.cycles_to_wait_on_change;
        // Outputs of the newborn stage are remembered but never count towards stability.
        let judged = self.cycle > self.min_cycles;

        let trace = self.traces.entry(key).or_default();
        let similarity = sdr::calc_array_similarity(&trace.previous, &active);
        if judged && similarity >= required {
            trace.stable_cycles = (trace.stable_cycles + 1).min(wait);
        } else {
            trace.stable_cycles = 0;
        }
        trace.last_similarity = similarity;
        trace.previous = active;

        debug!(
            "cycle {} input {:016x}: similarity {:.3}, stable cycles {}",
            self.cycle, key, similarity, trace.stable_cycles
        );

        if self.state == StabilityState::Newborn {
            if !judged {
                return false;
            }

            config.max_boost = 1.0;
            config.min_pct_overlap_duty_cycles = 0.0;
            info!(
                "newborn stage ended after {} cycles, boosting disabled",
                self.min_cycles
            );
            self.transition(StabilityState::Stabilizing);
        }

        let all_stable = self.traces.values().all(|trace| trace.stable_cycles >= wait);
        match (self.state, all_stable) {
            (StabilityState::Stabilizing, true) => {
                info!(
                    "stable after {} cycles with {} patterns",
                    self.cycle,
                    self.traces.len()
                );
                self.transition(StabilityState::Stable);
            }
            (StabilityState::Stable, false) => {
                warn!("left the stable state at cycle {}", self.cycle);
                self.transition(StabilityState::Stabilizing);
            }
            _ => {}
        }

        true
    }

    /// Similarity of the last two SDRs produced for `input`, if it was seen before.
    pub fn last_similarity(&self, input: &[i32]) -> Option<f64> {
        self.traces
            .get(&Self::input_key(input))
            .map(|trace| trace.last_similarity)
    }

    /// A one-line-per-input summary of the tracked inputs.
    pub fn trace_state(&self) -> String {
        let mut keys: Vec<&u64> = self.traces.keys().collect();
        keys.sort_unstable();

        let mut out = format!(
            "{} after {} cycles, {} patterns\n",
            self.state,
            self.cycle,
            self.traces.len()
        );
        for key in keys {
            let trace = &self.traces[key];
            let _ = writeln!(
                out,
                "{:016x}: {} active, similarity {:.3}, stable cycles {}/{}",
                key,
                trace.previous.len(),
                trace.last_similarity,
                trace.stable_cycles,
                self.cycles_to_wait_on_change
            );
        }
        debug!("{}", out);
        out
    }

    fn transition(&mut self, state: StabilityState) {
        self.state = state;
        let report = self.report();
        (self.on_change)(&report);
    }

    fn report(&self) -> StabilityReport {
        let num_patterns = self.traces.len();
        let total_active: usize = self.traces.values().map(|trace| trace.previous.len()).sum();
        StabilityReport {
            state: self.state,
            is_stable: self.state == StabilityState::Stable,
            num_patterns,
            avg_active_columns: if num_patterns == 0 {
                0.0
            } else {
                total_active as f64 / num_patterns as f64
            },
            inputs_seen: self.cycle,
        }
    }

    /// Stable 64-bit key of the on/off pattern of `input`.
    fn input_key(input: &[i32]) -> u64 {
        let mut hasher = FnvHasher::default();
        hasher.write_usize(input.len());
        for &bit in input {
            hasher.write_u8(u8::from(bit != 0));
        }
        hasher.finish()
    }
}
