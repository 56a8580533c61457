//! A `Synapse` models a single potential connection between a `Column` and an input bit.
//!
//! If the permanence is at or above the connected threshold, the synapse is considered "connected".
//! During learning, permanence increases or decreases depending on whether the corresponding
//! input bit was active. A connected synapse counts toward the column's overlap score.
//!
//! A `Pool` holds the potential synapses of one column's proximal dendrite. It is created once from
//! the column's potential input indices and afterwards only mutated. The pool keeps its synapses
//! pivoted so the connected ones come first; that view is refreshed by `Pool::update`, the single
//! entry point for every permanence mutation, so the connected view never goes stale.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// A synapse connecting an input index with an associated permanence value.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Synapse {
    /// Points to which input bit this synapse connects to.
    pub input: usize,

    /// Represents the strength of the connection between the synapse and the input bit.
    pub permanence: f64,
}

/// Options governing how synapse permanence is adjusted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PermanenceOptions {
    pub inactive_decrement: f64,
    pub active_increment: f64,
    pub connected: f64,
    pub below_stimulus_increment: f64,
    pub min: f64,
    pub max: f64,
    pub trim_threshold: f64,
}

impl PermanenceOptions {
    /// Truncates a freshly drawn permanence to 5 decimal digits so that runs are reproducible
    /// regardless of floating point width differences across platforms.
    #[inline]
    pub fn truncate(permanence: f64) -> f64 {
        (permanence * 100_000.0).trunc() / 100_000.0
    }

    /// A random permanence for a synapse that starts out connected, close above the threshold.
    pub fn init_connected<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        Self::truncate(self.connected + (self.max - self.connected) * rng.random::<f64>())
    }

    /// A random permanence for a synapse that starts out disconnected.
    pub fn init_not_connected<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        Self::truncate(self.connected * rng.random::<f64>())
    }
}

/// The potential synapses of one column.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pool {
    /// All potential synapses, connected ones first.
    synapses: Vec<Synapse>,

    /// Number of leading synapses in `synapses` that are connected.
    num_connected: usize,
}

impl Pool {
    /// Creates a pool over the given input indices with all permanences at zero.
    pub fn new(potential: &[usize]) -> Self {
        Self {
            synapses: potential
                .iter()
                .map(|&input| Synapse {
                    input,
                    permanence: 0.0,
                })
                .collect(),
            num_connected: 0,
        }
    }

    /// Number of potential synapses.
    #[inline]
    pub fn len(&self) -> usize {
        self.synapses.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.synapses.is_empty()
    }

    /// All potential synapses, in no particular order.
    #[inline]
    pub fn synapses(&self) -> &[Synapse] {
        &self.synapses
    }

    /// The connected synapses.
    #[inline]
    pub fn connected(&self) -> &[Synapse] {
        &self.synapses[..self.num_connected]
    }

    #[inline]
    pub fn num_connected(&self) -> usize {
        self.num_connected
    }

    /// Input indices of the potential pool in ascending order.
    pub fn potential_indices(&self) -> Vec<usize> {
        let mut indices: Vec<usize> = self.synapses.iter().map(|syn| syn.input).collect();
        indices.sort_unstable();
        indices
    }

    /// Input indices of the connected synapses in ascending order.
    pub fn connected_indices(&self) -> Vec<usize> {
        let mut indices: Vec<usize> = self.connected().iter().map(|syn| syn.input).collect();
        indices.sort_unstable();
        indices
    }

    /// Permanence of the synapse onto `input`, zero if `input` is not part of the pool.
    pub fn permanence(&self, input: usize) -> f64 {
        self.synapses
            .iter()
            .find(|syn| syn.input == input)
            .map_or(0.0, |syn| syn.permanence)
    }

    /// Permanences for every input bit, zero outside of the pool.
    pub fn dense_permanences(&self, num_inputs: usize) -> Vec<f64> {
        let mut dense = vec![0.0; num_inputs];
        for syn in &self.synapses {
            dense[syn.input] = syn.permanence;
        }
        dense
    }

    /// Draws initial permanences for every potential synapse. With probability
    /// `init_connected_percentage` a synapse starts connected, otherwise it starts below the
    /// connected threshold. Values under the trim threshold are zeroed. The connected view is
    /// refreshed, but no raising to the stimulus threshold happens here.
    pub fn init_permanences<R: Rng + ?Sized>(
        &mut self,
        init_connected_percentage: f64,
        options: &PermanenceOptions,
        rng: &mut R,
    ) {
        for syn in &mut self.synapses {
            let permanence = if rng.random::<f64>() <= init_connected_percentage {
                options.init_connected(rng)
            } else {
                options.init_not_connected(rng)
            };

            syn.permanence = if permanence < options.trim_threshold {
                0.0
            } else {
                permanence
            };
        }

        self.sort(options.connected);
    }

    /// Applies `delta` to every potential synapse and then:
    /// - if `raise_permanences` is true, raises all values until `stimulus_threshold` synapses are connected,
    /// - zeroes values at or below the trim threshold and clamps the rest to [opts.min, opts.max],
    /// - re-pivots the synapses so that connected ones come first.
    ///
    /// The caller must have checked that the pool can reach `stimulus_threshold` at all.
    pub fn update<F>(
        &mut self,
        mut delta: F,
        raise_permanences: bool,
        stimulus_threshold: f64,
        options: &PermanenceOptions,
    ) where
        F: FnMut(&Synapse) -> f64,
    {
        for syn in &mut self.synapses {
            syn.permanence += delta(syn);
        }

        if raise_permanences {
            self.raise_to_threshold(stimulus_threshold, options);
        }

        for syn in &mut self.synapses {
            if syn.permanence <= options.trim_threshold {
                syn.permanence = 0.0;
            }
            syn.permanence = syn.permanence.clamp(options.min, options.max);
        }

        self.sort(options.connected);
    }

    /// Clamps the pool and raises every permanence by `below_stimulus_increment` until at least
    /// `stimulus_threshold` synapses are connected.
    fn raise_to_threshold(&mut self, stimulus_threshold: f64, options: &PermanenceOptions) {
        if (self.synapses.len() as f64) < stimulus_threshold || options.below_stimulus_increment <= 0.0 {
            return;
        }

        for syn in &mut self.synapses {
            syn.permanence = syn.permanence.clamp(options.min, options.max);
        }

        while (self
            .synapses
            .iter()
            .filter(|syn| syn.permanence >= options.connected)
            .count() as f64)
            < stimulus_threshold
        {
            for syn in &mut self.synapses {
                syn.permanence += options.below_stimulus_increment;
            }
        }
    }

    /// Reorders the synapses so that those with permanence ≥ `connected_threshold` come first.
    fn sort(&mut self, connected_threshold: f64) {
        let mut pivot = 0;

        for i in 0..self.synapses.len() {
            if self.synapses[i].permanence >= connected_threshold {
                self.synapses.swap(i, pivot);
                pivot += 1;
            }
        }

        self.num_connected = pivot;
    }
}
