pub mod column;
pub mod compute_cycle;
pub mod config;
pub mod connections;
pub mod dendrite;
pub mod homeostatic;
pub mod persistence;
pub mod sdr;
pub mod sparse_matrix;
pub mod spatial_pooler;
pub mod synapses;
pub mod topology;
