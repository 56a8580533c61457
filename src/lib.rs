//! Hierarchical Temporal Memory (HTM) Spatial Pooler.
//!
//! The Spatial Pooler turns a binary input vector into a Sparse Distributed Representation (SDR),
//! a small set of active columns, while it keeps adapting its proximal synapses and boosting
//! under-used columns. The [`core::homeostatic::HomeostaticPlasticityController`] observes the
//! produced SDRs and reports once the pooler answers every known input with a stable SDR.
//!
//! ```no_run
//! use htm_sp::core::{config::HtmConfig, connections::Connections, spatial_pooler::SpatialPooler};
//!
//! let mut config = HtmConfig::new(vec![200], vec![2048]);
//! config.global_inhibition = true;
//! config.num_active_columns_per_inh_area = 40.0;
//!
//! let mut mem = Connections::new(config);
//! let mut sp = SpatialPooler::new();
//! sp.init(&mut mem).unwrap();
//!
//! let input = htm_sp::core::sdr::create_vector(200, 10, 25);
//! let mut active = vec![0; mem.num_columns];
//! sp.compute(&mut mem, &input, &mut active, true).unwrap();
//! ```

pub mod core;
pub mod error;

pub use error::{HtmError, Result};
