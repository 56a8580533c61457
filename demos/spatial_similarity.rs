//! This example trains the Spatial Pooler on ten overlapping input vectors until the homeostatic
//! plasticity controller reports a stable state, then prints how similar the inputs are to each
//! other next to how similar their SDRs are.
//!
//! Every input is a block of 15 active bits out of 200, shifted by one bit from the previous one.
//! Run with `RUST_LOG=info` (or `debug`) to follow the controller.

use anyhow::{bail, Result};
use htm_sp::core::{
    config::HtmConfig, connections::Connections, homeostatic::HomeostaticPlasticityController, sdr,
    spatial_pooler::SpatialPooler,
};
use log::{info, warn};
use std::cell::Cell;
use std::rc::Rc;

fn main() -> Result<()> {
    env_logger::init();

    let input_bits = 200;
    let num_columns = 2048;
    let width = 15;

    let mut config = HtmConfig::new(vec![input_bits], vec![num_columns]);
    config.cells_per_column = 10;
    config.max_boost = 5.0;
    config.duty_cycle_period = 100;
    config.min_pct_overlap_duty_cycles = 1.0;
    config.stimulus_threshold = 5.0;
    config.global_inhibition = true;
    config.num_active_columns_per_inh_area = 0.02 * num_columns as f64;
    config.potential_radius = (0.15 * input_bits as f64) as i32;
    config.local_area_density = -1.0;

    let inputs: Vec<Vec<i32>> = (0..10).map(|i| sdr::create_vector(input_bits, i, i + width)).collect();

    let is_stable = Rc::new(Cell::new(false));
    let flag = Rc::clone(&is_stable);
    let controller = HomeostaticPlasticityController::new(inputs.len() as u64 * 40, move |report| {
        if report.is_stable {
            info!(
                "STABLE: {} patterns, {:.1} active columns on average, {} inputs seen",
                report.num_patterns, report.avg_active_columns, report.inputs_seen
            );
        } else {
            warn!("{}: not stable, {} inputs seen", report.state, report.inputs_seen);
        }
        flag.set(report.is_stable);
    })
    .with_required_similarity(0.975);

    let mut mem = Connections::new(config);
    let mut sp = SpatialPooler::multithreaded().with_homeostatic_controller(controller);
    sp.init(&mut mem)?;

    let mut sdrs: Vec<Vec<usize>> = vec![Vec::new(); inputs.len()];
    let max_cycles = 1000;

    'learning: for cycle in 0..max_cycles {
        for (i, input) in inputs.iter().enumerate() {
            let active = sp.compute_active_columns(&mut mem, input, true)?;
            let similarity = sdr::calc_array_similarity(&active, &sdrs[i]);
            log::debug!(
                "cycle {cycle} input I-{i:02}: {} columns, similarity {similarity:.3}, SDR {}",
                active.len(),
                sdr::stringify(&active)
            );
            sdrs[i] = active;

            if is_stable.get() {
                info!("stable after {} cycles", cycle + 1);
                break 'learning;
            }
        }
    }

    if !is_stable.get() {
        bail!("after {max_cycles} cycles the spatial pooler is still not stable");
    }

    if let Some(controller) = sp.homeostatic_controller() {
        print!("{}", controller.trace_state());
    }

    let input_indices: Vec<Vec<usize>> = inputs.iter().map(|input| sdr::active_indices(input)).collect();
    let input_matrix = sdr::similarity_matrix(&input_indices);
    let output_matrix = sdr::similarity_matrix(&sdrs);

    print!("{:>8} |", "");
    for i in 0..inputs.len() {
        print!(" {:>9} |", format!("I-{i:02}"));
    }
    println!();
    for (i, (inputs_row, outputs_row)) in input_matrix.iter().zip(&output_matrix).enumerate() {
        print!("{:>8} |", format!("I-{i:02}"));
        for (input_similarity, output_similarity) in inputs_row.iter().zip(outputs_row) {
            print!(" {:>9} |", format!("{input_similarity:.2}/{output_similarity:.2}"));
        }
        println!();
    }

    Ok(())
}
