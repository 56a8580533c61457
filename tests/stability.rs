use anyhow::Result;
use htm_sp::core::{
    config::HtmConfig,
    connections::Connections,
    homeostatic::{HomeostaticPlasticityController, StabilityReport, StabilityState},
    sdr,
    spatial_pooler::SpatialPooler,
};
use rand::{rngs::StdRng, SeedableRng};
use std::cell::RefCell;
use std::rc::Rc;

const INPUT_BITS: usize = 200;
const NUM_COLUMNS: usize = 2048;
const WIDTH: usize = 15;
const MAX_CYCLES: usize = 1000;

fn experiment_config() -> HtmConfig {
    let mut config = HtmConfig::new(vec![INPUT_BITS], vec![NUM_COLUMNS]);
    config.cells_per_column = 10;
    config.max_boost = 5.0;
    config.duty_cycle_period = 100;
    config.min_pct_overlap_duty_cycles = 1.0;
    config.stimulus_threshold = 5.0;
    config.global_inhibition = true;
    config.num_active_columns_per_inh_area = 0.02 * NUM_COLUMNS as f64;
    config.potential_radius = (0.15 * INPUT_BITS as f64) as i32;
    config.local_area_density = -1.0;
    config.distal.activation_threshold = 10;
    config.distal.max_synapses_per_segment = (0.01 * NUM_COLUMNS as f64) as usize;
    config.random_seed = 42;
    config
}

struct Outcome {
    mem: Connections,
    reports: Vec<StabilityReport>,
    sdrs: Vec<Vec<usize>>,
    similarities: Vec<f64>,
}

/// Trains a multithreaded pooler on `inputs` until the controller reports a stable state or
/// `MAX_CYCLES` passes over the inputs are done.
fn train_until_stable(inputs: &[Vec<i32>]) -> Result<Outcome> {
    let reports: Rc<RefCell<Vec<StabilityReport>>> = Rc::default();
    let sink = Rc::clone(&reports);
    let controller = HomeostaticPlasticityController::new(inputs.len() as u64 * 40, move |report| {
        sink.borrow_mut().push(report.clone())
    })
    .with_required_similarity(0.975);

    let mut mem = Connections::new(experiment_config());
    let mut sp = SpatialPooler::multithreaded().with_homeostatic_controller(controller);
    sp.init(&mut mem)?;

    let mut sdrs: Vec<Vec<usize>> = vec![Vec::new(); inputs.len()];
    let mut similarities = vec![0.0; inputs.len()];

    'learning: for _cycle in 0..MAX_CYCLES {
        for (i, input) in inputs.iter().enumerate() {
            let active = sp.compute_active_columns(&mut mem, input, true)?;
            similarities[i] = sdr::calc_array_similarity(&active, &sdrs[i]);
            sdrs[i] = active;

            if reports.borrow().last().is_some_and(|report| report.is_stable) {
                break 'learning;
            }
        }
    }

    let reports = reports.borrow().clone();
    Ok(Outcome {
        mem,
        reports,
        sdrs,
        similarities,
    })
}

fn assert_stable(outcome: &Outcome, num_inputs: usize) {
    let last = outcome.reports.last().map(|report| report.state);
    assert_eq!(last, Some(StabilityState::Stable), "not stable after {MAX_CYCLES} cycles");
    assert_eq!(outcome.mem.config.max_boost, 1.0);
    assert_eq!(outcome.reports[0].state, StabilityState::Stabilizing);
    assert_eq!(outcome.reports.last().map(|report| report.num_patterns), Some(num_inputs));

    // Stability is only declared after every input produced similar SDRs for many cycles in a
    // row, so the last two SDRs of every input must be similar and of the expected width.
    for (i, active) in outcome.sdrs.iter().enumerate() {
        let similarity = outcome.similarities[i];
        assert!(similarity >= 0.975, "input {i} similarity {similarity}");
        assert!(!active.is_empty() && active.len() <= 40);
    }
}

#[test]
fn spatial_pooler_becomes_stable_on_similar_inputs() -> Result<()> {
    let inputs: Vec<Vec<i32>> = (0..10).map(|i| sdr::create_vector(INPUT_BITS, i, i + WIDTH)).collect();
    let outcome = train_until_stable(&inputs)?;
    assert_stable(&outcome, inputs.len());

    // The controller only starts counting once boosting is off, 40 cycles over 10 inputs, and
    // then waits 50 more cycles.
    let stable_at = outcome.reports.last().map_or(0, |report| report.inputs_seen);
    assert!(stable_at >= (40 + 50) * inputs.len() as u64);
    Ok(())
}

#[test]
fn spatial_pooler_becomes_stable_on_random_sparse_inputs() -> Result<()> {
    let mut rng = StdRng::seed_from_u64(7);
    let inputs: Vec<Vec<i32>> = (0..10)
        .map(|_| sdr::random_vector(INPUT_BITS, WIDTH, &mut rng))
        .collect();
    let outcome = train_until_stable(&inputs)?;
    assert_stable(&outcome, inputs.len());
    Ok(())
}
