//! End-to-end runs of the simulation driver.

use shoal_core::Trigger;
use shoal_diagnostics::{Diagnostic, DiagnosticError, NaNChecker, Timeseries};
use shoal_engine::{Simulation, SimulationConfig, StepError};
use shoal_field::{FieldAccess, StateView};
use shoal_model::{Model, StepMode};
use shoal_output::{compare_states, Checkpointer, OutputReader, SegmentedWriter};
use shoal_test_utils::fixtures::{grid, model_config, spun_up_model};

const DT: f64 = 0.02;

fn simulation(model: Model, stop: u64) -> Simulation {
    Simulation::new(model, SimulationConfig::iterations(DT, stop)).unwrap()
}

#[test]
fn initial_state_is_written_before_first_step() {
    let dir = tempfile::tempdir().unwrap();
    let model = spun_up_model(0, DT);
    let initial_u = model.field("u").unwrap().clone();
    let writer = SegmentedWriter::builder(dir.path(), "fields")
        .output("u")
        .schedule(Trigger::iterations(2).unwrap())
        .build(&model)
        .unwrap();

    let mut sim = simulation(model, 4);
    sim.outputs_mut().push(writer.into());
    sim.diagnostics_mut()
        .push(Timeseries::new(|s| s.clock().time, Trigger::iterations(1).unwrap()));
    sim.run().unwrap();

    let reader = OutputReader::open(dir.path(), "fields", "shoal").unwrap();
    assert_eq!(reader.iterations("u"), [0, 2, 4]);
    assert_eq!(reader.read("u", 0).unwrap().data, initial_u.data());

    let Some(Diagnostic::Timeseries(series)) = sim.diagnostics().get(0) else {
        panic!("expected a timeseries");
    };
    assert_eq!(series.iterations(), [0, 1, 2, 3, 4]);
}

#[test]
fn fatal_diagnostic_stops_the_run() {
    let mut config = model_config();
    config.grid = grid([4, 4, 4], [1.0, 1.0, 1.0]);
    config.closure.diffusivity = 1.0;
    let mut model = Model::new(config).unwrap();
    model.randomize("T", 1.0, 7).unwrap();

    let mut sim = Simulation::new(model, SimulationConfig::iterations(10.0, 1_000)).unwrap();
    sim.diagnostics_mut()
        .push(NaNChecker::new(["T"], Trigger::iterations(1).unwrap()));
    match sim.run() {
        Err(StepError::Fatal(DiagnosticError::NonFiniteValue {
            field, iteration, ..
        })) => {
            assert_eq!(field, "T");
            assert_eq!(iteration, sim.clock().iteration);
            assert!(iteration < 1_000);
        }
        other => panic!("expected a fatal non-finite error, got {other:?}"),
    }
}

#[test]
fn pickup_reproduces_continuous_run() {
    let dir = tempfile::tempdir().unwrap();

    let mut continuous = simulation(spun_up_model(0, DT), 6);
    continuous.outputs_mut().push(
        Checkpointer::builder(dir.path())
            .every(4)
            .build()
            .unwrap()
            .into(),
    );
    continuous.run().unwrap();
    assert!(dir.path().join("checkpoint4.shoal").exists());

    let mut resumed = simulation(spun_up_model(0, DT), 6);
    assert_eq!(resumed.pickup(dir.path(), "checkpoint").unwrap(), Some(4));
    assert_eq!(resumed.clock().iteration, 4);
    assert_eq!(resumed.run().unwrap(), 2);

    assert!(compare_states(continuous.model(), resumed.model(), 0.0).is_none());
}

#[test]
fn pickup_reanchors_time_triggers() {
    let dir = tempfile::tempdir().unwrap();
    let mut first = simulation(spun_up_model(0, DT), 5);
    first.outputs_mut().push(
        Checkpointer::builder(dir.path())
            .every(5)
            .build()
            .unwrap()
            .into(),
    );
    first.run().unwrap();

    let mut resumed = simulation(spun_up_model(0, DT), 8);
    resumed.diagnostics_mut().push(Timeseries::new(
        |s| s.clock().time,
        Trigger::time_interval(2.0 * DT).unwrap(),
    ));
    resumed.pickup(dir.path(), "checkpoint").unwrap();
    resumed.run().unwrap();

    // Anchored at t = 5 dt, so the first firing is 7 dt rather than 6 dt.
    let Some(Diagnostic::Timeseries(series)) = resumed.diagnostics().get(0) else {
        panic!("expected a timeseries");
    };
    assert_eq!(series.iterations(), [7]);
}

#[test]
fn restored_step_matches_explicit_multistep() {
    let dir = tempfile::tempdir().unwrap();
    let model = spun_up_model(3, DT);
    let checkpointer = Checkpointer::builder(dir.path()).every(3).build().unwrap();
    checkpointer.write(&model).unwrap();

    let mut by_hand = Checkpointer::restore(checkpointer.path_for(3)).unwrap();
    by_hand.step(DT, StepMode::Multistep).unwrap();

    let mut sim = simulation(spun_up_model(0, DT), 4);
    sim.pickup(dir.path(), "checkpoint").unwrap();
    sim.run().unwrap();
    assert!(compare_states(&by_hand, sim.model(), 0.0).is_none());
}

#[test]
fn pickup_from_initial_checkpoint_takes_an_euler_step() {
    let dir = tempfile::tempdir().unwrap();

    let mut continuous = simulation(spun_up_model(0, DT), 3);
    continuous.outputs_mut().push(
        Checkpointer::builder(dir.path())
            .every(5)
            .build()
            .unwrap()
            .into(),
    );
    continuous.run().unwrap();
    assert!(dir.path().join("checkpoint0.shoal").exists());
    assert!(!dir.path().join("checkpoint5.shoal").exists());

    let mut resumed = simulation(spun_up_model(0, DT), 3);
    assert_eq!(resumed.pickup(dir.path(), "checkpoint").unwrap(), Some(0));
    assert_eq!(resumed.run().unwrap(), 3);

    assert!(compare_states(continuous.model(), resumed.model(), 0.0).is_none());
}
