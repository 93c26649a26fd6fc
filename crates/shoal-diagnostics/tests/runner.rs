//! Diagnostics runner behaviour against mock state and the reference model.

use shoal_core::Trigger;
use shoal_diagnostics::{
    AdvectiveCfl, Diagnostic, DiagnosticError, DiagnosticOutput, Diagnostics, DiffusiveCfl,
    FieldMaximum, HorizontalAverage, NaNChecker, Timeseries,
};
use shoal_field::{FieldAccess, StateView};
use shoal_model::{Model, ModelConfig, StepMode};
use shoal_test_utils::fixtures::{grid, linear_tracer_state, small_grid, velocity_state};
use shoal_test_utils::MockState;

fn every(n: u64) -> Trigger {
    Trigger::iterations(n).unwrap()
}

#[test]
fn linear_tracer_profile_is_linear() {
    let (a, b) = (12.0, 0.75);
    let state = linear_tracer_state(a, b);
    let grid = state.grid().clone();
    let mut diagnostics = Diagnostics::new();
    diagnostics
        .push_keyed("T_avg", HorizontalAverage::new(["T"], every(1)).unwrap())
        .unwrap();

    // Scheduled path.
    assert_eq!(diagnostics.run_scheduled(&state).unwrap(), 1);
    let DiagnosticOutput::Profile(profile) = diagnostics.get_by_key("T_avg").unwrap().output()
    else {
        panic!("expected a profile");
    };
    for k in 0..grid.nz() {
        let expected = a + b * grid.znode(k as isize);
        assert!((profile[k + 1] - expected).abs() < 1e-12, "level {k}");
    }

    // Manual path gives the same answer.
    let manual = HorizontalAverage::new(["T"], every(1000)).unwrap();
    assert_eq!(manual.compute(&state).unwrap(), profile);
}

#[test]
fn cfl_numbers_match_closed_form() {
    let (u0, nu, dt) = (0.4, 2e-3, 0.05);
    let state = {
        let mut s = MockState::new(small_grid())
            .with_closure(nu, 0.0)
            .with_field("u")
            .with_field("v")
            .with_field("w");
        s.set_with("u", |_, _, _| u0);
        s
    };
    let dx = state.grid().dx();

    let advective = AdvectiveCfl::new(dt, every(1)).unwrap();
    let diffusive = DiffusiveCfl::new(dt, every(1)).unwrap();
    assert!((advective.compute(&state).unwrap() - dt * u0 / dx).abs() < 1e-14);
    assert!((diffusive.compute(&state) - dt * nu / (dx * dx)).abs() < 1e-14);
}

#[test]
fn nan_checker_fires_on_first_bad_iteration() {
    // Unstable explicit diffusion: diffusive CFL far above 1/6 blows up.
    let mut config = ModelConfig::new(grid([4, 4, 4], [1.0, 1.0, 1.0]));
    config.closure.diffusivity = 1.0;
    let mut model = Model::new(config).unwrap();
    model.randomize("T", 1.0, 7).unwrap();

    let mut diagnostics = Diagnostics::new();
    diagnostics.push(NaNChecker::new(["u", "v", "w", "T", "S"], every(1)));

    let mut first_bad = None;
    for _ in 0..2000 {
        model.step(10.0, StepMode::Auto).unwrap();
        let finite = model
            .field_names()
            .iter()
            .filter(|n| ["u", "v", "w", "T", "S"].contains(n))
            .all(|n| {
                model
                    .field(n)
                    .unwrap()
                    .data()
                    .iter()
                    .all(|x| x.is_finite())
            });
        match diagnostics.run_scheduled(&model) {
            Ok(_) => assert!(finite),
            Err(e) => {
                assert!(!finite);
                first_bad = Some(e);
                break;
            }
        }
    }
    match first_bad {
        Some(DiagnosticError::NonFiniteValue {
            field, iteration, ..
        }) => {
            assert_eq!(field, "T");
            assert_eq!(iteration, model.clock().iteration);
        }
        other => panic!("expected NonFiniteValue, got {other:?}"),
    }
}

#[test]
fn recoverable_errors_do_not_stop_the_loop() {
    let state = velocity_state(1.0);
    let mut diagnostics = Diagnostics::new();
    diagnostics.push(FieldMaximum::new("missing", |x| x, every(1)));
    diagnostics.push_keyed("umax", FieldMaximum::new("u", f64::abs, every(1))).unwrap();
    assert_eq!(diagnostics.run_scheduled(&state).unwrap(), 1);
    assert_eq!(
        diagnostics.get_by_key("umax").unwrap().output(),
        DiagnosticOutput::Scalar(1.0)
    );
}

#[test]
fn misspelled_nan_checker_field_stops_the_loop() {
    let mut state = velocity_state(1.0);
    state.field_mut("u").unwrap().set(1, 1, 1, f64::NAN);
    let mut diagnostics = Diagnostics::new();
    diagnostics.push(NaNChecker::new(["temperature", "u"], every(1)));
    let err = diagnostics.run_scheduled(&state).unwrap_err();
    assert!(err.is_fatal());
    assert!(matches!(err, DiagnosticError::UncheckableField { .. }));
}

#[test]
fn fatal_error_stops_later_diagnostics() {
    let mut state = velocity_state(1.0);
    state.field_mut("u").unwrap().set(0, 0, 0, f64::NAN);
    let mut diagnostics = Diagnostics::new();
    diagnostics.push(NaNChecker::new(["u"], every(1)));
    diagnostics
        .push_keyed("series", Timeseries::new(|_| 1.0, every(1)))
        .unwrap();
    assert!(diagnostics.run_scheduled(&state).unwrap_err().is_fatal());
    let series = diagnostics.get_by_key("series").unwrap().as_timeseries().unwrap();
    assert!(series.is_empty());
}

#[test]
fn schedules_are_respected() {
    let mut state = velocity_state(1.0);
    let mut diagnostics = Diagnostics::new();
    diagnostics
        .push_keyed("every3", Timeseries::new(|_| 0.0, every(3)))
        .unwrap();
    diagnostics
        .push_keyed(
            "half_second",
            Timeseries::new(|_| 0.0, Trigger::time_interval(0.5).unwrap()),
        )
        .unwrap();
    for _ in 0..=9 {
        diagnostics.run_scheduled(&state).unwrap();
        state.tick(0.2);
    }
    let every3 = diagnostics.get_by_key("every3").unwrap().as_timeseries().unwrap();
    assert_eq!(every3.iterations(), [0, 3, 6, 9]);
    let timed = diagnostics
        .get_by_key("half_second")
        .unwrap()
        .as_timeseries()
        .unwrap();
    assert_eq!(timed.iterations(), [3, 6, 9]);
}

#[test]
fn replacing_by_key_keeps_position() {
    let mut diagnostics = Diagnostics::new();
    diagnostics.push(NaNChecker::new(["u"], every(1)));
    diagnostics
        .push_keyed("cfl", AdvectiveCfl::new(0.1, every(1)).unwrap())
        .unwrap();
    diagnostics.push(NaNChecker::new(["v"], every(1)));

    let old = diagnostics.insert("cfl", DiffusiveCfl::new(0.1, every(1)).unwrap());
    assert!(matches!(old, Some(Diagnostic::AdvectiveCfl(_))));
    assert_eq!(diagnostics.len(), 3);
    assert!(matches!(diagnostics.get(1), Some(Diagnostic::DiffusiveCfl(_))));
    assert!(matches!(
        diagnostics.get_by_key("cfl"),
        Some(Diagnostic::DiffusiveCfl(_))
    ));
}
