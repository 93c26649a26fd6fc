//! Shoal Quickstart: a stratified, rotating box with diagnostics,
//! segmented output, checkpoints and a restart.
//!
//! Demonstrates:
//!   1. Building a grid and a model configuration
//!   2. Setting initial conditions
//!   3. Registering diagnostics and output writers
//!   4. Running to a stop iteration
//!   5. Picking up from the latest checkpoint and continuing
//!
//! Run with:
//!   cargo run --example quickstart

use shoal_core::Trigger;
use shoal_diagnostics::{
    AdvectiveCfl, Diagnostic, DiagnosticOutput, HorizontalAverage, NaNChecker, Timeseries,
};
use shoal_engine::{Simulation, SimulationConfig};
use shoal_field::{Closure, RegularGrid};
use shoal_model::{Model, ModelConfig};
use shoal_output::{Checkpointer, OutputReader, Section, SegmentedWriter};

// ─── Grid and physics ───────────────────────────────────────────

const SIZE: [usize; 3] = [16, 16, 8];
const EXTENT: [f64; 3] = [1_000.0, 1_000.0, 100.0];
const DT: f64 = 60.0;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let out = std::env::temp_dir().join("shoal-quickstart");
    let grid = RegularGrid::new(SIZE, EXTENT, [1, 1, 1])?;

    let mut config = ModelConfig::new(grid);
    config.closure = Closure {
        viscosity: 1e-2,
        diffusivity: 1e-3,
    };
    config.coriolis = 1e-4;

    // ─── Initial conditions ─────────────────────────────────────
    let mut model = Model::new(config)?;
    model.set("T", |_, _, z| 20.0 + 0.01 * z)?;
    model.set_uniform("S", 35.0)?;
    model.randomize("u", 1e-2, 1)?;
    model.randomize("v", 1e-2, 2)?;

    let fields = SegmentedWriter::builder(&out, "fields")
        .output("u")
        .output("T")
        .schedule(Trigger::iterations(10)?)
        .max_filesize(256 << 10)
        .init(|root, _| root.insert("run/name", "quickstart"))
        .including(Section::ALL)
        .force(true)
        .build(&model)?;
    let checkpoints = Checkpointer::builder(&out)
        .every(25)
        .force(true)
        .build()?;

    // ─── First run ──────────────────────────────────────────────
    let mut sim = Simulation::new(model, SimulationConfig::iterations(DT, 50))?;
    let diagnostics = sim.diagnostics_mut();
    diagnostics.push(NaNChecker::new(["u", "v", "w", "T"], Trigger::iterations(5)?));
    diagnostics.push_keyed("cfl", AdvectiveCfl::new(DT, Trigger::iterations(1)?)?)?;
    diagnostics.push_keyed(
        "T_profile",
        HorizontalAverage::new(["T"], Trigger::time_interval(600.0)?)?,
    )?;
    diagnostics.push_keyed(
        "energy",
        Timeseries::empty(Trigger::iterations(10)?)
            .with_advective_cfl("cfl", DT)
            .with_field_maximum("max_u", "u", f64::abs),
    )?;
    sim.outputs_mut().push_keyed("fields", fields.into())?;
    sim.outputs_mut().push_keyed("checkpoints", checkpoints.into())?;

    let steps = sim.run()?;
    println!("ran {steps} steps to {}", sim.clock());
    println!("last step metrics: {:?}", sim.last_metrics());

    if let Some(DiagnosticOutput::Scalar(cfl)) = sim.diagnostics().get_by_key("cfl").map(Diagnostic::output) {
        println!("advective CFL: {cfl:.4}");
    }
    if let Some(DiagnosticOutput::Profile(profile)) =
        sim.diagnostics().get_by_key("T_profile").map(Diagnostic::output)
    {
        println!("horizontally averaged T (bottom halo to top halo): {profile:.3?}");
    }

    // ─── Restart ────────────────────────────────────────────────
    let fresh = Model::new(sim.model().config().clone())?;
    let mut resumed = Simulation::new(fresh, SimulationConfig::iterations(DT, 75))?;
    if let Some(iteration) = resumed.pickup(&out, "checkpoint")? {
        println!("picked up at iteration {iteration}");
    }
    resumed.run()?;
    println!("resumed run stopped at {}", resumed.clock());

    let reader = OutputReader::open(&out, "fields", "shoal")?;
    println!(
        "{} part(s), T written at iterations {:?}",
        reader.part_count(),
        reader.iterations("T")
    );
    Ok(())
}
