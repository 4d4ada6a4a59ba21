use anyhow::Result;
use clap::Parser;
use log::{info, warn};

use matatu_sim::{
    config::SimulationConfig,
    engine::{PerformanceTracker, Simulation},
    simulation::{PoliceDecision, Role, SimEvent, StopAction, StopKind},
};

// Simulated seconds per leg of the scripted session
const DRIVER_LEG: f64 = 40.0;
const CONDUCTOR_LEG: f64 = 160.0;
const STATUS_INTERVAL: f64 = 5.0;
const LOW_FUEL: f64 = 10.0;

#[derive(Parser)]
#[command(name = "matatu-sim")]
#[command(
    about = "Route-following matatu simulation with autopilot, traffic enforcement and fare economy"
)]
struct Args {
    /// Route configuration file
    #[arg(short, long, default_value = "route.toml")]
    route: String,

    /// Vehicle and gameplay configuration file
    #[arg(short = 'm', long, default_value = "matatu.toml")]
    vehicle: String,

    /// Random seed for reproducible sessions
    #[arg(short, long)]
    seed: Option<u64>,

    /// Enable verbose logging for detailed simulation progress
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::from_default_env()
        .filter_level(if args.verbose { log::LevelFilter::Debug } else { log::LevelFilter::Info })
        .init();
    info!("Starting Matatu Simulator (Console Mode)");

    let config = SimulationConfig::load_from_files(&args.route, &args.vehicle)?;
    info!(
        "Loaded configuration: route '{}' with {} stages, starting cash KSh {:.0}",
        config.route.route.name,
        config.route.route.stages.len(),
        config.vehicle.economy.starting_cash
    );

    let timing_samples = config.vehicle.performance.timing_samples as usize;
    let refuel_cost = config.vehicle.economy.refuel_cost;
    if let Some(seed) = args.seed.or(config.vehicle.random.seed) {
        info!("Random Seed: {}", seed);
    }
    let mut sim = Simulation::new(config, args.seed)?;
    let mut performance_tracker = PerformanceTracker::new(timing_samples);

    sim.subscribe(|event| match event {
        SimEvent::Message(text) => info!("> {}", text),
        SimEvent::StageReached(stage) => info!("Stage {}: {}", stage.id, stage.name),
        SimEvent::LapCompleted => info!("Lap completed"),
        _ => {}
    });

    // Driver leg: the player drives with the route assist engaged, so lights
    // and police still apply.
    sim.start_route();
    sim.set_autopilot_engaged(true);

    let dt = sim.clock().fixed_dt();
    let total = DRIVER_LEG + CONDUCTOR_LEG;
    let mut next_status = STATUS_INTERVAL;

    info!("Running scripted session for {:.0} simulated seconds...", total);

    while sim.clock().elapsed() < total {
        performance_tracker.start_frame();
        performance_tracker.start_simulation();

        let steps_before = sim.clock().steps();
        let events = sim.advance(dt);

        performance_tracker.end_simulation((sim.clock().steps() - steps_before) as u32);

        for event in &events {
            respond(&mut sim, event);
        }

        if sim.gameplay().role() == Role::Driver && sim.clock().elapsed() >= DRIVER_LEG {
            sim.switch_role(Role::Conductor);
        }

        let economy = sim.gameplay().economy();
        let can_refuel = economy.cash() >= refuel_cost && !sim.gameplay().is_modal_open();
        if economy.fuel() < LOW_FUEL && can_refuel {
            warn!("Fuel low ({:.1}%), refueling", economy.fuel());
            sim.refuel();
            sim.start_route();
        }

        sim.drain_events();
        performance_tracker.end_frame();

        if sim.clock().elapsed() >= next_status {
            print_status(&sim, &performance_tracker);
            next_status += STATUS_INTERVAL;
        }
    }

    // Final statistics
    let economy = sim.gameplay().economy();
    info!("Session completed!");
    info!("Simulated time: {:.1}s over {} steps", sim.clock().elapsed(), sim.clock().steps());
    info!(
        "Final cash: KSh {:.0}, fuel {:.1}%, {} passengers on board",
        economy.cash(),
        economy.fuel(),
        economy.passengers()
    );

    Ok(())
}

fn respond(sim: &mut Simulation, event: &SimEvent) {
    match event {
        SimEvent::StopReached { kind, .. } => {
            let action = match kind {
                StopKind::PickUp => StopAction::PickUp,
                StopKind::DropOff => StopAction::DropOff,
                StopKind::None => return,
            };
            let outcome = sim.handle_stop_action(action);
            info!("Stop action {:?}: {:?}", action, outcome);
        }
        SimEvent::PoliceEncounter { fine, .. } => {
            let decision = if sim.gameplay().economy().cash() >= *fine as f64 * 3.0 {
                PoliceDecision::Pay
            } else {
                PoliceDecision::Deny
            };
            sim.resolve_encounter(decision);
        }
        _ => {}
    }
}

fn print_status(sim: &Simulation, performance_tracker: &PerformanceTracker) {
    let pose = sim.pose();
    let gameplay = sim.gameplay();
    let economy = gameplay.economy();
    let destination = economy
        .current_destination
        .as_ref()
        .map_or("-", |d| d.name.as_str());

    info!(
        "t={:.0}s {} | pos ({:.0}, {:.0}) {:.0} km/h | light {} | KSh {:.0} fuel {:.1}% \
         pax {}/{} -> {} | {:.0} FPS, sim {:.3}ms ({:.0} steps/s)",
        sim.clock().elapsed(),
        gameplay.role(),
        pose.x,
        pose.z,
        pose.speed * 3.6,
        gameplay.light_color(),
        economy.cash(),
        economy.fuel(),
        economy.passengers(),
        economy.max_passengers(),
        destination,
        performance_tracker.fps(),
        performance_tracker.average_simulation_time().as_secs_f64() * 1000.0,
        performance_tracker.steps_per_second()
    );
}
