use anyhow::Result;
use matatu_sim::{
    config::{ObstacleConfig, SimulationConfig},
    engine::Simulation,
    simulation::{
        AutopilotMode, PoliceDecision, Pose, RefuelOutcome, Role, RouteStartOutcome, SimEvent,
        StopAction, StopKind, StopReason,
    },
};
use std::cell::RefCell;
use std::rc::Rc;

const DT: f32 = 1.0 / 60.0;

fn simulation(seed: u64) -> Result<Simulation> {
    Simulation::new(SimulationConfig::default(), Some(seed))
}

fn run_for(sim: &mut Simulation, seconds: f32) -> Vec<SimEvent> {
    let mut events = Vec::new();
    for _ in 0..(seconds / DT) as usize {
        events.extend(sim.step(DT));
    }
    events
}

/// Conductor session answering every stop and encounter; records poses.
fn scripted_session(seed: u64, seconds: f32) -> Result<(Vec<Pose>, Vec<SimEvent>, f64)> {
    let mut sim = simulation(seed)?;
    sim.set_command(0.6, 0.0);
    sim.start_route();

    let mut poses = Vec::new();
    let mut events = Vec::new();
    for step in 0..(seconds / DT) as usize {
        // Refused while an encounter is open, so keep asking
        if step >= 600 && sim.gameplay().role() == Role::Driver {
            sim.switch_role(Role::Conductor);
        }

        let stepped = sim.step(DT);
        for event in &stepped {
            match event {
                SimEvent::StopReached { kind: StopKind::PickUp, .. } => {
                    sim.handle_stop_action(StopAction::PickUp);
                }
                SimEvent::StopReached { kind: StopKind::DropOff, .. } => {
                    sim.handle_stop_action(StopAction::DropOff);
                }
                SimEvent::PoliceEncounter { .. } => {
                    sim.resolve_encounter(PoliceDecision::Deny);
                }
                _ => {}
            }
        }
        events.extend(stepped);
        poses.push(sim.pose());
    }

    let cash = sim.gameplay().economy().cash();
    Ok((poses, events, cash))
}

#[test]
fn test_same_seed_same_session() -> Result<()> {
    let (poses_a, events_a, cash_a) = scripted_session(77, 60.0)?;
    let (poses_b, events_b, cash_b) = scripted_session(77, 60.0)?;

    assert_eq!(poses_a, poses_b);
    assert_eq!(events_a, events_b);
    assert_eq!(cash_a, cash_b);
    println!("✓ {} steps and {} events matched", poses_a.len(), events_a.len());
    Ok(())
}

#[test]
fn test_conductor_completes_a_paying_lap() -> Result<()> {
    let (_, events, cash) = scripted_session(5, 300.0)?;

    let stops = events
        .iter()
        .filter(|e| matches!(e, SimEvent::StopReached { .. }))
        .count();
    let stages = events
        .iter()
        .filter(|e| matches!(e, SimEvent::StageReached(_)))
        .count();

    println!("Stops: {}, stages: {}, cash: {:.0}", stops, stages, cash);
    assert!(stops >= 3, "expected several stops, got {}", stops);
    assert!(stages >= 3, "expected several stage crossings, got {}", stages);
    assert!(events.contains(&SimEvent::LapCompleted));
    assert!(cash > 1000.0);
    Ok(())
}

#[test]
fn test_invalid_config_rejected_at_construction() {
    let mut config = SimulationConfig::default();
    config.vehicle.economy.min_pickup_batch = 9;
    config.vehicle.economy.max_pickup_batch = 3;
    assert!(Simulation::new(config, Some(1)).is_err());

    let mut config = SimulationConfig::default();
    config.vehicle.autopilot.idle_drift_probability = 2.0;
    assert!(Simulation::new(config, Some(1)).is_err());

    let mut config = SimulationConfig::default();
    config.route.route.geometry.obstacle_radius = 0.0;
    assert!(Simulation::new(config, Some(1)).is_err());
}

#[test]
fn test_driving_into_a_cone_once() -> Result<()> {
    let mut config = SimulationConfig::default();
    config.route.route.obstacles = vec![ObstacleConfig { x: 120.0, z: 0.0 }];
    let mut sim = Simulation::new(config, Some(9))?;

    // Gentle enough to stay under the speed limit for the whole run
    sim.set_command(0.5, 0.0);
    let events = run_for(&mut sim, 6.0);

    let hits: Vec<_> = events
        .iter()
        .filter(|e| matches!(e, SimEvent::ObstacleHit { .. }))
        .collect();
    assert_eq!(hits, [&SimEvent::ObstacleHit { index: 0, penalty: 50.0 }]);
    assert_eq!(sim.gameplay().economy().cash(), 950.0);
    assert!(sim.pose().x > 125.0);
    assert!(sim.pose().speed < 13.0);
    assert!(sim.obstacles().obstacles()[0].is_displaced());

    sim.reset_route();
    assert!(!sim.obstacles().obstacles()[0].is_displaced());
    Ok(())
}

#[test]
fn test_manual_driving_moves_the_vehicle() -> Result<()> {
    let mut sim = simulation(1)?;
    let start = sim.pose();

    sim.set_command(5.0, 0.0);
    run_for(&mut sim, 2.0);

    let pose = sim.pose();
    assert!(pose.x > start.x + 5.0);
    assert!(pose.speed > 0.0 && pose.speed <= 15.0);
    Ok(())
}

#[test]
fn test_switch_to_conductor_engages_autopilot_and_starts_route() -> Result<()> {
    let mut sim = simulation(3)?;
    assert!(!sim.gameplay().is_trip_active());

    assert!(sim.switch_role(Role::Conductor));
    assert!(sim.autopilot().is_engaged());
    assert_eq!(sim.autopilot().mode(), AutopilotMode::Tracking);
    assert!(sim.gameplay().is_trip_active());

    let events = sim.drain_events();
    assert!(events.contains(&SimEvent::RouteStarted));
    assert!(events.contains(&SimEvent::RoleChanged {
        role: Role::Conductor,
        autopilot: true,
    }));

    assert!(sim.switch_role(Role::Driver));
    assert!(!sim.autopilot().is_engaged());
    assert!(sim.gameplay().is_trip_active());
    Ok(())
}

#[test]
fn test_role_switch_refused_during_encounter() -> Result<()> {
    let mut sim = simulation(3)?;
    assert!(sim.trigger_police_encounter("Checkpoint", 300));

    assert!(!sim.switch_role(Role::Conductor));
    assert_eq!(sim.gameplay().role(), Role::Driver);
    assert!(!sim.autopilot().is_engaged());
    Ok(())
}

#[test]
fn test_encounter_freezes_the_vehicle_until_released() -> Result<()> {
    let mut sim = simulation(12)?;
    sim.start_route();
    sim.set_command(1.0, 0.0);
    run_for(&mut sim, 1.0);
    assert!(sim.vehicle().is_moving());

    assert!(sim.trigger_police_encounter("Checkpoint", 300));
    run_for(&mut sim, 1.0);
    assert_eq!(sim.pose().speed, 0.0);

    let resolution = sim.resolve_encounter(PoliceDecision::Pay).expect("pending encounter");
    assert!(!resolution.insufficient_funds);
    assert_eq!(sim.gameplay().economy().cash(), 700.0);

    // Pay releases after the short delay
    let events = run_for(&mut sim, 1.0);
    assert_eq!(sim.pose().speed, 0.0);
    assert!(!events.contains(&SimEvent::EncounterClosed));

    let events = run_for(&mut sim, 1.0);
    assert!(events.contains(&SimEvent::EncounterClosed));
    assert!(sim.vehicle().is_moving());
    Ok(())
}

#[test]
fn test_start_route_refused_on_empty_tank() -> Result<()> {
    let mut sim = simulation(2)?;
    sim.gameplay_mut().economy_mut().set_fuel(0.0);

    assert_eq!(sim.start_route(), RouteStartOutcome::FuelEmpty);
    assert!(!sim.gameplay().is_trip_active());
    assert!(sim
        .drain_events()
        .iter()
        .any(|e| matches!(e, SimEvent::Message(m) if m.contains("Fuel is empty"))));
    Ok(())
}

#[test]
fn test_running_dry_stops_the_route() -> Result<()> {
    let mut sim = simulation(2)?;
    sim.start_route();
    sim.gameplay_mut().economy_mut().set_fuel(0.1);
    sim.set_command(1.0, 0.0);

    let events = run_for(&mut sim, 3.0);
    assert!(events.contains(&SimEvent::RouteStopped {
        reason: StopReason::FuelEmpty,
    }));
    assert!(!sim.gameplay().is_trip_active());
    assert_eq!(sim.gameplay().economy().fuel(), 0.0);

    // Throttle is ignored with an empty tank
    run_for(&mut sim, 1.0);
    assert_eq!(sim.pose().speed, 0.0);
    Ok(())
}

#[test]
fn test_refuel_stops_the_route() -> Result<()> {
    let mut sim = simulation(6)?;
    assert!(sim.switch_role(Role::Conductor));
    sim.gameplay_mut().economy_mut().set_fuel(30.0);

    assert_eq!(sim.refuel(), RefuelOutcome::Refueled { cost: 500.0 });
    assert!(!sim.gameplay().is_trip_active());
    assert!(!sim.autopilot().is_engaged());
    assert_eq!(sim.gameplay().economy().fuel(), 100.0);
    assert!(sim.drain_events().contains(&SimEvent::RouteStopped {
        reason: StopReason::Refueling,
    }));

    // Restarting as conductor hands the wheel back to the autopilot
    assert_eq!(sim.start_route(), RouteStartOutcome::Started);
    assert!(sim.autopilot().is_engaged());
    assert_eq!(sim.start_route(), RouteStartOutcome::AlreadyRunning);
    Ok(())
}

#[test]
fn test_stop_route_keeps_route_memory() -> Result<()> {
    let mut sim = simulation(6)?;
    sim.switch_role(Role::Conductor);
    run_for(&mut sim, 50.0);
    let hint = sim.route().last_waypoint_hint();
    assert!(hint > 0);

    assert!(sim.stop_route());
    assert!(!sim.stop_route());
    assert_eq!(sim.pose().speed, 0.0);
    assert_eq!(sim.route().last_waypoint_hint(), hint);

    sim.reset_route();
    assert_eq!(sim.route().last_waypoint_hint(), 0);
    assert!(sim.route().stops().iter().all(|s| !s.collected));
    let first = sim.route().waypoints()[0].position;
    assert_eq!(sim.pose().x, first.x);
    assert_eq!(sim.pose().z, first.y);
    Ok(())
}

#[test]
fn test_advance_runs_whole_fixed_steps() -> Result<()> {
    let mut sim = simulation(4)?;
    let dt = sim.clock().fixed_dt();

    sim.advance(dt);
    assert_eq!(sim.clock().steps(), 1);

    // A long stall is capped at max_substeps
    sim.advance(5.0);
    assert_eq!(sim.clock().steps(), 1 + 8);

    sim.advance(0.0);
    assert_eq!(sim.clock().steps(), 9);
    Ok(())
}

#[test]
fn test_listeners_see_events_in_publish_order() -> Result<()> {
    let mut sim = simulation(4)?;
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    sim.subscribe(move |event| sink.borrow_mut().push(event.clone()));

    sim.start_route();
    let returned = sim.step(DT);

    assert_eq!(*seen.borrow(), returned);
    assert_eq!(returned.first(), Some(&SimEvent::RouteStarted));
    Ok(())
}
