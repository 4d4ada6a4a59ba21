use anyhow::Result;
use matatu_sim::{
    config::{AutopilotParams, Route, VehicleParams},
    simulation::{
        pure_pursuit_steer, AutopilotController, AutopilotMode, PidController, Point, RoutePath,
        VehicleModel,
    },
};

const DT: f32 = 1.0 / 60.0;

#[test]
fn test_pid_first_sample_has_no_derivative_kick() {
    let mut pid = PidController::new(1.6, 0.02, 0.12, 50.0);

    let output = pid.update(2.0, 0.1);
    assert!((output - (1.6 * 2.0 + 0.02 * 0.2)).abs() < 1e-6);
    assert_eq!(pid.previous_error(), Some(2.0));

    // Second sample picks up the slope
    let output = pid.update(1.0, 0.1);
    let expected = 1.6 * 1.0 + 0.02 * 0.3 + 0.12 * (1.0 - 2.0) / 0.1;
    assert!((output - expected).abs() < 1e-5);
}

#[test]
fn test_pid_reset_clears_history() {
    let mut pid = PidController::new(1.0, 1.0, 1.0, 50.0);
    pid.update(3.0, 0.5);
    pid.update(-1.0, 0.5);

    pid.reset();
    assert_eq!(pid.integral(), 0.0);
    assert_eq!(pid.previous_error(), None);

    let fresh = PidController::new(1.0, 1.0, 1.0, 50.0).update(0.5, 0.2);
    assert_eq!(pid.update(0.5, 0.2), fresh);
}

#[test]
fn test_pid_integral_is_clamped_and_dt_floored() {
    let mut pid = PidController::new(0.0, 1.0, 0.0, 5.0);
    for _ in 0..100 {
        pid.update(10.0, 1.0);
    }
    assert_eq!(pid.integral(), 5.0);

    let mut pid = PidController::new(0.0, 1.0, 1.0, 50.0);
    pid.update(1.0, 0.0);
    assert!((pid.integral() - 1e-3).abs() < 1e-7);
    let output = pid.update(2.0, 0.0);
    assert!(output.is_finite());
}

#[test]
fn test_pure_pursuit_sign_and_saturation() {
    let vehicle = VehicleModel::new(VehicleParams::default());
    let state = vehicle.state();
    let max = std::f32::consts::FRAC_PI_4;

    assert!(pure_pursuit_steer(state, &Point::new(200.0, 0.0), max).abs() < 1e-6);
    assert!(pure_pursuit_steer(state, &Point::new(200.0, 30.0), max) > 0.0);
    assert!(pure_pursuit_steer(state, &Point::new(200.0, -30.0), max) < 0.0);
    // Behind and to the side saturates
    assert_eq!(pure_pursuit_steer(state, &Point::new(0.0, 50.0), max), 1.0);
    assert_eq!(pure_pursuit_steer(state, &Point::new(0.0, -50.0), max), -1.0);
}

#[test]
fn test_engaging_and_disengaging_reset_the_pid() -> Result<()> {
    let mut route = RoutePath::build(&Route::default())?;
    let vehicle = VehicleModel::new(VehicleParams::default());
    let mut autopilot = AutopilotController::new(AutopilotParams::default(), Some(3));

    autopilot.set_engaged(true);
    autopilot.set_mode(AutopilotMode::Tracking);
    autopilot.compute(vehicle.state(), &mut route, DT);
    assert!(autopilot.pid().previous_error().is_some());

    autopilot.set_engaged(false);
    assert!(!autopilot.is_engaged());
    assert_eq!(autopilot.mode(), AutopilotMode::Idle);
    assert_eq!(autopilot.pid().previous_error(), None);
    assert_eq!(autopilot.pid().integral(), 0.0);
    Ok(())
}

#[test]
fn test_tracking_output_is_clamped() -> Result<()> {
    let mut route = RoutePath::build(&Route::default())?;
    let vehicle = VehicleModel::new(VehicleParams::default());
    let params = AutopilotParams::default();
    let mut autopilot = AutopilotController::new(params.clone(), Some(3));
    autopilot.set_engaged(true);
    autopilot.set_mode(AutopilotMode::Tracking);

    let output = autopilot.compute(vehicle.state(), &mut route, DT);
    assert_eq!(output.command.throttle, params.max_throttle);
    assert!(output.command.steer.abs() <= 1.0);
    assert!(output.observation.is_some());
    assert!(output.lookahead.is_some());
    Ok(())
}

#[test]
fn test_autopilot_follows_the_route() -> Result<()> {
    let mut route = RoutePath::build(&Route::default())?;
    let mut vehicle = VehicleModel::new(VehicleParams::default());
    let mut autopilot = AutopilotController::new(AutopilotParams::default(), Some(11));
    autopilot.set_engaged(true);
    autopilot.set_mode(AutopilotMode::Tracking);

    let mut stages = Vec::new();
    let mut worst_offset: f32 = 0.0;

    for _ in 0..(120.0 / DT) as usize {
        let output = autopilot.compute(vehicle.state(), &mut route, DT);
        if let Some(stage) = output.observation.and_then(|o| o.stage) {
            stages.push(stage.name);
        }
        vehicle.integrate(output.command, DT);

        let position = vehicle.state().position;
        let nearest = route.nearest_waypoint(&position, 0);
        let offset = (route.waypoints()[nearest].position - position).norm();
        worst_offset = worst_offset.max(offset);
    }

    println!("Stages reached: {:?}, worst offset {:.1}", stages, worst_offset);
    let kencom = stages.iter().position(|s| s == "Kencom");
    let afya = stages.iter().position(|s| s == "Afya Centre");
    assert!(kencom.is_some() && afya.is_some(), "missing stage crossings: {:?}", stages);
    assert!(kencom < afya, "stages out of order: {:?}", stages);
    assert!(worst_offset < 75.0, "vehicle wandered {:.1} units off the path", worst_offset);
    Ok(())
}

#[test]
fn test_idle_cruise_is_seeded_and_relaxed() {
    let params = AutopilotParams::default();
    let mut route = RoutePath::build(&Route::default()).expect("default route");

    let drive = |seed: u64, route: &mut RoutePath| {
        let mut vehicle = VehicleModel::new(VehicleParams::default());
        let mut autopilot = AutopilotController::new(params.clone(), Some(seed));
        autopilot.set_engaged(true);
        let mut steers = Vec::new();
        for _ in 0..(30.0 / DT) as usize {
            let output = autopilot.compute(vehicle.state(), route, DT);
            assert!(output.observation.is_none());
            steers.push(output.command.steer);
            vehicle.integrate(output.command, DT);
        }
        (steers, vehicle.state().speed)
    };

    let (first, speed) = drive(21, &mut route);
    let (second, _) = drive(21, &mut route);
    assert_eq!(first, second);

    let cruise = params.target_speed * params.idle_speed_factor;
    assert!((speed - cruise).abs() < 0.5, "idle speed {} not near {}", speed, cruise);
}
