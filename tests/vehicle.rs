use matatu_sim::{
    config::VehicleParams,
    simulation::{normalize_angle, DriveCommand, Point, VehicleModel},
};
use std::f32::consts::PI;

const DT: f32 = 1.0 / 60.0;

fn run(model: &mut VehicleModel, command: DriveCommand, seconds: f32) {
    let steps = (seconds / DT) as usize;
    for _ in 0..steps {
        model.integrate(command, DT);
    }
}

#[test]
fn test_out_of_range_commands_match_clamped_commands() {
    let mut wild = VehicleModel::new(VehicleParams::default());
    let mut tame = VehicleModel::new(VehicleParams::default());

    for _ in 0..240 {
        wild.integrate(DriveCommand::new(5.0, -3.0), DT);
        tame.integrate(DriveCommand::new(1.0, -1.0), DT);
    }

    assert_eq!(wild.state(), tame.state());
    assert_eq!(wild.state().throttle_command, 1.0);
    assert_eq!(wild.state().steer_command, -1.0);
}

#[test]
fn test_nan_command_is_treated_as_idle() {
    let mut model = VehicleModel::new(VehicleParams::default());
    model.integrate(DriveCommand::new(f32::NAN, f32::NAN), DT);

    assert_eq!(model.state().speed, 0.0);
    assert_eq!(model.state().throttle_command, 0.0);
    assert_eq!(model.state().position, Point::new(100.0, 0.0));
}

#[test]
fn test_non_finite_dt_leaves_state_untouched() {
    let mut model = VehicleModel::new(VehicleParams::default());
    run(&mut model, DriveCommand::new(1.0, 0.3), 1.0);
    let before = model.state().clone();

    for dt in [f32::NAN, -DT, 0.0] {
        model.integrate(DriveCommand::new(1.0, 0.3), dt);
        assert_eq!(model.state().position, before.position);
        assert_eq!(model.state().speed, before.speed);
        assert_eq!(model.state().heading, before.heading);
    }
    assert!(model.state().speed.is_finite());
}

#[test]
fn test_speed_respects_forward_and_reverse_caps() {
    let params = VehicleParams::default();
    let mut model = VehicleModel::new(params.clone());

    run(&mut model, DriveCommand::new(1.0, 0.0), 10.0);
    assert_eq!(model.state().speed, params.max_forward_speed);

    run(&mut model, DriveCommand::new(-1.0, 0.0), 10.0);
    assert_eq!(model.state().speed, -params.max_reverse_speed);

    model.set_speed(1000.0);
    assert_eq!(model.state().speed, params.max_forward_speed);
}

#[test]
fn test_braking_stops_at_zero_before_reversing() {
    let mut model = VehicleModel::new(VehicleParams::default());
    model.set_speed(10.0);

    model.integrate(DriveCommand::new(-1.0, 0.0), DT);
    let after_one = model.state().speed;
    assert!((after_one - (10.0 - 12.0 * DT)).abs() < 1e-4);

    // 10 / 12 seconds of braking is 50 steps in total
    for _ in 1..50 {
        model.integrate(DriveCommand::new(-1.0, 0.0), DT);
        assert!(model.state().speed >= 0.0, "brake overshot into reverse: {}", model.state().speed);
    }
    assert!(!model.is_moving());
}

#[test]
fn test_coasting_decays_to_exact_rest() {
    let mut model = VehicleModel::new(VehicleParams::default());
    run(&mut model, DriveCommand::new(1.0, 0.0), 2.0);
    assert!(model.is_moving());

    run(&mut model, DriveCommand::default(), 60.0);
    assert_eq!(model.state().speed, 0.0);
    assert!(!model.is_moving());
}

#[test]
fn test_no_turning_in_place() {
    let mut model = VehicleModel::new(VehicleParams::default());
    run(&mut model, DriveCommand::new(0.0, 1.0), 2.0);

    assert_eq!(model.state().heading, 0.0);
    assert_eq!(model.state().position, Point::new(100.0, 0.0));
}

#[test]
fn test_heading_stays_normalized_while_circling() {
    let mut model = VehicleModel::new(VehicleParams::default());

    for _ in 0..(30.0 / DT) as usize {
        model.integrate(DriveCommand::new(0.5, 1.0), DT);
        let heading = model.state().heading;
        assert!(heading > -PI && heading <= PI, "heading {} out of range", heading);
    }
}

#[test]
fn test_positive_steer_turns_toward_positive_z() {
    let mut model = VehicleModel::new(VehicleParams::default());
    run(&mut model, DriveCommand::new(1.0, 0.0), 1.0);
    let straight = model.pose();
    assert!(straight.x > 100.0);
    assert!(straight.z.abs() < 1e-4);

    run(&mut model, DriveCommand::new(0.3, 0.5), 1.0);
    let turned = model.pose();
    assert!(turned.heading > 0.0);
    assert!(turned.z > 0.0);
}

#[test]
fn test_teleport_and_force_stop() {
    let mut model = VehicleModel::new(VehicleParams::default());
    model.set_speed(8.0);
    model.teleport(Point::new(-20.0, 40.0), 2.0 * PI + 1.0);

    assert_eq!(model.state().speed, 0.0);
    assert!((model.state().heading - 1.0).abs() < 1e-5);
    assert!((normalize_angle(-PI - 0.5) - (PI - 0.5)).abs() < 1e-5);
    assert_eq!(model.pose().x, -20.0);
    assert_eq!(model.pose().z, 40.0);

    model.set_speed(-3.0);
    model.force_stop();
    assert_eq!(model.state().speed, 0.0);
}
