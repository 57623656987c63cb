mod driving;

use anyhow::Result;
use clap::Parser;
use log::{debug, info};

use driving::{
    Position, RoadAtlas, Session, Timestamp, TrafficLightState, Transform, VehicleControl,
    WorldState,
};

#[derive(Parser)]
#[command(name = "taskdrive")]
#[command(about = "Headless driving-task session runner")]
struct Cli {
    /// Number of simulation ticks to run
    #[arg(long, default_value = "1000")]
    ticks: u64,

    /// Time delta per tick in seconds
    #[arg(long, default_value = "0.05")]
    delta: f32,

    /// RNG seed for reproducible target selection
    #[arg(long, default_value = "7")]
    seed: u64,

    /// Stop extending the route once the final target is reached
    #[arg(long)]
    finite: bool,
}

/// Ego acceleration per unit throttle, units/s^2
const THROTTLE_ACCEL: f32 = 4.0;

/// Ego deceleration per unit brake, units/s^2
const BRAKE_DECEL: f32 = 12.0;

/// Yaw rate at full steer, degrees per second
const STEER_RATE: f32 = 60.0;

/// Hard speed cap of the toy integrator
const MAX_SPEED: f32 = 15.0;

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    println!("Running driving-task session in headless mode...");
    println!("Ticks: {}, Delta: {}s, Seed: {}", cli.ticks, cli.delta, cli.seed);
    println!();

    let atlas = RoadAtlas::demo_town();
    let mut world = build_demo_world();

    let ego = world.spawn_vehicle(Transform::new(Position::new(-20.0, -20.0, 0.0), 0.0));
    let spawns = atlas.spawn_transforms();

    let mut session = Session::attach_seeded(
        &world,
        &atlas,
        ego,
        vec![Transform::new(Position::new(20.0, 20.0, 0.0), 0.0)],
        spawns,
        !cli.finite,
        cli.seed,
    )?;

    println!("Initial route length: {:.1}", session.route_length());

    let mut speed: f32 = 0.0;
    let mut stops = 0u64;
    let report_every = (1.0 / cli.delta).ceil() as u64;

    for step in 0..cli.ticks {
        let timestamp = Timestamp {
            step,
            simulation_time: step as f32 * cli.delta,
        };

        let report = session.tick(&mut world, &atlas, timestamp)?;
        let control = session.control_to_target(&world, &atlas)?;
        if control == VehicleControl::emergency_stop() {
            stops += 1;
        }

        speed = integrate_ego(&mut world, &session, control, speed, cli.delta)?;

        if step % report_every == 0 {
            if let Some(completion) = report.route_completion() {
                debug!(
                    "step {}: completed {:.1}/{:.1}",
                    step, completion.route_completed_in_m, completion.route_length_in_m
                );
            }
            println!(
                "--- tick {} ({:.1}s) --- completed {:.1} of {:.1}, speed {:.1}",
                step,
                timestamp.simulation_time,
                session.route_completed(),
                session.route_length(),
                speed,
            );
        }
    }

    print_final_report(&session, stops);
    session.clean(&mut world);
    info!("session cleaned, ego alive: {}", world.is_alive(ego));

    println!("=== SESSION COMPLETE ===");
    Ok(())
}

/// Demo town population: a light, a stop sign, ambient traffic, one walker
fn build_demo_world() -> WorldState {
    let mut world = WorldState::new();
    world.set_sun_altitude(35.0);

    world.add_traffic_light(
        Transform::new(Position::new(0.0, 0.0, 0.0), 0.0),
        6.0,
        TrafficLightState::Green,
    );
    world.add_stop_sign(Transform::new(Position::new(20.0, 0.0, 0.0), 0.0), 4.0);

    world.spawn_vehicle(Transform::new(Position::new(0.0, 20.0, 0.0), 180.0));
    world.spawn_vehicle(Transform::new(Position::new(-20.0, 0.0, 0.0), 90.0));
    world.spawn_walker(Transform::new(Position::new(10.0, 3.0, 0.0), 90.0));

    world
}

/// Toy kinematic integration of the ego vehicle between frames
fn integrate_ego(
    world: &mut WorldState,
    session: &Session,
    control: VehicleControl,
    speed: f32,
    delta: f32,
) -> Result<f32> {
    let ego = session.vehicle();
    let state = *world
        .actor(ego)
        .ok_or_else(|| anyhow::anyhow!("ego vanished during integration"))?;

    let new_speed = (speed
        + (control.throttle * THROTTLE_ACCEL - control.brake * BRAKE_DECEL) * delta)
        .clamp(0.0, MAX_SPEED);
    let yaw = state.transform.yaw + control.steer * STEER_RATE * delta;

    let pose = Transform::new(state.transform.location, yaw);
    let (fx, fy) = pose.forward_vector();
    let location = Position::new(
        pose.location.x + fx * new_speed * delta,
        pose.location.y + fy * new_speed * delta,
        pose.location.z,
    );

    world.set_actor_transform(ego, Transform::new(location, yaw))?;
    world.set_actor_velocity(ego, Position::new(fx * new_speed, fy * new_speed, 0.0))?;
    Ok(new_speed)
}

fn print_final_report(session: &Session, stops: u64) {
    println!();
    println!("=== Final State ===");
    println!("Route length: {:.1}", session.route_length());
    println!("Route completed: {:.1}", session.route_completed());
    println!("Emergency stops: {}", stops);

    if let Some(report) = session.info() {
        if let Some(blocked) = report.blocked() {
            println!("Blocked: {}", blocked.is_blocked);
        }
        if let Some(collision) = report.collision() {
            println!("Collisions: {}", collision.collisions);
        }
        if let Some(outside) = report.outside_route_lane() {
            println!("Meters off route: {:.1}", outside.meters_off_route);
        }
        if let Some(completion) = report.route_completion() {
            println!("Route completed flag: {}", completion.is_route_completed);
        }
    }
}
