use std::sync::Arc;

use glam::Vec3;
use neuroflight_core::{Aabb, Collider, Event, FlightPhase, InputCommand};
use neuroflight_system_collision::CollisionRegistry;
use neuroflight_system_flight::{FlightConfig, FlightController};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

const DT: f32 = 0.016;

fn start() -> InputCommand {
    InputCommand {
        start: true,
        ..InputCommand::IDLE
    }
}

fn random_command(rng: &mut ChaCha8Rng) -> InputCommand {
    InputCommand::from_bits(rng.gen_range(0..512))
}

#[test]
fn every_tick_ends_inside_the_flyable_volume() {
    let config = FlightConfig::default();
    let mut controller = FlightController::new(config.clone());
    let mut registry = CollisionRegistry::new();
    registry.install(Arc::from(vec![Collider::new(Aabb::new(
        Vec3::new(3.0, 0.0, -3.0),
        Vec3::new(7.0, 6.0, 3.0),
    ))]));
    let mut rng = ChaCha8Rng::seed_from_u64(0x5eed);
    let mut events = Vec::new();

    for tick in 0..20_000 {
        let mut command = random_command(&mut rng);
        // Bias toward sustained movement so the bounds actually get reached.
        if tick % 7 != 0 {
            command.forward = true;
            command.up = tick % 3 == 0;
        }
        if rng.gen_bool(0.002) {
            controller.cut_motors(&mut events);
        }
        let _ = controller.tick(&command, &registry, DT, &mut events);

        let position = controller.state().position;
        assert!(position.x.abs() <= config.bounds_xz, "tick {tick}: {position:?}");
        assert!(position.z.abs() <= config.bounds_xz, "tick {tick}: {position:?}");
        assert!(position.y >= controller.ground_height(), "tick {tick}: {position:?}");
        assert!(position.y <= config.ceiling, "tick {tick}: {position:?}");
    }
}

#[test]
fn takeoff_climbs_monotonically_to_exact_target() {
    let mut controller = FlightController::default();
    let ground = controller.ground_height();
    let target = ground + controller.config().start_lift;
    let registry = CollisionRegistry::new();
    let mut events = Vec::new();

    let outcome = controller.tick(&start(), &registry, DT, &mut events);
    assert!(outcome.took_off);

    let mut previous = controller.state().position.y;
    let mut ticks = 0;
    while controller.phase() == FlightPhase::Lifting {
        let _ = controller.tick(&InputCommand::IDLE, &registry, DT, &mut events);
        let state = controller.state();
        assert!(state.position.y >= previous);
        assert!(state.position.y <= target);
        assert_eq!(state.velocity, Vec3::ZERO);
        previous = state.position.y;
        ticks += 1;
        assert!(ticks < 1_000, "takeoff never finished");
    }

    assert_eq!(controller.phase(), FlightPhase::Flying);
    assert_eq!(controller.state().position.y, target);
    assert!(events.contains(&Event::FlightPhaseChanged {
        from: FlightPhase::Lifting,
        to: FlightPhase::Flying,
    }));
}

#[test]
fn fall_rebounds_once_within_bounce_limits() {
    let config = FlightConfig::default();
    let mut controller = FlightController::new(config.clone());
    let registry = CollisionRegistry::new();
    let mut events = Vec::new();

    let _ = controller.tick(&start(), &registry, DT, &mut events);
    let climb = InputCommand {
        up: true,
        ..InputCommand::IDLE
    };
    for _ in 0..300 {
        let _ = controller.tick(&climb, &registry, DT, &mut events);
    }
    assert!(controller.state().position.y > 5.0);

    events.clear();
    controller.cut_motors(&mut events);
    for _ in 0..1_000 {
        let _ = controller.tick(&InputCommand::IDLE, &registry, DT, &mut events);
    }

    let rebounds: Vec<f32> = events
        .iter()
        .filter_map(|event| match event {
            Event::Bounced { height } => Some(*height),
            _ => None,
        })
        .collect();
    assert_eq!(rebounds.len(), 1);
    assert!(rebounds[0] >= config.bounce_min && rebounds[0] <= config.bounce_max);
    assert_eq!(controller.phase(), FlightPhase::Grounded);
    assert_eq!(controller.state().position.y, controller.ground_height());
}

#[test]
fn powered_descent_lands_without_bouncing() {
    let climb = InputCommand {
        up: true,
        ..InputCommand::IDLE
    };
    let descend = InputCommand {
        down: true,
        ..InputCommand::IDLE
    };

    for climb_ticks in 0..80 {
        let mut controller = FlightController::default();
        let registry = CollisionRegistry::new();
        let mut events = Vec::new();

        let _ = controller.tick(&start(), &registry, DT, &mut events);
        while controller.phase() == FlightPhase::Lifting {
            let _ = controller.tick(&InputCommand::IDLE, &registry, DT, &mut events);
        }
        for _ in 0..climb_ticks {
            let _ = controller.tick(&climb, &registry, DT, &mut events);
        }

        events.clear();
        let mut ticks = 0;
        while controller.phase() == FlightPhase::Flying {
            let _ = controller.tick(&descend, &registry, DT, &mut events);
            ticks += 1;
            assert!(ticks < 2_000, "descent after {climb_ticks} climb ticks never landed");
        }
        for _ in 0..200 {
            let _ = controller.tick(&InputCommand::IDLE, &registry, DT, &mut events);
        }

        assert_eq!(controller.phase(), FlightPhase::Grounded, "climb {climb_ticks}");
        assert_eq!(controller.state().position.y, controller.ground_height());
        assert!(events.contains(&Event::FlightPhaseChanged {
            from: FlightPhase::Flying,
            to: FlightPhase::Grounded,
        }));
        assert!(
            !events.iter().any(|event| matches!(event, Event::Bounced { .. })),
            "climb {climb_ticks} bounced"
        );
    }
}

#[test]
fn landing_tilt_is_reproducible_for_a_seed() {
    fn land(seed: u64) -> (f32, f32) {
        let mut controller = FlightController::new(FlightConfig {
            rng_seed: seed,
            ..FlightConfig::default()
        });
        let registry = CollisionRegistry::new();
        let mut events = Vec::new();
        let _ = controller.tick(&start(), &registry, DT, &mut events);
        for _ in 0..200 {
            let _ = controller.tick(&InputCommand::IDLE, &registry, DT, &mut events);
        }
        controller.cut_motors(&mut events);
        for _ in 0..400 {
            let _ = controller.tick(&InputCommand::IDLE, &registry, DT, &mut events);
        }
        let state = controller.state();
        assert!(state.landing_pitch.abs() <= 0.125);
        assert!(state.landing_roll.abs() <= 0.125);
        (state.landing_pitch, state.landing_roll)
    }

    assert_eq!(land(11), land(11));
}

#[test]
fn restart_mid_fall_climbs_from_current_height() {
    let mut controller = FlightController::default();
    let registry = CollisionRegistry::new();
    let mut events = Vec::new();
    let _ = controller.tick(&start(), &registry, DT, &mut events);
    for _ in 0..200 {
        let _ = controller.tick(&InputCommand::IDLE, &registry, DT, &mut events);
    }
    controller.cut_motors(&mut events);
    for _ in 0..5 {
        let _ = controller.tick(&InputCommand::IDLE, &registry, DT, &mut events);
    }
    let height = controller.state().position.y;
    assert_eq!(controller.phase(), FlightPhase::Falling);

    controller.start_motors(&mut events);

    assert_eq!(controller.phase(), FlightPhase::Lifting);
    assert_eq!(
        controller.state().lift_target,
        Some(height + controller.config().start_lift)
    );
}
