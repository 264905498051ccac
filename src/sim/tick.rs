//! Fixed timestep simulation tick
//!
//! One call advances the world by exactly one step. The host decides how often
//! to call it (see `session`, which caps it at ~60 Hz).

use glam::Vec2;

use super::collision::{circle_contact, resolve_boundary, resolve_pair};
use super::state::{BodyKind, SimEvent, StepOutcome, World};
use crate::clamp_to_arena;
use crate::consts::IMPACT_MAX_VOLUME;

/// Advance the world by one step
///
/// Integration finishes for every body before any pair is examined, so
/// collisions always see post-integration positions.
pub fn tick(world: &mut World) -> StepOutcome {
    world.steps += 1;
    integrate(world);
    resolve_contacts(world)
}

/// Acceleration a gravity well at `well_pos` imparts on a body at `pos`
///
/// Inverse-square: `mass / d² * strength`, pointing at the well. Zero when
/// the centers coincide.
#[inline]
pub fn well_acceleration(pos: Vec2, well_pos: Vec2, well_mass: f32, strength: f32) -> Vec2 {
    let delta = well_pos - pos;
    let dist_sq = delta.length_squared();
    if dist_sq <= 0.0 {
        return Vec2::ZERO;
    }
    delta / dist_sq.sqrt() * (well_mass / dist_sq * strength)
}

fn integrate(world: &mut World) {
    let tuning = &world.tuning;

    let wells: Vec<(u32, Vec2, f32)> = world
        .bodies
        .iter()
        .filter(|b| b.kind == BodyKind::GravityWell)
        .map(|b| (b.id, b.pos, b.mass))
        .collect();

    for body in world.bodies.iter_mut().filter(|b| b.is_dynamic()) {
        body.acc = world.gravity;
        for &(well_id, well_pos, well_mass) in &wells {
            if well_id == body.id {
                continue;
            }
            body.acc += well_acceleration(body.pos, well_pos, well_mass, tuning.well_strength);
        }

        // Semi-implicit Euler, one substep per frame
        body.vel += body.acc;
        body.vel *= tuning.friction;
        if body.vel.length() > tuning.max_speed {
            body.vel = body.vel.normalize() * tuning.max_speed;
        }
        body.pos += body.vel;

        resolve_boundary(body);
    }
}

fn resolve_contacts(world: &mut World) -> StepOutcome {
    let count = world.bodies.len();

    for i in 0..count {
        for j in (i + 1)..count {
            let (head, tail) = world.bodies.split_at_mut(j);
            let a = &mut head[i];
            let b = &mut tail[0];

            let contact = circle_contact(a.pos, a.radius, b.pos, b.radius);
            if !contact.hit {
                continue;
            }

            if is_goal_pair(a.kind, b.kind) {
                return StepOutcome::GoalReached;
            }

            if a.grabbed || b.grabbed {
                continue;
            }

            let Some(response) = resolve_pair(a, b, &contact, &world.tuning) else {
                continue;
            };
            // Correction may push a body back through a wall
            a.pos = clamp_to_arena(a.pos, a.radius);
            b.pos = clamp_to_arena(b.pos, b.radius);

            let speed = response.normal_speed.abs();
            if speed > world.tuning.impact_sound_threshold {
                world.events.push(SimEvent::Impact {
                    a: a.id,
                    b: b.id,
                    volume: (speed / 10.0).min(IMPACT_MAX_VOLUME),
                });
            }
        }
    }

    StepOutcome::Continue
}

#[inline]
fn is_goal_pair(a: BodyKind, b: BodyKind) -> bool {
    matches!(
        (a, b),
        (BodyKind::Player, BodyKind::Goal) | (BodyKind::Goal, BodyKind::Player)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::*;
    use crate::sim::state::Body;
    use crate::tuning::Tuning;
    use proptest::prelude::*;

    fn world(bodies: Vec<Body>, gravity: Vec2) -> World {
        World::new(bodies, gravity, Tuning::default())
    }

    #[test]
    fn test_tick_applies_gravity_and_friction() {
        let mut w = world(
            vec![Body::new(1, BodyKind::Player, Vec2::new(50.0, 30.0), 5.0)],
            Vec2::new(0.0, 0.2),
        );
        assert_eq!(tick(&mut w), StepOutcome::Continue);

        let body = &w.bodies[0];
        assert!((body.vel.y - 0.2 * FRICTION).abs() < 1e-6);
        assert!((body.pos.y - (30.0 + 0.2 * FRICTION)).abs() < 1e-5);
        assert_eq!(body.acc, Vec2::new(0.0, 0.2));
        assert_eq!(w.steps, 1);
    }

    #[test]
    fn test_speed_is_capped() {
        let mut w = world(
            vec![
                Body::new(1, BodyKind::Player, Vec2::new(50.0, 50.0), 2.0)
                    .with_velocity(Vec2::new(40.0, 30.0)),
            ],
            Vec2::ZERO,
        );
        tick(&mut w);
        let vel = w.bodies[0].vel;
        assert!((vel.length() - MAX_SPEED).abs() < 1e-4);
        // Direction preserved
        assert!((vel.x / vel.y - 40.0 / 30.0).abs() < 1e-4);
    }

    #[test]
    fn test_goal_overlap_completes_and_short_circuits() {
        let mut w = world(
            vec![
                Body::new(1, BodyKind::Player, Vec2::new(50.0, 50.0), 10.0),
                Body::new(2, BodyKind::Goal, Vec2::new(60.0, 50.0), 10.0).fixed(),
                // Overlaps the player too but must not be resolved this step
                Body::new(3, BodyKind::Obstacle, Vec2::new(40.0, 50.0), 5.0)
                    .with_velocity(Vec2::new(5.0, 0.0)),
            ],
            Vec2::ZERO,
        );
        assert_eq!(tick(&mut w), StepOutcome::GoalReached);
        assert!(w.events.is_empty());
    }

    #[test]
    fn test_player_touching_obstacle_does_not_complete() {
        let mut w = world(
            vec![
                Body::new(1, BodyKind::Player, Vec2::new(50.0, 50.0), 10.0),
                Body::new(2, BodyKind::Obstacle, Vec2::new(60.0, 50.0), 10.0).fixed(),
                Body::new(3, BodyKind::Goal, Vec2::new(10.0, 10.0), 5.0).fixed(),
            ],
            Vec2::ZERO,
        );
        assert_eq!(tick(&mut w), StepOutcome::Continue);
    }

    #[test]
    fn test_goal_detection_ignores_grab() {
        let mut player = Body::new(1, BodyKind::Player, Vec2::new(50.0, 50.0), 10.0);
        player.grabbed = true;
        let mut w = world(
            vec![player, Body::new(2, BodyKind::Goal, Vec2::new(55.0, 50.0), 10.0).fixed()],
            Vec2::ZERO,
        );
        assert_eq!(tick(&mut w), StepOutcome::GoalReached);
    }

    #[test]
    fn test_hard_impact_emits_sound_event() {
        let mut w = world(
            vec![
                Body::new(1, BodyKind::Player, Vec2::new(40.0, 50.0), 10.0)
                    .with_velocity(Vec2::new(6.0, 0.0)),
                Body::new(2, BodyKind::Obstacle, Vec2::new(62.0, 50.0), 10.0)
                    .with_mass(5.0)
                    .fixed(),
            ],
            Vec2::ZERO,
        );
        tick(&mut w);
        let events = w.drain_events();
        assert_eq!(events.len(), 1);
        match events[0] {
            SimEvent::Impact { a, b, volume } => {
                assert_eq!((a, b), (1, 2));
                assert!(volume > 0.0 && volume <= IMPACT_MAX_VOLUME);
            }
            ref other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn test_gentle_contact_is_silent() {
        let mut w = world(
            vec![
                Body::new(1, BodyKind::Player, Vec2::new(40.0, 50.0), 10.0)
                    .with_velocity(Vec2::new(1.5, 0.0)),
                Body::new(2, BodyKind::Obstacle, Vec2::new(60.5, 50.0), 10.0).fixed(),
            ],
            Vec2::ZERO,
        );
        tick(&mut w);
        assert!(w.events.is_empty());
        assert!(w.bodies[0].vel.x < 0.0);
    }

    #[test]
    fn test_grabbed_body_is_inert() {
        let mut held = Body::new(1, BodyKind::Player, Vec2::new(30.0, 30.0), 10.0);
        held.grabbed = true;
        let mut w = world(
            vec![
                held,
                Body::new(2, BodyKind::GravityWell, Vec2::new(60.0, 60.0), 10.0)
                    .with_mass(10.0)
                    .fixed(),
            ],
            Vec2::new(0.0, 0.2),
        );

        for _ in 0..120 {
            tick(&mut w);
        }
        assert_eq!(w.bodies[0].pos, Vec2::new(30.0, 30.0));
        assert_eq!(w.bodies[0].vel, Vec2::ZERO);
    }

    #[test]
    fn test_gravity_well_pulls_harder_when_closer() {
        let mut w = world(
            vec![
                Body::new(1, BodyKind::Player, Vec2::new(20.0, 50.0), 2.0),
                Body::new(2, BodyKind::GravityWell, Vec2::new(80.0, 50.0), 5.0)
                    .with_mass(10.0)
                    .fixed(),
            ],
            Vec2::ZERO,
        );

        let mut last_x = w.bodies[0].pos.x;
        let mut last_acc = 0.0;
        for _ in 0..30 {
            tick(&mut w);
            let body = &w.bodies[0];
            assert!(body.pos.x > last_x, "body should approach the well");
            assert!(body.acc.x > last_acc, "pull grows as distance shrinks");
            assert!(body.acc.y.abs() < 1e-6);
            last_x = body.pos.x;
            last_acc = body.acc.x;
        }
    }

    #[test]
    fn test_well_acceleration_is_inverse_square() {
        let near = well_acceleration(Vec2::new(10.0, 0.0), Vec2::ZERO, 10.0, 0.5);
        let far = well_acceleration(Vec2::new(20.0, 0.0), Vec2::ZERO, 10.0, 0.5);
        assert!((near.x + 0.05).abs() < 1e-6);
        assert!((near.length() / far.length() - 4.0).abs() < 1e-4);
        assert_eq!(well_acceleration(Vec2::ONE, Vec2::ONE, 10.0, 0.5), Vec2::ZERO);
    }

    #[test]
    fn test_well_does_not_attract_itself() {
        let mut w = world(
            vec![Body::new(1, BodyKind::GravityWell, Vec2::new(50.0, 50.0), 5.0).with_mass(10.0)],
            Vec2::ZERO,
        );
        tick(&mut w);
        assert_eq!(w.bodies[0].acc, Vec2::ZERO);
        assert_eq!(w.bodies[0].pos, Vec2::new(50.0, 50.0));
    }

    fn arb_body(id: u32) -> impl Strategy<Value = Body> {
        (
            3.0f32..15.0,
            0.0f32..1.0,
            0.0f32..1.0,
            -20.0f32..20.0,
            -20.0f32..20.0,
            0.5f32..10.0,
            0.0f32..1.5,
            any::<bool>(),
            prop_oneof![
                Just(BodyKind::Obstacle),
                Just(BodyKind::Bouncer),
                Just(BodyKind::GravityWell),
            ],
        )
            .prop_map(move |(radius, fx, fy, vx, vy, mass, restitution, fixed, kind)| {
                let span = ARENA_SIZE - 2.0 * radius;
                let mut body = Body::new(
                    id,
                    kind,
                    Vec2::new(radius + fx * span, radius + fy * span),
                    radius,
                )
                .with_mass(mass)
                .with_restitution(restitution)
                .with_velocity(Vec2::new(vx, vy));
                if fixed {
                    body.vel = Vec2::ZERO;
                    body.fixed = true;
                }
                body
            })
    }

    fn arb_world() -> impl Strategy<Value = World> {
        (1u32..6, -0.5f32..0.5, -0.5f32..0.5)
            .prop_flat_map(|(count, gx, gy)| {
                let bodies: Vec<_> = (1..=count).map(arb_body).collect();
                (bodies, Just(Vec2::new(gx, gy)))
            })
            .prop_map(|(bodies, gravity)| World::new(bodies, gravity, Tuning::default()))
    }

    proptest! {
        #[test]
        fn prop_bodies_stay_in_arena(mut w in arb_world(), steps in 1usize..200) {
            for _ in 0..steps {
                tick(&mut w);
                for body in w.bodies.iter().filter(|b| !b.fixed) {
                    prop_assert!(body.pos.x >= body.radius - 1e-3);
                    prop_assert!(body.pos.x <= ARENA_SIZE - body.radius + 1e-3);
                    prop_assert!(body.pos.y >= body.radius - 1e-3);
                    prop_assert!(body.pos.y <= ARENA_SIZE - body.radius + 1e-3);
                }
            }
        }

        #[test]
        fn prop_fixed_bodies_never_move(mut w in arb_world(), steps in 1usize..200) {
            let anchors: Vec<_> = w.bodies.iter().filter(|b| b.fixed).map(|b| (b.id, b.pos)).collect();
            for _ in 0..steps {
                tick(&mut w);
            }
            for (id, pos) in anchors {
                prop_assert_eq!(w.body(id).map(|b| b.pos), Some(pos));
            }
        }
    }
}
