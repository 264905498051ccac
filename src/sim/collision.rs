//! Collision detection and response for circles
//!
//! Two kinds of contact: a body against the square arena walls, and a pair of
//! overlapping circles resolved with an impulse plus a positional nudge.

use glam::Vec2;

use super::state::Body;
use crate::consts::ARENA_SIZE;
use crate::tuning::Tuning;

/// Result of a circle-circle overlap check
#[derive(Debug, Clone)]
pub struct Contact {
    /// Whether the circles overlap
    pub hit: bool,
    /// Unit vector from the first center toward the second (zero if coincident)
    pub normal: Vec2,
    /// Overlap depth (for position correction)
    pub penetration: f32,
}

impl Contact {
    pub fn miss() -> Self {
        Self {
            hit: false,
            normal: Vec2::ZERO,
            penetration: 0.0,
        }
    }
}

/// Check overlap between two circles
pub fn circle_contact(pos_a: Vec2, radius_a: f32, pos_b: Vec2, radius_b: f32) -> Contact {
    let delta = pos_b - pos_a;
    let distance = delta.length();
    let min_distance = radius_a + radius_b;

    if distance >= min_distance {
        return Contact::miss();
    }

    Contact {
        hit: true,
        normal: delta.normalize_or_zero(),
        penetration: min_distance - distance,
    }
}

/// Keep a body inside the arena, reflecting the offending velocity component
///
/// Each axis is handled independently and only the body's own restitution
/// applies. Returns true if any wall was touched.
pub fn resolve_boundary(body: &mut Body) -> bool {
    let lo = body.radius;
    let hi = ARENA_SIZE - body.radius;
    let mut touched = false;

    for axis in 0..2 {
        if body.pos[axis] < lo {
            body.pos[axis] = lo;
            body.vel[axis] = -body.vel[axis] * body.restitution;
            touched = true;
        } else if body.pos[axis] > hi {
            body.pos[axis] = hi;
            body.vel[axis] = -body.vel[axis] * body.restitution;
            touched = true;
        }
    }

    touched
}

/// Impulse applied by `resolve_pair`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairResponse {
    /// Relative velocity along the normal before the impulse (negative = closing)
    pub normal_speed: f32,
    /// Impulse magnitude
    pub impulse: f32,
}

/// Resolve an overlapping pair with an impulse and positional correction
///
/// Returns `None` when nothing was applied: the bodies are already separating,
/// the centers coincide, or neither body can respond.
pub fn resolve_pair(a: &mut Body, b: &mut Body, contact: &Contact, tuning: &Tuning) -> Option<PairResponse> {
    if !contact.hit || contact.normal == Vec2::ZERO {
        return None;
    }
    let n = contact.normal;

    let relative = b.vel - a.vel;
    let normal_speed = relative.dot(n);
    if normal_speed > 0.0 {
        return None;
    }

    let inv_a = a.inverse_mass(tuning.fixed_mass);
    let inv_b = b.inverse_mass(tuning.fixed_mass);
    let inv_sum = inv_a + inv_b;
    if inv_sum <= 0.0 {
        return None;
    }

    // The bouncier body wins
    let restitution = a.restitution.max(b.restitution);
    let impulse = -(1.0 + restitution) * normal_speed / inv_sum;
    let impulse_vec = n * impulse;

    if !a.fixed {
        a.vel -= impulse_vec * inv_a;
    }
    if !b.fixed {
        b.vel += impulse_vec * inv_b;
    }

    // Each movable body takes half of the nudge, whatever the masses;
    // fixed bodies never move
    let half = n * contact.penetration * tuning.correction_percent * 0.5;
    if !a.fixed {
        a.pos -= half;
    }
    if !b.fixed {
        b.pos += half;
    }

    Some(PairResponse {
        normal_speed,
        impulse,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::state::BodyKind;
    use crate::tuning::FixedMass;
    use proptest::prelude::*;

    fn ball(id: u32, x: f32, y: f32) -> Body {
        Body::new(id, BodyKind::Player, Vec2::new(x, y), 10.0)
    }

    #[test]
    fn test_circle_contact_overlap() {
        let contact = circle_contact(Vec2::new(10.0, 10.0), 5.0, Vec2::new(18.0, 10.0), 5.0);
        assert!(contact.hit);
        assert_eq!(contact.normal, Vec2::X);
        assert!((contact.penetration - 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_circle_contact_touching_is_a_miss() {
        let contact = circle_contact(Vec2::ZERO, 5.0, Vec2::new(10.0, 0.0), 5.0);
        assert!(!contact.hit);
    }

    #[test]
    fn test_boundary_clamps_and_reflects() {
        let mut body = ball(1, 95.0, 50.0).with_velocity(Vec2::new(4.0, 1.0));
        body.restitution = 0.5;

        assert!(resolve_boundary(&mut body));
        assert_eq!(body.pos.x, 90.0);
        assert_eq!(body.vel, Vec2::new(-2.0, 1.0));
    }

    #[test]
    fn test_boundary_bouncer_adds_energy() {
        let mut body = ball(1, 3.0, 50.0).with_velocity(Vec2::new(-2.0, 0.0));
        body.restitution = 1.5;

        resolve_boundary(&mut body);
        assert_eq!(body.pos.x, 10.0);
        assert!(body.vel.length() > 2.0);
    }

    #[test]
    fn test_separating_pair_untouched() {
        let mut a = ball(1, 10.0, 10.0).with_velocity(Vec2::new(-1.0, 0.0));
        let mut b = ball(2, 25.0, 10.0).with_velocity(Vec2::new(1.0, 0.0));
        let contact = circle_contact(a.pos, a.radius, b.pos, b.radius);
        assert!(contact.hit);

        let response = resolve_pair(&mut a, &mut b, &contact, &Tuning::default());
        assert!(response.is_none());
        assert_eq!(a.vel, Vec2::new(-1.0, 0.0));
        assert_eq!(b.vel, Vec2::new(1.0, 0.0));
        assert_eq!(a.pos, Vec2::new(10.0, 10.0));
    }

    #[test]
    fn test_equal_masses_exchange_momentum() {
        let mut a = ball(1, 10.0, 10.0).with_velocity(Vec2::new(2.0, 0.0)).with_restitution(1.0);
        let mut b = ball(2, 29.0, 10.0).with_restitution(1.0);
        let contact = circle_contact(a.pos, a.radius, b.pos, b.radius);

        let response = resolve_pair(&mut a, &mut b, &contact, &Tuning::default()).unwrap();
        assert!((response.normal_speed + 2.0).abs() < 1e-5);
        assert!(a.vel.x.abs() < 1e-5);
        assert!((b.vel.x - 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_fixed_body_is_not_moved() {
        let mut wall = ball(1, 50.0, 50.0).with_mass(5.0).fixed();
        let mut mover = ball(2, 65.0, 50.0).with_velocity(Vec2::new(-3.0, 0.0));
        let contact = circle_contact(wall.pos, wall.radius, mover.pos, mover.radius);

        resolve_pair(&mut wall, &mut mover, &contact, &Tuning::default()).unwrap();
        assert_eq!(wall.pos, Vec2::new(50.0, 50.0));
        assert_eq!(wall.vel, Vec2::ZERO);
        assert!(mover.vel.x > 0.0);
        // Half of 20% of a 5 unit overlap
        assert!((mover.pos.x - 65.5).abs() < 1e-4);
    }

    #[test]
    fn test_finite_fixed_mass_softens_rebound() {
        let make = || {
            (
                ball(1, 50.0, 50.0).with_mass(1.0).with_restitution(0.0).fixed(),
                ball(2, 65.0, 50.0).with_velocity(Vec2::new(-4.0, 0.0)).with_restitution(0.0),
            )
        };

        let (mut wall, mut hard) = make();
        let contact = circle_contact(wall.pos, wall.radius, hard.pos, hard.radius);
        resolve_pair(&mut wall, &mut hard, &contact, &Tuning::default()).unwrap();

        let (mut wall2, mut soft) = make();
        let tuning = Tuning {
            fixed_mass: FixedMass::Finite,
            ..Tuning::default()
        };
        resolve_pair(&mut wall2, &mut soft, &contact, &tuning).unwrap();

        // Infinite mass stops the mover dead; a finite anchor only halves its speed
        assert!(hard.vel.x.abs() < 1e-5);
        assert!((soft.vel.x + 2.0).abs() < 1e-5);
        assert_eq!(wall2.pos, Vec2::new(50.0, 50.0));
    }

    #[test]
    fn test_finite_anchor_nudges_mover_by_half() {
        let mut wall = ball(1, 50.0, 50.0).with_mass(5.0).fixed();
        let mut mover = ball(2, 65.0, 50.0).with_velocity(Vec2::new(-3.0, 0.0));
        let contact = circle_contact(wall.pos, wall.radius, mover.pos, mover.radius);
        let tuning = Tuning {
            fixed_mass: FixedMass::Finite,
            ..Tuning::default()
        };

        resolve_pair(&mut wall, &mut mover, &contact, &tuning).unwrap();
        assert_eq!(wall.pos, Vec2::new(50.0, 50.0));
        assert!((mover.pos.x - 65.5).abs() < 1e-4);
    }

    #[test]
    fn test_unequal_masses_share_nudge_equally() {
        let mut light = ball(1, 40.0, 50.0).with_mass(1.0).with_velocity(Vec2::new(1.0, 0.0));
        let mut heavy = ball(2, 55.0, 50.0).with_mass(4.0);
        let contact = circle_contact(light.pos, light.radius, heavy.pos, heavy.radius);

        resolve_pair(&mut light, &mut heavy, &contact, &Tuning::default()).unwrap();
        // 5 unit overlap, 20% resolved, 0.5 each way
        assert!((light.pos.x - 39.5).abs() < 1e-4);
        assert!((heavy.pos.x - 55.5).abs() < 1e-4);
    }

    #[test]
    fn test_coincident_centers_skip_response() {
        let mut a = ball(1, 40.0, 40.0).with_velocity(Vec2::new(1.0, 0.0));
        let mut b = ball(2, 40.0, 40.0);
        let contact = circle_contact(a.pos, a.radius, b.pos, b.radius);
        assert!(contact.hit);
        assert!(resolve_pair(&mut a, &mut b, &contact, &Tuning::default()).is_none());
    }

    /// A body pushed past the left wall with the given incoming velocity
    fn past_left_wall(restitution: f32, vx: f32, vy: f32) -> Body {
        ball(1, 8.0, 50.0)
            .with_restitution(restitution)
            .with_velocity(Vec2::new(vx, vy))
    }

    proptest! {
        #[test]
        fn prop_wall_never_adds_energy(
            restitution in 0.0f32..=1.0,
            vx in -15.0f32..-0.5,
            vy in -15.0f32..15.0,
        ) {
            let mut body = past_left_wall(restitution, vx, vy);
            let before = body.vel.length_squared();
            prop_assert!(resolve_boundary(&mut body));
            prop_assert!(body.vel.length_squared() <= before + 1e-4);
            prop_assert!(body.vel.x >= 0.0);
        }

        #[test]
        fn prop_bouncy_wall_adds_energy(
            restitution in 1.01f32..=1.5,
            vx in -15.0f32..-0.5,
            vy in -15.0f32..15.0,
        ) {
            let mut body = past_left_wall(restitution, vx, vy);
            let before = body.vel.length_squared();
            prop_assert!(resolve_boundary(&mut body));
            prop_assert!(body.vel.length_squared() > before);
            prop_assert_eq!(body.pos.x, body.radius);
        }
    }
}
