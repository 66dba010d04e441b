//! Steering behaviors: seek, circle and separation.
//!
//! The free functions are pure and work on plain positions so they can be
//! driven from a position snapshot. [`SteeringController`] owns the
//! per-agent movement state (velocity, facing and the orbit constants rolled
//! once at spawn).

use horde_common::math::{direction_to, perpendicular, random_in_disk, DIRECTION_EPSILON};
use horde_common::Vec2;
use serde::{Deserialize, Serialize};

/// Seek: velocity toward `target` at `speed`.
#[must_use]
pub fn seek(position: Vec2, target: Vec2, speed: f32) -> Vec2 {
    if speed <= 0.0 {
        return Vec2::ZERO;
    }
    direction_to(position, target) * speed
}

/// Parameters of the circle behavior.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircleParams {
    /// Distance from the target the orbit point sits at
    pub radius: f32,
    /// Strength of the tangential term
    pub speed: f32,
}

/// Unnormalized circle direction around `target`.
///
/// Seeks a point offset from the target along the perpendicular of the seek
/// direction and adds a tangential push. Both use the agent's fixed
/// rotation sign so the orbit never reverses.
#[must_use]
pub fn circle_direction(
    position: Vec2,
    target: Vec2,
    params: CircleParams,
    traits: OrbitTraits,
) -> Vec2 {
    let dir = direction_to(position, target);
    let side = perpendicular(dir) * traits.rotation_sign;
    let orbit_point = target + side * params.radius;
    let toward_orbit = direction_to(position, orbit_point);
    toward_orbit + side * params.speed * traits.offset_multiplier
}

/// Separation: unit repulsion away from `neighbors`, or zero.
///
/// Each neighbour contributes `away / max(distance, min_distance)`. The sum
/// is scaled by `strength` and normalized so crowd density never lets it
/// outweigh the primary behavior.
#[must_use]
pub fn separation<I>(position: Vec2, neighbors: I, strength: f32, min_distance: f32) -> Vec2
where
    I: IntoIterator<Item = Vec2>,
{
    if strength <= 0.0 {
        return Vec2::ZERO;
    }
    let floor = min_distance.max(f32::EPSILON);
    let force = neighbors.into_iter().fold(Vec2::ZERO, |acc, other| {
        let away = direction_to(other, position);
        acc + away * (strength / position.distance(other).max(floor))
    });
    if force.length() < DIRECTION_EPSILON {
        Vec2::ZERO
    } else {
        force.normalize()
    }
}

/// Blends a primary direction with a separation term and rescales to `speed`.
#[must_use]
pub fn blend(primary: Vec2, separation: Vec2, speed: f32) -> Vec2 {
    let combined = primary + separation;
    if speed <= 0.0 || combined.length() < DIRECTION_EPSILON {
        Vec2::ZERO
    } else {
        combined.normalize() * speed
    }
}

/// True iff `position` is within `threshold` of `point`.
#[must_use]
pub fn is_at_target(position: Vec2, point: Vec2, threshold: f32) -> bool {
    position.distance(point) <= threshold
}

/// Fresh patrol waypoint inside a disk of `patrol_range` around `position`.
#[must_use]
pub fn patrol_waypoint(rng: &mut fastrand::Rng, position: Vec2, patrol_range: f32) -> Vec2 {
    random_in_disk(rng, position, patrol_range)
}

/// Horizontal facing used by the presentation layer to flip sprites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Facing {
    /// Facing +x
    #[default]
    Right,
    /// Facing -x
    Left,
}

impl Facing {
    /// +1 for right, -1 for left.
    #[must_use]
    pub const fn sign(self) -> f32 {
        match self {
            Self::Right => 1.0,
            Self::Left => -1.0,
        }
    }

    /// Facing after moving with `velocity`. Unchanged when `velocity.x` is 0.
    #[must_use]
    pub fn after(self, velocity: Vec2) -> Self {
        if velocity.x > 0.0 {
            Self::Right
        } else if velocity.x < 0.0 {
            Self::Left
        } else {
            self
        }
    }
}

/// Per-agent orbit constants, rolled once at spawn.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrbitTraits {
    /// +1 or -1
    pub rotation_sign: f32,
    /// Multiplier on the tangential term, in `[1 - jitter, 1 + jitter]`
    pub offset_multiplier: f32,
}

impl Default for OrbitTraits {
    fn default() -> Self {
        Self {
            rotation_sign: 1.0,
            offset_multiplier: 1.0,
        }
    }
}

impl OrbitTraits {
    /// Rolls the traits from `rng`.
    pub fn roll(rng: &mut fastrand::Rng, jitter: f32) -> Self {
        let rotation_sign = if rng.bool() { 1.0 } else { -1.0 };
        let jitter = jitter.clamp(0.0, 1.0);
        let offset_multiplier = 1.0 - jitter + rng.f32() * 2.0 * jitter;
        Self {
            rotation_sign,
            offset_multiplier,
        }
    }
}

/// Movement state of one agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SteeringController {
    velocity: Vec2,
    speed: f32,
    facing: Facing,
    traits: OrbitTraits,
}

impl SteeringController {
    /// Creates a stationary controller.
    #[must_use]
    pub fn new(speed: f32, traits: OrbitTraits) -> Self {
        Self {
            velocity: Vec2::ZERO,
            speed: speed.max(0.0),
            facing: Facing::default(),
            traits,
        }
    }

    /// Current velocity.
    #[must_use]
    pub const fn velocity(&self) -> Vec2 {
        self.velocity
    }

    /// Configured speed.
    #[must_use]
    pub const fn speed(&self) -> f32 {
        self.speed
    }

    /// Current facing.
    #[must_use]
    pub const fn facing(&self) -> Facing {
        self.facing
    }

    /// Orbit constants.
    #[must_use]
    pub const fn traits(&self) -> OrbitTraits {
        self.traits
    }

    /// Changes the configured speed. Negative values are clamped to zero.
    pub fn set_speed(&mut self, speed: f32) {
        self.speed = speed.max(0.0);
    }

    /// Sets the velocity directly and updates facing.
    pub fn set_velocity(&mut self, velocity: Vec2) {
        self.velocity = velocity;
        self.facing = self.facing.after(velocity);
    }

    /// Moves along `direction` at the configured speed.
    pub fn move_in_direction(&mut self, direction: Vec2) {
        let velocity = if direction.length() < DIRECTION_EPSILON {
            Vec2::ZERO
        } else {
            direction.normalize() * self.speed
        };
        self.set_velocity(velocity);
    }

    /// Zeroes velocity. Facing is kept.
    pub fn stop_movement(&mut self) {
        self.velocity = Vec2::ZERO;
    }

    /// Seeks `target`, blended with `separation`.
    pub fn steer_toward(&mut self, position: Vec2, target: Vec2, separation: Vec2) {
        let primary = direction_to(position, target);
        self.set_velocity(blend(primary, separation, self.speed));
    }

    /// Circles `target`, blended with `separation`.
    pub fn steer_around(
        &mut self,
        position: Vec2,
        target: Vec2,
        params: CircleParams,
        separation: Vec2,
    ) {
        let primary = circle_direction(position, target, params, self.traits);
        self.set_velocity(blend(primary, separation, self.speed));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Vec2, b: Vec2) -> bool {
        (a - b).length() < 1.0e-4
    }

    #[test]
    fn test_seek_scales_to_speed() {
        let v = seek(Vec2::ZERO, Vec2::new(10.0, 0.0), 2.0);
        assert!(approx(v, Vec2::new(2.0, 0.0)));
        assert_eq!(seek(Vec2::ZERO, Vec2::ONE, 0.0), Vec2::ZERO);
        assert_eq!(seek(Vec2::ONE, Vec2::ONE, 3.0), Vec2::ZERO);
    }

    #[test]
    fn test_separation_points_away() {
        let force = separation(Vec2::ZERO, [Vec2::new(0.5, 0.0)], 2.0, 0.1);
        assert!(approx(force, Vec2::new(-1.0, 0.0)));
    }

    #[test]
    fn test_separation_is_normalized_in_crowds() {
        let crowd: Vec<Vec2> = (0..50).map(|i| Vec2::new(0.01 * i as f32 + 0.01, 0.0)).collect();
        let force = separation(Vec2::ZERO, crowd, 10.0, 0.1);
        assert!((force.length() - 1.0).abs() < 1.0e-4);
    }

    #[test]
    fn test_separation_closer_neighbor_dominates() {
        let force = separation(
            Vec2::ZERO,
            [Vec2::new(0.2, 0.0), Vec2::new(0.0, 0.9)],
            1.0,
            0.1,
        );
        assert!(force.x < 0.0);
        assert!(force.x.abs() > force.y.abs());
    }

    #[test]
    fn test_separation_zero_strength_or_empty() {
        assert_eq!(separation(Vec2::ZERO, [Vec2::X], 0.0, 0.1), Vec2::ZERO);
        assert_eq!(separation(Vec2::ZERO, std::iter::empty(), 2.0, 0.1), Vec2::ZERO);
    }

    #[test]
    fn test_separation_symmetric_neighbors_cancel() {
        let force = separation(Vec2::ZERO, [Vec2::X, -Vec2::X], 2.0, 0.1);
        assert_eq!(force, Vec2::ZERO);
    }

    #[test]
    fn test_blend_rescales() {
        let v = blend(Vec2::X, Vec2::Y, 3.0);
        assert!((v.length() - 3.0).abs() < 1.0e-4);
        assert_eq!(blend(Vec2::X, -Vec2::X, 3.0), Vec2::ZERO);
    }

    #[test]
    fn test_circle_direction_respects_rotation_sign() {
        let params = CircleParams {
            radius: 1.5,
            speed: 1.0,
        };
        let position = Vec2::new(-3.0, 0.0);
        let ccw = circle_direction(position, Vec2::ZERO, params, OrbitTraits::default());
        let cw = circle_direction(
            position,
            Vec2::ZERO,
            params,
            OrbitTraits {
                rotation_sign: -1.0,
                offset_multiplier: 1.0,
            },
        );
        assert!(ccw.y > 0.0);
        assert!(cw.y < 0.0);
        assert!(ccw.x > 0.0 && cw.x > 0.0);
    }

    #[test]
    fn test_orbit_traits_roll_is_seeded() {
        let a = OrbitTraits::roll(&mut fastrand::Rng::with_seed(9), 0.2);
        let b = OrbitTraits::roll(&mut fastrand::Rng::with_seed(9), 0.2);
        assert_eq!(a, b);
        assert!(a.rotation_sign == 1.0 || a.rotation_sign == -1.0);
        assert!(a.offset_multiplier >= 0.8 && a.offset_multiplier <= 1.2);
    }

    #[test]
    fn test_is_at_target_inclusive() {
        assert!(is_at_target(Vec2::ZERO, Vec2::new(0.1, 0.0), 0.1));
        assert!(!is_at_target(Vec2::ZERO, Vec2::new(0.2, 0.0), 0.1));
    }

    #[test]
    fn test_patrol_waypoint_within_range() {
        let mut rng = fastrand::Rng::with_seed(1);
        let origin = Vec2::new(4.0, 4.0);
        for _ in 0..100 {
            assert!(patrol_waypoint(&mut rng, origin, 5.0).distance(origin) <= 5.0 + 1.0e-4);
        }
    }

    #[test]
    fn test_facing_holds_on_zero_x() {
        let mut controller = SteeringController::new(2.0, OrbitTraits::default());
        controller.move_in_direction(-Vec2::X);
        assert_eq!(controller.facing(), Facing::Left);
        controller.move_in_direction(Vec2::Y);
        assert_eq!(controller.facing(), Facing::Left);
        controller.stop_movement();
        assert_eq!(controller.facing(), Facing::Left);
        assert_eq!(controller.velocity(), Vec2::ZERO);
        controller.move_in_direction(Vec2::new(1.0, 1.0));
        assert_eq!(controller.facing(), Facing::Right);
        assert_eq!(controller.facing().sign(), 1.0);
    }

    #[test]
    fn test_move_in_direction_normalizes() {
        let mut controller = SteeringController::new(4.0, OrbitTraits::default());
        controller.move_in_direction(Vec2::new(0.0, 10.0));
        assert!(approx(controller.velocity(), Vec2::new(0.0, 4.0)));
        controller.move_in_direction(Vec2::ZERO);
        assert_eq!(controller.velocity(), Vec2::ZERO);
    }

    #[test]
    fn test_steer_toward_with_separation_keeps_speed() {
        let mut controller = SteeringController::new(2.0, OrbitTraits::default());
        controller.steer_toward(Vec2::ZERO, Vec2::new(10.0, 0.0), Vec2::Y);
        assert!((controller.velocity().length() - 2.0).abs() < 1.0e-4);
        assert!(controller.velocity().y > 0.0);
    }
}
