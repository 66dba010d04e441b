//! 2D vector helpers on top of `glam::Vec2`.

pub use glam::Vec2;
use std::f32::consts::TAU;

/// Distances below this are treated as "same point" when deriving directions.
pub const DIRECTION_EPSILON: f32 = 1.0e-4;

/// Returns `v` rotated a quarter turn counter-clockwise.
#[must_use]
pub fn perpendicular(v: Vec2) -> Vec2 {
    Vec2::new(-v.y, v.x)
}

/// Unit vector from `from` toward `to`, or zero when the points coincide.
#[must_use]
pub fn direction_to(from: Vec2, to: Vec2) -> Vec2 {
    let delta = to - from;
    if delta.length() < DIRECTION_EPSILON {
        Vec2::ZERO
    } else {
        delta.normalize()
    }
}

/// Uniformly distributed point inside a disk of `radius` around `center`.
#[must_use]
pub fn random_in_disk(rng: &mut fastrand::Rng, center: Vec2, radius: f32) -> Vec2 {
    let radius = radius.max(0.0);
    // sqrt keeps the density uniform over the area, not the radius
    let r = radius * rng.f32().sqrt();
    let theta = rng.f32() * TAU;
    center + Vec2::new(theta.cos(), theta.sin()) * r
}

/// Uniformly distributed point on the circle of `radius` around `center`.
#[must_use]
pub fn random_on_circle(rng: &mut fastrand::Rng, center: Vec2, radius: f32) -> Vec2 {
    let theta = rng.f32() * TAU;
    center + Vec2::new(theta.cos(), theta.sin()) * radius.max(0.0)
}
