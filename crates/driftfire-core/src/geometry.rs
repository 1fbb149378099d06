//! Vector, angle, line-of-sight and weighted-random helpers.
//!
//! # Angle convention
//!
//! Angles are in degrees. A facing of `0°` points along `+Y` and positive
//! angles rotate counter-clockwise, so `90°` faces `-X`. All helpers in this
//! module share that convention; [`direction_from_angle`] and [`angle_of`]
//! are inverses of each other for non-zero vectors.

use glam::Vec2;
use rand::Rng;

/// Vectors shorter than this are treated as zero when normalizing or
/// computing angles.
pub const EPSILON: f32 = 1.0e-5;

/// Returns the unit direction for a facing angle in degrees.
///
/// # Example
///
/// ```
/// use driftfire_core::geometry::direction_from_angle;
///
/// let up = direction_from_angle(0.0);
/// assert!((up.y - 1.0).abs() < 1e-6);
/// ```
#[must_use]
pub fn direction_from_angle(degrees: f32) -> Vec2 {
    let radians = degrees.to_radians();
    Vec2::new(-radians.sin(), radians.cos())
}

/// Returns the facing angle (degrees, in `(-180, 180]`) of a vector.
///
/// A zero vector yields `0.0`.
#[must_use]
pub fn angle_of(v: Vec2) -> f32 {
    if v.length_squared() < EPSILON * EPSILON {
        return 0.0;
    }
    (-v.x).atan2(v.y).to_degrees()
}

/// Wraps an angle into `(-180, 180]`.
#[must_use]
pub fn wrap_angle(degrees: f32) -> f32 {
    let mut wrapped = degrees.rem_euclid(360.0);
    if wrapped > 180.0 {
        wrapped -= 360.0;
    }
    wrapped
}

/// Shortest signed rotation (degrees, in `[-180, 180]`) that turns `from`
/// into `to`.
///
/// # Example
///
/// ```
/// use driftfire_core::geometry::delta_angle;
///
/// assert!((delta_angle(170.0, -170.0) - 20.0).abs() < 1e-4);
/// assert!((delta_angle(-170.0, 170.0) + 20.0).abs() < 1e-4);
/// ```
#[must_use]
pub fn delta_angle(from: f32, to: f32) -> f32 {
    wrap_angle(to - from)
}

/// Rotates a vector counter-clockwise by `degrees`.
#[must_use]
pub fn rotate(v: Vec2, degrees: f32) -> Vec2 {
    Vec2::from_angle(degrees.to_radians()).rotate(v)
}

/// Clamps the length of `v` to at most `max`.
#[must_use]
pub fn clamp_magnitude(v: Vec2, max: f32) -> Vec2 {
    let len = v.length();
    if len > max && len > EPSILON {
        v * (max / len)
    } else {
        v
    }
}

/// Closest approach between a moving point and a stationary one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Approach {
    /// Time until the moving point is nearest (seconds, never negative).
    pub time: f32,
    /// Vector from the closest point on the pass line to the stationary point.
    pub miss: Vec2,
}

/// Computes when and how closely a point at `origin` moving with `velocity`
/// passes `target`.
///
/// Returns `None` when the point is not approaching (moving away or not
/// moving at all).
#[must_use]
pub fn closest_approach(origin: Vec2, velocity: Vec2, target: Vec2) -> Option<Approach> {
    let speed_sq = velocity.length_squared();
    if speed_sq < EPSILON * EPSILON {
        return None;
    }
    let to_target = target - origin;
    let along = to_target.dot(velocity);
    if along <= 0.0 {
        return None;
    }
    let time = along / speed_sq;
    let closest = origin + velocity * time;
    Some(Approach {
        time,
        miss: target - closest,
    })
}

/// Returns `true` if the segment `from → to` does not pass through any of the
/// given circles `(center, radius)`.
///
/// # Example
///
/// ```
/// use driftfire_core::geometry::has_line_of_sight;
/// use glam::Vec2;
///
/// let rock = [(Vec2::new(5.0, 0.0), 1.0)];
/// assert!(!has_line_of_sight(Vec2::ZERO, Vec2::new(10.0, 0.0), rock));
/// assert!(has_line_of_sight(Vec2::ZERO, Vec2::new(0.0, 10.0), rock));
/// ```
pub fn has_line_of_sight(
    from: Vec2,
    to: Vec2,
    blockers: impl IntoIterator<Item = (Vec2, f32)>,
) -> bool {
    let segment = to - from;
    let len_sq = segment.length_squared();
    blockers.into_iter().all(|(center, radius)| {
        let t = if len_sq < EPSILON {
            0.0
        } else {
            ((center - from).dot(segment) / len_sq).clamp(0.0, 1.0)
        };
        let nearest = from + segment * t;
        nearest.distance_squared(center) > radius * radius
    })
}

/// Picks an index with probability proportional to its weight.
///
/// Negative and non-finite weights count as zero. Weights whose sum would
/// overflow are rescaled by the largest one first. Returns `None` if there is
/// no positive weight to choose from.
pub fn weighted_random_index<R: Rng + ?Sized>(rng: &mut R, weights: &[f32]) -> Option<usize> {
    let sanitized = |w: f32| if w.is_finite() && w > 0.0 { w } else { 0.0 };
    let mut scale = 1.0;
    let mut total: f32 = weights.iter().copied().map(sanitized).sum();
    if !total.is_finite() {
        let largest = weights.iter().copied().map(sanitized).fold(0.0, f32::max);
        scale = largest.recip();
        total = weights.iter().map(|&w| sanitized(w) * scale).sum();
    }
    if total <= 0.0 {
        return None;
    }
    let mut roll = rng.gen_range(0.0..total);
    let mut last_positive = None;
    for (index, weight) in weights.iter().map(|&w| sanitized(w) * scale).enumerate() {
        if weight <= 0.0 {
            continue;
        }
        if roll < weight {
            return Some(index);
        }
        roll -= weight;
        last_positive = Some(index);
    }
    // Floating point leftovers land on the last positive weight.
    last_positive
}

/// Uniform random point inside a disc of `radius` around `center`.
pub fn random_point_in_disc<R: Rng + ?Sized>(rng: &mut R, center: Vec2, radius: f32) -> Vec2 {
    if radius <= 0.0 {
        return center;
    }
    let angle = rng.gen_range(0.0..360.0_f32);
    let distance = radius * rng.gen::<f32>().sqrt();
    center + direction_from_angle(angle) * distance
}
