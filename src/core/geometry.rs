//! Geometry kernel - pure functions shared by every renderer
//!
//! Bezier sampling, control-point derivation for curved links and
//! direction helpers. None of these guard against coincident points:
//! a zero-length segment produces NaN components and the caller decides
//! whether that matters.

use glam::Vec2;

/// Evaluate a quadratic Bezier curve at `t` in `[0, 1]`.
///
/// `B(t) = (1-t)²·P0 + 2(1-t)t·P1 + t²·P2`. The endpoints are exact:
/// `t = 0` returns `p0` and `t = 1` returns `p2` bit for bit.
#[inline]
pub fn sample_quadratic_bezier(p0: Vec2, p1: Vec2, p2: Vec2, t: f32) -> Vec2 {
    let dt = 1.0 - t;
    let dt_sq = dt * dt;
    let t_sq = t * t;
    let cross = 2.0 * dt * t;

    Vec2::new(
        dt_sq * p0.x + cross * p1.x + t_sq * p2.x,
        dt_sq * p0.y + cross * p1.y + t_sq * p2.y,
    )
}

/// Control point for a curved link of the given `level`.
///
/// The chord midpoint is pushed along the chord's perpendicular by
/// `|end - start| * curviness * ceil(level / 2)`. Odd levels bend to one
/// side, even levels to the other, so links sharing endpoints fan out in
/// alternating shells. Level 0 returns the midpoint.
pub fn compute_control_point(start: Vec2, end: Vec2, level: u32, curviness: f32) -> Vec2 {
    let chord = end - start;
    let mag = chord.length();
    let dir = chord / mag;
    let mid = (start + end) * 0.5;

    let multiplier = level.div_ceil(2) as f32;
    let mut offset = mag * curviness * multiplier;
    if level % 2 == 1 {
        offset = -offset;
    }

    Vec2::new(mid.x - dir.y * offset, mid.y + dir.x * offset)
}

/// Unit vector pointing from `from` to `to`. NaN when the points coincide.
#[inline]
pub fn normalized_direction(from: Vec2, to: Vec2) -> Vec2 {
    let dir = to - from;
    dir / dir.length()
}

/// Direction in which a quadratic curve arrives at its end point.
///
/// The derivative of the curve at `t = 1` is `2·(P2 - P1)`, so the exact
/// tangent is the direction from the control point to the end point.
/// Arrowheads and curved-link clipping both use this.
#[inline]
pub fn curve_end_tangent(control: Vec2, end: Vec2) -> Vec2 {
    normalized_direction(control, end)
}

/// Perpendicular of `dir`, rotated a quarter turn counter-clockwise.
#[inline]
pub fn perpendicular(dir: Vec2) -> Vec2 {
    Vec2::new(-dir.y, dir.x)
}

/// Move `point` back towards where `dir` came from by `distance`.
#[inline]
pub fn pull_back(point: Vec2, dir: Vec2, distance: f32) -> Vec2 {
    point - dir * distance
}

/// Evenly spaced curve parameters `k / segments` for `k = 0..=segments`.
///
/// The last entry is exactly `1.0` so the sampled polyline ends on the
/// curve's end point.
pub fn curve_parameters(segments: u32) -> Vec<f32> {
    (0..=segments)
        .map(|k| {
            if k == segments {
                1.0
            } else {
                k as f32 / segments as f32
            }
        })
        .collect()
}
