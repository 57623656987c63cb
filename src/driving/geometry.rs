//! Heading and cone geometry shared by the hazard detector and monitors
//!
//! Pure functions, no state.

use super::types::Position;

/// Absolute difference between two headings in degrees, folded into [0, 180]
pub fn yaw_difference(yaw_a: f32, yaw_b: f32) -> f32 {
    let mut diff = (yaw_a - yaw_b) % 360.0;
    if diff < 0.0 {
        diff += 360.0;
    }
    if diff > 180.0 {
        diff = 360.0 - diff;
    }
    diff
}

/// Whether `target` lies inside the forward cone rooted at `origin`
///
/// The cone opens `half_angle` degrees to either side of `yaw` and reaches
/// `max_distance` units. A target closer than 1e-3 counts as inside
/// regardless of direction, so a degenerate zero-length vector never
/// produces an undefined angle.
pub fn is_within_distance_ahead(
    target: Position,
    origin: Position,
    yaw: f32,
    max_distance: f32,
    half_angle: f32,
) -> bool {
    let dx = target.x - origin.x;
    let dy = target.y - origin.y;
    let norm = (dx * dx + dy * dy).sqrt();

    if norm < 1e-3 {
        return true;
    }
    if norm > max_distance {
        return false;
    }

    let rad = yaw.to_radians();
    let cos_angle = ((dx * rad.cos() + dy * rad.sin()) / norm).clamp(-1.0, 1.0);
    cos_angle.acos().to_degrees() < half_angle
}

/// Signed heading change from `from` to `to` in degrees, folded into (-180, 180]
///
/// Positive is a counter-clockwise (left) turn.
pub fn signed_yaw_delta(to: f32, from: f32) -> f32 {
    let mut delta = (to - from) % 360.0;
    if delta > 180.0 {
        delta -= 360.0;
    } else if delta <= -180.0 {
        delta += 360.0;
    }
    delta
}

/// Half-angle of the pedestrian hazard cone for a walker at `distance`
///
/// Narrower at range, wider close up.
pub fn walker_cone_half_angle(distance: f32) -> f32 {
    162.0 / (distance.clamp(1.5, 10.5) + 0.3)
}

/// Perpendicular distance from `point` to the segment `a`-`b`, ground plane
pub fn point_to_segment_distance(point: Position, a: Position, b: Position) -> f32 {
    let seg_x = b.x - a.x;
    let seg_y = b.y - a.y;
    let len_sq = seg_x * seg_x + seg_y * seg_y;

    if len_sq < 1e-6 {
        return point.distance_2d(&a);
    }

    let t = (((point.x - a.x) * seg_x + (point.y - a.y) * seg_y) / len_sq).clamp(0.0, 1.0);
    let closest = Position::new(a.x + t * seg_x, a.y + t * seg_y, a.z);
    point.distance_2d(&closest)
}
