//! Angle and line helpers shared by every placement stage.
//!
//! Angles are degrees measured from the leftmost point of the pie and grow
//! clockwise on screen, so 90 is the top apex and 270 the bottom apex.

pub fn to_radians(degrees: f32) -> f32 {
    degrees * std::f32::consts::PI / 180.0
}

pub fn to_degrees(radians: f32) -> f32 {
    radians * 180.0 / std::f32::consts::PI
}

pub fn normalize_angle(angle: f32) -> f32 {
    let normalized = angle.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if normalized >= 360.0 { 0.0 } else { normalized }
}

/// Rotates `point` around `center`, clockwise on screen for positive angles.
pub fn rotate(point: (f32, f32), center: (f32, f32), angle: f32) -> (f32, f32) {
    let radians = to_radians(angle);
    let (sin, cos) = radians.sin_cos();
    let dx = point.0 - center.0;
    let dy = point.1 - center.1;
    (
        center.0 + dx * cos - dy * sin,
        center.1 + dx * sin + dy * cos,
    )
}

/// Point on a circle of `radius` around `center` at `angle`.
pub fn point_on_circle(center: (f32, f32), radius: f32, angle: f32) -> (f32, f32) {
    rotate((center.0 - radius, center.1), center, angle)
}

/// Angle of `point` as seen from `center`, in `[0, 360)`.
pub fn point_angle(point: (f32, f32), center: (f32, f32)) -> f32 {
    let dx = point.0 - center.0;
    let dy = point.1 - center.1;
    if dx == 0.0 && dy == 0.0 {
        return 0.0;
    }
    normalize_angle(to_degrees((-dy).atan2(-dx)))
}

/// Intersection of the two infinite lines through `ab` and `cd`.
///
/// Returns `None` when the lines are parallel (or degenerate).
pub fn compute_intersection(ab: [(f32, f32); 2], cd: [(f32, f32); 2]) -> Option<(f32, f32)> {
    let [(x1, y1), (x2, y2)] = ab;
    let [(x3, y3), (x4, y4)] = cd;
    let denominator = (y4 - y3) * (x2 - x1) - (x4 - x3) * (y2 - y1);
    if denominator.abs() < 1e-9 {
        return None;
    }
    let ua = ((x4 - x3) * (y1 - y3) - (y4 - y3) * (x1 - x3)) / denominator;
    let point = (x1 + ua * (x2 - x1), y1 + ua * (y2 - y1));
    if point.0.is_finite() && point.1.is_finite() {
        Some(point)
    } else {
        None
    }
}

fn range_bound(angle: f32) -> f32 {
    if (0.0..=360.0).contains(&angle) {
        angle
    } else {
        normalize_angle(angle)
    }
}

/// Half-open circular membership: `low <= angle < high`.
pub fn between(low: f32, angle: f32, high: f32) -> bool {
    let low = range_bound(low);
    let high = range_bound(high);
    let angle = normalize_angle(angle);
    if low <= high {
        low <= angle && angle < high
    } else {
        angle >= low || angle < high
    }
}

/// Closed circular membership: `low <= angle <= high`.
pub fn inclusive_between(low: f32, angle: f32, high: f32) -> bool {
    let low = range_bound(low);
    let high = range_bound(high);
    let angle = normalize_angle(angle);
    if low <= high {
        low <= angle && angle <= high
    } else {
        angle >= low || angle <= high
    }
}

/// Unsigned angle in degrees between two vectors; zero-length vectors yield 0.
pub fn angle_between_vectors(a: (f32, f32), b: (f32, f32)) -> f32 {
    let len_a = (a.0 * a.0 + a.1 * a.1).sqrt();
    let len_b = (b.0 * b.0 + b.1 * b.1).sqrt();
    if len_a <= f32::EPSILON || len_b <= f32::EPSILON {
        return 0.0;
    }
    let cos = ((a.0 * b.0 + a.1 * b.1) / (len_a * len_b)).clamp(-1.0, 1.0);
    to_degrees(cos.acos())
}

pub fn within_radius(point: (f32, f32), center: (f32, f32), radius: f32) -> bool {
    let dx = point.0 - center.0;
    let dy = point.1 - center.1;
    dx * dx + dy * dy <= radius * radius
}
