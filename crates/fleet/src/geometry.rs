//! Heading and distance helpers.
//!
//! Headings are degrees in `[0, 360)`, measured counter-clockwise from the
//! positive x axis, so `(0,0) -> (0,10)` is 90°. The game server measures
//! headings in the opposite sense; [`to_server_heading`] converts.

use protocol::Position;

/// Heading from `from` towards `to`, in `[0, 360)`.
#[inline]
pub fn heading_to(from: Position, to: Position) -> f64 {
    let delta = to - from;
    normalize_degrees(delta.y.atan2(delta.x).to_degrees())
}

/// Euclidean distance between two points.
#[inline]
pub fn distance(a: Position, b: Position) -> f64 {
    a.distance(b)
}

/// Wrap any angle into `[0, 360)`.
#[inline]
pub fn normalize_degrees(degrees: f64) -> f64 {
    let wrapped = degrees.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if wrapped >= 360.0 { 0.0 } else { wrapped }
}

/// Convert a heading from [`heading_to`] into the server's convention.
#[inline]
pub fn to_server_heading(heading: f64) -> f64 {
    normalize_degrees(360.0 - heading)
}

/// Point at `radius` from `base` for a clock-style angle: 0° points to
/// negative y, increasing angles sweep towards positive x.
pub fn point_on_circle(base: Position, radius: f64, angle: f64) -> Position {
    let radians = angle.to_radians();
    base + Position::new(radians.sin() * radius, -radians.cos() * radius)
}
