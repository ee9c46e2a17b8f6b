//! Math utilities and types
//!
//! Provides the 2D math types used by actors, physics and the camera.

pub use nalgebra::Vector2;

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// 2D point type
pub type Point2 = nalgebra::Point2<f32>;

/// Coordinate used for contact geometry that does not apply (trigger contacts, end events)
pub const NOT_APPLICABLE: f32 = -999.0;

/// Contact point/normal value meaning "no real contact geometry"
pub fn not_applicable() -> Vec2 {
    Vec2::new(NOT_APPLICABLE, NOT_APPLICABLE)
}

/// Convert clockwise degrees to radians
pub fn to_radians(degrees: f32) -> f32 {
    degrees.to_radians()
}

/// Convert radians to clockwise degrees
pub fn to_degrees(radians: f32) -> f32 {
    radians.to_degrees()
}

/// Direction an object faces when rotated by `angle` radians (y grows downward)
pub fn up_direction(angle: f32) -> Vec2 {
    Vec2::new(angle.sin(), -angle.cos())
}

/// Right-hand direction for an object rotated by `angle` radians
pub fn right_direction(angle: f32) -> Vec2 {
    Vec2::new(angle.cos(), angle.sin())
}

/// Angle (radians) whose up direction points along `direction`
pub fn angle_from_up(direction: Vec2) -> f32 {
    direction.x.atan2(-direction.y)
}

/// Normalize a vector, leaving the zero vector untouched
pub fn normalize_or_zero(v: Vec2) -> Vec2 {
    let length = v.norm();
    if length > f32::EPSILON {
        v / length
    } else {
        v
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_up_direction_at_rest_points_negative_y() {
        let up = up_direction(0.0);
        assert_relative_eq!(up.x, 0.0, epsilon = 1e-6);
        assert_relative_eq!(up.y, -1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_right_direction_is_perpendicular_to_up() {
        let angle = 0.7;
        let dot = up_direction(angle).dot(&right_direction(angle));
        assert_relative_eq!(dot, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_angle_from_up_inverts_up_direction() {
        let angle = 1.2;
        assert_relative_eq!(angle_from_up(up_direction(angle)), angle, epsilon = 1e-5);
    }

    #[test]
    fn test_normalize_or_zero() {
        assert_eq!(normalize_or_zero(Vec2::zeros()), Vec2::zeros());
        assert_relative_eq!(normalize_or_zero(Vec2::new(3.0, 4.0)).norm(), 1.0, epsilon = 1e-6);
    }
}
