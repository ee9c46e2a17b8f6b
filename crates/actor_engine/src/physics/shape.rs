//! Fixture shapes and narrow-phase tests
//!
//! Boxes are axis-aligned: body rotation does not rotate box fixtures.

use crate::foundation::math::Vec2;

/// Fixture geometry, centered on its body
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    /// Axis-aligned box given by half extents
    Box {
        /// Half width and half height
        half_extents: Vec2,
    },
    /// Circle
    Circle {
        /// Radius
        radius: f32,
    },
}

impl Shape {
    /// Box of the given full width and height
    pub fn rect(width: f32, height: f32) -> Self {
        Self::Box {
            half_extents: Vec2::new(width * 0.5, height * 0.5),
        }
    }

    /// Circle of the given radius
    pub fn circle(radius: f32) -> Self {
        Self::Circle { radius }
    }

    /// Area used for mass computation
    pub fn area(&self) -> f32 {
        match self {
            Self::Box { half_extents } => 4.0 * half_extents.x * half_extents.y,
            Self::Circle { radius } => std::f32::consts::PI * radius * radius,
        }
    }
}

/// Contact geometry between two overlapping shapes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Manifold {
    /// World-space contact point
    pub point: Vec2,
    /// Unit normal pointing from the first shape toward the second
    pub normal: Vec2,
    /// Penetration depth along the normal
    pub depth: f32,
}

impl Manifold {
    fn flipped(self) -> Self {
        Self {
            normal: -self.normal,
            ..self
        }
    }
}

/// Test two positioned shapes for overlap
pub fn collide(a: &Shape, pos_a: Vec2, b: &Shape, pos_b: Vec2) -> Option<Manifold> {
    match (a, b) {
        (Shape::Circle { radius: ra }, Shape::Circle { radius: rb }) => {
            circle_circle(pos_a, *ra, pos_b, *rb)
        }
        (Shape::Box { half_extents: ha }, Shape::Box { half_extents: hb }) => {
            box_box(pos_a, *ha, pos_b, *hb)
        }
        (Shape::Box { half_extents }, Shape::Circle { radius }) => {
            box_circle(pos_a, *half_extents, pos_b, *radius)
        }
        (Shape::Circle { radius }, Shape::Box { half_extents }) => {
            box_circle(pos_b, *half_extents, pos_a, *radius).map(Manifold::flipped)
        }
    }
}

fn circle_circle(pos_a: Vec2, ra: f32, pos_b: Vec2, rb: f32) -> Option<Manifold> {
    let delta = pos_b - pos_a;
    let distance = delta.norm();
    let radius_sum = ra + rb;
    if distance >= radius_sum {
        return None;
    }

    // Concentric circles get an arbitrary but stable normal
    let normal = if distance > f32::EPSILON {
        delta / distance
    } else {
        Vec2::new(0.0, 1.0)
    };

    Some(Manifold {
        point: pos_a + normal * ra,
        normal,
        depth: radius_sum - distance,
    })
}

fn box_box(pos_a: Vec2, ha: Vec2, pos_b: Vec2, hb: Vec2) -> Option<Manifold> {
    let delta = pos_b - pos_a;
    let overlap_x = (ha.x + hb.x) - delta.x.abs();
    let overlap_y = (ha.y + hb.y) - delta.y.abs();
    if overlap_x <= 0.0 || overlap_y <= 0.0 {
        return None;
    }

    // Center of the intersection rectangle
    let min = Vec2::new((pos_a.x - ha.x).max(pos_b.x - hb.x), (pos_a.y - ha.y).max(pos_b.y - hb.y));
    let max = Vec2::new((pos_a.x + ha.x).min(pos_b.x + hb.x), (pos_a.y + ha.y).min(pos_b.y + hb.y));
    let point = (min + max) * 0.5;

    // Separate along the axis of least penetration
    let (normal, depth) = if overlap_x < overlap_y {
        (Vec2::new(delta.x.signum(), 0.0), overlap_x)
    } else {
        (Vec2::new(0.0, if delta.y < 0.0 { -1.0 } else { 1.0 }), overlap_y)
    };

    Some(Manifold { point, normal, depth })
}

fn box_circle(box_pos: Vec2, half: Vec2, circle_pos: Vec2, radius: f32) -> Option<Manifold> {
    let local = circle_pos - box_pos;
    let clamped = Vec2::new(local.x.clamp(-half.x, half.x), local.y.clamp(-half.y, half.y));
    let inside = clamped == local;

    if !inside {
        let offset = local - clamped;
        let distance = offset.norm();
        if distance >= radius {
            return None;
        }
        return Some(Manifold {
            point: box_pos + clamped,
            normal: offset / distance,
            depth: radius - distance,
        });
    }

    // Circle center inside the box: push out through the nearest face
    let to_face_x = half.x - local.x.abs();
    let to_face_y = half.y - local.y.abs();
    let (normal, depth, face_point) = if to_face_x < to_face_y {
        let sign = if local.x < 0.0 { -1.0 } else { 1.0 };
        (Vec2::new(sign, 0.0), to_face_x + radius, Vec2::new(sign * half.x, local.y))
    } else {
        let sign = if local.y < 0.0 { -1.0 } else { 1.0 };
        (Vec2::new(0.0, sign), to_face_y + radius, Vec2::new(local.x, sign * half.y))
    };

    Some(Manifold {
        point: box_pos + face_point,
        normal,
        depth,
    })
}

/// Segment from `start` to `end` used for ray queries
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    /// Start point
    pub start: Vec2,
    /// End point
    pub end: Vec2,
}

/// Hit along a ray: fraction of the segment, point and surface normal
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// Position along the segment in `[0, 1]`
    pub fraction: f32,
    /// World-space hit point
    pub point: Vec2,
    /// Surface normal at the hit point
    pub normal: Vec2,
}

impl Ray {
    /// Create a ray from `start` to `end`
    pub fn new(start: Vec2, end: Vec2) -> Self {
        Self { start, end }
    }

    /// Point at fraction `t` of the segment
    pub fn point_at(&self, t: f32) -> Vec2 {
        self.start + (self.end - self.start) * t
    }

    /// Cast against a positioned shape; rays starting inside a shape report no hit
    pub fn cast(&self, shape: &Shape, position: Vec2) -> Option<RayHit> {
        match shape {
            Shape::Circle { radius } => self.cast_circle(position, *radius),
            Shape::Box { half_extents } => self.cast_box(position, *half_extents),
        }
    }

    fn cast_circle(&self, center: Vec2, radius: f32) -> Option<RayHit> {
        let d = self.end - self.start;
        let oc = self.start - center;

        // Solve |start + t*d - center|^2 = radius^2
        let a = d.dot(&d);
        let c = oc.dot(&oc) - radius * radius;
        if a <= f32::EPSILON || c < 0.0 {
            return None;
        }
        let b = 2.0 * oc.dot(&d);
        let discriminant = b * b - 4.0 * a * c;
        if discriminant < 0.0 {
            return None;
        }

        let t = (-b - discriminant.sqrt()) / (2.0 * a);
        if !(0.0..=1.0).contains(&t) {
            return None;
        }

        let point = self.point_at(t);
        Some(RayHit {
            fraction: t,
            point,
            normal: (point - center) / radius,
        })
    }

    fn cast_box(&self, center: Vec2, half: Vec2) -> Option<RayHit> {
        let d = self.end - self.start;
        let min = center - half;
        let max = center + half;

        let mut lower = 0.0_f32;
        let mut upper = 1.0_f32;
        let mut normal = None;

        // Slab test per axis
        for axis in 0..2 {
            let origin = self.start[axis];
            if d[axis].abs() <= f32::EPSILON {
                if origin < min[axis] || origin > max[axis] {
                    return None;
                }
                continue;
            }

            let inv = 1.0 / d[axis];
            let mut t1 = (min[axis] - origin) * inv;
            let mut t2 = (max[axis] - origin) * inv;
            let mut sign = -1.0;
            if t1 > t2 {
                std::mem::swap(&mut t1, &mut t2);
                sign = 1.0;
            }

            if t1 > lower {
                lower = t1;
                let mut n = Vec2::zeros();
                n[axis] = sign;
                normal = Some(n);
            }
            upper = upper.min(t2);
            if lower > upper {
                return None;
            }
        }

        // No entering face means the ray starts inside the box
        normal.map(|normal| RayHit {
            fraction: lower,
            point: self.point_at(lower),
            normal,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_circles_overlap_with_normal_from_a_to_b() {
        let m = collide(&Shape::circle(1.0), Vec2::zeros(), &Shape::circle(1.0), Vec2::new(1.5, 0.0)).unwrap();
        assert_relative_eq!(m.normal.x, 1.0);
        assert_relative_eq!(m.depth, 0.5);
        assert_relative_eq!(m.point.x, 1.0);
    }

    #[test]
    fn test_separated_shapes_do_not_collide() {
        assert!(collide(&Shape::rect(1.0, 1.0), Vec2::zeros(), &Shape::rect(1.0, 1.0), Vec2::new(2.0, 0.0)).is_none());
        assert!(collide(&Shape::rect(1.0, 1.0), Vec2::zeros(), &Shape::circle(0.5), Vec2::new(0.0, 1.5)).is_none());
    }

    #[test]
    fn test_box_box_uses_axis_of_least_penetration() {
        let m = collide(&Shape::rect(2.0, 2.0), Vec2::zeros(), &Shape::rect(2.0, 2.0), Vec2::new(0.5, 1.8)).unwrap();
        assert_relative_eq!(m.normal.y, 1.0);
        assert_relative_eq!(m.normal.x, 0.0);
        assert_relative_eq!(m.depth, 0.2, epsilon = 1e-5);
    }

    #[test]
    fn test_circle_box_normal_is_flipped_for_circle_first() {
        let box_first = collide(&Shape::rect(2.0, 2.0), Vec2::zeros(), &Shape::circle(0.5), Vec2::new(0.0, 1.2)).unwrap();
        let circle_first = collide(&Shape::circle(0.5), Vec2::new(0.0, 1.2), &Shape::rect(2.0, 2.0), Vec2::zeros()).unwrap();
        assert_relative_eq!(box_first.normal.y, 1.0);
        assert_relative_eq!(circle_first.normal.y, -1.0);
    }

    #[test]
    fn test_ray_hits_box_face() {
        let ray = Ray::new(Vec2::new(-5.0, 0.0), Vec2::new(5.0, 0.0));
        let hit = ray.cast(&Shape::rect(2.0, 2.0), Vec2::zeros()).unwrap();
        assert_relative_eq!(hit.point.x, -1.0, epsilon = 1e-5);
        assert_relative_eq!(hit.normal.x, -1.0);
        assert_relative_eq!(hit.fraction, 0.4, epsilon = 1e-5);
    }

    #[test]
    fn test_ray_hits_circle_and_misses_when_short() {
        let shape = Shape::circle(1.0);
        let hit = Ray::new(Vec2::new(0.0, -5.0), Vec2::new(0.0, 5.0)).cast(&shape, Vec2::zeros()).unwrap();
        assert_relative_eq!(hit.point.y, -1.0, epsilon = 1e-5);
        assert_relative_eq!(hit.normal.y, -1.0, epsilon = 1e-5);

        assert!(Ray::new(Vec2::new(0.0, -5.0), Vec2::new(0.0, -3.0)).cast(&shape, Vec2::zeros()).is_none());
    }

    #[test]
    fn test_ray_starting_inside_reports_nothing() {
        let ray = Ray::new(Vec2::zeros(), Vec2::new(3.0, 0.0));
        assert!(ray.cast(&Shape::rect(2.0, 2.0), Vec2::zeros()).is_none());
        assert!(ray.cast(&Shape::circle(1.0), Vec2::zeros()).is_none());
    }
}
