use core::ops::{Add, Mul, Sub};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    #[inline]
    pub fn dot(self, other: Self) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    #[inline]
    pub fn length(self) -> f32 {
        self.dot(self).sqrt()
    }

    #[inline]
    pub fn distance(self, other: Self) -> f32 {
        (other - self).length()
    }

    /// Unit vector in the same direction, or zero for a degenerate input.
    pub fn normalized(self) -> Self {
        let len = self.length();
        if len <= f32::EPSILON {
            Self::ZERO
        } else {
            self * (1.0 / len)
        }
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    pub fn to_array(self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }
}

impl Add for Vec3 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f32> for Vec3 {
    type Output = Self;

    fn mul(self, rhs: f32) -> Self {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

/// Agent position plus heading around the vertical axis, in degrees.
///
/// Yaw 0 faces +z; positive yaw turns toward +x.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: Vec3,
    pub yaw_deg: f32,
}

impl Pose {
    pub fn new(position: Vec3, yaw_deg: f32) -> Self {
        Self { position, yaw_deg }
    }

    pub fn forward(&self) -> Vec3 {
        let yaw = self.yaw_deg.to_radians();
        Vec3::new(yaw.sin(), 0.0, yaw.cos())
    }

    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.yaw_deg.is_finite()
    }
}

/// Signed yaw change in degrees (-180, 180] needed to face `direction` from `yaw_deg`.
pub fn yaw_delta_to(yaw_deg: f32, direction: Vec3) -> f32 {
    if direction.x == 0.0 && direction.z == 0.0 {
        return 0.0;
    }
    let wanted = direction.x.atan2(direction.z).to_degrees();
    wrap_degrees(wanted - yaw_deg)
}

pub fn wrap_degrees(deg: f32) -> f32 {
    let mut out = deg % 360.0;
    if out > 180.0 {
        out -= 360.0;
    } else if out <= -180.0 {
        out += 360.0;
    }
    out
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sphere {
    pub center: Vec3,
    pub radius: f32,
}

impl Sphere {
    pub fn overlaps_sphere(&self, center: Vec3, radius: f32) -> bool {
        let reach = self.radius + radius;
        let d = center - self.center;
        d.dot(d) <= reach * reach
    }
}

/// Axis-aligned box used for walls.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn is_valid(&self) -> bool {
        self.min.is_finite()
            && self.max.is_finite()
            && self.min.x <= self.max.x
            && self.min.y <= self.max.y
            && self.min.z <= self.max.z
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn closest_point(&self, point: Vec3) -> Vec3 {
        Vec3::new(
            point.x.clamp(self.min.x, self.max.x),
            point.y.clamp(self.min.y, self.max.y),
            point.z.clamp(self.min.z, self.max.z),
        )
    }

    pub fn overlaps_sphere(&self, center: Vec3, radius: f32) -> bool {
        let d = center - self.closest_point(center);
        d.dot(d) <= radius * radius
    }
}

/// Distance along a unit ray to the first intersection with a sphere, if within `max_dist`.
pub fn ray_sphere(origin: Vec3, dir: Vec3, sphere: &Sphere, max_dist: f32) -> Option<f32> {
    let oc = origin - sphere.center;
    let b = oc.dot(dir);
    let c = oc.dot(oc) - sphere.radius * sphere.radius;
    if c > 0.0 && b > 0.0 {
        return None;
    }
    let disc = b * b - c;
    if disc < 0.0 {
        return None;
    }
    let t = (-b - disc.sqrt()).max(0.0);
    (t <= max_dist).then_some(t)
}

/// Slab test against an AABB for a unit ray.
pub fn ray_aabb(origin: Vec3, dir: Vec3, aabb: &Aabb, max_dist: f32) -> Option<f32> {
    let mut t_min = 0.0f32;
    let mut t_max = max_dist;

    for (o, d, lo, hi) in [
        (origin.x, dir.x, aabb.min.x, aabb.max.x),
        (origin.y, dir.y, aabb.min.y, aabb.max.y),
        (origin.z, dir.z, aabb.min.z, aabb.max.z),
    ] {
        if d.abs() <= f32::EPSILON {
            if o < lo || o > hi {
                return None;
            }
            continue;
        }
        let inv = 1.0 / d;
        let mut t0 = (lo - o) * inv;
        let mut t1 = (hi - o) * inv;
        if t0 > t1 {
            core::mem::swap(&mut t0, &mut t1);
        }
        t_min = t_min.max(t0);
        t_max = t_max.min(t1);
        if t_min > t_max {
            return None;
        }
    }

    Some(t_min)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_follows_yaw_convention() {
        let north = Pose::new(Vec3::ZERO, 0.0).forward();
        assert!((north.z - 1.0).abs() < 1e-6 && north.x.abs() < 1e-6);

        let east = Pose::new(Vec3::ZERO, 90.0).forward();
        assert!((east.x - 1.0).abs() < 1e-6 && east.z.abs() < 1e-6);
    }

    #[test]
    fn yaw_delta_is_signed_and_wrapped() {
        assert!((yaw_delta_to(0.0, Vec3::new(1.0, 0.0, 0.0)) - 90.0).abs() < 1e-4);
        assert!((yaw_delta_to(0.0, Vec3::new(-1.0, 0.0, 0.0)) + 90.0).abs() < 1e-4);
        assert!((yaw_delta_to(170.0, Vec3::new(0.0, 0.0, -1.0)) - 10.0).abs() < 1e-3);
        assert_eq!(yaw_delta_to(45.0, Vec3::ZERO), 0.0);
    }

    #[test]
    fn ray_hits_sphere_in_front_only() {
        let sphere = Sphere {
            center: Vec3::new(0.0, 0.0, 10.0),
            radius: 1.0,
        };
        let forward = Vec3::new(0.0, 0.0, 1.0);
        let hit = ray_sphere(Vec3::ZERO, forward, &sphere, 60.0).expect("hit");
        assert!((hit - 9.0).abs() < 1e-5);
        assert!(ray_sphere(Vec3::ZERO, forward * -1.0, &sphere, 60.0).is_none());
        assert!(ray_sphere(Vec3::ZERO, forward, &sphere, 5.0).is_none());
    }

    #[test]
    fn ray_hits_aabb_face() {
        let wall = Aabb {
            min: Vec3::new(-5.0, -1.0, 20.0),
            max: Vec3::new(5.0, 3.0, 21.0),
        };
        let hit = ray_aabb(Vec3::ZERO, Vec3::new(0.0, 0.0, 1.0), &wall, 60.0).expect("hit");
        assert!((hit - 20.0).abs() < 1e-5);
        assert!(ray_aabb(Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0), &wall, 60.0).is_none());
    }

    #[test]
    fn aabb_sphere_overlap_uses_closest_point() {
        let wall = Aabb {
            min: Vec3::new(0.0, 0.0, 0.0),
            max: Vec3::new(1.0, 1.0, 1.0),
        };
        assert!(wall.overlaps_sphere(Vec3::new(1.4, 0.5, 0.5), 0.5));
        assert!(!wall.overlaps_sphere(Vec3::new(1.6, 0.5, 0.5), 0.5));
    }
}
