use serde::{Deserialize, Serialize};

/// Point or direction in world space.
pub type Vec3 = glam::DVec3;
/// RGBA color or homogeneous vector.
pub type Vec4 = glam::DVec4;

/// Euclidean distance between two points.
pub fn distance(p1: Vec3, p2: Vec3) -> f64 {
    let d = p1 - p2;
    (d.x * d.x + d.y * d.y + d.z * d.z).sqrt()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Vec3Data {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl From<Vec3> for Vec3Data {
    fn from(v: Vec3) -> Self {
        Self { x: v.x, y: v.y, z: v.z }
    }
}

impl From<Vec3Data> for Vec3 {
    fn from(v: Vec3Data) -> Self {
        Vec3::new(v.x, v.y, v.z)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Vec4Data {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl From<Vec4> for Vec4Data {
    fn from(v: Vec4) -> Self {
        Self { x: v.x, y: v.y, z: v.z, w: v.w }
    }
}

impl From<Vec4Data> for Vec4 {
    fn from(v: Vec4Data) -> Self {
        Vec4::new(v.x, v.y, v.z, v.w)
    }
}
