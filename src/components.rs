use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::math::{Vec3, Vec3Data, Vec4, Vec4Data};

pub const UNNAMED_TAG: &str = "Noname entity";

/// Unique identity assigned by the host. Immutable once spawned.
#[derive(Component, Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityUuid(String);

impl EntityUuid {
    /// Wraps `uuid`, generating a random v4 identifier when it is empty.
    pub fn new(uuid: impl Into<String>) -> Self {
        let uuid = uuid.into();
        if uuid.is_empty() {
            Self::generate()
        } else {
            Self(uuid)
        }
    }

    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityUuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Non-unique label used for scene lookups.
#[derive(Component, Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag(String);

impl Tag {
    pub fn new(tag: impl Into<String>) -> Self {
        let tag = tag.into();
        if tag.is_empty() {
            Self(UNNAMED_TAG.to_string())
        } else {
            Self(tag)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    /// Euler angles in radians.
    pub rotation: Vec3,
    pub size: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self { position: Vec3::ZERO, rotation: Vec3::ZERO, size: Vec3::ONE }
    }
}

impl Transform {
    pub fn from_position(position: Vec3) -> Self {
        Self { position, ..Self::default() }
    }

    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.rotation.is_finite() && self.size.is_finite()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParticleParameters {
    pub position: Vec3,
    pub velocity: Vec3,
    pub color: Vec4,
    pub gravity_effect: f64,
    pub life_length: f64,
    pub rotation: f64,
    pub scale: f64,
}

impl Default for ParticleParameters {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            velocity: Vec3::new(10.0, 10.0, 10.0),
            color: Vec4::ONE,
            gravity_effect: 1.0,
            life_length: 5.0,
            rotation: 1.0,
            scale: 1.0,
        }
    }
}

impl ParticleParameters {
    pub fn is_finite(&self) -> bool {
        self.position.is_finite()
            && self.velocity.is_finite()
            && self.color.is_finite()
            && self.gravity_effect.is_finite()
            && self.life_length.is_finite()
            && self.rotation.is_finite()
            && self.scale.is_finite()
    }

    pub fn snapshot(&self) -> ParameterSnapshot {
        ParameterSnapshot {
            position: self.position.into(),
            velocity: self.velocity.into(),
            color: self.color.into(),
            gravity_effect: self.gravity_effect,
            life_length: self.life_length,
            rotation: self.rotation,
            scale: self.scale,
        }
    }
}

/// Read-only, fixed-schema copy of every particle parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterSnapshot {
    pub position: Vec3Data,
    pub velocity: Vec3Data,
    pub color: Vec4Data,
    pub gravity_effect: f64,
    pub life_length: f64,
    pub rotation: f64,
    pub scale: f64,
}

impl From<ParameterSnapshot> for ParticleParameters {
    fn from(snapshot: ParameterSnapshot) -> Self {
        Self {
            position: snapshot.position.into(),
            velocity: snapshot.velocity.into(),
            color: snapshot.color.into(),
            gravity_effect: snapshot.gravity_effect,
            life_length: snapshot.life_length,
            rotation: snapshot.rotation,
            scale: snapshot.scale,
        }
    }
}

#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct ParticleSystem {
    pub parameters: ParticleParameters,
    pub particle_count: u32,
}

impl ParticleSystem {
    pub fn new(parameters: ParticleParameters, particle_count: u32) -> Self {
        Self { parameters, particle_count }
    }

    pub fn parameter_snapshot(&self) -> ParameterSnapshot {
        self.parameters.snapshot()
    }
}

/// Value copy of an entity handed to scene behaviours.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneEntity {
    pub uuid: EntityUuid,
    pub tag: Tag,
    pub transform: Transform,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_uuid_generates_v4() {
        let generated = EntityUuid::new("");
        assert!(uuid::Uuid::parse_str(generated.as_str()).is_ok());
        assert_ne!(generated, EntityUuid::new(""));
        assert_eq!(EntityUuid::new("fixed").as_str(), "fixed");
    }

    #[test]
    fn empty_tag_falls_back_to_unnamed() {
        assert_eq!(Tag::new("").as_str(), UNNAMED_TAG);
        assert_eq!(Tag::new("Cube").as_str(), "Cube");
    }

    #[test]
    fn snapshot_nests_vectors_by_axis() {
        let params = ParticleParameters {
            position: Vec3::new(1.0, 2.0, 3.0),
            color: Vec4::new(0.5, 0.25, 0.125, 1.0),
            ..ParticleParameters::default()
        };
        let json = serde_json::to_value(params.snapshot()).expect("serialize snapshot");
        assert_eq!(json["position"]["y"], 2.0);
        assert_eq!(json["color"]["w"], 1.0);
        assert_eq!(json["scale"], 1.0);
        assert_eq!(ParticleParameters::from(params.snapshot()), params);
    }
}
