//! Lifecycle contract between the host frame loop and blueprint behaviours.
//!
//! The host constructs one behaviour per scripted entity, particle system, or scene and then
//! drives it through `on_create`, any number of `on_update` calls, and a single `on_destroy`.
//! Behaviours never own the object they script; each callback receives a context borrowing
//! the host's data for the duration of the call.

use anyhow::Result;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::components::{EntityUuid, ParameterSnapshot, ParticleParameters, ParticleSystem, SceneEntity, Tag, Transform};
use crate::error::LifecycleError;
use crate::events::{EventBus, FrameEvent};
use crate::math::Vec3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnerKind {
    Entity,
    ParticleSystem,
    Scene,
}

impl OwnerKind {
    pub fn label(self) -> &'static str {
        match self {
            OwnerKind::Entity => "entity",
            OwnerKind::ParticleSystem => "particle system",
            OwnerKind::Scene => "scene",
        }
    }
}

/// Identity of the host object a behaviour is attached to, used in diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BehaviourOwner {
    pub kind: OwnerKind,
    pub uuid: String,
    pub tag: String,
}

impl BehaviourOwner {
    pub fn new(kind: OwnerKind, uuid: &EntityUuid, tag: &Tag) -> Self {
        Self { kind, uuid: uuid.as_str().to_string(), tag: tag.as_str().to_string() }
    }
}

impl fmt::Display for BehaviourOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}' ({})", self.kind.label(), self.tag, self.uuid)
    }
}

/// The three callbacks of the behaviour contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleStage {
    Create,
    Update,
    Destroy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LifecyclePhase {
    #[default]
    Constructed,
    Active,
    Destroyed,
}

/// Tracks which callbacks a behaviour has received and refuses out-of-order calls.
#[derive(Debug, Clone, Copy, Default)]
pub struct Lifecycle {
    phase: LifecyclePhase,
    updates: u64,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> LifecyclePhase {
        self.phase
    }

    pub fn updates(&self) -> u64 {
        self.updates
    }

    pub fn is_live(&self) -> bool {
        self.phase != LifecyclePhase::Destroyed
    }

    /// Records that `stage` is about to run. The transition happens even if the callback
    /// later fails, so `on_create` and `on_destroy` are never retried.
    pub fn begin(&mut self, stage: LifecycleStage) -> Result<(), LifecycleError> {
        let next = match (self.phase, stage) {
            (LifecyclePhase::Constructed, LifecycleStage::Create) => LifecyclePhase::Active,
            (LifecyclePhase::Active, LifecycleStage::Update) => {
                self.updates += 1;
                LifecyclePhase::Active
            }
            (LifecyclePhase::Active, LifecycleStage::Destroy) => LifecyclePhase::Destroyed,
            (current, attempted) => return Err(LifecycleError { current, attempted }),
        };
        self.phase = next;
        Ok(())
    }
}

/// Borrowed view of one entity for the duration of a callback.
pub struct EntityContext<'a> {
    uuid: &'a EntityUuid,
    tag: &'a Tag,
    transform: &'a mut Transform,
    events: &'a mut EventBus,
}

impl<'a> EntityContext<'a> {
    pub fn new(uuid: &'a EntityUuid, tag: &'a Tag, transform: &'a mut Transform, events: &'a mut EventBus) -> Self {
        Self { uuid, tag, transform, events }
    }

    pub fn uuid(&self) -> &EntityUuid {
        self.uuid
    }

    pub fn tag(&self) -> &Tag {
        self.tag
    }

    pub fn owner(&self) -> BehaviourOwner {
        BehaviourOwner::new(OwnerKind::Entity, self.uuid, self.tag)
    }

    pub fn transform(&self) -> &Transform {
        &*self.transform
    }

    pub fn transform_mut(&mut self) -> &mut Transform {
        &mut *self.transform
    }

    pub fn position(&self) -> Vec3 {
        self.transform.position
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.transform.position = position;
    }

    pub fn emit(&mut self, event: FrameEvent) {
        self.events.push(event);
    }
}

/// Borrowed view of one particle system for the duration of a callback.
pub struct ParticleContext<'a> {
    uuid: &'a EntityUuid,
    tag: &'a Tag,
    system: &'a mut ParticleSystem,
    events: &'a mut EventBus,
}

impl<'a> ParticleContext<'a> {
    pub fn new(uuid: &'a EntityUuid, tag: &'a Tag, system: &'a mut ParticleSystem, events: &'a mut EventBus) -> Self {
        Self { uuid, tag, system, events }
    }

    pub fn owner(&self) -> BehaviourOwner {
        BehaviourOwner::new(OwnerKind::ParticleSystem, self.uuid, self.tag)
    }

    pub fn parameters(&self) -> &ParticleParameters {
        &self.system.parameters
    }

    pub fn parameters_mut(&mut self) -> &mut ParticleParameters {
        &mut self.system.parameters
    }

    pub fn particle_count(&self) -> u32 {
        self.system.particle_count
    }

    pub fn parameter_snapshot(&self) -> ParameterSnapshot {
        self.system.parameter_snapshot()
    }

    pub fn emit(&mut self, event: FrameEvent) {
        self.events.push(event);
    }
}

/// Read-only view of the scene's entities, in host registration order.
pub struct SceneContext<'a> {
    uuid: &'a EntityUuid,
    name: &'a Tag,
    entities: &'a [SceneEntity],
    events: &'a mut EventBus,
}

impl<'a> SceneContext<'a> {
    pub fn new(uuid: &'a EntityUuid, name: &'a Tag, entities: &'a [SceneEntity], events: &'a mut EventBus) -> Self {
        Self { uuid, name, entities, events }
    }

    pub fn owner(&self) -> BehaviourOwner {
        BehaviourOwner::new(OwnerKind::Scene, self.uuid, self.name)
    }

    pub fn entities(&self) -> &'a [SceneEntity] {
        self.entities
    }

    pub fn emit(&mut self, event: FrameEvent) {
        self.events.push(event);
    }
}

/// Script attached to a single entity.
///
/// There is no implicit base behaviour: implementations that want the shared creation and
/// teardown diagnostics call [`base_entity_create`] and [`base_entity_destroy`] themselves,
/// before their own logic.
pub trait EntityBehaviour {
    fn on_create(&mut self, entity: &mut EntityContext<'_>) -> Result<()>;
    fn on_update(&mut self, entity: &mut EntityContext<'_>, delta_time: f64) -> Result<()>;
    fn on_destroy(&mut self, entity: &mut EntityContext<'_>) -> Result<()>;
}

/// Script attached to a particle emitter; mutates the emitter's parameters in place.
pub trait ParticleSystemBehaviour {
    fn on_create(&mut self, system: &mut ParticleContext<'_>) -> Result<()>;
    fn on_update(&mut self, system: &mut ParticleContext<'_>, delta_time: f64) -> Result<()>;
    fn on_destroy(&mut self, system: &mut ParticleContext<'_>) -> Result<()>;
}

/// Script attached to a scene; observes entities but never mutates the registry.
pub trait SceneBehaviour {
    fn on_create(&mut self, scene: &mut SceneContext<'_>) -> Result<()>;
    fn on_update(&mut self, scene: &mut SceneContext<'_>, delta_time: f64) -> Result<()>;
    fn on_destroy(&mut self, scene: &mut SceneContext<'_>) -> Result<()>;
}

pub type EntityBlueprintFactory = Box<dyn FnOnce(&EntityContext<'_>) -> Result<Box<dyn EntityBehaviour>>>;
pub type ParticleBlueprintFactory =
    Box<dyn FnOnce(&ParticleContext<'_>) -> Result<Box<dyn ParticleSystemBehaviour>>>;
pub type SceneBlueprintFactory = Box<dyn FnOnce(&SceneContext<'_>) -> Result<Box<dyn SceneBehaviour>>>;

pub fn base_entity_create(entity: &EntityContext<'_>) {
    debug!("On create event called on entity '{}'", entity.tag());
}

pub fn base_entity_destroy(entity: &EntityContext<'_>) {
    debug!("On destroy event called on entity '{}'", entity.tag());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_accepts_create_update_destroy_in_order() {
        let mut lifecycle = Lifecycle::new();
        lifecycle.begin(LifecycleStage::Create).expect("create");
        lifecycle.begin(LifecycleStage::Update).expect("update");
        lifecycle.begin(LifecycleStage::Update).expect("update");
        lifecycle.begin(LifecycleStage::Destroy).expect("destroy");
        assert_eq!(lifecycle.phase(), LifecyclePhase::Destroyed);
        assert_eq!(lifecycle.updates(), 2);
        assert!(!lifecycle.is_live());
    }

    #[test]
    fn lifecycle_rejects_update_before_create() {
        let mut lifecycle = Lifecycle::new();
        let err = lifecycle.begin(LifecycleStage::Update).unwrap_err();
        assert_eq!(err.current, LifecyclePhase::Constructed);
        assert_eq!(err.attempted, LifecycleStage::Update);
    }

    #[test]
    fn lifecycle_rejects_second_create_and_calls_after_destroy() {
        let mut lifecycle = Lifecycle::new();
        lifecycle.begin(LifecycleStage::Create).expect("create");
        assert!(lifecycle.begin(LifecycleStage::Create).is_err());
        lifecycle.begin(LifecycleStage::Destroy).expect("destroy");
        for stage in [LifecycleStage::Create, LifecycleStage::Update, LifecycleStage::Destroy] {
            assert!(lifecycle.begin(stage).is_err(), "{stage:?} after destroy must fail");
        }
    }

    #[test]
    fn owner_display_names_kind_tag_and_uuid() {
        let owner = BehaviourOwner::new(OwnerKind::ParticleSystem, &EntityUuid::new("abc"), &Tag::new("Sparks"));
        assert_eq!(owner.to_string(), "particle system 'Sparks' (abc)");
    }
}
