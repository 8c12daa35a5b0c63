//! Reference host that owns the registry and drives attached behaviours once per tick.

use anyhow::Result;
use bevy_ecs::prelude::{Entity, World};
use log::{debug, warn};
use smallvec::SmallVec;
use std::collections::HashMap;

use crate::behaviour::{
    BehaviourOwner, EntityBehaviour, EntityContext, Lifecycle, LifecyclePhase, LifecycleStage, OwnerKind,
    ParticleContext, ParticleSystemBehaviour, SceneBehaviour, SceneContext,
};
use crate::components::{EntityUuid, ParticleSystem, SceneEntity, Tag, Transform};
use crate::config::{BlueprintConfig, RuntimeConfig};
use crate::error::{BlueprintError, BlueprintResult};
use crate::events::{EventBus, FrameEvent};
use crate::math::Vec3;

type Stages = SmallVec<[LifecycleStage; 2]>;

struct BehaviourSlot<B: ?Sized> {
    target: Entity,
    owner: BehaviourOwner,
    lifecycle: Lifecycle,
    behaviour: Box<B>,
}

impl<B: ?Sized> BehaviourSlot<B> {
    fn new(target: Entity, owner: BehaviourOwner, behaviour: Box<B>) -> Self {
        Self { target, owner, lifecycle: Lifecycle::new(), behaviour }
    }

    /// `on_create` is deferred to the first tick after attachment.
    fn tick_stages(&self) -> Stages {
        let mut stages = Stages::new();
        if self.lifecycle.phase() == LifecyclePhase::Constructed {
            stages.push(LifecycleStage::Create);
        }
        stages.push(LifecycleStage::Update);
        stages
    }

    /// A behaviour torn down before its first tick still receives `on_create` first.
    fn teardown_stages(&self) -> Stages {
        let mut stages = Stages::new();
        match self.lifecycle.phase() {
            LifecyclePhase::Constructed => {
                stages.push(LifecycleStage::Create);
                stages.push(LifecycleStage::Destroy);
            }
            LifecyclePhase::Active => stages.push(LifecycleStage::Destroy),
            LifecyclePhase::Destroyed => {}
        }
        stages
    }
}

type EntitySlot = BehaviourSlot<dyn EntityBehaviour>;
type ParticleSlot = BehaviourSlot<dyn ParticleSystemBehaviour>;
type SceneSlot = BehaviourSlot<dyn SceneBehaviour>;

pub struct BlueprintRuntime {
    world: World,
    config: RuntimeConfig,
    events: EventBus,
    /// Transform-bearing entities in registration order.
    entities: Vec<Entity>,
    uuids: HashMap<EntityUuid, Entity>,
    entity_slots: Vec<EntitySlot>,
    scene_slots: Vec<SceneSlot>,
    particle_slots: Vec<ParticleSlot>,
    pending_despawn: SmallVec<[Entity; 8]>,
    elapsed: f64,
    ticks: u64,
    shut_down: bool,
}

impl Default for BlueprintRuntime {
    fn default() -> Self {
        Self::new(RuntimeConfig::default())
    }
}

impl BlueprintRuntime {
    pub fn new(config: RuntimeConfig) -> Self {
        Self {
            world: World::new(),
            config,
            events: EventBus::default(),
            entities: Vec::new(),
            uuids: HashMap::new(),
            entity_slots: Vec::new(),
            scene_slots: Vec::new(),
            particle_slots: Vec::new(),
            pending_despawn: SmallVec::new(),
            elapsed: 0.0,
            ticks: 0,
            shut_down: false,
        }
    }

    /// Validates a full config and builds a runtime from its `runtime` section.
    pub fn from_config(config: &BlueprintConfig) -> BlueprintResult<Self> {
        config.validate().map_err(|err| BlueprintError::Config(format!("{err:#}")))?;
        Ok(Self::new(config.runtime))
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    pub fn drain_events(&mut self) -> Vec<FrameEvent> {
        self.events.drain()
    }

    // ---------- registry ----------

    /// Registers an entity. An empty `uuid` is replaced by a generated one.
    pub fn spawn_entity(&mut self, tag: &str, uuid: &str, transform: Transform) -> BlueprintResult<Entity> {
        self.ensure_running()?;
        let uuid = self.claim_uuid(uuid)?;
        let entity = self.world.spawn((uuid.clone(), Tag::new(tag), transform)).id();
        self.uuids.insert(uuid.clone(), entity);
        self.entities.push(entity);
        debug!("Scene: created entity with uuid {uuid}");
        Ok(entity)
    }

    pub fn spawn_particle_system(&mut self, tag: &str, uuid: &str, system: ParticleSystem) -> BlueprintResult<Entity> {
        self.ensure_running()?;
        let uuid = self.claim_uuid(uuid)?;
        let entity = self.world.spawn((uuid.clone(), Tag::new(tag), system)).id();
        self.uuids.insert(uuid.clone(), entity);
        debug!("[Particle system]: {} particles registered under {uuid}", system.particle_count);
        Ok(entity)
    }

    /// Flags an entity, particle system, or scene root for removal at the end of the next
    /// tick. Its behaviour receives `on_destroy` right before removal.
    pub fn despawn(&mut self, target: Entity) -> BlueprintResult<()> {
        self.ensure_running()?;
        if self.world.get::<EntityUuid>(target).is_none() {
            return Err(BlueprintError::UnknownEntity(target));
        }
        if !self.pending_despawn.contains(&target) {
            self.pending_despawn.push(target);
        }
        Ok(())
    }

    pub fn entity_by_uuid(&self, uuid: &str) -> Option<Entity> {
        self.uuids.get(&EntityUuid::new(uuid)).copied()
    }

    pub fn entities_tagged(&self, tag: &str) -> Vec<Entity> {
        self.entities
            .iter()
            .copied()
            .filter(|&entity| self.world.get::<Tag>(entity).is_some_and(|t| t.as_str() == tag))
            .collect()
    }

    pub fn uuid(&self, target: Entity) -> Option<&EntityUuid> {
        self.world.get::<EntityUuid>(target)
    }

    pub fn tag(&self, target: Entity) -> Option<&Tag> {
        self.world.get::<Tag>(target)
    }

    pub fn transform(&self, entity: Entity) -> Option<Transform> {
        self.world.get::<Transform>(entity).copied()
    }

    pub fn set_position(&mut self, entity: Entity, position: Vec3) -> BlueprintResult<()> {
        let mut transform =
            self.world.get_mut::<Transform>(entity).ok_or(BlueprintError::UnknownEntity(entity))?;
        transform.position = position;
        Ok(())
    }

    pub fn particle_system(&self, target: Entity) -> Option<ParticleSystem> {
        self.world.get::<ParticleSystem>(target).copied()
    }

    /// Value copies of every transform-bearing entity, in registration order.
    pub fn scene_entities(&self) -> Vec<SceneEntity> {
        self.entities
            .iter()
            .filter_map(|&entity| {
                Some(SceneEntity {
                    uuid: self.world.get::<EntityUuid>(entity)?.clone(),
                    tag: self.world.get::<Tag>(entity)?.clone(),
                    transform: *self.world.get::<Transform>(entity)?,
                })
            })
            .collect()
    }

    pub fn lifecycle_phase(&self, target: Entity) -> Option<LifecyclePhase> {
        let entity = self.entity_slots.iter().find(|slot| slot.target == target).map(|slot| slot.lifecycle);
        let particle = || self.particle_slots.iter().find(|slot| slot.target == target).map(|slot| slot.lifecycle);
        let scene = || self.scene_slots.iter().find(|slot| slot.target == target).map(|slot| slot.lifecycle);
        entity.or_else(particle).or_else(scene).map(|lifecycle| lifecycle.phase())
    }

    // ---------- attachment ----------

    pub fn attach_entity_behaviour<F>(&mut self, entity: Entity, factory: F) -> BlueprintResult<()>
    where
        F: FnOnce(&EntityContext<'_>) -> Result<Box<dyn EntityBehaviour>>,
    {
        self.ensure_running()?;
        let mut query = self.world.query::<(&EntityUuid, &Tag, &mut Transform)>();
        let Ok((uuid, tag, mut transform)) = query.get_mut(&mut self.world, entity) else {
            return Err(BlueprintError::UnknownEntity(entity));
        };
        let owner = BehaviourOwner::new(OwnerKind::Entity, uuid, tag);
        if self.entity_slots.iter().any(|slot| slot.target == entity) {
            return Err(BlueprintError::AlreadyAttached { owner });
        }
        let ctx = EntityContext::new(uuid, tag, &mut transform, &mut self.events);
        let behaviour = factory(&ctx).map_err(|err| construction_failed(owner.clone(), err))?;
        self.entity_slots.push(BehaviourSlot::new(entity, owner, behaviour));
        Ok(())
    }

    pub fn attach_particle_behaviour<F>(&mut self, target: Entity, factory: F) -> BlueprintResult<()>
    where
        F: FnOnce(&ParticleContext<'_>) -> Result<Box<dyn ParticleSystemBehaviour>>,
    {
        self.ensure_running()?;
        let mut query = self.world.query::<(&EntityUuid, &Tag, &mut ParticleSystem)>();
        let Ok((uuid, tag, mut system)) = query.get_mut(&mut self.world, target) else {
            return Err(BlueprintError::UnknownParticleSystem(target));
        };
        let owner = BehaviourOwner::new(OwnerKind::ParticleSystem, uuid, tag);
        if self.particle_slots.iter().any(|slot| slot.target == target) {
            return Err(BlueprintError::AlreadyAttached { owner });
        }
        let ctx = ParticleContext::new(uuid, tag, &mut system, &mut self.events);
        let behaviour = factory(&ctx).map_err(|err| construction_failed(owner.clone(), err))?;
        self.particle_slots.push(BehaviourSlot::new(target, owner, behaviour));
        Ok(())
    }

    /// Creates a scene root named `name` and attaches a scene behaviour to it. Nothing is
    /// registered when construction fails.
    pub fn attach_scene_behaviour<F>(&mut self, name: &str, uuid: &str, factory: F) -> BlueprintResult<Entity>
    where
        F: FnOnce(&SceneContext<'_>) -> Result<Box<dyn SceneBehaviour>>,
    {
        self.ensure_running()?;
        let uuid = self.claim_uuid(uuid)?;
        let name = Tag::new(name);
        let owner = BehaviourOwner::new(OwnerKind::Scene, &uuid, &name);
        let view = self.scene_entities();
        let ctx = SceneContext::new(&uuid, &name, &view, &mut self.events);
        let behaviour = factory(&ctx).map_err(|err| construction_failed(owner.clone(), err))?;
        let root = self.world.spawn((uuid.clone(), name)).id();
        self.uuids.insert(uuid, root);
        self.scene_slots.push(BehaviourSlot::new(root, owner, behaviour));
        Ok(root)
    }

    // ---------- frame loop ----------

    /// Runs one simulation tick: entity behaviours, then scene behaviours, then particle
    /// behaviours, then deferred removals.
    pub fn tick(&mut self, delta_time: f64) -> BlueprintResult<()> {
        self.ensure_running()?;
        if !delta_time.is_finite() || delta_time < 0.0 {
            return Err(BlueprintError::InvalidDelta(delta_time));
        }
        let dt = if delta_time > self.config.max_delta_time {
            debug!("clamping delta time {delta_time} to {}", self.config.max_delta_time);
            self.config.max_delta_time
        } else {
            delta_time
        };
        let validate = self.config.validate_finite;

        // Scene behaviours observe the registry as it stood at the start of the tick.
        let view = self.scene_entities();

        for slot in self.entity_slots.iter_mut() {
            let stages = slot.tick_stages();
            drive_entity(&mut self.world, &mut self.events, slot, &stages, dt, validate);
        }
        for slot in self.scene_slots.iter_mut() {
            let stages = slot.tick_stages();
            drive_scene(&self.world, &mut self.events, slot, &view, &stages, dt);
        }
        for slot in self.particle_slots.iter_mut() {
            let stages = slot.tick_stages();
            drive_particles(&mut self.world, &mut self.events, slot, &stages, dt, validate);
        }

        self.flush_despawns();
        self.elapsed += dt;
        self.ticks += 1;
        Ok(())
    }

    /// Sends `on_destroy` to every live behaviour and leaves the runtime inert.
    pub fn shutdown(&mut self) -> BlueprintResult<()> {
        self.ensure_running()?;
        let validate = self.config.validate_finite;
        let view = self.scene_entities();
        for mut slot in std::mem::take(&mut self.entity_slots) {
            let stages = slot.teardown_stages();
            drive_entity(&mut self.world, &mut self.events, &mut slot, &stages, 0.0, validate);
        }
        for mut slot in std::mem::take(&mut self.scene_slots) {
            let stages = slot.teardown_stages();
            drive_scene(&self.world, &mut self.events, &mut slot, &view, &stages, 0.0);
        }
        for mut slot in std::mem::take(&mut self.particle_slots) {
            let stages = slot.teardown_stages();
            drive_particles(&mut self.world, &mut self.events, &mut slot, &stages, 0.0, validate);
        }
        self.pending_despawn.clear();
        self.shut_down = true;
        debug!("blueprint runtime shut down after {} ticks", self.ticks);
        Ok(())
    }

    fn flush_despawns(&mut self) {
        if self.pending_despawn.is_empty() {
            return;
        }
        let validate = self.config.validate_finite;
        let pending = std::mem::take(&mut self.pending_despawn);
        for target in pending {
            if let Some(idx) = self.entity_slots.iter().position(|slot| slot.target == target) {
                let mut slot = self.entity_slots.remove(idx);
                let stages = slot.teardown_stages();
                drive_entity(&mut self.world, &mut self.events, &mut slot, &stages, 0.0, validate);
            }
            if let Some(idx) = self.particle_slots.iter().position(|slot| slot.target == target) {
                let mut slot = self.particle_slots.remove(idx);
                let stages = slot.teardown_stages();
                drive_particles(&mut self.world, &mut self.events, &mut slot, &stages, 0.0, validate);
            }
            if let Some(idx) = self.scene_slots.iter().position(|slot| slot.target == target) {
                let mut slot = self.scene_slots.remove(idx);
                let stages = slot.teardown_stages();
                let view = self.scene_entities();
                drive_scene(&self.world, &mut self.events, &mut slot, &view, &stages, 0.0);
            }
            self.entities.retain(|&entity| entity != target);
            self.uuids.retain(|_, &mut entity| entity != target);
            self.world.despawn(target);
        }
    }

    fn claim_uuid(&self, uuid: &str) -> BlueprintResult<EntityUuid> {
        let uuid = EntityUuid::new(uuid);
        if self.uuids.contains_key(&uuid) {
            return Err(BlueprintError::DuplicateUuid(uuid.as_str().to_string()));
        }
        Ok(uuid)
    }

    fn ensure_running(&self) -> BlueprintResult<()> {
        if self.shut_down {
            Err(BlueprintError::Shutdown)
        } else {
            Ok(())
        }
    }
}

impl Drop for BlueprintRuntime {
    fn drop(&mut self) {
        if !self.shut_down {
            let _ = self.shutdown();
        }
    }
}

fn construction_failed(owner: BehaviourOwner, err: anyhow::Error) -> BlueprintError {
    warn!("failed to construct blueprint for {owner}: {err:#}");
    BlueprintError::Construction { owner, source: err.into() }
}

type Faults = SmallVec<[(LifecycleStage, anyhow::Error); 1]>;

/// Runs `stages` in order. A failure skips the remaining work except `Destroy`, which still
/// runs so every created behaviour is torn down exactly once.
fn run_stages(
    lifecycle: &mut Lifecycle,
    stages: &[LifecycleStage],
    mut call: impl FnMut(LifecycleStage) -> Result<()>,
) -> Faults {
    let mut faults = Faults::new();
    for &stage in stages {
        if !faults.is_empty() && stage != LifecycleStage::Destroy {
            continue;
        }
        if let Err(err) = lifecycle.begin(stage) {
            faults.push((stage, err.into()));
            continue;
        }
        if let Err(err) = call(stage) {
            faults.push((stage, err));
        }
    }
    faults
}

fn report_fault(events: &mut EventBus, owner: &BehaviourOwner, stage: LifecycleStage, err: &anyhow::Error) {
    warn!("{owner}: {stage:?} callback failed, skipping its remaining work this tick: {err:#}");
    events.push(FrameEvent::BehaviourFault { owner: owner.clone(), stage, message: format!("{err:#}") });
}

fn report_non_finite(events: &mut EventBus, owner: &BehaviourOwner) {
    warn!("{owner}: rejected non-finite write, restoring previous values");
    events.push(FrameEvent::NonFiniteRejected { owner: owner.clone() });
}

fn drive_entity(
    world: &mut World,
    events: &mut EventBus,
    slot: &mut EntitySlot,
    stages: &[LifecycleStage],
    dt: f64,
    validate: bool,
) {
    if stages.is_empty() {
        return;
    }
    let mut query = world.query::<(&EntityUuid, &Tag, &mut Transform)>();
    let Ok((uuid, tag, mut transform)) = query.get_mut(world, slot.target) else {
        return;
    };
    let before = *transform;
    let faults = {
        let mut ctx = EntityContext::new(uuid, tag, &mut transform, events);
        let behaviour = &mut slot.behaviour;
        run_stages(&mut slot.lifecycle, stages, |stage| match stage {
            LifecycleStage::Create => behaviour.on_create(&mut ctx),
            LifecycleStage::Update => behaviour.on_update(&mut ctx, dt),
            LifecycleStage::Destroy => behaviour.on_destroy(&mut ctx),
        })
    };
    for (stage, err) in &faults {
        report_fault(events, &slot.owner, *stage, err);
    }
    if validate && !transform.is_finite() {
        *transform = before;
        report_non_finite(events, &slot.owner);
    }
}

fn drive_particles(
    world: &mut World,
    events: &mut EventBus,
    slot: &mut ParticleSlot,
    stages: &[LifecycleStage],
    dt: f64,
    validate: bool,
) {
    if stages.is_empty() {
        return;
    }
    let mut query = world.query::<(&EntityUuid, &Tag, &mut ParticleSystem)>();
    let Ok((uuid, tag, mut system)) = query.get_mut(world, slot.target) else {
        return;
    };
    let before = system.parameters;
    let faults = {
        let mut ctx = ParticleContext::new(uuid, tag, &mut system, events);
        let behaviour = &mut slot.behaviour;
        run_stages(&mut slot.lifecycle, stages, |stage| match stage {
            LifecycleStage::Create => behaviour.on_create(&mut ctx),
            LifecycleStage::Update => behaviour.on_update(&mut ctx, dt),
            LifecycleStage::Destroy => behaviour.on_destroy(&mut ctx),
        })
    };
    for (stage, err) in &faults {
        report_fault(events, &slot.owner, *stage, err);
    }
    if validate && !system.parameters.is_finite() {
        system.parameters = before;
        report_non_finite(events, &slot.owner);
    }
}

fn drive_scene(
    world: &World,
    events: &mut EventBus,
    slot: &mut SceneSlot,
    view: &[SceneEntity],
    stages: &[LifecycleStage],
    dt: f64,
) {
    if stages.is_empty() {
        return;
    }
    let (Some(uuid), Some(name)) = (world.get::<EntityUuid>(slot.target), world.get::<Tag>(slot.target)) else {
        return;
    };
    let faults = {
        let mut ctx = SceneContext::new(uuid, name, view, events);
        let behaviour = &mut slot.behaviour;
        run_stages(&mut slot.lifecycle, stages, |stage| match stage {
            LifecycleStage::Create => behaviour.on_create(&mut ctx),
            LifecycleStage::Update => behaviour.on_update(&mut ctx, dt),
            LifecycleStage::Destroy => behaviour.on_destroy(&mut ctx),
        })
    };
    for (stage, err) in &faults {
        report_fault(events, &slot.owner, *stage, err);
    }
}
