//! Deterministic replay of a JSON fixture through [`BlueprintRuntime`].

use std::fs::{self, File};
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::behaviour::{
    EntityBehaviour, EntityBlueprintFactory, EntityContext, ParticleBlueprintFactory, ParticleContext,
    ParticleSystemBehaviour, SceneBehaviour, SceneBlueprintFactory, SceneContext,
};
use crate::blueprints::{BallBlueprint, CubeBlueprint, ParticleOscillator, ProximityScene};
use crate::components::{ParameterSnapshot, ParticleParameters, ParticleSystem, Transform};
use crate::config::BlueprintConfig;
use crate::events::FrameEvent;
use crate::math::Vec3;
use crate::runtime::BlueprintRuntime;
#[cfg(feature = "scripting")]
use crate::scripts::ScriptedEntity;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HarnessFixture {
    #[serde(default = "default_steps")]
    pub steps: usize,
    #[serde(default = "default_dt")]
    pub dt: f64,
    #[serde(default)]
    pub config: BlueprintConfig,
    #[serde(default)]
    pub entities: Vec<FixtureEntity>,
    #[serde(default)]
    pub particle_systems: Vec<FixtureParticleSystem>,
    #[serde(default)]
    pub scene: Option<FixtureScene>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntityBlueprintKind {
    Ball,
    Cube,
    #[cfg(feature = "scripting")]
    Script { path: String },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParticleBlueprintKind {
    Oscillator,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SceneBlueprintKind {
    Proximity,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FixtureEntity {
    pub tag: String,
    #[serde(default)]
    pub uuid: Option<String>,
    #[serde(default)]
    pub position: [f64; 3],
    #[serde(default)]
    pub rotation: Option<[f64; 3]>,
    #[serde(default)]
    pub size: Option<[f64; 3]>,
    #[serde(default)]
    pub blueprint: Option<EntityBlueprintKind>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FixtureParticleSystem {
    pub tag: String,
    #[serde(default)]
    pub uuid: Option<String>,
    #[serde(default)]
    pub parameters: Option<ParameterSnapshot>,
    #[serde(default = "default_particle_count")]
    pub particle_count: u32,
    #[serde(default)]
    pub blueprint: Option<ParticleBlueprintKind>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FixtureScene {
    #[serde(default = "default_scene_name")]
    pub name: String,
    pub blueprint: SceneBlueprintKind,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HarnessOutput {
    pub steps: usize,
    pub dt: f64,
    pub results: Vec<StepResult>,
    pub final_entities: Vec<EntitySummary>,
    pub final_particle_systems: Vec<ParticleSummary>,
    pub teardown_events: Vec<FrameEvent>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StepResult {
    pub step: usize,
    pub events: Vec<FrameEvent>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EntitySummary {
    pub uuid: String,
    pub tag: String,
    pub position: [f64; 3],
    pub rotation: [f64; 3],
    pub size: [f64; 3],
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParticleSummary {
    pub uuid: String,
    pub tag: String,
    pub particle_count: u32,
    pub parameters: ParameterSnapshot,
}

fn default_steps() -> usize {
    60
}

fn default_dt() -> f64 {
    1.0 / 60.0
}

fn default_particle_count() -> u32 {
    100
}

fn default_scene_name() -> String {
    "Scene".to_string()
}

pub fn load_fixture<P: AsRef<Path>>(path: P) -> Result<HarnessFixture> {
    let file = File::open(path.as_ref()).with_context(|| format!("opening fixture '{}'", path.as_ref().display()))?;
    serde_json::from_reader(file).with_context(|| "parsing fixture JSON")
}

/// Writes `output` as pretty JSON, creating parent directories as needed.
pub fn write_output(path: impl AsRef<Path>, output: &HarnessOutput) -> Result<()> {
    let path = path.as_ref();
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent)
            .with_context(|| format!("creating output directory '{}'", parent.display()))?,
        _ => {}
    }
    let json = serde_json::to_string_pretty(output).context("serializing harness output")?;
    fs::write(path, json).with_context(|| format!("writing harness output to '{}'", path.display()))
}

/// Fails with both renderings when `output` differs from the golden file at `path`.
pub fn compare_golden(path: impl AsRef<Path>, output: &HarnessOutput) -> Result<()> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("opening golden file '{}'", path.display()))?;
    let expected: HarnessOutput = serde_json::from_reader(file)
        .with_context(|| format!("parsing golden file '{}'", path.display()))?;
    if &expected != output {
        bail!(
            "output diverged from golden '{}':\nexpected: {}\nactual:   {}",
            path.display(),
            serde_json::to_string(&expected)?,
            serde_json::to_string(output)?,
        );
    }
    Ok(())
}

pub fn run_fixture(fixture: &HarnessFixture) -> Result<HarnessOutput> {
    let mut runtime = BlueprintRuntime::from_config(&fixture.config)?;

    for (idx, entry) in fixture.entities.iter().enumerate() {
        let uuid = entry.uuid.clone().unwrap_or_else(|| format!("entity-{idx}"));
        let mut transform = Transform::from_position(Vec3::from_array(entry.position));
        if let Some(rotation) = entry.rotation {
            transform.rotation = Vec3::from_array(rotation);
        }
        if let Some(size) = entry.size {
            transform.size = Vec3::from_array(size);
        }
        let entity = runtime.spawn_entity(&entry.tag, &uuid, transform)?;
        if let Some(kind) = &entry.blueprint {
            runtime.attach_entity_behaviour(entity, entity_factory(kind, &fixture.config))?;
        }
    }

    for (idx, entry) in fixture.particle_systems.iter().enumerate() {
        let uuid = entry.uuid.clone().unwrap_or_else(|| format!("particles-{idx}"));
        let parameters = entry.parameters.map(ParticleParameters::from).unwrap_or_default();
        let target = runtime.spawn_particle_system(&entry.tag, &uuid, ParticleSystem::new(parameters, entry.particle_count))?;
        if let Some(kind) = entry.blueprint {
            runtime.attach_particle_behaviour(target, particle_factory(kind, &fixture.config))?;
        }
    }

    if let Some(scene) = &fixture.scene {
        runtime.attach_scene_behaviour(&scene.name, "scene", scene_factory(scene.blueprint, &fixture.config))?;
    }

    let mut results = Vec::with_capacity(fixture.steps);
    for step in 0..fixture.steps {
        runtime.tick(fixture.dt).with_context(|| format!("running step {step}"))?;
        results.push(StepResult { step, events: runtime.drain_events() });
    }

    let final_entities = runtime
        .scene_entities()
        .into_iter()
        .map(|entity| EntitySummary {
            uuid: entity.uuid.as_str().to_string(),
            tag: entity.tag.as_str().to_string(),
            position: entity.transform.position.to_array(),
            rotation: entity.transform.rotation.to_array(),
            size: entity.transform.size.to_array(),
        })
        .collect();

    let mut final_particle_systems = Vec::with_capacity(fixture.particle_systems.len());
    for (idx, entry) in fixture.particle_systems.iter().enumerate() {
        let uuid = entry.uuid.clone().unwrap_or_else(|| format!("particles-{idx}"));
        let Some(target) = runtime.entity_by_uuid(&uuid) else { continue };
        let Some(system) = runtime.particle_system(target) else { continue };
        final_particle_systems.push(ParticleSummary {
            uuid,
            tag: entry.tag.clone(),
            particle_count: system.particle_count,
            parameters: system.parameter_snapshot(),
        });
    }

    runtime.shutdown()?;
    let teardown_events = runtime.drain_events();

    Ok(HarnessOutput {
        steps: fixture.steps,
        dt: fixture.dt,
        results,
        final_entities,
        final_particle_systems,
        teardown_events,
    })
}

pub fn entity_factory(kind: &EntityBlueprintKind, config: &BlueprintConfig) -> EntityBlueprintFactory {
    match kind {
        EntityBlueprintKind::Ball => Box::new(|_: &EntityContext<'_>| -> Result<Box<dyn EntityBehaviour>> {
            Ok(Box::new(BallBlueprint::new()))
        }),
        EntityBlueprintKind::Cube => {
            let speed = config.entities.cube_speed;
            Box::new(move |_: &EntityContext<'_>| -> Result<Box<dyn EntityBehaviour>> {
                Ok(Box::new(CubeBlueprint::new(speed)))
            })
        }
        #[cfg(feature = "scripting")]
        EntityBlueprintKind::Script { path } => {
            let path = path.clone();
            Box::new(move |_: &EntityContext<'_>| -> Result<Box<dyn EntityBehaviour>> {
                Ok(Box::new(ScriptedEntity::from_path(&path)?))
            })
        }
    }
}

pub fn particle_factory(kind: ParticleBlueprintKind, config: &BlueprintConfig) -> ParticleBlueprintFactory {
    match kind {
        ParticleBlueprintKind::Oscillator => {
            let oscillator = config.particles;
            Box::new(move |_: &ParticleContext<'_>| -> Result<Box<dyn ParticleSystemBehaviour>> {
                Ok(Box::new(ParticleOscillator::new(oscillator)?))
            })
        }
    }
}

pub fn scene_factory(kind: SceneBlueprintKind, config: &BlueprintConfig) -> SceneBlueprintFactory {
    match kind {
        SceneBlueprintKind::Proximity => {
            let proximity = config.scene.clone();
            Box::new(move |_: &SceneContext<'_>| -> Result<Box<dyn SceneBehaviour>> {
                Ok(Box::new(ProximityScene::new(proximity)))
            })
        }
    }
}
