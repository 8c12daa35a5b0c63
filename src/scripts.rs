use std::collections::HashSet;
use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use log::{debug, info};
use rhai::{CallFnOptions, Dynamic, Engine, FuncArgs, Scope, AST};

use crate::behaviour::{base_entity_create, base_entity_destroy, EntityBehaviour, EntityContext};
use crate::events::FrameEvent;
use crate::math::Vec3;
use crate::time::SimClock;

/// Upper bound on interpreter operations per callback so a runaway script cannot stall a tick.
pub const DEFAULT_MAX_OPERATIONS: u64 = 200_000;

/// The value bound to `this` while a script callback runs.
#[derive(Debug, Clone)]
pub struct ScriptEntity {
    uuid: String,
    tag: String,
    position: Vec3,
    rotation: Vec3,
    size: Vec3,
    time: f64,
    logs: Vec<String>,
}

impl ScriptEntity {
    fn capture(entity: &EntityContext<'_>, time: f64) -> Self {
        let transform = entity.transform();
        Self {
            uuid: entity.uuid().as_str().to_string(),
            tag: entity.tag().as_str().to_string(),
            position: transform.position,
            rotation: transform.rotation,
            size: transform.size,
            time,
            logs: Vec::new(),
        }
    }

    fn log(&mut self, message: &str) {
        self.logs.push(message.to_string());
    }
}

/// Entity behaviour whose callbacks are Rhai functions.
///
/// A script may define any of `on_create()`, `on_update(dt)` and `on_destroy()`; missing ones
/// are skipped. Inside them `this` is the entity: `this.uuid`, `this.tag`, `this.time`, and the
/// writable `this.position`, `this.rotation`, `this.size`.
pub struct ScriptedEntity {
    engine: Engine,
    ast: AST,
    scope: Scope<'static>,
    name: String,
    functions: HashSet<String>,
    clock: SimClock,
}

impl ScriptedEntity {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).with_context(|| format!("Reading {}", path.display()))?;
        Self::from_source(path.display().to_string(), &source)
    }

    pub fn from_source(name: impl Into<String>, source: &str) -> Result<Self> {
        let name = name.into();
        let mut engine = Engine::new();
        engine.set_fast_operators(true);
        engine.set_max_operations(DEFAULT_MAX_OPERATIONS);
        register_api(&mut engine);
        let ast = engine.compile(source).with_context(|| format!("Compiling Rhai script {name}"))?;
        let functions = ast.iter_functions().map(|f| f.name.to_string()).collect();
        debug!("compiled script {name}");
        Ok(Self { engine, ast, scope: Scope::new(), name, functions, clock: SimClock::new() })
    }

    pub fn with_max_operations(mut self, limit: u64) -> Self {
        self.engine.set_max_operations(limit);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn defines(&self, function: &str) -> bool {
        self.functions.contains(function)
    }

    fn call(&mut self, function: &str, entity: &mut EntityContext<'_>, args: impl FuncArgs) -> Result<()> {
        if !self.defines(function) {
            return Ok(());
        }
        let mut this = Dynamic::from(ScriptEntity::capture(entity, self.clock.elapsed_seconds()));
        let options = CallFnOptions::new().eval_ast(false).bind_this_ptr(&mut this);
        // Callbacks may end in an expression; their value is ignored.
        let _ = self
            .engine
            .call_fn_with_options::<Dynamic>(options, &mut self.scope, &self.ast, function, args)
            .map_err(|err| anyhow!("{}: {function} failed: {err}", self.name))?;

        let script_entity =
            this.try_cast::<ScriptEntity>().ok_or_else(|| anyhow!("{}: `this` was reassigned", self.name))?;
        let transform = entity.transform_mut();
        transform.position = script_entity.position;
        transform.rotation = script_entity.rotation;
        transform.size = script_entity.size;
        for message in script_entity.logs {
            info!("[script] {message}");
            let owner = entity.owner();
            entity.emit(FrameEvent::ScriptMessage { owner, message });
        }
        Ok(())
    }
}

impl EntityBehaviour for ScriptedEntity {
    fn on_create(&mut self, entity: &mut EntityContext<'_>) -> Result<()> {
        base_entity_create(entity);
        self.call("on_create", entity, ())
    }

    fn on_update(&mut self, entity: &mut EntityContext<'_>, delta_time: f64) -> Result<()> {
        self.clock.advance(delta_time);
        self.call("on_update", entity, (delta_time,))
    }

    fn on_destroy(&mut self, entity: &mut EntityContext<'_>) -> Result<()> {
        base_entity_destroy(entity);
        self.call("on_destroy", entity, ())
    }
}

fn register_api(engine: &mut Engine) {
    engine.on_print(|text| info!("[script] {text}"));
    engine.on_debug(|text, source, pos| debug!("[script] {} {pos}: {text}", source.unwrap_or("")));

    engine.register_type_with_name::<Vec3>("Vec3");
    engine.register_fn("vec3", |x: f64, y: f64, z: f64| Vec3::new(x, y, z));
    engine.register_get_set("x", |v: &mut Vec3| v.x, |v: &mut Vec3, value: f64| v.x = value);
    engine.register_get_set("y", |v: &mut Vec3| v.y, |v: &mut Vec3, value: f64| v.y = value);
    engine.register_get_set("z", |v: &mut Vec3| v.z, |v: &mut Vec3, value: f64| v.z = value);
    engine.register_fn("to_string", |v: &mut Vec3| v.to_string());

    engine.register_type_with_name::<ScriptEntity>("Entity");
    engine.register_get("uuid", |e: &mut ScriptEntity| e.uuid.clone());
    engine.register_get("tag", |e: &mut ScriptEntity| e.tag.clone());
    engine.register_get("time", |e: &mut ScriptEntity| e.time);
    engine.register_get_set("position", |e: &mut ScriptEntity| e.position, |e: &mut ScriptEntity, v: Vec3| {
        e.position = v
    });
    engine.register_get_set("rotation", |e: &mut ScriptEntity| e.rotation, |e: &mut ScriptEntity, v: Vec3| {
        e.rotation = v
    });
    engine.register_get_set("size", |e: &mut ScriptEntity| e.size, |e: &mut ScriptEntity, v: Vec3| e.size = v);
    engine.register_fn("log", ScriptEntity::log);
}
