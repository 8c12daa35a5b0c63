#![cfg(feature = "scripting")]

use std::io::Write;

use anyhow::Result;
use frame_blueprints::behaviour::{EntityBehaviour, EntityContext, LifecycleStage};
use frame_blueprints::components::{EntityUuid, Tag, Transform};
use frame_blueprints::events::{EventBus, FrameEvent};
use frame_blueprints::math::Vec3;
use frame_blueprints::runtime::BlueprintRuntime;
use frame_blueprints::scripts::ScriptedEntity;
use frame_blueprints::BlueprintError;
use tempfile::NamedTempFile;

fn write_script(contents: &str) -> NamedTempFile {
    let mut temp = NamedTempFile::new().expect("temp script");
    write!(temp, "{contents}").expect("write script");
    temp
}

struct Harness {
    uuid: EntityUuid,
    tag: Tag,
    transform: Transform,
    events: EventBus,
}

impl Harness {
    fn new() -> Self {
        Self {
            uuid: EntityUuid::new("scripted"),
            tag: Tag::new("Drone"),
            transform: Transform::from_position(Vec3::new(1.0, 2.0, 3.0)),
            events: EventBus::default(),
        }
    }

    fn ctx(&mut self) -> EntityContext<'_> {
        EntityContext::new(&self.uuid, &self.tag, &mut self.transform, &mut self.events)
    }
}

#[test]
fn script_moves_entity_through_this() {
    let mut script = ScriptedEntity::from_source(
        "mover",
        r#"
            fn on_update(dt) {
                let p = this.position;
                p.x += dt * 2.0;
                this.position = p;
            }
        "#,
    )
    .expect("compile");
    let mut harness = Harness::new();
    script.on_create(&mut harness.ctx()).expect("missing on_create is skipped");
    script.on_update(&mut harness.ctx(), 0.5).expect("update");
    script.on_update(&mut harness.ctx(), 0.5).expect("update");
    assert_eq!(harness.transform.position, Vec3::new(3.0, 2.0, 3.0));
}

#[test]
fn script_sees_identity_and_elapsed_time() {
    let mut script = ScriptedEntity::from_source(
        "identity",
        r#"
            fn on_create() { this.log("hello " + this.tag + " " + this.uuid); }
            fn on_update(dt) {
                this.size = vec3(this.time, this.time, this.time);
            }
        "#,
    )
    .expect("compile");
    let mut harness = Harness::new();
    script.on_create(&mut harness.ctx()).expect("create");
    script.on_update(&mut harness.ctx(), 0.25).expect("update");
    script.on_update(&mut harness.ctx(), 0.25).expect("update");

    assert_eq!(harness.transform.size, Vec3::splat(0.5));
    let events = harness.events.drain();
    assert_eq!(events.len(), 1);
    match &events[0] {
        FrameEvent::ScriptMessage { owner, message } => {
            assert_eq!(owner.uuid, "scripted");
            assert_eq!(message, "hello Drone scripted");
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[test]
fn defines_reports_available_callbacks() {
    let script = ScriptedEntity::from_source("partial", "fn on_destroy() {}").expect("compile");
    assert!(script.defines("on_destroy"));
    assert!(!script.defines("on_update"));
    assert_eq!(script.name(), "partial");
}

#[test]
fn compile_error_surfaces_as_construction_failure() {
    let mut runtime = BlueprintRuntime::default();
    let entity = runtime.spawn_entity("Drone", "drone", Transform::default()).expect("spawn");
    let err = runtime
        .attach_entity_behaviour(entity, |_: &EntityContext<'_>| -> Result<Box<dyn EntityBehaviour>> {
            Ok(Box::new(ScriptedEntity::from_source("broken", "fn on_update(dt) { let = ; }")?))
        })
        .unwrap_err();
    assert!(matches!(err, BlueprintError::Construction { ref owner, .. } if owner.uuid == "drone"));
}

#[test]
fn runaway_script_is_stopped_and_reported() {
    let file = write_script("fn on_update(dt) { loop { } }");
    let path = file.path().to_path_buf();
    let mut runtime = BlueprintRuntime::default();
    let entity = runtime.spawn_entity("Drone", "drone", Transform::default()).expect("spawn");
    runtime
        .attach_entity_behaviour(entity, move |_: &EntityContext<'_>| -> Result<Box<dyn EntityBehaviour>> {
            Ok(Box::new(ScriptedEntity::from_path(&path)?.with_max_operations(1_000)))
        })
        .expect("attach");

    runtime.tick(0.1).expect("tick survives the runaway script");
    let events = runtime.drain_events();
    assert!(events.iter().any(|event| matches!(
        event,
        FrameEvent::BehaviourFault { stage: LifecycleStage::Update, .. }
    )));
}

#[test]
fn script_runtime_error_keeps_previous_transform() {
    let file = write_script(
        r#"
            fn on_update(dt) {
                this.position = vec3(9.0, 9.0, 9.0);
                throw "boom";
            }
        "#,
    );
    let mut script = ScriptedEntity::from_path(file.path()).expect("compile");
    let mut harness = Harness::new();
    let err = script.on_update(&mut harness.ctx(), 0.1).unwrap_err();
    assert!(err.to_string().contains("boom"), "{err}");
    assert_eq!(harness.transform.position, Vec3::new(1.0, 2.0, 3.0));
}

#[test]
fn callback_value_is_ignored() {
    let mut script = ScriptedEntity::from_source(
        "valued",
        r#"
            fn on_update(dt) {
                this.rotation = vec3(0.0, dt, 0.0);
                42
            }
        "#,
    )
    .expect("compile");
    let mut harness = Harness::new();
    script.on_update(&mut harness.ctx(), 0.5).expect("value-returning callback succeeds");
    assert_eq!(harness.transform.rotation, Vec3::new(0.0, 0.5, 0.0));
}
