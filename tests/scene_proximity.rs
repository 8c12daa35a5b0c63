use approx::assert_relative_eq;
use frame_blueprints::behaviour::{SceneBehaviour, SceneContext};
use frame_blueprints::blueprints::ProximityScene;
use frame_blueprints::components::{EntityUuid, SceneEntity, Tag, Transform};
use frame_blueprints::config::ProximityConfig;
use frame_blueprints::events::{EventBus, FrameEvent};
use frame_blueprints::math::Vec3;
use frame_blueprints::runtime::BlueprintRuntime;

fn entity(uuid: &str, tag: &str, position: Vec3) -> SceneEntity {
    SceneEntity { uuid: EntityUuid::new(uuid), tag: Tag::new(tag), transform: Transform::from_position(position) }
}

fn update(scene: &mut ProximityScene, entities: &[SceneEntity], events: &mut EventBus) {
    let uuid = EntityUuid::new("scene");
    let name = Tag::new("Scene");
    let mut ctx = SceneContext::new(&uuid, &name, entities, events);
    scene.on_update(&mut ctx, 1.0 / 60.0).expect("scene update");
}

#[test]
fn measures_cyborg_to_cube_distance() {
    let entities = vec![
        entity("a", "Cyborg", Vec3::new(0.0, 0.0, 0.0)),
        entity("b", "Cube", Vec3::new(3.0, 4.0, 0.0)),
        entity("c", "Ball", Vec3::new(100.0, 0.0, 0.0)),
    ];
    let mut scene = ProximityScene::new(ProximityConfig::default());
    let mut events = EventBus::default();
    update(&mut scene, &entities, &mut events);

    let sample = scene.last_sample().expect("sample recorded");
    assert!(sample.first_found && sample.second_found);
    assert_eq!(sample.distance, 5.0);
    assert!(events.is_empty(), "telemetry is opt-in");
}

#[test]
fn later_sentinel_wins_when_tags_repeat() {
    let entities = vec![
        entity("a", "Cube", Vec3::new(1.0, 0.0, 0.0)),
        entity("b", "Cyborg", Vec3::ZERO),
        entity("c", "Cube", Vec3::new(0.0, 0.0, 2.0)),
    ];
    let mut scene = ProximityScene::new(ProximityConfig::default());
    let mut events = EventBus::default();
    update(&mut scene, &entities, &mut events);

    let sample = scene.last_sample().expect("sample recorded");
    assert_eq!(sample.second, Vec3::new(0.0, 0.0, 2.0));
    assert_eq!(sample.distance, 2.0);
}

#[test]
fn missing_sentinel_measures_from_origin() {
    let entities = vec![entity("b", "Cube", Vec3::new(0.0, 6.0, 8.0))];
    let mut scene = ProximityScene::new(ProximityConfig::default());
    let mut events = EventBus::default();
    update(&mut scene, &entities, &mut events);

    let sample = scene.last_sample().expect("sample recorded");
    assert!(!sample.first_found);
    assert_eq!(sample.first, Vec3::ZERO);
    assert_eq!(sample.distance, 10.0);
}

#[test]
fn distance_is_symmetric() {
    let scene = ProximityScene::new(ProximityConfig::default());
    let a = Vec3::new(1.0, -2.0, 3.5);
    let b = Vec3::new(-4.0, 0.5, 2.0);
    assert_eq!(scene.distance(a, b), scene.distance(b, a));
    assert_eq!(scene.distance(a, a), 0.0);
}

#[test]
fn telemetry_event_reports_distance() {
    let config = ProximityConfig { emit_telemetry: true, ..ProximityConfig::default() };
    let entities = vec![entity("a", "Cyborg", Vec3::ZERO), entity("b", "Cube", Vec3::new(0.0, 0.0, 7.0))];
    let mut scene = ProximityScene::new(config);
    let mut events = EventBus::default();
    update(&mut scene, &entities, &mut events);

    assert_eq!(
        events.drain(),
        vec![FrameEvent::Proximity { first: "Cyborg".into(), second: "Cube".into(), distance: 7.0 }]
    );
}

#[test]
fn scene_sees_positions_from_the_start_of_the_tick() {
    let mut runtime = BlueprintRuntime::default();
    runtime.spawn_entity("Cyborg", "cyborg", Transform::default()).expect("spawn cyborg");
    let cube = runtime
        .spawn_entity("Cube", "cube", Transform::from_position(Vec3::new(0.0, 0.0, 4.0)))
        .expect("spawn cube");
    let config = ProximityConfig { emit_telemetry: true, ..ProximityConfig::default() };
    runtime
        .attach_scene_behaviour("Scene", "scene", move |_: &SceneContext<'_>| -> anyhow::Result<Box<dyn SceneBehaviour>> {
            Ok(Box::new(ProximityScene::new(config)))
        })
        .expect("attach scene");

    runtime.tick(0.1).expect("first tick");
    runtime.set_position(cube, Vec3::new(0.0, 0.0, 9.0)).expect("move cube");
    runtime.tick(0.1).expect("second tick");

    let distances: Vec<f64> = runtime
        .drain_events()
        .into_iter()
        .filter_map(|event| match event {
            FrameEvent::Proximity { distance, .. } => Some(distance),
            _ => None,
        })
        .collect();
    assert_eq!(distances.len(), 2);
    assert_relative_eq!(distances[0], 4.0);
    assert_relative_eq!(distances[1], 9.0);
}
