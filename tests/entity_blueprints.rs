use approx::assert_relative_eq;
use frame_blueprints::behaviour::{EntityBehaviour, EntityContext};
use frame_blueprints::blueprints::{BallBlueprint, CubeBlueprint};
use frame_blueprints::components::{EntityUuid, Tag, Transform};
use frame_blueprints::events::EventBus;
use frame_blueprints::math::Vec3;
use frame_blueprints::runtime::BlueprintRuntime;

struct Harness {
    uuid: EntityUuid,
    tag: Tag,
    transform: Transform,
    events: EventBus,
}

impl Harness {
    fn at(position: Vec3) -> Self {
        Self {
            uuid: EntityUuid::new("ball-1"),
            tag: Tag::new("Ball"),
            transform: Transform::from_position(position),
            events: EventBus::default(),
        }
    }

    fn ctx(&mut self) -> EntityContext<'_> {
        EntityContext::new(&self.uuid, &self.tag, &mut self.transform, &mut self.events)
    }
}

#[test]
fn ball_bobs_relative_to_its_x_coordinate() {
    let mut harness = Harness::at(Vec3::new(3.0, 0.0, 0.0));
    let mut ball = BallBlueprint::new();
    ball.on_create(&mut harness.ctx()).expect("create");
    ball.on_update(&mut harness.ctx(), 50.0).expect("update");

    let position = harness.transform.position;
    assert_eq!(position.x, 3.0, "ball never moves on x");
    assert_relative_eq!(position.y, 10.0 - 5.0 * 1.5_f64.sin(), epsilon = 1e-12);
    assert_relative_eq!(position.z, -160.0 - 5.0 * 5.0_f64.cos(), epsilon = 1e-12);
    assert_relative_eq!(position.y, 5.012525067, epsilon = 1e-8);
    assert_relative_eq!(position.z, -161.418310927, epsilon = 1e-8);
}

#[test]
fn ball_at_origin_settles_at_rest_pose() {
    let mut harness = Harness::at(Vec3::ZERO);
    let mut ball = BallBlueprint::new();
    ball.on_create(&mut harness.ctx()).expect("create");
    for _ in 0..5 {
        ball.on_update(&mut harness.ctx(), 0.1).expect("update");
    }
    assert_eq!(harness.transform.position, Vec3::new(0.0, 10.0, -165.0));
    assert_relative_eq!(ball.elapsed(), 0.5, epsilon = 1e-12);
}

#[test]
fn ball_overwrites_external_y_and_z_each_tick() {
    let mut harness = Harness::at(Vec3::new(2.0, 99.0, 99.0));
    let mut ball = BallBlueprint::new();
    ball.on_update(&mut harness.ctx(), 1.0).expect("update");
    let (y, z) = BallBlueprint::oscillation(2.0, 1.0);
    assert_eq!(harness.transform.position, Vec3::new(2.0, y, z));
}

#[test]
fn cube_moves_by_speed_scaled_step() {
    let mut harness = Harness::at(Vec3::ZERO);
    let mut cube = CubeBlueprint::new(60.0);
    cube.on_create(&mut harness.ctx()).expect("create");
    cube.on_update(&mut harness.ctx(), 0.5).expect("update");

    let position = harness.transform.position;
    assert_relative_eq!(position.x, 0.5_f64.sin() * 30.0, epsilon = 1e-12);
    assert_relative_eq!(position.z, 0.5_f64.cos() * 30.0, epsilon = 1e-12);
    assert_eq!(position.y, 0.0);
}

#[test]
fn cube_with_zero_delta_stays_put() {
    let mut harness = Harness::at(Vec3::new(1.0, 2.0, 3.0));
    let mut cube = CubeBlueprint::new(60.0);
    cube.on_update(&mut harness.ctx(), 0.0).expect("update");
    assert_eq!(harness.transform.position, Vec3::new(1.0, 2.0, 3.0));
}

#[test]
fn ball_runs_inside_runtime_after_first_tick() {
    let mut runtime = BlueprintRuntime::default();
    let ball = runtime
        .spawn_entity("Ball", "ball", Transform::from_position(Vec3::new(0.0, 0.0, 0.0)))
        .expect("spawn ball");
    runtime
        .attach_entity_behaviour(ball, |_: &EntityContext<'_>| -> anyhow::Result<Box<dyn EntityBehaviour>> {
            Ok(Box::new(BallBlueprint::new()))
        })
        .expect("attach ball");

    assert_eq!(runtime.transform(ball).expect("transform").position, Vec3::ZERO, "nothing runs before a tick");
    runtime.tick(0.1).expect("tick");
    assert_eq!(runtime.transform(ball).expect("transform").position, Vec3::new(0.0, 10.0, -165.0));
}
