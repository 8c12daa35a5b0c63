use anyhow::Result;
use log::info;

use crate::behaviour::{base_entity_create, base_entity_destroy, EntityBehaviour, EntityContext};
use crate::time::SimClock;

const REST_HEIGHT: f64 = 10.0;
const REST_DEPTH: f64 = -160.0;
const AMPLITUDE: f64 = 5.0;
const HEIGHT_PERIOD_DIVISOR: f64 = 100.0;
const DEPTH_PERIOD_DIVISOR: f64 = 30.0;

/// Bobs an entity on y and z with a frequency proportional to its own x coordinate.
#[derive(Debug, Default)]
pub struct BallBlueprint {
    clock: SimClock,
}

impl BallBlueprint {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_clock(clock: SimClock) -> Self {
        Self { clock }
    }

    pub fn elapsed(&self) -> f64 {
        self.clock.elapsed_seconds()
    }

    /// Height and depth for an entity at `x` once `t` simulation seconds have elapsed.
    pub fn oscillation(x: f64, t: f64) -> (f64, f64) {
        let y = REST_HEIGHT - AMPLITUDE * (x * t / HEIGHT_PERIOD_DIVISOR).sin();
        let z = REST_DEPTH - AMPLITUDE * (x * t / DEPTH_PERIOD_DIVISOR).cos();
        (y, z)
    }
}

impl EntityBehaviour for BallBlueprint {
    fn on_create(&mut self, entity: &mut EntityContext<'_>) -> Result<()> {
        base_entity_create(entity);
        info!("Entity {}:{} on create", entity.uuid(), entity.tag());
        Ok(())
    }

    fn on_update(&mut self, entity: &mut EntityContext<'_>, delta_time: f64) -> Result<()> {
        self.clock.advance(delta_time);
        let position = &mut entity.transform_mut().position;
        let (y, z) = Self::oscillation(position.x, self.clock.elapsed_seconds());
        position.y = y;
        position.z = z;
        Ok(())
    }

    fn on_destroy(&mut self, entity: &mut EntityContext<'_>) -> Result<()> {
        base_entity_destroy(entity);
        info!("Entity {} on destroy", entity.tag());
        Ok(())
    }
}
