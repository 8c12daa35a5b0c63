use anyhow::Result;
use log::info;

use crate::behaviour::{base_entity_create, base_entity_destroy, EntityBehaviour, EntityContext};
use crate::time::SimClock;

/// Drifts an entity around the xz plane, tracing a circle of radius `speed`.
#[derive(Debug)]
pub struct CubeBlueprint {
    clock: SimClock,
    speed: f64,
}

impl CubeBlueprint {
    pub fn new(speed: f64) -> Self {
        Self { clock: SimClock::new(), speed }
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }
}

impl EntityBehaviour for CubeBlueprint {
    fn on_create(&mut self, entity: &mut EntityContext<'_>) -> Result<()> {
        base_entity_create(entity);
        info!("Entity {} created", entity.tag());
        Ok(())
    }

    fn on_update(&mut self, entity: &mut EntityContext<'_>, delta_time: f64) -> Result<()> {
        self.clock.advance(delta_time);
        let t = self.clock.elapsed_seconds();
        let step = self.speed * delta_time;
        let position = &mut entity.transform_mut().position;
        position.x += t.sin() * step;
        position.z += t.cos() * step;
        Ok(())
    }

    fn on_destroy(&mut self, entity: &mut EntityContext<'_>) -> Result<()> {
        base_entity_destroy(entity);
        info!("Entity {} on destroy", entity.tag());
        Ok(())
    }
}
