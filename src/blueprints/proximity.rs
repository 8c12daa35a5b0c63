use anyhow::Result;
use log::{info, trace};

use crate::behaviour::{SceneBehaviour, SceneContext};
use crate::config::ProximityConfig;
use crate::events::FrameEvent;
use crate::math::{self, Vec3};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProximitySample {
    pub first: Vec3,
    pub second: Vec3,
    pub first_found: bool,
    pub second_found: bool,
    pub distance: f64,
}

/// Tracks the distance between the entities carrying two sentinel tags.
///
/// When several entities share a sentinel tag, the one registered last wins. A missing
/// sentinel is measured from the origin.
#[derive(Debug)]
pub struct ProximityScene {
    config: ProximityConfig,
    last: Option<ProximitySample>,
}

impl ProximityScene {
    pub fn new(config: ProximityConfig) -> Self {
        Self { config, last: None }
    }

    pub fn distance(&self, p1: Vec3, p2: Vec3) -> f64 {
        math::distance(p1, p2)
    }

    pub fn last_sample(&self) -> Option<&ProximitySample> {
        self.last.as_ref()
    }
}

impl SceneBehaviour for ProximityScene {
    fn on_create(&mut self, _scene: &mut SceneContext<'_>) -> Result<()> {
        info!("Scene created");
        Ok(())
    }

    fn on_update(&mut self, scene: &mut SceneContext<'_>, _delta_time: f64) -> Result<()> {
        let mut first = Vec3::ZERO;
        let mut second = Vec3::ZERO;
        let mut first_found = false;
        let mut second_found = false;
        for entity in scene.entities() {
            let tag = entity.tag.as_str();
            if tag == self.config.first_tag {
                first = entity.transform.position;
                first_found = true;
            } else if tag == self.config.second_tag {
                second = entity.transform.position;
                second_found = true;
            }
        }

        let distance = self.distance(first, second);
        trace!(
            "{} position = {first}, {} position = {second}, distance = {distance}",
            self.config.first_tag,
            self.config.second_tag
        );
        self.last = Some(ProximitySample { first, second, first_found, second_found, distance });

        if self.config.emit_telemetry {
            scene.emit(FrameEvent::Proximity {
                first: self.config.first_tag.clone(),
                second: self.config.second_tag.clone(),
                distance,
            });
        }
        Ok(())
    }

    fn on_destroy(&mut self, _scene: &mut SceneContext<'_>) -> Result<()> {
        info!("Scene destroyed");
        Ok(())
    }
}
