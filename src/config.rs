use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StepMode {
    /// One full step per `on_update` call regardless of `delta_time`. Drifts when the tick
    /// rate is irregular because the number of steps per half-period varies.
    PerTick,
    /// Steps are rates per time unit and are multiplied by `delta_time`.
    #[default]
    Integrated,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: f64,
    pub max: f64,
}

impl Bounds {
    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct EnvelopeBounds {
    #[serde(default)]
    pub scale: Option<Bounds>,
    #[serde(default)]
    pub gravity_effect: Option<Bounds>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default = "RuntimeConfig::default_max_delta_time")]
    pub max_delta_time: f64,
    #[serde(default = "RuntimeConfig::default_validate_finite")]
    pub validate_finite: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OscillatorConfig {
    #[serde(default = "OscillatorConfig::default_period")]
    pub period: f64,
    #[serde(default = "OscillatorConfig::default_rising_span")]
    pub rising_span: f64,
    #[serde(default = "OscillatorConfig::default_scale_step")]
    pub scale_step: f64,
    #[serde(default = "OscillatorConfig::default_gravity_step")]
    pub gravity_step: f64,
    #[serde(default)]
    pub step_mode: StepMode,
    #[serde(default)]
    pub bounds: EnvelopeBounds,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProximityConfig {
    #[serde(default = "ProximityConfig::default_first_tag")]
    pub first_tag: String,
    #[serde(default = "ProximityConfig::default_second_tag")]
    pub second_tag: String,
    #[serde(default)]
    pub emit_telemetry: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EntityBlueprintConfig {
    #[serde(default = "EntityBlueprintConfig::default_cube_speed")]
    pub cube_speed: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct BlueprintConfig {
    #[serde(default)]
    pub runtime: RuntimeConfig,
    #[serde(default)]
    pub particles: OscillatorConfig,
    #[serde(default)]
    pub scene: ProximityConfig,
    #[serde(default)]
    pub entities: EntityBlueprintConfig,
}

impl RuntimeConfig {
    fn default_max_delta_time() -> f64 {
        0.25
    }

    const fn default_validate_finite() -> bool {
        true
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self { max_delta_time: Self::default_max_delta_time(), validate_finite: Self::default_validate_finite() }
    }
}

impl OscillatorConfig {
    fn default_period() -> f64 {
        10.0
    }

    fn default_rising_span() -> f64 {
        5.0
    }

    fn default_scale_step() -> f64 {
        0.02
    }

    fn default_gravity_step() -> f64 {
        0.5
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.period.is_finite() && self.period > 0.0) {
            bail!("particles.period must be a positive number (got {})", self.period);
        }
        if !(self.rising_span > 0.0 && self.rising_span < self.period) {
            bail!("particles.rising_span must lie strictly inside (0, {}) (got {})", self.period, self.rising_span);
        }
        if !self.scale_step.is_finite() || !self.gravity_step.is_finite() {
            bail!("particles step sizes must be finite");
        }
        for (name, bounds) in [("scale", self.bounds.scale), ("gravity_effect", self.bounds.gravity_effect)] {
            if let Some(bounds) = bounds {
                if !(bounds.min <= bounds.max) {
                    bail!("particles.bounds.{name}: min {} exceeds max {}", bounds.min, bounds.max);
                }
            }
        }
        Ok(())
    }
}

impl Default for OscillatorConfig {
    fn default() -> Self {
        Self {
            period: Self::default_period(),
            rising_span: Self::default_rising_span(),
            scale_step: Self::default_scale_step(),
            gravity_step: Self::default_gravity_step(),
            step_mode: StepMode::default(),
            bounds: EnvelopeBounds::default(),
        }
    }
}

impl ProximityConfig {
    fn default_first_tag() -> String {
        "Cyborg".to_string()
    }

    fn default_second_tag() -> String {
        "Cube".to_string()
    }
}

impl Default for ProximityConfig {
    fn default() -> Self {
        Self {
            first_tag: Self::default_first_tag(),
            second_tag: Self::default_second_tag(),
            emit_telemetry: false,
        }
    }
}

impl EntityBlueprintConfig {
    fn default_cube_speed() -> f64 {
        60.0
    }
}

impl Default for EntityBlueprintConfig {
    fn default() -> Self {
        Self { cube_speed: Self::default_cube_speed() }
    }
}

impl BlueprintConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes =
            fs::read(path).with_context(|| format!("Failed to read config file {}", path.display()))?;
        let cfg: Self = serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        cfg.validate().with_context(|| format!("Invalid config file {}", path.display()))?;
        Ok(cfg)
    }

    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(err) => {
                log::warn!("Config load error: {err:?}. Falling back to defaults.");
                Self::default()
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.runtime.max_delta_time.is_finite() && self.runtime.max_delta_time > 0.0) {
            bail!("runtime.max_delta_time must be a positive number (got {})", self.runtime.max_delta_time);
        }
        if self.scene.first_tag.is_empty() || self.scene.second_tag.is_empty() {
            bail!("scene sentinel tags must not be empty");
        }
        if self.scene.first_tag == self.scene.second_tag {
            bail!("scene sentinel tags must differ (both are '{}')", self.scene.first_tag);
        }
        if !self.entities.cube_speed.is_finite() {
            bail!("entities.cube_speed must be finite");
        }
        self.particles.validate()
    }
}
