use anyhow::{Context, Result};
use log::{info, trace};

use crate::behaviour::{ParticleContext, ParticleSystemBehaviour};
use crate::config::{OscillatorConfig, StepMode};
use crate::time::SimClock;

/// Tolerance for accumulated float error when reading the envelope phase.
const PHASE_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeDirection {
    Rising,
    Falling,
}

impl EnvelopeDirection {
    fn sign(self) -> f64 {
        match self {
            EnvelopeDirection::Rising => 1.0,
            EnvelopeDirection::Falling => -1.0,
        }
    }
}

/// Triangle-wave envelope on scale and gravity, with the emitter swaying on x/z.
///
/// The first `rising_span` of every period grows scale and gravity, the rest of the period
/// shrinks them by the same step, so a full period of equal ticks nets to zero.
#[derive(Debug)]
pub struct ParticleOscillator {
    config: OscillatorConfig,
    clock: SimClock,
}

impl ParticleOscillator {
    pub fn new(config: OscillatorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, clock: SimClock::new() })
    }

    pub fn config(&self) -> &OscillatorConfig {
        &self.config
    }

    pub fn elapsed(&self) -> f64 {
        self.clock.elapsed_seconds()
    }

    fn phase(&self, t: f64) -> f64 {
        let phase = t.rem_euclid(self.config.period);
        if self.config.period - phase < PHASE_EPSILON {
            0.0
        } else {
            phase
        }
    }

    pub fn direction_at(&self, t: f64) -> EnvelopeDirection {
        if self.phase(t) < self.config.rising_span - PHASE_EPSILON {
            EnvelopeDirection::Rising
        } else {
            EnvelopeDirection::Falling
        }
    }

    /// Rising time contained in `[0, t]`.
    fn rising_time(&self, t: f64) -> f64 {
        let cycles = (t / self.config.period).floor();
        let phase = t - cycles * self.config.period;
        cycles * self.config.rising_span + phase.clamp(0.0, self.config.rising_span)
    }

    /// Signed weight of the interval `[t, t + delta_time)`: time spent rising minus time spent
    /// falling. Consecutive ticks telescope, so a whole period sums to zero for any tick size.
    pub fn envelope_weight(&self, t: f64, delta_time: f64) -> f64 {
        let rising = self.rising_time(t + delta_time) - self.rising_time(t);
        2.0 * rising - delta_time
    }
}

impl ParticleSystemBehaviour for ParticleOscillator {
    fn on_create(&mut self, system: &mut ParticleContext<'_>) -> Result<()> {
        let snapshot = serde_json::to_string_pretty(&system.parameter_snapshot())
            .context("serializing particle parameters")?;
        info!("Particle system is created. Parameters: {snapshot}");
        Ok(())
    }

    fn on_update(&mut self, system: &mut ParticleContext<'_>, delta_time: f64) -> Result<()> {
        // Each tick covers [t, t + delta_time); per-tick steps sample the direction at its start.
        let t = self.clock.elapsed_seconds();
        let direction = self.direction_at(t);
        let sign = match self.config.step_mode {
            StepMode::PerTick => direction.sign(),
            StepMode::Integrated => self.envelope_weight(t, delta_time),
        };
        let bounds = self.config.bounds;

        let params = system.parameters_mut();
        params.scale += sign * self.config.scale_step;
        params.gravity_effect += sign * self.config.gravity_step;
        params.position.x += sign * t.sin();
        params.position.z += sign * t.cos();
        if let Some(range) = bounds.scale {
            params.scale = range.clamp(params.scale);
        }
        if let Some(range) = bounds.gravity_effect {
            params.gravity_effect = range.clamp(params.gravity_effect);
        }
        trace!(
            "particle envelope t={t:.3} {direction:?} weight={sign:.4} scale={:.4} gravity={:.4}",
            params.scale,
            params.gravity_effect
        );

        self.clock.advance(delta_time);
        Ok(())
    }

    fn on_destroy(&mut self, system: &mut ParticleContext<'_>) -> Result<()> {
        info!("Particle system {} destroyed", system.owner());
        Ok(())
    }
}
