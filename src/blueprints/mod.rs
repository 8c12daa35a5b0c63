//! Concrete behaviours shipped with the crate.

mod ball;
mod cube;
mod particle_oscillator;
mod proximity;

pub use ball::BallBlueprint;
pub use cube::CubeBlueprint;
pub use particle_oscillator::{EnvelopeDirection, ParticleOscillator};
pub use proximity::{ProximitySample, ProximityScene};
