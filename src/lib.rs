pub mod behaviour;
pub mod blueprints;
pub mod cli;
pub mod components;
pub mod config;
pub mod error;
pub mod events;
pub mod harness;
pub mod logging;
pub mod math;
pub mod runtime;
#[cfg(feature = "scripting")]
pub mod scripts;
pub mod time;

pub use behaviour::{EntityBehaviour, ParticleSystemBehaviour, SceneBehaviour};
pub use error::{BlueprintError, BlueprintResult};
pub use runtime::BlueprintRuntime;
