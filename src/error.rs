use thiserror::Error;

use crate::behaviour::{BehaviourOwner, LifecyclePhase, LifecycleStage};

#[derive(Debug, Error)]
pub enum BlueprintError {
    #[error("failed to construct blueprint for {owner}: {source}")]
    Construction {
        owner: BehaviourOwner,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },
    #[error("uuid '{0}' is already registered in this scene")]
    DuplicateUuid(String),
    #[error("unknown entity {0:?}")]
    UnknownEntity(bevy_ecs::entity::Entity),
    #[error("unknown particle system {0:?}")]
    UnknownParticleSystem(bevy_ecs::entity::Entity),
    #[error("{owner} already has a behaviour attached")]
    AlreadyAttached { owner: BehaviourOwner },
    #[error("invalid delta time {0}: must be finite and non-negative")]
    InvalidDelta(f64),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("runtime has been shut down")]
    Shutdown,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot run {attempted:?} while behaviour is {current:?}")]
pub struct LifecycleError {
    pub current: LifecyclePhase,
    pub attempted: LifecycleStage,
}

pub type BlueprintResult<T> = Result<T, BlueprintError>;
