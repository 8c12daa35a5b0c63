use serde::{Deserialize, Serialize};
use std::fmt;

use crate::behaviour::{BehaviourOwner, LifecycleStage};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FrameEvent {
    BehaviourFault { owner: BehaviourOwner, stage: LifecycleStage, message: String },
    NonFiniteRejected { owner: BehaviourOwner },
    Proximity { first: String, second: String, distance: f64 },
    ScriptMessage { owner: BehaviourOwner, message: String },
}

impl fmt::Display for FrameEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameEvent::BehaviourFault { owner, stage, message } => {
                write!(f, "BehaviourFault owner={owner} stage={stage:?} message={message}")
            }
            FrameEvent::NonFiniteRejected { owner } => write!(f, "NonFiniteRejected owner={owner}"),
            FrameEvent::Proximity { first, second, distance } => {
                write!(f, "Proximity {first}<->{second} distance={distance:.3}")
            }
            FrameEvent::ScriptMessage { owner, message } => write!(f, "ScriptMessage owner={owner} {message}"),
        }
    }
}

#[derive(Debug, Default)]
pub struct EventBus {
    events: Vec<FrameEvent>,
}

impl EventBus {
    pub fn push(&mut self, event: FrameEvent) {
        self.events.push(event);
    }

    pub fn drain(&mut self) -> Vec<FrameEvent> {
        self.events.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
