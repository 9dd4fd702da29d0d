//! Error types shared by the recognition core, configuration loading and
//! template persistence.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::{EventId, GestureId, StateId};

#[derive(Debug, Error)]
pub enum RecognitionError {
    #[error("cannot match an empty sequence")]
    EmptySequence,

    #[error("observation has {actual} coordinates, matcher needs {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
}

#[derive(Debug, Error)]
pub enum FsmError {
    #[error("no transition for event {event} from state {from}")]
    NoTransition { from: StateId, event: EventId },

    #[error("transition for event {event} from state {from} is already registered")]
    DuplicateTransition { from: StateId, event: EventId },

    #[error("transition table is empty")]
    EmptyTransitionTable,

    #[error("no state instance for {0}")]
    MissingState(StateId),

    #[error("no active body has been selected")]
    NoActiveBody,

    #[error("gesture {gesture} has no transition from state {state}")]
    MissingGestureTransition { state: StateId, gesture: GestureId },

    #[error(transparent)]
    Recognition(#[from] RecognitionError),
}

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("template file {0:?} does not exist")]
    NotFound(PathBuf),

    #[error("failed to access template file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode template file {path:?}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode template file {path:?}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("template for gesture {0} has no frames")]
    Empty(GestureId),

    #[error("template for gesture {gesture} mixes frame sizes ({expected} and {actual})")]
    Ragged {
        gesture: GestureId,
        expected: usize,
        actual: usize,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration {path:?}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("gesture {0} is not declared in the gestures section")]
    UndeclaredGesture(GestureId),

    #[error("state {0} is not declared in the states section")]
    UndeclaredState(StateId),

    #[error("state {0} cannot be declared")]
    ReservedState(StateId),

    #[error("gesture label {0} is reserved")]
    ReservedGesture(GestureId),

    #[error("gesture {0} is declared more than once")]
    DuplicateGesture(GestureId),

    #[error("duplicate transition from {from} on {trigger}")]
    DuplicateTransition { from: StateId, trigger: String },

    #[error("gesture {0} has no own threshold settings and no general settings exist")]
    MissingThresholds(GestureId),

    #[error("tracking parameters are not configured")]
    MissingTrackingParameters,

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error(transparent)]
    Template(#[from] TemplateError),
}

impl ConfigError {
    pub(crate) fn invalid_value(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            field,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Fsm(#[from] FsmError),

    #[error("raise a hand to select the limb before recording")]
    NoCueSelected,
}
