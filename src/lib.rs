//! Skeletal gesture recognition driven by a configurable state machine.
//!
//! Raw body frames are normalized into observation vectors, buffered by the
//! active behavior state and matched against recorded templates with dynamic
//! time warping. Recognized gestures raise events on [`fsm::GesturesFsm`],
//! which moves between idle, waiting-for-command and recording.

pub mod clock;
pub mod config;
pub mod context;
pub mod error;
pub mod features;
pub mod fsm;
pub mod library;
pub mod notify;
pub mod persistence;
pub mod pipeline;
pub mod recognizer;
pub mod session;
pub mod states;
pub mod types;

pub use self::{
    clock::{Clock, ManualClock, SystemClock},
    config::Configuration,
    context::{TrackingContext, TrackingMode, TrackingParameters},
    error::{ConfigError, FsmError, RecognitionError, SessionError, TemplateError},
    recognizer::{DtwRecognizer, ThresholdSettings},
    session::{Session, SessionNotification},
    types::{
        Body, EventId, FrameData, Gesture, GestureId, JointId, Observation, SkeletonData,
        SkeletonFrame, StateId, Vector3,
    },
};
