use std::time::Instant;

use super::{SkeletonBehavior, TrackingBuffer, active_body_only};
use crate::{
    context::TrackingContext,
    error::FsmError,
    features::BodyFeatures,
    fsm::FsmController,
    notify::Notifier,
    types::{Body, EventId, GestureId, Observation, StateId},
};

/// Lifecycle of one recording, in emission order.
#[derive(Clone, Debug, PartialEq)]
pub enum RecordingEvent {
    Starting { gesture: GestureId },
    Started { gesture: GestureId },
    FrameRecorded { gesture: GestureId, frame_count: usize },
    Stopping { gesture: GestureId },
    Stopped { gesture: GestureId, frames: Vec<Observation> },
}

impl RecordingEvent {
    pub fn gesture(&self) -> &GestureId {
        match self {
            RecordingEvent::Starting { gesture }
            | RecordingEvent::Started { gesture }
            | RecordingEvent::FrameRecorded { gesture, .. }
            | RecordingEvent::Stopping { gesture }
            | RecordingEvent::Stopped { gesture, .. } => gesture,
        }
    }
}

/// Captures the active body's movement as a new template.
///
/// Capture only begins once the pre-recording delay has passed since the
/// state was entered, so the user can get into position.
pub struct Recording {
    buffer: TrackingBuffer,
    recording_id: GestureId,
    started_at: Option<Instant>,
    can_record: bool,
    events: Notifier<RecordingEvent>,
}

impl Recording {
    pub fn new() -> Self {
        Self {
            buffer: TrackingBuffer::default(),
            recording_id: GestureId::unknown(),
            started_at: None,
            can_record: false,
            events: Notifier::new(),
        }
    }

    /// Labels the next recording only; the label resets to unknown once it stops.
    pub fn set_recording_id(&mut self, id: GestureId) {
        self.recording_id = id;
    }

    pub fn recording_id(&self) -> &GestureId {
        &self.recording_id
    }

    pub fn events(&mut self) -> &mut Notifier<RecordingEvent> {
        &mut self.events
    }

    pub fn frames(&self) -> Vec<Observation> {
        self.buffer.to_vec()
    }

    pub fn is_capturing(&self) -> bool {
        self.can_record
    }

    fn emit(&mut self, event: RecordingEvent) {
        self.events.emit(&event);
    }

    /// Opens the gate once the delay has elapsed, announcing it exactly once.
    fn check_can_record(&mut self, context: &TrackingContext) -> bool {
        if self.can_record {
            return true;
        }
        let Some(started_at) = self.started_at else {
            return false;
        };
        if context.now().duration_since(started_at) >= context.params.pre_recording_delay() {
            self.can_record = true;
            log::info!("recording {}", self.recording_id);
            self.emit(RecordingEvent::Started {
                gesture: self.recording_id.clone(),
            });
        }
        self.can_record
    }
}

impl Default for Recording {
    fn default() -> Self {
        Self::new()
    }
}

impl SkeletonBehavior for Recording {
    fn id(&self) -> StateId {
        StateId::Recording
    }

    fn on_enter(&mut self, context: &mut TrackingContext) {
        self.buffer.reset(context.params.max_frames);
        self.can_record = false;
        self.started_at = Some(context.now());
        self.emit(RecordingEvent::Starting {
            gesture: self.recording_id.clone(),
        });
    }

    fn on_exit(&mut self, _context: &mut TrackingContext) {
        let gesture = self.recording_id.clone();
        self.emit(RecordingEvent::Stopping {
            gesture: gesture.clone(),
        });
        self.can_record = false;
        self.started_at = None;
        log::info!("recorded {} frames for {gesture}", self.buffer.len());
        let frames = self.buffer.to_vec();
        self.emit(RecordingEvent::Stopped { gesture, frames });
        self.recording_id = GestureId::unknown();
    }

    fn observable_bodies<'f>(
        &self,
        bodies: Vec<&'f dyn Body>,
        context: &TrackingContext,
    ) -> Result<Vec<&'f dyn Body>, FsmError> {
        active_body_only(bodies, context)
    }

    fn process_body(
        &mut self,
        body: &dyn Body,
        context: &mut TrackingContext,
        controller: &mut dyn FsmController,
    ) -> Result<bool, FsmError> {
        if !self.buffer.next_frame_due(context.params.skip_frames) || !self.check_can_record(context)
        {
            return Ok(false);
        }

        if self.buffer.len() >= context.params.max_frames {
            log::debug!("recording buffer full at {} frames", self.buffer.len());
            controller.perform_transition(EventId::GoIdle);
            return Ok(false);
        }

        let features = BodyFeatures::for_context(body, context);
        let Some(observation) = features.observation() else {
            log::warn!("skipping frame without shoulders for {}", self.recording_id);
            return Ok(false);
        };
        self.buffer.push(observation.to_vec());

        let frame_count = self.buffer.len();
        log::trace!("{}: frame {frame_count}", self.recording_id);
        self.emit(RecordingEvent::FrameRecorded {
            gesture: self.recording_id.clone(),
            frame_count,
        });
        Ok(false)
    }
}
