use std::{sync::Arc, time::Instant};

use super::{SkeletonBehavior, TrackingBuffer, active_body_only};
use crate::{
    context::TrackingContext,
    error::FsmError,
    features::BodyFeatures,
    fsm::FsmController,
    library::GestureLibrary,
    recognizer::DtwRecognizer,
    types::{Body, EventId, StateId},
};

/// Follows the active body and matches its recent movement against the
/// gestures that have a transition out of this state.
pub struct WaitingForCommand {
    library: Arc<GestureLibrary>,
    recognizer: DtwRecognizer,
    buffer: TrackingBuffer,
    last_recognition: Option<Instant>,
}

impl WaitingForCommand {
    pub fn new(library: Arc<GestureLibrary>) -> Self {
        Self {
            library,
            recognizer: DtwRecognizer::default(),
            buffer: TrackingBuffer::default(),
            last_recognition: None,
        }
    }

    pub fn recognizer(&self) -> &DtwRecognizer {
        &self.recognizer
    }

    pub fn buffered_frames(&self) -> usize {
        self.buffer.len()
    }

    fn reset(&mut self, context: &TrackingContext) {
        self.buffer.reset(context.params.max_frames);
        self.last_recognition = Some(context.now());
    }

    fn load_gestures_to_match(&mut self, context: &TrackingContext) {
        self.recognizer.clear();
        self.recognizer
            .set_dimension(context.tracking_dimensionality());

        for (gesture, frames, settings) in self.library.templates_for_state(self.id()) {
            if let Err(err) = self
                .recognizer
                .add_template(gesture.clone(), frames.to_vec(), settings)
            {
                log::warn!("template {gesture} does not fit the current cue: {err}");
            }
        }
        log::debug!(
            "matching {} templates of dimension {}",
            self.recognizer.len(),
            self.recognizer.dimension()
        );
    }

    fn idle_for_too_long(&self, context: &TrackingContext) -> bool {
        self.last_recognition.is_some_and(|last| {
            context.now().duration_since(last) > context.params.idle_timeout()
        })
    }
}

impl SkeletonBehavior for WaitingForCommand {
    fn id(&self) -> StateId {
        StateId::WaitingForCommand
    }

    fn on_enter(&mut self, context: &mut TrackingContext) {
        self.reset(context);
        self.load_gestures_to_match(context);
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
        if !self.buffer.next_frame_due(context.params.skip_frames) {
            return Ok(false);
        }

        if self.buffer.len() >= context.params.min_frames {
            let gesture = self.recognizer.recognize(self.buffer.frames())?;
            if gesture.is_recognized() {
                let event = self.library.event_for(self.id(), &gesture.id).ok_or_else(|| {
                    FsmError::MissingGestureTransition {
                        state: self.id(),
                        gesture: gesture.id.clone(),
                    }
                })?;
                controller.raise_gesture_recognized(gesture, event);
                self.reset(context);
            }
        }

        if self.idle_for_too_long(context) {
            log::debug!("no gesture within {:?}, going idle", context.params.idle_timeout());
            controller.perform_transition(EventId::GoIdle);
        }

        let features = BodyFeatures::for_context(body, context);
        match features.observation() {
            Some(observation) => self
                .buffer
                .push_bounded(observation.to_vec(), context.params.max_frames),
            None => log::trace!("body {} has no usable observation", body.tracking_id()),
        }

        // only the active body is observed
        Ok(false)
    }
}
