use std::{collections::BTreeMap, rc::Rc};

use crossbeam_channel::Sender;

use crate::{
    clock::{Clock, SystemClock},
    config::Configuration,
    context::TrackingContext,
    error::{FsmError, SessionError},
    fsm::{FsmConfiguration, GestureRecognized, GesturesFsm, SharedState, StateChanged},
    states::{RecordingEvent, StateSet},
    types::{EventId, GestureId, SkeletonFrame, StateId},
};

/// Everything a session reports to its observers.
#[derive(Clone, Debug, PartialEq)]
pub enum SessionNotification {
    StateChanged(StateChanged),
    GestureRecognized(GestureRecognized),
    Recording(RecordingEvent),
}

struct Wiring<'a> {
    transitions: &'a BTreeMap<(StateId, EventId), StateId>,
    states: &'a StateSet,
}

impl FsmConfiguration<TrackingContext> for Wiring<'_> {
    fn state_transitions(&self) -> &BTreeMap<(StateId, EventId), StateId> {
        self.transitions
    }

    fn state(&self, id: StateId) -> Option<SharedState<TrackingContext>> {
        self.states.get(id)
    }
}

/// One tracking session: the controller, its states and their shared context.
pub struct Session {
    fsm: GesturesFsm<TrackingContext>,
    states: StateSet,
    transitions: BTreeMap<(StateId, EventId), StateId>,
}

impl Session {
    pub fn new(config: &Configuration) -> Result<Self, SessionError> {
        Self::with_clock(config, Rc::new(SystemClock))
    }

    /// Builds the states and the controller. Nothing runs until [`Session::start`].
    pub fn with_clock(config: &Configuration, clock: Rc<dyn Clock>) -> Result<Self, SessionError> {
        let context = config.create_context(clock)?;
        let states = StateSet::from_declared(config.states(), config.library().clone());

        Ok(Self {
            fsm: GesturesFsm::new(context),
            states,
            transitions: config.state_transitions().clone(),
        })
    }

    /// Registers the transition table and enters the first state.
    pub fn start(&mut self) -> Result<(), SessionError> {
        let wiring = Wiring {
            transitions: &self.transitions,
            states: &self.states,
        };
        self.fsm.initialize_from_configuration(&wiring)?;
        log::info!("session started in {}", self.fsm.current_state_id());
        Ok(())
    }

    pub fn process_frame(&mut self, frame: &dyn SkeletonFrame) -> Result<(), SessionError> {
        self.fsm.process_skeletons(frame)?;
        Ok(())
    }

    /// Records the next movement of the active body as `gesture`.
    pub fn start_recording(&mut self, gesture: GestureId) -> Result<(), SessionError> {
        if self.fsm.context().current_cue.is_none() {
            return Err(SessionError::NoCueSelected);
        }
        let recording = self
            .states
            .recording
            .as_ref()
            .ok_or(FsmError::MissingState(StateId::Recording))?;
        recording.borrow_mut().behavior_mut().set_recording_id(gesture);

        self.fsm.perform_transition(EventId::Record)?;
        Ok(())
    }

    pub fn current_state(&self) -> StateId {
        self.fsm.current_state_id()
    }

    pub fn context(&self) -> &TrackingContext {
        self.fsm.context()
    }

    pub fn states(&self) -> &StateSet {
        &self.states
    }

    pub fn on_state_changed(&mut self, subscriber: impl FnMut(&StateChanged) + 'static) {
        self.fsm.state_changed().subscribe(subscriber);
    }

    pub fn on_gesture_recognized(&mut self, subscriber: impl FnMut(&GestureRecognized) + 'static) {
        self.fsm.gesture_recognized().subscribe(subscriber);
    }

    /// No-op when the configuration declares no recording state.
    pub fn on_recording(&mut self, subscriber: impl FnMut(&RecordingEvent) + 'static) {
        if let Some(recording) = &self.states.recording {
            recording
                .borrow_mut()
                .behavior_mut()
                .events()
                .subscribe(subscriber);
        }
    }

    /// Sends every notification, in emission order, into `tx`.
    pub fn forward_notifications(&mut self, tx: Sender<SessionNotification>) {
        self.fsm
            .state_changed()
            .forward_to(tx.clone(), SessionNotification::StateChanged);
        self.fsm
            .gesture_recognized()
            .forward_to(tx.clone(), SessionNotification::GestureRecognized);
        if let Some(recording) = &self.states.recording {
            recording
                .borrow_mut()
                .behavior_mut()
                .events()
                .forward_to(tx, SessionNotification::Recording);
        }
    }
}
