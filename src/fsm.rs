//! Event-driven controller sequencing the behavior states.
//!
//! States never call back into the controller while it is dispatching a
//! frame. They queue their requests on a [`FsmController`] instead, and the
//! controller applies them in order once the state has returned.

use std::{
    cell::RefCell,
    collections::{BTreeMap, HashMap},
    rc::Rc,
};

use crate::{
    error::FsmError,
    notify::Notifier,
    types::{EventId, Gesture, SkeletonFrame, StateId},
};

pub type SharedState<C> = Rc<RefCell<dyn State<C>>>;

pub trait State<C> {
    fn id(&self) -> StateId;

    fn state_entered(&mut self, context: &mut C);

    fn state_exited(&mut self, context: &mut C);

    fn process_skeletons(
        &mut self,
        frame: &dyn SkeletonFrame,
        context: &mut C,
        controller: &mut dyn FsmController,
    ) -> Result<(), FsmError>;
}

/// Requests a state may address to its controller.
pub trait FsmController {
    fn perform_transition(&mut self, event: EventId);

    fn raise_gesture_recognized(&mut self, gesture: Gesture, event: EventId);
}

#[derive(Clone, Debug, PartialEq)]
pub enum ControllerRequest {
    Transition(EventId),
    GestureRecognized(Gesture, EventId),
}

#[derive(Debug, Default)]
pub struct PendingRequests {
    requests: Vec<ControllerRequest>,
}

impl PendingRequests {
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    pub fn into_requests(self) -> Vec<ControllerRequest> {
        self.requests
    }
}

impl FsmController for PendingRequests {
    fn perform_transition(&mut self, event: EventId) {
        self.requests.push(ControllerRequest::Transition(event));
    }

    fn raise_gesture_recognized(&mut self, gesture: Gesture, event: EventId) {
        self.requests
            .push(ControllerRequest::GestureRecognized(gesture, event));
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StateChanged {
    pub old: StateId,
    pub new: StateId,
}

#[derive(Clone, Debug, PartialEq)]
pub struct GestureRecognized {
    pub gesture: Gesture,
    pub event: EventId,
}

/// Source of the transition table and the state instances it refers to.
pub trait FsmConfiguration<C> {
    fn state_transitions(&self) -> &BTreeMap<(StateId, EventId), StateId>;

    fn state(&self, id: StateId) -> Option<SharedState<C>>;
}

pub struct GesturesFsm<C> {
    transitions: HashMap<(StateId, EventId), SharedState<C>>,
    current: Option<SharedState<C>>,
    context: C,
    state_changed: Notifier<StateChanged>,
    gesture_recognized: Notifier<GestureRecognized>,
}

impl<C> GesturesFsm<C> {
    pub fn new(context: C) -> Self {
        Self {
            transitions: HashMap::new(),
            current: None,
            context,
            state_changed: Notifier::new(),
            gesture_recognized: Notifier::new(),
        }
    }

    pub fn context(&self) -> &C {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut C {
        &mut self.context
    }

    pub fn current(&self) -> Option<&SharedState<C>> {
        self.current.as_ref()
    }

    /// Identity of the current state, `Unknown` before the first transition.
    pub fn current_state_id(&self) -> StateId {
        self.current
            .as_ref()
            .map_or(StateId::Unknown, |state| state.borrow().id())
    }

    pub fn state_changed(&mut self) -> &mut Notifier<StateChanged> {
        &mut self.state_changed
    }

    pub fn gesture_recognized(&mut self) -> &mut Notifier<GestureRecognized> {
        &mut self.gesture_recognized
    }

    pub fn add_transition(
        &mut self,
        from: StateId,
        event: EventId,
        state: SharedState<C>,
    ) -> Result<(), FsmError> {
        let key = (from, event);
        if self.transitions.contains_key(&key) {
            return Err(FsmError::DuplicateTransition { from, event });
        }
        self.transitions.insert(key, state);
        Ok(())
    }

    /// Enters the first state through `GoIdle`.
    pub fn initialize(&mut self) -> Result<(), FsmError> {
        if self.transitions.is_empty() {
            return Err(FsmError::EmptyTransitionTable);
        }
        self.perform_transition(EventId::GoIdle)
    }

    pub fn initialize_from_configuration(
        &mut self,
        config: &impl FsmConfiguration<C>,
    ) -> Result<(), FsmError> {
        for (&(from, event), &to) in config.state_transitions() {
            let state = config.state(to).ok_or(FsmError::MissingState(to))?;
            self.add_transition(from, event, state)?;
        }
        self.initialize()
    }

    pub fn perform_transition(&mut self, event: EventId) -> Result<(), FsmError> {
        let old_id = self.current_state_id();
        let next = self
            .transitions
            .get(&(old_id, event))
            .cloned()
            .ok_or(FsmError::NoTransition {
                from: old_id,
                event,
            })?;
        let new_id = next.borrow().id();
        let old = self.current.replace(next.clone());

        // Self-transitions keep the running state untouched.
        if new_id == old_id {
            log::trace!("{event} keeps state {old_id}");
            return Ok(());
        }

        if let Some(old) = old {
            old.borrow_mut().state_exited(&mut self.context);
        }
        next.borrow_mut().state_entered(&mut self.context);

        log::debug!("state changed from {old_id} to {new_id} on {event}");
        self.state_changed.emit(&StateChanged {
            old: old_id,
            new: new_id,
        });
        Ok(())
    }

    /// Transitions on `event`, then notifies subscribers of the gesture.
    pub fn raise_gesture_recognized(
        &mut self,
        gesture: Gesture,
        event: EventId,
    ) -> Result<(), FsmError> {
        self.perform_transition(event)?;

        log::info!("gesture {} recognized", gesture.display_text());
        self.gesture_recognized
            .emit(&GestureRecognized { gesture, event });
        Ok(())
    }

    /// Hands one frame to the current state and applies what it requested.
    pub fn process_skeletons(&mut self, frame: &dyn SkeletonFrame) -> Result<(), FsmError> {
        let Some(current) = self.current.clone() else {
            log::trace!("frame {} arrived before initialization", frame.frame_number());
            return Ok(());
        };

        let mut pending = PendingRequests::default();
        current
            .borrow_mut()
            .process_skeletons(frame, &mut self.context, &mut pending)?;

        self.apply(pending)
    }

    fn apply(&mut self, pending: PendingRequests) -> Result<(), FsmError> {
        for request in pending.into_requests() {
            match request {
                ControllerRequest::Transition(event) => self.perform_transition(event)?,
                ControllerRequest::GestureRecognized(gesture, event) => {
                    self.raise_gesture_recognized(gesture, event)?
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FrameData, GestureId};

    type Log = Rc<RefCell<Vec<String>>>;

    struct ProbeState {
        id: StateId,
        log: Log,
        on_frame: Vec<ControllerRequest>,
    }

    impl ProbeState {
        fn shared(id: StateId, log: &Log) -> Rc<RefCell<ProbeState>> {
            Rc::new(RefCell::new(ProbeState {
                id,
                log: log.clone(),
                on_frame: Vec::new(),
            }))
        }
    }

    impl State<()> for ProbeState {
        fn id(&self) -> StateId {
            self.id
        }

        fn state_entered(&mut self, _context: &mut ()) {
            self.log.borrow_mut().push(format!("enter {}", self.id));
        }

        fn state_exited(&mut self, _context: &mut ()) {
            self.log.borrow_mut().push(format!("exit {}", self.id));
        }

        fn process_skeletons(
            &mut self,
            _frame: &dyn SkeletonFrame,
            _context: &mut (),
            controller: &mut dyn FsmController,
        ) -> Result<(), FsmError> {
            for request in self.on_frame.drain(..) {
                match request {
                    ControllerRequest::Transition(event) => controller.perform_transition(event),
                    ControllerRequest::GestureRecognized(gesture, event) => {
                        controller.raise_gesture_recognized(gesture, event)
                    }
                }
            }
            Ok(())
        }
    }

    fn recording_fsm(log: &Log) -> GesturesFsm<()> {
        let mut fsm = GesturesFsm::new(());
        let sink = log.clone();
        fsm.state_changed().subscribe(move |c: &StateChanged| {
            sink.borrow_mut()
                .push(format!("changed {}->{}", c.old, c.new))
        });
        let sink = log.clone();
        fsm.gesture_recognized().subscribe(move |g: &GestureRecognized| {
            sink.borrow_mut().push(format!("gesture {}", g.gesture.id))
        });
        fsm
    }

    #[test]
    fn first_transition_starts_from_unknown() {
        let log = Log::default();
        let idle = ProbeState::shared(StateId::Idle, &log);
        let mut fsm = recording_fsm(&log);
        assert_eq!(fsm.current_state_id(), StateId::Unknown);

        fsm.add_transition(StateId::Unknown, EventId::GoIdle, idle.clone())
            .unwrap();
        fsm.initialize().unwrap();

        assert_eq!(fsm.current_state_id(), StateId::Idle);
        assert!(Rc::ptr_eq(
            fsm.current().unwrap(),
            &(idle as SharedState<()>)
        ));
        assert_eq!(*log.borrow(), ["enter Idle", "changed Unknown->Idle"]);
    }

    #[test]
    fn missing_transition_fails_even_before_the_first_one() {
        let mut fsm = GesturesFsm::new(());
        assert!(matches!(
            fsm.perform_transition(EventId::Unknown),
            Err(FsmError::NoTransition {
                from: StateId::Unknown,
                event: EventId::Unknown
            })
        ));
    }

    #[test]
    fn transition_into_the_same_state_is_silent() {
        let log = Log::default();
        let idle = ProbeState::shared(StateId::Idle, &log);
        let mut fsm = recording_fsm(&log);
        fsm.add_transition(StateId::Unknown, EventId::GoIdle, idle.clone())
            .unwrap();
        fsm.add_transition(StateId::Idle, EventId::GoIdle, idle)
            .unwrap();

        fsm.initialize().unwrap();
        fsm.perform_transition(EventId::GoIdle).unwrap();
        fsm.perform_transition(EventId::GoIdle).unwrap();

        assert_eq!(*log.borrow(), ["enter Idle", "changed Unknown->Idle"]);
    }

    #[test]
    fn transition_into_another_state_exits_then_enters() {
        let log = Log::default();
        let idle = ProbeState::shared(StateId::Idle, &log);
        let recording = ProbeState::shared(StateId::Recording, &log);
        let mut fsm = recording_fsm(&log);
        fsm.add_transition(StateId::Unknown, EventId::GoIdle, idle)
            .unwrap();
        fsm.add_transition(StateId::Idle, EventId::Record, recording)
            .unwrap();

        fsm.initialize().unwrap();
        log.borrow_mut().clear();
        fsm.perform_transition(EventId::Record).unwrap();

        assert_eq!(
            *log.borrow(),
            ["exit Idle", "enter Recording", "changed Idle->Recording"]
        );
        assert_eq!(fsm.current_state_id(), StateId::Recording);
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let log = Log::default();
        let mut fsm = GesturesFsm::new(());
        fsm.add_transition(
            StateId::Idle,
            EventId::Record,
            ProbeState::shared(StateId::Recording, &log),
        )
        .unwrap();

        let again = fsm.add_transition(
            StateId::Idle,
            EventId::Record,
            ProbeState::shared(StateId::Idle, &log),
        );
        assert!(matches!(
            again,
            Err(FsmError::DuplicateTransition {
                from: StateId::Idle,
                event: EventId::Record
            })
        ));
    }

    #[test]
    fn gesture_notification_follows_the_transition() {
        let log = Log::default();
        let idle = ProbeState::shared(StateId::Idle, &log);
        let waiting = ProbeState::shared(StateId::WaitingForCommand, &log);
        let mut fsm = recording_fsm(&log);
        fsm.add_transition(StateId::Unknown, EventId::GoIdle, idle)
            .unwrap();
        fsm.add_transition(StateId::Idle, EventId::WaitForCommand, waiting)
            .unwrap();
        fsm.initialize().unwrap();
        log.borrow_mut().clear();

        let swipe = Gesture {
            id: GestureId::new("Swipe"),
            min_distance: 0.1,
        };
        fsm.raise_gesture_recognized(swipe, EventId::WaitForCommand)
            .unwrap();

        assert_eq!(
            *log.borrow(),
            [
                "exit Idle",
                "enter WaitingForCommand",
                "changed Idle->WaitingForCommand",
                "gesture Swipe"
            ]
        );
    }

    #[test]
    fn requests_queued_during_a_frame_are_applied_afterwards() {
        let log = Log::default();
        let idle = ProbeState::shared(StateId::Idle, &log);
        idle.borrow_mut()
            .on_frame
            .push(ControllerRequest::Transition(EventId::Record));
        let recording = ProbeState::shared(StateId::Recording, &log);
        let mut fsm = recording_fsm(&log);
        fsm.add_transition(StateId::Unknown, EventId::GoIdle, idle)
            .unwrap();
        fsm.add_transition(StateId::Idle, EventId::Record, recording)
            .unwrap();
        fsm.initialize().unwrap();

        fsm.process_skeletons(&FrameData::default()).unwrap();
        assert_eq!(fsm.current_state_id(), StateId::Recording);
    }

    #[test]
    fn empty_table_cannot_be_initialized() {
        struct Empty(BTreeMap<(StateId, EventId), StateId>);

        impl FsmConfiguration<()> for Empty {
            fn state_transitions(&self) -> &BTreeMap<(StateId, EventId), StateId> {
                &self.0
            }

            fn state(&self, _id: StateId) -> Option<SharedState<()>> {
                None
            }
        }

        let mut fsm = GesturesFsm::new(());
        assert!(matches!(
            fsm.initialize_from_configuration(&Empty(BTreeMap::new())),
            Err(FsmError::EmptyTransitionTable)
        ));
    }
}
