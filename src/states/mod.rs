//! Behavior states driven by [`GesturesFsm`](crate::fsm::GesturesFsm).
//!
//! Every concrete state only decides which bodies it watches and what it does
//! with each of them; [`BehaviorState`] supplies the shared frame dispatch.

mod idle;
mod recording;
mod waiting;

use std::{cell::RefCell, collections::BTreeSet, collections::VecDeque, rc::Rc, sync::Arc};

pub use self::{
    idle::Idle,
    recording::{Recording, RecordingEvent},
    waiting::WaitingForCommand,
};
use crate::{
    context::TrackingContext,
    error::FsmError,
    fsm::{FsmController, SharedState, State},
    library::GestureLibrary,
    types::{Body, Observation, SkeletonFrame, StateId},
};

pub trait SkeletonBehavior {
    fn id(&self) -> StateId;

    /// Bodies of the frame this state wants to look at.
    fn observable_bodies<'f>(
        &self,
        bodies: Vec<&'f dyn Body>,
        context: &TrackingContext,
    ) -> Result<Vec<&'f dyn Body>, FsmError>;

    /// Handles one body. Returning `false` skips the remaining bodies of the frame.
    fn process_body(
        &mut self,
        body: &dyn Body,
        context: &mut TrackingContext,
        controller: &mut dyn FsmController,
    ) -> Result<bool, FsmError>;

    fn on_enter(&mut self, _context: &mut TrackingContext) {}

    fn on_exit(&mut self, _context: &mut TrackingContext) {}
}

pub struct BehaviorState<B> {
    behavior: B,
    entered: bool,
}

pub type IdleState = BehaviorState<Idle>;
pub type WaitingState = BehaviorState<WaitingForCommand>;
pub type RecordingState = BehaviorState<Recording>;

impl<B: SkeletonBehavior> BehaviorState<B> {
    pub fn new(behavior: B) -> Self {
        Self {
            behavior,
            entered: false,
        }
    }

    pub fn shared(behavior: B) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self::new(behavior)))
    }

    pub fn behavior(&self) -> &B {
        &self.behavior
    }

    pub fn behavior_mut(&mut self) -> &mut B {
        &mut self.behavior
    }

    /// Frames are only processed once the state has been entered.
    pub fn is_usable(&self) -> bool {
        self.entered && self.behavior.id() != StateId::Unknown
    }
}

impl<B: SkeletonBehavior> State<TrackingContext> for BehaviorState<B> {
    fn id(&self) -> StateId {
        self.behavior.id()
    }

    fn state_entered(&mut self, context: &mut TrackingContext) {
        self.entered = true;
        self.behavior.on_enter(context);
    }

    fn state_exited(&mut self, context: &mut TrackingContext) {
        self.behavior.on_exit(context);
    }

    fn process_skeletons(
        &mut self,
        frame: &dyn SkeletonFrame,
        context: &mut TrackingContext,
        controller: &mut dyn FsmController,
    ) -> Result<(), FsmError> {
        if !self.is_usable() {
            return Ok(());
        }

        for body in self.behavior.observable_bodies(frame.bodies(), context)? {
            if !self.behavior.process_body(body, context, controller)? {
                break;
            }
        }
        Ok(())
    }
}

/// Rolling observation buffer plus the frame-skip counter of the tracking states.
#[derive(Debug, Default)]
pub struct TrackingBuffer {
    frames: VecDeque<Observation>,
    frame_counter: usize,
}

impl TrackingBuffer {
    pub fn reset(&mut self, capacity: usize) {
        self.frames = VecDeque::with_capacity(capacity);
        self.frame_counter = 0;
    }

    /// True on every `skip`-th call.
    pub fn next_frame_due(&mut self, skip: usize) -> bool {
        self.frame_counter = (self.frame_counter + 1) % skip.max(1);
        self.frame_counter == 0
    }

    pub fn push(&mut self, observation: Observation) {
        self.frames.push_back(observation);
    }

    /// Appends, dropping the oldest frames beyond `max_len`.
    pub fn push_bounded(&mut self, observation: Observation, max_len: usize) {
        self.frames.push_back(observation);
        while self.frames.len() > max_len {
            self.frames.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frames(&mut self) -> &[Observation] {
        self.frames.make_contiguous()
    }

    pub fn to_vec(&self) -> Vec<Observation> {
        self.frames.iter().cloned().collect()
    }
}

/// The single tracked body the session is following, if present in the frame.
fn active_body_only<'f>(
    bodies: Vec<&'f dyn Body>,
    context: &TrackingContext,
) -> Result<Vec<&'f dyn Body>, FsmError> {
    let active = context.active_body()?;
    Ok(bodies
        .into_iter()
        .find(|body| body.is_tracked() && body.tracking_id() == active)
        .into_iter()
        .collect())
}

/// Typed handles to the state instances declared by a configuration.
#[derive(Default)]
pub struct StateSet {
    pub idle: Option<Rc<RefCell<IdleState>>>,
    pub waiting: Option<Rc<RefCell<WaitingState>>>,
    pub recording: Option<Rc<RefCell<RecordingState>>>,
}

impl StateSet {
    pub fn from_declared(declared: &BTreeSet<StateId>, library: Arc<GestureLibrary>) -> Self {
        let mut set = StateSet::default();
        for id in declared {
            match id {
                StateId::Idle => set.idle = Some(BehaviorState::shared(Idle)),
                StateId::WaitingForCommand => {
                    set.waiting = Some(BehaviorState::shared(WaitingForCommand::new(
                        library.clone(),
                    )))
                }
                StateId::Recording => set.recording = Some(BehaviorState::shared(Recording::new())),
                StateId::Unknown => {}
            }
        }
        set
    }

    pub fn get(&self, id: StateId) -> Option<SharedState<TrackingContext>> {
        match id {
            StateId::Idle => self
                .idle
                .clone()
                .map(|s| s as SharedState<TrackingContext>),
            StateId::WaitingForCommand => self
                .waiting
                .clone()
                .map(|s| s as SharedState<TrackingContext>),
            StateId::Recording => self
                .recording
                .clone()
                .map(|s| s as SharedState<TrackingContext>),
            StateId::Unknown => None,
        }
    }
}
