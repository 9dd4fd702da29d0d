use super::SkeletonBehavior;
use crate::{
    context::TrackingContext,
    error::FsmError,
    fsm::FsmController,
    types::{Body, EventId, Joint, JointId, StateId},
};

/// Watches every tracked body for a hand raised to head height.
#[derive(Clone, Copy, Debug, Default)]
pub struct Idle;

impl SkeletonBehavior for Idle {
    fn id(&self) -> StateId {
        StateId::Idle
    }

    fn on_enter(&mut self, context: &mut TrackingContext) {
        context.current_cue = None;
    }

    fn observable_bodies<'f>(
        &self,
        bodies: Vec<&'f dyn Body>,
        _context: &TrackingContext,
    ) -> Result<Vec<&'f dyn Body>, FsmError> {
        Ok(bodies.into_iter().filter(|body| body.is_tracked()).collect())
    }

    fn process_body(
        &mut self,
        body: &dyn Body,
        context: &mut TrackingContext,
        controller: &mut dyn FsmController,
    ) -> Result<bool, FsmError> {
        let Some(cue) = raised_cue(body) else {
            return Ok(true);
        };

        log::info!("body {} raised {cue:?}", body.tracking_id());
        context.set_active_body(body.tracking_id());
        context.current_cue = Some(cue);
        controller.perform_transition(EventId::WaitForCommand);

        // one body per frame
        Ok(false)
    }
}

/// The highest hand of `body`, if it is at or above the head.
fn raised_cue(body: &dyn Body) -> Option<JointId> {
    let head = body.joint(JointId::Head)?;

    let mut highest: Option<Joint> = None;
    for joint in body.joints().into_iter().filter(|joint| joint.id.is_cue()) {
        if highest.is_none_or(|best| joint.position.y > best.position.y) {
            highest = Some(joint);
        }
    }

    highest
        .filter(|hand| hand.position.y >= head.position.y)
        .map(|hand| hand.id)
}
