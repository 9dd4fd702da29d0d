//! Per-frame feature extraction.
//!
//! Joint positions are re-expressed relative to the midpoint between the
//! shoulders and divided by the shoulder width, so observations recorded from
//! bodies of different size or at different spots in front of the sensor
//! remain comparable.

use std::{cell::OnceCell, collections::BTreeMap};

use crate::{
    context::{TrackingContext, TrackingMode},
    types::{Body, JointId, Observation, Vector3},
};

const MIN_SHOULDER_SPAN: f64 = 1e-6;

pub struct BodyFeatures<'a, F> {
    body: &'a dyn Body,
    filter: F,
    mode: TrackingMode,
    dimensionality: usize,
    points: OnceCell<Option<BTreeMap<JointId, Vector3>>>,
    observation: OnceCell<Option<Observation>>,
}

impl<'a, F> BodyFeatures<'a, F>
where
    F: Fn(JointId) -> bool,
{
    pub fn new(body: &'a dyn Body, filter: F, mode: TrackingMode, dimensionality: usize) -> Self {
        Self {
            body,
            filter,
            mode,
            dimensionality,
            points: OnceCell::new(),
            observation: OnceCell::new(),
        }
    }

    /// Normalized position of `joint`, if it passed the filter.
    pub fn point(&self, joint: JointId) -> Option<Vector3> {
        self.points()?.get(&joint).copied()
    }

    /// Observation vector of exactly `dimensionality` coordinates.
    ///
    /// Returns `None` when the body does not report both shoulders.
    pub fn observation(&self) -> Option<&[f64]> {
        self.observation
            .get_or_init(|| {
                let points = self.points()?;
                let axes = self.mode.axes();
                let mut values = Vec::with_capacity(self.dimensionality);
                for p in points.values() {
                    values.extend_from_slice(&[p.x, p.y, p.z][..axes]);
                }
                values.resize(self.dimensionality, 0.0);
                Some(values)
            })
            .as_deref()
    }

    fn points(&self) -> Option<&BTreeMap<JointId, Vector3>> {
        self.points
            .get_or_init(|| normalize_joints(self.body, &self.filter))
            .as_ref()
    }
}

impl<'a> BodyFeatures<'a, Box<dyn Fn(JointId) -> bool + 'a>> {
    /// Features filtered by the context's cue limb.
    pub fn for_context(body: &'a dyn Body, context: &'a TrackingContext) -> Self {
        Self::new(
            body,
            Box::new(move |joint| context.is_joint_tracked(joint)),
            context.params.mode,
            context.tracking_dimensionality(),
        )
    }
}

fn normalize_joints(
    body: &dyn Body,
    filter: &dyn Fn(JointId) -> bool,
) -> Option<BTreeMap<JointId, Vector3>> {
    let left = body.joint(JointId::ShoulderLeft)?.position;
    let right = body.joint(JointId::ShoulderRight)?.position;

    let origin = left.midpoint(right);
    let span = left.distance(right);
    if span < MIN_SHOULDER_SPAN {
        log::warn!(
            "body {} reports coincident shoulders, skipping frame",
            body.tracking_id()
        );
        return None;
    }

    Some(
        body.joints()
            .into_iter()
            .filter(|joint| filter(joint.id))
            .map(|joint| (joint.id, (joint.position - origin).scaled(1.0 / span)))
            .collect(),
    )
}
