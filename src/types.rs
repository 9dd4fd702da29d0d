use std::{collections::BTreeMap, fmt, ops::Sub};

use serde::{Deserialize, Serialize};

/// One normalized feature vector, produced per frame for the tracked body.
pub type Observation = Vec<f64>;

/// Stable identifier the sensor assigns to a tracked body.
pub type TrackingId = u32;

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn midpoint(self, other: Vector3) -> Vector3 {
        Vector3::new(
            (self.x + other.x) / 2.0,
            (self.y + other.y) / 2.0,
            (self.z + other.z) / 2.0,
        )
    }

    pub fn distance(self, other: Vector3) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2) + (self.z - other.z).powi(2))
            .sqrt()
    }

    pub fn scaled(self, factor: f64) -> Vector3 {
        Vector3::new(self.x * factor, self.y * factor, self.z * factor)
    }
}

impl Sub for Vector3 {
    type Output = Vector3;

    fn sub(self, rhs: Vector3) -> Vector3 {
        Vector3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum JointId {
    HipCenter,
    Spine,
    ShoulderCenter,
    Head,
    ShoulderLeft,
    ElbowLeft,
    WristLeft,
    HandLeft,
    ShoulderRight,
    ElbowRight,
    WristRight,
    HandRight,
    HipLeft,
    KneeLeft,
    AnkleLeft,
    FootLeft,
    HipRight,
    KneeRight,
    AnkleRight,
    FootRight,
}

impl JointId {
    /// Joints that may be raised to draw attention.
    pub const CUE_JOINTS: [JointId; 2] = [JointId::HandLeft, JointId::HandRight];

    pub fn is_cue(self) -> bool {
        Self::CUE_JOINTS.contains(&self)
    }

    /// The limb followed once `self` has been selected as the cue.
    pub fn cue_limb(self) -> &'static [JointId] {
        match self {
            JointId::HandLeft => &[JointId::HandLeft, JointId::ElbowLeft, JointId::WristLeft],
            JointId::HandRight => &[JointId::HandRight, JointId::ElbowRight, JointId::WristRight],
            _ => &[],
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BodyTrackingState {
    #[default]
    NotTracked,
    PositionOnly,
    Tracked,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Joint {
    pub id: JointId,
    pub position: Vector3,
}

/// Read-only view of one body reported by the sensor.
pub trait Body {
    fn tracking_id(&self) -> TrackingId;

    fn tracking_state(&self) -> BodyTrackingState;

    fn joint(&self, id: JointId) -> Option<Joint>;

    /// All reported joints, ordered by joint id.
    fn joints(&self) -> Vec<Joint>;

    fn is_tracked(&self) -> bool {
        self.tracking_state() != BodyTrackingState::NotTracked
    }
}

/// Read-only view of one sensor frame.
pub trait SkeletonFrame {
    fn frame_number(&self) -> u64;

    fn bodies(&self) -> Vec<&dyn Body>;
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SkeletonData {
    pub tracking_id: TrackingId,
    #[serde(default = "tracked")]
    pub tracking_state: BodyTrackingState,
    pub joints: BTreeMap<JointId, Vector3>,
}

// Recorded bodies are tracked unless the document says otherwise.
fn tracked() -> BodyTrackingState {
    BodyTrackingState::Tracked
}

impl SkeletonData {
    pub fn new(tracking_id: TrackingId) -> Self {
        Self {
            tracking_id,
            tracking_state: BodyTrackingState::Tracked,
            joints: BTreeMap::new(),
        }
    }

    pub fn with_joint(mut self, id: JointId, position: Vector3) -> Self {
        self.joints.insert(id, position);
        self
    }

    pub fn with_tracking_state(mut self, state: BodyTrackingState) -> Self {
        self.tracking_state = state;
        self
    }
}

impl Body for SkeletonData {
    fn tracking_id(&self) -> TrackingId {
        self.tracking_id
    }

    fn tracking_state(&self) -> BodyTrackingState {
        self.tracking_state
    }

    fn joint(&self, id: JointId) -> Option<Joint> {
        self.joints
            .get(&id)
            .map(|&position| Joint { id, position })
    }

    fn joints(&self) -> Vec<Joint> {
        self.joints
            .iter()
            .map(|(&id, &position)| Joint { id, position })
            .collect()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameData {
    #[serde(default)]
    pub frame_number: u64,
    pub bodies: Vec<SkeletonData>,
}

impl FrameData {
    pub fn new(frame_number: u64, bodies: Vec<SkeletonData>) -> Self {
        Self {
            frame_number,
            bodies,
        }
    }
}

impl SkeletonFrame for FrameData {
    fn frame_number(&self) -> u64 {
        self.frame_number
    }

    fn bodies(&self) -> Vec<&dyn Body> {
        self.bodies.iter().map(|b| b as &dyn Body).collect()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StateId {
    Unknown,
    Idle,
    WaitingForCommand,
    Recording,
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EventId {
    Unknown,
    GoIdle,
    WaitForCommand,
    Record,
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Label of a gesture template. `Unknown` is reserved for "no match".
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GestureId(String);

impl GestureId {
    pub const UNKNOWN_LABEL: &'static str = "Unknown";

    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn unknown() -> Self {
        Self(Self::UNKNOWN_LABEL.to_string())
    }

    pub fn is_unknown(&self) -> bool {
        self.0 == Self::UNKNOWN_LABEL
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GestureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of matching a live buffer against the template library.
#[derive(Clone, Debug, PartialEq)]
pub struct Gesture {
    pub id: GestureId,
    pub min_distance: f64,
}

impl Gesture {
    pub fn is_recognized(&self) -> bool {
        !self.id.is_unknown()
    }

    pub fn display_text(&self) -> String {
        format!("{} (distance {:.2})", self.id, self.min_distance)
    }
}
