use std::{fmt, rc::Rc, time::Duration, time::Instant};

use serde::{Deserialize, Serialize};

use crate::{
    clock::{Clock, SystemClock},
    error::{ConfigError, FsmError},
    types::{JointId, TrackingId},
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackingMode {
    #[default]
    #[serde(rename = "2d")]
    Mode2D,
    #[serde(rename = "3d")]
    Mode3D,
}

impl TrackingMode {
    pub fn axes(self) -> usize {
        match self {
            TrackingMode::Mode2D => 2,
            TrackingMode::Mode3D => 3,
        }
    }
}

/// Global buffer and timing parameters of a tracking session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingParameters {
    pub mode: TrackingMode,
    /// Frames buffered before recognition is attempted.
    pub min_frames: usize,
    /// Upper bound of the recognition and recording buffers.
    pub max_frames: usize,
    /// Only every n-th frame of the active body is processed.
    pub skip_frames: usize,
    /// Seconds without a recognized gesture before falling back to idle.
    pub idle_timeout_secs: f64,
    /// Seconds between entering the recording state and the first captured frame.
    pub pre_recording_delay_secs: f64,
}

impl Default for TrackingParameters {
    fn default() -> Self {
        Self {
            mode: TrackingMode::Mode2D,
            min_frames: 5,
            max_frames: 20,
            skip_frames: 3,
            idle_timeout_secs: 5.0,
            pre_recording_delay_secs: 5.0,
        }
    }
}

impl TrackingParameters {
    /// Saturates at `Duration::MAX` for values `validate` would reject.
    pub fn idle_timeout(&self) -> Duration {
        seconds(self.idle_timeout_secs)
    }

    pub fn pre_recording_delay(&self) -> Duration {
        seconds(self.pre_recording_delay_secs)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_frames == 0 {
            return Err(ConfigError::invalid_value("min_frames", "must be > 0"));
        }
        if self.max_frames < self.min_frames {
            return Err(ConfigError::invalid_value(
                "max_frames",
                format!("must be >= min_frames ({})", self.min_frames),
            ));
        }
        if self.skip_frames == 0 {
            return Err(ConfigError::invalid_value("skip_frames", "must be > 0"));
        }
        for (field, value) in [
            ("idle_timeout_secs", self.idle_timeout_secs),
            ("pre_recording_delay_secs", self.pre_recording_delay_secs),
        ] {
            if let Err(err) = Duration::try_from_secs_f64(value) {
                return Err(ConfigError::invalid_value(
                    field,
                    format!("must be a non-negative number of seconds, got {value}: {err}"),
                ));
            }
        }
        Ok(())
    }
}

fn seconds(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(if value > 0.0 {
        Duration::MAX
    } else {
        Duration::ZERO
    })
}

/// Mutable record shared by every state of one controller.
pub struct TrackingContext {
    active_body: Option<TrackingId>,
    pub current_cue: Option<JointId>,
    pub params: TrackingParameters,
    clock: Rc<dyn Clock>,
}

impl TrackingContext {
    pub fn new(params: TrackingParameters) -> Self {
        Self::with_clock(params, Rc::new(SystemClock))
    }

    pub fn with_clock(params: TrackingParameters, clock: Rc<dyn Clock>) -> Self {
        Self {
            active_body: None,
            current_cue: None,
            params,
            clock,
        }
    }

    pub fn active_body(&self) -> Result<TrackingId, FsmError> {
        self.active_body.ok_or(FsmError::NoActiveBody)
    }

    pub fn set_active_body(&mut self, id: TrackingId) {
        self.active_body = Some(id);
    }

    pub fn now(&self) -> Instant {
        self.clock.now()
    }

    /// Whether `joint` belongs to the limb selected as the current cue.
    pub fn is_joint_tracked(&self, joint: JointId) -> bool {
        self.current_cue
            .is_some_and(|cue| cue.cue_limb().contains(&joint))
    }

    /// Length of one observation for the current cue and tracking mode.
    pub fn tracking_dimensionality(&self) -> usize {
        self.current_cue
            .map_or(0, |cue| cue.cue_limb().len() * self.params.mode.axes())
    }
}

impl fmt::Debug for TrackingContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackingContext")
            .field("active_body", &self.active_body)
            .field("current_cue", &self.current_cue)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}
