mod dtw;

use serde::{Deserialize, Serialize};

use crate::{
    error::RecognitionError,
    types::{Gesture, GestureId, Observation},
};

pub use self::dtw::dtw;

/// Per-gesture acceptance limits.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ThresholdSettings {
    /// Largest distance allowed between the last live and last template frame.
    pub first_threshold: f64,
    /// Largest length-normalized DTW cost accepted as a match.
    pub match_threshold: f64,
    /// Longest run of steps advancing only one of the two sequences.
    pub max_slope: f64,
}

#[derive(Clone, Debug)]
struct Template {
    id: GestureId,
    frames: Vec<Observation>,
    settings: ThresholdSettings,
}

/// Matches a live observation buffer against labeled template sequences.
#[derive(Clone, Debug, Default)]
pub struct DtwRecognizer {
    dimension: usize,
    templates: Vec<Template>,
}

impl DtwRecognizer {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            templates: Vec::new(),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn set_dimension(&mut self, dimension: usize) {
        self.dimension = dimension;
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Adds a reference sequence. The gesture must end on its last frame.
    pub fn add_template(
        &mut self,
        id: GestureId,
        frames: Vec<Observation>,
        settings: ThresholdSettings,
    ) -> Result<(), RecognitionError> {
        if frames.is_empty() {
            return Err(RecognitionError::EmptySequence);
        }
        self.check_dimension(&frames)?;

        self.templates.push(Template {
            id,
            frames,
            settings,
        });
        Ok(())
    }

    pub fn clear(&mut self) {
        self.templates.clear();
    }

    /// Classifies `sequence`, assuming the gesture ends on its last frame.
    ///
    /// Templates whose last frame is too far from the live last frame are
    /// skipped outright. Among the rest the lowest length-normalized DTW
    /// cost wins, provided it is also below that template's match threshold.
    pub fn recognize(&self, sequence: &[Observation]) -> Result<Gesture, RecognitionError> {
        let last = sequence.last().ok_or(RecognitionError::EmptySequence)?;
        self.check_dimension(sequence)?;

        let mut min_distance = f64::INFINITY;
        let mut best: Option<&Template> = None;

        for template in &self.templates {
            let Some(template_last) = template.frames.last() else {
                continue;
            };
            if dtw::distance(last, template_last, self.dimension)
                >= template.settings.first_threshold
            {
                continue;
            }

            let cost = dtw(sequence, &template.frames, &template.settings, self.dimension)
                / template.frames.len() as f64;
            if cost < min_distance {
                min_distance = cost;
                best = Some(template);
            }
        }

        let id = match best {
            Some(template) if min_distance < template.settings.match_threshold => {
                template.id.clone()
            }
            _ => GestureId::unknown(),
        };

        log::trace!(
            "matched {} frames against {} templates: {id} at {min_distance:.3}",
            sequence.len(),
            self.templates.len()
        );

        Ok(Gesture { id, min_distance })
    }

    fn check_dimension(&self, frames: &[Observation]) -> Result<(), RecognitionError> {
        match frames.iter().find(|frame| frame.len() < self.dimension) {
            Some(short) => Err(RecognitionError::DimensionMismatch {
                expected: self.dimension,
                actual: short.len(),
            }),
            None => Ok(()),
        }
    }
}
