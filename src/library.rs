use std::collections::BTreeMap;

use crate::{
    error::ConfigError,
    recognizer::ThresholdSettings,
    types::{EventId, GestureId, Observation, StateId},
};

#[derive(Clone, Debug, PartialEq)]
pub struct GestureTemplate {
    pub frames: Vec<Observation>,
    pub settings: ThresholdSettings,
}

/// Loaded templates together with the events their recognition raises.
#[derive(Clone, Debug, Default)]
pub struct GestureLibrary {
    templates: BTreeMap<GestureId, GestureTemplate>,
    gesture_transitions: BTreeMap<(StateId, GestureId), EventId>,
}

impl GestureLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_gesture(
        &mut self,
        gesture: GestureId,
        frames: Vec<Observation>,
        settings: ThresholdSettings,
    ) {
        self.templates
            .insert(gesture, GestureTemplate { frames, settings });
    }

    pub fn add_gesture_transition(
        &mut self,
        state: StateId,
        gesture: GestureId,
        event: EventId,
    ) -> Result<(), ConfigError> {
        if !self.templates.contains_key(&gesture) {
            return Err(ConfigError::UndeclaredGesture(gesture));
        }

        let key = (state, gesture);
        if self.gesture_transitions.contains_key(&key) {
            let (from, gesture) = key;
            return Err(ConfigError::DuplicateTransition {
                from,
                trigger: gesture.to_string(),
            });
        }
        self.gesture_transitions.insert(key, event);
        Ok(())
    }

    pub fn template(&self, gesture: &GestureId) -> Option<&GestureTemplate> {
        self.templates.get(gesture)
    }

    pub fn settings(&self, gesture: &GestureId) -> Option<ThresholdSettings> {
        self.templates.get(gesture).map(|template| template.settings)
    }

    pub fn gestures(&self) -> impl Iterator<Item = &GestureId> {
        self.templates.keys()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Event raised when `gesture` is recognized while in `state`.
    pub fn event_for(&self, state: StateId, gesture: &GestureId) -> Option<EventId> {
        self.gesture_transitions
            .get(&(state, gesture.clone()))
            .copied()
    }

    /// Templates of every gesture with a transition out of `state`.
    pub fn templates_for_state(
        &self,
        state: StateId,
    ) -> impl Iterator<Item = (&GestureId, &[Observation], ThresholdSettings)> {
        self.gesture_transitions
            .keys()
            .filter(move |(from, _)| *from == state)
            .filter_map(move |(_, gesture)| {
                let template = self.templates.get(gesture)?;
                Some((gesture, template.frames.as_slice(), template.settings))
            })
    }

    pub fn gesture_transitions(&self) -> &BTreeMap<(StateId, GestureId), EventId> {
        &self.gesture_transitions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SETTINGS: ThresholdSettings = ThresholdSettings {
        first_threshold: 0.5,
        match_threshold: 0.5,
        max_slope: 3.0,
    };

    fn library() -> GestureLibrary {
        let mut library = GestureLibrary::new();
        for label in ["Swipe", "Push", "Clap"] {
            library.insert_gesture(GestureId::new(label), vec![vec![0.0, 1.0]], SETTINGS);
        }
        for (state, label, event) in [
            (StateId::WaitingForCommand, "Swipe", EventId::Record),
            (StateId::WaitingForCommand, "Push", EventId::GoIdle),
            (StateId::Idle, "Clap", EventId::WaitForCommand),
        ] {
            library
                .add_gesture_transition(state, GestureId::new(label), event)
                .unwrap();
        }
        library
    }

    #[test]
    fn only_templates_with_a_transition_from_the_state_are_listed() {
        let library = library();
        let labels: Vec<&str> = library
            .templates_for_state(StateId::WaitingForCommand)
            .map(|(gesture, _, _)| gesture.as_str())
            .collect();
        assert_eq!(labels, ["Push", "Swipe"]);
        assert_eq!(library.templates_for_state(StateId::Recording).count(), 0);
    }

    #[test]
    fn events_are_looked_up_per_state() {
        let library = library();
        let swipe = GestureId::new("Swipe");
        assert_eq!(
            library.event_for(StateId::WaitingForCommand, &swipe),
            Some(EventId::Record)
        );
        assert_eq!(library.event_for(StateId::Idle, &swipe), None);
    }

    #[test]
    fn transitions_need_a_declared_gesture_and_a_free_key() {
        let mut library = library();
        assert!(matches!(
            library.add_gesture_transition(
                StateId::WaitingForCommand,
                GestureId::new("Wave"),
                EventId::Record
            ),
            Err(ConfigError::UndeclaredGesture(_))
        ));
        assert!(matches!(
            library.add_gesture_transition(
                StateId::WaitingForCommand,
                GestureId::new("Swipe"),
                EventId::GoIdle
            ),
            Err(ConfigError::DuplicateTransition { from: StateId::WaitingForCommand, .. })
        ));
        assert_eq!(
            library.event_for(StateId::WaitingForCommand, &GestureId::new("Swipe")),
            Some(EventId::Record)
        );
    }
}
