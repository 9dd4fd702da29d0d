//! JSON configuration of a gesture session.
//!
//! The document declares the states in use, the gesture templates to load, the
//! two transition tables and the matching thresholds. Everything is checked
//! while loading so a [`Configuration`] that exists is always consistent.

use std::{
    collections::{BTreeMap, BTreeSet},
    fs,
    path::{Path, PathBuf},
    rc::Rc,
    sync::Arc,
};

use serde::Deserialize;

use crate::{
    clock::Clock,
    context::{TrackingContext, TrackingParameters},
    error::ConfigError,
    library::GestureLibrary,
    persistence::TemplateStore,
    recognizer::ThresholdSettings,
    types::{EventId, GestureId, StateId},
};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigDocument {
    #[serde(default)]
    gestures_folder: Option<PathBuf>,
    #[serde(default)]
    tracking: Option<TrackingParameters>,
    #[serde(default)]
    states: Vec<StateId>,
    #[serde(default)]
    gestures: Vec<GestureEntry>,
    #[serde(default)]
    gesture_transitions: Vec<GestureTransitionEntry>,
    #[serde(default)]
    state_transitions: Vec<StateTransitionEntry>,
    #[serde(default)]
    gesture_settings: GestureSettingsSection,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct GestureEntry {
    id: GestureId,
    file: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct GestureTransitionEntry {
    from_state: StateId,
    on_gesture: GestureId,
    raise_event: EventId,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct StateTransitionEntry {
    from_state: StateId,
    on_event: EventId,
    to_state: StateId,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct GestureSettingsSection {
    #[serde(default)]
    general: Option<ThresholdSettings>,
    #[serde(default)]
    gestures: Vec<NamedSettings>,
}

#[derive(Debug, Deserialize)]
struct NamedSettings {
    gesture: GestureId,
    #[serde(flatten)]
    settings: ThresholdSettings,
}

#[derive(Debug)]
pub struct Configuration {
    tracking: Option<TrackingParameters>,
    states: BTreeSet<StateId>,
    state_transitions: BTreeMap<(StateId, EventId), StateId>,
    library: Arc<GestureLibrary>,
    template_store: TemplateStore,
}

impl Configuration {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        let config = Self::parse(&json, path, base_dir)?;

        log::info!(
            "loaded configuration {} with {} gestures",
            path.display(),
            config.library.len()
        );
        Ok(config)
    }

    /// Parses a document whose relative paths start at `base_dir`.
    pub fn from_json_str(json: &str, base_dir: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let base_dir = base_dir.as_ref();
        Self::parse(json, base_dir, base_dir)
    }

    fn parse(json: &str, source: &Path, base_dir: &Path) -> Result<Self, ConfigError> {
        let document: ConfigDocument =
            serde_json::from_str(json).map_err(|err| ConfigError::Parse {
                path: source.to_path_buf(),
                source: err,
            })?;
        Self::from_document(document, base_dir)
    }

    fn from_document(document: ConfigDocument, base_dir: &Path) -> Result<Self, ConfigError> {
        if let Some(tracking) = &document.tracking {
            tracking.validate()?;
        }

        let states = declared_states(&document.states)?;
        let settings = resolve_settings(&document.gestures, &document.gesture_settings)?;

        let template_store = TemplateStore::new(match &document.gestures_folder {
            Some(folder) => base_dir.join(folder),
            None => base_dir.to_path_buf(),
        });

        let mut library = GestureLibrary::new();
        for entry in &document.gestures {
            let template = template_store.load(&entry.file)?;
            if template.gesture != entry.id {
                log::warn!(
                    "{} holds gesture {}, registering it as {}",
                    entry.file,
                    template.gesture,
                    entry.id
                );
            }
            let thresholds = settings
                .get(&entry.id)
                .copied()
                .ok_or_else(|| ConfigError::MissingThresholds(entry.id.clone()))?;
            library.insert_gesture(entry.id.clone(), template.frames, thresholds);
        }

        for transition in &document.gesture_transitions {
            if !states.contains(&transition.from_state) {
                return Err(ConfigError::UndeclaredState(transition.from_state));
            }
            library.add_gesture_transition(
                transition.from_state,
                transition.on_gesture.clone(),
                transition.raise_event,
            )?;
        }

        let mut state_transitions = BTreeMap::new();
        for transition in &document.state_transitions {
            if transition.from_state != StateId::Unknown && !states.contains(&transition.from_state)
            {
                return Err(ConfigError::UndeclaredState(transition.from_state));
            }
            if !states.contains(&transition.to_state) {
                return Err(ConfigError::UndeclaredState(transition.to_state));
            }
            let key = (transition.from_state, transition.on_event);
            if state_transitions.insert(key, transition.to_state).is_some() {
                return Err(ConfigError::DuplicateTransition {
                    from: transition.from_state,
                    trigger: transition.on_event.to_string(),
                });
            }
        }

        Ok(Self {
            tracking: document.tracking,
            states,
            state_transitions,
            library: Arc::new(library),
            template_store,
        })
    }

    pub fn tracking(&self) -> Option<&TrackingParameters> {
        self.tracking.as_ref()
    }

    pub fn states(&self) -> &BTreeSet<StateId> {
        &self.states
    }

    pub fn state_transitions(&self) -> &BTreeMap<(StateId, EventId), StateId> {
        &self.state_transitions
    }

    pub fn library(&self) -> &Arc<GestureLibrary> {
        &self.library
    }

    pub fn template_store(&self) -> &TemplateStore {
        &self.template_store
    }

    /// Fresh tracking context for one session.
    pub fn create_context(&self, clock: Rc<dyn Clock>) -> Result<TrackingContext, ConfigError> {
        let params = self
            .tracking
            .clone()
            .ok_or(ConfigError::MissingTrackingParameters)?;
        Ok(TrackingContext::with_clock(params, clock))
    }
}

fn declared_states(declared: &[StateId]) -> Result<BTreeSet<StateId>, ConfigError> {
    let mut states = BTreeSet::new();
    for &state in declared {
        if state == StateId::Unknown {
            return Err(ConfigError::ReservedState(state));
        }
        states.insert(state);
    }
    Ok(states)
}

/// Thresholds for every declared gesture, falling back to the general ones.
fn resolve_settings(
    gestures: &[GestureEntry],
    section: &GestureSettingsSection,
) -> Result<BTreeMap<GestureId, ThresholdSettings>, ConfigError> {
    let mut declared = BTreeSet::new();
    for entry in gestures {
        if entry.id.is_unknown() {
            return Err(ConfigError::ReservedGesture(entry.id.clone()));
        }
        if !declared.insert(&entry.id) {
            return Err(ConfigError::DuplicateGesture(entry.id.clone()));
        }
    }

    let mut resolved = BTreeMap::new();
    for named in &section.gestures {
        if !declared.contains(&named.gesture) {
            return Err(ConfigError::UndeclaredGesture(named.gesture.clone()));
        }
        validate_thresholds(&named.settings)?;
        resolved.insert(named.gesture.clone(), named.settings);
    }

    if let Some(general) = &section.general {
        validate_thresholds(general)?;
    }
    for gesture in declared {
        if resolved.contains_key(gesture) {
            continue;
        }
        let general = section
            .general
            .ok_or_else(|| ConfigError::MissingThresholds(gesture.clone()))?;
        resolved.insert(gesture.clone(), general);
    }
    Ok(resolved)
}

fn validate_thresholds(settings: &ThresholdSettings) -> Result<(), ConfigError> {
    for (field, value) in [
        ("first_threshold", settings.first_threshold),
        ("match_threshold", settings.match_threshold),
        ("max_slope", settings.max_slope),
    ] {
        if value.is_nan() || value <= 0.0 {
            return Err(ConfigError::invalid_value(
                field,
                format!("must be a positive number, got {value}"),
            ));
        }
    }
    Ok(())
}
