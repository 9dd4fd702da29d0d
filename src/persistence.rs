//! Gesture templates on disk, one JSON file per gesture.

use std::{
    fs,
    io::{self, BufReader},
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{
    error::TemplateError,
    types::{GestureId, Observation},
};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TemplateFile {
    pub gesture: GestureId,
    pub frames: Vec<Observation>,
}

impl TemplateFile {
    fn validate(&self) -> Result<(), TemplateError> {
        let Some(first) = self.frames.first() else {
            return Err(TemplateError::Empty(self.gesture.clone()));
        };
        let expected = first.len();
        if expected == 0 {
            return Err(TemplateError::Empty(self.gesture.clone()));
        }
        if let Some(frame) = self.frames.iter().find(|frame| frame.len() != expected) {
            return Err(TemplateError::Ragged {
                gesture: self.gesture.clone(),
                expected,
                actual: frame.len(),
            });
        }
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct TemplateStore {
    folder: PathBuf,
}

impl TemplateStore {
    pub fn new(folder: impl Into<PathBuf>) -> Self {
        Self {
            folder: folder.into(),
        }
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    pub fn file_name_for(gesture: &GestureId) -> String {
        format!("gesture_{gesture}.json")
    }

    pub fn path_for(&self, file_name: &str) -> PathBuf {
        self.folder.join(file_name)
    }

    /// Writes `frames` as the template of `gesture` and returns the file path.
    pub fn save(&self, gesture: &GestureId, frames: &[Observation]) -> Result<PathBuf, TemplateError> {
        let template = TemplateFile {
            gesture: gesture.clone(),
            frames: frames.to_vec(),
        };
        template.validate()?;

        let path = self.path_for(&Self::file_name_for(gesture));
        let io_err = |source: io::Error| TemplateError::Io {
            path: path.clone(),
            source,
        };

        let json = serde_json::to_vec_pretty(&template).map_err(|source| TemplateError::Encode {
            path: path.clone(),
            source,
        })?;
        fs::create_dir_all(&self.folder).map_err(io_err)?;
        fs::write(&path, json).map_err(io_err)?;

        log::info!("saved {} frames of {gesture} to {}", frames.len(), path.display());
        Ok(path)
    }

    pub fn load(&self, file_name: &str) -> Result<TemplateFile, TemplateError> {
        let path = self.path_for(file_name);
        let file = fs::File::open(&path).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => TemplateError::NotFound(path.clone()),
            _ => TemplateError::Io {
                path: path.clone(),
                source,
            },
        })?;

        let template: TemplateFile = serde_json::from_reader(BufReader::new(file))
            .map_err(|source| TemplateError::Decode {
                path: path.clone(),
                source,
            })?;
        template.validate()?;

        log::debug!(
            "loaded {} frames of {} from {}",
            template.frames.len(),
            template.gesture,
            path.display()
        );
        Ok(template)
    }
}
