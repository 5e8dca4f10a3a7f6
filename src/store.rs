//! On-disk persistence for trained regressors
//!
//! One artifact per (alias, id) pair, bincode-encoded together with the
//! feature schema the model was fitted against. Artifacts are written once and
//! reloaded verbatim on every later run; nothing retrains a stored model when
//! the underlying series grows.

use crate::error::{ForecastError, Result};
use crate::models::{FeatureSchema, TrainedRegressor};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use tracing::info;

/// Result of looking up a persisted model
#[derive(Debug)]
pub enum LoadOutcome {
    /// Artifact found and its schema matches the requested layout
    Loaded(TrainedRegressor),
    /// Artifact found but fitted against a different feature layout
    SchemaMismatch {
        /// Schema persisted with the artifact
        stored: FeatureSchema,
        /// Schema the caller is working with
        requested: FeatureSchema,
    },
    /// No artifact for this (alias, id) pair
    NotFound,
}

/// Model store rooted at one directory
#[derive(Debug, Clone)]
pub struct ModelStore {
    dir: PathBuf,
}

impl ModelStore {
    /// Create a store writing artifacts under `dir`
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Artifact path for one (alias, id) pair
    fn model_path(&self, alias: &str, id: &str) -> PathBuf {
        self.dir.join(format!("{}_{}_model.bin", alias, id))
    }

    /// Check whether an artifact exists for (alias, id)
    pub fn contains(&self, alias: &str, id: &str) -> bool {
        self.model_path(alias, id).exists()
    }

    /// Persist a trained model for (alias, id)
    pub fn save(&self, alias: &str, id: &str, model: &TrainedRegressor) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| ForecastError::Persistence(format!("Creating model dir: {}", e)))?;

        let path = self.model_path(alias, id);
        let file = File::create(&path)
            .map_err(|e| ForecastError::Persistence(format!("Creating {}: {}", path.display(), e)))?;
        let writer = BufWriter::new(file);

        bincode::serialize_into(writer, model)
            .map_err(|e| ForecastError::Persistence(format!("Encoding model: {}", e)))?;

        info!("Model saved to {}", path.display());
        Ok(())
    }

    /// Load the model for (alias, id), validating its schema against
    /// `requested`
    pub fn load(&self, alias: &str, id: &str, requested: &FeatureSchema) -> Result<LoadOutcome> {
        let path = self.model_path(alias, id);
        if !path.exists() {
            return Ok(LoadOutcome::NotFound);
        }

        let file = File::open(&path)
            .map_err(|e| ForecastError::Persistence(format!("Opening {}: {}", path.display(), e)))?;
        let reader = BufReader::new(file);

        let model: TrainedRegressor = bincode::deserialize_from(reader)
            .map_err(|e| ForecastError::Persistence(format!("Decoding {}: {}", path.display(), e)))?;

        if model.schema() != requested {
            return Ok(LoadOutcome::SchemaMismatch {
                stored: model.schema().clone(),
                requested: requested.clone(),
            });
        }

        info!("Model loaded from {}", path.display());
        Ok(LoadOutcome::Loaded(model))
    }
}
