//! Persisted model artifacts

use crate::error::{Result, ScoringError};
use crate::models::forest::IsolationForest;
use crate::models::inference::{FittedModel, ModelInfo, ScoringService, MODEL_VERSION};
use crate::models::normalizer::ScoreNormalizer;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use tracing::info;

/// Serialized form of a fitted scoring model.
///
/// Holds the forest and the normalizer fitted with it, so a service rebuilt
/// from the artifact scores on exactly the same scale as at training time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub info: ModelInfo,
    pub dimensions: usize,
    pub num_trees: usize,
    pub subsample_size: usize,
    pub outlier_cutoff: f64,
    pub normalizer: ScoreNormalizer,
    pub forest: IsolationForest,
}

impl ModelArtifact {
    pub fn from_service(service: &ScoringService) -> Result<Self> {
        let model = service.model()?;
        Ok(Self {
            info: model.info.clone(),
            dimensions: model.forest.dimensions(),
            num_trees: model.forest.num_trees(),
            subsample_size: model.forest.subsample_size(),
            outlier_cutoff: model.outlier_cutoff,
            normalizer: model.normalizer,
            forest: model.forest.clone(),
        })
    }

    /// Check that the header fields agree with the forest they describe
    pub fn validate(&self) -> Result<()> {
        if self.info.version != MODEL_VERSION {
            return Err(ScoringError::InvalidArtifact(format!(
                "unsupported model version {} (expected {})",
                self.info.version, MODEL_VERSION
            )));
        }
        self.forest.validate()?;
        self.normalizer.validate()?;

        if self.forest.dimensions() != self.dimensions {
            return Err(ScoringError::InvalidArtifact(format!(
                "header declares {} dimensions, forest has {}",
                self.dimensions,
                self.forest.dimensions()
            )));
        }
        if self.forest.num_trees() != self.num_trees {
            return Err(ScoringError::InvalidArtifact(format!(
                "header declares {} trees, forest has {}",
                self.num_trees,
                self.forest.num_trees()
            )));
        }
        if self.forest.subsample_size() != self.subsample_size {
            return Err(ScoringError::InvalidArtifact(format!(
                "header declares subsample size {}, forest has {}",
                self.subsample_size,
                self.forest.subsample_size()
            )));
        }
        Ok(())
    }

    pub fn into_service(self) -> Result<ScoringService> {
        self.validate()?;
        Ok(ScoringService::from_model(FittedModel {
            forest: self.forest,
            normalizer: self.normalizer,
            outlier_cutoff: self.outlier_cutoff,
            info: self.info,
        }))
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(writer, self)?;

        info!(
            model_id = %self.info.model_id,
            path = %path.display(),
            trees = self.num_trees,
            "Model artifact saved"
        );
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let reader = BufReader::new(File::open(path)?);
        let artifact: Self = serde_json::from_reader(reader)?;
        artifact.validate()?;

        info!(
            model_id = %artifact.info.model_id,
            path = %path.display(),
            trees = artifact.num_trees,
            dimensions = artifact.dimensions,
            "Model artifact loaded"
        );
        Ok(artifact)
    }
}

/// Load an artifact and rebuild the scoring service from it
pub fn load_service<P: AsRef<Path>>(path: P) -> Result<ScoringService> {
    ModelArtifact::load(path)?.into_service()
}
