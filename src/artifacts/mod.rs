// Loading of the bundled model artifacts
// Feature list, scaler params and model weights are plain JSON files

use serde::de::DeserializeOwned;
use std::path::Path;

use crate::error::ArtifactError;
use crate::inference::LinearModel;
use crate::scaler::ScalerParams;

fn read_json<T: DeserializeOwned>(path: &Path) -> std::result::Result<T, ArtifactError> {
    let text = std::fs::read_to_string(path).map_err(|source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    serde_json::from_str(&text).map_err(|source| ArtifactError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Ordered feature column names the model was trained on
pub fn load_feature_columns(path: impl AsRef<Path>) -> std::result::Result<Vec<String>, ArtifactError> {
    let path = path.as_ref();
    let columns: Vec<String> = read_json(path)?;
    tracing::info!("Loaded {} feature columns from {}", columns.len(), path.display());
    Ok(columns)
}

pub fn load_scaler_params(path: impl AsRef<Path>) -> std::result::Result<ScalerParams, ArtifactError> {
    let path = path.as_ref();
    let params: ScalerParams = read_json(path)?;
    tracing::info!(
        "Loaded scaler params from {} (target range {} - {})",
        path.display(),
        params.target_min,
        params.target_max
    );
    Ok(params)
}

/// Load and shape-check a linear model artifact
pub fn load_linear_model(path: impl AsRef<Path>) -> std::result::Result<LinearModel, ArtifactError> {
    let path = path.as_ref();
    let model: LinearModel = read_json(path)?;
    model.validate().map_err(|reason| ArtifactError::InvalidModel {
        path: path.to_path_buf(),
        reason,
    })?;
    tracing::info!(
        "Loaded linear model from {} ({}x{})",
        path.display(),
        model.look_back,
        model.n_features
    );
    Ok(model)
}
