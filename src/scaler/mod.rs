// Min-max scaling of model inputs and outputs

use serde::{Deserialize, Serialize};

/// Per-feature and target ranges the model was trained with
///
/// Field names match the scaler artifact produced at training time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScalerParams {
    #[serde(rename = "feature_data_min")]
    pub feature_min: Vec<f64>,
    #[serde(rename = "feature_data_max")]
    pub feature_max: Vec<f64>,
    #[serde(rename = "target_close_data_min")]
    pub target_min: f64,
    #[serde(rename = "target_close_data_max")]
    pub target_max: f64,
}

impl ScalerParams {
    /// Number of features the params cover, None if min and max disagree
    pub fn feature_count(&self) -> Option<usize> {
        (self.feature_min.len() == self.feature_max.len()).then_some(self.feature_min.len())
    }

    /// Scale `value` with the range of feature column `index`
    ///
    /// Panics if `index` is out of range; callers validate the column count.
    pub fn scale_feature(&self, index: usize, value: f64) -> f64 {
        scale(value, self.feature_min[index], self.feature_max[index])
    }

    pub fn unscale_feature(&self, index: usize, scaled: f64) -> f64 {
        unscale(scaled, self.feature_min[index], self.feature_max[index])
    }

    pub fn unscale_target(&self, scaled: f64) -> f64 {
        unscale(scaled, self.target_min, self.target_max)
    }
}

/// `(value - min) / (max - min)`; a zero-width range maps to 0.0
pub fn scale(value: f64, min: f64, max: f64) -> f64 {
    let range = max - min;
    if range != 0.0 {
        (value - min) / range
    } else {
        0.0
    }
}

/// Inverse of [`scale`]; a zero-width range maps back to `min`
pub fn unscale(scaled: f64, min: f64, max: f64) -> f64 {
    let range = max - min;
    if range != 0.0 {
        scaled * range + min
    } else {
        min
    }
}
