//! Inference adapter
//!
//! The trained model is consumed as a black box behind [`PriceModel`]:
//! a fixed-shape `[look_back][n_features]` tensor in, one scaled scalar out.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum InferenceError {
    #[error("Input shape {rows}x{cols} does not match model shape {expected_rows}x{expected_cols}")]
    ShapeMismatch {
        expected_rows: usize,
        expected_cols: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Model produced a non-finite output: {0}")]
    NonFiniteOutput(f64),

    #[error("Model runtime error: {0}")]
    Runtime(String),
}

/// Row-major `[time step][feature]` model input
#[derive(Debug, Clone, PartialEq)]
pub struct InputTensor {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl InputTensor {
    /// Wrap row-major values; None if `data.len() != rows * cols`
    pub fn new(rows: usize, cols: usize, data: Vec<f64>) -> Option<Self> {
        (rows.checked_mul(cols)? == data.len()).then_some(Self { rows, cols, data })
    }

    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    /// Panics if `row` or `col` is out of bounds
    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        assert!(row < self.rows && col < self.cols, "tensor index out of bounds");
        self.data[row * self.cols + col] = value;
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        if row < self.rows && col < self.cols {
            Some(self.data[row * self.cols + col])
        } else {
            None
        }
    }

    pub fn row(&self, row: usize) -> Option<&[f64]> {
        (row < self.rows).then(|| &self.data[row * self.cols..(row + 1) * self.cols])
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Native-endian f32 buffer, the layout compiled model runtimes read
    pub fn to_f32_ne_bytes(&self) -> Vec<u8> {
        self.data
            .iter()
            .flat_map(|&v| (v as f32).to_ne_bytes())
            .collect()
    }
}

/// A trained scalar-regression model
///
/// Implementations receive a tensor owned by the calling prediction and must
/// not keep buffers between calls.
pub trait PriceModel: Send + Sync {
    /// Run the model and return its scaled output
    fn infer(&self, input: &InputTensor) -> Result<f64, InferenceError>;

    /// Features per time step the model was built for, if known
    fn expected_features(&self) -> Option<usize> {
        None
    }
}

/// Dense linear head: `bias + sum(weights[t][f] * x[t][f])`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LinearModel {
    pub look_back: usize,
    pub n_features: usize,
    pub weights: Vec<Vec<f64>>,
    pub bias: f64,
}

impl LinearModel {
    /// Check the declared shape against the weight matrix
    pub fn validate(&self) -> Result<(), String> {
        if self.weights.len() != self.look_back {
            return Err(format!(
                "expected {} weight rows, found {}",
                self.look_back,
                self.weights.len()
            ));
        }

        if let Some((step, row)) = self
            .weights
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != self.n_features)
        {
            return Err(format!(
                "weight row {} has {} values, expected {}",
                step,
                row.len(),
                self.n_features
            ));
        }

        if !self.bias.is_finite() || self.weights.iter().flatten().any(|w| !w.is_finite()) {
            return Err("weights must be finite".to_string());
        }

        Ok(())
    }
}

impl PriceModel for LinearModel {
    fn infer(&self, input: &InputTensor) -> Result<f64, InferenceError> {
        if input.rows() != self.look_back || input.cols() != self.n_features {
            return Err(InferenceError::ShapeMismatch {
                expected_rows: self.look_back,
                expected_cols: self.n_features,
                rows: input.rows(),
                cols: input.cols(),
            });
        }

        let weighted: f64 = self
            .weights
            .iter()
            .flatten()
            .zip(input.as_slice())
            .map(|(w, x)| w * x)
            .sum();
        let output = self.bias + weighted;

        if !output.is_finite() {
            return Err(InferenceError::NonFiniteOutput(output));
        }
        Ok(output)
    }

    fn expected_features(&self) -> Option<usize> {
        Some(self.n_features)
    }
}

/// Closure-backed model, handy as a stub
pub struct FnModel<F> {
    f: F,
}

impl<F> FnModel<F>
where
    F: Fn(&InputTensor) -> Result<f64, InferenceError> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> PriceModel for FnModel<F>
where
    F: Fn(&InputTensor) -> Result<f64, InferenceError> + Send + Sync,
{
    fn infer(&self, input: &InputTensor) -> Result<f64, InferenceError> {
        (self.f)(input)
    }
}
