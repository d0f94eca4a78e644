use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChartError {
    #[error("chart has no slices")]
    Empty,
    #[error("slice {index} ({label:?}) has invalid value {value}")]
    InvalidValue { index: usize, label: String, value: f32 },
    #[error("slice values sum to zero")]
    ZeroTotal,
    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slice {
    pub label: String,
    pub value: f32,
    #[serde(default)]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartData {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub show_data: bool,
    pub slices: Vec<Slice>,
}

impl ChartData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_slice(&mut self, label: impl Into<String>, value: f32) {
        self.slices.push(Slice {
            label: label.into(),
            value,
            color: None,
        });
    }

    pub fn total(&self) -> f32 {
        self.slices.iter().map(|slice| slice.value).sum()
    }

    /// Rejects charts the layout cannot give angles to.
    pub fn validate(&self) -> Result<(), ChartError> {
        if self.slices.is_empty() {
            return Err(ChartError::Empty);
        }
        for (index, slice) in self.slices.iter().enumerate() {
            if !slice.value.is_finite() || slice.value < 0.0 {
                return Err(ChartError::InvalidValue {
                    index,
                    label: slice.label.clone(),
                    value: slice.value,
                });
            }
        }
        if self.total() <= 0.0 {
            return Err(ChartError::ZeroTotal);
        }
        Ok(())
    }
}
