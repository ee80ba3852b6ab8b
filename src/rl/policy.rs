// src/rl/policy.rs
//
// Policy trait and implementations.
//
// A policy is an opaque scoring function: it maps the slot observation
// (length N) to a score vector of length M >= 2N. Indices [0, N) mean
// "allocate slot i", [N, 2N) mean "deallocate slot i - N", and anything at
// or beyond 2N means "do nothing". Picking the action from the scores
// (`select_action`) is not the policy's job.
//
// Design:
// - Policy trait: defines interface for all policy implementations
// - DensePolicy: feed-forward network loaded from a JSON weight file
// - NoopPolicy: always scores the reserved no-op index highest

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{PolicyError, SchedulerError};
use crate::types::ActionIndex;

pub const NOOP_POLICY_VERSION: &str = "noop-v1.0.0";

/// Policy trait: interface for all slot policies.
pub trait Policy {
    /// Unique version string for this policy implementation.
    fn version(&self) -> &str;

    /// Optional policy ID (e.g., weight file digest).
    fn policy_id(&self) -> Option<&str> {
        None
    }

    /// Score every action for the given observation.
    ///
    /// This should be a pure function: same observation, same scores.
    fn evaluate(&self, observation: &[f32]) -> Result<Vec<f32>, PolicyError>;
}

impl<P: Policy + ?Sized> Policy for Box<P> {
    fn version(&self) -> &str {
        (**self).version()
    }

    fn policy_id(&self) -> Option<&str> {
        (**self).policy_id()
    }

    fn evaluate(&self, observation: &[f32]) -> Result<Vec<f32>, PolicyError> {
        (**self).evaluate(observation)
    }
}

/// Pick the highest-scoring action.
///
/// Ties go to the lowest index. NaN scores never win. Outputs shorter than
/// `2 * n` or without a single comparable score are rejected.
pub fn select_action(scores: &[f32], n: usize) -> Result<ActionIndex, SchedulerError> {
    let expected_min = 2 * n;
    if scores.len() < expected_min || scores.is_empty() {
        return Err(SchedulerError::MalformedPolicyOutput {
            expected_min,
            actual: scores.len(),
        });
    }

    let mut best: Option<(ActionIndex, f32)> = None;
    for (idx, &score) in scores.iter().enumerate() {
        if score.is_nan() {
            continue;
        }
        match best {
            Some((_, top)) if score <= top => {}
            _ => best = Some((idx, score)),
        }
    }

    best.map(|(idx, _)| idx)
        .ok_or(SchedulerError::NonFinitePolicyOutput { len: scores.len() })
}

/// Activation applied after a dense layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    Relu,
    Tanh,
    #[default]
    Linear,
}

impl Activation {
    #[inline]
    fn apply(self, x: f32) -> f32 {
        match self {
            Activation::Relu => x.max(0.0),
            Activation::Tanh => x.tanh(),
            Activation::Linear => x,
        }
    }
}

/// One fully connected layer; `weights[out][in]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseLayer {
    pub weights: Vec<Vec<f32>>,
    pub biases: Vec<f32>,
    #[serde(default)]
    pub activation: Activation,
}

impl DenseLayer {
    pub fn input_dim(&self) -> usize {
        self.weights.first().map(Vec::len).unwrap_or(0)
    }

    pub fn output_dim(&self) -> usize {
        self.weights.len()
    }

    fn forward(&self, input: &[f32]) -> Vec<f32> {
        self.weights
            .iter()
            .zip(&self.biases)
            .map(|(row, bias)| {
                let z: f32 = row.iter().zip(input).map(|(w, x)| w * x).sum::<f32>() + bias;
                self.activation.apply(z)
            })
            .collect()
    }
}

/// On-disk weight file layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseWeights {
    pub version: String,
    pub layers: Vec<DenseLayer>,
}

/// Feed-forward network policy.
#[derive(Debug, Clone)]
pub struct DensePolicy {
    version: String,
    policy_id: Option<String>,
    layers: Vec<DenseLayer>,
}

impl DensePolicy {
    /// Build from in-memory weights, validating every layer's shape.
    pub fn new(weights: DenseWeights) -> Result<Self, PolicyError> {
        validate_layers(&weights.layers)?;
        Ok(Self {
            version: weights.version,
            policy_id: None,
            layers: weights.layers,
        })
    }

    /// Load a JSON weight file. The policy ID is the file's SHA-256 digest.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, PolicyError> {
        let bytes = fs::read(path.as_ref()).map_err(|e| PolicyError::Io {
            path: path.as_ref().display().to_string(),
            source: e.to_string(),
        })?;
        let mut policy = Self::from_json_slice(&bytes)?;
        policy.policy_id = Some(sha256_id(&bytes));
        Ok(policy)
    }

    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, PolicyError> {
        let weights: DenseWeights =
            serde_json::from_slice(bytes).map_err(|e| PolicyError::Parse {
                source: e.to_string(),
            })?;
        Self::new(weights)
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.policy_id = Some(id.to_string());
        self
    }

    pub fn input_dim(&self) -> usize {
        self.layers.first().map(DenseLayer::input_dim).unwrap_or(0)
    }

    pub fn output_dim(&self) -> usize {
        self.layers.last().map(DenseLayer::output_dim).unwrap_or(0)
    }
}

impl Policy for DensePolicy {
    fn version(&self) -> &str {
        &self.version
    }

    fn policy_id(&self) -> Option<&str> {
        self.policy_id.as_deref()
    }

    fn evaluate(&self, observation: &[f32]) -> Result<Vec<f32>, PolicyError> {
        if observation.len() != self.input_dim() {
            return Err(PolicyError::InputDimension {
                expected: self.input_dim(),
                actual: observation.len(),
            });
        }

        let mut activations = observation.to_vec();
        for layer in &self.layers {
            activations = layer.forward(&activations);
        }
        Ok(activations)
    }
}

fn validate_layers(layers: &[DenseLayer]) -> Result<(), PolicyError> {
    if layers.is_empty() {
        return Err(PolicyError::Shape {
            layer: 0,
            message: "policy has no layers".to_string(),
        });
    }

    let mut expected_in = layers[0].input_dim();
    for (idx, layer) in layers.iter().enumerate() {
        if layer.weights.is_empty() || expected_in == 0 {
            return Err(PolicyError::Shape {
                layer: idx,
                message: "empty weight matrix".to_string(),
            });
        }
        if let Some(row) = layer.weights.iter().find(|r| r.len() != expected_in) {
            return Err(PolicyError::Shape {
                layer: idx,
                message: format!("row of width {} where {} expected", row.len(), expected_in),
            });
        }
        if layer.biases.len() != layer.output_dim() {
            return Err(PolicyError::Shape {
                layer: idx,
                message: format!(
                    "{} biases for {} outputs",
                    layer.biases.len(),
                    layer.output_dim()
                ),
            });
        }
        expected_in = layer.output_dim();
    }
    Ok(())
}

fn sha256_id(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
    format!("sha256:{}", hex)
}

/// Noop policy: never touches the schedule.
///
/// Useful as a baseline and for exercising the pipeline without weights.
pub struct NoopPolicy {
    version: String,
}

impl Default for NoopPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl NoopPolicy {
    pub fn new() -> Self {
        Self {
            version: NOOP_POLICY_VERSION.to_string(),
        }
    }
}

impl Policy for NoopPolicy {
    fn version(&self) -> &str {
        &self.version
    }

    fn policy_id(&self) -> Option<&str> {
        Some("noop")
    }

    fn evaluate(&self, observation: &[f32]) -> Result<Vec<f32>, PolicyError> {
        let noop_index = 2 * observation.len();
        let mut scores = vec![0.0; noop_index + 1];
        scores[noop_index] = 1.0;
        Ok(scores)
    }
}
