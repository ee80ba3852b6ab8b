// src/error.rs
//
// Error types for policy loading/evaluation, the scheduling cycle and
// configuration loading.

use std::fmt;

/// Errors raised by a policy while loading or evaluating.
#[derive(Debug, Clone, PartialEq)]
pub enum PolicyError {
    /// Policy cannot be evaluated right now.
    Unavailable { reason: String },
    /// Observation length does not match the policy's input layer.
    InputDimension { expected: usize, actual: usize },
    Io { path: String, source: String },
    Parse { source: String },
    /// Weight matrices/biases are inconsistent.
    Shape { layer: usize, message: String },
}

impl fmt::Display for PolicyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyError::Unavailable { reason } => write!(f, "Policy unavailable: {}", reason),
            PolicyError::InputDimension { expected, actual } => write!(
                f,
                "Policy input dimension mismatch: expected {}, got {}",
                expected, actual
            ),
            PolicyError::Io { path, source } => {
                write!(f, "Failed to read policy file '{}': {}", path, source)
            }
            PolicyError::Parse { source } => write!(f, "Failed to parse policy: {}", source),
            PolicyError::Shape { layer, message } => {
                write!(f, "Invalid policy shape in layer {}: {}", layer, message)
            }
        }
    }
}

impl std::error::Error for PolicyError {}

/// Fatal errors for one scheduling cycle.
///
/// A cycle that cannot produce a trustworthy action fails loudly instead of
/// degrading to `NoAction`.
#[derive(Debug, Clone, PartialEq)]
pub enum SchedulerError {
    /// Topology reports no GTS at all.
    EmptyAddressSpace,
    Policy(PolicyError),
    /// Policy returned fewer scores than the 2N allocate/deallocate actions.
    MalformedPolicyOutput { expected_min: usize, actual: usize },
    /// Every score was NaN.
    NonFinitePolicyOutput { len: usize },
}

impl fmt::Display for SchedulerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulerError::EmptyAddressSpace => {
                write!(f, "Topology reports an empty slot address space")
            }
            SchedulerError::Policy(err) => write!(f, "Policy evaluation failed: {}", err),
            SchedulerError::MalformedPolicyOutput {
                expected_min,
                actual,
            } => write!(
                f,
                "Malformed policy output: expected at least {} scores, got {}",
                expected_min, actual
            ),
            SchedulerError::NonFinitePolicyOutput { len } => {
                write!(f, "Policy output of length {} has no comparable score", len)
            }
        }
    }
}

impl std::error::Error for SchedulerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SchedulerError::Policy(err) => Some(err),
            _ => None,
        }
    }
}

impl From<PolicyError> for SchedulerError {
    fn from(err: PolicyError) -> Self {
        SchedulerError::Policy(err)
    }
}

/// Errors that can occur when loading scheduler configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    Io { path: String, source: String },
    Parse { source: String },
    Validation { field: String, message: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(f, "Failed to read config file '{}': {}", path, source)
            }
            ConfigError::Parse { source } => write!(f, "Failed to parse config YAML: {}", source),
            ConfigError::Validation { field, message } => {
                write!(f, "Config validation error in '{}': {}", field, message)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
