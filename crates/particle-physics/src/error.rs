//! Error types for particle construction.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum ParticleError {
    #[error("particle mass must be positive and finite, got {0}")]
    NonPositiveMass(f64),

    #[error("epsilon must be non-negative and finite, got {0}")]
    NegativeEpsilon(f64),

    #[error("sigma must be positive and finite, got {0}")]
    NonPositiveSigma(f64),

    #[error("position must be finite, got ({0}, {1})")]
    NonFinitePosition(f64, f64),
}

pub type Result<T> = std::result::Result<T, ParticleError>;
