use cytometry_common::Real;
use rand::Rng;
use rand_distr::{Distribution, Exp, Normal};
use serde::Deserialize;
use std::{
    env::{self, VarError},
    num::ParseFloatError,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub(crate) enum DistributionError {
    #[error("Cannot Extract Environment Variable")]
    EnvVar(#[from] VarError),
    #[error("Invalid String to Float: {0}")]
    FloatFromStr(#[from] ParseFloatError),
    #[error("Invalid Uniform Distribution: min {min} must be less than max {max}")]
    EmptyRange { min: Real, max: Real },
    #[error("Invalid Normal Distribution: standard deviation must be positive, got {0}")]
    InvalidStandardDeviation(Real),
    #[error("Invalid Normal Distribution: {0}")]
    NormalDistribution(#[from] rand_distr::NormalError),
    #[error("Invalid Exponential Distribution: {0}")]
    ExpDistribution(#[from] rand_distr::ExpError),
}

/// A number given directly, or read from an environment variable when sampled.
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "kebab-case")]
pub(crate) enum FloatExpression {
    Float(Real),
    FloatEnv(String),
}

impl FloatExpression {
    pub(crate) fn value(&self) -> Result<Real, DistributionError> {
        match self {
            FloatExpression::Float(v) => Ok(*v),
            FloatExpression::FloatEnv(environment_variable) => {
                Ok(env::var(environment_variable)?.parse()?)
            }
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "kebab-case", tag = "random-type")]
pub(crate) enum FloatRandomDistribution {
    Constant {
        value: FloatExpression,
    },
    Uniform {
        min: FloatExpression,
        max: FloatExpression,
    },
    Normal {
        mean: FloatExpression,
        sd: FloatExpression,
    },
    Exponential {
        lifetime: FloatExpression,
    },
}

impl FloatRandomDistribution {
    pub(crate) fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Real, DistributionError> {
        match self {
            Self::Constant { value } => value.value(),
            Self::Uniform { min, max } => {
                let (min, max) = (min.value()?, max.value()?);
                if min.is_nan() || max.is_nan() || min >= max {
                    return Err(DistributionError::EmptyRange { min, max });
                }
                Ok(rng.random_range(min..max))
            }
            Self::Normal { mean, sd } => {
                let sd = sd.value()?;
                if sd.is_nan() || sd <= 0.0 {
                    return Err(DistributionError::InvalidStandardDeviation(sd));
                }
                Ok(Normal::new(mean.value()?, sd)?.sample(rng))
            }
            Self::Exponential { lifetime } => Ok(Exp::new(1.0 / lifetime.value()?)?.sample(rng)),
        }
    }
}
