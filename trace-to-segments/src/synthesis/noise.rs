use cytometry_common::Real;
use ndarray::ArrayViewMut1;
use rand::Rng;
use rand_distr::{Distribution, Normal, Poisson};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NoiseError {
    #[error("Cannot add noise to an empty signal")]
    EmptySignal,
    #[error("Standard deviation must be positive, got {0}")]
    InvalidStandardDeviation(Real),
    #[error("Invalid Normal Distribution: {0}")]
    NormalDistribution(#[from] rand_distr::NormalError),
    #[error("Invalid Poisson Distribution: {0}")]
    PoissonDistribution(#[from] rand_distr::PoissonError),
    #[error("Poisson noise requires non-negative values, found {value} at index {index}")]
    InvalidExpectation { index: usize, value: Real },
}

/// Adds independent `Normal(mean, standard_deviation)` samples to every value, in place.
pub fn add_gaussian_noise<R: Rng + ?Sized>(
    mut signal: ArrayViewMut1<'_, Real>,
    mean: Real,
    standard_deviation: Real,
    rng: &mut R,
) -> Result<(), NoiseError> {
    if signal.is_empty() {
        return Err(NoiseError::EmptySignal);
    }
    if standard_deviation.is_nan() || standard_deviation <= 0.0 {
        return Err(NoiseError::InvalidStandardDeviation(standard_deviation));
    }
    let normal = Normal::new(mean, standard_deviation)?;
    signal
        .iter_mut()
        .for_each(|value| *value += normal.sample(rng));
    Ok(())
}

/// Replaces every value by a Poisson draw whose expectation is that value, in place.
///
/// This models shot noise when the signal is expressed as a photon (or electron) count.
/// Every value is checked before any is replaced, so on error the signal is unchanged.
pub fn add_poisson_noise<R: Rng + ?Sized>(
    mut signal: ArrayViewMut1<'_, Real>,
    rng: &mut R,
) -> Result<(), NoiseError> {
    if signal.is_empty() {
        return Err(NoiseError::EmptySignal);
    }
    let distributions = signal
        .iter()
        .enumerate()
        .map(|(index, &value)| {
            if value.is_nan() || value < 0.0 {
                return Err(NoiseError::InvalidExpectation { index, value });
            }
            // A zero expectation always yields zero counts
            if value > 0.0 {
                Ok(Some(Poisson::new(value)?))
            } else {
                Ok(None)
            }
        })
        .collect::<Result<Vec<_>, NoiseError>>()?;

    for (value, poisson) in signal.iter_mut().zip(distributions) {
        if let Some(poisson) = poisson {
            *value = poisson.sample(rng);
        }
    }
    Ok(())
}
