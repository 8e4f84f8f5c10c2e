//! Builds a detector's raw analog signal from the Gaussian pulses of individual particles.
//!
//! Each particle contributes `amplitude * exp(-(t - center)^2 / (2 width^2))` to every tick
//! of the time base, on top of a constant background level.
pub mod noise;

use cytometry_common::Real;
use ndarray::{Array1, ArrayView1, Zip};
use thiserror::Error;
use tracing::instrument;

#[derive(Debug, Error, PartialEq)]
pub enum SynthesisError {
    #[error(
        "Pulse parameters must have the same length, got {widths} widths, {centers} centers and {amplitudes} amplitudes"
    )]
    MismatchedLengths {
        widths: usize,
        centers: usize,
        amplitudes: usize,
    },
    #[error("Pulse {index} has a non-positive width: {width}")]
    NonPositiveWidth { index: usize, width: Real },
}

/// The contribution of a single particle to the signal.
#[derive(Default, Clone, Copy, Debug, PartialEq)]
pub struct PulseDescriptor {
    /// Standard deviation of the Gaussian, in the units of the time base.
    pub width: Real,
    /// Time at which the pulse peaks.
    pub center: Real,
    /// Peak height above the background.
    pub amplitude: Real,
}

impl PulseDescriptor {
    pub fn new(width: Real, center: Real, amplitude: Real) -> Self {
        Self {
            width,
            center,
            amplitude,
        }
    }

    pub fn value_at(&self, time: Real) -> Real {
        let dt = time - self.center;
        self.amplitude * Real::exp(-(dt * dt) / (2.0 * self.width * self.width))
    }
}

/// Zips parallel parameter arrays into pulse descriptors.
pub fn pulses_from_parameters(
    widths: ArrayView1<'_, Real>,
    centers: ArrayView1<'_, Real>,
    amplitudes: ArrayView1<'_, Real>,
) -> Result<Vec<PulseDescriptor>, SynthesisError> {
    if widths.len() != centers.len() || widths.len() != amplitudes.len() {
        return Err(SynthesisError::MismatchedLengths {
            widths: widths.len(),
            centers: centers.len(),
            amplitudes: amplitudes.len(),
        });
    }
    Ok(widths
        .iter()
        .zip(centers.iter())
        .zip(amplitudes.iter())
        .map(|((&width, &center), &amplitude)| PulseDescriptor::new(width, center, amplitude))
        .collect())
}

/// Sums `background` and every pulse at each tick of `time`.
///
/// Ticks are distributed across the rayon thread pool. Each tick is owned by exactly one
/// worker, which accumulates the pulses in slice order, so the result does not depend on
/// the number of threads.
#[instrument(skip_all, fields(num_pulses = pulses.len(), num_samples = time.len()))]
pub fn synthesize(
    pulses: &[PulseDescriptor],
    time: ArrayView1<'_, Real>,
    background: Real,
) -> Result<Array1<Real>, SynthesisError> {
    if let Some((index, pulse)) = pulses
        .iter()
        .enumerate()
        .find(|(_, pulse)| pulse.width.is_nan() || pulse.width <= 0.0)
    {
        return Err(SynthesisError::NonPositiveWidth {
            index,
            width: pulse.width,
        });
    }

    let mut signal = Array1::from_elem(time.len(), background);
    Zip::from(&mut signal).and(time).par_for_each(|sample, &t| {
        *sample = pulses
            .iter()
            .fold(*sample, |acc, pulse| acc + pulse.value_at(t));
    });
    Ok(signal)
}

/// Convenience form of [synthesize] taking the pulse parameters as parallel arrays.
pub fn generate_pulses(
    widths: ArrayView1<'_, Real>,
    centers: ArrayView1<'_, Real>,
    amplitudes: ArrayView1<'_, Real>,
    time: ArrayView1<'_, Real>,
    background: Real,
) -> Result<Array1<Real>, SynthesisError> {
    let pulses = pulses_from_parameters(widths, centers, amplitudes)?;
    synthesize(&pulses, time, background)
}
