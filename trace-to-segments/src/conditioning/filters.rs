//! Cascaded one-pole (RC) low-pass filtering.
//!
//! Both public entry points run the same recursion. The Bessel and Butterworth names are
//! kept for callers that select a filter by family; neither implements the textbook
//! transfer function of that family, and both return identical output for identical
//! parameters.
use super::ConditioningError;
use cytometry_common::{Real, SampleRate};
use ndarray::ArrayViewMut1;
use serde::Deserialize;
use std::f64::consts::PI;
use tracing::instrument;

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct LowPassFilter {
    /// Samples per second of the filtered signal.
    pub sampling_rate: SampleRate,
    /// -3dB frequency of a single stage, in Hz.
    pub cutoff_frequency: Real,
    /// Number of cascaded stages; zero leaves the signal unfiltered.
    #[serde(default = "LowPassFilter::default_order")]
    pub order: usize,
    /// Applied once, after the last stage.
    #[serde(default = "LowPassFilter::default_gain")]
    pub gain: Real,
}

impl LowPassFilter {
    fn default_order() -> usize {
        1
    }

    fn default_gain() -> Real {
        1.0
    }

    pub fn new(
        sampling_rate: SampleRate,
        cutoff_frequency: Real,
        order: usize,
        gain: Real,
    ) -> Self {
        Self {
            sampling_rate,
            cutoff_frequency,
            order,
            gain,
        }
    }

    pub fn validate(&self) -> Result<(), ConditioningError> {
        if self.sampling_rate.is_nan() || self.sampling_rate <= 0.0 {
            return Err(ConditioningError::InvalidSamplingRate(self.sampling_rate));
        }
        if self.cutoff_frequency.is_nan() || self.cutoff_frequency <= 0.0 {
            return Err(ConditioningError::InvalidCutoff(self.cutoff_frequency));
        }
        let nyquist = self.sampling_rate / 2.0;
        if self.cutoff_frequency >= nyquist {
            return Err(ConditioningError::NyquistViolation {
                cutoff: self.cutoff_frequency,
                nyquist,
            });
        }
        Ok(())
    }

    /// Smoothing coefficient of each stage, `dt / (RC + dt)`.
    pub fn alpha(&self) -> Real {
        let dt = 1.0 / self.sampling_rate;
        let rc = 1.0 / (2.0 * PI * self.cutoff_frequency);
        dt / (rc + dt)
    }

    /// Filters `signal` in place. The first sample of each stage seeds its own recursion.
    pub fn apply(&self, mut signal: ArrayViewMut1<'_, Real>) -> Result<(), ConditioningError> {
        self.validate()?;
        let alpha = self.alpha();
        for _ in 0..self.order {
            let mut previous = match signal.get(0) {
                Some(&first) => first,
                None => return Ok(()),
            };
            for value in signal.iter_mut().skip(1) {
                previous = alpha * *value + (1.0 - alpha) * previous;
                *value = previous;
            }
        }
        signal.mapv_inplace(|value| value * self.gain);
        Ok(())
    }
}

/// Bessel-like low-pass filter, in place. Identical to [apply_butterworth_lowpass_filter].
#[instrument(skip_all, fields(order = filter.order, cutoff = filter.cutoff_frequency))]
pub fn apply_bessel_lowpass_filter(
    signal: ArrayViewMut1<'_, Real>,
    filter: &LowPassFilter,
) -> Result<(), ConditioningError> {
    filter.apply(signal)
}

/// Butterworth-like low-pass filter, in place. Identical to [apply_bessel_lowpass_filter].
#[instrument(skip_all, fields(order = filter.order, cutoff = filter.cutoff_frequency))]
pub fn apply_butterworth_lowpass_filter(
    signal: ArrayViewMut1<'_, Real>,
    filter: &LowPassFilter,
) -> Result<(), ConditioningError> {
    filter.apply(signal)
}
