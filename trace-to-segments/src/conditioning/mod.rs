//! In-place conditioning of synthesized signals: low-pass filtering, baseline
//! restoration and digitization.
pub mod baseline;
pub mod digitizer;
pub mod filters;

pub use baseline::{BaselineWindow, apply_baseline_restoration, restore_baseline};
pub use digitizer::{BitDepth, DigitizedSignal, Digitizer, SaturationLevels};
pub use filters::{LowPassFilter, apply_bessel_lowpass_filter, apply_butterworth_lowpass_filter};

use cytometry_common::Real;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConditioningError {
    #[error("Sampling rate must be positive, got {0}")]
    InvalidSamplingRate(Real),
    #[error("Cutoff frequency must be positive, got {0}")]
    InvalidCutoff(Real),
    #[error("Cutoff frequency {cutoff} Hz must be less than the Nyquist frequency {nyquist} Hz")]
    NyquistViolation { cutoff: Real, nyquist: Real },
    #[error("Baseline window must contain at least one sample")]
    EmptyBaselineWindow,
    #[error("Cannot digitize an empty signal")]
    EmptySignal,
    #[error("Invalid bit depth: {0}")]
    InvalidBitDepth(String),
    #[error("Saturation levels are inverted: min {min} > max {max}")]
    InvalidSaturation { min: Real, max: Real },
}
