//! Event-triggered segmentation of multi-channel signals.
//!
//! A [TriggeringSystem] holds a shared time base and any number of named channels. Running
//! it finds trigger windows on one channel, using one of the [TriggerScheme]s, and cuts the
//! samples in those windows out of every channel, labelling each with its window's index.
mod channel;
mod engine;
mod parameters;
mod schemes;

pub use channel::Channel;
pub use engine::{RunReport, TriggeringSystem};
pub use parameters::{Threshold, ThresholdError, TriggerScheme, TriggerSettings};
pub use schemes::TriggerWindow;

use cytometry_common::Real;
use std::fmt::{Display, Formatter};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum TriggerError {
    #[error("{name} must be one-dimensional, got {ndim} dimensions")]
    NotOneDimensional { name: String, ndim: usize },
    #[error("{0} must not be empty")]
    EmptyBuffer(String),
    #[error("Time base has already been registered")]
    TimeBaseAlreadySet,
    #[error("Time base must be registered before running")]
    MissingTimeBase,
    #[error("Channel not found: {0}")]
    ChannelNotFound(String),
}

/// Reasons a run produced no segments without failing.
#[derive(Clone, Debug, PartialEq)]
pub enum TriggerWarning {
    UnknownScheme(String),
    NoTriggers {
        channel: String,
        threshold: Real,
        min: Real,
        max: Real,
    },
}

impl Display for TriggerWarning {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownScheme(scheme) => write!(
                f,
                "Unknown trigger scheme {scheme:?}, expected one of \"fixed-window\", \"dynamic\" or \"dynamic-simple\""
            ),
            Self::NoTriggers {
                channel,
                threshold,
                min,
                max,
            } => write!(
                f,
                "No signal met the trigger criteria on channel {channel}: threshold {threshold}, signal range [{min}, {max}]"
            ),
        }
    }
}
