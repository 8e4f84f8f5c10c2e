use super::ConditioningError;
use cytometry_common::{Real, SampleIndex};
use ndarray::{Array1, ArrayView1, ArrayViewMut1};
use serde::Deserialize;
use std::collections::VecDeque;
use tracing::instrument;

/// How many preceding samples the baseline estimate looks back over.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub enum BaselineWindow {
    /// The `n` samples immediately before the current one.
    Samples(usize),
    /// Every sample before the current one.
    Unbounded,
}

/// Minimum over a trailing window of pushed samples.
///
/// Indices are kept in a deque whose values increase from front to back, so the front is
/// always the minimum and each sample enters and leaves the deque at most once.
#[derive(Default, Clone)]
struct RollingMinimum {
    length: Option<usize>,
    candidates: VecDeque<(SampleIndex, Real)>,
}

impl RollingMinimum {
    fn new(window: BaselineWindow) -> Self {
        Self {
            length: match window {
                BaselineWindow::Samples(length) => Some(length),
                BaselineWindow::Unbounded => None,
            },
            ..Default::default()
        }
    }

    fn push(&mut self, index: SampleIndex, value: Real) {
        while self
            .candidates
            .back()
            .is_some_and(|&(_, back)| back >= value)
        {
            self.candidates.pop_back();
        }
        self.candidates.push_back((index, value));
    }

    /// Minimum of the samples in `[max(0, current - length), current)`.
    fn minimum(&mut self, current: SampleIndex) -> Option<Real> {
        if let Some(length) = self.length {
            let oldest = current.saturating_sub(length);
            while self
                .candidates
                .front()
                .is_some_and(|&(index, _)| index < oldest)
            {
                self.candidates.pop_front();
            }
        }
        self.candidates.front().map(|&(_, value)| value)
    }
}

/// Subtracts from each sample the minimum of the samples preceding it.
///
/// The first sample has no predecessors and is defined to be zero. The result is
/// computed entirely from `signal`, which is left untouched.
pub fn restore_baseline(
    signal: ArrayView1<'_, Real>,
    window: BaselineWindow,
) -> Result<Array1<Real>, ConditioningError> {
    if window == BaselineWindow::Samples(0) {
        return Err(ConditioningError::EmptyBaselineWindow);
    }
    let mut minimum = RollingMinimum::new(window);
    let mut previous = None;
    Ok(signal
        .iter()
        .enumerate()
        .map(|(index, &value)| {
            if let Some(previous) = previous {
                minimum.push(index - 1, previous);
            }
            previous = Some(value);
            minimum
                .minimum(index)
                .map_or(0.0, |baseline| value - baseline)
        })
        .collect())
}

/// In-place form of [restore_baseline].
#[instrument(skip_all, fields(num_samples = signal.len(), window = ?window))]
pub fn apply_baseline_restoration(
    mut signal: ArrayViewMut1<'_, Real>,
    window: BaselineWindow,
) -> Result<(), ConditioningError> {
    let original = signal.to_owned();
    let restored = restore_baseline(original.view(), window)?;
    signal.assign(&restored);
    Ok(())
}
