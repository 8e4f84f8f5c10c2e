//! Window finders. Each scheme scans the trigger channel once, left to right, and offers
//! the windows it finds to a [WindowCollector].
mod dynamic;
mod dynamic_simple;
mod fixed_window;

use super::{TriggerScheme, TriggerSettings};
use cytometry_common::{Real, SampleIndex};
use ndarray::ArrayView1;

/// An inclusive range of sample indices, valid for the trigger channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TriggerWindow {
    pub start: SampleIndex,
    pub end: SampleIndex,
}

impl TriggerWindow {
    pub fn new(start: SampleIndex, end: SampleIndex) -> Self {
        Self { start, end }
    }

    pub fn num_samples(&self) -> usize {
        self.end + 1 - self.start
    }
}

/// Accepts windows in scan order, dropping any that overlap the last accepted window and
/// stopping once the trigger limit is reached.
pub(crate) struct WindowCollector {
    windows: Vec<TriggerWindow>,
    limit: Option<usize>,
}

impl WindowCollector {
    pub(crate) fn new(limit: Option<usize>) -> Self {
        Self {
            windows: Vec::new(),
            limit,
        }
    }

    /// Returns `false` when no further windows will be accepted and scanning should stop.
    pub(crate) fn offer(&mut self, window: TriggerWindow) -> bool {
        if self
            .windows
            .last()
            .is_none_or(|last| window.start > last.end)
        {
            self.windows.push(window);
        }
        !self.is_full()
    }

    fn is_full(&self) -> bool {
        self.limit.is_some_and(|limit| self.windows.len() >= limit)
    }

    pub(crate) fn into_windows(self) -> Vec<TriggerWindow> {
        self.windows
    }
}

/// Strictly above; a sample equal to the level, or NaN, counts as at-or-below.
fn is_above(value: Real, level: Real) -> bool {
    value > level
}

/// True if the signal crosses from at-or-below `level` at `index - 1` to above it at `index`.
fn is_rising_edge(signal: ArrayView1<'_, Real>, index: SampleIndex, level: Real) -> bool {
    match (index.checked_sub(1).and_then(|i| signal.get(i)), signal.get(index)) {
        (Some(&before), Some(&after)) => !is_above(before, level) && is_above(after, level),
        _ => false,
    }
}

/// The first index at or after `from` whose sample is not above `level`, or the length of
/// the signal if there is none.
fn first_not_above(signal: ArrayView1<'_, Real>, from: SampleIndex, level: Real) -> SampleIndex {
    (from..signal.len())
        .find(|&index| {
            signal
                .get(index)
                .is_some_and(|&value| !is_above(value, level))
        })
        .unwrap_or(signal.len())
}

pub(crate) fn find_windows(
    scheme: TriggerScheme,
    signal: ArrayView1<'_, Real>,
    threshold: Real,
    settings: &TriggerSettings,
) -> Vec<TriggerWindow> {
    let mut collector = WindowCollector::new(settings.trigger_limit());
    match scheme {
        TriggerScheme::FixedWindow => {
            fixed_window::scan(signal, threshold, settings, &mut collector)
        }
        TriggerScheme::DynamicSimple => {
            dynamic_simple::scan(signal, threshold, settings, &mut collector)
        }
        TriggerScheme::Dynamic => dynamic::scan(signal, threshold, settings, &mut collector),
    }
    collector.into_windows()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn rising_edges() {
        let signal = array![0.0, 1.0, 2.0, 1.0, 1.5];
        let edges: Vec<_> = (0..=signal.len())
            .filter(|&i| is_rising_edge(signal.view(), i, 1.0))
            .collect();
        assert_eq!(edges, vec![2, 4]);
    }

    #[test]
    fn nan_is_never_above() {
        let signal = array![Real::NAN, 2.0, Real::NAN];
        assert!(is_rising_edge(signal.view(), 1, 1.0));
        assert_eq!(first_not_above(signal.view(), 1, 1.0), 2);
    }

    #[test]
    fn first_not_above_runs_off_the_end() {
        let signal = array![0.0, 2.0, 3.0];
        assert_eq!(first_not_above(signal.view(), 1, 1.0), 3);
        assert_eq!(first_not_above(signal.view(), 0, 1.0), 0);
    }

    #[test]
    fn collector_drops_overlaps() {
        let mut collector = WindowCollector::new(None);
        assert!(collector.offer(TriggerWindow::new(0, 4)));
        assert!(collector.offer(TriggerWindow::new(4, 6)));
        assert!(collector.offer(TriggerWindow::new(5, 9)));
        assert_eq!(
            collector.into_windows(),
            vec![TriggerWindow::new(0, 4), TriggerWindow::new(5, 9)]
        );
    }

    #[test]
    fn collector_stops_at_limit() {
        let mut collector = WindowCollector::new(Some(2));
        assert!(collector.offer(TriggerWindow::new(0, 1)));
        assert!(collector.offer(TriggerWindow::new(1, 2)));
        assert!(!collector.offer(TriggerWindow::new(3, 4)));
        assert_eq!(collector.into_windows().len(), 2);
    }

    #[test]
    fn window_size() {
        assert_eq!(TriggerWindow::new(3, 3).num_samples(), 1);
        assert_eq!(TriggerWindow::new(2, 7).num_samples(), 6);
    }
}
