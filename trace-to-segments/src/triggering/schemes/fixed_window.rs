use super::{TriggerWindow, WindowCollector, is_rising_edge};
use crate::triggering::TriggerSettings;
use cytometry_common::Real;
use ndarray::ArrayView1;

/// Places a window of `pre_buffer + post_buffer + 2` samples around the last sample at or
/// below the threshold before each rising edge.
///
/// Windows that would extend past either end of the signal are dropped rather than
/// clipped.
pub(super) fn scan(
    signal: ArrayView1<'_, Real>,
    threshold: Real,
    settings: &TriggerSettings,
    collector: &mut WindowCollector,
) {
    for index in 1..signal.len() {
        if !is_rising_edge(signal, index, threshold) {
            continue;
        }
        let crossing = index - 1;
        let Some(start) = settings
            .pre_buffer
            .checked_add(1)
            .and_then(|before| crossing.checked_sub(before))
        else {
            continue;
        };
        let end = crossing.saturating_add(settings.post_buffer);
        if end >= signal.len() {
            continue;
        }
        if !collector.offer(TriggerWindow::new(start, end)) {
            break;
        }
    }
}
