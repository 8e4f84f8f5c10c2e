use super::{TriggerWindow, WindowCollector, first_not_above, is_rising_edge};
use crate::triggering::TriggerSettings;
use cytometry_common::Real;
use ndarray::ArrayView1;

/// Opens a window at each rising edge and closes it at the last sample above the
/// threshold, then pads both ends by the buffers, clipped to the signal.
///
/// Scanning resumes after the sample that closed the pulse.
pub(super) fn scan(
    signal: ArrayView1<'_, Real>,
    threshold: Real,
    settings: &TriggerSettings,
    collector: &mut WindowCollector,
) {
    let last = signal.len().saturating_sub(1);
    let mut index = 1;
    while index < signal.len() {
        if is_rising_edge(signal, index, threshold) {
            let fall = first_not_above(signal, index, threshold);
            let window = TriggerWindow::new(
                index.saturating_sub(settings.pre_buffer),
                (fall - 1).saturating_add(settings.post_buffer).min(last),
            );
            if !collector.offer(window) {
                break;
            }
            index = fall;
        }
        index += 1;
    }
}
