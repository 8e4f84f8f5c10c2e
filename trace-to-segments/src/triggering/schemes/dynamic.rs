use super::{TriggerWindow, WindowCollector, first_not_above, is_rising_edge};
use crate::triggering::TriggerSettings;
use cytometry_common::Real;
use ndarray::ArrayView1;

/// Like the simple dynamic scheme, but the window stays open until the signal falls to
/// the lower threshold, and when debouncing only pulses that stay above the threshold for
/// the minimum duration open a window.
pub(super) fn scan(
    signal: ArrayView1<'_, Real>,
    threshold: Real,
    settings: &TriggerSettings,
    collector: &mut WindowCollector,
) {
    let lower_threshold = settings.resolve_lower_threshold(threshold);
    let min_duration = settings.debounce_duration();
    let last = signal.len().saturating_sub(1);

    let mut index = 1;
    while index < signal.len() {
        if !is_rising_edge(signal, index, threshold) {
            index += 1;
            continue;
        }
        if let Some(min_duration) = min_duration {
            let sustained = signal
                .iter()
                .skip(index)
                .take(min_duration)
                .take_while(|&&value| value > threshold)
                .count();
            if sustained < min_duration {
                // Skip the rest of the short pulse
                index += sustained + 1;
                continue;
            }
        }
        let fall = first_not_above(signal, index, threshold);
        let release = first_not_above(signal, fall, lower_threshold);
        let window = TriggerWindow::new(
            index.saturating_sub(settings.pre_buffer),
            (release - 1).saturating_add(settings.post_buffer).min(last),
        );
        if !collector.offer(window) {
            break;
        }
        index = release + 1;
    }
}
