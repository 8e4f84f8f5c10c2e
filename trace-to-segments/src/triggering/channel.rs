use super::TriggerWindow;
use cytometry_common::{Real, SegmentId};
use ndarray::{Array1, ArrayView1};
use tracing::instrument;

/// A registered detector channel, with the segments most recently extracted from it.
///
/// The three segment buffers always have equal length; entry `n` of each describes the
/// same extracted sample.
#[derive(Clone, Debug)]
pub struct Channel {
    name: String,
    signal: Array1<Real>,
    segmented_signal: Vec<Real>,
    segmented_time: Vec<Real>,
    segment_ids: Vec<SegmentId>,
}

impl Channel {
    pub(crate) fn new(name: String, signal: Array1<Real>) -> Self {
        Self {
            name,
            signal,
            segmented_signal: Vec::new(),
            segmented_time: Vec::new(),
            segment_ids: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn signal(&self) -> ArrayView1<'_, Real> {
        self.signal.view()
    }

    pub fn segmented_signal(&self) -> &[Real] {
        &self.segmented_signal
    }

    pub fn segmented_time(&self) -> &[Real] {
        &self.segmented_time
    }

    pub fn segment_ids(&self) -> &[SegmentId] {
        &self.segment_ids
    }

    /// `(minimum, maximum)` of the registered signal.
    pub fn range(&self) -> (Real, Real) {
        self.signal.iter().fold(
            (Real::INFINITY, Real::NEG_INFINITY),
            |(min, max), &value| (min.min(value), max.max(value)),
        )
    }

    pub(crate) fn clear_segments(&mut self) {
        self.segmented_signal.clear();
        self.segmented_time.clear();
        self.segment_ids.clear();
    }

    /// Appends the samples of every window, tagged with the window's position in `windows`.
    ///
    /// Indices beyond the end of this channel, or of `time`, are skipped.
    #[instrument(
        skip_all,
        level = "trace",
        fields(channel = %self.name, num_windows = windows.len())
    )]
    pub(crate) fn extract_segments(
        &mut self,
        time: ArrayView1<'_, Real>,
        windows: &[TriggerWindow],
    ) {
        for (segment_id, window) in (0..).zip(windows) {
            for index in window.start..=window.end {
                let (Some(&value), Some(&timestamp)) = (self.signal.get(index), time.get(index))
                else {
                    break;
                };
                self.segmented_signal.push(value);
                self.segmented_time.push(timestamp);
                self.segment_ids.push(segment_id);
            }
        }
    }
}
