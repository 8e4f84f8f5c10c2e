pub mod tracer;

/// Scalar type of every sample, timestamp and pulse parameter.
pub type Real = f64;
/// Position of a sample within a buffer.
pub type SampleIndex = usize;
/// Rank of an accepted trigger window, shared by every channel's extracted segments.
pub type SegmentId = u32;
/// Samples per second.
pub type SampleRate = f64;
