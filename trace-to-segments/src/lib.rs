//! Signal-processing core of a flow cytometer simulation.
//!
//! Detector signals are synthesized from particle pulses ([synthesis]), conditioned by
//! filtering, baseline restoration and digitization ([conditioning]), and finally segmented
//! into per-event windows ([triggering]).
pub mod conditioning;
pub mod synthesis;
pub mod triggering;
