//! Built-in safety-anomaly detection over the live aircraft stream.
//!
//! Three pieces run every tick, in order, against one immutable batch:
//! the [`store::AircraftStateStore`] absorbs the batch, the
//! [`grid::ProximityIndex`] is rebuilt from the positioned aircraft, and
//! the [`safety::SafetyDetector`] scans both for extreme vertical rates,
//! TCAS-RA-like reversals, and pairwise proximity conflicts.

pub mod geo;
pub mod grid;
pub mod safety;
pub mod store;

pub use grid::ProximityIndex;
pub use safety::SafetyDetector;
pub use store::{AircraftStateStore, TrackState, UpdateStats};
