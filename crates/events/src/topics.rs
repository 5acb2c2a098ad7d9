//! Broadcast topic names.
//!
//! Subscribers filter on prefix, so related topics share a stem.

/// Safety-detector events (extreme_vs, tcas_ra_like, proximity_conflict).
pub const EVENT_SAFETY: &str = "event.safety";

/// User-rule alert events.
pub const EVENT_RULE: &str = "event.rule";

/// Engine status snapshots.
pub const ENGINE_STATUS: &str = "engine.status";
