pub mod config;
pub mod cooldown;
pub mod error;
pub mod event;
pub mod snapshot;
pub mod thresholds;

pub use config::Config;
pub use cooldown::CooldownLedger;
pub use error::*;
pub use event::*;
pub use snapshot::*;
pub use thresholds::*;
