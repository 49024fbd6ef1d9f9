//! Observation fusion and the per-tick fusion loop
//!
//! - [`strategy`]: how the raw sensor readings of one tick become a single
//!   pose-space observation
//! - [`feed`]: the externally produced control and observation series
//! - [`runner`]: the predict → update → resample driver for both estimators

pub mod feed;
pub mod runner;
pub mod strategy;

pub use feed::*;
pub use runner::*;
pub use strategy::*;
