//! Estimates, for a block storage device, the fraction of all-zero blocks
//! and the average deflate compression ratio of the rest, from a bounded
//! random sample — without reading the whole device.
//!
//! The estimate comes with Hoeffding confidence bounds so an operator can
//! judge whether zero-elimination or real-time compression is worth
//! enabling on a migration target. See `src/bin/comprestimate.rs` for the
//! driver loop that ties these modules together.

pub mod block;
pub mod cli;
pub mod codec;
pub mod device;
pub mod error;
pub mod estimator;
pub mod pattern;
pub mod pool;
pub mod report;
pub mod signal;
pub mod worker;