//! Shared low-level building blocks: error taxonomy and pixel/hash math.

pub mod error;
pub mod math;
