//! The animation document: serialized model, property sampling, and the
//! per-layer render preparation pass.

pub mod model;
pub mod prepare;
pub mod property;
