//! The one-shot export pipeline.

pub mod pipeline;
