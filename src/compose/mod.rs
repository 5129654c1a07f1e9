//! CPU compositing: transforms, blending, color filtering, rasterization
//! and the per-frame compositor.

pub mod blend;
pub mod color;
pub mod compositor;
pub mod draw;
pub mod transform;
