//! Frame-grid time quantization shared by preview and export.
//!
//! Both loops walk the same grid: elapsed wall time (or the export frame
//! counter) snaps to a whole output frame before sampling the timeline, so a
//! given frame index renders identical pixels in either path.

/// Number of whole frames on the composition's grid, never less than one.
pub fn total_frames(duration_sec: f64, frame_rate: f64) -> u64 {
    ((duration_sec * frame_rate).round() as u64).max(1)
}

/// Quantize elapsed seconds onto the frame grid, wrapping past the end so
/// playback loops seamlessly.
pub fn looped_frame_time(elapsed_sec: f64, frame_rate: f64, duration_sec: f64) -> f64 {
    let total = total_frames(duration_sec, frame_rate);
    let frame = (elapsed_sec * frame_rate).floor().max(0.0) as u64 % total;
    frame as f64 / frame_rate
}

/// Quantize elapsed seconds onto the frame grid, clamping to the final frame
/// instead of wrapping. Export uses this so the artifact ends on the last
/// frame rather than frame zero.
pub fn clamped_frame_time(elapsed_sec: f64, frame_rate: f64, duration_sec: f64) -> f64 {
    let total = total_frames(duration_sec, frame_rate);
    let frame = ((elapsed_sec * frame_rate).floor().max(0.0) as u64).min(total - 1);
    frame as f64 / frame_rate
}
