//! Encoding through the system `ffmpeg` binary.

pub mod ffmpeg;
