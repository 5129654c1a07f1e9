use std::path::{Path, PathBuf};

use crate::{
    assets::cache::{PreparedImage, premultiply_in_place},
    foundation::error::{LunpoError, LunpoResult},
};

/// Probed metadata for a video source.
#[derive(Clone, Debug)]
pub struct VideoInfo {
    /// Absolute source path.
    pub source_path: PathBuf,
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Source duration in seconds (0 when unreported).
    pub duration_sec: f64,
}

struct SeekResult {
    target: f64,
    frame: Option<PreparedImage>,
}

/// A muted, seekable handle onto a looping video clip.
///
/// Decoding runs on a background worker; seeks are requested without
/// blocking and their completion is polled once per render tick via
/// [`VideoHandle::poll`]. The handle itself, not a decoded frame, is what
/// the asset cache stores. Dropping the handle closes the request channel
/// and the worker exits.
#[derive(Debug)]
pub struct VideoHandle {
    info: VideoInfo,
    seek_tx: crossbeam_channel::Sender<f64>,
    done_rx: crossbeam_channel::Receiver<SeekResult>,
    requested: u64,
    settled: u64,
    position: Option<f64>,
    frame: Option<PreparedImage>,
}

impl std::fmt::Debug for SeekResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeekResult")
            .field("target", &self.target)
            .field("decoded", &self.frame.is_some())
            .finish()
    }
}

impl VideoHandle {
    /// Probe the source and spawn the decode worker.
    pub fn open(source_path: &Path) -> LunpoResult<Self> {
        let info = probe_video(source_path)?;
        let (seek_tx, seek_rx) = crossbeam_channel::unbounded::<f64>();
        let (done_tx, done_rx) = crossbeam_channel::unbounded::<SeekResult>();

        let worker_info = info.clone();
        std::thread::spawn(move || {
            while let Ok(target) = seek_rx.recv() {
                let frame = match decode_frame_rgba8(&worker_info, target) {
                    Ok(frame) => Some(frame),
                    Err(e) => {
                        tracing::warn!(
                            source = %worker_info.source_path.display(),
                            target_sec = target,
                            error = %e,
                            "video frame decode failed"
                        );
                        None
                    }
                };
                if done_tx.send(SeekResult { target, frame }).is_err() {
                    break;
                }
            }
        });

        Ok(Self {
            info,
            seek_tx,
            done_rx,
            requested: 0,
            settled: 0,
            position: None,
            frame: None,
        })
    }

    /// Probed source metadata.
    pub fn info(&self) -> &VideoInfo {
        &self.info
    }

    /// Source duration in seconds.
    pub fn duration_sec(&self) -> f64 {
        self.info.duration_sec
    }

    /// Drain settled seeks; called once per render tick before inspecting
    /// position/readiness.
    pub fn poll(&mut self) {
        while let Ok(result) = self.done_rx.try_recv() {
            self.settled += 1;
            if let Some(frame) = result.frame {
                self.position = Some(result.target);
                self.frame = Some(frame);
            }
        }
    }

    /// Request an asynchronous seek toward `target_sec`.
    pub fn request_seek(&mut self, target_sec: f64) {
        if self.seek_tx.send(target_sec).is_ok() {
            self.requested += 1;
        }
    }

    /// Whether a requested seek has not settled yet.
    pub fn is_seeking(&self) -> bool {
        self.requested > self.settled
    }

    /// Last settled decode position in seconds, if any seek has completed.
    pub fn position(&self) -> Option<f64> {
        self.position
    }

    /// Frame pixels at the last settled position.
    pub fn current_frame(&self) -> Option<&PreparedImage> {
        self.frame.as_ref()
    }
}

fn probe_video(source_path: &Path) -> LunpoResult<VideoInfo> {
    #[derive(serde::Deserialize)]
    struct ProbeStream {
        codec_type: Option<String>,
        width: Option<u32>,
        height: Option<u32>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeFormat {
        duration: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeOut {
        streams: Vec<ProbeStream>,
        format: Option<ProbeFormat>,
    }

    let out = std::process::Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_streams",
            "-show_format",
        ])
        .arg(source_path)
        .output()
        .map_err(|e| LunpoError::asset_load(format!("failed to run ffprobe: {e}")))?;
    if !out.status.success() {
        return Err(LunpoError::asset_load(format!(
            "ffprobe failed for '{}': {}",
            source_path.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }

    let parsed: ProbeOut = serde_json::from_slice(&out.stdout)
        .map_err(|e| LunpoError::asset_load(format!("ffprobe json parse failed: {e}")))?;
    let video_stream = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| LunpoError::asset_load("no video stream found"))?;
    let width = video_stream
        .width
        .ok_or_else(|| LunpoError::asset_load("missing video width from ffprobe"))?;
    let height = video_stream
        .height
        .ok_or_else(|| LunpoError::asset_load("missing video height from ffprobe"))?;
    let duration_sec = parsed
        .format
        .as_ref()
        .and_then(|f| f.duration.as_ref())
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(0.0);

    Ok(VideoInfo {
        source_path: source_path.to_path_buf(),
        width,
        height,
        duration_sec,
    })
}

fn decode_frame_rgba8(source: &VideoInfo, source_time_sec: f64) -> LunpoResult<PreparedImage> {
    let out = std::process::Command::new("ffmpeg")
        .args(["-v", "error", "-ss", &format!("{source_time_sec:.9}")])
        .arg("-i")
        .arg(&source.source_path)
        .args(["-frames:v", "1", "-f", "rawvideo", "-pix_fmt", "rgba", "pipe:1"])
        .output()
        .map_err(|e| LunpoError::asset_load(format!("failed to run ffmpeg for video decode: {e}")))?;

    if !out.status.success() {
        return Err(LunpoError::asset_load(format!(
            "ffmpeg video decode failed for '{}': {}",
            source.source_path.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }

    let expected_len = source.width as usize * source.height as usize * 4;
    if expected_len == 0 || out.stdout.len() < expected_len {
        return Err(LunpoError::asset_load(format!(
            "decoded video frame has invalid size: got {} bytes, expected {expected_len}",
            out.stdout.len()
        )));
    }

    // ffmpeg rawvideo rgba is straight alpha; clips with transparency
    // (vp9 webm) must premultiply like the image path.
    let mut pixels = out.stdout[..expected_len].to_vec();
    premultiply_in_place(&mut pixels);

    Ok(PreparedImage {
        width: source.width,
        height: source.height,
        rgba8_premul: std::sync::Arc::new(pixels),
    })
}
