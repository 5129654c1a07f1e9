use std::{
    io::{Read, Write},
    path::{Path, PathBuf},
    process::{Child, ChildStdin, Command, Stdio},
};

use crate::{
    compose::compositor::Surface,
    foundation::error::{LunpoError, LunpoResult},
};

/// One container/codec combination the recorder can target.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EncoderChoice {
    /// Container file extension without the dot.
    pub container_ext: &'static str,
    /// ffmpeg video encoder name.
    pub video_codec: &'static str,
    /// ffmpeg audio encoder name.
    pub audio_codec: &'static str,
}

/// Preference order probed against the local ffmpeg build.
const ENCODER_PREFERENCES: &[EncoderChoice] = &[
    EncoderChoice {
        container_ext: "webm",
        video_codec: "libvpx-vp9",
        audio_codec: "libopus",
    },
    EncoderChoice {
        container_ext: "mp4",
        video_codec: "libx264",
        audio_codec: "aac",
    },
];

/// Pick the first preferred encoder pair the local ffmpeg build reports
/// supporting, falling back to the top preference when none probe as
/// available. Errors only when ffmpeg itself cannot be queried.
pub fn select_encoder() -> LunpoResult<EncoderChoice> {
    let out = Command::new("ffmpeg")
        .args(["-hide_banner", "-encoders"])
        .output()
        .map_err(|e| {
            LunpoError::EncoderUnsupported(format!("failed to query ffmpeg encoders: {e}"))
        })?;
    let listing = String::from_utf8_lossy(&out.stdout);

    let available = |codec: &str| {
        listing
            .lines()
            .any(|line| line.split_whitespace().nth(1) == Some(codec))
    };
    let choice = ENCODER_PREFERENCES
        .iter()
        .find(|c| available(c.video_codec) && available(c.audio_codec))
        .unwrap_or(&ENCODER_PREFERENCES[0]);
    tracing::debug!(
        container = choice.container_ext,
        video = choice.video_codec,
        audio = choice.audio_codec,
        "selected export encoder"
    );
    Ok(*choice)
}

/// Raw PCM audio file muxed as the recorder's second input.
#[derive(Clone, Debug)]
pub struct AudioInput {
    /// Path to headerless f32le interleaved samples.
    pub path: PathBuf,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Channel count.
    pub channels: u16,
}

/// Recorder configuration.
#[derive(Clone, Debug)]
pub struct RecorderConfig {
    /// Frame width; must be even for 4:2:0 output.
    pub width: u32,
    /// Frame height; must be even.
    pub height: u32,
    /// Output frame rate.
    pub fps: f64,
    /// Destination file.
    pub out_path: PathBuf,
    /// Container/codec selection.
    pub choice: EncoderChoice,
    /// Optional soundtrack.
    pub audio: Option<AudioInput>,
}

/// An ffmpeg child process consuming raw RGBA frames on stdin and writing
/// the finished artifact on exit.
#[derive(Debug)]
pub struct FfmpegRecorder {
    child: Child,
    stdin: Option<ChildStdin>,
    frame_len: usize,
    out_path: PathBuf,
}

impl FfmpegRecorder {
    /// Validate the configuration and spawn the encoder process.
    pub fn start(cfg: &RecorderConfig) -> LunpoResult<Self> {
        if cfg.width == 0 || cfg.height == 0 || cfg.width % 2 != 0 || cfg.height % 2 != 0 {
            return Err(LunpoError::validation(format!(
                "output dimensions must be even and nonzero, got {}x{}",
                cfg.width, cfg.height
            )));
        }
        if !(cfg.fps.is_finite() && cfg.fps > 0.0) {
            return Err(LunpoError::validation(format!(
                "output frame rate must be positive, got {}",
                cfg.fps
            )));
        }

        let mut cmd = Command::new("ffmpeg");
        // Keep stderr quiet so the piped handle cannot fill and stall the
        // encode loop; real failures still report through the exit status.
        cmd.args(["-v", "error", "-y", "-f", "rawvideo", "-pix_fmt", "rgba"])
            .args(["-s", &format!("{}x{}", cfg.width, cfg.height)])
            .args(["-r", &format!("{}", cfg.fps)])
            .args(["-i", "pipe:0"]);
        if let Some(audio) = &cfg.audio {
            cmd.args(["-f", "f32le"])
                .args(["-ar", &audio.sample_rate.to_string()])
                .args(["-ac", &audio.channels.to_string()])
                .arg("-i")
                .arg(&audio.path);
        }
        cmd.args(["-c:v", cfg.choice.video_codec, "-pix_fmt", "yuv420p"]);
        if cfg.audio.is_some() {
            cmd.args(["-c:a", cfg.choice.audio_codec, "-shortest"]);
        }
        cmd.arg(&cfg.out_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        let mut child = cmd
            .spawn()
            .map_err(|e| LunpoError::recorder(format!("failed to spawn ffmpeg: {e}")))?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| LunpoError::recorder("ffmpeg stdin unavailable"))?;

        Ok(Self {
            child,
            stdin: Some(stdin),
            frame_len: cfg.width as usize * cfg.height as usize * 4,
            out_path: cfg.out_path.clone(),
        })
    }

    /// Destination path of the artifact being written.
    pub fn out_path(&self) -> &Path {
        &self.out_path
    }

    /// Feed one rendered frame. The surface's premultiplied pixels flatten
    /// onto opaque black, which for premultiplied data is just forcing the
    /// alpha channel.
    pub fn write_frame(&mut self, surface: &Surface) -> LunpoResult<()> {
        let data = surface.data();
        if data.len() != self.frame_len {
            return Err(LunpoError::recorder(format!(
                "frame size mismatch: got {} bytes, expected {}",
                data.len(),
                self.frame_len
            )));
        }
        let mut opaque = data.to_vec();
        for px in opaque.chunks_exact_mut(4) {
            px[3] = 255;
        }
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| LunpoError::recorder("recorder already finished"))?;
        stdin
            .write_all(&opaque)
            .map_err(|e| LunpoError::recorder(format!("failed to write frame to ffmpeg: {e}")))
    }

    /// Close the video stream and wait for the encoder to finalize the file.
    pub fn finish(mut self) -> LunpoResult<PathBuf> {
        drop(self.stdin.take());
        let mut stderr = String::new();
        if let Some(mut pipe) = self.child.stderr.take() {
            let _ = pipe.read_to_string(&mut stderr);
        }
        let status = self
            .child
            .wait()
            .map_err(|e| LunpoError::recorder(format!("failed to wait for ffmpeg: {e}")))?;
        if !status.success() {
            return Err(LunpoError::recorder(format!(
                "ffmpeg exited with {status}: {}",
                stderr.trim()
            )));
        }
        Ok(self.out_path)
    }
}

/// Decode an audio file into interleaved f32le PCM at the requested layout.
pub fn decode_audio_f32le(path: &Path, sample_rate: u32, channels: u16) -> LunpoResult<Vec<u8>> {
    let out = Command::new("ffmpeg")
        .args(["-v", "error"])
        .arg("-i")
        .arg(path)
        .args(["-f", "f32le"])
        .args(["-ar", &sample_rate.to_string()])
        .args(["-ac", &channels.to_string()])
        .arg("pipe:1")
        .output()
        .map_err(|e| LunpoError::audio_decode(format!("failed to run ffmpeg: {e}")))?;
    if !out.status.success() {
        return Err(LunpoError::audio_decode(format!(
            "ffmpeg audio decode failed for '{}': {}",
            path.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }
    Ok(out.stdout)
}
