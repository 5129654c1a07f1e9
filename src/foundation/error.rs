/// Convenience result type used across the engine.
pub type LunpoResult<T> = Result<T, LunpoError>;

/// Top-level error taxonomy used by engine APIs.
///
/// Frame-level failures (a missing asset, an unready video frame) are never
/// surfaced through this type; they degrade to layer omission inside the
/// compositor. Everything here propagates to the caller.
#[derive(thiserror::Error, Debug)]
pub enum LunpoError {
    /// Fetch/parse error for the animation document.
    #[error("document load error: {0}")]
    DocumentLoad(String),

    /// Per-asset load or decode failure.
    #[error("asset load error: {0}")]
    AssetLoad(String),

    /// Export-time audio decode failure.
    #[error("audio decode error: {0}")]
    AudioDecode(String),

    /// No usable container/codec combination is available.
    #[error("encoder unsupported: {0}")]
    EncoderUnsupported(String),

    /// Recorder (ffmpeg child process) failure during export.
    #[error("recorder error: {0}")]
    Recorder(String),

    /// Invalid user-provided or document data.
    #[error("validation error: {0}")]
    Validation(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl LunpoError {
    /// Build a [`LunpoError::DocumentLoad`] value.
    pub fn document_load(msg: impl Into<String>) -> Self {
        Self::DocumentLoad(msg.into())
    }

    /// Build a [`LunpoError::AssetLoad`] value.
    pub fn asset_load(msg: impl Into<String>) -> Self {
        Self::AssetLoad(msg.into())
    }

    /// Build a [`LunpoError::AudioDecode`] value.
    pub fn audio_decode(msg: impl Into<String>) -> Self {
        Self::AudioDecode(msg.into())
    }

    /// Build a [`LunpoError::Recorder`] value.
    pub fn recorder(msg: impl Into<String>) -> Self {
        Self::Recorder(msg.into())
    }

    /// Build a [`LunpoError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}
