//! Error types for manifest loading and per-asset loads.
//!
//! Only [`ManifestError`] is ever returned to the bootstrap code. Everything
//! else is recovered inside the load pipeline and shows up later as an
//! unavailable asset.

use thiserror::Error;

/// Failure to read raw bytes from a URL.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("failed to read '{url}': {source}")]
    Io {
        url: String,
        #[source]
        source: std::io::Error,
    },

    #[error("GET '{url}' failed: {message}")]
    Http { url: String, message: String },

    #[error("no such resource: '{url}'")]
    NotFound { url: String },

    #[error("unsupported URL scheme: '{url}'")]
    UnsupportedScheme { url: String },
}

/// Fatal manifest failure. Must be handled before a pipeline is started.
#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("could not fetch manifest: {0}")]
    Fetch(#[from] FetchError),

    #[error("could not parse manifest '{url}': {source}")]
    Parse {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid manifest '{url}': {reason}")]
    Invalid { url: String, reason: String },
}

impl ManifestError {
    /// True for transport failures, false for malformed content.
    pub fn is_fetch(&self) -> bool {
        matches!(self, ManifestError::Fetch(_))
    }
}

/// A single image, sheet or sound that could not be loaded.
#[derive(Error, Debug)]
pub enum AssetError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("could not decode image '{url}': {message}")]
    Image { url: String, message: String },

    #[error("could not decode audio '{url}': {message}")]
    Audio { url: String, message: String },

    #[error("loader panicked while loading '{url}'")]
    Panicked { url: String },

    #[error("no loader thread available for '{url}'")]
    NoLoader { url: String },
}

/// Misuse of the pipeline lifecycle.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    #[error("load pipeline was already started")]
    AlreadyStarted,

    #[error("load pipeline was shut down")]
    ShutDown,

    #[error("all loader threads are gone before the pipeline became ready")]
    LoadersGone,
}

/// The host refused to start playback (e.g. an autoplay policy).
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("playback blocked by the host")]
pub struct PlaybackBlocked;
