//! Streaming audio engine
//!
//! A multi-stream, per-track temporal state machine layering fades, looping,
//! queueing, and live spatial repositioning on top of an abstract audio
//! graph. The host frame loop calls [`Jukebox::update`] once per tick; all
//! fades run on the graph's own clock and are only ever sampled here, so the
//! engine stays frame-rate independent.

pub mod backend;
pub mod buffer;
pub mod cache;
pub mod jukebox;
pub mod spatial;
pub mod stream;
pub mod track;

pub use backend::{create_graph, AudioGraph, NodeId};
pub use buffer::SoundBuffer;
pub use cache::SoundCache;
pub use jukebox::Jukebox;
pub use spatial::{PannerParams, SpatialConfig};
pub use stream::Stream;
pub use track::{SettingsHandle, TrackParams, TrackSettings};

use thiserror::Error;

/// Audio engine errors
#[derive(Error, Debug)]
pub enum AudioError {
    /// Operation on a stream name that was never registered
    #[error("unknown stream: {0}")]
    UnknownStream(String),

    /// A stream with this name already exists
    #[error("stream already exists: {0}")]
    DuplicateStream(String),

    /// Audio data could not be decoded
    #[error("failed to decode audio: {0}")]
    DecodeFailed(String),

    /// Node handle does not belong to a live node
    #[error("invalid node handle")]
    InvalidHandle,

    /// The graph could not start playback
    #[error("playback failed: {0}")]
    PlaybackFailed(String),

    /// The platform audio backend could not be brought up
    #[error("audio backend initialization failed: {0}")]
    BackendInitFailed(String),

    /// IO error while fetching audio data
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
