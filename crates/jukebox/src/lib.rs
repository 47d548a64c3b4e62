//! # Jukebox
//!
//! A frame-driven streaming audio engine for games: named track streams
//! with fades, looping and queueing, fire-and-forget positional one-shots,
//! and an asynchronously populated sound cache, all advanced by a single
//! per-frame `update` over an abstract audio graph.
//!
//! ## Features
//!
//! - **Streams**: named FIFO queues of long-form tracks; only the head
//!   plays, followers start as it ends or is skipped
//! - **Frame-rate independent fades**: gain ramps run on the audio clock,
//!   the frame loop only samples and schedules
//! - **Spatial playback**: distance rolloff and stereo placement with live
//!   repositioning while a track plays
//! - **Pluggable graphs**: a real-time Rodio backend and a deterministic
//!   offline one for tests and headless hosts
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use jukebox::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut graph = jukebox::audio::create_graph()?;
//!     let mut jukebox = Jukebox::new(JukeboxConfig::default());
//!
//!     jukebox.create_stream("music")?;
//!     jukebox.queue_stream(
//!         graph.as_mut(),
//!         "music",
//!         "music/theme.ogg",
//!         TrackParams::default().with_fade_in(2.0).with_loops(-1),
//!     )?;
//!
//!     loop {
//!         jukebox.update(graph.as_mut());
//!         std::thread::sleep(std::time::Duration::from_millis(16));
//!     }
//! }
//! ```

pub mod audio;
pub mod config;
pub mod foundation;

pub use audio::{AudioError, Jukebox};
pub use config::{Config, ConfigError, JukeboxConfig};

/// Common imports for engine users
pub mod prelude {
    pub use crate::audio::{
        AudioError, AudioGraph, Jukebox, SettingsHandle, SoundBuffer, SpatialConfig, Stream,
        TrackParams,
    };
    pub use crate::config::{Config, JukeboxConfig};
    pub use crate::foundation::{math::Vec2, time::Timer};
}
