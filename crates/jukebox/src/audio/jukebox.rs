//! Jukebox orchestration
//!
//! The jukebox owns the sound cache and the named stream table, and drives
//! every stream's head track through its lifecycle once per frame. It holds
//! no clock of its own: fades are scheduled against the audio graph and only
//! ever sampled here, so the machine is frame-rate independent.

use std::collections::HashMap;
use std::path::Path;

use crate::audio::backend::AudioGraph;
use crate::audio::cache::SoundCache;
use crate::audio::stream::Stream;
use crate::audio::track::{SettingsHandle, Track, TrackParams};
use crate::audio::AudioError;
use crate::audio::buffer::SoundBuffer;
use crate::audio::spatial::SpatialConfig;
use crate::config::JukeboxConfig;
use crate::foundation::math::Vec2;

/// Multi-stream audio engine with per-frame advancement
pub struct Jukebox {
    volume: f32,
    base_path: String,
    spatial: SpatialConfig,
    cache: SoundCache,
    streams: HashMap<String, Stream>,
}

impl Default for Jukebox {
    fn default() -> Self {
        Self::new(JukeboxConfig::default())
    }
}

impl Jukebox {
    /// Create a jukebox from configuration
    pub fn new(config: JukeboxConfig) -> Self {
        Self {
            volume: config.volume.clamp(0.0, 1.0),
            base_path: config.base_path,
            spatial: config.spatial,
            cache: SoundCache::new(),
            streams: HashMap::new(),
        }
    }

    /// Advance the engine by one frame
    ///
    /// Drains finished sound loads, then advances every stream's head track.
    /// Never blocks; safe to call at any frame rate.
    pub fn update(&mut self, graph: &mut dyn AudioGraph) {
        self.cache.poll();
        for stream in self.streams.values_mut() {
            stream.update(graph, self.volume);
        }
    }

    /// Begin loading a sound so a later [`Jukebox::play_sound`] can hit
    pub fn load_sound(&mut self, url: &str) {
        let key = self.resolve(url);
        self.cache.request(&key);
    }

    /// Store an already-decoded buffer under `url`
    pub fn insert_sound(&mut self, url: &str, buffer: SoundBuffer) {
        let key = self.resolve(url);
        self.cache.insert(&key, buffer);
    }

    /// Fire-and-forget playback of a cached sound
    ///
    /// On a cache hit this starts a transient positioned source immediately;
    /// no handle is returned and the sound cannot be stopped. On a miss the
    /// call silently triggers a background load and plays nothing — callers
    /// wanting guaranteed audibility must pre-load.
    pub fn play_sound(
        &mut self,
        graph: &mut dyn AudioGraph,
        url: &str,
        volume: f32,
        position: Vec2,
    ) -> Result<(), AudioError> {
        let key = self.resolve(url);
        match self.cache.get(&key) {
            Some(buffer) => graph.play_oneshot(
                &buffer,
                volume.clamp(0.0, 1.0) * self.volume,
                position,
                &self.spatial.panner_params(),
            ),
            None => {
                log::debug!("one-shot dropped, {key} not cached yet");
                self.cache.request(&key);
                Ok(())
            }
        }
    }

    /// Register an empty stream under `name`
    ///
    /// Names are unique; re-registering is an error rather than a silent
    /// replacement that would orphan live node chains.
    pub fn create_stream(&mut self, name: &str) -> Result<(), AudioError> {
        if self.streams.contains_key(name) {
            return Err(AudioError::DuplicateStream(name.to_string()));
        }
        log::debug!("stream created: {name}");
        self.streams.insert(name.to_string(), Stream::new());
        Ok(())
    }

    /// Look up a registered stream
    pub fn stream(&self, name: &str) -> Result<&Stream, AudioError> {
        self.streams
            .get(name)
            .ok_or_else(|| AudioError::UnknownStream(name.to_string()))
    }

    /// Set a stream's volume multiplier
    ///
    /// Picked up at the next track start or loop restart, never mid-ramp.
    pub fn set_stream_volume(&mut self, name: &str, volume: f32) -> Result<(), AudioError> {
        self.streams
            .get_mut(name)
            .ok_or_else(|| AudioError::UnknownStream(name.to_string()))?
            .set_volume(volume);
        Ok(())
    }

    /// Append a track to a stream's queue
    ///
    /// Builds the track's exclusive node chain and returns the live settings
    /// handle for volume and position adjustment while it plays.
    pub fn queue_stream(
        &mut self,
        graph: &mut dyn AudioGraph,
        name: &str,
        url: &str,
        params: TrackParams,
    ) -> Result<SettingsHandle, AudioError> {
        let path = self.resolve(url);
        let stream = self
            .streams
            .get_mut(name)
            .ok_or_else(|| AudioError::UnknownStream(name.to_string()))?;

        let (track, settings) = Track::new(graph, Path::new(&path), params, &self.spatial)?;
        stream.push(track);
        log::debug!("queued {url} on stream {name}");
        Ok(settings)
    }

    /// Fade out and drop the head track of a stream
    ///
    /// No-op on an empty queue. Removal happens once the fade-out lands,
    /// observed by a later [`Jukebox::update`].
    pub fn skip_stream(
        &mut self,
        graph: &mut dyn AudioGraph,
        name: &str,
        fade_out: f32,
    ) -> Result<(), AudioError> {
        self.streams
            .get_mut(name)
            .ok_or_else(|| AudioError::UnknownStream(name.to_string()))?
            .skip(graph, fade_out);
        Ok(())
    }

    /// Skip the head track and drop the rest of a stream's queue immediately
    pub fn clear_stream(
        &mut self,
        graph: &mut dyn AudioGraph,
        name: &str,
        fade_out: f32,
    ) -> Result<(), AudioError> {
        self.streams
            .get_mut(name)
            .ok_or_else(|| AudioError::UnknownStream(name.to_string()))?
            .clear(graph, fade_out);
        Ok(())
    }

    /// Global volume multiplier (0.0 to 1.0)
    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// Set the global volume multiplier
    ///
    /// Applied at the next start or loop restart of each track; ramps
    /// already scheduled keep their targets.
    pub fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
    }

    /// Spatial falloff parameters shared by all positioned sounds
    pub fn spatial(&self) -> &SpatialConfig {
        &self.spatial
    }

    /// Set the maximum audible distance for newly created sounds
    pub fn set_max_distance(&mut self, max_distance: f32) {
        self.spatial.max_distance = max_distance.max(0.0);
    }

    /// Set the path prefix applied to every resolved URL
    pub fn set_base_path(&mut self, base_path: impl Into<String>) {
        self.base_path = base_path.into();
    }

    fn resolve(&self, url: &str) -> String {
        format!("{}{}", self.base_path, url)
    }
}
