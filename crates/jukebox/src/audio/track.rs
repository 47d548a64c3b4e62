//! Queued audio tracks
//!
//! A [`Track`] is one item in a stream's queue: an exclusively owned media →
//! panner → gain chain plus the fade/loop state the per-tick update advances.
//! Callers keep a [`SettingsHandle`] for live volume and position changes;
//! everything else is frozen at queue time.

use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::audio::backend::{AudioGraph, NodeId};
use crate::audio::spatial::SpatialConfig;
use crate::audio::AudioError;
use crate::foundation::math::Vec2;

/// Gain values at or below this count as "faded out"
const SILENCE: f32 = 1e-4;

/// Live-adjustable playback settings
///
/// The only part of a queued track a caller may touch after queueing.
#[derive(Debug, Clone, Copy)]
pub struct TrackSettings {
    /// Track volume (0.0 to 1.0), sampled at each (re)start
    pub volume: f32,
    /// Source position, pushed into the panner every tick
    pub position: Vec2,
}

/// Shared handle to a queued track's [`TrackSettings`]
///
/// Stays valid for the caller after the track is dequeued; writes then land
/// in an orphaned cell and are simply never read again.
#[derive(Debug, Clone)]
pub struct SettingsHandle(Arc<Mutex<TrackSettings>>);

impl SettingsHandle {
    fn new(settings: TrackSettings) -> Self {
        Self(Arc::new(Mutex::new(settings)))
    }

    /// Set the track volume (picked up at the next start or loop restart)
    pub fn set_volume(&self, volume: f32) {
        if let Ok(mut settings) = self.0.lock() {
            settings.volume = volume.clamp(0.0, 1.0);
        }
    }

    /// Current track volume
    pub fn volume(&self) -> f32 {
        self.0.lock().map(|s| s.volume).unwrap_or(0.0)
    }

    /// Move the sound source (picked up within one tick)
    pub fn set_position(&self, position: Vec2) {
        if let Ok(mut settings) = self.0.lock() {
            settings.position = position;
        }
    }

    /// Current source position
    pub fn position(&self) -> Vec2 {
        self.0
            .lock()
            .map(|s| s.position)
            .unwrap_or_else(|_| Vec2::new(0.0, 0.0))
    }

    fn snapshot(&self) -> TrackSettings {
        self.0.lock().map(|s| *s).unwrap_or(TrackSettings {
            volume: 0.0,
            position: Vec2::new(0.0, 0.0),
        })
    }
}

/// Queue-time parameters for a track
#[derive(Debug, Clone, Copy)]
pub struct TrackParams {
    /// Initial track volume (0.0 to 1.0)
    pub volume: f32,
    /// Fade-in duration in seconds on each (re)start
    pub fade_in: f32,
    /// Repeat count: -1 loops forever, 0 plays once, n repeats n more times
    pub loops: i32,
    /// Initial source position
    pub position: Vec2,
}

impl Default for TrackParams {
    fn default() -> Self {
        Self {
            volume: 1.0,
            fade_in: 0.0,
            loops: 0,
            position: Vec2::new(0.0, 0.0),
        }
    }
}

impl TrackParams {
    /// Set the initial volume
    pub fn with_volume(mut self, volume: f32) -> Self {
        self.volume = volume.clamp(0.0, 1.0);
        self
    }

    /// Set the fade-in duration
    pub fn with_fade_in(mut self, seconds: f32) -> Self {
        self.fade_in = seconds.max(0.0);
        self
    }

    /// Set the repeat count (-1 for infinite)
    pub fn with_loops(mut self, loops: i32) -> Self {
        self.loops = loops;
        self
    }

    /// Set the initial position
    pub fn with_position(mut self, position: Vec2) -> Self {
        self.position = position;
        self
    }
}

/// Lifecycle of a queued track
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TrackState {
    /// Waiting at or below the head; not yet audible this pass
    Queued,
    /// Media running (or between loop passes)
    Playing,
    /// Fade-out scheduled; leaves the queue once the gain reaches zero
    Skipping,
}

/// What a tick did to the head track
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TrackTick {
    /// Still occupying the head
    Continue,
    /// Done; dequeue and release
    Finished,
}

/// One queued or playing audio item
pub(crate) struct Track {
    media: NodeId,
    panner: NodeId,
    gain: NodeId,
    fade_in: f32,
    loops: i32,
    state: TrackState,
    settings: SettingsHandle,
}

impl Track {
    /// Build a track and its exclusive node chain
    ///
    /// The chain is wired media → panner → gain → output with the gain
    /// pinned to zero; nothing is audible until the first start transition.
    pub(crate) fn new(
        graph: &mut dyn AudioGraph,
        path: &Path,
        params: TrackParams,
        spatial: &SpatialConfig,
    ) -> Result<(Self, SettingsHandle), AudioError> {
        let media = graph.create_media_source(path);
        let panner = graph.create_panner(&spatial.panner_params());
        let gain = graph.create_gain();

        graph.connect(media, panner)?;
        graph.connect(panner, gain)?;
        graph.connect_to_output(gain)?;
        graph.set_gain(gain, 0.0)?;

        let settings = SettingsHandle::new(TrackSettings {
            volume: params.volume.clamp(0.0, 1.0),
            position: params.position,
        });

        let track = Self {
            media,
            panner,
            gain,
            fade_in: params.fade_in.max(0.0),
            loops: params.loops,
            state: TrackState::Queued,
            settings: settings.clone(),
        };

        Ok((track, settings))
    }

    /// Whether the track has entered its audible life
    pub(crate) fn is_active(&self) -> bool {
        self.state != TrackState::Queued
    }

    /// Advance the head track by one tick
    ///
    /// Transition order per tick: position refresh (always), then exactly
    /// one lifecycle step. Graph hiccups on nodes we own are tolerated the
    /// same way a missing value is: the track reads as silent or un-ended
    /// and the machine converges on removal.
    pub(crate) fn advance(
        &mut self,
        graph: &mut dyn AudioGraph,
        master_volume: f32,
        stream_volume: f32,
    ) -> TrackTick {
        let settings = self.settings.snapshot();
        let now = graph.now();
        let _ = graph.set_position(self.panner, settings.position.x, settings.position.y, now);

        match self.state {
            TrackState::Skipping => {
                // The fade-out runs on the graph clock; poll, never assume.
                if graph.gain_value(self.gain).unwrap_or(0.0) <= SILENCE {
                    let _ = graph.pause(self.media);
                    return TrackTick::Finished;
                }
                TrackTick::Continue
            }
            TrackState::Queued => {
                let target = settings.volume * master_volume * stream_volume;
                let _ = graph.set_gain(self.gain, 0.0);
                let _ = graph.ramp_gain_to(self.gain, target, now + f64::from(self.fade_in));
                if let Err(err) = graph.play(self.media) {
                    log::error!("track failed to start: {err}");
                    return TrackTick::Finished;
                }
                self.state = TrackState::Playing;
                TrackTick::Continue
            }
            TrackState::Playing => {
                if !graph.has_ended(self.media) {
                    return TrackTick::Continue;
                }
                if self.loops == 0 {
                    return TrackTick::Finished;
                }
                if self.loops > 0 {
                    self.loops -= 1;
                }
                // Re-arm the start transition; the next tick restarts the
                // media with a fresh fade-in at current volume settings.
                self.state = TrackState::Queued;
                TrackTick::Continue
            }
        }
    }

    /// Begin a fade-out of `fade_out` seconds and mark the track skipped
    ///
    /// Reads the gain's current sampled value and pins it before scheduling
    /// the ramp, so skipping an already-fading track never jumps.
    pub(crate) fn skip(&mut self, graph: &mut dyn AudioGraph, fade_out: f32) {
        let now = graph.now();
        let current = graph.gain_value(self.gain).unwrap_or(0.0);
        let _ = graph.cancel_gain_ramps(self.gain);
        let _ = graph.set_gain(self.gain, current);
        let _ = graph.ramp_gain_to(self.gain, 0.0, now + f64::from(fade_out.max(0.0)));
        self.state = TrackState::Skipping;
    }

    /// Tear down the track's node chain
    pub(crate) fn release(&self, graph: &mut dyn AudioGraph) {
        graph.release(self.media);
        graph.release(self.panner);
        graph.release(self.gain);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::backend::offline::{GraphEvent, OfflineGraph};
    use approx::assert_relative_eq;

    fn make_track(graph: &mut OfflineGraph, params: TrackParams) -> (Track, SettingsHandle) {
        Track::new(
            graph,
            Path::new("music/theme.ogg"),
            params,
            &SpatialConfig::default(),
        )
        .unwrap()
    }

    fn last_ramp_target(graph: &OfflineGraph) -> f32 {
        graph
            .events()
            .iter()
            .rev()
            .find_map(|event| match event {
                GraphEvent::RampGain { target, .. } => Some(*target),
                _ => None,
            })
            .expect("a ramp was scheduled")
    }

    #[test]
    fn test_track_is_born_silent() {
        let mut graph = OfflineGraph::new();
        let (track, _settings) = make_track(&mut graph, TrackParams::default());

        assert!(!track.is_active());
        assert!(graph
            .events()
            .iter()
            .any(|e| matches!(e, GraphEvent::SetGain { value, .. } if *value == 0.0)));
        assert_eq!(graph.playing_media(), 0);
    }

    #[test]
    fn test_start_ramps_to_composed_volume() {
        let mut graph = OfflineGraph::new();
        let (mut track, _settings) =
            make_track(&mut graph, TrackParams::default().with_volume(0.5).with_fade_in(2.0));

        let tick = track.advance(&mut graph, 0.8, 0.5);
        assert_eq!(tick, TrackTick::Continue);
        assert!(track.is_active());
        assert_eq!(graph.playing_media(), 1);
        assert_relative_eq!(last_ramp_target(&graph), 0.5 * 0.8 * 0.5);
    }

    #[test]
    fn test_position_pushed_every_tick() {
        let mut graph = OfflineGraph::new();
        let (mut track, settings) = make_track(&mut graph, TrackParams::default());
        track.advance(&mut graph, 1.0, 1.0);
        graph.clear_events();

        settings.set_position(Vec2::new(3.0, -4.0));
        track.advance(&mut graph, 1.0, 1.0);

        assert!(graph
            .events()
            .iter()
            .any(|e| matches!(e, GraphEvent::Position { x, z, .. } if *x == 3.0 && *z == -4.0)));
    }

    #[test]
    fn test_skip_pins_then_fades() {
        let mut graph = OfflineGraph::new();
        let (mut track, _settings) =
            make_track(&mut graph, TrackParams::default().with_fade_in(1.0));

        track.advance(&mut graph, 1.0, 1.0);
        graph.advance(0.5); // halfway up the fade-in

        track.skip(&mut graph, 1.0);

        // Still audible right after the skip; removal only once faded out.
        assert_eq!(track.advance(&mut graph, 1.0, 1.0), TrackTick::Continue);
        graph.advance(1.1);
        assert_eq!(track.advance(&mut graph, 1.0, 1.0), TrackTick::Finished);
        assert_eq!(graph.playing_media(), 0);
    }

    #[test]
    fn test_skip_before_start_never_plays() {
        let mut graph = OfflineGraph::new();
        let (mut track, _settings) = make_track(&mut graph, TrackParams::default());

        let media = graph
            .events()
            .iter()
            .find_map(|e| match e {
                GraphEvent::CreatedMedia(id) => Some(*id),
                _ => None,
            })
            .unwrap();

        track.skip(&mut graph, 0.0);
        assert_eq!(track.advance(&mut graph, 1.0, 1.0), TrackTick::Finished);
        assert_eq!(graph.playing_media(), 0);
        assert_eq!(graph.media_play_count(media), Some(0));
    }

    #[test]
    fn test_natural_end_decrements_loops() {
        let mut graph = OfflineGraph::new();
        let (mut track, _settings) = make_track(&mut graph, TrackParams::default().with_loops(2));

        // First pass.
        track.advance(&mut graph, 1.0, 1.0);
        graph.finish_playing_media();
        assert_eq!(track.advance(&mut graph, 1.0, 1.0), TrackTick::Continue);
        // Restart, second pass.
        assert_eq!(track.advance(&mut graph, 1.0, 1.0), TrackTick::Continue);
        graph.finish_playing_media();
        assert_eq!(track.advance(&mut graph, 1.0, 1.0), TrackTick::Continue);
        // Restart, third and final pass.
        assert_eq!(track.advance(&mut graph, 1.0, 1.0), TrackTick::Continue);
        graph.finish_playing_media();
        assert_eq!(track.advance(&mut graph, 1.0, 1.0), TrackTick::Finished);
    }

    #[test]
    fn test_infinite_loops_stay_infinite() {
        let mut graph = OfflineGraph::new();
        let (mut track, _settings) = make_track(&mut graph, TrackParams::default().with_loops(-1));

        for _ in 0..5 {
            track.advance(&mut graph, 1.0, 1.0); // start
            graph.finish_playing_media();
            assert_eq!(track.advance(&mut graph, 1.0, 1.0), TrackTick::Continue);
        }
        assert_eq!(track.loops, -1);
    }

    #[test]
    fn test_ended_while_skipping_is_ignored() {
        let mut graph = OfflineGraph::new();
        let (mut track, _settings) = make_track(&mut graph, TrackParams::default().with_loops(-1));

        track.advance(&mut graph, 1.0, 1.0);
        track.skip(&mut graph, 2.0);
        graph.finish_playing_media();

        // An infinite looper would restart here if "ended" were honored.
        assert_eq!(track.advance(&mut graph, 1.0, 1.0), TrackTick::Continue);
        graph.advance(2.5);
        assert_eq!(track.advance(&mut graph, 1.0, 1.0), TrackTick::Finished);
    }
}
