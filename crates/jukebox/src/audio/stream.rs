//! Named track streams
//!
//! A stream is an ordered queue of tracks for sequential long-form audio
//! (music, dialogue). Only the head track is ever active; everything behind
//! it stays dormant until it reaches the front.

use std::collections::VecDeque;

use crate::audio::backend::AudioGraph;
use crate::audio::track::{Track, TrackTick};

/// An ordered, named queue of tracks
pub struct Stream {
    volume: f32,
    is_playing: bool,
    queue: VecDeque<Track>,
}

impl Stream {
    pub(crate) fn new() -> Self {
        Self {
            volume: 1.0,
            is_playing: false,
            queue: VecDeque::new(),
        }
    }

    /// Stream volume multiplier (0.0 to 1.0)
    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub(crate) fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
    }

    /// Whether the head track is currently in its audible life
    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    /// Number of queued tracks, the head included
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Whether the queue is empty
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub(crate) fn push(&mut self, track: Track) {
        self.queue.push_back(track);
    }

    /// Advance the head track by one tick
    ///
    /// An empty queue is a no-op. When the head finishes it is dequeued and
    /// its nodes released; the next track becomes the head on the following
    /// tick, never within the same one.
    pub(crate) fn update(&mut self, graph: &mut dyn AudioGraph, master_volume: f32) {
        let Some(head) = self.queue.front_mut() else {
            self.is_playing = false;
            return;
        };

        if head.advance(graph, master_volume, self.volume) == TrackTick::Finished {
            if let Some(track) = self.queue.pop_front() {
                track.release(graph);
            }
        }

        self.is_playing = self.queue.front().is_some_and(Track::is_active);
    }

    /// Fade the head track out over `fade_out` seconds
    ///
    /// No-op on an empty queue.
    pub(crate) fn skip(&mut self, graph: &mut dyn AudioGraph, fade_out: f32) {
        if let Some(head) = self.queue.front_mut() {
            head.skip(graph, fade_out);
        }
    }

    /// Skip the head and drop every dormant track immediately
    ///
    /// Dormant tracks never started, so they are released without a fade.
    pub(crate) fn clear(&mut self, graph: &mut dyn AudioGraph, fade_out: f32) {
        self.skip(graph, fade_out);
        if self.queue.len() > 1 {
            for track in self.queue.drain(1..) {
                track.release(graph);
            }
        }
    }
}
