//! Offline audio graph
//!
//! A deterministic [`AudioGraph`] with a manually advanced clock and no
//! output device. Hosts without audio hardware (CI, dedicated servers) can
//! run the full engine against it, and tests drive the track state machine
//! through it tick by tick: `advance` moves the clock, ramps evaluate
//! analytically, and every mutation lands in an inspectable event log.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::audio::backend::automation::GainAutomation;
use crate::audio::backend::{AudioGraph, NodeId};
use crate::audio::buffer::SoundBuffer;
use crate::audio::spatial::PannerParams;
use crate::audio::AudioError;
use crate::foundation::math::Vec2;

/// A mutation recorded by the offline graph
#[derive(Debug, Clone, PartialEq)]
pub enum GraphEvent {
    /// Media source created
    CreatedMedia(NodeId),
    /// Gain node created
    CreatedGain(NodeId),
    /// Panner node created
    CreatedPanner(NodeId),
    /// Node wired into another
    Connected {
        /// Upstream node
        from: NodeId,
        /// Downstream node
        to: NodeId,
    },
    /// Node wired into the output mix
    ConnectedToOutput(NodeId),
    /// Gain pinned to a value
    SetGain {
        /// Gain node
        node: NodeId,
        /// Pinned value
        value: f32,
    },
    /// Linear ramp scheduled
    RampGain {
        /// Gain node
        node: NodeId,
        /// Ramp target
        target: f32,
        /// Clock time the ramp lands
        end: f64,
    },
    /// Scheduled ramps cancelled
    CancelledRamps(NodeId),
    /// Panner repositioned
    Position {
        /// Panner node
        node: NodeId,
        /// X coordinate
        x: f32,
        /// Z coordinate
        z: f32,
    },
    /// Media transport started or resumed
    Played(NodeId),
    /// Media transport paused
    Paused(NodeId),
    /// One-shot chain fired
    Oneshot {
        /// Gain fixed at start
        gain: f32,
        /// X coordinate at start
        x: f32,
        /// Z coordinate at start
        z: f32,
    },
    /// Node torn down
    Released(NodeId),
}

enum Node {
    Gain(GainAutomation),
    Panner {
        #[allow(dead_code)]
        params: PannerParams,
        x: f32,
        z: f32,
    },
    Media(MediaNode),
}

struct MediaNode {
    #[allow(dead_code)]
    path: PathBuf,
    playing: bool,
    ended: bool,
    play_count: u32,
}

/// Deterministic audio graph for tests and headless hosts
pub struct OfflineGraph {
    time: f64,
    next_id: u32,
    nodes: HashMap<NodeId, Node>,
    edges: HashMap<NodeId, NodeId>,
    oneshot_ends: Vec<f64>,
    events: Vec<GraphEvent>,
}

impl Default for OfflineGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl OfflineGraph {
    /// Create an offline graph with its clock at zero
    pub fn new() -> Self {
        Self {
            time: 0.0,
            next_id: 0,
            nodes: HashMap::new(),
            edges: HashMap::new(),
            oneshot_ends: Vec::new(),
            events: Vec::new(),
        }
    }

    fn next_node(&mut self) -> NodeId {
        let id = NodeId::new(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        id
    }

    fn record(&mut self, event: GraphEvent) {
        self.events.push(event);
    }

    fn gain(&self, node: NodeId) -> Result<&GainAutomation, AudioError> {
        match self.nodes.get(&node) {
            Some(Node::Gain(gain)) => Ok(gain),
            _ => Err(AudioError::InvalidHandle),
        }
    }

    fn gain_mut(&mut self, node: NodeId) -> Result<&mut GainAutomation, AudioError> {
        match self.nodes.get_mut(&node) {
            Some(Node::Gain(gain)) => Ok(gain),
            _ => Err(AudioError::InvalidHandle),
        }
    }

    fn media_mut(&mut self, node: NodeId) -> Result<&mut MediaNode, AudioError> {
        match self.nodes.get_mut(&node) {
            Some(Node::Media(media)) => Ok(media),
            _ => Err(AudioError::InvalidHandle),
        }
    }

    /// Advance the clock by `dt` seconds
    pub fn advance(&mut self, dt: f64) {
        self.time += dt;
        let now = self.time;
        self.oneshot_ends.retain(|end| *end > now);
    }

    /// Report "ended" on every currently playing media source
    ///
    /// Returns how many sources ended.
    pub fn finish_playing_media(&mut self) -> usize {
        let mut ended = 0;
        for node in self.nodes.values_mut() {
            if let Node::Media(media) = node {
                if media.playing && !media.ended {
                    media.playing = false;
                    media.ended = true;
                    ended += 1;
                }
            }
        }
        ended
    }

    /// Media sources currently playing
    pub fn playing_media(&self) -> usize {
        self.nodes
            .values()
            .filter(|node| matches!(node, Node::Media(media) if media.playing))
            .count()
    }

    /// How many times a media source has been started from the top
    pub fn media_play_count(&self, node: NodeId) -> Option<u32> {
        match self.nodes.get(&node) {
            Some(Node::Media(media)) => Some(media.play_count),
            _ => None,
        }
    }

    /// Current position of a panner node
    pub fn panner_position(&self, node: NodeId) -> Option<(f32, f32)> {
        match self.nodes.get(&node) {
            Some(Node::Panner { x, z, .. }) => Some((*x, *z)),
            _ => None,
        }
    }

    /// One-shot chains still sounding at the current clock time
    pub fn active_oneshots(&self) -> usize {
        self.oneshot_ends.len()
    }

    /// Nodes alive in the graph
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Recorded mutations, oldest first
    pub fn events(&self) -> &[GraphEvent] {
        &self.events
    }

    /// Drop the recorded event log
    pub fn clear_events(&mut self) {
        self.events.clear();
    }
}

impl AudioGraph for OfflineGraph {
    fn now(&self) -> f64 {
        self.time
    }

    fn create_media_source(&mut self, path: &Path) -> NodeId {
        let id = self.next_node();
        self.nodes.insert(
            id,
            Node::Media(MediaNode {
                path: path.to_path_buf(),
                playing: false,
                ended: false,
                play_count: 0,
            }),
        );
        self.record(GraphEvent::CreatedMedia(id));
        id
    }

    fn create_gain(&mut self) -> NodeId {
        let id = self.next_node();
        self.nodes.insert(id, Node::Gain(GainAutomation::new(1.0)));
        self.record(GraphEvent::CreatedGain(id));
        id
    }

    fn create_panner(&mut self, params: &PannerParams) -> NodeId {
        let id = self.next_node();
        self.nodes.insert(
            id,
            Node::Panner {
                params: *params,
                x: 0.0,
                z: 0.0,
            },
        );
        self.record(GraphEvent::CreatedPanner(id));
        id
    }

    fn connect(&mut self, from: NodeId, to: NodeId) -> Result<(), AudioError> {
        if !self.nodes.contains_key(&from) || !self.nodes.contains_key(&to) {
            return Err(AudioError::InvalidHandle);
        }
        self.edges.insert(from, to);
        self.record(GraphEvent::Connected { from, to });
        Ok(())
    }

    fn connect_to_output(&mut self, node: NodeId) -> Result<(), AudioError> {
        if !self.nodes.contains_key(&node) {
            return Err(AudioError::InvalidHandle);
        }
        self.record(GraphEvent::ConnectedToOutput(node));
        Ok(())
    }

    fn set_gain(&mut self, node: NodeId, value: f32) -> Result<(), AudioError> {
        self.gain_mut(node)?.set(value);
        self.record(GraphEvent::SetGain { node, value });
        Ok(())
    }

    fn gain_value(&self, node: NodeId) -> Result<f32, AudioError> {
        Ok(self.gain(node)?.value_at(self.time))
    }

    fn ramp_gain_to(
        &mut self,
        node: NodeId,
        target: f32,
        end_time: f64,
    ) -> Result<(), AudioError> {
        let now = self.time;
        self.gain_mut(node)?.ramp_to(target, now, end_time);
        self.record(GraphEvent::RampGain {
            node,
            target,
            end: end_time,
        });
        Ok(())
    }

    fn cancel_gain_ramps(&mut self, node: NodeId) -> Result<(), AudioError> {
        let now = self.time;
        self.gain_mut(node)?.cancel(now);
        self.record(GraphEvent::CancelledRamps(node));
        Ok(())
    }

    fn set_position(&mut self, node: NodeId, x: f32, z: f32, _at: f64) -> Result<(), AudioError> {
        match self.nodes.get_mut(&node) {
            Some(Node::Panner { x: px, z: pz, .. }) => {
                *px = x;
                *pz = z;
                self.record(GraphEvent::Position { node, x, z });
                Ok(())
            }
            _ => Err(AudioError::InvalidHandle),
        }
    }

    fn play(&mut self, node: NodeId) -> Result<(), AudioError> {
        let media = self.media_mut(node)?;
        if media.ended || !media.playing {
            // Restarts from zero after a natural end; resumes otherwise.
            if media.ended || media.play_count == 0 {
                media.play_count += 1;
            }
            media.ended = false;
            media.playing = true;
        }
        self.record(GraphEvent::Played(node));
        Ok(())
    }

    fn pause(&mut self, node: NodeId) -> Result<(), AudioError> {
        let media = self.media_mut(node)?;
        media.playing = false;
        self.record(GraphEvent::Paused(node));
        Ok(())
    }

    fn has_ended(&self, node: NodeId) -> bool {
        matches!(self.nodes.get(&node), Some(Node::Media(media)) if media.ended)
    }

    fn play_oneshot(
        &mut self,
        buffer: &Arc<SoundBuffer>,
        gain: f32,
        position: Vec2,
        _params: &PannerParams,
    ) -> Result<(), AudioError> {
        self.oneshot_ends
            .push(self.time + buffer.duration().as_secs_f64());
        self.record(GraphEvent::Oneshot {
            gain,
            x: position.x,
            z: position.y,
        });
        Ok(())
    }

    fn release(&mut self, node: NodeId) {
        if self.nodes.remove(&node).is_some() {
            self.edges.remove(&node);
            self.edges.retain(|_, to| *to != node);
            self.record(GraphEvent::Released(node));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_advances() {
        let mut graph = OfflineGraph::new();
        assert_eq!(graph.now(), 0.0);
        graph.advance(0.5);
        graph.advance(0.25);
        assert!((graph.now() - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_gain_ramp_follows_clock() {
        let mut graph = OfflineGraph::new();
        let gain = graph.create_gain();

        graph.set_gain(gain, 0.0).unwrap();
        graph.ramp_gain_to(gain, 1.0, 2.0).unwrap();

        graph.advance(1.0);
        assert!((graph.gain_value(gain).unwrap() - 0.5).abs() < 1e-6);

        graph.advance(5.0);
        assert_eq!(graph.gain_value(gain).unwrap(), 1.0);
    }

    #[test]
    fn test_media_transport_and_restart() {
        let mut graph = OfflineGraph::new();
        let media = graph.create_media_source(Path::new("music/theme.ogg"));

        assert!(!graph.has_ended(media));
        graph.play(media).unwrap();
        assert_eq!(graph.playing_media(), 1);
        assert_eq!(graph.media_play_count(media), Some(1));

        assert_eq!(graph.finish_playing_media(), 1);
        assert!(graph.has_ended(media));
        assert_eq!(graph.playing_media(), 0);

        // Play after an end restarts from the top.
        graph.play(media).unwrap();
        assert!(!graph.has_ended(media));
        assert_eq!(graph.media_play_count(media), Some(2));
    }

    #[test]
    fn test_panner_tracks_position() {
        let mut graph = OfflineGraph::new();
        let panner = graph.create_panner(&PannerParams {
            reference_distance: 1.0,
            max_distance: 100.0,
            rolloff: 1.0,
        });

        assert_eq!(graph.panner_position(panner), Some((0.0, 0.0)));
        graph.set_position(panner, 3.0, -7.0, 0.0).unwrap();
        assert_eq!(graph.panner_position(panner), Some((3.0, -7.0)));
    }

    #[test]
    fn test_invalid_handles_error() {
        let mut graph = OfflineGraph::new();
        let media = graph.create_media_source(Path::new("a.ogg"));
        graph.release(media);

        assert!(matches!(graph.play(media), Err(AudioError::InvalidHandle)));
        assert!(matches!(
            graph.gain_value(media),
            Err(AudioError::InvalidHandle)
        ));
    }

    #[test]
    fn test_oneshots_retire_with_the_clock() {
        let mut graph = OfflineGraph::new();
        let buffer = Arc::new(SoundBuffer::from_samples(1, 100, vec![0.0; 100]));
        let params = PannerParams {
            reference_distance: 1.0,
            max_distance: 100.0,
            rolloff: 1.0,
        };

        graph
            .play_oneshot(&buffer, 0.8, Vec2::new(0.0, 0.0), &params)
            .unwrap();
        assert_eq!(graph.active_oneshots(), 1);

        graph.advance(2.0);
        assert_eq!(graph.active_oneshots(), 0);
    }
}
