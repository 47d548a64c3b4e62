//! Audio graph backends
//!
//! Platform-independent abstraction over the host audio subsystem. The
//! engine schedules against this boundary and never assumes a ramp has
//! completed by elapsed wall-clock time; it always re-samples.

pub mod offline;
pub mod rodio_graph;

pub(crate) mod automation;

use std::path::Path;
use std::sync::Arc;

use crate::audio::buffer::SoundBuffer;
use crate::audio::spatial::PannerParams;
use crate::audio::AudioError;
use crate::foundation::math::Vec2;

/// Handle to a node owned by an audio graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    pub(crate) fn new(raw: u32) -> Self {
        Self(raw)
    }
}

/// Abstract audio subsystem boundary
///
/// Node kinds: *media sources* (streamed long-form audio with play/pause
/// transport), *gains* (settable value plus linear ramps anchored to the
/// graph clock), and *panners* (falloff parameters fixed at creation, a
/// live x/z position). Transient one-shot chains never escape the backend.
///
/// Contract notes:
/// - [`AudioGraph::now`] is monotonic and shared by every scheduling call.
/// - [`AudioGraph::play`] on a media source that has ended restarts it from
///   the beginning.
/// - Ramps run on the graph's own clock; callers observe progress only
///   through [`AudioGraph::gain_value`].
pub trait AudioGraph {
    /// Current clock time in seconds
    fn now(&self) -> f64;

    /// Create a streamed media source for `path`; no I/O happens until play
    fn create_media_source(&mut self, path: &Path) -> NodeId;

    /// Create a gain node holding 1.0
    fn create_gain(&mut self) -> NodeId;

    /// Create a panner with the given falloff parameters
    fn create_panner(&mut self, params: &PannerParams) -> NodeId;

    /// Wire `from` into `to`
    fn connect(&mut self, from: NodeId, to: NodeId) -> Result<(), AudioError>;

    /// Wire `node` into the output mix
    fn connect_to_output(&mut self, node: NodeId) -> Result<(), AudioError>;

    /// Pin a gain to `value`, discarding scheduled ramps
    fn set_gain(&mut self, node: NodeId, value: f32) -> Result<(), AudioError>;

    /// Sample a gain's current value
    fn gain_value(&self, node: NodeId) -> Result<f32, AudioError>;

    /// Ramp a gain linearly from its current value to `target` at `end_time`
    fn ramp_gain_to(&mut self, node: NodeId, target: f32, end_time: f64)
        -> Result<(), AudioError>;

    /// Cancel scheduled ramps, freezing the gain at its current value
    fn cancel_gain_ramps(&mut self, node: NodeId) -> Result<(), AudioError>;

    /// Move a panner to (`x`, `z`) at clock time `at`
    fn set_position(&mut self, node: NodeId, x: f32, z: f32, at: f64) -> Result<(), AudioError>;

    /// Start or resume a media source (from zero if it had ended)
    fn play(&mut self, node: NodeId) -> Result<(), AudioError>;

    /// Pause a media source
    fn pause(&mut self, node: NodeId) -> Result<(), AudioError>;

    /// Whether a media source has played to its end
    fn has_ended(&self, node: NodeId) -> bool;

    /// Fire-and-forget playback of a decoded buffer
    ///
    /// The backend builds and owns the transient source → panner → gain
    /// chain; gain and position are fixed at start and the chain is
    /// reclaimed once the buffer finishes.
    fn play_oneshot(
        &mut self,
        buffer: &Arc<SoundBuffer>,
        gain: f32,
        position: Vec2,
        params: &PannerParams,
    ) -> Result<(), AudioError>;

    /// Tear down a node
    fn release(&mut self, node: NodeId);
}

/// Create the default real-time audio graph for the platform
pub fn create_graph() -> Result<Box<dyn AudioGraph>, AudioError> {
    Ok(Box::new(rodio_graph::RodioGraph::new()?))
}
