//! Rodio audio graph implementation
//!
//! Real-time [`AudioGraph`] over the Rodio library. Each media source owns a
//! `Sink`; one-shots go through `play_raw` and are reclaimed by the mixer
//! when they finish. Gain ramps and panner positions live in shared cells
//! read by a [`ShapedSource`] wrapper on the playback side, so fades and
//! movement progress in real audio time between engine ticks — the frame
//! loop only samples values and schedules new ramps.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};

use crate::audio::backend::automation::GainAutomation;
use crate::audio::backend::{AudioGraph, NodeId};
use crate::audio::buffer::SoundBuffer;
use crate::audio::spatial::PannerParams;
use crate::audio::AudioError;
use crate::foundation::math::Vec2;

/// How many frames pass between re-evaluations of the shared cells
///
/// Roughly 3 ms at 44.1 kHz; short enough that ramps sound continuous,
/// long enough to keep lock traffic off the per-sample path.
const REFRESH_FRAMES: u32 = 128;

/// Monotonic clock shared by the engine thread and the playback side
#[derive(Clone)]
struct GraphClock(Arc<Instant>);

impl GraphClock {
    fn start() -> Self {
        Self(Arc::new(Instant::now()))
    }

    fn now(&self) -> f64 {
        self.0.elapsed().as_secs_f64()
    }
}

type GainCell = Arc<Mutex<GainAutomation>>;
type PanCell = Arc<Mutex<(f32, f32)>>;

enum Node {
    Gain(GainCell),
    Panner { cell: PanCell, params: PannerParams },
    Media(MediaState),
}

struct MediaState {
    path: PathBuf,
    sink: Option<Sink>,
    started: bool,
}

/// Source wrapper applying shared gain and pan cells per channel
///
/// Sampling happens every [`REFRESH_FRAMES`] frames against the graph
/// clock, on whichever thread drives the mixer.
struct ShapedSource<S> {
    inner: S,
    clock: GraphClock,
    gain: GainCell,
    pan: Option<(PanCell, PannerParams)>,
    channels: u16,
    channel_cursor: u16,
    frames_until_refresh: u32,
    left: f32,
    right: f32,
    center: f32,
}

impl<S> ShapedSource<S>
where
    S: Source<Item = f32>,
{
    fn new(inner: S, clock: GraphClock, gain: GainCell, pan: Option<(PanCell, PannerParams)>) -> Self {
        let channels = inner.channels();
        Self {
            inner,
            clock,
            gain,
            pan,
            channels,
            channel_cursor: 0,
            frames_until_refresh: 0,
            left: 0.0,
            right: 0.0,
            center: 0.0,
        }
    }

    fn refresh(&mut self) {
        let now = self.clock.now();
        let gain = self.gain.lock().map(|g| g.value_at(now)).unwrap_or(0.0);

        match &self.pan {
            Some((cell, params)) => {
                let (x, z) = cell.lock().map(|p| *p).unwrap_or((0.0, 0.0));
                let (l, r) = params.stereo_gains(Vec2::new(x, z));
                self.left = gain * l;
                self.right = gain * r;
                self.center = gain * params.attenuation(Vec2::new(x, z).norm());
            }
            None => {
                self.left = gain;
                self.right = gain;
                self.center = gain;
            }
        }
    }
}

impl<S> Iterator for ShapedSource<S>
where
    S: Source<Item = f32>,
{
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        let sample = self.inner.next()?;

        if self.channel_cursor == 0 {
            if self.frames_until_refresh == 0 {
                self.refresh();
                self.frames_until_refresh = REFRESH_FRAMES;
            }
            self.frames_until_refresh -= 1;
        }

        let amplitude = if self.channels >= 2 {
            match self.channel_cursor {
                0 => self.left,
                1 => self.right,
                _ => self.center,
            }
        } else {
            self.center
        };

        self.channel_cursor = (self.channel_cursor + 1) % self.channels.max(1);
        Some(sample * amplitude)
    }
}

impl<S> Source for ShapedSource<S>
where
    S: Source<Item = f32>,
{
    fn current_frame_len(&self) -> Option<usize> {
        self.inner.current_frame_len()
    }

    fn channels(&self) -> u16 {
        self.inner.channels()
    }

    fn sample_rate(&self) -> u32 {
        self.inner.sample_rate()
    }

    fn total_duration(&self) -> Option<Duration> {
        self.inner.total_duration()
    }
}

/// One-shot source reading straight out of a shared decoded buffer
struct BufferSource {
    buffer: Arc<SoundBuffer>,
    cursor: usize,
}

impl BufferSource {
    fn new(buffer: Arc<SoundBuffer>) -> Self {
        Self { buffer, cursor: 0 }
    }
}

impl Iterator for BufferSource {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        let sample = self.buffer.samples().get(self.cursor).copied()?;
        self.cursor += 1;
        Some(sample)
    }
}

impl Source for BufferSource {
    fn current_frame_len(&self) -> Option<usize> {
        None
    }

    fn channels(&self) -> u16 {
        self.buffer.channels()
    }

    fn sample_rate(&self) -> u32 {
        self.buffer.sample_rate()
    }

    fn total_duration(&self) -> Option<Duration> {
        Some(self.buffer.duration())
    }
}

/// Rodio-based audio graph
pub struct RodioGraph {
    /// Audio output stream (must be kept alive)
    _output_stream: OutputStream,
    stream_handle: OutputStreamHandle,
    clock: GraphClock,
    nodes: std::collections::HashMap<NodeId, Node>,
    edges: std::collections::HashMap<NodeId, NodeId>,
    next_id: u32,
}

impl RodioGraph {
    /// Create a graph on the default output device
    pub fn new() -> Result<Self, AudioError> {
        let (stream, stream_handle) = OutputStream::try_default()
            .map_err(|e| AudioError::BackendInitFailed(format!("audio output: {e}")))?;

        log::info!("Rodio audio graph initialized");

        Ok(Self {
            _output_stream: stream,
            stream_handle,
            clock: GraphClock::start(),
            nodes: std::collections::HashMap::new(),
            edges: std::collections::HashMap::new(),
            next_id: 0,
        })
    }

    fn next_node(&mut self) -> NodeId {
        let id = NodeId::new(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        id
    }

    fn gain_cell(&self, node: NodeId) -> Result<&GainCell, AudioError> {
        match self.nodes.get(&node) {
            Some(Node::Gain(cell)) => Ok(cell),
            _ => Err(AudioError::InvalidHandle),
        }
    }

    /// Walk downstream from `node` collecting the cells the source must read
    fn downstream_cells(&self, node: NodeId) -> (GainCell, Option<(PanCell, PannerParams)>) {
        let mut gain = None;
        let mut pan = None;
        let mut cursor = node;

        for _ in 0..8 {
            let Some(&next) = self.edges.get(&cursor) else {
                break;
            };
            match self.nodes.get(&next) {
                Some(Node::Gain(cell)) => gain = Some(cell.clone()),
                Some(Node::Panner { cell, params }) => pan = Some((cell.clone(), *params)),
                _ => {}
            }
            cursor = next;
        }

        let gain = gain.unwrap_or_else(|| Arc::new(Mutex::new(GainAutomation::new(1.0))));
        (gain, pan)
    }
}

impl AudioGraph for RodioGraph {
    fn now(&self) -> f64 {
        self.clock.now()
    }

    fn create_media_source(&mut self, path: &Path) -> NodeId {
        let id = self.next_node();
        self.nodes.insert(
            id,
            Node::Media(MediaState {
                path: path.to_path_buf(),
                sink: None,
                started: false,
            }),
        );
        id
    }

    fn create_gain(&mut self) -> NodeId {
        let id = self.next_node();
        self.nodes
            .insert(id, Node::Gain(Arc::new(Mutex::new(GainAutomation::new(1.0)))));
        id
    }

    fn create_panner(&mut self, params: &PannerParams) -> NodeId {
        let id = self.next_node();
        self.nodes.insert(
            id,
            Node::Panner {
                cell: Arc::new(Mutex::new((0.0, 0.0))),
                params: *params,
            },
        );
        id
    }

    fn connect(&mut self, from: NodeId, to: NodeId) -> Result<(), AudioError> {
        if !self.nodes.contains_key(&from) || !self.nodes.contains_key(&to) {
            return Err(AudioError::InvalidHandle);
        }
        self.edges.insert(from, to);
        Ok(())
    }

    fn connect_to_output(&mut self, node: NodeId) -> Result<(), AudioError> {
        // Sinks mix into the output implicitly; the edge only has to exist.
        if self.nodes.contains_key(&node) {
            Ok(())
        } else {
            Err(AudioError::InvalidHandle)
        }
    }

    fn set_gain(&mut self, node: NodeId, value: f32) -> Result<(), AudioError> {
        let cell = self.gain_cell(node)?;
        if let Ok(mut gain) = cell.lock() {
            gain.set(value);
        }
        Ok(())
    }

    fn gain_value(&self, node: NodeId) -> Result<f32, AudioError> {
        let cell = self.gain_cell(node)?;
        let now = self.clock.now();
        Ok(cell.lock().map(|g| g.value_at(now)).unwrap_or(0.0))
    }

    fn ramp_gain_to(
        &mut self,
        node: NodeId,
        target: f32,
        end_time: f64,
    ) -> Result<(), AudioError> {
        let now = self.clock.now();
        let cell = self.gain_cell(node)?;
        if let Ok(mut gain) = cell.lock() {
            gain.ramp_to(target, now, end_time);
        }
        Ok(())
    }

    fn cancel_gain_ramps(&mut self, node: NodeId) -> Result<(), AudioError> {
        let now = self.clock.now();
        let cell = self.gain_cell(node)?;
        if let Ok(mut gain) = cell.lock() {
            gain.cancel(now);
        }
        Ok(())
    }

    fn set_position(&mut self, node: NodeId, x: f32, z: f32, _at: f64) -> Result<(), AudioError> {
        // Applied immediately; the playback side picks it up within one
        // refresh window, well inside a frame.
        match self.nodes.get(&node) {
            Some(Node::Panner { cell, .. }) => {
                if let Ok(mut pos) = cell.lock() {
                    *pos = (x, z);
                }
                Ok(())
            }
            _ => Err(AudioError::InvalidHandle),
        }
    }

    fn play(&mut self, node: NodeId) -> Result<(), AudioError> {
        let (gain, pan) = self.downstream_cells(node);
        let clock = self.clock.clone();
        let stream_handle = self.stream_handle.clone();

        let media = match self.nodes.get_mut(&node) {
            Some(Node::Media(media)) => media,
            _ => return Err(AudioError::InvalidHandle),
        };

        let needs_fresh_source = media.sink.as_ref().map_or(true, Sink::empty);
        if needs_fresh_source {
            // A fresh decoder restarts the file from the top, which is also
            // how an ended source loops back around.
            let sink = Sink::try_new(&stream_handle)
                .map_err(|e| AudioError::PlaybackFailed(format!("sink: {e}")))?;
            let file = File::open(&media.path)?;
            let decoder = Decoder::new(BufReader::new(file))
                .map_err(|e| AudioError::DecodeFailed(e.to_string()))?;
            let shaped = ShapedSource::new(decoder.convert_samples::<f32>(), clock, gain, pan);

            sink.append(shaped);
            sink.play();
            media.sink = Some(sink);
            media.started = true;
        } else if let Some(sink) = &media.sink {
            sink.play();
        }

        Ok(())
    }

    fn pause(&mut self, node: NodeId) -> Result<(), AudioError> {
        match self.nodes.get(&node) {
            Some(Node::Media(media)) => {
                if let Some(sink) = &media.sink {
                    sink.pause();
                }
                Ok(())
            }
            _ => Err(AudioError::InvalidHandle),
        }
    }

    fn has_ended(&self, node: NodeId) -> bool {
        match self.nodes.get(&node) {
            Some(Node::Media(media)) => {
                media.started && media.sink.as_ref().map_or(true, Sink::empty)
            }
            _ => false,
        }
    }

    fn play_oneshot(
        &mut self,
        buffer: &Arc<SoundBuffer>,
        gain: f32,
        position: Vec2,
        params: &PannerParams,
    ) -> Result<(), AudioError> {
        let gain_cell = Arc::new(Mutex::new(GainAutomation::new(gain)));
        let pan_cell = Arc::new(Mutex::new((position.x, position.y)));
        let shaped = ShapedSource::new(
            BufferSource::new(buffer.clone()),
            self.clock.clone(),
            gain_cell,
            Some((pan_cell, *params)),
        );

        self.stream_handle
            .play_raw(shaped)
            .map_err(|e| AudioError::PlaybackFailed(format!("one-shot: {e}")))
    }

    fn release(&mut self, node: NodeId) {
        // Dropping a media node's sink stops its playback.
        self.nodes.remove(&node);
        self.edges.remove(&node);
        self.edges.retain(|_, to| *to != node);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rodio::buffer::SamplesBuffer;

    fn unity_clock() -> GraphClock {
        GraphClock::start()
    }

    #[test]
    fn test_shaped_source_applies_gain() {
        let inner = SamplesBuffer::new(2, 44100, vec![1.0f32; 8]);
        let gain = Arc::new(Mutex::new(GainAutomation::new(0.5)));
        let shaped = ShapedSource::new(inner, unity_clock(), gain, None);

        let samples: Vec<f32> = shaped.collect();
        assert_eq!(samples.len(), 8);
        for sample in samples {
            assert!((sample - 0.5).abs() < 1e-6);
        }
    }

    #[test]
    fn test_shaped_source_pans_hard_left() {
        let inner = SamplesBuffer::new(2, 44100, vec![1.0f32; 8]);
        let gain = Arc::new(Mutex::new(GainAutomation::new(1.0)));
        let pan = Arc::new(Mutex::new((-10.0, 0.0)));
        let params = PannerParams {
            reference_distance: 100.0,
            max_distance: 1000.0,
            rolloff: 1.0,
        };
        let shaped = ShapedSource::new(inner, unity_clock(), gain, Some((pan, params)));

        let samples: Vec<f32> = shaped.collect();
        // Left channel carries the signal, right is silent.
        assert!(samples[0] > 0.99);
        assert!(samples[1].abs() < 1e-6);
    }

    #[test]
    fn test_buffer_source_reports_format() {
        let buffer = Arc::new(SoundBuffer::from_samples(2, 22050, vec![0.25; 12]));
        let source = BufferSource::new(buffer);

        assert_eq!(source.channels(), 2);
        assert_eq!(source.sample_rate(), 22050);
        assert_eq!(source.count(), 12);
    }

    #[test]
    fn test_graph_operations_when_device_present() {
        // May fail in CI/test environments without an audio device.
        let Ok(mut graph) = RodioGraph::new() else {
            return;
        };

        let media = graph.create_media_source(Path::new("does-not-exist.ogg"));
        let panner = graph.create_panner(&PannerParams {
            reference_distance: 1.0,
            max_distance: 100.0,
            rolloff: 1.0,
        });
        let gain = graph.create_gain();

        graph.connect(media, panner).unwrap();
        graph.connect(panner, gain).unwrap();
        graph.connect_to_output(gain).unwrap();

        graph.set_gain(gain, 0.0).unwrap();
        let end = graph.now() + 10.0;
        graph.ramp_gain_to(gain, 1.0, end).unwrap();
        let early = graph.gain_value(gain).unwrap();
        assert!(early < 0.5);

        // Missing file surfaces as an error, not a panic.
        assert!(graph.play(media).is_err());

        graph.release(gain);
        assert!(matches!(
            graph.set_gain(gain, 1.0),
            Err(AudioError::InvalidHandle)
        ));
    }
}
