//! Decoded audio buffers
//!
//! A [`SoundBuffer`] holds interleaved f32 PCM ready for one-shot playback.
//! Decoding goes through `rodio`'s format probing and needs no output
//! device, so loader threads can decode without touching the audio graph.

use std::io::Cursor;
use std::time::Duration;

use rodio::Source;

use super::AudioError;

/// Decoded, ready-to-play audio data
///
/// Owned by the sound cache and shared read-only with playback calls.
#[derive(Debug, Clone)]
pub struct SoundBuffer {
    channels: u16,
    sample_rate: u32,
    samples: Vec<f32>,
}

impl SoundBuffer {
    /// Create a buffer from raw interleaved samples
    pub fn from_samples(channels: u16, sample_rate: u32, samples: Vec<f32>) -> Self {
        Self {
            channels,
            sample_rate,
            samples,
        }
    }

    /// Decode a buffer from encoded file bytes (WAV, OGG, MP3, or FLAC)
    pub fn decode(bytes: Vec<u8>) -> Result<Self, AudioError> {
        if bytes.is_empty() {
            return Err(AudioError::DecodeFailed("empty audio data".to_string()));
        }

        let decoder = rodio::Decoder::new(Cursor::new(bytes))
            .map_err(|e| AudioError::DecodeFailed(e.to_string()))?;

        let channels = decoder.channels();
        let sample_rate = decoder.sample_rate();
        let samples: Vec<f32> = decoder.convert_samples().collect();

        if samples.is_empty() {
            return Err(AudioError::DecodeFailed("no audio frames".to_string()));
        }

        Ok(Self {
            channels,
            sample_rate,
            samples,
        })
    }

    /// Number of interleaved channels
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Samples per second per channel
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Interleaved sample data
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Playback length
    pub fn duration(&self) -> Duration {
        let frames = self.samples.len() as u64 / u64::from(self.channels.max(1));
        Duration::from_secs_f64(frames as f64 / f64::from(self.sample_rate.max(1)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_from_samples() {
        // One second of stereo at 8 kHz.
        let buffer = SoundBuffer::from_samples(2, 8000, vec![0.0; 16000]);
        assert_eq!(buffer.duration(), Duration::from_secs(1));
    }

    #[test]
    fn test_decode_rejects_empty_input() {
        assert!(matches!(
            SoundBuffer::decode(Vec::new()),
            Err(AudioError::DecodeFailed(_))
        ));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let result = SoundBuffer::decode(vec![0xAB; 64]);
        assert!(matches!(result, Err(AudioError::DecodeFailed(_))));
    }
}
