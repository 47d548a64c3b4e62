//! Sound cache
//!
//! Maps resolved resource paths to decoded buffers. Loads run on detached
//! loader threads and report back over a channel; [`SoundCache::poll`]
//! drains completions on the engine tick, so the cache only ever mutates on
//! the frame thread. A miss never blocks and never produces audio.

use std::collections::{HashMap, HashSet};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::thread;

use super::buffer::SoundBuffer;
use super::AudioError;

struct LoadCompletion {
    key: String,
    result: Result<SoundBuffer, AudioError>,
}

/// Asynchronously populated map of decoded sounds
pub struct SoundCache {
    buffers: HashMap<String, Arc<SoundBuffer>>,
    pending: HashSet<String>,
    completions_tx: Sender<LoadCompletion>,
    completions_rx: Receiver<LoadCompletion>,
}

impl Default for SoundCache {
    fn default() -> Self {
        Self::new()
    }
}

impl SoundCache {
    /// Create an empty cache
    pub fn new() -> Self {
        let (completions_tx, completions_rx) = channel();
        Self {
            buffers: HashMap::new(),
            pending: HashSet::new(),
            completions_tx,
            completions_rx,
        }
    }

    /// Kick off an asynchronous load of `key` (a resolved path)
    ///
    /// Already-cached and already-loading keys are left alone. A failed load
    /// leaves the entry absent, so a later request tries again.
    pub fn request(&mut self, key: &str) {
        if self.buffers.contains_key(key) || self.pending.contains(key) {
            return;
        }

        self.pending.insert(key.to_string());
        log::debug!("loading sound: {key}");

        let tx = self.completions_tx.clone();
        let key = key.to_string();
        thread::spawn(move || {
            let result = std::fs::read(&key)
                .map_err(AudioError::from)
                .and_then(SoundBuffer::decode);
            // The engine may have shut down while we decoded; nothing to do.
            let _ = tx.send(LoadCompletion { key, result });
        });
    }

    /// Drain finished loads into the map (call once per tick)
    pub fn poll(&mut self) {
        while let Ok(completion) = self.completions_rx.try_recv() {
            self.pending.remove(&completion.key);
            match completion.result {
                Ok(buffer) => {
                    log::debug!("sound ready: {}", completion.key);
                    self.buffers.insert(completion.key, Arc::new(buffer));
                }
                Err(err) => {
                    log::warn!("failed to load sound {}: {err}", completion.key);
                }
            }
        }
    }

    /// Store an already-decoded buffer under `key`
    pub fn insert(&mut self, key: &str, buffer: SoundBuffer) {
        self.buffers.insert(key.to_string(), Arc::new(buffer));
    }

    /// Look up a decoded buffer
    pub fn get(&self, key: &str) -> Option<Arc<SoundBuffer>> {
        self.buffers.get(key).cloned()
    }

    /// Whether a load for `key` is still in flight
    pub fn is_pending(&self, key: &str) -> bool {
        self.pending.contains(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::time::Duration;

    /// Minimal 16-bit PCM mono WAV writer
    fn write_wav(path: &Path, sample_rate: u32, samples: &[i16]) {
        let byte_len = (samples.len() * 2) as u32;
        let mut data = Vec::with_capacity(44 + byte_len as usize);
        data.extend_from_slice(b"RIFF");
        data.extend_from_slice(&(36 + byte_len).to_le_bytes());
        data.extend_from_slice(b"WAVEfmt ");
        data.extend_from_slice(&16u32.to_le_bytes());
        data.extend_from_slice(&1u16.to_le_bytes());
        data.extend_from_slice(&1u16.to_le_bytes());
        data.extend_from_slice(&sample_rate.to_le_bytes());
        data.extend_from_slice(&(sample_rate * 2).to_le_bytes());
        data.extend_from_slice(&2u16.to_le_bytes());
        data.extend_from_slice(&16u16.to_le_bytes());
        data.extend_from_slice(b"data");
        data.extend_from_slice(&byte_len.to_le_bytes());
        for sample in samples {
            data.extend_from_slice(&sample.to_le_bytes());
        }
        std::fs::write(path, data).unwrap();
    }

    fn poll_until_settled(cache: &mut SoundCache, key: &str) {
        for _ in 0..500 {
            cache.poll();
            if !cache.is_pending(key) {
                return;
            }
            thread::sleep(Duration::from_millis(10));
        }
        panic!("load of {key} never settled");
    }

    #[test]
    fn test_load_decodes_wav() {
        let path = std::env::temp_dir().join("jukebox_cache_ok.wav");
        write_wav(&path, 8000, &vec![1000i16; 800]);
        let key = path.to_string_lossy().to_string();

        let mut cache = SoundCache::new();
        cache.request(&key);
        assert!(cache.is_pending(&key));
        assert!(cache.get(&key).is_none());

        poll_until_settled(&mut cache, &key);

        let buffer = cache.get(&key).expect("decoded buffer");
        assert_eq!(buffer.channels(), 1);
        assert_eq!(buffer.sample_rate(), 8000);
        assert_eq!(buffer.samples().len(), 800);
    }

    #[test]
    fn test_failed_load_leaves_entry_absent() {
        let mut cache = SoundCache::new();
        cache.request("no/such/file.wav");
        poll_until_settled(&mut cache, "no/such/file.wav");

        assert!(cache.get("no/such/file.wav").is_none());
        // Not pending any more either, so the next request retries.
        assert!(!cache.is_pending("no/such/file.wav"));
    }

    #[test]
    fn test_duplicate_requests_coalesce() {
        let mut cache = SoundCache::new();
        cache.request("no/such/file.wav");
        cache.request("no/such/file.wav");
        assert!(cache.is_pending("no/such/file.wav"));

        poll_until_settled(&mut cache, "no/such/file.wav");
        // Both completions (at most) drained without leaving ghosts.
        assert!(!cache.is_pending("no/such/file.wav"));
    }

    #[test]
    fn test_insert_bypasses_loading() {
        let mut cache = SoundCache::new();
        cache.insert("generated", SoundBuffer::from_samples(1, 8000, vec![0.0; 8]));
        assert!(cache.get("generated").is_some());
    }
}
