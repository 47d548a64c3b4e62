//! Minimal frame driver for the jukebox engine
//!
//! Queues the audio files given on the command line onto a music stream,
//! orbits the first one around the listener, and ticks the engine at
//! roughly 60 Hz until the queue drains. Stands in for the game loop a
//! real host would provide.

use std::time::Duration;

use jukebox::prelude::*;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    jukebox::foundation::logging::init();

    let files: Vec<String> = std::env::args().skip(1).collect();
    if files.is_empty() {
        eprintln!("usage: jukebox_demo <audio-file> [more-files...]");
        return Ok(());
    }

    let mut graph = jukebox::audio::create_graph()?;
    let mut jukebox = Jukebox::new(JukeboxConfig::default());

    jukebox.create_stream("music")?;
    let mut settings = Vec::new();
    for file in &files {
        let handle = jukebox.queue_stream(
            graph.as_mut(),
            "music",
            file,
            TrackParams::default().with_fade_in(1.5),
        )?;
        settings.push(handle);
        log::info!("queued {file}");
    }

    let mut timer = Timer::new();
    loop {
        timer.update();
        jukebox.update(graph.as_mut());

        // Swing the head track around the listener so the panning is audible.
        let angle = timer.total_time() * 0.5;
        if let Some(head) = settings.first() {
            head.set_position(Vec2::new(angle.cos() * 40.0, angle.sin() * 40.0));
        }

        if jukebox.stream("music")?.is_empty() {
            log::info!("queue drained, shutting down");
            return Ok(());
        }

        std::thread::sleep(Duration::from_millis(16));
    }
}
