use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use log::info;
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};

/// Background music player. The output device is opened on first use and
/// kept for the lifetime of the launcher.
#[derive(Default)]
pub struct MusicPlayer {
    output: Option<(OutputStream, OutputStreamHandle)>,
    sink: Option<Sink>,
}

impl MusicPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start `path`, replacing whatever is playing.
    pub fn play(&mut self, path: &Path) -> Result<(), String> {
        if self.output.is_none() {
            let output = OutputStream::try_default()
                .map_err(|e| format!("no audio output available: {e}"))?;
            self.output = Some(output);
        }
        let Some((_, handle)) = &self.output else {
            return Err("no audio output available".to_owned());
        };

        let file =
            File::open(path).map_err(|e| format!("unable to open {}: {e}", path.display()))?;
        let source = Decoder::new(BufReader::new(file))
            .map_err(|e| format!("unable to decode {}: {e}", path.display()))?;
        let sink = Sink::try_new(handle).map_err(|e| format!("unable to start playback: {e}"))?;
        sink.append(source);

        if let Some(previous) = self.sink.replace(sink) {
            previous.stop();
        }
        info!("audio: playing {}", path.display());
        Ok(())
    }
}
