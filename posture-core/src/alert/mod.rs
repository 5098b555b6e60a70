//! alert — audible poor-posture tone
//!
//! A short fixed beep, fired on every poor frame: alerting is
//! level-triggered, with no edge detection between consecutive frames.

use rodio::source::{SineWave, Source};
use rodio::{OutputStream, OutputStreamHandle};
use std::time::Duration;
use tracing::{debug, warn};

/// Tone frequency in Hz.
const TONE_FREQUENCY: f32 = 800.0;
/// Tone length.
const TONE_DURATION: Duration = Duration::from_millis(10);
/// Playback amplitude.
const TONE_AMPLITUDE: f32 = 0.25;

/// Owns the audio output for the lifetime of the monitor loop. A missing
/// audio device degrades to silence with a single warning, never a crash.
pub struct Alerter {
    output: Option<(OutputStream, OutputStreamHandle)>,
}

impl Alerter {
    pub fn new() -> Self {
        match OutputStream::try_default() {
            Ok(pair) => Self { output: Some(pair) },
            Err(e) => {
                warn!("audio output unavailable, alerts disabled: {e}");
                Self { output: None }
            }
        }
    }

    /// A muted alerter that swallows every beep.
    pub fn disabled() -> Self {
        Self { output: None }
    }

    /// Emit the poor-posture tone. Callers invoke this on every poor frame.
    pub fn beep(&self) {
        let Some((_, handle)) = &self.output else {
            return;
        };
        let tone = SineWave::new(TONE_FREQUENCY)
            .take_duration(TONE_DURATION)
            .amplify(TONE_AMPLITUDE);
        if let Err(e) = handle.play_raw(tone.convert_samples()) {
            debug!("failed to play alert tone: {e}");
        }
    }
}

impl Default for Alerter {
    fn default() -> Self {
        Self::new()
    }
}
