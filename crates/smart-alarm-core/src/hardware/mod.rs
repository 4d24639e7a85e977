//! Sound and light output.
//!
//! [`HardwareSink`] is the fire-and-forget interface the alarm driver talks
//! to. [`HardwareController`] implements it on top of an [`LedStrip`] and an
//! [`AudioOutput`], running light patterns on a background thread that checks
//! a stop flag between frames.

mod audio;
mod pattern;

pub use audio::{AudioOutput, CommandAudio, SilentAudio};
pub use pattern::{Color, Frame, LightPattern};

use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use tracing::{debug, error, info, trace, warn};

use crate::storage::{AlarmSettings, HardwareConfig};

/// Output side of an alarm. Calls return immediately; work continues in the
/// background until the matching stop call.
pub trait HardwareSink: Send {
    fn play_sound(&mut self, sound: &str);
    fn stop_sound(&mut self);
    fn start_light(&mut self, pattern: &str);
    fn stop_light(&mut self);

    fn stop_all(&mut self) {
        self.stop_sound();
        self.stop_light();
    }
}

/// An addressable RGB LED strip.
pub trait LedStrip: Send {
    fn num_pixels(&self) -> usize;
    fn set_pixel(&mut self, index: usize, color: Color);
    /// Push buffered pixels to the LEDs.
    fn show(&mut self) -> io::Result<()>;
}

/// In-memory strip that traces each shown frame.
#[derive(Debug, Clone)]
pub struct SimulatedStrip {
    pixels: Vec<Color>,
    shown: Vec<Color>,
}

impl SimulatedStrip {
    pub fn new(num_pixels: usize) -> Self {
        Self {
            pixels: vec![Color::OFF; num_pixels],
            shown: vec![Color::OFF; num_pixels],
        }
    }

    /// Colors as of the last [`LedStrip::show`].
    pub fn shown(&self) -> &[Color] {
        &self.shown
    }
}

impl LedStrip for SimulatedStrip {
    fn num_pixels(&self) -> usize {
        self.pixels.len()
    }

    fn set_pixel(&mut self, index: usize, color: Color) {
        if let Some(p) = self.pixels.get_mut(index) {
            *p = color;
        }
    }

    fn show(&mut self) -> io::Result<()> {
        self.shown.clone_from(&self.pixels);
        trace!(pixels = ?self.shown, "strip updated");
        Ok(())
    }
}

type SharedStrip = Arc<Mutex<Box<dyn LedStrip>>>;

struct LightRun {
    stop: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

pub struct HardwareController {
    strip: Option<SharedStrip>,
    audio: Box<dyn AudioOutput>,
    sounds_dir: PathBuf,
    light: Option<LightRun>,
}

impl HardwareController {
    /// `strip` is `None` when no LEDs are attached; light calls then log and
    /// do nothing.
    pub fn new(
        strip: Option<Box<dyn LedStrip>>,
        audio: Box<dyn AudioOutput>,
        sounds_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            strip: strip.map(|s| Arc::new(Mutex::new(s))),
            audio,
            sounds_dir: sounds_dir.into(),
            light: None,
        }
    }

    /// Simulated strip plus the configured external player.
    pub fn from_config(settings: &AlarmSettings, hardware: &HardwareConfig) -> Self {
        Self::new(
            Some(Box::new(SimulatedStrip::new(hardware.led_count))),
            Box::new(CommandAudio::new(hardware.player_command.clone())),
            settings.sounds_dir.clone(),
        )
    }

    pub fn is_light_running(&self) -> bool {
        self.light.as_ref().is_some_and(|run| !run.handle.is_finished())
    }

    pub fn is_sound_playing(&self) -> bool {
        self.audio.is_playing()
    }
}

impl HardwareSink for HardwareController {
    fn play_sound(&mut self, sound: &str) {
        if self.audio.is_playing() {
            return;
        }
        let path = self.sounds_dir.join(sound);
        if !path.exists() {
            error!(path = %path.display(), "sound file not found");
            return;
        }
        if let Err(e) = self.audio.start_loop(&path) {
            error!(error = %e, "error playing alarm sound");
        }
    }

    fn stop_sound(&mut self) {
        self.audio.stop();
    }

    fn start_light(&mut self, pattern: &str) {
        let Some(strip) = self.strip.clone() else {
            error!("LED strip not initialized");
            return;
        };
        if self.is_light_running() {
            return;
        }

        let pattern = LightPattern::from_name(pattern);
        let frames = match strip.lock() {
            Ok(s) => pattern.frames(s.num_pixels()),
            Err(_) => {
                error!("LED strip lock poisoned");
                return;
            }
        };

        let stop = Arc::new(AtomicBool::new(false));
        let flag = stop.clone();
        let spawned = std::thread::Builder::new()
            .name("alarm-light".into())
            .spawn(move || run_pattern(&strip, &frames, &flag));
        match spawned {
            Ok(handle) => {
                info!(%pattern, "light sequence started");
                self.light = Some(LightRun { stop, handle });
            }
            Err(e) => error!(error = %e, "failed to start light sequence"),
        }
    }

    fn stop_light(&mut self) {
        let Some(run) = self.light.take() else {
            return;
        };
        run.stop.store(true, Ordering::SeqCst);
        if run.handle.join().is_err() {
            warn!("light thread panicked");
        }
        info!("light sequence stopped");
    }
}

impl Drop for HardwareController {
    fn drop(&mut self) {
        self.stop_all();
    }
}

/// Loop `frames` until `stop` is set, then blank the strip.
fn run_pattern(strip: &SharedStrip, frames: &[Frame], stop: &AtomicBool) {
    'outer: while !stop.load(Ordering::SeqCst) {
        if frames.is_empty() {
            break;
        }
        for frame in frames {
            if stop.load(Ordering::SeqCst) {
                break 'outer;
            }
            if let Err(e) = show_frame(strip, &frame.pixels) {
                error!(error = %e, "error in light pattern");
                break 'outer;
            }
            std::thread::sleep(frame.hold);
        }
    }
    let blank = vec![Color::OFF; frames.first().map_or(0, |f| f.pixels.len())];
    if let Err(e) = show_frame(strip, &blank) {
        debug!(error = %e, "failed to clear strip");
    }
}

fn show_frame(strip: &SharedStrip, pixels: &[Color]) -> io::Result<()> {
    let mut strip = strip
        .lock()
        .map_err(|_| io::Error::other("LED strip lock poisoned"))?;
    for (i, color) in pixels.iter().enumerate() {
        strip.set_pixel(i, *color);
    }
    strip.show()
}
