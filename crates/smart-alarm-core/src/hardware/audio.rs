//! Looping alarm sound playback through an external player process.

use std::io;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::{debug, error, info};

/// Something that can loop a sound file until told to stop.
pub trait AudioOutput: Send {
    /// Start looping `path`. Called only while nothing is playing.
    fn start_loop(&mut self, path: &Path) -> io::Result<()>;
    fn stop(&mut self);
    fn is_playing(&self) -> bool;
}

/// Runs `player <file>` over and over on a background thread.
pub struct CommandAudio {
    player: String,
    stop: Arc<AtomicBool>,
    child: Arc<Mutex<Option<Child>>>,
    worker: Option<JoinHandle<()>>,
}

impl CommandAudio {
    pub fn new(player: impl Into<String>) -> Self {
        Self {
            player: player.into(),
            stop: Arc::new(AtomicBool::new(false)),
            child: Arc::new(Mutex::new(None)),
            worker: None,
        }
    }

    fn kill_child(&self) {
        let Ok(mut slot) = self.child.lock() else {
            return;
        };
        if let Some(mut child) = slot.take() {
            if let Err(e) = child.kill() {
                debug!(error = %e, "player already exited");
            }
            let _ = child.wait();
        }
    }
}

impl AudioOutput for CommandAudio {
    fn start_loop(&mut self, path: &Path) -> io::Result<()> {
        // fail fast if the player binary is missing
        let first = spawn_player(&self.player, path)?;
        self.stop.store(false, Ordering::SeqCst);
        if let Ok(mut slot) = self.child.lock() {
            *slot = Some(first);
        }

        info!(path = %path.display(), "alarm sound started");
        let player = self.player.clone();
        let path: PathBuf = path.to_path_buf();
        let stop = self.stop.clone();
        let child = self.child.clone();
        let handle = std::thread::Builder::new()
            .name("alarm-sound".into())
            .spawn(move || loop {
                let finished = match child.lock() {
                    Ok(mut slot) => {
                        let status = slot.as_mut().map(Child::try_wait);
                        let running = matches!(status, Some(Ok(None)));
                        if !running {
                            *slot = None;
                        }
                        !running
                    }
                    Err(_) => return,
                };
                if stop.load(Ordering::SeqCst) {
                    return;
                }
                if finished {
                    match spawn_player(&player, &path) {
                        Ok(next) => {
                            if let Ok(mut slot) = child.lock() {
                                *slot = Some(next);
                            }
                        }
                        Err(e) => {
                            error!(error = %e, "failed to restart alarm sound");
                            return;
                        }
                    }
                }
                std::thread::sleep(Duration::from_millis(100));
            })?;
        self.worker = Some(handle);
        Ok(())
    }

    fn stop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        self.kill_child();
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
            info!("alarm sound stopped");
        }
        // the worker may have respawned between the flag and the kill
        self.kill_child();
    }

    fn is_playing(&self) -> bool {
        self.worker.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for CommandAudio {
    fn drop(&mut self) {
        self.stop();
    }
}

fn spawn_player(player: &str, path: &Path) -> io::Result<Child> {
    Command::new(player)
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
}

/// Audio output that only logs; used when no player is available.
#[derive(Debug, Default)]
pub struct SilentAudio {
    playing: Option<PathBuf>,
}

impl AudioOutput for SilentAudio {
    fn start_loop(&mut self, path: &Path) -> io::Result<()> {
        info!(path = %path.display(), "(silent) alarm sound started");
        self.playing = Some(path.to_path_buf());
        Ok(())
    }

    fn stop(&mut self) {
        if self.playing.take().is_some() {
            info!("(silent) alarm sound stopped");
        }
    }

    fn is_playing(&self) -> bool {
        self.playing.is_some()
    }
}
