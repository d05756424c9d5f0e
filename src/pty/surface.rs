//! PTY-backed terminal surfaces
//!
//! Spawns the Claude CLI in a pseudo-terminal per session. Output is drained
//! on a background thread; rendering it is up to whatever hosts the surface.

use crate::core::events::AppEvent;
use crate::core::surface::{SurfaceCommand, SurfaceFactory, SurfaceId};
use anyhow::{Context, Result};
use portable_pty::{native_pty_system, ChildKiller, CommandBuilder, MasterPty, PtySize};
use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::Path;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Initial PTY size (resized by the host once it knows its layout)
const INITIAL_ROWS: u16 = 50;
const INITIAL_COLS: u16 = 120;

/// One running surface.
///
/// The master and writer are held for the child's lifetime; dropping the
/// writer sends EOF to the CLI.
struct PtySurface {
    _master: Box<dyn MasterPty + Send>,
    _writer: Box<dyn Write + Send>,
    killer: Box<dyn ChildKiller + Send + Sync>,
}

/// Surface factory that runs each session in its own PTY
pub struct PtySurfaceFactory {
    surfaces: HashMap<SurfaceId, PtySurface>,
    next_id: SurfaceId,
    event_tx: mpsc::UnboundedSender<AppEvent>,
}

impl PtySurfaceFactory {
    pub fn new(event_tx: mpsc::UnboundedSender<AppEvent>) -> Self {
        Self {
            surfaces: HashMap::new(),
            next_id: 1,
            event_tx,
        }
    }

    pub fn surface_count(&self) -> usize {
        self.surfaces.len()
    }

    /// Drain output and report the exit on a background thread
    fn start_reader_thread(
        &self,
        surface: SurfaceId,
        mut reader: Box<dyn Read + Send>,
        mut child: Box<dyn portable_pty::Child + Send + Sync>,
    ) {
        let event_tx = self.event_tx.clone();

        std::thread::spawn(move || {
            let mut buffer = [0u8; 4096];
            let mut total: usize = 0;

            loop {
                match reader.read(&mut buffer) {
                    Ok(0) => {
                        debug!("Surface {} EOF", surface);
                        break;
                    }
                    Ok(n) => total += n,
                    Err(e) => {
                        if e.kind() != std::io::ErrorKind::Interrupted {
                            debug!("Surface {} read error: {}", surface, e);
                            break;
                        }
                    }
                }
            }

            let code = match child.wait() {
                Ok(status) => {
                    if status.success() {
                        info!("Surface {} exited ({} bytes of output)", surface, total);
                    } else {
                        warn!("Surface {} exited with code {}", surface, status.exit_code());
                    }
                    Some(status.exit_code())
                }
                Err(e) => {
                    error!("Failed to wait for surface {}: {}", surface, e);
                    None
                }
            };

            let _ = event_tx.send(AppEvent::SurfaceExited { surface, code });
        });
    }
}

impl SurfaceFactory for PtySurfaceFactory {
    fn create(&mut self, working_directory: &Path, command: &SurfaceCommand) -> Result<SurfaceId> {
        let pty_system = native_pty_system();
        let pair = pty_system
            .openpty(PtySize {
                rows: INITIAL_ROWS,
                cols: INITIAL_COLS,
                pixel_width: 0,
                pixel_height: 0,
            })
            .context("Failed to create PTY")?;

        let mut cmd = CommandBuilder::new(&command.program);
        for arg in &command.args {
            cmd.arg(arg);
        }
        cmd.cwd(working_directory);

        // Set TERM for color support
        cmd.env("TERM", "xterm-256color");
        cmd.env("COLORTERM", "truecolor");

        info!("Starting {} in {:?}", command.command_line(), working_directory);

        let child = pair
            .slave
            .spawn_command(cmd)
            .with_context(|| format!("Failed to spawn {}", command.program))?;
        let killer = child.clone_killer();
        let reader = pair
            .master
            .try_clone_reader()
            .context("Failed to get PTY reader")?;
        let writer = pair
            .master
            .take_writer()
            .context("Failed to get PTY writer")?;

        let id = self.next_id;
        self.next_id += 1;
        self.start_reader_thread(id, reader, child);
        self.surfaces.insert(
            id,
            PtySurface {
                _master: pair.master,
                _writer: writer,
                killer,
            },
        );

        Ok(id)
    }

    fn destroy(&mut self, surface: SurfaceId) {
        let Some(mut entry) = self.surfaces.remove(&surface) else {
            return;
        };
        if let Err(e) = entry.killer.kill() {
            debug!("Surface {} already gone: {}", surface, e);
        }
        info!("Destroyed surface {}", surface);
    }
}

impl Drop for PtySurfaceFactory {
    fn drop(&mut self) {
        let ids: Vec<SurfaceId> = self.surfaces.keys().copied().collect();
        for id in ids {
            self.destroy(id);
        }
    }
}
