/*
 *  daemon.rs
 *
 *  kvm-oled - appliance status panel
 *  (c) 2025-26 kvm-oled contributors
 *
 *  Run loop: page rotation or a single frame, until shutdown
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use std::io::{self, Read};
use std::time::Duration;

use log::{error, info};
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::watch;

use crate::config::{DisplayConfig, OneShot};
use crate::display::{DisplayError, ScreenRenderer};
use crate::metrics::MetricsSource;
use crate::rotation::{RotationController, RotationState};

/// Waits for SIGINT, SIGTERM or SIGHUP and flips the shutdown flag.
pub async fn signal_handler(shutdown: watch::Sender<bool>) -> io::Result<()> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sighup = signal(SignalKind::hangup())?;

    tokio::select! {
        _ = sigint.recv() => {
            info!("SIGINT received. Initiating graceful shutdown.");
        }
        _ = sigterm.recv() => {
            info!("SIGTERM received. Initiating graceful shutdown.");
        }
        _ = sighup.recv() => {
            info!("SIGHUP received. Initiating graceful shutdown.");
        }
    }
    // receivers may already be gone when the loop ended on its own
    let _ = shutdown.send(true);
    Ok(())
}

/// Text for `--pipe`: everything on the reader, trailing newlines dropped.
/// Invalid UTF-8 sequences become U+FFFD.
pub fn read_pipe(mut input: impl Read) -> io::Result<String> {
    let mut bytes = Vec::new();
    input.read_to_end(&mut bytes)?;
    let text = String::from_utf8_lossy(&bytes);
    Ok(text.trim_end_matches(['\n', '\r']).to_string())
}

pub struct Daemon {
    renderer: ScreenRenderer,
    interval: Duration,
    clear_on_exit: bool,
    shutdown: watch::Receiver<bool>,
}

impl Daemon {
    pub fn new(renderer: ScreenRenderer, config: &DisplayConfig, shutdown: watch::Receiver<bool>) -> Self {
        Self {
            renderer,
            interval: config.interval(),
            clear_on_exit: config.clear_on_exit(),
            shutdown,
        }
    }

    fn stopping(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Sleep one interval. Returns true when shutdown was requested first.
    async fn pause(&mut self) -> bool {
        if self.stopping() {
            return true;
        }
        let shutdown = &mut self.shutdown;
        let stop = async {
            // a dropped sender can never request shutdown
            if shutdown.wait_for(|stop| *stop).await.is_err() {
                std::future::pending::<()>().await;
            }
        };
        tokio::select! {
            _ = tokio::time::sleep(self.interval) => false,
            _ = stop => true,
        }
    }

    /// Rotate pages until shutdown. A frame that fails to render is logged
    /// and the rotation carries on with the next page.
    pub async fn run_rotation(&mut self, metrics: &mut dyn MetricsSource) -> RotationState {
        info!("Rotating status pages every {:?}", self.interval);
        let mut controller = RotationController::new();

        while !self.stopping() {
            if let Err(e) = controller.tick(&mut self.renderer, metrics) {
                error!("Frame render failed: {}", e);
            }
            if self.pause().await {
                break;
            }
        }

        info!("Rotation stopped after {} pages", controller.state().ticks());
        controller.state()
    }

    /// Render one frame, hold it for one interval, return.
    ///
    /// `input` is only read for [`OneShot::Pipe`].
    pub async fn run_one_shot(&mut self, shot: &OneShot, input: impl Read) -> Result<(), DisplayError> {
        match shot {
            OneShot::Text(text) => self.renderer.draw_text(text, 0)?,
            OneShot::Image(path) => {
                info!("Showing image {}", path.display());
                self.renderer.draw_image(path)?
            }
            OneShot::Pipe => {
                let text = read_pipe(input)?;
                self.renderer.draw_text(&text, 0)?
            }
        }
        self.pause().await;
        Ok(())
    }

    /// Leave the panel as configured on the way out.
    pub fn finish(mut self) -> Result<(), DisplayError> {
        if self.clear_on_exit {
            info!("Clearing display");
            self.renderer.clear()?;
        }
        Ok(())
    }
}
