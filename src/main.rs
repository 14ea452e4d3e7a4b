/*
 *  main.rs
 *
 *  kvm-oled - appliance status panel
 *	(c) 2025-26 kvm-oled contributors
 *
 *	This program is free software: you can redistribute it and/or modify
 *	it under the terms of the GNU General Public License as published by
 *	the Free Software Foundation, either version 3 of the License, or
 *	(at your option) any later version.
 *
 *	This program is distributed in the hope that it will be useful,
 *	but WITHOUT ANY WARRANTY; without even the implied warranty of
 *	MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *	GNU General Public License for more details.
 *
 *	See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *	Public License.
 *
 */

use anyhow::Context;
use clap::Parser;
use env_logger::Env;
use log::{error, info, warn};
use tokio::sync::watch;

use kvm_oled::config::{self, Cli};
use kvm_oled::daemon::{signal_handler, Daemon};
use kvm_oled::display::{DisplayDriverFactory, ScreenRenderer, TextFont};
use kvm_oled::geometry::{self, parse_usb_id, SysfsUsbProbe};
use kvm_oled::metrics::SystemMetrics;

include!(concat!(env!("OUT_DIR"), "/build_info.rs"));

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut cfg = config::load(&cli).context("Failed to load configuration")?;

    let default_level = cfg
        .log_level
        .clone()
        .unwrap_or_else(|| if cli.debug { "debug" } else { "info" }.to_string());
    env_logger::Builder::from_env(Env::default().default_filter_or(default_level))
        .format_timestamp_secs()
        .init();

    let usb_filter = cfg.metrics().usb_match.as_deref().and_then(parse_usb_id);
    geometry::apply(&mut cfg, &SysfsUsbProbe::new(usb_filter))
        .context("Cannot determine panel geometry")?;

    if cli.dump_config {
        print!("{}", config::dump(&cfg)?);
        return Ok(());
    }

    info!("{} v.{} built {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"), BUILD_DATE);
    let display_cfg = cfg.display();

    let mut driver = DisplayDriverFactory::create_from_config(&display_cfg)
        .context("Invalid display selection")?;
    DisplayDriverFactory::init_driver(&mut driver, &display_cfg)
        .context("Display initialization failed")?;

    let font = TextFont::load(display_cfg.font.as_deref(), display_cfg.font_size())
        .context("Invalid font")?;
    let mut renderer = ScreenRenderer::new(driver, font, &display_cfg);

    if let Some(contrast) = display_cfg.contrast() {
        if let Err(e) = renderer.set_contrast(contrast) {
            warn!("Cannot set contrast {}: {}", contrast, e);
        }
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(e) = signal_handler(shutdown_tx).await {
            error!("Cannot install signal handlers: {}", e);
        }
    });

    let one_shot = cfg.one_shot.clone();
    if one_shot.is_none() && display_cfg.splash() {
        if let Err(e) = renderer.splash() {
            warn!("Splash failed: {}", e);
        }
    }

    let mut daemon = Daemon::new(renderer, &display_cfg, shutdown_rx);
    match one_shot {
        Some(shot) => daemon
            .run_one_shot(&shot, std::io::stdin())
            .await
            .context("Cannot show frame")?,
        None => {
            let mut metrics = SystemMetrics::new(&cfg.metrics());
            daemon.run_rotation(&mut metrics).await;
        }
    }

    daemon.finish().context("Cannot clear display")?;
    info!("Shutdown complete");
    Ok(())
}
