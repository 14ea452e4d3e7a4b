/*
 *  tests/display_integration.rs
 *
 *  Integration tests for the display pipeline, using the capture driver
 *
 *  kvm-oled - appliance status panel
 *  (c) 2025-26 kvm-oled contributors
 */

use std::fs;
use std::path::Path;
use std::time::Duration;

use clap::Parser;
use embedded_graphics::{
    pixelcolor::BinaryColor,
    prelude::*,
    primitives::{PrimitiveStyle, Rectangle},
};
use tokio::sync::watch;

use kvm_oled::config::{self, Cli, DisplayConfig, DriverKind, OneShot};
use kvm_oled::daemon::Daemon;
use kvm_oled::display::{DisplayDriverFactory, ScreenRenderer, TextFont};
use kvm_oled::geometry::{self, UsbProbe};
use kvm_oled::metrics::MetricsSource;

struct Peripherals(usize);

impl UsbProbe for Peripherals {
    fn peripheral_count(&self) -> usize {
        self.0
    }
}

#[derive(Default)]
struct CountingMetrics {
    identity_pages: usize,
}

impl MetricsSource for CountingMetrics {
    fn hostname(&mut self) -> String {
        self.identity_pages += 1;
        "kvm".into()
    }
    fn version(&mut self) -> String { "1.0".into() }
    fn image_tag(&mut self) -> String { "-".into() }
    fn memory_percent(&mut self) -> Option<u8> { Some(10) }
    fn cpu_percent(&mut self) -> Option<u8> { Some(3) }
    fn cpu_temperature(&mut self) -> String { "40.0°C".into() }
    fn gpu_temperature(&mut self) -> String { "N/A".into() }
    fn throttled(&mut self) -> String { "0x0".into() }
    fn ip_address(&mut self) -> String { "10.0.0.2".into() }
    fn ssid(&mut self) -> Option<String> { None }
    fn uptime(&mut self) -> String { "0d 0h 5m".into() }
    fn user_count(&mut self) -> Option<usize> { Some(0) }
    fn load_average(&mut self) -> String { "0.00 0.00 0.00".into() }
    fn storage(&mut self) -> String { "12% /".into() }
    fn date(&mut self) -> String { "2026-10-15 09:30".into() }
}

/// (width, height, lit pixels) of a plain PBM.
fn read_pbm(path: &Path) -> (u32, u32, usize) {
    let text = fs::read_to_string(path).unwrap();
    let mut lines = text.lines();
    assert_eq!(lines.next(), Some("P1"));
    let mut dims = lines.next().unwrap().split_whitespace().map(|n| n.parse::<u32>().unwrap());
    let (w, h) = (dims.next().unwrap(), dims.next().unwrap());
    let lit = lines.flat_map(|l| l.split_whitespace()).filter(|p| *p == "1").count();
    (w, h, lit)
}

fn capture_config(dir: &Path) -> DisplayConfig {
    DisplayConfig {
        driver: Some(DriverKind::Capture),
        capture_path: Some(dir.join("panel.pbm")),
        ..Default::default()
    }
}

fn renderer(config: &DisplayConfig) -> ScreenRenderer {
    let mut driver = DisplayDriverFactory::create_from_config(config).unwrap();
    DisplayDriverFactory::init_driver(&mut driver, config).unwrap();
    let font = TextFont::load(config.font.as_deref(), config.font_size()).unwrap();
    ScreenRenderer::new(driver, font, config)
}

#[test]
fn test_detected_small_panel_renders_text() {
    let dir = tempfile::tempdir().unwrap();
    let model = dir.path().join("model");
    fs::write(&model, "Raspberry Pi 4 Model B Rev 1.4\0").unwrap();
    let yaml = dir.path().join("kvm-oled.yaml");
    fs::write(&yaml, "log_level: info\ndisplay:\n  font_size: 10\n").unwrap();

    let cli = Cli::parse_from([
        "kvm-oled",
        "--config", yaml.to_str().unwrap(),
        "--driver", "capture",
        "--capture-path", dir.path().join("panel.pbm").to_str().unwrap(),
        "--model-path", model.to_str().unwrap(),
    ]);
    let mut cfg = config::load(&cli).unwrap();
    geometry::apply(&mut cfg, &Peripherals(0)).unwrap();

    let display = cfg.display();
    assert_eq!(display.height, Some(32));
    assert_eq!(display.rotate_deg, Some(0));

    let mut r = renderer(&display);
    r.draw_text("hello\nworld", 0).unwrap();

    let (w, h, lit) = read_pbm(&display.capture_path());
    assert_eq!((w, h), (128, 32));
    assert!(lit > 0);
}

#[test]
fn test_compute_module_panel_is_large_and_flipped() {
    let dir = tempfile::tempdir().unwrap();
    let model = dir.path().join("model");
    fs::write(&model, "Raspberry Pi Compute Module 4 Rev 1.1\0").unwrap();

    let mut cfg = config::Config {
        display: Some(capture_config(dir.path())),
        metrics: Some(config::MetricsConfig { model_path: Some(model), ..Default::default() }),
        ..Default::default()
    };
    geometry::apply(&mut cfg, &Peripherals(1)).unwrap();

    let dump = config::dump(&cfg).unwrap();
    assert!(dump.contains("height: 64"), "{dump}");
    assert!(dump.contains("rotate_deg: 180"), "{dump}");

    let mut r = renderer(&cfg.display());
    assert_eq!(r.dimensions(), (128, 64));
    r.splash().unwrap();
    let (_, h, lit) = read_pbm(&cfg.display().capture_path());
    assert_eq!(h, 64);
    assert!(lit > 0);
}

#[test]
fn test_scoped_canvas_commits_on_drop() {
    let dir = tempfile::tempdir().unwrap();
    let config = DisplayConfig { height: Some(32), ..capture_config(dir.path()) };
    let mut r = renderer(&config);
    {
        let mut canvas = r.canvas();
        Rectangle::new(Point::new(0, 0), Size::new(4, 4))
            .into_styled(PrimitiveStyle::with_fill(BinaryColor::On))
            .draw(&mut *canvas)
            .unwrap();
    }
    assert_eq!(read_pbm(&config.capture_path()).2, 16);
}

#[test]
fn test_clear_blanks_capture() {
    let dir = tempfile::tempdir().unwrap();
    let config = DisplayConfig { height: Some(32), ..capture_config(dir.path()) };
    let mut r = renderer(&config);
    r.draw_text("something", 0).unwrap();
    r.clear().unwrap();
    assert_eq!(read_pbm(&config.capture_path()).2, 0);
}

#[tokio::test(start_paused = true)]
async fn test_rotation_runs_until_shutdown() {
    let dir = tempfile::tempdir().unwrap();
    let config = DisplayConfig {
        height: Some(64),
        interval_secs: Some(2.0),
        clear_on_exit: Some(true),
        ..capture_config(dir.path())
    };
    let (tx, rx) = watch::channel(false);
    let mut daemon = Daemon::new(renderer(&config), &config, rx);
    let mut metrics = CountingMetrics::default();

    let (state, _) = tokio::join!(daemon.run_rotation(&mut metrics), async {
        tokio::time::sleep(Duration::from_secs(13)).await;
        tx.send(true).unwrap();
    });

    // ticks at 0, 2, 4, 6, 8, 10 and 12 seconds
    assert_eq!(state.ticks(), 7);
    assert_eq!(metrics.identity_pages, 3);

    daemon.finish().unwrap();
    assert_eq!(read_pbm(&config.capture_path()).2, 0);
}

#[tokio::test(start_paused = true)]
async fn test_one_shot_image() {
    let dir = tempfile::tempdir().unwrap();
    let logo = dir.path().join("logo.svg");
    fs::write(
        &logo,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="32" height="32">
             <circle cx="16" cy="16" r="14" fill="white"/>
           </svg>"#,
    )
    .unwrap();

    let config = DisplayConfig { height: Some(32), ..capture_config(dir.path()) };
    let (_tx, rx) = watch::channel(false);
    let mut daemon = Daemon::new(renderer(&config), &config, rx);

    let start = tokio::time::Instant::now();
    daemon.run_one_shot(&OneShot::Image(logo), std::io::empty()).await.unwrap();
    assert_eq!(start.elapsed(), config.interval());

    let (_, _, lit) = read_pbm(&config.capture_path());
    assert!(lit > 400, "circle should cover most of its box, got {lit}");
}
