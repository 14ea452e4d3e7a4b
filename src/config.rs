/*
 *  config.rs
 *
 *  kvm-oled - appliance status panel
 *  (c) 2025-26 kvm-oled contributors
 *
 *  Layered configuration: defaults, YAML file, command line
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

use clap::{ArgAction, Parser, ValueHint};
use dirs_next::home_dir;
use serde::{Deserialize, Serialize};
use std::{fs, path::{Path, PathBuf}, time::Duration};
use thiserror::Error;

use crate::constants::*;

/// Error type for config loading/validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Top-level app configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub log_level: Option<String>,
    pub display: Option<DisplayConfig>,
    pub metrics: Option<MetricsConfig>,
    /// Single frame override, command line only
    #[serde(skip)]
    pub one_shot: Option<OneShot>,
}

/// Panel geometry, text layout and loop timing.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct DisplayConfig {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub rotate_deg: Option<u16>,
    /// Raw request, clamped into 0..=255 by [`DisplayConfig::contrast`]
    pub contrast: Option<i64>,
    pub driver: Option<DriverKind>,
    pub bus: Option<BusConfig>,
    pub capture_path: Option<PathBuf>,
    pub font: Option<PathBuf>,
    pub font_size: Option<f32>,
    pub font_spacing: Option<i32>,
    pub offset_x: Option<i32>,
    pub offset_y: Option<i32>,
    pub interval_secs: Option<f64>,
    pub clear_on_exit: Option<bool>,
    pub splash: Option<bool>,
}

/// Where the metric queries read from.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct MetricsConfig {
    pub fahrenheit: Option<bool>,
    pub thermal_path: Option<PathBuf>,
    pub model_path: Option<PathBuf>,
    /// `vendor:product` in hex; restricts which USB devices count as peripherals
    pub usb_match: Option<String>,
    pub mount: Option<String>,
    pub interface: Option<String>,
    pub image_tag_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BusConfig {
    I2c {
        bus: String,        // e.g. "/dev/i2c-1"
        address: u8,        // e.g. 0x3C
    },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DriverKind {
    Ssd1306,
    /// Emulated panel, each frame written to a PBM file
    Capture,
}

/// Render a single frame instead of rotating pages.
#[derive(Debug, Clone, PartialEq)]
pub enum OneShot {
    Text(String),
    Image(PathBuf),
    /// Text read from standard input
    Pipe,
}

/// Clamp any requested contrast into the range the panel accepts.
pub fn clamp_contrast(value: i64) -> u8 {
    value.clamp(0, 255) as u8
}

impl DisplayConfig {
    pub fn width(&self) -> u32 { self.width.unwrap_or(DEFAULT_WIDTH) }
    pub fn height(&self) -> u32 { self.height.unwrap_or(DEFAULT_HEIGHT) }
    pub fn contrast(&self) -> Option<u8> { self.contrast.map(clamp_contrast) }
    pub fn driver(&self) -> DriverKind { self.driver.unwrap_or(DriverKind::Ssd1306) }
    pub fn font_size(&self) -> f32 { self.font_size.unwrap_or(DEFAULT_FONT_SIZE) }
    pub fn font_spacing(&self) -> i32 { self.font_spacing.unwrap_or(DEFAULT_FONT_SPACING) }
    pub fn offset(&self) -> (i32, i32) { (self.offset_x.unwrap_or(0), self.offset_y.unwrap_or(0)) }
    pub fn clear_on_exit(&self) -> bool { self.clear_on_exit.unwrap_or(false) }
    pub fn splash(&self) -> bool { self.splash.unwrap_or(true) }

    /// Page interval. Values `load` would reject fall back to the default.
    pub fn interval(&self) -> Duration {
        self.interval_secs
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
            .filter(|d| !d.is_zero())
            .unwrap_or(Duration::from_secs_f64(DEFAULT_INTERVAL_SECS))
    }

    pub fn capture_path(&self) -> PathBuf {
        self.capture_path.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_CAPTURE_PATH))
    }

    pub fn bus(&self) -> BusConfig {
        self.bus.clone().unwrap_or_else(|| BusConfig::I2c {
            bus: DEFAULT_I2C_BUS.to_string(),
            address: DEFAULT_I2C_ADDRESS,
        })
    }
}

impl MetricsConfig {
    pub fn fahrenheit(&self) -> bool { self.fahrenheit.unwrap_or(false) }

    pub fn thermal_path(&self) -> PathBuf {
        self.thermal_path.clone().unwrap_or_else(|| PathBuf::from(THERMAL_PATH))
    }

    pub fn model_path(&self) -> PathBuf {
        self.model_path.clone().unwrap_or_else(|| PathBuf::from(MODEL_PATH))
    }

    pub fn mount(&self) -> String {
        self.mount.clone().unwrap_or_else(|| DEFAULT_MOUNT.to_string())
    }
}

impl Config {
    pub fn display(&self) -> DisplayConfig { self.display.clone().unwrap_or_default() }
    pub fn metrics(&self) -> MetricsConfig { self.metrics.clone().unwrap_or_default() }
}

/// CLI overrides. All fields are Options so we can layer them over YAML.
#[derive(Debug, Parser, Clone, Default)]
#[command(name = "kvm-oled", version, about = "KVM appliance OLED status display")]
pub struct Cli {
    /// Path to a YAML config file (overrides search)
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,
    /// Enable debug log level
    #[arg(short = 'v', long, alias = "verbose", action = ArgAction::SetTrue)]
    pub debug: bool,
    #[arg(long)]
    pub log_level: Option<String>,
    /// TrueType/OpenType font; the built-in bitmap font is used otherwise
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub font: Option<PathBuf>,
    #[arg(long)]
    pub font_size: Option<f32>,
    /// Extra pixels between text lines
    #[arg(long, allow_hyphen_values = true)]
    pub font_spacing: Option<i32>,
    #[arg(long, allow_hyphen_values = true)]
    pub offset_x: Option<i32>,
    #[arg(long, allow_hyphen_values = true)]
    pub offset_y: Option<i32>,
    /// Seconds each page stays on screen
    #[arg(long)]
    pub interval: Option<f64>,
    /// Show a single image and exit
    #[arg(long, value_hint = ValueHint::FilePath, conflicts_with_all = ["text", "pipe"])]
    pub image: Option<PathBuf>,
    /// Show a single text and exit
    #[arg(long, conflicts_with = "pipe")]
    pub text: Option<String>,
    /// Show text read from stdin and exit
    #[arg(long, action = ArgAction::SetTrue)]
    pub pipe: bool,
    #[arg(long, action = ArgAction::SetTrue)]
    pub clear_on_exit: bool,
    /// Panel contrast, clamped into 0..=255
    #[arg(long, allow_hyphen_values = true)]
    pub contrast: Option<i64>,
    #[arg(long, action = ArgAction::SetTrue)]
    pub fahrenheit: bool,
    #[arg(long)]
    pub width: Option<u32>,
    #[arg(long)]
    pub height: Option<u32>,
    #[arg(long)]
    pub rotate: Option<u16>,
    #[arg(long, value_enum)]
    pub driver: Option<DriverKind>,
    #[arg(long)]
    pub i2c_bus: Option<String>,
    #[arg(long, value_parser = parse_address)]
    pub i2c_address: Option<u8>,
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub capture_path: Option<PathBuf>,
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub thermal_path: Option<PathBuf>,
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub model_path: Option<PathBuf>,
    /// Only count USB peripherals matching vendor:product (hex)
    #[arg(long)]
    pub usb_match: Option<String>,
    /// Mount point reported on the storage line
    #[arg(long)]
    pub mount: Option<String>,
    /// Network interface whose address is shown
    #[arg(long)]
    pub interface: Option<String>,
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub image_tag_file: Option<PathBuf>,
    /// Skip the startup splash
    #[arg(long, action = ArgAction::SetTrue)]
    pub no_splash: bool,
    /// dump fully merged config (after overrides) and exit
    #[arg(long, action = ArgAction::SetTrue)]
    pub dump_config: bool,
}

fn parse_address(s: &str) -> Result<u8, String> {
    let trimmed = s.trim_start_matches("0x").trim_start_matches("0X");
    u8::from_str_radix(trimmed, 16).map_err(|e| format!("invalid I2C address {s}: {e}"))
}

/// Public entry point: read YAML, merge CLI, validate.
pub fn load(cli: &Cli) -> Result<Config, ConfigError> {
    // 1) defaults (from `Default` impl)
    let mut cfg = Config::default();

    // 2) YAML file (explicit path or search)
    if let Some(p) = cli.config.as_ref() {
        if p.exists() {
            let y = read_yaml(p)?;
            merge(&mut cfg, y);
        } else {
            return Err(ConfigError::Validation(format!(
                "Config file not found: {}",
                p.display()
            )));
        }
    } else if let Some(p) = find_config_file() {
        let y = read_yaml(&p)?;
        merge(&mut cfg, y);
    }

    // 3) CLI overrides (highest precedence)
    apply_cli_overrides(&mut cfg, cli);

    // 4) Validate
    validate(&cfg)?;

    Ok(cfg)
}

/// Pretty YAML of the effective config.
pub fn dump(cfg: &Config) -> Result<String, ConfigError> {
    Ok(serde_yaml::to_string(cfg)?)
}

/// Try common locations in order (first hit wins).
fn find_config_file() -> Option<PathBuf> {
    if let Some(home) = home_dir() {
        let p = home.join(".config/kvm-oled/config.yaml");
        if p.exists() { return Some(p) }
    }
    for candidate in &["kvm-oled.yaml", "config/kvm-oled.yaml"] {
        let p = PathBuf::from(candidate);
        if p.exists() { return Some(p) }
    }
    None
}

pub fn read_yaml(path: &Path) -> Result<Config, ConfigError> {
    let s = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&s)?;
    Ok(cfg)
}

/// Shallow merge `src` into `dst`, Option-by-Option.
fn merge(dst: &mut Config, src: Config) {
    if src.log_level.is_some() { dst.log_level = src.log_level; }
    match (&mut dst.display, src.display) {
        (None, Some(c)) => dst.display = Some(c),
        (Some(d), Some(s)) => merge_display(d, s),
        _ => {}
    }
    match (&mut dst.metrics, src.metrics) {
        (None, Some(c)) => dst.metrics = Some(c),
        (Some(d), Some(s)) => merge_metrics(d, s),
        _ => {}
    }
}

fn merge_display(dst: &mut DisplayConfig, src: DisplayConfig) {
    if src.width.is_some()         { dst.width = src.width; }
    if src.height.is_some()        { dst.height = src.height; }
    if src.rotate_deg.is_some()    { dst.rotate_deg = src.rotate_deg; }
    if src.contrast.is_some()      { dst.contrast = src.contrast; }
    if src.driver.is_some()        { dst.driver = src.driver; }
    if src.bus.is_some()           { dst.bus = src.bus; }
    if src.capture_path.is_some()  { dst.capture_path = src.capture_path; }
    if src.font.is_some()          { dst.font = src.font; }
    if src.font_size.is_some()     { dst.font_size = src.font_size; }
    if src.font_spacing.is_some()  { dst.font_spacing = src.font_spacing; }
    if src.offset_x.is_some()      { dst.offset_x = src.offset_x; }
    if src.offset_y.is_some()      { dst.offset_y = src.offset_y; }
    if src.interval_secs.is_some() { dst.interval_secs = src.interval_secs; }
    if src.clear_on_exit.is_some() { dst.clear_on_exit = src.clear_on_exit; }
    if src.splash.is_some()        { dst.splash = src.splash; }
}

fn merge_metrics(dst: &mut MetricsConfig, src: MetricsConfig) {
    if src.fahrenheit.is_some()     { dst.fahrenheit = src.fahrenheit; }
    if src.thermal_path.is_some()   { dst.thermal_path = src.thermal_path; }
    if src.model_path.is_some()     { dst.model_path = src.model_path; }
    if src.usb_match.is_some()      { dst.usb_match = src.usb_match; }
    if src.mount.is_some()          { dst.mount = src.mount; }
    if src.interface.is_some()      { dst.interface = src.interface; }
    if src.image_tag_file.is_some() { dst.image_tag_file = src.image_tag_file; }
}

fn apply_cli_overrides(cfg: &mut Config, cli: &Cli) {
    if cli.log_level.is_some() { cfg.log_level = cli.log_level.clone(); }

    let display = cfg.display.get_or_insert_with(DisplayConfig::default);
    if cli.width.is_some()        { display.width = cli.width; }
    if cli.height.is_some()       { display.height = cli.height; }
    if cli.rotate.is_some()       { display.rotate_deg = cli.rotate; }
    if cli.contrast.is_some()     { display.contrast = cli.contrast; }
    if cli.driver.is_some()       { display.driver = cli.driver; }
    if cli.capture_path.is_some() { display.capture_path = cli.capture_path.clone(); }
    if cli.font.is_some()         { display.font = cli.font.clone(); }
    if cli.font_size.is_some()    { display.font_size = cli.font_size; }
    if cli.font_spacing.is_some() { display.font_spacing = cli.font_spacing; }
    if cli.offset_x.is_some()     { display.offset_x = cli.offset_x; }
    if cli.offset_y.is_some()     { display.offset_y = cli.offset_y; }
    if cli.interval.is_some()     { display.interval_secs = cli.interval; }
    if cli.clear_on_exit          { display.clear_on_exit = Some(true); }
    if cli.no_splash              { display.splash = Some(false); }

    if cli.i2c_bus.is_some() || cli.i2c_address.is_some() {
        let BusConfig::I2c { bus, address } = display.bus();
        display.bus = Some(BusConfig::I2c {
            bus: cli.i2c_bus.clone().unwrap_or(bus),
            address: cli.i2c_address.unwrap_or(address),
        });
    }

    let metrics = cfg.metrics.get_or_insert_with(MetricsConfig::default);
    if cli.fahrenheit                 { metrics.fahrenheit = Some(true); }
    if cli.thermal_path.is_some()     { metrics.thermal_path = cli.thermal_path.clone(); }
    if cli.model_path.is_some()       { metrics.model_path = cli.model_path.clone(); }
    if cli.usb_match.is_some()        { metrics.usb_match = cli.usb_match.clone(); }
    if cli.mount.is_some()            { metrics.mount = cli.mount.clone(); }
    if cli.interface.is_some()        { metrics.interface = cli.interface.clone(); }
    if cli.image_tag_file.is_some()   { metrics.image_tag_file = cli.image_tag_file.clone(); }

    cfg.one_shot = if let Some(image) = cli.image.as_ref() {
        Some(OneShot::Image(image.clone()))
    } else if let Some(text) = cli.text.as_ref() {
        Some(OneShot::Text(text.clone()))
    } else if cli.pipe {
        Some(OneShot::Pipe)
    } else {
        None
    };
}

/// Reject values no panel or loop can use.
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if let Some(display) = cfg.display.as_ref() {
        if display.width == Some(0) || display.height == Some(0) {
            return Err(ConfigError::Validation("display width/height must be > 0".into()));
        }
        if let Some(rot) = display.rotate_deg {
            match rot {
                0 | 90 | 180 | 270 => {},
                _ => return Err(ConfigError::Validation("display rotate_deg must be 0|90|180|270".into()))
            }
        }
        if let Some(interval) = display.interval_secs {
            if !(interval.is_finite() && interval > 0.0) || Duration::try_from_secs_f64(interval).is_err() {
                return Err(ConfigError::Validation("interval must be a positive number of seconds".into()));
            }
        }
        if let Some(size) = display.font_size {
            if !(size.is_finite() && size > 0.0) {
                return Err(ConfigError::Validation("font size must be > 0".into()));
            }
        }
    }
    if let Some(filter) = cfg.metrics.as_ref().and_then(|m| m.usb_match.as_deref()) {
        if crate::geometry::parse_usb_id(filter).is_none() {
            return Err(ConfigError::Validation(format!("usb_match must be vendor:product in hex, got {filter}")));
        }
    }
    Ok(())
}
