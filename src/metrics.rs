/*
 *  metrics.rs
 *
 *  kvm-oled - appliance status panel
 *  (c) 2025-26 kvm-oled contributors
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
//! Point-in-time system facts for the status pages, read from /proc, /sys,
//! `sysinfo` and a handful of external commands.
//!
//! Every query degrades to a placeholder on its own; none of them fail.

use chrono::Local;
use log::debug;
use std::fs;
use std::io;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::process::Command;
use sysinfo::{Disks, MemoryRefreshKind, RefreshKind, System};

use crate::config::MetricsConfig;
use crate::constants::{IDENTITY_PLACEHOLDER, OS_RELEASE_PATH, PLACEHOLDER, PROC_STAT_PATH};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TempUnit {
    #[default]
    Celsius,
    Fahrenheit,
}

/// The facts each status page is composed from.
pub trait MetricsSource {
    /// Fully qualified host name.
    fn hostname(&mut self) -> String;
    /// OS release version.
    fn version(&mut self) -> String;
    /// Build tag of the flashed OS image.
    fn image_tag(&mut self) -> String;
    fn memory_percent(&mut self) -> Option<u8>;
    fn cpu_percent(&mut self) -> Option<u8>;
    fn cpu_temperature(&mut self) -> String;
    fn gpu_temperature(&mut self) -> String;
    /// Firmware throttle flags, e.g. `0x0`.
    fn throttled(&mut self) -> String;
    fn ip_address(&mut self) -> String;
    /// Wireless network name, `None` when not associated.
    fn ssid(&mut self) -> Option<String>;
    fn uptime(&mut self) -> String;
    fn user_count(&mut self) -> Option<usize>;
    fn load_average(&mut self) -> String;
    fn storage(&mut self) -> String;
    fn date(&mut self) -> String;
}

/// Cumulative CPU time per accounting state, in clock ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CpuTimes {
    pub user: u64,
    pub nice: u64,
    pub system: u64,
    pub idle: u64,
    pub iowait: u64,
    pub irq: u64,
    pub softirq: u64,
    pub steal: u64,
    pub guest: u64,
}

impl CpuTimes {
    /// Parse the aggregate `cpu ` line of /proc/stat.
    pub fn parse(stat: &str) -> Option<Self> {
        let line = stat.lines().find(|l| l.starts_with("cpu "))?;
        let mut fields = line
            .split_whitespace()
            .skip(1)
            .map(|f| f.parse::<u64>().unwrap_or(0));
        let mut next = || fields.next().unwrap_or(0);
        Some(Self {
            user: next(),
            nice: next(),
            system: next(),
            idle: next(),
            iowait: next(),
            irq: next(),
            softirq: next(),
            steal: next(),
            guest: next(),
        })
    }

    pub fn since(&self, earlier: &CpuTimes) -> CpuTimes {
        CpuTimes {
            user: self.user.saturating_sub(earlier.user),
            nice: self.nice.saturating_sub(earlier.nice),
            system: self.system.saturating_sub(earlier.system),
            idle: self.idle.saturating_sub(earlier.idle),
            iowait: self.iowait.saturating_sub(earlier.iowait),
            irq: self.irq.saturating_sub(earlier.irq),
            softirq: self.softirq.saturating_sub(earlier.softirq),
            steal: self.steal.saturating_sub(earlier.steal),
            guest: self.guest.saturating_sub(earlier.guest),
        }
    }

    fn total(&self) -> u128 {
        [
            self.user,
            self.nice,
            self.system,
            self.irq,
            self.softirq,
            self.idle,
            self.iowait,
            self.steal,
            self.guest,
        ]
        .iter()
        .map(|&v| v as u128)
        .sum()
    }
}

/// Busy share of the accounted CPU time as a whole percentage.
pub fn cpu_percent(times: &CpuTimes) -> u8 {
    let total = times.total();
    let idle = times.idle as u128 + times.iowait as u128;
    let busy = total.saturating_sub(idle);
    let pct = (busy * 100 + total.max(1) / 2) / total.max(1);
    pct.min(100) as u8
}

/// `Nd Hh Mm`, seconds discarded.
pub fn format_uptime(seconds: u64) -> String {
    let days = seconds / 86_400;
    let hours = (seconds % 86_400) / 3_600;
    let minutes = (seconds % 3_600) / 60;
    format!("{days}d {hours}h {minutes}m")
}

pub fn format_celsius(celsius: f64, unit: TempUnit) -> String {
    match unit {
        TempUnit::Celsius => format!("{:.1}°C", celsius),
        TempUnit::Fahrenheit => format!("{:.1}°F", celsius * 9.0 / 5.0 + 32.0),
    }
}

/// Format a raw millidegree sensor value.
pub fn format_temperature(millidegrees: i64, unit: TempUnit) -> String {
    format_celsius(millidegrees as f64 / 1000.0, unit)
}

/// Read a thermal sysfs node; any failure yields the placeholder.
pub fn read_temperature(path: &Path, unit: TempUnit) -> String {
    match read_first_long(path) {
        Ok(milli) => format_temperature(milli, unit),
        Err(e) => {
            debug!("Temperature unavailable at {}: {}", path.display(), e);
            PLACEHOLDER.to_string()
        }
    }
}

fn read_first_long(path: &Path) -> io::Result<i64> {
    let content = fs::read_to_string(path)?;
    let first_word = content
        .split_whitespace()
        .next()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "empty sensor value"))?;
    first_word.parse::<i64>().map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// Run a command and return its trimmed stdout, `None` if it cannot run or fails.
fn command_stdout(program: &str, args: &[&str]) -> Option<String> {
    let output = match Command::new(program).args(args).output() {
        Ok(output) => output,
        Err(e) => {
            debug!("{} unavailable: {}", program, e);
            return None;
        }
    };
    if !output.status.success() {
        debug!("{} {:?} exited with {}", program, args, output.status);
        return None;
    }
    Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// As [`command_stdout`], treating empty output as unavailable.
fn command_output(program: &str, args: &[&str]) -> Option<String> {
    command_stdout(program, args).filter(|text| !text.is_empty())
}

/// `temp=45.1'C` from `vcgencmd measure_temp`.
pub fn parse_vcgencmd_temp(raw: &str) -> Option<f64> {
    raw.trim()
        .strip_prefix("temp=")?
        .trim_end_matches("'C")
        .parse()
        .ok()
}

/// `throttled=0x50005` from `vcgencmd get_throttled`.
pub fn parse_throttled(raw: &str) -> Option<String> {
    raw.trim().strip_prefix("throttled=").map(str::to_string)
}

/// Look up a key in os-release formatted text, quotes removed.
pub fn os_release_value(text: &str, key: &str) -> Option<String> {
    text.lines()
        .filter_map(|l| l.split_once('='))
        .find(|(k, _)| k.trim() == key)
        .map(|(_, v)| v.trim().trim_matches('"').to_string())
        .filter(|v| !v.is_empty())
}

/// Pick the address to show: the named interface, else the first
/// non-loopback IPv4 address.
pub fn pick_address(addresses: &[(String, IpAddr)], interface: Option<&str>) -> Option<IpAddr> {
    let usable = |ip: &IpAddr| ip.is_ipv4() && !ip.is_loopback();
    match interface {
        Some(name) => addresses
            .iter()
            .find(|(n, ip)| n == name && usable(ip))
            .map(|(_, ip)| *ip),
        None => addresses.iter().find(|(_, ip)| usable(ip)).map(|(_, ip)| *ip),
    }
}

/// Live metrics for the local machine.
pub struct SystemMetrics {
    sys: System,
    disks: Disks,
    last_cpu: Option<CpuTimes>,
    unit: TempUnit,
    thermal_path: PathBuf,
    mount: String,
    interface: Option<String>,
    image_tag_file: Option<PathBuf>,
}

impl SystemMetrics {
    pub fn new(config: &MetricsConfig) -> Self {
        let sys = System::new_with_specifics(
            RefreshKind::new().with_memory(MemoryRefreshKind::new().with_ram()),
        );
        Self {
            sys,
            disks: Disks::new_with_refreshed_list(),
            last_cpu: None,
            unit: if config.fahrenheit() { TempUnit::Fahrenheit } else { TempUnit::Celsius },
            thermal_path: config.thermal_path(),
            mount: config.mount(),
            interface: config.interface.clone(),
            image_tag_file: config.image_tag_file.clone(),
        }
    }

    fn os_release(&self, key: &str) -> Option<String> {
        let text = fs::read_to_string(OS_RELEASE_PATH).ok()?;
        os_release_value(&text, key)
    }
}

impl MetricsSource for SystemMetrics {
    fn hostname(&mut self) -> String {
        command_output("hostname", &["-f"])
            .or_else(System::host_name)
            .unwrap_or_else(|| IDENTITY_PLACEHOLDER.to_string())
    }

    fn version(&mut self) -> String {
        self.os_release("VERSION_ID")
            .or_else(System::os_version)
            .unwrap_or_else(|| IDENTITY_PLACEHOLDER.to_string())
    }

    fn image_tag(&mut self) -> String {
        let from_file = self
            .image_tag_file
            .as_ref()
            .and_then(|p| fs::read_to_string(p).ok())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        from_file
            .or_else(|| self.os_release("IMAGE_VERSION"))
            .or_else(|| self.os_release("BUILD_ID"))
            .unwrap_or_else(|| IDENTITY_PLACEHOLDER.to_string())
    }

    fn memory_percent(&mut self) -> Option<u8> {
        self.sys.refresh_memory();
        let total = self.sys.total_memory();
        if total == 0 {
            return None;
        }
        let used = total.saturating_sub(self.sys.available_memory());
        Some(((used as f64 / total as f64) * 100.0).round().min(100.0) as u8)
    }

    fn cpu_percent(&mut self) -> Option<u8> {
        let stat = fs::read_to_string(PROC_STAT_PATH).ok()?;
        let now = CpuTimes::parse(&stat)?;
        let window = match self.last_cpu {
            Some(prev) => now.since(&prev),
            None => now,
        };
        self.last_cpu = Some(now);
        Some(cpu_percent(&window))
    }

    fn cpu_temperature(&mut self) -> String {
        read_temperature(&self.thermal_path, self.unit)
    }

    fn gpu_temperature(&mut self) -> String {
        command_output("vcgencmd", &["measure_temp"])
            .as_deref()
            .and_then(parse_vcgencmd_temp)
            .map(|c| format_celsius(c, self.unit))
            .unwrap_or_else(|| PLACEHOLDER.to_string())
    }

    fn throttled(&mut self) -> String {
        command_output("vcgencmd", &["get_throttled"])
            .as_deref()
            .and_then(parse_throttled)
            .unwrap_or_else(|| PLACEHOLDER.to_string())
    }

    fn ip_address(&mut self) -> String {
        let addresses = match local_ip_address::list_afinet_netifas() {
            Ok(list) => list,
            Err(e) => {
                debug!("Interface enumeration failed: {}", e);
                return PLACEHOLDER.to_string();
            }
        };
        pick_address(&addresses, self.interface.as_deref())
            .map(|ip| ip.to_string())
            .unwrap_or_else(|| PLACEHOLDER.to_string())
    }

    fn ssid(&mut self) -> Option<String> {
        command_output("iwgetid", &["-r"])
    }

    fn uptime(&mut self) -> String {
        let boot = System::boot_time();
        let now = Local::now().timestamp();
        if boot == 0 || now < boot as i64 {
            return PLACEHOLDER.to_string();
        }
        format_uptime((now - boot as i64) as u64)
    }

    fn user_count(&mut self) -> Option<usize> {
        command_stdout("who", &[])
            .map(|out| out.lines().filter(|l| !l.trim().is_empty()).count())
    }

    fn load_average(&mut self) -> String {
        let load = System::load_average();
        format!("{:.2} {:.2} {:.2}", load.one, load.five, load.fifteen)
    }

    fn storage(&mut self) -> String {
        self.disks.refresh_list();
        let Some(disk) = self
            .disks
            .list()
            .iter()
            .find(|d| d.mount_point() == Path::new(&self.mount))
        else {
            debug!("Mount {} not found", self.mount);
            return PLACEHOLDER.to_string();
        };

        let total = disk.total_space();
        if total == 0 {
            return PLACEHOLDER.to_string();
        }
        let used = total.saturating_sub(disk.available_space());
        let pct = (used as f64 / total as f64 * 100.0).round() as u8;
        format!("{}% {}", pct, self.mount)
    }

    fn date(&mut self) -> String {
        Local::now().format("%Y-%m-%d %H:%M").to_string()
    }
}
