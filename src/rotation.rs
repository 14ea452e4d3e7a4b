/*
 *  rotation.rs
 *
 *  kvm-oled - appliance status panel
 *  (c) 2025-26 kvm-oled contributors
 *
 *  Status page rotation
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

use log::debug;

use crate::constants::{IDENTITY_PLACEHOLDER, PLACEHOLDER};
use crate::display::{DisplayError, ScreenRenderer};
use crate::metrics::MetricsSource;

/// The status layouts shown in turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    /// Host name, OS version, image tag, memory, date
    Identity,
    /// Temperatures, throttling and connectivity
    Health,
    /// Uptime, users, load, CPU and storage
    Usage,
}

impl Page {
    pub const ALL: [Page; 3] = [Page::Identity, Page::Health, Page::Usage];

    /// Page shown on tick `n`.
    pub fn for_tick(n: u64) -> Page {
        match n % Self::ALL.len() as u64 {
            0 => Page::Identity,
            1 => Page::Health,
            _ => Page::Usage,
        }
    }
}

/// Ticks rendered so far. Starts on [`Page::Identity`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RotationState {
    ticks: u64,
}

impl RotationState {
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn page(&self) -> Page {
        Page::for_tick(self.ticks)
    }

    pub fn advance(&mut self) {
        self.ticks = self.ticks.wrapping_add(1);
    }
}

fn percent(value: Option<u8>) -> String {
    value.map_or_else(|| PLACEHOLDER.to_string(), |v| format!("{}%", v))
}

/// Format one page from live metrics.
pub fn compose(page: Page, metrics: &mut dyn MetricsSource) -> String {
    match page {
        Page::Identity => format!(
            "{}\nv{} {}\nMem: {}\n{}",
            metrics.hostname(),
            metrics.version(),
            metrics.image_tag(),
            percent(metrics.memory_percent()),
            metrics.date(),
        ),
        Page::Health => format!(
            "CPU: {}\nGPU: {}\nThr: {}\nIP: {}\nSSID: {}",
            metrics.cpu_temperature(),
            metrics.gpu_temperature(),
            metrics.throttled(),
            metrics.ip_address(),
            metrics.ssid().unwrap_or_else(|| IDENTITY_PLACEHOLDER.to_string()),
        ),
        Page::Usage => format!(
            "Up: {}\nUsers: {}\nLoad: {}\nCPU: {}\nDisk: {}",
            metrics.uptime(),
            metrics
                .user_count()
                .map_or_else(|| PLACEHOLDER.to_string(), |n| n.to_string()),
            metrics.load_average(),
            percent(metrics.cpu_percent()),
            metrics.storage(),
        ),
    }
}

/// Owns the rotation state and renders one page per tick.
#[derive(Debug, Default)]
pub struct RotationController {
    state: RotationState,
}

impl RotationController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> RotationState {
        self.state
    }

    /// Render the current page, then move to the next one.
    ///
    /// The state advances even when the frame could not be shown.
    pub fn tick(
        &mut self,
        renderer: &mut ScreenRenderer,
        metrics: &mut dyn MetricsSource,
    ) -> Result<Page, DisplayError> {
        let page = self.state.page();
        debug!("Tick {} -> {:?}", self.state.ticks(), page);

        let text = compose(page, metrics);
        self.state.advance();
        renderer.draw_text(&text, 0)?;
        Ok(page)
    }
}

/// Fixed metric values for tests.
#[cfg(test)]
pub(crate) mod fake {
    use crate::metrics::MetricsSource;

    #[derive(Debug, Default)]
    pub struct FakeMetrics {
        pub queries: usize,
        pub offline: bool,
    }

    impl FakeMetrics {
        fn hit(&mut self, value: &str) -> String {
            self.queries += 1;
            value.to_string()
        }
    }

    impl MetricsSource for FakeMetrics {
        fn hostname(&mut self) -> String { self.hit("kvm.local") }
        fn version(&mut self) -> String { self.hit("3.4") }
        fn image_tag(&mut self) -> String { self.hit("v3.4-rc1") }
        fn memory_percent(&mut self) -> Option<u8> { self.queries += 1; Some(42) }
        fn cpu_percent(&mut self) -> Option<u8> {
            self.queries += 1;
            (!self.offline).then_some(7)
        }
        fn cpu_temperature(&mut self) -> String { self.hit("45.0°C") }
        fn gpu_temperature(&mut self) -> String {
            let v = if self.offline { "N/A" } else { "46.1°C" };
            self.hit(v)
        }
        fn throttled(&mut self) -> String { self.hit("0x0") }
        fn ip_address(&mut self) -> String { self.hit("192.168.1.20") }
        fn ssid(&mut self) -> Option<String> {
            self.queries += 1;
            (!self.offline).then(|| "lab".to_string())
        }
        fn uptime(&mut self) -> String { self.hit("1d 1h 1m") }
        fn user_count(&mut self) -> Option<usize> {
            self.queries += 1;
            (!self.offline).then_some(2)
        }
        fn load_average(&mut self) -> String { self.hit("0.10 0.20 0.30") }
        fn storage(&mut self) -> String { self.hit("37% /") }
        fn date(&mut self) -> String { self.hit("2026-10-15 12:00") }
    }
}

#[cfg(test)]
mod tests {
    use super::fake::FakeMetrics;
    use super::*;
    use crate::config::DisplayConfig;
    use crate::display::drivers::mock::MockDriver;
    use crate::display::TextFont;
    use proptest::prelude::*;

    fn renderer() -> (MockDriver, ScreenRenderer) {
        let mock = MockDriver::new(128, 64);
        let font = TextFont::load(None, 10.0).unwrap();
        let r = ScreenRenderer::new(Box::new(mock.clone()), font, &DisplayConfig::default());
        (mock, r)
    }

    #[test]
    fn test_pages_cycle_from_identity() {
        let (_mock, mut r) = renderer();
        let mut metrics = FakeMetrics::default();
        let mut controller = RotationController::new();

        let shown: Vec<Page> = (0..4).map(|_| controller.tick(&mut r, &mut metrics).unwrap()).collect();
        assert_eq!(shown, vec![Page::Identity, Page::Health, Page::Usage, Page::Identity]);
        assert_eq!(controller.state().ticks(), 4);
    }

    #[test]
    fn test_every_tick_renders_one_frame() {
        let (mock, mut r) = renderer();
        let mut metrics = FakeMetrics::default();
        let mut controller = RotationController::new();
        for _ in 0..5 {
            controller.tick(&mut r, &mut metrics).unwrap();
        }
        assert_eq!(mock.state().lock().unwrap().flush_count, 5);
        assert!(mock.lit_pixels() > 0);
    }

    #[test]
    fn test_failed_frame_still_advances() {
        let (mock, mut r) = renderer();
        let mut metrics = FakeMetrics::default();
        let mut controller = RotationController::new();

        mock.state().lock().unwrap().simulate_flush_failure = true;
        assert!(controller.tick(&mut r, &mut metrics).is_err());
        mock.state().lock().unwrap().simulate_flush_failure = false;

        assert_eq!(controller.tick(&mut r, &mut metrics).unwrap(), Page::Health);
    }

    #[test]
    fn test_identity_page() {
        let text = compose(Page::Identity, &mut FakeMetrics::default());
        assert_eq!(text, "kvm.local\nv3.4 v3.4-rc1\nMem: 42%\n2026-10-15 12:00");
    }

    #[test]
    fn test_health_page() {
        let text = compose(Page::Health, &mut FakeMetrics::default());
        assert_eq!(text, "CPU: 45.0°C\nGPU: 46.1°C\nThr: 0x0\nIP: 192.168.1.20\nSSID: lab");
    }

    #[test]
    fn test_usage_page() {
        let text = compose(Page::Usage, &mut FakeMetrics::default());
        assert_eq!(text, "Up: 1d 1h 1m\nUsers: 2\nLoad: 0.10 0.20 0.30\nCPU: 7%\nDisk: 37% /");
    }

    #[test]
    fn test_unavailable_fields_degrade_alone() {
        let mut metrics = FakeMetrics { offline: true, ..Default::default() };
        let health = compose(Page::Health, &mut metrics);
        assert!(health.contains("GPU: N/A"));
        assert!(health.contains("SSID: -"));
        assert!(health.contains("CPU: 45.0°C"));

        let usage = compose(Page::Usage, &mut metrics);
        assert!(usage.contains("Users: N/A"));
        assert!(usage.contains("CPU: N/A"));
        assert!(usage.contains("Up: 1d 1h 1m"));
    }

    #[test]
    fn test_pages_are_recomputed_each_time() {
        let mut metrics = FakeMetrics::default();
        compose(Page::Identity, &mut metrics);
        let first = metrics.queries;
        compose(Page::Identity, &mut metrics);
        assert_eq!(metrics.queries, first * 2);
    }

    proptest! {
        #[test]
        fn prop_page_is_tick_mod_three(n in any::<u64>()) {
            let expected = Page::ALL[(n % 3) as usize];
            prop_assert_eq!(Page::for_tick(n), expected);
            prop_assert_eq!(RotationState { ticks: n }.page(), expected);
        }
    }
}
