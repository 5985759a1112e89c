use std::time::{Duration, Instant};

use colored::Colorize;

use crate::api::ConfigApi;
use crate::editor::{EditorState, Health};

pub fn render(health: Health) -> String {
    match health {
        Health::Checking => format!("{} {}", "◌".yellow(), "checking".yellow()),
        Health::Ok => format!("{} {}", "●".green(), "online".green()),
        Health::Down => format!("{} {}", "●".red(), "offline".red()),
    }
}

/// Probe once and print the result.
pub fn print_once(state: &mut EditorState, api: &dyn ConfigApi, base: &str) {
    let health = state.check_health(api);
    println!("  API {}  {}", render(health), base.dimmed());
}

/// Probe every `interval`, printing each change of state. `limit` bounds the
/// number of probes (unbounded when `None`).
pub fn watch(
    state: &mut EditorState,
    api: &dyn ConfigApi,
    interval: Duration,
    limit: Option<usize>,
    mut on_change: impl FnMut(Health),
) {
    let mut last = state.health;
    on_change(last);
    let mut probes = 0;
    loop {
        let health = state.check_health(api);
        probes += 1;
        if health != last {
            on_change(health);
            last = health;
        }
        if limit.is_some_and(|n| probes >= n) {
            return;
        }
        std::thread::sleep(interval);
    }
}

/// Fixed-interval health probing for loops that cannot block on a timer,
/// like the interactive session. Only the health indicator is touched.
pub struct Poller {
    interval: Duration,
    last: Option<Instant>,
}

impl Poller {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    /// Probe when no probe has run yet or `interval` has passed since the last one.
    /// Returns whether a probe ran.
    pub fn tick(&mut self, state: &mut EditorState, api: &dyn ConfigApi, now: Instant) -> bool {
        let due = match self.last {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.interval,
        };
        if !due {
            return false;
        }
        let health = state.check_health(api);
        log::debug!("health poll: {:?}", health);
        self.last = Some(now);
        true
    }
}
