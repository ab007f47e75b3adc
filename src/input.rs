//! Debounced input monitor.
//!
//! Each configured line is sampled once per tick and compared against its
//! last stable level. A change updates the stable level; a change *to* the
//! active level also produces one [`Event`] for that line. Release edges are
//! silent.
//!
//! There is no filtering beyond this comparison. The tick interval (about
//! 100 ms) is the noise-rejection window, so a contact that chatters across
//! two ticks during a press is recorded as two presses. The device is
//! operated by deliberate human presses and that trade-off is accepted.

use heapless::Vec;

use crate::event::Event;

/// Electrical level of an input line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Level {
    /// Logic low.
    Low,
    /// Logic high.
    High,
}

impl Level {
    /// Level corresponding to a boolean pin reading.
    pub fn from_high(high: bool) -> Self {
        if high { Level::High } else { Level::Low }
    }
}

/// Immutable description of one input line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputLine {
    /// Label recorded in log lines, e.g. `"Blue"`.
    pub name: &'static str,
    /// Hardware identifier (GPIO number) passed to [`InputPins::read`].
    pub line_id: u8,
    /// Level that means "pressed". Buttons with pull-ups are active low.
    pub active: Level,
}

impl InputLine {
    /// An active-low line, the usual wiring for a button with a pull-up.
    pub const fn active_low(name: &'static str, line_id: u8) -> Self {
        Self {
            name,
            line_id,
            active: Level::Low,
        }
    }

    /// An active-high line.
    pub const fn active_high(name: &'static str, line_id: u8) -> Self {
        Self {
            name,
            line_id,
            active: Level::High,
        }
    }

    /// The level this line rests at when not pressed.
    pub fn idle(&self) -> Level {
        match self.active {
            Level::High => Level::Low,
            Level::Low => Level::High,
        }
    }
}

/// Raw access to the input hardware.
pub trait InputPins {
    /// Current raw level of `line_id`.
    fn read(&mut self, line_id: u8) -> Level;
}

/// Per-line stable state, indexed in parallel with the configured lines.
#[derive(Debug)]
pub struct InputMonitor<const N: usize> {
    lines: Vec<InputLine, N>,
    stable: Vec<Level, N>,
}

impl<const N: usize> InputMonitor<N> {
    /// Track `lines`, all assumed idle at startup.
    ///
    /// Lines beyond the capacity `N` are ignored; [`AgentConfig`](crate::config::AgentConfig)
    /// validation rejects such tables before they get here.
    pub fn new(lines: &[InputLine]) -> Self {
        let lines: Vec<InputLine, N> = lines.iter().take(N).copied().collect();
        let stable = lines.iter().map(InputLine::idle).collect();
        Self { lines, stable }
    }

    /// Configured lines.
    pub fn lines(&self) -> &[InputLine] {
        &self.lines
    }

    /// Sample every line once and return the press events, in line order.
    pub fn poll<P: InputPins>(&mut self, pins: &mut P) -> Vec<Event, N> {
        let mut events = Vec::new();
        for (line, stable) in self.lines.iter().zip(self.stable.iter_mut()) {
            let raw = pins.read(line.line_id);
            if raw == *stable {
                continue;
            }
            *stable = raw;
            if raw == line.active {
                trace!("press on line {}", line.line_id);
                // Capacity equals the line count, so this cannot overflow.
                let _ = events.push(Event::press(line.name));
            }
        }
        events
    }

    /// Whether `line_id` is currently stable at its active level.
    pub fn is_active(&self, line_id: u8) -> bool {
        self.lines
            .iter()
            .zip(self.stable.iter())
            .any(|(line, level)| line.line_id == line_id && *level == line.active)
    }

    /// Label of `line_id`, if configured.
    pub fn name_of(&self, line_id: u8) -> Option<&'static str> {
        self.lines
            .iter()
            .find(|line| line.line_id == line_id)
            .map(|line| line.name)
    }
}
