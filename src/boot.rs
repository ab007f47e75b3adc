//! Boot recording.
//!
//! Once per startup the last reset cause is read from the hardware,
//! classified, and logged like any other event. The mapping from raw cause
//! codes is total: anything unrecognised is [`ResetReason::Other`].

use crate::event::Event;

/// Why the device last reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ResetReason {
    /// Supply came up.
    PowerOn,
    /// Reset pin asserted.
    ExternalReset,
    /// Firmware requested a restart.
    SoftwareReset,
    /// Woke from deep sleep.
    DeepSleepWake,
    /// Watchdogs, brownouts, panics and anything else.
    Other,
}

impl ResetReason {
    /// Classify an ESP-IDF `esp_reset_reason_t` value.
    ///
    /// `ESP_RST_POWERON` (1), `ESP_RST_EXT` (2), `ESP_RST_SW` (3) and
    /// `ESP_RST_DEEPSLEEP` (8) have their own variants.
    pub fn from_code(code: u32) -> Self {
        match code {
            1 => ResetReason::PowerOn,
            2 => ResetReason::ExternalReset,
            3 => ResetReason::SoftwareReset,
            8 => ResetReason::DeepSleepWake,
            _ => ResetReason::Other,
        }
    }

    /// Text written after `[Boot]` in the log.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResetReason::PowerOn => "Power-on",
            ResetReason::ExternalReset => "External reset",
            ResetReason::SoftwareReset => "Software reset",
            ResetReason::DeepSleepWake => "Deep sleep wake",
            ResetReason::Other => "Other",
        }
    }
}

impl core::fmt::Display for ResetReason {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Access to the hardware reset cause.
pub trait ResetSource {
    /// Classified cause of the most recent reset.
    fn reset_reason(&mut self) -> ResetReason;
}

/// A reset source that always reports the same cause.
///
/// Useful on hosts, where "power-on" is the only meaningful answer.
#[derive(Debug, Clone, Copy)]
pub struct FixedReset(pub ResetReason);

impl ResetSource for FixedReset {
    fn reset_reason(&mut self) -> ResetReason {
        self.0
    }
}

/// One-shot producer of the boot event.
#[derive(Debug, Default)]
pub struct BootRecorder {
    recorded: bool,
}

impl BootRecorder {
    /// A recorder that has not fired yet.
    pub const fn new() -> Self {
        Self { recorded: false }
    }

    /// The boot event, the first time only. Later calls return `None`.
    pub fn record<R: ResetSource>(&mut self, source: &mut R) -> Option<Event> {
        if self.recorded {
            return None;
        }
        self.recorded = true;
        let reason = source.reset_reason();
        info!("reset reason: {}", reason);
        Some(Event::boot(reason))
    }
}
