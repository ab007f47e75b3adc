//! Timestamp resolution.
//!
//! The wall clock comes from outside (SNTP, an RTC, the host OS) through
//! [`ClockProvider`]. [`TimestampResolver`] asks it once per event and turns
//! the answer into a [`Resolved`] value that knows both its printable form
//! and its rotation key. When the clock is not available the placeholder
//! [`UNKNOWN_TIME`] and key [`UNKNOWN_KEY`] are used, identically for the
//! log file and the forwarded copy.

use core::fmt::Write as _;

use chrono::{Datelike, NaiveDateTime, Timelike};
use heapless::String;

/// Printed in place of a timestamp when the clock is unavailable.
pub const UNKNOWN_TIME: &str = "unknown-time";

/// Rotation key used when the clock is unavailable.
pub const UNKNOWN_KEY: &str = "unknown";

/// Length of `YYYY-MM-DD HH:MM:SS`.
pub const TIMESTAMP_LEN: usize = 19;

/// Length of `YYYY-MM-DD`.
pub const DATE_LEN: usize = 10;

/// Unix time before which a clock is considered never synchronised
/// (2020-01-01T00:00:00Z). Boards boot with their RTC at 1970.
pub const SYNCED_AFTER_UNIX: i64 = 1_577_836_800;

/// Source of calendar time.
pub trait ClockProvider {
    /// Current local calendar time, or `None` if the clock is not set.
    ///
    /// `max_wait_ms` bounds how long the provider may wait for a pending
    /// synchronisation. Implementations are expected to make one bounded
    /// attempt, never to spin.
    fn now(&mut self, max_wait_ms: u32) -> Option<NaiveDateTime>;
}

/// A formatted timestamp, either `YYYY-MM-DD HH:MM:SS` or [`UNKNOWN_TIME`].
pub type Timestamp = String<TIMESTAMP_LEN>;

/// A rotation key, either `YYYY-MM-DD` or [`UNKNOWN_KEY`].
pub type RotationKey = String<DATE_LEN>;

/// Outcome of asking the clock for the time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolved {
    /// The clock answered.
    Valid(NaiveDateTime),
    /// The clock is not set; placeholders apply.
    Unavailable,
}

impl Resolved {
    /// `true` for [`Resolved::Valid`].
    pub fn is_valid(&self) -> bool {
        matches!(self, Resolved::Valid(_))
    }

    /// Canonical printable form.
    pub fn timestamp(&self) -> Timestamp {
        let mut out = Timestamp::new();
        match self {
            Resolved::Valid(t) => {
                // 19 bytes for any year 0..=9999, which chrono guarantees
                // for the range the resolver accepts.
                let _ = write!(
                    out,
                    "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
                    t.year(),
                    t.month(),
                    t.day(),
                    t.hour(),
                    t.minute(),
                    t.second()
                );
            }
            Resolved::Unavailable => {
                let _ = out.push_str(UNKNOWN_TIME);
            }
        }
        out
    }

    /// Key selecting the log file this time belongs to.
    pub fn rotation_key(&self) -> RotationKey {
        let mut out = RotationKey::new();
        match self {
            Resolved::Valid(t) => {
                let _ = write!(out, "{:04}-{:02}-{:02}", t.year(), t.month(), t.day());
            }
            Resolved::Unavailable => {
                let _ = out.push_str(UNKNOWN_KEY);
            }
        }
        out
    }
}

/// Wraps a [`ClockProvider`] and hands out monotonic [`Resolved`] times.
///
/// A valid time earlier than the last valid time produced (an SNTP step
/// backwards) is clamped to that last time, so events never appear out of
/// order in a log. Times outside years 1..=9999 count as unavailable.
#[derive(Debug)]
pub struct TimestampResolver<C> {
    clock: C,
    max_wait_ms: u32,
    last: Option<NaiveDateTime>,
}

impl<C: ClockProvider> TimestampResolver<C> {
    /// Resolve through `clock`, allowing it `max_wait_ms` per query.
    pub fn new(clock: C, max_wait_ms: u32) -> Self {
        Self {
            clock,
            max_wait_ms,
            last: None,
        }
    }

    /// Ask the clock once.
    pub fn resolve(&mut self) -> Resolved {
        let Some(now) = self.clock.now(self.max_wait_ms) else {
            return Resolved::Unavailable;
        };
        if !(1..=9999).contains(&now.year()) {
            return Resolved::Unavailable;
        }
        let now = match self.last {
            Some(last) if now < last => {
                debug!("clock stepped backwards; clamping");
                last
            }
            _ => now,
        };
        self.last = Some(now);
        Resolved::Valid(now)
    }

    /// The wrapped provider.
    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }
}

/// Clock fed with Unix seconds by whatever synchronises time on the board
/// (an SNTP callback, an RTC read at boot).
///
/// Reports unavailable until a time after [`SYNCED_AFTER_UNIX`] has been set.
/// `utc_offset_secs` shifts UTC into local time.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnixClock {
    base: Option<(i64, u64)>,
    utc_offset_secs: i32,
    uptime_ms: u64,
}

impl UnixClock {
    /// An unsynchronised clock.
    pub const fn new(utc_offset_secs: i32) -> Self {
        Self {
            base: None,
            utc_offset_secs,
            uptime_ms: 0,
        }
    }

    /// Record that `unix_secs` was the time at monotonic `uptime_ms`.
    pub fn set(&mut self, unix_secs: i64, uptime_ms: u64) {
        self.base = Some((unix_secs, uptime_ms));
        self.uptime_ms = uptime_ms;
    }

    /// Advance the monotonic time used to extrapolate from the last `set`.
    pub fn advance_to(&mut self, uptime_ms: u64) {
        self.uptime_ms = self.uptime_ms.max(uptime_ms);
    }

    /// Forget the synchronised time.
    pub fn invalidate(&mut self) {
        self.base = None;
    }

    fn unix_now(&self) -> Option<i64> {
        let (secs, at_ms) = self.base?;
        let elapsed = self.uptime_ms.saturating_sub(at_ms) / 1000;
        let now = secs.checked_add(i64::try_from(elapsed).ok()?)?;
        (now >= SYNCED_AFTER_UNIX).then_some(now)
    }
}

impl ClockProvider for UnixClock {
    fn now(&mut self, _max_wait_ms: u32) -> Option<NaiveDateTime> {
        let local = self.unix_now()?.checked_add(i64::from(self.utc_offset_secs))?;
        chrono::DateTime::<chrono::Utc>::from_timestamp(local, 0).map(|t| t.naive_utc())
    }
}

/// Host clock from `std::time::SystemTime`.
#[cfg(feature = "std")]
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock {
    /// Added to UTC to get local time.
    pub utc_offset_secs: i32,
}

#[cfg(feature = "std")]
impl ClockProvider for SystemClock {
    fn now(&mut self, _max_wait_ms: u32) -> Option<NaiveDateTime> {
        let since_epoch = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .ok()?;
        let secs = i64::try_from(since_epoch.as_secs()).ok()?;
        if secs < SYNCED_AFTER_UNIX {
            return None;
        }
        let local = secs.checked_add(i64::from(self.utc_offset_secs))?;
        chrono::DateTime::<chrono::Utc>::from_timestamp(local, 0).map(|t| t.naive_utc())
    }
}
