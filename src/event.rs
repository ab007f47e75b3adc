//! Events and their one-line text form.

use core::fmt::Write as _;

use heapless::String;

use crate::boot::ResetReason;
use crate::clock::Resolved;

/// Longest log line, newline included.
pub const MAX_LINE_LEN: usize = 96;

/// One formatted log line, terminated by `\n`.
///
/// The same bytes are appended to the log file and published on the
/// forwarding channel.
pub type LogLine = String<MAX_LINE_LEN>;

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// An input line went to its active level.
    ButtonPress,
    /// The device started; carries the classified reset cause.
    Boot(ResetReason),
    /// The bulk-clear combination wiped the logs.
    ComboClear {
        /// Label of the first line of the pair.
        first: &'static str,
        /// Label of the second line of the pair.
        second: &'static str,
    },
}

/// An immutable record of something worth logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    /// Input label for presses, `"Boot"` or `"Clear"` otherwise.
    pub source: &'static str,
    /// Time of detection. [`Resolved::Unavailable`] until stamped.
    pub occurred_at: Resolved,
    /// Event classification.
    pub kind: EventKind,
}

impl Event {
    /// A press on the line labelled `source`.
    pub fn press(source: &'static str) -> Self {
        Self {
            source,
            occurred_at: Resolved::Unavailable,
            kind: EventKind::ButtonPress,
        }
    }

    /// A boot record.
    pub fn boot(reason: ResetReason) -> Self {
        Self {
            source: "Boot",
            occurred_at: Resolved::Unavailable,
            kind: EventKind::Boot(reason),
        }
    }

    /// A bulk-clear audit record for the pair `first`+`second`.
    pub fn combo_clear(first: &'static str, second: &'static str) -> Self {
        Self {
            source: "Clear",
            occurred_at: Resolved::Unavailable,
            kind: EventKind::ComboClear { first, second },
        }
    }

    /// Attach the resolved detection time.
    pub fn at(mut self, time: Resolved) -> Self {
        self.occurred_at = time;
        self
    }

    /// Render the event as a log line.
    ///
    /// - press: `<ts> <label>\n`
    /// - boot: `<ts> [Boot] <reason>\n`
    /// - clear: `<ts> [Clear] <labelA>+<labelB>\n`
    ///
    /// Fails only if the labels push the line past [`MAX_LINE_LEN`].
    pub fn line(&self) -> Result<LogLine, core::fmt::Error> {
        let mut line = LogLine::new();
        let ts = self.occurred_at.timestamp();
        match self.kind {
            EventKind::ButtonPress => writeln!(line, "{} {}", ts, self.source)?,
            EventKind::Boot(reason) => writeln!(line, "{} [Boot] {}", ts, reason.as_str())?,
            EventKind::ComboClear { first, second } => {
                writeln!(line, "{} [Clear] {}+{}", ts, first, second)?
            }
        }
        Ok(line)
    }
}
